use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use gatehouse_core::{CredentialHash, GroupName, PrincipalName};

/// A principal record as persisted by the membership store.
///
/// `groups` is one side of the two-sided membership edge; it is only ever
/// mutated through [`crate::MembershipMutator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: PrincipalName,
    pub credential_hash: CredentialHash,
    pub groups: BTreeSet<GroupName>,
}

impl User {
    /// A fresh principal with no group memberships.
    pub fn new(name: PrincipalName, credential_hash: CredentialHash) -> Self {
        Self {
            name,
            credential_hash,
            groups: BTreeSet::new(),
        }
    }

    pub fn is_member_of(&self, group: &GroupName) -> bool {
        self.groups.contains(group)
    }
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use gatehouse_core::{GroupName, PrincipalName, RightName};

/// A group record as persisted by the membership store.
///
/// Groups are created lazily on first reference and never deleted
/// automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: GroupName,
    pub members: BTreeSet<PrincipalName>,
    pub rights: BTreeSet<RightName>,
}

impl Group {
    /// An empty group: no members, no rights.
    pub fn new(name: GroupName) -> Self {
        Self {
            name,
            members: BTreeSet::new(),
            rights: BTreeSet::new(),
        }
    }

    pub fn has_member(&self, principal: &PrincipalName) -> bool {
        self.members.contains(principal)
    }

    pub fn grants(&self, right: &RightName) -> bool {
        self.rights.contains(right)
    }
}

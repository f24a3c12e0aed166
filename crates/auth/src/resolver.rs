//! Group-based permission resolution.

use std::collections::BTreeSet;

use gatehouse_core::{PrincipalName, RightName};

use crate::error::{AuthError, AuthResult, GroupLookupCause};
use crate::store::{GroupFilter, MembershipStore, UserFilter};
use crate::{Group, User};

/// Computes a principal's effective rights as the union of its groups' rights.
///
/// Holds no cache: every call re-reads the store, so rights granted or
/// revoked take effect on the next resolution.
#[derive(Debug, Clone)]
pub struct PermissionResolver<S> {
    store: S,
}

impl<S> PermissionResolver<S>
where
    S: MembershipStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Union the rights of every group in `user.groups`.
    ///
    /// A group that cannot be read is a consistency fault: the whole
    /// resolution fails with [`AuthError::GroupLookupFailed`].
    pub fn resolve_rights(&self, user: &User) -> AuthResult<BTreeSet<RightName>> {
        let rights = self
            .load_groups(user)?
            .into_iter()
            .flat_map(|group| group.rights)
            .collect();
        Ok(rights)
    }

    /// Fetch every group referenced by `user.groups`, one round-trip each.
    pub fn load_groups(&self, user: &User) -> AuthResult<Vec<Group>> {
        let mut groups = Vec::with_capacity(user.groups.len());

        for group_name in &user.groups {
            let group = self
                .store
                .find_group(&GroupFilter::by_name(group_name))
                .map_err(|e| AuthError::GroupLookupFailed {
                    group: group_name.clone(),
                    cause: GroupLookupCause::Store(e),
                })?
                .ok_or_else(|| AuthError::GroupLookupFailed {
                    group: group_name.clone(),
                    cause: GroupLookupCause::Missing,
                })?;

            groups.push(group);
        }

        Ok(groups)
    }

    /// Like [`Self::load_groups`], but skips groups that are missing or unreadable.
    pub fn load_readable_groups(&self, user: &User) -> Vec<Group> {
        user.groups
            .iter()
            .filter_map(|group_name| match self.store.find_group(&GroupFilter::by_name(group_name)) {
                Ok(group) => group,
                Err(e) => {
                    tracing::debug!(group = %group_name, error = %e, "skipping unreadable group");
                    None
                }
            })
            .collect()
    }

    /// Load the principal by name, then resolve its rights.
    pub fn resolve_for(&self, name: &PrincipalName) -> AuthResult<(User, BTreeSet<RightName>)> {
        let user = self
            .store
            .find_user(&UserFilter::by_name(name))?
            .ok_or_else(|| AuthError::UnknownPrincipal(name.clone()))?;
        let rights = self.resolve_rights(&user)?;
        Ok((user, rights))
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

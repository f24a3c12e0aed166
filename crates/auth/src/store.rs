//! Membership store boundary.
//!
//! The authorization core never holds users or groups in memory between
//! calls; every decision re-reads through this trait. Implementations must
//! make each set update a single-document atomic operation.

use std::sync::Arc;

use thiserror::Error;

use gatehouse_core::{CredentialHash, GroupName, PrincipalName, RightName};

use crate::{Group, User};

/// Match-by-example filter over users. Only `Some` fields are matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub name: Option<PrincipalName>,
    pub credential_hash: Option<CredentialHash>,
    pub group: Option<GroupName>,
}

impl UserFilter {
    pub fn by_name(name: &PrincipalName) -> Self {
        Self {
            name: Some(name.clone()),
            ..Self::default()
        }
    }

    pub fn by_credentials(name: &PrincipalName, credential_hash: &CredentialHash) -> Self {
        Self {
            name: Some(name.clone()),
            credential_hash: Some(credential_hash.clone()),
            ..Self::default()
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        self.name.as_ref().is_none_or(|n| *n == user.name)
            && self
                .credential_hash
                .as_ref()
                .is_none_or(|h| *h == user.credential_hash)
            && self.group.as_ref().is_none_or(|g| user.groups.contains(g))
    }
}

/// Match-by-example filter over groups. Only `Some` fields are matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFilter {
    pub name: Option<GroupName>,
    pub member: Option<PrincipalName>,
    pub right: Option<RightName>,
}

impl GroupFilter {
    pub fn by_name(name: &GroupName) -> Self {
        Self {
            name: Some(name.clone()),
            ..Self::default()
        }
    }

    pub fn by_member(member: &PrincipalName) -> Self {
        Self {
            member: Some(member.clone()),
            ..Self::default()
        }
    }

    pub fn matches(&self, group: &Group) -> bool {
        self.name.as_ref().is_none_or(|n| *n == group.name)
            && self.member.as_ref().is_none_or(|m| group.members.contains(m))
            && self.right.as_ref().is_none_or(|r| group.rights.contains(r))
    }
}

/// Collection holding a document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Groups,
}

impl core::fmt::Display for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Collection::Users => f.write_str("users"),
            Collection::Groups => f.write_str("groups"),
        }
    }
}

/// A set-valued field; fixes both the collection and the field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SetField {
    /// `User::groups`, keyed by principal name.
    UserGroups,
    /// `Group::members`, keyed by group name.
    GroupMembers,
    /// `Group::rights`, keyed by group name.
    GroupRights,
}

impl SetField {
    pub fn collection(&self) -> Collection {
        match self {
            SetField::UserGroups => Collection::Users,
            SetField::GroupMembers | SetField::GroupRights => Collection::Groups,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SetField::UserGroups => "groups",
            SetField::GroupMembers => "members",
            SetField::GroupRights => "rights",
        }
    }
}

/// Single-document set update: add or remove `value` in `field` of the
/// document whose key is `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetUpdate {
    pub field: SetField,
    pub key: String,
    pub value: String,
}

impl SetUpdate {
    pub fn user_groups(user: &PrincipalName, group: &GroupName) -> Self {
        Self {
            field: SetField::UserGroups,
            key: user.to_string(),
            value: group.to_string(),
        }
    }

    pub fn group_members(group: &GroupName, user: &PrincipalName) -> Self {
        Self {
            field: SetField::GroupMembers,
            key: group.to_string(),
            value: user.to_string(),
        }
    }

    pub fn group_rights(group: &GroupName, right: &RightName) -> Self {
        Self {
            field: SetField::GroupRights,
            key: group.to_string(),
            value: right.to_string(),
        }
    }
}

/// Result of a single-document update.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// A document with the given key existed.
    pub matched: bool,
    /// The set actually changed.
    pub modified: bool,
}

/// Store operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate key in {collection}: {key}")]
    Duplicate { collection: Collection, key: String },

    #[error("invalid value for {field:?}: {message}")]
    InvalidValue { field: SetField, message: String },
}

/// Capability interface the authorization core requires from storage.
pub trait MembershipStore: Send + Sync {
    /// First user matching the filter.
    fn find_user(&self, filter: &UserFilter) -> Result<Option<User>, StoreError>;

    /// First group matching the filter.
    fn find_group(&self, filter: &GroupFilter) -> Result<Option<Group>, StoreError>;

    fn list_users(&self) -> Result<Vec<User>, StoreError>;

    fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    /// Insert a new user. Fails with [`StoreError::Duplicate`] if the name is taken.
    fn insert_user(&self, user: User) -> Result<(), StoreError>;

    fn upsert_user(&self, user: User) -> Result<(), StoreError>;

    fn upsert_group(&self, group: Group) -> Result<(), StoreError>;

    /// Atomically create an empty group unless one exists. Returns whether
    /// it was created. Never overwrites an existing group.
    fn ensure_group(&self, name: &GroupName) -> Result<bool, StoreError>;

    /// Atomic, idempotent set-union of one value into one document.
    fn add_to_set(&self, update: &SetUpdate) -> Result<UpdateOutcome, StoreError>;

    /// Atomic, idempotent removal of one value from one document.
    fn pull(&self, update: &SetUpdate) -> Result<UpdateOutcome, StoreError>;

    /// Remove a user record. Returns whether a record was removed.
    fn delete_user(&self, name: &PrincipalName) -> Result<bool, StoreError>;

    /// Pull `value` out of `field` in every document matching `filter`.
    ///
    /// Returns the number of documents modified.
    fn update_many_pull(
        &self,
        filter: &GroupFilter,
        field: SetField,
        value: &str,
    ) -> Result<u64, StoreError>;
}

impl<S> MembershipStore for Arc<S>
where
    S: MembershipStore + ?Sized,
{
    fn find_user(&self, filter: &UserFilter) -> Result<Option<User>, StoreError> {
        (**self).find_user(filter)
    }

    fn find_group(&self, filter: &GroupFilter) -> Result<Option<Group>, StoreError> {
        (**self).find_group(filter)
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        (**self).list_users()
    }

    fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        (**self).list_groups()
    }

    fn insert_user(&self, user: User) -> Result<(), StoreError> {
        (**self).insert_user(user)
    }

    fn upsert_user(&self, user: User) -> Result<(), StoreError> {
        (**self).upsert_user(user)
    }

    fn upsert_group(&self, group: Group) -> Result<(), StoreError> {
        (**self).upsert_group(group)
    }

    fn ensure_group(&self, name: &GroupName) -> Result<bool, StoreError> {
        (**self).ensure_group(name)
    }

    fn add_to_set(&self, update: &SetUpdate) -> Result<UpdateOutcome, StoreError> {
        (**self).add_to_set(update)
    }

    fn pull(&self, update: &SetUpdate) -> Result<UpdateOutcome, StoreError> {
        (**self).pull(update)
    }

    fn delete_user(&self, name: &PrincipalName) -> Result<bool, StoreError> {
        (**self).delete_user(name)
    }

    fn update_many_pull(
        &self,
        filter: &GroupFilter,
        field: SetField,
        value: &str,
    ) -> Result<u64, StoreError> {
        (**self).update_many_pull(filter, field, value)
    }
}

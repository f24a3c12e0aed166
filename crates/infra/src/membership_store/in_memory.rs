use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use gatehouse_auth::{
    Group, GroupFilter, MembershipStore, SetField, SetUpdate, StoreError, UpdateOutcome, User,
    UserFilter,
};
use gatehouse_auth::store::Collection;
use gatehouse_core::{GroupName, PrincipalName, RightName};

/// In-memory principal/group store.
///
/// Each collection sits behind its own `RwLock`; every set update holds the
/// write lock for exactly one document mutation, which makes it atomic with
/// respect to concurrent updates of the same document.
#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    users: RwLock<BTreeMap<PrincipalName, User>>,
    groups: RwLock<BTreeMap<GroupName, Group>>,
}

fn poisoned(collection: Collection) -> StoreError {
    StoreError::Unavailable(format!("{collection} lock poisoned"))
}

fn invalid(field: SetField, err: impl core::fmt::Display) -> StoreError {
    StoreError::InvalidValue {
        field,
        message: err.to_string(),
    }
}

/// Insert or remove `value` in a set, reporting whether it changed.
fn apply<T: Ord>(set: &mut std::collections::BTreeSet<T>, value: T, insert: bool) -> bool {
    if insert {
        set.insert(value)
    } else {
        set.remove(&value)
    }
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users_read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<PrincipalName, User>>, StoreError> {
        self.users.read().map_err(|_| poisoned(Collection::Users))
    }

    fn users_write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<PrincipalName, User>>, StoreError> {
        self.users.write().map_err(|_| poisoned(Collection::Users))
    }

    fn groups_read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<GroupName, Group>>, StoreError> {
        self.groups.read().map_err(|_| poisoned(Collection::Groups))
    }

    fn groups_write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<GroupName, Group>>, StoreError> {
        self.groups.write().map_err(|_| poisoned(Collection::Groups))
    }

    fn update_set(&self, update: &SetUpdate, insert: bool) -> Result<UpdateOutcome, StoreError> {
        let field = update.field;

        match field {
            SetField::UserGroups => {
                let key: PrincipalName = update.key.parse().map_err(|e| invalid(field, e))?;
                let value: GroupName = update.value.parse().map_err(|e| invalid(field, e))?;

                let mut users = self.users_write()?;
                Ok(match users.get_mut(&key) {
                    Some(user) => UpdateOutcome {
                        matched: true,
                        modified: apply(&mut user.groups, value, insert),
                    },
                    None => UpdateOutcome::default(),
                })
            }
            SetField::GroupMembers | SetField::GroupRights => {
                let key: GroupName = update.key.parse().map_err(|e| invalid(field, e))?;

                let mut groups = self.groups_write()?;
                let Some(group) = groups.get_mut(&key) else {
                    return Ok(UpdateOutcome::default());
                };

                let modified = if field == SetField::GroupMembers {
                    let value: PrincipalName = update.value.parse().map_err(|e| invalid(field, e))?;
                    apply(&mut group.members, value, insert)
                } else {
                    let value: RightName = update.value.parse().map_err(|e| invalid(field, e))?;
                    apply(&mut group.rights, value, insert)
                };

                Ok(UpdateOutcome {
                    matched: true,
                    modified,
                })
            }
        }
    }
}

impl MembershipStore for InMemoryMembershipStore {
    fn find_user(&self, filter: &UserFilter) -> Result<Option<User>, StoreError> {
        let users = self.users_read()?;

        // Keyed lookup when the name is part of the filter.
        if let Some(name) = &filter.name {
            return Ok(users.get(name).filter(|u| filter.matches(u)).cloned());
        }

        Ok(users.values().find(|u| filter.matches(u)).cloned())
    }

    fn find_group(&self, filter: &GroupFilter) -> Result<Option<Group>, StoreError> {
        let groups = self.groups_read()?;

        if let Some(name) = &filter.name {
            return Ok(groups.get(name).filter(|g| filter.matches(g)).cloned());
        }

        Ok(groups.values().find(|g| filter.matches(g)).cloned())
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users_read()?.values().cloned().collect())
    }

    fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.groups_read()?.values().cloned().collect())
    }

    fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users_write()?;
        if users.contains_key(&user.name) {
            return Err(StoreError::Duplicate {
                collection: Collection::Users,
                key: user.name.to_string(),
            });
        }
        users.insert(user.name.clone(), user);
        Ok(())
    }

    fn upsert_user(&self, user: User) -> Result<(), StoreError> {
        self.users_write()?.insert(user.name.clone(), user);
        Ok(())
    }

    fn upsert_group(&self, group: Group) -> Result<(), StoreError> {
        self.groups_write()?.insert(group.name.clone(), group);
        Ok(())
    }

    fn ensure_group(&self, name: &GroupName) -> Result<bool, StoreError> {
        let mut groups = self.groups_write()?;
        if groups.contains_key(name) {
            return Ok(false);
        }
        groups.insert(name.clone(), Group::new(name.clone()));
        tracing::debug!(group = %name, "group created");
        Ok(true)
    }

    fn add_to_set(&self, update: &SetUpdate) -> Result<UpdateOutcome, StoreError> {
        self.update_set(update, true)
    }

    fn pull(&self, update: &SetUpdate) -> Result<UpdateOutcome, StoreError> {
        self.update_set(update, false)
    }

    fn delete_user(&self, name: &PrincipalName) -> Result<bool, StoreError> {
        Ok(self.users_write()?.remove(name).is_some())
    }

    fn update_many_pull(
        &self,
        filter: &GroupFilter,
        field: SetField,
        value: &str,
    ) -> Result<u64, StoreError> {
        if field.collection() != Collection::Groups {
            return Err(invalid(field, "fan-out pull only applies to group fields"));
        }

        let mut groups = self.groups_write()?;
        let mut modified = 0;

        for group in groups.values_mut().filter(|g| filter.matches(g)) {
            let changed = if field == SetField::GroupMembers {
                let member: PrincipalName = value.parse().map_err(|e| invalid(field, e))?;
                group.members.remove(&member)
            } else {
                let right: RightName = value.parse().map_err(|e| invalid(field, e))?;
                group.rights.remove(&right)
            };
            if changed {
                modified += 1;
            }
        }

        Ok(modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::CredentialHash;

    fn principal(name: &str) -> PrincipalName {
        PrincipalName::new(name).unwrap()
    }

    fn group(name: &str) -> GroupName {
        GroupName::new(name).unwrap()
    }

    fn user(name: &str) -> User {
        User::new(principal(name), CredentialHash::new("h1").unwrap())
    }

    #[test]
    fn insert_user_rejects_duplicates() {
        let store = InMemoryMembershipStore::new();
        store.insert_user(user("alice")).unwrap();

        let err = store.insert_user(user("alice")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { collection: Collection::Users, .. }));
    }

    #[test]
    fn add_to_set_is_idempotent() {
        let store = InMemoryMembershipStore::new();
        store.ensure_group(&group("editors")).unwrap();
        let update = SetUpdate::group_members(&group("editors"), &principal("alice"));

        let first = store.add_to_set(&update).unwrap();
        let second = store.add_to_set(&update).unwrap();

        assert_eq!(first, UpdateOutcome { matched: true, modified: true });
        assert_eq!(second, UpdateOutcome { matched: true, modified: false });

        let editors = store.find_group(&GroupFilter::by_name(&group("editors"))).unwrap().unwrap();
        assert_eq!(editors.members.len(), 1);
    }

    #[test]
    fn updates_on_missing_documents_do_not_match() {
        let store = InMemoryMembershipStore::new();
        let outcome = store
            .add_to_set(&SetUpdate::user_groups(&principal("ghost"), &group("editors")))
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
    }

    #[test]
    fn ensure_group_never_overwrites() {
        let store = InMemoryMembershipStore::new();
        assert!(store.ensure_group(&group("editors")).unwrap());
        store
            .add_to_set(&SetUpdate::group_rights(&group("editors"), &RightName::new("read").unwrap()))
            .unwrap();

        assert!(!store.ensure_group(&group("editors")).unwrap());
        let editors = store.find_group(&GroupFilter::by_name(&group("editors"))).unwrap().unwrap();
        assert_eq!(editors.rights.len(), 1);
    }

    #[test]
    fn find_user_applies_every_present_field() {
        let store = InMemoryMembershipStore::new();
        store.insert_user(user("alice")).unwrap();

        let right_hash = UserFilter::by_credentials(&principal("alice"), &CredentialHash::new("h1").unwrap());
        let wrong_hash = UserFilter::by_credentials(&principal("alice"), &CredentialHash::new("h2").unwrap());

        assert!(store.find_user(&right_hash).unwrap().is_some());
        assert!(store.find_user(&wrong_hash).unwrap().is_none());
    }

    #[test]
    fn update_many_pull_touches_only_matching_groups() {
        let store = InMemoryMembershipStore::new();
        for name in ["a", "b", "c"] {
            store.ensure_group(&group(name)).unwrap();
        }
        for name in ["a", "b"] {
            store
                .add_to_set(&SetUpdate::group_members(&group(name), &principal("alice")))
                .unwrap();
        }

        let modified = store
            .update_many_pull(&GroupFilter::by_member(&principal("alice")), SetField::GroupMembers, "alice")
            .unwrap();
        assert_eq!(modified, 2);
        assert!(store.find_group(&GroupFilter::by_member(&principal("alice"))).unwrap().is_none());
    }

    #[test]
    fn update_many_pull_rejects_user_fields() {
        let store = InMemoryMembershipStore::new();
        let err = store
            .update_many_pull(&GroupFilter::default(), SetField::UserGroups, "editors")
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let store = InMemoryMembershipStore::new();
        let update = SetUpdate {
            field: SetField::GroupMembers,
            key: String::new(),
            value: "alice".to_string(),
        };
        assert!(matches!(store.add_to_set(&update), Err(StoreError::InvalidValue { .. })));
    }

    #[test]
    fn concurrent_adds_to_one_group_are_not_lost() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryMembershipStore::new());
        store.ensure_group(&group("crowd")).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let update = SetUpdate::group_members(&group("crowd"), &principal(&format!("user{i}")));
                    store.add_to_set(&update).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let crowd = store.find_group(&GroupFilter::by_name(&group("crowd"))).unwrap().unwrap();
        assert_eq!(crowd.members.len(), 16);
    }
}

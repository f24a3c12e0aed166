use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use gatehouse_auth::{
    Group, GroupFilter, MembershipStore, SetField, SetUpdate, StoreError, UpdateOutcome, User,
    UserFilter,
};
use gatehouse_core::{GroupName, PrincipalName};

/// Store wrapper that fails selected operations on demand.
///
/// Used to drive the partial-update paths of the membership mutator: arm a
/// one-shot failure for a set field and the next update touching that field
/// returns [`StoreError::Unavailable`] without reaching the inner store.
#[derive(Debug)]
pub struct FaultInjectingStore<S> {
    inner: S,
    armed: Mutex<Vec<SetField>>,
    fail_group_reads: AtomicBool,
}

impl<S> FaultInjectingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            armed: Mutex::new(Vec::new()),
            fail_group_reads: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail the next add/pull/fan-out update on `field`.
    pub fn fail_next_update(&self, field: SetField) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.push(field);
        }
    }

    /// Make every `find_group` call fail until turned off.
    pub fn fail_group_reads(&self, fail: bool) {
        self.fail_group_reads.store(fail, Ordering::SeqCst);
    }

    fn trip(&self, field: SetField) -> Result<(), StoreError> {
        let mut armed = self
            .armed
            .lock()
            .map_err(|_| StoreError::Unavailable("fault plan lock poisoned".to_string()))?;

        if let Some(pos) = armed.iter().position(|f| *f == field) {
            armed.remove(pos);
            tracing::debug!(field = field.as_str(), "injected store fault");
            return Err(StoreError::Unavailable(format!(
                "injected fault on {}.{}",
                field.collection(),
                field.as_str()
            )));
        }
        Ok(())
    }
}

impl<S> MembershipStore for FaultInjectingStore<S>
where
    S: MembershipStore,
{
    fn find_user(&self, filter: &UserFilter) -> Result<Option<User>, StoreError> {
        self.inner.find_user(filter)
    }

    fn find_group(&self, filter: &GroupFilter) -> Result<Option<Group>, StoreError> {
        if self.fail_group_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected group read fault".to_string()));
        }
        self.inner.find_group(filter)
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.inner.list_users()
    }

    fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        self.inner.list_groups()
    }

    fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.inner.insert_user(user)
    }

    fn upsert_user(&self, user: User) -> Result<(), StoreError> {
        self.inner.upsert_user(user)
    }

    fn upsert_group(&self, group: Group) -> Result<(), StoreError> {
        self.inner.upsert_group(group)
    }

    fn ensure_group(&self, name: &GroupName) -> Result<bool, StoreError> {
        self.inner.ensure_group(name)
    }

    fn add_to_set(&self, update: &SetUpdate) -> Result<UpdateOutcome, StoreError> {
        self.trip(update.field)?;
        self.inner.add_to_set(update)
    }

    fn pull(&self, update: &SetUpdate) -> Result<UpdateOutcome, StoreError> {
        self.trip(update.field)?;
        self.inner.pull(update)
    }

    fn delete_user(&self, name: &PrincipalName) -> Result<bool, StoreError> {
        self.inner.delete_user(name)
    }

    fn update_many_pull(
        &self,
        filter: &GroupFilter,
        field: SetField,
        value: &str,
    ) -> Result<u64, StoreError> {
        self.trip(field)?;
        self.inner.update_many_pull(filter, field, value)
    }
}

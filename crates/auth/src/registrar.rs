//! Principal registration and credential login.

use std::sync::Arc;

use gatehouse_core::{CredentialHash, GroupName, PrincipalName};

use crate::audit::AuditSink;
use crate::error::{AuthError, AuthResult};
use crate::membership::MembershipMutator;
use crate::permissions::admin_group;
use crate::store::{MembershipStore, StoreError, UserFilter};
use crate::token::{IssuedToken, TokenCodec};
use crate::User;

/// Creates principals and exchanges credentials for session tokens.
#[derive(Clone)]
pub struct Registrar<S> {
    store: S,
    codec: TokenCodec,
    membership: MembershipMutator<S>,
    super_group: GroupName,
    audit: Arc<dyn AuditSink>,
}

impl<S> Registrar<S>
where
    S: MembershipStore + Clone,
{
    /// Registrations write memberships through `membership`, so they are
    /// serialized against its reconciliation.
    pub fn new(membership: MembershipMutator<S>, codec: TokenCodec) -> Self {
        Self {
            store: membership.store().clone(),
            audit: membership.audit().clone(),
            membership,
            codec,
            super_group: admin_group(),
        }
    }

    pub fn with_super_group(mut self, super_group: GroupName) -> Self {
        self.super_group = super_group;
        self
    }

    /// Create a principal and add it to each of `groups`.
    ///
    /// The record is inserted with no groups; memberships are then added
    /// through [`MembershipMutator`] so both sides of every edge are written.
    pub fn register(
        &self,
        name: &PrincipalName,
        credential_hash: &CredentialHash,
        groups: &[GroupName],
    ) -> AuthResult<User> {
        if self.store.find_user(&UserFilter::by_name(name))?.is_some() {
            return Err(AuthError::DuplicatePrincipal(name.clone()));
        }

        let user = User::new(name.clone(), credential_hash.clone());
        self.store.insert_user(user).map_err(|e| match e {
            StoreError::Duplicate { .. } => AuthError::DuplicatePrincipal(name.clone()),
            other => AuthError::Store(other),
        })?;
        self.audit.record(&format!("User {name} added"));

        for group in groups {
            self.membership.add_user_to_group(name, group)?;
        }

        self.store
            .find_user(&UserFilter::by_name(name))?
            .ok_or_else(|| AuthError::UnknownPrincipal(name.clone()))
    }

    /// Register a principal directly into the super-group.
    pub fn create_admin(
        &self,
        name: &PrincipalName,
        credential_hash: &CredentialHash,
    ) -> AuthResult<User> {
        let user = self.register(name, credential_hash, std::slice::from_ref(&self.super_group))?;
        tracing::warn!(principal = %name, group = %self.super_group, "super-group principal created");
        Ok(user)
    }

    /// Exchange a name and credential hash for a session token.
    pub fn login(
        &self,
        name: &PrincipalName,
        credential_hash: &CredentialHash,
    ) -> AuthResult<IssuedToken> {
        let user = self
            .store
            .find_user(&UserFilter::by_credentials(name, credential_hash))?
            .ok_or(AuthError::InvalidCredentials)?;

        let issued = self.codec.issue(&user.name)?;
        self.audit.record(&format!("User {} logged in", user.name));
        Ok(issued)
    }
}

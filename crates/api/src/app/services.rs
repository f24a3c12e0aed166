//! Service wiring: one store shared by the gate, the mutator and the registrar.

use std::sync::Arc;

use gatehouse_auth::{
    AuditSink, AuthorizationGate, MembershipMutator, MembershipStore, Registrar, SigningConfig,
    TokenCodec, TokenError, TracingAuditSink,
};
use gatehouse_core::GroupName;

use crate::config::ApiConfig;

/// Store handle used by every service; any [`MembershipStore`] can back it.
pub type SharedStore = Arc<dyn MembershipStore>;

pub struct AppServices {
    pub gate: AuthorizationGate<SharedStore>,
    pub membership: MembershipMutator<SharedStore>,
    pub registrar: Registrar<SharedStore>,
}

impl AppServices {
    pub fn super_group(&self) -> &GroupName {
        self.gate.super_group()
    }
}

pub fn build_services(config: &ApiConfig, store: SharedStore) -> Result<AppServices, TokenError> {
    let codec = TokenCodec::new(
        SigningConfig::new(config.jwt_secret.as_bytes().to_vec())
            .with_validity(config.token_validity),
    )?;
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    let membership = MembershipMutator::new(store.clone(), audit);

    Ok(AppServices {
        gate: AuthorizationGate::new(codec.clone(), store)
            .with_super_group(config.super_group.clone()),
        registrar: Registrar::new(membership.clone(), codec)
            .with_super_group(config.super_group.clone()),
        membership,
    })
}

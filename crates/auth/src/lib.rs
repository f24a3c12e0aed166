//! `gatehouse-auth` — the authorization core.
//!
//! Token issuance/verification, group-based permission resolution, the
//! authorization gate and two-sided membership maintenance. This crate is
//! decoupled from HTTP; storage is reached only through [`MembershipStore`].

pub mod audit;
pub mod authorize;
pub mod claims;
pub mod error;
pub mod group;
pub mod membership;
pub mod permissions;
pub mod principal;
pub mod registrar;
pub mod resolver;
pub mod store;
pub mod token;

pub use audit::{AuditSink, NoopAuditSink, TracingAuditSink};
pub use authorize::{
    AuthorizationExplanation, AuthorizationGate, Decision, DenialKind, DenyReason, Identity,
    PrincipalState, extract_bearer,
};
pub use claims::{ClaimsValidationError, SessionClaims, validate_claims};
pub use error::{AuthError, AuthResult, GroupLookupCause};
pub use group::Group;
pub use membership::{EdgeSide, MembershipMutator, OneSidedEdge};
pub use permissions::ADMIN_GROUP;
pub use principal::User;
pub use registrar::Registrar;
pub use resolver::PermissionResolver;
pub use store::{
    Collection, GroupFilter, MembershipStore, SetField, SetUpdate, StoreError, UpdateOutcome,
    UserFilter,
};
pub use token::{IssuedToken, SigningConfig, TokenCodec, TokenError};

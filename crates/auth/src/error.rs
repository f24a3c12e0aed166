use thiserror::Error;

use gatehouse_core::{DomainError, GroupName, PrincipalName};

use crate::membership::OneSidedEdge;
use crate::store::StoreError;
use crate::token::TokenError;

/// Why a referenced group could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupLookupCause {
    #[error("group does not exist")]
    Missing,

    #[error(transparent)]
    Store(StoreError),
}

/// Error taxonomy of the authorization core.
///
/// Token signature and expiry failures during `authorize` are not errors;
/// they are reported as [`crate::Decision::Deny`] so callers can tell
/// "not authorized" apart from "cannot determine authorization".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed authorization header")]
    MalformedHeader,

    #[error("unknown principal '{0}'")]
    UnknownPrincipal(PrincipalName),

    #[error("group lookup failed for '{group}': {cause}")]
    GroupLookupFailed {
        group: GroupName,
        cause: GroupLookupCause,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("principal '{0}' already exists")]
    DuplicatePrincipal(PrincipalName),

    /// One side of a two-sided membership edge was written and the other was
    /// not. The store is left as-is so operators can reconcile.
    #[error("partial membership update leaving {} one-sided edge(s): {reason}", edges.len())]
    PartialMembershipUpdate {
        edges: Vec<OneSidedEdge>,
        reason: String,
    },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AuthError {
    /// Errors that mean "the caller is not who they claim", as opposed to a
    /// fault while deciding.
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            AuthError::MalformedHeader
                | AuthError::UnknownPrincipal(_)
                | AuthError::InvalidCredentials
        )
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

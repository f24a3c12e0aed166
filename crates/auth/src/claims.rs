use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use gatehouse_core::PrincipalName;

/// JWT claims carried by a session token.
///
/// Timestamps use the registered `iat`/`exp` claim names and are encoded as
/// seconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the principal the token was issued to.
    pub sub: PrincipalName,

    /// Token identifier, for correlating audit records.
    pub jti: Uuid,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens before this, in [`crate::TokenCodec`].
pub fn validate_claims(
    claims: &SessionClaims,
    now: DateTime<Utc>,
) -> Result<(), ClaimsValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(ClaimsValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(ClaimsValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(ClaimsValidationError::Expired);
    }
    Ok(())
}

//! Session token issuance and verification (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use gatehouse_core::PrincipalName;

use crate::claims::{ClaimsValidationError, SessionClaims, validate_claims};

/// Fixed validity window of an issued token.
pub const DEFAULT_TOKEN_VALIDITY_HOURS: i64 = 24;

/// Signing configuration for [`TokenCodec`].
///
/// The secret is process-wide configuration. Rotating it invalidates every
/// outstanding token.
#[derive(Clone)]
pub struct SigningConfig {
    secret: Vec<u8>,
    validity: Duration,
}

impl SigningConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            validity: Duration::hours(DEFAULT_TOKEN_VALIDITY_HOURS),
        }
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }
}

impl core::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret", &"<redacted>")
            .field("validity", &self.validity)
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The signing secret is empty; this is a fatal configuration error.
    #[error("signing key unavailable")]
    MissingSigningKey,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    #[error("token has expired")]
    Expired,
}

impl From<ClaimsValidationError> for TokenError {
    fn from(value: ClaimsValidationError) -> Self {
        match value {
            ClaimsValidationError::Expired => TokenError::Expired,
            other => TokenError::InvalidSignature(other.to_string()),
        }
    }
}

/// A freshly issued bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub subject: PrincipalName,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity: Duration,
}

impl TokenCodec {
    pub fn new(config: SigningConfig) -> Result<Self, TokenError> {
        if config.secret.is_empty() {
            return Err(TokenError::MissingSigningKey);
        }
        if config.validity <= Duration::zero() {
            return Err(TokenError::Signing(
                "token validity must be positive".to_string(),
            ));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(&config.secret),
            decoding_key: DecodingKey::from_secret(&config.secret),
            validity: config.validity,
        })
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    pub fn issue(&self, subject: &PrincipalName) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &PrincipalName,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = SessionClaims {
            sub: subject.clone(),
            jti: Uuid::now_v7(),
            issued_at: now,
            expires_at: now + self.validity,
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        tracing::debug!(subject = %subject, jti = %claims.jti, "issued session token");

        Ok(IssuedToken {
            token,
            subject: claims.sub,
            expires_at: claims.expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> Result<PrincipalName, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<PrincipalName, TokenError> {
        Ok(self.decode_at(token, now)?.sub)
    }

    /// Check signature and algorithm, then the time window against `now`.
    ///
    /// Expiry is checked here rather than by `jsonwebtoken` so the clock can be
    /// supplied by the caller.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| TokenError::InvalidSignature(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

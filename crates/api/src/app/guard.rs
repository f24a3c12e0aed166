//! Per-handler authorization guards.
//!
//! Every check goes through [`gatehouse_auth::AuthorizationGate`]; a missing
//! `Authorization` header is treated like a header without the bearer prefix.

use axum::http::HeaderMap;
use axum::response::Response;

use gatehouse_auth::{AuthError, Decision, Identity};
use gatehouse_core::{PrincipalName, RightName};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn authorization_header(headers: &HeaderMap) -> Result<&str, Response> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| errors::auth_error_to_response(AuthError::MalformedHeader))
}

/// Allow the request only if the caller holds `right` (or is in the super-group).
pub fn require_right(
    services: &AppServices,
    headers: &HeaderMap,
    right: &RightName,
) -> Result<PrincipalName, Response> {
    let header = authorization_header(headers)?;

    match services.gate.authorize(header, right) {
        Ok(Decision::Allow { subject }) => Ok(subject),
        Ok(Decision::Deny(reason)) => {
            tracing::info!(right = %right, %reason, "request denied");
            Err(errors::deny_to_response(reason))
        }
        Err(e) => Err(rejected(e)),
    }
}

/// Require a valid token for an existing principal, without checking a right.
pub fn require_identity(
    services: &AppServices,
    headers: &HeaderMap,
) -> Result<PrincipalContext, Response> {
    let header = authorization_header(headers)?;

    match services.gate.authenticate(header) {
        Ok(Identity::Known(user)) => Ok(PrincipalContext::from(user)),
        Ok(Identity::Rejected(reason)) => Err(errors::deny_to_response(reason)),
        Err(e) => Err(rejected(e)),
    }
}

/// Faults are logged by the error mapping; access denials are logged here.
fn rejected(err: AuthError) -> Response {
    if err.is_access_denied() {
        tracing::info!(error = %err, "caller rejected");
    }
    errors::auth_error_to_response(err)
}

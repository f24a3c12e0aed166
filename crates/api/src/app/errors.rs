use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use gatehouse_auth::{AuthError, DenyReason};
use gatehouse_core::DomainError;

use crate::app::dto::MessageResponse;

/// Map a core error about the caller or the store to a response.
///
/// Access-denied errors become 401; faults while deciding become 500 and are
/// logged, since they point at store trouble rather than a bad request.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::MalformedHeader => json_error(
            StatusCode::UNAUTHORIZED,
            "malformed_header",
            "expected 'Authorization: Bearer <token>'",
        ),
        AuthError::UnknownPrincipal(name) => json_error(
            StatusCode::UNAUTHORIZED,
            "unknown_principal",
            format!("principal '{name}' no longer exists"),
        ),
        AuthError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid credentials")
        }
        AuthError::DuplicatePrincipal(name) => json_error(
            StatusCode::CONFLICT,
            "duplicate_principal",
            format!("User {name} already exists"),
        ),
        AuthError::Domain(e) => validation_error(e),
        e @ AuthError::GroupLookupFailed { .. } => server_fault("group_lookup_failed", e),
        e @ AuthError::Store(_) => server_fault("store_unavailable", e),
        e @ AuthError::PartialMembershipUpdate { .. } => server_fault("partial_membership_update", e),
        e @ AuthError::Token(_) => server_fault("token_error", e),
    }
}

/// Like [`auth_error_to_response`], but an unknown principal is the target
/// of the operation, not the caller.
pub fn target_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::UnknownPrincipal(name) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_principal",
            format!("User {name} does not exist"),
        ),
        other => auth_error_to_response(other),
    }
}

pub fn deny_to_response(reason: DenyReason) -> axum::response::Response {
    match reason {
        DenyReason::InvalidSignature(msg) => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_signature", msg)
        }
        DenyReason::Expired => json_error(StatusCode::UNAUTHORIZED, "token_expired", "token has expired"),
        DenyReason::MissingRight(right) => json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("missing right '{right}'"),
        ),
    }
}

pub fn validation_error(err: DomainError) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
}

fn server_fault(code: &'static str, err: AuthError) -> axum::response::Response {
    tracing::error!(error = %err, code, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn json_message(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(MessageResponse {
            message: message.into(),
        }),
    )
        .into_response()
}

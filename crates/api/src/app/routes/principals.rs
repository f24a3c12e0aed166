//! Registration, login and deletion of principals.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use gatehouse_auth::permissions::{delete_user as delete_user_right, edit_group};
use gatehouse_core::PrincipalName;

use crate::app::dto::{AddUserForm, CredentialsForm, LoginResponse, UsernameForm};
use crate::app::services::AppServices;
use crate::app::{errors, guard};

/// POST /auth/login - exchange credentials for a bearer token
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, Response> {
    let (name, hash) = form.parse().map_err(errors::validation_error)?;

    let issued = services
        .registrar
        .login(&name, &hash)
        .map_err(errors::auth_error_to_response)?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            username: issued.subject,
            token: issued.token,
            expires_at: issued.expires_at,
        }),
    )
        .into_response())
}

/// POST /auth/add - register a principal, optionally into groups
///
/// Registration alone needs no token. Naming groups needs `edit_group`, the
/// same right `/auth/addtogroup` requires. Super-group membership is only
/// granted through the admin listener.
pub async fn add_user(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Form(form): Form<AddUserForm>,
) -> Result<Response, Response> {
    let (name, hash) = form.credentials().map_err(errors::validation_error)?;
    let groups = form.groups().map_err(errors::validation_error)?;

    if groups.contains(services.super_group()) {
        return Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("group '{}' cannot be joined at registration", services.super_group()),
        ));
    }
    if !groups.is_empty() {
        guard::require_right(&services, &headers, &edit_group())?;
    }

    services
        .registrar
        .register(&name, &hash, &groups)
        .map_err(errors::auth_error_to_response)?;

    Ok(errors::json_message(StatusCode::OK, format!("User {name} added")))
}

/// POST /auth/del - delete a principal (requires `delete_user`)
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Form(form): Form<UsernameForm>,
) -> Result<Response, Response> {
    let caller = guard::require_right(&services, &headers, &delete_user_right())?;
    let name = PrincipalName::new(form.username).map_err(errors::validation_error)?;

    let removed = services
        .membership
        .delete_user(&name)
        .map_err(errors::target_error_to_response)?;

    if !removed {
        return Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "unknown_principal",
            format!("User {name} does not exist"),
        ));
    }

    tracing::info!(%caller, principal = %name, "principal deleted");
    Ok(errors::json_message(StatusCode::OK, format!("User {name} deleted")))
}

/// POST /auth/createadmin - create a super-group principal (admin listener only)
pub async fn create_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, Response> {
    let (name, hash) = form.parse().map_err(errors::validation_error)?;

    services
        .registrar
        .create_admin(&name, &hash)
        .map_err(errors::auth_error_to_response)?;

    Ok(errors::json_message(StatusCode::OK, format!("Admin {name} created")))
}

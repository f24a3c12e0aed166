//! Group membership and group rights. Every route requires `edit_group`.

use std::sync::Arc;

use axum::{
    Form,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
};

use gatehouse_auth::permissions::edit_group;

use crate::app::dto::{GroupRightForm, MembershipForm};
use crate::app::services::AppServices;
use crate::app::{errors, guard};

/// POST /auth/addtogroup
pub async fn add_to_group(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Form(form): Form<MembershipForm>,
) -> Result<Response, Response> {
    guard::require_right(&services, &headers, &edit_group())?;
    let (user, group) = form.parse().map_err(errors::validation_error)?;

    services
        .membership
        .add_user_to_group(&user, &group)
        .map_err(errors::target_error_to_response)?;

    Ok(errors::json_message(
        StatusCode::OK,
        format!("User {user} added to group {group}"),
    ))
}

/// POST /auth/rmfromgroup
pub async fn remove_from_group(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Form(form): Form<MembershipForm>,
) -> Result<Response, Response> {
    guard::require_right(&services, &headers, &edit_group())?;
    let (user, group) = form.parse().map_err(errors::validation_error)?;

    services
        .membership
        .remove_user_from_group(&user, &group)
        .map_err(errors::target_error_to_response)?;

    Ok(errors::json_message(
        StatusCode::OK,
        format!("User {user} removed from group {group}"),
    ))
}

/// POST /auth/addrighttogroup
pub async fn add_right_to_group(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Form(form): Form<GroupRightForm>,
) -> Result<Response, Response> {
    guard::require_right(&services, &headers, &edit_group())?;
    let (group, right) = form.parse().map_err(errors::validation_error)?;

    services
        .membership
        .grant_right(&group, &right)
        .map_err(errors::auth_error_to_response)?;

    Ok(errors::json_message(
        StatusCode::OK,
        format!("Right {right} added to group {group}"),
    ))
}

/// POST /auth/rmrightfromgroup
pub async fn remove_right_from_group(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Form(form): Form<GroupRightForm>,
) -> Result<Response, Response> {
    guard::require_right(&services, &headers, &edit_group())?;
    let (group, right) = form.parse().map_err(errors::validation_error)?;

    services
        .membership
        .revoke_right(&group, &right)
        .map_err(errors::auth_error_to_response)?;

    Ok(errors::json_message(
        StatusCode::OK,
        format!("Right {right} removed from group {group}"),
    ))
}

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use gatehouse_core::RightName;

use crate::app::dto::ExplainQuery;
use crate::app::services::AppServices;
use crate::app::{errors, guard};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /auth/whoami - the caller's name and groups
pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    let principal = guard::require_identity(&services, &headers)?;
    Ok(Json(principal).into_response())
}

/// GET /auth/explain?right=X - why the caller would be allowed or denied `X`
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    Query(query): Query<ExplainQuery>,
) -> Result<Response, Response> {
    let header = guard::authorization_header(&headers)?;
    let right = RightName::new(query.right).map_err(errors::validation_error)?;

    let explanation = services
        .gate
        .explain(header, &right)
        .map_err(errors::auth_error_to_response)?;

    Ok(Json(explanation).into_response())
}

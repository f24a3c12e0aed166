//! Reconciliation of one-sided membership edges (admin listener only).
//!
//! A `partial_membership_update` response leaves an edge recorded on one side;
//! these routes find such edges and roll them back.

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    response::{IntoResponse, Response},
};

use crate::app::dto::EdgeReport;
use crate::app::errors;
use crate::app::services::AppServices;

/// GET /auth/reconcile - list one-sided edges without changing anything
pub async fn scan(Extension(services): Extension<Arc<AppServices>>) -> Result<Response, Response> {
    let edges = services
        .membership
        .find_one_sided_edges()
        .map_err(errors::auth_error_to_response)?;

    Ok(Json(EdgeReport::new(edges, false)).into_response())
}

/// POST /auth/reconcile - remove the recorded side of every one-sided edge
pub async fn repair(Extension(services): Extension<Arc<AppServices>>) -> Result<Response, Response> {
    let edges = services
        .membership
        .reconcile()
        .map_err(errors::auth_error_to_response)?;

    if !edges.is_empty() {
        tracing::info!(count = edges.len(), "one-sided edges repaired");
    }
    Ok(Json(EdgeReport::new(edges, true)).into_response())
}

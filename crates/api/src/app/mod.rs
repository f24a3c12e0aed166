//! HTTP API application wiring (Axum routers + service wiring).
//!
//! - `services.rs`: store, gate, membership mutator and registrar
//! - `routes/`: HTTP routes + handlers
//! - `guard.rs`: bearer-token checks run at the top of protected handlers
//! - `dto.rs`: form bodies and JSON responses
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use gatehouse_auth::TokenError;
use gatehouse_infra::InMemoryMembershipStore;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod guard;
pub mod routes;
pub mod services;

use services::SharedStore;

/// The two listeners' routers. Both share one set of services.
pub struct App {
    pub public: Router,
    /// Serves `/auth/createadmin`; bind it to loopback only.
    pub admin: Router,
}

/// Build the routers over a fresh in-memory store (public entrypoint used by `main.rs`).
pub fn build_app(config: &ApiConfig) -> Result<App, TokenError> {
    build_app_with_store(config, Arc::new(InMemoryMembershipStore::new()))
}

pub fn build_app_with_store(config: &ApiConfig, store: SharedStore) -> Result<App, TokenError> {
    let services = Arc::new(services::build_services(config, store)?);

    let public = Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services.clone()))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::trace_requests)));

    let admin = routes::admin_router()
        .layer(Extension(services))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::trace_requests)));

    Ok(App { public, admin })
}

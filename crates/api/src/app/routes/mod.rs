use axum::{
    Router,
    routing::{get, post},
};

pub mod groups;
pub mod principals;
pub mod reconcile;
pub mod system;

/// Router for the public listener.
pub fn router() -> Router {
    Router::new()
        .route("/auth/login", post(principals::login))
        .route("/auth/add", post(principals::add_user))
        .route("/auth/del", post(principals::delete_user))
        .route("/auth/addtogroup", post(groups::add_to_group))
        .route("/auth/rmfromgroup", post(groups::remove_from_group))
        .route("/auth/addrighttogroup", post(groups::add_right_to_group))
        .route("/auth/rmrightfromgroup", post(groups::remove_right_from_group))
        .route("/auth/whoami", get(system::whoami))
        .route("/auth/explain", get(system::explain))
}

/// Router for the loopback-only admin listener.
pub fn admin_router() -> Router {
    Router::new()
        .route("/auth/createadmin", post(principals::create_admin))
        .route("/auth/reconcile", get(reconcile::scan).post(reconcile::repair))
}

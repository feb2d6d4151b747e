use axum::{
    routing::{get, patch},
    Router,
};
use crate::state::AppState;
use crate::handlers::notification;
use crate::middleware::auth::{require_admin, require_auth};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/notifications", get(notification::list_notifications))
        .route("/admin/notifications/{id}", patch(notification::mark_as_read))
        .route_layer(axum::middleware::from_fn(require_admin))
        .route_layer(axum::middleware::from_fn(require_auth))
}

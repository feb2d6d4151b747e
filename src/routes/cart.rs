use axum::{
    routing::{get, put},
    Router,
};
use crate::state::AppState;
use crate::handlers::cart;
use crate::middleware::auth::require_auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::get_cart).post(cart::add_item).delete(cart::clear_cart))
        .route("/cart/{item}", put(cart::update_item).delete(cart::remove_item))
        .route_layer(axum::middleware::from_fn(require_auth))
}

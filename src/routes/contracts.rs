use axum::{
    routing::{get, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::contract;
use crate::middleware::auth::{require_admin, require_auth};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/contracts", get(contract::list_contracts).post(contract::create_contract))
        .route(
            "/admin/contracts/{id}",
            get(contract::get_contract)
                .put(contract::update_contract)
                .delete(contract::delete_contract),
        )
        .route("/admin/contracts/{id}/payments", post(contract::add_payment))
        .route("/admin/contracts/{id}/extend", post(contract::extend_contract))
        .route_layer(axum::middleware::from_fn(require_admin))
        .route_layer(axum::middleware::from_fn(require_auth))
}

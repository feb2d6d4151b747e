use axum::{
    routing::{get, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::{report, sale};
use crate::middleware::auth::{require_admin, require_auth};

pub fn routes() -> Router<AppState> {
    Router::new()
        // GET is the unified transaction report, POST the transactional sale path
        .route("/admin/sales", get(report::list_transactions).post(sale::create_sale))
        .route("/admin/sales/lookup", post(sale::lookup_barcode))
        .route("/admin/sales/{id}", get(sale::get_sale))
        .route_layer(axum::middleware::from_fn(require_admin))
        .route_layer(axum::middleware::from_fn(require_auth))
}

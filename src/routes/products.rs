use axum::{
    routing::get,
    Router,
};
use crate::state::AppState;
use crate::handlers::product;
use crate::middleware::auth::{require_admin, require_auth};

pub fn routes() -> Router<AppState> {
    // Public catalog listing; everything else is admin-only.
    let public = Router::new().route("/products", get(product::get_products));

    let admin = Router::new()
        .route(
            "/admin/products",
            get(product::get_products).post(product::create_product),
        )
        .route(
            "/admin/products/{id}",
            get(product::get_product)
                .put(product::update_product)
                .delete(product::delete_product),
        )
        .route("/admin/products/generate-barcode", get(product::generate_barcode))
        .route("/admin/products/check/{barcode}", get(product::check_barcode))
        .route_layer(axum::middleware::from_fn(require_admin))
        .route_layer(axum::middleware::from_fn(require_auth));

    public.merge(admin)
}

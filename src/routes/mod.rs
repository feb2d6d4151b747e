pub mod products;
pub mod sales;
pub mod contracts;
pub mod cart;
pub mod notifications;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(products::routes())
        .merge(sales::routes())
        .merge(contracts::routes())
        .merge(cart::routes())
        .merge(notifications::routes())
}

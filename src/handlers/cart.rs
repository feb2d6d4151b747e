// src/handlers/cart.rs
use axum::{extract::{Path, State}, Extension, Json};
use sqlx::PgPool;
use std::collections::HashMap;

use crate::dtos::cart::{AddCartItemRequest, CartItemResponse, CartResponse, UpdateCartItemRequest};
use crate::dtos::product::ProductResponse;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::cart::Cart;
use crate::models::product::Product;
use crate::state::AppState;

async fn find_or_create_cart(db_pool: &PgPool, user_id: i64) -> Result<Cart, AppError> {
    // The no-op DO UPDATE makes the insert return the existing row too.
    let cart = sqlx::query_as::<_, Cart>(
        "INSERT INTO carts (user_id) VALUES ($1)
         ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
         RETURNING id, user_id, created_at",
    )
    .bind(user_id)
    .fetch_one(db_pool)
    .await?;
    Ok(cart)
}

async fn fetch_cart_response(db_pool: &PgPool, cart: Cart) -> Result<CartResponse, AppError> {
    let items = sqlx::query_as::<_, (i64, i64, i32)>(
        "SELECT id, product_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY id",
    )
    .bind(cart.id)
    .fetch_all(db_pool)
    .await?;

    let product_ids: Vec<i64> = items.iter().map(|(_, product_id, _)| *product_id).collect();
    let products = sqlx::query_as::<_, Product>(
        "SELECT id, barcode, name, category, subcategory, brand, description, is_promo, is_combo,
                base_price, markup, price, stock, stock_in_total, stock_out_total, image, variants,
                created_at, updated_at
         FROM products WHERE id = ANY($1)",
    )
    .bind(&product_ids)
    .fetch_all(db_pool)
    .await?;

    let mut by_id: HashMap<i64, ProductResponse> = products
        .into_iter()
        .map(|p| (p.id, ProductResponse::from(p)))
        .collect();

    let item_responses = items
        .into_iter()
        .filter_map(|(id, product_id, quantity)| {
            by_id.remove(&product_id).map(|product| CartItemResponse {
                id,
                product_id,
                quantity,
                product,
            })
        })
        .collect();

    Ok(CartResponse {
        id: cart.id,
        user_id: cart.user_id,
        created_at: cart.created_at,
        items: item_responses,
    })
}

// GET /cart
pub async fn get_cart(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<CartResponse>, AppError> {
    let cart = find_or_create_cart(&db_pool, auth.user_id).await?;
    fetch_cart_response(&db_pool, cart).await.map(Json)
}

// POST /cart - add a line, or merge quantity into an existing one
pub async fn add_item(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddCartItemRequest>,
) -> Result<Json<CartResponse>, AppError> {
    if req.quantity < 1 {
        return Err(AppError::validation("quantity must be at least 1"));
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
    )
    .bind(req.product_id)
    .fetch_one(&db_pool)
    .await?;
    if !exists {
        return Err(AppError::not_found("Product not found"));
    }

    let cart = find_or_create_cart(&db_pool, auth.user_id).await?;

    sqlx::query(
        "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3)
         ON CONFLICT (cart_id, product_id)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(cart.id)
    .bind(req.product_id)
    .bind(req.quantity)
    .execute(&db_pool)
    .await?;

    fetch_cart_response(&db_pool, cart).await.map(Json)
}

// PUT /cart/:item
pub async fn update_item(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(item_id): Path<i64>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<CartResponse>, AppError> {
    if req.quantity < 1 {
        return Err(AppError::validation("quantity must be at least 1"));
    }

    let result = sqlx::query(
        "UPDATE cart_items SET quantity = $1
         WHERE id = $2 AND cart_id = (SELECT id FROM carts WHERE user_id = $3)",
    )
    .bind(req.quantity)
    .bind(item_id)
    .bind(auth.user_id)
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Cart item not found"));
    }

    let cart = find_or_create_cart(&db_pool, auth.user_id).await?;
    fetch_cart_response(&db_pool, cart).await.map(Json)
}

// DELETE /cart/:item
pub async fn remove_item(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(item_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = sqlx::query(
        "DELETE FROM cart_items
         WHERE id = $1 AND cart_id = (SELECT id FROM carts WHERE user_id = $2)",
    )
    .bind(item_id)
    .bind(auth.user_id)
    .execute(&db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Cart item not found"));
    }

    Ok(Json(serde_json::json!({ "message": "Item removed" })))
}

// DELETE /cart
pub async fn clear_cart(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<serde_json::Value>, AppError> {
    sqlx::query(
        "DELETE FROM cart_items
         WHERE cart_id = (SELECT id FROM carts WHERE user_id = $1)",
    )
    .bind(auth.user_id)
    .execute(&db_pool)
    .await?;

    Ok(Json(serde_json::json!({ "message": "Cart cleared" })))
}

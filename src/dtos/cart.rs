// src/dtos/cart.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub product: crate::dtos::product::ProductResponse,
}

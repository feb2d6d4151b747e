// src/dtos/product.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub barcode: String,
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub is_promo: Option<bool>,
    pub is_combo: Option<bool>,
    pub base_price: Decimal,
    pub markup: Option<Decimal>,
    pub price: Decimal,
    pub stock: i32,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub is_promo: Option<bool>,
    pub is_combo: Option<bool>,
    pub base_price: Option<Decimal>,
    pub markup: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductQueryParams {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub barcode: String,
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub is_promo: bool,
    pub is_combo: bool,
    pub base_price: Decimal,
    pub markup: Decimal,
    pub price: Decimal,
    pub stock: i32,
    pub stock_in_total: i32,
    pub stock_out_total: i32,
    pub image: Option<String>,
    pub variants: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BarcodeCheckResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductResponse>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedBarcodeResponse {
    pub barcode: String,
}

// Convert from Model to Response DTO
impl From<crate::models::product::Product> for ProductResponse {
    fn from(product: crate::models::product::Product) -> Self {
        Self {
            id: product.id,
            barcode: product.barcode,
            name: product.name,
            category: product.category,
            subcategory: product.subcategory,
            brand: product.brand,
            description: product.description,
            is_promo: product.is_promo,
            is_combo: product.is_combo,
            base_price: product.base_price,
            markup: product.markup,
            price: product.price,
            stock: product.stock,
            stock_in_total: product.stock_in_total,
            stock_out_total: product.stock_out_total,
            image: product.image,
            variants: product.variants,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

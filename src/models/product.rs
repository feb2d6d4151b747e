use sqlx::FromRow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, FromRow)]
pub struct Product {
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

/// Variant pivot row joined with its attribute/value names, as returned by
/// the POS lookup.
#[derive(Debug, FromRow)]
pub struct VariantPivot {
    pub id: i64,
    pub attribute_name: String,
    pub value_name: String,
    pub price_delta: Decimal,
    pub stock: i32,
}

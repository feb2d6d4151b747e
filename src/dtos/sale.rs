// src/dtos/sale.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub items: Vec<SaleItemRequest>,
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaleItemRequest {
    pub product_id: i64,
    pub quantity: i32,
    // Arrives either as a JSON array or as a JSON-encoded string; normalized
    // via parse_variants before any business logic runs.
    pub variants: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct BarcodeLookupRequest {
    pub barcode: String,
}

/// One selected variant dimension, e.g. option "Color" / value "Rojo".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSelection {
    pub option: String,
    pub value: String,
    #[serde(rename = "priceDelta", alias = "price_delta", default)]
    pub price_delta: Decimal,
}

/// Normalizes the loose `variants` input into a typed list. The frontend
/// sometimes sends the array JSON-encoded as a string; anything that fails
/// to parse counts as "no variants selected" rather than aborting the sale.
pub fn parse_variants(input: Option<&serde_json::Value>) -> Vec<VariantSelection> {
    let value = match input {
        Some(v) => v,
        None => return Vec::new(),
    };

    let parsed = match value {
        serde_json::Value::String(s) => match serde_json::from_str::<serde_json::Value>(s) {
            Ok(inner) => serde_json::from_value::<Vec<VariantSelection>>(inner),
            Err(_) => return Vec::new(),
        },
        serde_json::Value::Array(_) => serde_json::from_value(value.clone()),
        _ => return Vec::new(),
    };

    parsed.unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub id: i64,
    pub user_id: i64,
    pub total: Decimal,
    pub payment_method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SaleItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct SaleItemResponse {
    pub id: i64,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub variants: Option<serde_json::Value>,
}

/// POS lookup result: the product plus its variant pivots with live stock.
#[derive(Debug, Serialize)]
pub struct LookupProductResponse {
    #[serde(flatten)]
    pub product: crate::dtos::product::ProductResponse,
    pub attribute_values: Vec<LookupVariantResponse>,
}

#[derive(Debug, Serialize)]
pub struct LookupVariantResponse {
    pub option: String,
    pub value: String,
    pub price_delta: Decimal,
    pub stock: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_structured_variant_array() {
        let input = json!([
            { "option": "Color", "value": "Rojo", "priceDelta": "5.00" },
            { "option": "Talla", "value": "M" }
        ]);
        let parsed = parse_variants(Some(&input));
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].option, "Color");
        assert_eq!(parsed[0].price_delta, Decimal::new(500, 2));
        assert_eq!(parsed[1].price_delta, Decimal::ZERO);
    }

    #[test]
    fn parses_json_encoded_string() {
        let input = json!(r#"[{"option":"Color","value":"Azul","priceDelta":"-1.50"}]"#);
        let parsed = parse_variants(Some(&input));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].value, "Azul");
        assert_eq!(parsed[0].price_delta, Decimal::new(-150, 2));
    }

    #[test]
    fn garbage_degrades_to_no_variants() {
        assert!(parse_variants(Some(&json!("not json at all"))).is_empty());
        assert!(parse_variants(Some(&json!(42))).is_empty());
        assert!(parse_variants(Some(&json!({ "option": "Color" }))).is_empty());
        assert!(parse_variants(None).is_empty());
    }
}

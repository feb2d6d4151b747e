// src/handlers/sale.rs
use axum::{extract::State, Json, Extension};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::state::AppState;
use crate::error::AppError;
use crate::dtos::product::ProductResponse;
use crate::dtos::sale::{
    parse_variants, BarcodeLookupRequest, CreateSaleRequest, LookupProductResponse,
    LookupVariantResponse, SaleItemResponse, SaleResponse, VariantSelection,
};
use crate::middleware::auth::AuthContext;
use crate::models::product::{Product, VariantPivot};
use crate::models::sale::Sale;

// POST /admin/sales/lookup - barcode scan at the POS. Returns every match;
// the frontend decides whether to show a list or pick one.
pub async fn lookup_barcode(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(req): Json<BarcodeLookupRequest>,
) -> Result<Json<Vec<LookupProductResponse>>, AppError> {
    if req.barcode.trim().is_empty() {
        return Err(AppError::validation("barcode is required"));
    }

    let products = sqlx::query_as::<_, Product>(
        "SELECT id, barcode, name, category, subcategory, brand, description, is_promo, is_combo,
                base_price, markup, price, stock, stock_in_total, stock_out_total, image, variants,
                created_at, updated_at
         FROM products WHERE barcode = $1",
    )
    .bind(&req.barcode)
    .fetch_all(&db_pool)
    .await?;

    if products.is_empty() {
        return Err(AppError::not_found("Product not found"));
    }

    let mut results = Vec::with_capacity(products.len());
    for product in products {
        let pivots = sqlx::query_as::<_, VariantPivot>(
            "SELECT pav.id, a.name AS attribute_name, av.name AS value_name,
                    pav.price_delta, pav.stock
             FROM product_attribute_values pav
             JOIN attribute_values av ON pav.attribute_value_id = av.id
             JOIN attributes a ON av.attribute_id = a.id
             WHERE pav.product_id = $1
             ORDER BY a.name, av.name",
        )
        .bind(product.id)
        .fetch_all(&db_pool)
        .await?;

        results.push(LookupProductResponse {
            product: ProductResponse::from(product),
            attribute_values: pivots
                .into_iter()
                .map(|p| LookupVariantResponse {
                    option: p.attribute_name,
                    value: p.value_name,
                    price_delta: p.price_delta,
                    stock: p.stock,
                })
                .collect(),
        });
    }

    Ok(Json(results))
}

/// Unit-price contribution of one variant selection. A matching pivot row is
/// authoritative for the delta and must cover the quantity; without one the
/// selection is informational, priced off the client-supplied delta. Deltas
/// may be negative (discounted variants) and are never clamped.
fn selection_price_delta(
    pivot: Option<(i32, Decimal)>,
    selection: &VariantSelection,
    quantity: i32,
) -> Result<Decimal, AppError> {
    match pivot {
        Some((stock, delta)) => {
            if stock < quantity {
                return Err(AppError::validation(format!(
                    "Insufficient stock for variant {}. Available: {stock}",
                    selection.value
                )));
            }
            Ok(delta)
        }
        None => Ok(selection.price_delta),
    }
}

// POST /admin/sales - the transactional sale path. Stock checks, variant
// decrements, product decrements, the audit row, and the sale itself are
// all-or-nothing: any failure rolls the whole request back.
pub async fn create_sale(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    if req.items.is_empty() {
        return Err(AppError::validation("Sale must contain at least one item"));
    }
    match req.payment_method.as_str() {
        "cash" | "card" | "transfer" => {}
        _ => return Err(AppError::validation("payment_method must be cash, card or transfer")),
    }

    let mut tx = db_pool.begin().await?;

    let mut total = Decimal::ZERO;
    // (product_id, product_name, quantity, unit_price, subtotal, variants)
    let mut items_data: Vec<(i64, String, i32, Decimal, Decimal, Option<serde_json::Value>)> =
        Vec::with_capacity(req.items.len());

    for item in &req.items {
        if item.quantity < 1 {
            return Err(AppError::validation("Quantity must be at least 1"));
        }

        // Row lock so concurrent sales on the same product serialize here.
        let product = sqlx::query_as::<_, (i64, String, Decimal, i32)>(
            "SELECT id, name, price, stock FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(item.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {} not found", item.product_id)))?;

        let (product_id, product_name, price, stock) = product;

        if stock < item.quantity {
            return Err(AppError::validation(format!(
                "Insufficient stock for {product_name}. Available: {stock}"
            )));
        }

        let mut unit_price = price;
        let selections = parse_variants(item.variants.as_ref());

        for selection in &selections {
            let pivot = sqlx::query_as::<_, (i64, i32, Decimal)>(
                "SELECT pav.id, pav.stock, pav.price_delta
                 FROM product_attribute_values pav
                 JOIN attribute_values av ON pav.attribute_value_id = av.id
                 JOIN attributes a ON av.attribute_id = a.id
                 WHERE pav.product_id = $1 AND a.name = $2 AND av.name = $3
                 FOR UPDATE",
            )
            .bind(product_id)
            .bind(&selection.option)
            .bind(&selection.value)
            .fetch_optional(&mut *tx)
            .await?;

            unit_price += selection_price_delta(
                pivot.map(|(_, stock, delta)| (stock, delta)),
                selection,
                item.quantity,
            )?;

            // Only pivot-backed variants carry their own stock dimension.
            if let Some((pivot_id, _, _)) = pivot {
                let updated = sqlx::query(
                    "UPDATE product_attribute_values
                     SET stock = stock - $1, stock_out_total = stock_out_total + $1
                     WHERE id = $2 AND stock >= $1",
                )
                .bind(item.quantity)
                .bind(pivot_id)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    return Err(AppError::validation(format!(
                        "Insufficient stock for variant {}",
                        selection.value
                    )));
                }
            }
        }

        let subtotal = unit_price * Decimal::from(item.quantity);
        total += subtotal;

        let updated = sqlx::query(
            "UPDATE products
             SET stock = stock - $1, stock_out_total = stock_out_total + $1, updated_at = NOW()
             WHERE id = $2 AND stock >= $1",
        )
        .bind(item.quantity)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::validation(format!(
                "Insufficient stock for {product_name}"
            )));
        }

        let variants_json = if selections.is_empty() {
            None
        } else {
            Some(serde_json::to_value(&selections).map_err(|e| AppError::internal(e.to_string()))?)
        };

        sqlx::query(
            "INSERT INTO stock_movements (product_id, type, quantity, variants)
             VALUES ($1, 'out', $2, $3)",
        )
        .bind(product_id)
        .bind(item.quantity)
        .bind(&variants_json)
        .execute(&mut *tx)
        .await?;

        items_data.push((product_id, product_name, item.quantity, unit_price, subtotal, variants_json));
    }

    let sale = sqlx::query_as::<_, Sale>(
        "INSERT INTO sales (user_id, total, payment_method, notes)
         VALUES ($1, $2, $3, $4)
         RETURNING id, user_id, total, payment_method, notes, created_at",
    )
    .bind(auth.user_id)
    .bind(total)
    .bind(&req.payment_method)
    .bind(&req.notes)
    .fetch_one(&mut *tx)
    .await?;

    let mut item_responses = Vec::with_capacity(items_data.len());
    for (product_id, product_name, quantity, unit_price, subtotal, variants) in items_data {
        let item_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, subtotal, variants)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(sale.id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(subtotal)
        .bind(&variants)
        .fetch_one(&mut *tx)
        .await?;

        item_responses.push(SaleItemResponse {
            id: item_id,
            product_id: Some(product_id),
            product_name: Some(product_name),
            quantity,
            unit_price,
            subtotal,
            variants,
        });
    }

    tx.commit().await?;

    tracing::info!(sale_id = sale.id, user_id = auth.user_id, %total, "Sale recorded");

    Ok((
        StatusCode::CREATED,
        Json(SaleResponse {
            id: sale.id,
            user_id: sale.user_id,
            total: sale.total,
            payment_method: sale.payment_method,
            notes: sale.notes,
            created_at: sale.created_at,
            items: item_responses,
        }),
    ))
}

// GET /admin/sales/:id
pub async fn get_sale(
    State(AppState { db_pool, .. }): State<AppState>,
    axum::extract::Path(id): axum::extract::Path<i64>,
) -> Result<Json<SaleResponse>, AppError> {
    fetch_sale_by_id(&db_pool, id).await.map(Json)
}

async fn fetch_sale_by_id(db_pool: &PgPool, id: i64) -> Result<SaleResponse, AppError> {
    let sale = sqlx::query_as::<_, Sale>(
        "SELECT id, user_id, total, payment_method, notes, created_at FROM sales WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Sale not found"))?;

    let items = sqlx::query_as::<_, (i64, Option<i64>, Option<String>, i32, Decimal, Decimal, Option<serde_json::Value>)>(
        "SELECT si.id, si.product_id, p.name, si.quantity, si.unit_price, si.subtotal, si.variants
         FROM sale_items si
         LEFT JOIN products p ON si.product_id = p.id
         WHERE si.sale_id = $1
         ORDER BY si.id",
    )
    .bind(id)
    .fetch_all(db_pool)
    .await?;

    Ok(SaleResponse {
        id: sale.id,
        user_id: sale.user_id,
        total: sale.total,
        payment_method: sale.payment_method,
        notes: sale.notes,
        created_at: sale.created_at,
        items: items
            .into_iter()
            .map(|(item_id, product_id, product_name, quantity, unit_price, subtotal, variants)| {
                SaleItemResponse {
                    id: item_id,
                    product_id,
                    product_name,
                    quantity,
                    unit_price,
                    subtotal,
                    variants,
                }
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn selection(option: &str, value: &str, delta: Decimal) -> VariantSelection {
        VariantSelection {
            option: option.to_string(),
            value: value.to_string(),
            price_delta: delta,
        }
    }

    #[test]
    fn pivot_delta_overrides_client_delta() {
        // Client claims 99.00, the pivot says 2.50; the pivot wins.
        let sel = selection("Color", "Rojo", d(9900));
        let delta = selection_price_delta(Some((10, d(250))), &sel, 2).unwrap();
        assert_eq!(delta, d(250));
    }

    #[test]
    fn missing_pivot_falls_back_to_client_delta() {
        let sel = selection("Talla", "M", d(150));
        assert_eq!(selection_price_delta(None, &sel, 1).unwrap(), d(150));
    }

    #[test]
    fn negative_deltas_discount_unclamped() {
        let sel = selection("Color", "Azul", d(-500));
        assert_eq!(selection_price_delta(None, &sel, 1).unwrap(), d(-500));
        assert_eq!(selection_price_delta(Some((5, d(-300))), &sel, 1).unwrap(), d(-300));
    }

    #[test]
    fn pivot_stock_must_cover_quantity() {
        let sel = selection("Color", "Rojo", Decimal::ZERO);
        let err = selection_price_delta(Some((1, d(100))), &sel, 2);
        assert!(matches!(err, Err(AppError::ValidationError(_))));
    }
}

// src/handlers/product.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rand::Rng;
use sqlx::Error as SqlxError;
use crate::dtos::product::{
    BarcodeCheckResponse, CreateProductRequest, GeneratedBarcodeResponse, ProductQueryParams,
    ProductResponse, UpdateProductRequest,
};
use crate::models::product::Product;
use crate::state::AppState;
use crate::error::AppError;
use tracing::{instrument, warn};

const PRODUCT_COLUMNS: &str = "id, barcode, name, category, subcategory, brand, description, \
     is_promo, is_combo, base_price, markup, price, stock, stock_in_total, stock_out_total, \
     image, variants, created_at, updated_at";

fn map_unique_violation(err: SqlxError, message: &str) -> AppError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::conflict(message)
        }
        other => other.into(),
    }
}

fn validate_category(category: &str) -> Result<(), AppError> {
    match category {
        "telas" | "perfumeria" => Ok(()),
        _ => Err(AppError::validation("category must be 'telas' or 'perfumeria'")),
    }
}

/// 12-digit zero-padded numeric barcode.
fn format_barcode(n: u64) -> String {
    format!("{n:012}")
}

// GET /products - public catalog, optionally filtered by category
#[instrument(skip(state))]
pub async fn get_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQueryParams>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = if let Some(category) = params.category {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = $1 ORDER BY created_at DESC"
        ))
        .bind(category)
        .fetch_all(&state.db_pool)
        .await?
    } else {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"
        ))
        .fetch_all(&state.db_pool)
        .await?
    };

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

// GET /admin/products/:id
#[instrument(skip(state), fields(id))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /admin/products
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    validate_category(&payload.category)?;
    if payload.stock < 0 {
        return Err(AppError::validation("stock must be >= 0"));
    }

    let product = sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO products
           (barcode, name, category, subcategory, brand, description, is_promo, is_combo,
            base_price, markup, price, stock, stock_in_total, image)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12, $13)
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&payload.barcode)
    .bind(&payload.name)
    .bind(&payload.category)
    .bind(&payload.subcategory)
    .bind(&payload.brand)
    .bind(&payload.description)
    .bind(payload.is_promo.unwrap_or(false))
    .bind(payload.is_combo.unwrap_or(false))
    .bind(payload.base_price)
    .bind(payload.markup.unwrap_or_default())
    .bind(payload.price)
    .bind(payload.stock)
    .bind(&payload.image)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Barcode already exists"))?;

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /admin/products/:id
#[instrument(skip(state, payload), fields(id))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    if let Some(category) = &payload.category {
        validate_category(category)?;
    }

    let old_image = sqlx::query_scalar::<_, Option<String>>(
        "SELECT image FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    let product = sqlx::query_as::<_, Product>(&format!(
        "UPDATE products SET
           barcode = COALESCE($1, barcode),
           name = COALESCE($2, name),
           category = COALESCE($3, category),
           subcategory = COALESCE($4, subcategory),
           brand = COALESCE($5, brand),
           description = COALESCE($6, description),
           is_promo = COALESCE($7, is_promo),
           is_combo = COALESCE($8, is_combo),
           base_price = COALESCE($9, base_price),
           markup = COALESCE($10, markup),
           price = COALESCE($11, price),
           stock = COALESCE($12, stock),
           image = COALESCE($13, image),
           updated_at = NOW()
         WHERE id = $14
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&payload.barcode)
    .bind(&payload.name)
    .bind(&payload.category)
    .bind(&payload.subcategory)
    .bind(&payload.brand)
    .bind(&payload.description)
    .bind(payload.is_promo)
    .bind(payload.is_combo)
    .bind(payload.base_price)
    .bind(payload.markup)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(&payload.image)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Barcode already exists"))?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    // Old image is gone once a replacement landed; deletion is best-effort.
    if payload.image.is_some() {
        if let Some(old) = old_image {
            if Some(&old) != payload.image.as_ref() {
                if let Err(e) = state.images.delete(&old).await {
                    warn!(%old, %e, "Failed to delete replaced product image");
                }
            }
        }
    }

    Ok(Json(ProductResponse::from(product)))
}

// DELETE /admin/products/:id
#[instrument(skip(state), fields(id))]
pub async fn delete_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let image = sqlx::query_scalar::<_, Option<String>>(
        "DELETE FROM products WHERE id = $1 RETURNING image",
    )
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    if let Some(path) = image {
        if let Err(e) = state.images.delete(&path).await {
            warn!(%path, %e, "Failed to delete product image");
        }
    }

    Ok(Json(serde_json::json!({ "message": "Product deleted" })))
}

// GET /admin/products/check/:barcode
pub async fn check_barcode(
    Path(barcode): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BarcodeCheckResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = $1"
    ))
    .bind(&barcode)
    .fetch_optional(&state.db_pool)
    .await?;

    Ok(Json(BarcodeCheckResponse {
        exists: product.is_some(),
        product: product.map(ProductResponse::from),
    }))
}

// GET /admin/products/generate-barcode
pub async fn generate_barcode(
    State(state): State<AppState>,
) -> Result<Json<GeneratedBarcodeResponse>, AppError> {
    loop {
        let candidate = format_barcode(rand::thread_rng().gen_range(0..=999_999_999_999u64));

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE barcode = $1)",
        )
        .bind(&candidate)
        .fetch_one(&state.db_pool)
        .await?;

        if !exists {
            return Ok(Json(GeneratedBarcodeResponse { barcode: candidate }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcodes_are_twelve_zero_padded_digits() {
        assert_eq!(format_barcode(0), "000000000000");
        assert_eq!(format_barcode(42), "000000000042");
        assert_eq!(format_barcode(999_999_999_999), "999999999999");
        assert!(format_barcode(7).chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn category_validation_accepts_known_categories_only() {
        assert!(validate_category("telas").is_ok());
        assert!(validate_category("perfumeria").is_ok());
        assert!(validate_category("jugueteria").is_err());
    }
}

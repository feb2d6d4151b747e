// src/handlers/contract.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{error, info, instrument};

use crate::dtos::contract::{
    AddPaymentRequest, AdditionalCost, ContractPaymentResponse, ContractResponse,
    CreateContractRequest, ExtendContractRequest, UpdateContractRequest,
};
use crate::error::AppError;
use crate::models::contract::{Contract, ContractPayment};
use crate::state::AppState;

const CONTRACT_COLUMNS: &str = "id, company_name, contact_person, phone, email, description, \
     quantity, unit_price, total, delivery_date, status, notes, additional_costs, \
     created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, contract_id, amount, payment_date, payment_method, notes, created_at";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContractStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Delivered,
}

impl ContractStatus {
    fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "delivered" => Ok(Self::Delivered),
            _ => Err(AppError::validation(
                "status must be pending, in_progress, completed, cancelled or delivered",
            )),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Delivered => "delivered",
        }
    }
}

/// quantity x unit_price plus itemized extra costs.
fn compute_total(quantity: i32, unit_price: Decimal, additional_costs: &[AdditionalCost]) -> Decimal {
    let costs: Decimal = additional_costs.iter().map(|c| c.amount).sum();
    Decimal::from(quantity) * unit_price + costs
}

/// The one guarded transition of the contract state machine: entering
/// `delivered` settles the unpaid balance. Uses the pre-update payment sum
/// against the post-update total; already-delivered contracts are a no-op.
fn settlement_due(
    current: ContractStatus,
    incoming: ContractStatus,
    total: Decimal,
    already_paid: Decimal,
) -> Option<Decimal> {
    if incoming != ContractStatus::Delivered || current == ContractStatus::Delivered {
        return None;
    }
    let remaining = total - already_paid;
    (remaining > Decimal::ZERO).then_some(remaining)
}

fn validate_payment_method(method: &str) -> Result<(), AppError> {
    match method {
        "cash" | "card" | "transfer" => Ok(()),
        _ => Err(AppError::validation("payment_method must be cash, card or transfer")),
    }
}

fn parse_costs(value: Option<serde_json::Value>) -> Vec<AdditionalCost> {
    value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn to_response(contract: Contract, payments: Vec<ContractPayment>) -> ContractResponse {
    ContractResponse {
        id: contract.id,
        company_name: contract.company_name,
        contact_person: contract.contact_person,
        phone: contract.phone,
        email: contract.email,
        description: contract.description,
        quantity: contract.quantity,
        unit_price: contract.unit_price,
        total: contract.total,
        delivery_date: contract.delivery_date,
        status: contract.status,
        notes: contract.notes,
        additional_costs: parse_costs(contract.additional_costs),
        created_at: contract.created_at,
        updated_at: contract.updated_at,
        payments: payments.into_iter().map(ContractPaymentResponse::from).collect(),
    }
}

async fn fetch_contract_response(db_pool: &PgPool, id: i64) -> Result<ContractResponse, AppError> {
    let contract = sqlx::query_as::<_, Contract>(&format!(
        "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Contract not found"))?;

    let payments = sqlx::query_as::<_, ContractPayment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM contract_payments WHERE contract_id = $1 ORDER BY payment_date"
    ))
    .bind(id)
    .fetch_all(db_pool)
    .await?;

    Ok(to_response(contract, payments))
}

// GET /admin/contracts - closest delivery first, payments embedded
pub async fn list_contracts(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<ContractResponse>>, AppError> {
    let contracts = sqlx::query_as::<_, Contract>(&format!(
        "SELECT {CONTRACT_COLUMNS} FROM contracts ORDER BY delivery_date ASC"
    ))
    .fetch_all(&db_pool)
    .await?;

    let payments = sqlx::query_as::<_, ContractPayment>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM contract_payments ORDER BY payment_date"
    ))
    .fetch_all(&db_pool)
    .await?;

    let mut by_contract: HashMap<i64, Vec<ContractPayment>> = HashMap::new();
    for payment in payments {
        by_contract.entry(payment.contract_id).or_default().push(payment);
    }

    Ok(Json(
        contracts
            .into_iter()
            .map(|c| {
                let payments = by_contract.remove(&c.id).unwrap_or_default();
                to_response(c, payments)
            })
            .collect(),
    ))
}

// GET /admin/contracts/:id
pub async fn get_contract(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ContractResponse>, AppError> {
    fetch_contract_response(&db_pool, id).await.map(Json)
}

// POST /admin/contracts
#[instrument(skip(state, payload))]
pub async fn create_contract(
    State(state): State<AppState>,
    Json(payload): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<ContractResponse>), AppError> {
    if payload.quantity < 1 {
        return Err(AppError::validation("quantity must be at least 1"));
    }
    if payload.unit_price < Decimal::ZERO {
        return Err(AppError::validation("unit_price cannot be negative"));
    }
    let costs = payload.additional_costs.unwrap_or_default();
    if costs.iter().any(|c| c.amount < Decimal::ZERO) {
        return Err(AppError::validation("additional cost amounts cannot be negative"));
    }

    let total = compute_total(payload.quantity, payload.unit_price, &costs);
    let costs_json =
        serde_json::to_value(&costs).map_err(|e| AppError::internal(e.to_string()))?;

    let mut tx = state.db_pool.begin().await?;

    let contract = sqlx::query_as::<_, Contract>(&format!(
        "INSERT INTO contracts
           (company_name, contact_person, phone, email, description, quantity, unit_price,
            total, delivery_date, status, notes, additional_costs)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $11)
         RETURNING {CONTRACT_COLUMNS}"
    ))
    .bind(&payload.company_name)
    .bind(&payload.contact_person)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(&payload.description)
    .bind(payload.quantity)
    .bind(payload.unit_price)
    .bind(total)
    .bind(payload.delivery_date)
    .bind(&payload.notes)
    .bind(&costs_json)
    .fetch_one(&mut *tx)
    .await?;

    // "Paid in full" at creation records the payment; the status stays
    // pending until someone changes it.
    if payload.is_paid.unwrap_or(false) {
        sqlx::query(
            "INSERT INTO contract_payments (contract_id, amount, payment_method, notes)
             VALUES ($1, $2, 'cash', 'Initial full payment')",
        )
        .bind(contract.id)
        .bind(contract.total)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let response = fetch_contract_response(&state.db_pool, contract.id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// PUT /admin/contracts/:id
#[instrument(skip(state, payload), fields(id))]
pub async fn update_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateContractRequest>,
) -> Result<Json<ContractResponse>, AppError> {
    if let Some(quantity) = payload.quantity {
        if quantity < 1 {
            return Err(AppError::validation("quantity must be at least 1"));
        }
    }
    if payload.unit_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(AppError::validation("unit_price cannot be negative"));
    }
    if let Some(method) = &payload.payment_method {
        validate_payment_method(method)?;
    }

    let mut tx = state.db_pool.begin().await?;

    let contract = sqlx::query_as::<_, Contract>(&format!(
        "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found("Contract not found"))?;

    let current_status = ContractStatus::parse(&contract.status)?;
    let incoming_status = match &payload.status {
        Some(raw) => ContractStatus::parse(raw)?,
        None => current_status,
    };

    // Total is recomputed from the merged (incoming-else-stored) fields
    // whenever any pricing input changes.
    let pricing_changed = payload.quantity.is_some()
        || payload.unit_price.is_some()
        || payload.additional_costs.is_some();

    let merged_costs = match &payload.additional_costs {
        Some(costs) => costs.clone(),
        None => parse_costs(contract.additional_costs.clone()),
    };
    if merged_costs.iter().any(|c| c.amount < Decimal::ZERO) {
        return Err(AppError::validation("additional cost amounts cannot be negative"));
    }

    let new_total = if pricing_changed {
        compute_total(
            payload.quantity.unwrap_or(contract.quantity),
            payload.unit_price.unwrap_or(contract.unit_price),
            &merged_costs,
        )
    } else {
        contract.total
    };

    // Pre-update payment sum against the post-update total.
    let already_paid = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM contract_payments WHERE contract_id = $1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(remaining) = settlement_due(current_status, incoming_status, new_total, already_paid) {
        let method = payload.payment_method.as_deref().unwrap_or("cash");
        sqlx::query(
            "INSERT INTO contract_payments (contract_id, amount, payment_method, notes)
             VALUES ($1, $2, $3, 'Automatic settlement on delivery')",
        )
        .bind(id)
        .bind(remaining)
        .bind(method)
        .execute(&mut *tx)
        .await?;
        info!(contract_id = id, %remaining, "Auto-settled remaining balance on delivery");
    }

    let costs_json = serde_json::to_value(&merged_costs)
        .map_err(|e| AppError::internal(e.to_string()))?;

    sqlx::query(
        "UPDATE contracts SET
           company_name = COALESCE($1, company_name),
           contact_person = COALESCE($2, contact_person),
           phone = COALESCE($3, phone),
           email = COALESCE($4, email),
           description = COALESCE($5, description),
           quantity = COALESCE($6, quantity),
           unit_price = COALESCE($7, unit_price),
           delivery_date = COALESCE($8, delivery_date),
           status = $9,
           notes = COALESCE($10, notes),
           additional_costs = $11,
           total = $12,
           updated_at = NOW()
         WHERE id = $13",
    )
    .bind(&payload.company_name)
    .bind(&payload.contact_person)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(&payload.description)
    .bind(payload.quantity)
    .bind(payload.unit_price)
    .bind(payload.delivery_date)
    .bind(incoming_status.as_str())
    .bind(&payload.notes)
    .bind(&costs_json)
    .bind(new_total)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    fetch_contract_response(&state.db_pool, id).await.map(Json)
}

// POST /admin/contracts/:id/payments - append-only installments
pub async fn add_payment(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AddPaymentRequest>,
) -> Result<(StatusCode, Json<ContractResponse>), AppError> {
    if payload.amount <= Decimal::ZERO {
        return Err(AppError::validation("Payment amount must be greater than 0"));
    }
    validate_payment_method(&payload.payment_method)?;

    let mut tx = db_pool.begin().await?;

    // Lock the contract row so a concurrent delete cannot slip between the
    // existence check and the insert.
    sqlx::query_scalar::<_, i64>("SELECT id FROM contracts WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Contract not found"))?;

    sqlx::query(
        "INSERT INTO contract_payments (contract_id, amount, payment_date, payment_method, notes)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(payload.amount)
    .bind(payload.payment_date.unwrap_or_else(Utc::now))
    .bind(&payload.payment_method)
    .bind(&payload.notes)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let response = fetch_contract_response(&db_pool, id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// DELETE /admin/contracts/:id - payments cascade with the contract
pub async fn delete_contract(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
        .bind(id)
        .execute(&db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Contract not found"));
    }

    Ok(Json(serde_json::json!({ "message": "Contract deleted" })))
}

// POST /admin/contracts/:id/extend - push the delivery date and try to
// notify the contact. Email failure is logged, never a request failure.
#[instrument(skip(state, payload), fields(id))]
pub async fn extend_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ExtendContractRequest>,
) -> Result<Json<ContractResponse>, AppError> {
    if payload.new_date <= Utc::now().date_naive() {
        return Err(AppError::validation("new_date must be after today"));
    }

    let result = sqlx::query(
        "UPDATE contracts SET delivery_date = $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(payload.new_date)
    .bind(id)
    .execute(&state.db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Contract not found"));
    }

    let response = fetch_contract_response(&state.db_pool, id).await?;

    match &response.email {
        Some(email) => {
            if let Err(e) = state
                .mailer
                .send_contract_extended(
                    email,
                    &response.company_name,
                    payload.new_date,
                    payload.reason.as_deref(),
                )
                .await
            {
                error!(contract_id = id, %e, "Error sending extension email");
            }
        }
        None => info!(contract_id = id, "No email address for contract, skipping email"),
    }

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn cost(amount: Decimal) -> AdditionalCost {
        AdditionalCost { description: "shipping".to_string(), amount }
    }

    #[test]
    fn total_is_quantity_times_price_plus_costs() {
        // quantity=10, unit_price=5.00, one extra cost of 20.00 -> 70.00
        let total = compute_total(10, d(500), &[cost(d(2000))]);
        assert_eq!(total, d(7000));
    }

    #[test]
    fn total_without_costs() {
        assert_eq!(compute_total(3, d(150), &[]), d(450));
    }

    #[test]
    fn delivery_transition_settles_outstanding_balance() {
        // total=100.00, paid=60.00 -> auto payment of 40.00
        let due = settlement_due(
            ContractStatus::Pending,
            ContractStatus::Delivered,
            d(10000),
            d(6000),
        );
        assert_eq!(due, Some(d(4000)));
    }

    #[test]
    fn repeated_delivered_transition_is_a_no_op() {
        let due = settlement_due(
            ContractStatus::Delivered,
            ContractStatus::Delivered,
            d(10000),
            d(6000),
        );
        assert_eq!(due, None);
    }

    #[test]
    fn fully_paid_contract_needs_no_settlement() {
        let due = settlement_due(
            ContractStatus::InProgress,
            ContractStatus::Delivered,
            d(10000),
            d(10000),
        );
        assert_eq!(due, None);

        // Overpaid contracts never generate a negative payment.
        let overpaid = settlement_due(
            ContractStatus::InProgress,
            ContractStatus::Delivered,
            d(10000),
            d(12000),
        );
        assert_eq!(overpaid, None);
    }

    #[test]
    fn non_delivery_transitions_never_settle() {
        let due = settlement_due(
            ContractStatus::Pending,
            ContractStatus::Completed,
            d(10000),
            Decimal::ZERO,
        );
        assert_eq!(due, None);
    }

    #[test]
    fn status_parsing_round_trips() {
        for raw in ["pending", "in_progress", "completed", "cancelled", "delivered"] {
            assert_eq!(ContractStatus::parse(raw).unwrap().as_str(), raw);
        }
        assert!(ContractStatus::parse("paid").is_err());
    }
}

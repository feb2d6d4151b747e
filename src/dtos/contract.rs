// src/dtos/contract.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalCost {
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    pub email: Option<String>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub delivery_date: NaiveDate,
    pub notes: Option<String>,
    pub additional_costs: Option<Vec<AdditionalCost>>,
    pub is_paid: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContractRequest {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub delivery_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub notes: Option<String>,
    // Used when the update marks the contract delivered and a settling
    // payment is auto-created.
    pub payment_method: Option<String>,
    pub additional_costs: Option<Vec<AdditionalCost>>,
}

#[derive(Debug, Deserialize)]
pub struct AddPaymentRequest {
    pub amount: Decimal,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExtendContractRequest {
    pub new_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub id: i64,
    pub company_name: String,
    pub contact_person: String,
    pub phone: String,
    pub email: Option<String>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub delivery_date: NaiveDate,
    pub status: String,
    pub notes: Option<String>,
    pub additional_costs: Vec<AdditionalCost>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payments: Vec<ContractPaymentResponse>,
}

#[derive(Debug, Serialize)]
pub struct ContractPaymentResponse {
    pub id: i64,
    pub contract_id: i64,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub payment_method: String,
    pub notes: Option<String>,
}

impl From<crate::models::contract::ContractPayment> for ContractPaymentResponse {
    fn from(p: crate::models::contract::ContractPayment) -> Self {
        Self {
            id: p.id,
            contract_id: p.contract_id,
            amount: p.amount,
            payment_date: p.payment_date,
            payment_method: p.payment_method,
            notes: p.notes,
        }
    }
}

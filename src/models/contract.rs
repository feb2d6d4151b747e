use sqlx::FromRow;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

#[derive(Debug, FromRow)]
pub struct Contract {
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
    pub additional_costs: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct ContractPayment {
    pub id: i64,
    pub contract_id: i64,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub payment_method: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

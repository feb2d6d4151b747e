// src/mailer.rs
//
// Outbound email is an external collaborator; the application only depends
// on this trait. Delivery failures are the caller's problem to log, never to
// surface as request errors.
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_contract_extended(
        &self,
        to: &str,
        company_name: &str,
        new_date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<(), String>;
}

/// Default implementation: logs the would-be email. Swapped for a real
/// transport at deployment.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_contract_extended(
        &self,
        to: &str,
        company_name: &str,
        new_date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<(), String> {
        tracing::info!(%to, %company_name, %new_date, ?reason, "Contract extension email");
        Ok(())
    }
}

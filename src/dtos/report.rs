// src/dtos/report.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Deserialize)]
pub struct ReportQueryParams {
    pub period: Option<String>,
    pub page: Option<u32>,
}

/// Per-category revenue buckets. `telas` is the fallback bucket for lines
/// whose product is gone or whose category is unrecognized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub telas: Decimal,
    pub perfumeria: Decimal,
    pub perfumeria_catalogo: Decimal,
    pub perfumeria_disenador: Decimal,
}

impl CategoryTotals {
    pub fn add_line(&mut self, category: Option<&str>, subcategory: Option<&str>, subtotal: Decimal) {
        if category == Some("perfumeria") {
            self.perfumeria += subtotal;
            match subcategory {
                Some("catalogo") => self.perfumeria_catalogo += subtotal,
                Some("disenador") => self.perfumeria_disenador += subtotal,
                _ => {}
            }
        } else {
            self.telas += subtotal;
        }
    }
}

/// One normalized row of the unified ledger, regardless of source.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub total: Decimal,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_totals: Option<CategoryTotals>,
}

#[derive(Debug, Serialize)]
pub struct ReportStats {
    pub total: Decimal,
    pub pos_total: Decimal,
    pub orders_total: Decimal,
    pub contracts_total: Decimal,
    pub telas: Decimal,
    pub perfumeria: Decimal,
    pub perfumeria_catalogo: Decimal,
    pub perfumeria_disenador: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PaginatedTransactions {
    pub total: usize,
    pub page: u32,
    pub per_page: usize,
    pub data: Vec<TransactionEntry>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub stats: ReportStats,
    pub sales: PaginatedTransactions,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn perfumeria_lines_bucket_with_subcategories() {
        let mut totals = CategoryTotals::default();
        totals.add_line(Some("perfumeria"), Some("catalogo"), d(1000));
        totals.add_line(Some("perfumeria"), Some("disenador"), d(2000));
        totals.add_line(Some("perfumeria"), None, d(500));
        assert_eq!(totals.perfumeria, d(3500));
        assert_eq!(totals.perfumeria_catalogo, d(1000));
        assert_eq!(totals.perfumeria_disenador, d(2000));
        assert_eq!(totals.telas, Decimal::ZERO);
    }

    #[test]
    fn missing_product_and_unknown_category_fall_back_to_telas() {
        let mut totals = CategoryTotals::default();
        totals.add_line(None, None, d(700));
        totals.add_line(Some("jugueteria"), Some("catalogo"), d(300));
        assert_eq!(totals.telas, d(1000));
        assert_eq!(totals.perfumeria, Decimal::ZERO);
    }
}

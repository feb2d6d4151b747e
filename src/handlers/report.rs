// src/handlers/report.rs
//
// The unified transaction ledger: POS sales, completed web orders and
// contract payments merged into one categorized, paginated report.
use axum::{extract::{Query, State}, Json};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::dtos::report::{
    CategoryTotals, PaginatedTransactions, ReportQueryParams, ReportResponse, ReportStats,
    TransactionEntry,
};
use crate::error::AppError;
use crate::models::sale::Sale;
use crate::state::AppState;

pub const PAGE_SIZE: usize = 20;
const DELETED_CONTRACT_PLACEHOLDER: &str = "Deleted contract";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

/// Unknown or absent period values mean "no filter".
fn parse_period(raw: Option<&str>) -> Option<Period> {
    match raw {
        Some("daily") => Some(Period::Daily),
        Some("weekly") => Some(Period::Weekly),
        Some("monthly") => Some(Period::Monthly),
        _ => None,
    }
}

/// Half-open `[start, end)` UTC bounds for the period containing `now`.
/// Weeks start on Monday.
fn period_bounds(period: Period, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let (start_date, end_date) = match period {
        Period::Daily => (today, today + Duration::days(1)),
        Period::Weekly => {
            let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
            (monday, monday + Duration::days(7))
        }
        Period::Monthly => {
            let first = today.with_day(1).unwrap_or(today);
            let next_first = if first.month() == 12 {
                NaiveDate::from_ymd_opt(first.year() + 1, 1, 1).unwrap_or(first)
            } else {
                NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1).unwrap_or(first)
            };
            (first, next_first)
        }
    };
    (
        start_date.and_time(NaiveTime::MIN).and_utc(),
        end_date.and_time(NaiveTime::MIN).and_utc(),
    )
}

fn merge_sort_paginate(
    mut entries: Vec<TransactionEntry>,
    page: u32,
    per_page: usize,
) -> PaginatedTransactions {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = entries.len();
    let page = page.max(1);
    let start = (page as usize - 1).saturating_mul(per_page);
    let data: Vec<TransactionEntry> = entries.into_iter().skip(start).take(per_page).collect();
    PaginatedTransactions { total, page, per_page, data }
}

fn compute_stats(
    pos_total: Decimal,
    orders_total: Decimal,
    contracts_total: Decimal,
    buckets: CategoryTotals,
) -> ReportStats {
    ReportStats {
        total: pos_total + orders_total + contracts_total,
        pos_total,
        orders_total,
        contracts_total,
        telas: buckets.telas,
        perfumeria: buckets.perfumeria,
        perfumeria_catalogo: buckets.perfumeria_catalogo,
        perfumeria_disenador: buckets.perfumeria_disenador,
    }
}

type LineRow = (i64, Decimal, Option<String>, Option<String>);

/// Groups (parent_id, subtotal, category, subcategory) line rows into
/// per-parent buckets, accumulating the global buckets as it goes.
fn bucket_lines(rows: Vec<LineRow>, global: &mut CategoryTotals) -> HashMap<i64, CategoryTotals> {
    let mut per_parent: HashMap<i64, CategoryTotals> = HashMap::new();
    for (parent_id, subtotal, category, subcategory) in rows {
        let totals = per_parent.entry(parent_id).or_default();
        totals.add_line(category.as_deref(), subcategory.as_deref(), subtotal);
        global.add_line(category.as_deref(), subcategory.as_deref(), subtotal);
    }
    per_parent
}

// GET /admin/sales?period=&page=
pub async fn list_transactions(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<ReportQueryParams>,
) -> Result<Json<ReportResponse>, AppError> {
    let bounds = parse_period(params.period.as_deref()).map(|p| period_bounds(p, Utc::now()));
    let page = params.page.unwrap_or(1);

    // --- POS sales ---
    let sales: Vec<Sale> = if let Some((start, end)) = bounds {
        sqlx::query_as(
            "SELECT id, user_id, total, payment_method, notes, created_at
             FROM sales WHERE created_at >= $1 AND created_at < $2
             ORDER BY created_at DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&db_pool)
        .await?
    } else {
        sqlx::query_as(
            "SELECT id, user_id, total, payment_method, notes, created_at
             FROM sales ORDER BY created_at DESC",
        )
        .fetch_all(&db_pool)
        .await?
    };

    let sale_lines: Vec<LineRow> = if let Some((start, end)) = bounds {
        sqlx::query_as(
            "SELECT si.sale_id, si.subtotal, p.category, p.subcategory
             FROM sale_items si
             JOIN sales s ON si.sale_id = s.id
             LEFT JOIN products p ON si.product_id = p.id
             WHERE s.created_at >= $1 AND s.created_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&db_pool)
        .await?
    } else {
        sqlx::query_as(
            "SELECT si.sale_id, si.subtotal, p.category, p.subcategory
             FROM sale_items si
             LEFT JOIN products p ON si.product_id = p.id",
        )
        .fetch_all(&db_pool)
        .await?
    };

    // --- Completed web orders ---
    let orders: Vec<(i64, i64, Decimal, DateTime<Utc>)> = if let Some((start, end)) = bounds {
        sqlx::query_as(
            "SELECT id, user_id, total, created_at
             FROM orders WHERE status = 'completed' AND created_at >= $1 AND created_at < $2
             ORDER BY created_at DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&db_pool)
        .await?
    } else {
        sqlx::query_as(
            "SELECT id, user_id, total, created_at
             FROM orders WHERE status = 'completed' ORDER BY created_at DESC",
        )
        .fetch_all(&db_pool)
        .await?
    };

    let order_lines: Vec<LineRow> = if let Some((start, end)) = bounds {
        sqlx::query_as(
            "SELECT oi.order_id, oi.subtotal, p.category, p.subcategory
             FROM order_items oi
             JOIN orders o ON oi.order_id = o.id
             LEFT JOIN products p ON oi.product_id = p.id
             WHERE o.status = 'completed' AND o.created_at >= $1 AND o.created_at < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&db_pool)
        .await?
    } else {
        sqlx::query_as(
            "SELECT oi.order_id, oi.subtotal, p.category, p.subcategory
             FROM order_items oi
             JOIN orders o ON oi.order_id = o.id
             LEFT JOIN products p ON oi.product_id = p.id
             WHERE o.status = 'completed'",
        )
        .fetch_all(&db_pool)
        .await?
    };

    // --- Contract payments (filtered on payment_date, not created_at) ---
    type PaymentRow = (i64, Decimal, DateTime<Utc>, String, Option<String>, Option<String>, Option<String>);
    let payments: Vec<PaymentRow> = if let Some((start, end)) = bounds {
        sqlx::query_as(
            "SELECT cp.id, cp.amount, cp.payment_date, cp.payment_method, cp.notes,
                    c.company_name, c.contact_person
             FROM contract_payments cp
             LEFT JOIN contracts c ON cp.contract_id = c.id
             WHERE cp.payment_date >= $1 AND cp.payment_date < $2
             ORDER BY cp.payment_date DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&db_pool)
        .await?
    } else {
        sqlx::query_as(
            "SELECT cp.id, cp.amount, cp.payment_date, cp.payment_method, cp.notes,
                    c.company_name, c.contact_person
             FROM contract_payments cp
             LEFT JOIN contracts c ON cp.contract_id = c.id
             ORDER BY cp.payment_date DESC",
        )
        .fetch_all(&db_pool)
        .await?
    };

    // Classify lines into buckets; amounts from contract payments count only
    // toward the source totals, never the category buckets.
    let mut buckets = CategoryTotals::default();
    let mut sale_buckets = bucket_lines(sale_lines, &mut buckets);
    let mut order_buckets = bucket_lines(order_lines, &mut buckets);

    let mut pos_total = Decimal::ZERO;
    let mut orders_total = Decimal::ZERO;
    let mut contracts_total = Decimal::ZERO;

    let mut entries: Vec<TransactionEntry> =
        Vec::with_capacity(sales.len() + orders.len() + payments.len());

    for sale in sales {
        pos_total += sale.total;
        entries.push(TransactionEntry {
            kind: "pos",
            id: sale.id,
            user_id: Some(sale.user_id),
            name: None,
            total: sale.total,
            payment_method: sale.payment_method,
            notes: sale.notes,
            created_at: sale.created_at,
            category_totals: Some(sale_buckets.remove(&sale.id).unwrap_or_default()),
        });
    }

    for (id, user_id, total, created_at) in orders {
        orders_total += total;
        entries.push(TransactionEntry {
            kind: "order",
            id,
            user_id: Some(user_id),
            name: None,
            total,
            payment_method: "web".to_string(),
            notes: None,
            created_at,
            category_totals: Some(order_buckets.remove(&id).unwrap_or_default()),
        });
    }

    for (id, amount, payment_date, payment_method, notes, company, contact) in payments {
        contracts_total += amount;
        let name = match (company, contact) {
            (Some(company), Some(contact)) => format!("{company} ({contact})"),
            _ => DELETED_CONTRACT_PLACEHOLDER.to_string(),
        };
        entries.push(TransactionEntry {
            kind: "contract_payment",
            id,
            user_id: None,
            name: Some(name),
            total: amount,
            payment_method,
            notes,
            created_at: payment_date,
            category_totals: None,
        });
    }

    let stats = compute_stats(pos_total, orders_total, contracts_total, buckets);
    let sales_page = merge_sort_paginate(entries, page, PAGE_SIZE);

    Ok(Json(ReportResponse { stats, sales: sales_page }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: i64, ts: DateTime<Utc>) -> TransactionEntry {
        TransactionEntry {
            kind: "pos",
            id,
            user_id: Some(1),
            name: None,
            total: Decimal::new(100, 2),
            payment_method: "cash".to_string(),
            notes: None,
            created_at: ts,
            category_totals: None,
        }
    }

    #[test]
    fn unknown_period_means_no_filter() {
        assert_eq!(parse_period(Some("daily")), Some(Period::Daily));
        assert_eq!(parse_period(Some("weekly")), Some(Period::Weekly));
        assert_eq!(parse_period(Some("monthly")), Some(Period::Monthly));
        assert_eq!(parse_period(Some("yearly")), None);
        assert_eq!(parse_period(None), None);
    }

    #[test]
    fn daily_bounds_cover_exactly_one_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let (start, end) = period_bounds(Period::Daily, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn weekly_bounds_start_on_monday() {
        // 2026-03-14 is a Saturday; the week starts Monday 2026-03-09.
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let (start, end) = period_bounds(Period::Weekly, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn monthly_bounds_roll_over_december() {
        let now = Utc.with_ymd_and_hms(2026, 12, 20, 12, 0, 0).unwrap();
        let (start, end) = period_bounds(Period::Monthly, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn forty_five_records_paginate_as_20_20_5_without_loss() {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let entries: Vec<TransactionEntry> = (0..45)
            .map(|i| entry(i, base + Duration::minutes(i)))
            .collect();

        let mut seen = Vec::new();
        let mut sizes = Vec::new();
        for page in 1..=3 {
            let result = merge_sort_paginate(entries.clone(), page, PAGE_SIZE);
            assert_eq!(result.total, 45);
            // Each page is sorted descending by timestamp.
            for pair in result.data.windows(2) {
                assert!(pair[0].created_at >= pair[1].created_at);
            }
            sizes.push(result.data.len());
            seen.extend(result.data.iter().map(|e| e.id));
        }

        assert_eq!(sizes, vec![20, 20, 5]);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 45);
    }

    #[test]
    fn page_past_the_end_is_empty_but_keeps_total() {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let entries: Vec<TransactionEntry> = (0..3).map(|i| entry(i, base)).collect();
        let result = merge_sort_paginate(entries, 5, PAGE_SIZE);
        assert_eq!(result.total, 3);
        assert!(result.data.is_empty());
    }

    #[test]
    fn stats_total_is_the_sum_of_the_three_sources() {
        let stats = compute_stats(
            Decimal::new(1050, 2),
            Decimal::new(2000, 2),
            Decimal::new(950, 2),
            CategoryTotals::default(),
        );
        assert_eq!(stats.total, stats.pos_total + stats.orders_total + stats.contracts_total);
        assert_eq!(stats.total, Decimal::new(4000, 2));

        let zero = compute_stats(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, CategoryTotals::default());
        assert_eq!(zero.total, Decimal::ZERO);
    }
}

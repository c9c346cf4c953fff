//! Money calculation utilities using rust_decimal for precision
//!
//! All amounts are integer currency units; ratios (hours, blended
//! costs) are computed with `Decimal` and converted back to `i64` at
//! the end, never with floating point.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use shared::OrderItem;

/// Table time-cost is rounded UP to the nearest increment
const TABLE_COST_INCREMENT: i64 = 1_000;

const SECONDS_PER_HOUR: i64 = 3_600;

/// Time-cost of one table assignment.
///
/// `ceil(duration_hours * hourly_rate / 1000) * 1000` — the bill is
/// rounded up to the nearest 1,000 currency units, including for
/// durations that cost less than one increment. Negative durations
/// clamp to zero.
pub fn table_time_cost(start: DateTime<Utc>, end: DateTime<Utc>, hourly_rate: i64) -> i64 {
    let seconds = (end - start).num_seconds().max(0);
    if seconds == 0 || hourly_rate <= 0 {
        return 0;
    }

    let hours = Decimal::from(seconds) / Decimal::from(SECONDS_PER_HOUR);
    let increments = (hours * Decimal::from(hourly_rate) / Decimal::from(TABLE_COST_INCREMENT))
        .ceil();

    (increments * Decimal::from(TABLE_COST_INCREMENT))
        .to_i64()
        .unwrap_or(i64::MAX)
}

/// Weighted-average unit cost after receiving `quantity` at `unit_cost`.
///
/// `round((stock_before * current_cost + quantity * unit_cost) / stock_after)`
/// with half-up rounding. A non-positive base makes weighting
/// meaningless, so the cost resets to `unit_cost` instead of blending.
pub fn weighted_average_cost(
    stock_before: i64,
    current_cost: i64,
    quantity: i64,
    unit_cost: i64,
) -> i64 {
    if stock_before <= 0 {
        return unit_cost;
    }

    let total_value = Decimal::from(stock_before) * Decimal::from(current_cost)
        + Decimal::from(quantity) * Decimal::from(unit_cost);
    let blended = total_value / Decimal::from(stock_before + quantity);

    blended
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(unit_cost)
}

/// Sum of live line totals.
pub fn order_total(items: &[OrderItem]) -> i64 {
    items.iter().map(OrderItem::line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn span(seconds: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc::now();
        (start, start + Duration::seconds(seconds))
    }

    #[test]
    fn test_exact_hour_has_no_rounding_slack() {
        let (start, end) = span(3600);
        assert_eq!(table_time_cost(start, end, 50_000), 50_000);
    }

    #[test]
    fn test_31_minutes_at_60k() {
        // ceil(31/60 * 60000 / 1000) * 1000 = 31000
        let (start, end) = span(31 * 60);
        assert_eq!(table_time_cost(start, end, 60_000), 31_000);
    }

    #[test]
    fn test_1h25m_at_80k() {
        // ceil(85/60 * 80000 / 1000) * 1000 = 118000
        let (start, end) = span(5_100);
        assert_eq!(table_time_cost(start, end, 80_000), 118_000);
    }

    #[test]
    fn test_sub_increment_duration_rounds_up_to_one_increment() {
        let (start, end) = span(1);
        assert_eq!(table_time_cost(start, end, 50_000), 1_000);
    }

    #[test]
    fn test_zero_duration_bills_nothing() {
        let (start, end) = span(0);
        assert_eq!(table_time_cost(start, end, 50_000), 0);
    }

    #[test]
    fn test_negative_duration_clamps_to_zero() {
        let (start, end) = span(60);
        assert_eq!(table_time_cost(end, start, 50_000), 0);
    }

    #[test]
    fn test_wac_blends_existing_and_received_value() {
        // stock 10 @ 100, receive 10 @ 200 -> (1000 + 2000) / 20 = 150
        assert_eq!(weighted_average_cost(10, 100, 10, 200), 150);
    }

    #[test]
    fn test_wac_rounds_half_up() {
        // (3*100 + 1*102) / 4 = 100.5 -> 101
        assert_eq!(weighted_average_cost(3, 100, 1, 102), 101);
    }

    #[test]
    fn test_wac_resets_on_empty_stock() {
        assert_eq!(weighted_average_cost(0, 500, 10, 200), 200);
    }

    #[test]
    fn test_order_total_sums_line_totals() {
        let items = vec![
            OrderItem {
                product_id: "p1".into(),
                name: "Cola".into(),
                quantity: 2,
                price: 20_000,
                cost: 12_000,
            },
            OrderItem {
                product_id: "p2".into(),
                name: "Snack".into(),
                quantity: 1,
                price: 15_000,
                cost: 9_000,
            },
        ];
        assert_eq!(order_total(&items), 55_000);
    }
}

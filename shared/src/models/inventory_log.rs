//! Inventory Log Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
}

/// Why the stock moved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementReason {
    /// Deducted by an order line
    Sale,
    /// Re-added by an order cancellation
    Restock,
    /// Goods received from a supplier
    Purchase,
    /// Manual correction (stocktake, breakage, ...)
    Adjustment,
}

/// Immutable audit record of one stock movement
///
/// Append-only ledger of truth for stock history; rows are never
/// updated or deleted, only superseded by new rows. `cost` and `price`
/// snapshot the product's unit cost and sale price at movement time
/// (for OUT movements the cost snapshot is the cost-of-goods-sold).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryLog {
    /// Global ledger sequence, strictly increasing
    pub sequence: u64,
    pub product_id: String,
    pub movement: MovementType,
    pub quantity: i64,
    pub reason: MovementReason,
    pub stock_before: i64,
    pub stock_after: i64,
    /// Unit cost snapshot in integer currency units
    pub cost: i64,
    /// Sale price snapshot in integer currency units
    pub price: i64,
    pub operator_id: String,
    pub created_at: DateTime<Utc>,
}

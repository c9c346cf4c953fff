//! Domain events broadcast after commit
//!
//! Events are collected inside the unit of work and published on the
//! manager's broadcast channel only once the transaction has
//! committed, so subscribers never observe state that was rolled back.

use serde::Serialize;
use shared::{MovementType, OrderStatus};

/// Event published by the hall manager
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HallEvent {
    SessionStarted {
        booking_id: String,
        table_ids: Vec<String>,
    },
    TableReleased {
        booking_table_id: String,
        table_id: String,
    },
    SessionCompleted {
        booking_id: String,
        total_amount: i64,
    },
    SessionCancelled {
        booking_id: String,
    },
    SessionsMerged {
        target_booking_id: String,
        source_booking_id: String,
    },
    OrderPlaced {
        order_id: String,
        booking_id: Option<String>,
        total_amount: i64,
    },
    OrderStatusChanged {
        order_id: String,
        status: OrderStatus,
    },
    StockMoved {
        product_id: String,
        movement: MovementType,
        quantity: i64,
        stock_after: i64,
    },
    LowStock {
        product_id: String,
        current_stock: i64,
        min_stock: i64,
    },
}

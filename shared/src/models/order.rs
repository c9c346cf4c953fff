//! Order Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Completed and Cancelled accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Requested line when placing an order (id + quantity only; pricing
/// is resolved from the current catalog at call time)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItemInput {
    pub product_id: String,
    pub quantity: i64,
}

/// Priced order line
///
/// `price` and `cost` are snapshots taken when the line was created and
/// stay immutable, protecting historical revenue/margin reporting from
/// later catalog changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: String,
    /// Product name snapshot for receipts
    pub name: String,
    pub quantity: i64,
    /// Sale price snapshot in integer currency units
    pub price: i64,
    /// Weighted-average cost snapshot in integer currency units
    pub cost: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.price * self.quantity
    }
}

/// A cart of products attached to at most one booking
///
/// At most one `Pending` order exists per booking: follow-up item
/// requests merge into it instead of creating a second cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    /// Owning booking; `None` for retail walk-in orders
    pub booking_id: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    /// Sum of live line totals
    pub total_amount: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

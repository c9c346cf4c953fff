//! Financial Transaction Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Financial transaction direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    #[default]
    Revenue,
    Expense,
}

/// How the customer settled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Transfer,
}

/// One settlement record per completed booking
///
/// Written only by session completion; a retried completion updates the
/// existing row in place (upsert), it never duplicates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    /// Unique per booking
    pub booking_id: String,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub operator_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

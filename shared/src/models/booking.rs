//! Booking (play session) Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Booking lifecycle status
///
/// `Pending -> Completed` or `Pending -> Cancelled`; both end states
/// are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

/// A billing session, possibly spanning multiple tables over time
///
/// `total_amount` is authoritative only once the booking is
/// `Completed`; before settlement it stays 0 and the bill is computed
/// lazily at completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    /// Human-readable booking code (e.g. `BK2026082810001`)
    pub code: String,
    pub status: BookingStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Final bill: table time-cost plus order totals (set at completion)
    pub total_amount: i64,
    pub note: Option<String>,
    pub created_by: String,
}

/// One table's time-billed participation in a booking
///
/// `hourly_rate` is snapshotted from the table at assignment time and
/// never changes afterwards, so later rate edits do not retroactively
/// alter an open session's bill. `end_time = None` means the table is
/// still running; at most one open assignment exists per table
/// system-wide (gated by the table status).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingTable {
    pub id: String,
    pub booking_id: String,
    pub table_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Rate snapshot captured at assignment time, immutable
    pub hourly_rate: i64,
}

impl BookingTable {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

//! Billiard Table Model

use serde::{Deserialize, Serialize};

/// Table discipline (determines default pricing tier in the back office)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    Pool,
    Carom,
    Snooker,
}

/// Table availability status
///
/// `Occupied` holds exactly while the table has an open booking
/// assignment (end time not yet set). The session engine is the only
/// writer of this field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Reserved,
    Maintenance,
}

/// Billiard table entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BilliardTable {
    pub id: String,
    pub name: String,
    pub table_type: TableType,
    /// Hourly rate in integer currency units
    pub hourly_rate: i64,
    pub status: TableStatus,
    pub is_active: bool,
}

impl BilliardTable {
    /// A table can be opened when it is free or merely reserved
    /// (starting the session consumes the reservation).
    pub fn can_start(&self) -> bool {
        matches!(self.status, TableStatus::Available | TableStatus::Reserved)
    }
}

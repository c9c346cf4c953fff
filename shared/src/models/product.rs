//! Product Model

use serde::{Deserialize, Serialize};

/// Sellable/stockable product entity
///
/// `cost` is the running weighted-average unit cost; it is recomputed
/// only by IN-type inventory movements. `current_stock` never goes
/// negative (checked before every deduction). Both fields are owned by
/// the inventory ledger and must never be written directly by other
/// engines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Sale price in integer currency units
    pub price: i64,
    /// Weighted-average unit cost in integer currency units
    pub cost: i64,
    pub current_stock: i64,
    /// Reorder threshold; crossing it triggers a low-stock warning
    pub min_stock: i64,
    /// Stock unit for display (bottle, can, pack, ...)
    pub unit: String,
    pub is_active: bool,
}

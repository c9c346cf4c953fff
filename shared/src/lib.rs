//! Shared types for the billiard hall system
//!
//! Domain models used across the hall server and its future consumers:
//! tables, bookings, orders, products, inventory logs and financial
//! records. All rows are serde-serializable and stored as JSON values
//! in the embedded database.

pub mod models;

// Re-exports
pub use models::billiard_table::{BilliardTable, TableStatus, TableType};
pub use models::booking::{Booking, BookingStatus, BookingTable};
pub use models::inventory_log::{InventoryLog, MovementReason, MovementType};
pub use models::order::{Order, OrderItem, OrderItemInput, OrderStatus};
pub use models::product::Product;
pub use models::transaction::{PaymentMethod, TransactionRecord, TransactionType};

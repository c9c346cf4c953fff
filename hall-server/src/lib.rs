//! Hall Server - billiard club transactional core
//!
//! Owns the club's hard state: timed play sessions across billiard
//! tables, food/drink orders attached to sessions, and the inventory
//! levels backing those orders. Every multi-row mutation runs inside a
//! single redb write transaction; partial state is never observable.
//!
//! # Module structure
//!
//! ```text
//! hall-server/src/
//! ├── config/      # Environment-based configuration
//! ├── storage/     # redb persistence layer (tables, rows, counters)
//! ├── context/     # UnitOfWork passed through every sub-operation
//! ├── billing/     # Decimal money math: table time-cost, WAC
//! ├── inventory/   # Inventory ledger (stock + cost basis + audit log)
//! ├── orders/      # Order engine (consolidation, pricing, stock)
//! ├── sessions/    # Session engine (start/end/cancel/complete/merge)
//! ├── events/      # Domain events broadcast after commit
//! └── manager/     # HallManager facade (transaction boundary)
//! ```
//!
//! # Operation flow
//!
//! ```text
//! HallManager::operation(args)
//!     ├─ 1. Begin write transaction
//!     ├─ 2. Create UnitOfWork
//!     ├─ 3. Run the operation (all row reads/writes go through the UoW)
//!     ├─ 4. Commit transaction (drop without commit = rollback)
//!     └─ 5. Broadcast collected events
//! ```

pub mod billing;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod inventory;
pub mod manager;
pub mod orders;
pub mod sessions;
pub mod storage;

// Re-export public types
pub use config::HallConfig;
pub use context::UnitOfWork;
pub use error::{ServiceError, ServiceResult};
pub use events::HallEvent;
pub use inventory::MovementInput;
pub use manager::HallManager;
pub use sessions::StartSession;
pub use sessions::complete::CompleteSession;
pub use storage::{HallStorage, StorageError, StorageResult};

// Re-export shared types for convenience
pub use shared::{
    BilliardTable, Booking, BookingStatus, BookingTable, InventoryLog, MovementReason,
    MovementType, Order, OrderItem, OrderItemInput, OrderStatus, PaymentMethod, Product,
    TableStatus, TableType, TransactionRecord, TransactionType,
};

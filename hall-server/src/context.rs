//! Unit of work passed through every sub-operation
//!
//! Wraps one redb write transaction plus the storage handle, so that
//! multi-step conditional logic (order placement, settlement, merge,
//! cancellation cascade) reads and writes through a single atomic
//! scope instead of nesting implicit transactions. Domain events are
//! collected here and only broadcast by the manager after the commit
//! succeeds.

use crate::error::{ServiceError, ServiceResult};
use crate::events::HallEvent;
use crate::storage::HallStorage;
use chrono::{DateTime, Utc};
use redb::WriteTransaction;
use shared::{BilliardTable, Booking, BookingTable, InventoryLog, Order, Product, TransactionRecord};

/// One atomic scope: all row access of an operation goes through this
pub struct UnitOfWork<'a> {
    storage: &'a HallStorage,
    txn: &'a WriteTransaction,
    now: DateTime<Utc>,
    events: Vec<HallEvent>,
}

impl<'a> UnitOfWork<'a> {
    pub fn new(storage: &'a HallStorage, txn: &'a WriteTransaction) -> Self {
        Self {
            storage,
            txn,
            now: Utc::now(),
            events: Vec::new(),
        }
    }

    /// Wall-clock time fixed at the start of the operation, so every
    /// row written in one unit of work carries the same timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Queue a domain event for broadcast after commit
    pub fn emit(&mut self, event: HallEvent) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<HallEvent> {
        std::mem::take(&mut self.events)
    }

    // ========== Required loads (NotFound baked in) ==========

    pub fn require_table(&self, table_id: &str) -> ServiceResult<BilliardTable> {
        self.storage
            .load_table(self.txn, table_id)?
            .ok_or_else(|| ServiceError::not_found("table", table_id))
    }

    pub fn require_product(&self, product_id: &str) -> ServiceResult<Product> {
        self.storage
            .load_product(self.txn, product_id)?
            .ok_or_else(|| ServiceError::not_found("product", product_id))
    }

    pub fn require_booking(&self, booking_id: &str) -> ServiceResult<Booking> {
        self.storage
            .load_booking(self.txn, booking_id)?
            .ok_or_else(|| ServiceError::not_found("booking", booking_id))
    }

    pub fn require_booking_table(&self, booking_table_id: &str) -> ServiceResult<BookingTable> {
        self.storage
            .load_booking_table(self.txn, booking_table_id)?
            .ok_or_else(|| ServiceError::not_found("booking table", booking_table_id))
    }

    pub fn require_order(&self, order_id: &str) -> ServiceResult<Order> {
        self.storage
            .load_order(self.txn, order_id)?
            .ok_or_else(|| ServiceError::not_found("order", order_id))
    }

    // ========== Storage delegation ==========

    pub fn store_table(&self, table: &BilliardTable) -> ServiceResult<()> {
        Ok(self.storage.store_table(self.txn, table)?)
    }

    pub fn store_product(&self, product: &Product) -> ServiceResult<()> {
        Ok(self.storage.store_product(self.txn, product)?)
    }

    pub fn store_booking(&self, booking: &Booking) -> ServiceResult<()> {
        Ok(self.storage.store_booking(self.txn, booking)?)
    }

    pub fn delete_booking(&self, booking_id: &str) -> ServiceResult<()> {
        Ok(self.storage.delete_booking(self.txn, booking_id)?)
    }

    pub fn insert_active_booking(&self, booking_id: &str) -> ServiceResult<()> {
        Ok(self.storage.insert_active_booking(self.txn, booking_id)?)
    }

    pub fn remove_active_booking(&self, booking_id: &str) -> ServiceResult<()> {
        Ok(self.storage.remove_active_booking(self.txn, booking_id)?)
    }

    pub fn store_booking_table(&self, booking_table: &BookingTable) -> ServiceResult<()> {
        Ok(self.storage.store_booking_table(self.txn, booking_table)?)
    }

    pub fn booking_tables_for(&self, booking_id: &str) -> ServiceResult<Vec<BookingTable>> {
        Ok(self.storage.booking_tables_for(self.txn, booking_id)?)
    }

    pub fn store_order(&self, order: &Order) -> ServiceResult<()> {
        Ok(self.storage.store_order(self.txn, order)?)
    }

    pub fn delete_order(&self, order_id: &str) -> ServiceResult<()> {
        Ok(self.storage.delete_order(self.txn, order_id)?)
    }

    pub fn orders_for_booking(&self, booking_id: &str) -> ServiceResult<Vec<Order>> {
        Ok(self.storage.orders_for_booking(self.txn, booking_id)?)
    }

    pub fn pending_order_id(&self, booking_id: &str) -> ServiceResult<Option<String>> {
        Ok(self.storage.pending_order_id(self.txn, booking_id)?)
    }

    pub fn set_pending_order(&self, booking_id: &str, order_id: &str) -> ServiceResult<()> {
        Ok(self.storage.set_pending_order(self.txn, booking_id, order_id)?)
    }

    pub fn clear_pending_order(&self, booking_id: &str) -> ServiceResult<()> {
        Ok(self.storage.clear_pending_order(self.txn, booking_id)?)
    }

    pub fn next_ledger_sequence(&self) -> ServiceResult<u64> {
        Ok(self.storage.next_ledger_sequence(self.txn)?)
    }

    pub fn append_inventory_log(&self, log: &InventoryLog) -> ServiceResult<()> {
        Ok(self.storage.append_inventory_log(self.txn, log)?)
    }

    pub fn load_transaction(&self, booking_id: &str) -> ServiceResult<Option<TransactionRecord>> {
        Ok(self.storage.load_transaction(self.txn, booking_id)?)
    }

    pub fn store_transaction(&self, record: &TransactionRecord) -> ServiceResult<()> {
        Ok(self.storage.store_transaction(self.txn, record)?)
    }
}

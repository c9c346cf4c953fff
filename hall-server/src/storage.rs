//! redb-based storage layer for the hall core
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `tables` | `table_id` | `BilliardTable` | Billiard tables |
//! | `products` | `product_id` | `Product` | Stock + cost basis |
//! | `bookings` | `booking_id` | `Booking` | Play sessions |
//! | `active_bookings` | `booking_id` | `()` | Pending booking index |
//! | `booking_tables` | `booking_table_id` | `BookingTable` | Table assignments |
//! | `orders` | `order_id` | `Order` | Orders with line items |
//! | `pending_orders` | `booking_id` | `order_id` | Single-PENDING-order index |
//! | `inventory_logs` | `(product_id, sequence)` | `InventoryLog` | Stock ledger (append-only) |
//! | `transactions` | `booking_id` | `TransactionRecord` | One settlement per booking |
//! | `counters` | name | `u64` | Ledger sequence, booking counter |
//!
//! # Durability
//!
//! redb commits are persistent as soon as `commit()` returns
//! (copy-on-write with atomic pointer swap), so the database file is
//! always in a consistent state even across power loss. A transaction
//! dropped without commit leaves no trace — that drop-to-rollback
//! behavior is what the service layer relies on for atomicity.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{BilliardTable, Booking, BookingTable, InventoryLog, Order, Product, TransactionRecord};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Billiard tables: key = table_id, value = JSON-serialized BilliardTable
const TABLES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tables");

/// Products: key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// Bookings: key = booking_id, value = JSON-serialized Booking
const BOOKINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("bookings");

/// Pending bookings index: key = booking_id, value = empty (existence check)
const ACTIVE_BOOKINGS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("active_bookings");

/// Table assignments: key = booking_table_id, value = JSON-serialized BookingTable
const BOOKING_TABLES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("booking_tables");

/// Orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Single-PENDING-order-per-booking index: key = booking_id, value = order_id
const PENDING_ORDERS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("pending_orders");

/// Inventory ledger: key = (product_id, sequence), value = JSON-serialized InventoryLog
/// Append-only; rows are never updated or deleted.
const INVENTORY_LOGS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("inventory_logs");

/// Financial records: key = booking_id, value = JSON-serialized TransactionRecord
const TRANSACTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// Counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const LEDGER_SEQUENCE_KEY: &str = "ledger_seq";
const BOOKING_COUNT_KEY: &str = "booking_count";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Hall storage backed by redb
#[derive(Clone)]
pub struct HallStorage {
    db: Arc<Database>,
}

impl HallStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Create all tables and seed the counters
    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(TABLES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(BOOKINGS_TABLE)?;
            let _ = write_txn.open_table(ACTIVE_BOOKINGS_TABLE)?;
            let _ = write_txn.open_table(BOOKING_TABLES_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(PENDING_ORDERS_TABLE)?;
            let _ = write_txn.open_table(INVENTORY_LOGS_TABLE)?;
            let _ = write_txn.open_table(TRANSACTIONS_TABLE)?;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(LEDGER_SEQUENCE_KEY)?.is_none() {
                counters.insert(LEDGER_SEQUENCE_KEY, 0u64)?;
            }
            if counters.get(BOOKING_COUNT_KEY)?.is_none() {
                counters.insert(BOOKING_COUNT_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Generic row helpers (write transaction) ==========

    fn read_row<T: DeserializeOwned>(
        &self,
        txn: &WriteTransaction,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let table = txn.open_table(def)?;
        match table.get(key)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn write_row<T: Serialize>(
        &self,
        txn: &WriteTransaction,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
        row: &T,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(def)?;
        let value = serde_json::to_vec(row)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    fn remove_row(
        &self,
        txn: &WriteTransaction,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(def)?;
        table.remove(key)?;
        Ok(())
    }

    fn read_row_snapshot<T: DeserializeOwned>(
        &self,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        match table.get(key)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    // ========== Billiard Tables ==========

    pub fn load_table(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
    ) -> StorageResult<Option<BilliardTable>> {
        self.read_row(txn, TABLES_TABLE, table_id)
    }

    pub fn store_table(&self, txn: &WriteTransaction, table: &BilliardTable) -> StorageResult<()> {
        self.write_row(txn, TABLES_TABLE, &table.id, table)
    }

    /// Read a table outside any write transaction
    pub fn get_table(&self, table_id: &str) -> StorageResult<Option<BilliardTable>> {
        self.read_row_snapshot(TABLES_TABLE, table_id)
    }

    pub fn list_tables(&self) -> StorageResult<Vec<BilliardTable>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLES_TABLE)?;
        let mut rows = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    // ========== Products ==========

    pub fn load_product(
        &self,
        txn: &WriteTransaction,
        product_id: &str,
    ) -> StorageResult<Option<Product>> {
        self.read_row(txn, PRODUCTS_TABLE, product_id)
    }

    pub fn store_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        self.write_row(txn, PRODUCTS_TABLE, &product.id, product)
    }

    pub fn get_product(&self, product_id: &str) -> StorageResult<Option<Product>> {
        self.read_row_snapshot(PRODUCTS_TABLE, product_id)
    }

    pub fn list_products(&self) -> StorageResult<Vec<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        let mut rows = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    // ========== Bookings ==========

    pub fn load_booking(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<Option<Booking>> {
        self.read_row(txn, BOOKINGS_TABLE, booking_id)
    }

    pub fn store_booking(&self, txn: &WriteTransaction, booking: &Booking) -> StorageResult<()> {
        self.write_row(txn, BOOKINGS_TABLE, &booking.id, booking)
    }

    /// Physical delete; only the merge absorption path uses this
    pub fn delete_booking(&self, txn: &WriteTransaction, booking_id: &str) -> StorageResult<()> {
        self.remove_row(txn, BOOKINGS_TABLE, booking_id)
    }

    pub fn get_booking(&self, booking_id: &str) -> StorageResult<Option<Booking>> {
        self.read_row_snapshot(BOOKINGS_TABLE, booking_id)
    }

    pub fn insert_active_booking(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_BOOKINGS_TABLE)?;
        table.insert(booking_id, ())?;
        Ok(())
    }

    pub fn remove_active_booking(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_BOOKINGS_TABLE)?;
        table.remove(booking_id)?;
        Ok(())
    }

    /// Ids of all bookings still pending settlement
    pub fn active_booking_ids(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_BOOKINGS_TABLE)?;
        let mut ids = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    // ========== Booking Tables ==========

    pub fn load_booking_table(
        &self,
        txn: &WriteTransaction,
        booking_table_id: &str,
    ) -> StorageResult<Option<BookingTable>> {
        self.read_row(txn, BOOKING_TABLES_TABLE, booking_table_id)
    }

    pub fn store_booking_table(
        &self,
        txn: &WriteTransaction,
        booking_table: &BookingTable,
    ) -> StorageResult<()> {
        self.write_row(txn, BOOKING_TABLES_TABLE, &booking_table.id, booking_table)
    }

    /// All assignments belonging to a booking (within a write transaction)
    pub fn booking_tables_for(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<Vec<BookingTable>> {
        let table = txn.open_table(BOOKING_TABLES_TABLE)?;
        let mut rows: Vec<BookingTable> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let row: BookingTable = serde_json::from_slice(value.value())?;
            if row.booking_id == booking_id {
                rows.push(row);
            }
        }
        rows.sort_by_key(|bt| bt.start_time);
        Ok(rows)
    }

    /// All assignments belonging to a booking (read-only)
    pub fn get_booking_tables(&self, booking_id: &str) -> StorageResult<Vec<BookingTable>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKING_TABLES_TABLE)?;
        let mut rows: Vec<BookingTable> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let row: BookingTable = serde_json::from_slice(value.value())?;
            if row.booking_id == booking_id {
                rows.push(row);
            }
        }
        rows.sort_by_key(|bt| bt.start_time);
        Ok(rows)
    }

    // ========== Orders ==========

    pub fn load_order(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        self.read_row(txn, ORDERS_TABLE, order_id)
    }

    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        self.write_row(txn, ORDERS_TABLE, &order.id, order)
    }

    /// Physical delete; only the merge consolidation path uses this
    pub fn delete_order(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        self.remove_row(txn, ORDERS_TABLE, order_id)
    }

    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        self.read_row_snapshot(ORDERS_TABLE, order_id)
    }

    /// All orders attached to a booking (within a write transaction)
    pub fn orders_for_booking(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<Vec<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        let mut rows: Vec<Order> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let row: Order = serde_json::from_slice(value.value())?;
            if row.booking_id.as_deref() == Some(booking_id) {
                rows.push(row);
            }
        }
        rows.sort_by_key(|o| o.created_at);
        Ok(rows)
    }

    /// All orders attached to a booking (read-only)
    pub fn get_orders_for_booking(&self, booking_id: &str) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut rows: Vec<Order> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let row: Order = serde_json::from_slice(value.value())?;
            if row.booking_id.as_deref() == Some(booking_id) {
                rows.push(row);
            }
        }
        rows.sort_by_key(|o| o.created_at);
        Ok(rows)
    }

    // ========== Pending-order index ==========

    /// The booking's single PENDING order, if any
    pub fn pending_order_id(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(PENDING_ORDERS_TABLE)?;
        Ok(table.get(booking_id)?.map(|guard| guard.value().to_string()))
    }

    pub fn set_pending_order(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_ORDERS_TABLE)?;
        table.insert(booking_id, order_id)?;
        Ok(())
    }

    pub fn clear_pending_order(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PENDING_ORDERS_TABLE)?;
        table.remove(booking_id)?;
        Ok(())
    }

    // ========== Inventory ledger ==========

    /// Increment and return the global ledger sequence (within transaction)
    pub fn next_ledger_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table
            .get(LEDGER_SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(LEDGER_SEQUENCE_KEY, next)?;
        Ok(next)
    }

    /// Append one ledger row; existing rows are never touched
    pub fn append_inventory_log(
        &self,
        txn: &WriteTransaction,
        log: &InventoryLog,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(INVENTORY_LOGS_TABLE)?;
        let key = (log.product_id.as_str(), log.sequence);
        let value = serde_json::to_vec(log)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// All ledger rows for a product, newest first
    pub fn logs_for_product(&self, product_id: &str) -> StorageResult<Vec<InventoryLog>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(INVENTORY_LOGS_TABLE)?;

        let mut logs = Vec::new();
        let range_start = (product_id, 0u64);
        let range_end = (product_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let log: InventoryLog = serde_json::from_slice(value.value())?;
            logs.push(log);
        }

        logs.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(logs)
    }

    // ========== Financial records ==========

    pub fn load_transaction(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<Option<TransactionRecord>> {
        self.read_row(txn, TRANSACTIONS_TABLE, booking_id)
    }

    /// Insert-or-replace keyed by booking id (upsert semantics)
    pub fn store_transaction(
        &self,
        txn: &WriteTransaction,
        record: &TransactionRecord,
    ) -> StorageResult<()> {
        self.write_row(txn, TRANSACTIONS_TABLE, &record.booking_id, record)
    }

    pub fn get_transaction(&self, booking_id: &str) -> StorageResult<Option<TransactionRecord>> {
        self.read_row_snapshot(TRANSACTIONS_TABLE, booking_id)
    }

    // ========== Booking counter (for booking codes) ==========

    /// Get and increment the booking count atomically.
    /// Returns the NEW count after increment. Runs in its own write
    /// transaction — call BEFORE opening the operation transaction
    /// (redb does not allow nested write transactions).
    pub fn next_booking_count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let next = {
            let mut table = txn.open_table(COUNTERS_TABLE)?;
            let current = table
                .get(BOOKING_COUNT_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            let next = current + 1;
            table.insert(BOOKING_COUNT_KEY, next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }
}

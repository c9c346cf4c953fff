//! Hall manager, the transaction boundary of the crate
//!
//! Every public operation runs the same way: begin one write
//! transaction, run the operation through a UnitOfWork, commit, then
//! broadcast the events the operation queued. An error at any step
//! drops the transaction uncommitted, so callers retry against the
//! exact state they started from. redb admits a single writer at a
//! time, which serializes all mutations without extra locking.

use crate::config::HallConfig;
use crate::context::UnitOfWork;
use crate::error::ServiceResult;
use crate::events::HallEvent;
use crate::inventory::{self, MovementInput};
use crate::orders;
use crate::sessions::{self, StartSession, complete::CompleteSession};
use crate::storage::{HallStorage, StorageError};
use chrono::{DateTime, Utc};
use shared::{
    BilliardTable, Booking, BookingTable, InventoryLog, Order, OrderItemInput, OrderStatus,
    PaymentMethod, Product, TransactionRecord,
};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Facade over the hall's transactional core
#[derive(Clone)]
pub struct HallManager {
    storage: HallStorage,
    event_tx: broadcast::Sender<HallEvent>,
}

impl HallManager {
    pub fn new(config: &HallConfig) -> ServiceResult<Self> {
        let storage = HallStorage::open(&config.db_path)?;
        tracing::info!(db_path = %config.db_path.display(), "Hall storage opened");
        Ok(Self::with_storage(storage))
    }

    pub fn with_storage(storage: HallStorage) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { storage, event_tx }
    }

    /// Subscribe to events; only committed state is ever announced
    pub fn subscribe(&self) -> broadcast::Receiver<HallEvent> {
        self.event_tx.subscribe()
    }

    pub fn storage(&self) -> &HallStorage {
        &self.storage
    }

    /// Run one operation in one transaction; broadcast after commit.
    fn execute<T, F>(&self, op: F) -> ServiceResult<T>
    where
        F: FnOnce(&mut UnitOfWork) -> ServiceResult<T>,
    {
        let txn = self.storage.begin_write()?;
        let mut uow = UnitOfWork::new(&self.storage, &txn);
        let value = op(&mut uow)?;
        let events = uow.take_events();
        drop(uow);
        txn.commit().map_err(StorageError::from)?;
        for event in events {
            // no subscribers is fine
            let _ = self.event_tx.send(event);
        }
        Ok(value)
    }

    /// Next human-readable booking code, e.g. `BK2026082810001`.
    ///
    /// The counter lives in its own transaction and is taken before
    /// the operation transaction opens; a failed start leaves a gap in
    /// the numbering, never a duplicate.
    fn next_booking_code(&self) -> ServiceResult<String> {
        let count = self.storage.next_booking_count()?;
        Ok(format!(
            "BK{}{}",
            Utc::now().format("%Y%m%d"),
            10_000 + count
        ))
    }

    // ========== Sessions ==========

    pub fn start_session(
        &self,
        table_ids: Vec<String>,
        start_time: Option<DateTime<Utc>>,
        operator_id: &str,
        note: Option<String>,
    ) -> ServiceResult<Booking> {
        let req = StartSession {
            code: self.next_booking_code()?,
            table_ids,
            start_time,
            operator_id: operator_id.to_string(),
            note,
        };
        self.execute(|uow| sessions::start(uow, &req))
    }

    pub fn end_table(
        &self,
        booking_table_id: &str,
        end_time: Option<DateTime<Utc>>,
    ) -> ServiceResult<BookingTable> {
        self.execute(|uow| sessions::end_table(uow, booking_table_id, end_time))
    }

    pub fn cancel_session(&self, booking_id: &str, operator_id: &str) -> ServiceResult<Booking> {
        self.execute(|uow| sessions::cancel(uow, booking_id, operator_id))
    }

    pub fn complete_session(
        &self,
        booking_id: &str,
        end_time: Option<DateTime<Utc>>,
        payment_method: PaymentMethod,
        operator_id: &str,
    ) -> ServiceResult<Booking> {
        let req = CompleteSession {
            booking_id: booking_id.to_string(),
            end_time,
            payment_method,
            operator_id: operator_id.to_string(),
        };
        self.execute(|uow| sessions::complete::complete(uow, &req))
    }

    pub fn merge_sessions(
        &self,
        target_booking_id: &str,
        source_booking_id: &str,
    ) -> ServiceResult<Booking> {
        self.execute(|uow| sessions::merge::merge(uow, target_booking_id, source_booking_id))
    }

    // ========== Orders ==========

    pub fn place_order(
        &self,
        booking_id: Option<&str>,
        operator_id: &str,
        items: &[OrderItemInput],
    ) -> ServiceResult<Order> {
        self.execute(|uow| orders::place_order(uow, booking_id, operator_id, items))
    }

    pub fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        operator_id: &str,
    ) -> ServiceResult<Order> {
        self.execute(|uow| orders::update_order_status(uow, order_id, status, operator_id))
    }

    // ========== Inventory ==========

    pub fn record_movement(&self, input: &MovementInput) -> ServiceResult<InventoryLog> {
        self.execute(|uow| inventory::record_movement(uow, input))
    }

    // ========== Catalog ==========

    pub fn upsert_table(&self, table: &BilliardTable) -> ServiceResult<()> {
        self.execute(|uow| uow.store_table(table))
    }

    pub fn upsert_product(&self, product: &Product) -> ServiceResult<()> {
        self.execute(|uow| uow.store_product(product))
    }

    // ========== Reads ==========

    pub fn get_table(&self, table_id: &str) -> ServiceResult<Option<BilliardTable>> {
        Ok(self.storage.get_table(table_id)?)
    }

    pub fn list_tables(&self) -> ServiceResult<Vec<BilliardTable>> {
        Ok(self.storage.list_tables()?)
    }

    pub fn get_product(&self, product_id: &str) -> ServiceResult<Option<Product>> {
        Ok(self.storage.get_product(product_id)?)
    }

    pub fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.storage.list_products()?)
    }

    pub fn get_booking(&self, booking_id: &str) -> ServiceResult<Option<Booking>> {
        Ok(self.storage.get_booking(booking_id)?)
    }

    pub fn active_bookings(&self) -> ServiceResult<Vec<Booking>> {
        let mut bookings = Vec::new();
        for id in self.storage.active_booking_ids()? {
            if let Some(booking) = self.storage.get_booking(&id)? {
                bookings.push(booking);
            }
        }
        Ok(bookings)
    }

    pub fn booking_tables(&self, booking_id: &str) -> ServiceResult<Vec<BookingTable>> {
        Ok(self.storage.get_booking_tables(booking_id)?)
    }

    pub fn get_order(&self, order_id: &str) -> ServiceResult<Option<Order>> {
        Ok(self.storage.get_order(order_id)?)
    }

    pub fn orders_for_booking(&self, booking_id: &str) -> ServiceResult<Vec<Order>> {
        Ok(self.storage.get_orders_for_booking(booking_id)?)
    }

    pub fn product_logs(&self, product_id: &str) -> ServiceResult<Vec<InventoryLog>> {
        Ok(self.storage.logs_for_product(product_id)?)
    }

    pub fn transaction_for_booking(
        &self,
        booking_id: &str,
    ) -> ServiceResult<Option<TransactionRecord>> {
        Ok(self.storage.get_transaction(booking_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use chrono::Duration;
    use shared::{MovementReason, MovementType, TableStatus, TableType, TransactionType};

    fn manager() -> HallManager {
        HallManager::with_storage(HallStorage::open_in_memory().unwrap())
    }

    fn seed_table(manager: &HallManager, id: &str, hourly_rate: i64) {
        manager
            .upsert_table(&BilliardTable {
                id: id.to_string(),
                name: format!("Table {id}"),
                table_type: TableType::Pool,
                hourly_rate,
                status: TableStatus::Available,
                is_active: true,
            })
            .unwrap();
    }

    fn seed_product(manager: &HallManager, id: &str, price: i64, stock: i64) {
        manager
            .upsert_product(&Product {
                id: id.to_string(),
                name: format!("Product {id}"),
                price,
                cost: price / 2,
                current_stock: stock,
                min_stock: 1,
                unit: "bottle".to_string(),
                is_active: true,
            })
            .unwrap();
    }

    fn order_of(product_id: &str, quantity: i64) -> OrderItemInput {
        OrderItemInput {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_full_session_lifecycle() {
        let manager = manager();
        seed_table(&manager, "t1", 50_000);
        seed_product(&manager, "p1", 20_000, 10);

        // sit down, order two drinks, play one hour, settle in cash
        let booking = manager
            .start_session(vec!["t1".to_string()], None, "user-1", None)
            .unwrap();
        manager
            .place_order(Some(&booking.id), "user-1", &[order_of("p1", 2)])
            .unwrap();

        assert_eq!(
            manager.get_product("p1").unwrap().unwrap().current_stock,
            8
        );

        let end = booking.start_time + Duration::hours(1);
        let settled = manager
            .complete_session(&booking.id, Some(end), PaymentMethod::Cash, "user-1")
            .unwrap();

        assert_eq!(settled.total_amount, 90_000);

        let record = manager
            .transaction_for_booking(&booking.id)
            .unwrap()
            .unwrap();
        assert_eq!(record.amount, 90_000);
        assert_eq!(record.transaction_type, TransactionType::Revenue);
        assert_eq!(record.payment_method, PaymentMethod::Cash);

        assert_eq!(
            manager.get_table("t1").unwrap().unwrap().status,
            TableStatus::Available
        );
        assert!(manager.active_bookings().unwrap().is_empty());
    }

    #[test]
    fn test_booking_codes_are_dated_and_sequential() {
        let manager = manager();
        seed_table(&manager, "t1", 50_000);
        seed_table(&manager, "t2", 50_000);

        let a = manager
            .start_session(vec!["t1".to_string()], None, "user-1", None)
            .unwrap();
        let b = manager
            .start_session(vec!["t2".to_string()], None, "user-1", None)
            .unwrap();

        let prefix = format!("BK{}", Utc::now().format("%Y%m%d"));
        assert_eq!(a.code, format!("{prefix}10001"));
        assert_eq!(b.code, format!("{prefix}10002"));
    }

    #[test]
    fn test_failed_operation_commits_nothing_and_emits_nothing() {
        let manager = manager();
        seed_table(&manager, "t1", 50_000);
        seed_product(&manager, "p1", 20_000, 1);

        let booking = manager
            .start_session(vec!["t1".to_string()], None, "user-1", None)
            .unwrap();

        let mut rx = manager.subscribe();
        let err = manager
            .place_order(Some(&booking.id), "user-1", &[order_of("p1", 5)])
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock { .. }));

        assert_eq!(
            manager.get_product("p1").unwrap().unwrap().current_stock,
            1
        );
        assert!(manager.orders_for_booking(&booking.id).unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_events_are_broadcast_after_commit() {
        let manager = manager();
        seed_table(&manager, "t1", 50_000);

        let mut rx = manager.subscribe();
        let booking = manager
            .start_session(vec!["t1".to_string()], None, "user-1", None)
            .unwrap();

        match rx.try_recv().unwrap() {
            HallEvent::SessionStarted {
                booking_id,
                table_ids,
            } => {
                assert_eq!(booking_id, booking.id);
                assert_eq!(table_ids, vec!["t1".to_string()]);
            }
            other => panic!("expected SessionStarted, got {other:?}"),
        }
    }

    #[test]
    fn test_restock_movement_through_manager() {
        let manager = manager();
        seed_product(&manager, "p1", 20_000, 10); // cost 10_000

        let log = manager
            .record_movement(&MovementInput {
                product_id: "p1".to_string(),
                movement: MovementType::In,
                quantity: 10,
                unit_cost: Some(20_000),
                reason: MovementReason::Purchase,
                operator_id: "user-1".to_string(),
            })
            .unwrap();

        assert_eq!(log.stock_after, 20);
        assert_eq!(log.cost, 15_000);
        assert_eq!(manager.product_logs("p1").unwrap().len(), 1);
    }

    #[test]
    fn test_merged_sessions_settle_as_one_bill() {
        let manager = manager();
        seed_table(&manager, "t1", 50_000);
        seed_table(&manager, "t2", 60_000);
        seed_product(&manager, "p1", 20_000, 10);

        let target = manager
            .start_session(vec!["t1".to_string()], None, "user-1", None)
            .unwrap();
        let source = manager
            .start_session(vec!["t2".to_string()], None, "user-1", None)
            .unwrap();
        manager
            .place_order(Some(&source.id), "user-1", &[order_of("p1", 1)])
            .unwrap();

        manager.merge_sessions(&target.id, &source.id).unwrap();
        assert!(manager.get_booking(&source.id).unwrap().is_none());

        let end = target.start_time + Duration::hours(1);
        let settled = manager
            .complete_session(&target.id, Some(end), PaymentMethod::Card, "user-1")
            .unwrap();

        // both rate snapshots plus the re-parented order
        assert_eq!(settled.total_amount, 50_000 + 60_000 + 20_000);
        for id in ["t1", "t2"] {
            assert_eq!(
                manager.get_table(id).unwrap().unwrap().status,
                TableStatus::Available
            );
        }
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = HallConfig::with_db_path(dir.path().join("hall.redb"));

        let booking_id = {
            let manager = HallManager::new(&config).unwrap();
            seed_table(&manager, "t1", 50_000);
            seed_product(&manager, "p1", 20_000, 10);
            let booking = manager
                .start_session(vec!["t1".to_string()], None, "user-1", None)
                .unwrap();
            manager
                .place_order(Some(&booking.id), "user-1", &[order_of("p1", 2)])
                .unwrap();
            booking.id
        };

        let manager = HallManager::new(&config).unwrap();
        let booking = manager.get_booking(&booking_id).unwrap().unwrap();
        assert_eq!(booking.status, shared::BookingStatus::Pending);
        assert_eq!(
            manager.get_product("p1").unwrap().unwrap().current_stock,
            8
        );
        assert_eq!(manager.active_bookings().unwrap().len(), 1);

        // settlement still works against the reopened store
        let settled = manager
            .complete_session(
                &booking_id,
                Some(booking.start_time + Duration::hours(1)),
                PaymentMethod::Cash,
                "user-1",
            )
            .unwrap();
        assert_eq!(settled.total_amount, 90_000);
    }
}

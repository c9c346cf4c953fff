//! Session merging
//!
//! Two pending sessions can be joined into one bill: the source
//! booking's table assignments and orders are re-parented onto the
//! target, the two pending carts become one, and the source booking
//! ceases to exist. Nothing is re-billed here; rate and price
//! snapshots ride along unchanged, and the merged session settles
//! later like any other.

use crate::billing;
use crate::context::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::events::HallEvent;
use shared::{Booking, BookingStatus, Order, OrderStatus};

/// Absorb `source_booking_id` into `target_booking_id`.
pub fn merge(
    uow: &mut UnitOfWork,
    target_booking_id: &str,
    source_booking_id: &str,
) -> ServiceResult<Booking> {
    if target_booking_id == source_booking_id {
        return Err(ServiceError::invalid_argument(
            "a session cannot be merged into itself",
        ));
    }

    let mut target = uow.require_booking(target_booking_id)?;
    let source = uow.require_booking(source_booking_id)?;
    for booking in [&target, &source] {
        if booking.status != BookingStatus::Pending {
            return Err(ServiceError::invalid_state(format!(
                "booking {} is {:?}; only pending sessions can be merged",
                booking.code, booking.status
            )));
        }
    }

    // The merged session started when the earliest party sat down
    target.start_time = target.start_time.min(source.start_time);

    for mut booking_table in uow.booking_tables_for(&source.id)? {
        booking_table.booking_id = target.id.clone();
        uow.store_booking_table(&booking_table)?;
    }

    merge_orders(uow, &target, &source)?;

    uow.store_booking(&target)?;
    uow.delete_booking(&source.id)?;
    uow.remove_active_booking(&source.id)?;

    tracing::info!(
        target_booking_id = %target.id,
        source_booking_id = %source.id,
        source_code = %source.code,
        "Sessions merged"
    );
    uow.emit(HallEvent::SessionsMerged {
        target_booking_id: target.id.clone(),
        source_booking_id: source.id.clone(),
    });

    Ok(target)
}

/// Re-parent the source's orders; if both sides hold a pending cart,
/// fold the source cart's lines into the target cart.
fn merge_orders(uow: &mut UnitOfWork, target: &Booking, source: &Booking) -> ServiceResult<()> {
    let source_pending = uow.pending_order_id(&source.id)?;
    let target_pending = uow.pending_order_id(&target.id)?;

    for mut order in uow.orders_for_booking(&source.id)? {
        let is_source_cart = source_pending.as_deref() == Some(order.id.as_str());

        if is_source_cart {
            if let Some(target_cart_id) = &target_pending {
                let mut cart = uow.require_order(target_cart_id)?;
                absorb_lines(&mut cart, &order);
                uow.store_order(&cart)?;
                uow.delete_order(&order.id)?;
                continue;
            }
            // no target cart yet: the re-parented order becomes it
            uow.set_pending_order(&target.id, &order.id)?;
        }

        order.booking_id = Some(target.id.clone());
        uow.store_order(&order)?;
    }

    uow.clear_pending_order(&source.id)?;
    Ok(())
}

fn absorb_lines(cart: &mut Order, source: &Order) {
    debug_assert_eq!(cart.status, OrderStatus::Pending);
    for line in &source.items {
        match cart
            .items
            .iter_mut()
            .find(|l| l.product_id == line.product_id && l.price == line.price)
        {
            Some(existing) => existing.quantity += line.quantity,
            None => cart.items.push(line.clone()),
        }
    }
    cart.total_amount = billing::order_total(&cart.items);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::tests::{order_on, seed_product, seed_table, start_session};
    use crate::storage::HallStorage;
    use shared::TableStatus;

    fn merge_sessions(
        storage: &HallStorage,
        target_id: &str,
        source_id: &str,
    ) -> ServiceResult<Booking> {
        let txn = storage.begin_write().unwrap();
        let mut uow = UnitOfWork::new(storage, &txn);
        let result = merge(&mut uow, target_id, source_id);
        drop(uow);
        if result.is_ok() {
            txn.commit().unwrap();
        }
        result
    }

    #[test]
    fn test_merge_reparents_tables_and_deletes_source() {
        let storage = HallStorage::open_in_memory().unwrap();
        seed_table(&storage, "t1", TableStatus::Available);
        seed_table(&storage, "t2", TableStatus::Available);

        let target = start_session(&storage, "BK1", &["t1"]).unwrap();
        let source = start_session(&storage, "BK2", &["t2"]).unwrap();

        merge_sessions(&storage, &target.id, &source.id).unwrap();

        let bts = storage.get_booking_tables(&target.id).unwrap();
        assert_eq!(bts.len(), 2);
        assert!(bts.iter().all(|bt| bt.booking_id == target.id));

        assert!(storage.get_booking(&source.id).unwrap().is_none());
        assert_eq!(storage.active_booking_ids().unwrap(), vec![target.id]);
    }

    #[test]
    fn test_merge_folds_pending_carts_into_one() {
        let storage = HallStorage::open_in_memory().unwrap();
        seed_table(&storage, "t1", TableStatus::Available);
        seed_table(&storage, "t2", TableStatus::Available);
        seed_product(&storage, "p1", 20_000, 20);
        seed_product(&storage, "p2", 15_000, 20);

        let target = start_session(&storage, "BK1", &["t1"]).unwrap();
        let source = start_session(&storage, "BK2", &["t2"]).unwrap();
        order_on(&storage, &target.id, "p1", 2);
        order_on(&storage, &source.id, "p1", 1);
        order_on(&storage, &source.id, "p2", 3);

        merge_sessions(&storage, &target.id, &source.id).unwrap();

        let orders = storage.get_orders_for_booking(&target.id).unwrap();
        assert_eq!(orders.len(), 1);
        let cart = &orders[0];
        assert_eq!(cart.status, OrderStatus::Pending);
        assert_eq!(cart.items.len(), 2);
        assert_eq!(
            cart.items
                .iter()
                .find(|l| l.product_id == "p1")
                .map(|l| l.quantity),
            Some(3)
        );
        assert_eq!(cart.total_amount, 3 * 20_000 + 3 * 15_000);

        assert!(storage.get_orders_for_booking(&source.id).unwrap().is_empty());
    }

    #[test]
    fn test_merge_adopts_source_cart_when_target_has_none() {
        let storage = HallStorage::open_in_memory().unwrap();
        seed_table(&storage, "t1", TableStatus::Available);
        seed_table(&storage, "t2", TableStatus::Available);
        seed_product(&storage, "p1", 20_000, 20);

        let target = start_session(&storage, "BK1", &["t1"]).unwrap();
        let source = start_session(&storage, "BK2", &["t2"]).unwrap();
        order_on(&storage, &source.id, "p1", 2);

        merge_sessions(&storage, &target.id, &source.id).unwrap();

        // a further order on the target lands in the adopted cart
        order_on(&storage, &target.id, "p1", 1);
        let orders = storage.get_orders_for_booking(&target.id).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total_amount, 3 * 20_000);
    }

    #[test]
    fn test_merge_keeps_earliest_start_time() {
        let storage = HallStorage::open_in_memory().unwrap();
        seed_table(&storage, "t1", TableStatus::Available);
        seed_table(&storage, "t2", TableStatus::Available);

        let earlier = start_session(&storage, "BK1", &["t1"]).unwrap();
        let later = start_session(&storage, "BK2", &["t2"]).unwrap();
        assert!(earlier.start_time <= later.start_time);

        // merging the earlier session into the later one
        let merged = merge_sessions(&storage, &later.id, &earlier.id).unwrap();
        assert_eq!(merged.start_time, earlier.start_time);
    }

    #[test]
    fn test_merge_rejects_self_and_terminal_sessions() {
        let storage = HallStorage::open_in_memory().unwrap();
        seed_table(&storage, "t1", TableStatus::Available);
        seed_table(&storage, "t2", TableStatus::Available);

        let a = start_session(&storage, "BK1", &["t1"]).unwrap();
        let b = start_session(&storage, "BK2", &["t2"]).unwrap();

        assert!(matches!(
            merge_sessions(&storage, &a.id, &a.id).unwrap_err(),
            ServiceError::InvalidArgument(_)
        ));

        let txn = storage.begin_write().unwrap();
        let mut uow = UnitOfWork::new(&storage, &txn);
        crate::sessions::cancel(&mut uow, &b.id, "user-1").unwrap();
        drop(uow);
        txn.commit().unwrap();

        assert!(matches!(
            merge_sessions(&storage, &a.id, &b.id).unwrap_err(),
            ServiceError::InvalidState(_)
        ));
    }
}

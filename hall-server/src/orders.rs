//! Order engine
//!
//! Translates requested (product, quantity) pairs into priced,
//! stock-validated line items, consolidating into the single PENDING
//! order per booking. Price and cost are snapshotted from the catalog
//! at call time; every line drives an OUT movement through the
//! inventory ledger inside the same unit of work, so an order is
//! either fully priced-and-deducted or not placed at all.
//!
//! Two distinct completion paths exist on purpose:
//! - `update_order_status(.., Cancelled)` restores stock (the only
//!   compensation path for sale deductions);
//! - `complete_for_settlement` marks an order COMPLETED during booking
//!   settlement and must never restore stock — the sale is final.

use crate::context::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::events::HallEvent;
use crate::inventory::{self, MovementInput};
use shared::{
    BookingStatus, MovementReason, MovementType, Order, OrderItem, OrderItemInput, OrderStatus,
};

/// Create a new order or merge items into the booking's PENDING order.
///
/// `booking_id = None` places a standalone retail order.
pub fn place_order(
    uow: &mut UnitOfWork,
    booking_id: Option<&str>,
    operator_id: &str,
    items: &[OrderItemInput],
) -> ServiceResult<Order> {
    if items.is_empty() {
        return Err(ServiceError::invalid_argument(
            "order must contain at least one item",
        ));
    }
    for item in items {
        if item.quantity <= 0 {
            return Err(ServiceError::invalid_argument(format!(
                "quantity must be positive for product {}",
                item.product_id
            )));
        }
    }

    if let Some(bid) = booking_id {
        let booking = uow.require_booking(bid)?;
        if booking.status != BookingStatus::Pending {
            return Err(ServiceError::invalid_state(format!(
                "booking {} is {:?}; orders can only be attached to a pending booking",
                booking.code, booking.status
            )));
        }
    }

    // Lookup-before-create keeps the single-PENDING-order invariant
    let existing = match booking_id {
        Some(bid) => match uow.pending_order_id(bid)? {
            Some(order_id) => Some(uow.require_order(&order_id)?),
            None => None,
        },
        None => None,
    };

    let mut order = match existing {
        Some(order) => order,
        None => Order {
            id: uuid::Uuid::new_v4().to_string(),
            booking_id: booking_id.map(str::to_string),
            status: OrderStatus::Pending,
            items: Vec::new(),
            total_amount: 0,
            created_by: operator_id.to_string(),
            created_at: uow.now(),
        },
    };
    let is_new = order.items.is_empty() && order.total_amount == 0;

    let mut requested_total = 0i64;
    for item in items {
        // Snapshot current price/cost before the deduction; the OUT
        // movement re-reads stock itself, inside this transaction.
        let product = uow.require_product(&item.product_id)?;
        inventory::record_movement(
            uow,
            &MovementInput {
                product_id: product.id.clone(),
                movement: MovementType::Out,
                quantity: item.quantity,
                unit_cost: None,
                reason: MovementReason::Sale,
                operator_id: operator_id.to_string(),
            },
        )?;

        requested_total += product.price * item.quantity;

        match order
            .items
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            Some(line) => line.quantity += item.quantity,
            None => order.items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                quantity: item.quantity,
                price: product.price,
                cost: product.cost,
            }),
        }
    }

    order.total_amount += requested_total;
    uow.store_order(&order)?;
    if is_new {
        if let Some(bid) = booking_id {
            uow.set_pending_order(bid, &order.id)?;
        }
    }

    tracing::info!(
        order_id = %order.id,
        booking_id = ?order.booking_id,
        requested_total,
        total_amount = order.total_amount,
        "Order placed"
    );
    uow.emit(HallEvent::OrderPlaced {
        order_id: order.id.clone(),
        booking_id: order.booking_id.clone(),
        total_amount: order.total_amount,
    });

    Ok(order)
}

/// Transition an order to a new status.
///
/// Re-requesting the current status is a no-op. Terminal statuses
/// accept no transition. Cancelling a live order restores its stock
/// through IN movements tagged `Restock`.
pub fn update_order_status(
    uow: &mut UnitOfWork,
    order_id: &str,
    new_status: OrderStatus,
    operator_id: &str,
) -> ServiceResult<Order> {
    let mut order = uow.require_order(order_id)?;

    if order.status == new_status {
        return Ok(order);
    }
    if order.status.is_terminal() {
        return Err(ServiceError::invalid_state(format!(
            "order {} is already {:?}",
            order.id, order.status
        )));
    }

    if new_status == OrderStatus::Cancelled {
        restore_stock(uow, &order, operator_id)?;
    }

    // A booking may only hold its new cart once the old one left PENDING
    if order.status == OrderStatus::Pending {
        if let Some(bid) = &order.booking_id {
            uow.clear_pending_order(bid)?;
        }
    }

    let old_status = order.status;
    order.status = new_status;
    uow.store_order(&order)?;

    tracing::info!(
        order_id = %order.id,
        from = ?old_status,
        to = ?new_status,
        "Order status changed"
    );
    uow.emit(HallEvent::OrderStatusChanged {
        order_id: order.id.clone(),
        status: new_status,
    });

    Ok(order)
}

/// Settlement path used by booking completion: mark the order
/// COMPLETED without touching stock (the goods stay sold).
pub(crate) fn complete_for_settlement(uow: &mut UnitOfWork, order: &mut Order) -> ServiceResult<()> {
    if order.status == OrderStatus::Pending {
        if let Some(bid) = &order.booking_id {
            uow.clear_pending_order(bid)?;
        }
    }
    order.status = OrderStatus::Completed;
    uow.store_order(order)?;
    uow.emit(HallEvent::OrderStatusChanged {
        order_id: order.id.clone(),
        status: OrderStatus::Completed,
    });
    Ok(())
}

/// Re-add every line's quantity via the ledger (reason `Restock`),
/// valued at the line's cost snapshot.
fn restore_stock(uow: &mut UnitOfWork, order: &Order, operator_id: &str) -> ServiceResult<()> {
    for line in &order.items {
        inventory::record_movement(
            uow,
            &MovementInput {
                product_id: line.product_id.clone(),
                movement: MovementType::In,
                quantity: line.quantity,
                unit_cost: Some(line.cost),
                reason: MovementReason::Restock,
                operator_id: operator_id.to_string(),
            },
        )?;
    }
    Ok(())
}

//! Session engine
//!
//! A booking is a timed play session over one or more billiard tables.
//! Starting one occupies the tables and snapshots their hourly rates;
//! ending a table stops its clock without settling; cancellation rolls
//! the whole session back (including restocking its live orders) and
//! is the only compensation path for a started session. Settlement and
//! structural merging live in the `complete` and `merge` submodules.

pub mod complete;
pub mod merge;

use crate::context::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::events::HallEvent;
use crate::orders;
use chrono::{DateTime, Utc};
use shared::{Booking, BookingStatus, BookingTable, OrderStatus, TableStatus};

/// Request to open a new play session
#[derive(Debug, Clone)]
pub struct StartSession {
    /// Pre-generated human-readable code (e.g. `BK2026082810001`)
    pub code: String,
    pub table_ids: Vec<String>,
    /// Session clock start; defaults to now
    pub start_time: Option<DateTime<Utc>>,
    pub operator_id: String,
    pub note: Option<String>,
}

/// Open a session across the requested tables.
///
/// Every table must be startable (AVAILABLE or RESERVED); one bad
/// table fails the whole request and no table changes status.
pub fn start(uow: &mut UnitOfWork, req: &StartSession) -> ServiceResult<Booking> {
    if req.table_ids.is_empty() {
        return Err(ServiceError::invalid_argument(
            "a session needs at least one table",
        ));
    }

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        code: req.code.clone(),
        status: BookingStatus::Pending,
        start_time: req.start_time.unwrap_or_else(|| uow.now()),
        end_time: None,
        total_amount: 0,
        note: req.note.clone(),
        created_by: req.operator_id.clone(),
    };

    for table_id in &req.table_ids {
        let mut table = uow.require_table(table_id)?;
        if !table.can_start() {
            return Err(ServiceError::invalid_state(format!(
                "table {} is {:?} and cannot start a session",
                table.name, table.status
            )));
        }

        // Rate snapshot: later catalog edits never touch a running clock
        uow.store_booking_table(&BookingTable {
            id: uuid::Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            table_id: table.id.clone(),
            start_time: booking.start_time,
            end_time: None,
            hourly_rate: table.hourly_rate,
        })?;

        table.status = TableStatus::Occupied;
        uow.store_table(&table)?;
    }

    uow.store_booking(&booking)?;
    uow.insert_active_booking(&booking.id)?;

    tracing::info!(
        booking_id = %booking.id,
        code = %booking.code,
        tables = req.table_ids.len(),
        "Session started"
    );
    uow.emit(HallEvent::SessionStarted {
        booking_id: booking.id.clone(),
        table_ids: req.table_ids.clone(),
    });

    Ok(booking)
}

/// Stop one table's clock without settling the booking.
///
/// The assignment keeps accruing nothing after `end_time`; the final
/// bill is still computed at completion.
pub fn end_table(
    uow: &mut UnitOfWork,
    booking_table_id: &str,
    end_time: Option<DateTime<Utc>>,
) -> ServiceResult<BookingTable> {
    let mut booking_table = uow.require_booking_table(booking_table_id)?;
    if !booking_table.is_open() {
        return Err(ServiceError::invalid_state(format!(
            "booking table {} is already ended",
            booking_table.id
        )));
    }

    let booking = uow.require_booking(&booking_table.booking_id)?;
    if booking.status != BookingStatus::Pending {
        return Err(ServiceError::invalid_state(format!(
            "booking {} is {:?}; its tables cannot be ended",
            booking.code, booking.status
        )));
    }

    let end_time = end_time.unwrap_or_else(|| uow.now());
    if end_time < booking_table.start_time {
        return Err(ServiceError::invalid_argument(format!(
            "end time precedes the start of booking table {}",
            booking_table.id
        )));
    }

    booking_table.end_time = Some(end_time);
    uow.store_booking_table(&booking_table)?;
    release_table(uow, &booking_table)?;

    tracing::info!(
        booking_table_id = %booking_table.id,
        table_id = %booking_table.table_id,
        "Table ended"
    );

    Ok(booking_table)
}

/// Cancel a pending session: close its clocks, free its tables,
/// restock its live orders, and mark it CANCELLED. Nothing is billed.
pub fn cancel(uow: &mut UnitOfWork, booking_id: &str, operator_id: &str) -> ServiceResult<Booking> {
    let mut booking = uow.require_booking(booking_id)?;
    if booking.status != BookingStatus::Pending {
        return Err(ServiceError::invalid_state(format!(
            "booking {} is {:?} and cannot be cancelled",
            booking.code, booking.status
        )));
    }

    // Live orders are cancelled (which restores their stock); orders
    // already in a terminal state keep it.
    for order in uow.orders_for_booking(booking_id)? {
        if !order.status.is_terminal() {
            orders::update_order_status(uow, &order.id, OrderStatus::Cancelled, operator_id)?;
        }
    }

    for mut booking_table in uow.booking_tables_for(booking_id)? {
        if booking_table.is_open() {
            booking_table.end_time = Some(uow.now());
            uow.store_booking_table(&booking_table)?;
            release_table(uow, &booking_table)?;
        }
    }

    booking.status = BookingStatus::Cancelled;
    booking.end_time = Some(uow.now());
    uow.store_booking(&booking)?;
    uow.remove_active_booking(booking_id)?;

    tracing::info!(booking_id = %booking.id, code = %booking.code, "Session cancelled");
    uow.emit(HallEvent::SessionCancelled {
        booking_id: booking.id.clone(),
    });

    Ok(booking)
}

/// Free the physical table behind a closed assignment and announce it.
pub(crate) fn release_table(
    uow: &mut UnitOfWork,
    booking_table: &BookingTable,
) -> ServiceResult<()> {
    let mut table = uow.require_table(&booking_table.table_id)?;
    table.status = TableStatus::Available;
    uow.store_table(&table)?;

    uow.emit(HallEvent::TableReleased {
        booking_table_id: booking_table.id.clone(),
        table_id: booking_table.table_id.clone(),
    });
    Ok(())
}

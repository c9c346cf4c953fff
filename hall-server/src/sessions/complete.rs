//! Session settlement
//!
//! Completion closes every open clock, prices the session (table time
//! plus live order totals), marks the live orders COMPLETED, and
//! upserts the one financial record of the booking. Re-completing an
//! already-completed booking is a no-op returning the settled state,
//! so a retried settlement can never double-charge.

use crate::billing;
use crate::context::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::events::HallEvent;
use crate::orders;
use crate::sessions::release_table;
use chrono::{DateTime, Utc};
use shared::{Booking, BookingStatus, PaymentMethod, TransactionRecord, TransactionType};

/// Request to settle a session
#[derive(Debug, Clone)]
pub struct CompleteSession {
    pub booking_id: String,
    /// Settlement instant; defaults to now
    pub end_time: Option<DateTime<Utc>>,
    pub payment_method: PaymentMethod,
    pub operator_id: String,
}

/// Settle a session and write its financial record.
pub fn complete(uow: &mut UnitOfWork, req: &CompleteSession) -> ServiceResult<Booking> {
    let mut booking = uow.require_booking(&req.booking_id)?;
    match booking.status {
        BookingStatus::Completed => return Ok(booking),
        BookingStatus::Cancelled => {
            return Err(ServiceError::invalid_state(format!(
                "booking {} is cancelled and cannot be completed",
                booking.code
            )));
        }
        BookingStatus::Pending => {}
    }

    let settled_at = req.end_time.unwrap_or_else(|| uow.now());

    let mut table_total = 0i64;
    for mut booking_table in uow.booking_tables_for(&booking.id)? {
        if booking_table.is_open() {
            booking_table.end_time = Some(settled_at);
            uow.store_booking_table(&booking_table)?;
            release_table(uow, &booking_table)?;
        }
        let end = booking_table.end_time.unwrap_or(settled_at);
        table_total +=
            billing::table_time_cost(booking_table.start_time, end, booking_table.hourly_rate);
    }

    // Only live orders enter the bill: CANCELLED ones were rolled
    // back, COMPLETED ones were already settled outside this booking
    // flow and must not be billed a second time.
    let mut orders_total = 0i64;
    for mut order in uow.orders_for_booking(&booking.id)? {
        if order.status.is_terminal() {
            continue;
        }
        orders_total += order.total_amount;
        orders::complete_for_settlement(uow, &mut order)?;
    }

    let total_amount = table_total + orders_total;

    booking.status = BookingStatus::Completed;
    booking.end_time = Some(settled_at);
    booking.total_amount = total_amount;
    uow.store_booking(&booking)?;
    uow.remove_active_booking(&booking.id)?;

    upsert_transaction(uow, &booking, req, total_amount)?;

    tracing::info!(
        booking_id = %booking.id,
        code = %booking.code,
        table_total,
        orders_total,
        total_amount,
        "Session completed"
    );
    uow.emit(HallEvent::SessionCompleted {
        booking_id: booking.id.clone(),
        total_amount,
    });

    Ok(booking)
}

/// One financial record per booking, keyed by booking id.
fn upsert_transaction(
    uow: &mut UnitOfWork,
    booking: &Booking,
    req: &CompleteSession,
    amount: i64,
) -> ServiceResult<()> {
    let record = match uow.load_transaction(&booking.id)? {
        Some(mut existing) => {
            existing.amount = amount;
            existing.payment_method = req.payment_method;
            existing.operator_id = req.operator_id.clone();
            existing.updated_at = uow.now();
            existing
        }
        None => TransactionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            booking_id: booking.id.clone(),
            transaction_type: TransactionType::Revenue,
            amount,
            payment_method: req.payment_method,
            operator_id: req.operator_id.clone(),
            description: format!("Settlement of booking {}", booking.code),
            created_at: uow.now(),
            updated_at: uow.now(),
        },
    };
    uow.store_transaction(&record)
}

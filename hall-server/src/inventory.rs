//! Inventory ledger
//!
//! Single source of truth for stock quantity and cost basis. Every
//! increment/decrement writes exactly one ledger row and one product
//! update in the same unit of work; no intermediate state is
//! observable. Cost basis follows the weighted-average-cost policy and
//! is recomputed only by IN movements — OUT movements book at the
//! existing average cost (cost of goods sold).

use crate::billing;
use crate::context::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::events::HallEvent;
use shared::{InventoryLog, MovementReason, MovementType};

/// A requested stock movement
#[derive(Debug, Clone)]
pub struct MovementInput {
    pub product_id: String,
    pub movement: MovementType,
    pub quantity: i64,
    /// Unit cost of received goods; required for IN movements
    pub unit_cost: Option<i64>,
    pub reason: MovementReason,
    pub operator_id: String,
}

/// Apply one stock movement inside the caller's unit of work.
///
/// The product's stock is re-read here, inside the transaction, so the
/// insufficiency check never acts on a stale value.
pub fn record_movement(uow: &mut UnitOfWork, input: &MovementInput) -> ServiceResult<InventoryLog> {
    if input.quantity <= 0 {
        return Err(ServiceError::invalid_argument(
            "movement quantity must be positive",
        ));
    }

    let mut product = uow.require_product(&input.product_id)?;
    let stock_before = product.current_stock;

    match input.movement {
        MovementType::Out => {
            if stock_before < input.quantity {
                return Err(ServiceError::InsufficientStock {
                    product_id: product.id,
                    name: product.name,
                    requested: input.quantity,
                    available: stock_before,
                });
            }
            product.current_stock = stock_before - input.quantity;
            // cost basis unchanged: the OUT row snapshots the existing
            // average cost as cost-of-goods-sold
        }
        MovementType::In => {
            let unit_cost = input.unit_cost.ok_or_else(|| {
                ServiceError::invalid_argument("unit_cost is required for IN movements")
            })?;
            if unit_cost < 0 {
                return Err(ServiceError::invalid_argument("unit_cost must not be negative"));
            }
            product.cost =
                billing::weighted_average_cost(stock_before, product.cost, input.quantity, unit_cost);
            product.current_stock = stock_before + input.quantity;
        }
    }

    let log = InventoryLog {
        sequence: uow.next_ledger_sequence()?,
        product_id: product.id.clone(),
        movement: input.movement,
        quantity: input.quantity,
        reason: input.reason,
        stock_before,
        stock_after: product.current_stock,
        cost: product.cost,
        price: product.price,
        operator_id: input.operator_id.clone(),
        created_at: uow.now(),
    };

    uow.store_product(&product)?;
    uow.append_inventory_log(&log)?;

    tracing::debug!(
        product_id = %product.id,
        movement = ?input.movement,
        quantity = input.quantity,
        stock_after = product.current_stock,
        "Recorded stock movement"
    );
    uow.emit(HallEvent::StockMoved {
        product_id: product.id.clone(),
        movement: input.movement,
        quantity: input.quantity,
        stock_after: product.current_stock,
    });

    if input.movement == MovementType::Out && product.current_stock < product.min_stock {
        tracing::warn!(
            product_id = %product.id,
            current_stock = product.current_stock,
            min_stock = product.min_stock,
            "Product fell below minimum stock"
        );
        uow.emit(HallEvent::LowStock {
            product_id: product.id.clone(),
            current_stock: product.current_stock,
            min_stock: product.min_stock,
        });
    }

    Ok(log)
}

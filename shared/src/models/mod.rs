//! Domain models

pub mod billiard_table;
pub mod booking;
pub mod inventory_log;
pub mod order;
pub mod product;
pub mod transaction;

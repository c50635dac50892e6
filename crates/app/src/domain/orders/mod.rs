//! Orders
//!
//! Placing orders from carts and everything that happens to them afterwards:
//! cancellation, fulfilment status changes, listing and deletion.

pub mod data;
pub mod errors;
pub mod records;
pub(crate) mod repositories;
pub mod service;

pub use errors::OrdersServiceError;
pub use service::*;

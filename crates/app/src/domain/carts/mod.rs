//! Carts
//!
//! One cart per user, created on first use. The stored total always equals
//! the sum of each line's price snapshot times its quantity.

pub mod data;
pub mod errors;
pub mod records;
pub(crate) mod repositories;
pub mod service;

pub use errors::CartsServiceError;
pub use service::*;

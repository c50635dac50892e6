//! Products
//!
//! The stock ledger. Product stock only changes inside a transaction, through
//! a conditional decrement that never lets it go below zero.

pub mod data;
pub mod errors;
pub mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::ProductsServiceError;
pub use service::*;

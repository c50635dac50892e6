//! Payment Handlers

pub(crate) mod checkout;
pub(crate) mod webhook;

//! Cart Handlers

pub(crate) mod add;
pub(crate) mod clear;
pub(crate) mod decrement;
pub(crate) mod get;
pub(crate) mod increment;
pub(crate) mod quantity;
pub(crate) mod remove;
pub(crate) mod summary;

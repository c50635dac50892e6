//! Payments
//!
//! Checkout sessions, provider notifications and refunds. Provider calls go
//! through the injected [`gateway::PaymentGateway`].

pub mod errors;
pub mod gateway;
pub(crate) mod repository;
pub mod service;
pub mod stripe;

pub use errors::PaymentsServiceError;
pub use gateway::{GatewayError, PaymentGateway};
pub use service::*;
pub use stripe::{StripeClient, StripeConfig};

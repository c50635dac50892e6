//! Orders service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use storefront::{
    charges::ChargesError,
    coupons::CouponRejection,
    orders::{CancellationRejection, TransitionError},
    payments::RefundRejection,
};
use thiserror::Error;

use crate::domain::{payments::gateway::GatewayError, products::records::ProductUuid};

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("order not found")]
    NotFound,

    #[error("order belongs to another user")]
    Forbidden,

    #[error("cart is empty")]
    EmptyCart,

    #[error("only {available} units available")]
    InsufficientStock {
        product: ProductUuid,
        available: u64,
        requested: u32,
    },

    #[error(transparent)]
    NotCancellable(#[from] CancellationRejection),

    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),

    #[error(transparent)]
    Coupon(#[from] CouponRejection),

    #[error(transparent)]
    Refund(#[from] RefundRejection),

    #[error(transparent)]
    Charges(#[from] ChargesError),

    #[error("payment provider error")]
    PaymentProvider(#[from] GatewayError),

    #[error("order already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for OrdersServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

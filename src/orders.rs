//! Orders
//!
//! Order and payment status enumerations and the rules for moving between
//! them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a stored or requested status name is not recognised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} \"{value}\"")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

macro_rules! named_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Stored and serialized name.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant::new($kind, value)),
                }
            }
        }
    };
}

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Awaiting payment.
    Pending,

    /// Paid, or cash on delivery, and being prepared.
    Processing,

    /// Handed to the carrier.
    Shipped,

    /// Received by the customer.
    Delivered,

    /// Cancelled; stock has been returned.
    Cancelled,
}

named_enum!(OrderStatus, "order status", {
    Pending => "PENDING",
    Processing => "PROCESSING",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// No outcome yet.
    Pending,

    /// Captured by the provider.
    Paid,

    /// Failed or the session expired.
    Failed,

    /// Returned to the customer.
    Refunded,
}

named_enum!(PaymentStatus, "payment status", {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Paid in cash when the order is delivered.
    CashOnDelivery,

    /// Paid through the card payment provider.
    Card,
}

named_enum!(PaymentMethod, "payment method", {
    CashOnDelivery => "CASH_ON_DELIVERY",
    Card => "CARD",
});

impl PaymentMethod {
    /// Whether payment goes through the external provider.
    pub const fn uses_provider(self) -> bool {
        matches!(self, Self::Card)
    }
}

impl OrderStatus {
    /// Status a newly placed order starts in.
    pub const fn initial(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::CashOnDelivery => Self::Processing,
            PaymentMethod::Card => Self::Pending,
        }
    }

    /// `Cancelled` and `Delivered` have no outgoing transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Delivered)
    }

    /// Validate a fulfilment transition requested by an operator.
    ///
    /// Setting the current status again is accepted as a no-op. Cancellation
    /// has compensation attached and goes through [`plan_cancellation`].
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] for any move the fulfilment flow does not allow.
    pub fn transition_to(self, next: Self) -> Result<Self, TransitionError> {
        let allowed = (self == next && !self.is_terminal())
            || matches!(
                (self, next),
                (Self::Pending, Self::Processing)
                    | (Self::Processing, Self::Shipped)
                    | (Self::Shipped, Self::Delivered)
            );

        if allowed {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

/// An order status change that the fulfilment flow does not allow.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot move order from {from} to {to}")]
pub struct TransitionError {
    /// Current status.
    pub from: OrderStatus,

    /// Requested status.
    pub to: OrderStatus,
}

/// Why an order cannot be cancelled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CancellationRejection {
    /// The order is already cancelled.
    #[error("order is already cancelled")]
    AlreadyCancelled,

    /// The order has been delivered.
    #[error("order has already been delivered")]
    AlreadyDelivered,
}

/// What cancelling an order involves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPlan {
    /// Return the reserved units to stock.
    pub restore_stock: bool,

    /// Ask the provider to refund the captured payment.
    pub refund: bool,

    /// Payment status after cancellation.
    pub payment_status: PaymentStatus,
}

/// Work out the compensation for cancelling an order.
///
/// Stock is always returned. Captured provider payments are refunded; every
/// other payment status is left as it is.
///
/// # Errors
///
/// Returns a [`CancellationRejection`] for cancelled or delivered orders.
pub fn plan_cancellation(
    status: OrderStatus,
    payment_status: PaymentStatus,
    method: PaymentMethod,
) -> Result<CancellationPlan, CancellationRejection> {
    match status {
        OrderStatus::Cancelled => return Err(CancellationRejection::AlreadyCancelled),
        OrderStatus::Delivered => return Err(CancellationRejection::AlreadyDelivered),
        OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Shipped => {}
    }

    let refund = method.uses_provider() && payment_status == PaymentStatus::Paid;

    Ok(CancellationPlan {
        restore_stock: true,
        refund,
        payment_status: if refund {
            PaymentStatus::Refunded
        } else {
            payment_status
        },
    })
}

/// Page position and size for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// One-based page number.
    pub page: u32,

    /// Items per page.
    pub limit: u32,
}

impl Page {
    /// Default page size.
    pub const DEFAULT_LIMIT: u32 = 10;

    /// Largest accepted page size.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page from optional request values, clamping to the allowed range.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Number of rows to skip.
    pub fn offset(self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Number of pages needed for `total` rows.
    pub fn total_pages(self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

//! Charges
//!
//! Checked arithmetic for cart totals and order totals. All amounts are
//! unsigned minor currency units.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while computing charges.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChargesError {
    /// A line or running total exceeded the representable amount.
    #[error("amount overflowed while computing charges")]
    Overflow,
}

/// Flat charges added to every order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeSchedule {
    /// Tax added to each order.
    pub tax_amount: u64,

    /// Delivery charge added to each order.
    pub delivery_charge: u64,
}

/// Price of a single line: `unit_price * quantity`.
///
/// # Errors
///
/// Returns [`ChargesError::Overflow`] when the product does not fit in `u64`.
pub fn line_total(unit_price: u64, quantity: u32) -> Result<u64, ChargesError> {
    unit_price
        .checked_mul(u64::from(quantity))
        .ok_or(ChargesError::Overflow)
}

/// Sum of `unit_price * quantity` over the given lines.
///
/// An empty set of lines sums to zero.
///
/// # Errors
///
/// Returns [`ChargesError::Overflow`] when any line or the running total
/// does not fit in `u64`.
pub fn subtotal<I>(lines: I) -> Result<u64, ChargesError>
where
    I: IntoIterator<Item = (u64, u32)>,
{
    lines
        .into_iter()
        .try_fold(0_u64, |acc, (unit_price, quantity)| {
            acc.checked_add(line_total(unit_price, quantity)?)
                .ok_or(ChargesError::Overflow)
        })
}

/// The full price breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCharges {
    /// Sum of the line totals.
    pub subtotal: u64,

    /// Coupon discount, never more than the subtotal.
    pub discount: u64,

    /// Flat tax.
    pub tax_amount: u64,

    /// Flat delivery charge.
    pub delivery_charge: u64,

    /// `subtotal - discount + tax_amount + delivery_charge`.
    pub total: u64,
}

impl OrderCharges {
    /// Compute the breakdown for a subtotal, a discount and the flat charges.
    ///
    /// The discount is capped at the subtotal so the goods portion of an
    /// order can never become negative.
    ///
    /// # Errors
    ///
    /// Returns [`ChargesError::Overflow`] when the total does not fit in `u64`.
    pub fn compute(
        subtotal: u64,
        discount: u64,
        schedule: ChargeSchedule,
    ) -> Result<Self, ChargesError> {
        let discount = discount.min(subtotal);

        let total = (subtotal - discount)
            .checked_add(schedule.tax_amount)
            .and_then(|total| total.checked_add(schedule.delivery_charge))
            .ok_or(ChargesError::Overflow)?;

        Ok(Self {
            subtotal,
            discount,
            tax_amount: schedule.tax_amount,
            delivery_charge: schedule.delivery_charge,
            total,
        })
    }
}

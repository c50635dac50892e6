//! Order Charges Config

use clap::Args;
use storefront::charges::ChargeSchedule;

/// Flat charges added to every order, in minor units.
#[derive(Debug, Args)]
pub struct ChargesConfig {
    /// Tax added to each order
    #[arg(long, env = "ORDER_TAX_AMOUNT", default_value_t = 0)]
    pub order_tax_amount: u64,

    /// Delivery charge added to each order
    #[arg(long, env = "ORDER_DELIVERY_CHARGE", default_value_t = 0)]
    pub order_delivery_charge: u64,
}

impl ChargesConfig {
    #[must_use]
    pub fn schedule(&self) -> ChargeSchedule {
        ChargeSchedule {
            tax_amount: self.order_tax_amount,
            delivery_charge: self.order_delivery_charge,
        }
    }
}

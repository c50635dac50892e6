//! Order Data

use jiff::Timestamp;
use storefront::orders::{OrderStatus, Page, PaymentMethod};

use crate::domain::users::{AddressUuid, UserUuid};

/// New Order Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub address_uuid: AddressUuid,
    pub payment_method: PaymentMethod,
}

/// Filters for the admin order listing. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub order_status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub user_uuid: Option<UserUuid>,
    pub created_from: Option<Timestamp>,
    pub created_to: Option<Timestamp>,
    pub page: Page,
}

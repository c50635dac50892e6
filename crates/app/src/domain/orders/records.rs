//! Order Records

use jiff::Timestamp;
use storefront::{
    charges::OrderCharges,
    orders::{OrderStatus, PaymentMethod, PaymentStatus},
};

use crate::{
    domain::{
        coupons::records::CouponUuid,
        products::records::ProductUuid,
        users::{AddressUuid, UserUuid},
    },
    uuids::TypedUuid,
};

/// Order UUID
pub type OrderUuid = TypedUuid<OrderRecord>;

/// Order Record
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub uuid: OrderUuid,
    pub user_uuid: UserUuid,
    pub address_uuid: AddressUuid,
    pub charges: OrderCharges,
    pub coupon_uuid: Option<CouponUuid>,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub checkout_url: Option<String>,
    pub items: Vec<OrderItemRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Order Item UUID
pub type OrderItemUuid = TypedUuid<OrderItemRecord>;

/// Order Item Record
#[derive(Debug, Clone)]
pub struct OrderItemRecord {
    pub uuid: OrderItemUuid,
    pub order_uuid: OrderUuid,
    pub product_uuid: ProductUuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub created_at: Timestamp,
}

/// A newly placed order and, for provider payments, where to pay.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: OrderRecord,
    pub checkout_url: Option<String>,
}

/// One page of the admin order listing.
#[derive(Debug, Clone)]
pub struct OrdersPage {
    pub orders: Vec<OrderRecord>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

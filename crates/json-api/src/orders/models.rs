//! Order response bodies.

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_app::domain::orders::records::{OrderItemRecord, OrderRecord, OrdersPage};

/// Order Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderResponse {
    pub uuid: Uuid,
    pub user_uuid: Uuid,
    pub address_uuid: Uuid,

    /// Sum of the line totals
    pub subtotal: u64,

    /// Coupon discount
    pub discount: u64,

    pub tax_amount: u64,
    pub delivery_charge: u64,

    /// `subtotal - discount + tax_amount + delivery_charge`
    pub total: u64,

    pub coupon_uuid: Option<Uuid>,

    /// PENDING, PROCESSING, SHIPPED, DELIVERED or CANCELLED
    pub order_status: String,

    /// PENDING, PAID, FAILED or REFUNDED
    pub payment_status: String,

    /// CASH_ON_DELIVERY or CARD
    pub payment_method: String,

    /// Hosted checkout page for card orders
    pub checkout_url: Option<String>,

    pub items: Vec<OrderItemResponse>,

    pub created_at: String,
    pub updated_at: String,
}

impl From<OrderRecord> for OrderResponse {
    fn from(order: OrderRecord) -> Self {
        Self {
            uuid: order.uuid.into(),
            user_uuid: order.user_uuid.into(),
            address_uuid: order.address_uuid.into(),
            subtotal: order.charges.subtotal,
            discount: order.charges.discount,
            tax_amount: order.charges.tax_amount,
            delivery_charge: order.charges.delivery_charge,
            total: order.charges.total,
            coupon_uuid: order.coupon_uuid.map(Into::into),
            order_status: order.order_status.to_string(),
            payment_status: order.payment_status.to_string(),
            payment_method: order.payment_method.to_string(),
            checkout_url: order.checkout_url,
            items: order.items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at.to_string(),
            updated_at: order.updated_at.to_string(),
        }
    }
}

/// Order Item Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrderItemResponse {
    pub uuid: Uuid,
    pub product_uuid: Uuid,
    pub product_name: String,
    pub quantity: u32,

    /// Unit price charged
    pub unit_price: u64,
}

impl From<OrderItemRecord> for OrderItemResponse {
    fn from(item: OrderItemRecord) -> Self {
        Self {
            uuid: item.uuid.into(),
            product_uuid: item.product_uuid.into(),
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// Orders Page Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct OrdersPageResponse {
    pub orders: Vec<OrderResponse>,

    /// Orders matching the filters across all pages
    pub total: u64,

    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl From<OrdersPage> for OrdersPageResponse {
    fn from(page: OrdersPage) -> Self {
        Self {
            orders: page.orders.into_iter().map(OrderResponse::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages,
        }
    }
}

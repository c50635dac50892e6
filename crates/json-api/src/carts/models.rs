//! Cart response bodies.

use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_app::domain::carts::records::{CartItemRecord, CartRecord, CartSummary};

/// Cart Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartResponse {
    /// The unique identifier of the cart
    pub uuid: Uuid,

    /// Sum of every line's price snapshot times its quantity
    pub total: u64,

    /// Coupon attached to the cart, if any
    pub coupon_uuid: Option<Uuid>,

    /// The lines in the cart
    pub items: Vec<CartItemResponse>,

    /// The date and time the cart was created
    pub created_at: String,

    /// The date and time the cart was last updated
    pub updated_at: String,
}

impl From<CartRecord> for CartResponse {
    fn from(cart: CartRecord) -> Self {
        Self {
            uuid: cart.uuid.into(),
            total: cart.total,
            coupon_uuid: cart.coupon_uuid.map(Into::into),
            items: cart.items.into_iter().map(CartItemResponse::from).collect(),
            created_at: cart.created_at.to_string(),
            updated_at: cart.updated_at.to_string(),
        }
    }
}

/// Cart Item Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartItemResponse {
    /// The unique identifier of the cart line
    pub uuid: Uuid,

    /// The product on this line
    pub product_uuid: Uuid,

    /// Product name
    pub product_name: String,

    /// Units of the product
    pub quantity: u32,

    /// Unit price when the product was first added
    pub price_snapshot: u64,

    /// Current catalogue price
    pub price: u64,

    /// Units currently in stock
    pub stock: u64,
}

impl From<CartItemRecord> for CartItemResponse {
    fn from(item: CartItemRecord) -> Self {
        Self {
            uuid: item.uuid.into(),
            product_uuid: item.product_uuid.into(),
            product_name: item.product_name,
            quantity: item.quantity,
            price_snapshot: item.price_snapshot,
            price: item.price,
            stock: item.stock,
        }
    }
}

/// Cart Summary Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct CartSummaryResponse {
    /// Total units across all lines
    pub item_count: u64,

    /// Cart total
    pub total: u64,

    /// Coupon attached to the cart, if any
    pub coupon_uuid: Option<Uuid>,

    /// The lines in the cart
    pub items: Vec<CartItemResponse>,
}

impl From<CartSummary> for CartSummaryResponse {
    fn from(summary: CartSummary) -> Self {
        Self {
            item_count: summary.item_count,
            total: summary.total,
            coupon_uuid: summary.coupon_uuid.map(Into::into),
            items: summary
                .items
                .into_iter()
                .map(CartItemResponse::from)
                .collect(),
        }
    }
}

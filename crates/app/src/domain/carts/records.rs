//! Cart Records

use jiff::Timestamp;

use crate::{
    domain::{coupons::records::CouponUuid, products::records::ProductUuid, users::UserUuid},
    uuids::TypedUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<CartRecord>;

/// Cart Record
#[derive(Debug, Clone)]
pub struct CartRecord {
    pub uuid: CartUuid,
    pub user_uuid: UserUuid,
    pub total: u64,
    pub coupon_uuid: Option<CouponUuid>,
    pub items: Vec<CartItemRecord>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartRecord {
    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// `(price_snapshot, quantity)` for every line.
    pub fn lines(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.items
            .iter()
            .map(|item| (item.price_snapshot, item.quantity))
    }
}

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItemRecord>;

/// Cart Item Record
///
/// `price` and `stock` are the product's live values; the line is priced from
/// `price_snapshot`, captured when the product was first added.
#[derive(Debug, Clone)]
pub struct CartItemRecord {
    pub uuid: CartItemUuid,
    pub cart_uuid: CartUuid,
    pub product_uuid: ProductUuid,
    pub product_name: String,
    pub quantity: u32,
    pub price_snapshot: u64,
    pub price: u64,
    pub stock: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Cart Summary
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub item_count: u64,
    pub total: u64,
    pub coupon_uuid: Option<CouponUuid>,
    pub items: Vec<CartItemRecord>,
}

impl From<CartRecord> for CartSummary {
    fn from(cart: CartRecord) -> Self {
        Self {
            item_count: cart.item_count(),
            total: cart.total,
            coupon_uuid: cart.coupon_uuid,
            items: cart.items,
        }
    }
}

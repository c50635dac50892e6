//! Carts service.

use async_trait::async_trait;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use storefront::charges;
use tracing::info;

use crate::{
    database::Db,
    domain::{
        carts::{
            data::NewCartItem,
            errors::CartsServiceError,
            records::{CartItemRecord, CartItemUuid, CartRecord, CartSummary},
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        products::repository::PgProductsRepository,
        users::UserUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    carts: PgCartsRepository,
    items: PgCartItemsRepository,
    products: PgProductsRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            carts: PgCartsRepository::new(),
            items: PgCartItemsRepository::new(),
            products: PgProductsRepository::new(),
        }
    }

    /// Lock the user's cart, creating it first when absent.
    async fn lock_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<CartRecord, CartsServiceError> {
        self.carts.ensure_cart(tx, user).await?;

        self.carts
            .lock_cart(tx, user)
            .await?
            .ok_or(CartsServiceError::NotFound)
    }

    /// Load an item from the locked cart, rejecting items owned by others.
    async fn owned_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: &CartRecord,
        item: CartItemUuid,
    ) -> Result<CartItemRecord, CartsServiceError> {
        let item = self
            .items
            .get_cart_item(tx, item)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        if item.cart_uuid != cart.uuid {
            return Err(CartsServiceError::Forbidden);
        }

        Ok(item)
    }

    /// Reload the cart's lines and persist the recomputed total.
    async fn refresh_total(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        mut cart: CartRecord,
    ) -> Result<CartRecord, CartsServiceError> {
        cart.items = self.items.get_cart_items(tx, cart.uuid).await?;
        cart.total = charges::subtotal(cart.lines())?;

        self.carts.update_total(tx, cart.uuid, cart.total).await?;

        Ok(cart)
    }

    async fn change_quantity(
        &self,
        user: UserUuid,
        item: CartItemUuid,
        quantity: impl FnOnce(u32) -> Result<u32, CartsServiceError> + Send,
    ) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.lock_cart(&mut tx, user).await?;
        let line = self.owned_item(&mut tx, &cart, item).await?;

        let quantity = quantity(line.quantity)?;

        if u64::from(quantity) > line.stock {
            return Err(CartsServiceError::InsufficientStock {
                available: line.stock,
            });
        }

        self.items.update_quantity(&mut tx, item, quantity).await?;

        let cart = self.refresh_total(&mut tx, cart).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, cart_item_uuid = %item, quantity, "updated cart item quantity");

        Ok(cart)
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    #[tracing::instrument(
        name = "carts.service.get_or_create_cart",
        skip(self),
        fields(user_uuid = %user),
        err
    )]
    async fn get_or_create_cart(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let mut cart = self.lock_cart(&mut tx, user).await?;
        cart.items = self.items.get_cart_items(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.add_item",
        skip(self, item),
        fields(
            user_uuid = %user,
            product_uuid = %item.product_uuid,
            quantity = item.quantity
        ),
        err
    )]
    async fn add_item(
        &self,
        user: UserUuid,
        item: NewCartItem,
    ) -> Result<CartRecord, CartsServiceError> {
        if item.quantity < 1 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let cart = self.lock_cart(&mut tx, user).await?;
        let product = self.products.get_product(&mut tx, item.product_uuid).await?;

        let existing = self
            .items
            .find_by_product(&mut tx, cart.uuid, product.uuid)
            .await?;

        let requested = existing
            .as_ref()
            .map_or(Some(item.quantity), |line| {
                line.quantity.checked_add(item.quantity)
            })
            .ok_or(CartsServiceError::InvalidQuantity)?;

        if u64::from(requested) > product.stock {
            return Err(CartsServiceError::InsufficientStock {
                available: product.stock,
            });
        }

        match existing {
            Some(line) => {
                self.items
                    .update_quantity(&mut tx, line.uuid, requested)
                    .await?;
            }
            None => {
                self.items
                    .create_cart_item(&mut tx, cart.uuid, product.uuid, requested, product.price)
                    .await?;
            }
        }

        let cart = self.refresh_total(&mut tx, cart).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, total = cart.total, "added item to cart");

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.set_quantity",
        skip(self),
        fields(user_uuid = %user, cart_item_uuid = %item),
        err
    )]
    async fn set_quantity(
        &self,
        user: UserUuid,
        item: CartItemUuid,
        quantity: u32,
    ) -> Result<CartRecord, CartsServiceError> {
        if quantity < 1 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        self.change_quantity(user, item, |_| Ok(quantity)).await
    }

    #[tracing::instrument(
        name = "carts.service.increment_item",
        skip(self),
        fields(user_uuid = %user, cart_item_uuid = %item),
        err
    )]
    async fn increment_item(
        &self,
        user: UserUuid,
        item: CartItemUuid,
    ) -> Result<CartRecord, CartsServiceError> {
        self.change_quantity(user, item, |current| {
            current
                .checked_add(1)
                .ok_or(CartsServiceError::InvalidQuantity)
        })
        .await
    }

    #[tracing::instrument(
        name = "carts.service.decrement_item",
        skip(self),
        fields(user_uuid = %user, cart_item_uuid = %item),
        err
    )]
    async fn decrement_item(
        &self,
        user: UserUuid,
        item: CartItemUuid,
    ) -> Result<CartRecord, CartsServiceError> {
        self.change_quantity(user, item, |current| {
            current
                .checked_sub(1)
                .filter(|quantity| *quantity >= 1)
                .ok_or(CartsServiceError::QuantityBelowMinimum)
        })
        .await
    }

    #[tracing::instrument(
        name = "carts.service.remove_item",
        skip(self),
        fields(user_uuid = %user, cart_item_uuid = %item),
        err
    )]
    async fn remove_item(
        &self,
        user: UserUuid,
        item: CartItemUuid,
    ) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.lock_cart(&mut tx, user).await?;
        let line = self.owned_item(&mut tx, &cart, item).await?;

        self.items
            .delete_cart_item(&mut tx, cart.uuid, line.uuid)
            .await?;

        let cart = self.refresh_total(&mut tx, cart).await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, cart_item_uuid = %item, "removed item from cart");

        Ok(cart)
    }

    #[tracing::instrument(
        name = "carts.service.clear_cart",
        skip(self),
        fields(user_uuid = %user, removed = tracing::field::Empty),
        err
    )]
    async fn clear_cart(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let mut cart = self.lock_cart(&mut tx, user).await?;

        let removed = self.items.delete_cart_items(&mut tx, cart.uuid).await?;
        self.carts.reset_cart(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        tracing::Span::current().record("removed", removed);

        cart.items.clear();
        cart.total = 0;
        cart.coupon_uuid = None;

        info!(cart_uuid = %cart.uuid, "cleared cart");

        Ok(cart)
    }

    async fn get_cart_summary(&self, user: UserUuid) -> Result<CartSummary, CartsServiceError> {
        let cart = self.get_or_create_cart(user).await?;

        Ok(CartSummary::from(cart))
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve the user's cart with its lines, creating an empty one if
    /// the user has none yet.
    async fn get_or_create_cart(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError>;

    /// Add a product to the cart. Adding a product already in the cart
    /// increases that line's quantity and keeps its original price snapshot.
    async fn add_item(
        &self,
        user: UserUuid,
        item: NewCartItem,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Set the quantity of one of the user's cart lines.
    async fn set_quantity(
        &self,
        user: UserUuid,
        item: CartItemUuid,
        quantity: u32,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Increase a line's quantity by one.
    async fn increment_item(
        &self,
        user: UserUuid,
        item: CartItemUuid,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Decrease a line's quantity by one. A line never drops below one unit.
    async fn decrement_item(
        &self,
        user: UserUuid,
        item: CartItemUuid,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Remove a line from the cart.
    async fn remove_item(
        &self,
        user: UserUuid,
        item: CartItemUuid,
    ) -> Result<CartRecord, CartsServiceError>;

    /// Remove every line and detach any coupon.
    async fn clear_cart(&self, user: UserUuid) -> Result<CartRecord, CartsServiceError>;

    /// Item count, total and lines of the user's cart.
    async fn get_cart_summary(&self, user: UserUuid) -> Result<CartSummary, CartsServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::TestContext;

    use super::*;

    #[tokio::test]
    async fn new_user_gets_empty_cart() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();

        let cart = ctx.carts.get_or_create_cart(user).await?;
        let again = ctx.carts.get_or_create_cart(user).await?;

        assert_eq!(cart.user_uuid, user);
        assert_eq!(cart.total, 0);
        assert!(cart.items.is_empty());
        assert_eq!(cart.uuid, again.uuid, "one cart per user");

        Ok(())
    }

    #[tokio::test]
    async fn add_item_sets_snapshot_and_total() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = ctx.create_product(1_000, 10).await;

        let cart = ctx
            .carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 2,
                },
            )
            .await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].price_snapshot, 1_000);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.total, 2_000);

        Ok(())
    }

    #[tokio::test]
    async fn adding_same_product_merges_lines_and_keeps_snapshot() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = ctx.create_product(500, 10).await;

        ctx.carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 1,
                },
            )
            .await?;

        ctx.set_product_price(product.uuid, 900).await;

        let cart = ctx
            .carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 2,
                },
            )
            .await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.items[0].price_snapshot, 500);
        assert_eq!(cart.items[0].price, 900);
        assert_eq!(cart.total, 1_500);

        Ok(())
    }

    #[tokio::test]
    async fn add_item_zero_quantity_is_rejected() {
        let ctx = TestContext::new().await;
        let product = ctx.create_product(500, 10).await;

        let result = ctx
            .carts
            .add_item(
                UserUuid::new(),
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 0,
                },
            )
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::InvalidQuantity)),
            "expected InvalidQuantity, got {result:?}"
        );
    }

    #[tokio::test]
    async fn add_exactly_available_stock_then_one_more_fails() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = ctx.create_product(250, 3).await;

        let cart = ctx
            .carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 3,
                },
            )
            .await?;

        assert_eq!(cart.total, 750);

        let result = ctx
            .carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 1,
                },
            )
            .await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InsufficientStock { available: 3 })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        let cart = ctx.carts.get_or_create_cart(user).await?;

        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(ctx.product_stock(product.uuid).await, 3);

        Ok(())
    }

    #[tokio::test]
    async fn add_unknown_product_returns_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx
            .carts
            .add_item(
                UserUuid::new(),
                NewCartItem {
                    product_uuid: crate::domain::products::records::ProductUuid::new(),
                    quantity: 1,
                },
            )
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn decrement_below_one_is_rejected_and_quantity_unchanged() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = ctx.create_product(400, 5).await;

        let cart = ctx
            .carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 1,
                },
            )
            .await?;

        let item = cart.items[0].uuid;

        let result = ctx.carts.decrement_item(user, item).await;

        assert!(
            matches!(result, Err(CartsServiceError::QuantityBelowMinimum)),
            "expected QuantityBelowMinimum, got {result:?}"
        );

        let cart = ctx.carts.get_or_create_cart(user).await?;

        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(cart.total, 400);

        Ok(())
    }

    #[tokio::test]
    async fn increment_and_decrement_keep_total_in_step() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = ctx.create_product(400, 5).await;

        let cart = ctx
            .carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 1,
                },
            )
            .await?;

        let item = cart.items[0].uuid;

        let cart = ctx.carts.increment_item(user, item).await?;
        assert_eq!(cart.total, 800);

        let cart = ctx.carts.increment_item(user, item).await?;
        assert_eq!(cart.total, 1_200);

        let cart = ctx.carts.decrement_item(user, item).await?;
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.total, 800);

        Ok(())
    }

    #[tokio::test]
    async fn set_quantity_beyond_stock_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = ctx.create_product(100, 4).await;

        let cart = ctx
            .carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 1,
                },
            )
            .await?;

        let item = cart.items[0].uuid;

        let result = ctx.carts.set_quantity(user, item, 5).await;

        assert!(
            matches!(
                result,
                Err(CartsServiceError::InsufficientStock { available: 4 })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        let cart = ctx.carts.set_quantity(user, item, 4).await?;
        assert_eq!(cart.total, 400);

        Ok(())
    }

    #[tokio::test]
    async fn other_users_item_is_forbidden() -> TestResult {
        let ctx = TestContext::new().await;
        let owner = UserUuid::new();
        let intruder = UserUuid::new();
        let product = ctx.create_product(100, 4).await;

        let cart = ctx
            .carts
            .add_item(
                owner,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 1,
                },
            )
            .await?;

        let item = cart.items[0].uuid;

        let result = ctx.carts.set_quantity(intruder, item, 2).await;

        assert!(
            matches!(result, Err(CartsServiceError::Forbidden)),
            "expected Forbidden, got {result:?}"
        );

        let result = ctx.carts.remove_item(intruder, item).await;

        assert!(
            matches!(result, Err(CartsServiceError::Forbidden)),
            "expected Forbidden, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx
            .carts
            .increment_item(UserUuid::new(), CartItemUuid::new())
            .await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn remove_item_recomputes_total() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let lamp = ctx.create_product(100, 4).await;
        let desk = ctx.create_product(2_500, 4).await;

        for product in [&lamp, &desk] {
            ctx.carts
                .add_item(
                    user,
                    NewCartItem {
                        product_uuid: product.uuid,
                        quantity: 2,
                    },
                )
                .await?;
        }

        let cart = ctx.carts.get_or_create_cart(user).await?;
        assert_eq!(cart.total, 5_200);

        let lamp_line = cart
            .items
            .iter()
            .find(|item| item.product_uuid == lamp.uuid)
            .map(|item| item.uuid)
            .ok_or("lamp line missing")?;

        let cart = ctx.carts.remove_item(user, lamp_line).await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total, 5_000);

        Ok(())
    }

    #[tokio::test]
    async fn clear_cart_empties_lines_and_total() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = ctx.create_product(100, 4).await;

        ctx.carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 2,
                },
            )
            .await?;

        let cart = ctx.carts.clear_cart(user).await?;

        assert!(cart.items.is_empty());
        assert_eq!(cart.total, 0);
        assert!(cart.coupon_uuid.is_none());

        let summary = ctx.carts.get_cart_summary(user).await?;

        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.total, 0);

        Ok(())
    }

    #[tokio::test]
    async fn summary_counts_units_across_lines() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let a = ctx.create_product(100, 10).await;
        let b = ctx.create_product(300, 10).await;

        for (product, quantity) in [(&a, 2), (&b, 3)] {
            ctx.carts
                .add_item(
                    user,
                    NewCartItem {
                        product_uuid: product.uuid,
                        quantity,
                    },
                )
                .await?;
        }

        let summary = ctx.carts.get_cart_summary(user).await?;

        assert_eq!(summary.item_count, 5);
        assert_eq!(summary.total, 1_100);
        assert_eq!(summary.items.len(), 2);

        Ok(())
    }
}

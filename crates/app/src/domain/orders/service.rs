//! Orders service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rustc_hash::FxHashMap;
use sqlx::{Postgres, Transaction};
use storefront::{
    charges::{self, ChargeSchedule, OrderCharges},
    orders::{OrderStatus, plan_cancellation},
    payments::RefundRejection,
};
use tracing::{Span, info};

use crate::{
    database::Db,
    domain::{
        carts::{
            records::{CartItemRecord, CartRecord},
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        coupons::{
            records::CouponUuid,
            repositories::{PgCouponUsagesRepository, PgCouponsRepository},
        },
        orders::{
            data::{NewOrder, OrderFilter},
            errors::OrdersServiceError,
            records::{OrderItemRecord, OrderRecord, OrderUuid, OrdersPage, PlacedOrder},
            repositories::{PgOrderItemsRepository, PgOrdersRepository},
        },
        payments::gateway::{
            CheckoutLine, CheckoutSessionRequest, PaymentGateway, refund_idempotency_key,
        },
        products::repository::PgProductsRepository,
        users::UserUuid,
    },
};

#[derive(Clone)]
pub struct PgOrdersService {
    db: Db,
    gateway: Arc<dyn PaymentGateway>,
    schedule: ChargeSchedule,
    orders: PgOrdersRepository,
    items: PgOrderItemsRepository,
    carts: PgCartsRepository,
    cart_items: PgCartItemsRepository,
    coupons: PgCouponsRepository,
    coupon_usages: PgCouponUsagesRepository,
    products: PgProductsRepository,
}

impl PgOrdersService {
    #[must_use]
    pub fn new(db: Db, gateway: Arc<dyn PaymentGateway>, schedule: ChargeSchedule) -> Self {
        Self {
            db,
            gateway,
            schedule,
            orders: PgOrdersRepository::new(),
            items: PgOrderItemsRepository::new(),
            carts: PgCartsRepository::new(),
            cart_items: PgCartItemsRepository::new(),
            coupons: PgCouponsRepository::new(),
            coupon_usages: PgCouponUsagesRepository::new(),
            products: PgProductsRepository::new(),
        }
    }

    /// Discount from the cart's coupon, re-checked against the locked coupon
    /// row. Returns the coupon to redeem alongside the discount.
    async fn coupon_discount(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        cart: &CartRecord,
        subtotal: u64,
    ) -> Result<Option<(CouponUuid, u64)>, OrdersServiceError> {
        let Some(coupon) = cart.coupon_uuid else {
            return Ok(None);
        };

        let Some(coupon) = self.coupons.lock_coupon(tx, coupon).await? else {
            return Ok(None);
        };

        let redemptions = self
            .coupon_usages
            .count_user_usages(tx, coupon.uuid, user)
            .await?;

        coupon
            .terms
            .check_redemption(Timestamp::now(), subtotal, redemptions)?;

        Ok(Some((coupon.uuid, coupon.discount.discount_for(subtotal))))
    }

    /// Take every line's quantity out of stock, failing on the first product
    /// that no longer has enough. Product rows are locked in uuid order.
    async fn reserve_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lines: &[CartItemRecord],
    ) -> Result<(), OrdersServiceError> {
        let mut ordered: Vec<&CartItemRecord> = lines.iter().collect();

        ordered.sort_unstable_by_key(|line| line.product_uuid);

        for line in ordered {
            let reserved = self
                .products
                .reserve_stock(tx, line.product_uuid, line.quantity)
                .await?;

            if reserved.is_none() {
                let available = self.products.get_stock(tx, line.product_uuid).await?;

                return Err(OrdersServiceError::InsufficientStock {
                    product: line.product_uuid,
                    available,
                    requested: line.quantity,
                });
            }
        }

        Ok(())
    }

    /// Return an order's units to stock.
    async fn restore_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        items: &[OrderItemRecord],
    ) -> Result<(), OrdersServiceError> {
        self.products
            .restore_lines(
                tx,
                items.iter().map(|item| (item.product_uuid, item.quantity)),
            )
            .await?;

        Ok(())
    }

    /// Cancel a locked order: refund captured provider payments, restore
    /// stock and mark it cancelled.
    async fn compensate(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderRecord,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let plan = plan_cancellation(
            order.order_status,
            order.payment_status,
            order.payment_method,
        )?;

        let items = self.items.get_order_items(tx, &[order.uuid]).await?;

        if plan.refund {
            let reference = order
                .payment_intent_id
                .as_deref()
                .filter(|reference| !reference.is_empty())
                .ok_or(RefundRejection::MissingPaymentReference)?;

            let refund = self
                .gateway
                .create_refund(reference, &refund_idempotency_key(order.uuid))
                .await?;

            info!(order_uuid = %order.uuid, refund_id = %refund.refund_id, "refunded cancelled order");
        }

        if plan.restore_stock {
            self.restore_stock(tx, &items).await?;
        }

        let mut cancelled = self
            .orders
            .update_status(tx, order.uuid, OrderStatus::Cancelled, plan.payment_status)
            .await?;

        cancelled.items = items;

        Ok(cancelled)
    }

    /// Attach items to each order.
    async fn with_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        mut orders: Vec<OrderRecord>,
    ) -> Result<Vec<OrderRecord>, OrdersServiceError> {
        let uuids: Vec<OrderUuid> = orders.iter().map(|order| order.uuid).collect();

        let mut grouped: FxHashMap<OrderUuid, Vec<OrderItemRecord>> = FxHashMap::default();

        for item in self.items.get_order_items(tx, &uuids).await? {
            grouped.entry(item.order_uuid).or_default().push(item);
        }

        for order in &mut orders {
            order.items = grouped.remove(&order.uuid).unwrap_or_default();
        }

        Ok(orders)
    }

    async fn load_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut order = self
            .orders
            .get_order(tx, order)
            .await?
            .ok_or(OrdersServiceError::NotFound)?;

        order.items = self.items.get_order_items(tx, &[order.uuid]).await?;

        Ok(order)
    }
}

#[async_trait]
impl OrdersService for PgOrdersService {
    #[tracing::instrument(
        name = "orders.service.create_order",
        skip(self, order),
        fields(
            user_uuid = %user,
            payment_method = %order.payment_method,
            order_uuid = tracing::field::Empty,
            total = tracing::field::Empty
        ),
        err
    )]
    async fn create_order(
        &self,
        user: UserUuid,
        order: NewOrder,
    ) -> Result<PlacedOrder, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts
            .lock_cart(&mut tx, user)
            .await?
            .ok_or(OrdersServiceError::EmptyCart)?;

        let lines = self.cart_items.get_cart_items(&mut tx, cart.uuid).await?;

        if lines.is_empty() {
            return Err(OrdersServiceError::EmptyCart);
        }

        if let Some(short) = lines
            .iter()
            .find(|line| u64::from(line.quantity) > line.stock)
        {
            return Err(OrdersServiceError::InsufficientStock {
                product: short.product_uuid,
                available: short.stock,
                requested: short.quantity,
            });
        }

        let subtotal = charges::subtotal(
            lines
                .iter()
                .map(|line| (line.price_snapshot, line.quantity)),
        )?;

        let redemption = self
            .coupon_discount(&mut tx, user, &cart, subtotal)
            .await?;

        let discount = redemption.map_or(0, |(_, discount)| discount);
        let charges = OrderCharges::compute(subtotal, discount, self.schedule)?;

        let order_uuid = OrderUuid::new();

        let span = Span::current();

        span.record("order_uuid", tracing::field::display(order_uuid));
        span.record("total", charges.total);

        let mut placed = self
            .orders
            .create_order(
                &mut tx,
                order_uuid,
                user,
                &order,
                &charges,
                redemption.map(|(coupon, _)| coupon),
            )
            .await?;

        for line in &lines {
            self.items
                .create_order_item(
                    &mut tx,
                    order_uuid,
                    line.product_uuid,
                    line.quantity,
                    line.price_snapshot,
                )
                .await?;
        }

        self.reserve_stock(&mut tx, &lines).await?;

        if let Some((coupon, _)) = redemption {
            self.coupon_usages
                .create_usage(&mut tx, coupon, user, order_uuid)
                .await?;

            self.coupons.increment_used_count(&mut tx, coupon).await?;
        }

        self.cart_items.delete_cart_items(&mut tx, cart.uuid).await?;
        self.carts.reset_cart(&mut tx, cart.uuid).await?;

        if order.payment_method.uses_provider() {
            let session = self
                .gateway
                .create_checkout_session(CheckoutSessionRequest {
                    order_uuid,
                    user_uuid: user,
                    lines: lines
                        .iter()
                        .map(|line| CheckoutLine {
                            name: line.product_name.clone(),
                            unit_amount: line.price_snapshot,
                            quantity: line.quantity,
                        })
                        .collect(),
                    charges,
                })
                .await?;

            placed = self
                .orders
                .set_payment_session(
                    &mut tx,
                    order_uuid,
                    &session.session_id,
                    session.payment_intent_id.as_deref(),
                    &session.url,
                )
                .await?;
        }

        placed.items = self.items.get_order_items(&mut tx, &[order_uuid]).await?;

        tx.commit().await?;

        info!(
            order_uuid = %placed.uuid,
            order_status = %placed.order_status,
            total = placed.charges.total,
            "placed order"
        );

        Ok(PlacedOrder {
            checkout_url: placed.checkout_url.clone(),
            order: placed,
        })
    }

    async fn list_orders(&self, user: UserUuid) -> Result<Vec<OrderRecord>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let orders = self.orders.list_user_orders(&mut tx, user).await?;
        let orders = self.with_items(&mut tx, orders).await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn get_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.load_order(&mut tx, order).await?;

        tx.commit().await?;

        if order.user_uuid != user {
            return Err(OrdersServiceError::NotFound);
        }

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.cancel_order",
        skip(self),
        fields(user_uuid = %user, order_uuid = %order),
        err
    )]
    async fn cancel_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let locked = self
            .orders
            .lock_order(&mut tx, order)
            .await?
            .ok_or(OrdersServiceError::NotFound)?;

        if locked.user_uuid != user {
            return Err(OrdersServiceError::Forbidden);
        }

        let cancelled = self.compensate(&mut tx, locked).await?;

        tx.commit().await?;

        info!(
            order_uuid = %cancelled.uuid,
            payment_status = %cancelled.payment_status,
            "cancelled order"
        );

        Ok(cancelled)
    }

    #[tracing::instrument(
        name = "orders.service.admin_list_orders",
        skip(self, filter),
        fields(page = filter.page.page, limit = filter.page.limit, total = tracing::field::Empty),
        err
    )]
    async fn admin_list_orders(
        &self,
        filter: OrderFilter,
    ) -> Result<OrdersPage, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let total = self.orders.count_orders(&mut tx, &filter).await?;
        let orders = self.orders.list_orders(&mut tx, &filter).await?;
        let orders = self.with_items(&mut tx, orders).await?;

        tx.commit().await?;

        Span::current().record("total", total);

        Ok(OrdersPage {
            orders,
            total,
            page: filter.page.page,
            limit: filter.page.limit,
            total_pages: filter.page.total_pages(total),
        })
    }

    async fn admin_get_order(&self, order: OrderUuid) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.load_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    #[tracing::instrument(
        name = "orders.service.update_order_status",
        skip(self),
        fields(order_uuid = %order, requested = %status),
        err
    )]
    async fn update_order_status(
        &self,
        order: OrderUuid,
        status: OrderStatus,
    ) -> Result<OrderRecord, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let locked = self
            .orders
            .lock_order(&mut tx, order)
            .await?
            .ok_or(OrdersServiceError::NotFound)?;

        if status == OrderStatus::Cancelled {
            let cancelled = self.compensate(&mut tx, locked).await?;

            tx.commit().await?;

            info!(order_uuid = %cancelled.uuid, "cancelled order by status update");

            return Ok(cancelled);
        }

        let next = locked.order_status.transition_to(status)?;

        let mut updated = if next == locked.order_status {
            locked
        } else {
            self.orders
                .update_status(&mut tx, order, next, locked.payment_status)
                .await?
        };

        updated.items = self.items.get_order_items(&mut tx, &[order]).await?;

        tx.commit().await?;

        info!(order_uuid = %updated.uuid, order_status = %updated.order_status, "updated order status");

        Ok(updated)
    }

    #[tracing::instrument(
        name = "orders.service.delete_order",
        skip(self),
        fields(order_uuid = %order),
        err
    )]
    async fn delete_order(&self, order: OrderUuid) -> Result<(), OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        self.items.delete_order_items(&mut tx, order).await?;

        let rows_affected = self.orders.delete_order(&mut tx, order).await?;

        if rows_affected == 0 {
            return Err(OrdersServiceError::NotFound);
        }

        tx.commit().await?;

        info!(order_uuid = %order, "deleted order");

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Turn the user's cart into an order.
    ///
    /// Prices come from the cart's snapshots. Stock is reserved, any coupon
    /// redeemed and the cart emptied in the same transaction. Card orders
    /// also get a checkout session.
    async fn create_order(
        &self,
        user: UserUuid,
        order: NewOrder,
    ) -> Result<PlacedOrder, OrdersServiceError>;

    /// The user's orders, newest first.
    async fn list_orders(&self, user: UserUuid) -> Result<Vec<OrderRecord>, OrdersServiceError>;

    /// One of the user's orders.
    async fn get_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError>;

    /// Cancel one of the user's orders, returning stock and refunding a
    /// captured card payment.
    async fn cancel_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<OrderRecord, OrdersServiceError>;

    /// Filtered, paginated listing across all users.
    async fn admin_list_orders(&self, filter: OrderFilter)
    -> Result<OrdersPage, OrdersServiceError>;

    /// Any order by uuid.
    async fn admin_get_order(&self, order: OrderUuid) -> Result<OrderRecord, OrdersServiceError>;

    /// Move an order along the fulfilment flow. Cancelling runs the same
    /// compensation as [`OrdersService::cancel_order`].
    async fn update_order_status(
        &self,
        order: OrderUuid,
        status: OrderStatus,
    ) -> Result<OrderRecord, OrdersServiceError>;

    /// Remove an order and its items outright, without compensation.
    async fn delete_order(&self, order: OrderUuid) -> Result<(), OrdersServiceError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use storefront::{
        coupons::{CouponDiscount, CouponRejection},
        orders::{CancellationRejection, Page, PaymentMethod, PaymentStatus},
        payments::events::CHECKOUT_COMPLETED,
    };
    use testresult::TestResult;

    use crate::{
        domain::{
            carts::{CartsService, data::NewCartItem},
            coupons::{CouponsService, CouponsServiceError},
            payments::PaymentsService,
            products::records::ProductRecord,
            users::AddressUuid,
        },
        test::TestContext,
    };

    use super::*;

    fn new_order(payment_method: PaymentMethod) -> NewOrder {
        NewOrder {
            address_uuid: AddressUuid::new(),
            payment_method,
        }
    }

    async fn add(
        ctx: &TestContext,
        user: UserUuid,
        price: u64,
        stock: u64,
        quantity: u32,
    ) -> ProductRecord {
        let product = ctx.create_product(price, stock).await;

        ctx.carts
            .add_item(
                user,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity,
                },
            )
            .await
            .expect("add_item should succeed");

        product
    }

    /// Place a card order for one product and mark it paid with provider
    /// reference `pi_{event_id}`.
    async fn paid_card_order(
        ctx: &TestContext,
        user: UserUuid,
        stock: u64,
        quantity: u32,
        event_id: &str,
    ) -> (ProductRecord, OrderUuid) {
        let product = add(ctx, user, 2_000, stock, quantity).await;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::Card))
            .await
            .expect("create_order should succeed");

        let (payload, signature) = ctx.gateway.signed(&json!({
            "id": event_id,
            "type": CHECKOUT_COMPLETED,
            "data": { "object": {
                "id": format!("cs_{event_id}"),
                "payment_intent": format!("pi_{event_id}"),
                "metadata": { "order_uuid": placed.order.uuid.to_string() }
            }}
        }));

        ctx.payments
            .handle_event(payload, signature)
            .await
            .expect("payment event should apply");

        (product, placed.order.uuid)
    }

    #[tokio::test]
    async fn cash_order_starts_processing_and_reserves_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = add(&ctx, user, 1_500, 5, 2).await;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        let order = placed.order;

        assert!(placed.checkout_url.is_none());
        assert_eq!(order.order_status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.charges.subtotal, 3_000);
        assert_eq!(
            order.charges.total,
            3_000 + ctx.schedule.tax_amount + ctx.schedule.delivery_charge
        );
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].unit_price, 1_500);
        assert_eq!(ctx.product_stock(product.uuid).await, 3);

        let cart = ctx.carts.get_or_create_cart(user).await?;

        assert!(cart.items.is_empty());
        assert_eq!(cart.total, 0);
        assert!(ctx.gateway.sessions().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn card_order_gets_checkout_session() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        add(&ctx, user, 2_000, 5, 1).await;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::Card))
            .await?;

        assert_eq!(placed.order.order_status, OrderStatus::Pending);
        assert!(placed.checkout_url.is_some());
        assert!(placed.order.payment_session_id.is_some());

        let sessions = ctx.gateway.sessions();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].order_uuid, placed.order.uuid);
        assert_eq!(sessions[0].charges.total, placed.order.charges.total);

        Ok(())
    }

    #[tokio::test]
    async fn order_uses_snapshot_not_live_price() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = add(&ctx, user, 1_000, 5, 2).await;

        ctx.set_product_price(product.uuid, 1_800).await;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        assert_eq!(placed.order.charges.subtotal, 2_000);
        assert_eq!(placed.order.items[0].unit_price, 1_000);

        Ok(())
    }

    #[tokio::test]
    async fn empty_cart_cannot_be_ordered() {
        let ctx = TestContext::new().await;

        let result = ctx
            .orders
            .create_order(UserUuid::new(), new_order(PaymentMethod::CashOnDelivery))
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::EmptyCart)),
            "expected EmptyCart, got {result:?}"
        );
    }

    #[tokio::test]
    async fn stock_shortfall_aborts_before_any_write() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let plenty = add(&ctx, user, 100, 10, 2).await;
        let scarce = add(&ctx, user, 100, 3, 3).await;

        ctx.set_product_stock(scarce.uuid, 1).await;

        let result = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await;

        assert!(
            matches!(
                result,
                Err(OrdersServiceError::InsufficientStock {
                    available: 1,
                    requested: 3,
                    ..
                })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        assert_eq!(ctx.product_stock(plenty.uuid).await, 10);
        assert_eq!(ctx.carts.get_or_create_cart(user).await?.items.len(), 2);
        assert!(ctx.orders.list_orders(user).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn provider_failure_rolls_order_back() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = add(&ctx, user, 500, 4, 2).await;

        ctx.gateway.fail_next_session();

        let result = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::Card))
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::PaymentProvider(_))),
            "expected PaymentProvider, got {result:?}"
        );

        assert_eq!(ctx.product_stock(product.uuid).await, 4);
        assert_eq!(ctx.carts.get_or_create_cart(user).await?.total, 1_000);
        assert!(ctx.orders.list_orders(user).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn coupon_is_redeemed_with_order() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        add(&ctx, user, 10_000, 5, 1).await;

        let coupon = ctx
            .create_coupon("TEN", CouponDiscount::PercentageOff { percentage: 10 }, |_| {})
            .await;

        ctx.coupons.apply_coupon(user, "TEN".to_string()).await?;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        assert_eq!(placed.order.charges.discount, 1_000);
        assert_eq!(placed.order.coupon_uuid, Some(coupon.uuid));

        let coupons = ctx.coupons.list_coupons().await?;
        let stored = coupons
            .iter()
            .find(|c| c.uuid == coupon.uuid)
            .ok_or("coupon missing")?;

        assert_eq!(stored.terms.used_count, 1);
        assert!(ctx.carts.get_or_create_cart(user).await?.coupon_uuid.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn per_user_limit_is_enforced_across_orders() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();

        ctx.create_coupon("ONCE", CouponDiscount::AmountOff { amount: 100 }, |_| {})
            .await;

        add(&ctx, user, 1_000, 10, 1).await;
        ctx.coupons.apply_coupon(user, "ONCE".to_string()).await?;
        ctx.orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        add(&ctx, user, 1_000, 10, 1).await;

        let result = ctx.coupons.apply_coupon(user, "ONCE".to_string()).await;

        assert!(
            matches!(
                result,
                Err(CouponsServiceError::Rejected(
                    CouponRejection::PerUserLimitReached
                ))
            ),
            "expected PerUserLimitReached, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn cancel_cash_order_restores_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = add(&ctx, user, 800, 6, 4).await;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        assert_eq!(ctx.product_stock(product.uuid).await, 2);

        let cancelled = ctx.orders.cancel_order(user, placed.order.uuid).await?;

        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Pending);
        assert_eq!(ctx.product_stock(product.uuid).await, 6);

        let again = ctx.orders.cancel_order(user, placed.order.uuid).await;

        assert!(
            matches!(
                again,
                Err(OrdersServiceError::NotCancellable(
                    CancellationRejection::AlreadyCancelled
                ))
            ),
            "expected AlreadyCancelled, got {again:?}"
        );

        assert_eq!(ctx.product_stock(product.uuid).await, 6);

        Ok(())
    }

    #[tokio::test]
    async fn cancel_other_users_order_is_forbidden() -> TestResult {
        let ctx = TestContext::new().await;
        let owner = UserUuid::new();
        add(&ctx, owner, 800, 6, 1).await;

        let placed = ctx
            .orders
            .create_order(owner, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        let result = ctx
            .orders
            .cancel_order(UserUuid::new(), placed.order.uuid)
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::Forbidden)),
            "expected Forbidden, got {result:?}"
        );

        let result = ctx.orders.get_order(UserUuid::new(), placed.order.uuid).await;

        assert!(
            matches!(result, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn delivered_order_cannot_be_cancelled() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = add(&ctx, user, 800, 6, 1).await;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        let order = placed.order.uuid;

        ctx.orders
            .update_order_status(order, OrderStatus::Shipped)
            .await?;
        ctx.orders
            .update_order_status(order, OrderStatus::Delivered)
            .await?;

        let result = ctx.orders.cancel_order(user, order).await;

        assert!(
            matches!(
                result,
                Err(OrdersServiceError::NotCancellable(
                    CancellationRejection::AlreadyDelivered
                ))
            ),
            "expected AlreadyDelivered, got {result:?}"
        );

        assert_eq!(ctx.product_stock(product.uuid).await, 5);

        Ok(())
    }

    #[tokio::test]
    async fn illegal_status_jump_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        add(&ctx, user, 800, 6, 1).await;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        let result = ctx
            .orders
            .update_order_status(placed.order.uuid, OrderStatus::Delivered)
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::IllegalTransition(_))),
            "expected IllegalTransition, got {result:?}"
        );

        let same = ctx
            .orders
            .update_order_status(placed.order.uuid, OrderStatus::Processing)
            .await?;

        assert_eq!(same.order_status, OrderStatus::Processing);

        Ok(())
    }

    #[tokio::test]
    async fn admin_cancel_runs_compensation() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let product = add(&ctx, user, 800, 6, 2).await;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        let cancelled = ctx
            .orders
            .update_order_status(placed.order.uuid, OrderStatus::Cancelled)
            .await?;

        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        assert_eq!(ctx.product_stock(product.uuid).await, 6);

        Ok(())
    }

    #[tokio::test]
    async fn admin_list_filters_and_paginates() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = UserUuid::new();
        let bob = UserUuid::new();

        for _ in 0..3 {
            add(&ctx, alice, 100, 10, 1).await;
            ctx.orders
                .create_order(alice, new_order(PaymentMethod::CashOnDelivery))
                .await?;
        }

        add(&ctx, bob, 100, 10, 1).await;
        ctx.orders
            .create_order(bob, new_order(PaymentMethod::Card))
            .await?;

        let page = ctx
            .orders
            .admin_list_orders(OrderFilter {
                user_uuid: Some(alice),
                page: Page::new(Some(1), Some(2)),
                ..OrderFilter::default()
            })
            .await?;

        assert_eq!(page.total, 3);
        assert_eq!(page.orders.len(), 2);
        assert_eq!(page.total_pages, 2);
        assert!(page.orders.iter().all(|order| order.user_uuid == alice));
        assert!(page.orders.iter().all(|order| order.items.len() == 1));

        let card = ctx
            .orders
            .admin_list_orders(OrderFilter {
                payment_method: Some(PaymentMethod::Card),
                ..OrderFilter::default()
            })
            .await?;

        assert_eq!(card.total, 1);
        assert_eq!(card.orders[0].user_uuid, bob);

        let pending = ctx
            .orders
            .admin_list_orders(OrderFilter {
                order_status: Some(OrderStatus::Pending),
                ..OrderFilter::default()
            })
            .await?;

        assert_eq!(pending.total, 1);

        Ok(())
    }

    #[tokio::test]
    async fn delete_order_removes_it() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        add(&ctx, user, 100, 10, 1).await;

        let placed = ctx
            .orders
            .create_order(user, new_order(PaymentMethod::CashOnDelivery))
            .await?;

        ctx.orders.delete_order(placed.order.uuid).await?;

        let result = ctx.orders.admin_get_order(placed.order.uuid).await;

        assert!(
            matches!(result, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        let result = ctx.orders.delete_order(placed.order.uuid).await;

        assert!(
            matches!(result, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn cancel_paid_card_order_refunds_and_restores_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let (product, order) = paid_card_order(&ctx, user, 5, 2, "evt_user_cancel").await;

        assert_eq!(ctx.product_stock(product.uuid).await, 3);

        let cancelled = ctx.orders.cancel_order(user, order).await?;

        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(
            ctx.gateway.refunds(),
            vec![("pi_evt_user_cancel".to_string(), refund_idempotency_key(order))]
        );
        assert_eq!(ctx.product_stock(product.uuid).await, 5);

        Ok(())
    }

    #[tokio::test]
    async fn admin_cancel_of_paid_card_order_refunds() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let (product, order) = paid_card_order(&ctx, user, 4, 1, "evt_admin_cancel").await;

        let cancelled = ctx
            .orders
            .update_order_status(order, OrderStatus::Cancelled)
            .await?;

        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(
            ctx.gateway.refunds(),
            vec![("pi_evt_admin_cancel".to_string(), refund_idempotency_key(order))]
        );
        assert_eq!(ctx.product_stock(product.uuid).await, 4);

        Ok(())
    }

    #[tokio::test]
    async fn failed_refund_leaves_paid_order_untouched() -> TestResult {
        let ctx = TestContext::new().await;
        let user = UserUuid::new();
        let (product, order) = paid_card_order(&ctx, user, 5, 2, "evt_refund_down").await;

        ctx.gateway.fail_next_refund();

        let result = ctx.orders.cancel_order(user, order).await;

        assert!(
            matches!(result, Err(OrdersServiceError::PaymentProvider(_))),
            "expected PaymentProvider, got {result:?}"
        );

        let stored = ctx.orders.admin_get_order(order).await?;

        assert_eq!(stored.order_status, OrderStatus::Processing);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert!(ctx.gateway.refunds().is_empty());
        assert_eq!(ctx.product_stock(product.uuid).await, 3);

        Ok(())
    }

    #[tokio::test]
    async fn last_unit_goes_to_exactly_one_of_two_racing_orders() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = UserUuid::new();
        let bob = UserUuid::new();
        let product = add(&ctx, alice, 1_000, 1, 1).await;

        ctx.carts
            .add_item(
                bob,
                NewCartItem {
                    product_uuid: product.uuid,
                    quantity: 1,
                },
            )
            .await?;

        let (first, second) = tokio::join!(
            ctx.orders
                .create_order(alice, new_order(PaymentMethod::CashOnDelivery)),
            ctx.orders
                .create_order(bob, new_order(PaymentMethod::CashOnDelivery)),
        );

        let results = [first, second];

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);

        let failure = results
            .into_iter()
            .find_map(Result::err)
            .ok_or("one order should fail")?;

        assert!(
            matches!(
                failure,
                OrdersServiceError::InsufficientStock {
                    available: 0,
                    requested: 1,
                    ..
                }
            ),
            "expected InsufficientStock, got {failure:?}"
        );
        assert_eq!(ctx.product_stock(product.uuid).await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn single_use_coupon_is_redeemed_once_under_contention() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = UserUuid::new();
        let bob = UserUuid::new();

        let coupon = ctx
            .create_coupon("SOLO", CouponDiscount::AmountOff { amount: 200 }, |coupon| {
                coupon.usage_limit = Some(1);
            })
            .await;

        for user in [alice, bob] {
            add(&ctx, user, 1_000, 5, 1).await;
            ctx.coupons.apply_coupon(user, "SOLO".to_string()).await?;
        }

        let (first, second) = tokio::join!(
            ctx.orders
                .create_order(alice, new_order(PaymentMethod::CashOnDelivery)),
            ctx.orders
                .create_order(bob, new_order(PaymentMethod::CashOnDelivery)),
        );

        let results = [first, second];

        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);

        let failure = results
            .into_iter()
            .find_map(Result::err)
            .ok_or("one order should fail")?;

        assert!(
            matches!(
                failure,
                OrdersServiceError::Coupon(CouponRejection::UsageLimitReached)
            ),
            "expected UsageLimitReached, got {failure:?}"
        );

        let coupons = ctx.coupons.list_coupons().await?;
        let stored = coupons
            .iter()
            .find(|c| c.uuid == coupon.uuid)
            .ok_or("coupon missing")?;

        assert_eq!(stored.terms.used_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn carts_listing_products_in_opposite_order_both_place() -> TestResult {
        let ctx = TestContext::new().await;
        let alice = UserUuid::new();
        let bob = UserUuid::new();
        let kettle = add(&ctx, alice, 1_000, 10, 2).await;
        let teapot = add(&ctx, bob, 1_500, 10, 3).await;

        ctx.carts
            .add_item(
                alice,
                NewCartItem {
                    product_uuid: teapot.uuid,
                    quantity: 1,
                },
            )
            .await?;
        ctx.carts
            .add_item(
                bob,
                NewCartItem {
                    product_uuid: kettle.uuid,
                    quantity: 1,
                },
            )
            .await?;

        let (first, second) = tokio::join!(
            ctx.orders
                .create_order(alice, new_order(PaymentMethod::CashOnDelivery)),
            ctx.orders
                .create_order(bob, new_order(PaymentMethod::CashOnDelivery)),
        );

        first?;
        second?;

        assert_eq!(ctx.product_stock(kettle.uuid).await, 7);
        assert_eq!(ctx.product_stock(teapot.uuid).await, 6);

        Ok(())
    }
}

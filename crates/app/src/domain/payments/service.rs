//! Payments service.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use storefront::{
    orders::{OrderStatus, PaymentStatus},
    payments::{
        IgnoreReason, PaymentObject, PaymentOutcome, ProviderEventKind, Reconciliation,
        check_refund,
        events::CHECKOUT_COMPLETED,
        reconcile,
    },
};
use tracing::{info, warn};

use crate::{
    database::Db,
    domain::{
        carts::repositories::{PgCartItemsRepository, PgCartsRepository},
        orders::{
            records::{OrderRecord, OrderUuid},
            repositories::{PgOrderItemsRepository, PgOrdersRepository},
        },
        payments::{
            errors::PaymentsServiceError,
            gateway::{PaymentGateway, refund_idempotency_key},
            repository::PgPaymentEventsRepository,
        },
        products::repository::PgProductsRepository,
    },
};

/// Why a webhook notification changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookIgnore {
    /// The event type is not one the store acts on.
    Unrecognized,

    /// The event carries no usable order reference.
    MissingOrder,

    /// The referenced order does not exist.
    UnknownOrder,

    /// This event id has been processed before.
    Duplicate,

    /// The order's current state makes the event a no-op.
    Reconciled(IgnoreReason),
}

/// Result of handling a webhook notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied {
        order: OrderUuid,
        order_status: OrderStatus,
        payment_status: PaymentStatus,
    },
    Ignored(WebhookIgnore),
}

#[derive(Clone)]
pub struct PgPaymentsService {
    db: Db,
    gateway: Arc<dyn PaymentGateway>,
    events: PgPaymentEventsRepository,
    orders: PgOrdersRepository,
    items: PgOrderItemsRepository,
    carts: PgCartsRepository,
    cart_items: PgCartItemsRepository,
    products: PgProductsRepository,
}

impl PgPaymentsService {
    #[must_use]
    pub fn new(db: Db, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            db,
            gateway,
            events: PgPaymentEventsRepository::new(),
            orders: PgOrdersRepository::new(),
            items: PgOrderItemsRepository::new(),
            carts: PgCartsRepository::new(),
            cart_items: PgCartItemsRepository::new(),
            products: PgProductsRepository::new(),
        }
    }

    async fn apply_outcome(
        &self,
        event_id: &str,
        event_type: &str,
        payment: PaymentObject,
        outcome: PaymentOutcome,
    ) -> Result<WebhookOutcome, PaymentsServiceError> {
        let Some(order) = payment.order.map(OrderUuid::from_uuid) else {
            warn!(event_id, event_type, "payment event has no order reference");

            return Ok(WebhookOutcome::Ignored(WebhookIgnore::MissingOrder));
        };

        let mut tx = self.db.begin().await?;

        let Some(locked) = self.orders.lock_order(&mut tx, order).await? else {
            warn!(event_id, order_uuid = %order, "payment event for unknown order");

            return Ok(WebhookOutcome::Ignored(WebhookIgnore::UnknownOrder));
        };

        if !self
            .events
            .record_event(&mut tx, event_id, event_type, Some(order))
            .await?
        {
            return Ok(WebhookOutcome::Ignored(WebhookIgnore::Duplicate));
        }

        let transition = match reconcile(locked.order_status, locked.payment_status, outcome) {
            Reconciliation::Apply(transition) => transition,
            Reconciliation::Ignore(reason) => {
                tx.commit().await?;

                info!(event_id, order_uuid = %order, ?reason, "payment event left order unchanged");

                return Ok(WebhookOutcome::Ignored(WebhookIgnore::Reconciled(reason)));
            }
        };

        if transition.restore_stock {
            let items = self.items.get_order_items(&mut tx, &[order]).await?;

            self.products
                .restore_lines(
                    &mut tx,
                    items.iter().map(|item| (item.product_uuid, item.quantity)),
                )
                .await?;
        }

        if outcome == PaymentOutcome::Succeeded {
            self.orders
                .set_payment_intent(&mut tx, order, payment.payment_intent.as_deref())
                .await?;
        }

        let updated = self
            .orders
            .update_status(
                &mut tx,
                order,
                transition.order_status,
                transition.payment_status,
            )
            .await?;

        if transition.clear_cart
            && let Some(cart) = self.carts.lock_cart(&mut tx, locked.user_uuid).await?
        {
            self.cart_items.delete_cart_items(&mut tx, cart.uuid).await?;
            self.carts.reset_cart(&mut tx, cart.uuid).await?;
        }

        tx.commit().await?;

        if transition.needs_refund {
            warn!(
                event_id,
                order_uuid = %order,
                "payment captured for cancelled order, refund required"
            );
        }

        info!(
            event_id,
            order_uuid = %order,
            order_status = %updated.order_status,
            payment_status = %updated.payment_status,
            "applied payment event"
        );

        Ok(WebhookOutcome::Applied {
            order,
            order_status: updated.order_status,
            payment_status: updated.payment_status,
        })
    }
}

#[async_trait]
impl PaymentsService for PgPaymentsService {
    #[tracing::instrument(
        name = "payments.service.handle_event",
        skip(self, payload, signature),
        fields(
            payload_bytes = payload.len(),
            event_id = tracing::field::Empty,
            event_type = tracing::field::Empty
        ),
        err
    )]
    async fn handle_event(
        &self,
        payload: Vec<u8>,
        signature: String,
    ) -> Result<WebhookOutcome, PaymentsServiceError> {
        let event = self
            .gateway
            .construct_event(&payload, &signature)
            .map_err(PaymentsServiceError::InvalidWebhook)?;

        let span = tracing::Span::current();

        span.record("event_id", event.id.as_str());
        let event_type = event.kind.event_type().to_owned();

        span.record("event_type", event_type.as_str());

        match event.kind {
            ProviderEventKind::CheckoutCompleted(payment) => {
                self.handle_successful_payment(event.id, payment).await
            }
            ProviderEventKind::CheckoutExpired(payment)
            | ProviderEventKind::PaymentFailed(payment) => {
                self.handle_failed_or_canceled_payment(event.id, event_type, payment)
                    .await
            }
            ProviderEventKind::Unrecognized { event_type } => {
                info!(event_type, "ignoring unrecognized payment event");

                Ok(WebhookOutcome::Ignored(WebhookIgnore::Unrecognized))
            }
        }
    }

    async fn handle_successful_payment(
        &self,
        event_id: String,
        payment: PaymentObject,
    ) -> Result<WebhookOutcome, PaymentsServiceError> {
        self.apply_outcome(
            &event_id,
            CHECKOUT_COMPLETED,
            payment,
            PaymentOutcome::Succeeded,
        )
        .await
    }

    async fn handle_failed_or_canceled_payment(
        &self,
        event_id: String,
        event_type: String,
        payment: PaymentObject,
    ) -> Result<WebhookOutcome, PaymentsServiceError> {
        self.apply_outcome(&event_id, &event_type, payment, PaymentOutcome::Failed)
            .await
    }

    #[tracing::instrument(
        name = "payments.service.refund_order",
        skip(self),
        fields(order_uuid = %order),
        err
    )]
    async fn refund_order(&self, order: OrderUuid) -> Result<OrderRecord, PaymentsServiceError> {
        let mut tx = self.db.begin().await?;

        let locked = self
            .orders
            .lock_order(&mut tx, order)
            .await?
            .ok_or(PaymentsServiceError::NotFound)?;

        check_refund(
            locked.payment_method,
            locked.payment_status,
            locked.order_status,
            locked.payment_intent_id.as_deref(),
        )?;

        let reference = locked.payment_intent_id.as_deref().unwrap_or_default();

        let items = self.items.get_order_items(&mut tx, &[order]).await?;

        let refund = self
            .gateway
            .create_refund(reference, &refund_idempotency_key(order))
            .await?;

        if locked.order_status != OrderStatus::Cancelled {
            self.products
                .restore_lines(
                    &mut tx,
                    items.iter().map(|item| (item.product_uuid, item.quantity)),
                )
                .await?;
        }

        let mut refunded = self
            .orders
            .update_status(
                &mut tx,
                order,
                OrderStatus::Cancelled,
                PaymentStatus::Refunded,
            )
            .await?;

        refunded.items = items;

        tx.commit().await?;

        info!(order_uuid = %order, refund_id = %refund.refund_id, refund_status = %refund.status, "refunded order");

        Ok(refunded)
    }
}

#[automock]
#[async_trait]
pub trait PaymentsService: Send + Sync {
    /// Verify and apply a provider webhook notification.
    async fn handle_event(
        &self,
        payload: Vec<u8>,
        signature: String,
    ) -> Result<WebhookOutcome, PaymentsServiceError>;

    /// Mark an order paid. Replays and stale notifications change nothing.
    async fn handle_successful_payment(
        &self,
        event_id: String,
        payment: PaymentObject,
    ) -> Result<WebhookOutcome, PaymentsServiceError>;

    /// Cancel an unpaid order whose payment failed or whose session expired,
    /// returning its stock. `event_type` is recorded with the event id.
    async fn handle_failed_or_canceled_payment(
        &self,
        event_id: String,
        event_type: String,
        payment: PaymentObject,
    ) -> Result<WebhookOutcome, PaymentsServiceError>;

    /// Refund a paid card order in full and cancel it.
    async fn refund_order(&self, order: OrderUuid) -> Result<OrderRecord, PaymentsServiceError>;
}

//! Coupons service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use tracing::{Span, info};

use crate::{
    database::Db,
    domain::{
        carts::repositories::{PgCartItemsRepository, PgCartsRepository},
        coupons::{
            data::NewCoupon,
            errors::CouponsServiceError,
            records::{AppliedCoupon, CouponRecord},
            repositories::{PgCouponUsagesRepository, PgCouponsRepository},
        },
        users::UserUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgCouponsService {
    db: Db,
    coupons: PgCouponsRepository,
    usages: PgCouponUsagesRepository,
    carts: PgCartsRepository,
    items: PgCartItemsRepository,
}

impl PgCouponsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            coupons: PgCouponsRepository::new(),
            usages: PgCouponUsagesRepository::new(),
            carts: PgCartsRepository::new(),
            items: PgCartItemsRepository::new(),
        }
    }
}

#[async_trait]
impl CouponsService for PgCouponsService {
    #[tracing::instrument(
        name = "coupons.service.create_coupon",
        skip(self, coupon),
        fields(coupon_uuid = %coupon.uuid, discount_kind = coupon.discount.kind_as_str()),
        err
    )]
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<CouponRecord, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let created = self.coupons.create_coupon(&mut tx, coupon).await?;

        tx.commit().await?;

        info!(coupon_uuid = %created.uuid, code = %created.code, "created coupon");

        Ok(created)
    }

    async fn list_coupons(&self) -> Result<Vec<CouponRecord>, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let coupons = self.coupons.list_coupons(&mut tx).await?;

        tx.commit().await?;

        Ok(coupons)
    }

    #[tracing::instrument(
        name = "coupons.service.apply_coupon",
        skip(self, code),
        fields(
            user_uuid = %user,
            coupon_uuid = tracing::field::Empty,
            cart_total = tracing::field::Empty
        ),
        err
    )]
    async fn apply_coupon(
        &self,
        user: UserUuid,
        code: String,
    ) -> Result<AppliedCoupon, CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        let coupon = self
            .coupons
            .get_coupon_by_code(&mut tx, &code)
            .await?
            .ok_or(CouponsServiceError::NotFound)?;

        let span = Span::current();

        span.record("coupon_uuid", tracing::field::display(coupon.uuid));

        coupon.terms.check_availability(Timestamp::now())?;

        let cart = self
            .carts
            .lock_cart(&mut tx, user)
            .await?
            .ok_or(CouponsServiceError::EmptyCart)?;

        let items = self.items.get_cart_items(&mut tx, cart.uuid).await?;

        if items.is_empty() {
            return Err(CouponsServiceError::EmptyCart);
        }

        span.record("cart_total", cart.total);

        coupon.terms.check_cart_total(cart.total)?;

        let redemptions = self
            .usages
            .count_user_usages(&mut tx, coupon.uuid, user)
            .await?;

        coupon.terms.check_user_redemptions(redemptions)?;

        self.carts
            .set_coupon(&mut tx, cart.uuid, Some(coupon.uuid))
            .await?;

        tx.commit().await?;

        info!(cart_uuid = %cart.uuid, coupon_uuid = %coupon.uuid, "applied coupon to cart");

        Ok(AppliedCoupon {
            cart_uuid: cart.uuid,
            coupon_uuid: coupon.uuid,
            discount: coupon.discount.discount_for(cart.total),
            cart_total: cart.total,
            code: coupon.code,
        })
    }

    #[tracing::instrument(
        name = "coupons.service.remove_coupon_from_cart",
        skip(self),
        fields(user_uuid = %user),
        err
    )]
    async fn remove_coupon_from_cart(&self, user: UserUuid) -> Result<(), CouponsServiceError> {
        let mut tx = self.db.begin().await?;

        if let Some(cart) = self.carts.lock_cart(&mut tx, user).await? {
            self.carts.set_coupon(&mut tx, cart.uuid, None).await?;
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CouponsService: Send + Sync {
    /// Creates a coupon. Codes are unique and matched exactly.
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<CouponRecord, CouponsServiceError>;

    /// All coupons, newest first.
    async fn list_coupons(&self) -> Result<Vec<CouponRecord>, CouponsServiceError>;

    /// Validate a coupon code against the user's cart and attach it.
    ///
    /// The cart total is left undiscounted; the discount is applied when the
    /// order is placed.
    async fn apply_coupon(
        &self,
        user: UserUuid,
        code: String,
    ) -> Result<AppliedCoupon, CouponsServiceError>;

    /// Detach any coupon from the user's cart.
    async fn remove_coupon_from_cart(&self, user: UserUuid) -> Result<(), CouponsServiceError>;
}

//! Coupon Usages Repository

use sqlx::{Postgres, Transaction, query, query_scalar};

use crate::domain::{
    coupons::records::{CouponUsageUuid, CouponUuid},
    orders::records::OrderUuid,
    users::UserUuid,
};

const COUNT_USER_USAGES_SQL: &str = include_str!("../sql/count_user_usages.sql");
const CREATE_COUPON_USAGE_SQL: &str = include_str!("../sql/create_coupon_usage.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCouponUsagesRepository;

impl PgCouponUsagesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Number of times the user has redeemed the coupon.
    pub(crate) async fn count_user_usages(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        user: UserUuid,
    ) -> Result<u64, sqlx::Error> {
        let count: i64 = query_scalar(COUNT_USER_USAGES_SQL)
            .bind(coupon.into_uuid())
            .bind(user.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        u64::try_from(count).map_err(|e| sqlx::Error::ColumnDecode {
            index: "count".to_string(),
            source: Box::new(e),
        })
    }

    pub(crate) async fn create_usage(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<CouponUsageUuid, sqlx::Error> {
        let uuid = CouponUsageUuid::new();

        query(CREATE_COUPON_USAGE_SQL)
            .bind(uuid.into_uuid())
            .bind(coupon.into_uuid())
            .bind(user.into_uuid())
            .bind(order.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(uuid)
    }
}

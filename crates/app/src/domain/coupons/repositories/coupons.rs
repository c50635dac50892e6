//! Coupons Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use storefront::coupons::{CouponDiscount, CouponTerms};

use crate::{
    database::{try_get_amount, try_get_optional_amount, try_i64_from_u64, try_optional_i64_from_u64},
    domain::coupons::{
        data::NewCoupon,
        records::{CouponRecord, CouponUuid},
    },
};

const CREATE_COUPON_SQL: &str = include_str!("../sql/create_coupon.sql");
const LIST_COUPONS_SQL: &str = include_str!("../sql/list_coupons.sql");
const GET_COUPON_BY_CODE_SQL: &str = include_str!("../sql/get_coupon_by_code.sql");
const LOCK_COUPON_SQL: &str = include_str!("../sql/lock_coupon.sql");
const INCREMENT_USED_COUNT_SQL: &str = include_str!("../sql/increment_used_count.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCouponsRepository;

impl PgCouponsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: NewCoupon,
    ) -> Result<CouponRecord, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(CREATE_COUPON_SQL)
            .bind(coupon.uuid.into_uuid())
            .bind(coupon.code)
            .bind(coupon.discount.kind_as_str())
            .bind(try_i64_from_u64(coupon.discount.value(), "discount_value")?)
            .bind(try_optional_i64_from_u64(
                coupon.min_order_value,
                "min_order_value",
            )?)
            .bind(SqlxTimestamp::from(coupon.expires_at))
            .bind(coupon.is_active)
            .bind(try_optional_i64_from_u64(coupon.usage_limit, "usage_limit")?)
            .bind(try_i64_from_u64(coupon.usage_per_user, "usage_per_user")?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn list_coupons(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<CouponRecord>, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(LIST_COUPONS_SQL)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_coupon_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<CouponRecord>, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(GET_COUPON_BY_CODE_SQL)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Lock a coupon row so concurrent redemptions serialize.
    pub(crate) async fn lock_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
    ) -> Result<Option<CouponRecord>, sqlx::Error> {
        query_as::<Postgres, CouponRecord>(LOCK_COUPON_SQL)
            .bind(coupon.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn increment_used_count(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
    ) -> Result<(), sqlx::Error> {
        query(INCREMENT_USED_COUNT_SQL)
            .bind(coupon.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for CouponRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("discount_kind")?;
        let value = try_get_amount(row, "discount_value")?;

        let discount =
            CouponDiscount::from_parts(&kind, value).map_err(|e| sqlx::Error::ColumnDecode {
                index: "discount_kind".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            uuid: CouponUuid::from_uuid(row.try_get("uuid")?),
            code: row.try_get("code")?,
            discount,
            terms: CouponTerms {
                is_active: row.try_get("is_active")?,
                expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
                usage_limit: try_get_optional_amount(row, "usage_limit")?,
                used_count: try_get_amount(row, "used_count")?,
                usage_per_user: try_get_amount(row, "usage_per_user")?,
                min_order_value: try_get_optional_amount(row, "min_order_value")?,
            },
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

//! Carts Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::{
    database::{try_get_amount, try_i64_from_u64},
    domain::{
        carts::records::{CartRecord, CartUuid},
        coupons::records::CouponUuid,
        users::UserUuid,
    },
};

const ENSURE_CART_SQL: &str = include_str!("../sql/ensure_cart.sql");
const LOCK_CART_SQL: &str = include_str!("../sql/lock_cart.sql");
const GET_CART_SQL: &str = include_str!("../sql/get_cart.sql");
const UPDATE_CART_TOTAL_SQL: &str = include_str!("../sql/update_cart_total.sql");
const SET_CART_COUPON_SQL: &str = include_str!("../sql/set_cart_coupon.sql");
const RESET_CART_SQL: &str = include_str!("../sql/reset_cart.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Create an empty cart for the user unless one already exists.
    pub(crate) async fn ensure_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<(), sqlx::Error> {
        query(ENSURE_CART_SQL)
            .bind(CartUuid::new().into_uuid())
            .bind(user.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Lock the user's cart row until the transaction ends.
    pub(crate) async fn lock_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(LOCK_CART_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn get_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<CartRecord>, sqlx::Error> {
        query_as::<Postgres, CartRecord>(GET_CART_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn update_total(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        total: u64,
    ) -> Result<(), sqlx::Error> {
        query(UPDATE_CART_TOTAL_SQL)
            .bind(cart.into_uuid())
            .bind(try_i64_from_u64(total, "total")?)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn set_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        coupon: Option<CouponUuid>,
    ) -> Result<(), sqlx::Error> {
        query(SET_CART_COUPON_SQL)
            .bind(cart.into_uuid())
            .bind(coupon.map(CouponUuid::into_uuid))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Zero the total and detach any coupon.
    pub(crate) async fn reset_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<(), sqlx::Error> {
        query(RESET_CART_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for CartRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            total: try_get_amount(row, "total")?,
            coupon_uuid: row
                .try_get::<Option<Uuid>, _>("coupon_uuid")?
                .map(CouponUuid::from_uuid),
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

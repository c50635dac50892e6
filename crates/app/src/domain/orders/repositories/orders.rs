//! Orders Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use storefront::{
    charges::OrderCharges,
    orders::{OrderStatus, PaymentStatus},
};
use uuid::Uuid;

use crate::{
    database::{try_get_amount, try_i64_from_u64},
    domain::{
        coupons::records::CouponUuid,
        orders::{
            data::{NewOrder, OrderFilter},
            records::{OrderRecord, OrderUuid},
        },
        users::{AddressUuid, UserUuid},
    },
};

const CREATE_ORDER_SQL: &str = include_str!("../sql/create_order.sql");
const GET_ORDER_SQL: &str = include_str!("../sql/get_order.sql");
const LOCK_ORDER_SQL: &str = include_str!("../sql/lock_order.sql");
const LIST_USER_ORDERS_SQL: &str = include_str!("../sql/list_user_orders.sql");
const LIST_ORDERS_SQL: &str = include_str!("../sql/list_orders.sql");
const COUNT_ORDERS_SQL: &str = include_str!("../sql/count_orders.sql");
const UPDATE_ORDER_STATUS_SQL: &str = include_str!("../sql/update_order_status.sql");
const SET_PAYMENT_SESSION_SQL: &str = include_str!("../sql/set_payment_session.sql");
const SET_PAYMENT_INTENT_SQL: &str = include_str!("../sql/set_payment_intent.sql");
const DELETE_ORDER_SQL: &str = include_str!("../sql/delete_order.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        uuid: OrderUuid,
        user: UserUuid,
        order: &NewOrder,
        charges: &OrderCharges,
        coupon: Option<CouponUuid>,
    ) -> Result<OrderRecord, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(CREATE_ORDER_SQL)
            .bind(uuid.into_uuid())
            .bind(user.into_uuid())
            .bind(order.address_uuid.into_uuid())
            .bind(try_i64_from_u64(charges.subtotal, "subtotal")?)
            .bind(try_i64_from_u64(charges.discount, "discount")?)
            .bind(try_i64_from_u64(charges.tax_amount, "tax_amount")?)
            .bind(try_i64_from_u64(charges.delivery_charge, "delivery_charge")?)
            .bind(try_i64_from_u64(charges.total, "total")?)
            .bind(coupon.map(CouponUuid::into_uuid))
            .bind(OrderStatus::initial(order.payment_method).as_str())
            .bind(PaymentStatus::Pending.as_str())
            .bind(order.payment_method.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(GET_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Lock an order row until the transaction ends.
    pub(crate) async fn lock_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(LOCK_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn list_user_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Vec<OrderRecord>, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(LIST_USER_ORDERS_SQL)
            .bind(user.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn list_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &OrderFilter,
    ) -> Result<Vec<OrderRecord>, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(LIST_ORDERS_SQL)
            .bind(filter.order_status.map(OrderStatus::as_str))
            .bind(filter.payment_method.map(|method| method.as_str()))
            .bind(filter.user_uuid.map(UserUuid::into_uuid))
            .bind(filter.created_from.map(SqlxTimestamp::from))
            .bind(filter.created_to.map(SqlxTimestamp::from))
            .bind(i64::from(filter.page.limit))
            .bind(try_i64_from_u64(filter.page.offset(), "offset")?)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn count_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &OrderFilter,
    ) -> Result<u64, sqlx::Error> {
        let count: i64 = query_scalar(COUNT_ORDERS_SQL)
            .bind(filter.order_status.map(OrderStatus::as_str))
            .bind(filter.payment_method.map(|method| method.as_str()))
            .bind(filter.user_uuid.map(UserUuid::into_uuid))
            .bind(filter.created_from.map(SqlxTimestamp::from))
            .bind(filter.created_to.map(SqlxTimestamp::from))
            .fetch_one(&mut **tx)
            .await?;

        u64::try_from(count).map_err(|e| sqlx::Error::ColumnDecode {
            index: "count".to_string(),
            source: Box::new(e),
        })
    }

    pub(crate) async fn update_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        order_status: OrderStatus,
        payment_status: PaymentStatus,
    ) -> Result<OrderRecord, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(UPDATE_ORDER_STATUS_SQL)
            .bind(order.into_uuid())
            .bind(order_status.as_str())
            .bind(payment_status.as_str())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn set_payment_session(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        session_id: &str,
        payment_intent_id: Option<&str>,
        checkout_url: &str,
    ) -> Result<OrderRecord, sqlx::Error> {
        query_as::<Postgres, OrderRecord>(SET_PAYMENT_SESSION_SQL)
            .bind(order.into_uuid())
            .bind(session_id)
            .bind(payment_intent_id)
            .bind(checkout_url)
            .fetch_one(&mut **tx)
            .await
    }

    /// Record the provider payment reference, keeping any existing one when
    /// `payment_intent_id` is `None`.
    pub(crate) async fn set_payment_intent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        payment_intent_id: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        query(SET_PAYMENT_INTENT_SQL)
            .bind(order.into_uuid())
            .bind(payment_intent_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn delete_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_ORDER_SQL)
            .bind(order.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

fn try_get_enum<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr<Err = storefront::orders::UnknownVariant>,
{
    let value: String = row.try_get(column)?;

    value.parse().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, PgRow> for OrderRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            address_uuid: AddressUuid::from_uuid(row.try_get("address_uuid")?),
            charges: OrderCharges {
                subtotal: try_get_amount(row, "subtotal")?,
                discount: try_get_amount(row, "discount")?,
                tax_amount: try_get_amount(row, "tax_amount")?,
                delivery_charge: try_get_amount(row, "delivery_charge")?,
                total: try_get_amount(row, "total")?,
            },
            coupon_uuid: row
                .try_get::<Option<Uuid>, _>("coupon_uuid")?
                .map(CouponUuid::from_uuid),
            order_status: try_get_enum(row, "order_status")?,
            payment_status: try_get_enum(row, "payment_status")?,
            payment_method: try_get_enum(row, "payment_method")?,
            payment_session_id: row.try_get("payment_session_id")?,
            payment_intent_id: row.try_get("payment_intent_id")?,
            checkout_url: row.try_get("checkout_url")?,
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

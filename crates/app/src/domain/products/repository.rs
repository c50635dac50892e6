//! Products Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as, query_scalar};

use crate::{
    database::{try_get_amount, try_i64_from_u64},
    domain::products::{
        data::NewProduct,
        records::{ProductRecord, ProductUuid},
    },
};

const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const GET_STOCK_SQL: &str = include_str!("sql/get_stock.sql");
const RESERVE_STOCK_SQL: &str = include_str!("sql/reserve_stock.sql");
const RESTORE_STOCK_SQL: &str = include_str!("sql/restore_stock.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProductsRepository;

impl PgProductsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<ProductRecord>, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(LIST_PRODUCTS_SQL)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: NewProduct,
    ) -> Result<ProductRecord, sqlx::Error> {
        query_as::<Postgres, ProductRecord>(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(product.name)
            .bind(try_i64_from_u64(product.price, "price")?)
            .bind(try_i64_from_u64(product.stock, "stock")?)
            .fetch_one(&mut **tx)
            .await
    }

    /// Current stock for a product, including soft-deleted ones.
    pub(crate) async fn get_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<u64, sqlx::Error> {
        let stock: i64 = query_scalar(GET_STOCK_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        u64::try_from(stock).map_err(|e| sqlx::Error::ColumnDecode {
            index: "stock".to_string(),
            source: Box::new(e),
        })
    }

    /// Take `quantity` units out of stock.
    ///
    /// Returns `None` without changing anything when fewer than `quantity`
    /// units remain.
    pub(crate) async fn reserve_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<Option<u64>, sqlx::Error> {
        let remaining: Option<i64> = query_scalar(RESERVE_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(i64::from(quantity))
            .fetch_optional(&mut **tx)
            .await?;

        remaining
            .map(|stock| {
                u64::try_from(stock).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "stock".to_string(),
                    source: Box::new(e),
                })
            })
            .transpose()
    }

    /// Return `quantity` units to stock.
    pub(crate) async fn restore_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<u64, sqlx::Error> {
        let stock: i64 = query_scalar(RESTORE_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(i64::from(quantity))
            .fetch_one(&mut **tx)
            .await?;

        u64::try_from(stock).map_err(|e| sqlx::Error::ColumnDecode {
            index: "stock".to_string(),
            source: Box::new(e),
        })
    }

    /// Return several lines to stock, locking product rows in uuid order.
    pub(crate) async fn restore_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lines: impl IntoIterator<Item = (ProductUuid, u32)>,
    ) -> Result<(), sqlx::Error> {
        let mut lines: Vec<(ProductUuid, u32)> = lines.into_iter().collect();

        lines.sort_unstable_by_key(|(product, _)| *product);

        for (product, quantity) in lines {
            self.restore_stock(tx, product, quantity).await?;
        }

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for ProductRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            price: try_get_amount(row, "price")?,
            stock: try_get_amount(row, "stock")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

//! Payment Events Repository

use sqlx::{Postgres, Transaction, query};

use crate::domain::orders::records::OrderUuid;

const RECORD_EVENT_SQL: &str = include_str!("sql/record_event.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPaymentEventsRepository;

impl PgPaymentEventsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Record a provider event. Returns `false` when the event id has been
    /// seen before.
    pub(crate) async fn record_event(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_id: &str,
        event_type: &str,
        order: Option<OrderUuid>,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = query(RECORD_EVENT_SQL)
            .bind(event_id)
            .bind(event_type)
            .bind(order.map(OrderUuid::into_uuid))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected == 1)
    }
}

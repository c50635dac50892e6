//! App Context

use std::sync::Arc;

use storefront::charges::ChargeSchedule;
use thiserror::Error;

use crate::{
    auth::{AuthService, PgAuthService},
    database::{self, Db, PoolSettings},
    domain::{
        carts::{CartsService, PgCartsService},
        coupons::{CouponsService, PgCouponsService},
        orders::{OrdersService, PgOrdersService},
        payments::{
            GatewayError, PaymentGateway, PaymentsService, PgPaymentsService, StripeClient,
            StripeConfig,
        },
        products::{PgProductsService, ProductsService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),

    #[error("failed to build payment provider client")]
    PaymentProvider(#[source] GatewayError),
}

/// Everything needed to assemble the services.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub pool: PoolSettings,
    pub payments: StripeConfig,
    pub charges: ChargeSchedule,
}

#[derive(Clone)]
pub struct AppContext {
    pub products: Arc<dyn ProductsService>,
    pub carts: Arc<dyn CartsService>,
    pub coupons: Arc<dyn CouponsService>,
    pub orders: Arc<dyn OrdersService>,
    pub payments: Arc<dyn PaymentsService>,
    pub auth: Arc<dyn AuthService>,
}

impl AppContext {
    /// Build application context from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection or building
    /// the payment provider client fails.
    pub async fn from_config(config: AppConfig) -> Result<Self, AppInitError> {
        let pool = database::connect_with(&config.database_url, config.pool)
            .await
            .map_err(AppInitError::Database)?;

        let gateway: Arc<dyn PaymentGateway> = Arc::new(
            StripeClient::new(config.payments).map_err(AppInitError::PaymentProvider)?,
        );

        let db = Db::new(pool.clone());

        Ok(Self {
            products: Arc::new(PgProductsService::new(db.clone())),
            carts: Arc::new(PgCartsService::new(db.clone())),
            coupons: Arc::new(PgCouponsService::new(db.clone())),
            orders: Arc::new(PgOrdersService::new(
                db.clone(),
                gateway.clone(),
                config.charges,
            )),
            payments: Arc::new(PgPaymentsService::new(db, gateway)),
            auth: Arc::new(PgAuthService::new(pool)),
        })
    }
}

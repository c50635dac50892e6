//! Per-test PostgreSQL databases inside one shared container.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use sqlx::{Connection, PgConnection, PgPool};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres as PostgresImage;
use tokio::sync::{OnceCell, mpsc};

const USER: &str = "storefront_test";
const PASSWORD: &str = "storefront_test_password";

static CONTAINER: Lazy<OnceCell<ContainerAsync<PostgresImage>>> = Lazy::new(OnceCell::new);

static DROPPER: Lazy<OnceCell<mpsc::UnboundedSender<String>>> = Lazy::new(OnceCell::new);

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

async fn start_container() -> ContainerAsync<PostgresImage> {
    PostgresImage::default()
        .with_user(USER)
        .with_password(PASSWORD)
        .with_db_name(USER)
        .with_env_var("POSTGRES_INITDB_ARGS", "--auth-host=trust")
        .start()
        .await
        .expect("Failed to start PostgreSQL container")
}

async fn server_url(db_name: &str) -> Option<String> {
    let container = CONTAINER.get()?;
    let port = container.get_host_port_ipv4(5432).await.ok()?;
    let host =
        std::env::var("TESTCONTAINERS_HOST_OVERRIDE").unwrap_or_else(|_| "localhost".to_string());

    Some(format!("postgresql://{USER}:{PASSWORD}@{host}:{port}/{db_name}"))
}

async fn start_dropper() -> mpsc::UnboundedSender<String> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(name) = receiver.recv().await {
            let Some(url) = server_url("postgres").await else {
                continue;
            };

            if let Ok(mut conn) = PgConnection::connect(&url).await {
                let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{name}\" WITH (FORCE)"))
                    .execute(&mut conn)
                    .await;
                let _ = conn.close().await;
            }
        }
    });

    sender
}

/// A freshly migrated database, dropped in the background when this value is.
///
/// Services commit normally; isolation comes from every test owning its own
/// database rather than from rolling anything back.
#[derive(Debug)]
pub struct TestDb {
    pub pool: PgPool,
    pub name: String,
}

impl TestDb {
    pub async fn new() -> Self {
        DROPPER.get_or_init(start_dropper).await;
        CONTAINER.get_or_init(start_container).await;

        let name = format!(
            "storefront_test_{}_{}",
            std::process::id(),
            SEQUENCE.fetch_add(1, Ordering::Relaxed)
        );

        let admin_url = server_url("postgres")
            .await
            .expect("Failed to resolve container address");

        let mut conn = PgConnection::connect(&admin_url)
            .await
            .expect("Failed to connect to postgres database");

        sqlx::query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&mut conn)
            .await
            .expect("Failed to create test database");

        conn.close()
            .await
            .expect("Failed to close admin connection");

        let url = server_url(&name)
            .await
            .expect("Failed to resolve test database address");

        let pool = PgPool::connect(&url)
            .await
            .expect("Failed to create pool for test database");

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Self { pool, name }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if let Some(sender) = DROPPER.get() {
            let _ = sender.send(self.name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_test_db_is_migrated_and_distinct() {
        let first = TestDb::new().await;
        let second = TestDb::new().await;

        assert_ne!(first.name, second.name);

        let tables: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM information_schema.tables WHERE table_name IN ('products', 'orders', 'payment_events')",
        )
        .fetch_one(first.pool())
        .await
        .expect("Failed to inspect schema");

        assert_eq!(tables, 3);

        sqlx::query("INSERT INTO products (uuid, name, price, stock) VALUES (gen_random_uuid(), 'x', 1, 1)")
            .execute(first.pool())
            .await
            .expect("Failed to insert product");

        let other: i64 = sqlx::query_scalar("SELECT count(*) FROM products")
            .fetch_one(second.pool())
            .await
            .expect("Failed to count products");

        assert_eq!(other, 0);
    }
}

//! Shared test utilities for mentor integration tests.
//!
//! - Throwaway plan databases ([`create_test_db`], [`drop_test_db`]) on one
//!   PostgreSQL server per test binary. `MENTOR_TEST_PG_URL` points at an
//!   existing server; without it a `postgres:16` container is started.
//! - In-process doubles for the pipeline's seams ([`doubles`]).

pub mod doubles;

use sqlx::{Executor, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use mentor_db::config::DbConfig;
use mentor_db::pool;

/// Pool size for a single test database.
const TEST_MAX_CONNECTIONS: u32 = 5;

enum PgServer {
    External(String),
    /// The container stops when dropped, so it lives as long as the binary.
    Container {
        base_url: String,
        _handle: ContainerAsync<Postgres>,
    },
}

impl PgServer {
    async fn start() -> Self {
        if let Ok(url) = std::env::var("MENTOR_TEST_PG_URL") {
            return Self::External(url.trim_end_matches('/').to_owned());
        }

        let handle = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .expect("failed to start PostgreSQL container");
        let host = handle.get_host().await.expect("container host");
        let port = handle
            .get_host_port_ipv4(5432)
            .await
            .expect("container port");

        Self::Container {
            base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
            _handle: handle,
        }
    }

    fn base_url(&self) -> &str {
        match self {
            Self::External(url) => url,
            Self::Container { base_url, .. } => base_url,
        }
    }

    fn plan_db(&self, db_name: &str) -> DbConfig {
        DbConfig::new(format!("{}/{db_name}", self.base_url()))
            .with_max_connections(TEST_MAX_CONNECTIONS)
    }
}

static SERVER: OnceCell<PgServer> = OnceCell::const_new();

async fn server() -> &'static PgServer {
    SERVER.get_or_init(PgServer::start).await
}

/// Create a migrated plan database with a unique name.
///
/// Returns `(pool, db_name)`; hand `db_name` to [`drop_test_db`] afterwards.
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("mentor_test_{}", Uuid::new_v4().simple());
    let config = server().await.plan_db(&db_name);

    pool::ensure_database_exists(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to create {db_name}: {e:#}"));
    let db_pool = pool::create_pool(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {db_name}: {e:#}"));
    pool::run_migrations(&db_pool)
        .await
        .expect("migrations should succeed");

    (db_pool, db_name)
}

/// Drop a database made by [`create_test_db`], disconnecting stragglers.
pub async fn drop_test_db(db_name: &str) {
    let config = server().await.plan_db(db_name);
    let maint = DbConfig::new(config.maintenance_url()).with_max_connections(1);
    let Ok(maint_pool) = pool::create_pool(&maint).await else {
        return;
    };

    let _ = sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(db_name)
    .execute(&maint_pool)
    .await;
    let _ = maint_pool
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    maint_pool.close().await;
}

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, FromRow, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/mentor-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Row counts for the plan store, reported by `mentor db-init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct StoreSummary {
    pub study_plans: i64,
    pub ai_generated_plans: i64,
    pub study_tasks: i64,
}

/// Open a pool sized by [`DbConfig::max_connections`].
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))
}

/// Apply every embedded migration that has not run yet.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(migrations = MIGRATOR.iter().count(), "plan store schema is current");
    Ok(())
}

/// Create the plan database named in `config` unless it already exists.
///
/// Goes through the `postgres` maintenance database on the same server.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = checked_database_name(config)?;
    let maintenance_url = config.maintenance_url();

    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&maintenance_url)
        .await
        .with_context(|| format!("failed to connect to maintenance database at {maintenance_url}"))?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&maint_pool)
            .await
            .context("failed to query pg_database")?;

    if exists {
        info!(db = db_name, "plan database already exists");
    } else {
        maint_pool
            .execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "plan database created");
    }

    maint_pool.close().await;
    Ok(())
}

/// The database name from `config`, restricted to characters that are safe
/// to splice into `CREATE DATABASE`, which takes no bind parameters.
pub fn checked_database_name(config: &DbConfig) -> Result<&str> {
    let name = config
        .database_name()
        .context("could not determine database name from URL")?;
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!("database name {name:?} contains invalid characters");
    }
    Ok(name)
}

/// Count stored plans and tasks.
pub async fn store_summary(pool: &PgPool) -> Result<StoreSummary> {
    sqlx::query_as::<_, StoreSummary>(
        "SELECT \
           (SELECT count(*) FROM study_plans) AS study_plans, \
           (SELECT count(*) FROM study_plans WHERE is_ai_generated) AS ai_generated_plans, \
           (SELECT count(*) FROM study_tasks) AS study_tasks",
    )
    .fetch_one(pool)
    .await
    .context("failed to count stored plans")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_database_names_are_accepted() {
        let cfg = DbConfig::new("postgresql://localhost:5432/mentor_test_01");
        assert_eq!(checked_database_name(&cfg).unwrap(), "mentor_test_01");
    }

    #[test]
    fn database_names_with_sql_are_rejected() {
        let cfg = DbConfig::new("postgresql://localhost:5432/x;DROP");
        let err = checked_database_name(&cfg).unwrap_err();
        assert!(err.to_string().contains("invalid characters"));
    }

    #[test]
    fn missing_database_name_is_an_error() {
        let cfg = DbConfig::new("postgresql://localhost:5432");
        assert!(checked_database_name(&cfg).is_err());
    }
}

//! Database lifecycle management for Orderly.
//!
//! Provides connection setup, migration running, and status checking.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

/// Result type for DB operations.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Default connection pool size.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// One applied migration, as recorded by sqlx.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    /// Migration version (timestamp prefix of the file name)
    pub version: i64,
    /// Human-readable description
    pub description: String,
    /// When it was applied
    pub installed_on: DateTime<Utc>,
    /// Whether it completed
    pub success: bool,
}

/// Open a connection pool.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(DEFAULT_MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    info!(max_connections = DEFAULT_MAX_CONNECTIONS, "Database pool connected");
    Ok(pool)
}

/// Run all pending migrations.
///
/// Uses sqlx migrations from the workspace `migrations` directory.
/// Idempotent: safe to run multiple times.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    sqlx::migrate!("../migrations").run(pool).await?;

    info!("Migrations completed successfully");
    Ok(())
}

/// Check connectivity and report the most recent applied migrations.
///
/// Returns an empty list when the migration table does not exist yet.
pub async fn status(pool: &PgPool) -> Result<Vec<AppliedMigration>> {
    let result: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    if result != 1 {
        return Err(anyhow::anyhow!("Database connectivity check failed"));
    }
    info!("Database connectivity: OK");

    // Runtime query: sqlx::query! would need a database at compile time
    let rows = sqlx::query(
        r#"
        SELECT version, description, installed_on, success
        FROM _sqlx_migrations
        ORDER BY version DESC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("42P01") => {
            warn!("Migration table not found (run migrations first)");
            return Ok(Vec::new());
        },
        Err(e) => return Err(e.into()),
    };

    let mut applied = Vec::with_capacity(rows.len());
    for row in rows {
        applied.push(AppliedMigration {
            version: row.try_get("version")?,
            description: row.try_get("description")?,
            installed_on: row.try_get("installed_on")?,
            success: row.try_get("success")?,
        });
    }

    if applied.is_empty() {
        warn!("No migrations applied yet");
    }
    for mig in &applied {
        let mark = if mig.success { "ok" } else { "FAILED" };
        info!(version = mig.version, description = %mig.description, "Migration {}", mark);
    }

    Ok(applied)
}

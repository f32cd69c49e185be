//! Orderly Daemon
//!
//! HTTP server for authentication and order management.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration (in-memory store)
//! cargo run -p orderlyd
//!
//! # Start against PostgreSQL
//! DATABASE_URL=postgres://localhost/orderly cargo run -p orderlyd --features postgres
//! ```
//!
//! # Environment Variables
//!
//! - `ORDERLY_ENV`: Environment (test, development, production)
//! - `ORDERLY_API_HOST`: API host (default: 0.0.0.0)
//! - `ORDERLY_API_PORT`: API port (default: 3333)
//! - `ORDERLY_API_PREFIX`: Route prefix (default: /api)
//! - `ORDERLY_JWT_SECRET`: Token signing secret (required in production)
//! - `ORDERLY_JWT_EXPIRES_IN`: Token lifetime (default: 7d)
//! - `ORDERLY_BCRYPT_COST`: Password hashing cost (default: 10)
//! - `DATABASE_URL`: PostgreSQL connection string (feature `postgres`)

use orderlyd::{Config, Daemon, Environment};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration first: the log format depends on the environment
    let config = Config::from_env()?;

    let filter = EnvFilter::from_default_env().add_directive("orderlyd=info".parse()?);
    if config.environment == Environment::Production {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        "Orderly Daemon"
    );

    match config.database_url.clone() {
        #[cfg(feature = "postgres")]
        Some(url) => {
            info!("Using PostgreSQL store");
            Daemon::connect_postgres(config, &url).await?.run().await?;
        },
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            tracing::warn!("DATABASE_URL set but built without `postgres`; using in-memory store");
            Daemon::new_memory(config).run().await?;
        },
        None => {
            info!("Using in-memory store");
            Daemon::new_memory(config).run().await?;
        },
    }

    Ok(())
}

//! Daemon: process runtime.
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Build the store (in-memory, or PostgreSQL after migrations)
//! 3. Construct engines with the store injected
//! 4. Serve the API
//! 5. Graceful shutdown on SIGINT/SIGTERM

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use orderly_engine::{AuthEngine, OrderEngine, PasswordHasher, TokenConfig, TokenIssuer};
use orderly_store::{MemoryStore, Store};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Daemon
// =============================================================================

/// The main Orderly daemon.
pub struct Daemon<S: Store + 'static> {
    /// Configuration
    config: Config,
    /// Store shared by both engines
    store: Arc<S>,
}

impl Daemon<MemoryStore> {
    /// Create a daemon backed by the in-memory store.
    pub fn new_memory(config: Config) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }
}

#[cfg(feature = "postgres")]
impl Daemon<orderly_store::PgStore> {
    /// Connect to PostgreSQL, apply migrations, and create a daemon on top.
    pub async fn connect_postgres(config: Config, database_url: &str) -> DaemonResult<Self> {
        let pool = orderly_db::connect(database_url)
            .await
            .map_err(|e| DaemonError::Database(e.to_string()))?;

        orderly_db::migrate(&pool)
            .await
            .map_err(|e| DaemonError::Database(e.to_string()))?;

        let applied = orderly_db::status(&pool)
            .await
            .map_err(|e| DaemonError::Database(e.to_string()))?;
        if let Some(failed) = applied.iter().find(|m| !m.success) {
            return Err(DaemonError::Database(format!(
                "migration {} ({}) is marked failed",
                failed.version, failed.description
            )));
        }
        info!(
            applied = applied.len(),
            latest = ?applied.first().map(|m| m.version),
            "Database ready"
        );

        let store = orderly_store::PgStore::new(Arc::new(pool));
        Ok(Self::new(config, Arc::new(store)))
    }
}

impl<S: Store + 'static> Daemon<S> {
    /// Create a new daemon with the provided store.
    pub fn new(config: Config, store: Arc<S>) -> Self {
        Self { config, store }
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Construct engines and handler state.
    pub fn build_state(&self) -> DaemonResult<Arc<ApiState<S>>> {
        let auth_config = &self.config.auth;

        let hasher = PasswordHasher::new(auth_config.bcrypt_cost)?;
        let tokens = TokenIssuer::new(
            TokenConfig::new(auth_config.jwt_secret.clone()).with_ttl(auth_config.jwt_expires_in),
        );

        Ok(Arc::new(ApiState {
            auth: AuthEngine::new(self.store.clone(), hasher, tokens),
            orders: OrderEngine::new(self.store.clone()),
            store: self.store.clone(),
            environment: self.config.environment,
        }))
    }

    /// Build the HTTP router.
    pub fn router(&self) -> DaemonResult<Router> {
        Ok(create_router(self.build_state()?, &self.config.api.prefix))
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT/SIGTERM).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting Orderly daemon"
        );

        let router = self.router()?;
        let (listener, addr) = self.bind().await?;
        info!(%addr, prefix = %self.config.api.prefix, "API server started");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Shutdown complete");
        Ok(())
    }

    /// Start the API server in a background task and return its address.
    pub async fn start_api_server(&self) -> DaemonResult<SocketAddr> {
        let router = self.router()?;
        let (listener, addr) = self.bind().await?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "API server error");
            }
        });

        Ok(addr)
    }

    async fn bind(&self) -> DaemonResult<(TcpListener, SocketAddr)> {
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DaemonError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener.local_addr()?;
        Ok((listener, local_addr))
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}

// =============================================================================
// Tests
// =============================================================================

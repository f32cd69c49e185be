//! Orderly Daemon Library
//!
//! HTTP transport and process runtime for the Orderly order service.
//!
//! # Architecture
//!
//! ```text
//! Client → Router → Access Gate → Handlers → AuthEngine / OrderEngine → Store
//! ```
//!
//! # Components
//!
//! - **Daemon**: store construction, engine wiring, serving and shutdown
//! - **API**: HTTP endpoints and request rejection mapping
//! - **Auth**: bearer token gate for order routes
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use orderlyd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     Daemon::new_memory(config).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod auth;
pub mod config;
pub mod daemon;
pub mod error;

// Re-exports for convenience
pub use api::{create_router, ApiState, HealthResponse};
pub use auth::CurrentUser;
pub use config::{ApiConfig, AuthConfig, Config, Environment};
pub use daemon::Daemon;
pub use error::{ApiError, DaemonError, DaemonResult, ErrorResponse};

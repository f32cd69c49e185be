//! Orderly Engine Layer
//!
//! Identity issuance and the order lifecycle, on top of an injected store.
//!
//! # Architecture
//!
//! ```text
//! Transport → (Access Gate) → AuthEngine / OrderEngine → Store
//! ```
//!
//! # Components
//!
//! - **AuthEngine**: registration, login, token issuance and verification
//! - **OrderEngine**: order creation, filtered listing, workflow advancement, soft delete
//! - **PasswordHasher**: salted bcrypt hashing off the async runtime
//! - **TokenIssuer**: signed, time-limited bearer tokens
//!
//! # Example
//!
//! ```rust,ignore
//! use orderly_engine::{AuthEngine, OrderEngine, PasswordHasher, TokenConfig, TokenIssuer};
//! use orderly_store::MemoryStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let auth = AuthEngine::new(
//!     store.clone(),
//!     PasswordHasher::new(PasswordHasher::DEFAULT_COST)?,
//!     TokenIssuer::new(TokenConfig::new("secret")),
//! );
//! let orders = OrderEngine::new(store);
//! ```

#![warn(clippy::all)]

pub mod auth;
pub mod error;
pub mod orders;
pub mod password;
pub mod token;

// Re-exports for convenience
pub use auth::{AuthEngine, AuthSession};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use orders::{OrderEngine, OrderPage, OrderQuery};
pub use password::PasswordHasher;
pub use token::{TokenConfig, TokenIssuer};

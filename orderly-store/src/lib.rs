//! Orderly Storage Layer
//!
//! Provides persistence for users and orders.
//!
//! # Architecture
//!
//! - **Repository traits**: Define the storage interface (ports)
//! - **In-memory store**: Fast implementation for testing and local runs
//! - **PostgreSQL store**: Production implementation (feature `postgres`)
//!
//! # Usage
//!
//! ```rust
//! use orderly_store::{MemoryStore, OrderFilter, Store};
//! use orderly_domain::{NewOrder, Order, Service};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!
//!     let order = Order::create(NewOrder {
//!         lab: "Lab ABC".to_string(),
//!         patient: "John Doe".to_string(),
//!         customer: "Hospital XYZ".to_string(),
//!         services: vec![Service::new("Hemograma", Decimal::from(50))],
//!     })
//!     .unwrap();
//!     store.orders().insert(&order).await.unwrap();
//!
//!     let total = store.orders().count(&OrderFilter::active()).await.unwrap();
//!     println!("Active orders: {}", total);
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;
pub use repository::{OrderFilter, OrderRepository, Store, UserRepository};

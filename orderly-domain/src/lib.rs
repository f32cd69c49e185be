//! Orderly Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains entities, value objects, and the order workflow rules.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{
    NewOrder, Order, OrderId, OrderState, OrderStatus, PublicUser, Service, ServiceStatus, User,
    UserId,
};
pub use value_objects::{Credentials, DomainError, Email, PageRequest};

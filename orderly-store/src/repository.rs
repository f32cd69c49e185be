//! Repository trait definitions (Ports)
//!
//! These traits define the storage interface for the domain.
//! Implementations can be PostgreSQL, in-memory, or mock for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use orderly_domain::{Email, Order, OrderId, OrderState, OrderStatus, User};

/// Filter for order listings (exact match on every present field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderFilter {
    /// Lifecycle status to match
    pub status: OrderStatus,
    /// Workflow state to match, any when `None`
    pub state: Option<OrderState>,
}

impl OrderFilter {
    /// Filter matching every ACTIVE order
    pub fn active() -> Self {
        Self {
            status: OrderStatus::Active,
            state: None,
        }
    }

    /// Narrow the filter to one workflow state
    pub fn with_state(mut self, state: Option<OrderState>) -> Self {
        self.state = state;
        self
    }

    /// Check an order against the filter
    pub fn matches(&self, order: &Order) -> bool {
        order.status == self.status && self.state.map_or(true, |state| order.state == state)
    }
}

/// Repository for Order entities
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order (fails with `Duplicate` if the id exists)
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    /// Find an order by ID
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Find a page of matching orders, newest first
    async fn find_page(
        &self,
        filter: &OrderFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Order>, StoreError>;

    /// Count matching orders (ignores pagination)
    async fn count(&self, filter: &OrderFilter) -> Result<u64, StoreError>;

    /// Set `state` to `next` only if the stored state is `expected` and the
    /// order is ACTIVE. Returns the updated order, or `None` if no row matched.
    async fn compare_and_set_state(
        &self,
        id: OrderId,
        expected: OrderState,
        next: OrderState,
    ) -> Result<Option<Order>, StoreError>;

    /// Set status to DELETED only if the order is ACTIVE.
    /// Returns the updated order, or `None` if no row matched.
    async fn mark_deleted(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
}

/// Repository for User entities
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user (fails with `Duplicate` if the email is taken)
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    /// Find a user by normalized email
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;
}

/// Combined store interface
#[async_trait]
pub trait Store: Send + Sync {
    /// Get order repository
    fn orders(&self) -> &dyn OrderRepository;

    /// Get user repository
    fn users(&self) -> &dyn UserRepository;

    /// Check that the backing storage is reachable
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(()) // Default no-op for in-process stores
    }
}

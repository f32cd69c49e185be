//! Order Engine: creation, listing, and workflow advancement.
//!
//! # State Machine
//!
//! ```text
//! CREATED ──advance──► ANALYSIS ──advance──► COMPLETED (final)
//! ```
//!
//! A DELETED order is frozen: advancement is rejected before the
//! transition table is consulted. Advancement is persisted with a
//! compare-and-swap on `state`, so two racing requests cannot both win.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use orderly_domain::{DomainError, NewOrder, Order, OrderId, OrderState, PageRequest};
use orderly_store::{OrderFilter, Store};

use crate::error::{EngineError, EngineResult};

const ORDER_NOT_FOUND: &str = "Order not found";
const CONCURRENT_MODIFICATION: &str = "Order was modified concurrently, retry the request";

/// Listing parameters; missing or non-positive page values fall back to sane ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// 1-based page number (default 1)
    pub page: Option<i64>,
    /// Page size (default 10)
    pub limit: Option<i64>,
    /// Exact workflow state to match
    pub state: Option<OrderState>,
}

/// One page of active orders plus the total number of matches.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    /// Orders on this page, newest first
    pub orders: Vec<Order>,
    /// Matching orders across all pages
    pub total: u64,
}

/// Validates, creates, lists and advances orders.
pub struct OrderEngine<S: Store> {
    store: Arc<S>,
}

impl<S: Store> OrderEngine<S> {
    /// Create a new order engine.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validate and persist a new order in CREATED / ACTIVE.
    ///
    /// # Errors
    /// `InvalidInput` when any creation rule fails; nothing is persisted.
    pub async fn create_order(&self, input: NewOrder) -> EngineResult<Order> {
        let order = Order::create(input)?;

        self.store
            .orders()
            .insert(&order)
            .await
            .map_err(|e| EngineError::store("insert_order", e))?;

        info!(order_id = %order.id, total = ?order.total_value(), "Order created");
        Ok(order)
    }

    /// List ACTIVE orders, newest first.
    pub async fn get_orders(&self, query: OrderQuery) -> EngineResult<OrderPage> {
        let page = PageRequest::new(query.page, query.limit);
        let filter = OrderFilter::active().with_state(query.state);

        let orders = self
            .store
            .orders()
            .find_page(&filter, page.skip(), page.limit())
            .await
            .map_err(|e| EngineError::store("find_orders", e))?;

        let total = self
            .store
            .orders()
            .count(&filter)
            .await
            .map_err(|e| EngineError::store("count_orders", e))?;

        debug!(
            page = page.page(),
            limit = page.limit(),
            returned = orders.len(),
            total,
            "Orders listed"
        );
        Ok(OrderPage { orders, total })
    }

    /// Fetch one order by id. Deleted orders are still returned.
    pub async fn get_order(&self, id: OrderId) -> EngineResult<Order> {
        self.find(id).await
    }

    /// Move an order one step forward.
    ///
    /// # Errors
    /// - `NotFound` if the order does not exist
    /// - `Conflict` if the order is deleted, already COMPLETED, or changed
    ///   between read and write
    pub async fn advance_order_state(&self, id: OrderId) -> EngineResult<Order> {
        let order = self.find(id).await?;

        let next = order.next_state().map_err(|e| {
            warn!(order_id = %id, state = %order.state, error = %e, "Advance rejected");
            EngineError::from(e)
        })?;

        let updated = self
            .store
            .orders()
            .compare_and_set_state(id, order.state, next)
            .await
            .map_err(|e| EngineError::store("advance_order", e))?;

        match updated {
            Some(updated) => {
                info!(order_id = %id, from = %order.state, to = %next, "Order advanced");
                Ok(updated)
            },
            None => {
                warn!(order_id = %id, expected = %order.state, "Advance lost a race");
                Err(EngineError::Conflict(CONCURRENT_MODIFICATION.to_string()))
            },
        }
    }

    /// Soft-delete an order, leaving its workflow state untouched.
    ///
    /// # Errors
    /// - `NotFound` if the order does not exist
    /// - `Conflict` if it is already deleted
    pub async fn delete_order(&self, id: OrderId) -> EngineResult<Order> {
        let mut order = self.find(id).await?;
        order.mark_deleted()?;

        let deleted = self
            .store
            .orders()
            .mark_deleted(id)
            .await
            .map_err(|e| EngineError::store("delete_order", e))?
            .ok_or_else(|| EngineError::from(DomainError::AlreadyDeleted))?;

        info!(order_id = %id, state = %deleted.state, "Order deleted");
        Ok(deleted)
    }

    async fn find(&self, id: OrderId) -> EngineResult<Order> {
        self.store
            .orders()
            .find_by_id(id)
            .await
            .map_err(|e| EngineError::store("find_order", e))?
            .ok_or_else(|| EngineError::NotFound(ORDER_NOT_FOUND.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

//! In-memory store implementation
//!
//! Used for testing and development without a database.
//! Thread-safe using RwLock for concurrent access.

use crate::error::StoreError;
use crate::repository::{OrderFilter, OrderRepository, Store, UserRepository};
use async_trait::async_trait;
use chrono::Utc;
use orderly_domain::{Email, Order, OrderId, OrderState, OrderStatus, User, UserId};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory store for testing
pub struct MemoryStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of orders (any status)
    pub fn order_count(&self) -> usize {
        self.orders.read().map(|orders| orders.len()).unwrap_or(0)
    }

    /// Get the number of users
    pub fn user_count(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }

    /// Overwrite an order as-is, bypassing workflow rules.
    ///
    /// Stands in for direct database manipulation in tests.
    pub fn put_order(&self, order: Order) -> Result<(), StoreError> {
        write(&self.orders)?.insert(order.id, order);
        Ok(())
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) -> Result<(), StoreError> {
        write(&self.orders)?.clear();
        write(&self.users)?.clear();
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

// =============================================================================
// Order Repository Implementation
// =============================================================================

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = write(&self.orders)?;
        if orders.contains_key(&order.id) {
            return Err(StoreError::duplicate("order", order.id.to_string()));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = read(&self.orders)?;
        Ok(orders.get(&id).cloned())
    }

    async fn find_page(
        &self,
        filter: &OrderFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Order>, StoreError> {
        let orders = read(&self.orders)?;
        let mut matching: Vec<&Order> = orders.values().filter(|o| filter.matches(o)).collect();

        // Newest first; ids are time-ordered so they break timestamp ties
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        Ok(matching
            .into_iter()
            .skip(to_usize(skip))
            .take(to_usize(limit))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &OrderFilter) -> Result<u64, StoreError> {
        let orders = read(&self.orders)?;
        Ok(orders.values().filter(|o| filter.matches(o)).count() as u64)
    }

    async fn compare_and_set_state(
        &self,
        id: OrderId,
        expected: OrderState,
        next: OrderState,
    ) -> Result<Option<Order>, StoreError> {
        let mut orders = write(&self.orders)?;
        match orders.get_mut(&id) {
            Some(order) if order.state == expected && order.status == OrderStatus::Active => {
                order.state = next;
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            },
            _ => Ok(None),
        }
    }

    async fn mark_deleted(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let mut orders = write(&self.orders)?;
        match orders.get_mut(&id) {
            Some(order) if order.status == OrderStatus::Active => {
                order.status = OrderStatus::Deleted;
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            },
            _ => Ok(None),
        }
    }
}

// =============================================================================
// User Repository Implementation
// =============================================================================

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = write(&self.users)?;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::duplicate("user", user.email.as_str()));
        }
        if users.contains_key(&user.id) {
            return Err(StoreError::duplicate("user", user.id.to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let users = read(&self.users)?;
        Ok(users.values().find(|u| &u.email == email).cloned())
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

#[async_trait]
impl Store for MemoryStore {
    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn users(&self) -> &dyn UserRepository {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use orderly_domain::{NewOrder, Service};
    use rust_decimal_macros::dec;

    fn create_test_order(patient: &str) -> Order {
        Order::create(NewOrder {
            lab: "Lab ABC".to_string(),
            patient: patient.to_string(),
            customer: "Hospital XYZ".to_string(),
            services: vec![Service::new("Hemograma", dec!(50))],
        })
        .unwrap()
    }

    fn create_test_user(email: &str) -> User {
        User::new(Email::parse(email).unwrap(), "$2b$04$hash".to_string())
    }

    /// Seed `n` orders with strictly increasing creation times.
    fn seed(store: &MemoryStore, n: usize) -> Vec<Order> {
        let base = Utc::now();
        (0..n)
            .map(|i| {
                let mut order = create_test_order(&format!("patient-{i}"));
                order.created_at = base + Duration::seconds(i as i64);
                store.put_order(order.clone()).unwrap();
                order
            })
            .collect()
    }

    // Order Repository Tests
    #[tokio::test]
    async fn test_order_insert_and_find() {
        let store = MemoryStore::new();
        let order = create_test_order("John Doe");
        let id = order.id;

        OrderRepository::insert(&store, &order).await.unwrap();

        let found = OrderRepository::find_by_id(&store, id).await.unwrap();
        assert_eq!(found, Some(order));
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_order_insert_duplicate_id() {
        let store = MemoryStore::new();
        let order = create_test_order("John Doe");

        OrderRepository::insert(&store, &order).await.unwrap();
        let err = OrderRepository::insert(&store, &order).await.unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn test_find_page_newest_first() {
        let store = MemoryStore::new();
        let seeded = seed(&store, 3);

        let page = store.find_page(&OrderFilter::active(), 0, 10).await.unwrap();
        let ids: Vec<_> = page.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![seeded[2].id, seeded[1].id, seeded[0].id]);
    }

    #[tokio::test]
    async fn test_find_page_skip_and_limit() {
        let store = MemoryStore::new();
        let seeded = seed(&store, 12);

        let page = store.find_page(&OrderFilter::active(), 5, 5).await.unwrap();
        assert_eq!(page.len(), 5);
        // newest is index 11; skipping 5 starts at index 6
        assert_eq!(page[0].id, seeded[6].id);
        assert_eq!(page[4].id, seeded[2].id);

        let tail = store.find_page(&OrderFilter::active(), 10, 5).await.unwrap();
        assert_eq!(tail.len(), 2);

        assert_eq!(store.count(&OrderFilter::active()).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_find_page_excludes_deleted() {
        let store = MemoryStore::new();
        let seeded = seed(&store, 3);
        store.mark_deleted(seeded[1].id).await.unwrap();

        let page = store.find_page(&OrderFilter::active(), 0, 10).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|o| o.status == OrderStatus::Active));
        assert_eq!(store.count(&OrderFilter::active()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_compare_and_set_state() {
        let store = MemoryStore::new();
        let order = create_test_order("John Doe");
        OrderRepository::insert(&store, &order).await.unwrap();

        let updated = store
            .compare_and_set_state(order.id, OrderState::Created, OrderState::Analysis)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.state, OrderState::Analysis);

        // stale expectation does not match
        let stale = store
            .compare_and_set_state(order.id, OrderState::Created, OrderState::Analysis)
            .await
            .unwrap();
        assert!(stale.is_none());

        let missing = store
            .compare_and_set_state(OrderId::now_v7(), OrderState::Created, OrderState::Analysis)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_compare_and_set_rejects_deleted() {
        let store = MemoryStore::new();
        let mut order = create_test_order("John Doe");
        order.status = OrderStatus::Deleted;
        store.put_order(order.clone()).unwrap();

        let result = store
            .compare_and_set_state(order.id, OrderState::Created, OrderState::Analysis)
            .await
            .unwrap();
        assert!(result.is_none());

        let stored = OrderRepository::find_by_id(&store, order.id).await.unwrap().unwrap();
        assert_eq!(stored.state, OrderState::Created);
    }

    #[tokio::test]
    async fn test_mark_deleted_once() {
        let store = MemoryStore::new();
        let order = create_test_order("John Doe");
        OrderRepository::insert(&store, &order).await.unwrap();

        let deleted = store.mark_deleted(order.id).await.unwrap().unwrap();
        assert_eq!(deleted.status, OrderStatus::Deleted);
        assert_eq!(deleted.state, OrderState::Created);

        assert!(store.mark_deleted(order.id).await.unwrap().is_none());
    }

    // User Repository Tests
    #[tokio::test]
    async fn test_user_insert_and_find_by_email() {
        let store = MemoryStore::new();
        let user = create_test_user("alice@example.com");

        UserRepository::insert(&store, &user).await.unwrap();

        let lookup = Email::parse("  ALICE@example.com ").unwrap();
        let found = store.find_by_email(&lookup).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn test_user_duplicate_email() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, &create_test_user("alice@example.com")).await.unwrap();

        let err = UserRepository::insert(&store, &create_test_user("Alice@Example.com"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new();
        seed(&store, 2);
        UserRepository::insert(&store, &create_test_user("a@b.com")).await.unwrap();

        store.clear().unwrap();
        assert_eq!(store.order_count(), 0);
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_health_check_is_ok() {
        let store = MemoryStore::new();
        assert!(store.health_check().await.is_ok());
    }
}

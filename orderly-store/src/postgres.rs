//! PostgreSQL store implementation.
//!
//! Orders keep their services as a JSONB array; users are keyed by a unique,
//! already-normalized email column.
//!
//! This module uses dynamic queries (sqlx::query) instead of compile-time
//! checked macros (sqlx::query!) to allow compilation without DATABASE_URL.

use crate::error::StoreError;
use crate::repository::{OrderFilter, OrderRepository, Store, UserRepository};
use async_trait::async_trait;
use orderly_domain::{Email, Order, OrderId, OrderState, OrderStatus, Service, User};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::sync::Arc;

const ORDER_COLUMNS: &str =
    "id, lab, patient, customer, services, state, status, created_at, updated_at";

const USER_COLUMNS: &str = "id, email, password_hash, created_at, updated_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    /// PostgreSQL connection pool
    pool: Arc<PgPool>,
}

impl PgStore {
    /// Create a new PostgreSQL store.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Map a row from the `orders` table.
fn order_from_row(row: &PgRow) -> Result<Order, StoreError> {
    let state: String = row.try_get("state")?;
    let status: String = row.try_get("status")?;
    let services: Json<Vec<Service>> = row.try_get("services")?;

    Ok(Order {
        id: row.try_get("id")?,
        lab: row.try_get("lab")?,
        patient: row.try_get("patient")?,
        customer: row.try_get("customer")?,
        services: services.0,
        state: state.parse()?,
        status: status.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map a row from the `users` table.
fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let email: String = row.try_get("email")?;

    Ok(User {
        id: row.try_get("id")?,
        email: Email::parse(&email)
            .map_err(|e| StoreError::Deserialization(format!("Invalid stored email {}: {}", email, e)))?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// =============================================================================
// Order Repository Implementation
// =============================================================================

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, lab, patient, customer, services,
                state, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id)
        .bind(&order.lab)
        .bind(&order.patient)
        .bind(&order.customer)
        .bind(Json(&order.services))
        .bind(order.state.as_str())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn find_page(
        &self,
        filter: &OrderFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE status = $1
              AND ($2::text IS NULL OR state = $2)
            ORDER BY created_at DESC, id DESC
            OFFSET $3
            LIMIT $4
            "#
        ))
        .bind(filter.status.as_str())
        .bind(filter.state.map(|s| s.as_str()))
        .bind(to_i64(skip))
        .bind(to_i64(limit))
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn count(&self, filter: &OrderFilter) -> Result<u64, StoreError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM orders
            WHERE status = $1
              AND ($2::text IS NULL OR state = $2)
            "#,
        )
        .bind(filter.status.as_str())
        .bind(filter.state.map(|s| s.as_str()))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(total.max(0).unsigned_abs())
    }

    async fn compare_and_set_state(
        &self,
        id: OrderId,
        expected: OrderState,
        next: OrderState,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders
            SET state = $3, updated_at = NOW()
            WHERE id = $1 AND state = $2 AND status = $4
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(OrderStatus::Active.as_str())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn mark_deleted(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(OrderStatus::Deleted.as_str())
        .bind(OrderStatus::Active.as_str())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(order_from_row).transpose()
    }
}

// =============================================================================
// User Repository Implementation
// =============================================================================

#[async_trait]
impl UserRepository for PgStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Duplicate { .. } => StoreError::duplicate("user", user.email.as_str()),
            other => other,
        })?;

        Ok(())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

#[async_trait]
impl Store for PgStore {
    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn users(&self) -> &dyn UserRepository {
        self
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

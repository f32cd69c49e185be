//! Domain Entities for Orderly
//!
//! Core business entities with lifecycle management.
//! Orders move through a fixed three-step workflow; users are created once
//! on registration and never mutated afterwards.

use crate::value_objects::{DomainError, Email};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identifier for an Order
pub type OrderId = Uuid;

/// Unique identifier for a User
pub type UserId = Uuid;

// =============================================================================
// Order State Machine
// =============================================================================

/// Workflow stage of an order
///
/// ```text
/// CREATED ──► ANALYSIS ──► COMPLETED
/// ```
///
/// Moves forward only, one step at a time. COMPLETED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Order registered, awaiting analysis
    Created,
    /// Samples under analysis
    Analysis,
    /// Work finished (terminal)
    Completed,
}

/// Transition table: current state → next state, `None` for terminal.
const TRANSITIONS: [(OrderState, Option<OrderState>); 3] = [
    (OrderState::Created, Some(OrderState::Analysis)),
    (OrderState::Analysis, Some(OrderState::Completed)),
    (OrderState::Completed, None),
];

impl OrderState {
    /// All states in workflow order
    pub const ALL: [OrderState; 3] =
        [OrderState::Created, OrderState::Analysis, OrderState::Completed];

    /// Next state in the workflow, or `None` if this state is terminal
    pub fn next(self) -> Option<OrderState> {
        TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .and_then(|(_, to)| *to)
    }

    /// Whether no transition leaves this state
    pub fn is_final(self) -> bool {
        self.next().is_none()
    }

    /// Wire/storage name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Created => "CREATED",
            OrderState::Analysis => "ANALYSIS",
            OrderState::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DomainError::InvalidState(s.to_string()))
    }
}

/// Lifecycle flag of an order, independent of its workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Visible in listings, may advance
    Active,
    /// Soft-deleted: frozen, hidden from listings
    Deleted,
}

impl OrderStatus {
    /// Wire/storage name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Active => "ACTIVE",
            OrderStatus::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(OrderStatus::Active),
            "DELETED" => Ok(OrderStatus::Deleted),
            other => Err(DomainError::InvalidState(other.to_string())),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Completion flag of a service line item (informational only)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    /// Not yet performed
    #[default]
    Pending,
    /// Performed
    Done,
}

/// Priced line item embedded in an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Display name, e.g. "Hemograma"
    pub name: String,
    /// Price, must be > 0 at creation
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    /// Informational status, never read by the workflow
    #[serde(default)]
    pub status: ServiceStatus,
}

impl Service {
    /// Create a pending service
    pub fn new(name: impl Into<String>, value: Decimal) -> Self {
        Self {
            name: name.into(),
            value,
            status: ServiceStatus::Pending,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// Unvalidated order creation input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Laboratory name
    pub lab: String,
    /// Patient name
    pub patient: String,
    /// Customer (payer) name
    pub customer: String,
    /// Line items, in submission order
    #[serde(default)]
    pub services: Vec<Service>,
}

impl NewOrder {
    /// Check creation invariants.
    ///
    /// Order of checks is fixed:
    /// 1. at least one service
    /// 2. every service value > 0 (first offender reported by name)
    /// 3. total value fits in a decimal and is > 0
    /// 4. service names and order fields are non-blank
    ///
    /// # Errors
    /// Returns the first violated rule as a `DomainError`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.services.is_empty() {
            return Err(DomainError::EmptyServices);
        }

        if let Some(offender) = self.services.iter().find(|s| s.value <= Decimal::ZERO) {
            return Err(DomainError::NonPositiveServiceValue(offender.name.clone()));
        }

        let total = checked_total(&self.services).ok_or(DomainError::TotalOverflow)?;
        if total <= Decimal::ZERO {
            return Err(DomainError::NonPositiveTotal);
        }

        if self.services.iter().any(|s| s.name.trim().is_empty()) {
            return Err(DomainError::MissingServiceName);
        }

        for (field, value) in [
            ("lab", &self.lab),
            ("patient", &self.patient),
            ("customer", &self.customer),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::MissingField(field));
            }
        }

        Ok(())
    }
}

fn checked_total(services: &[Service]) -> Option<Decimal> {
    services
        .iter()
        .try_fold(Decimal::ZERO, |total, s| total.checked_add(s.value))
}

/// A unit of lab work tracked through the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Store-visible identifier (UUID v7, time-ordered)
    pub id: OrderId,
    /// Laboratory name
    pub lab: String,
    /// Patient name
    pub patient: String,
    /// Customer (payer) name
    pub customer: String,
    /// Line items; never empty
    pub services: Vec<Service>,
    /// Workflow stage
    pub state: OrderState,
    /// Lifecycle flag
    pub status: OrderStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Validate input and build a fresh order in CREATED / ACTIVE
    ///
    /// Fields are kept verbatim.
    ///
    /// # Errors
    /// See [`NewOrder::validate`].
    pub fn create(input: NewOrder) -> Result<Self, DomainError> {
        input.validate()?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            lab: input.lab,
            patient: input.patient,
            customer: input.customer,
            services: input.services,
            state: OrderState::Created,
            status: OrderStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check if the order is active (not soft-deleted)
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Sum of all service values, `None` on overflow
    pub fn total_value(&self) -> Option<Decimal> {
        checked_total(&self.services)
    }

    /// Compute the state this order would advance to.
    ///
    /// Status is checked before the transition table: a deleted order
    /// has no transitions regardless of its state.
    ///
    /// # Errors
    /// - `DomainError::OrderDeleted` if status is not ACTIVE
    /// - `DomainError::AlreadyFinal` if state is COMPLETED
    pub fn next_state(&self) -> Result<OrderState, DomainError> {
        if !self.is_active() {
            return Err(DomainError::OrderDeleted);
        }
        self.state.next().ok_or(DomainError::AlreadyFinal)
    }

    /// Advance one step, returning the previous state
    pub fn advance(&mut self) -> Result<OrderState, DomainError> {
        let next = self.next_state()?;
        let previous = self.state;
        self.state = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    /// Soft delete. State is left untouched.
    pub fn mark_deleted(&mut self) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::AlreadyDeleted);
        }
        self.status = OrderStatus::Deleted;
        self.updated_at = Utc::now();
        Ok(())
    }
}

// =============================================================================
// User
// =============================================================================

/// Registered user. Holds only the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Store-visible identifier
    pub id: UserId,
    /// Normalized, unique email
    pub email: Email,
    /// Salted one-way hash of the password
    pub password_hash: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record
    pub fn new(email: Email, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Public view with the password hash stripped
    pub fn public_view(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// User fields safe to return to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// User identifier
    pub id: UserId,
    /// Normalized email
    pub email: Email,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_order(services: Vec<Service>) -> NewOrder {
        NewOrder {
            lab: "Lab ABC".to_string(),
            patient: "John Doe".to_string(),
            customer: "Hospital XYZ".to_string(),
            services,
        }
    }

    #[test]
    fn test_transition_table() {
        assert_eq!(OrderState::Created.next(), Some(OrderState::Analysis));
        assert_eq!(OrderState::Analysis.next(), Some(OrderState::Completed));
        assert_eq!(OrderState::Completed.next(), None);
        assert!(OrderState::Completed.is_final());
        assert!(!OrderState::Created.is_final());
    }

    #[test]
    fn test_transitions_never_go_backward() {
        for (index, state) in OrderState::ALL.iter().enumerate() {
            if let Some(next) = state.next() {
                assert_eq!(OrderState::ALL[index + 1], next);
            }
        }
    }

    #[test]
    fn test_state_wire_names() {
        assert_eq!(serde_json::to_string(&OrderState::Analysis).unwrap(), "\"ANALYSIS\"");
        assert_eq!("COMPLETED".parse::<OrderState>().unwrap(), OrderState::Completed);
        assert_eq!(
            "completed".parse::<OrderState>(),
            Err(DomainError::InvalidState("completed".to_string()))
        );
        assert_eq!(serde_json::to_string(&OrderStatus::Deleted).unwrap(), "\"DELETED\"");
    }

    #[test]
    fn test_create_order_initial_state() {
        let order = Order::create(new_order(vec![Service::new("Hemograma", dec!(50))])).unwrap();

        assert_eq!(order.state, OrderState::Created);
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.lab, "Lab ABC");
        assert_eq!(order.services.len(), 1);
        assert_eq!(order.services[0].status, ServiceStatus::Pending);
        assert_eq!(order.total_value(), Some(dec!(50)));
    }

    #[test]
    fn test_create_order_requires_services() {
        let mut input = new_order(vec![]);
        input.lab = String::new();
        assert_eq!(Order::create(input), Err(DomainError::EmptyServices));
    }

    #[test]
    fn test_create_order_rejects_zero_value() {
        let input = new_order(vec![Service::new("Hemograma", dec!(0))]);
        let err = Order::create(input).unwrap_err();
        assert_eq!(err.to_string(), "Service \"Hemograma\" must have a value greater than zero");
    }

    #[test]
    fn test_create_order_reports_first_offender() {
        let input = new_order(vec![
            Service::new("Hemograma", dec!(100)),
            Service::new("Exame de Urina", dec!(0)),
            Service::new("Raio-X", dec!(-5)),
        ]);
        assert_eq!(
            Order::create(input),
            Err(DomainError::NonPositiveServiceValue("Exame de Urina".to_string()))
        );
    }

    #[test]
    fn test_per_service_check_applies_even_when_total_positive() {
        let input = new_order(vec![
            Service::new("Raio-X", dec!(-50)),
            Service::new("Hemograma", dec!(500)),
        ]);
        assert_eq!(
            Order::create(input),
            Err(DomainError::NonPositiveServiceValue("Raio-X".to_string()))
        );
    }

    #[test]
    fn test_create_order_requires_fields() {
        let mut input = new_order(vec![Service::new("Hemograma", dec!(10))]);
        input.patient = "   ".to_string();
        assert_eq!(Order::create(input), Err(DomainError::MissingField("patient")));

        let input = new_order(vec![Service::new(" ", dec!(10))]);
        assert_eq!(Order::create(input), Err(DomainError::MissingServiceName));
    }

    #[test]
    fn test_create_order_total_overflow() {
        let input = new_order(vec![
            Service::new("Hemograma", Decimal::MAX),
            Service::new("Glicemia", Decimal::MAX),
        ]);
        assert_eq!(Order::create(input), Err(DomainError::TotalOverflow));
    }

    #[test]
    fn test_large_json_values_overflow_total() {
        let input: NewOrder = serde_json::from_str(
            r#"{"lab":"Lab","patient":"P","customer":"C",
                "services":[{"name":"A","value":7.9e28},{"name":"B","value":7.9e28}]}"#,
        )
        .unwrap();

        assert!(input.services.iter().all(|s| s.value > Decimal::ZERO));
        assert_eq!(input.validate(), Err(DomainError::TotalOverflow));
    }

    #[test]
    fn test_total_value_near_max() {
        let order = Order::create(new_order(vec![
            Service::new("Hemograma", Decimal::MAX - dec!(1)),
            Service::new("Glicemia", dec!(1)),
        ]))
        .unwrap();
        assert_eq!(order.total_value(), Some(Decimal::MAX));
    }

    #[test]
    fn test_advance_full_workflow() {
        let mut order = Order::create(new_order(vec![Service::new("Hemograma", dec!(50))])).unwrap();

        assert_eq!(order.advance().unwrap(), OrderState::Created);
        assert_eq!(order.state, OrderState::Analysis);

        assert_eq!(order.advance().unwrap(), OrderState::Analysis);
        assert_eq!(order.state, OrderState::Completed);

        assert_eq!(order.advance(), Err(DomainError::AlreadyFinal));
        assert_eq!(order.state, OrderState::Completed);
    }

    #[test]
    fn test_advance_deleted_order_is_rejected() {
        let mut order = Order::create(new_order(vec![Service::new("Hemograma", dec!(50))])).unwrap();
        order.mark_deleted().unwrap();

        let before = order.clone();
        assert_eq!(order.advance(), Err(DomainError::OrderDeleted));
        assert_eq!(order, before);

        // status is checked before the transition table
        order.state = OrderState::Completed;
        assert_eq!(order.next_state(), Err(DomainError::OrderDeleted));
    }

    #[test]
    fn test_mark_deleted_keeps_state() {
        let mut order = Order::create(new_order(vec![Service::new("Hemograma", dec!(50))])).unwrap();
        order.advance().unwrap();
        order.mark_deleted().unwrap();

        assert_eq!(order.status, OrderStatus::Deleted);
        assert_eq!(order.state, OrderState::Analysis);
        assert_eq!(order.mark_deleted(), Err(DomainError::AlreadyDeleted));
    }

    #[test]
    fn test_order_json_shape() {
        let order = Order::create(new_order(vec![Service::new("Hemograma", dec!(50))])).unwrap();
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["state"], "CREATED");
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["services"][0]["status"], "PENDING");
        assert_eq!(json["services"][0]["value"].as_f64(), Some(50.0));
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_service_status_defaults_to_pending() {
        let service: Service = serde_json::from_str(r#"{"name":"Hemograma","value":50}"#).unwrap();
        assert_eq!(service.status, ServiceStatus::Pending);
        assert_eq!(service.value, dec!(50));
    }

    #[test]
    fn test_public_view_strips_hash() {
        let user = User::new(Email::parse("a@b.com").unwrap(), "$2b$10$hash".to_string());
        let json = serde_json::to_string(&user.public_view()).unwrap();
        assert!(!json.contains("hash"));
        assert!(json.contains("a@b.com"));
    }
}

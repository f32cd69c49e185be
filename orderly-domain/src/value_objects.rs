//! Value Objects for the Orderly Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain errors for validation and workflow rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Order was submitted without services
    #[error("Order must have at least one service")]
    EmptyServices,

    /// A service line item carries a value <= 0
    #[error("Service \"{0}\" must have a value greater than zero")]
    NonPositiveServiceValue(String),

    /// Sum of all service values is <= 0
    #[error("Order total value must be greater than zero")]
    NonPositiveTotal,

    /// Sum of all service values does not fit in a decimal
    #[error("Order total value is too large")]
    TotalOverflow,

    /// A service line item has a blank name
    #[error("Service name is required")]
    MissingServiceName,

    /// A required order field is blank
    #[error("Field \"{0}\" is required")]
    MissingField(&'static str),

    /// Email does not look like an address
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password is empty
    #[error("Password is required")]
    MissingPassword,

    /// Unknown workflow state name
    #[error("Invalid order state: {0}")]
    InvalidState(String),

    /// Advancement attempted on a soft-deleted order
    #[error("Cannot advance deleted order")]
    OrderDeleted,

    /// Advancement attempted on an order in the terminal state
    #[error("Order is already in final state")]
    AlreadyFinal,

    /// Soft delete attempted on an order that is already deleted
    #[error("Order is already deleted")]
    AlreadyDeleted,
}

impl DomainError {
    /// Whether the error is a workflow (state machine) violation rather than bad input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::OrderDeleted | DomainError::AlreadyFinal | DomainError::AlreadyDeleted
        )
    }
}

// =============================================================================
// Email
// =============================================================================

/// Normalized email address (trimmed, lower-cased)
///
/// # Invariants
/// - Exactly one `@` with non-empty local and domain parts
/// - No whitespace
/// - Always stored lower-case, so equality is case-insensitive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parse and normalize an email address
    ///
    /// # Examples
    /// ```
    /// # use orderly_domain::value_objects::Email;
    /// let email = Email::parse("  Alice@Example.COM ").unwrap();
    /// assert_eq!(email.as_str(), "alice@example.com");
    /// ```
    ///
    /// # Errors
    /// Returns `DomainError::InvalidEmail` if the input is not a plausible address
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_lowercase();

        if normalized.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidEmail);
        }

        match normalized.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(normalized))
            },
            _ => Err(DomainError::InvalidEmail),
        }
    }

    /// Get the normalized address
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Plaintext login credentials as submitted by a caller.
///
/// Zeroized on drop; the password never appears in `Debug` output.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// Create credentials from raw input
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Raw (unnormalized) email as submitted
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Plaintext password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Validate shape for registration and return the normalized email
    ///
    /// # Errors
    /// - `DomainError::InvalidEmail` if the email is malformed
    /// - `DomainError::MissingPassword` if the password is empty
    pub fn validate(&self) -> Result<Email, DomainError> {
        let email = Email::parse(&self.email)?;
        if self.password.is_empty() {
            return Err(DomainError::MissingPassword);
        }
        Ok(email)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// PageRequest
// =============================================================================

/// Pagination window for order listings
///
/// # Invariants
/// - `page >= 1`
/// - `limit >= 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Page used when none is requested
    pub const DEFAULT_PAGE: u64 = 1;
    /// Page size used when none is requested
    pub const DEFAULT_LIMIT: u64 = 10;

    /// Build a page request, defaulting missing values and clamping
    /// non-positive ones to 1.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.map_or(Self::DEFAULT_PAGE, clamp_positive),
            limit: limit.map_or(Self::DEFAULT_LIMIT, clamp_positive),
        }
    }

    /// 1-based page number
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Page size
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of records to skip: `(page - 1) * limit`
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

fn clamp_positive(value: i64) -> u64 {
    value.max(1).unsigned_abs()
}

// =============================================================================
// Tests
// =============================================================================

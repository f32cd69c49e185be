//! Auth Engine: registration, login, and bearer token lifecycle.
//!
//! # Flow
//!
//! ```text
//! register: validate → email free? → hash → insert user → issue token
//! login:    find by email → compare hash → issue token
//! ```
//!
//! Login failures never reveal whether the email exists: both paths
//! return the same message and both pay for one bcrypt comparison.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use orderly_domain::{Credentials, Email, PublicUser, User, UserId};
use orderly_store::Store;

use crate::error::{EngineError, EngineResult};
use crate::password::PasswordHasher;
use crate::token::TokenIssuer;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const USER_EXISTS: &str = "User already exists";

/// Token plus public user view returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    /// Signed bearer token
    pub token: String,
    /// Caller's public profile
    pub user: PublicUser,
}

/// Registers and authenticates users, issues and verifies tokens.
pub struct AuthEngine<S: Store> {
    /// Store for user records
    store: Arc<S>,
    /// Password hasher
    hasher: PasswordHasher,
    /// Token issuer
    tokens: TokenIssuer,
}

impl<S: Store> AuthEngine<S> {
    /// Create a new auth engine.
    pub fn new(store: Arc<S>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    /// - `InvalidInput` for a malformed email or empty password
    /// - `Conflict` if the normalized email is taken
    pub async fn register(&self, credentials: &Credentials) -> EngineResult<AuthSession> {
        let email = credentials.validate()?;

        let existing = self
            .store
            .users()
            .find_by_email(&email)
            .await
            .map_err(|e| EngineError::store("find_user", e))?;
        if existing.is_some() {
            warn!(email = %email, "Registration rejected: email taken");
            return Err(EngineError::Conflict(USER_EXISTS.to_string()));
        }

        let password_hash = self.hasher.hash(credentials.password()).await?;
        let user = User::new(email, password_hash);

        // A concurrent registration can still win the unique index.
        self.store.users().insert(&user).await.map_err(|e| {
            if e.is_duplicate() {
                EngineError::Conflict(USER_EXISTS.to_string())
            } else {
                EngineError::store("insert_user", e)
            }
        })?;

        info!(user_id = %user.id, "User registered");
        self.session_for(&user)
    }

    /// Authenticate an existing user.
    ///
    /// # Errors
    /// `Unauthorized` ("Invalid credentials") for unknown email or wrong password.
    pub async fn login(&self, credentials: &Credentials) -> EngineResult<AuthSession> {
        let user = match Email::parse(credentials.email()) {
            Ok(email) => self
                .store
                .users()
                .find_by_email(&email)
                .await
                .map_err(|e| EngineError::store("find_user", e))?,
            Err(_) => None,
        };

        let Some(user) = user else {
            self.hasher.verify_dummy(credentials.password()).await?;
            warn!("Login rejected: unknown email");
            return Err(EngineError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !self.hasher.verify(credentials.password(), &user.password_hash).await? {
            warn!(user_id = %user.id, "Login rejected: password mismatch");
            return Err(EngineError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        info!(user_id = %user.id, "User logged in");
        self.session_for(&user)
    }

    /// Issue a fresh token for a user id.
    pub fn issue_token(&self, user_id: UserId) -> EngineResult<String> {
        self.tokens.issue(user_id)
    }

    /// Verify a bearer token and return the embedded user id.
    pub fn verify_token(&self, token: &str) -> EngineResult<UserId> {
        self.tokens.verify(token)
    }

    fn session_for(&self, user: &User) -> EngineResult<AuthSession> {
        Ok(AuthSession {
            token: self.issue_token(user.id)?,
            user: user.public_view(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Password hashing.
//!
//! bcrypt with a random per-record salt. Hashing and verification are
//! CPU-bound, so both run on the blocking thread pool.

use crate::error::{EngineError, EngineResult};
use tokio::sync::OnceCell;
use tokio::task;
use tracing::warn;
use zeroize::Zeroizing;

/// Plaintext hashed once to produce the dummy hash used when no user matches.
const DUMMY_PASSWORD: &str = "orderly-dummy-password";

/// Cost range accepted by bcrypt.
const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Salted bcrypt hasher with a fixed cost.
#[derive(Debug)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: OnceCell<String>,
}

impl PasswordHasher {
    /// Default bcrypt cost (2^10 rounds)
    pub const DEFAULT_COST: u32 = 10;

    /// Create a hasher with the given cost.
    ///
    /// # Errors
    /// Returns `EngineError::Internal` if the cost is outside bcrypt's 4..=31.
    pub fn new(cost: u32) -> EngineResult<Self> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(EngineError::Internal(format!(
                "bcrypt cost must be between {} and {}, got {}",
                MIN_COST, MAX_COST, cost
            )));
        }
        Ok(Self {
            cost,
            dummy_hash: OnceCell::new(),
        })
    }

    /// Configured cost.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt.
    pub async fn hash(&self, password: &str) -> EngineResult<String> {
        let password = Zeroizing::new(password.to_owned());
        let cost = self.cost;

        task::spawn_blocking(move || bcrypt::hash(password.as_bytes(), cost))
            .await
            .map_err(|e| EngineError::Internal(format!("hash task failed: {}", e)))?
            .map_err(|e| EngineError::Internal(format!("hash failed: {}", e)))
    }

    /// Compare a password with a stored hash.
    ///
    /// A malformed stored hash counts as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> EngineResult<bool> {
        let password = Zeroizing::new(password.to_owned());
        let hash = hash.to_owned();

        let outcome = task::spawn_blocking(move || bcrypt::verify(password.as_bytes(), &hash))
            .await
            .map_err(|e| EngineError::Internal(format!("verify task failed: {}", e)))?;

        match outcome {
            Ok(matches) => Ok(matches),
            Err(e) => {
                warn!(error = %e, "Stored password hash is unreadable");
                Ok(false)
            },
        }
    }

    /// Spend the same work as a real comparison when no user matched.
    pub async fn verify_dummy(&self, password: &str) -> EngineResult<()> {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.hash(DUMMY_PASSWORD))
            .await?;
        self.verify(password, dummy).await?;
        Ok(())
    }
}

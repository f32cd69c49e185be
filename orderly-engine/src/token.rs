//! Bearer token issuance and verification.
//!
//! HS256-signed JWTs embedding the user id, signed with a process-wide secret.

use crate::error::{EngineError, EngineResult};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use orderly_domain::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token signing configuration.
#[derive(Clone)]
pub struct TokenConfig {
    /// Signing secret
    pub secret: String,
    /// Lifetime of issued tokens
    pub ttl: Duration,
}

impl TokenConfig {
    /// Default token lifetime (7 days)
    pub const DEFAULT_TTL_DAYS: i64 = 7;

    /// Config with the default lifetime.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::days(Self::DEFAULT_TTL_DAYS),
        }
    }

    /// Override the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Claims stored in the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// Subject user id
    #[serde(rename = "userId")]
    user_id: String,
    /// Issued at (unix seconds)
    iat: i64,
    /// Expiration (unix seconds)
    exp: i64,
}

/// Issues and verifies signed, time-limited bearer tokens.
pub struct TokenIssuer {
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    /// Create an issuer from config.
    pub fn new(config: TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            ttl: config.ttl,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for a user.
    pub fn issue(&self, user_id: UserId) -> EngineResult<String> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| EngineError::Internal("token lifetime out of range".to_string()))?;
        let claims = Claims {
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| EngineError::Internal(format!("token signing failed: {}", e)))
    }

    /// Verify a token and return the embedded user id.
    ///
    /// # Errors
    /// `EngineError::Unauthorized` on expiry, signature mismatch or malformed input.
    pub fn verify(&self, token: &str) -> EngineResult<UserId> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => EngineError::Unauthorized("Token expired".to_string()),
                _ => EngineError::Unauthorized("Invalid token".to_string()),
            }
        })?;

        data.claims
            .user_id
            .parse()
            .map_err(|_| EngineError::Unauthorized("Invalid token".to_string()))
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind as EngineErrorKind;
    use uuid::Uuid;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(TokenConfig::new("test-secret"))
    }

    #[test]
    fn test_roundtrip() {
        let issuer = issuer();
        let user_id = Uuid::now_v7();

        let token = issuer.issue(user_id).unwrap();
        assert_eq!(issuer.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn test_default_ttl_is_seven_days() {
        assert_eq!(issuer().ttl(), Duration::days(7));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new(TokenConfig::new("test-secret").with_ttl(Duration::hours(-1)));
        let token = issuer.issue(Uuid::now_v7()).unwrap();

        let err = issuer.verify(&token).unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::Unauthorized);
        assert_eq!(err.to_string(), "Token expired");
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let other = TokenIssuer::new(TokenConfig::new("other-secret"));
        let token = other.issue(Uuid::now_v7()).unwrap();

        let err = issuer().verify(&token).unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::Unauthorized);
    }

    #[test]
    fn test_altered_signature_rejected() {
        let issuer = issuer();
        let token = issuer.issue(Uuid::now_v7()).unwrap();

        let (body, signature) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = signature.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        let tampered = format!("{}.{}", body, chars.into_iter().collect::<String>());

        assert!(issuer.verify(&tampered).is_err());
    }

    #[test]
    fn test_swapped_payload_rejected() {
        let issuer = issuer();
        let victim = issuer.issue(Uuid::now_v7()).unwrap();
        let attacker = issuer.issue(Uuid::now_v7()).unwrap();

        let victim_parts: Vec<&str> = victim.split('.').collect();
        let attacker_parts: Vec<&str> = attacker.split('.').collect();
        let forged = format!("{}.{}.{}", victim_parts[0], victim_parts[1], attacker_parts[2]);

        assert!(issuer.verify(&forged).is_err());
    }

    #[test]
    fn test_unrepresentable_ttl_is_internal() {
        let ttl = Duration::try_days(100_000_000).unwrap();
        let issuer = TokenIssuer::new(TokenConfig::new("secret").with_ttl(ttl));

        let err = issuer.issue(UserId::now_v7()).unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }

    #[test]
    fn test_malformed_rejected() {
        let issuer = issuer();
        for token in ["", "abc", "a.b.c", "Bearer xyz"] {
            let err = issuer.verify(token).unwrap_err();
            assert_eq!(err.to_string(), "Invalid token");
        }
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let debug = format!("{:?}", TokenConfig::new("super-secret"));
        assert!(!debug.contains("super-secret"));
    }
}

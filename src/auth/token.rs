//! Session token issuing and validation.
//!
//! Tokens are HS256-signed JWTs carrying a numeric `sub` (account id) and an
//! `exp` (unix seconds) claim, nothing else. Any signature, algorithm, or
//! claim problem resolves to [`Error::Unauthenticated`] so the API layer
//! never has to distinguish the failure modes.

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::types::AccountId;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims embedded in every session token
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject -- the account's database id
    sub: i64,
    /// Expiration time (UTC unix timestamp)
    exp: i64,
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct TokenAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expires_in_secs: u64,
}

impl TokenAuth {
    /// Build from the auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            expires_in_secs: config.token_expiry_secs,
        }
    }

    /// Issue a token for the given account
    ///
    /// Returns the signed token and its expiry time.
    pub fn issue(&self, account_id: AccountId) -> Result<(String, DateTime<Utc>)> {
        let expires_at = Utc::now() + chrono::Duration::seconds(self.expires_in_secs as i64);
        let claims = Claims {
            sub: account_id.get(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("failed to sign token: {}", e)))?;

        Ok((token, expires_at))
    }

    /// Resolve a token to the account it was issued for
    ///
    /// Returns the account id and the token's expiry time. Signature
    /// mismatches, non-HS256 algorithms, expired tokens, and malformed
    /// claims all yield [`Error::Unauthenticated`].
    pub fn resolve(&self, token: &str) -> Result<(AccountId, DateTime<Utc>)> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| Error::Unauthenticated(format!("invalid token: {}", e)))?;

        let expires_at = Utc
            .timestamp_opt(data.claims.exp, 0)
            .single()
            .ok_or_else(|| Error::Unauthenticated("invalid exp claim".to_string()))?;

        Ok((AccountId(data.claims.sub), expires_at))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    fn test_auth() -> TokenAuth {
        TokenAuth::new(&AuthConfig {
            jwt_secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            token_expiry_secs: 3600,
            bcrypt_cost: 4,
        })
    }

    #[test]
    fn issue_and_resolve_roundtrip() {
        let auth = test_auth();
        let (token, expires_at) = auth.issue(AccountId(42)).unwrap();

        let (account_id, resolved_expiry) = auth.resolve(&token).unwrap();
        assert_eq!(account_id, AccountId(42));
        assert_eq!(resolved_expiry.timestamp(), expires_at.timestamp());
        assert!(expires_at > Utc::now());
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let auth = test_auth();

        // Craft a token that expired well past the default leeway
        let claims = Claims {
            sub: 1,
            exp: Utc::now().timestamp() - 300,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret-that-is-long-enough-for-hmac"),
        )
        .unwrap();

        let err = auth.resolve(&token).unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)), "got {err:?}");
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let auth = test_auth();
        let other = TokenAuth::new(&AuthConfig {
            jwt_secret: "a-completely-different-secret".to_string(),
            token_expiry_secs: 3600,
            bcrypt_cost: 4,
        });

        let (token, _) = other.issue(AccountId(7)).unwrap();
        assert!(matches!(
            auth.resolve(&token),
            Err(Error::Unauthenticated(_))
        ));
    }

    #[test]
    fn mismatched_algorithm_is_unauthenticated() {
        let auth = test_auth();

        let claims = Claims {
            sub: 7,
            exp: Utc::now().timestamp() + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret-that-is-long-enough-for-hmac"),
        )
        .unwrap();

        assert!(matches!(
            auth.resolve(&token),
            Err(Error::Unauthenticated(_))
        ));
    }

    #[test]
    fn garbage_token_is_unauthenticated() {
        let auth = test_auth();
        assert!(matches!(
            auth.resolve("not.a.jwt"),
            Err(Error::Unauthenticated(_))
        ));
        assert!(matches!(auth.resolve(""), Err(Error::Unauthenticated(_))));
    }
}

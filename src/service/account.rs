//! Account creation and session issuance.

use crate::auth::{hash_password, verify_password, TokenAuth};
use crate::cache::NameCache;
use crate::config::AuthConfig;
use crate::db::{Account, Database};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Accounts and sessions
pub struct AccountService {
    db: Database,
    name_cache: Arc<dyn NameCache>,
    token_auth: TokenAuth,
    bcrypt_cost: u32,
}

impl AccountService {
    /// Wire up the service
    pub fn new(
        db: Database,
        name_cache: Arc<dyn NameCache>,
        token_auth: TokenAuth,
        auth_config: &AuthConfig,
    ) -> Self {
        Self {
            db,
            name_cache,
            token_auth,
            bcrypt_cost: auth_config.bcrypt_cost,
        }
    }

    /// Create an account with a hashed password.
    ///
    /// The name-taken pre-check consults the cache first and falls through to
    /// the database; the database UNIQUE constraint remains the source of
    /// truth, so a racing duplicate still comes back as AlreadyExists.
    pub async fn create_account(&self, account_name: &str, password: &str) -> Result<Account> {
        if account_name.is_empty() {
            return Err(Error::InvalidArgument(
                "account name must not be empty".to_string(),
            ));
        }

        if self.is_account_name_taken(account_name).await? {
            return Err(Error::AlreadyExists(format!(
                "account name {:?} is already taken",
                account_name
            )));
        }

        let hashed_password = hash_password(password, self.bcrypt_cost)?;

        let mut tx = self.db.begin().await?;
        let account_id = self.db.create_account(&mut *tx, account_name).await?;
        self.db
            .create_account_password(&mut *tx, account_id, &hashed_password)
            .await?;
        tx.commit().await?;

        // Best effort: a cache write failure must not fail the create
        if let Err(e) = self.name_cache.add(account_name).await {
            tracing::warn!(
                account_name,
                error = %e,
                "failed to add account name to the taken-names cache"
            );
        }

        tracing::info!(account_id = %account_id, account_name, "account created");

        let account = self
            .db
            .get_account_by_id(self.db.pool(), account_id)
            .await?
            .ok_or_else(|| Error::Internal("freshly created account not found".to_string()))?;
        Ok(account)
    }

    /// Verify credentials and issue a session token.
    ///
    /// Returns the token and its expiry. Unknown names and password
    /// mismatches are indistinguishable to the caller.
    pub async fn create_session(
        &self,
        account_name: &str,
        password: &str,
    ) -> Result<(String, DateTime<Utc>)> {
        let account = self
            .db
            .get_account_by_name(self.db.pool(), account_name)
            .await?
            .ok_or_else(|| {
                Error::Unauthenticated("incorrect account name or password".to_string())
            })?;

        let password_row = self
            .db
            .get_account_password(self.db.pool(), account.id)
            .await?
            .ok_or_else(|| {
                Error::Internal(format!("account {} has no password row", account.id))
            })?;

        if !verify_password(password, &password_row.hashed_password)? {
            return Err(Error::Unauthenticated(
                "incorrect account name or password".to_string(),
            ));
        }

        self.token_auth.issue(account.id)
    }

    /// Cache-first membership check with database fallback.
    async fn is_account_name_taken(&self, account_name: &str) -> Result<bool> {
        match self.name_cache.contains(account_name).await {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    account_name,
                    error = %e,
                    "taken-names cache lookup failed, falling back to the database"
                );
            }
        }

        let account = self
            .db
            .get_account_by_name(self.db.pool(), account_name)
            .await?;
        Ok(account.is_some())
    }
}

//! Account and account password rows.

use crate::error::{DatabaseError, Error, Result};
use crate::types::AccountId;
use sqlx::FromRow;

use super::Database;

/// Account record from database
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    /// Unique account ID
    pub id: AccountId,
    /// Unique account name
    pub account_name: String,
    /// Unix timestamp when the account was created
    pub created_at: i64,
}

/// Password record for an account (1:1)
#[derive(Debug, Clone, FromRow)]
pub struct AccountPassword {
    /// Account this password belongs to
    pub of_account_id: AccountId,
    /// bcrypt hash of the password
    pub hashed_password: String,
}

impl Database {
    /// Insert a new account
    ///
    /// Returns [`Error::AlreadyExists`] when the name is taken; the UNIQUE
    /// constraint is the source of truth, the cache pre-check is only an
    /// optimization.
    pub async fn create_account<'e, E>(&self, executor: E, account_name: &str) -> Result<AccountId>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("INSERT INTO accounts (account_name, created_at) VALUES (?, ?)")
            .bind(account_name)
            .bind(now)
            .execute(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) {
                        return Error::AlreadyExists(format!(
                            "account name {:?} is already taken",
                            account_name
                        ));
                    }
                }
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert account: {}",
                    e
                )))
            })?;

        Ok(AccountId(result.last_insert_rowid()))
    }

    /// Get an account by ID
    pub async fn get_account_by_id<'e, E>(
        &self,
        executor: E,
        id: AccountId,
    ) -> Result<Option<Account>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let row = sqlx::query_as::<_, Account>(
            "SELECT id, account_name, created_at FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get account: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Get an account by name
    pub async fn get_account_by_name<'e, E>(
        &self,
        executor: E,
        account_name: &str,
    ) -> Result<Option<Account>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let row = sqlx::query_as::<_, Account>(
            "SELECT id, account_name, created_at FROM accounts WHERE account_name = ?",
        )
        .bind(account_name)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get account by name: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Insert the password row for a freshly created account
    pub async fn create_account_password<'e, E>(
        &self,
        executor: E,
        of_account_id: AccountId,
        hashed_password: &str,
    ) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query("INSERT INTO account_passwords (of_account_id, hashed_password) VALUES (?, ?)")
            .bind(of_account_id)
            .bind(hashed_password)
            .execute(executor)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert account password: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Get the password row for an account
    pub async fn get_account_password<'e, E>(
        &self,
        executor: E,
        of_account_id: AccountId,
    ) -> Result<Option<AccountPassword>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let row = sqlx::query_as::<_, AccountPassword>(
            "SELECT of_account_id, hashed_password FROM account_passwords WHERE of_account_id = ?",
        )
        .bind(of_account_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get account password: {}",
                e
            )))
        })?;

        Ok(row)
    }
}

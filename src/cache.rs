//! Account-name membership cache.
//!
//! Backs the logical set `fetchd:account.name.set` consulted before the
//! database uniqueness check on account creation. The cache is strictly an
//! optimization: lookups that fail fall through to the database, and write
//! failures after a successful create are logged and swallowed.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Membership set of taken account names
#[async_trait]
pub trait NameCache: Send + Sync {
    /// Whether the name is known to be taken
    async fn contains(&self, name: &str) -> Result<bool>;

    /// Record the name as taken
    async fn add(&self, name: &str) -> Result<()>;
}

/// In-process implementation of [`NameCache`]
#[derive(Default)]
pub struct InMemoryNameCache {
    names: RwLock<HashSet<String>>,
}

impl InMemoryNameCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NameCache for InMemoryNameCache {
    async fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.names.read().await.contains(name))
    }

    async fn add(&self, name: &str) -> Result<()> {
        self.names.write().await.insert(name.to_string());
        Ok(())
    }
}

//! Application state for the API server

use crate::service::{AccountService, TaskService};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// Accounts and sessions
    pub account_service: Arc<AccountService>,

    /// Download task state machine
    pub task_service: Arc<TaskService>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(account_service: Arc<AccountService>, task_service: Arc<TaskService>) -> Self {
        Self {
            account_service,
            task_service,
        }
    }
}

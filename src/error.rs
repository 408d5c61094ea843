//! Error taxonomy shared by the loader, persistence layer and page modules
//!
//! Parse failures are recovered at the storage boundary and never reach the
//! user. Fetch, init and routing failures surface through the loader's
//! `Error` state with a retryable message.

use thiserror::Error;

use crate::router::PageId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Fragment, module or catalog unreachable or non-success status
    #[error("failed to fetch {path}: {reason}")]
    FetchFailure { path: String, reason: String },

    /// Stored document is not valid JSON (or not the expected shape)
    #[error("stored document `{key}` could not be decoded: {reason}")]
    ParseFailure { key: String, reason: String },

    /// A behavior module's init/reinit entry point failed
    #[error("{page} module failed to initialize: {reason}")]
    ModuleInitFailure { page: PageId, reason: String },

    /// Router lookup miss
    #[error("unknown page `{0}`")]
    UnknownPage(String),

    /// Backing store refused a read or write (quota, privacy mode, ...)
    #[error("storage error: {0}")]
    Storage(String),

    /// A user action carried missing or malformed parameters
    #[error("invalid action: {0}")]
    InvalidAction(String),
}

impl AppError {
    pub fn fetch(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::FetchFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::ParseFailure {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn init(page: PageId, reason: impl ToString) -> Self {
        Self::ModuleInitFailure {
            page,
            reason: reason.to_string(),
        }
    }

    pub fn invalid_action(reason: impl Into<String>) -> Self {
        Self::InvalidAction(reason.into())
    }

    /// Message shown in the content area when a navigation fails.
    ///
    /// Every variant is recoverable by navigating again.
    pub fn user_message(&self, requested: &str) -> String {
        match self {
            AppError::UnknownPage(page) => format!("Page \"{page}\" does not exist"),
            _ => format!("Failed to load {requested} page"),
        }
    }
}

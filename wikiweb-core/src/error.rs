//! Error kinds reported by the wiki engine.

use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WikiError {
    #[error("Page '{page}' is locked by {holder}")]
    LockConflict { page: String, holder: String },

    #[error("Web not found: {0}")]
    WebNotFound(String),

    #[error("Page '{page}' not found in web '{web}'")]
    PageNotFound { web: String, page: String },

    #[error("Revision {index} of page '{page}' not found ({count} revisions)")]
    RevisionNotFound {
        page: String,
        index: usize,
        count: usize,
    },

    #[error("A web with address '{0}' already exists")]
    DuplicateAddress(String),

    #[error("Authentication failed")]
    AuthenticationFailure,

    #[error("The wiki has already been set up")]
    AlreadyInitialized,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl WikiError {
    /// True for the web/page/revision lookup failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WikiError::WebNotFound(_)
                | WikiError::PageNotFound { .. }
                | WikiError::RevisionNotFound { .. }
        )
    }
}

pub type Result<T, E = WikiError> = std::result::Result<T, E>;

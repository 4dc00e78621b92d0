use crate::models::object_ref::ObjectRef;
use thiserror::Error;

/// Failures reported by an [`ObjectStore`](crate::services::store::ObjectStore).
///
/// `code` carries the service error code (`AccessDenied`, `NoSuchBucket`,
/// `SlowDown`, ...) when the store returned one.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("listing `{bucket}` under prefix `{prefix}` failed ({}): {message}", code_or_na(.code))]
    List {
        bucket: String,
        prefix: String,
        code: Option<String>,
        message: String,
    },
    #[error("copying {from} to {to} failed ({}): {message}", code_or_na(.code))]
    Copy {
        from: ObjectRef,
        to: ObjectRef,
        code: Option<String>,
        message: String,
    },
    #[error("listing `{bucket}` under prefix `{prefix}` returned the same continuation token twice")]
    StalledPagination { bucket: String, prefix: String },
}

impl StoreError {
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::List { code, .. } | StoreError::Copy { code, .. } => code.as_deref(),
            StoreError::StalledPagination { .. } => None,
        }
    }
}

fn code_or_na(code: &Option<String>) -> &str {
    code.as_deref().unwrap_or("N/A")
}

/// Outcome of a whole rename-copy run.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{failed} of {attempted} copies failed")]
    CopiesFailed { failed: usize, attempted: usize },
}

pub type RenameResult<T> = Result<T, RenameError>;

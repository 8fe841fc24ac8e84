use thiserror::Error;

/// Error taxonomy surfaced by the Controller, spec.md §7. `confab-store`
/// only ever returns the kinds a predicate-on-current-status store can
/// observe; `Forbidden` and HTTP framing live in `apps/api`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

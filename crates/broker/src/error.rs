use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to enqueue task: {0}")]
    Enqueue(String),
    #[error("failed to publish update: {0}")]
    Publish(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, BrokerError>;

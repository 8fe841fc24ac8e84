use thiserror::Error;

/// spec.md §7 `upstream_failure`: surfaced with the dependency name.
#[derive(Debug, Error)]
#[error("upstream failure ({dependency}): {message}")]
pub struct UpstreamError {
    pub dependency: &'static str,
    pub message: String,
}

impl UpstreamError {
    pub fn new(dependency: &'static str, message: impl Into<String>) -> Self {
        Self {
            dependency,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

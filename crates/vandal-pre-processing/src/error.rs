use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScorerError {
    /// Input shape or configuration rejected before any work was done.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("scorer has not been fitted")]
    NotFitted,
}

pub type Result<T> = std::result::Result<T, ScorerError>;

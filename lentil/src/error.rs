//! Errors raised by the training engine.
//!
//! Numeric degeneracies (a zero hyperparameter numerator, a sampling
//! draw lost to rounding, an all-empty M-step) are compensated in place
//! and never show up here.

use thiserror::Error;

/// Whether an error was caught before training or by misuse of the
/// training lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Lifecycle,
}

#[derive(Debug, Error, PartialEq)]
pub enum LdaError {
    #[error("number of topics must be positive, got {0}")]
    InvalidTopicCount(usize),

    #[error("burn-in ({burn_in}) must be smaller than the number of rounds ({num_rounds})")]
    BurnInTooLong { burn_in: usize, num_rounds: usize },

    #[error("sample lag must be positive")]
    InvalidThinning,

    #[error("hyperparameter {name} must be positive and finite, got {value}")]
    InvalidHyperParameter { name: &'static str, value: f64 },

    #[error("dimension mismatch: expected {expected:?}, actual {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("invalid interaction count {value} at ({row}, {col})")]
    InvalidCount { row: usize, col: usize, value: f64 },

    #[error("interaction matrix has no token to sample")]
    EmptyInteractions,

    #[error("training state has not been initialized")]
    NotInitialized,

    #[error("model was already finalized")]
    AlreadyFinalized,

    #[error("model is not finalized; train before predicting")]
    NotFinalized,

    #[error("no statistics were accumulated; burn-in was never completed")]
    NoAccumulatedStatistics,

    #[error("({user}, {item}) is outside the trained model")]
    IndexOutOfRange { user: usize, item: usize },
}

impl LdaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LdaError::InvalidTopicCount(_)
            | LdaError::BurnInTooLong { .. }
            | LdaError::InvalidThinning
            | LdaError::InvalidHyperParameter { .. }
            | LdaError::DimensionMismatch { .. }
            | LdaError::InvalidCount { .. }
            | LdaError::EmptyInteractions => ErrorKind::Configuration,

            LdaError::NotInitialized
            | LdaError::AlreadyFinalized
            | LdaError::NotFinalized
            | LdaError::NoAccumulatedStatistics
            | LdaError::IndexOutOfRange { .. } => ErrorKind::Lifecycle,
        }
    }
}

pub type Result<T> = std::result::Result<T, LdaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(LdaError::InvalidTopicCount(0).kind(), ErrorKind::Configuration);
        assert_eq!(
            LdaError::BurnInTooLong {
                burn_in: 5,
                num_rounds: 5
            }
            .kind(),
            ErrorKind::Configuration
        );
        assert_eq!(LdaError::NotFinalized.kind(), ErrorKind::Lifecycle);
        assert_eq!(LdaError::NoAccumulatedStatistics.kind(), ErrorKind::Lifecycle);
    }
}

//! Error types for lattix-gcn.

use thiserror::Error;

/// lattix-gcn error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Dimension mismatch between two operands.
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// Malformed adjacency structure.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Fail with [`Error::DimensionMismatch`] unless `expected == got`.
pub(crate) fn ensure_dim(context: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            context,
            expected,
            got,
        })
    }
}

//! Typed errors raised by the comparison engine.

use thiserror::Error;

/// Engine-level failure. Validation problems carry the operator-facing reason
/// verbatim; everything else is wrapped so a single comparison never panics.
#[derive(Debug, Error)]
pub enum CompareError {
    /// The configuration failed a precondition check. The message names the
    /// first violated precondition.
    #[error("{0}")]
    InvalidConfig(String),

    /// The host could not read an input. Spreadsheet-specific causes are not
    /// interpreted here.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else. The original cause is folded into the message.
    #[error("An unexpected error occurred during comparison: {0}")]
    Internal(String),
}

impl CompareError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        CompareError::InvalidConfig(reason.into())
    }
}

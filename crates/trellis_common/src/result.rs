//! Common result and error types for the Trellis toolchain.

/// The result type for operations that can only fail on an internal defect.
///
/// `Err` means Trellis itself is inconsistent (for example, two objects
/// resolved to the same structural path), never that the user's design is
/// malformed. User errors are carried by the richer per-crate error types.
pub type TrellisResult<T> = Result<T, InternalError>;

/// An internal consistency error indicating a bug, not a user input problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the violated invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

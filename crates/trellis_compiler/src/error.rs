//! Error type for solver transport and compilation.

use trellis_elaborate::ElabError;

/// Errors raised while talking to the solver or checking its result.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Reading from or writing to the transport failed.
    #[error("compiler I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream does not hold a well-formed frame.
    #[error("malformed frame: {reason}")]
    Framing {
        /// What was wrong with the frame.
        reason: String,
    },

    /// A message could not be encoded.
    #[error("failed to encode message: {reason}")]
    Encode {
        /// The encoder's message.
        reason: String,
    },

    /// A frame payload did not decode as the expected message.
    #[error("failed to decode message: {reason}")]
    Decode {
        /// The decoder's message.
        reason: String,
    },

    /// The solver process could not be started or ended badly.
    #[error("compiler process: {reason}")]
    Process {
        /// Description of the failure.
        reason: String,
    },

    /// Solved values were appended for a path that already has one.
    #[error("duplicate solved value for {path}")]
    DuplicateValue {
        /// The path, rendered.
        path: String,
    },

    /// The solver reported errors and the caller did not opt out.
    #[error("error during compilation:\n{0}")]
    CheckFailed(String),

    /// The design top could not be elaborated.
    #[error(transparent)]
    Elaborate(#[from] ElabError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_display() {
        let err = CompileError::Framing {
            reason: "length overflows".to_string(),
        };
        assert_eq!(err.to_string(), "malformed frame: length overflows");
    }

    #[test]
    fn check_failed_lists_errors_on_new_lines() {
        let err = CompileError::CheckFailed("- Unsolved @ a.b: no value".to_string());
        assert_eq!(
            err.to_string(),
            "error during compilation:\n- Unsolved @ a.b: no value"
        );
    }

    #[test]
    fn io_converts() {
        let err: CompileError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(err, CompileError::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }
}

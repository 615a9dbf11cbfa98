/// Error handling for the shell
///
/// Every command returns `ShellResult<String>`. Errors are rendered back to
/// the user as a single line; internal failures are logged and shown with a
/// generic message.
///
/// # Example
///
/// ```
/// use taskdesk_cli::error::ShellError;
/// use taskdesk_shared::CoreError;
///
/// let err: ShellError = CoreError::NotFound("task not found".to_string()).into();
/// assert_eq!(err.to_string(), "Not found: task not found");
/// ```

use taskdesk_shared::CoreError;

/// Shell result type alias
pub type ShellResult<T> = Result<T, ShellError>;

/// Unified shell error type
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Command not recognized
    #[error("Unknown command '{0}', type 'help' for a list of commands")]
    UnknownCommand(String),

    /// Wrong arguments for a known command
    #[error("Usage: {0}")]
    Usage(&'static str),

    /// Argument could not be resolved (task number, username, category)
    #[error("{0}")]
    BadArgument(String),

    /// Login rejected
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// Error reported by the core library
    #[error(transparent)]
    Core(#[from] ShellCoreError),
}

/// Core errors as the shell presents them
#[derive(Debug, thiserror::Error)]
pub enum ShellCoreError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("An internal error occurred")]
    Internal,
}

/// Convert core errors to shell errors
impl From<CoreError> for ShellError {
    fn from(err: CoreError) -> Self {
        let mapped = match err {
            CoreError::Validation(msg) => ShellCoreError::Validation(msg),
            CoreError::NotFound(msg) => ShellCoreError::NotFound(msg),
            CoreError::Authorization(msg) => ShellCoreError::Forbidden(msg),
            CoreError::Conflict(msg) => ShellCoreError::Conflict(msg),
            other => {
                // Log internal errors but don't show details to the user
                tracing::error!(error = %other, "Internal error");
                ShellCoreError::Internal
            }
        };
        ShellError::Core(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShellError::Usage("done <n>");
        assert_eq!(err.to_string(), "Usage: done <n>");

        let err: ShellError = CoreError::Conflict("cannot delete own account".to_string()).into();
        assert_eq!(err.to_string(), "Conflict: cannot delete own account");
    }

    #[test]
    fn test_internal_details_hidden() {
        let err: ShellError = CoreError::Internal("lock poisoned".to_string()).into();
        assert_eq!(err.to_string(), "An internal error occurred");
    }
}

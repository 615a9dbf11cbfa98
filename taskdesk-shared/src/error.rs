/// Common error type for the TaskDesk core
///
/// Every fallible operation exposed by the services and query engines returns
/// `CoreResult<T>`. Component errors (password, authorization, store,
/// validation) are folded into one of the variants below so callers only need
/// to match a single taxonomy.
///
/// # Taxonomy
///
/// - `Validation`: bad input shape (blank title, short password, invalid email).
///   Always recoverable; the message is meant to be shown to the user verbatim.
/// - `NotFound`: a referenced id does not exist.
/// - `Authorization`: a role-gated action attempted by an insufficiently
///   privileged actor. Never silently turned into a no-op.
/// - `Conflict`: duplicate username/email, or a delete that would leave
///   dangling references.
/// - `Store`: the persistence collaborator failed. Not retried by the core.
/// - `Internal`: a failure inside the core itself (e.g. the hasher rejected
///   its parameters).
///
/// # Example
///
/// ```
/// use taskdesk_shared::error::CoreError;
///
/// let err = CoreError::Conflict("cannot delete own account".to_string());
/// assert!(err.is_recoverable());
/// assert_eq!(err.message(), "cannot delete own account");
/// ```

use crate::auth::authorization::AuthzError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Result type alias used throughout the core
pub type CoreResult<T> = Result<T, CoreError>;

/// Unified core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor lacks the privilege for this action
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Operation conflicts with existing data
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Persistence collaborator failed
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Unexpected failure inside the core
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns the bare message without the category prefix
    pub fn message(&self) -> String {
        match self {
            CoreError::Validation(msg)
            | CoreError::NotFound(msg)
            | CoreError::Authorization(msg)
            | CoreError::Conflict(msg)
            | CoreError::Internal(msg) => msg.clone(),
            CoreError::Store(err) => err.to_string(),
        }
    }

    /// Whether the caller can fix the problem and try again
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CoreError::Store(_) | CoreError::Internal(_))
    }
}

/// Convert store errors, lifting duplicates and missing rows into the
/// recoverable categories
impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field, value } => {
                CoreError::Conflict(format!("{} '{}' is already taken", field, value))
            }
            StoreError::NotFound(what) => CoreError::NotFound(what),
            other => CoreError::Store(other),
        }
    }
}

/// Convert password errors
impl From<PasswordError> for CoreError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::InvalidInput(_)
            | PasswordError::TooShort { .. }
            | PasswordError::TooWeak => CoreError::Validation(err.to_string()),
            PasswordError::HashError(msg) => {
                CoreError::Internal(format!("Password operation failed: {}", msg))
            }
            PasswordError::InvalidEncoding(msg) => {
                CoreError::Internal(format!("Stored credential is corrupt: {}", msg))
            }
        }
    }
}

/// Convert authorization errors
impl From<AuthzError> for CoreError {
    fn from(err: AuthzError) -> Self {
        CoreError::Authorization(err.to_string())
    }
}

/// Convert field validation errors into a single readable message
///
/// Messages are sorted by field name so the output is stable.
impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "is invalid".to_string());
                    format!("{}: {}", field, message)
                })
            })
            .collect();
        details.sort();

        CoreError::Validation(details.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::Validation("title must be at least 5 characters".to_string());
        assert_eq!(
            err.to_string(),
            "Validation failed: title must be at least 5 characters"
        );

        let err = CoreError::NotFound("task not found".to_string());
        assert_eq!(err.to_string(), "Not found: task not found");
    }

    #[test]
    fn test_duplicate_store_error_becomes_conflict() {
        let err: CoreError = StoreError::Duplicate {
            field: "username",
            value: "admin".to_string(),
        }
        .into();

        assert!(matches!(err, CoreError::Conflict(_)));
        assert!(err.message().contains("admin"));
    }

    #[test]
    fn test_closed_store_is_not_recoverable() {
        let err: CoreError = StoreError::Closed.into();
        assert!(matches!(err, CoreError::Store(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_password_errors_are_validation() {
        let err: CoreError = PasswordError::TooWeak.into();
        assert!(matches!(err, CoreError::Validation(_)));

        let err: CoreError = PasswordError::HashError("bad params".to_string()).into();
        assert!(matches!(err, CoreError::Internal(_)));
    }
}

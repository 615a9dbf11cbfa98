/// Authorization helpers and permission checks
///
/// TaskDesk has a flat, two-role permission model:
///
/// 1. **Authentication**: most operations need a current user
/// 2. **Role**: `Admin` manages users and sees every task, `Member` does not
/// 3. **Ownership**: a Member may only touch tasks they created or were
///    assigned, and only their own profile
///
/// Checks return `AuthzError` so callers can surface the reason; they never
/// silently downgrade a forbidden action into a no-op.
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::authorization::{require_admin, AuthzError};
/// use taskdesk_shared::models::user::{Credential, Role, User};
///
/// let member = User::new(
///     "jdoe",
///     "jdoe@example.com",
///     Credential::new("00", "11"),
///     "John",
///     "Doe",
///     Role::Member,
/// );
///
/// assert!(matches!(require_admin(&member), Err(AuthzError::InsufficientRole { .. })));
/// ```

use crate::models::task::Task;
use crate::models::user::{Role, User, UserId};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// No user is logged in
    #[error("Authentication required")]
    Unauthenticated,

    /// User doesn't have required role
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole { required: Role, actual: Role },

    /// User doesn't own the resource
    #[error("Not authorized to access this resource")]
    NotAuthorized,
}

/// Checks that the actor is an administrator
pub fn require_admin(actor: &User) -> Result<(), AuthzError> {
    if actor.role.can_manage_users() {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole {
            required: Role::Admin,
            actual: actor.role,
        })
    }
}

/// Checks that the actor is `target` or an administrator
pub fn require_self_or_admin(actor: &User, target: UserId) -> Result<(), AuthzError> {
    if actor.id == target {
        return Ok(());
    }

    match actor.role {
        Role::Admin => Ok(()),
        Role::Member => Err(AuthzError::NotAuthorized),
    }
}

/// Whether the actor may see and mutate `task`
///
/// Admins may touch every task; Members only those they created or were
/// assigned.
pub fn can_modify_task(actor: &User, task: &Task) -> bool {
    actor.role.can_view_all_tasks() || task.involves(actor.id)
}

/// Checks that the actor may see and mutate `task`
pub fn require_task_access(actor: &User, task: &Task) -> Result<(), AuthzError> {
    if can_modify_task(actor, task) {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}

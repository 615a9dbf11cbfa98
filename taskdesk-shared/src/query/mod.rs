/// Reactive, role-scoped query engines
///
/// Every query is implicitly parameterized by the authenticated identity:
/// the engines subscribe to [`AuthService`](crate::auth::service::AuthService)
/// and re-scope their live output the moment the identity changes.
///
/// # Modules
///
/// - [`tasks`]: live task lists (scope, filter, debounced search), task
///   mutations, task details
/// - [`statistics`]: periodically recomputed completion statistics
/// - [`users`]: live roster with free-text search, role-gated user mutations
/// - [`debounce`]: timer-reset debouncing used by the search input

pub mod debounce;
pub mod statistics;
pub mod tasks;
pub mod users;

use crate::auth::service::AuthState;
use crate::store::TaskScope;

pub use statistics::{StatisticsFeed, TaskStatistics};
pub use tasks::{TaskDetails, TaskFeed, TaskFeedControls, TaskQueryEngine};
pub use users::{UserFeed, UserFeedControls, UserQueryEngine};

/// The set of tasks the given identity may see
pub fn scope_for(state: &AuthState) -> TaskScope {
    match state {
        AuthState::Anonymous => TaskScope::Nothing,
        AuthState::Authenticated(user) if user.role.can_view_all_tasks() => TaskScope::Everything,
        AuthState::Authenticated(user) => TaskScope::Personal(user.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{Credential, Role, User};

    #[test]
    fn test_scope_for() {
        assert_eq!(scope_for(&AuthState::Anonymous), TaskScope::Nothing);

        let admin = User::new(
            "root",
            "root@example.com",
            Credential::new("00", "11"),
            "Root",
            "Admin",
            Role::Admin,
        );
        assert_eq!(
            scope_for(&AuthState::Authenticated(admin)),
            TaskScope::Everything
        );

        let member = User::new(
            "jdoe",
            "jdoe@example.com",
            Credential::new("00", "11"),
            "John",
            "Doe",
            Role::Member,
        );
        let id = member.id;
        assert_eq!(
            scope_for(&AuthState::Authenticated(member)),
            TaskScope::Personal(id)
        );
    }
}

/// Data models for TaskDesk
///
/// # Models
///
/// - `user`: accounts, roles and credentials
/// - `task`: tasks, priorities and task input
/// - `category`: category reference data
///
/// # Example
///
/// ```
/// use taskdesk_shared::models::category::default_categories;
/// use taskdesk_shared::models::user::Role;
///
/// assert_eq!(default_categories().len(), 4);
/// assert!(Role::Admin.can_view_all_tasks());
/// ```

pub mod category;
pub mod task;
pub mod user;

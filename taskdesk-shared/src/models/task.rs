/// Task model and input types
///
/// A task belongs to a category, is created by exactly one user and may be
/// assigned to another. Completion and "overdue" are independent facts:
/// a completed task whose due date has passed is both completed and overdue,
/// and the UI decides how to render that.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use taskdesk_shared::models::category::CategoryId;
/// use taskdesk_shared::models::task::{NewTask, Priority, Task};
/// use taskdesk_shared::models::user::UserId;
///
/// let creator = UserId::new();
/// let task = Task::new(
///     NewTask {
///         title: "Prepare quarterly report".to_string(),
///         description: None,
///         priority: Priority::High,
///         due_date: Some(Utc::now() + Duration::days(3)),
///         category_id: CategoryId::new(),
///         assigned_to: Some(creator),
///     },
///     creator,
/// );
///
/// assert!(task.involves(creator));
/// assert!(!task.is_overdue(Utc::now()));
/// ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategoryId;
use super::user::UserId;

/// Minimum length of a task title after trimming
pub const MIN_TITLE_LENGTH: usize = 5;

/// Unique task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        TaskId(Uuid::new_v4())
    }

    /// Parses the textual UUID form
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(TaskId)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Converts priority to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Parses a priority name (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID
    pub id: TaskId,

    /// Short title (at least 5 characters once trimmed)
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Priority
    pub priority: Priority,

    /// Optional deadline
    pub due_date: Option<DateTime<Utc>>,

    /// Whether the task is done
    pub is_completed: bool,

    /// Category this task belongs to
    pub category_id: CategoryId,

    /// User responsible for the task, if any
    pub assigned_to: Option<UserId>,

    /// User who created the task
    pub created_by: UserId,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a new, incomplete task with a fresh id and timestamps
    pub fn new(data: NewTask, created_by: UserId) -> Self {
        let now = Utc::now();
        Task {
            id: TaskId::new(),
            title: data.title,
            description: data.description,
            priority: data.priority,
            due_date: data.due_date,
            is_completed: false,
            category_id: data.category_id,
            assigned_to: data.assigned_to,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// True if `user` created the task or is assigned to it
    pub fn involves(&self, user: UserId) -> bool {
        self.created_by == user || self.assigned_to == Some(user)
    }

    /// True if the due date lies before `now`, regardless of completion
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_some_and(|due| due < now)
    }

    /// Case-insensitive substring match over title and description
    ///
    /// `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

/// Input for creating a task
///
/// The creator is never part of the input; it is resolved from the
/// authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    /// Title
    pub title: String,

    /// Optional description (blank is stored as None)
    pub description: Option<String>,

    /// Priority
    pub priority: Priority,

    /// Optional deadline, must not be in the past
    pub due_date: Option<DateTime<Utc>>,

    /// Category
    pub category_id: CategoryId,

    /// Assignee (forced to the actor for non-admins)
    pub assigned_to: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(due_date: Option<DateTime<Utc>>) -> Task {
        Task::new(
            NewTask {
                title: "Write release notes".to_string(),
                description: Some("Cover the New Search feature".to_string()),
                priority: Priority::Medium,
                due_date,
                category_id: CategoryId::new(),
                assigned_to: None,
            },
            UserId::new(),
        )
    }

    #[test]
    fn test_priority_parse_roundtrip() {
        for priority in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::parse(priority.as_str()), Some(priority));
        }
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn test_priority_serialization() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn test_overdue_is_independent_of_completion() {
        let now = Utc::now();
        let mut task = sample(Some(now - Duration::hours(1)));
        assert!(task.is_overdue(now));

        task.is_completed = true;
        assert!(task.is_overdue(now));

        let task = sample(None);
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn test_involves() {
        let mut task = sample(None);
        let assignee = UserId::new();
        assert!(task.involves(task.created_by));
        assert!(!task.involves(assignee));

        task.assigned_to = Some(assignee);
        assert!(task.involves(assignee));
    }

    #[test]
    fn test_matches_search() {
        let task = sample(None);
        assert!(task.matches_search("release"));
        assert!(task.matches_search("new search"));
        assert!(!task.matches_search("budget"));
    }

    #[test]
    fn test_task_id_parse() {
        let id = TaskId::new();
        assert_eq!(TaskId::parse(&id.to_string()), Some(id));
        assert_eq!(TaskId::parse("nope"), None);
    }
}

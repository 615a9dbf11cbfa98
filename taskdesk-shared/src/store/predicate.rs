/// Task query predicates
///
/// A task query is always evaluated in the same order: visibility scope,
/// then status filter, then free-text search. `TaskPredicate` bundles the
/// three so a store can evaluate them in one pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::task::{Priority, Task};
use crate::models::user::UserId;

/// Which tasks an identity may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// Every task (administrators)
    Everything,

    /// Tasks created by or assigned to this user
    Personal(UserId),

    /// No tasks at all (nobody logged in)
    Nothing,
}

impl TaskScope {
    pub fn includes(&self, task: &Task) -> bool {
        match self {
            TaskScope::Everything => true,
            TaskScope::Personal(user) => task.involves(*user),
            TaskScope::Nothing => false,
        }
    }
}

/// Status filter selected by the observer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    Completed,
    Pending,
    HighPriority,
}

impl TaskFilter {
    /// Converts filter to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Completed => "completed",
            TaskFilter::Pending => "pending",
            TaskFilter::HighPriority => "high_priority",
        }
    }

    /// Parses a filter name; `high` and `high-priority` are accepted too
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(TaskFilter::All),
            "completed" | "done" => Some(TaskFilter::Completed),
            "pending" | "open" => Some(TaskFilter::Pending),
            "high_priority" | "high-priority" | "high" => Some(TaskFilter::HighPriority),
            _ => None,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Completed => task.is_completed,
            TaskFilter::Pending => !task.is_completed,
            TaskFilter::HighPriority => task.priority == Priority::High,
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope, filter and optional search needle evaluated together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPredicate {
    pub scope: TaskScope,
    pub filter: TaskFilter,

    /// Lowercased, trimmed search text; `None` when blank
    pub search: Option<String>,
}

impl TaskPredicate {
    /// Builds a predicate, normalizing the search text
    ///
    /// Blank search text means "no search".
    pub fn new(scope: TaskScope, filter: TaskFilter, search: &str) -> Self {
        let needle = normalize_search(search);
        TaskPredicate {
            scope,
            filter,
            search: if needle.is_empty() { None } else { Some(needle) },
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.scope.includes(task)
            && self.filter.matches(task)
            && self
                .search
                .as_deref()
                .map_or(true, |needle| task.matches_search(needle))
    }
}

/// Trims and lowercases free-text search input
pub fn normalize_search(text: &str) -> String {
    text.trim().to_lowercase()
}

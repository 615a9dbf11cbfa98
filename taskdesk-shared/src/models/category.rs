/// Category reference data
///
/// Categories are created once (seeded) and never edited by the core; tasks
/// only reference them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique category identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub Uuid);

impl CategoryId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        CategoryId(Uuid::new_v4())
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Task category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique category ID
    pub id: CategoryId,

    /// Display name
    pub name: String,

    /// Colour tag, `#RRGGBB`
    pub color: String,

    /// When the category was created
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Builds a category with a fresh id
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Category {
            id: CategoryId::new(),
            name: name.into(),
            color: color.into(),
            created_at: Utc::now(),
        }
    }
}

/// Categories every fresh installation starts with
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("Work", "#2196F3"),
        Category::new("Personal", "#4CAF50"),
        Category::new("Urgent", "#F44336"),
        Category::new("Planning", "#FFEB3B"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories_are_distinct() {
        let categories = default_categories();
        assert_eq!(categories.len(), 4);

        let mut ids: Vec<_> = categories.iter().map(|c| c.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert!(categories.iter().all(|c| c.color.starts_with('#')));
    }
}

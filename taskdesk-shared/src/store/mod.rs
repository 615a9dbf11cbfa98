/// Persistence contracts and live sequences
///
/// The core never owns a storage engine. It talks to three repositories
/// through the traits below and receives them as `Arc<dyn ...>` handles from
/// the composition root:
///
/// - [`UserStore`]: user CRUD plus live roster sequences
/// - [`TaskStore`]: task CRUD, narrow completion updates, predicate queries
/// - [`CategoryStore`]: category reference data
///
/// Reads that need to stay current return a [`LiveSeq`], a multicast
/// replay-latest view backed by `tokio::sync::watch`. A new subscriber sees
/// the current contents immediately and every later write.
///
/// [`memory`] provides in-process implementations.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskdesk_shared::store::memory::MemoryTaskStore;
/// use taskdesk_shared::store::TaskStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
/// let mut live = store.all();
/// assert!(live.snapshot().is_empty());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod predicate;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use crate::models::category::{Category, CategoryId};
use crate::models::task::{Task, TaskId};
use crate::models::user::{Role, User, UserId};

pub use predicate::{TaskFilter, TaskPredicate, TaskScope};

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint violated
    #[error("Duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    /// Row to update or delete does not exist
    #[error("{0}")]
    NotFound(String),

    /// The store has shut down and no longer publishes changes
    #[error("Store closed")]
    Closed,

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Predicate over rows, usable across threads
pub type RowPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A live, replay-latest view over a store table
///
/// Every clone is an independent subscriber. `snapshot` returns the current
/// rows that pass the view's predicate; `changed` waits for the next write to
/// the underlying table.
pub struct LiveSeq<T> {
    rx: watch::Receiver<Vec<T>>,
    keep: RowPredicate<T>,
}

impl<T: Clone> LiveSeq<T> {
    /// A view over every row
    pub fn new(rx: watch::Receiver<Vec<T>>) -> Self {
        LiveSeq {
            rx,
            keep: Arc::new(|_: &T| true),
        }
    }

    /// A view over the rows matching `keep`
    pub fn filtered(
        rx: watch::Receiver<Vec<T>>,
        keep: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        LiveSeq {
            rx,
            keep: Arc::new(keep),
        }
    }

    /// Current matching rows; marks the current version as seen
    pub fn snapshot(&mut self) -> Vec<T> {
        let rows = self.rx.borrow_and_update();
        let matching = rows
            .iter()
            .filter(|row| self.keep.as_ref()(*row))
            .cloned()
            .collect();
        matching
    }

    /// Waits until the underlying table is written again
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Closed` once the store is dropped.
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        self.rx.changed().await.map_err(|_| StoreError::Closed)
    }

    /// Waits for the next write and returns the new matching rows
    pub async fn next(&mut self) -> Result<Vec<T>, StoreError> {
        self.changed().await?;
        Ok(self.snapshot())
    }
}

impl<T> Clone for LiveSeq<T> {
    fn clone(&self) -> Self {
        LiveSeq {
            rx: self.rx.clone(),
            keep: Arc::clone(&self.keep),
        }
    }
}

impl<T> fmt::Debug for LiveSeq<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSeq").finish_non_exhaustive()
    }
}

/// User repository
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; fails with `Duplicate` on a taken username or email
    async fn insert(&self, user: User) -> Result<UserId, StoreError>;

    /// Replaces a user; uniqueness is re-checked against other rows
    async fn update(&self, user: User) -> Result<(), StoreError>;

    /// Removes a user; returns whether a row was removed
    async fn delete(&self, id: UserId) -> Result<bool, StoreError>;

    async fn by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Exact, case-sensitive username lookup
    async fn by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Exact, case-sensitive email lookup
    async fn by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Every user, oldest first
    fn all(&self) -> LiveSeq<User>;

    /// Users holding `role`, oldest first
    fn by_role(&self, role: Role) -> LiveSeq<User>;
}

/// Task repository
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: Task) -> Result<TaskId, StoreError>;

    async fn update(&self, task: Task) -> Result<(), StoreError>;

    /// Sets only the completion flag (and `updated_at`)
    async fn update_completion(&self, id: TaskId, completed: bool) -> Result<(), StoreError>;

    /// Removes a task; returns whether a row was removed
    async fn delete(&self, id: TaskId) -> Result<bool, StoreError>;

    async fn by_id(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Every task, newest first, ties by id ascending
    fn all(&self) -> LiveSeq<Task>;

    /// Tasks matching `predicate`, in the same order as `all`
    fn by_predicate(&self, predicate: TaskPredicate) -> LiveSeq<Task>;

    /// Number of tasks matching `predicate`
    async fn count_where(
        &self,
        predicate: &(dyn for<'a> Fn(&'a Task) -> bool + Send + Sync),
    ) -> Result<usize, StoreError>;

    /// Serializes writes that add user references to tasks with user deletion
    ///
    /// Task creation and editing hold it from the assignee check to the
    /// write; user deletion holds it from the reference count to the delete.
    fn reference_lock(&self) -> &Mutex<()>;
}

/// Category repository
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert(&self, category: Category) -> Result<CategoryId, StoreError>;

    async fn by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    /// Every category, in insertion order
    async fn all(&self) -> Result<Vec<Category>, StoreError>;
}

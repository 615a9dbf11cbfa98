/// In-memory repositories
///
/// Each table is a `Vec` held inside a `tokio::sync::watch` channel. Writes go
/// through `send_if_modified`, so a write is atomic with respect to every
/// reader and live views are only woken when a row actually changed.
/// Uniqueness checks run inside the same closure as the write, so two
/// concurrent inserts can never both pass.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{watch, Mutex, RwLock};

use super::{CategoryStore, LiveSeq, StoreError, TaskPredicate, TaskStore, UserStore};
use crate::models::category::{default_categories, Category, CategoryId};
use crate::models::task::{Task, TaskId};
use crate::models::user::{Role, User, UserId};

/// Returns the uniqueness violation `candidate` would cause, if any
fn user_conflict(users: &[User], candidate: &User) -> Option<StoreError> {
    for existing in users.iter().filter(|u| u.id != candidate.id) {
        if existing.username == candidate.username {
            return Some(StoreError::Duplicate {
                field: "username",
                value: candidate.username.clone(),
            });
        }
        if existing.email == candidate.email {
            return Some(StoreError::Duplicate {
                field: "email",
                value: candidate.email.clone(),
            });
        }
    }
    None
}

/// Newest first, ties broken by id ascending
fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

/// User table
pub struct MemoryUserStore {
    users: watch::Sender<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        let (users, _) = watch::channel(Vec::new());
        MemoryUserStore { users }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: User) -> Result<UserId, StoreError> {
        let id = user.id;
        let mut outcome = Ok(id);

        self.users.send_if_modified(|users| {
            if users.iter().any(|u| u.id == id) {
                outcome = Err(StoreError::Duplicate {
                    field: "id",
                    value: id.to_string(),
                });
                return false;
            }
            if let Some(err) = user_conflict(users, &user) {
                outcome = Err(err);
                return false;
            }
            users.push(user);
            true
        });

        outcome
    }

    async fn update(&self, user: User) -> Result<(), StoreError> {
        let mut outcome = Ok(());

        self.users.send_if_modified(|users| {
            if let Some(err) = user_conflict(users, &user) {
                outcome = Err(err);
                return false;
            }
            match users.iter_mut().find(|u| u.id == user.id) {
                Some(slot) => {
                    *slot = user;
                    true
                }
                None => {
                    outcome = Err(StoreError::NotFound("user not found".to_string()));
                    false
                }
            }
        });

        outcome
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(self.users.send_if_modified(|users| {
            let before = users.len();
            users.retain(|u| u.id != id);
            users.len() != before
        }))
    }

    async fn by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let users = self.users.borrow();
        let found = users.iter().find(|u| u.id == id).cloned();
        Ok(found)
    }

    async fn by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.borrow();
        let found = users.iter().find(|u| u.username == username).cloned();
        Ok(found)
    }

    async fn by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.borrow();
        let found = users.iter().find(|u| u.email == email).cloned();
        Ok(found)
    }

    fn all(&self) -> LiveSeq<User> {
        LiveSeq::new(self.users.subscribe())
    }

    fn by_role(&self, role: Role) -> LiveSeq<User> {
        LiveSeq::filtered(self.users.subscribe(), move |u: &User| u.role == role)
    }
}

/// Task table
pub struct MemoryTaskStore {
    tasks: watch::Sender<Vec<Task>>,
    references: Mutex<()>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        let (tasks, _) = watch::channel(Vec::new());
        MemoryTaskStore {
            tasks,
            references: Mutex::new(()),
        }
    }
}

impl Default for MemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, task: Task) -> Result<TaskId, StoreError> {
        let id = task.id;
        let mut outcome = Ok(id);

        self.tasks.send_if_modified(|tasks| {
            if tasks.iter().any(|t| t.id == id) {
                outcome = Err(StoreError::Duplicate {
                    field: "id",
                    value: id.to_string(),
                });
                return false;
            }
            tasks.push(task);
            sort_tasks(tasks);
            true
        });

        outcome
    }

    async fn update(&self, task: Task) -> Result<(), StoreError> {
        let mut outcome = Ok(());

        self.tasks.send_if_modified(|tasks| {
            match tasks.iter_mut().find(|t| t.id == task.id) {
                Some(slot) => {
                    *slot = task;
                    sort_tasks(tasks);
                    true
                }
                None => {
                    outcome = Err(StoreError::NotFound("task not found".to_string()));
                    false
                }
            }
        });

        outcome
    }

    async fn update_completion(&self, id: TaskId, completed: bool) -> Result<(), StoreError> {
        let mut outcome = Ok(());

        self.tasks.send_if_modified(|tasks| {
            match tasks.iter_mut().find(|t| t.id == id) {
                Some(task) if task.is_completed == completed => false,
                Some(task) => {
                    task.is_completed = completed;
                    task.updated_at = Utc::now();
                    true
                }
                None => {
                    outcome = Err(StoreError::NotFound("task not found".to_string()));
                    false
                }
            }
        });

        outcome
    }

    async fn delete(&self, id: TaskId) -> Result<bool, StoreError> {
        Ok(self.tasks.send_if_modified(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| t.id != id);
            tasks.len() != before
        }))
    }

    async fn by_id(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let tasks = self.tasks.borrow();
        let found = tasks.iter().find(|t| t.id == id).cloned();
        Ok(found)
    }

    fn all(&self) -> LiveSeq<Task> {
        LiveSeq::new(self.tasks.subscribe())
    }

    fn by_predicate(&self, predicate: TaskPredicate) -> LiveSeq<Task> {
        LiveSeq::filtered(self.tasks.subscribe(), move |t: &Task| predicate.matches(t))
    }

    async fn count_where(
        &self,
        predicate: &(dyn for<'a> Fn(&'a Task) -> bool + Send + Sync),
    ) -> Result<usize, StoreError> {
        let tasks = self.tasks.borrow();
        let count = tasks.iter().filter(|task| predicate(*task)).count();
        Ok(count)
    }

    fn reference_lock(&self) -> &Mutex<()> {
        &self.references
    }
}

/// Category table
#[derive(Default)]
pub struct MemoryCategoryStore {
    categories: RwLock<Vec<Category>>,
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with the default categories
    pub fn with_defaults() -> Self {
        MemoryCategoryStore {
            categories: RwLock::new(default_categories()),
        }
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn insert(&self, category: Category) -> Result<CategoryId, StoreError> {
        let mut categories = self.categories.write().await;
        if categories.iter().any(|c| c.id == category.id) {
            return Err(StoreError::Duplicate {
                field: "id",
                value: category.id.to_string(),
            });
        }
        let id = category.id;
        categories.push(category);
        Ok(id)
    }

    async fn by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let categories = self.categories.read().await;
        Ok(categories.iter().find(|c| c.id == id).cloned())
    }

    async fn all(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.categories.read().await.clone())
    }
}

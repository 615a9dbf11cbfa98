/// User query engine
///
/// A live roster with free-text search over full name, email, username,
/// first and last name. Any authenticated user may see the roster; anonymous
/// observers see an empty list. Mutations are role-gated:
///
/// - creating, deleting, (de)activating users and changing roles: admin only
/// - editing profile fields: the user themselves or an admin
///
/// Deletion never orphans tasks. A user still referenced as a task's creator
/// or assignee cannot be deleted, and nobody can delete their own account.

use std::sync::Arc;

use tokio::sync::watch;
use validator::Validate;

use crate::auth::authorization::{require_admin, require_self_or_admin};
use crate::auth::service::{AuthService, AuthState};
use crate::error::{CoreError, CoreResult};
use crate::models::task::Task;
use crate::models::user::{NewUser, Role, UpdateUser, User, UserId};
use crate::store::predicate::normalize_search;
use crate::store::{LiveSeq, TaskStore, UserStore};

/// Roster queries and user administration
pub struct UserQueryEngine {
    auth: Arc<AuthService>,
    users: Arc<dyn UserStore>,
    tasks: Arc<dyn TaskStore>,
}

impl UserQueryEngine {
    pub fn new(
        auth: Arc<AuthService>,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
    ) -> Self {
        UserQueryEngine { auth, users, tasks }
    }

    /// Live list of every user
    pub fn watch_users(&self) -> UserFeed {
        self.feed(self.users.all())
    }

    /// Live list of the users holding `role`
    pub fn watch_role(&self, role: Role) -> UserFeed {
        self.feed(self.users.by_role(role))
    }

    fn feed(&self, source: LiveSeq<User>) -> UserFeed {
        let (search_tx, search_rx) = watch::channel(String::new());
        UserFeed {
            auth_rx: self.auth.subscribe(),
            session_ends: self.auth.session_ends(),
            search_rx,
            controls: UserFeedControls {
                search: Arc::new(search_tx),
            },
            source,
            last: None,
            rescope: false,
        }
    }

    /// One-shot roster filtered by `search`
    pub fn list_users(&self, search: &str) -> Vec<User> {
        if !self.auth.state().is_authenticated() {
            return Vec::new();
        }
        let needle = normalize_search(search);
        self.users
            .all()
            .snapshot()
            .into_iter()
            .filter(|u| needle.is_empty() || u.matches_search(&needle))
            .collect()
    }

    /// Looks up one user; requires a logged-in actor
    pub async fn user(&self, user_id: UserId) -> CoreResult<User> {
        self.auth.actor()?;
        self.users
            .by_id(user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("user not found".to_string()))
    }

    /// Creates a user; admin only
    pub async fn create_user(&self, fields: NewUser, password: &str) -> CoreResult<UserId> {
        let actor = self.auth.actor()?;
        require_admin(&actor)?;
        self.auth.register(fields, password).await
    }

    /// Updates profile fields; a member may only update themselves
    pub async fn update_user(&self, user_id: UserId, changes: UpdateUser) -> CoreResult<User> {
        let actor = self.auth.actor()?;
        require_self_or_admin(&actor, user_id)?;

        let changes = changes.normalized();
        changes.validate()?;

        let mut user = self.existing(user_id).await?;
        if changes.is_empty() {
            return Ok(user);
        }
        changes.apply_to(&mut user);
        self.users.update(user.clone()).await?;

        tracing::info!(user_id = %user_id, actor_id = %actor.id, "User profile updated");
        self.refresh_if_current(&actor, user_id).await?;
        Ok(user)
    }

    /// Changes a user's role; admin only
    ///
    /// An admin cannot demote themselves, so the roster always keeps the
    /// acting administrator.
    pub async fn set_role(&self, user_id: UserId, role: Role) -> CoreResult<()> {
        let actor = self.auth.actor()?;
        require_admin(&actor)?;
        if actor.id == user_id && role != actor.role {
            return Err(CoreError::Conflict(
                "cannot change own role".to_string(),
            ));
        }

        let mut user = self.existing(user_id).await?;
        if user.role == role {
            return Ok(());
        }
        user.role = role;
        user.updated_at = chrono::Utc::now();
        self.users.update(user).await?;

        tracing::info!(user_id = %user_id, actor_id = %actor.id, role = %role, "User role changed");
        Ok(())
    }

    /// Activates or deactivates an account; admin only
    ///
    /// A deactivated user can no longer log in, and a persisted session for
    /// them falls back to anonymous on its next resolution.
    pub async fn set_active(&self, user_id: UserId, active: bool) -> CoreResult<()> {
        let actor = self.auth.actor()?;
        require_admin(&actor)?;
        if actor.id == user_id && !active {
            return Err(CoreError::Conflict(
                "cannot deactivate own account".to_string(),
            ));
        }

        let mut user = self.existing(user_id).await?;
        if user.is_active == active {
            return Ok(());
        }
        user.is_active = active;
        user.updated_at = chrono::Utc::now();
        self.users.update(user).await?;

        tracing::info!(user_id = %user_id, actor_id = %actor.id, active, "User status changed");
        Ok(())
    }

    /// Deletes a user; admin only
    ///
    /// # Errors
    ///
    /// - `Conflict("cannot delete own account")` for a self-delete
    /// - `Conflict` if any task was created by or is assigned to the user
    /// - `NotFound` for an unknown user
    pub async fn delete_user(&self, user_id: UserId) -> CoreResult<()> {
        let actor = self.auth.actor()?;
        if actor.id == user_id {
            return Err(CoreError::Conflict("cannot delete own account".to_string()));
        }
        require_admin(&actor)?;

        // Held until the row is gone so no task can start referencing the
        // user between the counts and the delete.
        let _references = self.tasks.reference_lock().lock().await;
        self.existing(user_id).await?;

        let created = self
            .tasks
            .count_where(&|t: &Task| t.created_by == user_id)
            .await?;
        if created > 0 {
            return Err(CoreError::Conflict(format!(
                "user created {} task(s); delete or reassign them first",
                created
            )));
        }

        let assigned = self
            .tasks
            .count_where(&|t: &Task| t.assigned_to == Some(user_id))
            .await?;
        if assigned > 0 {
            return Err(CoreError::Conflict(format!(
                "user is assigned to {} task(s); reassign them first",
                assigned
            )));
        }

        if !self.users.delete(user_id).await? {
            return Err(CoreError::NotFound("user not found".to_string()));
        }

        tracing::info!(user_id = %user_id, actor_id = %actor.id, "User deleted");
        Ok(())
    }

    async fn existing(&self, user_id: UserId) -> CoreResult<User> {
        self.users
            .by_id(user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("user not found".to_string()))
    }

    async fn refresh_if_current(&self, actor: &User, user_id: UserId) -> CoreResult<()> {
        if actor.id == user_id {
            self.auth.current_user().await?;
        }
        Ok(())
    }
}

/// Handle for changing a roster feed's search text
#[derive(Debug, Clone)]
pub struct UserFeedControls {
    search: Arc<watch::Sender<String>>,
}

impl UserFeedControls {
    /// Sets the search text; text equal to the current one after
    /// normalization is ignored
    pub fn set_search(&self, text: &str) {
        let needle = normalize_search(text);
        self.search.send_if_modified(|current| {
            if *current == needle {
                false
            } else {
                *current = needle;
                true
            }
        });
    }
}

/// One observer's live roster
pub struct UserFeed {
    auth_rx: watch::Receiver<AuthState>,
    session_ends: watch::Receiver<u64>,
    search_rx: watch::Receiver<String>,
    controls: UserFeedControls,
    source: LiveSeq<User>,
    last: Option<Vec<User>>,
    rescope: bool,
}

impl UserFeed {
    pub fn controls(&self) -> UserFeedControls {
        self.controls.clone()
    }

    /// Waits for the next roster
    ///
    /// The first call returns immediately; later calls wait for a login,
    /// logout, search change or user write that alters the list. A session
    /// that ends always clears a non-empty roster first, even when the next
    /// login has already happened.
    pub async fn next(&mut self) -> Option<Vec<User>> {
        if self.last.is_none() {
            let rows = self.evaluate();
            self.last = Some(rows.clone());
            return Some(rows);
        }

        loop {
            if !std::mem::take(&mut self.rescope) {
                tokio::select! {
                    biased;

                    changed = self.auth_rx.changed() => changed.ok()?,
                    changed = self.search_rx.changed() => changed.ok()?,
                    changed = self.source.changed() => changed.ok()?,
                }

                if self.session_ends.has_changed().unwrap_or(false) {
                    self.session_ends.borrow_and_update();
                    self.rescope = true;
                    if self.last.as_ref().is_some_and(|rows| !rows.is_empty()) {
                        self.last = Some(Vec::new());
                        return Some(Vec::new());
                    }
                    continue;
                }
            }

            let rows = self.evaluate();
            if self.last.as_ref() != Some(&rows) {
                self.last = Some(rows.clone());
                return Some(rows);
            }
        }
    }

    fn evaluate(&mut self) -> Vec<User> {
        self.session_ends.borrow_and_update();
        let authenticated = self.auth_rx.borrow_and_update().is_authenticated();
        let needle = self.search_rx.borrow_and_update().clone();
        let rows = self.source.snapshot();

        if !authenticated {
            return Vec::new();
        }
        rows.into_iter()
            .filter(|u| needle.is_empty() || u.matches_search(&needle))
            .collect()
    }
}

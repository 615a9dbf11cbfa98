/// Task query engine
///
/// Exposes a live, role-scoped task list per observer, live statistics, and
/// the task mutations. A task list is derived from three inputs:
///
/// 1. **Scope** from the authentication state (admin: all tasks; member:
///    tasks they created or were assigned; anonymous: nothing)
/// 2. **Filter** (all, completed, pending, high priority)
/// 3. **Search** text, debounced; only settled text is evaluated and
///    identical consecutive text is ignored
///
/// Results are newest first with ties broken by id. Any change to an input,
/// or any write to the task table, makes the feed re-evaluate; a feed only
/// emits when the resulting list actually differs from its last emission.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::query::TaskQueryEngine;
/// use taskdesk_shared::store::TaskFilter;
///
/// # async fn example(engine: TaskQueryEngine) {
/// let mut feed = engine.watch_tasks();
/// let controls = feed.controls();
///
/// let initial = feed.next().await;
/// controls.set_filter(TaskFilter::Pending);
/// controls.set_search("report");
///
/// while let Some(tasks) = feed.next().await {
///     println!("{} tasks", tasks.len());
/// }
/// # }
/// ```

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use super::debounce::Debouncer;
use super::scope_for;
use super::statistics::{self, StatisticsFeed, TaskStatistics};
use crate::auth::authorization::require_task_access;
use crate::auth::service::{AuthService, AuthState};
use crate::config::QuerySettings;
use crate::error::{CoreError, CoreResult};
use crate::models::category::Category;
use crate::models::task::{NewTask, Task, TaskId, MIN_TITLE_LENGTH};
use crate::models::user::User;
use crate::store::predicate::normalize_search;
use crate::store::{CategoryStore, LiveSeq, TaskFilter, TaskPredicate, TaskStore, UserStore};

/// A task with its references resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDetails {
    pub task: Task,
    pub category: Option<Category>,
    pub assignee: Option<User>,
    pub creator: Option<User>,
}

/// Role-scoped task queries and mutations
pub struct TaskQueryEngine {
    auth: Arc<AuthService>,
    tasks: Arc<dyn TaskStore>,
    categories: Arc<dyn CategoryStore>,
    users: Arc<dyn UserStore>,
    settings: QuerySettings,
    stats_hub: Mutex<Option<Arc<watch::Sender<TaskStatistics>>>>,
}

impl TaskQueryEngine {
    pub fn new(
        auth: Arc<AuthService>,
        tasks: Arc<dyn TaskStore>,
        categories: Arc<dyn CategoryStore>,
        users: Arc<dyn UserStore>,
        settings: QuerySettings,
    ) -> Self {
        TaskQueryEngine {
            auth,
            tasks,
            categories,
            users,
            settings,
            stats_hub: Mutex::new(None),
        }
    }

    /// Opens a live task list with filter `All` and no search text
    pub fn watch_tasks(&self) -> TaskFeed {
        let (filter_tx, filter_rx) = watch::channel(TaskFilter::All);
        let (search_tx, search_rx) = watch::channel(String::new());

        TaskFeed {
            tasks: Arc::clone(&self.tasks),
            auth_rx: self.auth.subscribe(),
            session_ends: self.auth.session_ends(),
            filter_rx,
            search_rx,
            controls: TaskFeedControls {
                filter: Arc::new(filter_tx),
                search: Arc::new(search_tx),
            },
            debouncer: Debouncer::with_initial(self.settings.search_debounce, String::new()),
            live: None,
            last: None,
            rescope: false,
            evaluations: 0,
        }
    }

    /// One-shot, role-scoped task list
    pub fn list_tasks(&self, filter: TaskFilter, search: &str) -> Vec<Task> {
        let scope = scope_for(&self.auth.state());
        self.tasks
            .by_predicate(TaskPredicate::new(scope, filter, search))
            .snapshot()
    }

    /// Subscribes to live statistics for the current identity
    ///
    /// All subscribers share one background ticker. It is started by the
    /// first subscriber and stops once every feed has been dropped.
    pub async fn statistics(&self) -> CoreResult<StatisticsFeed> {
        {
            let hub = self
                .stats_hub
                .lock()
                .map_err(|_| CoreError::Internal("statistics hub lock poisoned".to_string()))?;
            if let Some(tx) = hub.as_ref().filter(|tx| !tx.is_closed()) {
                return Ok(StatisticsFeed::new(tx.subscribe()));
            }
        }

        let auth_rx = self.auth.subscribe();
        let initial = self.statistics_snapshot().await?;
        let (tx, rx) = watch::channel(initial);
        let tx = Arc::new(tx);

        {
            let mut hub = self
                .stats_hub
                .lock()
                .map_err(|_| CoreError::Internal("statistics hub lock poisoned".to_string()))?;
            if let Some(existing) = hub.as_ref().filter(|tx| !tx.is_closed()) {
                // Another subscriber started a ticker while we computed.
                return Ok(StatisticsFeed::new(existing.subscribe()));
            }
            *hub = Some(Arc::clone(&tx));
        }

        tokio::spawn(statistics::run_ticker(
            tx,
            auth_rx,
            Arc::clone(&self.tasks),
            self.settings.statistics_interval,
        ));

        Ok(StatisticsFeed::new(rx))
    }

    /// Statistics computed right now, without subscribing
    pub async fn statistics_snapshot(&self) -> CoreResult<TaskStatistics> {
        let scope = scope_for(&self.auth.state());
        Ok(statistics::compute(self.tasks.as_ref(), scope).await?)
    }

    /// Creates a task owned by the current user
    ///
    /// # Errors
    ///
    /// - `Authorization` if nobody is logged in
    /// - `Validation` for a short title, a past due date or a missing assignee
    /// - `NotFound` for an unknown category or assignee, or when the current
    ///   user's account was deleted
    pub async fn create_task(&self, input: NewTask) -> CoreResult<TaskId> {
        let actor = self.auth.actor()?;

        let _references = self.tasks.reference_lock().lock().await;
        if self.users.by_id(actor.id).await?.is_none() {
            return Err(CoreError::NotFound("user not found".to_string()));
        }
        let input = self.validate(&actor, input, None).await?;

        let task = Task::new(input, actor.id);
        let id = self.tasks.insert(task).await?;

        tracing::info!(task_id = %id, user_id = %actor.id, "Task created");
        Ok(id)
    }

    /// Replaces the editable fields of a task
    ///
    /// The creator and creation time are kept from the stored record. An
    /// elapsed due date is accepted as long as it is unchanged.
    pub async fn update_task(&self, task: Task) -> CoreResult<()> {
        let actor = self.auth.actor()?;
        let existing = self.visible_task(&actor, task.id).await?;

        let draft = NewTask {
            title: task.title,
            description: task.description,
            priority: task.priority,
            due_date: task.due_date,
            category_id: task.category_id,
            assigned_to: task.assigned_to,
        };

        let _references = self.tasks.reference_lock().lock().await;
        let draft = self.validate(&actor, draft, Some(existing.due_date)).await?;

        let updated = Task {
            id: existing.id,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            due_date: draft.due_date,
            is_completed: task.is_completed,
            category_id: draft.category_id,
            assigned_to: draft.assigned_to,
            created_by: existing.created_by,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        self.tasks.update(updated).await?;

        tracing::info!(task_id = %existing.id, user_id = %actor.id, "Task updated");
        Ok(())
    }

    /// Sets the completion flag only
    pub async fn toggle_completion(&self, task_id: TaskId, completed: bool) -> CoreResult<()> {
        let actor = self.auth.actor()?;
        self.visible_task(&actor, task_id).await?;
        self.tasks.update_completion(task_id, completed).await?;

        tracing::info!(task_id = %task_id, user_id = %actor.id, completed, "Task completion set");
        Ok(())
    }

    pub async fn delete_task(&self, task_id: TaskId) -> CoreResult<()> {
        let actor = self.auth.actor()?;
        self.visible_task(&actor, task_id).await?;

        if !self.tasks.delete(task_id).await? {
            return Err(CoreError::NotFound("task not found".to_string()));
        }

        tracing::info!(task_id = %task_id, user_id = %actor.id, "Task deleted");
        Ok(())
    }

    /// A visible task with category, assignee and creator resolved
    pub async fn task_details(&self, task_id: TaskId) -> CoreResult<TaskDetails> {
        let actor = self.auth.actor()?;
        let task = self.visible_task(&actor, task_id).await?;

        let category = self.categories.by_id(task.category_id).await?;
        let assignee = match task.assigned_to {
            Some(id) => self.users.by_id(id).await?,
            None => None,
        };
        let creator = self.users.by_id(task.created_by).await?;

        Ok(TaskDetails {
            task,
            category,
            assignee,
            creator,
        })
    }

    async fn visible_task(&self, actor: &User, task_id: TaskId) -> CoreResult<Task> {
        let task = self
            .tasks
            .by_id(task_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("task not found".to_string()))?;
        require_task_access(actor, &task)?;
        Ok(task)
    }

    /// Normalizes and checks task fields before they reach the store
    ///
    /// `previous_due` is the stored due date when editing; the past-date check
    /// only applies to a new or changed due date.
    async fn validate(
        &self,
        actor: &User,
        mut draft: NewTask,
        previous_due: Option<Option<DateTime<Utc>>>,
    ) -> CoreResult<NewTask> {
        draft.title = draft.title.trim().to_string();
        if draft.title.chars().count() < MIN_TITLE_LENGTH {
            return Err(CoreError::Validation(format!(
                "title must be at least {} characters",
                MIN_TITLE_LENGTH
            )));
        }

        draft.description = draft
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        if let Some(due) = draft.due_date {
            let changed = previous_due != Some(Some(due));
            if changed && due < Utc::now() {
                return Err(CoreError::Validation(
                    "due date cannot be in the past".to_string(),
                ));
            }
        }

        if self.categories.by_id(draft.category_id).await?.is_none() {
            return Err(CoreError::NotFound("category not found".to_string()));
        }

        if !actor.role.can_assign_to_others() {
            draft.assigned_to = Some(actor.id);
            return Ok(draft);
        }

        match draft.assigned_to {
            Some(assignee) => {
                if self.users.by_id(assignee).await?.is_none() {
                    return Err(CoreError::NotFound("assignee not found".to_string()));
                }
            }
            None if self.settings.require_assignee => {
                return Err(CoreError::Validation(
                    "an assignee is required".to_string(),
                ));
            }
            None => {}
        }

        Ok(draft)
    }
}

/// Handles for changing a feed's filter and search text
///
/// Cheap to clone; may be moved to another task than the feed itself.
#[derive(Debug, Clone)]
pub struct TaskFeedControls {
    filter: Arc<watch::Sender<TaskFilter>>,
    search: Arc<watch::Sender<String>>,
}

impl TaskFeedControls {
    /// Selects a filter; selecting the current filter is a no-op
    pub fn set_filter(&self, filter: TaskFilter) {
        self.filter.send_if_modified(|current| {
            if *current == filter {
                false
            } else {
                *current = filter;
                true
            }
        });
    }

    /// Records a keystroke; evaluation waits for the debounce window
    pub fn set_search(&self, text: &str) {
        self.search.send_replace(text.to_string());
    }

    pub fn filter(&self) -> TaskFilter {
        *self.filter.borrow()
    }
}

/// One observer's live task list
pub struct TaskFeed {
    tasks: Arc<dyn TaskStore>,
    auth_rx: watch::Receiver<AuthState>,
    session_ends: watch::Receiver<u64>,
    filter_rx: watch::Receiver<TaskFilter>,
    search_rx: watch::Receiver<String>,
    controls: TaskFeedControls,
    debouncer: Debouncer<String>,
    live: Option<LiveSeq<Task>>,
    last: Option<Vec<Task>>,
    rescope: bool,
    evaluations: u64,
}

impl TaskFeed {
    pub fn controls(&self) -> TaskFeedControls {
        self.controls.clone()
    }

    /// How many times the query has been re-scoped so far
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// The search text currently applied to the list
    pub fn applied_search(&self) -> &str {
        self.debouncer.settled().map(String::as_str).unwrap_or("")
    }

    /// Waits for the next list
    ///
    /// The first call returns the initial snapshot immediately. Later calls
    /// wait until an input or the task table changes in a way that alters
    /// the list. When a session ends, a non-empty list is cleared with an
    /// empty emission before the next identity's tasks are shown, even if
    /// the logout and the following login arrive together. Returns `None`
    /// once the underlying stores shut down.
    pub async fn next(&mut self) -> Option<Vec<Task>> {
        if self.last.is_none() {
            let rows = self.evaluate();
            return Some(self.emit(rows));
        }

        loop {
            if std::mem::take(&mut self.rescope) {
                let rows = self.evaluate();
                if self.last.as_ref() != Some(&rows) {
                    return Some(self.emit(rows));
                }
            }

            let deadline = self.debouncer.deadline();
            let live = self.live.as_mut()?;

            let table_changed = tokio::select! {
                biased;

                changed = self.auth_rx.changed() => {
                    changed.ok()?;
                    false
                }
                changed = self.filter_rx.changed() => {
                    changed.ok()?;
                    false
                }
                changed = self.search_rx.changed() => {
                    changed.ok()?;
                    let text = normalize_search(&self.search_rx.borrow_and_update());
                    self.debouncer.push(text);
                    continue;
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.debouncer.settle().is_none() {
                        continue;
                    }
                    false
                }
                changed = live.changed() => {
                    changed.ok()?;
                    true
                }
            };

            if self.session_ended() {
                self.rescope = true;
                if self.last.as_ref().is_some_and(|rows| !rows.is_empty()) {
                    return Some(self.emit(Vec::new()));
                }
                continue;
            }

            let rows = if table_changed {
                self.live.as_mut()?.snapshot()
            } else {
                self.evaluate()
            };
            if self.last.as_ref() == Some(&rows) {
                continue;
            }
            return Some(self.emit(rows));
        }
    }

    /// Whether a session ended since the list was last scoped
    fn session_ended(&mut self) -> bool {
        let ended = self.session_ends.has_changed().unwrap_or(false);
        if ended {
            self.session_ends.borrow_and_update();
        }
        ended
    }

    /// Rebuilds the predicate from the current inputs and reads the result
    fn evaluate(&mut self) -> Vec<Task> {
        self.session_ends.borrow_and_update();
        let scope = scope_for(&self.auth_rx.borrow_and_update());
        let filter = *self.filter_rx.borrow_and_update();
        let search = self.applied_search().to_string();

        let mut live = self
            .tasks
            .by_predicate(TaskPredicate::new(scope, filter, &search));
        let rows = live.snapshot();
        self.live = Some(live);
        self.evaluations += 1;

        tracing::debug!(
            ?scope,
            filter = %filter,
            search = %search,
            count = rows.len(),
            "Task list re-evaluated"
        );
        rows
    }

    fn emit(&mut self, rows: Vec<Task>) -> Vec<Task> {
        self.last = Some(rows.clone());
        rows
    }
}

/// Application state and composition root
///
/// This module wires the core together: in-memory stores, the file-backed
/// session, the password codec, the auth service and both query engines. It
/// also seeds the default accounts and categories on startup.
///
/// # Example
///
/// ```no_run
/// use taskdesk_cli::{app::App, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let app = App::build(config).await?;
/// println!("Logged in: {}", app.auth.state().is_authenticated());
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use taskdesk_shared::auth::password::PasswordCodec;
use taskdesk_shared::auth::service::AuthService;
use taskdesk_shared::auth::session::{FileSessionStore, SessionStore};
use taskdesk_shared::models::category::default_categories;
use taskdesk_shared::models::user::{Role, User, UserId};
use taskdesk_shared::query::{TaskFeedControls, TaskQueryEngine, UserQueryEngine};
use taskdesk_shared::store::memory::{MemoryCategoryStore, MemoryTaskStore, MemoryUserStore};
use taskdesk_shared::store::{CategoryStore, TaskStore, UserStore};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;

/// Stable id of the seeded administrator
pub const SEED_ADMIN_ID: UserId = UserId(Uuid::from_u128(0x7a5d_0001));

/// Stable id of the seeded member
pub const SEED_MEMBER_ID: UserId = UserId(Uuid::from_u128(0x7a5d_0002));

/// A default account created on startup
pub struct SeedAccount {
    pub id: UserId,
    pub username: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub role: Role,
}

/// Accounts created when seeding is enabled
///
/// Ids are fixed so that a persisted session still resolves after a restart.
pub const SEED_ACCOUNTS: [SeedAccount; 2] = [
    SeedAccount {
        id: SEED_ADMIN_ID,
        username: "admin",
        email: "admin@company.com",
        password: "admin123",
        first_name: "Admin",
        last_name: "User",
        role: Role::Admin,
    },
    SeedAccount {
        id: SEED_MEMBER_ID,
        username: "user1",
        email: "user1@company.com",
        password: "user123",
        first_name: "Regular",
        last_name: "User",
        role: Role::Member,
    },
];

/// Shared application state
///
/// Cheap to share behind an `Arc`; every component is itself reference
/// counted.
pub struct App {
    /// Application configuration
    pub config: Arc<Config>,

    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub auth: Arc<AuthService>,
    pub task_engine: TaskQueryEngine,
    pub user_engine: UserQueryEngine,
}

impl App {
    /// Builds the application with the session file named in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the Argon2 parameters are invalid, seeding fails,
    /// or the persisted session cannot be read.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let sessions = Arc::new(FileSessionStore::new(config.session.file.clone()));
        Self::with_sessions(config, sessions).await
    }

    /// Builds the application around an explicit session store
    pub async fn with_sessions(
        config: Config,
        sessions: Arc<dyn SessionStore>,
    ) -> anyhow::Result<Self> {
        let codec = PasswordCodec::new(&config.core.password)?;

        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        let tasks: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
        let categories: Arc<dyn CategoryStore> = Arc::new(MemoryCategoryStore::new());

        if config.seed {
            seed_defaults(users.as_ref(), categories.as_ref(), &codec).await?;
        }

        let auth = Arc::new(AuthService::new(users.clone(), sessions, codec));
        let task_engine = TaskQueryEngine::new(
            auth.clone(),
            tasks.clone(),
            categories.clone(),
            users.clone(),
            config.core.query.clone(),
        );
        let user_engine = UserQueryEngine::new(auth.clone(), users.clone(), tasks.clone());

        match auth.current_user().await? {
            Some(user) => {
                tracing::info!(user_id = %user.id, username = %user.username, "Session restored")
            }
            None => tracing::debug!("No session to restore"),
        }

        Ok(Self {
            config: Arc::new(config),
            users,
            tasks,
            categories,
            auth,
            task_engine,
            user_engine,
        })
    }

    /// Logs every statistics change until `cancel` fires
    pub async fn spawn_statistics_logger(
        &self,
        cancel: CancellationToken,
    ) -> anyhow::Result<JoinHandle<()>> {
        let mut stream = self.task_engine.statistics().await?.into_stream();

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = stream.next() => {
                        let Some(stats) = next else { break };
                        tracing::info!(
                            total = stats.total_tasks,
                            completed = stats.completed_tasks,
                            completion_rate = stats.completion_rate,
                            "Task statistics"
                        );
                    }
                }
            }
            tracing::debug!("Statistics logger stopped");
        }))
    }

    /// Follows a live task list and logs its size until `cancel` fires
    ///
    /// Returns the feed's controls so the shell's filter and search follow
    /// what the user types.
    pub fn spawn_task_feed_logger(
        &self,
        cancel: CancellationToken,
    ) -> (TaskFeedControls, JoinHandle<()>) {
        let mut feed = self.task_engine.watch_tasks();
        let controls = feed.controls();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = feed.next() => {
                        let Some(tasks) = next else { break };
                        tracing::debug!(
                            count = tasks.len(),
                            search = %feed.applied_search(),
                            "Task list changed"
                        );
                    }
                }
            }
            tracing::debug!("Task feed logger stopped");
        });

        (controls, handle)
    }
}

/// Inserts the default accounts and categories
pub async fn seed_defaults(
    users: &dyn UserStore,
    categories: &dyn CategoryStore,
    codec: &PasswordCodec,
) -> anyhow::Result<()> {
    for account in &SEED_ACCOUNTS {
        if users.by_id(account.id).await?.is_some() {
            continue;
        }
        let credential = codec.new_credential(account.password)?;
        let mut user = User::new(
            account.username,
            account.email,
            credential,
            account.first_name,
            account.last_name,
            account.role,
        );
        user.id = account.id;
        users.insert(user).await?;
        tracing::info!(user_id = %account.id, username = account.username, "Seeded account");
    }

    if categories.all().await?.is_empty() {
        for category in default_categories() {
            categories.insert(category).await?;
        }
        tracing::info!("Seeded default categories");
    }

    Ok(())
}

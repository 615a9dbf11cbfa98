//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - In-memory stores wired into the auth service and both query engines
//! - An administrator and two members with known passwords
//! - Light Argon2 parameters so hashing stays fast
//! - Task input helpers

#![allow(dead_code)]

use std::sync::Arc;

use taskdesk_shared::auth::password::{PasswordCodec, PasswordConfig};
use taskdesk_shared::auth::service::{AuthResult, AuthService};
use taskdesk_shared::auth::session::MemorySessionStore;
use taskdesk_shared::config::QuerySettings;
use taskdesk_shared::models::category::Category;
use taskdesk_shared::models::task::{NewTask, Priority, TaskId};
use taskdesk_shared::models::user::{Role, User};
use taskdesk_shared::query::{TaskQueryEngine, UserQueryEngine};
use taskdesk_shared::store::memory::{MemoryCategoryStore, MemoryTaskStore, MemoryUserStore};
use taskdesk_shared::store::{CategoryStore, UserStore};

pub const ADMIN_PASSWORD: &str = "Admin123!";
pub const MEMBER_PASSWORD: &str = "member123";

/// Argon2 parameters cheap enough for tests
pub fn fast_password_config() -> PasswordConfig {
    PasswordConfig {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub users: Arc<MemoryUserStore>,
    pub tasks: Arc<MemoryTaskStore>,
    pub categories: Arc<MemoryCategoryStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub codec: PasswordCodec,
    pub auth: Arc<AuthService>,
    pub task_engine: TaskQueryEngine,
    pub user_engine: UserQueryEngine,
    pub admin: User,
    pub alice: User,
    pub bob: User,
    pub work: Category,
}

impl TestContext {
    /// Creates a context with default query settings
    pub async fn new() -> Self {
        Self::with_settings(QuerySettings::default()).await
    }

    /// Creates a context with custom query settings
    pub async fn with_settings(settings: QuerySettings) -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let tasks = Arc::new(MemoryTaskStore::new());
        let categories = Arc::new(MemoryCategoryStore::with_defaults());
        let sessions = Arc::new(MemorySessionStore::new());
        let codec = PasswordCodec::new(&fast_password_config()).expect("valid test parameters");

        let admin = seed_user(&*users, &codec, "admin", Role::Admin, ADMIN_PASSWORD).await;
        let alice = seed_user(&*users, &codec, "alice", Role::Member, MEMBER_PASSWORD).await;
        let bob = seed_user(&*users, &codec, "bob", Role::Member, MEMBER_PASSWORD).await;

        let work = categories
            .all()
            .await
            .expect("categories")
            .into_iter()
            .find(|c| c.name == "Work")
            .expect("default Work category");

        let auth = Arc::new(AuthService::new(users.clone(), sessions.clone(), codec.clone()));
        let task_engine = TaskQueryEngine::new(
            auth.clone(),
            tasks.clone(),
            categories.clone(),
            users.clone(),
            settings,
        );
        let user_engine = UserQueryEngine::new(auth.clone(), users.clone(), tasks.clone());

        TestContext {
            users,
            tasks,
            categories,
            sessions,
            codec,
            auth,
            task_engine,
            user_engine,
            admin,
            alice,
            bob,
            work,
        }
    }

    /// Logs `user` in with the fixture password for their role
    pub async fn login_as(&self, user: &User) -> User {
        let password = match user.role {
            Role::Admin => ADMIN_PASSWORD,
            Role::Member => MEMBER_PASSWORD,
        };
        match self.auth.login(&user.username, password).await {
            AuthResult::Success(user) => user,
            AuthResult::Error(reason) => panic!("login as {} failed: {}", user.username, reason),
        }
    }

    /// Task input in the Work category
    pub fn new_task(&self, title: &str, assignee: Option<&User>) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            priority: Priority::Medium,
            due_date: None,
            category_id: self.work.id,
            assigned_to: assignee.map(|u| u.id),
        }
    }

    /// Creates a task as the current user, assigned to `assignee`
    pub async fn add_task(&self, title: &str, assignee: &User) -> TaskId {
        self.task_engine
            .create_task(self.new_task(title, Some(assignee)))
            .await
            .expect("create task")
    }
}

async fn seed_user(
    users: &dyn UserStore,
    codec: &PasswordCodec,
    username: &str,
    role: Role,
    password: &str,
) -> User {
    let credential = codec.new_credential(password).expect("fixture password passes policy");
    let user = User::new(
        username,
        format!("{}@example.com", username),
        credential,
        "Test",
        "Person",
        role,
    );
    users.insert(user.clone()).await.expect("insert fixture user");
    user
}

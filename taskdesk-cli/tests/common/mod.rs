//! Common test utilities for shell integration tests
//!
//! Builds an [`App`] with seeded default data, cheap Argon2 parameters and a
//! session file inside a temporary directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use taskdesk_cli::app::App;
use taskdesk_cli::commands::{Outcome, Shell};
use taskdesk_cli::config::{Config, SessionConfig};
use taskdesk_shared::auth::password::PasswordConfig;
use taskdesk_shared::config::{CoreConfig, QuerySettings};
use tempfile::TempDir;

pub const ADMIN_LOGIN: &str = "login admin admin123";
pub const MEMBER_LOGIN: &str = "login user1 user123";

/// Configuration with a session file under `dir`
pub fn test_config(dir: &Path) -> Config {
    Config {
        session: SessionConfig {
            file: dir.join("session.json"),
        },
        seed: true,
        core: CoreConfig {
            password: PasswordConfig {
                memory_kib: 256,
                iterations: 1,
                parallelism: 1,
            },
            query: QuerySettings::default(),
        },
    }
}

/// Test context containing the app, a shell and the temp directory
pub struct TestContext {
    pub dir: TempDir,
    pub app: Arc<App>,
    pub shell: Shell,
}

impl TestContext {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = Arc::new(App::build(test_config(dir.path())).await.expect("build app"));
        let shell = Shell::new(Arc::clone(&app));
        TestContext { dir, app, shell }
    }

    /// Builds a second app over the same session file, as after a restart
    pub async fn restart(&self) -> Arc<App> {
        Arc::new(App::build(test_config(self.dir.path())).await.expect("rebuild app"))
    }

    pub fn session_file(&self) -> PathBuf {
        self.dir.path().join("session.json")
    }

    /// Runs a line that must succeed and returns its output
    pub async fn ok(&mut self, line: &str) -> String {
        match self.shell.execute(line).await {
            Ok(Outcome::Output(text)) => text,
            Ok(Outcome::Quit) => panic!("'{}' quit the shell", line),
            Err(err) => panic!("'{}' failed: {}", line, err),
        }
    }

    /// Runs a line that must fail and returns the rendered error
    pub async fn err(&mut self, line: &str) -> String {
        match self.shell.execute(line).await {
            Ok(outcome) => panic!("'{}' unexpectedly succeeded: {:?}", line, outcome),
            Err(err) => err.to_string(),
        }
    }
}

/// Configuration management for the TaskDesk shell
///
/// This module loads configuration from environment variables (and a `.env`
/// file when present) and provides a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `TASKDESK_SESSION_FILE`: where the logged-in user is remembered
///   (default: `.taskdesk/session.json`)
/// - `TASKDESK_SEED`: seed default accounts and categories (default: true)
/// - `TASKDESK_ARGON2_*`, `TASKDESK_SEARCH_DEBOUNCE_MS`,
///   `TASKDESK_STATS_INTERVAL_SECS`, `TASKDESK_REQUIRE_ASSIGNEE`: see
///   [`CoreConfig`]
/// - `RUST_LOG`: Log level (default: info)
///
/// # Example
///
/// ```no_run
/// use taskdesk_cli::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Session file: {}", config.session.file.display());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use taskdesk_shared::config::{parse_bool, CoreConfig};

/// Default location of the session file, relative to the working directory
pub const DEFAULT_SESSION_FILE: &str = ".taskdesk/session.json";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Session persistence
    pub session: SessionConfig,

    /// Seed default data on startup
    pub seed: bool,

    /// Core library configuration
    #[serde(skip)]
    pub core: CoreConfig,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the current user id
    pub file: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable has an invalid value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through `lookup` instead of the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let file = lookup("TASKDESK_SESSION_FILE")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_FILE.to_string());

        let seed = parse_bool(&lookup, "TASKDESK_SEED", true)?;
        let core = CoreConfig::from_lookup(&lookup)?;

        Ok(Self {
            session: SessionConfig {
                file: PathBuf::from(file),
            },
            seed,
            core,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.session.file, PathBuf::from(DEFAULT_SESSION_FILE));
        assert!(config.seed);
        assert_eq!(config.core.password, CoreConfig::default().password);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("TASKDESK_SESSION_FILE", "/tmp/taskdesk/session.json"),
            ("TASKDESK_SEED", "no"),
            ("TASKDESK_ARGON2_ITERATIONS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.session.file, PathBuf::from("/tmp/taskdesk/session.json"));
        assert!(!config.seed);
        assert_eq!(config.core.password.iterations, 2);
    }

    #[test]
    fn test_invalid_seed_flag() {
        assert!(Config::from_lookup(lookup(&[("TASKDESK_SEED", "sometimes")])).is_err());
    }
}

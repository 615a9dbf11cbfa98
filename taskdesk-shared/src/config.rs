/// Core configuration
///
/// Loads tuning knobs for the credential codec and the query engines from
/// environment variables. Every variable is optional; unset variables fall
/// back to the defaults below, malformed ones are reported as `ConfigError`.
///
/// # Environment Variables
///
/// - `TASKDESK_ARGON2_MEMORY_KIB`: Argon2id memory cost (default: 65536)
/// - `TASKDESK_ARGON2_ITERATIONS`: Argon2id passes (default: 3)
/// - `TASKDESK_ARGON2_PARALLELISM`: Argon2id lanes (default: 4)
/// - `TASKDESK_SEARCH_DEBOUNCE_MS`: search quiet period (default: 300)
/// - `TASKDESK_STATS_INTERVAL_SECS`: statistics refresh period (default: 5)
/// - `TASKDESK_REQUIRE_ASSIGNEE`: whether admin-created tasks need an
///   assignee (default: true)
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::config::CoreConfig;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CoreConfig::from_env()?;
/// println!("search debounce: {:?}", config.query.search_debounce);
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;
use std::time::Duration;

pub use crate::auth::password::PasswordConfig;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Variable is set but cannot be parsed
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    /// Variable parses but is outside the accepted range
    #[error("{name} {reason}")]
    OutOfRange { name: &'static str, reason: String },
}

/// Query engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    /// Quiet period before settled search text is evaluated
    pub search_debounce: Duration,

    /// How often statistics are recomputed
    pub statistics_interval: Duration,

    /// Whether a task created by an admin must name an assignee
    pub require_assignee: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        QuerySettings {
            search_debounce: Duration::from_millis(300),
            statistics_interval: Duration::from_secs(5),
            require_assignee: true,
        }
    }
}

/// Complete core configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreConfig {
    /// Argon2id parameters
    pub password: PasswordConfig,

    /// Query engine settings
    pub query: QuerySettings,
}

impl CoreConfig {
    /// Loads configuration from `TASKDESK_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = CoreConfig::default();

        let password = PasswordConfig {
            memory_kib: parse_var(
                &lookup,
                "TASKDESK_ARGON2_MEMORY_KIB",
                defaults.password.memory_kib,
            )?,
            iterations: parse_var(
                &lookup,
                "TASKDESK_ARGON2_ITERATIONS",
                defaults.password.iterations,
            )?,
            parallelism: parse_var(
                &lookup,
                "TASKDESK_ARGON2_PARALLELISM",
                defaults.password.parallelism,
            )?,
        };

        let debounce_ms: u64 = parse_var(
            &lookup,
            "TASKDESK_SEARCH_DEBOUNCE_MS",
            defaults.query.search_debounce.as_millis() as u64,
        )?;
        let stats_secs: u64 = parse_var(
            &lookup,
            "TASKDESK_STATS_INTERVAL_SECS",
            defaults.query.statistics_interval.as_secs(),
        )?;
        if stats_secs == 0 {
            return Err(ConfigError::OutOfRange {
                name: "TASKDESK_STATS_INTERVAL_SECS",
                reason: "must be at least 1".to_string(),
            });
        }
        let require_assignee = parse_bool(
            &lookup,
            "TASKDESK_REQUIRE_ASSIGNEE",
            defaults.query.require_assignee,
        )?;

        Ok(CoreConfig {
            password,
            query: QuerySettings {
                search_debounce: Duration::from_millis(debounce_ms),
                statistics_interval: Duration::from_secs(stats_secs),
                require_assignee,
            },
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw,
        }),
    }
}

/// Accepts true/false, 1/0, yes/no, on/off
pub fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value: raw }),
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
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.password.memory_kib, 65536);
        assert_eq!(config.query.search_debounce, Duration::from_millis(300));
        assert_eq!(config.query.statistics_interval, Duration::from_secs(5));
        assert!(config.query.require_assignee);
    }

    #[test]
    fn test_overrides() {
        let config = CoreConfig::from_lookup(lookup(&[
            ("TASKDESK_ARGON2_MEMORY_KIB", "1024"),
            ("TASKDESK_SEARCH_DEBOUNCE_MS", "50"),
            ("TASKDESK_STATS_INTERVAL_SECS", "10"),
            ("TASKDESK_REQUIRE_ASSIGNEE", "no"),
        ]))
        .unwrap();

        assert_eq!(config.password.memory_kib, 1024);
        assert_eq!(config.password.iterations, 3);
        assert_eq!(config.query.search_debounce, Duration::from_millis(50));
        assert_eq!(config.query.statistics_interval, Duration::from_secs(10));
        assert!(!config.query.require_assignee);
    }

    #[test]
    fn test_invalid_values() {
        let err = CoreConfig::from_lookup(lookup(&[("TASKDESK_SEARCH_DEBOUNCE_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: "TASKDESK_SEARCH_DEBOUNCE_MS", .. }
        ));

        let err = CoreConfig::from_lookup(lookup(&[("TASKDESK_STATS_INTERVAL_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));

        let err = CoreConfig::from_lookup(lookup(&[("TASKDESK_REQUIRE_ASSIGNEE", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}

use std::time::Duration;

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the dispatch API (default: `http://localhost:3000`).
    pub dispatch_url: String,
    /// Optional label sent at registration.
    pub worker_name: Option<String>,
    /// Delay between work requests while idle (default: `1000` ms).
    pub poll_interval_ms: u64,
    /// Upper bound on a single command run (default: `300` s).
    pub command_timeout_secs: u64,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                  |
    /// |------------------------|--------------------------|
    /// | `DISPATCH_URL`         | `http://localhost:3000`  |
    /// | `WORKER_NAME`          | unset                    |
    /// | `POLL_INTERVAL_MS`     | `1000`                   |
    /// | `COMMAND_TIMEOUT_SECS` | `300`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let dispatch_url = std::env::var("DISPATCH_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let worker_name = std::env::var("WORKER_NAME")
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let poll_interval_ms = parse_var("POLL_INTERVAL_MS", "u64", 1000)?;
        let command_timeout_secs = parse_var("COMMAND_TIMEOUT_SECS", "u64", 300)?;

        Ok(Self {
            dispatch_url,
            worker_name,
            poll_interval_ms,
            command_timeout_secs,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Read `name` from the environment, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    parse_value(name, expected, std::env::var(name).ok(), default)
}

fn parse_value<T: std::str::FromStr>(
    name: &'static str,
    expected: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn unset_value_uses_default() {
        assert_eq!(
            parse_value::<u64>("POLL_INTERVAL_MS", "u64", None, 1000).unwrap(),
            1000
        );
    }

    #[test]
    fn negative_interval_is_invalid() {
        assert_matches!(
            parse_value::<u64>("POLL_INTERVAL_MS", "u64", Some("-5".into()), 1000),
            Err(ConfigError::Invalid { name: "POLL_INTERVAL_MS", .. })
        );
    }

    #[test]
    fn non_numeric_timeout_is_invalid() {
        let err = parse_value::<u64>("COMMAND_TIMEOUT_SECS", "u64", Some("soon".into()), 300)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "COMMAND_TIMEOUT_SECS must be a valid u64, got 'soon'"
        );
    }
}

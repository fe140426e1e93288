//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use transfers_authorizer::RetryPolicy;
use transfers_repo::DEFAULT_QUEUE;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub authorizer_uri: String,
    pub retry_policy: RetryPolicy,
    pub notify_queue: String,
    /// Enables the delivery worker when set.
    pub notify_target_url: Option<String>,
    pub notify_secret: Option<String>,
    pub notify_poll_interval: Duration,
    pub log_json: bool,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let authorizer_uri = get("AUTHORIZER_URI")
            .ok_or_else(|| anyhow::anyhow!("AUTHORIZER_URI environment variable is required"))?;

        let defaults = RetryPolicy::default();
        let retry_policy = RetryPolicy::new(
            parse_or(&get, "AUTHORIZER_MAX_ATTEMPTS", defaults.max_attempts)?,
            match get("AUTHORIZER_RETRY_STATUSES") {
                Some(raw) => parse_statuses(&raw)?,
                None => defaults.retryable_statuses,
            },
            Duration::from_millis(parse_or(
                &get,
                "AUTHORIZER_RETRY_DELAY_MS",
                defaults.delay.as_millis() as u64,
            )?),
            Duration::from_millis(parse_or(
                &get,
                "AUTHORIZER_TIMEOUT_MS",
                defaults.timeout.as_millis() as u64,
            )?),
        );

        Ok(Self {
            port: parse_or(&get, "PORT", 3000)?,
            database_url,
            authorizer_uri,
            retry_policy,
            notify_queue: get("NOTIFY_QUEUE").unwrap_or_else(|| DEFAULT_QUEUE.to_string()),
            notify_target_url: get("NOTIFY_TARGET_URL"),
            notify_secret: get("NOTIFY_SECRET"),
            notify_poll_interval: Duration::from_millis(parse_or(
                &get,
                "NOTIFY_POLL_INTERVAL_MS",
                1000,
            )?),
            log_json: get("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

/// Comma separated HTTP statuses, e.g. `500,502,503`.
fn parse_statuses(raw: &str) -> anyhow::Result<Vec<u16>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u16>()
                .with_context(|| format!("AUTHORIZER_RETRY_STATUSES has an invalid status: {}", s))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "sqlite::memory:"),
        ("AUTHORIZER_URI", "http://localhost:9000/authorize"),
    ];

    #[test]
    fn test_defaults() {
        let config = config(&REQUIRED).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.retry_policy, RetryPolicy::default());
        assert_eq!(config.notify_queue, "notify");
        assert_eq!(config.notify_target_url, None);
        assert_eq!(config.notify_poll_interval, Duration::from_secs(1));
        assert!(!config.log_json);
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("PORT", "8080"),
            ("AUTHORIZER_MAX_ATTEMPTS", "5"),
            ("AUTHORIZER_RETRY_STATUSES", "500, 502,503"),
            ("AUTHORIZER_RETRY_DELAY_MS", "100"),
            ("AUTHORIZER_TIMEOUT_MS", "2000"),
            ("NOTIFY_TARGET_URL", "http://localhost:4000/hook"),
            ("NOTIFY_SECRET", "s3cret"),
            ("LOG_FORMAT", "JSON"),
        ]);
        let config = config(&vars).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.retry_policy,
            RetryPolicy::new(
                5,
                vec![500, 502, 503],
                Duration::from_millis(100),
                Duration::from_secs(2)
            )
        );
        assert_eq!(config.notify_target_url.as_deref(), Some("http://localhost:4000/hook"));
        assert_eq!(config.notify_secret.as_deref(), Some("s3cret"));
        assert!(config.log_json);
    }

    #[test]
    fn test_required_variables() {
        let err = config(&[("AUTHORIZER_URI", "http://x")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = config(&[("DATABASE_URL", "sqlite::memory:")]).unwrap_err();
        assert!(err.to_string().contains("AUTHORIZER_URI"));
    }

    #[test]
    fn test_invalid_numbers_are_reported() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("AUTHORIZER_RETRY_STATUSES", "500,abc"));
        assert!(config(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "http"));
        let err = config(&vars).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}

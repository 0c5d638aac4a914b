use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::poller::PollOptions;
use crate::report::GatePolicy;
use crate::testmatch::TestMatcher;

pub const ENGINE_URL_ENV: &str = "KNOWLEDGE_ENGINE_URL";
pub const TEST_PATTERN_ENV: &str = "KNOWLEDGE_TEST_PATTERN";
const READ_TIMEOUT_ENV: &str = "KNOWLEDGE_READ_TIMEOUT_SECS";
const SUBMIT_TIMEOUT_ENV: &str = "KNOWLEDGE_SUBMIT_TIMEOUT_SECS";
const POLL_INTERVAL_ENV: &str = "KNOWLEDGE_POLL_INTERVAL_SECS";
const POLL_MAX_WAIT_ENV: &str = "KNOWLEDGE_POLL_MAX_WAIT_SECS";
const SUCCESS_THRESHOLD_ENV: &str = "KNOWLEDGE_SUCCESS_THRESHOLD";
const CRITICAL_KEYWORDS_ENV: &str = "KNOWLEDGE_CRITICAL_KEYWORDS";

/// Harness configuration, constructed once at startup and passed down by
/// parameter. The backend base URL comes from the environment (or a `.env`
/// file); nothing here is process-global.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub base_url: String,
    /// Per-call timeout for simple reads.
    pub read_timeout: Duration,
    /// Per-call timeout for synchronous submission endpoints (uploads).
    pub submit_timeout: Duration,
    pub poll: PollOptions,
    pub gate: GatePolicy,
    pub test_matcher: Option<TestMatcher>,
}

impl EngineConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            read_timeout: Duration::from_secs(15),
            submit_timeout: Duration::from_secs(300),
            poll: PollOptions::default(),
            gate: GatePolicy::default(),
            test_matcher: None,
        }
    }

    /// Looks up the backend URL and optional overrides in the environment,
    /// loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let base_url = env::var(ENGINE_URL_ENV).unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: ENGINE_URL_ENV,
            });
        }

        let mut config = Self::new(base_url);
        if let Some(secs) = env_u64(READ_TIMEOUT_ENV)? {
            config.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64(SUBMIT_TIMEOUT_ENV)? {
            config.submit_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64(POLL_INTERVAL_ENV)? {
            config.poll.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64(POLL_MAX_WAIT_ENV)? {
            config.poll.max_wait = Duration::from_secs(secs);
        }
        if let Some(threshold) = env_f64(SUCCESS_THRESHOLD_ENV)? {
            config.gate.min_success_rate = threshold;
        }
        if let Some(raw) = env_nonempty(CRITICAL_KEYWORDS_ENV) {
            config.gate.critical_keywords = raw
                .split(',')
                .map(|kw| kw.trim().to_lowercase())
                .filter(|kw| !kw.is_empty())
                .collect();
        }
        if let Some(pattern) = env_nonempty(TEST_PATTERN_ENV) {
            let matcher =
                TestMatcher::new(&pattern).map_err(|err| ConfigError::Invalid {
                    name: TEST_PATTERN_ENV,
                    value: pattern.clone(),
                    reason: err.to_string(),
                })?;
            config.test_matcher = Some(matcher);
        }
        Ok(config)
    }
}

fn env_nonempty(name: &'static str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn env_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env_nonempty(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| ConfigError::Invalid {
                name,
                value,
                reason: err.to_string(),
            }),
    }
}

fn env_f64(name: &'static str) -> Result<Option<f64>, ConfigError> {
    match env_nonempty(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|err| ConfigError::Invalid {
                name,
                value,
                reason: err.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so nothing else races on the process environment.
    #[test]
    fn test_from_env() {
        env::remove_var(ENGINE_URL_ENV);
        assert!(matches!(
            EngineConfig::from_env(),
            Err(ConfigError::Missing { .. })
        ));

        env::set_var(ENGINE_URL_ENV, "http://engine.local/api");
        env::set_var(POLL_INTERVAL_ENV, "2");
        env::set_var(POLL_MAX_WAIT_ENV, "60");
        env::set_var(SUCCESS_THRESHOLD_ENV, "85");
        env::set_var(CRITICAL_KEYWORDS_ENV, "delete, wipe");
        env::set_var(TEST_PATTERN_ENV, "library/");

        let config = EngineConfig::from_env().expect("complete environment");
        assert_eq!(config.base_url, "http://engine.local/api");
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.poll.max_wait, Duration::from_secs(60));
        assert_eq!(config.gate.min_success_rate, 85.0);
        assert_eq!(config.gate.critical_keywords, vec!["delete", "wipe"]);
        assert!(config.test_matcher.is_some());

        env::set_var(POLL_INTERVAL_ENV, "not-a-number");
        assert!(matches!(
            EngineConfig::from_env(),
            Err(ConfigError::Invalid { .. })
        ));

        for name in [
            ENGINE_URL_ENV,
            POLL_INTERVAL_ENV,
            POLL_MAX_WAIT_ENV,
            SUCCESS_THRESHOLD_ENV,
            CRITICAL_KEYWORDS_ENV,
            TEST_PATTERN_ENV,
        ] {
            env::remove_var(name);
        }
    }
}

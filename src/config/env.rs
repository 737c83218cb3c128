//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "ASYNC_TRIAL";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Default timeout from ASYNC_TRIAL_TIMEOUT
    pub timeout: Option<f64>,
    /// Log level from ASYNC_TRIAL_LOG
    pub log_level: Option<String>,
    /// Config file from ASYNC_TRIAL_CONFIG
    pub config_file: Option<String>,
    /// Fail fast from ASYNC_TRIAL_FAIL_FAST
    pub fail_fast: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            timeout: get_env_parse("TIMEOUT"),
            log_level: get_env("LOG"),
            config_file: get_env("CONFIG"),
            fail_fast: get_env("FAIL_FAST").map(|v| parse_bool(&v)),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.timeout.is_some()
            || self.log_level.is_some()
            || self.config_file.is_some()
            || self.fail_fast.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_TIMEOUT:   {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_LOG:       {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_CONFIG:    {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_FAIL_FAST: {:?}", ENV_PREFIX, self.fail_fast);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }

    #[test]
    fn test_has_any() {
        assert!(!EnvConfig::default().has_any());
        let env = EnvConfig {
            fail_fast: Some(true),
            ..EnvConfig::default()
        };
        assert!(env.has_any());
    }
}

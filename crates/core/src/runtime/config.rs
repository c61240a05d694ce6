//! Runtime configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the incident runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Retry delay used when a start request does not carry one.
    /// ISO-8601 duration such as "PT60S" or "PT5M".
    #[serde(default = "default_assignment_delay")]
    pub default_assignment_delay: String,

    /// How often the timer loop checks for due retries (milliseconds).
    #[serde(default = "default_timer_tick")]
    pub timer_tick_ms: u64,

    /// Keep terminal instance records in the store instead of deleting them.
    #[serde(default)]
    pub retain_completed: bool,
}

fn default_assignment_delay() -> String {
    "PT60S".to_string()
}

fn default_timer_tick() -> u64 {
    250
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_assignment_delay: default_assignment_delay(),
            timer_tick_ms: default_timer_tick(),
            retain_completed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.default_assignment_delay, "PT60S");
        assert_eq!(config.timer_tick_ms, 250);
        assert!(!config.retain_completed);
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: RuntimeConfig = toml::from_str("").unwrap();
        assert_eq!(config.default_assignment_delay, "PT60S");
        assert_eq!(config.timer_tick_ms, 250);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            default_assignment_delay = "PT5M"
            timer_tick_ms = 1000
            retain_completed = true
        "#;
        let config: RuntimeConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_assignment_delay, "PT5M");
        assert_eq!(config.timer_tick_ms, 1000);
        assert!(config.retain_completed);
    }
}

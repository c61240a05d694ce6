use super::{types::Config, ConfigError};
use crate::saga::AssignmentDelay;

/// Validate configuration
/// Currently validates:
/// - Services section exists (enforced by serde)
/// - Server port is not 0
/// - Default assignment delay parses and timer tick is positive
/// - Rule session name is set
/// - Every service URL is an http(s) URL and the timeout is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Runtime validation
    AssignmentDelay::parse(&config.runtime.default_assignment_delay).map_err(|e| {
        ConfigError::ValidationError(format!("runtime.default_assignment_delay: {}", e))
    })?;
    if config.runtime.timer_tick_ms == 0 {
        return Err(ConfigError::ValidationError(
            "runtime.timer_tick_ms cannot be 0".to_string(),
        ));
    }

    if config.rules.name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "rules.name cannot be empty".to_string(),
        ));
    }

    // Services validation
    let services = &config.services;
    for (key, url) in [
        ("services.responders_url", &services.responders_url),
        ("services.priority_url", &services.priority_url),
        ("services.rules_url", &services.rules_url),
        ("services.messages_url", &services.messages_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be an http(s) URL, got {:?}",
                key, url
            )));
        }
    }
    if services.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "services.timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, ServerConfig, ServicesConfig};
    use crate::gateway::RuleSession;
    use crate::runtime::RuntimeConfig;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            runtime: RuntimeConfig::default(),
            rules: RuleSession::default(),
            services: ServicesConfig {
                responders_url: "http://responders:8080".to_string(),
                priority_url: "http://priority:8080".to_string(),
                rules_url: "https://rules:8443".to_string(),
                messages_url: "http://messages:8080".to_string(),
                auth_token: None,
                timeout_secs: 30,
            },
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_bad_default_delay_fails() {
        let mut config = valid_config();
        config.runtime.default_assignment_delay = "sixty seconds".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("default_assignment_delay"));
    }

    #[test]
    fn test_validate_zero_tick_fails() {
        let mut config = valid_config();
        config.runtime.timer_tick_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_rule_session_fails() {
        let mut config = valid_config();
        config.rules.name = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_service_url_scheme() {
        let mut config = valid_config();
        config.services.priority_url = "priority:8080".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("services.priority_url"));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = valid_config();
        config.services.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}

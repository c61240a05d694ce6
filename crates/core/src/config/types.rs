use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::gateway::RuleSession;
use crate::runtime::RuntimeConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Rule session used for every assignment decision.
    #[serde(default)]
    pub rules: RuleSession,
    pub services: ServicesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("rescue.db")
}

/// Base URLs of the external services.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServicesConfig {
    /// Responder directory (e.g., "http://responder-service:8080")
    pub responders_url: String,
    /// Incident priority service
    pub priority_url: String,
    /// Assignment decision service
    pub rules_url: String,
    /// Outbound message gateway
    pub messages_url: String,
    /// Bearer token sent to every service, if set
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub runtime: RuntimeConfig,
    pub rules: RuleSession,
    pub services: SanitizedServicesConfig,
}

/// Sanitized services config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServicesConfig {
    pub responders_url: String,
    pub priority_url: String,
    pub rules_url: String,
    pub messages_url: String,
    pub auth_token_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let services = &config.services;
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            runtime: config.runtime.clone(),
            rules: config.rules.clone(),
            services: SanitizedServicesConfig {
                responders_url: services.responders_url.clone(),
                priority_url: services.priority_url.clone(),
                rules_url: services.rules_url.clone(),
                messages_url: services.messages_url.clone(),
                auth_token_configured: services
                    .auth_token
                    .as_deref()
                    .is_some_and(|t| !t.is_empty()),
                timeout_secs: services.timeout_secs,
            },
        }
    }
}

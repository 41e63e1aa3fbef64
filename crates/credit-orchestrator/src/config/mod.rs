use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::credit::agents::AgentKind;
use crate::workflows::credit::audit::DEFAULT_CACHE_CAPACITY;

pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 30;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub agents: AgentConfig,
    pub audit: AuditConfig,
    pub translation: TranslationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            agents: AgentConfig::from_env()?,
            audit: AuditConfig::from_env()?,
            translation: TranslationConfig::from_env(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Log output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Base URLs and call deadline for the scoring agents.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub endpoints: BTreeMap<AgentKind, String>,
    pub timeout: Duration,
}

impl AgentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut endpoints = BTreeMap::new();
        for agent in AgentKind::ALL {
            let url = match env::var(agent.url_env_var()) {
                Ok(value) => normalize_agent_url(agent, &value)?,
                Err(_) => default_agent_url(agent),
            };
            endpoints.insert(agent, url);
        }

        let timeout = match env::var("AGENT_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            Err(_) => Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
        };

        Ok(Self { endpoints, timeout })
    }

    pub fn endpoint(&self, agent: AgentKind) -> String {
        self.endpoints
            .get(&agent)
            .cloned()
            .unwrap_or_else(|| default_agent_url(agent))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoints: AgentKind::ALL
                .into_iter()
                .map(|agent| (agent, default_agent_url(agent)))
                .collect(),
            timeout: Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
        }
    }
}

fn default_agent_url(agent: AgentKind) -> String {
    format!("http://localhost:{}", agent.default_port())
}

fn normalize_agent_url(agent: AgentKind, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidAgentUrl {
            agent,
            value: raw.to_string(),
        })
    }
}

/// Audit cache sizing.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub cache_capacity: usize,
}

impl AuditConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let cache_capacity = match env::var("AUDIT_CACHE_CAPACITY") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => return Err(ConfigError::InvalidCacheCapacity(raw)),
            },
            Err(_) => DEFAULT_CACHE_CAPACITY,
        };
        Ok(Self { cache_capacity })
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// External translation provider credentials. Both must be set to enable it.
#[derive(Debug, Clone, Default)]
pub struct TranslationConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

impl TranslationConfig {
    fn from_env() -> Self {
        let non_empty = |name: &str| {
            env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            api_key: non_empty("TRANSLATION_API_KEY"),
            api_url: non_empty("TRANSLATION_API_URL"),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout(String),
    InvalidCacheCapacity(String),
    InvalidAgentUrl { agent: AgentKind, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout(value) => write!(
                f,
                "AGENT_TIMEOUT_SECS must be a positive integer (found '{value}')"
            ),
            ConfigError::InvalidCacheCapacity(value) => write!(
                f,
                "AUDIT_CACHE_CAPACITY must be a positive integer (found '{value}')"
            ),
            ConfigError::InvalidAgentUrl { agent, value } => write!(
                f,
                "{} must be an http(s) URL (found '{value}')",
                agent.url_env_var()
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

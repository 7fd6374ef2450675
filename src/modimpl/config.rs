use std::fmt;
use log::info;
use serde::Serialize;

use crate::modimpl::error::{ConfigurationError, Problem, Violation};

pub const NODE_ENV: &str = "NODE_ENV";
pub const APP_NAME: &str = "APP_NAME";
pub const APP_VERSION: &str = "APP_VERSION";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const PORT: &str = "PORT";

const DEFAULT_PORT: u16 = 3000;

const ENVIRONMENTS: &[&str] = &["development", "production", "test"];
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "http", "debug"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "development" => Some(Environment::Development),
            "production" => Some(Environment::Production),
            "test" => Some(Environment::Test),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity levels, most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Http,
    Debug,
}

impl LogLevel {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "http" => Some(LogLevel::Http),
            "debug" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Http => "http",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable configuration snapshot, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub environment: Environment,
    pub app_name: String,
    pub app_version: String,
    pub port: u16,
    pub log_level: LogLevel,
}

impl Config {
    pub fn summary(&self) -> String {
        format!(
            "📋 App: {} v{} | 🌍 Environment: {} | 🚀 Port: {} | 📊 Log Level: {}",
            self.app_name, self.app_version, self.environment, self.port, self.log_level
        )
    }
}

fn read_process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Reads and validates the service configuration from an environment source.
///
/// The source is a plain lookup function so tests can feed a fixed map instead
/// of touching the process environment.
pub struct EnvLoader<F> {
    lookup: F,
}

impl EnvLoader<fn(&str) -> Option<String>> {
    pub fn from_process() -> Self {
        Self { lookup: read_process_env }
    }
}

impl<F> EnvLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Builds the configuration, reporting every bad variable at once.
    pub fn load(&self) -> Result<Config, ConfigurationError> {
        let mut violations = Vec::new();

        let environment = match self.non_blank(NODE_ENV) {
            None => Some(Environment::default()),
            Some(raw) => Environment::parse(&raw).or_else(|| {
                violations.push(not_allowed(NODE_ENV, raw, ENVIRONMENTS));
                None
            }),
        };

        let port = match self.non_blank(PORT) {
            None => Some(DEFAULT_PORT),
            Some(raw) => raw.trim().parse::<u16>().ok().or_else(|| {
                violations.push(Violation { variable: PORT, problem: Problem::NotAPort { value: raw } });
                None
            }),
        };

        let app_name = self.required_text(APP_NAME, &mut violations);
        let app_version = self.required_text(APP_VERSION, &mut violations);

        let log_level = match self.non_blank(LOG_LEVEL) {
            None => Some(LogLevel::default()),
            Some(raw) => LogLevel::parse(&raw).or_else(|| {
                violations.push(not_allowed(LOG_LEVEL, raw, LOG_LEVELS));
                None
            }),
        };

        match (environment, app_name, app_version, port, log_level) {
            (Some(environment), Some(app_name), Some(app_version), Some(port), Some(log_level))
                if violations.is_empty() =>
            {
                Ok(Config { environment, app_name, app_version, port, log_level })
            }
            _ => Err(ConfigurationError { violations }),
        }
    }

    /// Re-checks the environment and logs a summary when it is usable.
    ///
    /// On top of what [`load`](Self::load) checks, variables that have defaults
    /// must still be set explicitly outside `test` mode. Blank counts as unset.
    pub fn validate(&self) -> Result<Config, ConfigurationError> {
        info!("🔧 Validating environment configuration...");
        let loaded = self.load();

        let required: &[&'static str] = match &loaded {
            Ok(config) if config.environment == Environment::Test => &[NODE_ENV],
            _ => &[NODE_ENV, PORT, APP_NAME, APP_VERSION],
        };
        let mut missing: Vec<Violation> = required
            .iter()
            .copied()
            .filter(|key| self.non_blank(key).is_none())
            .map(|key| Violation { variable: key, problem: Problem::Missing })
            .collect();

        let config = match loaded {
            Ok(config) if missing.is_empty() => config,
            Ok(_) => return Err(ConfigurationError { violations: missing }),
            Err(mut err) => {
                missing.retain(|m| !err.mentions(m.variable));
                missing.append(&mut err.violations);
                return Err(ConfigurationError { violations: missing });
            }
        };

        info!("✅ Environment configuration validated successfully");
        info!("{}", config.summary());
        Ok(config)
    }

    fn non_blank(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required_text(&self, key: &'static str, violations: &mut Vec<Violation>) -> Option<String> {
        match (self.lookup)(key) {
            None => {
                violations.push(Violation { variable: key, problem: Problem::Missing });
                None
            }
            Some(v) if v.trim().is_empty() => {
                violations.push(Violation { variable: key, problem: Problem::Empty });
                None
            }
            Some(v) => Some(v),
        }
    }
}

fn not_allowed(variable: &'static str, value: String, allowed: &'static [&'static str]) -> Violation {
    Violation { variable, problem: Problem::NotAllowed { value, allowed } }
}

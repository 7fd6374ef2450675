use std::fmt;
use thiserror::Error;

/// What is wrong with a single environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    Missing,
    Empty,
    NotAllowed { value: String, allowed: &'static [&'static str] },
    NotAPort { value: String },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Missing => write!(f, "is required but not set"),
            Problem::Empty => write!(f, "must not be empty"),
            Problem::NotAllowed { value, allowed } => {
                write!(f, "'{}' is not one of {}", value, allowed.join("|"))
            }
            Problem::NotAPort { value } => write!(f, "'{}' is not a valid port number", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub variable: &'static str,
    pub problem: Problem,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.variable, self.problem)
    }
}

/// Fatal startup error: the environment does not describe a runnable service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid environment configuration ({}): {}", variable_names(.violations), describe(.violations))]
pub struct ConfigurationError {
    pub violations: Vec<Violation>,
}

impl ConfigurationError {
    pub fn variables(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.variable).collect()
    }

    pub fn mentions(&self, variable: &str) -> bool {
        self.violations.iter().any(|v| v.variable == variable)
    }
}

fn variable_names(violations: &[Violation]) -> String {
    violations.iter().map(|v| v.variable).collect::<Vec<_>>().join(", ")
}

fn describe(violations: &[Violation]) -> String {
    violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
}

/// Recoverable failure inside a single processing tick.
#[derive(Debug, Error)]
pub enum ProcessingTickError {
    #[error("work unit failed: {0}")]
    Work(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_lists_every_variable() {
        let err = ConfigurationError {
            violations: vec![
                Violation { variable: "APP_NAME", problem: Problem::Empty },
                Violation {
                    variable: "LOG_LEVEL",
                    problem: Problem::NotAllowed { value: "loud".to_string(), allowed: &["error", "warn"] },
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("(APP_NAME, LOG_LEVEL)"));
        assert!(message.contains("APP_NAME must not be empty"));
        assert!(message.contains("'loud' is not one of error|warn"));
        assert!(err.mentions("LOG_LEVEL"));
        assert!(!err.mentions("PORT"));
    }
}

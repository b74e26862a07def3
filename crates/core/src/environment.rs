//! Runtime environment (production vs. everything else).

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Deployment environment.
///
/// Controls what the client is told about unexpected failures; it never
/// controls whether they are logged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl FromStr for Environment {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "test" => Ok(Environment::Development),
            other => Err(DomainError::validation(format!(
                "unknown environment '{other}' (expected production or development)"
            ))),
        }
    }
}

impl core::fmt::Display for Environment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Environment::Production => f.write_str("production"),
            Environment::Development => f.write_str("development"),
        }
    }
}

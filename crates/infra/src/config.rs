//! Process configuration read from environment variables at startup.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use chrono::Duration;
use thiserror::Error;

use crm_core::Environment;
use crm_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
pub const DEFAULT_JWT_TTL_SECS: i64 = 86_400;
pub const DEFAULT_BCRYPT_COST: u32 = 10;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: `{value}` ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("JWT_SECRET must be set when CRM_ENV=production")]
    MissingJwtSecret,

    #[error("failed to read {path}: {reason}")]
    DotEnv { path: String, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory adapters.
    pub database_url: Option<String>,
    pub bcrypt_cost: u32,
    pub log_format: LogFormat,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl", &self.jwt_ttl)
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// True when no `JWT_SECRET` was supplied and the dev fallback is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Process environment first, then the dotenv file at `path`. A missing
    /// file is not an error.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_lookup_and_file(|key| std::env::var(key).ok(), path)
    }

    pub fn from_lookup_and_file(
        lookup: impl Fn(&str) -> Option<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let file = read_dotenv(path.as_ref())?;
        Self::from_lookup(|key| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file.get(key).cloned())
        })
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match var("CRM_ENV") {
            Some(raw) => raw
                .parse::<Environment>()
                .map_err(|e| ConfigError::invalid("CRM_ENV", &raw, e))?,
            None => Environment::default(),
        };

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if environment.is_production() => return Err(ConfigError::MissingJwtSecret),
            None => DEV_JWT_SECRET.to_string(),
        };

        let jwt_ttl = match var("JWT_TTL_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| ConfigError::invalid("JWT_TTL_SECS", &raw, e))?;
                if secs <= 0 {
                    return Err(ConfigError::invalid("JWT_TTL_SECS", &raw, "must be positive"));
                }
                Duration::seconds(secs)
            }
            None => Duration::seconds(DEFAULT_JWT_TTL_SECS),
        };

        let bind_raw = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", &bind_raw, e))?;

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(raw) => {
                let cost = raw
                    .trim()
                    .parse::<u32>()
                    .map_err(|e| ConfigError::invalid("BCRYPT_COST", &raw, e))?;
                if !(4..=31).contains(&cost) {
                    return Err(ConfigError::invalid("BCRYPT_COST", &raw, "must be between 4 and 31"));
                }
                cost
            }
            None => DEFAULT_BCRYPT_COST,
        };

        let log_format = match var("LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid("LOG_FORMAT", &raw, e))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            environment,
            jwt_secret,
            jwt_ttl,
            bind_addr,
            database_url: var("DATABASE_URL"),
            bcrypt_cost,
            log_format,
        })
    }
}

fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let dotenv_error = |reason: &dyn core::fmt::Display| ConfigError::DotEnv {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    let entries = match dotenv::from_path_iter(path) {
        Ok(entries) => entries,
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(HashMap::new());
        }
        Err(e) => return Err(dotenv_error(&e)),
    };

    entries
        .map(|entry| entry.map_err(|e| dotenv_error(&e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_in_development() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert!(cfg.uses_dev_secret());
        assert_eq!(cfg.jwt_ttl, Duration::days(1));
        assert_eq!(cfg.bind_addr.port(), 3001);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.bcrypt_cost, 10);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn production_requires_a_secret() {
        assert_eq!(
            config(&[("CRM_ENV", "production")]).unwrap_err(),
            ConfigError::MissingJwtSecret
        );
        assert_eq!(
            config(&[("CRM_ENV", "production"), ("JWT_SECRET", "  ")]).unwrap_err(),
            ConfigError::MissingJwtSecret
        );

        let cfg = config(&[("CRM_ENV", "production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert!(cfg.environment.is_production());
        assert!(!format!("{cfg:?}").contains("s3cret"));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        for (var, value) in [
            ("CRM_ENV", "staging"),
            ("JWT_TTL_SECS", "0"),
            ("JWT_TTL_SECS", "soon"),
            ("BIND_ADDR", "localhost"),
            ("BCRYPT_COST", "3"),
            ("LOG_FORMAT", "xml"),
        ] {
            match config(&[(var, value)]) {
                Err(ConfigError::Invalid { var: got, .. }) => assert_eq!(got, var),
                other => panic!("{var}={value} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn overrides_are_honoured() {
        let cfg = config(&[
            ("JWT_TTL_SECS", "60"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DATABASE_URL", "postgres://localhost/crm"),
            ("BCRYPT_COST", "4"),
            ("LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        assert_eq!(cfg.jwt_ttl, Duration::seconds(60));
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/crm"));
        assert_eq!(cfg.bcrypt_cost, 4);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    fn dotenv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn dotenv_file_fills_unset_variables() {
        let file = dotenv_file("JWT_SECRET=from-file\nBCRYPT_COST=5\n# comment\nLOG_FORMAT=pretty\n");
        let env: HashMap<&str, &str> = [("BCRYPT_COST", "6"), ("LOG_FORMAT", "")].into();

        let cfg = AppConfig::from_lookup_and_file(|key| env.get(key).map(|v| v.to_string()), file.path())
            .unwrap();
        assert_eq!(cfg.jwt_secret, "from-file");
        assert_eq!(cfg.bcrypt_cost, 6);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn missing_dotenv_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::from_lookup_and_file(|_| None, dir.path().join(".env")).unwrap();
        assert!(cfg.uses_dev_secret());
    }

    #[test]
    fn malformed_dotenv_file_is_reported() {
        let file = dotenv_file("JWT_SECRET='unterminated\n");
        let err = AppConfig::from_lookup_and_file(|_| None, file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::DotEnv { .. }), "{err:?}");
    }
}

use std::{env, fmt, path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::util::is_valid_email;

/// The mode the dashboard runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "expected development, test or production, got {other}"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Process-wide settings, loaded once at startup
#[derive(Clone)]
pub struct Config {
    pub environment: Environment,
    /// Path to the SQLite database file shared with the bot
    pub database_path: String,
    /// The first secret signs sessions, all of them are accepted when verifying
    pub session_secrets: Vec<String>,
    pub admin_email: String,
    pub admin_password: String,
    /// Directory containing the `.mp3` sounds
    pub sounds_path: PathBuf,
    /// Maximum size of a single uploaded sound, in bytes
    pub max_upload_size: u64,
    pub port: u16,
    /// Where the dashboard is reachable, used to build registration links
    pub public_url: String,
}

impl Config {
    pub const DEFAULT_SOUNDS_PATH: &'static str = "sounds";
    pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 3_000_000;
    pub const DEFAULT_PORT: u16 = 3000;

    /// Loads the configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the configuration using the supplied variable lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let environment = match var("MEMEMACHINE_ENV") {
            Some(value) => parse("MEMEMACHINE_ENV", &value)?,
            None => Environment::Development,
        };

        let session_secrets: Vec<_> = required("SESSION_SECRET")?
            .split('.')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if session_secrets.is_empty() {
            return Err(ConfigError::Invalid {
                var: "SESSION_SECRET",
                reason: "at least one secret is required".to_string(),
            });
        }

        let admin_email = required("ADMIN_EMAIL")?;
        if !is_valid_email(&admin_email) {
            return Err(ConfigError::Invalid {
                var: "ADMIN_EMAIL",
                reason: format!("{admin_email} is not an email"),
            });
        }

        let port = match var("MEMEMACHINE_PORT") {
            Some(value) => parse("MEMEMACHINE_PORT", &value)?,
            None => Self::DEFAULT_PORT,
        };

        let max_upload_size = match var("MAX_UPLOAD_SIZE") {
            Some(value) => parse("MAX_UPLOAD_SIZE", &value)?,
            None => Self::DEFAULT_MAX_UPLOAD_SIZE,
        };

        Ok(Self {
            environment,
            database_path: required("DATABASE_PATH")?,
            session_secrets,
            admin_email,
            admin_password: required("ADMIN_PASSWORD")?,
            sounds_path: var("SOUNDS_PATH")
                .unwrap_or_else(|| Self::DEFAULT_SOUNDS_PATH.to_string())
                .into(),
            max_upload_size,
            port,
            public_url: var("PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{port}")),
        })
    }

    /// Cookies are only marked secure in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("database_path", &self.database_path)
            .field("session_secrets", &"<redacted>")
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .field("sounds_path", &self.sounds_path)
            .field("max_upload_size", &self.max_upload_size)
            .field("port", &self.port)
            .field("public_url", &self.public_url)
            .finish()
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::{Config, ConfigError, Environment};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |key| map.get(key).cloned()
    }

    const MINIMAL: [(&str, &str); 4] = [
        ("DATABASE_PATH", "memes.db"),
        ("SESSION_SECRET", "s3cr3t"),
        ("ADMIN_EMAIL", "admin@example.com"),
        ("ADMIN_PASSWORD", "hunter22"),
    ];

    #[test]
    fn defaults_are_applied() {
        let config = Config::from_lookup(lookup(&MINIMAL)).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.sounds_path.to_str(), Some("sounds"));
        assert_eq!(config.max_upload_size, Config::DEFAULT_MAX_UPLOAD_SIZE);
        assert_eq!(config.port, 3000);
        assert_eq!(config.public_url, "http://localhost:3000");
        assert!(!config.is_production());
    }

    #[test]
    fn session_secrets_are_split_on_dots() {
        let mut pairs = MINIMAL.to_vec();
        pairs[1] = ("SESSION_SECRET", " new . old ");

        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.session_secrets, vec!["new", "old"]);
    }

    #[test]
    fn empty_values_count_as_missing() {
        let mut pairs = MINIMAL.to_vec();
        pairs[0] = ("DATABASE_PATH", "");

        let result = Config::from_lookup(lookup(&pairs));
        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_PATH"))));
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("MEMEMACHINE_ENV", "staging"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid {
                var: "MEMEMACHINE_ENV",
                ..
            })
        ));

        let mut pairs = MINIMAL.to_vec();
        pairs[2] = ("ADMIN_EMAIL", "admin");
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid {
                var: "ADMIN_EMAIL",
                ..
            })
        ));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = Config::from_lookup(lookup(&MINIMAL)).unwrap();
        let debug = format!("{config:?}");

        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("hunter22"));
    }
}

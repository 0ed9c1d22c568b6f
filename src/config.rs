use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_SIGNED_URL_TTL: &str = "60";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    Missing(&'static str),

    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Could not determine a data directory, set STITCH_DATA_DIR")]
    NoDataDir,
}

/// Process configuration, read once from the environment at start.
#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub port: u16,
    /// Lifetime of pattern download links, in seconds
    pub signed_url_ttl: u64,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = match lookup("STITCH_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_local_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("stitch"),
        };

        Ok(Self {
            supabase_url: required(&lookup, "SUPABASE_URL")?,
            supabase_anon_key: required(&lookup, "SUPABASE_ANON_KEY")?,
            supabase_service_key: required(&lookup, "SUPABASE_SERVICE_ROLE_KEY")?,
            port: try_load(&lookup, "STITCH_PORT", DEFAULT_PORT)?,
            signed_url_ttl: try_load(&lookup, "STITCH_SIGNED_URL_TTL", DEFAULT_SIGNED_URL_TTL)?,
            data_dir,
        })
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            warn!("Environment variable {key} not found");
            ConfigError::Missing(key)
        })
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        debug!("{key} not set, using default: {default}");
        default.to_string()
    });

    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("SUPABASE_URL", "https://demo.supabase.co"),
        ("SUPABASE_ANON_KEY", "anon"),
        ("SUPABASE_SERVICE_ROLE_KEY", "service"),
        ("STITCH_DATA_DIR", "/tmp/stitch-config-test"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.signed_url_ttl, 60);
        assert_eq!(
            config.session_path(),
            PathBuf::from("/tmp/stitch-config-test/session.json")
        );
    }

    #[test]
    fn test_missing_required_variable() {
        let result = Config::from_lookup(lookup_from(&REQUIRED[1..]));

        match result {
            Err(ConfigError::Missing("SUPABASE_URL")) => {}
            other => panic!("Expected Missing(SUPABASE_URL), got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("STITCH_PORT", "eighty"));

        match Config::from_lookup(lookup_from(&pairs)) {
            Err(ConfigError::Invalid { key: "STITCH_PORT", value, .. }) => {
                assert_eq!(value, "eighty");
            }
            other => panic!("Expected Invalid port, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("STITCH_PORT", "8080"));
        pairs.push(("STITCH_SIGNED_URL_TTL", "300"));

        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.signed_url_ttl, 300);
    }
}

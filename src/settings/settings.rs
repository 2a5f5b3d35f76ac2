use crate::logger::LogConfig;
use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const PLACEHOLDER_SECRET: &str = "your-super-secret-jwt-key-here-change-in-production";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub jwt: Jwt,
    pub store: Store,
    #[serde(default)]
    pub lock: Lock,
    #[serde(default)]
    pub log: Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunLevel {
    Local,
    Stage,
    Production,
}

impl RunLevel {
    pub fn default_filter(&self) -> &'static str {
        match self {
            RunLevel::Local => "debug",
            RunLevel::Stage => "info",
            RunLevel::Production => "error",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    pub name: String,
    pub version: String,
    pub run_level: RunLevel,
}

#[derive(Deserialize)]
pub struct Jwt {
    pub secret: String,
    pub access_ttl_secs: u64,
    pub issuer: String,
}

// keeps the secret out of startup logs
impl std::fmt::Debug for Jwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwt")
            .field("secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "redis"
    pub redis_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Lock {
    #[serde(default = "default_min_refresh_interval_ms")]
    pub min_refresh_interval_ms: u64,
    #[serde(default = "default_release_timeout_ms")]
    pub release_timeout_ms: u64,
}

impl Default for Lock {
    fn default() -> Self {
        Self {
            min_refresh_interval_ms: default_min_refresh_interval_ms(),
            release_timeout_ms: default_release_timeout_ms(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Log {
    pub filter: Option<String>,
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

fn default_min_refresh_interval_ms() -> u64 {
    1000
}

fn default_release_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

fn invalid(key: &'static str, reason: &'static str) -> SettingsError {
    SettingsError::Invalid { key, reason }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.http.host.parse::<IpAddr>().is_err() {
            return Err(invalid("http.host", "must be an IP address"));
        }
        if self.http.port == 0 {
            return Err(invalid("http.port", "must be between 1 and 65535"));
        }
        if self.http.shutdown_timeout_secs == 0 {
            return Err(invalid("http.shutdown_timeout_secs", "must be positive"));
        }
        if self.http.name.trim().is_empty() {
            return Err(invalid("http.name", "must not be empty"));
        }

        if self.jwt.secret.is_empty() {
            return Err(invalid("jwt.secret", "must not be empty"));
        }
        if self.jwt.secret == PLACEHOLDER_SECRET {
            return Err(invalid("jwt.secret", "still set to the placeholder value"));
        }
        if self.jwt.access_ttl_secs == 0 {
            return Err(invalid("jwt.access_ttl_secs", "must be positive"));
        }
        if self.jwt.issuer.trim().is_empty() {
            return Err(invalid("jwt.issuer", "must not be empty"));
        }

        match self.store.backend.as_str() {
            "memory" => {}
            "redis" => {
                if self.store.redis_url.as_deref().is_none_or(str::is_empty) {
                    return Err(invalid("store.redis_url", "required for the redis backend"));
                }
            }
            _ => return Err(invalid("store.backend", "must be `memory` or `redis`")),
        }

        if self.lock.min_refresh_interval_ms == 0 {
            return Err(invalid("lock.min_refresh_interval_ms", "must be positive"));
        }
        if self.lock.release_timeout_ms == 0 {
            return Err(invalid("lock.release_timeout_ms", "must be positive"));
        }

        Ok(())
    }

    pub fn address(&self) -> Result<SocketAddr> {
        let host: IpAddr = self.http.host.parse()?;
        Ok(SocketAddr::new(host, self.http.port))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.http.shutdown_timeout_secs)
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt.access_ttl_secs)
    }

    pub fn log_config(&self) -> LogConfig {
        let filter = match self.log.filter.as_deref() {
            Some(filter) if !filter.trim().is_empty() => filter.to_string(),
            _ => self.http.run_level.default_filter().to_string(),
        };
        LogConfig { filter }
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Loads the TOML file, then overlays `KEEL__SECTION__KEY` environment variables.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix("KEEL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const SAMPLE: &str = r#"
        [http]
        host = "127.0.0.1"
        port = 8080
        name = "orders"
        version = "1.2.0"
        run_level = "stage"

        [jwt]
        secret = "test-secret"
        access_ttl_secs = 900
        issuer = "keel.test"

        [store]
        backend = "memory"
    "#;

    fn sample() -> Settings {
        Config::builder()
            .add_source(File::from_str(SAMPLE, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let settings = sample();
        assert_eq!(settings.http.shutdown_timeout_secs, 5);
        assert_eq!(settings.lock.min_refresh_interval_ms, 1000);
        assert_eq!(settings.lock.release_timeout_ms, 5000);
        assert!(settings.log.filter.is_none());
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.address().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn run_level_decides_filter_unless_overridden() {
        let mut settings = sample();
        assert_eq!(settings.log_config().filter, "info");

        settings.http.run_level = RunLevel::Production;
        assert_eq!(settings.log_config().filter, "error");

        settings.log.filter = Some("keel=trace".to_string());
        assert_eq!(settings.log_config().filter, "keel=trace");
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        let mut settings = sample();
        settings.jwt.secret = PLACEHOLDER_SECRET.to_string();
        assert_eq!(
            settings.validate(),
            Err(invalid("jwt.secret", "still set to the placeholder value"))
        );
    }

    #[test]
    fn invalid_values_name_their_key() {
        let mut settings = sample();
        settings.jwt.access_ttl_secs = 0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { key: "jwt.access_ttl_secs", .. })
        ));

        let mut settings = sample();
        settings.http.host = "localhost:80".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { key: "http.host", .. })
        ));

        let mut settings = sample();
        settings.store.backend = "redis".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { key: "store.redis_url", .. })
        ));

        settings.store.backend = "etcd".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { key: "store.backend", .. })
        ));
    }
}

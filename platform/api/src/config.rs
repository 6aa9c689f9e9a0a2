use std::net::SocketAddr;

use anyhow::Result;

use crate::logging;

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
/// The API is the backend for the Cityworks construction-work content system.
pub struct AppConfig {
    /// The path to the config file
    pub config_file: Option<String>,

    /// Name of this instance
    pub name: String,

    /// The logging config
    pub logging: LoggingConfig,

    /// API config
    pub api: ApiConfig,

    /// Database config
    pub database: DatabaseConfig,

    /// Push provider config
    pub push: PushConfig,

    /// Geocoder config
    pub geocoder: GeocoderConfig,

    /// JWT config for the redaction surface
    pub jwt: JwtConfig,

    /// Device token config
    pub device_auth: DeviceAuthConfig,

    /// Ingestion surface config
    pub ingest: IngestConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            name: "cityworks-api".to_string(),
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
            database: DatabaseConfig::default(),
            push: PushConfig::default(),
            geocoder: GeocoderConfig::default(),
            jwt: JwtConfig::default(),
            device_auth: DeviceAuthConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl AppConfig {
    /// Layered load: defaults, then an optional config file, then environment
    /// variables prefixed with `CW` (e.g. `CW_DATABASE__URI`).
    pub fn parse() -> Result<Self> {
        let file = std::env::var("CW_CONFIG_FILE").ok();

        let mut builder = config::Config::builder();
        if let Some(file) = &file {
            builder = builder.add_source(config::File::with_name(file));
        }

        let mut config: Self = builder
            .add_source(config::Environment::with_prefix("CW").separator("__"))
            .build()?
            .try_deserialize()?;

        config.config_file = file;

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// The log level to use, this is a tracing env filter
    pub level: String,

    /// What logging mode we should use
    pub mode: logging::Mode,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            mode: logging::Mode::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address for the API
    pub bind_address: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "[::]:4000".parse().expect("failed to parse bind address"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// The database URL to use
    pub uri: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: "postgres://root@localhost:5432/cityworks_dev".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// The multicast-send endpoint of the push provider
    pub url: String,

    /// The server key presented to the push provider
    pub server_key: String,

    /// Maximum number of device tokens per multicast request
    pub batch_size: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: "https://fcm.googleapis.com/fcm/send".to_string(),
            server_key: String::new(),
            batch_size: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// The geocoder search endpoint
    pub url: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: "https://nominatim.openstreetmap.org/search".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// JWT secret
    pub secret: String,

    /// JWT issuer
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "cityworks".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct DeviceAuthConfig {
    /// Shared secret for the encrypted device-identity header
    pub secret: String,
}

impl Default for DeviceAuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Shared secret for the ingestion and admin surface
    pub secret: String,

    /// E-mail domain project managers must belong to
    pub manager_email_domain: String,

    /// How often the stale-device prune runs
    pub device_prune_interval_secs: u64,

    /// Devices unseen for this many days are pruned
    pub device_retention_days: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            manager_email_domain: "cityworks.dev".to_string(),
            device_prune_interval_secs: 24 * 60 * 60,
            device_retention_days: 365,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.push.batch_size, 500);
        assert_eq!(config.ingest.device_retention_days, 365);
        assert_eq!(config.api.bind_address.port(), 4000);
        assert_eq!(config.logging.level, "info");
    }
}

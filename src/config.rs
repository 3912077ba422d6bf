//! Configuration management for the Puca MCP Server
//!
//! Handles upstream service URLs, server binding and logging settings, all
//! read from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, PucaError, Result};

/// Configuration for the Puca MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub host: String,

    /// Port the HTTP server listens on
    pub port: u16,

    /// Base URL of the Nominatim geocoding service
    pub nominatim_base_url: String,

    /// Base URL of the OSRM route service, including profile
    pub osrm_base_url: String,

    /// Overpass API interpreter endpoint
    pub overpass_base_url: String,

    /// Default search radius in metres
    pub default_distance: u32,

    /// User-Agent sent to Nominatim (required by its usage policy)
    pub user_agent: String,

    /// Minimum delay between two Nominatim requests
    pub nominatim_min_interval: Duration,

    /// Server-side timeout embedded in Overpass queries
    pub overpass_timeout_secs: u64,

    /// Timeout applied to every upstream HTTP request
    pub http_timeout: Duration,

    /// Logging settings
    pub log: LogConfig,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level applied to this crate's targets
    pub level: String,

    /// "stdout" or a file path
    pub output: String,

    /// Output format
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse a log format, falling back to text for unknown values
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            output: "stdout".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Create a configuration from environment variables, using defaults for
    /// anything unset
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        let default_distance = match lookup("DISTANCE") {
            Some(raw) => parse_distance(&raw)?,
            None => defaults.default_distance,
        };

        Ok(Self {
            host: string("HOST", defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            nominatim_base_url: trim_url(string("NOMINATIM_BASE_URL", defaults.nominatim_base_url)),
            osrm_base_url: trim_url(string("OSRM_BASE_URL", defaults.osrm_base_url)),
            overpass_base_url: trim_url(string("OVERPASS_BASE_URL", defaults.overpass_base_url)),
            default_distance,
            user_agent: string("NOMINATIM_USER_AGENT", defaults.user_agent),
            nominatim_min_interval: Duration::from_millis(parse_var(
                &lookup,
                "NOMINATIM_MIN_INTERVAL_MS",
                defaults.nominatim_min_interval.as_millis() as u64,
            )?),
            overpass_timeout_secs: parse_var(
                &lookup,
                "OVERPASS_TIMEOUT_SECS",
                defaults.overpass_timeout_secs,
            )?,
            http_timeout: Duration::from_secs(parse_var(
                &lookup,
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
            log: LogConfig {
                level: string("LOG_LEVEL", defaults.log.level).to_lowercase(),
                output: string("LOG_TO", defaults.log.output),
                format: lookup("LOG_FORMAT")
                    .map(|v| LogFormat::parse(&v))
                    .unwrap_or(defaults.log.format),
            },
        })
    }

    /// Socket address string for the HTTP server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            nominatim_base_url: osm::NOMINATIM_BASE_URL.to_string(),
            osrm_base_url: osm::OSRM_BASE_URL.to_string(),
            overpass_base_url: osm::OVERPASS_BASE_URL.to_string(),
            default_distance: osm::DEFAULT_DISTANCE,
            user_agent: format!("Puca-Mcp-Server/{}", env!("CARGO_PKG_VERSION")),
            nominatim_min_interval: Duration::from_millis(1000),
            overpass_timeout_secs: 25,
            http_timeout: Duration::from_secs(30),
            log: LogConfig::default(),
        }
    }
}

fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            PucaError::Config(ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw,
            })
        }),
        None => Ok(default),
    }
}

/// Accepts whole or fractional metres ("100", "100.0") and rounds.
fn parse_distance(raw: &str) -> Result<u32> {
    let invalid = || {
        PucaError::Config(ConfigError::InvalidValue {
            var: "DISTANCE".to_string(),
            value: raw.to_string(),
        })
    };
    let metres: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !metres.is_finite() || metres < 1.0 || metres > u32::MAX as f64 {
        return Err(invalid());
    }
    Ok(metres.round() as u32)
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// OpenStreetMap service constants
pub mod osm {
    /// Public Nominatim instance
    pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

    /// Public OSRM demo server, driving profile
    pub const OSRM_BASE_URL: &str = "https://router.project-osrm.org/route/v1/driving";

    /// Main Overpass API instance
    pub const OVERPASS_BASE_URL: &str = "https://overpass-api.de/api/interpreter";

    /// Base URL for links to OSM elements
    pub const OSM_BROWSE_URL: &str = "https://openstreetmap.org";

    /// Default search radius in metres
    pub const DEFAULT_DISTANCE: u32 = 100;
}

//! Error types for the Puca MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Puca MCP Server
#[derive(Error, Debug)]
pub enum PucaError {
    /// Nominatim geocoding errors
    #[error("Geocoding error: {0}")]
    Geocoding(#[from] GeocodingError),

    /// OSRM routing errors
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Overpass API errors
    #[error("Overpass error: {0}")]
    Overpass(#[from] OverpassError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Nominatim geocoding errors
#[derive(Error, Debug)]
pub enum GeocodingError {
    #[error("Invalid coordinate value in response: {value}")]
    InvalidCoordinate { value: String },
}

/// OSRM routing errors
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("No route found ({code})")]
    NoRoute { code: String },

    #[error("OSRM request failed: {message}")]
    RequestFailed { message: String },
}

/// Overpass API errors
#[derive(Error, Debug)]
pub enum OverpassError {
    #[error("Overpass request failed: {message}")]
    RequestFailed { message: String },

    #[error("Overpass runtime error: {remark}")]
    Runtime { remark: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid coordinates: {lat}, {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Unknown feature: {name}")]
    UnknownFeature { name: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid tool arguments: {message}")]
    InvalidArguments { message: String },

    #[error("Transport error: {message}")]
    TransportError { message: String },
}

/// Result type alias for Puca MCP operations
pub type Result<T> = std::result::Result<T, PucaError>;

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let name = errors
            .field_errors()
            .keys()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        ValidationError::InvalidParameter {
            name,
            message: errors.to_string(),
        }
    }
}

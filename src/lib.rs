//! Puca MCP Server Library
//!
//! A Model Context Protocol (MCP) server answering location questions from
//! OpenStreetMap data. Provides tools for geocoding, route distances and
//! nearby-feature lookups via Nominatim, OSRM and the Overpass API.

pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod osm;

pub use config::Config;
pub use error::{PucaError, Result};

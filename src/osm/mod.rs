//! OpenStreetMap module
//!
//! Contains types, geometry, the feature catalog and clients for the
//! Nominatim, OSRM and Overpass services.

pub mod client;
pub mod features;
pub mod format;
pub mod geo;
pub mod nominatim;
pub mod osrm;
pub mod overpass;
pub mod types;

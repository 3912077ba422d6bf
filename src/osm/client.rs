//! OpenStreetMap client
//!
//! High-level client combining Nominatim, OSRM and Overpass operations.

use crate::config::Config;
use crate::error::{Result, ValidationError};
use crate::osm::features::Feature;
use crate::osm::geo::{bounding_box, validate_coordinates};
use crate::osm::nominatim::{Geocoder, Throttle};
use crate::osm::osrm::Router;
use crate::osm::overpass::OverpassApi;
use crate::osm::types::{BoundingBox, Coordinates, OverpassResult};

/// OpenStreetMap services client
pub struct OsmClient {
    /// HTTP client shared by all upstream services
    http_client: reqwest::Client,

    nominatim_base_url: String,
    osrm_base_url: String,
    overpass_base_url: String,
    user_agent: String,
    overpass_timeout_secs: u64,

    /// Nominatim rate limit
    throttle: Throttle,
}

/// A geocoded address and the search area around it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    pub center: Coordinates,
    pub bbox: BoundingBox,
}

impl OsmClient {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            http_client,
            nominatim_base_url: config.nominatim_base_url.clone(),
            osrm_base_url: config.osrm_base_url.clone(),
            overpass_base_url: config.overpass_base_url.clone(),
            user_agent: config.user_agent.clone(),
            overpass_timeout_secs: config.overpass_timeout_secs,
            throttle: Throttle::new(config.nominatim_min_interval),
        })
    }

    fn geocoder(&self) -> Geocoder<'_> {
        Geocoder::new(
            &self.http_client,
            &self.nominatim_base_url,
            &self.user_agent,
            &self.throttle,
        )
    }

    fn router(&self) -> Router<'_> {
        Router::new(&self.http_client, &self.osrm_base_url)
    }

    fn overpass(&self) -> OverpassApi<'_> {
        OverpassApi::new(
            &self.http_client,
            &self.overpass_base_url,
            self.overpass_timeout_secs,
        )
    }

    // ==================== Geocoding ====================

    /// Geocode an address. Results outside the valid coordinate ranges are
    /// treated as not found.
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
        let coords = self.geocoder().search(address).await?;
        Ok(coords.filter(|c| validate_coordinates(c.lat, c.lon)))
    }

    /// Find an address for a point
    pub async fn reverse_geocode(&self, coords: Coordinates) -> Result<Option<String>> {
        ensure_valid(coords)?;
        self.geocoder().reverse(coords).await
    }

    /// Geocode an address and build a search box of `distance` metres around it
    pub async fn search_area(&self, address: &str, distance: u32) -> Result<Option<SearchArea>> {
        Ok(self.geocode(address).await?.map(|center| SearchArea {
            center,
            bbox: bounding_box(center, distance as f64),
        }))
    }

    // ==================== Routing ====================

    /// Route distance in metres between two points
    pub async fn route_distance(&self, from: Coordinates, to: Coordinates) -> Result<f64> {
        ensure_valid(from)?;
        ensure_valid(to)?;
        self.router().distance(from, to).await
    }

    // ==================== Overpass ====================

    /// Run a raw selector inside a bounding box
    pub async fn query(&self, selector: &str, bbox: &BoundingBox) -> Result<OverpassResult> {
        self.overpass().query(selector, bbox).await
    }

    /// Find catalog features inside a bounding box
    pub async fn find_features(&self, feature: Feature, bbox: &BoundingBox) -> Result<OverpassResult> {
        tracing::debug!(%feature, "Searching for feature");
        self.query(feature.selector(), bbox).await
    }

    /// Name of the building at a point, if it is named in OSM
    pub async fn building_name(&self, coords: Coordinates) -> Result<Option<String>> {
        self.overpass().building_name(coords).await
    }
}

fn ensure_valid(coords: Coordinates) -> Result<()> {
    if validate_coordinates(coords.lat, coords.lon) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinates {
            lat: coords.lat,
            lon: coords.lon,
        }
        .into())
    }
}

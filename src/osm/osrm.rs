//! OSRM route distances

use crate::error::{PucaError, Result, RoutingError};
use crate::osm::types::{Coordinates, OsrmRouteResponse};

/// Router for OSRM operations
pub struct Router<'a> {
    client: &'a reqwest::Client,
    base_url: &'a str,
}

impl<'a> Router<'a> {
    /// Create a new router
    pub fn new(client: &'a reqwest::Client, base_url: &'a str) -> Self {
        Self { client, base_url }
    }

    /// Route URL. OSRM takes `lon,lat` pairs.
    pub fn route_url(&self, from: Coordinates, to: Coordinates) -> String {
        format!(
            "{}/{},{};{},{}?overview=false",
            self.base_url, from.lon, from.lat, to.lon, to.lat
        )
    }

    /// Distance in metres of the best route between two points
    pub async fn distance(&self, from: Coordinates, to: Coordinates) -> Result<f64> {
        let url = self.route_url(from, to);
        tracing::debug!(%url, "Requesting OSRM route");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PucaError::Routing(RoutingError::RequestFailed {
                message: format!("Failed to get route ({}): {}", status, text),
            }));
        }

        let route: OsrmRouteResponse = response.json().await?;
        if route.code != "Ok" {
            return Err(PucaError::Routing(RoutingError::NoRoute {
                code: route.message.unwrap_or(route.code),
            }));
        }

        route
            .routes
            .first()
            .map(|r| r.distance)
            .ok_or_else(|| {
                PucaError::Routing(RoutingError::NoRoute {
                    code: "empty route list".to_string(),
                })
            })
    }
}

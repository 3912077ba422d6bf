//! Nominatim geocoding
//!
//! Forward (address to coordinates) and reverse (coordinates to address)
//! lookups against a Nominatim instance.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{GeocodingError, PucaError, Result};
use crate::osm::types::{Coordinates, NominatimPlace, NominatimReverse};

/// Spaces out requests so a single server never exceeds the Nominatim usage
/// policy.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Wait until the next request is allowed
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Geocoder for Nominatim operations
pub struct Geocoder<'a> {
    client: &'a reqwest::Client,
    base_url: &'a str,
    user_agent: &'a str,
    throttle: &'a Throttle,
}

impl<'a> Geocoder<'a> {
    /// Create a new geocoder
    pub fn new(
        client: &'a reqwest::Client,
        base_url: &'a str,
        user_agent: &'a str,
        throttle: &'a Throttle,
    ) -> Self {
        Self {
            client,
            base_url,
            user_agent,
            throttle,
        }
    }

    /// Geocode an address into a latitude and longitude.
    ///
    /// Returns `Ok(None)` when Nominatim has no match or answers with a
    /// non-success status.
    pub async fn search(&self, address: &str) -> Result<Option<Coordinates>> {
        self.throttle.wait().await;

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .header(reqwest::header::USER_AGENT, self.user_agent)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                address,
                "Nominatim search returned an error status"
            );
            return Ok(None);
        }

        let places: Vec<NominatimPlace> = response.json().await?;
        tracing::debug!(address, results = places.len(), "Nominatim search");

        match places.into_iter().next() {
            Some(place) => Ok(Some(Coordinates::new(
                parse_coordinate(&place.lat)?,
                parse_coordinate(&place.lon)?,
            ))),
            None => Ok(None),
        }
    }

    /// Find an address for the provided coordinates
    pub async fn reverse(&self, coords: Coordinates) -> Result<Option<String>> {
        self.throttle.wait().await;

        let response = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .header(reqwest::header::USER_AGENT, self.user_agent)
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("extratags", "1".to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                lat = coords.lat,
                lon = coords.lon,
                "Nominatim reverse lookup returned an error status"
            );
            return Ok(None);
        }

        let reverse: NominatimReverse = response.json().await?;
        tracing::debug!(?reverse, "Reverse address lookup returned");

        if let Some(error) = reverse.error {
            tracing::debug!(error = %error, "Nominatim found nothing at location");
        }
        Ok(reverse.display_name)
    }
}

fn parse_coordinate(value: &str) -> Result<f64> {
    value.trim().parse().map_err(|_| {
        PucaError::Geocoding(GeocodingError::InvalidCoordinate {
            value: value.to_string(),
        })
    })
}

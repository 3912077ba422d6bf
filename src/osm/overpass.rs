//! Overpass API queries
//!
//! Builds bounding-box queries from tag selectors and parses the JSON
//! results into nodes, ways and relations.

use crate::error::{OverpassError, PucaError, Result};
use crate::osm::types::{BoundingBox, Coordinates, OverpassResponse, OverpassResult};

/// Radius in metres used to find the building a point sits in
pub const BUILDING_SEARCH_RADIUS: u32 = 10;

/// Build a query that runs `selector` inside `bbox`
pub fn bbox_query(selector: &str, bbox: &BoundingBox, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{}];\n(\n{} ({});\n);\nout body;\n",
        timeout_secs,
        selector.trim().trim_end_matches(';'),
        bbox.to_overpass()
    )
}

/// Build a query for named buildings around a point
pub fn building_query(coords: Coordinates, timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{}];\nway(around:{}, {}, {})[\"building\"][\"name\"];\nout center;\n",
        timeout_secs, BUILDING_SEARCH_RADIUS, coords.lat, coords.lon
    )
}

/// Client for the Overpass interpreter endpoint
pub struct OverpassApi<'a> {
    client: &'a reqwest::Client,
    endpoint: &'a str,
    timeout_secs: u64,
}

impl<'a> OverpassApi<'a> {
    /// Create a new Overpass client
    pub fn new(client: &'a reqwest::Client, endpoint: &'a str, timeout_secs: u64) -> Self {
        Self {
            client,
            endpoint,
            timeout_secs,
        }
    }

    /// Run a selector inside a bounding box
    pub async fn query(&self, selector: &str, bbox: &BoundingBox) -> Result<OverpassResult> {
        self.execute(&bbox_query(selector, bbox, self.timeout_secs))
            .await
    }

    /// Name of the nearest named building, if any
    pub async fn building_name(&self, coords: Coordinates) -> Result<Option<String>> {
        let result = self
            .execute(&building_query(coords, self.timeout_secs))
            .await?;

        Ok(result.ways.into_iter().find_map(|way| {
            tracing::debug!(id = way.id, "Overpass building result");
            way.tags.get("name").cloned()
        }))
    }

    /// Send a complete query to the interpreter
    pub async fn execute(&self, query: &str) -> Result<OverpassResult> {
        tracing::debug!(query, "Running Overpass query");

        let response = self
            .client
            .post(self.endpoint)
            .form(&[("data", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PucaError::Overpass(OverpassError::RequestFailed {
                message: format!("Query failed ({}): {}", status, text.trim()),
            }));
        }

        let body: OverpassResponse = response.json().await?;
        if let Some(remark) = body.remark.as_deref() {
            if remark.contains("runtime error") {
                return Err(PucaError::Overpass(OverpassError::Runtime {
                    remark: remark.to_string(),
                }));
            }
            tracing::debug!(remark, "Overpass remark");
        }

        let result = OverpassResult::from(body);
        tracing::debug!(
            nodes = result.nodes.len(),
            ways = result.ways.len(),
            relations = result.relations.len(),
            "Overpass query returned"
        );
        Ok(result)
    }
}

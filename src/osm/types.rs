//! OpenStreetMap type definitions
//!
//! These types mirror the Nominatim, OSRM and Overpass API responses and are
//! used for serialization/deserialization.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag map of an OSM element, ordered by key
pub type Tags = BTreeMap<String, String>;

/// A WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Search area for Overpass queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Northern edge
    pub top_left_lat: f64,

    /// Western edge
    pub top_left_lon: f64,

    /// Southern edge
    pub bottom_right_lat: f64,

    /// Eastern edge
    pub bottom_right_lon: f64,
}

impl BoundingBox {
    /// Overpass bbox filter body: `south, west, north, east`
    pub fn to_overpass(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.bottom_right_lat, self.top_left_lon, self.top_left_lat, self.bottom_right_lon
        )
    }
}

// ==================== Nominatim ====================

/// A `/search` result. Nominatim returns coordinates as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,

    #[serde(default)]
    pub display_name: Option<String>,
}

/// A `/reverse` result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NominatimReverse {
    #[serde(default)]
    pub display_name: Option<String>,

    /// Present when nothing was found at the location
    #[serde(default)]
    pub error: Option<String>,
}

// ==================== OSRM ====================

/// Response of the OSRM route service
#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRouteResponse {
    pub code: String,

    #[serde(default)]
    pub routes: Vec<OsrmRoute>,

    #[serde(default)]
    pub message: Option<String>,
}

/// A single route
#[derive(Debug, Clone, Deserialize)]
pub struct OsrmRoute {
    /// Metres
    pub distance: f64,

    /// Seconds
    #[serde(default)]
    pub duration: f64,
}

// ==================== Overpass ====================

/// Raw `[out:json]` response
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,

    /// Set when the query hit a runtime error (timeouts, memory limits)
    #[serde(default)]
    pub remark: Option<String>,
}

/// An element in an Overpass response
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,

    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Way {
    pub id: i64,

    #[serde(default)]
    pub nodes: Vec<i64>,

    /// Present with `out center`
    #[serde(default)]
    pub center: Option<Coordinates>,

    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relation {
    pub id: i64,

    #[serde(default)]
    pub members: Vec<Member>,

    #[serde(default)]
    pub tags: Tags,
}

/// Relation member
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "ref")]
    pub reference: i64,

    #[serde(default)]
    pub role: String,
}

/// Element kind, used for browse URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        };
        f.write_str(s)
    }
}

/// Overpass elements split by kind
#[derive(Debug, Clone, Default)]
pub struct OverpassResult {
    pub nodes: Vec<Node>,
    pub ways: Vec<Way>,
    pub relations: Vec<Relation>,
}

impl OverpassResult {
    /// Total number of nodes, ways and relations
    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len() + self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<OverpassResponse> for OverpassResult {
    fn from(response: OverpassResponse) -> Self {
        let mut result = OverpassResult::default();
        for element in response.elements {
            match element {
                Element::Node(node) => result.nodes.push(node),
                Element::Way(way) => result.ways.push(way),
                Element::Relation(relation) => result.relations.push(relation),
                Element::Other => {}
            }
        }
        result
    }
}

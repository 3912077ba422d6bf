//! MCP Tool definitions and handlers
//!
//! Defines all available tools and their implementations.

use std::collections::HashSet;
use std::sync::Arc;

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::{McpError, PucaError, Result, ValidationError};
use crate::mcp::types::{CallToolResult, Tool};
use crate::osm::client::{OsmClient, SearchArea};
use crate::osm::features::Feature;
use crate::osm::format::{
    describe_elements, elements, labelled_tag, osm_url, truncate_chars, Listing,
};
use crate::osm::geo::{bounding_box, density_per_sq_km, validate_coordinates};
use crate::osm::types::{Coordinates, ElementKind};

const ADDRESS_NOT_FOUND: &str = "Unable to get valid coordinates for the address requested. \
     Please check the spelling of the address.";

const INVALID_COORDINATES: &str = "Unable to get valid coordinates for this request.";

/// Length of the reverse-geocoded address shown per defibrillator
const SHORT_ADDRESS_CHARS: usize = 30;

/// Tool handler
pub struct ToolHandler {
    osm_client: Arc<OsmClient>,

    /// Search radius used when a tool call omits `distance`
    default_distance: u32,
}

// ==================== Tool Arguments ====================

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct AddressArgs {
    /// A valid address
    #[validate(length(min = 1))]
    address: String,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[validate(schema(function = "validate_point_args"))]
struct PointArgs {
    /// A valid latitude between -90 and 90
    lat: f64,
    /// A valid longitude between -180 and 180
    lon: f64,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct AreaArgs {
    /// A valid address
    #[validate(length(min = 1))]
    address: String,
    /// The number of metres radius around the address to check
    #[validate(range(min = 1))]
    distance: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct AddressPairArgs {
    /// A valid address
    #[validate(length(min = 1))]
    address1: String,
    /// A valid address
    #[validate(length(min = 1))]
    address2: String,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct CoordinatePairArgs {
    /// A valid latitude between -90 and 90
    lat1: f64,
    /// A valid longitude between -180 and 180
    lon1: f64,
    /// A valid latitude between -90 and 90
    lat2: f64,
    /// A valid longitude between -180 and 180
    lon2: f64,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct FeatureArgs {
    /// A valid address
    #[validate(length(min = 1))]
    address: String,
    /// The kind of map feature to look for
    feature: Feature,
    /// The number of metres radius around the address to check
    #[validate(range(min = 1))]
    distance: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema, Validate)]
struct OverpassArgs {
    /// Raw Overpass search terms, e.g. nwr["building"="school"]. The output
    /// format and bounding box are added automatically.
    #[validate(length(min = 1))]
    query: String,
    /// Latitude of the center point for the bounding box
    lat: f64,
    /// Longitude of the center point for the bounding box
    lon: f64,
    /// The radius in metres around the center point
    #[validate(range(min = 1))]
    distance: Option<u32>,
}

fn validate_point_args(args: &PointArgs) -> std::result::Result<(), validator::ValidationError> {
    if validate_coordinates(args.lat, args.lon) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_coordinates"))
    }
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(osm_client: Arc<OsmClient>, default_distance: u32) -> Self {
        Self {
            osm_client,
            default_distance,
        }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def::<AddressArgs>(
                "get_coordinates_for_address",
                "Get the coordinates of a given address",
            ),
            tool_def::<PointArgs>(
                "get_address_by_coordinates",
                "Get the address at a given latitude and longitude",
            ),
            tool_def::<AreaArgs>(
                "get_defibrillators",
                "Get locations of defibrillators/AEDs within a radius around a given address",
            ),
            tool_def::<AddressPairArgs>(
                "get_distance_between_addresses",
                "Get the distance in metres between two addresses. The addresses are converted to \
                 coordinates and OSRM is queried for the route distance between the points.",
            ),
            tool_def::<CoordinatePairArgs>(
                "get_distance_between_coords",
                "Get the distance in metres between two sets of coordinates. OSRM is queried for \
                 the route distance between the points.",
            ),
            tool_def::<AreaArgs>(
                "get_parking",
                "Get details about parking available within a radius around an address. This will \
                 only show parking that has been added by volunteers to OpenStreetMap.",
            ),
            tool_def::<AreaArgs>(
                "get_toilets",
                "Get details about public toilets available within a radius around an address. \
                 This will only show toilets that have been added by volunteers to OpenStreetMap.",
            ),
            tool_def::<AreaArgs>(
                "get_post_offices",
                "Get details about post offices available within a radius around an address. \
                 This will only show post offices that have been added by volunteers to OpenStreetMap.",
            ),
            tool_def::<AreaArgs>(
                "get_cafes",
                "Get locations of Coffee Shops/Cafes within a radius around an address",
            ),
            tool_def::<AreaArgs>(
                "get_fast_food_places",
                "Get locations of Fast Food establishments within a radius around an address",
            ),
            tool_def::<AreaArgs>(
                "get_irish_street_names",
                "Get the names of streets that have an Irish language translation within a radius \
                 around an address",
            ),
            tool_def::<AreaArgs>(
                "get_vacant_buildings",
                "List buildings marked as vacant/disused within a radius around an address",
            ),
            tool_def::<FeatureArgs>(
                "get_nearby_features",
                "Find map features of a given kind (schools, hotels, museums, pitches, gyms, \
                 community centres, ...) within a radius around an address",
            ),
            tool_def::<OverpassArgs>(
                "query_overpass",
                "Query the Overpass API with custom search terms around a point. A template sets \
                 the output format and bounding box, so only the raw search terms are needed, \
                 e.g. nwr[\"building\"=\"school\"]",
            ),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        let outcome = match name {
            "get_coordinates_for_address" => self.handle_coordinates_for_address(args).await,
            "get_address_by_coordinates" => self.handle_address_by_coordinates(args).await,
            "get_defibrillators" => self.handle_defibrillators(args).await,
            "get_distance_between_addresses" => self.handle_distance_between_addresses(args).await,
            "get_distance_between_coords" => self.handle_distance_between_coords(args).await,
            "get_parking" => self.handle_parking(args).await,
            "get_toilets" => self.handle_amenity(args, Feature::Toilets, "toilets").await,
            "get_post_offices" => self.handle_amenity(args, Feature::PostOffice, "post office places").await,
            "get_cafes" => self.handle_amenity(args, Feature::Cafe, "cafe places").await,
            "get_fast_food_places" => self.handle_amenity(args, Feature::FastFood, "fast food places").await,
            "get_irish_street_names" => self.handle_irish_street_names(args).await,
            "get_vacant_buildings" => self.handle_vacant_buildings(args).await,
            "get_nearby_features" => self.handle_nearby_features(args).await,
            "query_overpass" => self.handle_query_overpass(args).await,
            _ => Err(McpError::UnknownTool {
                name: name.to_string(),
            }
            .into()),
        };

        match outcome {
            Ok(text) => CallToolResult::text(text),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                match e {
                    PucaError::Mcp(McpError::UnknownTool { name }) => {
                        CallToolResult::error(format!("Unknown tool: {}", name))
                    }
                    other => CallToolResult::error(other.to_string()),
                }
            }
        }
    }

    fn distance_or_default(&self, distance: Option<u32>) -> u32 {
        distance.unwrap_or(self.default_distance)
    }

    // ==================== Tool Handlers ====================

    async fn handle_coordinates_for_address(&self, args: Value) -> Result<String> {
        let args: AddressArgs = parse_args(args)?;

        match self.osm_client.geocode(&args.address).await? {
            Some(coords) => Ok(format!("Latitude: {}, Longitude: {}", coords.lat, coords.lon)),
            None => Ok(ADDRESS_NOT_FOUND.to_string()),
        }
    }

    async fn handle_address_by_coordinates(&self, args: Value) -> Result<String> {
        let args: PointArgs = parse_args(args)?;

        match self
            .osm_client
            .reverse_geocode(Coordinates::new(args.lat, args.lon))
            .await?
        {
            Some(address) => Ok(format!("Address: {}", address)),
            None => Ok("Unable to find an address for the coordinates requested.".to_string()),
        }
    }

    async fn handle_defibrillators(&self, args: Value) -> Result<String> {
        let args: AreaArgs = parse_args(args)?;
        let distance = self.distance_or_default(args.distance);

        let Some(area) = self.osm_client.search_area(&args.address, distance).await? else {
            return Ok(ADDRESS_NOT_FOUND.to_string());
        };

        let defibs = self
            .osm_client
            .find_features(Feature::Defibrillator, &area.bbox)
            .await?;

        let mut text = format!(
            "\n{} defibrillators found within {} metre radius of {}.",
            defibs.nodes.len(),
            distance,
            args.address
        );

        for node in &defibs.nodes {
            let point = Coordinates::new(node.lat, node.lon);
            tracing::debug!(
                from_lat = area.center.lat,
                from_lon = area.center.lon,
                to_lat = node.lat,
                to_lon = node.lon,
                "Distance between address and defibrillator"
            );

            let (route, building) = tokio::join!(
                self.osm_client.route_distance(area.center, point),
                self.osm_client.building_name(point),
            );
            let address = self.osm_client.reverse_geocode(point).await;

            let away = match route {
                Ok(metres) => format!("{} metres away", metres as i64),
                Err(e) => {
                    tracing::warn!(id = node.id, error = %e, "Route distance unavailable");
                    "Unknown distance".to_string()
                }
            };
            let building = building.unwrap_or_else(|e| {
                tracing::warn!(id = node.id, error = %e, "Building lookup failed");
                None
            });
            let address = address.unwrap_or_else(|e| {
                tracing::warn!(id = node.id, error = %e, "Reverse lookup failed");
                None
            });

            let place = [
                building.unwrap_or_default(),
                address
                    .as_deref()
                    .map(|a| truncate_chars(a, SHORT_ADDRESS_CHARS).to_string())
                    .unwrap_or_default(),
            ]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

            text.push_str(&format!(
                "\n{}: {} Latitude: {}, Longitude: {}, Access: {}, Inside: {}, Find it: {} URL: {}",
                away,
                place,
                node.lat,
                node.lon,
                node.tags.get("access").map(String::as_str).unwrap_or("Not known"),
                node.tags.get("indoor").map(String::as_str).unwrap_or("Not known"),
                node.tags
                    .get("defibrillator:location")
                    .map(String::as_str)
                    .unwrap_or(""),
                osm_url(ElementKind::Node, node.id)
            ));
        }

        Ok(text)
    }

    async fn handle_distance_between_addresses(&self, args: Value) -> Result<String> {
        let args: AddressPairArgs = parse_args(args)?;

        let (from, to) = tokio::join!(
            self.osm_client.geocode(&args.address1),
            self.osm_client.geocode(&args.address2),
        );
        let Some(from) = from? else {
            return Ok(format!(
                "Unable to get valid coordinates for address: {}",
                args.address1
            ));
        };
        let Some(to) = to? else {
            return Ok(format!(
                "Unable to get valid coordinates for address: {}",
                args.address2
            ));
        };

        let metres = self.osm_client.route_distance(from, to).await?;
        Ok(format!(
            "\nThere are {} metres between {} and {}.",
            metres, args.address1, args.address2
        ))
    }

    async fn handle_distance_between_coords(&self, args: Value) -> Result<String> {
        let args: CoordinatePairArgs = parse_args(args)?;

        if !validate_coordinates(args.lat1, args.lon1) || !validate_coordinates(args.lat2, args.lon2)
        {
            return Ok(INVALID_COORDINATES.to_string());
        }

        let metres = self
            .osm_client
            .route_distance(
                Coordinates::new(args.lat1, args.lon1),
                Coordinates::new(args.lat2, args.lon2),
            )
            .await?;
        Ok(format!(
            "\nThere are {} metres between {},{} and {},{}.",
            metres, args.lat1, args.lon1, args.lat2, args.lon2
        ))
    }

    async fn handle_parking(&self, args: Value) -> Result<String> {
        let args: AreaArgs = parse_args(args)?;
        let distance = self.distance_or_default(args.distance);

        let Some(area) = self.osm_client.search_area(&args.address, distance).await? else {
            return Ok(ADDRESS_NOT_FOUND.to_string());
        };
        let parking = self
            .osm_client
            .find_features(Feature::Parking, &area.bbox)
            .await?;

        let mut text = format!(
            "\nThere are {} parking amenities within {} metres of {}.",
            parking.len(),
            distance,
            args.address
        );

        for (kind, id, tags) in elements(&parking, Listing::WaysFirst) {
            let details: String = [
                labelled_tag("Name", tags, "name"),
                labelled_tag("Type", tags, "parking"),
                labelled_tag("Access", tags, "access"),
                labelled_tag("Operator", tags, "operator"),
                labelled_tag("Capacity", tags, "capacity"),
                labelled_tag("Cost", tags, "fee"),
                labelled_tag("Surface Type", tags, "surface"),
            ]
            .concat();
            text.push_str(&format!("\n {} URL: {}", details, osm_url(kind, id)));
        }

        Ok(text)
    }

    async fn handle_amenity(&self, args: Value, feature: Feature, noun: &str) -> Result<String> {
        let args: AreaArgs = parse_args(args)?;
        let distance = self.distance_or_default(args.distance);

        let Some(area) = self.osm_client.search_area(&args.address, distance).await? else {
            return Ok(ADDRESS_NOT_FOUND.to_string());
        };
        let results = self.osm_client.find_features(feature, &area.bbox).await?;

        Ok(format!(
            "\nThere are {} {} within {} metres of {}.\n{}",
            results.len(),
            noun,
            distance,
            args.address,
            describe_elements(&results, Listing::NodesFirst)
        ))
    }

    async fn handle_irish_street_names(&self, args: Value) -> Result<String> {
        let args: AreaArgs = parse_args(args)?;
        let distance = self.distance_or_default(args.distance);

        let Some(area) = self.osm_client.search_area(&args.address, distance).await? else {
            return Ok(ADDRESS_NOT_FOUND.to_string());
        };
        let results = self
            .osm_client
            .find_features(Feature::IrishStreetName, &area.bbox)
            .await?;

        // One entry per street name; long streets are split into many ways
        let mut seen = HashSet::new();
        let mut lines = String::new();
        for way in &results.ways {
            let Some(irish) = way.tags.get("name:ga") else {
                continue;
            };
            let name = way.tags.get("name").unwrap_or(irish);
            if seen.insert(name.clone()) {
                lines.push_str(&format!(
                    "\n {}, {}, URL: {}",
                    irish,
                    name,
                    osm_url(ElementKind::Way, way.id)
                ));
            }
        }

        Ok(format!(
            "\nFound {} thoroughfares with an Irish name within {} metres of {}.{}",
            seen.len(),
            distance,
            args.address,
            lines
        ))
    }

    async fn handle_vacant_buildings(&self, args: Value) -> Result<String> {
        let args: AreaArgs = parse_args(args)?;
        let distance = self.distance_or_default(args.distance);

        let Some(area) = self.osm_client.search_area(&args.address, distance).await? else {
            return Ok(ADDRESS_NOT_FOUND.to_string());
        };
        let results = self
            .osm_client
            .find_features(Feature::VacantBuilding, &area.bbox)
            .await?;

        let ratio = density_per_sq_km(results.len(), distance as f64);

        Ok(format!(
            "\nFound {} buildings marked as vacant within {} metres of {}.\n\
             This corresponds to a ratio of {:.2} vacant buildings per square kilometer.\n{}",
            results.len(),
            distance,
            args.address,
            ratio,
            describe_elements(&results, Listing::WaysFirst)
        ))
    }

    async fn handle_nearby_features(&self, args: Value) -> Result<String> {
        let args: FeatureArgs = parse_args(args)?;
        let distance = self.distance_or_default(args.distance);

        let Some(SearchArea { bbox, .. }) =
            self.osm_client.search_area(&args.address, distance).await?
        else {
            return Ok(ADDRESS_NOT_FOUND.to_string());
        };
        let results = self.osm_client.find_features(args.feature, &bbox).await?;

        Ok(format!(
            "\nThere are {} {} features within {} metres of {}.\n{}",
            results.len(),
            args.feature.name().replace('_', " "),
            distance,
            args.address,
            describe_elements(&results, Listing::NodesFirst)
        ))
    }

    async fn handle_query_overpass(&self, args: Value) -> Result<String> {
        let args: OverpassArgs = parse_args(args)?;
        let distance = self.distance_or_default(args.distance);

        if !validate_coordinates(args.lat, args.lon) {
            return Ok(INVALID_COORDINATES.to_string());
        }

        let bbox = bounding_box(Coordinates::new(args.lat, args.lon), distance as f64);
        let results = self.osm_client.query(&args.query, &bbox).await?;

        if results.is_empty() {
            return Ok("No results found for the query.".to_string());
        }
        Ok(describe_elements(&results, Listing::WaysFirst))
    }
}

// ==================== Helpers ====================

/// Deserialize and validate tool arguments. A missing argument object is
/// treated as empty.
fn parse_args<T>(args: Value) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    let parsed: T = serde_json::from_value(args).map_err(|e| McpError::InvalidArguments {
        message: e.to_string(),
    })?;
    parsed.validate().map_err(ValidationError::from)?;
    Ok(parsed)
}

fn tool_def<T: JsonSchema>(name: &str, description: &str) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: input_schema::<T>(),
    }
}

/// JSON Schema for a tool's arguments, with nested types inlined
fn input_schema<T: JsonSchema>() -> Value {
    let schema = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator()
        .into_root_schema_for::<T>();

    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| Value::Object(Map::new()));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("title");
    }
    value
}

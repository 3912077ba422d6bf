//! Integration tests for the Puca MCP Server
//!
//! Upstream services (Nominatim, OSRM, Overpass) are replaced by local
//! wiremock servers, so no real API calls are made.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use osm_mcp_puca::config::Config;
use osm_mcp_puca::mcp::server::McpServer;
use osm_mcp_puca::osm::client::OsmClient;

/// Helper to create a JSON-RPC request
fn make_request(id: i64, method: &str, params: Option<Value>) -> String {
    let mut request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(p) = params {
        request["params"] = p;
    }
    request.to_string()
}

/// Configuration pointing every upstream service at the mock server
fn mock_config(upstream: &MockServer) -> Config {
    Config {
        nominatim_base_url: upstream.uri(),
        osrm_base_url: format!("{}/route/v1/driving", upstream.uri()),
        overpass_base_url: format!("{}/api/interpreter", upstream.uri()),
        nominatim_min_interval: Duration::ZERO,
        http_timeout: Duration::from_secs(5),
        ..Config::default()
    }
}

fn client(upstream: &MockServer) -> OsmClient {
    OsmClient::new(&mock_config(upstream)).unwrap()
}

fn server(upstream: &MockServer) -> McpServer {
    McpServer::new(Arc::new(client(upstream)), 100)
}

async fn mock_search(upstream: &MockServer, address: &str, lat: &str, lon: &str) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", address))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": lat, "lon": lon, "display_name": address}
        ])))
        .mount(upstream)
        .await;
}

async fn mock_overpass(upstream: &MockServer, contains: &str, elements: Value) {
    Mock::given(method("POST"))
        .and(path("/api/interpreter"))
        .and(body_string_contains(contains))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": 0.6,
            "elements": elements
        })))
        .mount(upstream)
        .await;
}

async fn mock_route(upstream: &MockServer, distance: f64) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/route/v1/driving/"))
        .and(query_param("overview", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": "Ok",
            "routes": [{"distance": distance, "duration": 60.0}]
        })))
        .mount(upstream)
        .await;
}

mod osm_client_tests {
    use super::*;
    use osm_mcp_puca::error::{OverpassError, PucaError, RoutingError};
    use osm_mcp_puca::osm::features::Feature;
    use osm_mcp_puca::osm::geo::bounding_box;
    use osm_mcp_puca::osm::types::Coordinates;

    #[tokio::test]
    async fn test_geocode_address() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;

        let coords = client(&upstream).geocode("Newry").await.unwrap().unwrap();
        assert_eq!(coords, Coordinates::new(54.1751, -6.3402));
    }

    #[tokio::test]
    async fn test_geocode_no_match() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&upstream)
            .await;

        assert!(client(&upstream).geocode("Nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_geocode_error_status_is_not_found() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&upstream)
            .await;

        assert!(client(&upstream).geocode("Newry").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reverse_geocode() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("extratags", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "display_name": "Town Hall, Bank Parade, Newry"
            })))
            .mount(&upstream)
            .await;

        let address = client(&upstream)
            .reverse_geocode(Coordinates::new(54.17, -6.34))
            .await
            .unwrap();
        assert_eq!(address.as_deref(), Some("Town Hall, Bank Parade, Newry"));
    }

    #[tokio::test]
    async fn test_reverse_geocode_nothing_found() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": "Unable to geocode"})),
            )
            .mount(&upstream)
            .await;

        let address = client(&upstream)
            .reverse_geocode(Coordinates::new(0.0, 0.0))
            .await
            .unwrap();
        assert!(address.is_none());
    }

    #[tokio::test]
    async fn test_route_distance() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/route/v1/driving/-6.34,54.17;-6.35,54.18"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "Ok",
                "routes": [{"distance": 1520.4, "duration": 180.2}]
            })))
            .mount(&upstream)
            .await;

        let metres = client(&upstream)
            .route_distance(Coordinates::new(54.17, -6.34), Coordinates::new(54.18, -6.35))
            .await
            .unwrap();
        assert_eq!(metres, 1520.4);
    }

    #[tokio::test]
    async fn test_route_not_found() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/route/v1/driving/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "NoRoute",
                "message": "Impossible route between points",
                "routes": []
            })))
            .mount(&upstream)
            .await;

        let err = client(&upstream)
            .route_distance(Coordinates::new(54.17, -6.34), Coordinates::new(40.7, -74.0))
            .await
            .unwrap_err();
        assert!(matches!(err, PucaError::Routing(RoutingError::NoRoute { .. })));
    }

    #[tokio::test]
    async fn test_overpass_elements_split_by_kind() {
        let upstream = MockServer::start().await;
        mock_overpass(
            &upstream,
            "amenity",
            json!([
                {"type": "node", "id": 1, "lat": 54.17, "lon": -6.34, "tags": {"amenity": "cafe"}},
                {"type": "way", "id": 2, "nodes": [10, 11], "tags": {"amenity": "cafe"}},
                {"type": "relation", "id": 3, "members": [{"type": "way", "ref": 2, "role": "outer"}]},
                {"type": "area", "id": 4}
            ]),
        )
        .await;

        let bbox = bounding_box(Coordinates::new(54.17, -6.34), 100.0);
        let result = client(&upstream)
            .find_features(Feature::Cafe, &bbox)
            .await
            .unwrap();

        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.ways.len(), 1);
        assert_eq!(result.relations.len(), 1);
        assert_eq!(result.relations[0].members[0].reference, 2);
    }

    #[tokio::test]
    async fn test_overpass_runtime_error() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/interpreter"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "elements": [],
                "remark": "runtime error: Query timed out in \"query\" at line 3 after 25 seconds."
            })))
            .mount(&upstream)
            .await;

        let bbox = bounding_box(Coordinates::new(54.17, -6.34), 100.0);
        let err = client(&upstream)
            .query(r#"nwr["building"]"#, &bbox)
            .await
            .unwrap_err();
        assert!(matches!(err, PucaError::Overpass(OverpassError::Runtime { .. })));
    }

    #[tokio::test]
    async fn test_overpass_error_status() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/interpreter"))
            .respond_with(ResponseTemplate::new(400).set_body_string("parse error"))
            .mount(&upstream)
            .await;

        let bbox = bounding_box(Coordinates::new(54.17, -6.34), 100.0);
        let err = client(&upstream)
            .query("nwr[", &bbox)
            .await
            .unwrap_err();
        assert!(matches!(err, PucaError::Overpass(OverpassError::RequestFailed { .. })));
    }

    #[tokio::test]
    async fn test_building_name() {
        let upstream = MockServer::start().await;
        mock_overpass(
            &upstream,
            "around",
            json!([
                {"type": "way", "id": 9, "center": {"lat": 54.17, "lon": -6.34},
                 "tags": {"building": "yes", "name": "Town Hall"}}
            ]),
        )
        .await;

        let name = client(&upstream)
            .building_name(Coordinates::new(54.17, -6.34))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("Town Hall"));
    }
}

mod tool_tests {
    use super::*;

    #[tokio::test]
    async fn test_coordinates_for_address() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;

        let result = server(&upstream)
            .tools()
            .call_tool("get_coordinates_for_address", json!({"address": "Newry"}))
            .await;
        assert!(!result.is_error);
        assert_eq!(result.text_content(), "Latitude: 54.1751, Longitude: -6.3402");
    }

    #[tokio::test]
    async fn test_unknown_address() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&upstream)
            .await;

        let result = server(&upstream)
            .tools()
            .call_tool("get_toilets", json!({"address": "Atlantis"}))
            .await;
        assert!(!result.is_error);
        assert!(result
            .text_content()
            .starts_with("Unable to get valid coordinates for the address requested."));
    }

    #[tokio::test]
    async fn test_defibrillators() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        mock_overpass(
            &upstream,
            "defibrillator",
            json!([
                {"type": "node", "id": 42, "lat": 54.176, "lon": -6.341,
                 "tags": {"emergency": "defibrillator", "access": "yes", "indoor": "no",
                          "defibrillator:location": "Outside the front door"}}
            ]),
        )
        .await;
        mock_overpass(
            &upstream,
            "around",
            json!([
                {"type": "way", "id": 9, "tags": {"building": "yes", "name": "Town Hall"}}
            ]),
        )
        .await;
        mock_route(&upstream, 123.4).await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "display_name": "Town Hall, Bank Parade, Newry, County Down, Northern Ireland"
            })))
            .mount(&upstream)
            .await;

        let result = server(&upstream)
            .tools()
            .call_tool("get_defibrillators", json!({"address": "Newry", "distance": 250}))
            .await;
        let text = result.text_content();

        assert!(!result.is_error, "{}", text);
        assert!(text.starts_with("\n1 defibrillators found within 250 metre radius of Newry."));
        assert!(text.contains("123 metres away: Town Hall Town Hall, Bank Parade, Newry,"));
        assert!(!text.contains("County Down"));
        assert!(text.contains("Access: yes, Inside: no, Find it: Outside the front door"));
        assert!(text.contains("URL: https://openstreetmap.org/node/42"));
    }

    #[tokio::test]
    async fn test_defibrillator_without_route() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        mock_overpass(
            &upstream,
            "defibrillator",
            json!([{"type": "node", "id": 42, "lat": 54.176, "lon": -6.341, "tags": {}}]),
        )
        .await;
        mock_overpass(&upstream, "around", json!([])).await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/route/v1/driving/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&upstream)
            .await;

        let result = server(&upstream)
            .tools()
            .call_tool("get_defibrillators", json!({"address": "Newry"}))
            .await;
        let text = result.text_content();

        assert!(!result.is_error, "{}", text);
        assert!(text.contains("within 100 metre radius"));
        assert!(text.contains("Unknown distance"));
        assert!(text.contains("Access: Not known, Inside: Not known"));
    }

    #[tokio::test]
    async fn test_parking_lists_ways_first() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        mock_overpass(
            &upstream,
            "parking",
            json!([
                {"type": "node", "id": 8, "lat": 54.175, "lon": -6.34,
                 "tags": {"amenity": "parking", "access": "customers"}},
                {"type": "way", "id": 7, "nodes": [1, 2, 3],
                 "tags": {"amenity": "parking", "name": "Buttercrane", "parking": "surface", "fee": "yes"}}
            ]),
        )
        .await;

        let result = server(&upstream)
            .tools()
            .call_tool("get_parking", json!({"address": "Newry"}))
            .await;
        let text = result.text_content();

        assert!(text.starts_with("\nThere are 2 parking amenities within 100 metres of Newry."));
        assert!(text.contains("Name: Buttercrane, Type: surface, Cost: yes,"));
        let way = text.find("https://openstreetmap.org/way/7").unwrap();
        let node = text.find("https://openstreetmap.org/node/8").unwrap();
        assert!(way < node);
    }

    #[tokio::test]
    async fn test_cafes() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        mock_overpass(
            &upstream,
            "cafe",
            json!([
                {"type": "node", "id": 5, "lat": 54.175, "lon": -6.34,
                 "tags": {"amenity": "cafe", "name": "The Coffee Dock"}}
            ]),
        )
        .await;

        let result = server(&upstream)
            .tools()
            .call_tool("get_cafes", json!({"address": "Newry", "distance": 300}))
            .await;
        let text = result.text_content();

        assert!(text.starts_with("\nThere are 1 cafe places within 300 metres of Newry.\n"));
        assert!(text.contains("amenity: cafe,name: The Coffee Dock, URL: https://openstreetmap.org/node/5"));
    }

    #[tokio::test]
    async fn test_vacant_buildings_ratio() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        mock_overpass(
            &upstream,
            "vacant",
            json!([
                {"type": "way", "id": 1, "tags": {"building": "yes", "vacant": "yes"}},
                {"type": "way", "id": 2, "tags": {"building": "retail", "vacant": "yes"}}
            ]),
        )
        .await;

        let result = server(&upstream)
            .tools()
            .call_tool("get_vacant_buildings", json!({"address": "Newry"}))
            .await;
        let text = result.text_content();

        assert!(text.starts_with("\nFound 2 buildings marked as vacant within 100 metres of Newry."));
        assert!(text.contains("ratio of 63.66 vacant buildings per square kilometer"));
        assert!(text.contains("https://openstreetmap.org/way/2"));
    }

    #[tokio::test]
    async fn test_irish_street_names_are_deduplicated() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        mock_overpass(
            &upstream,
            "name",
            json!([
                {"type": "way", "id": 11, "tags": {"name": "Hill Street", "name:ga": "Sráid an Chnoic"}},
                {"type": "way", "id": 12, "tags": {"name": "Hill Street", "name:ga": "Sráid an Chnoic"}},
                {"type": "way", "id": 13, "tags": {"name": "Canal Street", "name:ga": "Sráid na Canálach"}}
            ]),
        )
        .await;

        let result = server(&upstream)
            .tools()
            .call_tool("get_irish_street_names", json!({"address": "Newry"}))
            .await;
        let text = result.text_content();

        assert!(text.starts_with("\nFound 2 thoroughfares with an Irish name"));
        assert!(text.contains("Sráid an Chnoic, Hill Street, URL: https://openstreetmap.org/way/11"));
        assert!(!text.contains("way/12"));
        assert!(text.contains("way/13"));
    }

    #[tokio::test]
    async fn test_nearby_features() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        mock_overpass(
            &upstream,
            "fitness_centre",
            json!([{"type": "way", "id": 77, "tags": {"leisure": "fitness_centre"}}]),
        )
        .await;

        let result = server(&upstream)
            .tools()
            .call_tool(
                "get_nearby_features",
                json!({"address": "Newry", "feature": "fitness_centre", "distance": 500}),
            )
            .await;
        let text = result.text_content();

        assert!(text.starts_with("\nThere are 1 fitness centre features within 500 metres of Newry."));
        assert!(text.contains("https://openstreetmap.org/way/77"));
    }

    #[tokio::test]
    async fn test_nearby_features_rejects_unknown_feature() {
        let upstream = MockServer::start().await;
        let result = server(&upstream)
            .tools()
            .call_tool(
                "get_nearby_features",
                json!({"address": "Newry", "feature": "volcano"}),
            )
            .await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_distance_between_addresses() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        mock_search(&upstream, "Warrenpoint", "54.1011", "-6.2497").await;
        mock_route(&upstream, 11250.5).await;

        let result = server(&upstream)
            .tools()
            .call_tool(
                "get_distance_between_addresses",
                json!({"address1": "Newry", "address2": "Warrenpoint"}),
            )
            .await;
        assert_eq!(
            result.text_content(),
            "\nThere are 11250.5 metres between Newry and Warrenpoint."
        );
    }

    #[tokio::test]
    async fn test_distance_between_addresses_unknown_second() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Atlantis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&upstream)
            .await;

        let result = server(&upstream)
            .tools()
            .call_tool(
                "get_distance_between_addresses",
                json!({"address1": "Newry", "address2": "Atlantis"}),
            )
            .await;
        assert_eq!(
            result.text_content(),
            "Unable to get valid coordinates for address: Atlantis"
        );
    }

    #[tokio::test]
    async fn test_distance_between_addresses_unknown_first() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Atlantis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&upstream)
            .await;

        let result = server(&upstream)
            .tools()
            .call_tool(
                "get_distance_between_addresses",
                json!({"address1": "Atlantis", "address2": "Newry"}),
            )
            .await;
        assert!(!result.is_error);
        assert_eq!(
            result.text_content(),
            "Unable to get valid coordinates for address: Atlantis"
        );
    }

    #[tokio::test]
    async fn test_distance_between_coords() {
        let upstream = MockServer::start().await;
        mock_route(&upstream, 980.0).await;

        let result = server(&upstream)
            .tools()
            .call_tool(
                "get_distance_between_coords",
                json!({"lat1": 54.17, "lon1": -6.34, "lat2": 54.18, "lon2": -6.35}),
            )
            .await;
        assert_eq!(
            result.text_content(),
            "\nThere are 980 metres between 54.17,-6.34 and 54.18,-6.35."
        );
    }

    #[tokio::test]
    async fn test_query_overpass() {
        let upstream = MockServer::start().await;
        mock_overpass(
            &upstream,
            "school",
            json!([{"type": "way", "id": 3, "tags": {"building": "school"}}]),
        )
        .await;

        let result = server(&upstream)
            .tools()
            .call_tool(
                "query_overpass",
                json!({"query": "nwr[\"building\"=\"school\"];", "lat": 54.17, "lon": -6.34}),
            )
            .await;
        assert_eq!(
            result.text_content(),
            "building: school, URL: https://openstreetmap.org/way/3\n"
        );
    }

    #[tokio::test]
    async fn test_query_overpass_no_results() {
        let upstream = MockServer::start().await;
        mock_overpass(&upstream, "out", json!([])).await;

        let result = server(&upstream)
            .tools()
            .call_tool(
                "query_overpass",
                json!({"query": "nwr[\"tourism\"=\"zoo\"]", "lat": 54.17, "lon": -6.34, "distance": 50}),
            )
            .await;
        assert_eq!(result.text_content(), "No results found for the query.");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_tool_error() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;
        Mock::given(method("POST"))
            .and(path("/api/interpreter"))
            .respond_with(ResponseTemplate::new(504).set_body_string("Gateway Timeout"))
            .mount(&upstream)
            .await;

        let result = server(&upstream)
            .tools()
            .call_tool("get_post_offices", json!({"address": "Newry"}))
            .await;
        assert!(result.is_error);
        assert!(result.text_content().starts_with("Error: Overpass error"));
    }
}

mod mcp_protocol_tests {
    use super::*;
    use osm_mcp_puca::mcp::types::RequestId;

    #[tokio::test]
    async fn test_list_tools() {
        let upstream = MockServer::start().await;
        let response = server(&upstream)
            .handle_message(&make_request(2, "tools/list", None))
            .await
            .unwrap();

        assert_eq!(response.id, Some(RequestId::Number(2)));
        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 14);
        for tool in tools {
            assert_eq!(tool["inputSchema"]["type"], "object");
            assert!(tool["description"].is_string());
        }
    }

    #[tokio::test]
    async fn test_call_tool_over_protocol() {
        let upstream = MockServer::start().await;
        mock_search(&upstream, "Newry", "54.1751", "-6.3402").await;

        let response = server(&upstream)
            .handle_message(&make_request(
                3,
                "tools/call",
                Some(json!({
                    "name": "get_coordinates_for_address",
                    "arguments": {"address": "Newry"}
                })),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(
            result["content"][0]["text"],
            "Latitude: 54.1751, Longitude: -6.3402"
        );
        assert!(result.get("isError").is_none());
    }

    #[tokio::test]
    async fn test_call_unknown_tool_over_protocol() {
        let upstream = MockServer::start().await;
        let response = server(&upstream)
            .handle_message(&make_request(
                4,
                "tools/call",
                Some(json!({"name": "get_weather", "arguments": {}})),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Error: Unknown tool: get_weather");
    }

    #[tokio::test]
    async fn test_ping() {
        let upstream = MockServer::start().await;
        let response = server(&upstream)
            .handle_message(&make_request(5, "ping", None))
            .await
            .unwrap();
        assert_eq!(response.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn test_invalid_request() {
        let upstream = MockServer::start().await;
        let response = server(&upstream)
            .handle_message(r#"{"jsonrpc":"2.0","id":6}"#)
            .await
            .unwrap();
        assert_eq!(response.id, Some(RequestId::Number(6)));
        assert_eq!(response.error.unwrap().code, -32600);
    }
}

mod sse_transport_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use osm_mcp_puca::mcp::sse::{router, AppState, HealthStatus};
    use tower::ServiceExt;

    fn app(upstream: &MockServer) -> Router {
        router(AppState::new(Arc::new(server(upstream))))
    }

    /// Read the next SSE event as `(event, data)`
    async fn next_event(body: &mut Body) -> (String, String) {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("body error");
        let bytes = frame.into_data().expect("not a data frame");
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        let mut event = String::new();
        let mut data = String::new();
        for line in text.lines() {
            if let Some(value) = line.strip_prefix("event: ") {
                event = value.to_string();
            } else if let Some(value) = line.strip_prefix("data: ") {
                data.push_str(value);
            }
        }
        (event, data)
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let upstream = MockServer::start().await;
        let response = app(&upstream)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let health: HealthStatus = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.service, "puca");
    }

    #[tokio::test]
    async fn test_sse_sends_endpoint_first() {
        let upstream = MockServer::start().await;
        let response = app(&upstream)
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        let mut body = response.into_body();
        let (event, data) = next_event(&mut body).await;
        assert_eq!(event, "endpoint");
        let session_id = data.strip_prefix("/messages/?session_id=").unwrap();
        assert_eq!(session_id.len(), 32);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let upstream = MockServer::start().await;
        let response = app(&upstream)
            .oneshot(post(
                "/messages/?session_id=0123456789abcdef",
                &make_request(1, "ping", None),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_session_id() {
        let upstream = MockServer::start().await;
        let response = app(&upstream)
            .oneshot(post("/messages/", &make_request(1, "ping", None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_message_round_trip() {
        let upstream = MockServer::start().await;
        let app = app(&upstream);

        let response = app
            .clone()
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let mut body = response.into_body();
        let (_, endpoint) = next_event(&mut body).await;

        let accepted = app
            .clone()
            .oneshot(post(&endpoint, &make_request(7, "tools/list", None)))
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::ACCEPTED);

        let (event, data) = next_event(&mut body).await;
        assert_eq!(event, "message");
        let message: Value = serde_json::from_str(&data).unwrap();
        assert_eq!(message["id"], 7);
        assert_eq!(message["result"]["tools"].as_array().unwrap().len(), 14);
    }

    #[tokio::test]
    async fn test_dropped_stream_closes_session() {
        let upstream = MockServer::start().await;
        let state = AppState::new(Arc::new(server(&upstream)));
        let sessions = Arc::clone(&state.sessions);
        let app = router(state);

        let response = app
            .clone()
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let mut body = response.into_body();
        let (_, endpoint) = next_event(&mut body).await;
        assert_eq!(sessions.len().await, 1);

        drop(body);
        for _ in 0..50 {
            if sessions.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(sessions.is_empty().await);

        let response = app
            .oneshot(post(&endpoint, &make_request(1, "ping", None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unparseable_message() {
        let upstream = MockServer::start().await;
        let app = app(&upstream);

        let response = app
            .clone()
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let mut body = response.into_body();
        let (_, endpoint) = next_event(&mut body).await;

        let rejected = app
            .clone()
            .oneshot(post(&endpoint, "{not json"))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    }
}

mod config_tests {
    use osm_mcp_puca::config::{Config, LogFormat};
    use std::collections::HashMap;

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "9000"),
            ("DISTANCE", "250"),
            ("OVERPASS_BASE_URL", "http://overpass.local/api/interpreter/"),
            ("LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.default_distance, 250);
        assert_eq!(config.overpass_base_url, "http://overpass.local/api/interpreter");
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
    }
}

//! Text rendering of OSM results for tool output

use crate::config::osm::OSM_BROWSE_URL;
use crate::osm::types::{ElementKind, OverpassResult, Tags};

/// Link to an element on openstreetmap.org
pub fn osm_url(kind: ElementKind, id: i64) -> String {
    format!("{}/{}/{}", OSM_BROWSE_URL, kind, id)
}

/// Render all tags as `key: value,` pairs
pub fn describe_tags(tags: &Tags) -> String {
    tags.iter().map(|(k, v)| format!("{}: {},", k, v)).collect()
}

/// One line per element: its tags followed by its URL
pub fn element_line(kind: ElementKind, id: i64, tags: &Tags) -> String {
    format!("{} URL: {}\n", describe_tags(tags), osm_url(kind, id))
}

/// Order in which element kinds are listed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    NodesFirst,
    WaysFirst,
}

/// Every element of a result as `(kind, id, tags)`. Relations always come
/// last.
pub fn elements(result: &OverpassResult, order: Listing) -> Vec<(ElementKind, i64, &Tags)> {
    let nodes = result
        .nodes
        .iter()
        .map(|n| (ElementKind::Node, n.id, &n.tags));
    let ways = result
        .ways
        .iter()
        .map(|w| (ElementKind::Way, w.id, &w.tags));
    let relations = result
        .relations
        .iter()
        .map(|r| (ElementKind::Relation, r.id, &r.tags));

    let mut all: Vec<_> = match order {
        Listing::NodesFirst => nodes.chain(ways).collect(),
        Listing::WaysFirst => ways.chain(nodes).collect(),
    };
    all.extend(relations);
    all
}

/// Render every element of a result, one line each
pub fn describe_elements(result: &OverpassResult, order: Listing) -> String {
    elements(result, order)
        .into_iter()
        .map(|(kind, id, tags)| element_line(kind, id, tags))
        .collect()
}

/// Truncate to at most `max` characters
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Render `key: value, ` only when the tag is present
pub fn labelled_tag(label: &str, tags: &Tags, key: &str) -> String {
    tags.get(key)
        .map(|v| format!("{}: {}, ", label, v))
        .unwrap_or_default()
}

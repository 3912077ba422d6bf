//! Coordinate validation and search-area geometry

use std::f64::consts::PI;

use crate::osm::types::{BoundingBox, Coordinates};

/// Metres per degree of latitude (approximation used for search boxes)
pub const METRES_PER_DEGREE: f64 = 111_000.0;

/// Check that values are valid latitudes and longitudes
pub fn validate_coordinates(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Build a square search box of `distance` metres around a point.
///
/// Latitudes are clamped to the poles and longitudes wrapped into
/// `[-180, 180]`. Close to the poles, where the span would reach the whole
/// globe, the box covers every longitude.
pub fn bounding_box(center: Coordinates, distance: f64) -> BoundingBox {
    let lat_offset = distance / METRES_PER_DEGREE;
    let cos_lat = center.lat.to_radians().cos().abs();
    let lon_offset = if cos_lat > f64::EPSILON {
        distance / (METRES_PER_DEGREE * cos_lat)
    } else {
        f64::INFINITY
    };

    // Wrapping a full-width span would fold both edges onto one meridian
    let (west, east) = if lon_offset >= 180.0 {
        (-180.0, 180.0)
    } else {
        (wrap_lon(center.lon - lon_offset), wrap_lon(center.lon + lon_offset))
    };

    BoundingBox {
        top_left_lat: clamp_lat(center.lat + lat_offset),
        top_left_lon: west,
        bottom_right_lat: clamp_lat(center.lat - lat_offset),
        bottom_right_lon: east,
    }
}

/// Area in square kilometres of a circle with the given radius in metres
pub fn area_sq_km(distance: f64) -> f64 {
    PI * distance * distance / 1_000_000.0
}

/// Number of features per square kilometre within `distance` metres
pub fn density_per_sq_km(count: usize, distance: f64) -> f64 {
    let area = area_sq_km(distance);
    if area > 0.0 {
        count as f64 / area
    } else {
        0.0
    }
}

fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-90.0, 90.0)
}

fn wrap_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geospatial helpers for area filtering.
//!
//! Provides great-circle distance on a spherical Earth, a swappable
//! [`index::SpatialIndex`] (R-tree backed by default), the
//! [`filter::IndexedRecords`] dataset view that answers radius, ZIP, and
//! area queries, and the [`geocode::Geocoder`] chain that turns a free-form
//! address into coordinates.

pub mod filter;
pub mod geocode;
pub mod index;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new point.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance between two points in miles (haversine formula).
#[must_use]
pub fn haversine_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

/// A latitude/longitude rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

/// Returns the rectangles that exactly enclose the spherical cap of
/// `radius_miles` around `center`.
///
/// Usually a single box. Two boxes are returned when the cap crosses the
/// antimeridian, and a full-longitude box when it contains a pole.
#[must_use]
pub fn cap_bounding_boxes(center: GeoPoint, radius_miles: f64) -> Vec<BoundingBox> {
    let angular = radius_miles / EARTH_RADIUS_MILES;
    let delta = angular.to_degrees();
    let min_lat = (center.latitude - delta).max(-90.0);
    let max_lat = (center.latitude + delta).min(90.0);
    let span = |min_lng: f64, max_lng: f64| BoundingBox {
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    };

    if center.latitude + delta >= 90.0 || center.latitude - delta <= -90.0 {
        return vec![span(-180.0, 180.0)];
    }

    let ratio = angular.sin() / center.latitude.to_radians().cos();
    if ratio >= 1.0 {
        return vec![span(-180.0, 180.0)];
    }
    let dlng = ratio.asin().to_degrees();
    let west = center.longitude - dlng;
    let east = center.longitude + dlng;

    if west < -180.0 {
        vec![span(-180.0, east), span(west + 360.0, 180.0)]
    } else if east > 180.0 {
        vec![span(west, 180.0), span(-180.0, east - 360.0)]
    } else {
        vec![span(west, east)]
    }
}

//! Swappable spatial index over record coordinates.
//!
//! [`RTreeIndex`] is the default: it prefilters with the exact bounding
//! boxes of the search cap (see [`crate::cap_bounding_boxes`]) and then
//! confirms each candidate with the haversine distance. [`LinearIndex`]
//! scans every point and serves as the reference implementation.

use rstar::{AABB, RTree, RTreeObject};

use crate::{GeoPoint, cap_bounding_boxes, haversine_miles};

/// Envelope padding in degrees that absorbs floating-point rounding at the
/// cap boundary.
const ENVELOPE_PAD_DEGREES: f64 = 1e-9;

/// Answers "which points lie within `radius_miles` of `center`?".
///
/// Implementations return positions into the point list they were built
/// from, in ascending order.
pub trait SpatialIndex: Send + Sync {
    /// Returns the positions of all points within `radius_miles` of
    /// `center` (inclusive).
    fn within_radius(&self, center: GeoPoint, radius_miles: f64) -> Vec<usize>;
}

/// An R-tree entry wrapping one point and its position.
struct PointEntry {
    position: usize,
    point: GeoPoint,
}

impl RTreeObject for PointEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.point.longitude, self.point.latitude])
    }
}

/// R-tree backed [`SpatialIndex`].
pub struct RTreeIndex {
    tree: RTree<PointEntry>,
}

impl RTreeIndex {
    /// Bulk-loads an index over `points`.
    #[must_use]
    pub fn new(points: &[GeoPoint]) -> Self {
        let entries = points
            .iter()
            .enumerate()
            .map(|(position, point)| PointEntry {
                position,
                point: *point,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }
}

impl SpatialIndex for RTreeIndex {
    fn within_radius(&self, center: GeoPoint, radius_miles: f64) -> Vec<usize> {
        if !radius_miles.is_finite() || radius_miles < 0.0 {
            return Vec::new();
        }

        let mut hits: Vec<usize> = Vec::new();
        for bbox in cap_bounding_boxes(center, radius_miles) {
            let envelope = AABB::from_corners(
                [
                    bbox.min_lng - ENVELOPE_PAD_DEGREES,
                    bbox.min_lat - ENVELOPE_PAD_DEGREES,
                ],
                [
                    bbox.max_lng + ENVELOPE_PAD_DEGREES,
                    bbox.max_lat + ENVELOPE_PAD_DEGREES,
                ],
            );
            hits.extend(
                self.tree
                    .locate_in_envelope_intersecting(&envelope)
                    .filter(|entry| haversine_miles(center, entry.point) <= radius_miles)
                    .map(|entry| entry.position),
            );
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

/// Brute-force [`SpatialIndex`] that checks every point.
pub struct LinearIndex {
    points: Vec<GeoPoint>,
}

impl LinearIndex {
    /// Creates an index over `points`.
    #[must_use]
    pub fn new(points: &[GeoPoint]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl SpatialIndex for LinearIndex {
    fn within_radius(&self, center: GeoPoint, radius_miles: f64) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, point)| haversine_miles(center, **point) <= radius_miles)
            .map(|(position, _)| position)
            .collect()
    }
}

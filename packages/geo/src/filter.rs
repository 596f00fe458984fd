//! Area filtering over an indexed record set.
//!
//! [`IndexedRecords`] owns a dataset together with the lookups needed to
//! answer an [`AreaFilter`]: a [`SpatialIndex`] for radius queries and
//! precomputed position lists keyed by ZIP code and by uppercase area name.

use std::collections::BTreeMap;

use civic_safety_source_models::IncidentRecord;

use crate::GeoPoint;
use crate::index::{RTreeIndex, SpatialIndex};

/// A resolved area query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaFilter {
    /// Geocoded center and radius in miles. Takes precedence over the
    /// label filters when present.
    pub radius: Option<(GeoPoint, f64)>,
    /// Exact five-digit ZIP code match.
    pub zip_code: Option<String>,
    /// Case-insensitive exact area name match.
    pub area_name: Option<String>,
}

impl AreaFilter {
    /// Returns `true` if the filter has no usable locator.
    #[must_use]
    pub fn is_unlocated(&self) -> bool {
        self.radius.is_none() && self.zip_code.is_none() && self.area_name.is_none()
    }
}

/// Uppercase, trimmed key used for area name lookups.
#[must_use]
pub fn area_key(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Five-digit key used for ZIP lookups. `"10001-1234"` and `"10001.0"` both
/// key as `"10001"`; anything else keys as its trimmed self.
#[must_use]
pub fn zip_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(head) = trimmed.get(..5) else {
        return trimmed.to_string();
    };
    let rest = &trimmed[5..];
    let suffix_ok = rest.is_empty()
        || (rest.starts_with(['-', '.']) && rest[1..].bytes().all(|b| b.is_ascii_digit()));
    if head.bytes().all(|b| b.is_ascii_digit()) && suffix_ok {
        head.to_string()
    } else {
        trimmed.to_string()
    }
}

/// A dataset with the indices needed for area filtering.
pub struct IndexedRecords {
    records: Vec<IncidentRecord>,
    spatial: Box<dyn SpatialIndex>,
    by_zip: BTreeMap<String, Vec<usize>>,
    by_area: BTreeMap<String, Vec<usize>>,
}

impl std::fmt::Debug for IndexedRecords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedRecords")
            .field("records", &self.records.len())
            .field("zip_codes", &self.by_zip.len())
            .field("areas", &self.by_area.len())
            .finish_non_exhaustive()
    }
}

impl IndexedRecords {
    /// Indexes `records` with the default R-tree spatial index.
    #[must_use]
    pub fn new(records: Vec<IncidentRecord>) -> Self {
        Self::with_index(records, |points| Box::new(RTreeIndex::new(points)))
    }

    /// Indexes `records` with a caller-supplied spatial index.
    #[must_use]
    pub fn with_index(
        records: Vec<IncidentRecord>,
        build_index: impl FnOnce(&[GeoPoint]) -> Box<dyn SpatialIndex>,
    ) -> Self {
        let points: Vec<GeoPoint> = records
            .iter()
            .map(|r| GeoPoint::new(r.latitude, r.longitude))
            .collect();
        let spatial = build_index(&points);

        let mut by_zip: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_area: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            if let Some(zip) = &record.zip_code {
                by_zip.entry(zip_key(zip)).or_default().push(i);
            }
            if let Some(area) = &record.area_name {
                by_area.entry(area_key(area)).or_default().push(i);
            }
        }

        Self {
            records,
            spatial,
            by_zip,
            by_area,
        }
    }

    /// All records, in ingestion order.
    #[must_use]
    pub fn records(&self) -> &[IncidentRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the records matching `filter`, in ingestion order.
    ///
    /// A radius wins over the label filters. ZIP and area filters are
    /// intersected when both are given. A filter with no locator matches
    /// nothing.
    #[must_use]
    pub fn filter(&self, filter: &AreaFilter) -> Vec<&IncidentRecord> {
        let positions = if let Some((center, radius)) = filter.radius {
            self.spatial.within_radius(center, radius)
        } else {
            let by_zip = filter
                .zip_code
                .as_deref()
                .map(|zip| self.by_zip.get(&zip_key(zip)).map_or(&[][..], Vec::as_slice));
            let by_area = filter
                .area_name
                .as_deref()
                .map(|area| self.by_area.get(&area_key(area)).map_or(&[][..], Vec::as_slice));

            match (by_zip, by_area) {
                (Some(zips), Some(areas)) => zips
                    .iter()
                    .copied()
                    .filter(|i| areas.binary_search(i).is_ok())
                    .collect(),
                (Some(only), None) | (None, Some(only)) => only.to_vec(),
                (None, None) => Vec::new(),
            }
        };

        positions.into_iter().map(|i| &self.records[i]).collect()
    }
}

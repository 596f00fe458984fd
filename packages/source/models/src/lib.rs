#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The canonical civic report format.
//!
//! Every feed (311 API, police API, bulk CSV export) produces
//! [`NormalizedReport`] values. The ingestion gateway then attaches a
//! category and weight, yielding the [`IncidentRecord`] values that are
//! cached and scored.

use chrono::{DateTime, Utc};
use civic_safety_taxonomy_models::{Categorization, DataSource};
use serde::{Deserialize, Serialize};

/// A civic report normalized to the canonical schema, before
/// categorization.
///
/// Feeds drop records without an id or a usable location, so coordinates
/// are always present here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedReport {
    /// Original identifier from the feed (for deduplication).
    pub id: String,
    /// When the report was opened. `None` when missing or unparseable.
    pub created_at: Option<DateTime<Utc>>,
    /// When the report was closed, if it has been.
    pub closed_at: Option<DateTime<Utc>>,
    /// Category label as provided by the feed (e.g., `"Noise - Residential"`).
    pub complaint_type: String,
    /// Free-text detail.
    pub descriptor: Option<String>,
    /// Street address or intersection.
    pub address: Option<String>,
    /// Five-digit ZIP code.
    pub zip_code: Option<String>,
    /// Borough, district, or neighborhood, canonicalized by the gateway.
    pub area_name: Option<String>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Which kind of feed produced this report.
    pub data_source: DataSource,
}

/// A categorized civic report, ready for caching and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    /// Original identifier from the feed.
    pub id: String,
    /// When the report was opened.
    pub created_at: Option<DateTime<Utc>>,
    /// When the report was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Category label as provided by the feed.
    pub complaint_type: String,
    /// Free-text detail.
    pub descriptor: Option<String>,
    /// Street address or intersection.
    pub address: Option<String>,
    /// Five-digit ZIP code.
    pub zip_code: Option<String>,
    /// Canonical borough, district, or neighborhood name.
    pub area_name: Option<String>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Which kind of feed produced this record.
    pub data_source: DataSource,
    /// Category assigned from the taxonomy for `data_source`.
    pub safety_category: String,
    /// Positive severity weight for `safety_category`.
    pub safety_weight: f64,
}

impl IncidentRecord {
    /// Attaches a categorization to a normalized report.
    #[must_use]
    pub fn categorized(report: NormalizedReport, categorization: Categorization) -> Self {
        Self {
            id: report.id,
            created_at: report.created_at,
            closed_at: report.closed_at,
            complaint_type: report.complaint_type,
            descriptor: report.descriptor,
            address: report.address,
            zip_code: report.zip_code,
            area_name: report.area_name,
            latitude: report.latitude,
            longitude: report.longitude,
            data_source: report.data_source,
            safety_category: categorization.category,
            safety_weight: categorization.weight,
        }
    }
}

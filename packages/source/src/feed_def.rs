//! Config-driven feed definition.
//!
//! [`FeedDefinition`] captures everything unique about a 311 or police
//! feed in a serializable config struct. A single generic implementation of
//! [`IncidentSource`] handles every feed, so supporting a new upstream is a
//! TOML file rather than new code.

use async_trait::async_trait;
use civic_safety_source_models::NormalizedReport;
use civic_safety_taxonomy_models::DataSource;
use serde::Deserialize;

use crate::csv_tail::read_tail;
use crate::open311::{Open311Config, fetch_open311};
use crate::parsing::{coerce_f64, normalize_zip, parse_timestamp, valid_coordinates};
use crate::socrata::{SocrataConfig, fetch_socrata};
use crate::{FetchOptions, IncidentSource, SourceError};

/// Label used when a record carries no complaint type at all.
pub const UNSPECIFIED_COMPLAINT: &str = "Unspecified";

// ── Top-level feed definition ────────────────────────────────────────────

/// A complete, config-driven feed definition.
///
/// Loaded from TOML files at compile time and used as the sole
/// [`IncidentSource`] implementation for live data.
#[derive(Debug, Deserialize)]
pub struct FeedDefinition {
    /// Unique identifier (e.g., `"nyc_311"`).
    pub id: String,
    /// Human-readable name (e.g., `"NYC 311 Service Requests"`).
    pub name: String,
    /// City this feed belongs to (e.g., `"nyc"`).
    pub city: String,
    /// Which taxonomy applies to this feed's records.
    pub data_source: DataSource,
    /// How to fetch raw records.
    pub fetcher: FetcherConfig,
    /// Field name mappings for normalization.
    pub fields: FieldMapping,
}

// ── Fetcher config ───────────────────────────────────────────────────────

/// How to fetch raw records from the upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// Socrata SODA API (`$limit/$offset/$order/$where`).
    Socrata {
        /// Base Socrata API URL.
        api_url: String,
        /// Date column for ordering and the lookback window.
        date_column: String,
        /// Records per page.
        page_size: u64,
        /// Column compared (case-insensitively) against the requested area
        /// scope. Feeds without one ignore the scope upstream.
        scope_column: Option<String>,
        /// Columns that must be non-null for a row to be returned.
        #[serde(default)]
        required_columns: Vec<String>,
    },
    /// Open311 `GeoReport` v2 `requests.json` endpoint.
    Open311 {
        /// Requests endpoint URL.
        api_url: String,
        /// Request statuses to page through (e.g., `["open", "closed"]`).
        statuses: Vec<String>,
        /// Records per page.
        page_size: u32,
        /// Maximum pages fetched per status.
        max_pages: u32,
        /// Field holding the request timestamp.
        date_field: String,
        /// Only records newer than this many days are kept.
        recent_days: i64,
    },
    /// Trailing rows of a bulk CSV export on local disk.
    CsvTail {
        /// File name relative to the configured data directory.
        file_name: String,
    },
}

// ── Field mapping ────────────────────────────────────────────────────────

/// Maps feed-specific field names to canonical report fields.
///
/// Every list is a fallback chain: the first non-empty value wins.
#[derive(Debug, Deserialize)]
pub struct FieldMapping {
    /// Fields for the record identifier.
    pub incident_id: Vec<String>,
    /// Fields for the complaint type label.
    pub complaint_type: Vec<String>,
    /// Fields for the free-text descriptor.
    #[serde(default)]
    pub descriptor: Vec<String>,
    /// Fields for the creation timestamp.
    #[serde(default)]
    pub created_at: Vec<String>,
    /// Fields for the closing timestamp.
    #[serde(default)]
    pub closed_at: Vec<String>,
    /// Fields for the street address.
    #[serde(default)]
    pub address: Vec<String>,
    /// Fields for the ZIP code.
    #[serde(default)]
    pub zip_code: Vec<String>,
    /// Fields for the borough, district, or neighborhood.
    #[serde(default)]
    pub area_name: Vec<String>,
    /// Latitude coordinate field.
    pub lat: CoordField,
    /// Longitude coordinate field.
    pub lng: CoordField,
}

/// A coordinate field and how its value is stored.
#[derive(Debug, Deserialize)]
pub struct CoordField {
    /// JSON field name.
    pub field: String,
    /// How the coordinate is encoded.
    #[serde(default, rename = "type")]
    pub coord_type: CoordType,
}

/// How a coordinate is stored in the raw record.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordType {
    /// A JSON number or a numeric string.
    #[default]
    Plain,
    /// Latitude inside a `GeoJSON` Point or Socrata location object.
    PointLat,
    /// Longitude inside a `GeoJSON` Point or Socrata location object.
    PointLng,
}

// ── Helper methods on extractors ─────────────────────────────────────────

/// Gets a non-empty trimmed string for `field`. Numbers are stringified so
/// numeric ids survive.
fn get_string(record: &serde_json::Value, field: &str) -> Option<String> {
    match record.get(field)? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case("nan")).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the first non-empty value across `fields`.
fn first_string(record: &serde_json::Value, fields: &[String]) -> Option<String> {
    fields.iter().find_map(|f| get_string(record, f))
}

impl CoordField {
    /// Extracts a coordinate value from a JSON record.
    fn extract(&self, record: &serde_json::Value) -> Option<f64> {
        let value = record.get(&self.field)?;
        match self.coord_type {
            CoordType::Plain => coerce_f64(value),
            CoordType::PointLat => {
                // GeoJSON Point: {"type":"Point","coordinates":[lng, lat]}
                if let Some(coords) = value.get("coordinates").and_then(|c| c.as_array()) {
                    return coords.get(1).and_then(coerce_f64);
                }
                value.get("latitude").and_then(coerce_f64)
            }
            CoordType::PointLng => {
                if let Some(coords) = value.get("coordinates").and_then(|c| c.as_array()) {
                    return coords.first().and_then(coerce_f64);
                }
                value.get("longitude").and_then(coerce_f64)
            }
        }
    }
}

// ── Normalization ────────────────────────────────────────────────────────

impl FeedDefinition {
    /// Maps one raw record to the canonical shape.
    ///
    /// Returns `None` when the record has no identifier or no usable
    /// coordinates.
    #[must_use]
    pub fn normalize_record(&self, record: &serde_json::Value) -> Option<NormalizedReport> {
        let fields = &self.fields;
        let id = first_string(record, &fields.incident_id)?;
        let (latitude, longitude) =
            valid_coordinates(fields.lat.extract(record)?, fields.lng.extract(record)?)?;

        let parse_first = |names: &[String]| {
            names
                .iter()
                .filter_map(|f| get_string(record, f))
                .find_map(|s| parse_timestamp(&s))
        };

        Some(NormalizedReport {
            id,
            created_at: parse_first(&fields.created_at),
            closed_at: parse_first(&fields.closed_at),
            complaint_type: first_string(record, &fields.complaint_type)
                .unwrap_or_else(|| UNSPECIFIED_COMPLAINT.to_string()),
            descriptor: first_string(record, &fields.descriptor),
            address: first_string(record, &fields.address),
            zip_code: first_string(record, &fields.zip_code).and_then(|z| normalize_zip(&z)),
            area_name: first_string(record, &fields.area_name),
            latitude,
            longitude,
            data_source: self.data_source,
        })
    }

    /// Normalizes a page of raw records, dropping unusable ones.
    #[must_use]
    pub fn normalize_page(&self, records: &[serde_json::Value]) -> Vec<NormalizedReport> {
        let reports: Vec<NormalizedReport> = records
            .iter()
            .filter_map(|r| self.normalize_record(r))
            .collect();

        let dropped = records.len() - reports.len();
        if dropped > 0 {
            log::info!(
                "[{}] dropped {dropped} of {} records without an id or usable location",
                self.id,
                records.len()
            );
        }

        reports
    }

    async fn fetch_raw(
        &self,
        options: &FetchOptions,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        match &self.fetcher {
            FetcherConfig::Socrata {
                api_url,
                date_column,
                page_size,
                scope_column,
                required_columns,
            } => {
                let client = build_client(options)?;
                fetch_socrata(
                    &client,
                    &SocrataConfig {
                        api_url,
                        date_column,
                        page_size: *page_size,
                        scope_column: scope_column.as_deref(),
                        required_columns,
                        label: &self.id,
                    },
                    options,
                )
                .await
            }
            FetcherConfig::Open311 {
                api_url,
                statuses,
                page_size,
                max_pages,
                date_field,
                recent_days,
            } => {
                let client = build_client(options)?;
                fetch_open311(
                    &client,
                    &Open311Config {
                        api_url,
                        statuses,
                        page_size: *page_size,
                        max_pages: *max_pages,
                        date_field,
                        recent_days: *recent_days,
                        label: &self.id,
                    },
                    options,
                )
                .await
            }
            FetcherConfig::CsvTail { file_name } => {
                let path = options.data_dir.join(file_name);
                log::info!("[{}] Reading last {} rows of {}", self.id, options.tail_rows, path.display());
                read_tail(path, options.tail_rows).await
            }
        }
    }

    /// Returns the record cap for this feed, if any.
    fn record_cap(&self, options: &FetchOptions) -> Option<usize> {
        let limit = options.limit.and_then(|l| usize::try_from(l).ok());
        match self.fetcher {
            FetcherConfig::CsvTail { .. } => {
                Some(limit.map_or(options.bulk_max_records, |l| l.min(options.bulk_max_records)))
            }
            _ => limit,
        }
    }
}

fn build_client(options: &FetchOptions) -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .timeout(options.request_timeout)
        .build()?)
}

#[async_trait]
impl IncidentSource for FeedDefinition {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn data_source(&self) -> DataSource {
        self.data_source
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<NormalizedReport>, SourceError> {
        let raw = self.fetch_raw(options).await?;
        let mut reports = self.normalize_page(&raw);

        // Undated records are kept; the window only excludes known-old ones.
        reports.retain(|r| r.created_at.is_none_or(|t| t >= options.since));
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(cap) = self.record_cap(options) {
            reports.truncate(cap);
        }

        log::info!("[{}] normalized {} records", self.id, reports.len());
        Ok(reports)
    }
}

/// Parses a feed definition from a TOML string.
///
/// # Errors
///
/// Returns [`toml::de::Error`] if the TOML is malformed or missing required
/// fields.
pub fn parse_feed_toml(toml_str: &str) -> Result<FeedDefinition, toml::de::Error> {
    toml::from_str(toml_str)
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! 311 and police feed fetching and normalization.
//!
//! Each feed is described by a [`feed_def::FeedDefinition`] loaded from an
//! embedded TOML file (see [`registry`]). A single generic implementation
//! fetches raw records through the configured strategy (Socrata SODA API,
//! Open311 GeoReport API, or the tail of a bulk CSV export) and maps them
//! to [`NormalizedReport`] values.

pub mod csv_tail;
pub mod feed_def;
pub mod open311;
pub mod parsing;
pub mod registry;
pub mod retry;
pub mod socrata;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use civic_safety_source_models::NormalizedReport;
use civic_safety_taxonomy_models::DataSource;

/// Errors that can occur while fetching or normalizing a feed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (bulk file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The upstream asked us to back off.
    #[error("Rate limited by upstream")]
    RateLimited,

    /// The fetch did not finish within its deadline.
    #[error("Timed out after {seconds}s")]
    Timeout {
        /// The deadline that was exceeded.
        seconds: u64,
    },

    /// Data normalization or upstream protocol error.
    #[error("Normalization error: {message}")]
    Normalization {
        /// Description of what went wrong.
        message: String,
    },
}

/// Parameters for one ingestion pass.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Only keep records created at or after this timestamp.
    pub since: DateTime<Utc>,
    /// The moment the ingestion pass started.
    pub as_of: DateTime<Utc>,
    /// Maximum number of records to keep per feed.
    pub limit: Option<u64>,
    /// Canonical area name to restrict the fetch to, when the feed supports
    /// server-side filtering.
    pub scope: Option<String>,
    /// Directory holding bulk CSV extracts.
    pub data_dir: PathBuf,
    /// Number of trailing rows to read from bulk CSV extracts.
    pub tail_rows: usize,
    /// Maximum number of records kept from a bulk CSV extract.
    pub bulk_max_records: usize,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

/// Trait that every 311 or police feed implements.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    /// Returns a unique identifier for this feed (e.g., `"nyc_311"`).
    fn id(&self) -> &str;

    /// Returns the human-readable name of this feed.
    fn name(&self) -> &str;

    /// Returns which taxonomy applies to this feed's records.
    fn data_source(&self) -> DataSource;

    /// Fetches and normalizes records from the feed.
    ///
    /// Records without an id or a usable location are dropped rather than
    /// reported as errors.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the upstream cannot be read at all.
    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<NormalizedReport>, SourceError>;
}

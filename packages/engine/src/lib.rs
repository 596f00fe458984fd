#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The area safety engine for one city.
//!
//! [`SafetyEngine`] ties the pieces together: it ingests every configured
//! feed through the [`gateway`], keeps the categorized dataset in a
//! TTL-bounded [`cache`], resolves an [`AreaQuery`] to a set of records,
//! and hands those to the analyzer.
//!
//! Rating operations never fail. Upstream outages degrade to stale data or
//! to the city's static fallback table. Only construction can fail, for an
//! unsupported city or invalid configuration.
//!
//! Each process holds its own cache. Several engine processes serving the
//! same city ingest independently and may briefly disagree.
//!
//! [`AreaQuery`]: civic_safety_analysis_models::AreaQuery

pub mod cache;
pub mod city;
pub mod clock;
pub mod config;
pub mod engine;
pub mod gateway;

pub use city::CityProfile;
pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use engine::SafetyEngine;

/// Errors raised while building an engine or loading data.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested city has no profile, taxonomy, or feeds.
    #[error("Unsupported city: {city}")]
    UnsupportedCity {
        /// The city id that was requested.
        city: String,
    },

    /// An environment setting could not be used.
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// An embedded city profile is malformed.
    #[error("Invalid city profile {city}: {source}")]
    Profile {
        /// City id of the profile.
        city: String,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// The city's taxonomies failed validation.
    #[error(transparent)]
    Taxonomy(#[from] civic_safety_taxonomy::TaxonomyError),

    /// An HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Every feed failed during one ingestion pass.
    #[error("All {} feeds failed: {}", failures.len(), failures.join("; "))]
    AllSourcesFailed {
        /// One message per failed feed.
        failures: Vec<String>,
    },
}

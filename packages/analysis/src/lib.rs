#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Area scoring.
//!
//! Turns a filtered set of [`IncidentRecord`]s into ratings:
//!
//! - [`scoring`]: the combined 1.0–5.0 rating over every record.
//! - [`separated`]: independent police and 311 section grades.
//! - [`comparison`]: one combined rating per area name.
//! - [`fallback`]: static ratings used when no live data exists.
//!
//! All operations are total. An empty record set yields a neutral rating,
//! never an error.

pub mod breakdown;
pub mod comparison;
pub mod fallback;
pub mod issue_cards;
pub mod scoring;
pub mod separated;
pub mod summary;
pub mod trend;

use civic_safety_analysis_models::{MAX_SCORE, MIN_SCORE};
use civic_safety_source_models::IncidentRecord;
use civic_safety_taxonomy_models::TaxonomyPair;

/// Length of the recent-activity window in days.
pub const TREND_WINDOW_DAYS: i64 = 90;

/// Scores record sets against one city's taxonomies.
#[derive(Debug, Clone)]
pub struct Analyzer {
    taxonomies: TaxonomyPair,
    trend_days: i64,
}

impl Analyzer {
    /// Creates an analyzer with the default trend window.
    #[must_use]
    pub const fn new(taxonomies: TaxonomyPair) -> Self {
        Self {
            taxonomies,
            trend_days: TREND_WINDOW_DAYS,
        }
    }

    /// The taxonomies records were categorized with.
    #[must_use]
    pub const fn taxonomies(&self) -> &TaxonomyPair {
        &self.taxonomies
    }

    /// Length of the recent-activity window in days.
    #[must_use]
    pub const fn trend_days(&self) -> i64 {
        self.trend_days
    }
}

/// Clamps a score to the 1.0–5.0 range and rounds it to two decimals.
#[must_use]
pub fn finalize_score(score: f64) -> f64 {
    round_to(score.clamp(MIN_SCORE, MAX_SCORE), 2)
}

/// Rounds `value` to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Converts a count to `f64` for ratio math.
#[allow(clippy::cast_precision_loss)]
pub(crate) const fn as_f64(count: usize) -> f64 {
    count as f64
}

/// Borrows every record in `records`.
#[must_use]
pub fn borrow_all(records: &[IncidentRecord]) -> Vec<&IncidentRecord> {
    records.iter().collect()
}

//! Feed registry: loads all feed definitions from embedded TOML configs.
//!
//! Each `.toml` file in `packages/source/feeds/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a new feed means creating a
//! TOML file and listing it below.

use crate::feed_def::{FeedDefinition, parse_feed_toml};

/// TOML configs embedded at compile time.
const FEED_TOMLS: &[(&str, &str)] = &[
    // ── New York City ────────────────────────────────────────────────
    ("nyc_311", include_str!("../feeds/nyc_311.toml")),
    ("nyc_nypd", include_str!("../feeds/nyc_nypd.toml")),
    // ── San Francisco ────────────────────────────────────────────────
    ("sf_311_bulk", include_str!("../feeds/sf_311_bulk.toml")),
    ("sf_311_open311", include_str!("../feeds/sf_311_open311.toml")),
    ("sf_police_bulk", include_str!("../feeds/sf_police_bulk.toml")),
];

/// Total number of configured feeds (used in tests).
#[cfg(test)]
const EXPECTED_FEED_COUNT: usize = 5;

/// Returns all configured feed definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_feeds() -> Vec<FeedDefinition> {
    FEED_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_feed_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Returns the feeds configured for `city` (case-insensitive).
#[must_use]
pub fn feeds_for_city(city: &str) -> Vec<FeedDefinition> {
    all_feeds()
        .into_iter()
        .filter(|f| f.city.eq_ignore_ascii_case(city))
        .collect()
}

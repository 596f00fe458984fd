#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Complaint-label categorization against per-city taxonomies.
//!
//! Taxonomies live in `taxonomies/*.toml` and are embedded at compile time
//! (see [`registry`]). The [`Categorizer`] maps a raw complaint label and
//! its [`DataSource`](civic_safety_taxonomy_models::DataSource) to exactly
//! one category and weight.

pub mod categorizer;
pub mod registry;

pub use categorizer::Categorizer;

/// Errors raised while loading or validating a taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    /// The TOML document could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The taxonomy parsed but is not usable.
    #[error("Invalid taxonomy: {message}")]
    Invalid {
        /// Description of what is wrong.
        message: String,
    },
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Category taxonomy types and severity definitions.
//!
//! Every city carries two taxonomies: a quality-of-life taxonomy applied to
//! 311 service requests and a crime taxonomy applied to police incident
//! reports. Taxonomies are plain data so they can be swapped per city
//! without touching categorization or scoring logic.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Multiplier applied to the declared weight of police-sourced records.
///
/// A police-classified incident is a stronger safety signal than a
/// self-reported 311 complaint of nominally equal category.
pub const POLICE_WEIGHT_BOOST: f64 = 1.1;

/// Provenance of an incident record. Selects which taxonomy applies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataSource {
    /// Non-emergency 311 service request
    #[serde(rename = "service_311")]
    #[strum(serialize = "service_311")]
    Service311,
    /// Police incident or complaint report
    Police,
}

impl DataSource {
    /// Returns all data sources in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Service311, Self::Police]
    }

    /// Returns a human-readable label for this data source.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Service311 => "311 Service Requests",
            Self::Police => "Police Incident Reports",
        }
    }
}

/// One bucket of a taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Category identifier (e.g., `"HIGH_CONCERN"`, `"VIOLENT_CRIME"`).
    pub name: String,
    /// Declared severity weight. Always positive.
    pub weight: f64,
    /// Weight used when summing incident impact for the separated crime
    /// score. Only crime categories declare one.
    #[serde(default)]
    pub impact_weight: Option<f64>,
    /// Raw source labels matched against incoming complaint types.
    pub labels: Vec<String>,
    /// Human-readable description of the bucket.
    pub description: String,
}

/// An ordered set of categories plus the category used for unmatched labels.
///
/// Declaration order matters: categorization scans categories in this order
/// and the first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTaxonomy {
    /// Name of the category assigned when no label matches.
    pub default_category: String,
    /// Categories in matching order.
    pub categories: Vec<Category>,
}

impl CategoryTaxonomy {
    /// Looks up a category by name.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Returns the category assigned to unmatched labels.
    #[must_use]
    pub fn fallback(&self) -> Option<&Category> {
        self.category(&self.default_category)
    }

    /// Returns the category with the largest declared weight. Ties resolve
    /// to the earliest declared category.
    #[must_use]
    pub fn highest_severity(&self) -> Option<&Category> {
        self.categories.iter().fold(None, |best, c| match best {
            Some(b) if b.weight >= c.weight => Some(b),
            _ => Some(c),
        })
    }
}

/// The two parallel taxonomies used by one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyPair {
    /// Applied to 311 service requests.
    pub quality: CategoryTaxonomy,
    /// Applied to police incident reports.
    pub crime: CategoryTaxonomy,
}

impl TaxonomyPair {
    /// Returns the taxonomy that applies to records from `source`.
    #[must_use]
    pub const fn for_source(&self, source: DataSource) -> &CategoryTaxonomy {
        match source {
            DataSource::Service311 => &self.quality,
            DataSource::Police => &self.crime,
        }
    }

    /// Looks up a category by name in either taxonomy, quality first.
    #[must_use]
    pub fn describe(&self, name: &str) -> Option<&Category> {
        self.quality.category(name).or_else(|| self.crime.category(name))
    }
}

/// The outcome of categorizing one raw complaint label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categorization {
    /// Resolved category name.
    pub category: String,
    /// Effective weight after any source boost.
    pub weight: f64,
}

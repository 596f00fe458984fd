//! Per-city profiles: display name, area aliases, fallback ratings, and
//! the offline gazetteer.
//!
//! Each profile lives in `packages/engine/cities/{id}.toml` and is embedded
//! at compile time. A city is supported when it has a profile, a taxonomy,
//! and at least one feed.

use std::collections::BTreeMap;

use civic_safety_analysis_models::FallbackTable;
use civic_safety_geo::filter::area_key;
use civic_safety_geo::geocode::GazetteerEntry;
use civic_safety_source::registry::feeds_for_city;
use civic_safety_taxonomy::registry::taxonomy_for;
use civic_safety_taxonomy_models::TaxonomyPair;
use serde::Deserialize;

use crate::EngineError;

/// City profiles embedded at compile time.
const CITY_TOMLS: &[(&str, &str)] = &[
    ("nyc", include_str!("../cities/nyc.toml")),
    ("sf", include_str!("../cities/sf.toml")),
];

#[derive(Debug, Deserialize)]
struct CityToml {
    id: String,
    name: String,
    #[serde(default)]
    area_aliases: BTreeMap<String, String>,
    fallback: FallbackTable,
    #[serde(default)]
    gazetteer: Vec<GazetteerEntry>,
}

/// Maps the spellings a feed or caller may use for an area to one
/// canonical upper-case name.
#[derive(Debug, Clone, Default)]
pub struct AreaAliases {
    aliases: BTreeMap<String, String>,
}

impl AreaAliases {
    /// Builds an alias table. Keys and values are normalized to upper case.
    #[must_use]
    pub fn new(aliases: BTreeMap<String, String>) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(from, to)| (area_key(&from), area_key(&to)))
                .collect(),
        }
    }

    /// Returns the canonical name for `name`, or `None` if it is blank.
    #[must_use]
    pub fn canonical(&self, name: &str) -> Option<String> {
        let key = area_key(name);
        if key.is_empty() {
            return None;
        }
        Some(self.aliases.get(&key).cloned().unwrap_or(key))
    }
}

/// Everything city-specific the engine needs besides feeds.
#[derive(Debug, Clone)]
pub struct CityProfile {
    /// City id (e.g., `"nyc"`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Area name canonicalization.
    pub aliases: AreaAliases,
    /// Static ratings used when no live data is available.
    pub fallback: FallbackTable,
    /// Neighborhood centroids for offline geocoding.
    pub gazetteer: Vec<GazetteerEntry>,
    /// Quality-of-life and crime taxonomies.
    pub taxonomies: TaxonomyPair,
}

impl CityProfile {
    /// Loads the profile for `city` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedCity`] if the city has no profile,
    /// taxonomy, or feeds, and [`EngineError::Profile`] if its embedded
    /// profile is malformed.
    pub fn load(city: &str) -> Result<Self, EngineError> {
        let unsupported = || EngineError::UnsupportedCity {
            city: city.to_string(),
        };

        let (id, toml_str) = CITY_TOMLS
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(city.trim()))
            .ok_or_else(unsupported)?;

        let parsed: CityToml = toml::from_str(toml_str).map_err(|source| EngineError::Profile {
            city: (*id).to_string(),
            source,
        })?;

        let taxonomies = taxonomy_for(id).ok_or_else(unsupported)?;
        if feeds_for_city(id).is_empty() {
            return Err(unsupported());
        }

        log::debug!(
            "Loaded {} profile: {} aliases, {} fallback areas, {} gazetteer entries",
            parsed.id,
            parsed.area_aliases.len(),
            parsed.fallback.areas.len(),
            parsed.gazetteer.len()
        );

        Ok(Self {
            id: parsed.id,
            name: parsed.name,
            aliases: AreaAliases::new(parsed.area_aliases),
            fallback: parsed.fallback,
            gazetteer: parsed.gazetteer,
            taxonomies,
        })
    }

    /// Canonical name for a caller- or feed-supplied area label.
    #[must_use]
    pub fn canonical_area(&self, name: &str) -> Option<String> {
        self.aliases.canonical(name)
    }
}

/// Ids of every city with an embedded profile.
#[must_use]
pub fn supported_cities() -> Vec<&'static str> {
    CITY_TOMLS.iter().map(|(id, _)| *id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_embedded_city_loads() {
        for city in supported_cities() {
            let profile = CityProfile::load(city).unwrap();
            assert_eq!(profile.id, city);
            assert!(!profile.name.is_empty());
        }
    }

    #[test]
    fn unsupported_city_is_an_error() {
        assert!(matches!(
            CityProfile::load("gotham"),
            Err(EngineError::UnsupportedCity { .. })
        ));
    }

    #[test]
    fn city_lookup_is_case_insensitive() {
        assert_eq!(CityProfile::load("NYC").unwrap().id, "nyc");
    }

    #[test]
    fn nyc_borough_aliases() {
        let nyc = CityProfile::load("nyc").unwrap();
        assert_eq!(nyc.canonical_area("Kings").as_deref(), Some("BROOKLYN"));
        assert_eq!(nyc.canonical_area("new york").as_deref(), Some("MANHATTAN"));
        assert_eq!(nyc.canonical_area(" The Bronx ").as_deref(), Some("BRONX"));
        assert_eq!(nyc.canonical_area("si").as_deref(), Some("STATEN ISLAND"));
        assert_eq!(nyc.canonical_area("Queens").as_deref(), Some("QUEENS"));
        assert_eq!(nyc.canonical_area("   "), None);
    }

    #[test]
    fn nyc_fallback_table() {
        let nyc = CityProfile::load("nyc").unwrap();
        assert_eq!(nyc.fallback.areas.len(), 5);
        assert!((nyc.fallback.default_score - 3.5).abs() < f64::EPSILON);
        let staten = nyc
            .fallback
            .areas
            .iter()
            .find(|a| a.area == "STATEN ISLAND")
            .unwrap();
        assert!((staten.score - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sf_has_gazetteer() {
        let sf = CityProfile::load("sf").unwrap();
        assert_eq!(sf.gazetteer.len(), 10);
        assert!(sf.gazetteer.iter().any(|e| e.name == "tenderloin"));
        assert!(sf.fallback.areas.is_empty());
    }

    #[test]
    fn sf_gazetteer_names_map_to_analysis_neighborhoods() {
        let sf = CityProfile::load("sf").unwrap();
        assert_eq!(sf.canonical_area("soma").as_deref(), Some("SOUTH OF MARKET"));
        assert_eq!(
            sf.canonical_area("financial district").as_deref(),
            Some("FINANCIAL DISTRICT/SOUTH BEACH")
        );
        assert_eq!(sf.canonical_area("castro").as_deref(), Some("CASTRO/UPPER MARKET"));
    }
}

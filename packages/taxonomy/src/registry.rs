//! Taxonomy registry: loads per-city taxonomies from embedded TOML configs.
//!
//! Each `.toml` file in `packages/taxonomy/taxonomies/` is baked into the
//! binary at compile time via [`include_str!`]. Supporting a new city means
//! adding a TOML file and listing it below.

use civic_safety_taxonomy_models::TaxonomyPair;

use crate::TaxonomyError;

/// TOML configs embedded at compile time, keyed by city id.
const TAXONOMY_TOMLS: &[(&str, &str)] = &[
    ("nyc", include_str!("../taxonomies/nyc.toml")),
    ("sf", include_str!("../taxonomies/sf.toml")),
];

/// Parses a taxonomy pair from a TOML string.
///
/// # Errors
///
/// Returns [`TaxonomyError::Toml`] if the document is malformed.
pub fn parse_taxonomy_toml(toml_str: &str) -> Result<TaxonomyPair, TaxonomyError> {
    Ok(toml::from_str(toml_str)?)
}

/// Returns the ids of every city with an embedded taxonomy.
#[must_use]
pub fn city_ids() -> Vec<&'static str> {
    TAXONOMY_TOMLS.iter().map(|(id, _)| *id).collect()
}

/// Returns the taxonomy pair for `city`, or `None` if the city has none.
///
/// # Panics
///
/// Panics if the embedded TOML for `city` is malformed (a compile-time
/// guarantee since the configs are embedded).
#[must_use]
pub fn taxonomy_for(city: &str) -> Option<TaxonomyPair> {
    let (name, toml) = TAXONOMY_TOMLS
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(city))?;
    let pair = parse_taxonomy_toml(toml)
        .unwrap_or_else(|e| panic!("Failed to parse taxonomies/{name}.toml: {e}"));
    log::debug!(
        "Loaded {name} taxonomies: {} quality, {} crime categories",
        pair.quality.categories.len(),
        pair.crime.categories.len()
    );
    Some(pair)
}

#[cfg(test)]
mod tests {
    use civic_safety_taxonomy_models::DataSource;

    use super::*;
    use crate::Categorizer;

    #[test]
    fn loads_every_city() {
        for id in city_ids() {
            let pair = taxonomy_for(id).unwrap();
            Categorizer::new(pair).unwrap_or_else(|e| panic!("{id}: {e}"));
        }
    }

    #[test]
    fn unknown_city_has_no_taxonomy() {
        assert!(taxonomy_for("gotham").is_none());
    }

    #[test]
    fn city_lookup_is_case_insensitive() {
        assert!(taxonomy_for("NYC").is_some());
    }

    #[test]
    fn crime_categories_declare_impact_weights() {
        for id in city_ids() {
            let pair = taxonomy_for(id).unwrap();
            for c in &pair.crime.categories {
                assert!(c.impact_weight.is_some(), "{id}: {} has no impact weight", c.name);
            }
        }
    }

    #[test]
    fn quality_taxonomies_rank_high_concern_first() {
        for id in city_ids() {
            let pair = taxonomy_for(id).unwrap();
            assert_eq!(pair.quality.highest_severity().unwrap().name, "HIGH_CONCERN");
            assert_eq!(pair.quality.default_category, "INFRASTRUCTURE");
            assert_eq!(pair.crime.default_category, "PUBLIC_ORDER");
        }
    }

    #[test]
    fn nyc_police_labels_resolve() {
        let categorizer = Categorizer::new(taxonomy_for("nyc").unwrap()).unwrap();
        let c = categorizer.categorize(DataSource::Police, "FELONY ASSAULT");
        assert_eq!(c.category, "VIOLENT_CRIME");
        let c = categorizer.categorize(DataSource::Police, "DANGEROUS DRUGS");
        assert_eq!(c.category, "DRUG_CRIME");
        let c = categorizer.categorize(DataSource::Service311, "Noise - Street/Sidewalk");
        assert_eq!(c.category, "LOW_CONCERN");
    }

    #[test]
    fn sf_keyword_variants_resolve_through_containment() {
        let categorizer = Categorizer::new(taxonomy_for("sf").unwrap()).unwrap();
        let c = categorizer.categorize(DataSource::Police, "Simple Battery");
        assert_eq!(c.category, "VIOLENT_CRIME");
        let c = categorizer.categorize(DataSource::Police, "Larceny - From Vehicle");
        assert_eq!(c.category, "PROPERTY_CRIME");
        let c = categorizer.categorize(DataSource::Service311, "Encampment");
        assert_eq!(c.category, "HIGH_CONCERN");
    }
}

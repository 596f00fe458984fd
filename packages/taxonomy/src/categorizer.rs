//! Deterministic, order-sensitive label categorization.
//!
//! Labels are uppercased and trimmed, then compared against the taxonomy
//! for the record's data source: exact equality across every category
//! first, then substring containment. Unmatched labels fall back to the
//! taxonomy's default category, so a record is never left uncategorized.

use civic_safety_taxonomy_models::{
    Categorization, Category, CategoryTaxonomy, DataSource, POLICE_WEIGHT_BOOST, TaxonomyPair,
};

use crate::TaxonomyError;

/// Categorizes raw complaint labels for one city.
#[derive(Debug, Clone)]
pub struct Categorizer {
    taxonomies: TaxonomyPair,
}

impl Categorizer {
    /// Builds a categorizer after validating both taxonomies.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError::Invalid`] if a taxonomy has no categories,
    /// a non-positive weight, or a default category it does not declare.
    pub fn new(taxonomies: TaxonomyPair) -> Result<Self, TaxonomyError> {
        validate(&taxonomies.quality, "quality")?;
        validate(&taxonomies.crime, "crime")?;
        Ok(Self { taxonomies })
    }

    /// Returns the taxonomies backing this categorizer.
    #[must_use]
    pub const fn taxonomies(&self) -> &TaxonomyPair {
        &self.taxonomies
    }

    /// Resolves `raw` to a category and effective weight.
    ///
    /// Police records receive [`POLICE_WEIGHT_BOOST`] on top of the declared
    /// weight. Re-categorizing the same label always yields the same result.
    #[must_use]
    pub fn categorize(&self, source: DataSource, raw: &str) -> Categorization {
        let taxonomy = self.taxonomies.for_source(source);
        let normalized = normalize_label(raw);

        let matched = if normalized.is_empty() {
            None
        } else {
            find_exact(taxonomy, &normalized).or_else(|| find_contains(taxonomy, &normalized))
        };

        let (category, weight) = match matched {
            Some(c) => (c.name.clone(), c.weight),
            None => {
                // Validated in `new`, so the default always resolves.
                let weight = taxonomy.fallback().map_or(1.0, |c| c.weight);
                (taxonomy.default_category.clone(), weight)
            }
        };

        let weight = match source {
            DataSource::Police => weight * POLICE_WEIGHT_BOOST,
            DataSource::Service311 => weight,
        };

        Categorization { category, weight }
    }
}

/// Uppercases and trims a raw label.
#[must_use]
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn find_exact<'a>(
    taxonomy: &'a CategoryTaxonomy,
    normalized: &str,
) -> Option<&'a Category> {
    taxonomy
        .categories
        .iter()
        .find(|c| c.labels.iter().any(|l| normalize_label(l) == normalized))
}

fn find_contains<'a>(
    taxonomy: &'a CategoryTaxonomy,
    normalized: &str,
) -> Option<&'a Category> {
    taxonomy.categories.iter().find(|c| {
        c.labels.iter().any(|l| {
            let label = normalize_label(l);
            !label.is_empty() && normalized.contains(&label)
        })
    })
}

fn validate(taxonomy: &CategoryTaxonomy, which: &str) -> Result<(), TaxonomyError> {
    if taxonomy.categories.is_empty() {
        return Err(TaxonomyError::Invalid {
            message: format!("{which} taxonomy declares no categories"),
        });
    }
    if let Some(c) = taxonomy
        .categories
        .iter()
        .find(|c| !(c.weight.is_finite() && c.weight > 0.0))
    {
        return Err(TaxonomyError::Invalid {
            message: format!("{which} category {} has non-positive weight", c.name),
        });
    }
    if taxonomy.fallback().is_none() {
        return Err(TaxonomyError::Invalid {
            message: format!(
                "{which} default category {} is not declared",
                taxonomy.default_category
            ),
        });
    }
    Ok(())
}

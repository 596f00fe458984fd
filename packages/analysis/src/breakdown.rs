//! Per-category and per-source breakdowns of an area's records.

use std::collections::BTreeMap;

use civic_safety_analysis_models::{CategoryBreakdown, LabelCount, SourceBreakdown};
use civic_safety_source_models::IncidentRecord;
use civic_safety_taxonomy_models::{DataSource, TaxonomyPair};

use crate::{as_f64, round_to};

/// Number of labels listed per category.
const TOP_LABELS_PER_CATEGORY: usize = 3;

/// Counts complaint labels, most frequent first. Ties are ordered by label
/// so output is deterministic.
#[must_use]
pub fn top_labels(records: &[&IncidentRecord], limit: usize) -> Vec<LabelCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.complaint_type.as_str()).or_default() += 1;
    }

    let mut labels: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();
    labels.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    labels.truncate(limit);
    labels
}

/// Groups records by assigned category.
fn by_category<'a>(records: &[&'a IncidentRecord]) -> BTreeMap<&'a str, Vec<&'a IncidentRecord>> {
    let mut groups: BTreeMap<&str, Vec<&IncidentRecord>> = BTreeMap::new();
    for &record in records {
        groups
            .entry(record.safety_category.as_str())
            .or_default()
            .push(record);
    }
    groups
}

/// Breaks records down by category, with the top labels of each.
#[must_use]
pub fn complaint_breakdown(
    records: &[&IncidentRecord],
    taxonomies: &TaxonomyPair,
) -> BTreeMap<String, CategoryBreakdown> {
    let total = as_f64(records.len());
    by_category(records)
        .into_iter()
        .map(|(name, group)| {
            let description = taxonomies
                .describe(name)
                .map_or_else(String::new, |c| c.description.clone());
            (
                name.to_string(),
                CategoryBreakdown {
                    count: group.len(),
                    percentage: round_to(as_f64(group.len()) / total * 100.0, 1),
                    description,
                    top_complaints: top_labels(&group, TOP_LABELS_PER_CATEGORY),
                },
            )
        })
        .collect()
}

/// Share of records per category, as fractions of one.
#[must_use]
pub fn category_distribution(records: &[&IncidentRecord]) -> BTreeMap<String, f64> {
    let total = as_f64(records.len());
    by_category(records)
        .into_iter()
        .map(|(name, group)| (name.to_string(), round_to(as_f64(group.len()) / total, 3)))
        .collect()
}

/// Breaks records down by data source.
#[must_use]
pub fn source_breakdown(records: &[&IncidentRecord]) -> BTreeMap<DataSource, SourceBreakdown> {
    let total = as_f64(records.len());
    let mut breakdown = BTreeMap::new();

    for source in DataSource::all() {
        let subset: Vec<&IncidentRecord> = records
            .iter()
            .copied()
            .filter(|r| r.data_source == *source)
            .collect();
        if subset.is_empty() {
            continue;
        }

        let categories = by_category(&subset)
            .into_iter()
            .map(|(name, group)| (name.to_string(), group.len()))
            .collect();

        breakdown.insert(
            *source,
            SourceBreakdown {
                count: subset.len(),
                percentage: round_to(as_f64(subset.len()) / total * 100.0, 1),
                categories,
                description: source.label().to_string(),
            },
        );
    }

    breakdown
}

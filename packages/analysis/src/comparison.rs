//! Side-by-side ratings for every area in a dataset.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use civic_safety_analysis_models::AreaRating;
use civic_safety_source_models::IncidentRecord;

use crate::Analyzer;

/// Area names that stand for a missing value in upstream feeds.
const PLACEHOLDER_AREAS: &[&str] = &["", "NAN", "NONE", "NULL", "N/A", "UNSPECIFIED"];

/// Normalizes an area name for grouping, or `None` for placeholders.
fn comparable_area(name: &str) -> Option<String> {
    let key = name.trim().to_uppercase();
    (!PLACEHOLDER_AREAS.contains(&key.as_str())).then_some(key)
}

impl Analyzer {
    /// Rates each distinct area name in `records` independently.
    ///
    /// Records without an area name, or with a placeholder such as
    /// `"Unspecified"`, are left out. Keys are upper-cased area names.
    #[must_use]
    pub fn compare(
        &self,
        records: &[IncidentRecord],
        now: DateTime<Utc>,
    ) -> BTreeMap<String, AreaRating> {
        let mut groups: BTreeMap<String, Vec<&IncidentRecord>> = BTreeMap::new();
        for record in records {
            if let Some(key) = record.area_name.as_deref().and_then(comparable_area) {
                groups.entry(key).or_default().push(record);
            }
        }

        log::debug!("Comparing {} areas", groups.len());

        groups
            .into_iter()
            .map(|(area, group)| {
                let rating = self.rate(&group, now);
                (area, rating)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use civic_safety_taxonomy_models::DataSource;

    use super::*;
    use crate::test_support::{analyzer, now, record};

    fn in_area(id: usize, area: Option<&str>, weight: f64) -> IncidentRecord {
        let mut r = record(id, DataSource::Service311, "LOW_CONCERN", weight, "Noise", 1);
        r.area_name = area.map(str::to_string);
        r
    }

    #[test]
    fn groups_by_normalized_area() {
        let records = vec![
            in_area(1, Some("BROOKLYN"), 1.0),
            in_area(2, Some(" brooklyn "), 1.0),
            in_area(3, Some("QUEENS"), 2.2),
        ];
        let ratings = analyzer().compare(&records, now());
        assert_eq!(ratings.keys().collect::<Vec<_>>(), ["BROOKLYN", "QUEENS"]);
        assert_eq!(ratings["BROOKLYN"].metrics.total_incidents, 2);
        assert!(ratings["BROOKLYN"].score > ratings["QUEENS"].score);
    }

    #[test]
    fn skips_placeholder_areas() {
        let records = vec![
            in_area(1, Some("Unspecified"), 1.0),
            in_area(2, Some("nan"), 1.0),
            in_area(3, Some("N/A"), 1.0),
            in_area(4, Some("   "), 1.0),
            in_area(5, None, 1.0),
            in_area(6, Some("BRONX"), 1.0),
        ];
        let ratings = analyzer().compare(&records, now());
        assert_eq!(ratings.len(), 1);
        assert!(ratings.contains_key("BRONX"));
    }

    #[test]
    fn empty_dataset_compares_nothing() {
        assert!(analyzer().compare(&[], now()).is_empty());
    }
}

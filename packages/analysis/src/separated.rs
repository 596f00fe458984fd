//! Separated analysis: police crime and 311 quality of life graded apart.
//!
//! The crime section sums per-category impact weights and maps the total
//! through a step function tuned for dense urban areas. The quality
//! section grades by raw report count, where more reports are only mildly
//! negative: frequent 311 use reflects civic engagement as much as decay.

use chrono::{DateTime, Utc};
use civic_safety_analysis_models::{
    Grade, SectionDetails, SectionKind, SectionRating, SeparatedAreaRating,
};
use civic_safety_source_models::IncidentRecord;
use civic_safety_taxonomy_models::CategoryTaxonomy;

use crate::breakdown::{complaint_breakdown, source_breakdown};
use crate::issue_cards::issue_cards;
use crate::trend::recent_activity;
use crate::{Analyzer, finalize_score};

/// Impact weight for police records whose category declares none.
const DEFAULT_IMPACT_WEIGHT: f64 = 1.0;

/// Crime score for an empty police subset.
pub const EMPTY_CRIME_SCORE: f64 = 4.5;

/// Quality score for an empty 311 subset.
pub const EMPTY_QUALITY_SCORE: f64 = 3.5;

/// Sums the impact weight of every record's category.
#[must_use]
pub fn weighted_incidents(records: &[&IncidentRecord], crime: &CategoryTaxonomy) -> f64 {
    records
        .iter()
        .map(|r| {
            crime
                .category(&r.safety_category)
                .and_then(|c| c.impact_weight)
                .unwrap_or(DEFAULT_IMPACT_WEIGHT)
        })
        .sum()
}

/// Maps a weighted incident total to a score.
#[must_use]
pub fn crime_score(weighted: f64) -> f64 {
    if weighted <= 0.0 {
        4.8
    } else if weighted <= 100.0 {
        4.5 - weighted / 200.0
    } else if weighted <= 500.0 {
        4.0 - (weighted - 100.0) / 800.0
    } else if weighted <= 1500.0 {
        3.5 - (weighted - 500.0) / 2000.0
    } else if weighted <= 3000.0 {
        3.0 - (weighted - 1500.0) / 3000.0
    } else if weighted <= 5000.0 {
        2.5 - (weighted - 3000.0) / 4000.0
    } else if weighted <= 8000.0 {
        2.0 - (weighted - 5000.0) / 6000.0
    } else {
        (1.5 - (weighted - 8000.0 + 1.0).log10() / 10.0).max(1.3)
    }
}

/// Crime score for a police subset.
#[must_use]
pub fn crime_score_for(records: &[&IncidentRecord], crime: &CategoryTaxonomy) -> f64 {
    if records.is_empty() {
        return EMPTY_CRIME_SCORE;
    }
    crime_score(weighted_incidents(records, crime))
}

/// Quality score for a 311 subset of `count` reports.
#[must_use]
pub const fn quality_score(count: usize) -> f64 {
    match count {
        0 => EMPTY_QUALITY_SCORE,
        1..=20 => 4.2,
        21..=50 => 4.0,
        51..=100 => 3.8,
        101..=200 => 3.5,
        201..=400 => 3.0,
        _ => 2.5,
    }
}

impl Analyzer {
    /// Grades one section of a separated rating.
    #[must_use]
    pub fn rate_section(
        &self,
        kind: SectionKind,
        records: &[&IncidentRecord],
        now: DateTime<Utc>,
    ) -> SectionRating {
        if records.is_empty() {
            return SectionRating::unavailable(kind);
        }

        let score = finalize_score(match kind {
            SectionKind::Police => crime_score_for(records, &self.taxonomies().crime),
            SectionKind::Neighborhood => quality_score(records.len()),
        });
        let grade = Grade::from_score(score);

        let cards = match kind {
            SectionKind::Police => Vec::new(),
            SectionKind::Neighborhood => issue_cards(records),
        };

        SectionRating::available(SectionDetails {
            score,
            grade,
            description: kind.grade_description(grade).to_string(),
            total_incidents: records.len(),
            complaint_breakdown: complaint_breakdown(records, self.taxonomies()),
            recent_activity: recent_activity(records, now, self.trend_days()),
            issue_cards: cards,
        })
    }

    /// Grades police and 311 records independently.
    ///
    /// A section without records is reported as unavailable.
    #[must_use]
    pub fn rate_separated(
        &self,
        records: &[&IncidentRecord],
        now: DateTime<Utc>,
    ) -> SeparatedAreaRating {
        let subset = |kind: SectionKind| -> Vec<&IncidentRecord> {
            records
                .iter()
                .copied()
                .filter(|r| r.data_source == kind.data_source())
                .collect()
        };

        SeparatedAreaRating {
            personal_safety: self.rate_section(
                SectionKind::Police,
                &subset(SectionKind::Police),
                now,
            ),
            neighborhood_quality: self.rate_section(
                SectionKind::Neighborhood,
                &subset(SectionKind::Neighborhood),
                now,
            ),
            data_points: records.len(),
            source_breakdown: source_breakdown(records),
        }
    }
}

//! Combined rating over every record in an area.
//!
//! The base score is `5.0 - mean_weight * 0.8`. It is then lowered when the
//! highest-severity 311 category makes up a large share of records and when
//! records arrive at a high daily rate, clamped to 1.0–5.0, and rounded to
//! two decimals.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use civic_safety_analysis_models::{AreaRating, Grade, GradeColor, RatingBasis, RatingMetrics};
use civic_safety_source_models::IncidentRecord;
use civic_safety_taxonomy_models::TaxonomyPair;

use crate::breakdown::{category_distribution, complaint_breakdown, source_breakdown};
use crate::summary::{
    NO_DATA_SUMMARY, insufficient_data_recommendations, recommendations, summary_text,
};
use crate::trend::recent_activity;
use crate::{Analyzer, as_f64, finalize_score, round_to};

/// Score assigned to an area with no records.
pub const NEUTRAL_SCORE: f64 = 3.0;

/// Description of the neutral rating.
pub const INSUFFICIENT_DATA: &str = "Insufficient Data";

/// Score lost per unit of mean severity weight.
const WEIGHT_PENALTY: f64 = 0.8;

/// `(share above, penalty)` for the highest-severity category, checked in
/// order.
const CONCENTRATION_PENALTIES: &[(f64, f64)] = &[(0.3, 0.8), (0.2, 0.4)];

/// `(records per day above, penalty)`, checked in order.
const FREQUENCY_PENALTIES: &[(f64, f64)] = &[(5.0, 0.4), (2.5, 0.2)];

/// Computes the aggregate numbers for a record set.
#[must_use]
pub fn compute_metrics(
    records: &[&IncidentRecord],
    taxonomies: &TaxonomyPair,
    now: DateTime<Utc>,
    trend_days: i64,
) -> RatingMetrics {
    if records.is_empty() {
        return RatingMetrics::empty(trend_days);
    }

    let total = as_f64(records.len());
    let weighted_average = records.iter().map(|r| r.safety_weight).sum::<f64>() / total;

    let high_concern = taxonomies.quality.highest_severity().map_or(0, |c| {
        records
            .iter()
            .filter(|r| r.safety_category == c.name)
            .count()
    });

    RatingMetrics {
        total_incidents: records.len(),
        weighted_average: round_to(weighted_average, 3),
        base_score: finalize_score(WEIGHT_PENALTY.mul_add(-weighted_average, 5.0)),
        incidents_per_day: round_to(total / observed_days(records), 3),
        high_concern_ratio: round_to(as_f64(high_concern) / total, 3),
        category_distribution: category_distribution(records),
        recent_activity: recent_activity(records, now, trend_days),
    }
}

/// Whole days between the oldest and newest dated record, at least one.
/// Sets without dated records count as infinitely spread out.
#[allow(clippy::cast_precision_loss)]
fn observed_days(records: &[&IncidentRecord]) -> f64 {
    let mut dates = records.iter().filter_map(|r| r.created_at);
    let Some(first) = dates.next() else {
        return f64::INFINITY;
    };
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    (max - min).num_days().max(1) as f64
}

/// Returns the penalty of the first band `value` exceeds.
fn band_penalty(value: f64, bands: &[(f64, f64)]) -> f64 {
    bands
        .iter()
        .find(|(above, _)| value > *above)
        .map_or(0.0, |(_, penalty)| *penalty)
}

/// Applies the concentration and frequency adjustments to the unrounded
/// base score.
#[must_use]
pub fn combined_score(weighted_average: f64, high_concern_ratio: f64, incidents_per_day: f64) -> f64 {
    let raw = WEIGHT_PENALTY.mul_add(-weighted_average, 5.0)
        - band_penalty(high_concern_ratio, CONCENTRATION_PENALTIES)
        - band_penalty(incidents_per_day, FREQUENCY_PENALTIES);
    finalize_score(raw)
}

/// The neutral rating for an area with no matching records.
#[must_use]
pub fn insufficient_data_rating(trend_days: i64) -> AreaRating {
    AreaRating {
        score: NEUTRAL_SCORE,
        grade: Grade::from_score(NEUTRAL_SCORE),
        description: INSUFFICIENT_DATA.to_string(),
        color: GradeColor::Gray,
        basis: RatingBasis::InsufficientData,
        summary: NO_DATA_SUMMARY.to_string(),
        metrics: RatingMetrics::empty(trend_days),
        complaint_breakdown: BTreeMap::new(),
        source_breakdown: BTreeMap::new(),
        issue_cards: Vec::new(),
        recommendations: insufficient_data_recommendations(),
    }
}

impl Analyzer {
    /// Rates every record in `records` on one scale.
    ///
    /// An empty set yields the neutral `3.0` / `C` rating.
    #[must_use]
    pub fn rate(&self, records: &[&IncidentRecord], now: DateTime<Utc>) -> AreaRating {
        if records.is_empty() {
            return insufficient_data_rating(self.trend_days());
        }

        let metrics = compute_metrics(records, self.taxonomies(), now, self.trend_days());
        let total = as_f64(records.len());
        let weighted_average = records.iter().map(|r| r.safety_weight).sum::<f64>() / total;
        let score = combined_score(
            weighted_average,
            metrics.high_concern_ratio,
            metrics.incidents_per_day,
        );
        let grade = Grade::from_score(score);

        log::debug!(
            "Rated {} records: mean weight {weighted_average:.3}, score {score}",
            records.len()
        );

        AreaRating {
            score,
            grade,
            description: grade.description().to_string(),
            color: grade.color(),
            basis: RatingBasis::Live,
            summary: summary_text(records, &metrics, score, grade),
            recommendations: recommendations(score, metrics.high_concern_ratio),
            complaint_breakdown: complaint_breakdown(records, self.taxonomies()),
            source_breakdown: source_breakdown(records),
            issue_cards: Vec::new(),
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use civic_safety_taxonomy_models::DataSource;

    use super::*;
    use crate::test_support::{analyzer, now, record};

    /// Ten 311 records of weight 2.0, four of them in the highest-severity
    /// category, spread over `span_days`.
    fn concentrated(span_days: i64) -> Vec<IncidentRecord> {
        (0..10)
            .map(|i| {
                let category = if i < 4 { "HIGH_CONCERN" } else { "LOW_CONCERN" };
                let mut r = record(i, DataSource::Service311, category, 2.0, "Noise", 1);
                let offset = if i == 9 { span_days } else { 0 };
                r.created_at = Some(now() - Duration::days(1 + offset));
                r
            })
            .collect()
    }

    fn rate(records: &[IncidentRecord]) -> AreaRating {
        let refs: Vec<&IncidentRecord> = records.iter().collect();
        analyzer().rate(&refs, now())
    }

    #[test]
    fn empty_set_is_neutral() {
        let rating = rate(&[]);
        assert!((rating.score - 3.0).abs() < f64::EPSILON);
        assert_eq!(rating.grade, Grade::C);
        assert_eq!(rating.description, "Insufficient Data");
        assert_eq!(rating.color, GradeColor::Gray);
        assert_eq!(rating.basis, RatingBasis::InsufficientData);
        assert_eq!(rating.recommendations.len(), 3);
    }

    #[test]
    fn concentration_penalty_without_frequency_band() {
        // 10 records over 9 days is 1.1/day: only the 40% share applies.
        let rating = rate(&concentrated(9));
        assert!((rating.metrics.high_concern_ratio - 0.4).abs() < 1e-9);
        assert!((rating.score - 2.6).abs() < 1e-9, "got {}", rating.score);
        assert_eq!(rating.grade, Grade::C);
    }

    #[test]
    fn concentration_and_frequency_penalties_reach_grade_d() {
        // 10 records over 3 days is 3.3/day: 5.0 - 1.6 - 0.8 - 0.2.
        let rating = rate(&concentrated(3));
        assert!((rating.score - 2.4).abs() < 1e-9, "got {}", rating.score);
        assert_eq!(rating.grade, Grade::D);
        assert_eq!(rating.description, "Some Safety Concerns");
        assert_eq!(rating.color, GradeColor::Orange);
    }

    #[test]
    fn day_span_is_floored_at_one() {
        // All ten on the same day: 10/day, the heaviest frequency band.
        let rating = rate(&concentrated(0));
        assert!((rating.metrics.incidents_per_day - 10.0).abs() < 1e-9);
        assert!((rating.score - 2.2).abs() < 1e-9, "got {}", rating.score);
    }

    #[test]
    fn light_low_weight_set_is_safe() {
        let records: Vec<IncidentRecord> = [0, 10, 20, 30, 40]
            .into_iter()
            .enumerate()
            .map(|(i, days_ago)| {
                record(i, DataSource::Service311, "INFRASTRUCTURE", 0.5, "Street Light", days_ago)
            })
            .collect();
        let rating = rate(&records);
        assert!((rating.score - 4.6).abs() < 1e-9, "got {}", rating.score);
        assert_eq!(rating.grade, Grade::A);
        assert_eq!(rating.basis, RatingBasis::Live);
        assert!(rating.summary.contains("Grade A"));
    }

    #[test]
    fn score_is_always_in_range() {
        for weight in [0.01, 0.5, 2.0, 5.0, 20.0, 1000.0] {
            let records: Vec<IncidentRecord> = (0..50)
                .map(|i| record(i, DataSource::Police, "VIOLENT_CRIME", weight, "ASSAULT", 0))
                .collect();
            let score = rate(&records).score;
            assert!((1.0..=5.0).contains(&score), "weight {weight} gave {score}");
        }
    }

    #[test]
    fn undated_records_have_no_frequency_penalty() {
        let mut records = concentrated(0);
        for r in &mut records {
            r.created_at = None;
        }
        let rating = rate(&records);
        assert!(rating.metrics.incidents_per_day.abs() < f64::EPSILON);
        assert!((rating.score - 2.6).abs() < 1e-9);
    }
}

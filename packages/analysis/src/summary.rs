//! Human-readable summaries and recommendations for combined ratings.

use std::fmt::Write as _;

use civic_safety_analysis_models::{Grade, RatingMetrics};
use civic_safety_source_models::IncidentRecord;

use crate::breakdown::top_labels;

/// High-concern share above which summaries and recommendations call out
/// serious incidents.
const SERIOUS_SHARE: f64 = 0.1;

/// Summary shown when an area has no matching records.
pub const NO_DATA_SUMMARY: &str = "No crime data available for this area";

/// Builds the summary paragraph for a live rating.
///
/// # Panics
///
/// Writing to a `String` cannot fail, so this never panics.
#[must_use]
pub fn summary_text(
    records: &[&IncidentRecord],
    metrics: &RatingMetrics,
    score: f64,
    grade: Grade,
) -> String {
    let total = metrics.total_incidents;
    if total == 0 {
        return "This area has no reported incidents in our database, suggesting it's a quiet, \
                low-activity area."
            .to_string();
    }

    let mut summary = format!(
        "This area is rated as {} (Grade {grade}) with a safety score of {score:.2}/5.0. ",
        grade.description()
    );

    if total == 1 {
        summary.push_str("There has been 1 reported incident");
    } else {
        write!(summary, "There have been {total} reported incidents").unwrap();
    }

    let complaints: Vec<String> = top_labels(records, 3)
        .into_iter()
        .map(|l| format!("{} {} complaints", l.count, l.label.to_lowercase()))
        .collect();
    match complaints.as_slice() {
        [] => summary.push('.'),
        [only] => {
            write!(summary, ", primarily {only}.").unwrap();
        }
        [first, second] => {
            write!(summary, ", mainly {first} and {second}.").unwrap();
        }
        [first, second, third, ..] => {
            write!(summary, ", mainly {first}, {second}, and {third}.").unwrap();
        }
    }

    if metrics.high_concern_ratio > SERIOUS_SHARE {
        write!(
            summary,
            " {:.1}% of incidents are high-concern safety issues.",
            metrics.high_concern_ratio * 100.0
        )
        .unwrap();
    } else {
        summary.push_str(" Most incidents are minor quality-of-life issues.");
    }

    summary
}

/// Recommendations for a live rating.
#[must_use]
pub fn recommendations(score: f64, high_concern_ratio: f64) -> Vec<String> {
    let mut out: Vec<&str> = if score >= 4.0 {
        vec![
            "This is a safe area with minimal safety concerns.",
            "Continue normal safety precautions for urban living.",
        ]
    } else if score >= 3.0 {
        vec![
            "This is generally a safe area with some minor issues.",
            "Be aware of your surroundings, especially at night.",
        ]
    } else if score >= 2.0 {
        vec![
            "Exercise increased caution in this area.",
            "Consider avoiding late-night activities alone.",
        ]
    } else {
        vec![
            "This area has notable safety concerns.",
            "Take extra precautions and consider alternative locations.",
        ]
    };

    if high_concern_ratio > SERIOUS_SHARE {
        out.push("There have been serious safety incidents reported recently.");
        out.push("Stay alert and report any suspicious activity to authorities.");
    }

    out.push("Always trust your instincts and prioritize personal safety.");
    out.push("Consider checking local community boards for recent updates.");

    out.into_iter().map(str::to_string).collect()
}

/// Recommendations when an area has no matching records.
#[must_use]
pub fn insufficient_data_recommendations() -> Vec<String> {
    [
        "No recent data available for safety analysis.",
        "Consider checking with local authorities or community resources.",
        "Use general urban safety precautions.",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Recommendations attached to static fallback ratings.
#[must_use]
pub fn fallback_recommendations() -> Vec<String> {
    [
        "Stay aware of your surroundings",
        "Use well-lit streets when walking at night",
        "Keep valuables secure",
        "Trust your instincts about situations",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use civic_safety_analysis_models::RatingMetrics;
    use civic_safety_taxonomy_models::DataSource;

    use super::*;
    use crate::test_support::{complaints, record};

    fn metrics(total: usize, high_concern_ratio: f64) -> RatingMetrics {
        RatingMetrics {
            total_incidents: total,
            high_concern_ratio,
            ..RatingMetrics::empty(90)
        }
    }

    #[test]
    fn summary_lists_top_three_labels() {
        let mut records = complaints("Noise", 3, 0);
        records.extend(complaints("Rodent", 2, 10));
        records.extend(complaints("Graffiti", 1, 20));
        records.extend(complaints("Sewer", 1, 30));
        let refs: Vec<&IncidentRecord> = records.iter().collect();

        let text = summary_text(&refs, &metrics(7, 0.0), 3.4, Grade::C);
        assert!(text.starts_with(
            "This area is rated as Moderately Safe (Grade C) with a safety score of 3.40/5.0."
        ));
        assert!(text.contains(
            "There have been 7 reported incidents, mainly 3 noise complaints, \
             2 rodent complaints, and 1 graffiti complaints."
        ));
        assert!(text.ends_with("Most incidents are minor quality-of-life issues."));
    }

    #[test]
    fn summary_for_single_incident_with_high_concern() {
        let records = vec![record(1, DataSource::Service311, "HIGH_CONCERN", 2.2, "Drug Activity", 1)];
        let refs: Vec<&IncidentRecord> = records.iter().collect();

        let text = summary_text(&refs, &metrics(1, 1.0), 3.24, Grade::C);
        assert!(text.contains("There has been 1 reported incident, primarily 1 drug activity complaints."));
        assert!(text.ends_with("100.0% of incidents are high-concern safety issues."));
    }

    #[test]
    fn recommendations_follow_score_bands() {
        assert_eq!(recommendations(4.2, 0.0)[0], "This is a safe area with minimal safety concerns.");
        assert_eq!(recommendations(3.0, 0.0)[0], "This is generally a safe area with some minor issues.");
        assert_eq!(recommendations(2.5, 0.0)[0], "Exercise increased caution in this area.");
        assert_eq!(recommendations(1.2, 0.0)[0], "This area has notable safety concerns.");
    }

    #[test]
    fn serious_share_adds_recommendations() {
        assert_eq!(recommendations(4.2, 0.05).len(), 4);
        let serious = recommendations(4.2, 0.25);
        assert_eq!(serious.len(), 6);
        assert!(serious.contains(&"There have been serious safety incidents reported recently.".to_string()));
    }
}

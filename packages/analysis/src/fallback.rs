//! Static ratings served when no live dataset can be loaded.

use std::collections::BTreeMap;

use civic_safety_analysis_models::{
    AreaRating, FallbackTable, Grade, RatingBasis, RatingMetrics, SectionKind, SectionRating,
    SeparatedAreaRating,
};

use crate::finalize_score;
use crate::summary::fallback_recommendations;

/// Builds a fallback rating for `area` from a city's static table.
///
/// Area names match case-insensitively. Unknown or absent areas get the
/// table's default entry.
#[must_use]
pub fn fallback_rating(table: &FallbackTable, area: Option<&str>, trend_days: i64) -> AreaRating {
    let entry = area.and_then(|name| {
        let name = name.trim();
        table
            .areas
            .iter()
            .find(|e| e.area.eq_ignore_ascii_case(name))
    });

    let (score, description) = entry.map_or_else(
        || (table.default_score, table.default_description.as_str()),
        |e| (e.score, e.description.as_str()),
    );
    let score = finalize_score(score);
    let grade = Grade::from_score(score);

    let label = area
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or("this area");

    log::info!("Serving fallback rating for {label}: {score}");

    AreaRating {
        score,
        grade,
        description: description.to_string(),
        color: grade.color(),
        basis: RatingBasis::Fallback,
        summary: format!(
            "Basic safety information for {label}. {description} \
             Live crime data temporarily unavailable - showing general area assessment."
        ),
        metrics: RatingMetrics::empty(trend_days),
        complaint_breakdown: BTreeMap::new(),
        source_breakdown: BTreeMap::new(),
        issue_cards: Vec::new(),
        recommendations: fallback_recommendations(),
    }
}

/// A separated rating with both sections unavailable.
#[must_use]
pub fn fallback_separated() -> SeparatedAreaRating {
    SeparatedAreaRating {
        personal_safety: SectionRating::unavailable(SectionKind::Police),
        neighborhood_quality: SectionRating::unavailable(SectionKind::Neighborhood),
        data_points: 0,
        source_breakdown: BTreeMap::new(),
    }
}

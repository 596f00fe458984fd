#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output types of area analysis.
//!
//! A combined [`AreaRating`] grades every record in an area on one scale.
//! A [`SeparatedAreaRating`] grades police-reported crime and 311
//! quality-of-life reports independently, each as a [`SectionRating`].

use std::collections::BTreeMap;

use civic_safety_taxonomy_models::DataSource;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default search radius for address queries, in miles.
pub const DEFAULT_RADIUS_MILES: f64 = 0.1;

/// Lowest possible score.
pub const MIN_SCORE: f64 = 1.0;

/// Highest possible score.
pub const MAX_SCORE: f64 = 5.0;

// ── Queries ──────────────────────────────────────────────────────────────

/// Identifies the area to rate.
///
/// An address that resolves takes precedence; otherwise the ZIP code and
/// area name filters apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaQuery {
    /// Five-digit ZIP code.
    pub zip_code: Option<String>,
    /// Borough, district, or neighborhood name.
    pub area_name: Option<String>,
    /// Free-form street address to geocode.
    pub address: Option<String>,
    /// Search radius around a geocoded address, in miles.
    pub radius_miles: f64,
}

impl Default for AreaQuery {
    fn default() -> Self {
        Self {
            zip_code: None,
            area_name: None,
            address: None,
            radius_miles: DEFAULT_RADIUS_MILES,
        }
    }
}

impl AreaQuery {
    /// Query for a ZIP code.
    #[must_use]
    pub fn for_zip(zip_code: impl Into<String>) -> Self {
        Self {
            zip_code: Some(zip_code.into()),
            ..Self::default()
        }
    }

    /// Query for a borough, district, or neighborhood.
    #[must_use]
    pub fn for_area(area_name: impl Into<String>) -> Self {
        Self {
            area_name: Some(area_name.into()),
            ..Self::default()
        }
    }

    /// Query for the default radius around an address.
    #[must_use]
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    /// Sets the search radius.
    #[must_use]
    pub const fn with_radius(mut self, radius_miles: f64) -> Self {
        self.radius_miles = radius_miles;
        self
    }
}

// ── Grades ───────────────────────────────────────────────────────────────

/// Letter grade derived from a score.
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
pub enum Grade {
    /// Score of at least 4.5
    A,
    /// Score of at least 3.5
    B,
    /// Score of at least 2.5
    C,
    /// Score of at least 1.5
    D,
    /// Anything lower
    F,
}

impl Grade {
    /// Maps a score to its grade. Higher scores never get a worse grade.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 4.5 {
            Self::A
        } else if score >= 3.5 {
            Self::B
        } else if score >= 2.5 {
            Self::C
        } else if score >= 1.5 {
            Self::D
        } else {
            Self::F
        }
    }

    /// Description used by combined ratings.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::A => "Very Safe",
            Self::B => "Generally Safe",
            Self::C => "Moderately Safe",
            Self::D => "Some Safety Concerns",
            Self::F => "Significant Safety Concerns",
        }
    }

    /// Display color used by combined ratings.
    #[must_use]
    pub const fn color(self) -> GradeColor {
        match self {
            Self::A => GradeColor::Green,
            Self::B => GradeColor::LightGreen,
            Self::C => GradeColor::Yellow,
            Self::D => GradeColor::Orange,
            Self::F => GradeColor::Red,
        }
    }
}

/// Display color tag for a rating.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GradeColor {
    /// Grade A
    Green,
    /// Grade B
    LightGreen,
    /// Grade C
    Yellow,
    /// Grade D
    Orange,
    /// Grade F
    Red,
    /// Not enough data to grade
    Gray,
}

/// Where a rating's numbers came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RatingBasis {
    /// Computed from live feed data.
    Live,
    /// Live data exists but nothing matched the area.
    InsufficientData,
    /// No live data could be loaded; a static table was used.
    Fallback,
}

// ── Metrics and breakdowns ───────────────────────────────────────────────

/// Direction of recent activity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Trend {
    /// Recent window is more than 20% above the previous one.
    Increasing,
    /// Recent window is more than 20% below the previous one.
    Decreasing,
    /// Anything in between, or no previous activity.
    Stable,
}

/// Recent window compared with the window before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    /// Records inside the recent window.
    pub recent_count: usize,
    /// Records inside the window immediately before it.
    pub previous_count: usize,
    /// Direction of change.
    pub trend: Trend,
    /// Window length in days.
    pub days_analyzed: i64,
}

impl RecentActivity {
    /// Activity summary for an area without dated records.
    #[must_use]
    pub const fn none(days_analyzed: i64) -> Self {
        Self {
            recent_count: 0,
            previous_count: 0,
            trend: Trend::Stable,
            days_analyzed,
        }
    }
}

/// Aggregate numbers behind a combined rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingMetrics {
    /// Number of records in the area.
    pub total_incidents: usize,
    /// Mean severity weight.
    pub weighted_average: f64,
    /// Score before the concentration and frequency adjustments.
    pub base_score: f64,
    /// Records per day over the observed span.
    pub incidents_per_day: f64,
    /// Share of records in the highest-severity 311 category.
    pub high_concern_ratio: f64,
    /// Share of records per category.
    pub category_distribution: BTreeMap<String, f64>,
    /// Recent activity trend.
    pub recent_activity: RecentActivity,
}

impl RatingMetrics {
    /// Metrics for an area with no records.
    #[must_use]
    pub const fn empty(days_analyzed: i64) -> Self {
        Self {
            total_incidents: 0,
            weighted_average: 0.0,
            base_score: 3.0,
            incidents_per_day: 0.0,
            high_concern_ratio: 0.0,
            category_distribution: BTreeMap::new(),
            recent_activity: RecentActivity::none(days_analyzed),
        }
    }
}

/// A raw complaint label and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelCount {
    /// Complaint label as reported.
    pub label: String,
    /// Occurrences.
    pub count: usize,
}

/// Per-category slice of an area's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    /// Records in the category.
    pub count: usize,
    /// Share of the area's records, 0–100.
    pub percentage: f64,
    /// Category description from the taxonomy.
    pub description: String,
    /// Most frequent complaint labels, at most three.
    pub top_complaints: Vec<LabelCount>,
}

/// Per-source slice of an area's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    /// Records from the source.
    pub count: usize,
    /// Share of the area's records, 0–100, one decimal.
    pub percentage: f64,
    /// Record count per category.
    pub categories: BTreeMap<String, usize>,
    /// Human-readable source description.
    pub description: String,
}

// ── Issue cards ──────────────────────────────────────────────────────────

/// Problem domain an issue card describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueKind {
    /// Overall activity summary.
    Summary,
    /// Street cleaning and dumping.
    Cleanliness,
    /// Parking and vehicles.
    Parking,
    /// Noise.
    Noise,
    /// Services for unsheltered persons.
    Homelessness,
    /// Graffiti and vandalism.
    Vandalism,
    /// Streets, sidewalks, and signage.
    Infrastructure,
    /// A frequent complaint outside the known domains.
    General,
}

/// How prominently an issue card should be shown.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueSeverity {
    /// Informational only.
    Info,
    /// Low.
    Low,
    /// Medium.
    Medium,
    /// High.
    High,
}

/// A human-readable diagnostic about a recurring complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCard {
    /// Problem domain.
    pub kind: IssueKind,
    /// Short headline.
    pub title: String,
    /// Number of reports behind the card.
    pub count: usize,
    /// Display severity.
    pub severity: IssueSeverity,
    /// One-sentence description.
    pub description: String,
    /// Practical tip for residents.
    pub tip: String,
    /// Suggested reporting action.
    pub action: String,
}

// ── Ratings ──────────────────────────────────────────────────────────────

/// Combined rating of every record in an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaRating {
    /// Score between 1.0 and 5.0, two decimals. Higher is safer.
    pub score: f64,
    /// Letter grade for `score`.
    pub grade: Grade,
    /// Short description of the grade.
    pub description: String,
    /// Display color.
    pub color: GradeColor,
    /// Where the numbers came from.
    pub basis: RatingBasis,
    /// Human-readable summary paragraph.
    pub summary: String,
    /// Aggregate numbers.
    pub metrics: RatingMetrics,
    /// Records per category.
    pub complaint_breakdown: BTreeMap<String, CategoryBreakdown>,
    /// Records per data source.
    pub source_breakdown: BTreeMap<DataSource, SourceBreakdown>,
    /// Issue diagnostics, if any were generated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issue_cards: Vec<IssueCard>,
    /// Practical recommendations.
    pub recommendations: Vec<String>,
}

/// Which half of a separated rating a section covers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SectionKind {
    /// Police-reported crime.
    Police,
    /// 311 quality-of-life reports.
    Neighborhood,
}

impl SectionKind {
    /// Data source whose records feed this section.
    #[must_use]
    pub const fn data_source(self) -> DataSource {
        match self {
            Self::Police => DataSource::Police,
            Self::Neighborhood => DataSource::Service311,
        }
    }

    /// Section-specific description of `grade`.
    #[must_use]
    pub const fn grade_description(self, grade: Grade) -> &'static str {
        match (self, grade) {
            (Self::Police, Grade::A) => "Very Safe - Low crime activity",
            (Self::Police, Grade::B) => "Safe - Minimal safety concerns",
            (Self::Police, Grade::C) => "Moderately Safe - Some safety concerns",
            (Self::Police, Grade::D) => "Caution Advised - Notable safety issues",
            (Self::Police, Grade::F) => "High Risk - Significant safety concerns",
            (Self::Neighborhood, Grade::A) => "Excellent - Well-maintained neighborhood",
            (Self::Neighborhood, Grade::B) => "Good - Minor quality of life issues",
            (Self::Neighborhood, Grade::C) => "Fair - Some maintenance and service issues",
            (Self::Neighborhood, Grade::D) => "Poor - Notable quality of life problems",
            (Self::Neighborhood, Grade::F) => "Very Poor - Significant neighborhood issues",
        }
    }

    /// Message shown when the section has no records.
    #[must_use]
    pub const fn unavailable_message(self) -> &'static str {
        match self {
            Self::Police => "No police data available for this area",
            Self::Neighborhood => "No neighborhood data available for this area",
        }
    }
}

/// Graded details of an available section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDetails {
    /// Score between 1.0 and 5.0, two decimals.
    pub score: f64,
    /// Letter grade for `score`.
    pub grade: Grade,
    /// Section-specific grade description.
    pub description: String,
    /// Records in the section.
    pub total_incidents: usize,
    /// Records per category.
    pub complaint_breakdown: BTreeMap<String, CategoryBreakdown>,
    /// Recent activity trend.
    pub recent_activity: RecentActivity,
    /// Issue diagnostics (311 section only).
    pub issue_cards: Vec<IssueCard>,
}

/// One half of a [`SeparatedAreaRating`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRating {
    /// Whether the section had any records.
    pub available: bool,
    /// Explanation when `available` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Graded details when `available` is true.
    #[serde(flatten)]
    pub details: Option<SectionDetails>,
}

impl SectionRating {
    /// A section with no records.
    #[must_use]
    pub fn unavailable(kind: SectionKind) -> Self {
        Self {
            available: false,
            message: Some(kind.unavailable_message().to_string()),
            details: None,
        }
    }

    /// A graded section.
    #[must_use]
    pub const fn available(details: SectionDetails) -> Self {
        Self {
            available: true,
            message: None,
            details: Some(details),
        }
    }
}

/// Independent crime and quality-of-life grades for one area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeparatedAreaRating {
    /// Police-reported crime section.
    pub personal_safety: SectionRating,
    /// 311 quality-of-life section.
    pub neighborhood_quality: SectionRating,
    /// Records matched by the query across both sections.
    pub data_points: usize,
    /// Records per data source.
    pub source_breakdown: BTreeMap<DataSource, SourceBreakdown>,
}

// ── Fallback table ───────────────────────────────────────────────────────

/// A static rating for one area, used when no live data can be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackEntry {
    /// Canonical area name.
    pub area: String,
    /// Static score.
    pub score: f64,
    /// Short description of the area.
    pub description: String,
}

/// Static area ratings for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackTable {
    /// Score for areas without an entry.
    pub default_score: f64,
    /// Description for areas without an entry.
    pub default_description: String,
    /// Per-area entries.
    #[serde(default)]
    pub areas: Vec<FallbackEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::from_score(5.0), Grade::A);
        assert_eq!(Grade::from_score(4.5), Grade::A);
        assert_eq!(Grade::from_score(4.49), Grade::B);
        assert_eq!(Grade::from_score(3.5), Grade::B);
        assert_eq!(Grade::from_score(2.5), Grade::C);
        assert_eq!(Grade::from_score(2.4), Grade::D);
        assert_eq!(Grade::from_score(1.5), Grade::D);
        assert_eq!(Grade::from_score(1.49), Grade::F);
        assert_eq!(Grade::from_score(1.0), Grade::F);
    }

    #[test]
    fn grade_is_monotonic_in_score() {
        let mut previous = Grade::from_score(MIN_SCORE);
        let mut score = MIN_SCORE;
        while score <= MAX_SCORE {
            let grade = Grade::from_score(score);
            assert!(grade <= previous, "grade got worse at {score}");
            previous = grade;
            score += 0.01;
        }
    }

    #[test]
    fn grade_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Grade::B).unwrap(), "\"B\"");
        assert_eq!("C".parse::<Grade>().unwrap(), Grade::C);
    }

    #[test]
    fn colors_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&GradeColor::LightGreen).unwrap(),
            "\"lightgreen\""
        );
        assert_eq!(Grade::A.color().to_string(), "green");
    }

    #[test]
    fn default_query_uses_default_radius() {
        let query = AreaQuery::for_address("350 5th Ave");
        assert!((query.radius_miles - DEFAULT_RADIUS_MILES).abs() < f64::EPSILON);
        assert!(query.zip_code.is_none());
        let wider = query.with_radius(0.5);
        assert!((wider.radius_miles - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unavailable_section_serializes_message_only() {
        let json = serde_json::to_value(SectionRating::unavailable(SectionKind::Police)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "available": false,
                "message": "No police data available for this area"
            })
        );
    }

    #[test]
    fn section_descriptions_differ_by_kind() {
        assert_eq!(
            SectionKind::Police.grade_description(Grade::A),
            "Very Safe - Low crime activity"
        );
        assert_eq!(
            SectionKind::Neighborhood.grade_description(Grade::B),
            "Good - Minor quality of life issues"
        );
    }

    #[test]
    fn source_breakdown_keys_are_source_names() {
        let mut map = BTreeMap::new();
        map.insert(
            DataSource::Service311,
            SourceBreakdown {
                count: 1,
                percentage: 100.0,
                categories: BTreeMap::new(),
                description: DataSource::Service311.label().to_string(),
            },
        );
        let json = serde_json::to_value(&map).unwrap();
        assert!(json.get("service_311").is_some());
    }
}

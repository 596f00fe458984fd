//! Issue cards for the 311 section.
//!
//! The most frequent complaint labels are matched against known problem
//! domains by keyword. Each match becomes a card with a count-based
//! severity, a tip, and a reporting action.

use civic_safety_analysis_models::{IssueCard, IssueKind, IssueSeverity};
use civic_safety_source_models::IncidentRecord;

use crate::breakdown::top_labels;

/// Number of top labels considered.
const CANDIDATE_LABELS: usize = 5;

/// Minimum occurrences for a label to get a domain card.
const MIN_DOMAIN_COUNT: usize = 3;

/// Minimum occurrences for an unmatched label to get a generic card.
const MIN_GENERAL_COUNT: usize = 5;

/// Specific cards needed before the summary card is prepended.
const SUMMARY_THRESHOLD: usize = 3;

/// Maximum cards returned.
const MAX_CARDS: usize = 4;

/// A known problem domain and how to describe it.
struct DomainRule {
    kind: IssueKind,
    keywords: &'static [&'static str],
    title: &'static str,
    /// Counts above this are medium (or high when `escalates`).
    threshold: usize,
    /// Whether the domain starts at medium and rises to high.
    escalates: bool,
    /// Description template; `{count}` is replaced with the report count.
    description: &'static str,
    tip: &'static str,
    action: &'static str,
}

const DOMAIN_RULES: &[DomainRule] = &[
    DomainRule {
        kind: IssueKind::Cleanliness,
        keywords: &["cleaning", "dirty", "sanitation", "litter", "dumping"],
        title: "Street Cleanliness Issues",
        threshold: 10,
        escalates: false,
        description: "{count} reports of cleanliness issues in the area",
        tip: "Use the 311 app to report issues quickly. Peak cleaning days are usually weekdays.",
        action: "Report via the 311 app or call 311",
    },
    DomainRule {
        kind: IssueKind::Parking,
        keywords: &["parking", "vehicle", "driveway"],
        title: "Parking & Vehicle Issues",
        threshold: 8,
        escalates: false,
        description: "{count} parking-related complaints reported",
        tip: "Check parking signs carefully. Avoid peak enforcement hours (7-9 AM, 4-6 PM).",
        action: "Use a parking reservation app for guaranteed parking",
    },
    DomainRule {
        kind: IssueKind::Noise,
        keywords: &["noise"],
        title: "Noise Concerns",
        threshold: 6,
        escalates: false,
        description: "{count} noise complaints in the neighborhood",
        tip: "Peak noise issues are typically evenings and weekends. Consider soundproofing.",
        action: "Report persistent issues to 311 or the police non-emergency line",
    },
    DomainRule {
        kind: IssueKind::Homelessness,
        keywords: &["homeless", "encampment"],
        title: "Homeless Services Needed",
        threshold: 5,
        escalates: true,
        description: "{count} reports related to homeless services needed",
        tip: "These reports often indicate community engagement with helping unhoused individuals.",
        action: "Request non-emergency homeless outreach through 311",
    },
    DomainRule {
        kind: IssueKind::Vandalism,
        keywords: &["graffiti", "vandalism"],
        title: "Graffiti & Vandalism",
        threshold: 4,
        escalates: false,
        description: "{count} graffiti/vandalism reports",
        tip: "Quick reporting leads to faster cleanup. Take photos when reporting.",
        action: "Report immediately via 311 for fastest response",
    },
    DomainRule {
        kind: IssueKind::Infrastructure,
        keywords: &["street", "sidewalk", "pothole", "sign"],
        title: "Infrastructure Maintenance",
        threshold: 7,
        escalates: false,
        description: "{count} infrastructure maintenance issues reported",
        tip: "The city is generally responsive to infrastructure reports with photos.",
        action: "Report with photos via 311 for priority handling",
    },
];

impl DomainRule {
    fn matches(&self, label_lower: &str) -> bool {
        self.keywords.iter().any(|k| label_lower.contains(k))
    }

    fn card(&self, count: usize) -> IssueCard {
        let severity = match (self.escalates, count > self.threshold) {
            (false, false) => IssueSeverity::Low,
            (false, true) | (true, false) => IssueSeverity::Medium,
            (true, true) => IssueSeverity::High,
        };
        IssueCard {
            kind: self.kind,
            title: self.title.to_string(),
            count,
            severity,
            description: self.description.replace("{count}", &count.to_string()),
            tip: self.tip.to_string(),
            action: self.action.to_string(),
        }
    }
}

fn general_card(label: &str, count: usize) -> IssueCard {
    let severity = if count > 15 {
        IssueSeverity::High
    } else if count > 8 {
        IssueSeverity::Medium
    } else {
        IssueSeverity::Low
    };
    IssueCard {
        kind: IssueKind::General,
        title: label.to_string(),
        count,
        severity,
        description: format!("{count} reports of {}", label.to_lowercase()),
        tip: "Active community reporting indicates engaged residents.".to_string(),
        action: "Contact 311 for city services or local representatives".to_string(),
    }
}

fn summary_card(total: usize) -> IssueCard {
    IssueCard {
        kind: IssueKind::Summary,
        title: "Neighborhood Activity Summary".to_string(),
        count: total,
        severity: IssueSeverity::Info,
        description: format!(
            "Total of {total} community reports show active civic engagement"
        ),
        tip: "Higher 311 reporting often indicates involved, caring residents.".to_string(),
        action: "Join neighborhood groups to stay informed about local issues".to_string(),
    }
}

/// Builds issue cards for a set of 311 records.
#[must_use]
pub fn issue_cards(records: &[&IncidentRecord]) -> Vec<IssueCard> {
    let mut cards: Vec<IssueCard> = Vec::new();

    for label in top_labels(records, CANDIDATE_LABELS) {
        if label.count < MIN_DOMAIN_COUNT {
            continue;
        }
        let lower = label.label.to_lowercase();
        if let Some(rule) = DOMAIN_RULES.iter().find(|r| r.matches(&lower)) {
            cards.push(rule.card(label.count));
        } else if label.count >= MIN_GENERAL_COUNT {
            cards.push(general_card(&label.label, label.count));
        }
    }

    if cards.len() >= SUMMARY_THRESHOLD {
        cards.insert(0, summary_card(records.len()));
    }

    cards.truncate(MAX_CARDS);
    cards
}

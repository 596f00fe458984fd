//! Recent-activity trend: the last N days against the N days before.

use chrono::{DateTime, Duration, Utc};
use civic_safety_analysis_models::{RecentActivity, Trend};
use civic_safety_source_models::IncidentRecord;

use crate::as_f64;

/// Recent window above this multiple of the previous one is increasing.
const INCREASING_RATIO: f64 = 1.2;

/// Recent window below this multiple of the previous one is decreasing.
const DECREASING_RATIO: f64 = 0.8;

/// Compares activity in `[now - days, ..)` with `[now - 2*days, now - days)`.
///
/// Undated records are ignored. No previous activity is reported as
/// [`Trend::Stable`].
#[must_use]
pub fn recent_activity(records: &[&IncidentRecord], now: DateTime<Utc>, days: i64) -> RecentActivity {
    let cutoff = now - Duration::days(days);
    let previous_cutoff = cutoff - Duration::days(days);

    let mut recent_count = 0;
    let mut previous_count = 0;
    for created in records.iter().filter_map(|r| r.created_at) {
        if created >= cutoff {
            recent_count += 1;
        } else if created >= previous_cutoff {
            previous_count += 1;
        }
    }

    RecentActivity {
        recent_count,
        previous_count,
        trend: classify(recent_count, previous_count),
        days_analyzed: days,
    }
}

fn classify(recent: usize, previous: usize) -> Trend {
    if previous == 0 {
        return Trend::Stable;
    }
    let (recent, previous) = (as_f64(recent), as_f64(previous));
    if recent > previous * INCREASING_RATIO {
        Trend::Increasing
    } else if recent < previous * DECREASING_RATIO {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use civic_safety_taxonomy_models::DataSource;

    use super::*;
    use crate::test_support::{now, record};

    fn dated(recent: usize, previous: usize) -> Vec<IncidentRecord> {
        let mut records = Vec::new();
        for i in 0..recent {
            records.push(record(i, DataSource::Service311, "LOW_CONCERN", 1.0, "Noise", 10));
        }
        for i in 0..previous {
            records.push(record(1000 + i, DataSource::Service311, "LOW_CONCERN", 1.0, "Noise", 120));
        }
        // Outside both windows.
        records.push(record(9999, DataSource::Service311, "LOW_CONCERN", 1.0, "Noise", 400));
        records
    }

    fn activity(recent: usize, previous: usize) -> RecentActivity {
        let records = dated(recent, previous);
        let refs: Vec<&IncidentRecord> = records.iter().collect();
        recent_activity(&refs, now(), 90)
    }

    #[test]
    fn counts_both_windows() {
        let a = activity(7, 4);
        assert_eq!(a.recent_count, 7);
        assert_eq!(a.previous_count, 4);
        assert_eq!(a.days_analyzed, 90);
    }

    #[test]
    fn classifies_trend() {
        assert_eq!(activity(13, 10).trend, Trend::Increasing);
        assert_eq!(activity(12, 10).trend, Trend::Stable);
        assert_eq!(activity(8, 10).trend, Trend::Stable);
        assert_eq!(activity(7, 10).trend, Trend::Decreasing);
    }

    #[test]
    fn zero_previous_is_stable() {
        assert_eq!(activity(50, 0).trend, Trend::Stable);
    }

    #[test]
    fn undated_records_are_ignored() {
        let mut records = dated(2, 0);
        records[0].created_at = None;
        let refs: Vec<&IncidentRecord> = records.iter().collect();
        assert_eq!(recent_activity(&refs, now(), 90).recent_count, 1);
    }
}

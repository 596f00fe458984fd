//! Shared Socrata SODA API fetcher.
//!
//! Handles paginated fetching from any Socrata dataset using the `$limit`,
//! `$offset`, `$order`, and `$where` query parameters. Used by the NYC 311
//! and NYPD complaint feeds.

use std::fmt::Write as _;

use crate::retry::{self, DEFAULT_MAX_RETRIES};
use crate::{FetchOptions, SourceError};

/// Configuration for a Socrata fetch operation.
pub struct SocrataConfig<'a> {
    /// Base API URL (e.g., `"https://data.cityofnewyork.us/resource/erm2-nwe9.json"`).
    pub api_url: &'a str,
    /// The date column name for ordering and `$where` filtering.
    pub date_column: &'a str,
    /// Page size for pagination.
    pub page_size: u64,
    /// Column matched against the requested scope, if the dataset has one.
    pub scope_column: Option<&'a str>,
    /// Columns that must be non-null.
    pub required_columns: &'a [String],
    /// Label for log messages.
    pub label: &'a str,
}

/// Socrata timestamp layout for `$where` comparisons.
const SOQL_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S";

/// Builds the SoQL `$where` clause for a fetch.
///
/// The lookback window is always present. The scope filter is added only
/// when both a scope and a scope column exist.
///
/// # Panics
///
/// Writing to a `String` cannot fail, so this never panics.
#[must_use]
pub fn build_where_clause(config: &SocrataConfig<'_>, options: &FetchOptions) -> String {
    let mut clause = format!(
        "{col} >= '{since}' AND {col} <= '{until}'",
        col = config.date_column,
        since = options.since.format(SOQL_TIMESTAMP),
        until = options.as_of.format(SOQL_TIMESTAMP),
    );

    if let (Some(column), Some(scope)) = (config.scope_column, options.scope.as_deref()) {
        let escaped = scope.trim().to_uppercase().replace('\'', "''");
        write!(clause, " AND UPPER({column}) = '{escaped}'").unwrap();
    }

    for column in config.required_columns {
        write!(clause, " AND {column} IS NOT NULL").unwrap();
    }

    clause
}

/// Fetches all matching records from a Socrata dataset with pagination.
///
/// # Errors
///
/// Returns [`SourceError`] if an HTTP request fails after retries or the
/// response is not a JSON array.
pub async fn fetch_socrata(
    client: &reqwest::Client,
    config: &SocrataConfig<'_>,
    options: &FetchOptions,
) -> Result<Vec<serde_json::Value>, SourceError> {
    let where_clause = build_where_clause(config, options);
    let order = format!("{} DESC", config.date_column);
    let fetch_limit = options.limit.unwrap_or(u64::MAX);

    let mut all_records: Vec<serde_json::Value> = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let remaining = fetch_limit.saturating_sub(offset);
        if remaining == 0 {
            break;
        }
        let page_limit = remaining.min(config.page_size);

        log::info!(
            "Fetching {} data: offset={offset}, limit={page_limit}",
            config.label
        );

        let body = retry::send_json(
            || {
                client.get(config.api_url).query(&[
                    ("$limit", page_limit.to_string()),
                    ("$offset", offset.to_string()),
                    ("$order", order.clone()),
                    ("$where", where_clause.clone()),
                ])
            },
            DEFAULT_MAX_RETRIES,
        )
        .await?;

        let serde_json::Value::Array(records) = body else {
            return Err(SourceError::Normalization {
                message: format!("{}: expected a JSON array from Socrata", config.label),
            });
        };

        let count = records.len() as u64;
        if count == 0 {
            break;
        }

        all_records.extend(records);
        offset += count;

        if count < page_limit {
            break;
        }
    }

    log::info!(
        "Downloaded {} {} records total",
        all_records.len(),
        config.label
    );

    Ok(all_records)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use chrono::TimeZone as _;
    use chrono::Utc;

    use super::*;

    fn options(scope: Option<&str>) -> FetchOptions {
        FetchOptions {
            since: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            as_of: Utc.with_ymd_and_hms(2024, 6, 29, 12, 0, 0).unwrap(),
            limit: None,
            scope: scope.map(str::to_string),
            data_dir: PathBuf::from("."),
            tail_rows: 100,
            bulk_max_records: 100,
            request_timeout: Duration::from_secs(5),
        }
    }

    fn config<'a>(scope_column: Option<&'a str>, required: &'a [String]) -> SocrataConfig<'a> {
        SocrataConfig {
            api_url: "https://example.org/resource/x.json",
            date_column: "created_date",
            page_size: 1000,
            scope_column,
            required_columns: required,
            label: "test",
        }
    }

    #[test]
    fn where_clause_has_date_window() {
        let clause = build_where_clause(&config(None, &[]), &options(Some("Brooklyn")));
        assert_eq!(
            clause,
            "created_date >= '2024-01-01T00:00:00' AND created_date <= '2024-06-29T12:00:00'"
        );
    }

    #[test]
    fn where_clause_adds_uppercased_scope() {
        let clause = build_where_clause(&config(Some("borough"), &[]), &options(Some(" Brooklyn ")));
        assert!(clause.ends_with(" AND UPPER(borough) = 'BROOKLYN'"));
    }

    #[test]
    fn where_clause_escapes_quotes() {
        let clause =
            build_where_clause(&config(Some("borough"), &[]), &options(Some("Hell's Kitchen")));
        assert!(clause.contains("'HELL''S KITCHEN'"));
    }

    #[test]
    fn where_clause_requires_columns() {
        let required = vec!["latitude".to_string(), "longitude".to_string()];
        let clause = build_where_clause(&config(Some("boro_nm"), &required), &options(None));
        assert!(!clause.contains("UPPER"));
        assert!(clause.ends_with(" AND latitude IS NOT NULL AND longitude IS NOT NULL"));
    }
}

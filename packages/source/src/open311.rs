//! Open311 `GeoReport` v2 fetcher.
//!
//! Pages through `requests.json` once per configured status. The public
//! endpoints throttle aggressively, so requests are not retried: a 429
//! ends the fetch and whatever was collected so far is returned.

use chrono::Duration;

use crate::parsing::parse_timestamp;
use crate::retry;
use crate::{FetchOptions, SourceError};

/// Configuration for an Open311 fetch operation.
pub struct Open311Config<'a> {
    /// Requests endpoint URL.
    pub api_url: &'a str,
    /// Statuses to page through.
    pub statuses: &'a [String],
    /// Records per page.
    pub page_size: u32,
    /// Maximum pages per status.
    pub max_pages: u32,
    /// Field holding the request timestamp.
    pub date_field: &'a str,
    /// Only records newer than this many days are kept.
    pub recent_days: i64,
    /// Label for log messages.
    pub label: &'a str,
}

/// Fetches recent requests from an Open311 endpoint.
///
/// # Errors
///
/// Returns [`SourceError`] if a request fails for any reason other than
/// rate limiting, or a page is not a JSON array.
pub async fn fetch_open311(
    client: &reqwest::Client,
    config: &Open311Config<'_>,
    options: &FetchOptions,
) -> Result<Vec<serde_json::Value>, SourceError> {
    let cutoff = options
        .since
        .max(options.as_of - Duration::days(config.recent_days));
    let mut all_records: Vec<serde_json::Value> = Vec::new();

    'statuses: for status in config.statuses {
        for page in 1..=config.max_pages {
            log::info!("Fetching {} data: status={status}, page={page}", config.label);

            let body = match retry::send_json(
                || {
                    client.get(config.api_url).query(&[
                        ("status", status.clone()),
                        ("page", page.to_string()),
                        ("per_page", config.page_size.to_string()),
                    ])
                },
                0,
            )
            .await
            {
                Ok(body) => body,
                Err(SourceError::RateLimited) => {
                    log::warn!(
                        "{} rate limited; keeping {} records collected so far",
                        config.label,
                        all_records.len()
                    );
                    break 'statuses;
                }
                Err(e) => return Err(e),
            };

            let serde_json::Value::Array(records) = body else {
                return Err(SourceError::Normalization {
                    message: format!("{}: expected a JSON array from Open311", config.label),
                });
            };

            let count = records.len();
            if count == 0 {
                break;
            }

            // Requests with an unreadable timestamp are kept.
            all_records.extend(records.into_iter().filter(|r| {
                r.get(config.date_field)
                    .and_then(|v| v.as_str())
                    .and_then(parse_timestamp)
                    .is_none_or(|t| t >= cutoff)
            }));

            if count < config.page_size as usize {
                break;
            }
        }
    }

    log::info!(
        "Downloaded {} recent {} records",
        all_records.len(),
        config.label
    );

    Ok(all_records)
}

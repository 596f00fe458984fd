//! Runtime settings read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `CIVIC_SAFETY_CITY` | `nyc` |
//! | `CIVIC_SAFETY_CACHE_TTL_SECS` | `3600` |
//! | `CIVIC_SAFETY_LOOKBACK_DAYS` | `180` (at most `365`) |
//! | `CIVIC_SAFETY_UPSTREAM_TIMEOUT_SECS` | `60` |
//! | `CIVIC_SAFETY_DATA_DIR` | `.` |
//! | `CIVIC_SAFETY_BULK_TAIL_ROWS` | `50000` |
//! | `CIVIC_SAFETY_BULK_MAX_RECORDS` | `10000` |
//! | `CIVIC_SAFETY_API_MAX_RECORDS` | `10000` |
//! | `GOOGLE_API_KEY` | unset |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Longest lookback window accepted, in days.
pub const MAX_LOOKBACK_DAYS: i64 = 365;

/// Errors raised while reading settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("Invalid value for {name}: {value:?} ({message})")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        message: String,
    },
}

/// Settings for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// City profile id.
    pub city: String,
    /// How long an ingested dataset is served before re-ingesting.
    pub cache_ttl: Duration,
    /// How far back feeds are read, in days.
    pub lookback_days: i64,
    /// Deadline for one feed's whole fetch.
    pub upstream_timeout: Duration,
    /// Directory holding bulk CSV extracts.
    pub data_dir: PathBuf,
    /// Trailing rows read from each bulk extract.
    pub bulk_tail_rows: usize,
    /// Records kept from each bulk extract.
    pub bulk_max_records: usize,
    /// Records requested from each paginated API feed per pass.
    pub api_max_records: u64,
    /// Enables the Google geocoder when set.
    pub google_api_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            city: "nyc".to_string(),
            cache_ttl: Duration::from_secs(3600),
            lookback_days: 180,
            upstream_timeout: Duration::from_secs(60),
            data_dir: PathBuf::from("."),
            bulk_tail_rows: 50_000,
            bulk_max_records: 10_000,
            api_max_records: 10_000,
            google_api_key: None,
        }
    }
}

impl EngineConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set but cannot be
    /// parsed or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset
    /// or empty variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set but cannot be
    /// parsed or is out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let lookback_days: i64 = parse_or(
            get("CIVIC_SAFETY_LOOKBACK_DAYS"),
            "CIVIC_SAFETY_LOOKBACK_DAYS",
            defaults.lookback_days,
        )?;
        if lookback_days < 1 {
            return Err(invalid(
                "CIVIC_SAFETY_LOOKBACK_DAYS",
                &lookback_days.to_string(),
                "must be at least 1",
            ));
        }
        let lookback_days = if lookback_days > MAX_LOOKBACK_DAYS {
            log::warn!("Lookback of {lookback_days} days capped at {MAX_LOOKBACK_DAYS}");
            MAX_LOOKBACK_DAYS
        } else {
            lookback_days
        };

        let timeout_secs: u64 = parse_or(
            get("CIVIC_SAFETY_UPSTREAM_TIMEOUT_SECS"),
            "CIVIC_SAFETY_UPSTREAM_TIMEOUT_SECS",
            defaults.upstream_timeout.as_secs(),
        )?;
        if timeout_secs == 0 {
            return Err(invalid(
                "CIVIC_SAFETY_UPSTREAM_TIMEOUT_SECS",
                "0",
                "must be at least 1",
            ));
        }

        let api_max_records: u64 = parse_or(
            get("CIVIC_SAFETY_API_MAX_RECORDS"),
            "CIVIC_SAFETY_API_MAX_RECORDS",
            defaults.api_max_records,
        )?;
        if api_max_records == 0 {
            return Err(invalid(
                "CIVIC_SAFETY_API_MAX_RECORDS",
                "0",
                "must be at least 1",
            ));
        }

        Ok(Self {
            city: get("CIVIC_SAFETY_CITY")
                .map_or(defaults.city, |c| c.trim().to_lowercase()),
            cache_ttl: Duration::from_secs(parse_or(
                get("CIVIC_SAFETY_CACHE_TTL_SECS"),
                "CIVIC_SAFETY_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            lookback_days,
            upstream_timeout: Duration::from_secs(timeout_secs),
            data_dir: get("CIVIC_SAFETY_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            bulk_tail_rows: parse_or(
                get("CIVIC_SAFETY_BULK_TAIL_ROWS"),
                "CIVIC_SAFETY_BULK_TAIL_ROWS",
                defaults.bulk_tail_rows,
            )?,
            bulk_max_records: parse_or(
                get("CIVIC_SAFETY_BULK_MAX_RECORDS"),
                "CIVIC_SAFETY_BULK_MAX_RECORDS",
                defaults.bulk_max_records,
            )?,
            api_max_records,
            google_api_key: get("GOOGLE_API_KEY"),
        })
    }

    /// Returns a copy targeting `city`.
    #[must_use]
    pub fn with_city(mut self, city: &str) -> Self {
        self.city = city.trim().to_lowercase();
        self
    }
}

fn parse_or<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(name, &value, &e.to_string()))
    })
}

fn invalid(name: &'static str, value: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EngineConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(from_pairs(&[]).unwrap(), EngineConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = from_pairs(&[
            ("CIVIC_SAFETY_CITY", " SF "),
            ("CIVIC_SAFETY_CACHE_TTL_SECS", "60"),
            ("CIVIC_SAFETY_LOOKBACK_DAYS", "30"),
            ("CIVIC_SAFETY_DATA_DIR", "/data"),
            ("CIVIC_SAFETY_API_MAX_RECORDS", "2500"),
            ("GOOGLE_API_KEY", "key"),
        ])
        .unwrap();
        assert_eq!(config.api_max_records, 2500);
        assert_eq!(config.city, "sf");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.lookback_days, 30);
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.google_api_key.as_deref(), Some("key"));
    }

    #[test]
    fn empty_values_use_defaults() {
        let config = from_pairs(&[("GOOGLE_API_KEY", ""), ("CIVIC_SAFETY_CITY", "  ")]).unwrap();
        assert_eq!(config.google_api_key, None);
        assert_eq!(config.city, "nyc");
    }

    #[test]
    fn lookback_is_capped() {
        let config = from_pairs(&[("CIVIC_SAFETY_LOOKBACK_DAYS", "900")]).unwrap();
        assert_eq!(config.lookback_days, MAX_LOOKBACK_DAYS);
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(from_pairs(&[("CIVIC_SAFETY_CACHE_TTL_SECS", "soon")]).is_err());
        assert!(from_pairs(&[("CIVIC_SAFETY_LOOKBACK_DAYS", "0")]).is_err());
        assert!(from_pairs(&[("CIVIC_SAFETY_UPSTREAM_TIMEOUT_SECS", "0")]).is_err());
        assert!(from_pairs(&[("CIVIC_SAFETY_API_MAX_RECORDS", "0")]).is_err());
        assert!(from_pairs(&[("CIVIC_SAFETY_BULK_TAIL_ROWS", "-5")]).is_err());
    }
}

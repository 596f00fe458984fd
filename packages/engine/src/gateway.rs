//! Ingestion gateway: fetches every feed of a city, categorizes the
//! reports, and assembles one deduplicated record set.
//!
//! Feeds are fetched one after another, each under a hard deadline. A feed
//! that errors or times out is logged and skipped. Ingestion fails only
//! when no feed succeeds.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use civic_safety_geo::GeoPoint;
use civic_safety_geo::geocode::{GazetteerEntry, nearest_entry};
use civic_safety_source::{FetchOptions, IncidentSource, SourceError};
use civic_safety_source_models::{IncidentRecord, NormalizedReport};
use civic_safety_taxonomy::Categorizer;

use crate::EngineError;
use crate::city::AreaAliases;

/// Farthest a report may lie from a neighborhood centroid and still be
/// assigned to it.
pub const AREA_MATCH_MILES: f64 = 1.0;

/// Result of one ingestion pass.
#[derive(Debug)]
pub struct Ingested {
    /// Categorized, deduplicated records in feed order.
    pub records: Vec<IncidentRecord>,
    /// Ids of feeds that failed.
    pub failed_sources: Vec<String>,
}

/// Fetches and categorizes a city's feeds.
pub struct IngestionGateway {
    sources: Vec<Arc<dyn IncidentSource>>,
    categorizer: Categorizer,
    aliases: AreaAliases,
    centroids: Vec<GazetteerEntry>,
    timeout: Duration,
}

impl std::fmt::Debug for IngestionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionGateway")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl IngestionGateway {
    /// Creates a gateway over `sources`, each limited to `timeout`.
    #[must_use]
    pub fn new(
        sources: Vec<Arc<dyn IncidentSource>>,
        categorizer: Categorizer,
        aliases: AreaAliases,
        timeout: Duration,
    ) -> Self {
        Self {
            sources,
            categorizer,
            aliases,
            centroids: Vec::new(),
            timeout,
        }
    }

    /// Assigns reports that carry no area label to the nearest of
    /// `centroids`.
    #[must_use]
    pub fn with_centroids(mut self, centroids: Vec<GazetteerEntry>) -> Self {
        self.centroids = centroids;
        self
    }

    /// Ids of the configured feeds, in fetch order.
    #[must_use]
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Runs one ingestion pass.
    ///
    /// Area names are canonicalized, so a scoped pass keeps only records
    /// whose canonical area equals `options.scope`. Reports without an area
    /// label take the nearest centroid's area, if one is close enough. Records repeated across
    /// feeds of the same data source are kept once, first feed winning.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AllSourcesFailed`] if no feed could be read.
    pub async fn ingest(&self, options: &FetchOptions) -> Result<Ingested, EngineError> {
        let mut records: Vec<IncidentRecord> = Vec::new();
        let mut seen = HashSet::new();
        let mut failures: Vec<String> = Vec::new();
        let mut failed_sources: Vec<String> = Vec::new();
        let mut succeeded = 0usize;

        for source in &self.sources {
            let reports = match self.fetch_one(source.as_ref(), options).await {
                Ok(reports) => reports,
                Err(e) => {
                    log::warn!("[{}] fetch failed: {e}", source.id());
                    failures.push(format!("{}: {e}", source.id()));
                    failed_sources.push(source.id().to_string());
                    continue;
                }
            };
            succeeded += 1;

            let before = records.len();
            let mut duplicates = 0usize;
            for mut report in reports {
                report.area_name = report
                    .area_name
                    .as_deref()
                    .and_then(|a| self.aliases.canonical(a))
                    .or_else(|| self.nearest_area(&report));

                if options.scope.is_some() && report.area_name != options.scope {
                    continue;
                }

                if !seen.insert((report.data_source, report.id.clone())) {
                    duplicates += 1;
                    continue;
                }

                let categorization = self
                    .categorizer
                    .categorize(report.data_source, &report.complaint_type);
                records.push(IncidentRecord::categorized(report, categorization));
            }

            log::info!(
                "[{}] kept {} records ({duplicates} duplicates)",
                source.id(),
                records.len() - before
            );
        }

        if succeeded == 0 {
            log::error!("All {} feeds failed", self.sources.len());
            return Err(EngineError::AllSourcesFailed { failures });
        }

        log::info!(
            "Ingested {} records from {succeeded}/{} feeds",
            records.len(),
            self.sources.len()
        );

        Ok(Ingested {
            records,
            failed_sources,
        })
    }

    fn nearest_area(&self, report: &NormalizedReport) -> Option<String> {
        let point = GeoPoint::new(report.latitude, report.longitude);
        nearest_entry(&self.centroids, point, AREA_MATCH_MILES)
            .and_then(|e| self.aliases.canonical(&e.name))
    }

    async fn fetch_one(
        &self,
        source: &dyn IncidentSource,
        options: &FetchOptions,
    ) -> Result<Vec<NormalizedReport>, SourceError> {
        log::info!("[{}] fetching {}", source.id(), source.name());
        tokio::time::timeout(self.timeout, source.fetch(options))
            .await
            .map_err(|_| SourceError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use civic_safety_source_models::NormalizedReport;
    use civic_safety_taxonomy_models::DataSource;

    use super::*;

    /// What a fake feed does when fetched.
    #[derive(Debug, Clone)]
    pub enum Behavior {
        Reports(Vec<NormalizedReport>),
        Fail,
        Hang,
    }

    /// An in-memory feed that counts its fetches and remembers the last
    /// options it was given.
    pub struct FakeSource {
        pub id: String,
        pub data_source: DataSource,
        pub behavior: std::sync::Mutex<Behavior>,
        pub calls: AtomicUsize,
        pub last_options: std::sync::Mutex<Option<FetchOptions>>,
    }

    impl FakeSource {
        pub fn new(id: &str, data_source: DataSource, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                data_source,
                behavior: std::sync::Mutex::new(behavior),
                calls: AtomicUsize::new(0),
                last_options: std::sync::Mutex::new(None),
            })
        }

        pub fn set(&self, behavior: Behavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_options(&self) -> Option<FetchOptions> {
            self.last_options.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IncidentSource for FakeSource {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            &self.id
        }

        fn data_source(&self) -> DataSource {
            self.data_source
        }

        async fn fetch(
            &self,
            options: &FetchOptions,
        ) -> Result<Vec<NormalizedReport>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_options.lock().unwrap() = Some(options.clone());
            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                Behavior::Reports(reports) => Ok(reports),
                Behavior::Fail => Err(SourceError::Normalization {
                    message: "upstream unavailable".to_string(),
                }),
                Behavior::Hang => {
                    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn report(
        id: &str,
        data_source: DataSource,
        complaint: &str,
        area: Option<&str>,
        zip: Option<&str>,
        lat: f64,
        lng: f64,
        created_at: DateTime<Utc>,
    ) -> NormalizedReport {
        NormalizedReport {
            id: id.to_string(),
            created_at: Some(created_at),
            closed_at: None,
            complaint_type: complaint.to_string(),
            descriptor: None,
            address: None,
            zip_code: zip.map(str::to_string),
            area_name: area.map(str::to_string),
            latitude: lat,
            longitude: lng,
            data_source,
        }
    }

    /// `count` noise complaints in Brooklyn, ZIP 11201, one day before `now`.
    pub fn brooklyn_noise(prefix: &str, count: usize, now: DateTime<Utc>) -> Vec<NormalizedReport> {
        (0..count)
            .map(|i| {
                report(
                    &format!("{prefix}-{i}"),
                    DataSource::Service311,
                    "Noise - Residential",
                    Some("Brooklyn"),
                    Some("11201"),
                    40.6943,
                    -73.9903,
                    now - Duration::days(1),
                )
            })
            .collect()
    }
}

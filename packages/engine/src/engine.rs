//! The public rating operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use civic_safety_analysis::Analyzer;
use civic_safety_analysis::fallback::{fallback_rating, fallback_separated};
use civic_safety_analysis_models::{AreaQuery, AreaRating, DEFAULT_RADIUS_MILES, SeparatedAreaRating};
use civic_safety_geo::filter::{AreaFilter, IndexedRecords};
use civic_safety_geo::geocode::{ChainGeocoder, GazetteerGeocoder, Geocoder, GoogleGeocoder};
use civic_safety_source::registry::feeds_for_city;
use civic_safety_source::{FetchOptions, IncidentSource};
use civic_safety_taxonomy::Categorizer;

use crate::cache::{CacheKey, Dataset, DatasetCache};
use crate::gateway::IngestionGateway;
use crate::{CityProfile, Clock, EngineConfig, EngineError, SystemClock};

/// Rates areas of one city from cached live data.
pub struct SafetyEngine {
    profile: CityProfile,
    config: EngineConfig,
    gateway: IngestionGateway,
    analyzer: Analyzer,
    geocoder: Box<dyn Geocoder>,
    clock: Arc<dyn Clock>,
    cache: DatasetCache,
    // Serializes ingestion so concurrent misses fetch once.
    load_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for SafetyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyEngine")
            .field("city", &self.profile.id)
            .field("gateway", &self.gateway)
            .field("geocoder", &self.geocoder.name())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl SafetyEngine {
    /// Assembles an engine from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Taxonomy`] if the profile's taxonomies fail
    /// validation.
    pub fn new(
        profile: CityProfile,
        config: EngineConfig,
        sources: Vec<Arc<dyn IncidentSource>>,
        geocoder: Box<dyn Geocoder>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let categorizer = Categorizer::new(profile.taxonomies.clone())?;
        let gateway = IngestionGateway::new(
            sources,
            categorizer,
            profile.aliases.clone(),
            config.upstream_timeout,
        )
        .with_centroids(profile.gazetteer.clone());
        let ttl = Duration::from_std(config.cache_ttl).unwrap_or(Duration::MAX);

        log::info!(
            "Safety engine for {} ready: feeds {:?}, cache TTL {}s",
            profile.name,
            gateway.source_ids(),
            config.cache_ttl.as_secs()
        );

        Ok(Self {
            analyzer: Analyzer::new(profile.taxonomies.clone()),
            profile,
            config,
            gateway,
            geocoder,
            clock,
            cache: DatasetCache::new(ttl),
            load_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Builds an engine for `config.city` with its embedded feeds, the
    /// Google geocoder when a key is configured, the city gazetteer, and
    /// the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedCity`] for an unknown city and
    /// [`EngineError::Http`] if the geocoding client cannot be built.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let profile = CityProfile::load(&config.city)?;

        let sources: Vec<Arc<dyn IncidentSource>> = feeds_for_city(&profile.id)
            .into_iter()
            .map(|feed| Arc::new(feed) as Arc<dyn IncidentSource>)
            .collect();

        let mut geocoders: Vec<Box<dyn Geocoder>> = Vec::new();
        if let Some(key) = &config.google_api_key {
            let client = reqwest::Client::builder()
                .timeout(config.upstream_timeout)
                .build()?;
            geocoders.push(Box::new(GoogleGeocoder::new(client, key.clone())));
        } else {
            log::info!("GOOGLE_API_KEY not set; addresses resolve through the gazetteer only");
        }
        geocoders.push(Box::new(GazetteerGeocoder::new(profile.gazetteer.clone())));

        Self::new(
            profile,
            config,
            sources,
            Box::new(ChainGeocoder::new(geocoders)),
            Arc::new(SystemClock),
        )
    }

    /// The city this engine serves.
    #[must_use]
    pub const fn profile(&self) -> &CityProfile {
        &self.profile
    }

    /// The settings this engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ids of the configured feeds.
    #[must_use]
    pub fn source_ids(&self) -> Vec<&str> {
        self.gateway.source_ids()
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Rates the area described by `query` on a single scale.
    ///
    /// Falls back to the city's static table when no data can be loaded.
    pub async fn get_rating(&self, query: &AreaQuery) -> AreaRating {
        let scope = self.scope_for(query);
        let Some(dataset) = self.dataset(scope.as_deref()).await else {
            return fallback_rating(
                &self.profile.fallback,
                scope.as_deref(),
                self.analyzer.trend_days(),
            );
        };

        let filter = self.resolve_filter(query, scope).await;
        let records = dataset.records.filter(&filter);
        log::info!(
            "Rating {} of {} records for {query:?}",
            records.len(),
            dataset.records.len()
        );
        self.analyzer.rate(&records, self.clock.now())
    }

    /// Rates police crime and 311 quality of life separately.
    pub async fn get_separated_rating(&self, query: &AreaQuery) -> SeparatedAreaRating {
        let scope = self.scope_for(query);
        let Some(dataset) = self.dataset(scope.as_deref()).await else {
            return fallback_separated();
        };

        let filter = self.resolve_filter(query, scope).await;
        let records = dataset.records.filter(&filter);
        log::info!(
            "Separated rating over {} of {} records for {query:?}",
            records.len(),
            dataset.records.len()
        );
        self.analyzer.rate_separated(&records, self.clock.now())
    }

    /// Rates every area in the city-wide dataset.
    ///
    /// Returns an empty map when no data can be loaded.
    pub async fn compare_areas(&self) -> BTreeMap<String, AreaRating> {
        let Some(dataset) = self.dataset(None).await else {
            return BTreeMap::new();
        };
        self.analyzer
            .compare(dataset.records.records(), self.clock.now())
    }

    /// Drops the cached dataset for `area` (or the whole city) and ingests
    /// it again.
    ///
    /// Returns `false` if ingestion failed. The old dataset stays dropped
    /// either way, so later queries never see data older than the refresh.
    pub async fn refresh(&self, area: Option<&str>) -> bool {
        let scope = area.and_then(|a| self.profile.canonical_area(a));
        let key = self.cache_key(scope.as_deref());
        let _guard = self.load_lock.lock().await;

        self.cache.invalidate(&key);
        log::info!("Refreshing {key:?}");

        match self.load(&key, self.clock.now()).await {
            Ok(dataset) => {
                log::info!("Refreshed {key:?}: {} records", dataset.records.len());
                true
            }
            Err(e) => {
                log::error!("Refresh of {key:?} failed: {e}");
                false
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn scope_for(&self, query: &AreaQuery) -> Option<String> {
        query
            .area_name
            .as_deref()
            .and_then(|a| self.profile.canonical_area(a))
    }

    fn cache_key(&self, scope: Option<&str>) -> CacheKey {
        CacheKey::new(&self.profile.id, scope)
    }

    /// Returns a fresh dataset for `scope`, ingesting on a miss. When
    /// ingestion fails, a stale dataset is served if one exists.
    async fn dataset(&self, scope: Option<&str>) -> Option<Arc<Dataset>> {
        let key = self.cache_key(scope);
        if let Some(dataset) = self.cache.get_fresh(&key, self.clock.now()) {
            return Some(dataset);
        }

        let _guard = self.load_lock.lock().await;
        let now = self.clock.now();
        if let Some(dataset) = self.cache.get_fresh(&key, now) {
            return Some(dataset);
        }

        match self.load(&key, now).await {
            Ok(dataset) => Some(dataset),
            Err(e) => {
                let stale = self.cache.get_any(&key);
                if let Some(old) = &stale {
                    log::warn!(
                        "Ingestion failed ({e}); serving data from {}",
                        old.fetched_at
                    );
                } else {
                    log::warn!("Ingestion failed ({e}); no cached data for {key:?}");
                }
                stale
            }
        }
    }

    async fn load(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Arc<Dataset>, EngineError> {
        let options = self.fetch_options(key.scope.clone(), now);
        let ingested = self.gateway.ingest(&options).await?;
        if !ingested.failed_sources.is_empty() {
            log::warn!(
                "Caching partial dataset for {key:?}; failed feeds: {:?}",
                ingested.failed_sources
            );
        }

        Ok(self.cache.put(
            key.clone(),
            Dataset {
                records: IndexedRecords::new(ingested.records),
                fetched_at: now,
                failed_sources: ingested.failed_sources,
            },
        ))
    }

    fn fetch_options(&self, scope: Option<String>, now: DateTime<Utc>) -> FetchOptions {
        FetchOptions {
            since: now - Duration::days(self.config.lookback_days),
            as_of: now,
            limit: Some(self.config.api_max_records),
            scope,
            data_dir: self.config.data_dir.clone(),
            tail_rows: self.config.bulk_tail_rows,
            bulk_max_records: self.config.bulk_max_records,
            request_timeout: self.config.upstream_timeout,
        }
    }

    /// Turns a query into a record filter. An address that cannot be
    /// geocoded leaves only the ZIP and area filters.
    async fn resolve_filter(&self, query: &AreaQuery, scope: Option<String>) -> AreaFilter {
        let mut filter = AreaFilter {
            radius: None,
            zip_code: non_blank(query.zip_code.as_deref()),
            area_name: scope,
        };

        let Some(address) = non_blank(query.address.as_deref()) else {
            return filter;
        };

        match self.geocoder.geocode(&address).await {
            Ok(Some(center)) => {
                filter.radius = Some((center, radius_miles(query)));
            }
            Ok(None) => {
                log::warn!("No coordinates for '{address}'; filtering by ZIP/area");
            }
            Err(e) => {
                log::warn!("Geocoding '{address}' failed: {e}; filtering by ZIP/area");
            }
        }

        filter
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn radius_miles(query: &AreaQuery) -> f64 {
    if query.radius_miles.is_finite() && query.radius_miles > 0.0 {
        query.radius_miles
    } else {
        log::warn!(
            "Radius {} is not usable; using {DEFAULT_RADIUS_MILES} miles",
            query.radius_miles
        );
        DEFAULT_RADIUS_MILES
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone as _;
    use civic_safety_analysis_models::{Grade, RatingBasis};
    use civic_safety_geo::GeoPoint;
    use civic_safety_geo::geocode::GeocodeError;
    use civic_safety_taxonomy_models::DataSource;

    use super::*;
    use crate::clock::ManualClock;
    use crate::gateway::test_support::{Behavior, FakeSource, brooklyn_noise, report};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    enum FakeGeocoder {
        At(GeoPoint),
        Nothing,
        Broken,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        fn name(&self) -> &str {
            "fake"
        }

        async fn geocode(&self, _address: &str) -> Result<Option<GeoPoint>, GeocodeError> {
            match self {
                Self::At(point) => Ok(Some(*point)),
                Self::Nothing => Ok(None),
                Self::Broken => Err(GeocodeError::RateLimited),
            }
        }
    }

    struct Harness {
        engine: SafetyEngine,
        clock: Arc<ManualClock>,
        complaints: Arc<FakeSource>,
        police: Arc<FakeSource>,
    }

    fn harness(complaints: Behavior, police: Behavior, geocoder: FakeGeocoder) -> Harness {
        let clock = Arc::new(ManualClock::new(t0()));
        let complaints = FakeSource::new("fake_311", DataSource::Service311, complaints);
        let police = FakeSource::new("fake_police", DataSource::Police, police);
        let engine = SafetyEngine::new(
            CityProfile::load("nyc").unwrap(),
            EngineConfig::default(),
            vec![
                Arc::clone(&complaints) as Arc<dyn IncidentSource>,
                Arc::clone(&police) as Arc<dyn IncidentSource>,
            ],
            Box::new(geocoder),
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();
        Harness {
            engine,
            clock,
            complaints,
            police,
        }
    }

    fn brooklyn_harness(count: usize) -> Harness {
        harness(
            Behavior::Reports(brooklyn_noise("n", count, t0())),
            Behavior::Reports(Vec::new()),
            FakeGeocoder::Nothing,
        )
    }

    #[tokio::test]
    async fn reuses_dataset_within_ttl() {
        let h = brooklyn_harness(4);
        let query = AreaQuery::for_zip("11201");

        h.engine.get_rating(&query).await;
        h.clock.advance(Duration::seconds(10));
        h.engine.get_rating(&query).await;

        assert_eq!(h.complaints.calls(), 1);
        assert_eq!(h.police.calls(), 1);
    }

    #[tokio::test]
    async fn api_feeds_are_capped() {
        let h = brooklyn_harness(1);
        h.engine.get_rating(&AreaQuery::for_zip("11201")).await;

        let options = h.complaints.last_options().unwrap();
        assert_eq!(options.limit, Some(EngineConfig::default().api_max_records));
        assert_eq!(options.scope, None);
        assert_eq!(options.since, t0() - Duration::days(180));
    }

    #[tokio::test]
    async fn reingests_after_ttl() {
        let h = brooklyn_harness(4);
        let query = AreaQuery::for_zip("11201");

        h.engine.get_rating(&query).await;
        h.clock.advance(Duration::seconds(3601));
        h.engine.get_rating(&query).await;

        assert_eq!(h.complaints.calls(), 2);
    }

    #[tokio::test]
    async fn scoped_queries_use_their_own_dataset() {
        let h = brooklyn_harness(4);

        let rating = h.engine.get_rating(&AreaQuery::for_area("Kings")).await;
        assert_eq!(rating.metrics.total_incidents, 4);
        h.engine.get_rating(&AreaQuery::for_zip("11201")).await;
        h.engine.get_rating(&AreaQuery::for_area("brooklyn")).await;

        // One scoped pass for BROOKLYN, one city-wide pass.
        assert_eq!(h.complaints.calls(), 2);
    }

    #[tokio::test]
    async fn refresh_replaces_cached_data() {
        let h = brooklyn_harness(4);
        let query = AreaQuery::for_zip("11201");
        assert_eq!(h.engine.get_rating(&query).await.metrics.total_incidents, 4);

        h.complaints
            .set(Behavior::Reports(brooklyn_noise("m", 7, t0())));
        assert!(h.engine.refresh(None).await);

        assert_eq!(h.engine.get_rating(&query).await.metrics.total_incidents, 7);
        assert_eq!(h.complaints.calls(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_drops_old_data() {
        let h = brooklyn_harness(4);
        let query = AreaQuery::for_area("Staten Island");
        h.engine.get_rating(&query).await;

        h.complaints.set(Behavior::Fail);
        h.police.set(Behavior::Fail);
        assert!(!h.engine.refresh(Some("SI")).await);

        let rating = h.engine.get_rating(&query).await;
        assert_eq!(rating.basis, RatingBasis::Fallback);
    }

    #[tokio::test]
    async fn partial_failure_still_rates() {
        let h = harness(
            Behavior::Reports(brooklyn_noise("n", 3, t0())),
            Behavior::Fail,
            FakeGeocoder::Nothing,
        );
        let rating = h.engine.get_rating(&AreaQuery::for_zip("11201")).await;
        assert_eq!(rating.basis, RatingBasis::Live);
        assert_eq!(rating.metrics.total_incidents, 3);
    }

    #[tokio::test]
    async fn total_failure_without_cache_falls_back() {
        let h = harness(Behavior::Fail, Behavior::Fail, FakeGeocoder::Nothing);

        let rating = h.engine.get_rating(&AreaQuery::for_area("Richmond")).await;
        assert_eq!(rating.basis, RatingBasis::Fallback);
        assert!((rating.score - 4.0).abs() < f64::EPSILON);
        assert_eq!(rating.grade, Grade::B);

        let separated = h
            .engine
            .get_separated_rating(&AreaQuery::for_area("Richmond"))
            .await;
        assert!(!separated.personal_safety.available);
        assert!(!separated.neighborhood_quality.available);

        assert!(h.engine.compare_areas().await.is_empty());
    }

    #[tokio::test]
    async fn total_failure_with_stale_cache_serves_stale() {
        let h = brooklyn_harness(4);
        let query = AreaQuery::for_zip("11201");
        h.engine.get_rating(&query).await;

        h.complaints.set(Behavior::Fail);
        h.police.set(Behavior::Fail);
        h.clock.advance(Duration::seconds(7200));

        let rating = h.engine.get_rating(&query).await;
        assert_eq!(rating.basis, RatingBasis::Live);
        assert_eq!(rating.metrics.total_incidents, 4);
        assert_eq!(h.complaints.calls(), 2);
    }

    #[tokio::test]
    async fn unmatched_area_is_insufficient_data() {
        let h = brooklyn_harness(4);

        let rating = h.engine.get_rating(&AreaQuery::for_zip("99999")).await;
        assert!((rating.score - 3.0).abs() < f64::EPSILON);
        assert_eq!(rating.grade, Grade::C);
        assert_eq!(rating.basis, RatingBasis::InsufficientData);

        let separated = h
            .engine
            .get_separated_rating(&AreaQuery::for_zip("99999"))
            .await;
        assert!(!separated.personal_safety.available);
        assert!(!separated.neighborhood_quality.available);
    }

    #[tokio::test]
    async fn query_without_locator_matches_nothing() {
        let h = brooklyn_harness(4);
        let rating = h.engine.get_rating(&AreaQuery::default()).await;
        assert_eq!(rating.metrics.total_incidents, 0);
        assert_eq!(rating.basis, RatingBasis::InsufficientData);
    }

    #[tokio::test]
    async fn geocode_failure_degrades_to_zip() {
        let h = harness(
            Behavior::Reports(brooklyn_noise("n", 4, t0())),
            Behavior::Reports(Vec::new()),
            FakeGeocoder::Broken,
        );
        let query = AreaQuery {
            zip_code: Some("11201".to_string()),
            address: Some("1 Main St".to_string()),
            ..AreaQuery::default()
        };
        let rating = h.engine.get_rating(&query).await;
        assert_eq!(rating.metrics.total_incidents, 4);
    }

    #[tokio::test]
    async fn geocoded_address_filters_by_radius() {
        let mut reports = brooklyn_noise("near", 3, t0());
        // About 1.4 miles north of the Brooklyn points.
        reports.push(report(
            "far",
            DataSource::Service311,
            "Noise",
            Some("MANHATTAN"),
            Some("10038"),
            40.7143,
            -73.9903,
            t0(),
        ));
        let h = harness(
            Behavior::Reports(reports),
            Behavior::Reports(Vec::new()),
            FakeGeocoder::At(GeoPoint::new(40.6943, -73.9903)),
        );

        let rating = h
            .engine
            .get_rating(&AreaQuery::for_address("Brooklyn Heights").with_radius(0.5))
            .await;
        assert_eq!(rating.metrics.total_incidents, 3);
    }

    #[tokio::test]
    async fn separated_rating_splits_sources() {
        let h = harness(
            Behavior::Reports(brooklyn_noise("n", 8, t0())),
            Behavior::Reports(vec![report(
                "p1",
                DataSource::Police,
                "ROBBERY",
                Some("BROOKLYN"),
                Some("11201"),
                40.6943,
                -73.9903,
                t0(),
            )]),
            FakeGeocoder::Nothing,
        );

        let rating = h
            .engine
            .get_separated_rating(&AreaQuery::for_zip("11201"))
            .await;
        assert_eq!(rating.data_points, 9);
        assert_eq!(
            rating.personal_safety.details.as_ref().unwrap().total_incidents,
            1
        );
        assert_eq!(
            rating
                .neighborhood_quality
                .details
                .as_ref()
                .unwrap()
                .total_incidents,
            8
        );
    }

    #[tokio::test]
    async fn compares_canonical_areas() {
        let mut reports = brooklyn_noise("b", 2, t0());
        reports.push(report(
            "q",
            DataSource::Service311,
            "Noise",
            Some("Queens"),
            None,
            40.72,
            -73.79,
            t0(),
        ));
        reports.push(report(
            "u",
            DataSource::Service311,
            "Noise",
            Some("Unspecified"),
            None,
            40.72,
            -73.79,
            t0(),
        ));
        let h = harness(
            Behavior::Reports(reports),
            Behavior::Reports(Vec::new()),
            FakeGeocoder::Nothing,
        );

        let ratings = h.engine.compare_areas().await;
        assert_eq!(ratings.keys().collect::<Vec<_>>(), ["BROOKLYN", "QUEENS"]);
        assert_eq!(ratings["BROOKLYN"].metrics.total_incidents, 2);
    }

    #[test]
    fn from_config_rejects_unknown_city() {
        let config = EngineConfig::default().with_city("gotham");
        assert!(matches!(
            SafetyEngine::from_config(config),
            Err(EngineError::UnsupportedCity { .. })
        ));
    }

    #[test]
    fn from_config_builds_embedded_feeds() {
        let engine = SafetyEngine::from_config(EngineConfig::default().with_city("sf")).unwrap();
        assert_eq!(engine.profile().id, "sf");
        assert_eq!(engine.source_ids().len(), 3);
    }

    #[test]
    fn unusable_radius_uses_default() {
        let query = AreaQuery::for_address("x").with_radius(-1.0);
        assert!((radius_miles(&query) - DEFAULT_RADIUS_MILES).abs() < f64::EPSILON);
        let query = AreaQuery::for_address("x").with_radius(f64::NAN);
        assert!((radius_miles(&query) - DEFAULT_RADIUS_MILES).abs() < f64::EPSILON);
    }
}

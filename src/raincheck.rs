//! The main entry point: strategy resolution, the prediction path with its
//! historical fallback, and the historical fan-out.

use crate::archive::RemoteArchive;
use crate::bucket::UtcBucket;
use crate::collaborators::geocode::NominatimGeocoder;
use crate::collaborators::script::{ScriptExtractor, ScriptPredictor};
use crate::collaborators::{Geolocator, RainPredictor, ValueExtractor};
use crate::config::RaincheckConfig;
use crate::error::RaincheckError;
use crate::history::HistoricalAggregator;
use crate::index::existence_index::ExistenceIndex;
use crate::predict::PredictionAdapter;
use crate::strategy::StrategySelector;
use crate::types::query::RainQuery;
use crate::types::report::RainAssessment;
use crate::utils;
use bon::bon;
use chrono::Utc;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// The rain-history client.
///
/// Answers "how likely is rain at this place and time of day?" from ~27
/// years of half-hourly precipitation measurements, or from a trained
/// model when the query is in the future inside the model's home region.
///
/// Collaborators (geolocation, value extraction, prediction) are injected
/// through the builder; the defaults shell out to the bundled scripts and
/// call Nominatim. State machine per query:
/// resolve strategy, then predict (falling back to the historical lookup on
/// any prediction failure) or look up directly. The historical path has no
/// fallback: its "no data" outcome is a valid terminal result.
///
/// # Examples
///
/// ```no_run
/// # use raincheck::{Raincheck, RainQuery, RaincheckError};
/// # use serde_json::json;
/// # async fn run() -> Result<(), RaincheckError> {
/// let client = Raincheck::with_defaults().await?;
/// client.build_index().await?;
///
/// let assessment = client
///     .assess_request(&json!({
///         "coords": [49.0, -123.0],
///         "date": "2020-06-15",
///         "time": "12:00",
///         "tzone": "-7",
///     }))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Raincheck {
    config: RaincheckConfig,
    index: Arc<ExistenceIndex>,
    selector: StrategySelector,
    aggregator: HistoricalAggregator,
    adapter: PredictionAdapter,
    archive: RemoteArchive,
}

#[bon]
impl Raincheck {
    /// Creates a client from a configuration and optional collaborator
    /// overrides. Collaborators left unset use the script-based defaults
    /// and the Nominatim geocoder.
    #[builder]
    pub fn new(
        config: Option<RaincheckConfig>,
        geolocator: Option<Arc<dyn Geolocator>>,
        extractor: Option<Arc<dyn ValueExtractor>>,
        predictor: Option<Arc<dyn RainPredictor>>,
    ) -> Self {
        let config = config.unwrap_or_default();
        let geolocator =
            geolocator.unwrap_or_else(|| Arc::new(NominatimGeocoder::new()) as Arc<dyn Geolocator>);
        let extractor = extractor.unwrap_or_else(|| {
            Arc::new(ScriptExtractor::new(config.extractor_program.clone()))
                as Arc<dyn ValueExtractor>
        });
        let predictor = predictor.unwrap_or_else(|| {
            Arc::new(ScriptPredictor::new(config.predictor_program.clone()))
                as Arc<dyn RainPredictor>
        });

        let index = Arc::new(ExistenceIndex::new(config.index_source.clone()));
        let aggregator = HistoricalAggregator::builder()
            .extractor(extractor)
            .index(index.clone())
            .naming(config.dataset.clone())
            .data_dir(config.data_dir.clone())
            .lookup_timeout(config.lookup_timeout)
            .max_parallel(config.max_parallel_lookups)
            .build()
            .with_thresholds(config.thresholds);
        let adapter = PredictionAdapter::new(predictor, config.prediction_timeout);
        let selector = StrategySelector::new(geolocator, config.home_region.clone());
        let archive = RemoteArchive::new(config.archive_root.clone(), config.dataset.clone());

        Raincheck {
            config,
            index,
            selector,
            aggregator,
            adapter,
            archive,
        }
    }

    /// Creates a client rooted in the per-user data directory, creating it
    /// if needed.
    pub async fn with_defaults() -> Result<Self, RaincheckError> {
        let root = utils::default_data_root().map_err(RaincheckError::DataDirResolution)?;
        utils::ensure_dir_exists(&root)
            .await
            .map_err(|e| RaincheckError::DataDirCreation(root.clone(), e))?;
        let config = RaincheckConfig::builder()
            .data_dir(root.clone())
            .index_source(root.join("file_index.txt"))
            .build();
        Ok(Self::builder().config(config).build())
    }

    pub fn config(&self) -> &RaincheckConfig {
        &self.config
    }

    /// The existence index, for readiness checks and diagnostics.
    pub fn index(&self) -> &ExistenceIndex {
        &self.index
    }

    /// (Re)builds the existence index from its backing list. Concurrent
    /// calls coalesce into one build.
    pub async fn build_index(&self) -> Result<(), RaincheckError> {
        self.index.build().await.map_err(RaincheckError::from)
    }

    /// Assesses a typed query.
    ///
    /// Everything past input validation degrades gracefully: strategy
    /// failures fall back to the historical record, per-year failures are
    /// absorbed as absent samples, and an empty record is reported as
    /// [`RainAssessment::NoData`].
    pub async fn assess(&self, query: &RainQuery) -> RainAssessment {
        let bucket = query.bucket();
        let decision = self
            .selector
            .decide(query, &bucket, Utc::now().naive_utc())
            .await;
        info!(
            "Strategy for ({}, {}) at {} {}: {}",
            query.latitude, query.longitude, query.local_date, query.local_time, decision.reason
        );

        if decision.use_prediction {
            match self.adapter.predict(query, query.city.as_deref()).await {
                Ok(report) => return RainAssessment::Report(report),
                // Terminal fallback, not a retry loop.
                Err(e) => warn!("Prediction failed ({e}); falling back to the historical record"),
            }
        }

        self.aggregator
            .aggregate(
                query,
                &bucket,
                self.config.first_year..=self.config.last_year,
            )
            .await
    }

    /// Parses the JSON request contract and assesses it.
    ///
    /// # Errors
    ///
    /// [`RaincheckError::Input`] when a required field is missing or
    /// malformed; this is the only request-level failure.
    pub async fn assess_request(
        &self,
        request: &serde_json::Value,
    ) -> Result<RainAssessment, RaincheckError> {
        let query = RainQuery::from_request(request)?;
        Ok(self.assess(&query).await)
    }

    /// Fetches one year's file for `bucket` from the remote archive into
    /// the data directory.
    pub async fn download_year(
        &self,
        year: i32,
        bucket: &UtcBucket,
    ) -> Result<PathBuf, RaincheckError> {
        self.archive
            .download(year, bucket, &self.config.data_dir)
            .await
            .map_err(RaincheckError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::error::CollaboratorError;
    use crate::collaborators::PredictionRequest;
    use crate::dataset::DatasetNaming;
    use crate::types::report::ReportSource;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    struct FixedGeolocator(Option<&'static str>);

    #[async_trait]
    impl Geolocator for FixedGeolocator {
        async fn country(&self, _latitude: f64, _longitude: f64) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    /// Rains 1.0 mm/hr in even years, dry in odd years.
    struct EvenYearRain;

    impl EvenYearRain {
        fn year_of(path: &Path) -> i32 {
            let name = path.file_name().unwrap().to_str().unwrap();
            name.split('.').nth(4).unwrap()[..4].parse().unwrap()
        }
    }

    #[async_trait]
    impl ValueExtractor for EvenYearRain {
        async fn extract(
            &self,
            _latitude: f64,
            _longitude: f64,
            file_path: &Path,
        ) -> Result<f64, CollaboratorError> {
            let year = Self::year_of(file_path);
            Ok(if year % 2 == 0 { 1.0 } else { 0.0 })
        }
    }

    struct FixedPredictor(Result<Value, ()>);

    #[async_trait]
    impl RainPredictor for FixedPredictor {
        async fn predict(&self, _request: &PredictionRequest) -> Result<Value, CollaboratorError> {
            self.0.clone().map_err(|_| CollaboratorError::UnparseableOutput)
        }
    }

    fn request(date: &str) -> Value {
        json!({
            "coords": [49.0, -123.0],
            "date": date,
            "time": "12:00",
            "tzone": "-7",
            "city": "Vancouver",
        })
    }

    /// Index backing file listing every year's identifier for the request's
    /// bucket.
    fn index_for(request: &Value, first: i32, last: i32) -> NamedTempFile {
        let query = RainQuery::from_request(request).unwrap();
        let bucket = query.bucket();
        let naming = DatasetNaming::default();
        let mut file = NamedTempFile::new().unwrap();
        for year in first..=last {
            if let Some((_, id)) = naming.identifier_for_year(year, &bucket) {
                writeln!(file, "{id}").unwrap();
            }
        }
        file.flush().unwrap();
        file
    }

    fn client(
        index_source: &Path,
        geolocator: Arc<dyn Geolocator>,
        predictor: Arc<dyn RainPredictor>,
    ) -> Raincheck {
        let config = RaincheckConfig::builder()
            .index_source(index_source)
            .data_dir("/srv/raincheck/data")
            .build();
        Raincheck::builder()
            .config(config)
            .geolocator(geolocator)
            .extractor(Arc::new(EvenYearRain))
            .predictor(predictor)
            .build()
    }

    #[tokio::test]
    async fn past_query_aggregates_the_full_historical_record() {
        let req = request("2020-06-15");
        let backing = index_for(&req, 1998, 2024);
        let client = client(
            backing.path(),
            Arc::new(FixedGeolocator(Some("Canada"))),
            Arc::new(FixedPredictor(Err(()))),
        );
        client.build_index().await.unwrap();

        // Local noon at UTC-7 resolves to the 19:00 block.
        let query = RainQuery::from_request(&req).unwrap();
        let bucket = query.bucket();
        assert_eq!(bucket.utc_hour, 19);
        assert_eq!(bucket.block_start_minute, 0);

        let assessment = client.assess_request(&req).await.unwrap();
        let report = assessment.report().expect("historical data present");

        // 27 present years, 14 of them even (rainy).
        assert_eq!(report.years_used, Some(27));
        assert!((report.rain_probability_percent - 100.0 * 14.0 / 27.0).abs() < 1e-9);
        assert_eq!(report.average_precipitation_mm_per_hr, 1.0);
        assert_eq!(report.rain_intensity_category, "light");
        assert_eq!(report.source, ReportSource::Historical);
    }

    #[tokio::test]
    async fn future_home_region_query_uses_the_model() {
        let req = request("2099-01-01");
        let backing = index_for(&req, 1998, 2024);
        let client = client(
            backing.path(),
            Arc::new(FixedGeolocator(Some("Australia"))),
            Arc::new(FixedPredictor(Ok(json!({
                "confidence": 0.9,
                "prediction": "Yes",
            })))),
        );
        client.build_index().await.unwrap();

        let assessment = client.assess_request(&req).await.unwrap();
        let report = assessment.report().unwrap();
        assert_eq!(report.source, ReportSource::Prediction);
        assert!((report.rain_probability_percent - 90.0).abs() < 1e-9);
        assert_eq!(report.rain_intensity_category, "Yes");
        assert_eq!(report.years_used, None);
    }

    #[tokio::test]
    async fn failed_prediction_falls_back_to_history() {
        let req = request("2099-01-01");
        let backing = index_for(&req, 1998, 2024);
        let client = client(
            backing.path(),
            Arc::new(FixedGeolocator(Some("Australia"))),
            Arc::new(FixedPredictor(Err(()))),
        );
        client.build_index().await.unwrap();

        let assessment = client.assess_request(&req).await.unwrap();
        let report = assessment.report().expect("fallback produced a report");
        // No trace of the failed prediction in the success payload.
        assert_eq!(report.source, ReportSource::Historical);
        assert!(report.years_used.is_some());
    }

    #[tokio::test]
    async fn missing_fields_surface_as_input_errors() {
        let backing = NamedTempFile::new().unwrap();
        let client = client(
            backing.path(),
            Arc::new(FixedGeolocator(None)),
            Arc::new(FixedPredictor(Err(()))),
        );
        let result = client
            .assess_request(&json!({"date": "2020-06-15", "time": "12:00", "tzone": 0}))
            .await;
        assert!(matches!(result, Err(RaincheckError::Input(_))));
    }
}

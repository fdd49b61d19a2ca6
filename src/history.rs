//! Multi-year historical fan-out and statistical aggregation.
//!
//! One lookup task per year runs against the value-extraction collaborator
//! under a bounded concurrency limit. Years are independent: a timeout,
//! parse failure, or missing file for one year is absorbed as an absent
//! sample and never aborts or blocks its siblings. The reduction is
//! commutative (counts and sums), so the result is identical regardless of
//! completion order or parallelism degree.

use crate::bucket::UtcBucket;
use crate::collaborators::ValueExtractor;
use crate::dataset::DatasetNaming;
use crate::index::error::IndexError;
use crate::index::existence_index::ExistenceIndex;
use crate::types::query::RainQuery;
use crate::types::report::{CategoryThresholds, RainAssessment, RainReport, ReportSource};
use bon::bon;
use futures_util::{stream, StreamExt};
use log::{debug, warn};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// One historical year's lookup result. `value` is `None` when the year's
/// identifier is not indexed, the extraction collaborator failed or timed
/// out, or the extracted value was not a finite number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearSample {
    pub year: i32,
    pub value: Option<f64>,
}

impl YearSample {
    fn absent(year: i32) -> Self {
        YearSample { year, value: None }
    }
}

/// Fans one query out across the historical year range and aggregates the
/// per-year precipitation values into probability, average and category.
pub struct HistoricalAggregator {
    extractor: Arc<dyn ValueExtractor>,
    index: Arc<ExistenceIndex>,
    naming: DatasetNaming,
    data_dir: PathBuf,
    lookup_timeout: Duration,
    max_parallel: usize,
    thresholds: CategoryThresholds,
}

#[bon]
impl HistoricalAggregator {
    #[builder]
    pub fn new(
        extractor: Arc<dyn ValueExtractor>,
        index: Arc<ExistenceIndex>,
        naming: DatasetNaming,
        data_dir: PathBuf,
        lookup_timeout: Duration,
        max_parallel: usize,
    ) -> Self {
        HistoricalAggregator {
            extractor,
            index,
            naming,
            data_dir,
            lookup_timeout,
            max_parallel: max_parallel.max(1),
            thresholds: CategoryThresholds::default(),
        }
    }

    /// Overrides the default intensity thresholds.
    pub fn with_thresholds(mut self, thresholds: CategoryThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Looks the query's bucket up in every year of `years` (closed
    /// interval) and reduces whatever samples are present.
    pub async fn aggregate(
        &self,
        query: &RainQuery,
        bucket: &UtcBucket,
        years: RangeInclusive<i32>,
    ) -> RainAssessment {
        let samples = self.collect_samples(query, bucket, years).await;
        reduce(&samples, &self.thresholds)
    }

    async fn collect_samples(
        &self,
        query: &RainQuery,
        bucket: &UtcBucket,
        years: RangeInclusive<i32>,
    ) -> Vec<YearSample> {
        stream::iter(years)
            .map(|year| self.sample_year(query, bucket, year))
            .buffer_unordered(self.max_parallel)
            .collect()
            .await
    }

    async fn sample_year(&self, query: &RainQuery, bucket: &UtcBucket, year: i32) -> YearSample {
        let Some((_, identifier)) = self.naming.identifier_for_year(year, bucket) else {
            // Leap-day query against a non-leap year.
            debug!("No calendar date for {year} at this bucket");
            return YearSample::absent(year);
        };

        match self.index.has(&identifier).await {
            Ok(false) => {
                debug!("{identifier} is not indexed; skipping {year}");
                return YearSample::absent(year);
            }
            Ok(true) => {}
            // Until the index is built every identifier is unknown; attempt
            // the lookup and let the collaborator decide.
            Err(IndexError::NotReady) => {
                debug!("Identifier index not ready; attempting {year} blind")
            }
            Err(e) => warn!("Index lookup failed for {identifier}: {e}"),
        }

        let path = self.data_dir.join(&identifier);
        let extraction = self
            .extractor
            .extract(query.latitude, query.longitude, &path);

        // The timeout drops the in-flight extraction, which terminates any
        // underlying process; siblings keep running.
        match timeout(self.lookup_timeout, extraction).await {
            Err(_) => {
                warn!(
                    "Extraction for {year} exceeded {:?}; sample dropped",
                    self.lookup_timeout
                );
                YearSample::absent(year)
            }
            Ok(Err(e)) => {
                warn!("Extraction for {year} failed: {e}");
                YearSample::absent(year)
            }
            Ok(Ok(value)) if value.is_finite() => YearSample {
                year,
                value: Some(value),
            },
            Ok(Ok(value)) => {
                warn!("Extraction for {year} produced non-finite value {value}");
                YearSample::absent(year)
            }
        }
    }
}

/// Commutative reduction of per-year samples.
///
/// Probability is the share of present samples with measurable rain
/// (`value > 0`); the average is taken over those rainy samples only, so an
/// all-zero record reads as "no rain" rather than "no data". With zero
/// present samples the outcome is `NoData`, never a division by zero.
pub fn reduce(samples: &[YearSample], thresholds: &CategoryThresholds) -> RainAssessment {
    let present: Vec<f64> = samples.iter().filter_map(|s| s.value).collect();
    if present.is_empty() {
        return RainAssessment::NoData {
            years_scanned: samples.len(),
        };
    }

    let rainy: Vec<f64> = present.iter().copied().filter(|v| *v > 0.0).collect();
    let probability = 100.0 * rainy.len() as f64 / present.len() as f64;
    let average = if rainy.is_empty() {
        0.0
    } else {
        rainy.iter().sum::<f64>() / rainy.len() as f64
    };

    RainAssessment::Report(RainReport {
        average_precipitation_mm_per_hr: average,
        rain_probability_percent: probability,
        rain_intensity_category: thresholds.classify(average).to_string(),
        years_used: Some(present.len() as u32),
        source: ReportSource::Historical,
    })
}

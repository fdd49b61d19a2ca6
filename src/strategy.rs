//! Chooses between the trained prediction model and the historical record.

use crate::bucket::UtcBucket;
use crate::collaborators::Geolocator;
use crate::types::query::RainQuery;
use chrono::NaiveDateTime;
use log::debug;
use std::sync::Arc;

/// Transient outcome of strategy selection; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyDecision {
    pub use_prediction: bool,
    /// Human-readable explanation, for diagnostics only.
    pub reason: String,
}

/// Policy: the model is trained for one region and is only meaningful for
/// instants with no historical ground truth, so prediction requires both a
/// home-region match and a strictly-future UTC instant. Everything else,
/// including geolocation failures, goes to the historical record.
pub struct StrategySelector {
    geolocator: Arc<dyn Geolocator>,
    home_region: String,
}

impl StrategySelector {
    pub fn new(geolocator: Arc<dyn Geolocator>, home_region: impl Into<String>) -> Self {
        StrategySelector {
            geolocator,
            home_region: home_region.into(),
        }
    }

    /// Decides the strategy for `query`, resolved to `bucket`, as of
    /// `now_utc`.
    ///
    /// `now_utc` is passed in rather than read from the clock so the
    /// decision is testable.
    pub async fn decide(
        &self,
        query: &RainQuery,
        bucket: &UtcBucket,
        now_utc: NaiveDateTime,
    ) -> StrategyDecision {
        if bucket.start_instant() <= now_utc {
            return StrategyDecision {
                use_prediction: false,
                reason: "requested instant is not in the future; using the historical record"
                    .to_string(),
            };
        }

        // Geolocation failure degrades to "no specific match", never to an
        // error surfaced to the caller.
        match self.geolocator.country(query.latitude, query.longitude).await {
            Some(country) if country.eq_ignore_ascii_case(&self.home_region) => StrategyDecision {
                use_prediction: true,
                reason: format!("future instant inside {country}; using the trained model"),
            },
            Some(country) => {
                debug!("Location resolved to {country}, outside the model's region");
                StrategyDecision {
                    use_prediction: false,
                    reason: format!(
                        "location is in {country}, outside the model's training region"
                    ),
                }
            }
            None => StrategyDecision {
                use_prediction: false,
                reason: "location could not be resolved to a country; using the historical record"
                    .to_string(),
            },
        }
    }
}

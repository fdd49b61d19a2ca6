//! Adapter around the trained prediction model.
//!
//! The model's output is schema-loose: field names and presence vary
//! between runner versions. Normalization is one explicit step with a
//! documented precedence order rather than fallbacks scattered through
//! response construction.

use crate::collaborators::error::CollaboratorError;
use crate::collaborators::{PredictionRequest, RainPredictor};
use crate::types::query::RainQuery;
use crate::types::report::{RainReport, ReportSource};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Category sentinel when the model reports neither an explicit category
/// nor a raw classification label.
const UNKNOWN_CATEGORY: &str = "unknown";

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Prediction timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Prediction output carries no usable probability")]
    MissingProbability,
}

/// Invokes the model collaborator once and normalizes its output into the
/// engine's canonical result shape.
pub struct PredictionAdapter {
    predictor: Arc<dyn RainPredictor>,
    prediction_timeout: Duration,
}

impl PredictionAdapter {
    pub fn new(predictor: Arc<dyn RainPredictor>, prediction_timeout: Duration) -> Self {
        PredictionAdapter {
            predictor,
            prediction_timeout,
        }
    }

    /// Runs the model for `query`, bounded by the configured timeout.
    ///
    /// On timeout the in-flight collaborator future is dropped, which
    /// terminates the underlying task.
    pub async fn predict(
        &self,
        query: &RainQuery,
        location_hint: Option<&str>,
    ) -> Result<RainReport, PredictError> {
        let request = PredictionRequest {
            latitude: query.latitude,
            longitude: query.longitude,
            tz_offset_hours: query.tz_offset_hours,
            date: query.local_date,
            time: query.local_time,
            location_hint: location_hint.map(str::to_string),
        };

        let raw = timeout(self.prediction_timeout, self.predictor.predict(&request))
            .await
            .map_err(|_| PredictError::Timeout(self.prediction_timeout))??;
        normalize(&raw)
    }
}

/// Maps the model's loose output onto [`RainReport`].
///
/// Precedence: an explicit `rain_probability_percent` wins; otherwise a
/// `confidence` field is accepted either as a 0–1 number (scaled to
/// percent) or as a percent-formatted string such as `"83.1%"`. The
/// category falls back from `rain_intensity_category` to the raw
/// `prediction` label to `"unknown"`; it is never null.
pub fn normalize(raw: &Value) -> Result<RainReport, PredictError> {
    let probability = raw
        .get("rain_probability_percent")
        .and_then(Value::as_f64)
        .filter(|p| p.is_finite())
        .or_else(|| derived_from_confidence(raw.get("confidence")?))
        .ok_or(PredictError::MissingProbability)?;

    let average = raw
        .get("average_precipitation_mm_per_hr")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);

    let category = raw
        .get("rain_intensity_category")
        .and_then(Value::as_str)
        .or_else(|| raw.get("prediction").and_then(Value::as_str))
        .unwrap_or(UNKNOWN_CATEGORY)
        .to_string();

    Ok(RainReport {
        average_precipitation_mm_per_hr: average,
        rain_probability_percent: probability,
        rain_intensity_category: category,
        years_used: None,
        source: ReportSource::Prediction,
    })
}

fn derived_from_confidence(confidence: &Value) -> Option<f64> {
    match confidence {
        // Model-side confidence is a 0..=1 score; scale to percent.
        Value::Number(n) => n.as_f64().filter(|c| c.is_finite()).map(|c| c * 100.0),
        // Some runners pre-format it, e.g. "83.1%"; already a percentage.
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    #[test]
    fn explicit_probability_wins_over_confidence() {
        let report = normalize(&json!({
            "rain_probability_percent": 62.5,
            "confidence": 0.1,
            "rain_intensity_category": "light",
        }))
        .unwrap();
        assert_eq!(report.rain_probability_percent, 62.5);
        assert_eq!(report.rain_intensity_category, "light");
        assert_eq!(report.source, ReportSource::Prediction);
        assert_eq!(report.years_used, None);
    }

    #[test]
    fn numeric_confidence_is_scaled_to_percent() {
        let report = normalize(&json!({"confidence": 0.83, "prediction": "Yes"})).unwrap();
        assert!((report.rain_probability_percent - 83.0).abs() < 1e-9);
        assert_eq!(report.rain_intensity_category, "Yes");
    }

    #[test]
    fn percent_string_confidence_is_parsed() {
        let report = normalize(&json!({"confidence": "83.1%"})).unwrap();
        assert!((report.rain_probability_percent - 83.1).abs() < 1e-9);
        assert_eq!(report.rain_intensity_category, "unknown");
    }

    #[test]
    fn missing_probability_is_an_error() {
        assert!(matches!(
            normalize(&json!({"prediction": "No"})),
            Err(PredictError::MissingProbability)
        ));
        assert!(matches!(
            normalize(&json!({"confidence": "very sure"})),
            Err(PredictError::MissingProbability)
        ));
    }

    #[test]
    fn average_defaults_to_zero() {
        let report = normalize(&json!({"rain_probability_percent": 10.0})).unwrap();
        assert_eq!(report.average_precipitation_mm_per_hr, 0.0);
    }

    struct SlowPredictor;

    #[async_trait]
    impl RainPredictor for SlowPredictor {
        async fn predict(&self, _request: &PredictionRequest) -> Result<Value, CollaboratorError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!({}))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_hits_the_timeout() {
        let adapter = PredictionAdapter::new(Arc::new(SlowPredictor), Duration::from_secs(30));
        let query = RainQuery {
            latitude: -33.87,
            longitude: 151.21,
            local_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            local_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            tz_offset_hours: 10,
            city: None,
        };
        let result = adapter.predict(&query, Some("Sydney")).await;
        assert!(matches!(result, Err(PredictError::Timeout(_))));
    }
}

//! Seams to the external systems the engine calls but does not own.
//!
//! Each collaborator is a trait so the engine never assumes a process
//! model: the bundled implementations shell out to per-request scripts or
//! call an HTTP endpoint, but a library-backed or networked implementation
//! plugs in the same way (and tests inject in-memory fakes).

pub mod error;
pub mod geocode;
pub mod script;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use error::CollaboratorError;
use std::path::Path;

/// Extracts one scalar precipitation value (mm/hr) from one dataset file at
/// one coordinate.
///
/// Implementations must be cancellation-safe: when the returned future is
/// dropped (the caller's timeout fired), any underlying process or request
/// must be terminated, not leaked.
#[async_trait]
pub trait ValueExtractor: Send + Sync {
    async fn extract(
        &self,
        latitude: f64,
        longitude: f64,
        file_path: &Path,
    ) -> Result<f64, CollaboratorError>;
}

/// Context handed to the prediction model collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub tz_offset_hours: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Optional human-readable place name, e.g. a city.
    pub location_hint: Option<String>,
}

/// Invokes the trained prediction model once.
///
/// The model's output schema is loose; the raw JSON document is returned
/// as-is and normalized by the prediction adapter.
#[async_trait]
pub trait RainPredictor: Send + Sync {
    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<serde_json::Value, CollaboratorError>;
}

/// Resolves a coordinate to a country name.
///
/// Infallible by contract: any failure (network, malformed response) is
/// absorbed into `None`, which callers treat as "no specific match".
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn country(&self, latitude: f64, longitude: f64) -> Option<String>;
}

//! The engine's canonical result shape and the intensity classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Intensity label derived from the average precipitation rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RainCategory {
    NoRain,
    Light,
    Moderate,
    Heavy,
}

impl fmt::Display for RainCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RainCategory::NoRain => "no_rain",
            RainCategory::Light => "light",
            RainCategory::Moderate => "moderate",
            RainCategory::Heavy => "heavy",
        };
        write!(f, "{label}")
    }
}

/// Category boundaries in mm/hr.
///
/// These are tunable configuration, not physics: the defaults follow the
/// common light/moderate/heavy convention (2.5 and 10 mm/hr) but deployments
/// may calibrate them to their region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryThresholds {
    /// Averages strictly below this (and above zero) are `light`.
    pub light_max_mm_per_hr: f64,
    /// Averages strictly below this (and at/above `light_max`) are
    /// `moderate`; anything at or above is `heavy`.
    pub moderate_max_mm_per_hr: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        CategoryThresholds {
            light_max_mm_per_hr: 2.5,
            moderate_max_mm_per_hr: 10.0,
        }
    }
}

impl CategoryThresholds {
    /// Classifies an average precipitation rate.
    ///
    /// Exactly zero is `no_rain`: a location with measured-but-all-zero
    /// precipitation is dry, not missing data.
    pub fn classify(&self, average_mm_per_hr: f64) -> RainCategory {
        if average_mm_per_hr == 0.0 {
            RainCategory::NoRain
        } else if average_mm_per_hr < self.light_max_mm_per_hr {
            RainCategory::Light
        } else if average_mm_per_hr < self.moderate_max_mm_per_hr {
            RainCategory::Moderate
        } else {
            RainCategory::Heavy
        }
    }
}

/// Which path produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    Historical,
    Prediction,
}

/// The engine's response contract.
///
/// `rain_intensity_category` is a string rather than [`RainCategory`]
/// because the prediction path may pass through a raw model label (or the
/// `"unknown"` sentinel) that has no historical equivalent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainReport {
    pub average_precipitation_mm_per_hr: f64,
    pub rain_probability_percent: f64,
    pub rain_intensity_category: String,
    /// Denominator of the probability; communicates confidence. Absent for
    /// model predictions, which have no per-year samples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_used: Option<u32>,
    pub source: ReportSource,
}

/// Terminal outcome of a query.
///
/// `NoData` is a valid result, not an error: it means every historical
/// year's lookup came back absent.
#[derive(Debug, Clone, PartialEq)]
pub enum RainAssessment {
    Report(RainReport),
    NoData {
        /// How many years were scanned before concluding there is no data.
        years_scanned: usize,
    },
}

impl RainAssessment {
    /// The report, if any data was available.
    pub fn report(&self) -> Option<&RainReport> {
        match self {
            RainAssessment::Report(report) => Some(report),
            RainAssessment::NoData { .. } => None,
        }
    }
}

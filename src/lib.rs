mod archive;
mod bucket;
mod collaborators;
mod config;
mod dataset;
mod error;
mod history;
mod index;
mod predict;
mod raincheck;
mod strategy;
mod types;
mod utils;

pub use error::RaincheckError;
pub use raincheck::Raincheck;

pub use archive::{ArchiveError, RemoteArchive};
pub use bucket::UtcBucket;
pub use config::{RaincheckConfig, DEFAULT_ARCHIVE_ROOT};
pub use dataset::DatasetNaming;
pub use history::{reduce, HistoricalAggregator, YearSample};
pub use index::error::IndexError;
pub use index::existence_index::ExistenceIndex;
pub use predict::{normalize, PredictError, PredictionAdapter};
pub use strategy::{StrategyDecision, StrategySelector};

pub use collaborators::error::CollaboratorError;
pub use collaborators::geocode::NominatimGeocoder;
pub use collaborators::script::{ScriptExtractor, ScriptPredictor};
pub use collaborators::{Geolocator, PredictionRequest, RainPredictor, ValueExtractor};

pub use types::query::{InputError, RainQuery};
pub use types::report::{
    CategoryThresholds, RainAssessment, RainCategory, RainReport, ReportSource,
};

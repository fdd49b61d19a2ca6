//! Engine configuration.

use crate::dataset::DatasetNaming;
use crate::types::report::CategoryThresholds;
use bon::Builder;
use std::path::PathBuf;
use std::time::Duration;

/// Upstream archive of the half-hourly product, sharded by year and
/// day-of-year.
pub const DEFAULT_ARCHIVE_ROOT: &str =
    "https://gpm1.gesdisc.eosdis.nasa.gov/data/GPM_L3/GPM_3IMERGHH.07";

/// All knobs of the engine. Every field has a sensible default; override
/// through the builder:
///
/// ```
/// use raincheck::RaincheckConfig;
/// use std::time::Duration;
///
/// let config = RaincheckConfig::builder()
///     .data_dir("/srv/imerg")
///     .max_parallel_lookups(4)
///     .lookup_timeout(Duration::from_secs(10))
///     .build();
/// assert_eq!(config.first_year, 1998);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct RaincheckConfig {
    /// Directory holding the per-year dataset files.
    #[builder(default = PathBuf::from("./data"), into)]
    pub data_dir: PathBuf,

    /// Backing list for the existence index, one identifier per line.
    #[builder(default = PathBuf::from("./data/file_index.txt"), into)]
    pub index_source: PathBuf,

    /// Dataset product naming (basename and version).
    #[builder(default)]
    pub dataset: DatasetNaming,

    /// Root URL of the remote archive.
    #[builder(default = DEFAULT_ARCHIVE_ROOT.to_string(), into)]
    pub archive_root: String,

    /// First historical year queried (closed interval).
    #[builder(default = 1998)]
    pub first_year: i32,

    /// Last historical year queried (closed interval). Kept behind the
    /// present so the future-date guard, not the year range, decides when
    /// the model applies.
    #[builder(default = 2024)]
    pub last_year: i32,

    /// Bounded parallelism of the per-year fan-out.
    #[builder(default = 8)]
    pub max_parallel_lookups: usize,

    /// Per-year extraction budget; a slower lookup is dropped as absent.
    #[builder(default = Duration::from_secs(20))]
    pub lookup_timeout: Duration,

    /// Budget for one model invocation.
    #[builder(default = Duration::from_secs(30))]
    pub prediction_timeout: Duration,

    /// Intensity category boundaries.
    #[builder(default)]
    pub thresholds: CategoryThresholds,

    /// Country the prediction model was trained for.
    #[builder(default = "Australia".to_string(), into)]
    pub home_region: String,

    /// Value-extraction script, invoked per year.
    #[builder(default = PathBuf::from("scripts/read_imerg.py"), into)]
    pub extractor_program: PathBuf,

    /// Model runner script.
    #[builder(default = PathBuf::from("scripts/predict_rain.py"), into)]
    pub predictor_program: PathBuf,
}

impl Default for RaincheckConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

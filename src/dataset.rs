//! Naming scheme of the half-hourly precipitation dataset.
//!
//! Every 30-minute bucket of every year is stored in one file whose name is
//! fixed by the upstream archive:
//! `<basename>.<YYYYMMDD>-S<HHMMSS>-E<HHMMSS>.<fileIndex>.<version>`
//! where `<fileIndex>` is the 4-digit minutes-since-midnight of the block
//! start. The remote archive shards files by year and day-of-year.

use crate::bucket::UtcBucket;
use chrono::{Datelike, NaiveDate};

/// Formats dataset identifiers and archive URLs for one dataset product.
///
/// The basename and version vary between product releases and are therefore
/// configuration, not constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetNaming {
    pub basename: String,
    pub version: String,
}

impl Default for DatasetNaming {
    fn default() -> Self {
        DatasetNaming {
            basename: "3B-HHR.MS.MRG.3IMERG".to_string(),
            version: "V07B.HDF5".to_string(),
        }
    }
}

impl DatasetNaming {
    /// The identifier of `bucket` on a specific UTC date.
    pub fn identifier(&self, date: NaiveDate, bucket: &UtcBucket) -> String {
        format!(
            "{}.{}-{}-{}.{}.{}",
            self.basename,
            date.format("%Y%m%d"),
            bucket.start_code,
            bucket.end_code,
            bucket.file_index_code,
            self.version,
        )
    }

    /// The identifier of `bucket` re-resolved against another year.
    ///
    /// Day-of-month and time-of-day are held fixed across years; only the
    /// year component changes. Returns `None` when the date does not exist
    /// in the target year (February 29th outside leap years).
    pub fn identifier_for_year(&self, year: i32, bucket: &UtcBucket) -> Option<(NaiveDate, String)> {
        let date = NaiveDate::from_ymd_opt(year, bucket.utc_date.month(), bucket.utc_date.day())?;
        Some((date, self.identifier(date, bucket)))
    }

    /// The remote archive URL for `bucket` in `year`:
    /// `<root>/<year>/<dayOfYear, 3 digits>/<identifier>`.
    ///
    /// The day-of-year is taken from the date resolved against `year`, since
    /// leap years shift ordinals after February.
    pub fn archive_url(&self, root: &str, year: i32, bucket: &UtcBucket) -> Option<String> {
        let (date, identifier) = self.identifier_for_year(year, bucket)?;
        Some(format!(
            "{}/{}/{:03}/{}",
            root.trim_end_matches('/'),
            year,
            date.ordinal(),
            identifier,
        ))
    }
}

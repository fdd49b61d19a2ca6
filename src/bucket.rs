//! Conversion of a local wall-clock timestamp into the canonical 30-minute
//! UTC measurement bucket used by the half-hourly precipitation dataset.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// The 30-minute UTC time window a measurement file covers.
///
/// A bucket is derived deterministically from a local date, a local time and
/// a whole-hour timezone offset; the same inputs always produce the same
/// bucket, so results may be cached freely.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use raincheck::UtcBucket;
///
/// // Local noon in Vancouver (UTC-7) lands in the 19:00 UTC block.
/// let bucket = UtcBucket::resolve(
///     NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(),
///     NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
///     -7,
/// );
/// assert_eq!(bucket.utc_hour, 19);
/// assert_eq!(bucket.block_start_minute, 0);
/// assert_eq!(bucket.start_code, "S190000");
/// assert_eq!(bucket.end_code, "E192959");
/// assert_eq!(bucket.file_index_code, "1140");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtcBucket {
    /// The UTC calendar date of the block start.
    pub utc_date: NaiveDate,
    /// UTC hour of the block start, `0..=23`.
    pub utc_hour: u32,
    /// Minute the block starts at, always `0` or `30`.
    pub block_start_minute: u32,
    /// Dataset start marker, e.g. `S193000`.
    pub start_code: String,
    /// Dataset end marker, e.g. `E195959`.
    pub end_code: String,
    /// Minutes since UTC midnight of the block start, zero-padded to four
    /// digits, e.g. `1170` for 19:30.
    pub file_index_code: String,
    /// 1-based ordinal day of `utc_date` within its year.
    pub day_of_year: u32,
}

impl UtcBucket {
    /// Resolves a local timestamp to its UTC measurement bucket.
    ///
    /// The local date and time are interpreted as a plain wall-clock value
    /// and the offset is *subtracted* to reach the true UTC instant,
    /// matching the `local = UTC + offset` convention. Crossing midnight
    /// (and with it month, year and leap-day boundaries) is handled by the
    /// calendar arithmetic in `chrono`.
    pub fn resolve(local_date: NaiveDate, local_time: NaiveTime, tz_offset_hours: i32) -> Self {
        let wall_clock = NaiveDateTime::new(local_date, local_time);
        let utc = wall_clock - Duration::minutes(i64::from(tz_offset_hours) * 60);

        let hour = utc.hour();
        let block_start = (utc.minute() / 30) * 30;
        // A block spans 29 minutes 59 seconds, so the end marker never rolls
        // into the next hour (0+29=29, 30+29=59).
        let block_end = block_start + 29;

        UtcBucket {
            utc_date: utc.date(),
            utc_hour: hour,
            block_start_minute: block_start,
            start_code: format!("S{:02}{:02}00", hour, block_start),
            end_code: format!("E{:02}{:02}59", hour, block_end),
            file_index_code: format!("{:04}", hour * 60 + block_start),
            day_of_year: utc.date().ordinal(),
        }
    }

    /// The UTC instant at which this bucket starts.
    pub fn start_instant(&self) -> NaiveDateTime {
        // Hour and block minute come from resolve(), so this is always valid.
        let time = NaiveTime::from_hms_opt(self.utc_hour, self.block_start_minute, 0)
            .unwrap_or(NaiveTime::MIN);
        NaiveDateTime::new(self.utc_date, time)
    }
}

//! The immutable per-request input and its JSON-level request contract.

use crate::bucket::UtcBucket;
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use thiserror::Error;

/// Malformed or missing request fields. Reported to the caller as-is; the
/// engine never retries input errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field 'coords' must be a [latitude, longitude] pair of numbers")]
    MalformedCoords,

    #[error("Field 'date' must be formatted YYYY-MM-DD, got '{0}'")]
    MalformedDate(String),

    #[error("Field 'time' must be formatted HH:MM, got '{0}'")]
    MalformedTime(String),

    #[error("Field 'tzone' must be a whole number of hours, got '{0}'")]
    MalformedOffset(String),
}

/// One rain query: a place, a local date/time, and the timezone offset that
/// relates that wall clock to UTC. Constructed once per request and never
/// mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RainQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub local_date: NaiveDate,
    pub local_time: NaiveTime,
    /// Whole hours, `local = UTC + offset`.
    pub tz_offset_hours: i32,
    /// Optional place name forwarded to the prediction model as a hint.
    pub city: Option<String>,
}

impl RainQuery {
    /// The UTC measurement bucket this query falls into.
    pub fn bucket(&self) -> UtcBucket {
        UtcBucket::resolve(self.local_date, self.local_time, self.tz_offset_hours)
    }

    /// Parses the engine's JSON request contract:
    /// `{coords: [lat, lon], date: "YYYY-MM-DD", time: "HH:MM", tzone, city?}`
    /// where `tzone` may be a number or a string.
    pub fn from_request(request: &Value) -> Result<Self, InputError> {
        let coords = request
            .get("coords")
            .ok_or(InputError::MissingField("coords"))?;
        let pair = coords
            .as_array()
            .filter(|a| a.len() == 2)
            .ok_or(InputError::MalformedCoords)?;
        let latitude = pair[0].as_f64().ok_or(InputError::MalformedCoords)?;
        let longitude = pair[1].as_f64().ok_or(InputError::MalformedCoords)?;

        let date_raw = request
            .get("date")
            .ok_or(InputError::MissingField("date"))?;
        let date_str = date_raw
            .as_str()
            .ok_or_else(|| InputError::MalformedDate(date_raw.to_string()))?;
        let local_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| InputError::MalformedDate(date_str.to_string()))?;

        let time_raw = request
            .get("time")
            .ok_or(InputError::MissingField("time"))?;
        let time_str = time_raw
            .as_str()
            .ok_or_else(|| InputError::MalformedTime(time_raw.to_string()))?;
        let local_time = NaiveTime::parse_from_str(time_str, "%H:%M")
            .map_err(|_| InputError::MalformedTime(time_str.to_string()))?;

        let tzone = request
            .get("tzone")
            .ok_or(InputError::MissingField("tzone"))?;
        let tz_offset_hours = parse_offset(tzone)?;

        let city = request
            .get("city")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(RainQuery {
            latitude,
            longitude,
            local_date,
            local_time,
            tz_offset_hours,
            city,
        })
    }
}

fn parse_offset(tzone: &Value) -> Result<i32, InputError> {
    let malformed = || InputError::MalformedOffset(tzone.to_string());
    match tzone {
        Value::Number(n) => n
            .as_i64()
            .and_then(|h| i32::try_from(h).ok())
            .ok_or_else(malformed),
        Value::String(s) => s.trim().parse::<i32>().map_err(|_| malformed()),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_complete_request() {
        let query = RainQuery::from_request(&json!({
            "coords": [49.0, -123.0],
            "date": "2020-06-15",
            "time": "12:00",
            "tzone": "-7",
            "city": "Vancouver",
        }))
        .unwrap();

        assert_eq!(query.latitude, 49.0);
        assert_eq!(query.longitude, -123.0);
        assert_eq!(query.local_date, NaiveDate::from_ymd_opt(2020, 6, 15).unwrap());
        assert_eq!(query.local_time, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(query.tz_offset_hours, -7);
        assert_eq!(query.city.as_deref(), Some("Vancouver"));
    }

    #[test]
    fn tzone_accepts_numbers_and_signed_strings() {
        for (tzone, expected) in [
            (json!(5), 5),
            (json!(-11), -11),
            (json!("0"), 0),
            (json!("+8"), 8),
            (json!(" -3 "), -3),
        ] {
            let query = RainQuery::from_request(&json!({
                "coords": [0.0, 0.0],
                "date": "2021-01-01",
                "time": "00:00",
                "tzone": tzone,
            }))
            .unwrap();
            assert_eq!(query.tz_offset_hours, expected);
        }
    }

    #[test]
    fn missing_fields_are_named() {
        let base = json!({
            "coords": [1.0, 2.0],
            "date": "2021-01-01",
            "time": "06:30",
            "tzone": 0,
        });
        for field in ["coords", "date", "time", "tzone"] {
            let mut request = base.clone();
            request.as_object_mut().unwrap().remove(field);
            assert_eq!(
                RainQuery::from_request(&request),
                Err(InputError::MissingField(field))
            );
        }
    }

    #[test]
    fn coords_must_be_a_numeric_pair() {
        for coords in [json!([1.0]), json!([1.0, 2.0, 3.0]), json!(["a", "b"]), json!(42)] {
            let result = RainQuery::from_request(&json!({
                "coords": coords,
                "date": "2021-01-01",
                "time": "06:30",
                "tzone": 0,
            }));
            assert_eq!(result, Err(InputError::MalformedCoords));
        }
    }

    #[test]
    fn malformed_date_time_and_offset_are_rejected() {
        let request = |date: &str, time: &str, tzone: Value| {
            RainQuery::from_request(&json!({
                "coords": [1.0, 2.0],
                "date": date,
                "time": time,
                "tzone": tzone,
            }))
        };
        assert!(matches!(
            request("15-06-2020", "12:00", json!(0)),
            Err(InputError::MalformedDate(_))
        ));
        assert!(matches!(
            request("2020-06-15", "noonish", json!(0)),
            Err(InputError::MalformedTime(_))
        ));
        assert!(matches!(
            request("2020-06-15", "12:00", json!("PST")),
            Err(InputError::MalformedOffset(_))
        ));
        assert!(matches!(
            request("2020-06-15", "12:00", json!(2.5)),
            Err(InputError::MalformedOffset(_))
        ));
    }
}

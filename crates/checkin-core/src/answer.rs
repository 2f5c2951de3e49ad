//! Answer records and the calendar fields derived from their timestamp.

use crate::error::CheckinError;
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Synthetic key for the latitude half of a location reply.
pub const LOCATION_LAT_KEY: &str = "locationLat";
/// Synthetic key for the longitude half of a location reply.
pub const LOCATION_LONG_KEY: &str = "locationLong";

/// A completed answer on its way to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnswer {
    pub key: String,
    pub answer: String,
    pub question_type: String,
    /// When unset, the store stamps the current time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewAnswer {
    pub fn new(key: impl Into<String>, answer: impl Into<String>, question_type: &str) -> Self {
        Self {
            key: key.into(),
            answer: answer.into(),
            question_type: question_type.to_string(),
            timestamp: None,
        }
    }
}

/// A stored answer. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    pub key: String,
    pub answer: String,
    pub question_type: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(flatten)]
    pub calendar: CalendarFields,
}

/// Time attributes computed once at save time for time-series queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFields {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub year: i32,
    pub month: u32,
    pub quarter: u32,
    /// ISO 8601 week number.
    pub week: u32,
    /// ISO week-numbering year and week, e.g. 202403.
    pub year_week: i64,
    /// Calendar year and month, e.g. 202407.
    pub year_month: i64,
}

impl CalendarFields {
    /// Derive the fields as seen in the time zone of `at`.
    pub fn derive<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        let iso = at.iso_week();
        let year = at.year();
        let month = at.month();
        Self {
            day: at.day(),
            hour: at.hour(),
            minute: at.minute(),
            year,
            month,
            quarter: quarter_for_month(month),
            week: iso.week(),
            year_week: i64::from(iso.year()) * 100 + i64::from(iso.week()),
            year_month: i64::from(year) * 100 + i64::from(month),
        }
    }
}

/// Months 1-3 → Q1, 4-6 → Q2, 7-9 → Q3, 10-12 → Q4.
pub fn quarter_for_month(month: u32) -> u32 {
    match month {
        1..=3 => 1,
        4..=6 => 2,
        7..=9 => 3,
        _ => 4,
    }
}

/// A chartable series of answers for one key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSeries {
    pub values: Vec<f64>,
    /// Day-month labels, parallel to `values`.
    pub times: Vec<String>,
    /// Smallest value, floored at zero.
    pub minimum: f64,
    /// Largest value, floored at zero.
    pub maximum: f64,
}

impl ValueSeries {
    /// Build a series from `(answer, label)` pairs in display order.
    ///
    /// Both bounds start at zero, so an all-positive series reports a
    /// minimum of 0. A non-numeric answer is an error.
    pub fn from_points<I>(key: &str, points: I) -> Result<Self, CheckinError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut series = Self::default();
        for (raw, label) in points {
            let value: f64 = raw.trim().parse().map_err(|_| {
                CheckinError::Protocol(format!("non-numeric value '{raw}' stored for '{key}'"))
            })?;
            series.minimum = series.minimum.min(value);
            series.maximum = series.maximum.max(value);
            series.values.push(value);
            series.times.push(label);
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_year_week_first_week_of_2024() {
        let fields = CalendarFields::derive(&utc(2024, 1, 3, 9, 15));
        assert_eq!(fields.week, 1);
        assert_eq!(fields.year_week, 202401);
        assert_eq!(fields.year_month, 202401);
        assert_eq!(fields.day, 3);
        assert_eq!(fields.hour, 9);
        assert_eq!(fields.minute, 15);
    }

    #[test]
    fn test_year_week_zero_pads_week() {
        let fields = CalendarFields::derive(&utc(2024, 1, 17, 0, 0));
        assert_eq!(fields.week, 3);
        assert_eq!(fields.year_week, 202403);
    }

    #[test]
    fn test_year_week_uses_iso_year_at_boundary() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025.
        let fields = CalendarFields::derive(&utc(2024, 12, 30, 12, 0));
        assert_eq!(fields.year, 2024);
        assert_eq!(fields.week, 1);
        assert_eq!(fields.year_week, 202501);
        assert_eq!(fields.year_month, 202412);
    }

    #[test]
    fn test_quarters() {
        assert_eq!(CalendarFields::derive(&utc(2024, 3, 31, 0, 0)).quarter, 1);
        assert_eq!(CalendarFields::derive(&utc(2024, 7, 1, 0, 0)).quarter, 3);
        let expected = [1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4];
        for (i, q) in expected.iter().enumerate() {
            assert_eq!(quarter_for_month(i as u32 + 1), *q, "month {}", i + 1);
        }
    }

    #[test]
    fn test_series_min_is_floored_at_zero() {
        let series = ValueSeries::from_points(
            "mood",
            vec![
                ("2".to_string(), "01-01".to_string()),
                ("5".to_string(), "02-01".to_string()),
                ("3".to_string(), "03-01".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(series.values, vec![2.0, 5.0, 3.0]);
        assert_eq!(series.times, vec!["01-01", "02-01", "03-01"]);
        assert_eq!(series.maximum, 5.0);
        // All values are positive, yet the minimum stays at its zero start.
        assert_eq!(series.minimum, 0.0);
    }

    #[test]
    fn test_series_negative_values_lower_minimum() {
        let series =
            ValueSeries::from_points("delta", vec![("-4.5".to_string(), "01-01".to_string())])
                .unwrap();
        assert_eq!(series.minimum, -4.5);
        assert_eq!(series.maximum, 0.0);
    }

    #[test]
    fn test_series_rejects_non_numeric() {
        let err = ValueSeries::from_points("mood", vec![("great".to_string(), "01-01".to_string())])
            .unwrap_err();
        assert!(matches!(err, CheckinError::Protocol(_)));
        assert!(err.to_string().contains("great"));
    }

    #[test]
    fn test_empty_series() {
        let series = ValueSeries::from_points("mood", Vec::new()).unwrap();
        assert!(series.values.is_empty());
        assert_eq!(series.minimum, 0.0);
        assert_eq!(series.maximum, 0.0);
    }
}

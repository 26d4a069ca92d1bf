//! Lenient deserializers for form-style request fields

use chrono::{DateTime, NaiveDate};
use serde::{de, Deserialize, Deserializer};
use std::str::FromStr;

/// Empty strings count as "not supplied"; anything else must parse.
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
        .map_err(|_| format!("Invalid date: {}", s))
}

/// Optional date where `""` is treated like an absent value
pub fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some).map_err(de::Error::custom),
    }
}

/// Tri-state date for partial updates. Use with `#[serde(default)]`:
/// missing field -> `None` (keep), `null`/`""` -> `Some(None)` (clear),
/// a date -> `Some(Some(date))` (set).
pub fn clearable_date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_date(deserializer).map(Some)
}

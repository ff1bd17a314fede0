//! ISO-8601 date codec for trip fields.
//!
//! The service stores naive local timestamps and emits them at minute
//! precision (`2024-01-01T10:00`). Inputs are accepted with seconds, with a
//! space separator, or as RFC 3339 with an offset (normalized to UTC).

use chrono::{DateTime, NaiveDateTime};

pub const MINUTES_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const ACCEPTED_FORMATS: &[&str] = &[
    MINUTES_FORMAT,
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub fn parse(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    ACCEPTED_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|value| value.naive_utc())
        })
}

pub fn format_minutes(value: &NaiveDateTime) -> String {
    value.format(MINUTES_FORMAT).to_string()
}

/// `#[serde(with = "wire_time::minutes")]` for the trip time window.
pub mod minutes {
    use chrono::NaiveDateTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_minutes(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 date '{raw}'")))
    }
}

/// `#[serde(with = "wire_time::seconds")]` for record timestamps.
pub mod seconds {
    use chrono::NaiveDateTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(super::SECONDS_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

//! Lenient timestamp handling. The backend sends RFC 3339 strings, but
//! lifecycle stages are sometimes plain `YYYY-MM-DD` dates or Firestore
//! `{ "_seconds", "_nanoseconds" }` objects.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Reads a timestamp out of any JSON shape we have seen on the wire.
pub fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse(s),
        Value::Object(map) => {
            let seconds = map.get("_seconds").or_else(|| map.get("seconds"))?.as_i64()?;
            let nanos = map
                .get("_nanoseconds")
                .or_else(|| map.get("nanoseconds"))
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            DateTime::from_timestamp(seconds, nanos)
        }
        _ => None,
    }
}

/// A timestamp exactly as received, plus its parsed value when it parses.
///
/// Serializes back to the raw value, so records survive a round trip even
/// when the backend sends a format we cannot read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timestamp {
    raw: Value,
    parsed: Option<DateTime<Utc>>,
}

impl Timestamp {
    pub fn from_value(raw: Value) -> Self {
        let parsed = parse_value(&raw);
        Self { raw, parsed }
    }

    /// `None` when missing or unreadable.
    pub fn value(&self) -> Option<DateTime<Utc>> {
        self.parsed
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn is_missing(&self) -> bool {
        self.raw.is_null()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            raw: Value::String(dt.to_rfc3339()),
            parsed: Some(dt),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Timestamp::from_value)
    }
}

/// Optional variant: missing, `null` or unparseable values become `None`.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(super::parse_value))
    }
}

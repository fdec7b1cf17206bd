use super::date_format::{self, Timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stance a commenter attaches to a comment, encoded as `1..=5` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Sentiment {
    Against = 1,
    SlightlyAgainst = 2,
    Neutral = 3,
    SlightlyFor = 4,
    For = 5,
}

impl Sentiment {
    pub const ALL: [Sentiment; 5] = [
        Sentiment::Against,
        Sentiment::SlightlyAgainst,
        Sentiment::Neutral,
        Sentiment::SlightlyFor,
        Sentiment::For,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Sentiment::Against),
            2 => Some(Sentiment::SlightlyAgainst),
            3 => Some(Sentiment::Neutral),
            4 => Some(Sentiment::SlightlyFor),
            5 => Some(Sentiment::For),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Zero-based position, used to index per-category tables.
    pub fn ordinal(self) -> usize {
        self as usize - 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Against => "Completely Against",
            Sentiment::SlightlyAgainst => "Slightly Against",
            Sentiment::Neutral => "Neutral",
            Sentiment::SlightlyFor => "Slightly For",
            Sentiment::For => "Completely For",
        }
    }
}

impl TryFrom<u8> for Sentiment {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Sentiment::from_code(code).ok_or_else(|| format!("invalid sentiment code: {code}"))
    }
}

impl From<Sentiment> for u8 {
    fn from(sentiment: Sentiment) -> Self {
        sentiment.code()
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A discussion comment as returned by the comments-by-timeline endpoint.
///
/// Fields this crate does not interpret are kept in `extra` so the record
/// serializes back to its full content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// Kept verbatim; a missing or unreadable value does not reject the record.
    #[serde(default, skip_serializing_if = "Timestamp::is_missing")]
    pub created_at: Timestamp,
    #[serde(
        default,
        with = "sentiment_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(
        default,
        with = "date_format::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_index: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Comment {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at: created_at.into(),
            sentiment: None,
            content: None,
            username: None,
            user_id: None,
            updated_at: None,
            post_index: None,
            post_type: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Parsed creation time, `None` when missing or unreadable.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.value()
    }

    /// Fragment the renderer scrolls to after the comment is posted.
    pub fn anchor(&self) -> String {
        format!("#{}", self.id)
    }
}

/// `0`, `null`, a missing field or an unknown code all mean "no sentiment".
mod sentiment_code {
    use super::Sentiment;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(sentiment: &Option<Sentiment>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match sentiment {
            Some(sentiment) => serializer.serialize_u8(sentiment.code()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Sentiment>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(code
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .and_then(|code| u8::try_from(code).ok())
            .and_then(Sentiment::from_code))
    }
}

use super::date_format;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Value, json};

/// One lifecycle stage of a governance post, as supplied by the post loader.
///
/// The entry is forwarded to the comments endpoint exactly as received; the
/// typed fields are a read-only view used to build segments.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTimelineEntry {
    index: Option<String>,
    post_type: Option<String>,
    created_at: Option<DateTime<Utc>>,
    comments_count: u32,
    raw: Value,
}

impl Default for RawTimelineEntry {
    fn default() -> Self {
        Self {
            index: None,
            post_type: None,
            created_at: None,
            comments_count: 0,
            raw: Value::Object(Default::default()),
        }
    }
}

impl RawTimelineEntry {
    pub fn new(index: impl Into<String>, post_type: impl Into<String>, comments_count: u32) -> Self {
        let (index, post_type) = (index.into(), post_type.into());
        Self {
            raw: json!({"index": index, "type": post_type, "commentsCount": comments_count}),
            index: Some(index),
            post_type: Some(post_type),
            created_at: None,
            comments_count,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        if let Value::Object(map) = &mut self.raw {
            map.insert("created_at".into(), Value::String(created_at.to_rfc3339()));
        }
        self.created_at = Some(created_at);
        self
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    pub fn post_type(&self) -> Option<&str> {
        self.post_type.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn comments_count(&self) -> u32 {
        self.comments_count
    }

    /// The entry as it will be sent upstream.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// The fields read out of a raw entry.
#[derive(Deserialize)]
struct EntryFields {
    #[serde(default, deserialize_with = "index_as_string")]
    index: Option<String>,
    #[serde(rename = "type", default)]
    post_type: Option<String>,
    #[serde(default, with = "date_format::option")]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "commentsCount", default)]
    comments_count: u32,
}

impl<'de> Deserialize<'de> for RawTimelineEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let fields = EntryFields::deserialize(&raw).map_err(de::Error::custom)?;
        Ok(Self {
            index: fields.index,
            post_type: fields.post_type,
            created_at: fields.created_at,
            comments_count: fields.comments_count,
            raw,
        })
    }
}

impl Serialize for RawTimelineEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.raw.serialize(serializer)
    }
}

/// Post indices are numbers for on-chain posts and hashes for tips.
fn index_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A rendered timeline stage carrying its own comment bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSegment {
    /// 1-based position in the timeline.
    pub id: usize,
    pub date: Option<DateTime<Utc>>,
    pub status: String,
    pub comments_count: u32,
    /// Anchor target: id of the earliest comment in the bucket, empty if none.
    pub first_comment_id: String,
    pub index: String,
    #[serde(rename = "type")]
    pub post_type: String,
}

impl TimelineSegment {
    pub fn bucket_key(&self) -> String {
        bucket_key(&self.index, &self.post_type)
    }
}

/// Compound `"{index}_{type}"` key identifying a segment's bucket.
pub fn bucket_key(index: &str, post_type: &str) -> String {
    format!("{index}_{post_type}")
}

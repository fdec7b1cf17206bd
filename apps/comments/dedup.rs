use crate::models::comments::Comment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashSet},
    str::FromStr,
};

/// How two comment records are judged to be the same comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// Full-content serialization. Distinct comments with identical content,
    /// author and timestamp collapse into one.
    #[default]
    Content,
    /// Comment identifier only.
    Id,
}

impl FromStr for DedupStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(DedupStrategy::Content),
            "id" => Ok(DedupStrategy::Id),
            other => Err(format!("unknown dedup strategy: {other}")),
        }
    }
}

/// Drops duplicate comments. First occurrence wins and survivors keep their
/// relative order.
pub fn dedup_comments<'a, I>(comments: I, strategy: DedupStrategy) -> Vec<Comment>
where
    I: IntoIterator<Item = &'a Comment>,
{
    let mut seen = HashSet::new();
    comments
        .into_iter()
        .filter(|comment| seen.insert(canonical_key(comment, strategy)))
        .cloned()
        .collect()
}

fn canonical_key(comment: &Comment, strategy: DedupStrategy) -> String {
    match strategy {
        DedupStrategy::Content => serde_json::to_value(comment)
            .map(|value| canonical_json(&value))
            .unwrap_or_else(|_| format!("id:{}", comment.id)),
        DedupStrategy::Id => comment.id.clone(),
    }
}

/// Compact JSON with object keys sorted at every level, independent of how
/// `serde_json::Map` orders its entries.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let fields: BTreeMap<_, _> = map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let body: Vec<_> = fields
                .into_iter()
                .map(|(k, v)| format!("{}:{v}", Value::String(k.clone())))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<_> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

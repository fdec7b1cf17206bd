use crate::models::comments::Comment;
use indexmap::IndexMap;
use serde::Serialize;

/// Comments grouped by timeline segment, keyed by `"{index}_{type}"`.
///
/// Keys keep insertion order: seeded segment keys first, in timeline order,
/// followed by any extra keys the backend returned. Every bucket is sorted
/// ascending by `created_at`, with unreadable timestamps first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CommentBuckets(IndexMap<String, Vec<Comment>>);

impl CommentBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure `key` has a bucket, leaving existing contents untouched.
    pub fn seed(&mut self, key: String) {
        self.0.entry(key).or_default();
    }

    /// Replaces a bucket wholesale with `comments`, sorted.
    pub fn replace(&mut self, key: String, mut comments: Vec<Comment>) {
        sort_by_creation(&mut comments);
        self.0.insert(key, comments);
    }

    /// Appends a single comment and restores the bucket's ordering.
    pub fn push(&mut self, key: String, comment: Comment) {
        let bucket = self.0.entry(key).or_default();
        bucket.push(comment);
        sort_by_creation(bucket);
    }

    pub fn get(&self, key: &str) -> Option<&[Comment]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Comment])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All comments, bucket after bucket.
    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.0.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn comment_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

fn sort_by_creation(comments: &mut [Comment]) {
    // Stable: comments sharing a timestamp keep server order.
    comments.sort_by_key(Comment::created_at);
}

use crate::{
    buckets::CommentBuckets,
    dedup::{DedupStrategy, dedup_comments},
    models::{
        comments::{Comment, Sentiment},
        timeline::{RawTimelineEntry, TimelineSegment, bucket_key},
    },
    sentiment::{SentimentCounts, SentimentFilter, SentimentSnapshot},
    timeline::{build_timeline, total_comments},
};
use indexmap::IndexMap;
use tracing::{debug, info};

/// Proof that a fetch was started for a particular timeline load.
///
/// Only the ticket from the most recent [`CommentStore::begin_load`] is
/// accepted by [`CommentStore::apply_fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FetchTicket {
    generation: u64,
}

/// Page-level comment state: the timeline, its comment buckets, and the
/// sentiment view derived from them.
///
/// Only the fetch/merge path and [`CommentStore::add_local_comment`] change
/// the comment set; everything else reads.
#[derive(Debug, Clone)]
pub struct CommentStore {
    segments: Vec<TimelineSegment>,
    buckets: CommentBuckets,
    counts: SentimentCounts,
    snapshot: SentimentSnapshot,
    filter: SentimentFilter,
    loading: bool,
    generation: u64,
    dedup: DedupStrategy,
}

impl Default for CommentStore {
    fn default() -> Self {
        Self::new(DedupStrategy::default())
    }
}

impl CommentStore {
    pub fn new(dedup: DedupStrategy) -> Self {
        Self {
            segments: Vec::new(),
            buckets: CommentBuckets::new(),
            counts: SentimentCounts::default(),
            snapshot: SentimentSnapshot::default(),
            filter: SentimentFilter::default(),
            loading: true,
            generation: 0,
            dedup,
        }
    }

    /// Rebuilds the timeline and seeds empty buckets. Returns a ticket when a
    /// remote fetch should follow; `None` means loading is already finished
    /// (empty timeline, or no segment reports any comments).
    pub fn begin_load(&mut self, raw: Option<&[RawTimelineEntry]>) -> Option<FetchTicket> {
        let timeline = build_timeline(raw);
        let has_comments = timeline.total_comments() > 0;

        self.generation += 1;
        self.segments = timeline.segments;
        self.buckets = timeline.buckets;
        self.refresh();

        if self.segments.is_empty() || !has_comments {
            self.loading = false;
            return None;
        }

        self.loading = true;
        Some(FetchTicket {
            generation: self.generation,
        })
    }

    /// Merges a fetch result. Each returned bucket replaces the seeded one
    /// wholesale; `None` leaves every bucket empty. Results for a superseded
    /// load are dropped and `false` is returned.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        comments: Option<IndexMap<String, Vec<Comment>>>,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale comments response"
            );
            return false;
        }

        for (key, bucket) in comments.into_iter().flatten() {
            self.buckets.replace(key, bucket);
        }

        self.loading = false;
        self.refresh();
        true
    }

    /// Handles a comment the user just posted: append it to its bucket, bump
    /// the segment count, and return the anchor to jump to.
    pub fn add_local_comment(&mut self, post_index: &str, post_type: &str, comment: Comment) -> String {
        let anchor = comment.anchor();
        self.buckets.push(bucket_key(post_index, post_type), comment);

        for segment in self
            .segments
            .iter_mut()
            .filter(|s| s.index == post_index && s.post_type == post_type)
        {
            segment.comments_count = segment.comments_count.saturating_add(1);
        }

        self.refresh();
        info!(post_index, post_type, anchor = %anchor, "Added local comment");
        anchor
    }

    /// Replaces the tallied counts with server-provided ones. They hold until
    /// the comment set changes again.
    pub fn set_overall_sentiments(&mut self, counts: SentimentCounts) {
        self.counts = counts;
        self.snapshot = SentimentSnapshot::compute(&self.counts, self.all_comments().len());
    }

    pub fn toggle_sentiment(&mut self, sentiment: Sentiment) {
        self.filter.toggle(sentiment);
    }

    pub fn clear_sentiment_filter(&mut self) {
        self.filter.clear();
    }

    pub fn active_sentiment(&self) -> Option<Sentiment> {
        self.filter.selected()
    }

    pub fn is_sentiment_active(&self, sentiment: Sentiment) -> bool {
        self.filter.is_active(sentiment)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn segments(&self) -> &[TimelineSegment] {
        &self.segments
    }

    pub fn buckets(&self) -> &CommentBuckets {
        &self.buckets
    }

    pub fn counts(&self) -> &SentimentCounts {
        &self.counts
    }

    pub fn snapshot(&self) -> &SentimentSnapshot {
        &self.snapshot
    }

    /// Header count: the sum of the segments' reported comment counts.
    pub fn total_comments(&self) -> u32 {
        total_comments(&self.segments)
    }

    /// Every loaded comment, deduplicated, in timeline order.
    pub fn all_comments(&self) -> Vec<Comment> {
        dedup_comments(self.buckets.comments(), self.dedup)
    }

    /// What the comment list shows: [`Self::all_comments`] after the
    /// sentiment filter.
    pub fn visible_comments(&self) -> Vec<Comment> {
        self.filter.apply(&self.all_comments())
    }

    /// Recomputes everything derived from the comment set.
    fn refresh(&mut self) {
        for segment in &mut self.segments {
            segment.first_comment_id = self
                .buckets
                .get(&segment.bucket_key())
                .and_then(|bucket| bucket.first())
                .map(|c| c.id.clone())
                .unwrap_or_default();
        }

        let all = self.all_comments();
        self.counts = SentimentCounts::tally(&all);
        self.snapshot = SentimentSnapshot::compute(&self.counts, all.len());
    }
}

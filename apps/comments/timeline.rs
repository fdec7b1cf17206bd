use crate::{
    buckets::CommentBuckets,
    models::timeline::{RawTimelineEntry, TimelineSegment},
};
use chrono::{DateTime, Duration, Utc};

/// Grant discussions stop accepting comments this many days after creation.
pub const GRANT_COMMENT_WINDOW_DAYS: i64 = 6;

/// Ordered timeline segments plus one (empty) bucket per segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub segments: Vec<TimelineSegment>,
    pub buckets: CommentBuckets,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_comments(&self) -> u32 {
        total_comments(&self.segments)
    }
}

/// Human-readable stage label for a raw post type.
pub fn get_status(post_type: &str) -> String {
    match post_type {
        "DemocracyProposal" => "Democracy Proposal".to_string(),
        "TechCommitteeProposal" => "Tech Committee Proposal".to_string(),
        "TreasuryProposal" => "Treasury Proposal".to_string(),
        "Referendum" | "FellowshipReferendum" | "ReferendumV2" => "Referendum".to_string(),
        "CouncilMotion" => "Motion".to_string(),
        "ChildBounty" => "Child Bounty".to_string(),
        "Discussions" | "Grants" => post_type[..post_type.len() - 1].to_string(),
        other => other.to_string(),
    }
}

/// Turns the post's raw lifecycle stages into segments, preserving input
/// order. Missing `index`/`type` fall back to empty strings.
pub fn build_timeline(raw: Option<&[RawTimelineEntry]>) -> Timeline {
    let mut timeline = Timeline::default();

    for entry in raw.unwrap_or_default() {
        let index = entry.index().unwrap_or_default().to_string();
        let post_type = entry.post_type().unwrap_or_default().to_string();

        let segment = TimelineSegment {
            id: timeline.segments.len() + 1,
            date: entry.created_at(),
            status: get_status(&post_type),
            comments_count: entry.comments_count(),
            first_comment_id: String::new(),
            index,
            post_type,
        };

        timeline.buckets.seed(segment.bucket_key());
        timeline.segments.push(segment);
    }

    timeline
}

/// Saturates at `u32::MAX`; counts come straight from the post loader.
pub fn total_comments(segments: &[TimelineSegment]) -> u32 {
    segments
        .iter()
        .fold(0u32, |total, s| total.saturating_add(s.comments_count))
}

/// Whether a grant post has passed its comment window.
pub fn is_grant_closed(
    post_type: Option<&str>,
    created_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let is_grant = post_type.is_some_and(|t| t.eq_ignore_ascii_case("grants"));
    match (is_grant, created_at) {
        (true, Some(created_at)) => created_at < now - Duration::days(GRANT_COMMENT_WINDOW_DAYS),
        _ => false,
    }
}

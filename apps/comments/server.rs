use crate::{
    dedup::DedupStrategy,
    models::{
        comments::{Comment, Sentiment},
        date_format,
        timeline::{RawTimelineEntry, TimelineSegment},
    },
    pipeline::{CommentSource, load_comments},
    sentiment::SentimentSnapshot,
    store::CommentStore,
    timeline::is_grant_closed,
};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn CommentSource>,
    pub dedup: DedupStrategy,
}

impl AppState {
    pub fn new(source: Arc<dyn CommentSource>, dedup: DedupStrategy) -> Self {
        Self { source, dedup }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimelineRequest {
    pub network: String,
    #[serde(default)]
    pub timeline: Option<Vec<RawTimelineEntry>>,
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default, with = "date_format::option")]
    pub created_at: Option<DateTime<Utc>>,
    /// Pre-selected sentiment filter.
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
}

/// Everything the comments section renders for one post.
#[derive(Debug, Serialize)]
pub struct CommentsView {
    pub loading: bool,
    pub total_comments: u32,
    pub can_comment: bool,
    pub timeline: Vec<TimelineSegment>,
    pub sentiments: SentimentSnapshot,
    pub active_sentiment: Option<Sentiment>,
    pub comments: Vec<Comment>,
}

impl CommentsView {
    pub fn from_store(store: &CommentStore, can_comment: bool) -> Self {
        Self {
            loading: store.is_loading(),
            total_comments: store.total_comments(),
            can_comment,
            timeline: store.segments().to_vec(),
            sentiments: *store.snapshot(),
            active_sentiment: store.active_sentiment(),
            comments: store.visible_comments(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/comments/timeline", post(comments_timeline))
        .with_state(state)
}

#[instrument(skip_all, fields(network = %request.network))]
async fn comments_timeline(
    State(state): State<AppState>,
    Json(request): Json<TimelineRequest>,
) -> Json<CommentsView> {
    let mut store = CommentStore::new(state.dedup);
    if let Some(sentiment) = request.sentiment {
        store.toggle_sentiment(sentiment);
    }

    load_comments(
        &mut store,
        state.source.as_ref(),
        request.timeline.as_deref(),
        &request.network,
    )
    .await;

    let can_comment = !is_grant_closed(request.post_type.as_deref(), request.created_at, Utc::now());
    let view = CommentsView::from_store(&store, can_comment);

    info!(
        segments = view.timeline.len(),
        comments = view.comments.len(),
        can_comment,
        "Rendered comments view"
    );

    Json(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{StubSource, comment};
    use chrono::Duration;

    fn state(source: StubSource) -> AppState {
        AppState::new(Arc::new(source), DedupStrategy::Content)
    }

    fn request(body: serde_json::Value) -> Json<TimelineRequest> {
        Json(serde_json::from_value(body).unwrap())
    }

    #[tokio::test]
    async fn renders_filtered_view() {
        let source = StubSource::ok(vec![(
            "5_ReferendumV2",
            vec![
                comment("a", 0).with_sentiment(Sentiment::Against),
                comment("b", 1).with_sentiment(Sentiment::For),
            ],
        )]);

        let Json(view) = comments_timeline(
            State(state(source)),
            request(serde_json::json!({
                "network": "polkadot",
                "timeline": [{"index": 5, "type": "ReferendumV2", "commentsCount": 2}],
                "sentiment": 5
            })),
        )
        .await;

        assert!(!view.loading);
        assert!(view.can_comment);
        assert_eq!(view.total_comments, 2);
        assert_eq!(view.active_sentiment, Some(Sentiment::For));
        assert_eq!(view.comments.len(), 1);
        assert_eq!(view.comments[0].id, "b");
        // Percentages cover both comments regardless of the filter.
        assert_eq!(view.sentiments.percentages.against, 50);
        assert_eq!(view.sentiments.percentages.for_, 50);
        assert_eq!(view.timeline[0].first_comment_id, "a");
    }

    #[tokio::test]
    async fn old_grants_are_closed() {
        let created_at = (Utc::now() - Duration::days(10)).to_rfc3339();

        let Json(view) = comments_timeline(
            State(state(StubSource::ok(vec![]))),
            request(serde_json::json!({
                "network": "kusama",
                "timeline": null,
                "post_type": "Grants",
                "created_at": created_at
            })),
        )
        .await;

        assert!(!view.can_comment);
        assert!(!view.loading);
        assert!(view.timeline.is_empty());
        assert!(!view.sentiments.show);
    }

    #[test]
    fn view_serializes_with_wire_names() {
        let store = CommentStore::default();
        let value = serde_json::to_value(CommentsView::from_store(&store, true)).unwrap();

        assert_eq!(value["loading"], true);
        assert_eq!(value["sentiments"]["percentages"]["slightlyAgainst"], 0);
        assert_eq!(value["sentiments"]["percentages"]["for"], 0);
        assert!(value["active_sentiment"].is_null());
    }
}

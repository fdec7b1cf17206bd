use crate::{
    comments_api::{CommentsApiError, CommentsByTimelineResponse},
    models::{comments::Comment, timeline::RawTimelineEntry},
    store::CommentStore,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{info, instrument, warn};
use utils::errors::COMMENTS_FETCH_FAILED;

/// Anything that can answer a batched comments-by-timeline query.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn comments_by_timeline(
        &self,
        timeline: &[RawTimelineEntry],
        network: &str,
    ) -> Result<CommentsByTimelineResponse, CommentsApiError>;
}

/// Fetches comments for every segment in one call. Failures and empty
/// responses come back as `None`; the caller keeps its empty buckets.
#[instrument(skip_all, fields(network = %network, segments = timeline.len()))]
pub async fn fetch_comments<S>(
    source: &S,
    timeline: &[RawTimelineEntry],
    network: &str,
) -> Option<IndexMap<String, Vec<Comment>>>
where
    S: CommentSource + ?Sized,
{
    match source.comments_by_timeline(timeline, network).await {
        Ok(response) => response.comments.filter(|comments| !comments.is_empty()),
        Err(e) => {
            warn!(error = %e, network = %network, "{}", COMMENTS_FETCH_FAILED);
            None
        }
    }
}

/// Runs a full load cycle for one post: build the timeline, fetch once if
/// there is anything to fetch, and merge the result into `store`.
#[instrument(skip_all, fields(network = %network))]
pub async fn load_comments<S>(
    store: &mut CommentStore,
    source: &S,
    timeline: Option<&[RawTimelineEntry]>,
    network: &str,
) where
    S: CommentSource + ?Sized,
{
    let Some(ticket) = store.begin_load(timeline) else {
        info!("Nothing to fetch for this timeline");
        return;
    };

    let comments = fetch_comments(source, timeline.unwrap_or_default(), network).await;
    store.apply_fetch(ticket, comments);

    info!(
        buckets = store.buckets().len(),
        comments = store.buckets().comment_count(),
        "Comments loaded"
    );
}

use crate::{
    config::ApiConfig,
    models::{comments::Comment, timeline::RawTimelineEntry},
    pipeline::CommentSource,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT},
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const NETWORK_HEADER: &str = "x-network";

const CLIENT_USER_AGENT: &str = "comments-timeline/0.1 reqwest/0.12";

#[derive(Debug, Error)]
pub enum CommentsApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("comments endpoint returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("failed to decode comments response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
}

#[derive(Debug, Serialize)]
struct CommentsByTimelineRequest<'a> {
    timeline: &'a [RawTimelineEntry],
}

/// `{ "comments": { "<bucketKey>": Comment[] } }`
#[derive(Debug, Default, Deserialize)]
pub struct CommentsByTimelineResponse {
    #[serde(default)]
    pub comments: Option<IndexMap<String, Vec<Comment>>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for the backend's comments-by-timeline route.
pub struct CommentsApi {
    client: ClientWithMiddleware,
    endpoint: String,
    token: Option<String>,
}

impl CommentsApi {
    pub fn new(config: &ApiConfig) -> Result<Self, CommentsApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client: with_retries(client, config.max_retries),
            endpoint: config.endpoint(),
            token: config.token.clone(),
        })
    }

    pub fn new_with_endpoint(endpoint: String) -> Self {
        Self {
            client: with_retries(Client::new(), 0),
            endpoint,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One batched request for every segment of the timeline.
    #[instrument(name = "fetch_comments_by_timeline", skip(self, timeline), fields(segments = timeline.len()))]
    pub async fn fetch_comments_by_timeline(
        &self,
        timeline: &[RawTimelineEntry],
        network: &str,
    ) -> Result<CommentsByTimelineResponse, CommentsApiError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(NETWORK_HEADER, HeaderValue::from_str(network)?)
            .json(&CommentsByTimelineRequest { timeline });

        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }

        debug!(endpoint = %self.endpoint, network = %network, "Requesting comments by timeline");

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(body);
            return Err(CommentsApiError::Status { status, message });
        }

        let parsed: CommentsByTimelineResponse = serde_json::from_str(&body)?;

        info!(
            network = %network,
            buckets = parsed.comments.as_ref().map_or(0, IndexMap::len),
            "Fetched comments by timeline"
        );

        Ok(parsed)
    }
}

#[async_trait]
impl CommentSource for CommentsApi {
    async fn comments_by_timeline(
        &self,
        timeline: &[RawTimelineEntry],
        network: &str,
    ) -> Result<CommentsByTimelineResponse, CommentsApiError> {
        self.fetch_comments_by_timeline(timeline, network).await
    }
}

fn with_retries(client: Client, max_retries: u32) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn timeline() -> Vec<RawTimelineEntry> {
        vec![RawTimelineEntry::new("5", "ReferendumV2", 2)]
    }

    #[tokio::test]
    async fn posts_timeline_with_network_header() {
        let mut server = Server::new_async().await;
        let api = CommentsApi::new_with_endpoint(format!("{}/api/v1/comments", server.url()))
            .with_token("secret");

        let mock = server
            .mock("POST", "/api/v1/comments")
            .match_header("x-network", "kusama")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "timeline": [{"index": "5", "type": "ReferendumV2", "commentsCount": 2}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "comments": {
                        "5_ReferendumV2": [
                            {"id": "b", "created_at": "2024-01-02T00:00:00Z", "sentiment": 5},
                            {"id": "a", "created_at": "2024-01-01T00:00:00Z", "sentiment": 1}
                        ]
                    }
                }"#,
            )
            .create_async()
            .await;

        let response = api
            .fetch_comments_by_timeline(&timeline(), "kusama")
            .await
            .unwrap();

        let comments = response.comments.unwrap();
        assert_eq!(comments["5_ReferendumV2"].len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn surfaces_backend_message_on_error_status() {
        let mut server = Server::new_async().await;
        let api = CommentsApi::new_with_endpoint(server.url());

        let mock = server
            .mock("POST", "/")
            .with_status(400)
            .with_body(r#"{"message": "Invalid timeline"}"#)
            .create_async()
            .await;

        let err = api
            .fetch_comments_by_timeline(&timeline(), "polkadot")
            .await
            .unwrap_err();

        match err {
            CommentsApiError::Status { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Invalid timeline");
            }
            other => panic!("unexpected error: {other}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_comments_key_decodes_as_none() {
        let mut server = Server::new_async().await;
        let api = CommentsApi::new_with_endpoint(server.url());

        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let response = api
            .fetch_comments_by_timeline(&timeline(), "polkadot")
            .await
            .unwrap();
        assert!(response.comments.is_none());
    }

    #[tokio::test]
    async fn forwards_timeline_untouched() {
        let mut server = Server::new_async().await;
        let api = CommentsApi::new_with_endpoint(server.url());

        let raw = serde_json::json!([
            {"index": 5, "type": "ReferendumV2", "commentsCount": 1, "created_at": "2024-01-01T00:00:00.000Z"},
            {"index": 6, "type": "Discussions", "commentsCount": 1,
             "created_at": {"_seconds": 1704067200, "_nanoseconds": 0}, "hash": "0xdead"}
        ]);
        let timeline: Vec<RawTimelineEntry> = serde_json::from_value(raw.clone()).unwrap();

        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::Json(serde_json::json!({ "timeline": raw })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        api.fetch_comments_by_timeline(&timeline, "polkadot")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreadable_timestamp_does_not_drop_the_response() {
        let mut server = Server::new_async().await;
        let api = CommentsApi::new_with_endpoint(server.url());

        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{
                    "comments": {
                        "5_ReferendumV2": [
                            {"id": "good", "created_at": "2024-01-01T00:00:00Z", "sentiment": 1},
                            {"id": "bad", "created_at": "2024-01-01 10:00:00"},
                            {"id": "undated", "sentiment": 5}
                        ]
                    }
                }"#,
            )
            .create_async()
            .await;

        let response = api
            .fetch_comments_by_timeline(&timeline(), "polkadot")
            .await
            .unwrap();

        let bucket = &response.comments.unwrap()["5_ReferendumV2"];
        let ids: Vec<_> = bucket.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["good", "bad", "undated"]);
        assert!(bucket[0].created_at().is_some());
        assert_eq!(bucket[1].created_at(), None);
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let mut server = Server::new_async().await;
        let api = CommentsApi::new_with_endpoint(server.url());

        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = api
            .fetch_comments_by_timeline(&timeline(), "polkadot")
            .await
            .unwrap_err();
        assert!(matches!(err, CommentsApiError::Decode(_)));
    }
}

//! REST client for the feed data provider.

use ftso_lib::{CollaboratorError, FeedId, FeedProvider, FeedResponse, FeedWithProof, RoundId};
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const API_KEY_HEADER: &str = "X-API-KEY";

/// [`FeedProvider`] serving `GET {base}/specific-feed/{feed_id}/{round_id}`.
#[derive(Clone)]
pub struct HttpFeedProvider {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl HttpFeedProvider {
    pub fn new(base_url: Url, api_key: String, timeout: Option<Duration>) -> Result<Self, CollaboratorError> {
        let mut builder = Client::builder().user_agent(concat!("ftso-verify/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| CollaboratorError::Provider(format!("build http client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn feed_url(&self, feed_id: &FeedId, round_id: RoundId) -> String {
        format!(
            "{}/specific-feed/{feed_id}/{round_id}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

impl FeedProvider for HttpFeedProvider {
    async fn fetch_feed(
        &self,
        feed_id: &FeedId,
        round_id: RoundId,
    ) -> Result<FeedWithProof, CollaboratorError> {
        let url = self.feed_url(feed_id, round_id);
        debug!(%url, "fetching feed with proof");

        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CollaboratorError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| CollaboratorError::Provider(e.to_string()))?;
        decode_feed(&body)
    }
}

/// Parse the provider's JSON envelope.
pub fn decode_feed(body: &str) -> Result<FeedWithProof, CollaboratorError> {
    serde_json::from_str::<FeedResponse>(body)
        .map(|response| response.feed_with_proof)
        .map_err(|e| CollaboratorError::Decode(e.to_string()))
}

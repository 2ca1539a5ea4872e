//! Read-only YouTube Data API v3 client.
//!
//! Two calls are needed: a live search on a channel and, when nothing is
//! live, a channel lookup for its display name. Both authenticate with the
//! viewer's bearer token.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::YouTubeConfig;
use crate::poller::ChannelLookup;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

const USER_AGENT: &str = concat!("livemerge/", env!("CARGO_PKG_VERSION"));

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status
    #[error("YouTube API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Response shapes (only the fields we read) ────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchItemId,
    pub snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
pub struct SearchItemId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub live_broadcast_content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelItem {
    pub snippet: ChannelSnippet,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSnippet {
    #[serde(default)]
    pub title: String,
}

/// The broadcast currently live on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveVideo {
    pub video_id: String,
    pub channel_id: String,
    pub channel_title: String,
    pub title: String,
}

impl SearchResponse {
    /// First result that carries a video ID.
    pub fn into_live_video(self) -> Option<LiveVideo> {
        self.items.into_iter().find_map(|item| {
            let video_id = item.id.video_id.filter(|id| !id.is_empty())?;
            Some(LiveVideo {
                video_id,
                channel_id: item.snippet.channel_id,
                channel_title: item.snippet.channel_title,
                title: item.snippet.title,
            })
        })
    }
}

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    api_base: String,
}

impl YouTubeClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &YouTubeConfig) -> Result<Self> {
        Self::new(
            config.api_base.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Current live broadcast on `channel_id`, if any.
    pub async fn search_live(&self, channel_id: &str, token: &str) -> Result<Option<LiveVideo>> {
        let response: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("eventType", "live"),
                    ("type", "video"),
                    ("order", "date"),
                ],
                token,
            )
            .await?;
        Ok(response.into_live_video())
    }

    /// Display title of `channel_id`, if the channel exists.
    pub async fn channel_title(&self, channel_id: &str, token: &str) -> Result<Option<String>> {
        let response: ChannelListResponse = self
            .get_json("channels", &[("part", "snippet"), ("id", channel_id)], token)
            .await?;
        Ok(response
            .items
            .into_iter()
            .map(|item| item.snippet.title)
            .find(|title| !title.is_empty()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        token: &str,
    ) -> Result<T> {
        let url = format!("{}/{}", self.api_base, endpoint);
        debug!("youtube: GET {} {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl ChannelLookup for YouTubeClient {
    async fn live_video(&self, channel_id: &str, token: &str) -> Result<Option<LiveVideo>> {
        self.search_live(channel_id, token).await
    }

    async fn channel_title(&self, channel_id: &str, token: &str) -> Result<Option<String>> {
        YouTubeClient::channel_title(self, channel_id, token).await
    }
}

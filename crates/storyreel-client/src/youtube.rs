//! YouTube Data API v3 candidate source.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use storyreel_models::{Candidate, ItemId, VideoStats};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::html::decode_html_entities;
use crate::provider::CandidateSource;
use crate::types::{SearchQuery, StatsRecord};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// Configuration for the YouTube client.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl YouTubeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .map_err(|_| ClientError::config_error("YOUTUBE_API_KEY not set"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("YOUTUBE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                std::env::var("YOUTUBE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<SearchItemId>,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    published_at: Option<DateTime<Utc>>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

impl SearchItem {
    fn into_candidate(self) -> Option<Candidate> {
        let id = self.id?.video_id.filter(|id| !id.trim().is_empty())?;
        let snippet = self.snippet.unwrap_or_default();
        let thumbnail = snippet
            .thumbnails
            .and_then(|t| t.medium.or(t.default))
            .map(|t| t.url);

        let mut candidate = Candidate::new(
            id,
            decode_html_entities(&snippet.title),
            decode_html_entities(&snippet.description),
            snippet.published_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        );
        candidate.thumbnail_url = thumbnail;
        Some(candidate)
    }
}

/// YouTube Data API client.
#[derive(Clone)]
pub struct YouTubeClient {
    http: Client,
    config: YouTubeConfig,
}

impl YouTubeClient {
    pub fn new(config: YouTubeConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(YouTubeConfig::from_env()?)
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/youtube/v3/{}",
            self.config.base_url.trim_end_matches('/'),
            resource
        )
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, String)],
    ) -> ClientResult<Vec<T>> {
        let response = self
            .http
            .get(self.endpoint(resource))
            .query(params)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(ClientError::request_failed(format!(
                "YouTube {} returned {}: {}",
                resource, status, message
            )));
        }

        let list: ListResponse<T> = response.json().await.map_err(|e| {
            ClientError::invalid_response(format!("Failed to parse YouTube {}: {}", resource, e))
        })?;
        Ok(list.items)
    }
}

#[async_trait]
impl CandidateSource for YouTubeClient {
    async fn search(&self, query: &SearchQuery) -> ClientResult<Vec<Candidate>> {
        let params = [
            ("part", "snippet".to_string()),
            ("q", query.query.clone()),
            ("regionCode", query.region.clone()),
            ("relevanceLanguage", query.language.clone()),
            ("maxResults", query.max_results.to_string()),
            ("type", "video".to_string()),
        ];

        let items: Vec<SearchItem> = self.get_list("search", &params).await?;
        let total = items.len();
        let candidates: Vec<Candidate> = items
            .into_iter()
            .filter_map(SearchItem::into_candidate)
            .collect();

        info!(
            query = %query.query,
            returned = total,
            usable = candidates.len(),
            "YouTube search complete"
        );
        Ok(candidates)
    }

    async fn lookup_stats(&self, ids: &[ItemId]) -> ClientResult<Vec<StatsRecord>> {
        let valid: Vec<&str> = ids
            .iter()
            .filter(|id| id.is_valid())
            .map(ItemId::as_str)
            .collect();

        if valid.is_empty() {
            warn!("Stats lookup called with no valid ids");
            return Ok(Vec::new());
        }

        let params = [
            ("part", "snippet,statistics".to_string()),
            ("id", valid.join(",")),
        ];
        let items: Vec<VideoItem> = self.get_list("videos", &params).await?;
        debug!(requested = valid.len(), returned = items.len(), "Stats lookup complete");

        Ok(items
            .into_iter()
            .map(|item| {
                let stats = item
                    .statistics
                    .map(|s| {
                        VideoStats::from_raw(
                            s.view_count.as_deref(),
                            s.like_count.as_deref(),
                            s.comment_count.as_deref(),
                        )
                    })
                    .unwrap_or_default();
                let description = item
                    .snippet
                    .map(|s| decode_html_entities(&s.description))
                    .filter(|d| !d.trim().is_empty());
                StatsRecord {
                    id: ItemId::from(item.id),
                    stats,
                    description,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storyreel_models::StatValue;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> YouTubeClient {
        YouTubeClient::new(YouTubeConfig::new("yt-key").with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_search_maps_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .and(query_param("q", "news"))
            .and(query_param("regionCode", "KR"))
            .and(query_param("relevanceLanguage", "ko"))
            .and(query_param("maxResults", "20"))
            .and(query_param("type", "video"))
            .and(query_param("key", "yt-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "id": {"videoId": "abc"},
                        "snippet": {
                            "title": "Rock &amp; Roll",
                            "description": "It&#39;s here",
                            "publishedAt": "2024-05-01T10:00:00Z",
                            "thumbnails": {"medium": {"url": "https://img/abc.jpg"}}
                        }
                    },
                    {"id": {"channelId": "no-video"}, "snippet": {"title": "channel"}}
                ]
            })))
            .mount(&server)
            .await;

        let candidates = client(&server)
            .search(&SearchQuery::new("news"))
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id.as_str(), "abc");
        assert_eq!(candidates[0].title, "Rock & Roll");
        assert_eq!(candidates[0].description, "It's here");
        assert_eq!(candidates[0].published_date(), "2024-05-01");
        assert_eq!(
            candidates[0].thumbnail_url.as_deref(),
            Some("https://img/abc.jpg")
        );
    }

    #[tokio::test]
    async fn test_search_error_message_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"message": "quota exceeded"}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .search(&SearchQuery::new("news"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_lookup_stats_parses_strings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/videos"))
            .and(query_param("part", "snippet,statistics"))
            .and(query_param("id", "a,b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "a",
                    "snippet": {"description": "Full &quot;text&quot;"},
                    "statistics": {"viewCount": "1234", "likeCount": "5"}
                }]
            })))
            .mount(&server)
            .await;

        let records = client(&server)
            .lookup_stats(&[ItemId::from("a"), ItemId::from(" "), ItemId::from("b")])
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stats.views, StatValue::Count(1234));
        assert_eq!(records[0].stats.comments, StatValue::Unknown);
        assert_eq!(records[0].description.as_deref(), Some("Full \"text\""));
    }

    #[tokio::test]
    async fn test_lookup_stats_without_ids_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let records = client(&server)
            .lookup_stats(&[ItemId::from(""), ItemId::from("  ")])
            .await
            .unwrap();
        assert!(records.is_empty());
    }
}

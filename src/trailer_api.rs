use crate::config::{Config, HttpVerb};
use crate::models::{CompactMovieData, MovieDataWithTrailer};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// The seam between the lookup workflow and the trailer API.
#[async_trait]
pub trait TrailerApi: Send + Sync {
    async fn search_compact(
        &self,
        title: &str,
        lag: Option<&NetworkLag>,
    ) -> Result<Vec<CompactMovieData>, FetchError>;

    async fn fetch_with_trailer(
        &self,
        summary: &CompactMovieData,
        lag: Option<&NetworkLag>,
    ) -> Result<MovieDataWithTrailer, FetchError>;
}

#[derive(Error, Debug)]
pub enum FetchError {
    /// The API answered, but not with a 2xx.
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },
    /// The request never completed.
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// `true` when the API produced an answer, as opposed to the exchange
    /// itself breaking down.
    pub fn is_http_status(&self) -> bool {
        matches!(self, FetchError::Status { .. })
    }
}

/// Simulated latency in seconds, forwarded verbatim as `network_lag`.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkLag(String);

impl NetworkLag {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let seconds: f64 = trimmed.parse().ok()?;
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkLag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct HttpTrailerClient {
    client: Client,
    search_url: String,
    search_method: HttpVerb,
    detail_method: HttpVerb,
}

impl HttpTrailerClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let user_agent = format!("trailerlink/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .user_agent(user_agent)
            .build()
            .context("Failed to build trailer API HTTP client")?;
        Ok(Self {
            client,
            search_url: config.search_url(),
            search_method: config.search_method,
            detail_method: config.detail_method,
        })
    }

    fn search_request_url(&self, title: &str, lag: Option<&NetworkLag>) -> String {
        let mut url = format!("{}?title={}", self.search_url, urlencoding::encode(title));
        if let Some(lag) = lag {
            url.push_str(&format!("&network_lag={}", urlencoding::encode(lag.as_str())));
        }
        url
    }

    fn detail_request_url(&self, imdb_id: &str, lag: Option<&NetworkLag>) -> String {
        let mut url = format!("{}/{}", self.search_url, urlencoding::encode(imdb_id));
        if let Some(lag) = lag {
            url.push_str(&format!("?network_lag={}", urlencoding::encode(lag.as_str())));
        }
        url
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        verb: HttpVerb,
        url: &str,
        title: &str,
    ) -> Result<T, FetchError> {
        let mut req = self.client.request(verb.as_method(), url);
        if verb == HttpVerb::Post {
            req = req.json(&json!({ "title": title }));
        }
        let res = req.send().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = res.status();
        let bytes = res.bytes().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: format!("reading body failed: {e}"),
        })?;
        debug!(%url, %status, len = bytes.len(), "trailer API response");
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl TrailerApi for HttpTrailerClient {
    async fn search_compact(
        &self,
        title: &str,
        lag: Option<&NetworkLag>,
    ) -> Result<Vec<CompactMovieData>, FetchError> {
        let url = self.search_request_url(title, lag);
        self.send_json(self.search_method, &url, title).await
    }

    async fn fetch_with_trailer(
        &self,
        summary: &CompactMovieData,
        lag: Option<&NetworkLag>,
    ) -> Result<MovieDataWithTrailer, FetchError> {
        let url = self.detail_request_url(&summary.imdbid, lag);
        self.send_json(self.detail_method, &url, &summary.title).await
    }
}

use crate::trailer_api::NetworkLag;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3147";

/// Which copy of the trailer API to talk to. They share a contract and only
/// differ by path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVariant {
    Live,
    Mock,
}

impl ApiVariant {
    pub fn path_prefix(&self) -> &'static str {
        match self {
            ApiVariant::Live => "/api/v2/trailer",
            ApiVariant::Mock => "/mock/v2/trailer",
        }
    }
}

impl FromStr for ApiVariant {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "api" | "live" => Ok(ApiVariant::Live),
            "mock" => Ok(ApiVariant::Mock),
            _ => Err(anyhow!("API variant must be 'api' or 'mock'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
}

impl HttpVerb {
    pub fn as_method(&self) -> reqwest::Method {
        match self {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Post => reqwest::Method::POST,
        }
    }
}

impl FromStr for HttpVerb {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            _ => Err(anyhow!("HTTP method must be 'GET' or 'POST'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub variant: ApiVariant,
    pub search_method: HttpVerb,
    pub detail_method: HttpVerb,
    /// `Some` turns lag forwarding on; the value is the default lag.
    pub simulated_lag: Option<NetworkLag>,
    pub addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            variant: ApiVariant::Live,
            search_method: HttpVerb::Get,
            detail_method: HttpVerb::Get,
            simulated_lag: None,
            addr: SocketAddr::from(([0, 0, 0, 0], 3147)),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = read("TRAILER_API_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(anyhow!(
                "TRAILER_API_URL must start with http:// or https:// (got '{}')",
                base_url
            ));
        }

        let variant = match read("TRAILER_API_VARIANT") {
            Some(v) => v.parse::<ApiVariant>().context("Invalid TRAILER_API_VARIANT")?,
            None => ApiVariant::Live,
        };
        let search_method = match read("TRAILER_SEARCH_METHOD") {
            Some(v) => v.parse::<HttpVerb>().context("Invalid TRAILER_SEARCH_METHOD")?,
            None => HttpVerb::Get,
        };
        let detail_method = match read("TRAILER_DETAIL_METHOD") {
            Some(v) => v.parse::<HttpVerb>().context("Invalid TRAILER_DETAIL_METHOD")?,
            None => HttpVerb::Get,
        };
        let simulated_lag = match read("TRAILER_SIMULATED_LAG") {
            Some(v) => Some(NetworkLag::parse(&v).ok_or_else(|| {
                anyhow!(
                    "Invalid TRAILER_SIMULATED_LAG: '{}' is not a non-negative number of seconds",
                    v
                )
            })?),
            None => None,
        };
        let addr_raw = read("TRAILERLINK_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr_raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid TRAILERLINK_ADDR '{}'", addr_raw))?;

        Ok(Self {
            base_url,
            variant,
            search_method,
            detail_method,
            simulated_lag,
            addr,
        })
    }

    pub fn simulated_lag_enabled(&self) -> bool {
        self.simulated_lag.is_some()
    }

    pub fn search_url(&self) -> String {
        format!("{}{}/search", self.base_url, self.variant.path_prefix())
    }
}

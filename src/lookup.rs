//! Two-phase trailer lookup: one search call, then one detail call per hit,
//! awaited in order so results show up one card at a time.

use crate::models::{CompactMovieData, MovieDataWithTrailer};
use crate::trailer_api::{FetchError, NetworkLag, TrailerApi};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const SEARCH_FAILED_NOTICE: &str = "Movie not found!";
pub const DETAIL_FAILED_NOTICE: &str = "Error fetching data..";

/// Everything a view needs to draw a lookup. Written only by [`TrailerLookup`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LookupState {
    pub query: String,
    pub summaries: Vec<CompactMovieData>,
    pub details: Vec<MovieDataWithTrailer>,
    pub loading: bool,
    pub error: bool,
    pub notice: Option<String>,
}

impl LookupState {
    /// Detail records that have both a title and a trailer to show. The
    /// workflow only stores such records, so this matches `details` for any
    /// state it produced.
    pub fn displayable(&self) -> Vec<&MovieDataWithTrailer> {
        self.details.iter().filter(|d| d.is_displayable()).collect()
    }

    pub fn progress_line(&self) -> Option<String> {
        self.loading.then(|| format!("Loading {} movies...", self.summaries.len()))
    }
}

/// Reasons a lookup is refused before any request goes out.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("title is required")]
    EmptyQuery,
    #[error("a search is already running")]
    Busy,
    #[error("network lag '{0}' is not a non-negative number of seconds")]
    InvalidLag(String),
}

pub struct TrailerLookup {
    api: Arc<dyn TrailerApi>,
    default_lag: Option<NetworkLag>,
    state: watch::Sender<LookupState>,
    in_flight: AtomicBool,
}

impl TrailerLookup {
    /// `default_lag` doubles as the switch for lag forwarding: with `None`,
    /// no `network_lag` is ever sent, even if a caller supplies one.
    pub fn new(api: Arc<dyn TrailerApi>, default_lag: Option<NetworkLag>) -> Self {
        let (state, _) = watch::channel(LookupState::default());
        Self {
            api,
            default_lag,
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn lag_enabled(&self) -> bool {
        self.default_lag.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> LookupState {
        self.state.borrow().clone()
    }

    /// Runs one lookup to completion and returns the final state.
    ///
    /// HTTP failures are reported through [`LookupState::error`]; a broken
    /// exchange stops the sequence and keeps whatever already arrived.
    pub async fn search(
        &self,
        query: &str,
        lag_override: Option<&str>,
    ) -> Result<LookupState, LookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LookupError::EmptyQuery);
        }
        let lag = self.resolve_lag(lag_override)?;
        let guard = InFlight::acquire(&self.in_flight, &self.state).ok_or(LookupError::Busy)?;

        info!("Searching trailers for '{}'", query);
        self.state.send_modify(|s| {
            *s = LookupState {
                query: query.to_string(),
                loading: true,
                ..LookupState::default()
            };
        });

        self.run(query, lag.as_ref()).await;

        drop(guard);
        let state = self.snapshot();
        info!(
            "Lookup for '{}' finished: {} of {} movies, error={}",
            query,
            state.details.len(),
            state.summaries.len(),
            state.error
        );
        Ok(state)
    }

    fn resolve_lag(&self, lag_override: Option<&str>) -> Result<Option<NetworkLag>, LookupError> {
        let Some(default_lag) = &self.default_lag else {
            if lag_override.is_some_and(|l| !l.trim().is_empty()) {
                debug!("Ignoring network lag, simulated lag is disabled");
            }
            return Ok(None);
        };
        match lag_override.map(str::trim).filter(|l| !l.is_empty()) {
            Some(raw) => NetworkLag::parse(raw)
                .map(Some)
                .ok_or_else(|| LookupError::InvalidLag(raw.to_string())),
            None => Ok(Some(default_lag.clone())),
        }
    }

    async fn run(&self, query: &str, lag: Option<&NetworkLag>) {
        let summaries = match self.api.search_compact(query, lag).await {
            Ok(summaries) => summaries,
            Err(e) => {
                self.record_failure(&e, SEARCH_FAILED_NOTICE);
                return;
            }
        };
        info!("Found {} movies for '{}'", summaries.len(), query);
        self.state.send_modify(|s| s.summaries = summaries.clone());

        for summary in &summaries {
            if summary.imdbid.trim().is_empty() {
                warn!("Skipping '{}': search result has no IMDb id", summary.title);
                self.flag_error(DETAIL_FAILED_NOTICE);
                continue;
            }
            match self.api.fetch_with_trailer(summary, lag).await {
                Ok(mut detail) => {
                    if detail.imdbid.is_empty() {
                        detail.imdbid = summary.imdbid.clone();
                    }
                    if !detail.is_displayable() {
                        debug!(imdb_id = %summary.imdbid, "detail has no title or trailer, hidden");
                        continue;
                    }
                    debug!(imdb_id = %summary.imdbid, title = %detail.title, "detail fetched");
                    self.state.send_modify(|s| s.details.push(detail));
                }
                Err(e) => {
                    if !self.record_failure(&e, DETAIL_FAILED_NOTICE) {
                        return;
                    }
                }
            }
        }
    }

    fn flag_error(&self, notice: &str) {
        self.state.send_modify(|s| {
            s.error = true;
            s.notice = Some(notice.to_string());
        });
    }

    /// Returns whether the sequence may continue.
    fn record_failure(&self, err: &FetchError, notice: &str) -> bool {
        if err.is_http_status() {
            warn!("Trailer API request failed: {}", err);
            self.flag_error(notice);
            true
        } else {
            warn!("Trailer lookup aborted: {}", err);
            false
        }
    }
}

/// Holds the single-flight flag; releasing it also clears the loading
/// indicator, so a dropped future never leaves a spinner behind.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    state: &'a watch::Sender<LookupState>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, state: &'a watch::Sender<LookupState>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, state })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.loading = false);
        self.flag.store(false, Ordering::Release);
    }
}

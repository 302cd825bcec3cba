use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::{watch, Notify};
use trailerlink::lookup::{
    LookupError, LookupState, TrailerLookup, DETAIL_FAILED_NOTICE, SEARCH_FAILED_NOTICE,
};
use trailerlink::models::{CompactMovieData, MovieDataWithTrailer};
use trailerlink::trailer_api::{FetchError, NetworkLag, TrailerApi};

#[derive(Clone)]
enum Reply<T> {
    Ok(T),
    Status(u16),
    Network,
}

impl<T: Clone> Reply<T> {
    fn into_result(self, url: &str) -> Result<T, FetchError> {
        match self {
            Reply::Ok(v) => Ok(v),
            Reply::Status(code) => Err(FetchError::Status {
                status: StatusCode::from_u16(code).expect("valid status"),
                url: url.to_string(),
                body: "{\"detail\":\"nope\"}".to_string(),
            }),
            Reply::Network => Err(FetchError::Network {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Observed {
    imdb_id: String,
    visible_details: usize,
    visible_summaries: usize,
    loading: bool,
    error: bool,
}

struct FakeApi {
    search: Reply<Vec<CompactMovieData>>,
    details: HashMap<String, Reply<MovieDataWithTrailer>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
    observer: OnceLock<watch::Receiver<LookupState>>,
    observed: Mutex<Vec<Observed>>,
}

impl FakeApi {
    fn new(
        search: Reply<Vec<CompactMovieData>>,
        details: Vec<(&str, Reply<MovieDataWithTrailer>)>,
    ) -> Self {
        Self {
            search,
            details: details
                .into_iter()
                .map(|(id, reply)| (id.to_string(), reply))
                .collect(),
            calls: Mutex::new(Vec::new()),
            gate: None,
            observer: OnceLock::new(),
            observed: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn lag_label(lag: Option<&NetworkLag>) -> String {
    lag.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string())
}

#[async_trait::async_trait]
impl TrailerApi for FakeApi {
    async fn search_compact(
        &self,
        title: &str,
        lag: Option<&NetworkLag>,
    ) -> Result<Vec<CompactMovieData>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("search:{}:{}", title, lag_label(lag)));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.search.clone().into_result("/api/v2/trailer/search")
    }

    async fn fetch_with_trailer(
        &self,
        summary: &CompactMovieData,
        lag: Option<&NetworkLag>,
    ) -> Result<MovieDataWithTrailer, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("detail:{}:{}", summary.imdbid, lag_label(lag)));
        if let Some(rx) = self.observer.get() {
            let state = rx.borrow();
            self.observed.lock().unwrap().push(Observed {
                imdb_id: summary.imdbid.clone(),
                visible_details: state.details.len(),
                visible_summaries: state.summaries.len(),
                loading: state.loading,
                error: state.error,
            });
        }
        let url = format!("/api/v2/trailer/search/{}", summary.imdbid);
        self.details
            .get(&summary.imdbid)
            .cloned()
            .unwrap_or(Reply::Status(404))
            .into_result(&url)
    }
}

fn summary(id: &str, title: &str) -> CompactMovieData {
    CompactMovieData {
        title: title.to_string(),
        year: "1977".to_string(),
        imdbid: id.to_string(),
        kind: "movie".to_string(),
        poster: format!("https://img.example/{id}.jpg"),
    }
}

fn detail(id: &str, title: &str) -> MovieDataWithTrailer {
    MovieDataWithTrailer {
        title: title.to_string(),
        year: "1977".to_string(),
        rated: "PG".to_string(),
        imdbid: id.to_string(),
        imdbrating: "8.6".to_string(),
        trailer_link: format!("https://www.youtube.com/watch?v={id}"),
        trailer_embed_link: format!("https://www.youtube.com/embed/{id}"),
        ..Default::default()
    }
}

fn ids(details: &[MovieDataWithTrailer]) -> Vec<&str> {
    details.iter().map(|d| d.imdbid.as_str()).collect()
}

fn three_hits() -> Reply<Vec<CompactMovieData>> {
    Reply::Ok(vec![
        summary("tt1", "Star Wars"),
        summary("tt2", "The Empire Strikes Back"),
        summary("tt3", "Return of the Jedi"),
    ])
}

#[tokio::test]
async fn two_hits_yield_two_details_in_order() {
    let api = Arc::new(FakeApi::new(
        Reply::Ok(vec![summary("tt1", "Star Wars"), summary("tt2", "Empire")]),
        vec![
            ("tt1", Reply::Ok(detail("tt1", "Star Wars"))),
            ("tt2", Reply::Ok(detail("tt2", "Empire"))),
        ],
    ));
    let lookup = TrailerLookup::new(api.clone(), None);

    let state = lookup.search("star wars", None).await.expect("search runs");

    assert_eq!(ids(&state.details), vec!["tt1", "tt2"]);
    assert_eq!(state.summaries.len(), 2);
    assert_eq!(state.query, "star wars");
    assert!(!state.error);
    assert!(!state.loading);
    assert_eq!(state.notice, None);
    assert_eq!(
        api.calls(),
        vec!["search:star wars:-", "detail:tt1:-", "detail:tt2:-"]
    );
}

#[tokio::test]
async fn failed_search_issues_no_detail_requests() {
    let api = Arc::new(FakeApi::new(Reply::Status(404), vec![]));
    let lookup = TrailerLookup::new(api.clone(), None);

    let state = lookup.search("unknown film", None).await.expect("search runs");

    assert!(state.error);
    assert_eq!(state.notice.as_deref(), Some(SEARCH_FAILED_NOTICE));
    assert!(state.details.is_empty());
    assert!(state.summaries.is_empty());
    assert!(!state.loading);
    assert_eq!(api.calls(), vec!["search:unknown film:-"]);
}

#[tokio::test]
async fn failed_detail_does_not_stop_the_rest() {
    let api = Arc::new(FakeApi::new(
        three_hits(),
        vec![
            ("tt1", Reply::Ok(detail("tt1", "Star Wars"))),
            ("tt2", Reply::Status(500)),
            ("tt3", Reply::Ok(detail("tt3", "Return of the Jedi"))),
        ],
    ));
    let lookup = TrailerLookup::new(api.clone(), None);

    let state = lookup.search("star wars", None).await.expect("search runs");

    assert_eq!(ids(&state.details), vec!["tt1", "tt3"]);
    assert!(state.error);
    assert_eq!(state.notice.as_deref(), Some(DETAIL_FAILED_NOTICE));
    assert_eq!(api.calls().len(), 4);
    assert!(state.details.len() <= state.summaries.len());
}

#[tokio::test]
async fn network_failure_aborts_and_keeps_partial_results() {
    let api = Arc::new(FakeApi::new(
        three_hits(),
        vec![
            ("tt1", Reply::Ok(detail("tt1", "Star Wars"))),
            ("tt2", Reply::Network),
            ("tt3", Reply::Ok(detail("tt3", "Return of the Jedi"))),
        ],
    ));
    let lookup = TrailerLookup::new(api.clone(), None);

    let state = lookup.search("star wars", None).await.expect("search runs");

    assert_eq!(ids(&state.details), vec!["tt1"]);
    assert!(!state.error);
    assert!(!state.loading);
    assert!(!api.calls().iter().any(|c| c.starts_with("detail:tt3")));
}

#[tokio::test]
async fn network_failure_during_search_is_silent() {
    let api = Arc::new(FakeApi::new(Reply::Network, vec![]));
    let lookup = TrailerLookup::new(api.clone(), None);

    let state = lookup.search("star wars", None).await.expect("search runs");

    assert!(!state.error);
    assert!(state.summaries.is_empty());
    assert!(!state.loading);
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test]
async fn blank_query_is_rejected_before_any_request() {
    let api = Arc::new(FakeApi::new(three_hits(), vec![]));
    let lookup = TrailerLookup::new(api.clone(), None);

    assert_eq!(lookup.search("", None).await, Err(LookupError::EmptyQuery));
    assert_eq!(lookup.search("   ", None).await, Err(LookupError::EmptyQuery));
    assert!(api.calls().is_empty());
    assert_eq!(lookup.snapshot(), LookupState::default());
}

#[tokio::test]
async fn overlapping_search_is_rejected() {
    let gate = Arc::new(Notify::new());
    let mut fake = FakeApi::new(
        Reply::Ok(vec![summary("tt1", "Star Wars")]),
        vec![("tt1", Reply::Ok(detail("tt1", "Star Wars")))],
    );
    fake.gate = Some(gate.clone());
    let api = Arc::new(fake);
    let lookup = TrailerLookup::new(api.clone(), None);

    let (first, second) = tokio::join!(lookup.search("star wars", None), async {
        let second = lookup.search("alien", None).await;
        gate.notify_one();
        second
    });

    assert_eq!(second, Err(LookupError::Busy));
    let first = first.expect("first search runs");
    assert_eq!(ids(&first.details), vec!["tt1"]);
    assert_eq!(api.calls(), vec!["search:star wars:-", "detail:tt1:-"]);

    // The guard is released once the first lookup ends.
    gate.notify_one();
    let again = lookup.search("star wars", None).await;
    assert!(again.is_ok());
}

#[tokio::test]
async fn observers_see_cards_arrive_one_at_a_time() {
    let api = Arc::new(FakeApi::new(
        three_hits(),
        vec![
            ("tt1", Reply::Ok(detail("tt1", "Star Wars"))),
            ("tt2", Reply::Ok(detail("tt2", "Empire"))),
            ("tt3", Reply::Ok(detail("tt3", "Jedi"))),
        ],
    ));
    let lookup = TrailerLookup::new(api.clone(), None);
    api.observer.set(lookup.subscribe()).expect("observer set once");

    lookup.search("star wars", None).await.expect("search runs");

    let observed = api.observed.lock().unwrap().clone();
    let seen: Vec<(usize, usize, bool)> = observed
        .iter()
        .map(|o| (o.visible_details, o.visible_summaries, o.loading))
        .collect();
    assert_eq!(seen, vec![(0, 3, true), (1, 3, true), (2, 3, true)]);
    assert_eq!(observed[2].imdb_id, "tt3");
    assert!(!lookup.snapshot().loading);
}

#[tokio::test]
async fn new_search_resets_previous_results() {
    let api = Arc::new(FakeApi::new(
        Reply::Ok(vec![summary("tt1", "Star Wars"), summary("tt2", "Empire")]),
        vec![
            ("tt1", Reply::Ok(detail("tt1", "Star Wars"))),
            ("tt2", Reply::Status(503)),
        ],
    ));
    let lookup = TrailerLookup::new(api.clone(), None);
    api.observer.set(lookup.subscribe()).expect("observer set once");

    let first = lookup.search("star wars", None).await.expect("first");
    assert_eq!(ids(&first.details), vec!["tt1"]);
    assert!(first.error);

    let second = lookup.search("empire", None).await.expect("second");
    assert_eq!(ids(&second.details), vec!["tt1"]);
    assert_eq!(second.query, "empire");

    let observed = api.observed.lock().unwrap().clone();
    assert_eq!(observed.len(), 4);
    // First detail call of the second lookup sees a clean slate.
    assert_eq!(observed[2].imdb_id, "tt1");
    assert_eq!(observed[2].visible_details, 0);
    assert!(!observed[2].error);
}

#[tokio::test]
async fn untitled_or_trailerless_records_are_not_stored() {
    let mut untitled = detail("tt2", "");
    untitled.title.clear();
    let mut no_trailer = detail("tt3", "Jedi");
    no_trailer.trailer_link.clear();
    no_trailer.trailer_embed_link.clear();

    let api = Arc::new(FakeApi::new(
        three_hits(),
        vec![
            ("tt1", Reply::Ok(detail("tt1", "Star Wars"))),
            ("tt2", Reply::Ok(untitled)),
            ("tt3", Reply::Ok(no_trailer)),
        ],
    ));
    let lookup = TrailerLookup::new(api, None);

    let state = lookup.search("star wars", None).await.expect("search runs");

    assert_eq!(ids(&state.details), vec!["tt1"]);
    assert_eq!(state.displayable().len(), state.details.len());
    assert_eq!(state.summaries.len(), 3);
    assert!(!state.error);
    let json = serde_json::to_value(&state).expect("state serializes");
    assert_eq!(json["details"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn search_result_without_id_is_skipped() {
    let api = Arc::new(FakeApi::new(
        Reply::Ok(vec![
            summary("tt1", "Star Wars"),
            summary(" ", "Star Wars Bootleg"),
            summary("tt3", "Return of the Jedi"),
        ]),
        vec![
            ("tt1", Reply::Ok(detail("tt1", "Star Wars"))),
            ("tt3", Reply::Ok(detail("tt3", "Return of the Jedi"))),
        ],
    ));
    let lookup = TrailerLookup::new(api.clone(), None);

    let state = lookup.search("star wars", None).await.expect("search runs");

    assert_eq!(ids(&state.details), vec!["tt1", "tt3"]);
    assert!(state.error);
    assert_eq!(state.notice.as_deref(), Some(DETAIL_FAILED_NOTICE));
    assert_eq!(
        api.calls(),
        vec!["search:star wars:-", "detail:tt1:-", "detail:tt3:-"]
    );
}

#[tokio::test]
async fn detail_without_id_inherits_summary_id() {
    let mut anonymous = detail("", "Star Wars");
    anonymous.imdbid.clear();
    let api = Arc::new(FakeApi::new(
        Reply::Ok(vec![summary("tt1", "Star Wars")]),
        vec![("tt1", Reply::Ok(anonymous))],
    ));
    let lookup = TrailerLookup::new(api, None);

    let state = lookup.search("star wars", None).await.expect("search runs");
    assert_eq!(ids(&state.details), vec!["tt1"]);
}

#[tokio::test]
async fn lag_is_forwarded_only_when_enabled() {
    let hits = Reply::Ok(vec![summary("tt1", "Star Wars")]);
    let details = || vec![("tt1", Reply::Ok(detail("tt1", "Star Wars")))];

    let api = Arc::new(FakeApi::new(hits.clone(), details()));
    let lookup = TrailerLookup::new(api.clone(), NetworkLag::parse("0.5"));
    assert!(lookup.lag_enabled());
    lookup.search("star wars", None).await.expect("default lag");
    lookup.search("star wars", Some("2")).await.expect("override lag");
    lookup.search("star wars", Some(" ")).await.expect("blank override");
    assert_eq!(
        api.calls(),
        vec![
            "search:star wars:0.5",
            "detail:tt1:0.5",
            "search:star wars:2",
            "detail:tt1:2",
            "search:star wars:0.5",
            "detail:tt1:0.5",
        ]
    );

    assert_eq!(
        lookup.search("star wars", Some("fast")).await,
        Err(LookupError::InvalidLag("fast".to_string()))
    );
    assert_eq!(api.calls().len(), 6);

    let api_off = Arc::new(FakeApi::new(hits, details()));
    let lookup_off = TrailerLookup::new(api_off.clone(), None);
    lookup_off
        .search("star wars", Some("3"))
        .await
        .expect("lag ignored");
    assert_eq!(api_off.calls(), vec!["search:star wars:-", "detail:tt1:-"]);
}

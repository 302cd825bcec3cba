use crate::config::{ApiVariant, Config};
use crate::lookup::{LookupError, TrailerLookup};
use crate::render::{self, PageOptions};
use crate::trailer_api::{HttpTrailerClient, TrailerApi};
use anyhow::{Context, Result};
use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const MAX_FORM_BYTES: usize = 16 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn TrailerApi>,
    pub config: Arc<Config>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub network_lag: Option<String>,
}

pub async fn run_server(config: Config) -> Result<()> {
    let api: Arc<dyn TrailerApi> = Arc::new(HttpTrailerClient::new(&config)?);
    info!(
        "Using trailer API at {} ({:?}, search {:?}, detail {:?}, simulated lag {})",
        config.search_url(),
        config.variant,
        config.search_method,
        config.detail_method,
        config
            .simulated_lag
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "off".to_string())
    );

    let addr = config.addr;
    let state = AppState {
        api,
        config: Arc::new(config),
    };
    let app = build_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(search_form).post(submit_search))
        .route("/api/search", get(api_search))
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

fn page_options(config: &Config, lag: Option<&str>) -> PageOptions {
    PageOptions {
        mock: config.variant == ApiVariant::Mock,
        lag: config.simulated_lag.as_ref().map(|default| {
            lag.filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| default.to_string())
        }),
    }
}

fn rejection_status(err: &LookupError) -> StatusCode {
    match err {
        LookupError::EmptyQuery | LookupError::InvalidLag(_) => StatusCode::BAD_REQUEST,
        LookupError::Busy => StatusCode::CONFLICT,
    }
}

async fn search_form(State(state): State<AppState>) -> Html<String> {
    Html(render::search_page(
        &page_options(&state.config, None),
        "",
        None,
        None,
    ))
}

async fn submit_search(State(state): State<AppState>, Form(form): Form<SearchForm>) -> Response {
    let query = form.title.unwrap_or_default();
    let options = page_options(&state.config, form.network_lag.as_deref());

    let lookup = TrailerLookup::new(state.api.clone(), state.config.simulated_lag.clone());
    match lookup.search(&query, form.network_lag.as_deref()).await {
        Ok(result) => Html(render::search_page(&options, &result.query, Some(&result), None))
            .into_response(),
        Err(e) => {
            warn!("Rejected search form: {}", e);
            (
                rejection_status(&e),
                Html(render::search_page(&options, &query, None, Some(&e.to_string()))),
            )
                .into_response()
        }
    }
}

async fn api_search(State(state): State<AppState>, Query(params): Query<SearchForm>) -> Response {
    let query = params.title.unwrap_or_default();
    let lookup = TrailerLookup::new(state.api.clone(), state.config.simulated_lag.clone());
    match lookup.search(&query, params.network_lag.as_deref()).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => (
            rejection_status(&e),
            Json(json!({ "detail": e.to_string() })),
        )
            .into_response(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}

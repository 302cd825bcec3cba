//! Run one trailer lookup from the terminal and print cards as they arrive.
//! Usage:
//!   cargo run --bin trailer_probe -- "<title>" [network_lag]
//! Reads the same TRAILER_* variables as the server (.env supported).

use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use trailerlink::config::Config;
use trailerlink::lookup::TrailerLookup;
use trailerlink::trailer_api::{HttpTrailerClient, TrailerApi};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let mut args = env::args().skip(1);
    let title = args
        .next()
        .ok_or_else(|| anyhow!("usage: trailer_probe <title> [network_lag]"))?;
    let lag = args.next();

    let config = Config::from_env()?;
    let api: Arc<dyn TrailerApi> = Arc::new(HttpTrailerClient::new(&config)?);
    let lookup = TrailerLookup::new(api, config.simulated_lag.clone());

    let mut rx = lookup.subscribe();
    let printer = tokio::spawn(async move {
        let mut shown = 0usize;
        let mut announced = false;
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if !announced && state.loading && !state.summaries.is_empty() {
                println!("Loading {} movies...", state.summaries.len());
                announced = true;
            }
            for movie in state.details.iter().skip(shown) {
                println!(
                    "{} ({}) [{}] {}",
                    movie.title,
                    movie.year,
                    movie.imdbid,
                    movie.watch_link().unwrap_or_default()
                );
            }
            shown = state.details.len();
        }
    });

    let result = lookup.search(&title, lag.as_deref()).await;
    drop(lookup);
    printer.await.context("Progress printer task failed")?;

    let state = result?;
    if state.error {
        println!(
            "finished with errors: {}",
            state.notice.as_deref().unwrap_or("unknown")
        );
    }
    println!(
        "{} of {} movies have a trailer",
        state.displayable().len(),
        state.summaries.len()
    );
    Ok(())
}

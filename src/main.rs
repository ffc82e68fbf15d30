use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod dashboard;
mod models;
mod store;

use api::{HttpGateway, PredictionApi, TeamHistoryCache};
use config::Config;
use dashboard::AppState;
use store::{GameListStore, ResultsStore, SelectionController};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Build the backend gateway
    let gateway: Arc<dyn PredictionApi> = Arc::new(HttpGateway::new(
        &config.api_base_url,
        Duration::from_secs(config.request_timeout_secs),
    )?);
    info!("Prediction backend: {}", config.api_base_url);

    // Stores and the history cache, shared between the refresh loop and the
    // dashboard handlers
    let games = Arc::new(GameListStore::new(
        gateway.clone(),
        !config.as_received_order,
    ));
    let results = Arc::new(ResultsStore::new(gateway.clone()));
    let cache = Arc::new(TeamHistoryCache::new(gateway.clone()));
    let selection = Arc::new(SelectionController::new(cache.clone()));

    // Background refresh: the first tick fires immediately (initial load),
    // then every interval. After each slate load the history cache is warmed
    // for every team playing today.
    {
        let games = games.clone();
        let results = results.clone();
        let cache = cache.clone();
        let warm = !config.no_warm_history;
        let interval = Duration::from_secs(config.refresh_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tokio::join!(games.refresh(), results.refresh());
                if warm {
                    let ids = games.team_ids().await;
                    if !ids.is_empty() {
                        cache.warm(ids).await;
                        info!(
                            "History cache warmed: {} teams resolved",
                            cache.resolved_count().await
                        );
                    }
                }
            }
        });
    }

    // Serve the dashboard
    let state = AppState {
        games,
        results,
        selection,
        confidence_threshold: config.confidence_threshold,
    };
    let app = dashboard::router(state);
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::FetchError;
use crate::models::{GameResult, HistoryEntry, RawGame, ResultGame, TeamHistory, Venue};

/// Seam between the stores and the remote prediction backend. Tests swap in
/// a fake implementation; production uses [`HttpGateway`].
#[async_trait]
pub trait PredictionApi: Send + Sync {
    /// Today's slate, in the order the backend emits it.
    async fn fetch_today(&self) -> Result<Vec<RawGame>, FetchError>;

    /// Recent games for one team, newest first.
    async fn fetch_team_history(&self, team_id: &str) -> Result<TeamHistory, FetchError>;

    /// Yesterday's finalized slate.
    async fn fetch_yesterday_results(&self) -> Result<Vec<ResultGame>, FetchError>;
}

/// HTTP client for the prediction backend. Pure translation of transport
/// outcomes into [`FetchError`]; no retries at this layer.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpGateway {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify_transport(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::BackendUnavailable {
                status: status.as_u16(),
            });
        }

        resp.json::<serde_json::Value>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::InvalidPayload
            }
        })
    }

    fn classify_transport(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::NetworkFailure
        }
    }
}

#[async_trait]
impl PredictionApi for HttpGateway {
    async fn fetch_today(&self) -> Result<Vec<RawGame>, FetchError> {
        let raw = self.get_json("/predict/today").await?;
        parse_today(&raw)
    }

    async fn fetch_team_history(&self, team_id: &str) -> Result<TeamHistory, FetchError> {
        let raw = self.get_json(&format!("/team-history/{team_id}")).await?;
        parse_history(&raw)
    }

    async fn fetch_yesterday_results(&self) -> Result<Vec<ResultGame>, FetchError> {
        let raw = self.get_json("/results/yesterday").await?;
        parse_results(&raw)
    }
}

// ── Parsing helpers ────────────────────────────────────────────────────────────

/// Team ids arrive as strings from some backend builds and as bare numbers
/// from others (NBA ids are numeric); both map to the opaque string id.
fn id_string(v: &serde_json::Value) -> Option<String> {
    v.as_str()
        .map(str::to_string)
        .or_else(|| v.as_i64().map(|n| n.to_string()))
}

fn score_i32(v: &serde_json::Value) -> Option<i32> {
    v.as_i64()
        .map(|n| n as i32)
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn parse_today(raw: &serde_json::Value) -> Result<Vec<RawGame>, FetchError> {
    let rows = raw["games"].as_array().ok_or(FetchError::InvalidPayload)?;

    let games = rows
        .iter()
        .filter_map(|row| {
            let home_id = id_string(&row["home_id"])?;
            let away_id = id_string(&row["away_id"])?;
            let home_team = row["home_team"].as_str()?.to_string();
            let away_team = row["away_team"].as_str()?.to_string();
            let home_win_prob = row["home_win_prob"]
                .as_f64()
                .or_else(|| row["home_win_prob"].as_str().and_then(|s| s.parse().ok()))?;
            let game_time = row["game_time"]
                .as_str()
                .map(str::to_string)
                .filter(|s| !s.is_empty());

            Some(RawGame {
                home_id,
                away_id,
                home_team,
                away_team,
                game_time,
                home_win_prob,
            })
        })
        .collect();

    Ok(games)
}

fn parse_history(raw: &serde_json::Value) -> Result<TeamHistory, FetchError> {
    let rows = raw["history"].as_array().ok_or(FetchError::InvalidPayload)?;

    let entries = rows
        .iter()
        .filter_map(|row| {
            let date = row["date"].as_str()?.to_string();
            let opponent = row["opponent"].as_str()?.to_string();
            let result = match row["wl"].as_str().or_else(|| row["result"].as_str())? {
                "W" | "w" | "win" => GameResult::Win,
                "L" | "l" | "loss" => GameResult::Loss,
                other => {
                    debug!("Skipping history row with result '{}'", other);
                    return None;
                }
            };
            let score = row["score"].as_str().unwrap_or("").to_string();
            let (venue, opponent) = parse_venue(row["location"].as_str(), opponent);

            Some(HistoryEntry {
                date,
                opponent,
                venue,
                result,
                score,
            })
        })
        .collect();

    Ok(entries)
}

/// Resolve the home/away marker. An explicit `location` field wins; otherwise
/// NBA-style opponent prefixes ("@ BOS" away, "vs. BOS" home) are recognized
/// and stripped from the display name.
fn parse_venue(location: Option<&str>, opponent: String) -> (Venue, String) {
    if let Some(loc) = location {
        let venue = match loc.to_lowercase().as_str() {
            "away" | "@" => Venue::Away,
            _ => Venue::Home,
        };
        return (venue, opponent);
    }

    if let Some(stripped) = opponent.strip_prefix("@ ").or_else(|| opponent.strip_prefix('@')) {
        return (Venue::Away, stripped.trim_start().to_string());
    }
    if let Some(stripped) = opponent.strip_prefix("vs. ").or_else(|| opponent.strip_prefix("vs ")) {
        return (Venue::Home, stripped.to_string());
    }
    (Venue::Home, opponent)
}

fn parse_results(raw: &serde_json::Value) -> Result<Vec<ResultGame>, FetchError> {
    let rows = raw["results"].as_array().ok_or(FetchError::InvalidPayload)?;

    let results = rows
        .iter()
        .filter_map(|row| {
            Some(ResultGame {
                home_id: id_string(&row["home_id"])?,
                away_id: id_string(&row["away_id"])?,
                home_team: row["home_team"].as_str()?.to_string(),
                away_team: row["away_team"].as_str()?.to_string(),
                home_score: score_i32(&row["home_score"])?,
                away_score: score_i32(&row["away_score"])?,
            })
        })
        .collect();

    Ok(results)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::models::{Game, Outcome, ResultGame};
use crate::store::{GameListStore, ResultsStore, SelectionController};

#[derive(Clone)]
pub struct AppState {
    pub games: Arc<GameListStore>,
    pub results: Arc<ResultsStore>,
    pub selection: Arc<SelectionController>,
    pub confidence_threshold: f64,
}

/// Build the Axum router for the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/games", get(games_handler))
        .route("/api/results", get(results_handler))
        .route("/api/selection", get(selection_handler))
        .route("/api/select/:home_id", post(select_handler))
        .route("/api/close", post(close_handler))
        .route("/api/refresh", post(refresh_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// One slate game plus the fields the cards derive from it.
#[derive(Serialize)]
struct GameView {
    #[serde(flatten)]
    game: Game,
    favorite_team: String,
    /// Favored side's win chance as a percentage, for display
    favorite_win_pct: f64,
    high_confidence: bool,
}

#[derive(Serialize)]
struct GamesView {
    loading: bool,
    loaded: bool,
    error: Option<String>,
    last_updated: Option<chrono::DateTime<chrono::Utc>>,
    games: Vec<GameView>,
}

#[derive(Serialize)]
struct ResultView {
    #[serde(flatten)]
    result: ResultGame,
    outcome: Outcome,
    winner: Option<String>,
}

#[derive(Serialize)]
struct ResultsView {
    loading: bool,
    loaded: bool,
    error: Option<String>,
    results: Vec<ResultView>,
}

async fn index_handler() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

/// GET /api/games
async fn games_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.games.snapshot().await;
    let threshold = state.confidence_threshold;
    let games = snap
        .games
        .into_iter()
        .map(|game| GameView {
            favorite_team: game.favorite_team().to_string(),
            favorite_win_pct: game.favorite_win_prob() * 100.0,
            high_confidence: game.is_high_confidence(threshold),
            game,
        })
        .collect();
    Json(GamesView {
        loading: snap.loading,
        loaded: snap.loaded,
        error: snap.error,
        last_updated: snap.last_updated,
        games,
    })
}

/// GET /api/results
async fn results_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.results.snapshot().await;
    let results = snap
        .results
        .into_iter()
        .map(|result| ResultView {
            outcome: result.outcome(),
            winner: result.winner().map(str::to_string),
            result,
        })
        .collect();
    Json(ResultsView {
        loading: snap.loading,
        loaded: snap.loaded,
        error: snap.error,
        results,
    })
}

/// GET /api/selection
async fn selection_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.selection.state().await)
}

/// POST /api/select/{home_id}: open the matchup hosted by this team.
async fn select_handler(
    State(state): State<Arc<AppState>>,
    Path(home_id): Path<String>,
) -> StatusCode {
    match state.games.find_by_home_id(&home_id).await {
        Some(game) => {
            state.selection.open(game).await;
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// POST /api/close
async fn close_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.selection.close().await;
    StatusCode::NO_CONTENT
}

/// POST /api/refresh: reload both slates.
async fn refresh_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    tokio::join!(state.games.refresh(), state.results.refresh());
    StatusCode::NO_CONTENT
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Courtside NBA Predictions</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --accent: #6c63ff;
    --green: #00c896;
    --red: #ff4f6a;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: baseline; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  #today { color: var(--muted); font-size: .85rem; }
  .refresh-btn { margin-left: auto; background: none; border: 1px solid var(--border); color: var(--muted); padding: .3rem .8rem; border-radius: 6px; cursor: pointer; font-size: .8rem; }
  .refresh-btn:hover { border-color: var(--accent); color: var(--accent); }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .banner { background: rgba(255,79,106,.12); border: 1px solid var(--red); color: var(--red); padding: .7rem 1rem; border-radius: 8px; font-size: .88rem; display: none; }
  .games-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; }
  .game-card { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1rem; cursor: pointer; }
  .game-card:hover { border-color: var(--accent); }
  .card-top { display: flex; justify-content: space-between; margin-bottom: .6rem; }
  .time-badge { color: var(--muted); font-size: .75rem; }
  .conf-badge { background: rgba(0,200,150,.15); color: var(--green); font-size: .65rem; font-weight: 700; padding: .15rem .5rem; border-radius: 20px; text-transform: uppercase; }
  .matchup { display: flex; align-items: center; justify-content: space-between; gap: .5rem; margin-bottom: .7rem; }
  .team { font-size: .95rem; font-weight: 600; }
  .team small { display: block; color: var(--muted); font-weight: 400; font-size: .7rem; text-transform: uppercase; }
  .vs { color: var(--muted); font-size: .75rem; }
  .prob-bg { background: var(--border); border-radius: 4px; height: 6px; overflow: hidden; margin-bottom: .7rem; }
  .prob-fill { background: var(--accent); height: 100%; }
  .prediction { text-align: center; }
  .prediction .label { color: var(--muted); font-size: .7rem; text-transform: uppercase; letter-spacing: .06em; }
  .prediction .winner { font-size: 1.05rem; font-weight: 700; }
  .prediction .pct { color: var(--accent); font-size: .85rem; }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .6rem 1rem; text-align: left; font-size: .72rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .55rem 1rem; font-size: .85rem; border-bottom: 1px solid #1e2130; }
  tr:last-child td { border-bottom: none; }
  .win { color: var(--green); font-weight: 700; }
  .loss { color: var(--red); font-weight: 700; }
  .tie { color: var(--muted); font-weight: 700; }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
  .modal-overlay { position: fixed; inset: 0; background: rgba(0,0,0,.6); display: none; align-items: center; justify-content: center; }
  .modal { background: var(--card); border: 1px solid var(--border); border-radius: 12px; padding: 1.5rem; width: min(760px, 92vw); max-height: 85vh; overflow-y: auto; }
  .modal h2 { font-size: 1.1rem; margin-bottom: .2rem; }
  .modal .sub { color: var(--muted); font-size: .8rem; margin-bottom: 1rem; }
  .history-split { display: grid; grid-template-columns: 1fr 1fr; gap: 1rem; }
  .history-col h4 { margin-bottom: .5rem; font-size: .9rem; }
  .close-btn { margin-top: 1rem; background: var(--accent); color: #fff; border: none; padding: .5rem 1.2rem; border-radius: 6px; cursor: pointer; }
  @media (max-width: 640px) { .history-split { grid-template-columns: 1fr; } }
</style>
</head>
<body>
<header>
  <h1>🏀 Courtside</h1>
  <span id="today"></span>
  <button class="refresh-btn" onclick="refreshAll()">↻ Refresh</button>
</header>

<main>
  <div class="banner" id="error-banner"></div>

  <div class="games-grid" id="games-grid"><div class="empty">Loading today's slate…</div></div>

  <div class="panel">
    <div class="panel-header">Yesterday's Finals</div>
    <table>
      <thead><tr><th>Home</th><th>Away</th><th>Score</th><th>Winner</th></tr></thead>
      <tbody id="results-tbody"><tr><td colspan="4" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>
</main>

<div class="modal-overlay" id="modal-overlay" onclick="closeModal()">
  <div class="modal" onclick="event.stopPropagation()">
    <h2 id="modal-title">Recent Performance</h2>
    <p class="sub">Last games, newest first</p>
    <div id="modal-body"><div class="empty">Loading recent games…</div></div>
    <button class="close-btn" onclick="closeModal()">Close</button>
  </div>
</div>

<script>
const esc = s => String(s).replace(/[&<>"']/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}[c]));
let selectionTimer = null;

document.getElementById('today').textContent = new Date().toLocaleDateString('en-US',
  { weekday: 'long', month: 'long', day: 'numeric', year: 'numeric' });

async function loadGames() {
  const r = await fetch('/api/games');
  if (!r.ok) return;
  const v = await r.json();
  const banner = document.getElementById('error-banner');
  if (v.error) { banner.textContent = v.error; banner.style.display = 'block'; }
  else { banner.style.display = 'none'; }

  const grid = document.getElementById('games-grid');
  if (!v.loaded) {
    grid.innerHTML = '<div class="empty">Loading today\'s slate…</div>';
    return;
  }
  if (!v.games.length) {
    grid.innerHTML = '<div class="empty">No games today</div>';
    return;
  }
  grid.innerHTML = v.games.map(g => `
    <div class="game-card" onclick="selectGame('${esc(g.home_id)}')">
      <div class="card-top">
        <span class="time-badge">${esc(g.game_time)}</span>
        ${g.high_confidence ? '<span class="conf-badge">High Confidence</span>' : ''}
      </div>
      <div class="matchup">
        <div class="team"><small>Home</small>${esc(g.home_team)}</div>
        <div class="vs">VS</div>
        <div class="team" style="text-align:right"><small>Away</small>${esc(g.away_team)}</div>
      </div>
      <div class="prob-bg"><div class="prob-fill" style="width:${g.favorite_win_pct.toFixed(1)}%"></div></div>
      <div class="prediction">
        <div class="label">Predicted Winner</div>
        <div class="winner">${esc(g.favorite_team)}</div>
        <div class="pct">${g.favorite_win_pct.toFixed(1)}% chance</div>
      </div>
    </div>`).join('');
}

async function loadResults() {
  const r = await fetch('/api/results');
  if (!r.ok) return;
  const v = await r.json();
  const tbody = document.getElementById('results-tbody');
  if (!v.loaded) {
    tbody.innerHTML = `<tr><td colspan="4" class="empty">${v.error ? esc(v.error) : 'Loading…'}</td></tr>`;
    return;
  }
  if (!v.results.length) {
    tbody.innerHTML = '<tr><td colspan="4" class="empty">No finals yesterday</td></tr>';
    return;
  }
  tbody.innerHTML = v.results.map(g => `<tr>
    <td>${esc(g.home_team)}</td>
    <td>${esc(g.away_team)}</td>
    <td>${g.home_score}–${g.away_score}</td>
    <td class="${g.outcome === 'tie' ? 'tie' : 'win'}">${g.winner ? esc(g.winner) : 'Tie'}</td>
  </tr>`).join('');
}

function historyTable(title, entries) {
  const rows = entries.length
    ? entries.map(e => `<tr>
        <td>${esc(e.date)}</td>
        <td>${e.venue === 'away' ? '@ ' : ''}${esc(e.opponent)}</td>
        <td class="${e.result === 'win' ? 'win' : 'loss'}">${e.result === 'win' ? 'W' : 'L'}</td>
        <td style="text-align:right">${esc(e.score)}</td>
      </tr>`).join('')
    : '<tr><td colspan="4" class="empty">No games yet this season</td></tr>';
  return `<div class="history-col"><h4>${esc(title)}</h4>
    <table><thead><tr><th>Date</th><th>Opp</th><th>Res</th><th style="text-align:right">Score</th></tr></thead>
    <tbody>${rows}</tbody></table></div>`;
}

async function pollSelection() {
  const r = await fetch('/api/selection');
  if (!r.ok) return;
  const s = await r.json();
  const overlay = document.getElementById('modal-overlay');
  if (s.state !== 'open') { overlay.style.display = 'none'; return; }

  overlay.style.display = 'flex';
  document.getElementById('modal-title').textContent =
    `${s.game.home_team} vs ${s.game.away_team}`;
  const body = document.getElementById('modal-body');
  if (s.history.status === 'loading') {
    body.innerHTML = '<div class="empty">Loading recent games…</div>';
  } else if (s.history.status === 'failed') {
    body.innerHTML = `<div class="empty">${esc(s.history.message)}<br>
      <button class="close-btn" onclick="selectGame('${esc(s.game.home_id)}')">Retry</button></div>`;
  } else {
    body.innerHTML = `<div class="history-split">
      ${historyTable(s.game.home_team, s.history.home)}
      ${historyTable(s.game.away_team, s.history.away)}
    </div>`;
  }
}

async function selectGame(homeId) {
  await fetch(`/api/select/${homeId}`, { method: 'POST' });
  await pollSelection();
  if (!selectionTimer) selectionTimer = setInterval(pollSelection, 700);
}

async function closeModal() {
  await fetch('/api/close', { method: 'POST' });
  if (selectionTimer) { clearInterval(selectionTimer); selectionTimer = null; }
  document.getElementById('modal-overlay').style.display = 'none';
}

async function refreshAll() {
  await fetch('/api/refresh', { method: 'POST' });
  await Promise.all([loadGames(), loadResults()]);
}

loadGames();
loadResults();
setInterval(() => { loadGames(); loadResults(); }, 30000);
</script>
</body>
</html>"#;

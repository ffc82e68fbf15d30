//! Store for today's slate of predicted games.
//!
//! `refresh()` replaces the visible slate atomically: readers either see the
//! previous slate or the fully ingested new one, never a partial mix. A
//! failed refresh keeps the previous slate on screen and surfaces the error
//! alongside it.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::PredictionApi;
use crate::models::{Game, RawGame};

pub struct GameListStore {
    api: Arc<dyn PredictionApi>,
    /// Confidence-first ordering; off means as-received order.
    confidence_sort: bool,
    inner: RwLock<Inner>,
}

struct Inner {
    slate: Vec<Game>,
    loading: bool,
    /// At least one load has succeeded. Distinguishes "no games today" from
    /// "nothing fetched yet".
    loaded: bool,
    error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
    generation: u64,
}

/// Point-in-time copy of the store for the view layer.
#[derive(Debug, Clone, Serialize)]
pub struct GamesSnapshot {
    pub games: Vec<Game>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl GameListStore {
    pub fn new(api: Arc<dyn PredictionApi>, confidence_sort: bool) -> Self {
        GameListStore {
            api,
            confidence_sort,
            inner: RwLock::new(Inner {
                slate: Vec::new(),
                loading: false,
                loaded: false,
                error: None,
                last_updated: None,
                generation: 0,
            }),
        }
    }

    /// Re-fetch today's slate. Reentrant: a call while a load is already in
    /// flight returns immediately and lets that load finish. The generation
    /// counter discards a completion that is no longer the newest.
    pub async fn refresh(&self) {
        let generation = {
            let mut inner = self.inner.write().await;
            if inner.loading {
                return;
            }
            inner.loading = true;
            inner.generation += 1;
            inner.generation
        };

        let outcome = self.api.fetch_today().await;

        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            // Stale completion; the newer load owns the state now.
            return;
        }
        inner.loading = false;
        match outcome {
            Ok(rows) => {
                let mut slate = ingest(rows);
                if self.confidence_sort {
                    sort_by_confidence(&mut slate);
                }
                info!("Loaded {} games for today's slate", slate.len());
                inner.slate = slate;
                inner.loaded = true;
                inner.error = None;
                inner.last_updated = Some(Utc::now());
            }
            Err(e) => {
                warn!("Failed to load today's slate: {}", e);
                inner.error = Some(e.user_message());
            }
        }
    }

    pub async fn snapshot(&self) -> GamesSnapshot {
        let inner = self.inner.read().await;
        GamesSnapshot {
            games: inner.slate.clone(),
            loading: inner.loading,
            loaded: inner.loaded,
            error: inner.error.clone(),
            last_updated: inner.last_updated,
        }
    }

    /// Every team id on the current slate, home teams first per game, with
    /// duplicates removed. Used to warm the history cache.
    pub async fn team_ids(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut ids = Vec::with_capacity(inner.slate.len() * 2);
        for game in &inner.slate {
            for id in [&game.home_id, &game.away_id] {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }

    /// Look up a slate game by its home team id (unique within a daily
    /// slate, since a team hosts at most one game per day).
    pub async fn find_by_home_id(&self, home_id: &str) -> Option<Game> {
        let inner = self.inner.read().await;
        inner.slate.iter().find(|g| g.home_id == home_id).cloned()
    }
}

fn ingest(rows: Vec<RawGame>) -> Vec<Game> {
    rows.into_iter().map(Game::from_raw).collect()
}

/// Order by the favored side's win chance, highest first. The sort is stable
/// so equal-confidence games keep their as-received relative order.
fn sort_by_confidence(slate: &mut [Game]) {
    slate.sort_by(|a, b| {
        b.favorite_win_prob()
            .partial_cmp(&a.favorite_win_prob())
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FetchError;
    use crate::models::{ResultGame, TeamHistory};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::watch;

    fn raw(home: &str, away: &str, prob: f64) -> RawGame {
        RawGame {
            home_id: format!("id-{home}"),
            away_id: format!("id-{away}"),
            home_team: home.into(),
            away_team: away.into(),
            game_time: Some("7:00 pm ET".into()),
            home_win_prob: prob,
        }
    }

    /// Fake backend with a queue of scripted slate outcomes and an optional
    /// gate that holds requests open.
    struct FakeApi {
        slates: Mutex<VecDeque<Result<Vec<RawGame>, FetchError>>>,
        calls: Mutex<usize>,
        gate: Option<watch::Receiver<bool>>,
    }

    impl FakeApi {
        fn scripted(slates: Vec<Result<Vec<RawGame>, FetchError>>) -> Self {
            FakeApi {
                slates: Mutex::new(slates.into()),
                calls: Mutex::new(0),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl PredictionApi for FakeApi {
        async fn fetch_today(&self) -> Result<Vec<RawGame>, FetchError> {
            *self.calls.lock().unwrap() += 1;
            if let Some(gate) = &self.gate {
                let mut gate = gate.clone();
                while !*gate.borrow() {
                    gate.changed().await.unwrap();
                }
            }
            self.slates
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::NetworkFailure))
        }

        async fn fetch_team_history(&self, _team_id: &str) -> Result<TeamHistory, FetchError> {
            Ok(vec![])
        }

        async fn fetch_yesterday_results(&self) -> Result<Vec<ResultGame>, FetchError> {
            Ok(vec![])
        }
    }

    fn store_with(
        slates: Vec<Result<Vec<RawGame>, FetchError>>,
        confidence_sort: bool,
    ) -> GameListStore {
        GameListStore::new(Arc::new(FakeApi::scripted(slates)), confidence_sort)
    }

    #[tokio::test]
    async fn test_ingestion_normalizes_percent_probabilities() {
        let store = store_with(vec![Ok(vec![raw("Lakers", "Celtics", 63.5)])], false);
        store.refresh().await;

        let snap = store.snapshot().await;
        assert_eq!(snap.games[0].home_win_prob, 0.635);
        assert!(snap.loaded);
        assert!(snap.error.is_none());
        assert!(snap.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_confidence_sort_orders_by_favored_side() {
        // Confidences: 0.9, 0.8 (away favorite), 0.55: already descending,
        // so the as-received order survives the sort.
        let store = store_with(
            vec![Ok(vec![
                raw("Thunder", "Wizards", 0.9),
                raw("Hornets", "Nuggets", 0.2),
                raw("Knicks", "Heat", 0.55),
            ])],
            true,
        );
        store.refresh().await;

        let names: Vec<_> = store
            .snapshot()
            .await
            .games
            .iter()
            .map(|g| g.home_team.clone())
            .collect();
        assert_eq!(names, vec!["Thunder", "Hornets", "Knicks"]);
    }

    #[tokio::test]
    async fn test_confidence_sort_moves_strong_away_favorite_up() {
        let store = store_with(
            vec![Ok(vec![
                raw("Knicks", "Heat", 0.55),
                raw("Hornets", "Nuggets", 0.1),
            ])],
            true,
        );
        store.refresh().await;

        let snap = store.snapshot().await;
        assert_eq!(snap.games[0].home_team, "Hornets"); // confidence 0.9
        assert_eq!(snap.games[1].home_team, "Knicks");
    }

    #[tokio::test]
    async fn test_sort_is_stable_on_equal_confidence() {
        // 0.7 home-favored and 0.3 home-prob are both confidence 0.7.
        let store = store_with(
            vec![Ok(vec![
                raw("Bulls", "Pistons", 0.7),
                raw("Spurs", "Rockets", 0.3),
                raw("Magic", "Hawks", 0.7),
            ])],
            true,
        );
        store.refresh().await;

        let names: Vec<_> = store
            .snapshot()
            .await
            .games
            .iter()
            .map(|g| g.home_team.clone())
            .collect();
        assert_eq!(names, vec!["Bulls", "Spurs", "Magic"]);
    }

    #[tokio::test]
    async fn test_as_received_variant_keeps_source_order() {
        let store = store_with(
            vec![Ok(vec![
                raw("Knicks", "Heat", 0.55),
                raw("Thunder", "Wizards", 0.9),
            ])],
            false,
        );
        store.refresh().await;

        let snap = store.snapshot().await;
        assert_eq!(snap.games[0].home_team, "Knicks");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_slate() {
        let store = store_with(
            vec![
                Ok(vec![raw("Lakers", "Celtics", 0.6)]),
                Err(FetchError::BackendUnavailable { status: 503 }),
            ],
            false,
        );
        store.refresh().await;
        store.refresh().await;

        let snap = store.snapshot().await;
        assert_eq!(snap.games.len(), 1, "previous slate must stay visible");
        assert_eq!(snap.games[0].home_team, "Lakers");
        assert!(snap.loaded);
        let err = snap.error.expect("failure must be surfaced");
        assert!(err.contains("starting up"));
    }

    #[tokio::test]
    async fn test_successful_reload_clears_error() {
        let store = store_with(
            vec![
                Err(FetchError::NetworkFailure),
                Ok(vec![raw("Lakers", "Celtics", 0.6)]),
            ],
            false,
        );
        store.refresh().await;
        assert!(store.snapshot().await.error.is_some());

        store.refresh().await;
        let snap = store.snapshot().await;
        assert!(snap.error.is_none());
        assert_eq!(snap.games.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_is_reentrant_while_in_flight() {
        let (tx, rx) = watch::channel(false);
        let mut api = FakeApi::scripted(vec![Ok(vec![raw("Lakers", "Celtics", 0.6)])]);
        api.gate = Some(rx);
        let api = Arc::new(api);
        let store = Arc::new(GameListStore::new(
            api.clone() as Arc<dyn PredictionApi>,
            false,
        ));

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.refresh().await })
        };
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        // While the first load is in flight the store reports loading, and a
        // second refresh returns without issuing another fetch.
        assert!(store.snapshot().await.loading);
        store.refresh().await;
        assert_eq!(*api.calls.lock().unwrap(), 1);

        tx.send(true).unwrap();
        first.await.unwrap();
        let snap = store.snapshot().await;
        assert!(!snap.loading);
        assert_eq!(snap.games.len(), 1);
    }

    #[tokio::test]
    async fn test_loading_distinct_from_empty_slate() {
        let store = store_with(vec![Ok(vec![])], false);
        assert!(!store.snapshot().await.loaded, "nothing fetched yet");

        store.refresh().await;
        let snap = store.snapshot().await;
        assert!(snap.loaded, "an empty slate is a successful load");
        assert!(snap.games.is_empty());
    }

    #[tokio::test]
    async fn test_team_ids_deduplicated_in_slate_order() {
        let store = store_with(
            vec![Ok(vec![
                raw("Lakers", "Celtics", 0.6),
                raw("Suns", "Celtics", 0.4),
            ])],
            false,
        );
        store.refresh().await;

        assert_eq!(
            store.team_ids().await,
            vec!["id-Lakers", "id-Celtics", "id-Suns"]
        );
    }
}

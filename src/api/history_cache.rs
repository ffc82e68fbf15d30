//! Session-scoped cache of per-team recent-game history.
//!
//! The cache is single-flight: however many callers ask for the same team
//! while a request is in flight, exactly one network call is issued and every
//! caller shares its outcome. Failures are not cached; the next `get` for a
//! failed team issues a fresh request, so reopening a matchup is a sufficient
//! recovery path.
//!
//! Entries live for the process lifetime. The daily slate bounds the cache to
//! the teams actually playing, so there is no eviction.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use super::error::FetchError;
use super::gateway::PredictionApi;
use crate::models::TeamHistory;

type Outcome = Result<TeamHistory, FetchError>;

enum Slot {
    /// A request for this team is in flight; the receiver yields its outcome.
    InFlight(watch::Receiver<Option<Outcome>>),
    Resolved(TeamHistory),
}

pub struct TeamHistoryCache {
    api: Arc<dyn PredictionApi>,
    slots: RwLock<HashMap<String, Slot>>,
}

impl TeamHistoryCache {
    pub fn new(api: Arc<dyn PredictionApi>) -> Self {
        TeamHistoryCache {
            api,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a team's history, joining any request already in flight for the
    /// same id. Resolves immediately on a cache hit.
    pub async fn get(&self, team_id: &str) -> Outcome {
        enum Entry {
            Lead(watch::Sender<Option<Outcome>>),
            Join(watch::Receiver<Option<Outcome>>),
        }

        let entry = {
            let mut slots = self.slots.write().await;
            match slots.get(team_id) {
                Some(Slot::Resolved(history)) => return Ok(history.clone()),
                Some(Slot::InFlight(rx)) => Entry::Join(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    slots.insert(team_id.to_string(), Slot::InFlight(rx));
                    Entry::Lead(tx)
                }
            }
        };

        let tx = match entry {
            Entry::Join(rx) => return self.join_in_flight(team_id, rx).await,
            Entry::Lead(tx) => tx,
        };

        // This caller is the leader: issue the one network call and publish
        // the outcome to everyone who attached meanwhile.
        let outcome = self.api.fetch_team_history(team_id).await;
        {
            let mut slots = self.slots.write().await;
            match &outcome {
                Ok(history) => {
                    slots.insert(team_id.to_string(), Slot::Resolved(history.clone()));
                }
                // Transient: drop the slot so a later get retries.
                Err(e) => {
                    debug!("History fetch for team {} failed: {}", team_id, e);
                    slots.remove(team_id);
                }
            }
        }
        let _ = tx.send(Some(outcome.clone()));
        outcome
    }

    async fn join_in_flight(
        &self,
        team_id: &str,
        mut rx: watch::Receiver<Option<Outcome>>,
    ) -> Outcome {
        loop {
            if let Some(outcome) = rx.borrow().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Leader vanished without publishing. Clear the stale slot
                // (unless a newer request already replaced it) and report the
                // loss; the caller may retry.
                let mut slots = self.slots.write().await;
                if let Some(Slot::InFlight(cur)) = slots.get(team_id) {
                    if cur.same_channel(&rx) {
                        slots.remove(team_id);
                    }
                }
                return Err(FetchError::NetworkFailure);
            }
        }
    }

    /// Speculatively load history for every given team. Warming is an
    /// optimization: failures are logged and swallowed, and the on-demand
    /// path re-attempts through the same single-flight mechanism.
    pub async fn warm(&self, team_ids: Vec<String>) {
        let tasks = team_ids.into_iter().map(|id| async move {
            if let Err(e) = self.get(&id).await {
                warn!("History warm for team {} failed: {}", id, e);
            }
        });
        join_all(tasks).await;
    }

    /// Number of resolved entries (in-flight slots excluded).
    pub async fn resolved_count(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|s| matches!(s, Slot::Resolved(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameResult, HistoryEntry, RawGame, ResultGame, Venue};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn entry(opponent: &str) -> HistoryEntry {
        HistoryEntry {
            date: "Nov 2".into(),
            opponent: opponent.into(),
            venue: Venue::Home,
            result: GameResult::Win,
            score: "110-102".into(),
        }
    }

    /// Fake backend: counts history calls, optionally holds them at a gate,
    /// and fails the first `fail_first` calls.
    struct FakeApi {
        calls: AtomicUsize,
        fail_first: AtomicUsize,
        gate: Option<watch::Receiver<bool>>,
        history: TeamHistory,
    }

    impl FakeApi {
        fn new(history: TeamHistory) -> Self {
            FakeApi {
                calls: AtomicUsize::new(0),
                fail_first: AtomicUsize::new(0),
                gate: None,
                history,
            }
        }

        fn gated(history: TeamHistory) -> (Self, watch::Sender<bool>) {
            let (tx, rx) = watch::channel(false);
            let mut api = Self::new(history);
            api.gate = Some(rx);
            (api, tx)
        }
    }

    #[async_trait]
    impl PredictionApi for FakeApi {
        async fn fetch_today(&self) -> Result<Vec<RawGame>, FetchError> {
            Ok(vec![])
        }

        async fn fetch_team_history(&self, _team_id: &str) -> Result<TeamHistory, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let mut gate = gate.clone();
                while !*gate.borrow() {
                    gate.changed().await.unwrap();
                }
            }
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(FetchError::NetworkFailure);
            }
            Ok(self.history.clone())
        }

        async fn fetch_yesterday_results(&self) -> Result<Vec<ResultGame>, FetchError> {
            Ok(vec![])
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_single_flight_shares_one_call() {
        let (api, release) = FakeApi::gated(vec![entry("BOS")]);
        let api = Arc::new(api);
        let cache = Arc::new(TeamHistoryCache::new(api.clone() as Arc<dyn PredictionApi>));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get("LAL").await })
            })
            .collect();

        // Let all three callers attach before the backend responds.
        settle().await;
        release.send(true).unwrap();

        for h in handles {
            let history = h.await.unwrap().unwrap();
            assert_eq!(history, vec![entry("BOS")]);
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolved_entry_is_memoized() {
        let api = Arc::new(FakeApi::new(vec![entry("MIA")]));
        let cache = TeamHistoryCache::new(api.clone() as Arc<dyn PredictionApi>);

        cache.get("NYK").await.unwrap();
        cache.get("NYK").await.unwrap();
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.resolved_count().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_teams_fetch_separately() {
        let api = Arc::new(FakeApi::new(vec![]));
        let cache = TeamHistoryCache::new(api.clone() as Arc<dyn PredictionApi>);

        cache.get("LAL").await.unwrap();
        cache.get("BOS").await.unwrap();
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let api = Arc::new(FakeApi::new(vec![entry("DEN")]));
        api.fail_first.store(1, Ordering::SeqCst);
        let cache = TeamHistoryCache::new(api.clone() as Arc<dyn PredictionApi>);

        assert_eq!(cache.get("PHX").await, Err(FetchError::NetworkFailure));
        // A later get issues a fresh call and can succeed.
        assert_eq!(cache.get("PHX").await.unwrap(), vec![entry("DEN")]);
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_share_failure() {
        let (api, release) = FakeApi::gated(vec![entry("DEN")]);
        api.fail_first.store(1, Ordering::SeqCst);
        let api = Arc::new(api);
        let cache = Arc::new(TeamHistoryCache::new(api.clone() as Arc<dyn PredictionApi>));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get("PHX").await })
            })
            .collect();

        settle().await;
        release.send(true).unwrap();

        for h in handles {
            assert_eq!(h.await.unwrap(), Err(FetchError::NetworkFailure));
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);

        // The shared failure did not poison the cache.
        assert_eq!(cache.get("PHX").await.unwrap(), vec![entry("DEN")]);
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_history_is_a_valid_cached_state() {
        let api = Arc::new(FakeApi::new(vec![]));
        let cache = TeamHistoryCache::new(api.clone() as Arc<dyn PredictionApi>);

        assert_eq!(cache.get("EXP").await.unwrap(), Vec::<HistoryEntry>::new());
        cache.get("EXP").await.unwrap();
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_warm_swallows_failures_and_fills_cache() {
        let api = Arc::new(FakeApi::new(vec![entry("GSW")]));
        api.fail_first.store(1, Ordering::SeqCst);
        let cache = TeamHistoryCache::new(api.clone() as Arc<dyn PredictionApi>);

        cache.warm(vec!["LAL".into(), "BOS".into()]).await;

        // One warm target failed silently; the other is resolved.
        assert_eq!(cache.resolved_count().await, 1);
        // The failed one retries on demand; the resolved one is a hit.
        assert!(cache.get("LAL").await.is_ok());
        assert!(cache.get("BOS").await.is_ok());
        assert_eq!(cache.resolved_count().await, 2);
    }
}

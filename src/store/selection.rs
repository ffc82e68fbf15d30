//! Which matchup is open, and the history pair being shown for it.
//!
//! Selection changes race with in-flight history fetches: the user can open
//! game B while game A's histories are still loading. Every open/close bumps
//! a generation counter, and a history pair is only applied if its generation
//! still matches; a stale completion is discarded, never shown. There is no
//! network cancellation; stale requests finish and their results stay in the
//! cache for later reuse.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::api::TeamHistoryCache;
use crate::models::{Game, TeamHistory};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HistoryStatus {
    Loading,
    Loaded { home: TeamHistory, away: TeamHistory },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelectionState {
    Closed,
    Open { game: Game, history: HistoryStatus },
}

/// Cheap to clone; clones share the same selection state.
#[derive(Clone)]
pub struct SelectionController {
    cache: Arc<TeamHistoryCache>,
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    state: SelectionState,
    generation: u64,
}

impl SelectionController {
    pub fn new(cache: Arc<TeamHistoryCache>) -> Self {
        SelectionController {
            cache,
            inner: Arc::new(RwLock::new(Inner {
                state: SelectionState::Closed,
                generation: 0,
            })),
        }
    }

    /// Open a matchup. The panel starts in `Loading` (a previous selection's
    /// history is never reused) and both teams' histories load in the
    /// background through the cache.
    pub async fn open(&self, game: Game) {
        let generation = {
            let mut inner = self.inner.write().await;
            inner.generation += 1;
            inner.state = SelectionState::Open {
                game: game.clone(),
                history: HistoryStatus::Loading,
            };
            inner.generation
        };

        let this = self.clone();
        tokio::spawn(async move { this.load_pair(generation, game).await });
    }

    async fn load_pair(&self, generation: u64, game: Game) {
        let (home, away) = tokio::join!(
            self.cache.get(&game.home_id),
            self.cache.get(&game.away_id)
        );

        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            debug!(
                "Discarding stale history pair for {} vs {}",
                game.home_team, game.away_team
            );
            return;
        }

        let history = match (home, away) {
            (Ok(home), Ok(away)) => HistoryStatus::Loaded { home, away },
            // Half a pair has no meaningful rendering; the cache still holds
            // whichever side succeeded, so reopening retries only the failure.
            (Err(e), _) | (_, Err(e)) => HistoryStatus::Failed {
                message: e.user_message(),
            },
        };
        inner.state = SelectionState::Open { game, history };
    }

    pub async fn close(&self) {
        let mut inner = self.inner.write().await;
        inner.generation += 1;
        inner.state = SelectionState::Closed;
    }

    pub async fn state(&self) -> SelectionState {
        self.inner.read().await.state.clone()
    }
}

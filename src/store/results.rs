//! Store for yesterday's finalized slate. Independent of the prediction
//! slate: its own fetch, loading flag, and error state. Display order is
//! source order; finals carry no confidence concept.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::api::PredictionApi;
use crate::models::ResultGame;

pub struct ResultsStore {
    api: Arc<dyn PredictionApi>,
    inner: RwLock<Inner>,
}

struct Inner {
    results: Vec<ResultGame>,
    loading: bool,
    loaded: bool,
    error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsSnapshot {
    pub results: Vec<ResultGame>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ResultsStore {
    pub fn new(api: Arc<dyn PredictionApi>) -> Self {
        ResultsStore {
            api,
            inner: RwLock::new(Inner {
                results: Vec::new(),
                loading: false,
                loaded: false,
                error: None,
                last_updated: None,
            }),
        }
    }

    pub async fn refresh(&self) {
        {
            let mut inner = self.inner.write().await;
            if inner.loading {
                return;
            }
            inner.loading = true;
        }

        let outcome = self.api.fetch_yesterday_results().await;

        let mut inner = self.inner.write().await;
        inner.loading = false;
        match outcome {
            Ok(results) => {
                info!("Loaded {} finals from yesterday", results.len());
                inner.results = results;
                inner.loaded = true;
                inner.error = None;
                inner.last_updated = Some(Utc::now());
            }
            Err(e) => {
                warn!("Failed to load yesterday's results: {}", e);
                inner.error = Some(e.user_message());
            }
        }
    }

    pub async fn snapshot(&self) -> ResultsSnapshot {
        let inner = self.inner.read().await;
        ResultsSnapshot {
            results: inner.results.clone(),
            loading: inner.loading,
            loaded: inner.loaded,
            error: inner.error.clone(),
            last_updated: inner.last_updated,
        }
    }
}

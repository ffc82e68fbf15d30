use serde::{Deserialize, Serialize};

/// A scheduled matchup exactly as the backend sent it. `home_win_prob` is in
/// whatever unit the producer used: some model variants emit `[0,1]`, others
/// `[0,100]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGame {
    pub home_id: String,
    pub away_id: String,
    pub home_team: String,
    pub away_team: String,
    pub game_time: Option<String>,
    pub home_win_prob: f64,
}

/// A scheduled matchup after ingestion. `home_win_prob` is always in `[0,1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Opaque team identifier, stable across requests
    pub home_id: String,
    pub away_id: String,
    pub home_team: String,
    pub away_team: String,
    /// Display string; "TBD" when the backend has no tip-off time yet
    pub game_time: String,
    /// Probability the home team wins, normalized to [0,1]
    pub home_win_prob: f64,
}

/// Convert a win probability to the internal `[0,1]` unit. Values above 1 are
/// treated as percent. The result is clamped so a malformed row cannot leak
/// an out-of-range probability into derived confidence math.
pub fn normalize_win_prob(raw: f64) -> f64 {
    let p = if raw > 1.0 { raw / 100.0 } else { raw };
    p.clamp(0.0, 1.0)
}

impl Game {
    pub fn from_raw(raw: RawGame) -> Self {
        Game {
            home_id: raw.home_id,
            away_id: raw.away_id,
            home_team: raw.home_team,
            away_team: raw.away_team,
            game_time: raw.game_time.unwrap_or_else(|| "TBD".to_string()),
            home_win_prob: normalize_win_prob(raw.home_win_prob),
        }
    }

    /// Display name of the predicted winner.
    pub fn favorite_team(&self) -> &str {
        if self.home_win_prob >= 0.5 {
            &self.home_team
        } else {
            &self.away_team
        }
    }

    /// Win probability of whichever side is favored: `max(p, 1-p)`.
    pub fn favorite_win_prob(&self) -> f64 {
        self.home_win_prob.max(1.0 - self.home_win_prob)
    }

    pub fn is_high_confidence(&self, threshold: f64) -> bool {
        self.favorite_win_prob() > threshold
    }
}

/// One past game for a team, as reported by the backend. Order within a
/// history is the backend's (reverse-chronological); we never reorder it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub opponent: String,
    pub venue: Venue,
    pub result: GameResult,
    /// Display string, e.g. "112-104"
    pub score: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Loss,
}

/// A team's recent games, newest first. An empty history is a valid state,
/// distinct from "not yet loaded".
pub type TeamHistory = Vec<HistoryEntry>;

/// A finalized matchup from yesterday's slate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultGame {
    pub home_id: String,
    pub away_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Tie,
}

impl ResultGame {
    /// Ties are reported explicitly rather than silently crediting one side.
    pub fn outcome(&self) -> Outcome {
        match self.home_score.cmp(&self.away_score) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Less => Outcome::AwayWin,
            std::cmp::Ordering::Equal => Outcome::Tie,
        }
    }

    pub fn winner(&self) -> Option<&str> {
        match self.outcome() {
            Outcome::HomeWin => Some(&self.home_team),
            Outcome::AwayWin => Some(&self.away_team),
            Outcome::Tie => None,
        }
    }
}

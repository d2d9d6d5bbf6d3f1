//! The daily challenge: ten timed rounds, identical for everyone on a given day.

use chrono::NaiveDate;
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{ChallengeUnavailableSnafu, Result};
use crate::random::{daily_seed, seeded_rng};

pub const ROUNDS: usize = 10;
pub const ZOOM_RANGE: std::ops::RangeInclusive<u32> = 100..=175;

const MAX_SCORE: f64 = 1000.0;
const MIN_SCORE: f64 = 50.0;
const SCORED_WINDOW_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub country: String,
    pub zoom: u32,
}

/// The rounds for `date`, drawn from `countries`. Empty when there is nothing to draw.
pub fn daily_rounds(countries: &[&str], date: NaiveDate) -> Vec<Round> {
    if countries.is_empty() {
        return vec![];
    }
    let mut rng = seeded_rng(daily_seed(date));
    (0..ROUNDS)
        .map(|_| Round {
            country: countries[rng.random_range(0..countries.len())].to_owned(),
            zoom: rng.random_range(ZOOM_RANGE),
        })
        .collect()
}

/// Points for a correct answer given after `time_ms`: 1000 for an instant
/// answer, falling logarithmically to 50 at five seconds and beyond.
pub fn score(time_ms: u64) -> u32 {
    if time_ms == 0 {
        return MAX_SCORE as u32;
    }
    if time_ms >= SCORED_WINDOW_MS {
        return MIN_SCORE as u32;
    }
    let t = time_ms as f64 / SCORED_WINDOW_MS as f64;
    (MAX_SCORE - (MAX_SCORE - MIN_SCORE) * (1.0 + 9.0 * t).log10()).round() as u32
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum ChallengeState {
    #[default]
    NotStarted,
    RulesShown,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResult {
    pub country: String,
    pub zoom: u32,
    pub correct: bool,
    pub time_ms: u64,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSession {
    date: NaiveDate,
    rounds: Vec<Round>,
    state: ChallengeState,
    results: Vec<ChallengeResult>,
}

impl ChallengeSession {
    pub fn new(countries: &[&str], date: NaiveDate) -> Self {
        Self {
            date,
            rounds: daily_rounds(countries, date),
            state: ChallengeState::NotStarted,
            results: vec![],
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn results(&self) -> &[ChallengeResult] {
        &self.results
    }

    pub fn show_rules(&mut self) {
        if self.state == ChallengeState::NotStarted {
            self.state = ChallengeState::RulesShown;
        }
    }

    /// Starts (or restarts) the rounds. A completed session cannot be started again.
    pub fn start(&mut self) -> Result<()> {
        ensure!(
            self.state != ChallengeState::Completed && !self.rounds.is_empty(),
            ChallengeUnavailableSnafu { date: self.date }
        );
        self.state = ChallengeState::InProgress;
        self.results.clear();
        Ok(())
    }

    /// The round awaiting an answer, if the session is running.
    pub fn current_round(&self) -> Option<&Round> {
        if self.state != ChallengeState::InProgress {
            return None;
        }
        self.rounds.get(self.results.len())
    }

    /// Records the answer to the current round. Ignored unless the session is
    /// in progress.
    pub fn record(&mut self, correct: bool, time_ms: u64) -> Option<&ChallengeResult> {
        let round = self.current_round()?.clone();
        self.results.push(ChallengeResult {
            country: round.country,
            zoom: round.zoom,
            correct,
            time_ms,
            score: if correct { score(time_ms) } else { 0 },
        });
        if self.results.len() == self.rounds.len() {
            self.state = ChallengeState::Completed;
            info!(
                "daily challenge {} completed with {} points",
                self.date,
                self.total_score()
            );
        }
        self.results.last()
    }

    pub fn total_score(&self) -> u32 {
        self.results.iter().map(|r| r.score).sum()
    }

    pub fn total_time_ms(&self) -> u64 {
        self.results.iter().map(|r| r.time_ms).sum()
    }
}

//! Turns a finished attempt into updated progress cards.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

use crate::card::{GoalCard, Leveling, ProgressCard};
use crate::config::{EngineConfig, IntervalPolicy};
use crate::content::ContentGraph;
use crate::error::{DrillError, Result};
use crate::fsrs::Fsrs;
use crate::scheduler::{Grade, SchedulerAdapter};
use crate::store::CardStore;
use crate::telemetry::{
    ItemKind, LearningEvent, NullSink, ProgressChanged, TelemetryEvent, TelemetrySink,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, IntoStaticStr,
)]
pub enum Outcome {
    /// Correct on the first click.
    FirstTry,
    /// Correct after one miss.
    Retry,
    Failed,
}

impl Outcome {
    pub fn from_attempts(attempts: u32) -> Result<Self> {
        match attempts {
            0 => Err(DrillError::InvalidAttempts),
            1 => Ok(Outcome::FirstTry),
            2 => Ok(Outcome::Retry),
            _ => Ok(Outcome::Failed),
        }
    }

    pub fn is_correct(self) -> bool {
        self != Outcome::Failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum LevelChange {
    Up,
    Down,
    Unchanged,
}

impl Leveling {
    pub const FAILS_PER_LEVEL_DOWN: u32 = 3;

    /// Clean answers in a row needed to leave `level`.
    pub fn required_win_streak(level: u32) -> u32 {
        match level {
            0..=2 => 1,
            3..=5 => 2,
            _ => 3,
        }
    }

    pub fn apply(&mut self, outcome: Outcome) -> LevelChange {
        match outcome {
            Outcome::FirstTry => {
                self.win_streak += 1;
                self.fail_streak = 0;
                if self.win_streak >= Self::required_win_streak(self.level) {
                    self.level += 1;
                    self.win_streak = 0;
                    return LevelChange::Up;
                }
                LevelChange::Unchanged
            }
            Outcome::Retry => {
                self.win_streak = 0;
                self.fail_streak += 1;
                LevelChange::Unchanged
            }
            Outcome::Failed => {
                self.win_streak = 0;
                self.fail_streak += 1;
                if self.fail_streak < Self::FAILS_PER_LEVEL_DOWN {
                    return LevelChange::Unchanged;
                }
                self.fail_streak = 0;
                if self.level == 0 {
                    return LevelChange::Unchanged;
                }
                self.level -= 1;
                LevelChange::Down
            }
        }
    }
}

impl IntervalPolicy {
    /// Final due date: a level-up is re-tested after a fixed short delay, every
    /// other answer keeps the later of the scheduler's date and its floor.
    pub fn due(
        &self,
        now: DateTime<Utc>,
        outcome: Outcome,
        level_change: LevelChange,
        scheduled: DateTime<Utc>,
    ) -> DateTime<Utc> {
        if level_change == LevelChange::Up {
            return now + self.level_up();
        }
        let floor = if outcome.is_correct() {
            now + self.correct_floor()
        } else {
            now + self.failure_floor()
        };
        scheduled.max(floor)
    }
}

/// Result of recording one attempt on a levelled card.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub card: ProgressCard,
    pub outcome: Outcome,
    pub grade: Grade,
    pub level_change: LevelChange,
}

pub struct ProgressTracker<'g> {
    graph: &'g ContentGraph,
    scheduler: SchedulerAdapter,
    intervals: IntervalPolicy,
    telemetry: Arc<dyn TelemetrySink>,
}

impl<'g> ProgressTracker<'g> {
    pub fn new(graph: &'g ContentGraph) -> Self {
        Self {
            graph,
            scheduler: SchedulerAdapter::default(),
            intervals: IntervalPolicy::default(),
            telemetry: Arc::new(NullSink),
        }
    }

    pub fn from_config(graph: &'g ContentGraph, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let fsrs = Fsrs::with_config(&config.scheduler)?;
        Ok(Self::new(graph)
            .with_scheduler(SchedulerAdapter::new(fsrs.into()))
            .with_intervals(config.intervals))
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerAdapter) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_intervals(mut self, intervals: IntervalPolicy) -> Self {
        self.intervals = intervals;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Records an attempt on an exercise. The exercise's card must already
    /// exist: selection creates it before the exercise is shown.
    pub fn record_exercise_attempt(
        &self,
        store: &mut dyn CardStore<ProgressCard>,
        exercise_id: &str,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        if self.graph.exercise(exercise_id).is_none() {
            return Err(DrillError::UnknownExercise {
                id: exercise_id.to_owned(),
            });
        }
        self.record_levelled(store, ItemKind::Exercise, exercise_id, attempts, now, false)
    }

    /// Records an attempt on a country-level card, which is not part of the
    /// content graph. Like exercise cards, it must already exist.
    pub fn record_item_attempt(
        &self,
        store: &mut dyn CardStore<ProgressCard>,
        item_id: &str,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        self.record_levelled(store, ItemKind::Item, item_id, attempts, now, false)
    }

    /// Records an attempt on a lesson card, creating it on the first attempt.
    pub fn record_lesson_attempt(
        &self,
        store: &mut dyn CardStore<ProgressCard>,
        lesson_id: &str,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        self.record_levelled(store, ItemKind::Item, lesson_id, attempts, now, true)
    }

    fn record_levelled(
        &self,
        store: &mut dyn CardStore<ProgressCard>,
        kind: ItemKind,
        id: &str,
        attempts: u32,
        now: DateTime<Utc>,
        create_missing: bool,
    ) -> Result<Review> {
        let outcome = Outcome::from_attempts(attempts)?;
        let mut card = match store.get(id)? {
            Some(card) => card,
            None if create_missing => ProgressCard::new(id, now),
            None => return Err(DrillError::CardNotFound { id: id.to_owned() }),
        };

        let level_change = card.leveling.apply(outcome);
        let (grade, scheduled) = self.scheduler.review(&card.card, now, attempts)?;
        card.card = scheduled;
        card.card.due = self.intervals.due(now, outcome, level_change, card.card.due);
        debug!(
            "{id}: {outcome}, level {} ({level_change}), due {}",
            card.leveling.level, card.card.due
        );
        store.put(card.clone())?;

        self.notify(ProgressChanged {
            kind,
            id: id.to_owned(),
            outcome,
            grade,
            level_change,
            level: Some(card.leveling.level),
            due: card.card.due,
            at: now,
        });
        Ok(Review {
            card,
            outcome,
            grade,
            level_change,
        })
    }

    /// Records an attempt against a learning goal, creating its card on the
    /// first attempt.
    pub fn record_goal_attempt(
        &self,
        goals: &mut dyn CardStore<GoalCard>,
        goal_name: &str,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<GoalCard> {
        if self.graph.goal(goal_name).is_none() {
            return Err(DrillError::UnknownGoal {
                name: goal_name.to_owned(),
            });
        }
        let outcome = Outcome::from_attempts(attempts)?;
        let mut card = goals
            .get(goal_name)?
            .unwrap_or_else(|| GoalCard::new(goal_name, now));

        let correct = outcome.is_correct();
        card.streak = if correct { card.streak + 1 } else { 0 };
        card.last_repetition_correct = Some(correct);
        if correct {
            card.correct_repetition_count += 1;
        }
        let (grade, scheduled) = self.scheduler.review(&card.card, now, attempts)?;
        card.card = scheduled;
        card.card.due = self
            .intervals
            .due(now, outcome, LevelChange::Unchanged, card.card.due);
        goals.put(card.clone())?;

        self.notify(ProgressChanged {
            kind: ItemKind::Goal,
            id: goal_name.to_owned(),
            outcome,
            grade,
            level_change: LevelChange::Unchanged,
            level: None,
            due: card.card.due,
            at: now,
        });
        Ok(card)
    }

    /// Records a complete learning event: the exercise card, the goal card when
    /// the event names one, and the raw event for telemetry.
    pub fn record_attempt(
        &self,
        exercises: &mut dyn CardStore<ProgressCard>,
        goals: &mut dyn CardStore<GoalCard>,
        event: &LearningEvent,
    ) -> Result<Review> {
        // An unknown goal must not leave the exercise card half recorded.
        if let Some(goal) = &event.learning_goal {
            if self.graph.goal(goal).is_none() {
                return Err(DrillError::UnknownGoal { name: goal.clone() });
            }
        }
        let review = self.record_exercise_attempt(
            exercises,
            &event.exercise_id,
            event.clicks_needed,
            event.timestamp,
        )?;
        if let Some(goal) = &event.learning_goal {
            self.record_goal_attempt(goals, goal, event.clicks_needed, event.timestamp)?;
        }
        self.telemetry
            .record(TelemetryEvent::Learning(event.clone()));
        Ok(review)
    }

    fn notify(&self, change: ProgressChanged) {
        self.telemetry.record(TelemetryEvent::ProgressChanged(change));
    }
}

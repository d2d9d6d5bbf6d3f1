//! Prerequisite gating between learning goals.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::card::StoredCard;
use crate::content::{ContentGraph, LearningGoal};
use crate::error::Result;
use crate::store::CardStore;

/// Snapshot of which items have a card and when each is due.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DueIndex {
    due: HashMap<String, DateTime<Utc>>,
}

impl DueIndex {
    pub fn load<C, S>(store: &S) -> Result<Self>
    where
        C: StoredCard,
        S: CardStore<C> + ?Sized,
    {
        Ok(Self::from_cards(&store.all()?))
    }

    pub fn from_cards<C: StoredCard>(cards: &[C]) -> Self {
        Self {
            due: cards
                .iter()
                .map(|card| (card.key().to_owned(), card.memory().due))
                .collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, id: impl Into<String>, due: DateTime<Utc>) {
        self.due.insert(id.into(), due);
    }

    pub fn has_card(&self, id: &str) -> bool {
        self.due.contains_key(id)
    }

    /// Has a card and `due <= now`.
    pub fn is_due(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.due.get(id).is_some_and(|&due| due <= now)
    }

    /// Has a card that is still inside its interval.
    pub fn is_not_due(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.due.get(id).is_some_and(|&due| due > now)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockingEvaluator<'g> {
    graph: &'g ContentGraph,
    lift_threshold: f32,
}

impl<'g> BlockingEvaluator<'g> {
    pub fn new(graph: &'g ContentGraph) -> Self {
        Self {
            graph,
            lift_threshold: 0.5,
        }
    }

    pub fn with_lift_threshold(mut self, lift_threshold: f32) -> Self {
        self.lift_threshold = lift_threshold;
        self
    }

    /// Share of `goal`'s transitive exercises that are learned and not due.
    /// A goal without exercises counts as fully learned.
    pub fn lift_ratio(&self, goal: &LearningGoal, exercises: &DueIndex, now: DateTime<Utc>) -> f32 {
        let all = self.graph.descendant_exercises(goal);
        if all.is_empty() {
            return 1.0;
        }
        let learned = all.iter().filter(|e| exercises.is_not_due(&e.id, now)).count();
        learned as f32 / all.len() as f32
    }

    pub fn is_lifted(&self, goal: &LearningGoal, exercises: &DueIndex, now: DateTime<Utc>) -> bool {
        let all = self.graph.descendant_exercises(goal);
        let learned = all.iter().filter(|e| exercises.is_not_due(&e.id, now)).count();
        learned as f32 >= self.lift_threshold * all.len() as f32
    }

    /// True while any goal in `goal`'s blocked-by set is not lifted.
    pub fn is_effectively_blocked(
        &self,
        goal: &LearningGoal,
        exercises: &DueIndex,
        now: DateTime<Utc>,
    ) -> bool {
        self.graph
            .blocked_by(goal)
            .into_iter()
            .any(|blocker| !self.is_lifted(blocker, exercises, now))
    }

    /// True if `goal` or any of its ancestors is blacklisted.
    pub fn is_effectively_blacklisted<F>(&self, goal: &LearningGoal, is_blacklisted: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        self.graph
            .ancestors(goal)
            .into_iter()
            .any(|g| is_blacklisted(&g.name))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blocking::DueIndex;
use crate::card::{ProgressCard, StoredCard};
use crate::content::{ContentGraph, LearningGoal};
use crate::error::Result;
use crate::store::CardStore;

/// How a set of items splits into due, scheduled and untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningProgress {
    pub total: usize,
    pub due: usize,
    pub not_due: usize,
    pub never_learned: usize,
}

/// [`LearningProgress`] as percentages of the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressPercentages {
    pub due: f32,
    pub not_due: f32,
    pub never_learned: f32,
}

impl LearningProgress {
    pub fn from_index<'a>(
        ids: impl IntoIterator<Item = &'a str>,
        index: &DueIndex,
        now: DateTime<Utc>,
    ) -> Self {
        ids.into_iter().fold(Self::default(), |mut acc, id| {
            acc.total += 1;
            if index.is_due(id, now) {
                acc.due += 1;
            } else if index.has_card(id) {
                acc.not_due += 1;
            } else {
                acc.never_learned += 1;
            }
            acc
        })
    }

    pub fn from_store<'a, C, S>(
        ids: impl IntoIterator<Item = &'a str>,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<Self>
    where
        C: StoredCard,
        S: CardStore<C> + ?Sized,
    {
        Ok(Self::from_index(ids, &DueIndex::load(store)?, now))
    }

    /// Progress over every exercise under `goal`.
    pub fn for_goal<S>(
        graph: &ContentGraph,
        goal: &LearningGoal,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<Self>
    where
        S: CardStore<ProgressCard> + ?Sized,
    {
        let exercises = graph.descendant_exercises(goal);
        Self::from_store(exercises.iter().map(|e| e.id.as_str()), store, now)
    }

    pub fn percentages(&self) -> ProgressPercentages {
        if self.total == 0 {
            return ProgressPercentages::default();
        }
        let share = |n: usize| n as f32 / self.total as f32 * 100.0;
        ProgressPercentages {
            due: share(self.due),
            not_due: share(self.not_due),
            never_learned: share(self.never_learned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_helpers::{at, sample_graph};
    use chrono::Duration;

    #[test]
    fn counts_add_up_to_total() -> Result<()> {
        let now = at(0);
        let mut scheduled = ProgressCard::new("Italy", now);
        scheduled.card.due = now + Duration::days(2);
        let store: MemoryStore<ProgressCard> = [
            ProgressCard::new("Malta", now),
            scheduled,
            ProgressCard::new("Atlantis", now),
        ]
        .into_iter()
        .collect();

        let progress = LearningProgress::from_store(["Malta", "Italy", "France", "Spain"], &store, now)?;
        assert_eq!(
            progress,
            LearningProgress {
                total: 4,
                due: 1,
                not_due: 1,
                never_learned: 2
            }
        );
        let pct = progress.percentages();
        assert_eq!(pct.due, 25.0);
        assert_eq!(pct.never_learned, 50.0);
        Ok(())
    }

    #[test]
    fn empty_scope_has_zero_percentages() {
        let progress = LearningProgress::from_index([], &DueIndex::default(), at(0));
        assert_eq!(progress.total, 0);
        assert_eq!(progress.percentages(), ProgressPercentages::default());
    }

    #[test]
    fn goal_progress_covers_its_subtree() -> Result<()> {
        let graph = sample_graph();
        let europe = graph.goal("europe").unwrap();
        let store: MemoryStore<ProgressCard> = [ProgressCard::new("vatican-1", at(0))].into_iter().collect();
        let progress = LearningProgress::for_goal(&graph, europe, &store, at(0))?;
        assert_eq!(progress.total, 6);
        assert_eq!(progress.due, 1);
        assert_eq!(progress.never_learned, 5);
        Ok(())
    }
}

//! Decides what to present next.
//!
//! Every flow follows the same policy: something due beats something new,
//! which beats a fallback pick among items already learned. Randomness comes
//! from the injected [`Rng`], so a seeded engine always repeats its choices.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::blocking::{BlockingEvaluator, DueIndex};
use crate::card::{GoalCard, ProgressCard};
use crate::config::{EngineConfig, SelectionConfig};
use crate::content::{ContentGraph, Exercise, LearningGoal};
use crate::error::Result;
use crate::store::CardStore;

/// What counts as "the same thing" for anti-repeat purposes.
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
pub enum GroupBy {
    /// Only the exact exercise is held back.
    Item,
    /// Every exercise about the same country is held back.
    #[default]
    Country,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum Category {
    Due,
    New,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub id: String,
    pub category: Category,
}

/// A goal and the exercise chosen from its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalExercise {
    pub goal: Selection,
    pub exercise: Selection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Served {
    id: String,
    group: String,
}

struct Candidate {
    id: String,
    group: String,
}

#[derive(Debug)]
pub struct SelectionEngine<'g, R> {
    graph: &'g ContentGraph,
    rng: R,
    config: SelectionConfig,
    lift_threshold: f32,
    last_served: Option<Served>,
}

impl<'g, R: Rng> SelectionEngine<'g, R> {
    pub fn new(graph: &'g ContentGraph, rng: R) -> Self {
        Self {
            graph,
            rng,
            config: SelectionConfig::default(),
            lift_threshold: 0.5,
            last_served: None,
        }
    }

    pub fn from_config(graph: &'g ContentGraph, rng: R, config: &EngineConfig) -> Self {
        Self::new(graph, rng)
            .with_selection(config.selection)
            .with_lift_threshold(config.lift_threshold)
    }

    pub fn with_selection(mut self, config: SelectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_lift_threshold(mut self, lift_threshold: f32) -> Self {
        self.lift_threshold = lift_threshold;
        self
    }

    /// The id of the item served most recently, if any.
    pub fn last_served(&self) -> Option<&str> {
        self.last_served.as_ref().map(|s| s.id.as_str())
    }

    /// Forgets the last pick, e.g. when a new session starts.
    pub fn reset(&mut self) {
        self.last_served = None;
    }

    fn blocking(&self) -> BlockingEvaluator<'g> {
        BlockingEvaluator::new(self.graph).with_lift_threshold(self.lift_threshold)
    }

    /// Exercises under `goal`, leaving out subtrees of effectively blocked goals.
    fn reachable_exercises(
        &self,
        goal: &LearningGoal,
        index: &DueIndex,
        now: DateTime<Utc>,
    ) -> Vec<&'g Exercise> {
        let graph = self.graph;
        let blocking = self.blocking();
        graph.subtree_exercises(goal, |g| !blocking.is_effectively_blocked(g, index, now))
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.random_range(0..items.len())]
    }

    /// Picks the next exercise among `scope`. A picked new exercise gets an
    /// empty card in `store` before it is returned.
    pub fn next_exercise(
        &mut self,
        scope: &[&Exercise],
        store: &mut dyn CardStore<ProgressCard>,
        now: DateTime<Utc>,
    ) -> Result<Option<Selection>> {
        let group_by = self.config.group_by;
        let candidates = scope
            .iter()
            .map(|e| Candidate {
                id: e.id.clone(),
                group: match group_by {
                    GroupBy::Item => e.id.clone(),
                    GroupBy::Country => e.country().to_owned(),
                },
            })
            .collect();
        self.select(candidates, store, now)
    }

    /// Country- or lesson-level flow: every id is its own group.
    pub fn next_item(
        &mut self,
        ids: &[&str],
        store: &mut dyn CardStore<ProgressCard>,
        now: DateTime<Utc>,
    ) -> Result<Option<Selection>> {
        let candidates = ids
            .iter()
            .map(|&id| Candidate {
                id: id.to_owned(),
                group: id.to_owned(),
            })
            .collect();
        self.select(candidates, store, now)
    }

    fn select(
        &mut self,
        candidates: Vec<Candidate>,
        store: &mut dyn CardStore<ProgressCard>,
        now: DateTime<Utc>,
    ) -> Result<Option<Selection>> {
        if candidates.is_empty() {
            return Ok(None);
        }
        let index = DueIndex::from_cards(&store.all()?);

        let eligible = match self.last_served.as_ref() {
            Some(last) if self.config.anti_repeat => {
                let (other, same): (Vec<_>, Vec<_>) =
                    candidates.into_iter().partition(|c| c.group != last.group);
                if other.is_empty() { same } else { other }
            }
            _ => candidates,
        };

        let due = eligible
            .iter()
            .filter(|c| index.is_due(&c.id, now))
            .collect_vec();
        let new = eligible
            .iter()
            .filter(|c| !index.has_card(&c.id))
            .collect_vec();

        let (picked, category) = if !due.is_empty() {
            (*self.pick(&due), Category::Due)
        } else if !new.is_empty() {
            let picked = *self.pick(&new);
            store.put(ProgressCard::new(picked.id.as_str(), now))?;
            (picked, Category::New)
        } else {
            let last_id = self.last_served.as_ref().map(|s| s.id.as_str());
            let mut rest = eligible
                .iter()
                .filter(|c| Some(c.id.as_str()) != last_id)
                .collect_vec();
            if rest.is_empty() {
                rest = eligible.iter().collect();
            }
            (*self.pick(&rest), Category::Fallback)
        };

        debug!(
            "selected {} ({category}) from {} due, {} new, {} eligible",
            picked.id,
            due.len(),
            new.len(),
            eligible.len()
        );
        self.last_served = Some(Served {
            id: picked.id.clone(),
            group: picked.group.clone(),
        });
        Ok(Some(Selection {
            id: picked.id.clone(),
            category,
        }))
    }

    /// Picks the next learning goal. Effectively blocked and blacklisted goals
    /// are never offered, nor are goals without a reachable exercise. Due goals come first, then the most interesting
    /// goal that has never been attempted.
    pub fn next_goal(
        &mut self,
        exercises: &dyn CardStore<ProgressCard>,
        goals: &dyn CardStore<GoalCard>,
        now: DateTime<Utc>,
    ) -> Result<Option<Selection>> {
        let graph = self.graph;
        let index = DueIndex::from_cards(&exercises.all()?);
        let goal_cards: HashMap<String, GoalCard> = goals
            .all()?
            .into_iter()
            .map(|card| (card.name.clone(), card))
            .collect();
        let blocking = self.blocking();
        let is_blacklisted = |name: &str| goal_cards.get(name).is_some_and(|c| c.is_blacklisted);

        let open = graph
            .all_goals()
            .iter()
            .filter(|g| !blocking.is_effectively_blocked(g, &index, now))
            .filter(|g| !blocking.is_effectively_blacklisted(g, is_blacklisted))
            .filter(|g| !self.reachable_exercises(g, &index, now).is_empty())
            .collect_vec();

        let due = open
            .iter()
            .filter(|g| goal_cards.get(&g.name).is_some_and(|c| c.card.is_due(now)))
            .collect_vec();
        if !due.is_empty() {
            let goal = *self.pick(&due);
            debug!("selected due goal {} of {}", goal.name, due.len());
            return Ok(Some(Selection {
                id: goal.name.clone(),
                category: Category::Due,
            }));
        }

        // stable sort keeps graph order among equal interest
        let best = open
            .iter()
            .filter(|g| !goal_cards.contains_key(&g.name))
            .map(|g| (graph.effective_interest(g), g))
            .sorted_by(|(a, _), (b, _)| b.total_cmp(a))
            .next();
        Ok(best.map(|(interest, goal)| {
            debug!("selected new goal {} (interest {interest})", goal.name);
            Selection {
                id: goal.name.clone(),
                category: Category::New,
            }
        }))
    }

    /// Picks uniformly among the exercises under `goal`, never descending into
    /// an effectively blocked descendant goal. The picked exercise is given a
    /// card if it has none.
    pub fn next_exercise_for_goal(
        &mut self,
        goal: &LearningGoal,
        store: &mut dyn CardStore<ProgressCard>,
        now: DateTime<Utc>,
    ) -> Result<Option<Selection>> {
        let index = DueIndex::from_cards(&store.all()?);
        let scope = self.reachable_exercises(goal, &index, now);
        if scope.is_empty() {
            debug!("goal {} has no reachable exercises", goal.name);
            return Ok(None);
        }

        let exercise = *self.pick(&scope);
        let category = if index.is_due(&exercise.id, now) {
            Category::Due
        } else if index.has_card(&exercise.id) {
            Category::Fallback
        } else {
            store.put(ProgressCard::new(exercise.id.as_str(), now))?;
            Category::New
        };
        self.last_served = Some(Served {
            id: exercise.id.clone(),
            group: exercise.country().to_owned(),
        });
        Ok(Some(Selection {
            id: exercise.id.clone(),
            category,
        }))
    }

    /// [`Self::next_goal`] followed by [`Self::next_exercise_for_goal`].
    pub fn next_goal_exercise(
        &mut self,
        exercises: &mut dyn CardStore<ProgressCard>,
        goals: &dyn CardStore<GoalCard>,
        now: DateTime<Utc>,
    ) -> Result<Option<GoalExercise>> {
        let Some(goal) = self.next_goal(&*exercises, goals, now)? else {
            return Ok(None);
        };
        let graph = self.graph;
        let Some(node) = graph.goal(&goal.id) else {
            return Ok(None);
        };
        Ok(self
            .next_exercise_for_goal(node, exercises, now)?
            .map(|exercise| GoalExercise { goal, exercise }))
    }
}

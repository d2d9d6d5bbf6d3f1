//! The learning-content graph: learning goals, the exercises that practise them,
//! and the parent / blocked-by relations between goals.
//!
//! Nodes live in two arenas and refer to each other by index. The graph is built
//! once and never mutated; progress lives in the card stores, not here.

use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::ResultExt;

use crate::error::{InvalidContentSnafu, Result};

/// A learning-goal record as it appears in the content table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningGoalData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub exercises: Vec<String>,
    #[serde(default)]
    pub inherent_interest: Option<f32>,
    #[serde(default)]
    pub inherent_difficulty: Option<f32>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// An exercise record as it appears in the content table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseData {
    pub id: String,
    pub instruction: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// What a map exercise needs to be shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPayload {
    pub zoom: f32,
    pub country: String,
    pub pan_index: Option<u32>,
}

impl MapPayload {
    fn from_value(data: &Value) -> Option<Self> {
        Some(Self {
            zoom: data.get("zoom")?.as_f64()? as f32,
            country: data.get("country")?.as_str()?.to_owned(),
            pan_index: data
                .get("panIndex")
                .and_then(Value::as_u64)
                .and_then(|i| u32::try_from(i).ok()),
        })
    }
}

/// Content tables come either as arrays of records or as objects keyed by name.
#[derive(Deserialize)]
#[serde(untagged)]
enum Table<T> {
    List(Vec<T>),
    Keyed(BTreeMap<String, T>),
}

impl<T> Table<T> {
    fn into_records(self) -> Vec<T> {
        match self {
            Table::List(records) => records,
            Table::Keyed(records) => records.into_values().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearningGoal {
    idx: usize,
    pub name: String,
    pub description: Option<String>,
    pub inherent_interest: f32,
    pub inherent_difficulty: f32,
    pub data: Map<String, Value>,
    parents: Vec<usize>,
    children: Vec<usize>,
    blocked_by: Vec<usize>,
    exercises: Vec<usize>,
}

impl LearningGoal {
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub instruction: String,
    pub payload: MapPayload,
    parents: Vec<usize>,
}

impl Exercise {
    pub fn country(&self) -> &str {
        &self.payload.country
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentGraph {
    goals: Vec<LearningGoal>,
    exercises: Vec<Exercise>,
    goal_index: HashMap<String, usize>,
    exercise_index: HashMap<String, usize>,
}

impl ContentGraph {
    /// Builds the graph in two passes: nodes first, then relations resolved by
    /// name. References that do not resolve are dropped with a warning.
    pub fn new(goal_records: Vec<LearningGoalData>, exercise_records: Vec<ExerciseData>) -> Self {
        let mut graph = Self::default();

        for record in exercise_records {
            if graph.exercise_index.contains_key(&record.id) {
                warn!("duplicate exercise {}, keeping the first", record.id);
                continue;
            }
            let Some(payload) = record.data.as_ref().and_then(MapPayload::from_value) else {
                warn!("exercise {} has no usable map payload, skipped", record.id);
                continue;
            };
            let idx = graph.exercises.len();
            graph.exercise_index.insert(record.id.clone(), idx);
            graph.exercises.push(Exercise {
                id: record.id,
                instruction: record.instruction,
                payload,
                parents: vec![],
            });
        }

        let mut kept = Vec::with_capacity(goal_records.len());
        for record in goal_records {
            if graph.goal_index.contains_key(&record.name) {
                warn!("duplicate learning goal {}, keeping the first", record.name);
                continue;
            }
            let idx = graph.goals.len();
            graph.goal_index.insert(record.name.clone(), idx);
            graph.goals.push(LearningGoal {
                idx,
                name: record.name.clone(),
                description: record.description.clone(),
                inherent_interest: record.inherent_interest.unwrap_or(0.0),
                inherent_difficulty: record.inherent_difficulty.unwrap_or(0.0),
                data: record.data.clone().unwrap_or_default(),
                parents: vec![],
                children: vec![],
                blocked_by: vec![],
                exercises: vec![],
            });
            kept.push(record);
        }

        for (idx, record) in kept.iter().enumerate() {
            let parents = graph.resolve_goals(&record.name, "parent", &record.parents);
            let blocked_by = graph.resolve_goals(&record.name, "blocker", &record.blocked_by);
            let exercises = record
                .exercises
                .iter()
                .filter_map(|id| {
                    let found = graph.exercise_index.get(id).copied();
                    if found.is_none() {
                        warn!("learning goal {}: unknown exercise {id}, dropped", record.name);
                    }
                    found
                })
                .unique()
                .collect_vec();

            for &parent in &parents {
                graph.goals[parent].children.push(idx);
            }
            for &exercise in &exercises {
                graph.exercises[exercise].parents.push(idx);
            }
            let goal = &mut graph.goals[idx];
            goal.parents = parents;
            goal.blocked_by = blocked_by;
            goal.exercises = exercises;
        }

        graph
    }

    /// Parses both tables from JSON, then builds the graph.
    pub fn from_json(goals: &str, exercises: &str) -> Result<Self> {
        let goals: Table<LearningGoalData> = serde_json::from_str(goals).context(InvalidContentSnafu)?;
        let exercises: Table<ExerciseData> =
            serde_json::from_str(exercises).context(InvalidContentSnafu)?;
        Ok(Self::new(goals.into_records(), exercises.into_records()))
    }

    fn resolve_goals(&self, owner: &str, relation: &str, names: &[String]) -> Vec<usize> {
        names
            .iter()
            .filter_map(|name| {
                let found = self.goal_index.get(name).copied();
                if found.is_none() {
                    warn!("learning goal {owner}: unknown {relation} {name}, dropped");
                }
                found
            })
            .unique()
            .collect()
    }

    pub fn all_goals(&self) -> &[LearningGoal] {
        &self.goals
    }

    pub fn all_exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn root_goals(&self) -> Vec<&LearningGoal> {
        self.goals.iter().filter(|g| g.is_root()).collect()
    }

    pub fn goal(&self, name: &str) -> Option<&LearningGoal> {
        self.goal_index.get(name).map(|&i| &self.goals[i])
    }

    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercise_index.get(id).map(|&i| &self.exercises[i])
    }

    fn goals_at(&self, indices: &[usize]) -> Vec<&LearningGoal> {
        indices.iter().map(|&i| &self.goals[i]).collect()
    }

    pub fn parents(&self, goal: &LearningGoal) -> Vec<&LearningGoal> {
        self.goals_at(&goal.parents)
    }

    pub fn children(&self, goal: &LearningGoal) -> Vec<&LearningGoal> {
        self.goals_at(&goal.children)
    }

    pub fn blocked_by(&self, goal: &LearningGoal) -> Vec<&LearningGoal> {
        self.goals_at(&goal.blocked_by)
    }

    /// Exercises listed directly on `goal`.
    pub fn exercises(&self, goal: &LearningGoal) -> Vec<&Exercise> {
        goal.exercises.iter().map(|&i| &self.exercises[i]).collect()
    }

    /// Goals that list `exercise`.
    pub fn exercise_parents(&self, exercise: &Exercise) -> Vec<&LearningGoal> {
        self.goals_at(&exercise.parents)
    }

    /// `goal` followed by every transitive parent, each once.
    pub fn ancestors(&self, goal: &LearningGoal) -> Vec<&LearningGoal> {
        let mut out = vec![];
        self.collect_ancestors(goal.idx, &mut HashSet::new(), &mut out);
        out.into_iter().map(|i| &self.goals[i]).collect()
    }

    fn collect_ancestors(&self, idx: usize, visited: &mut HashSet<usize>, out: &mut Vec<usize>) {
        if !visited.insert(idx) {
            return;
        }
        out.push(idx);
        for &parent in &self.goals[idx].parents {
            self.collect_ancestors(parent, visited, out);
        }
    }

    /// Every transitive child of `goal`, each once, not including `goal` itself.
    pub fn descendants(&self, goal: &LearningGoal) -> Vec<&LearningGoal> {
        let mut out = vec![];
        let mut visited = HashSet::from([goal.idx]);
        for &child in &goal.children {
            self.collect_descendants(child, &mut visited, &mut out);
        }
        out.into_iter().map(|i| &self.goals[i]).collect()
    }

    fn collect_descendants(&self, idx: usize, visited: &mut HashSet<usize>, out: &mut Vec<usize>) {
        if !visited.insert(idx) {
            return;
        }
        out.push(idx);
        for &child in &self.goals[idx].children {
            self.collect_descendants(child, visited, out);
        }
    }

    /// Exercises of `goal` and of all its descendants, each once.
    pub fn descendant_exercises(&self, goal: &LearningGoal) -> Vec<&Exercise> {
        self.subtree_exercises(goal, |_| true)
    }

    /// Like [`Self::descendant_exercises`], but never enters a descendant goal
    /// rejected by `enter`. `goal` itself is always entered.
    pub(crate) fn subtree_exercises<F>(&self, goal: &LearningGoal, mut enter: F) -> Vec<&Exercise>
    where
        F: FnMut(&LearningGoal) -> bool,
    {
        let mut visited = HashSet::new();
        let mut out = vec![];
        self.collect_exercises(goal.idx, &mut visited, &mut out, &mut enter, true);
        out.into_iter()
            .unique()
            .map(|i| &self.exercises[i])
            .collect()
    }

    fn collect_exercises<F>(
        &self,
        idx: usize,
        visited: &mut HashSet<usize>,
        out: &mut Vec<usize>,
        enter: &mut F,
        is_start: bool,
    ) where
        F: FnMut(&LearningGoal) -> bool,
    {
        if !visited.insert(idx) {
            return;
        }
        let goal = &self.goals[idx];
        if !is_start && !enter(goal) {
            return;
        }
        out.extend(&goal.exercises);
        for &child in &goal.children {
            self.collect_exercises(child, visited, out, enter, false);
        }
    }

    /// Own interest plus every ancestor's, once per path to that ancestor.
    pub fn effective_interest(&self, goal: &LearningGoal) -> f32 {
        self.path_sum(goal.idx, &|g: &LearningGoal| g.inherent_interest, &mut HashSet::new())
    }

    /// Own difficulty plus every ancestor's, once per path to that ancestor.
    pub fn effective_difficulty(&self, goal: &LearningGoal) -> f32 {
        self.path_sum(goal.idx, &|g: &LearningGoal| g.inherent_difficulty, &mut HashSet::new())
    }

    // `on_path` holds only the goals on the current path, so shared ancestors
    // are counted per path while cycles still terminate.
    fn path_sum(
        &self,
        idx: usize,
        weight: &dyn Fn(&LearningGoal) -> f32,
        on_path: &mut HashSet<usize>,
    ) -> f32 {
        if !on_path.insert(idx) {
            return 0.0;
        }
        let goal = &self.goals[idx];
        let sum = weight(goal)
            + goal
                .parents
                .iter()
                .map(|&p| self.path_sum(p, weight, on_path))
                .sum::<f32>();
        on_path.remove(&idx);
        sum
    }

    pub fn direct_children_count(&self, goal: &LearningGoal) -> usize {
        goal.children.len()
    }

    pub fn descendant_count(&self, goal: &LearningGoal) -> usize {
        self.descendants(goal).len()
    }

    pub fn direct_parent_count(&self, goal: &LearningGoal) -> usize {
        goal.parents.len()
    }

    pub fn ancestor_count(&self, goal: &LearningGoal) -> usize {
        self.ancestors(goal).len() - 1
    }

    pub fn direct_exercise_count(&self, goal: &LearningGoal) -> usize {
        goal.exercises.len()
    }

    pub fn descendant_exercise_count(&self, goal: &LearningGoal) -> usize {
        self.descendant_exercises(goal).len()
    }
}

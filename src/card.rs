use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

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
pub enum CardState {
    #[default]
    New,
    Learning,
    Review,
    Relearning,
}

/// Memory state of a single reviewable item, as produced by the scheduling function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// The item may be reviewed at or after this instant.
    pub due: DateTime<Utc>,
    pub stability: f32,
    pub difficulty: f32,
    pub elapsed_days: u32,
    pub scheduled_days: u32,
    pub reps: u32,
    pub lapses: u32,
    pub state: CardState,
    pub last_review: Option<DateTime<Utc>>,
}

impl Card {
    /// A card that has never been reviewed, due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            due: now,
            stability: 0.0,
            difficulty: 0.0,
            elapsed_days: 0,
            scheduled_days: 0,
            reps: 0,
            lapses: 0,
            state: CardState::New,
            last_review: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

/// Mastery tier and the streaks that move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Leveling {
    pub level: u32,
    pub win_streak: u32,
    pub fail_streak: u32,
}

/// Per-exercise (or per-country / per-lesson) progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressCard {
    pub id: String,
    #[serde(flatten)]
    pub card: Card,
    #[serde(flatten)]
    pub leveling: Leveling,
}

impl ProgressCard {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            card: Card::new(now),
            leveling: Leveling::default(),
        }
    }
}

/// Per-learning-goal progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCard {
    pub name: String,
    #[serde(flatten)]
    pub card: Card,
    pub streak: u32,
    pub last_repetition_correct: Option<bool>,
    pub correct_repetition_count: u32,
    /// Manual exclusion; inherited by every descendant goal.
    pub is_blacklisted: bool,
    pub priority: Option<i32>,
}

impl GoalCard {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            card: Card::new(now),
            streak: 0,
            last_repetition_correct: None,
            correct_repetition_count: 0,
            is_blacklisted: false,
            priority: None,
        }
    }
}

/// Anything a [`crate::CardStore`] can hold.
pub trait StoredCard: Clone {
    fn key(&self) -> &str;
    fn memory(&self) -> &Card;

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.memory().is_due(now)
    }
}

impl StoredCard for ProgressCard {
    fn key(&self) -> &str {
        &self.id
    }

    fn memory(&self) -> &Card {
        &self.card
    }
}

impl StoredCard for GoalCard {
    fn key(&self) -> &str {
        &self.name
    }

    fn memory(&self) -> &Card {
        &self.card
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::at;
    use chrono::Duration;

    #[test]
    fn new_card_is_due_immediately() {
        let now = at(0);
        let card = Card::new(now);
        assert!(card.is_due(now));
        assert!(!card.is_due(now - Duration::seconds(1)));
        assert_eq!(card.state, CardState::New);
    }

    #[test]
    fn progress_card_serializes_flat() {
        let card = ProgressCard::new("malta-world", at(0));
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["id"], "malta-world");
        assert_eq!(json["level"], 0);
        assert_eq!(json["state"], "New");
        let back: ProgressCard = serde_json::from_value(json).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn card_state_parses_from_name() {
        assert_eq!("Relearning".parse::<CardState>().unwrap(), CardState::Relearning);
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::card::Card;
use crate::error::{DrillError, Result};
use crate::fsrs::Fsrs;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    /// 1-4, as the memory model numbers its answer buttons.
    pub fn rating(self) -> usize {
        match self {
            Grade::Again => 1,
            Grade::Hard => 2,
            Grade::Good => 3,
            Grade::Easy => 4,
        }
    }

    /// One click is a clean answer, two a recovered one, anything more a miss.
    pub fn from_attempts(attempts: u32) -> Result<Self> {
        match attempts {
            0 => Err(DrillError::InvalidAttempts),
            1 => Ok(Grade::Good),
            2 => Ok(Grade::Hard),
            _ => Ok(Grade::Again),
        }
    }
}

/// Function type for the external scheduler: takes the current card, the review
/// instant and the grade, and returns the updated card with its new due date.
#[derive(Clone)]
#[allow(clippy::type_complexity)]
pub struct SchedulingFn(pub Arc<dyn Fn(&Card, DateTime<Utc>, Grade) -> Card + Sync + Send>);

impl PartialEq for SchedulingFn {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl std::fmt::Debug for SchedulingFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wrap(<function>)")
    }
}

impl Default for SchedulingFn {
    fn default() -> Self {
        Fsrs::default().into()
    }
}

impl From<Fsrs> for SchedulingFn {
    fn from(fsrs: Fsrs) -> Self {
        Self(Arc::new(move |card, now, grade| fsrs.next(card, now, grade)))
    }
}

impl SchedulingFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Card, DateTime<Utc>, Grade) -> Card + Sync + Send + 'static,
    {
        Self(Arc::new(f))
    }
}

/// Boundary between the engine and the scheduling function. The engine only
/// chooses the grade; all memory math stays behind [`SchedulingFn`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerAdapter {
    function: SchedulingFn,
}

impl SchedulerAdapter {
    pub fn new(function: SchedulingFn) -> Self {
        Self { function }
    }

    pub fn next(&self, card: &Card, now: DateTime<Utc>, grade: Grade) -> Card {
        (self.function.0)(card, now, grade)
    }

    /// Maps the click count to a grade and schedules with it.
    pub fn review(&self, card: &Card, now: DateTime<Utc>, attempts: u32) -> Result<(Grade, Card)> {
        let grade = Grade::from_attempts(attempts)?;
        Ok((grade, self.next(card, now, grade)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{at, fixed_scheduler};
    use chrono::Duration;

    #[test]
    fn grade_from_attempts() {
        assert!(matches!(
            Grade::from_attempts(0),
            Err(DrillError::InvalidAttempts)
        ));
        assert_eq!(Grade::from_attempts(1).unwrap(), Grade::Good);
        assert_eq!(Grade::from_attempts(2).unwrap(), Grade::Hard);
        assert_eq!(Grade::from_attempts(3).unwrap(), Grade::Again);
        assert_eq!(Grade::from_attempts(17).unwrap(), Grade::Again);
    }

    #[test]
    fn adapter_passes_grade_through() {
        let adapter = fixed_scheduler(Duration::days(3));
        let now = at(0);
        let (grade, card) = adapter.review(&Card::new(now), now, 2).unwrap();
        assert_eq!(grade, Grade::Hard);
        assert_eq!(card.due, now + Duration::days(3));
        assert_eq!(card.reps, 1);
    }

    #[test]
    fn default_adapter_uses_fsrs() {
        let adapter = SchedulerAdapter::default();
        let now = at(0);
        let card = adapter.next(&Card::new(now), now, Grade::Good);
        assert_eq!(card.due, now + Duration::minutes(10));
    }
}

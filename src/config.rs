use chrono::Duration;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};

use crate::error::{ConfigOutOfRangeSnafu, InvalidConfigSnafu, Result};
use crate::selection::GroupBy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Empty means the default FSRS-6 parameters.
    pub parameters: Vec<f32>,
    pub desired_retention: f32,
    /// Upper bound on any interval, in days.
    pub maximum_interval: u32,
    pub enable_short_term: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parameters: vec![],
            desired_retention: 0.9,
            maximum_interval: 36500,
            enable_short_term: true,
        }
    }
}

/// Overrides applied on top of the scheduler's due date, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalPolicy {
    pub level_up_secs: i64,
    pub correct_floor_secs: i64,
    pub failure_floor_secs: i64,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            level_up_secs: 30,
            correct_floor_secs: 4 * 60,
            failure_floor_secs: 60,
        }
    }
}

/// Longest override accepted, matching the scheduler's default interval cap.
const MAX_OVERRIDE_SECS: i64 = 36500 * 24 * 60 * 60;

impl IntervalPolicy {
    pub fn validate(&self) -> Result<()> {
        for (field, secs) in [
            ("intervals.level_up_secs", self.level_up_secs),
            ("intervals.correct_floor_secs", self.correct_floor_secs),
            ("intervals.failure_floor_secs", self.failure_floor_secs),
        ] {
            ensure!(
                (0..=MAX_OVERRIDE_SECS).contains(&secs),
                ConfigOutOfRangeSnafu { field }
            );
        }
        Ok(())
    }

    pub fn level_up(&self) -> Duration {
        Duration::seconds(self.level_up_secs)
    }

    pub fn correct_floor(&self) -> Duration {
        Duration::seconds(self.correct_floor_secs)
    }

    pub fn failure_floor(&self) -> Duration {
        Duration::seconds(self.failure_floor_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Never serve the same group twice in a row when something else is available.
    pub anti_repeat: bool,
    pub group_by: GroupBy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            anti_repeat: true,
            group_by: GroupBy::Country,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub intervals: IntervalPolicy,
    /// Share of a blocking goal's exercises that must be learned and not due.
    pub lift_threshold: f32,
    pub selection: SelectionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            intervals: IntervalPolicy::default(),
            lift_threshold: 0.5,
            selection: SelectionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Missing keys fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context(InvalidConfigSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would overflow date arithmetic or make blocking
    /// meaningless. Scheduler parameters are checked when the scheduler is built.
    pub fn validate(&self) -> Result<()> {
        self.intervals.validate()?;
        ensure!(
            (0.0..=1.0).contains(&self.lift_threshold),
            ConfigOutOfRangeSnafu {
                field: "lift_threshold"
            }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DrillError;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "lift_threshold": 0.75, "selection": { "group_by": "Item" } }"#,
        )
        .unwrap();
        assert_eq!(config.lift_threshold, 0.75);
        assert_eq!(config.selection.group_by, GroupBy::Item);
        assert!(config.selection.anti_repeat);
        assert_eq!(config.intervals, IntervalPolicy::default());
        assert_eq!(config.scheduler.desired_retention, 0.9);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EngineConfig::from_json("{ nope").is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let result = EngineConfig::from_json(r#"{ "intervals": { "level_up_secs": 9223372036854775807 } }"#);
        assert!(matches!(
            result,
            Err(DrillError::ConfigOutOfRange { field }) if field == "intervals.level_up_secs"
        ));

        let result = EngineConfig::from_json(r#"{ "intervals": { "failure_floor_secs": -60 } }"#);
        assert!(matches!(
            result,
            Err(DrillError::ConfigOutOfRange { field }) if field == "intervals.failure_floor_secs"
        ));

        let result = EngineConfig::from_json(r#"{ "lift_threshold": 1.5 }"#);
        assert!(matches!(
            result,
            Err(DrillError::ConfigOutOfRange { field }) if field == "lift_threshold"
        ));

        let config = EngineConfig {
            lift_threshold: f32::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn interval_policy_defaults() {
        let policy = IntervalPolicy::default();
        assert_eq!(policy.level_up(), Duration::seconds(30));
        assert_eq!(policy.correct_floor(), Duration::minutes(4));
        assert_eq!(policy.failure_floor(), Duration::minutes(1));
    }
}

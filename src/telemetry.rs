//! Outbound, best-effort notifications about learning progress.

use std::sync::mpsc::Sender;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::scheduler::Grade;
use crate::tracker::{LevelChange, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
pub enum ItemKind {
    Exercise,
    Goal,
    /// Legacy country- or lesson-level card.
    Item,
}

/// Emitted after every completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressChanged {
    pub kind: ItemKind,
    pub id: String,
    pub outcome: Outcome,
    pub grade: Grade,
    pub level_change: LevelChange,
    pub level: Option<u32>,
    pub due: DateTime<Utc>,
    pub at: DateTime<Utc>,
}

/// One answered exercise, as measured by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    pub timestamp: DateTime<Utc>,
    pub exercise_id: String,
    pub learning_goal: Option<String>,
    pub ms_to_first_click: u64,
    pub ms_to_finish_click: u64,
    pub clicks_needed: u32,
    /// Distance of the first click from the target's centre, in map units.
    pub first_click_distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    ProgressChanged(ProgressChanged),
    Learning(LearningEvent),
}

/// Receives events without blocking the caller. Delivery is not guaranteed and
/// the engine never depends on it.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Writes every event to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn record(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::ProgressChanged(p) => info!(
                "{} {}: {} ({}), level {:?} {}, due {}",
                p.kind, p.id, p.outcome, p.grade, p.level, p.level_change, p.due
            ),
            TelemetryEvent::Learning(e) => info!(
                "answered {} in {} clicks, {} ms",
                e.exercise_id, e.clicks_needed, e.ms_to_finish_click
            ),
        }
    }
}

/// Forwards events over an unbounded channel, e.g. to a shipping thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<TelemetryEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<TelemetryEvent>) -> Self {
        Self { sender }
    }
}

impl TelemetrySink for ChannelSink {
    fn record(&self, event: TelemetryEvent) {
        if self.sender.send(event).is_err() {
            debug!("telemetry receiver gone, event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::at;
    use std::sync::mpsc::channel;

    fn event() -> TelemetryEvent {
        TelemetryEvent::Learning(LearningEvent {
            timestamp: at(0),
            exercise_id: "malta-1".into(),
            learning_goal: Some("malta".into()),
            ms_to_first_click: 800,
            ms_to_finish_click: 1200,
            clicks_needed: 1,
            first_click_distance: 3.5,
        })
    }

    #[test]
    fn channel_sink_forwards() {
        let (tx, rx) = channel();
        let sink = ChannelSink::new(tx);
        sink.record(event());
        assert_eq!(rx.try_recv().unwrap(), event());
    }

    #[test]
    fn channel_sink_ignores_closed_receiver() {
        let (tx, rx) = channel();
        drop(rx);
        ChannelSink::new(tx).record(event());
    }

    #[test]
    fn events_serialize() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["Learning"]["exercise_id"], "malta-1");
    }
}

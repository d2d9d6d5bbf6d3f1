use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use crate::card::Card;
use crate::content::{ContentGraph, ExerciseData, LearningGoalData};
use crate::scheduler::{SchedulerAdapter, SchedulingFn};
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// `secs` seconds after a fixed reference instant.
pub(crate) fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
}

/// Schedules every card exactly `interval` ahead, whatever the grade.
pub(crate) fn fixed_scheduler(interval: Duration) -> SchedulerAdapter {
    SchedulerAdapter::new(SchedulingFn::new(move |card: &Card, now, _grade| Card {
        due: now + interval,
        reps: card.reps + 1,
        last_review: Some(now),
        ..card.clone()
    }))
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&self, event: TelemetryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub(crate) fn goal(
    name: &str,
    parents: &[&str],
    blocked_by: &[&str],
    exercises: &[&str],
) -> LearningGoalData {
    let owned = |names: &[&str]| -> Vec<String> { names.iter().map(|n| n.to_string()).collect() };
    LearningGoalData {
        name: name.into(),
        parents: owned(parents),
        blocked_by: owned(blocked_by),
        exercises: owned(exercises),
        ..Default::default()
    }
}

pub(crate) fn map_exercise(id: &str, country: &str) -> ExerciseData {
    ExerciseData {
        id: id.into(),
        instruction: format!("Click on {country}"),
        data: Some(json!({ "zoom": 120, "country": country })),
    }
}

/// world > europe > {malta, italy, microstates > vatican}; italy is blocked by malta.
pub(crate) fn sample_graph() -> ContentGraph {
    ContentGraph::new(
        vec![
            goal("world", &[], &[], &[]),
            goal("europe", &["world"], &[], &[]),
            goal("malta", &["europe"], &[], &["malta-1", "malta-2", "malta-3"]),
            goal("italy", &["europe"], &["malta"], &["italy-1", "italy-2"]),
            goal("microstates", &["europe"], &[], &[]),
            goal("vatican", &["microstates"], &[], &["vatican-1"]),
        ],
        vec![
            map_exercise("malta-1", "Malta"),
            map_exercise("malta-2", "Malta"),
            map_exercise("malta-3", "Malta"),
            map_exercise("italy-1", "Italy"),
            map_exercise("italy-2", "Italy"),
            map_exercise("vatican-1", "Vatican City"),
        ],
    )
}

pub(crate) fn init_logger() {
    // a second call fails because a logger is already set
    let _ = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply();
}

pub(crate) fn temp_path(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("geodrill-{}-{name}-{n}.json", std::process::id()))
}

mod blocking;
mod card;
mod challenge;
mod config;
mod content;
mod error;
mod fsrs;
mod parameter_clipper;
mod progress;
mod random;
mod scheduler;
mod selection;
mod store;
mod telemetry;
#[cfg(test)]
mod test_helpers;
mod tracker;

pub use blocking::{BlockingEvaluator, DueIndex};
pub use card::{Card, CardState, GoalCard, Leveling, ProgressCard, StoredCard};
pub use challenge::{
    ChallengeResult, ChallengeSession, ChallengeState, ROUNDS, Round, ZOOM_RANGE, daily_rounds,
    score,
};
pub use config::{EngineConfig, IntervalPolicy, SchedulerConfig, SelectionConfig};
pub use content::{ContentGraph, Exercise, ExerciseData, LearningGoal, LearningGoalData, MapPayload};
pub use error::{DrillError, Result};
pub use fsrs::{DEFAULT_PARAMETERS, Fsrs};
pub use progress::{LearningProgress, ProgressPercentages};
pub use random::{daily_seed, seeded_rng, session_seed};
pub use scheduler::{Grade, SchedulerAdapter, SchedulingFn};
pub use selection::{Category, GoalExercise, GroupBy, Selection, SelectionEngine};
pub use store::{CardStore, JsonFileStore, MemoryStore, prune_unknown};
pub use telemetry::{
    ChannelSink, ItemKind, LearningEvent, LogSink, NullSink, ProgressChanged, TelemetryEvent,
    TelemetrySink,
};
pub use tracker::{LevelChange, Outcome, ProgressTracker, Review};

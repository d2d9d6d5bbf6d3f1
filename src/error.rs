use std::path::PathBuf;

use snafu::Snafu;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum DrillError {
    #[snafu(display("card not found: {id}"))]
    CardNotFound { id: String },
    #[snafu(display("unknown exercise: {id}"))]
    UnknownExercise { id: String },
    #[snafu(display("unknown learning goal: {name}"))]
    UnknownGoal { name: String },
    #[snafu(display("an attempt needs at least one click"))]
    InvalidAttempts,
    InvalidParameters,
    #[snafu(display("malformed content table"))]
    InvalidContent { source: serde_json::Error },
    #[snafu(display("malformed configuration"))]
    InvalidConfig { source: serde_json::Error },
    #[snafu(display("configuration value out of range: {field}"))]
    ConfigOutOfRange { field: &'static str },
    #[snafu(display("no daily challenge can be started for {date}"))]
    ChallengeUnavailable { date: chrono::NaiveDate },
    #[snafu(display("i/o error on {}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("could not (de)serialize {}", path.display()))]
    Serialization {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type Result<T, E = DrillError> = std::result::Result<T, E>;

//! Default scheduling function: the FSRS-6 memory model evaluated on plain `f32`s.
//!
//! The engine only ever talks to this through [`crate::SchedulingFn`]; any other
//! function honouring the same contract can replace it.

use chrono::{DateTime, Duration, Utc};

use crate::card::{Card, CardState};
use crate::config::SchedulerConfig;
use crate::error::{DrillError, Result};
use crate::parameter_clipper::clip_parameters;
use crate::scheduler::Grade;

pub(crate) const S_MIN: f32 = 0.001;
pub(crate) const S_MAX: f32 = 36500.0;
pub(crate) const INIT_S_MAX: f32 = 100.0;
pub(crate) const D_MIN: f32 = 1.0;
pub(crate) const D_MAX: f32 = 10.0;

pub const FSRS5_DEFAULT_DECAY: f32 = 0.5;

pub static DEFAULT_PARAMETERS: [f32; 21] = [
    0.212, 1.2931, 2.3065, 8.2956, 6.4133, 0.8334, 3.0194, 0.001, 1.8722, 0.1666, 0.796, 1.4835,
    0.0614, 0.2629, 1.6483, 0.6014, 1.8729, 0.5425, 0.0912, 0.0658, 0.1542,
];

fn init_d(w: &[f32], rating: usize) -> f32 {
    w[4] - (w[5] * (rating - 1) as f32).exp() + 1.0
}

fn stability_after_success(w: &[f32], s: f32, r: f32, d: f32, rating: usize) -> f32 {
    let hard_penalty = if rating == 2 { w[15] } else { 1.0 };
    let easy_bonus = if rating == 4 { w[16] } else { 1.0 };
    (s * (f32::exp(w[8])
        * (11.0 - d)
        * s.powf(-w[9])
        * (f32::exp((1.0 - r) * w[10]) - 1.0)
        * hard_penalty)
        .mul_add(easy_bonus, 1.0))
    .clamp(S_MIN, S_MAX)
}

fn stability_after_failure(w: &[f32], s: f32, r: f32, d: f32) -> f32 {
    let new_s_min = s / (w[17] * w[18]).exp();
    let new_s =
        (w[11] * d.powf(-w[12]) * ((s + 1.0).powf(w[13]) - 1.0) * f32::exp((1.0 - r) * w[14]))
            .min(new_s_min);
    new_s.clamp(S_MIN, S_MAX)
}

fn stability_short_term(w: &[f32], s: f32, rating: usize) -> f32 {
    let sinc = (w[17] * (rating as f32 - 3.0 + w[18])).exp() * s.powf(-w[19]);
    let new_s = s * if rating >= 3 { sinc.max(1.0) } else { sinc };
    new_s.clamp(S_MIN, S_MAX)
}

/// Damped step towards the grade, then reverted towards the Easy difficulty.
fn next_d(w: &[f32], d: f32, rating: usize) -> f32 {
    let delta_d = -w[6] * (rating as f32 - 3.0);
    let damped = d + (10.0 - d) / 9.0 * delta_d;
    (w[7] * init_d(w, 4) + (1.0 - w[7]) * damped).clamp(D_MIN, D_MAX)
}

fn power_forgetting_curve(w: &[f32], t: f32, s: f32) -> f32 {
    debug_assert!(t >= 0.);
    let decay = -w[20];
    let factor = 0.9f32.powf(1.0 / decay) - 1.0;
    (t / s).mul_add(factor, 1.0).powf(decay)
}

/// Accepts FSRS-5 (19) and FSRS-6 (21) parameter sets, or none for defaults.
pub(crate) fn check_and_fill_parameters(parameters: &[f32]) -> Result<Vec<f32>> {
    let parameters = match parameters.len() {
        0 => DEFAULT_PARAMETERS.to_vec(),
        19 => {
            let mut parameters = parameters.to_vec();
            parameters.extend_from_slice(&[0.0, FSRS5_DEFAULT_DECAY]);
            parameters
        }
        21 => parameters.to_vec(),
        _ => return Err(DrillError::InvalidParameters),
    };
    if parameters.iter().any(|&w| !w.is_finite()) {
        return Err(DrillError::InvalidParameters);
    }
    Ok(parameters)
}

/// How long until the next review after a step.
enum Step {
    Minutes(i64),
    Days(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fsrs {
    w: Vec<f32>,
    desired_retention: f32,
    maximum_interval: u32,
    enable_short_term: bool,
}

impl Default for Fsrs {
    fn default() -> Self {
        Self {
            w: DEFAULT_PARAMETERS.to_vec(),
            desired_retention: 0.9,
            maximum_interval: 36500,
            enable_short_term: true,
        }
    }
}

impl Fsrs {
    pub fn new(parameters: &[f32]) -> Result<Self> {
        Self::with_config(&SchedulerConfig {
            parameters: parameters.to_vec(),
            ..Default::default()
        })
    }

    pub fn with_config(config: &SchedulerConfig) -> Result<Self> {
        if !(config.desired_retention > 0.0 && config.desired_retention < 1.0) {
            return Err(DrillError::InvalidParameters);
        }
        let w = check_and_fill_parameters(&config.parameters)?;
        Ok(Self {
            w: clip_parameters(&w),
            desired_retention: config.desired_retention,
            maximum_interval: config.maximum_interval.max(1),
            enable_short_term: config.enable_short_term,
        })
    }

    pub fn parameters(&self) -> &[f32] {
        &self.w
    }

    /// Probability of recalling the card at `now`.
    pub fn retrievability(&self, card: &Card, now: DateTime<Utc>) -> f32 {
        match (card.state, card.last_review) {
            (CardState::New, _) | (_, None) => 0.0,
            (_, Some(last)) => {
                let elapsed = (now - last).num_seconds().max(0) as f32 / 86400.0;
                power_forgetting_curve(&self.w, elapsed, card.stability.max(S_MIN))
            }
        }
    }

    /// Whole days until retrievability falls to the desired retention.
    pub fn next_interval(&self, stability: f32) -> u32 {
        let decay = -self.w[20];
        let factor = 0.9f32.powf(1.0 / decay) - 1.0;
        (stability / factor * (self.desired_retention.powf(1.0 / decay) - 1.0))
            .round()
            .clamp(1.0, self.maximum_interval as f32) as u32
    }

    /// Reviews `card` at `now` with `grade` and returns the updated card.
    pub fn next(&self, card: &Card, now: DateTime<Utc>, grade: Grade) -> Card {
        let w = &self.w;
        let rating = grade.rating();
        let elapsed_days = card
            .last_review
            .map_or(0, |last| (now - last).num_days().max(0) as u32);
        let last_s = card.stability.max(S_MIN);
        let last_d = card.difficulty.clamp(D_MIN, D_MAX);
        let mut lapses = card.lapses;

        let (stability, difficulty, state, step) = match card.state {
            CardState::New => {
                let s = w[rating - 1];
                let d = init_d(w, rating).clamp(D_MIN, D_MAX);
                match grade {
                    Grade::Again => (s, d, CardState::Learning, Step::Minutes(1)),
                    Grade::Hard => (s, d, CardState::Learning, Step::Minutes(5)),
                    Grade::Good => (s, d, CardState::Learning, Step::Minutes(10)),
                    Grade::Easy => (s, d, CardState::Review, Step::Days(self.next_interval(s))),
                }
            }
            CardState::Learning | CardState::Relearning => {
                let s = if self.enable_short_term {
                    stability_short_term(w, last_s, rating)
                } else {
                    last_s
                };
                let d = next_d(w, last_d, rating);
                match grade {
                    Grade::Again => (s, d, card.state, Step::Minutes(5)),
                    Grade::Hard => (s, d, card.state, Step::Minutes(10)),
                    Grade::Good | Grade::Easy => {
                        (s, d, CardState::Review, Step::Days(self.next_interval(s)))
                    }
                }
            }
            CardState::Review => {
                let s = if elapsed_days == 0 && self.enable_short_term {
                    stability_short_term(w, last_s, rating)
                } else {
                    let r = power_forgetting_curve(w, elapsed_days as f32, last_s);
                    match grade {
                        Grade::Again => stability_after_failure(w, last_s, r, last_d),
                        _ => stability_after_success(w, last_s, r, last_d, rating),
                    }
                };
                let d = next_d(w, last_d, rating);
                match grade {
                    Grade::Again => {
                        lapses += 1;
                        (s, d, CardState::Relearning, Step::Minutes(10))
                    }
                    _ => (s, d, CardState::Review, Step::Days(self.next_interval(s))),
                }
            }
        };

        let (due, scheduled_days) = match step {
            Step::Minutes(minutes) => (now + Duration::minutes(minutes), 0),
            Step::Days(days) => (now + Duration::days(i64::from(days)), days),
        };

        Card {
            due,
            stability,
            difficulty,
            elapsed_days,
            scheduled_days,
            reps: card.reps + 1,
            lapses,
            state,
            last_review: Some(now),
        }
    }
}

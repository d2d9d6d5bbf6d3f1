//! Seeds for reproducible selection.
//!
//! A seed is the sum of the character codes of a UTC date or timestamp, so
//! every learner sees the same sequence for the same day.

use chrono::{DateTime, NaiveDate, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn char_code_sum(s: &str) -> u64 {
    s.chars().map(u64::from).sum()
}

/// Seed shared by everyone on the same UTC calendar day.
pub fn daily_seed(date: NaiveDate) -> u64 {
    char_code_sum(&date.format("%Y-%m-%d").to_string())
}

/// Seed for a single session, from the instant down to the millisecond.
pub fn session_seed(instant: DateTime<Utc>) -> u64 {
    char_code_sum(&instant.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::at;
    use chrono::Duration;
    use rand::Rng;

    #[test]
    fn daily_seed_sums_date_characters() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        // "2024-03-01": eight digits summing to 12, plus 8 * '0' and two '-'
        assert_eq!(daily_seed(date), 12 + 8 * 48 + 2 * 45);
    }

    #[test]
    fn session_seed_changes_with_milliseconds() {
        let a = at(0);
        let b = a + Duration::milliseconds(1);
        assert_eq!(session_seed(b), session_seed(a) + 1);
    }

    #[test]
    fn same_seed_same_sequence() {
        let draw = |seed| {
            let mut rng = seeded_rng(seed);
            (0..5).map(|_| rng.random_range(0..100)).collect::<Vec<u32>>()
        };
        assert_eq!(draw(7), draw(7));
    }
}

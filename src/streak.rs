//! Habit streak bookkeeping.
//!
//! [`StreakMode::Counter`] is a running counter: every toggle to "done" adds one
//! and every toggle back subtracts one (floored at zero), whatever the date. It
//! can drift from `history` when days are toggled out of order.
//! [`StreakMode::Consecutive`] instead recomputes the streak from `history` on
//! every toggle.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::model::{Habit, HabitHistory};
use crate::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreakMode {
    #[default]
    Counter,
    Consecutive,
}

impl FromStr for StreakMode {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "counter" => Ok(StreakMode::Counter),
            "consecutive" => Ok(StreakMode::Consecutive),
            other => Err(AppError::new("CONFIG/STREAK_MODE", "Unknown streak mode")
                .with_context("value", other.to_string())),
        }
    }
}

impl fmt::Display for StreakMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreakMode::Counter => "counter",
            StreakMode::Consecutive => "consecutive",
        })
    }
}

/// Flip `date` in the habit's history and update its streak. Returns whether
/// the date is marked done afterwards.
pub fn toggle(habit: &mut Habit, date: NaiveDate, mode: StreakMode) -> bool {
    let done = if habit.history.remove(date) {
        habit.streak = habit.streak.saturating_sub(1);
        false
    } else {
        habit.history.insert(date);
        habit.streak = habit.streak.saturating_add(1);
        true
    };

    if mode == StreakMode::Consecutive {
        habit.streak = consecutive_run(&habit.history);
    }
    done
}

/// Length of the run of consecutive completed days ending at the most recent
/// completed day.
pub fn consecutive_run(history: &HabitHistory) -> u32 {
    let mut dates = history.dates().rev();
    let Some(mut previous) = dates.next() else {
        return 0;
    };
    let mut run = 1;
    for date in dates {
        if previous.pred_opt() != Some(date) {
            break;
        }
        run += 1;
        previous = date;
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_date_key;

    fn date(raw: &str) -> NaiveDate {
        parse_date_key(raw).unwrap()
    }

    #[test]
    fn counter_ignores_date_adjacency() {
        let mut habit = Habit::new("Read", "Learning");
        assert!(toggle(&mut habit, date("2024-05-10"), StreakMode::Counter));
        assert!(toggle(&mut habit, date("2024-04-01"), StreakMode::Counter));
        assert_eq!(habit.streak, 2);
        assert_eq!(consecutive_run(&habit.history), 1);
    }

    #[test]
    fn counter_floors_at_zero() {
        let mut habit = Habit::new("Read", "Learning");
        habit.history.insert(date("2024-05-10"));
        assert!(!toggle(&mut habit, date("2024-05-10"), StreakMode::Counter));
        assert_eq!(habit.streak, 0);
    }

    #[test]
    fn consecutive_recomputes_from_history() {
        let mut habit = Habit::new("Read", "Learning");
        habit.streak = 12;
        for day in ["2024-05-08", "2024-05-09", "2024-05-10"] {
            toggle(&mut habit, date(day), StreakMode::Consecutive);
        }
        assert_eq!(habit.streak, 3);

        toggle(&mut habit, date("2024-05-09"), StreakMode::Consecutive);
        assert_eq!(habit.streak, 1);

        toggle(&mut habit, date("2024-05-10"), StreakMode::Consecutive);
        assert_eq!(habit.streak, 1, "run now ends at 2024-05-08");
    }

    #[test]
    fn consecutive_run_of_empty_history_is_zero() {
        assert_eq!(consecutive_run(&HabitHistory::default()), 0);
    }

    #[test]
    fn mode_parses_from_config_values() {
        assert_eq!("Counter".parse::<StreakMode>().unwrap(), StreakMode::Counter);
        assert_eq!(
            "consecutive".parse::<StreakMode>().unwrap(),
            StreakMode::Consecutive
        );
        assert!("weekly".parse::<StreakMode>().is_err());
    }
}

use super::calendar::DayKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Active-day history is bounded to this many trailing calendar days, which
/// also bounds the backward walk when counting the current streak.
pub const HISTORY_RETENTION_DAYS: i64 = 365;

/// Per-user streak state as persisted by the storage layer.
///
/// `history` is the deduplicated set of days with at least one qualifying
/// work task, stored sorted ascending. `longest_streak` never decreases over
/// a user's lifetime, even when pruning removes the runs that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub history: Vec<DayKey>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_day: Option<DayKey>,
}

/// Folds newly observed active days into the prior state and recomputes the
/// derived streak fields.
///
/// Pure function over its inputs: applying the same set of observed days
/// twice yields the same result, so concurrent last-writer-wins races on the
/// persisted row self-heal on the next call.
pub fn update_streak(today: DayKey, prior: &StreakState, newly_active: &[DayKey]) -> StreakState {
    let mut days: BTreeSet<DayKey> = prior.history.iter().copied().collect();
    days.extend(newly_active.iter().copied());

    let cutoff = today.add_days(-HISTORY_RETENTION_DAYS);
    days.retain(|day| *day >= cutoff);

    let current_streak = current_run(today, &days);
    let longest_streak = prior
        .longest_streak
        .max(longest_run(&days))
        .max(current_streak);
    let last_active_day = days.iter().next_back().copied().or(prior.last_active_day);

    StreakState {
        history: days.into_iter().collect(),
        current_streak,
        longest_streak,
        last_active_day,
    }
}

/// Consecutive days present in `days` walking backward from `today`. Today
/// itself must be present for the run to be non-zero.
fn current_run(today: DayKey, days: &BTreeSet<DayKey>) -> u32 {
    let mut run = 0u32;
    let mut cursor = today;

    while run < HISTORY_RETENTION_DAYS as u32 && days.contains(&cursor) {
        run += 1;
        cursor = cursor.add_days(-1);
    }

    run
}

/// Longest run of adjacent days anywhere in the sorted set. A gap wider than
/// one day resets the run.
fn longest_run(days: &BTreeSet<DayKey>) -> u32 {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<DayKey> = None;

    for day in days {
        run = match previous {
            Some(prior) if prior.days_until(*day) == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::{update_streak, StreakState, HISTORY_RETENTION_DAYS};
    use crate::stats::calendar::DayKey;

    fn key(value: &str) -> DayKey {
        DayKey::parse(value).expect("valid day key")
    }

    fn keys(values: &[&str]) -> Vec<DayKey> {
        values.iter().map(|value| key(value)).collect()
    }

    #[test]
    fn first_active_day_starts_both_streaks() {
        let today = key("2024-06-10");
        let state = update_streak(today, &StreakState::default(), &[today]);

        assert_eq!(state.current_streak, 1);
        assert_eq!(state.longest_streak, 1);
        assert_eq!(state.last_active_day, Some(today));
        assert_eq!(state.history, vec![today]);
    }

    #[test]
    fn missing_today_breaks_current_but_not_longest() {
        let today = key("2024-06-10");
        let prior = StreakState {
            history: keys(&["2024-06-08", "2024-06-09"]),
            ..StreakState::default()
        };

        let state = update_streak(today, &prior, &[]);

        assert_eq!(state.current_streak, 0);
        assert_eq!(state.longest_streak, 2);
        assert_eq!(state.last_active_day, Some(key("2024-06-09")));
    }

    #[test]
    fn gap_in_history_splits_runs() {
        let today = key("2024-06-10");
        let prior = StreakState {
            history: keys(&[
                "2024-06-05",
                "2024-06-06",
                "2024-06-07",
                "2024-06-09",
                "2024-06-10",
            ]),
            ..StreakState::default()
        };

        let state = update_streak(today, &prior, &[]);

        assert_eq!(state.current_streak, 2);
        assert_eq!(state.longest_streak, 3);
    }

    #[test]
    fn applying_the_same_days_twice_is_idempotent() {
        let today = key("2024-06-10");
        let observed = keys(&["2024-06-09", "2024-06-10"]);

        let once = update_streak(today, &StreakState::default(), &observed);
        let twice = update_streak(today, &once, &observed);

        assert_eq!(once, twice);
    }

    #[test]
    fn duplicate_observations_do_not_inflate_history() {
        let today = key("2024-06-10");
        let observed = keys(&["2024-06-10", "2024-06-10", "2024-06-09"]);

        let state = update_streak(today, &StreakState::default(), &observed);

        assert_eq!(state.history, keys(&["2024-06-09", "2024-06-10"]));
        assert_eq!(state.current_streak, 2);
    }

    #[test]
    fn longest_streak_never_decreases() {
        let today = key("2024-06-10");
        let prior = StreakState {
            history: keys(&["2024-06-10"]),
            longest_streak: 14,
            ..StreakState::default()
        };

        let state = update_streak(today, &prior, &[]);

        assert_eq!(state.longest_streak, 14);
        assert_eq!(state.current_streak, 1);
    }

    #[test]
    fn history_is_pruned_to_the_retention_window() {
        let today = key("2024-06-10");
        let stale = today.add_days(-(HISTORY_RETENTION_DAYS + 1));
        let boundary = today.add_days(-HISTORY_RETENTION_DAYS);
        let prior = StreakState {
            history: vec![stale, boundary, today],
            ..StreakState::default()
        };

        let state = update_streak(today, &prior, &[]);

        assert_eq!(state.history, vec![boundary, today]);
    }

    #[test]
    fn empty_history_keeps_previously_persisted_last_active_day() {
        let today = key("2024-06-10");
        let stale = today.add_days(-(HISTORY_RETENTION_DAYS + 30));
        let prior = StreakState {
            history: vec![stale],
            longest_streak: 5,
            last_active_day: Some(stale),
            ..StreakState::default()
        };

        let state = update_streak(today, &prior, &[]);

        assert!(state.history.is_empty());
        assert_eq!(state.current_streak, 0);
        assert_eq!(state.longest_streak, 5);
        assert_eq!(state.last_active_day, Some(stale));
    }
}

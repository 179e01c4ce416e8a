pub mod buckets;
pub mod calendar;
pub mod hours;
pub mod progress;
pub mod streak;

use crate::config::Config;
use crate::db::{BreakRow, Database, MoodRow, TaskRow};
use crate::stats::buckets::WeeklyBuckets;
use crate::stats::calendar::{DayKey, WINDOW_DAYS};
use crate::stats::hours::UserStats;
use crate::stats::streak::StreakState;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Streak fields exposed in response payloads. The full day-key history
/// stays in storage.
#[derive(Debug, Clone, Serialize)]
pub struct StreakOverview {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_day: Option<DayKey>,
}

impl From<&StreakState> for StreakOverview {
    fn from(state: &StreakState) -> Self {
        Self {
            current_streak: state.current_streak,
            longest_streak: state.longest_streak,
            last_active_day: state.last_active_day,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub user: String,
    pub generated_at: i64,
    pub buckets: WeeklyBuckets,
    pub streak: StreakOverview,
    pub stats: UserStats,
}

/// Assembles the full dashboard payload from already-fetched records and
/// returns the updated streak state for the caller to persist.
pub fn build_dashboard(
    now: DateTime<Local>,
    user: &str,
    tasks: &[TaskRow],
    breaks: &[BreakRow],
    moods: &[MoodRow],
    prior: &StreakState,
    weekly_goal_hours: f64,
) -> (DashboardSnapshot, StreakState) {
    let buckets = buckets::compute_weekly_buckets(now, tasks, breaks, moods);
    let newly_active = active_days(tasks);
    let state = streak::update_streak(DayKey::from_datetime(now), prior, &newly_active);
    let stats = hours::compute_user_stats(now, tasks, weekly_goal_hours);

    let snapshot = DashboardSnapshot {
        user: user.to_string(),
        generated_at: now.timestamp(),
        buckets,
        streak: StreakOverview::from(&state),
        stats,
    };

    (snapshot, state)
}

/// Days carrying at least one qualifying work task among the given records,
/// deduplicated and sorted.
pub fn active_days(tasks: &[TaskRow]) -> Vec<DayKey> {
    let days: BTreeSet<DayKey> = tasks
        .iter()
        .filter(|task| task.is_work())
        .filter_map(|task| task.bucket_timestamp())
        .filter_map(DayKey::from_timestamp)
        .collect();

    days.into_iter().collect()
}

/// Fetch bound wide enough for both the seven-day bucket window and the
/// Monday-anchored hours week.
fn fetch_floor(now: DateTime<Local>) -> i64 {
    let window_floor = DayKey::from_datetime(now)
        .add_days(-(WINDOW_DAYS as i64 - 1))
        .start_timestamp()
        .unwrap_or_else(|| now.timestamp() - WINDOW_DAYS as i64 * 86_400);

    window_floor.min(hours::week_start(now))
}

/// Fetches one user's records, rebuilds their dashboard and streak state,
/// and persists both the state and the cached payload.
pub fn refresh_user_snapshot(
    database: &Database,
    now: DateTime<Local>,
    user: &str,
    default_weekly_goal_hours: f64,
) -> Result<DashboardSnapshot> {
    let from_ts = fetch_floor(now);
    let tasks = database.tasks_since(user, from_ts)?;
    let breaks = database.breaks_since(user, from_ts)?;
    let moods = database.moods_since(user, from_ts)?;
    let prior = database.streak_state(user)?;
    let weekly_goal_hours = database
        .weekly_goal(user)?
        .unwrap_or(default_weekly_goal_hours);

    let (snapshot, state) =
        build_dashboard(now, user, &tasks, &breaks, &moods, &prior, weekly_goal_hours);

    database.upsert_streak(user, &state, now.timestamp())?;
    let payload =
        serde_json::to_string(&snapshot).context("Failed to serialize dashboard snapshot")?;
    database.upsert_weekly_cache(user, &payload, now.timestamp())?;

    Ok(snapshot)
}

/// Batch path: rebuilds every known user's cached dashboard. Per-user
/// failures are logged and skipped so one bad record set cannot stall the
/// sweep.
pub fn refresh_all_snapshots(config: &Config, now: DateTime<Local>) -> Result<usize> {
    let database = Database::open(&config.db_path)?;
    let users = database.user_names()?;

    for user in &users {
        if let Err(error) =
            refresh_user_snapshot(&database, now, user, config.default_weekly_goal_hours)
        {
            warn!(error = %error, user = %user, "weekly snapshot refresh failed");
        }
    }

    let removed = database.cleanup_old_records(config.retention_days)?;
    if removed > 0 {
        info!(removed, "pruned records outside the retention window");
    }

    Ok(users.len())
}

#[cfg(test)]
mod tests {
    use super::{active_days, build_dashboard};
    use crate::db::{TaskKind, TaskRow};
    use crate::stats::streak::StreakState;
    use chrono::{DateTime, Local, TimeZone};

    fn noon(year: i32, month: u32, day: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("valid local datetime")
    }

    fn work_task(id: i64, ended_at: i64) -> TaskRow {
        TaskRow {
            id,
            user: "ada".to_string(),
            title: format!("task-{id}"),
            kind: TaskKind::Work,
            completed: true,
            started_at: None,
            ended_at: Some(ended_at),
            created_at: None,
        }
    }

    #[test]
    fn active_days_deduplicates_and_ignores_breaks() {
        let day = noon(2024, 6, 10).timestamp();
        let mut break_task = work_task(3, day);
        break_task.kind = TaskKind::Break;
        let tasks = vec![work_task(1, day), work_task(2, day + 60), break_task];

        let days = active_days(&tasks);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].to_string(), "2024-06-10");
    }

    #[test]
    fn dashboard_feeds_observed_days_into_the_streak() {
        let now = noon(2024, 6, 10);
        let tasks = vec![
            work_task(1, noon(2024, 6, 9).timestamp()),
            work_task(2, noon(2024, 6, 10).timestamp()),
        ];

        let (snapshot, state) =
            build_dashboard(now, "ada", &tasks, &[], &[], &StreakState::default(), 40.0);

        assert_eq!(snapshot.streak.current_streak, 2);
        assert_eq!(snapshot.streak.longest_streak, 2);
        assert_eq!(state.history.len(), 2);
        assert_eq!(snapshot.buckets.tasks_per_day[5], 1);
        assert_eq!(snapshot.buckets.tasks_per_day[6], 1);
    }

    #[test]
    fn rebuilding_from_the_same_records_is_stable() {
        let now = noon(2024, 6, 10);
        let tasks = vec![work_task(1, noon(2024, 6, 10).timestamp())];

        let (_, first) =
            build_dashboard(now, "ada", &tasks, &[], &[], &StreakState::default(), 40.0);
        let (_, second) = build_dashboard(now, "ada", &tasks, &[], &[], &first, 40.0);

        assert_eq!(first, second);
    }
}

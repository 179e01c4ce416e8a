use super::progress::{TaskPhase, active_hours, task_progress};
use crate::db::TaskRow;
use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, TimeZone};
use serde::Serialize;

/// Snapshot of the task currently in flight, if any.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentTask {
    pub id: i64,
    pub title: String,
    pub elapsed_secs: i64,
    pub remaining_secs: i64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub hours_worked: f64,
    pub progress_pct: u32,
    pub current_task: Option<CurrentTask>,
    pub tasks_completed: u32,
    pub total_tasks: u32,
}

/// Local timestamp of the most recent Monday at midnight. A midnight made
/// nonexistent by a DST transition falls forward one hour.
pub fn week_start(now: DateTime<Local>) -> i64 {
    let today = now.date_naive();
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let midnight = monday.and_time(NaiveTime::MIN);

    Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map(|datetime| datetime.timestamp())
        .unwrap_or_else(|| now.timestamp())
}

/// Sums worked hours across work-type tasks intersecting the current week
/// and derives progress toward the weekly goal.
///
/// Completed tasks that started before the week contribute only the portion
/// from the week start; the in-flight task contributes its elapsed time so
/// far; future tasks contribute nothing. Tasks without a full interval are
/// counted in the totals but add no hours.
pub fn compute_user_stats(
    now: DateTime<Local>,
    tasks: &[TaskRow],
    weekly_goal_hours: f64,
) -> UserStats {
    let now_ts = now.timestamp();
    let start_ts = week_start(now);

    let mut worked_hours = 0f64;
    let mut current_task: Option<CurrentTask> = None;

    for task in tasks.iter().filter(|task| task.is_work()) {
        let (Some(started_at), Some(ended_at)) = (task.started_at, task.ended_at) else {
            continue;
        };

        let progress = task_progress(now_ts, started_at, ended_at);
        match progress.phase {
            TaskPhase::Future => {}
            TaskPhase::Active => {
                worked_hours += active_hours(now_ts, started_at, ended_at);
                if current_task.is_none() {
                    current_task = Some(CurrentTask {
                        id: task.id,
                        title: task.title.clone(),
                        elapsed_secs: progress.elapsed_secs,
                        remaining_secs: progress.remaining_secs,
                        percent: progress.percent,
                    });
                }
            }
            TaskPhase::Completed => {
                if ended_at < start_ts {
                    continue;
                }
                worked_hours += (ended_at - started_at.max(start_ts)).max(0) as f64 / 3600.0;
            }
        }
    }

    let hours_worked = round_hours(worked_hours);
    let progress_pct = if weekly_goal_hours > 0.0 {
        let pct = ((hours_worked / weekly_goal_hours) * 100.0).round().max(0.0) as u32;
        pct.min(100)
    } else {
        0
    };

    UserStats {
        hours_worked,
        progress_pct,
        current_task,
        tasks_completed: tasks.iter().filter(|task| task.completed).count() as u32,
        total_tasks: tasks.len() as u32,
    }
}

fn round_hours(hours: f64) -> f64 {
    (hours.max(0.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{compute_user_stats, week_start};
    use crate::db::{TaskKind, TaskRow};
    use crate::stats::calendar::DayKey;
    use chrono::{DateTime, Local, TimeZone};

    // 2024-06-05 is a Wednesday; the containing week starts Monday 06-03.
    fn wednesday_noon() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 6, 5, 12, 0, 0)
            .single()
            .expect("valid local datetime")
    }

    fn work_task(id: i64, started_at: i64, ended_at: i64, completed: bool) -> TaskRow {
        TaskRow {
            id,
            user: "ada".to_string(),
            title: format!("task-{id}"),
            kind: TaskKind::Work,
            completed,
            started_at: Some(started_at),
            ended_at: Some(ended_at),
            created_at: None,
        }
    }

    #[test]
    fn week_starts_on_the_most_recent_monday() {
        let start = week_start(wednesday_noon());
        let key = DayKey::from_timestamp(start).expect("key");

        assert_eq!(key.to_string(), "2024-06-03");
        assert!(start <= wednesday_noon().timestamp());
    }

    #[test]
    fn completed_task_within_week_adds_full_duration() {
        let now = wednesday_noon();
        let end = now.timestamp() - 3_600;
        let task = work_task(1, end - 7_200, end, true);

        let stats = compute_user_stats(now, &[task], 40.0);

        assert_eq!(stats.hours_worked, 2.0);
        assert_eq!(stats.progress_pct, 5);
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.total_tasks, 1);
    }

    #[test]
    fn task_straddling_week_start_is_clamped() {
        let now = wednesday_noon();
        let start_ts = week_start(now);
        let task = work_task(1, start_ts - 7_200, start_ts + 3_600, true);

        let stats = compute_user_stats(now, &[task], 40.0);

        assert_eq!(stats.hours_worked, 1.0);
    }

    #[test]
    fn task_finished_before_the_week_adds_nothing() {
        let now = wednesday_noon();
        let start_ts = week_start(now);
        let task = work_task(1, start_ts - 7_200, start_ts - 3_600, true);

        let stats = compute_user_stats(now, &[task], 40.0);

        assert_eq!(stats.hours_worked, 0.0);
        assert_eq!(stats.progress_pct, 0);
    }

    #[test]
    fn active_task_contributes_elapsed_and_surfaces_as_current() {
        let now = wednesday_noon();
        let now_ts = now.timestamp();
        let task = work_task(7, now_ts - 1_800, now_ts + 1_800, false);

        let stats = compute_user_stats(now, &[task], 40.0);

        assert_eq!(stats.hours_worked, 0.5);
        let current = stats.current_task.expect("current task");
        assert_eq!(current.id, 7);
        assert_eq!(current.elapsed_secs, 1_800);
        assert_eq!(current.remaining_secs, 1_800);
        assert!((current.percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn future_tasks_contribute_nothing() {
        let now = wednesday_noon();
        let now_ts = now.timestamp();
        let task = work_task(1, now_ts + 3_600, now_ts + 7_200, false);

        let stats = compute_user_stats(now, &[task], 40.0);

        assert_eq!(stats.hours_worked, 0.0);
        assert!(stats.current_task.is_none());
        assert_eq!(stats.total_tasks, 1);
    }

    #[test]
    fn break_tasks_add_no_hours_but_count_in_totals() {
        let now = wednesday_noon();
        let end = now.timestamp() - 600;
        let mut task = work_task(1, end - 3_600, end, true);
        task.kind = TaskKind::Break;

        let stats = compute_user_stats(now, &[task], 40.0);

        assert_eq!(stats.hours_worked, 0.0);
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.total_tasks, 1);
    }

    #[test]
    fn progress_is_capped_at_one_hundred() {
        let now = wednesday_noon();
        let end = now.timestamp() - 60;
        let task = work_task(1, end - 10 * 3_600, end, true);

        let stats = compute_user_stats(now, &[task], 2.0);

        assert_eq!(stats.progress_pct, 100);
    }

    #[test]
    fn zero_goal_reports_zero_progress() {
        let now = wednesday_noon();
        let end = now.timestamp() - 60;
        let task = work_task(1, end - 3_600, end, true);

        let stats = compute_user_stats(now, &[task], 0.0);

        assert_eq!(stats.progress_pct, 0);
    }
}

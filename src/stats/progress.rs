use serde::Serialize;

/// Where a timed task interval sits relative to the supplied clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    Completed,
    Active,
    Future,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TaskProgress {
    pub phase: TaskPhase,
    pub elapsed_secs: i64,
    pub remaining_secs: i64,
    pub percent: f64,
}

/// Progress of a single task interval `[started_at, ended_at)` against `now`.
///
/// A zero-length interval counts as fully complete, so the percentage never
/// divides by zero.
pub fn task_progress(now: i64, started_at: i64, ended_at: i64) -> TaskProgress {
    let total_secs = (ended_at - started_at).max(0);

    if ended_at <= now {
        return TaskProgress {
            phase: TaskPhase::Completed,
            elapsed_secs: total_secs,
            remaining_secs: 0,
            percent: 100.0,
        };
    }

    if now < started_at {
        return TaskProgress {
            phase: TaskPhase::Future,
            elapsed_secs: 0,
            remaining_secs: ended_at - now,
            percent: 0.0,
        };
    }

    let elapsed_secs = now - started_at;
    let percent = if total_secs == 0 {
        100.0
    } else {
        ((elapsed_secs as f64 / total_secs as f64) * 100.0).min(100.0)
    };

    TaskProgress {
        phase: TaskPhase::Active,
        elapsed_secs,
        remaining_secs: ended_at - now,
        percent,
    }
}

/// Hours worked so far on an in-flight task. Completed and future tasks
/// contribute through the weekly aggregation instead.
pub fn active_hours(now: i64, started_at: i64, ended_at: i64) -> f64 {
    let progress = task_progress(now, started_at, ended_at);

    if progress.phase == TaskPhase::Active {
        progress.elapsed_secs as f64 / 3600.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{active_hours, task_progress, TaskPhase};

    #[test]
    fn completed_task_reports_full_duration() {
        let progress = task_progress(2_000, 500, 1_500);

        assert_eq!(progress.phase, TaskPhase::Completed);
        assert_eq!(progress.elapsed_secs, 1_000);
        assert_eq!(progress.remaining_secs, 0);
        assert_eq!(progress.percent, 100.0);
    }

    #[test]
    fn active_task_reports_elapsed_and_remaining() {
        let progress = task_progress(1_250, 1_000, 2_000);

        assert_eq!(progress.phase, TaskPhase::Active);
        assert_eq!(progress.elapsed_secs, 250);
        assert_eq!(progress.remaining_secs, 750);
        assert_eq!(progress.percent, 25.0);
    }

    #[test]
    fn future_task_reports_zero_progress() {
        let progress = task_progress(100, 500, 900);

        assert_eq!(progress.phase, TaskPhase::Future);
        assert_eq!(progress.elapsed_secs, 0);
        assert_eq!(progress.remaining_secs, 800);
        assert_eq!(progress.percent, 0.0);
    }

    #[test]
    fn zero_duration_interval_is_complete_without_division_fault() {
        let progress = task_progress(1_000, 1_000, 1_000);

        assert_eq!(progress.phase, TaskPhase::Completed);
        assert_eq!(progress.percent, 100.0);
    }

    #[test]
    fn only_active_tasks_contribute_hours() {
        assert_eq!(active_hours(2_000, 500, 1_500), 0.0);
        assert_eq!(active_hours(100, 500, 900), 0.0);

        let hours = active_hours(1_000 + 1_800, 1_000, 10_000);
        assert!((hours - 0.5).abs() < f64::EPSILON);
    }
}

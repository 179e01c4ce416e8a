use super::calendar::{WINDOW_DAYS, WeeklyWindow};
use crate::db::{BreakRow, MoodRow, TaskRow};
use chrono::{DateTime, Local};
use serde::Serialize;

/// Per-day breakdown of the trailing seven days, aligned to a
/// [`WeeklyWindow`]. Mood averages are `None` for days without check-ins,
/// never zero.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyBuckets {
    pub labels: Vec<String>,
    pub tasks_per_day: [u32; WINDOW_DAYS],
    pub breaks_per_day: [u32; WINDOW_DAYS],
    pub mood_counts_per_day: [u32; WINDOW_DAYS],
    pub mood_avg_per_day: [Option<f64>; WINDOW_DAYS],
}

/// Buckets raw records into the seven window days.
///
/// The caller's fetch filter may be wider or lossy; every record is
/// re-validated against the window here and silently dropped when its
/// resolved day falls outside it. Records with no usable timestamp are
/// skipped rather than failing the whole computation.
pub fn compute_weekly_buckets(
    now: DateTime<Local>,
    tasks: &[TaskRow],
    breaks: &[BreakRow],
    moods: &[MoodRow],
) -> WeeklyBuckets {
    let window = WeeklyWindow::for_now(now);

    let mut tasks_per_day = [0u32; WINDOW_DAYS];
    let mut breaks_per_day = [0u32; WINDOW_DAYS];
    let mut mood_counts_per_day = [0u32; WINDOW_DAYS];
    let mut mood_sums_per_day = [0f64; WINDOW_DAYS];

    for task in tasks.iter().filter(|task| task.is_work()) {
        if let Some(index) = resolve_index(&window, task.bucket_timestamp()) {
            tasks_per_day[index] += 1;
        }
    }

    for entry in breaks {
        if let Some(index) = resolve_index(&window, entry.bucket_timestamp()) {
            breaks_per_day[index] += 1;
        }
    }

    for entry in moods {
        let Some(index) = resolve_index(&window, entry.bucket_timestamp()) else {
            continue;
        };

        // Every check-in counts toward the day, with or without a mood value.
        mood_counts_per_day[index] += 1;
        if let Some(value) = entry.mood {
            mood_sums_per_day[index] += value;
        }
    }

    let mut mood_avg_per_day = [None; WINDOW_DAYS];
    for (index, average) in mood_avg_per_day.iter_mut().enumerate() {
        if mood_counts_per_day[index] > 0 {
            *average = Some(mood_sums_per_day[index] / f64::from(mood_counts_per_day[index]));
        }
    }

    WeeklyBuckets {
        labels: window.labels(),
        tasks_per_day,
        breaks_per_day,
        mood_counts_per_day,
        mood_avg_per_day,
    }
}

fn resolve_index(window: &WeeklyWindow, timestamp: Option<i64>) -> Option<usize> {
    timestamp.and_then(|ts| window.index_for_timestamp(ts))
}

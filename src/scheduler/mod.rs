use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveTime, TimeZone};
use std::future::Future;
use tokio::time::{Duration, sleep};
use tracing::{error, info};

const RESCHEDULE_POLL_SECONDS: u64 = 30;

/// Runs the daily refresh loop at the configured wall-clock time. The
/// schedule is re-read through `schedule_provider` every poll interval so
/// config edits take effect without a restart.
pub async fn run_daily_scheduler<S, F, Fut>(mut schedule_provider: S, mut task: F) -> Result<()>
where
    S: FnMut() -> Result<NaiveTime>,
    F: FnMut(DateTime<Local>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut last_logged_schedule: Option<NaiveTime> = None;

    loop {
        let target_time = match schedule_provider() {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, "failed to load refresh schedule");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        let delay = match seconds_until_next_run(target_time) {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, schedule = %target_time.format("%H:%M"), "failed to resolve next refresh run");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        if last_logged_schedule != Some(target_time) {
            info!(seconds = delay.as_secs(), schedule = %target_time.format("%H:%M"), "next refresh schedule set");
            last_logged_schedule = Some(target_time);
        }

        if delay > Duration::from_secs(RESCHEDULE_POLL_SECONDS) {
            sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
            continue;
        }

        sleep(delay).await;

        let now = Local::now();
        let result = task(now).await;

        if let Err(error) = result {
            error!(error = %error, date = %now.date_naive(), "scheduled snapshot refresh failed");
        }

        sleep(Duration::from_secs(1)).await;
    }
}

fn seconds_until_next_run(target_time: NaiveTime) -> Result<Duration> {
    let now = Local::now();
    let next_run = next_run_after(now, target_time)?;

    (next_run - now)
        .to_std()
        .context("Failed to compute next execution delay")
}

/// First local instant at `target_time` strictly after `now`. A target made
/// nonexistent by a DST transition rolls to the next day.
fn next_run_after(now: DateTime<Local>, target_time: NaiveTime) -> Result<DateTime<Local>> {
    let today = now.date_naive();

    let candidate_today = match Local.from_local_datetime(&today.and_time(target_time)) {
        LocalResult::Single(datetime) => datetime,
        _ => {
            let fallback_day = today + ChronoDuration::days(1);
            Local
                .from_local_datetime(&fallback_day.and_time(target_time))
                .single()
                .context("Failed to convert schedule time")?
        }
    };

    if candidate_today > now {
        return Ok(candidate_today);
    }

    let tomorrow = today + ChronoDuration::days(1);
    Local
        .from_local_datetime(&tomorrow.and_time(target_time))
        .single()
        .context("Failed to convert next execution time")
}

#[cfg(test)]
mod tests {
    use super::{next_run_after, seconds_until_next_run};
    use chrono::{Local, NaiveTime, TimeZone};

    fn local_noon() -> chrono::DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 6, 10, 12, 0, 0)
            .single()
            .expect("valid local datetime")
    }

    #[test]
    fn schedule_delay_is_positive() {
        let target = NaiveTime::from_hms_opt(4, 30, 0).expect("valid time");
        let delay = seconds_until_next_run(target).expect("delay computed");

        assert!(delay.as_secs() > 0);
    }

    #[test]
    fn upcoming_time_runs_today() {
        let target = NaiveTime::from_hms_opt(23, 0, 0).expect("valid time");
        let next = next_run_after(local_noon(), target).expect("next run");

        assert_eq!(next.date_naive().to_string(), "2024-06-10");
    }

    #[test]
    fn passed_time_rolls_to_tomorrow() {
        let target = NaiveTime::from_hms_opt(4, 30, 0).expect("valid time");
        let next = next_run_after(local_noon(), target).expect("next run");

        assert_eq!(next.date_naive().to_string(), "2024-06-11");
    }
}

//! Daily scheduling in local wall-clock time.

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use std::error::Error;
use std::future::Future;
use std::time::Duration as StdDuration;
use tracing::{error, info, instrument};

/// Next occurrence of `at` strictly after `now`.
pub fn next_run(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now { today } else { today + Duration::days(1) }
}

/// How long to sleep from `now` until the next `at`.
pub fn delay_until(now: NaiveDateTime, at: NaiveTime) -> StdDuration {
    (next_run(now, at) - now).to_std().unwrap_or(StdDuration::ZERO)
}

/// Run `job` every day at `at` (local time), forever.
///
/// With `run_now` the job also runs once immediately. A failing run is logged
/// and the loop waits for the next slot.
#[instrument(level = "info", skip_all, fields(at = %at.format("%H:%M"), run_now = run_now))]
pub async fn run_daily<F, Fut>(at: NaiveTime, run_now: bool, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), Box<dyn Error>>>,
{
    if run_now {
        info!("Running job immediately");
        if let Err(e) = job().await {
            error!(error = %e, "Scheduled job failed");
        }
    }

    loop {
        let now = Local::now().naive_local();
        let next = next_run(now, at);
        info!(next = %next.format("%Y-%m-%d %H:%M"), "Waiting for next run");
        tokio::time::sleep(delay_until(now, at)).await;

        info!("Running scheduled job");
        match job().await {
            Ok(()) => info!("Scheduled job finished"),
            Err(e) => error!(error = %e, "Scheduled job failed"),
        }
    }
}

use crate::TaskStatus;
use chrono::{DateTime, Utc};

/// Shown for unfinished work past its end date, so "overdue" never reads as "done".
pub const OVERDUE_PROGRESS: u8 = 90;

/// Display progress (0..=100) for a task from its status and schedule window.
///
/// The checks run in a fixed order: terminal statuses first, then "before
/// start", then "after end", then linear interpolation. A zero-length window
/// only reaches the interpolation step when `now` sits exactly on it, and
/// that case reports 100.
pub fn task_progress(
    status: TaskStatus,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> u8 {
    match status {
        TaskStatus::Completed => return 100,
        TaskStatus::NotStarted => return 0,
        TaskStatus::InProgress | TaskStatus::OnHold => {}
    }

    if now < start {
        return 0;
    }
    if now > end {
        return OVERDUE_PROGRESS;
    }

    let span = (end - start).num_milliseconds();
    if span <= 0 {
        return 100;
    }
    let elapsed = (now - start).num_milliseconds();
    let percent = (100.0 * elapsed as f64 / span as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

//! Human-readable rendering of durations and job status.

use std::time::Duration;

use pregen_scheduler::{JobStatus, JobSummary};
use pregen_state::JobState;

/// `1h 2m 3s`, `2m 3s`, or `3s`.
pub fn duration(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

/// Remaining time, or a dash when unknown.
pub fn eta(eta: Option<Duration>) -> String {
    eta.map_or_else(|| "—".to_string(), duration)
}

pub fn status(s: &JobStatus) -> String {
    let rate = if s.rate > 0.0 {
        format!("{:.1}/s", s.rate)
    } else {
        "—".to_string()
    };
    let paused = match (s.manual_paused, s.guard_paused) {
        (true, _) => " [paused]",
        (false, true) => " [throttled]",
        (false, false) => "",
    };
    [
        format!(
            "{} {} {}/{} ({:.2}%){paused}",
            s.world, s.shape, s.done, s.total, s.percent
        ),
        format!(
            "  rate {rate}  eta {}  in-flight {}  queued {}",
            eta(s.eta),
            s.in_flight,
            s.queue_depth
        ),
        format!(
            "  tick {:.2}ms  factor {:.2}  skipped {}  errors {}  elapsed {}",
            s.tick_ms,
            s.factor,
            s.skipped,
            s.errors,
            duration(s.elapsed)
        ),
    ]
    .join("\n")
}

pub fn summary(s: &JobSummary) -> String {
    format!(
        "{} {}: {}/{} done, {} skipped, {} errors in {}",
        s.world,
        s.shape,
        s.done,
        s.total,
        s.skipped,
        s.errors,
        duration(s.elapsed)
    )
}

/// One-screen description of a persisted snapshot.
pub fn snapshot(state: &JobState, total: u64, age: Duration) -> String {
    let c = &state.cursor;
    let finished = if c.finished { " finished" } else { "" };
    [
        format!("world    {}", state.world_id),
        format!("starter  {}", state.starter_id.as_deref().unwrap_or("-")),
        format!("area     {} ({total} chunks)", state.area.name()),
        format!(
            "progress {}/{total}  skipped {}  errors {}",
            state.done, state.skipped, state.errors
        ),
        format!(
            "cursor   region ({}, {}) local ({}, {}){finished}",
            c.region_x, c.region_z, c.local_x, c.local_z
        ),
        format!("started  {} ago", duration(age)),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(duration(Duration::from_secs(0)), "0s");
        assert_eq!(duration(Duration::from_secs(59)), "59s");
        assert_eq!(duration(Duration::from_secs(123)), "2m 3s");
        assert_eq!(duration(Duration::from_secs(3723)), "1h 2m 3s");
        assert_eq!(duration(Duration::from_secs(3600)), "1h 0m 0s");
        assert_eq!(duration(Duration::from_millis(1999)), "1s");
    }

    #[test]
    fn unknown_eta_is_a_dash() {
        assert_eq!(eta(None), "—");
        assert_eq!(eta(Some(Duration::from_secs(61))), "1m 1s");
    }
}

//! Point-in-time view of a generation job.

use std::time::Duration;

use pregen_state::WorldId;
use serde::Serialize;

/// Snapshot returned by `status()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub world: WorldId,
    pub shape: &'static str,
    pub done: u64,
    pub total: u64,
    pub percent: f64,
    /// Chunks per second over the last sampling window.
    pub rate: f64,
    /// `None` until a positive rate has been measured.
    pub eta: Option<Duration>,
    pub in_flight: u32,
    /// Completion plus release backlog.
    pub queue_depth: usize,
    pub factor: f64,
    pub skipped: u64,
    pub errors: u64,
    pub tick_ms: f64,
    pub elapsed: Duration,
    pub manual_paused: bool,
    pub guard_paused: bool,
}

impl JobStatus {
    pub fn is_paused(&self) -> bool {
        self.manual_paused || self.guard_paused
    }
}

/// Percent complete; 100 for an empty area.
pub fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 * 100.0 / total as f64).clamp(0.0, 100.0)
}

/// Time left at `rate` chunks per second.
pub fn eta(done: u64, total: u64, rate: f64) -> Option<Duration> {
    if rate <= 0.0 || !rate.is_finite() {
        return None;
    }
    let left = total.saturating_sub(done) as f64;
    Some(Duration::from_secs((left / rate) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_empty_area_is_complete() {
        assert_eq!(percent(0, 0), 100.0);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(percent(5, 10), 50.0);
        assert_eq!(percent(20, 10), 100.0);
    }

    #[test]
    fn eta_needs_positive_rate() {
        assert_eq!(eta(0, 100, 0.0), None);
        assert_eq!(eta(0, 100, -1.0), None);
        assert_eq!(eta(50, 100, 10.0), Some(Duration::from_secs(5)));
        assert_eq!(eta(150, 100, 10.0), Some(Duration::ZERO));
    }
}

//! Feedback limiter — maps host tick time to a throughput factor.
//!
//! ```text
//! if !enabled:                 factor = cap, paused = false
//! if sample >= hard_pause:     paused = true
//! if paused && sample <= resume: paused = false
//! if paused:                   factor held (clamped)
//! elif sample > target:        factor -= down * dt * (sample / target)
//! else:                        factor += up * dt
//! factor = clamp(factor, min_factor, cap)
//! ```
//!
//! The gap between `resume_ms` and `hard_pause_ms` is the hysteresis band:
//! once paused, samples inside it keep the pause in place.

use std::time::Instant;

use pregen_core::LimiterSettings;
use tracing::{debug, info};

/// Output of one limiter step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterState {
    pub factor: f64,
    pub paused: bool,
}

/// Advance the controller by one sample.
///
/// Pure: depends only on the settings, the previous state, the sample,
/// and the seconds elapsed since the previous sample.
pub fn step(
    settings: &LimiterSettings,
    prev: LimiterState,
    sample_ms: f64,
    dt_secs: f64,
) -> LimiterState {
    if !settings.enabled {
        return LimiterState {
            factor: settings.factor_cap,
            paused: false,
        };
    }
    if !sample_ms.is_finite() {
        return LimiterState {
            factor: clamp_factor(settings, prev.factor),
            paused: prev.paused,
        };
    }

    let dt = dt_secs.max(0.0);
    let mut paused = prev.paused;
    if !paused && sample_ms >= settings.hard_pause_ms {
        paused = true;
    }
    if paused && sample_ms <= settings.resume_ms {
        paused = false;
    }

    if paused {
        return LimiterState {
            factor: clamp_factor(settings, prev.factor),
            paused: true,
        };
    }

    let mut factor = prev.factor;
    if sample_ms > settings.target_ms {
        // Above target the ratio exceeds 1, so the drop is never below the base rate.
        factor -= settings.down_per_second * dt * (sample_ms / settings.target_ms);
    } else {
        factor += settings.up_per_second * dt;
    }

    LimiterState {
        factor: clamp_factor(settings, factor),
        paused: false,
    }
}

/// Clamp into `[min_factor, factor_cap]`, tolerating a cap below the floor.
fn clamp_factor(settings: &LimiterSettings, factor: f64) -> f64 {
    let lo = settings.min_factor.min(settings.factor_cap);
    let hi = settings.factor_cap;
    if factor.is_nan() { hi } else { factor.clamp(lo, hi) }
}

/// Stateful wrapper that tracks sample timing.
#[derive(Debug, Clone)]
pub struct FeedbackLimiter {
    settings: LimiterSettings,
    state: LimiterState,
    last_sample: Option<Instant>,
}

impl FeedbackLimiter {
    pub fn new(settings: LimiterSettings) -> Self {
        let state = LimiterState {
            factor: clamp_factor(&settings, 1.0),
            paused: false,
        };
        Self {
            settings,
            state,
            last_sample: None,
        }
    }

    /// Swap in new settings, keeping the current factor within the new bounds.
    pub fn update(&mut self, settings: LimiterSettings) {
        self.settings = settings;
        self.state.factor = clamp_factor(&self.settings, self.state.factor);
        debug!(factor = self.state.factor, "limiter settings updated");
    }

    /// Feed a tick-time sample taken now.
    pub fn tick(&mut self, sample_ms: f64) -> LimiterState {
        self.tick_at(sample_ms, Instant::now())
    }

    /// Feed a tick-time sample taken at `now`.
    pub fn tick_at(&mut self, sample_ms: f64, now: Instant) -> LimiterState {
        let dt = self
            .last_sample
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f64());
        self.last_sample = Some(now);

        let next = step(&self.settings, self.state, sample_ms, dt);
        if next.paused != self.state.paused {
            if next.paused {
                let threshold = self.settings.hard_pause_ms;
                info!(tick_ms = sample_ms, threshold, "limiter paused generation");
            } else {
                let threshold = self.settings.resume_ms;
                info!(tick_ms = sample_ms, threshold, "limiter resumed generation");
            }
        }
        self.state = next;
        next
    }

    pub fn state(&self) -> LimiterState {
        self.state
    }

    pub fn settings(&self) -> &LimiterSettings {
        &self.settings
    }
}

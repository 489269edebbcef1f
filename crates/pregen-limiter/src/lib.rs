//! pregen-limiter — tick-time feedback control.
//!
//! Turns the host's measured tick time into a throughput factor in
//! `[min_factor, factor_cap]` and a hard-pause flag. The factor climbs
//! slowly (additive increase) while the host is under target and drops
//! quickly, proportionally to the overshoot, when it is over.
//!
//! See [`limiter`] for the exact update rule.

pub mod limiter;

pub use limiter::{step, FeedbackLimiter, LimiterState};

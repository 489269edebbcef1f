//! pregen.toml configuration parser.
//!
//! The raw file ([`PregenConfig`]) has every field optional. [`Settings`]
//! is the resolved, immutable value handed to the scheduler: missing
//! fields take their defaults and out-of-range values are clamped, never
//! rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PregenConfig {
    pub limits: Option<LimitsConfig>,
    pub limiter: Option<LimiterConfig>,
    pub skip: Option<SkipConfig>,
    pub job: Option<JobConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_concurrent: Option<i64>,
    pub dispatch_per_tick: Option<i64>,
    pub complete_per_tick: Option<i64>,
    pub unload_per_tick: Option<i64>,
    pub urgent_requests: Option<bool>,
    /// "none", "request", or "immediate".
    pub unload_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimiterConfig {
    pub enabled: Option<bool>,
    pub target_ms: Option<f64>,
    pub hard_pause_ms: Option<f64>,
    pub resume_ms: Option<f64>,
    pub min_factor: Option<f64>,
    pub factor_cap: Option<f64>,
    pub up_per_second: Option<f64>,
    pub down_per_second: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkipConfig {
    /// "none" or "region".
    pub mode: Option<String>,
    pub region_cache_size: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    pub autosave_seconds: Option<i64>,
    pub auto_resume_on_start: Option<bool>,
    pub log_progress_seconds: Option<i64>,
}

impl PregenConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// A fully populated config holding the default values.
    pub fn scaffold() -> Self {
        let s = Settings::default();
        PregenConfig {
            limits: Some(LimitsConfig {
                max_concurrent: Some(i64::from(s.limits.max_concurrent)),
                dispatch_per_tick: Some(i64::from(s.limits.dispatch_per_tick)),
                complete_per_tick: Some(i64::from(s.limits.complete_per_tick)),
                unload_per_tick: Some(i64::from(s.limits.unload_per_tick)),
                urgent_requests: Some(s.urgent_requests),
                unload_mode: Some(s.unload_mode.as_str().to_string()),
            }),
            limiter: Some(LimiterConfig {
                enabled: Some(s.limiter.enabled),
                target_ms: Some(s.limiter.target_ms),
                hard_pause_ms: Some(s.limiter.hard_pause_ms),
                resume_ms: Some(s.limiter.resume_ms),
                min_factor: Some(s.limiter.min_factor),
                factor_cap: Some(s.limiter.factor_cap),
                up_per_second: Some(s.limiter.up_per_second),
                down_per_second: Some(s.limiter.down_per_second),
            }),
            skip: Some(SkipConfig {
                mode: Some(s.skip_mode.as_str().to_string()),
                region_cache_size: Some(s.region_cache_size as i64),
            }),
            job: Some(JobConfig {
                autosave_seconds: Some(i64::from(s.autosave_seconds)),
                auto_resume_on_start: Some(s.auto_resume_on_start),
                log_progress_seconds: Some(i64::from(s.log_progress_seconds)),
            }),
        }
    }
}

/// What happens to a chunk once the host reports it materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadMode {
    /// Leave it to the host.
    None,
    /// Queue a deferred release request.
    Request,
    /// Release synchronously.
    Immediate,
}

impl UnloadMode {
    /// Lenient parse; anything unrecognized means `Request`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => UnloadMode::None,
            "immediate" => UnloadMode::Immediate,
            _ => UnloadMode::Request,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnloadMode::None => "none",
            UnloadMode::Request => "request",
            UnloadMode::Immediate => "immediate",
        }
    }
}

/// Whether to consult region headers before dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipMode {
    None,
    Region,
}

impl SkipMode {
    /// Lenient parse; anything unrecognized means `Region`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => SkipMode::None,
            _ => SkipMode::Region,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkipMode::None => "none",
            SkipMode::Region => "region",
        }
    }
}

/// Base per-tick caps before the limiter factor is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseLimits {
    pub max_concurrent: u32,
    pub dispatch_per_tick: u32,
    pub complete_per_tick: u32,
    pub unload_per_tick: u32,
}

/// Feedback limiter tuning. Times are tick durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterSettings {
    pub enabled: bool,
    pub target_ms: f64,
    pub hard_pause_ms: f64,
    pub resume_ms: f64,
    pub min_factor: f64,
    pub factor_cap: f64,
    pub up_per_second: f64,
    pub down_per_second: f64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_ms: 25.0,
            hard_pause_ms: 45.0,
            resume_ms: 30.0,
            min_factor: 0.25,
            factor_cap: 1.0,
            up_per_second: 0.40,
            down_per_second: 2.0,
        }
    }
}

/// Resolved scheduler settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub limits: BaseLimits,
    pub urgent_requests: bool,
    pub unload_mode: UnloadMode,
    pub skip_mode: SkipMode,
    /// Resident region headers; 0 disables the skip cache.
    pub region_cache_size: usize,
    pub limiter: LimiterSettings,
    pub autosave_seconds: u32,
    pub auto_resume_on_start: bool,
    /// 0 disables progress logging.
    pub log_progress_seconds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&PregenConfig::default())
    }
}

impl Settings {
    /// Resolve a raw config, applying defaults and clamping.
    pub fn from_config(config: &PregenConfig) -> Self {
        let limits = config.limits.clone().unwrap_or_default();
        let lim = config.limiter.clone().unwrap_or_default();
        let skip = config.skip.clone().unwrap_or_default();
        let job = config.job.clone().unwrap_or_default();
        let d = LimiterSettings::default();

        Settings {
            limits: BaseLimits {
                max_concurrent: clamp_int(
                    "limits.max_concurrent",
                    limits.max_concurrent,
                    768,
                    1,
                    8192,
                ),
                dispatch_per_tick: clamp_int(
                    "limits.dispatch_per_tick",
                    limits.dispatch_per_tick,
                    8192,
                    1,
                    1_000_000,
                ),
                complete_per_tick: clamp_int(
                    "limits.complete_per_tick",
                    limits.complete_per_tick,
                    4096,
                    1,
                    1_000_000,
                ),
                unload_per_tick: clamp_int(
                    "limits.unload_per_tick",
                    limits.unload_per_tick,
                    8192,
                    0,
                    1_000_000,
                ),
            },
            urgent_requests: limits.urgent_requests.unwrap_or(false),
            unload_mode: limits
                .unload_mode
                .as_deref()
                .map_or(UnloadMode::Request, UnloadMode::parse),
            skip_mode: skip.mode.as_deref().map_or(SkipMode::None, SkipMode::parse),
            region_cache_size: clamp_int(
                "skip.region_cache_size",
                skip.region_cache_size,
                1024,
                0,
                100_000,
            ) as usize,
            limiter: LimiterSettings {
                enabled: lim.enabled.unwrap_or(d.enabled),
                target_ms: clamp_f64("limiter.target_ms", lim.target_ms, d.target_ms, 1.0, 49.0),
                hard_pause_ms: clamp_f64(
                    "limiter.hard_pause_ms",
                    lim.hard_pause_ms,
                    d.hard_pause_ms,
                    1.0,
                    200.0,
                ),
                resume_ms: clamp_f64("limiter.resume_ms", lim.resume_ms, d.resume_ms, 1.0, 200.0),
                min_factor: clamp_f64(
                    "limiter.min_factor",
                    lim.min_factor,
                    d.min_factor,
                    0.05,
                    1.0,
                ),
                factor_cap: clamp_f64(
                    "limiter.factor_cap",
                    lim.factor_cap,
                    d.factor_cap,
                    0.05,
                    1.0,
                ),
                up_per_second: clamp_f64(
                    "limiter.up_per_second",
                    lim.up_per_second,
                    d.up_per_second,
                    0.01,
                    10.0,
                ),
                down_per_second: clamp_f64(
                    "limiter.down_per_second",
                    lim.down_per_second,
                    d.down_per_second,
                    0.01,
                    50.0,
                ),
            },
            autosave_seconds: clamp_int("job.autosave_seconds", job.autosave_seconds, 30, 5, 3600),
            auto_resume_on_start: job.auto_resume_on_start.unwrap_or(true),
            log_progress_seconds: clamp_int(
                "job.log_progress_seconds",
                job.log_progress_seconds,
                10,
                0,
                3600,
            ),
        }
    }

    /// Read and resolve a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        Ok(Self::from_config(&PregenConfig::from_file(path)?))
    }
}

fn clamp_int(field: &str, value: Option<i64>, default: u32, min: u32, max: u32) -> u32 {
    let Some(v) = value else {
        return default;
    };
    let clamped = v.clamp(i64::from(min), i64::from(max));
    if clamped != v {
        warn!(field, value = v, clamped, "config value out of range, clamped");
    }
    clamped as u32
}

fn clamp_f64(field: &str, value: Option<f64>, default: f64, min: f64, max: f64) -> f64 {
    let Some(v) = value else {
        return default;
    };
    if v.is_nan() {
        warn!(field, "config value is NaN, using default");
        return default;
    }
    let clamped = v.clamp(min, max);
    if clamped != v {
        warn!(field, value = v, clamped, "config value out of range, clamped");
    }
    clamped
}

//! Capture tuning parsed from environment variables.
//!
//! Every knob has a `DEFAULT_*` constant; unset or unparseable variables fall
//! back to it. The floating-banner thresholds are policy, not contract, so
//! they are configurable along with the timing values.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::time::Duration;

use crate::hide::HideCriteria;

pub const DEFAULT_PRIME_SETTLE_MS: u64 = 300;
pub const DEFAULT_FRAME_SETTLE_MS: u64 = 600;
pub const DEFAULT_HIDE_SETTLE_MS: u64 = 150;
pub const DEFAULT_PRIME_STABLE_STEPS: u32 = 3;
pub const DEFAULT_PRIME_MAX_DISTANCE_PX: f64 = 30_000.0;
pub const DEFAULT_MAX_FRAMES: usize = 50;
pub const DEFAULT_MAX_HEIGHT_PX: u32 = 32_767;
pub const DEFAULT_MAX_PER_WINDOW: usize = 1;
pub const DEFAULT_WINDOW_MS: u64 = 1000;
pub const DEFAULT_SELECTION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HIDE_MIN_Z_INDEX: i32 = 10;
pub const DEFAULT_HIDE_MIN_WIDTH_RATIO: f64 = 0.45;
pub const DEFAULT_HIDE_MAX_TOP_PX: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Wait after each lazy-load priming scroll.
    pub prime_settle: Duration,
    /// Wait after each frame scroll; longer than priming so sticky
    /// transitions finish.
    pub frame_settle: Duration,
    /// Wait after hiding newly matched floating elements, so the page
    /// repaints before the frame is taken.
    pub hide_settle: Duration,
    /// Consecutive unchanged-height observations that end priming.
    pub prime_stable_steps: u32,
    /// Total priming scroll distance cap, CSS px.
    pub prime_max_distance_px: f64,
    pub max_frames: usize,
    /// Stitched output height cap, device px.
    pub max_height_px: u32,
    pub max_per_window: usize,
    pub window: Duration,
    pub selection_timeout: Duration,
    pub hide: HideCriteria,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            prime_settle: Duration::from_millis(DEFAULT_PRIME_SETTLE_MS),
            frame_settle: Duration::from_millis(DEFAULT_FRAME_SETTLE_MS),
            hide_settle: Duration::from_millis(DEFAULT_HIDE_SETTLE_MS),
            prime_stable_steps: DEFAULT_PRIME_STABLE_STEPS,
            prime_max_distance_px: DEFAULT_PRIME_MAX_DISTANCE_PX,
            max_frames: DEFAULT_MAX_FRAMES,
            max_height_px: DEFAULT_MAX_HEIGHT_PX,
            max_per_window: DEFAULT_MAX_PER_WINDOW,
            window: Duration::from_millis(DEFAULT_WINDOW_MS),
            selection_timeout: Duration::from_secs(DEFAULT_SELECTION_TIMEOUT_SECS),
            hide: HideCriteria {
                min_z_index: DEFAULT_HIDE_MIN_Z_INDEX,
                min_width_ratio: DEFAULT_HIDE_MIN_WIDTH_RATIO,
                max_top_px: DEFAULT_HIDE_MAX_TOP_PX,
            },
        }
    }
}

impl CaptureConfig {
    /// Build config from the process environment.
    ///
    /// - `CAPTURE_PRIME_SETTLE_MS`, `CAPTURE_FRAME_SETTLE_MS`, `CAPTURE_HIDE_SETTLE_MS`
    /// - `CAPTURE_PRIME_STABLE_STEPS`, `CAPTURE_PRIME_MAX_DISTANCE_PX`
    /// - `CAPTURE_MAX_FRAMES`, `CAPTURE_MAX_HEIGHT_PX`
    /// - `CAPTURE_MAX_PER_WINDOW`, `CAPTURE_WINDOW_MS`
    /// - `CAPTURE_SELECTION_TIMEOUT_SECS`
    /// - `CAPTURE_HIDE_MIN_Z_INDEX`, `CAPTURE_HIDE_MIN_WIDTH_RATIO`, `CAPTURE_HIDE_MAX_TOP_PX`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).into_iter().next())
    }

    /// Build config from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = &lookup;
        Self {
            prime_settle: Duration::from_millis(env_parse(env, "CAPTURE_PRIME_SETTLE_MS", DEFAULT_PRIME_SETTLE_MS)),
            frame_settle: Duration::from_millis(env_parse(env, "CAPTURE_FRAME_SETTLE_MS", DEFAULT_FRAME_SETTLE_MS)),
            hide_settle: Duration::from_millis(env_parse(env, "CAPTURE_HIDE_SETTLE_MS", DEFAULT_HIDE_SETTLE_MS)),
            prime_stable_steps: env_parse(env, "CAPTURE_PRIME_STABLE_STEPS", DEFAULT_PRIME_STABLE_STEPS).max(1),
            prime_max_distance_px: env_parse(env, "CAPTURE_PRIME_MAX_DISTANCE_PX", DEFAULT_PRIME_MAX_DISTANCE_PX),
            max_frames: env_parse(env, "CAPTURE_MAX_FRAMES", DEFAULT_MAX_FRAMES),
            max_height_px: env_parse(env, "CAPTURE_MAX_HEIGHT_PX", DEFAULT_MAX_HEIGHT_PX),
            max_per_window: env_parse(env, "CAPTURE_MAX_PER_WINDOW", DEFAULT_MAX_PER_WINDOW).max(1),
            window: Duration::from_millis(env_parse(env, "CAPTURE_WINDOW_MS", DEFAULT_WINDOW_MS)),
            selection_timeout: Duration::from_secs(env_parse(
                env,
                "CAPTURE_SELECTION_TIMEOUT_SECS",
                DEFAULT_SELECTION_TIMEOUT_SECS,
            )),
            hide: HideCriteria {
                min_z_index: env_parse(env, "CAPTURE_HIDE_MIN_Z_INDEX", DEFAULT_HIDE_MIN_Z_INDEX),
                min_width_ratio: env_parse(env, "CAPTURE_HIDE_MIN_WIDTH_RATIO", DEFAULT_HIDE_MIN_WIDTH_RATIO),
                max_top_px: env_parse(env, "CAPTURE_HIDE_MAX_TOP_PX", DEFAULT_HIDE_MAX_TOP_PX),
            },
        }
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or(default),
        None => default,
    }
}

//! Shared run control: speed, stop, and liveness flags.
//!
//! One [`ControlState`] is shared between the scheduler loop and the
//! observer surface. All fields are lock-free so control reads and
//! writes never contend with a tick in progress.
//!
//! The speed multiplier is stored in tenths (5..=50 for 0.5x..5.0x) so
//! the loop's sleep arithmetic stays in integers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Notify;

/// Lower bound of the stored multiplier, in tenths (0.5x).
const SPEED_MIN_TENTHS: u64 = 5;
/// Upper bound of the stored multiplier, in tenths (5.0x).
const SPEED_MAX_TENTHS: u64 = 50;
/// Default multiplier, in tenths (1.0x).
const SPEED_DEFAULT_TENTHS: u64 = 10;

/// Shared control flags for a running world.
#[derive(Debug)]
pub struct ControlState {
    base_period_ms: u64,
    speed_tenths: AtomicU64,
    stop_requested: AtomicBool,
    running: AtomicBool,
    /// Wakes the inter-tick sleep early on stop or speed change.
    wake: Notify,
}

impl ControlState {
    /// Control state for a loop with the given base tick period.
    pub const fn new(base_period_ms: u64) -> Self {
        Self {
            base_period_ms,
            speed_tenths: AtomicU64::new(SPEED_DEFAULT_TENTHS),
            stop_requested: AtomicBool::new(false),
            running: AtomicBool::new(false),
            wake: Notify::const_new(),
        }
    }

    /// Set the speed multiplier, clamping to 0.5..=5.0.
    ///
    /// Infinities clamp to the nearest bound like any other
    /// out-of-range value; NaN falls back to the 1.0 default.
    ///
    /// Returns the applied multiplier. Takes effect from the next
    /// inter-tick sleep; an in-flight sleep is re-timed immediately.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_speed(&self, multiplier: f64) -> f64 {
        // Clamped before the cast, so truncation and sign loss cannot
        // occur; NaN is handled first because clamp passes it through.
        let tenths = if multiplier.is_nan() {
            SPEED_DEFAULT_TENTHS
        } else {
            (multiplier.clamp(0.5, 5.0) * 10.0).round() as u64
        };
        let tenths = tenths.clamp(SPEED_MIN_TENTHS, SPEED_MAX_TENTHS);
        self.speed_tenths.store(tenths, Ordering::Release);
        self.wake.notify_waiters();
        Self::tenths_to_multiplier(tenths)
    }

    /// The currently applied speed multiplier.
    pub fn speed(&self) -> f64 {
        Self::tenths_to_multiplier(self.speed_tenths.load(Ordering::Acquire))
    }

    /// The inter-tick sleep at the current speed, in milliseconds.
    pub fn tick_sleep_ms(&self) -> u64 {
        let tenths = self.speed_tenths.load(Ordering::Acquire);
        self.base_period_ms
            .saturating_mul(10)
            .checked_div(tenths)
            .unwrap_or(self.base_period_ms)
    }

    /// Ask the loop to stop after the current agent turn.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// Whether a stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Whether the loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Sleep for the current inter-tick interval, returning early when
    /// a stop or speed change arrives.
    pub(crate) async fn sleep_between_ticks(&self) {
        let sleep_ms = self.tick_sleep_ms();
        tokio::select! {
            () = tokio::time::sleep(std::time::Duration::from_millis(sleep_ms)) => {}
            () = self.wake.notified() => {}
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn tenths_to_multiplier(tenths: u64) -> f64 {
        // tenths is in 5..=50, well within f64's exact integer range.
        tenths as f64 / 10.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn speed_clamps_to_bounds() {
        let control = ControlState::new(10_000);
        assert_eq!(control.set_speed(0.1), 0.5);
        assert_eq!(control.set_speed(9.0), 5.0);
        assert_eq!(control.set_speed(2.0), 2.0);
        assert_eq!(control.speed(), 2.0);
    }

    #[test]
    fn infinities_clamp_and_nan_falls_back_to_default() {
        let control = ControlState::new(10_000);
        assert_eq!(control.set_speed(f64::NAN), 1.0);
        assert_eq!(control.set_speed(f64::INFINITY), 5.0);
        assert_eq!(control.set_speed(f64::NEG_INFINITY), 0.5);
    }

    #[test]
    fn sleep_scales_inversely_with_speed() {
        let control = ControlState::new(10_000);
        assert_eq!(control.tick_sleep_ms(), 10_000);
        control.set_speed(2.0);
        assert_eq!(control.tick_sleep_ms(), 5_000);
        control.set_speed(0.5);
        assert_eq!(control.tick_sleep_ms(), 20_000);
        control.set_speed(5.0);
        assert_eq!(control.tick_sleep_ms(), 2_000);
    }

    #[test]
    fn stop_flag_latches() {
        let control = ControlState::new(1_000);
        assert!(!control.stop_requested());
        control.request_stop();
        assert!(control.stop_requested());
    }
}

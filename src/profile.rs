//! Per-stage wall-time accumulation.
//!
//! `total` covers the whole call including dispatch overhead, so it is
//! always at least the sum of the four stage timers. When no profile is
//! requested the clock is never read.

use std::time::Instant;

/// Wall-clock seconds spent in each phase of one call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Profile {
    pub total: f64,
    pub input_transform: f64,
    pub kernel_transform: f64,
    pub output_transform: f64,
    pub block_multiplication: f64,
}

/// Scope guard accumulating elapsed time into a stage slot on drop, on every
/// exit path.
pub(crate) struct StageTimer<'a> {
    start: Instant,
    slot: &'a mut f64,
}

impl<'a> StageTimer<'a> {
    #[inline]
    pub fn start(slot: &'a mut f64) -> Self {
        Self {
            start: Instant::now(),
            slot,
        }
    }
}

impl Drop for StageTimer<'_> {
    #[inline]
    fn drop(&mut self) {
        *self.slot += self.start.elapsed().as_secs_f64();
    }
}

/// Run `body`, accumulating its duration into `slot` only when `enabled`.
#[inline]
pub(crate) fn time_stage<R>(enabled: bool, slot: &mut f64, body: impl FnOnce() -> R) -> R {
    if enabled {
        let _timer = StageTimer::start(slot);
        body()
    } else {
        body()
    }
}

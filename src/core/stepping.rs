use std::sync::atomic::{AtomicBool, Ordering};

/// Slack that lets fractions of a step which sum to a whole step count as one
const ACCUMULATOR_SLOP: f64 = 1.0e-9;

/// Fixed-timestep accumulator.
///
/// Frame deltas are summed into a remainder; every whole fixed timestep in the
/// remainder is one kernel tick. Kept in `f64` so long runs of small deltas do
/// not drift.
#[derive(Debug, Clone)]
pub struct StepAccumulator {
    fixed_timestep: f64,
    remainder: f64,
}

impl StepAccumulator {
    pub fn new(fixed_timestep: f32) -> Self {
        Self {
            fixed_timestep: fixed_timestep as f64,
            remainder: 0.0,
        }
    }

    #[inline]
    pub fn fixed_timestep(&self) -> f32 {
        self.fixed_timestep as f32
    }

    /// Changes the tick length; time already accumulated is kept
    pub fn set_fixed_timestep(&mut self, fixed_timestep: f32) {
        self.fixed_timestep = fixed_timestep as f64;
    }

    /// Time carried over to the next call
    #[inline]
    pub fn remainder(&self) -> f32 {
        self.remainder as f32
    }

    /// Adds a frame delta and returns how many fixed ticks are now due
    pub fn accumulate(&mut self, dt: f32) -> usize {
        if dt > 0.0 && dt.is_finite() {
            self.remainder += dt as f64;
        }

        let mut ticks = 0;
        while self.remainder + ACCUMULATOR_SLOP >= self.fixed_timestep {
            self.remainder -= self.fixed_timestep;
            ticks += 1;
        }
        if self.remainder < 0.0 {
            self.remainder = 0.0;
        }
        ticks
    }

    pub fn reset(&mut self) {
        self.remainder = 0.0;
    }
}

/// Clears the in-flight flag of an async step when the worker finishes,
/// including by panic
pub(crate) struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    pub(crate) fn new(flag: &'a AtomicBool) -> Self {
        Self { flag }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

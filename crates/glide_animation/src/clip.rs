//! Animation clips
//!
//! A [`Clip`] is the raw A-to-B interpolation state machine: it knows
//! nothing about looping, delays, callbacks or pooling. It is advanced
//! explicitly, one frame at a time, and never allocates while doing so.

use crate::easing::Easing;
use crate::error::{Result, TweenError};
use glide_core::Interpolate;
use std::fmt;
use std::rc::Rc;

/// Interpolation function: `(start, end, shaped_time) -> value`
pub type Interpolator<T> = Rc<dyn Fn(&T, &T, f32) -> T>;

/// Build an [`Interpolator`] from the value type's [`Interpolate`] impl
pub fn lerp_interpolator<T: Interpolate + 'static>() -> Interpolator<T> {
    Rc::new(|a: &T, b: &T, t: f32| a.lerp(b, t))
}

/// Check that a duration is usable by a clip
pub fn validate_duration(duration: f32) -> Result<()> {
    if duration.is_finite() && duration > 0.0 {
        Ok(())
    } else {
        Err(TweenError::InvalidDuration(duration))
    }
}

/// Output of a single [`Clip::advance`] call
#[derive(Clone, Debug, PartialEq)]
pub struct ClipStep<T> {
    /// Interpolated value at the new elapsed time
    pub value: T,
    /// Whether the clip reached its duration
    pub done: bool,
}

/// A single value animation from `start` to `end`
pub struct Clip<T> {
    start: T,
    end: T,
    duration: f32,
    elapsed: f32,
    easing: Easing,
    interpolator: Interpolator<T>,
}

impl<T: Clone> Clip<T> {
    /// Create a clip; fails if `duration` is not positive and finite
    pub fn new(
        start: T,
        end: T,
        duration: f32,
        easing: Easing,
        interpolator: Interpolator<T>,
    ) -> Result<Self> {
        validate_duration(duration)?;
        Ok(Self {
            start,
            end,
            duration,
            elapsed: 0.0,
            easing,
            interpolator,
        })
    }

    /// Advance by `dt` seconds (already scaled by the owner's speed)
    ///
    /// Negative deltas are ignored so elapsed time never runs backwards.
    pub fn advance(&mut self, dt: f32) -> ClipStep<T> {
        if dt > 0.0 {
            self.elapsed += dt;
        }
        ClipStep {
            value: self.sample(),
            done: self.is_done(),
        }
    }

    /// Value at the current elapsed time
    pub fn sample(&self) -> T {
        let shaped = self.easing.apply(self.normalized());
        (self.interpolator)(&self.start, &self.end, shaped)
    }

    /// Elapsed time as a fraction of the duration, clamped to 0.0..=1.0
    pub fn normalized(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Reset elapsed time without touching the configuration
    pub fn restart(&mut self) {
        self.elapsed = 0.0;
    }

    /// Move to an absolute elapsed time; negative times clamp to zero
    pub fn seek(&mut self, elapsed: f32) {
        if elapsed.is_finite() {
            self.elapsed = elapsed.max(0.0);
        }
    }

    /// Jump to the end of the clip
    pub fn finish(&mut self) {
        self.seek(self.elapsed.max(self.duration));
    }

    /// Exchange start and end (ping-pong iterations)
    pub fn swap_endpoints(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn start_value(&self) -> &T {
        &self.start
    }

    pub fn end_value(&self) -> &T {
        &self.end
    }
}

impl<T: fmt::Debug> fmt::Debug for Clip<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("easing", &self.easing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::{EaseMode, Transition};

    fn linear_clip(start: f32, end: f32, duration: f32) -> Clip<f32> {
        Clip::new(start, end, duration, Easing::LINEAR, lerp_interpolator()).unwrap()
    }

    #[test]
    fn test_rejects_bad_durations() {
        for duration in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let clip = Clip::new(0.0_f32, 1.0, duration, Easing::LINEAR, lerp_interpolator());
            assert!(matches!(clip, Err(TweenError::InvalidDuration(_))));
        }
    }

    #[test]
    fn test_single_full_advance_finishes_at_end() {
        let mut clip = linear_clip(0.0, 10.0, 2.0);
        let step = clip.advance(2.0);
        assert!(step.done);
        assert!((step.value - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_quarter_steps() {
        let mut clip = linear_clip(0.0, 10.0, 2.0);
        let expected = [2.5, 5.0, 7.5, 10.0];
        for (i, want) in expected.iter().enumerate() {
            let step = clip.advance(0.5);
            assert!((step.value - want).abs() < 1e-5);
            assert_eq!(step.done, i == 3);
        }
    }

    #[test]
    fn test_overrun_clamps_value() {
        let mut clip = linear_clip(0.0, 1.0, 1.0);
        let step = clip.advance(5.0);
        assert!(step.done);
        assert_eq!(step.value, 1.0);
        assert_eq!(clip.elapsed(), 5.0);
    }

    #[test]
    fn test_negative_dt_is_ignored() {
        let mut clip = linear_clip(0.0, 1.0, 1.0);
        clip.advance(0.5);
        clip.advance(-0.25);
        assert_eq!(clip.elapsed(), 0.5);
    }

    #[test]
    fn test_restart_keeps_configuration() {
        let mut clip = linear_clip(0.0, 4.0, 1.0);
        clip.advance(1.0);
        clip.restart();
        assert_eq!(clip.elapsed(), 0.0);
        assert_eq!(clip.sample(), 0.0);
        assert_eq!(*clip.end_value(), 4.0);
    }

    #[test]
    fn test_deterministic_output() {
        let easing = Easing::new(Transition::Elastic, EaseMode::Out);
        let mut a = Clip::new(0.0_f32, 1.0, 1.0, easing, lerp_interpolator()).unwrap();
        let mut b = Clip::new(0.0_f32, 1.0, 1.0, easing, lerp_interpolator()).unwrap();
        for _ in 0..7 {
            assert_eq!(a.advance(0.13), b.advance(0.13));
        }
    }

    #[test]
    fn test_seek() {
        let mut clip = linear_clip(0.0, 8.0, 2.0);
        clip.seek(1.5);
        assert_eq!(clip.sample(), 6.0);
        clip.seek(-3.0);
        assert_eq!(clip.elapsed(), 0.0);
        clip.finish();
        assert!(clip.is_done());
        assert_eq!(clip.sample(), 8.0);
    }

    #[test]
    fn test_swap_endpoints() {
        let mut clip = linear_clip(0.0, 10.0, 1.0);
        clip.swap_endpoints();
        assert_eq!(clip.advance(0.25).value, 7.5);
    }
}

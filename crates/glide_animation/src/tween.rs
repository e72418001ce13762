//! Tweens: controllable animation handles
//!
//! A [`Tween`] wraps a [`Clip`] with everything a user controls: delay,
//! speed, looping, pause, callbacks, group tags and an optional property
//! binding. Tweens are plain values until they are handed to the
//! [`AnimationRuntime`](crate::runtime::AnimationRuntime), which validates
//! them, registers them as active and advances them once per tick.
//!
//! Lifecycle:
//!
//! ```text
//! Idle -> Configuring -> Running (<-> next loop) -> Completed -> Pooled -> Idle
//!                            \--- cancel ------------------------/
//! ```

use crate::callbacks::{CallbackId, TweenCallbacks};
use crate::clip::{lerp_interpolator, validate_duration, Clip, Interpolator};
use crate::easing::{EaseMode, Easing, Transition};
use crate::error::{Result, TweenError};
use crate::pool::{PoolSet, Poolable, Release};
use glide_core::{Interpolate, Offset, SharedAccessor, TargetRef};
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Combines a captured start value with a relative offset
pub type OffsetFn<T> = Rc<dyn Fn(&T, &T) -> T>;

/// How many times a tween plays
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Loops {
    /// Play `n` times (`n >= 1`)
    Finite(u32),
    /// Repeat until cancelled
    Infinite,
}

impl Loops {
    /// Map a raw loop count, where 0 means infinite
    pub fn from_count(count: u32) -> Self {
        if count == 0 {
            Loops::Infinite
        } else {
            Loops::Finite(count)
        }
    }

    /// Raw loop count, 0 for infinite
    pub fn count(&self) -> u32 {
        match self {
            Loops::Finite(n) => *n,
            Loops::Infinite => 0,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Loops::Infinite)
    }

    /// Whether another iteration follows once `completed` loops have finished
    fn continues_after(&self, completed: u32) -> bool {
        match self {
            Loops::Finite(n) => completed < *n,
            Loops::Infinite => true,
        }
    }
}

impl Default for Loops {
    fn default() -> Self {
        Loops::Finite(1)
    }
}

/// Behaviour at each loop boundary
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LoopMode {
    /// Restart from the start value
    #[default]
    Normal,
    /// Swap start and end every iteration
    PingPong,
}

/// Lifecycle state of a tween
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TweenState {
    /// Fresh from the pool, nothing configured
    #[default]
    Idle,
    /// At least one setter has been called
    Configuring,
    /// Started and being advanced (possibly paused)
    Running,
    /// Finished or cancelled; about to be released
    Completed,
    /// Sitting in a pool
    Pooled,
}

/// Result of one [`Tween::advance`] call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Not running, or paused
    Skipped,
    /// Still consuming the start delay
    Delayed,
    /// A new value was produced
    Progressed,
    /// An iteration finished and the next one began
    Looped(u32),
    /// The final iteration finished
    Completed,
    /// The tween cancelled itself (invalid target)
    Cancelled,
}

impl Advance {
    /// Whether the tween is done and should be released
    pub fn is_finished(&self) -> bool {
        matches!(self, Advance::Completed | Advance::Cancelled)
    }
}

/// A tween's link to a host property
pub struct PropertyBinding<T> {
    pub target: TargetRef,
    pub path: String,
    pub accessor: SharedAccessor<T>,
}

impl<T> Clone for PropertyBinding<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            path: self.path.clone(),
            accessor: Rc::clone(&self.accessor),
        }
    }
}

/// A single controllable value animation
pub struct Tween<T: 'static> {
    from: Option<T>,
    to: Option<T>,
    duration: f32,
    easing: Easing,
    interpolator: Option<Interpolator<T>>,
    offset: Option<OffsetFn<T>>,
    relative: bool,
    loops: Loops,
    loop_mode: LoopMode,
    delay: f32,
    delay_remaining: f32,
    speed_scale: f32,
    paused: bool,
    state: TweenState,
    current_loop: u32,
    groups: SmallVec<[String; 1]>,
    binding: Option<PropertyBinding<T>>,
    cancel_on_invalid_target: Option<bool>,
    clip: Option<Clip<T>>,
    value: Option<T>,
    callbacks: TweenCallbacks<T>,
}

impl<T: 'static> Default for Tween<T> {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            duration: 0.0,
            easing: Easing::LINEAR,
            interpolator: None,
            offset: None,
            relative: false,
            loops: Loops::default(),
            loop_mode: LoopMode::Normal,
            delay: 0.0,
            delay_remaining: 0.0,
            speed_scale: 1.0,
            paused: false,
            state: TweenState::Idle,
            current_loop: 0,
            groups: SmallVec::new(),
            binding: None,
            cancel_on_invalid_target: None,
            clip: None,
            value: None,
            callbacks: TweenCallbacks::new(),
        }
    }
}

impl<T: Interpolate + 'static> Tween<T> {
    /// Unpooled tween using the value type's linear interpolation
    pub fn new() -> Self {
        Self::default().interpolator(lerp_interpolator())
    }
}

impl<T: Clone + 'static> Tween<T> {
    fn touch(&mut self) {
        if self.state == TweenState::Idle {
            self.state = TweenState::Configuring;
        }
    }

    // =========================================================================
    // Builder pattern
    // =========================================================================

    /// Start value (omit to read it from the bound property at start)
    pub fn from(mut self, value: T) -> Self {
        self.touch();
        self.from = Some(value);
        self
    }

    /// End value, or the offset from the start value for relative tweens
    pub fn to(mut self, value: T) -> Self {
        self.touch();
        self.to = Some(value);
        self
    }

    /// Duration of one iteration in seconds (validated at start)
    pub fn duration(mut self, seconds: f32) -> Self {
        self.touch();
        self.duration = seconds;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.touch();
        self.easing = easing;
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.touch();
        self.easing.transition = transition;
        self
    }

    pub fn ease_mode(mut self, mode: EaseMode) -> Self {
        self.touch();
        self.easing.mode = mode;
        self
    }

    /// Use a shared interpolation function
    pub fn interpolator(mut self, interpolator: Interpolator<T>) -> Self {
        self.touch();
        self.interpolator = Some(interpolator);
        self
    }

    /// Use a custom interpolation function
    pub fn interpolate_with(self, f: impl Fn(&T, &T, f32) -> T + 'static) -> Self {
        self.interpolator(Rc::new(f))
    }

    /// Delay in seconds before each iteration (validated at start)
    pub fn delay(mut self, seconds: f32) -> Self {
        self.touch();
        self.delay = seconds;
        self
    }

    /// Time scale applied to every delta (validated at start)
    pub fn speed(mut self, scale: f32) -> Self {
        self.touch();
        self.speed_scale = scale;
        self
    }

    /// Play `count` times; a count of 0 is rejected at start
    pub fn loops(mut self, count: u32) -> Self {
        self.touch();
        self.loops = Loops::Finite(count);
        self
    }

    /// Repeat until cancelled
    pub fn infinite(mut self) -> Self {
        self.touch();
        self.loops = Loops::Infinite;
        self
    }

    pub fn loop_mode(mut self, mode: LoopMode) -> Self {
        self.touch();
        self.loop_mode = mode;
        self
    }

    /// Alias for `loop_mode(LoopMode::PingPong)`
    pub fn ping_pong(self) -> Self {
        self.loop_mode(LoopMode::PingPong)
    }

    /// Tag the tween with a group name
    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.touch();
        self.add_group(name);
        self
    }

    /// Drive a host property
    pub fn bind(
        mut self,
        target: TargetRef,
        path: impl Into<String>,
        accessor: SharedAccessor<T>,
    ) -> Self {
        self.touch();
        self.binding = Some(PropertyBinding {
            target,
            path: path.into(),
            accessor,
        });
        self
    }

    /// Treat the end value as an offset from the captured start value
    pub fn relative(self) -> Self
    where
        T: Offset,
    {
        self.relative_with(|start: &T, delta: &T| start.offset(delta))
    }

    /// Relative tween with a custom offset function
    pub fn relative_with(mut self, f: impl Fn(&T, &T) -> T + 'static) -> Self {
        self.touch();
        self.relative = true;
        self.offset = Some(Rc::new(f));
        self
    }

    /// Cancel instead of skipping when the bound target becomes invalid
    pub fn cancel_on_invalid_target(mut self, cancel: bool) -> Self {
        self.touch();
        self.cancel_on_invalid_target = Some(cancel);
        self
    }

    pub fn on_update(mut self, f: impl FnMut(f32) + 'static) -> Self {
        self.callbacks.add_update(Box::new(f));
        self
    }

    pub fn on_value(mut self, f: impl FnMut(&T) + 'static) -> Self {
        self.callbacks.add_value(Box::new(f));
        self
    }

    pub fn on_loop(mut self, f: impl FnMut(u32) + 'static) -> Self {
        self.callbacks.add_loop(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnMut() + 'static) -> Self {
        self.callbacks.add_complete(Box::new(f));
        self
    }

    // =========================================================================
    // Mutating setters
    // =========================================================================

    /// Configure the core animation in one call
    pub fn configure(
        &mut self,
        start: T,
        end: T,
        duration: f32,
        easing: Easing,
        interpolator: impl Fn(&T, &T, f32) -> T + 'static,
    ) -> Result<&mut Self> {
        validate_duration(duration)?;
        self.touch();
        self.from = Some(start);
        self.to = Some(end);
        self.duration = duration;
        self.easing = easing;
        self.interpolator = Some(Rc::new(interpolator));
        Ok(self)
    }

    /// Set a finite loop count; `count` must be at least 1
    pub fn set_loops(&mut self, count: u32) -> Result<&mut Self> {
        if count < 1 {
            return Err(TweenError::InvalidLoopCount(count));
        }
        self.touch();
        self.loops = Loops::Finite(count);
        Ok(self)
    }

    /// Repeat until cancelled
    pub fn set_infinite_loops(&mut self) -> &mut Self {
        self.touch();
        self.loops = Loops::Infinite;
        self
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) -> &mut Self {
        self.touch();
        self.loop_mode = mode;
        self
    }

    pub fn set_delay(&mut self, seconds: f32) -> Result<&mut Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(TweenError::InvalidDelay(seconds));
        }
        self.touch();
        self.delay = seconds;
        Ok(self)
    }

    pub fn set_speed(&mut self, scale: f32) -> Result<&mut Self> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(TweenError::InvalidSpeedScale(scale));
        }
        self.touch();
        self.speed_scale = scale;
        Ok(self)
    }

    pub fn add_group(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !name.is_empty() && !self.groups.contains(&name) {
            self.groups.push(name);
        }
        self
    }

    /// Add a tracked completion subscriber
    pub fn add_complete_callback(&mut self, f: impl FnMut() + 'static) -> CallbackId {
        self.callbacks.add_complete(Box::new(f))
    }

    pub fn add_update_callback(&mut self, f: impl FnMut(f32) + 'static) -> CallbackId {
        self.callbacks.add_update(Box::new(f))
    }

    pub fn add_value_callback(&mut self, f: impl FnMut(&T) + 'static) -> CallbackId {
        self.callbacks.add_value(Box::new(f))
    }

    pub fn add_loop_callback(&mut self, f: impl FnMut(u32) + 'static) -> CallbackId {
        self.callbacks.add_loop(Box::new(f))
    }

    pub fn remove_callback(&mut self, id: CallbackId) -> bool {
        self.callbacks.remove(id)
    }

    /// Drop every tracked completion subscriber
    pub fn clear_complete_callbacks(&mut self) {
        self.callbacks.clear_complete();
    }

    /// Drop every callback of every kind
    pub fn clear_callbacks(&mut self) {
        self.callbacks.clear();
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Check the configuration without starting
    pub fn validate(&self) -> Result<()> {
        if self.interpolator.is_none() {
            return Err(TweenError::MissingInterpolator);
        }
        validate_duration(self.duration)?;
        if self.to.is_none() {
            return Err(TweenError::MissingEndValue);
        }
        if self.from.is_none() && self.binding.is_none() {
            return Err(TweenError::MissingStartValue);
        }
        if self.relative && self.offset.is_none() {
            return Err(TweenError::MissingOffset);
        }
        if let Loops::Finite(0) = self.loops {
            return Err(TweenError::InvalidLoopCount(0));
        }
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(TweenError::InvalidDelay(self.delay));
        }
        if !self.speed_scale.is_finite() || self.speed_scale < 0.0 {
            return Err(TweenError::InvalidSpeedScale(self.speed_scale));
        }
        if let Some(binding) = &self.binding {
            if !target_is_valid(binding) {
                return Err(TweenError::InvalidTarget(binding.target));
            }
        }
        Ok(())
    }

    /// Validate, resolve start/end values, and enter the running state
    pub(crate) fn begin(&mut self) -> Result<()> {
        self.validate()?;

        let start = match (&self.from, &self.binding) {
            (Some(from), _) => from.clone(),
            (None, Some(binding)) => read_property(binding).ok_or(TweenError::MissingStartValue)?,
            (None, None) => return Err(TweenError::MissingStartValue),
        };
        let to = self.to.clone().ok_or(TweenError::MissingEndValue)?;
        let end = match (&self.offset, self.relative) {
            (Some(offset), true) => offset(&start, &to),
            _ => to,
        };
        let interpolator = self
            .interpolator
            .clone()
            .ok_or(TweenError::MissingInterpolator)?;

        self.clip = Some(Clip::new(
            start,
            end,
            self.duration,
            self.easing,
            interpolator,
        )?);
        self.value = None;
        self.current_loop = 0;
        self.delay_remaining = self.delay;
        self.paused = false;
        self.state = TweenState::Running;
        Ok(())
    }

    /// Reset and start a fresh run with the same configuration
    pub(crate) fn restart(&mut self, clear_callbacks: bool) -> Result<()> {
        if clear_callbacks {
            self.callbacks.clear_complete();
        }
        self.begin()
    }

    pub(crate) fn set_default_cancel_on_invalid_target(&mut self, cancel: bool) {
        if self.cancel_on_invalid_target.is_none() {
            self.cancel_on_invalid_target = Some(cancel);
        }
    }

    /// Advance by one scheduling tick of `dt` seconds
    ///
    /// Time past the end of an iteration carries into the next one, so a
    /// single large delta can cross several loop boundaries.
    pub fn advance(&mut self, dt: f32) -> Advance {
        if self.state != TweenState::Running || self.paused {
            return Advance::Skipped;
        }

        let dt = if dt > 0.0 { dt.min(f32::MAX) } else { 0.0 };
        let mut remaining = (dt * self.speed_scale).min(f32::MAX);
        let mut looped = None;
        loop {
            if self.delay_remaining > 0.0 {
                if remaining < self.delay_remaining {
                    self.delay_remaining -= remaining;
                    self.callbacks.fire_update(dt);
                    return looped.map_or(Advance::Delayed, Advance::Looped);
                }
                remaining -= self.delay_remaining;
                self.delay_remaining = 0.0;
            }

            let (step, overflow) = match self.clip.as_mut() {
                Some(clip) => {
                    let step = clip.advance(remaining);
                    (step, clip.elapsed() - clip.duration())
                }
                None => return Advance::Skipped,
            };

            let wraps = step.done
                && overflow > 0.0
                && self.loops.continues_after(self.current_loop + 1);
            if wraps {
                // Show the boundary value when the next iteration waits on a delay
                if self.delay > 0.0 && !self.publish(step.value) {
                    return Advance::Cancelled;
                }
                self.current_loop += 1;
                self.wrap();
                self.callbacks.fire_loop(self.current_loop);
                remaining = self.skip_cycles(overflow);
                looped = Some(self.current_loop);
                continue;
            }

            let done = step.done;
            if !self.publish(step.value) {
                return Advance::Cancelled;
            }
            self.callbacks.fire_update(dt);

            if !done {
                return looped.map_or(Advance::Progressed, Advance::Looped);
            }

            self.current_loop += 1;
            if self.loops.continues_after(self.current_loop) {
                self.wrap();
                self.callbacks.fire_loop(self.current_loop);
                return Advance::Looped(self.current_loop);
            }

            self.finish();
            return Advance::Completed;
        }
    }

    /// Apply a value and notify value subscribers
    ///
    /// Returns false if the tween cancelled itself instead.
    fn publish(&mut self, value: T) -> bool {
        if !self.apply(&value) {
            self.state = TweenState::Completed;
            return false;
        }
        self.callbacks.fire_value(&value);
        self.value = Some(value);
        true
    }

    /// Jump over whole iterations covered by `overflow` and return what is left
    ///
    /// A finite tween always keeps its last iteration so it completes through
    /// the normal path. Skipped iterations report a single loop event.
    fn skip_cycles(&mut self, overflow: f32) -> f32 {
        let cycle = self.cycle_length();
        if cycle <= 0.0 || overflow < cycle {
            return overflow;
        }

        let covered = (overflow / cycle).floor() as u64;
        let skip = match self.loops {
            Loops::Finite(n) => {
                covered.min(u64::from(n.saturating_sub(self.current_loop.saturating_add(1))))
            }
            Loops::Infinite => covered,
        };
        if skip == 0 {
            return overflow;
        }

        if self.loop_mode == LoopMode::PingPong && skip % 2 == 1 {
            if let Some(clip) = self.clip.as_mut() {
                clip.swap_endpoints();
            }
        }
        self.current_loop = self
            .current_loop
            .saturating_add(u32::try_from(skip).unwrap_or(u32::MAX));
        self.callbacks.fire_loop(self.current_loop);

        if skip == covered {
            overflow % cycle
        } else {
            overflow - skip as f32 * cycle
        }
    }

    /// Reset the clip for the next iteration
    fn wrap(&mut self) {
        if let Some(clip) = self.clip.as_mut() {
            clip.restart();
            if self.loop_mode == LoopMode::PingPong {
                clip.swap_endpoints();
            }
        }
        self.delay_remaining = self.delay;
    }

    fn finish(&mut self) {
        self.state = TweenState::Completed;
        self.callbacks.fire_complete();
        self.callbacks.clear_complete();
    }

    /// Write a value to the bound property
    ///
    /// Returns false when the target is invalid and the tween is set to
    /// cancel itself in that case.
    fn apply(&self, value: &T) -> bool {
        let Some(binding) = &self.binding else {
            return true;
        };

        if !target_is_valid(binding) {
            if self.cancel_on_invalid_target.unwrap_or(false) {
                tracing::debug!(
                    "Tween: target {:?} invalid, cancelling ({})",
                    binding.target,
                    binding.path
                );
                return false;
            }
            tracing::debug!(
                "Tween: target {:?} invalid, skipping apply of {}",
                binding.target,
                binding.path
            );
            return true;
        }

        match binding.accessor.try_borrow_mut() {
            Ok(mut accessor) => accessor.set(binding.target, &binding.path, value.clone()),
            Err(_) => tracing::warn!(
                "Tween: accessor for {:?} already borrowed, skipping apply of {}",
                binding.target,
                binding.path
            ),
        }
        true
    }

    /// Stop playback without completion callbacks
    pub fn cancel(&mut self) {
        if matches!(self.state, TweenState::Running | TweenState::Configuring) {
            self.state = TweenState::Completed;
        }
    }

    /// Jump to the end of the final iteration, apply it and complete
    pub fn complete(&mut self) {
        if self.state != TweenState::Running {
            return;
        }
        if let Some(clip) = self.clip.as_mut() {
            if let (LoopMode::PingPong, Loops::Finite(n)) = (self.loop_mode, self.loops) {
                // The last iteration runs reversed when its index is odd
                let last = n.saturating_sub(1);
                if (last - self.current_loop.min(last)) % 2 == 1 {
                    clip.swap_endpoints();
                }
            }
            clip.finish();
        }
        self.delay_remaining = 0.0;
        if let Some(value) = self.clip.as_ref().map(Clip::sample) {
            // Cancel-on-invalid does not apply when jumping to the end
            let _ = self.apply(&value);
            self.callbacks.fire_value(&value);
            self.value = Some(value);
        }
        if let Loops::Finite(n) = self.loops {
            self.current_loop = n;
        }
        self.finish();
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> TweenState {
        self.state
    }

    /// Started and not yet completed (paused tweens are still active)
    pub fn is_active(&self) -> bool {
        self.state == TweenState::Running
    }

    /// Active and not paused
    pub fn is_running(&self) -> bool {
        self.is_active() && !self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_complete(&self) -> bool {
        self.state == TweenState::Completed
    }

    /// Whether the start delay of the current iteration is still pending
    pub fn is_delayed(&self) -> bool {
        self.delay_remaining > 0.0
    }

    /// Last value produced, if any
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn clip(&self) -> Option<&Clip<T>> {
        self.clip.as_ref()
    }

    pub fn get_duration(&self) -> f32 {
        self.duration
    }

    pub fn get_delay(&self) -> f32 {
        self.delay
    }

    pub fn get_speed(&self) -> f32 {
        self.speed_scale
    }

    pub fn get_easing(&self) -> Easing {
        self.easing
    }

    pub fn get_loops(&self) -> Loops {
        self.loops
    }

    pub fn get_loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn start_value(&self) -> Option<&T> {
        self.from.as_ref()
    }

    pub fn end_value(&self) -> Option<&T> {
        self.to.as_ref()
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn has_interpolator(&self) -> bool {
        self.interpolator.is_some()
    }

    /// Number of iterations finished so far
    pub fn current_loop(&self) -> u32 {
        self.current_loop
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn binding(&self) -> Option<&PropertyBinding<T>> {
        self.binding.as_ref()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    fn cycle_length(&self) -> f32 {
        self.duration + self.delay
    }

    /// `(duration + delay) * loops`, or infinity for infinite loops
    pub fn total_duration(&self) -> f32 {
        match self.loops {
            Loops::Finite(n) => self.cycle_length() * n.max(1) as f32,
            Loops::Infinite => f32::INFINITY,
        }
    }

    /// Time spent in the current iteration, delay included
    fn cycle_elapsed(&self) -> f32 {
        let delay_spent = (self.delay - self.delay_remaining).max(0.0);
        let clip_elapsed = self
            .clip
            .as_ref()
            .map_or(0.0, |clip| clip.elapsed().min(clip.duration()));
        delay_spent + clip_elapsed
    }

    /// Scaled time played across all iterations
    pub fn elapsed(&self) -> f32 {
        match self.state {
            TweenState::Completed if !self.loops.is_infinite() => self.total_duration(),
            TweenState::Running | TweenState::Completed => {
                self.current_loop as f32 * self.cycle_length() + self.cycle_elapsed()
            }
            _ => 0.0,
        }
    }

    /// Fraction of the whole run played, 0.0..=1.0
    ///
    /// Infinite tweens report progress through the current iteration.
    pub fn progress(&self) -> f32 {
        let total = self.total_duration();
        if total.is_infinite() {
            let cycle = self.cycle_length();
            if cycle <= 0.0 {
                return 0.0;
            }
            return (self.cycle_elapsed() / cycle).clamp(0.0, 1.0);
        }
        if total <= 0.0 {
            return 0.0;
        }
        (self.elapsed() / total).clamp(0.0, 1.0)
    }

    /// Time left until completion, infinity for infinite tweens
    pub fn remaining(&self) -> f32 {
        if self.loops.is_infinite() {
            return f32::INFINITY;
        }
        (self.total_duration() - self.elapsed()).max(0.0)
    }
}

fn target_is_valid<T>(binding: &PropertyBinding<T>) -> bool {
    match binding.accessor.try_borrow() {
        Ok(accessor) => accessor.is_valid(binding.target),
        Err(_) => {
            tracing::warn!(
                "Tween: accessor for {:?} busy, assuming target valid",
                binding.target
            );
            true
        }
    }
}

fn read_property<T>(binding: &PropertyBinding<T>) -> Option<T> {
    match binding.accessor.try_borrow() {
        Ok(accessor) => accessor.get(binding.target, &binding.path),
        Err(_) => None,
    }
}

impl<T: 'static> Poolable for Tween<T> {
    fn reset(&mut self) {
        self.from = None;
        self.to = None;
        self.duration = 0.0;
        self.easing = Easing::LINEAR;
        self.interpolator = None;
        self.offset = None;
        self.relative = false;
        self.loops = Loops::default();
        self.loop_mode = LoopMode::Normal;
        self.delay = 0.0;
        self.delay_remaining = 0.0;
        self.speed_scale = 1.0;
        self.paused = false;
        self.current_loop = 0;
        self.groups.clear();
        self.binding = None;
        self.cancel_on_invalid_target = None;
        self.clip = None;
        self.value = None;
        self.callbacks.clear();
        self.state = TweenState::Pooled;
    }

    fn is_released(&self) -> bool {
        self.state == TweenState::Pooled
    }

    fn revive(&mut self) {
        self.state = TweenState::Idle;
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Tween<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween")
            .field("state", &self.state)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("duration", &self.duration)
            .field("easing", &self.easing)
            .field("loops", &self.loops)
            .field("loop_mode", &self.loop_mode)
            .field("delay", &self.delay)
            .field("speed_scale", &self.speed_scale)
            .field("paused", &self.paused)
            .field("current_loop", &self.current_loop)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Type-erased handle
// ============================================================================

/// Object-safe view of a tween, used by the registry and sequences
pub trait Animation: Any {
    fn advance(&mut self, dt: f32) -> Advance;
    fn state(&self) -> TweenState;
    fn is_paused(&self) -> bool;
    fn pause(&mut self);
    fn resume(&mut self);
    fn cancel(&mut self);
    fn complete(&mut self);
    fn validate(&self) -> Result<()>;
    fn begin(&mut self, cancel_on_invalid_target: bool) -> Result<()>;
    fn restart(&mut self, clear_callbacks: bool) -> Result<()>;
    fn groups(&self) -> &[String];
    fn remove_group(&mut self, name: &str) -> bool;
    fn clear_groups(&mut self);
    fn target(&self) -> Option<TargetRef>;
    fn property_path(&self) -> Option<&str>;
    fn total_duration(&self) -> f32;
    fn progress(&self) -> f32;
    fn remaining(&self) -> f32;
    fn elapsed(&self) -> f32;
    fn current_loop(&self) -> u32;
    fn set_looping(&mut self, count: u32, mode: LoopMode) -> Result<()>;
    /// Return the handle to its type's pool
    fn release_into(self: Box<Self>, pools: &mut PoolSet) -> Release;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Clone + 'static> Animation for Tween<T> {
    fn advance(&mut self, dt: f32) -> Advance {
        Tween::advance(self, dt)
    }

    fn state(&self) -> TweenState {
        self.state
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn pause(&mut self) {
        Tween::pause(self)
    }

    fn resume(&mut self) {
        Tween::resume(self)
    }

    fn cancel(&mut self) {
        Tween::cancel(self)
    }

    fn complete(&mut self) {
        Tween::complete(self)
    }

    fn validate(&self) -> Result<()> {
        Tween::validate(self)
    }

    fn begin(&mut self, cancel_on_invalid_target: bool) -> Result<()> {
        self.set_default_cancel_on_invalid_target(cancel_on_invalid_target);
        Tween::begin(self)
    }

    fn restart(&mut self, clear_callbacks: bool) -> Result<()> {
        Tween::restart(self, clear_callbacks)
    }

    fn groups(&self) -> &[String] {
        &self.groups
    }

    fn remove_group(&mut self, name: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g != name);
        self.groups.len() != before
    }

    fn clear_groups(&mut self) {
        self.groups.clear();
    }

    fn target(&self) -> Option<TargetRef> {
        self.binding.as_ref().map(|b| b.target)
    }

    fn property_path(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.path.as_str())
    }

    fn total_duration(&self) -> f32 {
        Tween::total_duration(self)
    }

    fn progress(&self) -> f32 {
        Tween::progress(self)
    }

    fn remaining(&self) -> f32 {
        Tween::remaining(self)
    }

    fn elapsed(&self) -> f32 {
        Tween::elapsed(self)
    }

    fn current_loop(&self) -> u32 {
        self.current_loop
    }

    fn set_looping(&mut self, count: u32, mode: LoopMode) -> Result<()> {
        self.set_loops(count)?;
        self.set_loop_mode(mode);
        Ok(())
    }

    fn release_into(self: Box<Self>, pools: &mut PoolSet) -> Release {
        pools.release::<Tween<T>>(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glide_core::{PropertyAccessor, PropertyStore};
    use std::cell::{Cell, RefCell};

    fn started(tween: Tween<f32>) -> Tween<f32> {
        let mut tween = tween;
        tween.begin().unwrap();
        tween
    }

    #[test]
    fn test_configure_rejects_bad_duration() {
        let mut tween = Tween::<f32>::default();
        let err = tween
            .configure(0.0, 1.0, 0.0, Easing::LINEAR, |a, b, t| a + (b - a) * t)
            .unwrap_err();
        assert_eq!(err, TweenError::InvalidDuration(0.0));
        assert_eq!(tween.state(), TweenState::Idle);
    }

    #[test]
    fn test_validate_requires_interpolator() {
        let tween = Tween::<f32>::default().from(0.0).to(1.0).duration(1.0);
        assert_eq!(tween.validate(), Err(TweenError::MissingInterpolator));
    }

    #[test]
    fn test_set_loops_rejects_zero_and_keeps_state() {
        let mut tween = Tween::<f32>::new();
        tween.set_loops(3).unwrap();
        assert_eq!(tween.set_loops(0).unwrap_err(), TweenError::InvalidLoopCount(0));
        assert_eq!(tween.get_loops(), Loops::Finite(3));
    }

    #[test]
    fn test_delay_is_consumed_before_clip() {
        let mut tween = started(Tween::<f32>::new().from(0.0).to(10.0).duration(1.0).delay(0.5));

        assert_eq!(tween.advance(0.25), Advance::Delayed);
        assert!(tween.value().is_none());

        // 0.25 left of delay, 0.5 overflows into the clip
        assert_eq!(tween.advance(0.75), Advance::Progressed);
        assert!((tween.value().copied().unwrap() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_update_fires_during_delay() {
        let updates = Rc::new(Cell::new(0));
        let u = updates.clone();
        let mut tween = started(
            Tween::<f32>::new()
                .from(0.0)
                .to(1.0)
                .duration(1.0)
                .delay(1.0)
                .on_update(move |_| u.set(u.get() + 1)),
        );

        tween.advance(0.5);
        tween.advance(0.25);
        assert_eq!(updates.get(), 2);
    }

    #[test]
    fn test_speed_scale() {
        let mut tween = started(Tween::<f32>::new().from(0.0).to(10.0).duration(1.0).speed(2.0));
        tween.advance(0.25);
        assert!((tween.value().copied().unwrap() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_loops_fire_on_loop_between_iterations_only() {
        let loops = Rc::new(RefCell::new(Vec::new()));
        let completes = Rc::new(Cell::new(0));
        let (l, c) = (loops.clone(), completes.clone());
        let mut tween = started(
            Tween::<f32>::new()
                .from(0.0)
                .to(1.0)
                .duration(1.0)
                .loops(3)
                .on_loop(move |i| l.borrow_mut().push(i))
                .on_complete(move || c.set(c.get() + 1)),
        );

        assert_eq!(tween.advance(1.0), Advance::Looped(1));
        assert_eq!(tween.advance(1.0), Advance::Looped(2));
        assert_eq!(tween.advance(1.0), Advance::Completed);

        assert_eq!(*loops.borrow(), vec![1, 2]);
        assert_eq!(completes.get(), 1);
        assert!(tween.is_complete());
        // Completion subscribers are dropped once they have fired
        assert_eq!(tween.callback_count(), 1);
    }

    #[test]
    fn test_overflow_carries_into_next_loop() {
        let mut tween = started(Tween::<f32>::new().from(0.0).to(10.0).duration(1.0).loops(3));

        assert_eq!(tween.advance(1.5), Advance::Looped(1));
        assert!((tween.value().copied().unwrap() - 5.0).abs() < 1e-5);

        assert_eq!(tween.advance(2.0), Advance::Completed);
        assert_eq!(tween.current_loop(), 3);
        assert_eq!(tween.value().copied(), Some(10.0));
    }

    #[test]
    fn test_ping_pong_reverses() {
        let mut tween = started(Tween::<f32>::new().from(0.0).to(10.0).duration(1.0).loops(2).ping_pong());
        tween.advance(1.0);
        tween.advance(0.25);
        assert!((tween.value().copied().unwrap() - 7.5).abs() < 1e-5);
    }

    #[test]
    fn test_huge_delta_on_infinite_tween_returns() {
        let mut tween = started(Tween::<f32>::new().from(0.0).to(1.0).duration(1.0).infinite());

        assert!(matches!(tween.advance(1.0e9), Advance::Looped(_)));
        assert!(tween.is_active());
        assert!(tween.current_loop() > 1_000_000);

        tween.advance(0.5);
        assert!((tween.value().copied().unwrap() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_skipped_cycles_keep_ping_pong_direction() {
        let mut tween = started(
            Tween::<f32>::new()
                .from(0.0)
                .to(10.0)
                .duration(1.0)
                .infinite()
                .ping_pong(),
        );

        // Forward, back, then a quarter of the next forward pass
        assert_eq!(tween.advance(2.25), Advance::Looped(2));
        assert!((tween.value().copied().unwrap() - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_huge_delta_completes_finite_tween() {
        let loops = Rc::new(Cell::new(0));
        let l = loops.clone();
        let mut tween = started(
            Tween::<f32>::new()
                .from(0.0)
                .to(10.0)
                .duration(1.0)
                .loops(3)
                .on_loop(move |_| l.set(l.get() + 1)),
        );

        assert_eq!(tween.advance(f32::INFINITY), Advance::Completed);
        assert_eq!(tween.current_loop(), 3);
        assert_eq!(tween.value().copied(), Some(10.0));
        assert_eq!(loops.get(), 2);

        let mut many = started(Tween::<f32>::new().from(0.0).to(1.0).duration(1.0).loops(u32::MAX));
        assert!(matches!(many.advance(1.0e9), Advance::Looped(_)));
        assert!(many.is_active());
    }

    #[test]
    fn test_paused_tween_does_not_advance() {
        let mut tween = started(Tween::<f32>::new().from(0.0).to(1.0).duration(1.0));
        tween.pause();
        assert_eq!(tween.advance(0.5), Advance::Skipped);
        assert!(tween.is_active());
        assert!(!tween.is_running());

        tween.resume();
        assert_eq!(tween.advance(0.5), Advance::Progressed);
    }

    #[test]
    fn test_cancel_skips_complete_callbacks() {
        let completes = Rc::new(Cell::new(0));
        let c = completes.clone();
        let mut tween = started(
            Tween::<f32>::new()
                .from(0.0)
                .to(1.0)
                .duration(1.0)
                .on_complete(move || c.set(c.get() + 1)),
        );
        tween.pause();
        tween.cancel();
        assert_eq!(tween.state(), TweenState::Completed);
        assert_eq!(completes.get(), 0);
    }

    #[test]
    fn test_complete_jumps_to_end() {
        let completes = Rc::new(Cell::new(0));
        let c = completes.clone();
        let mut tween = started(
            Tween::<f32>::new()
                .from(0.0)
                .to(10.0)
                .duration(1.0)
                .loops(2)
                .ping_pong()
                .on_complete(move || c.set(c.get() + 1)),
        );
        tween.advance(0.1);
        tween.complete();

        // Second iteration of a ping-pong runs back to the start value
        assert_eq!(tween.value().copied(), Some(0.0));
        assert_eq!(completes.get(), 1);
        assert_eq!(tween.progress(), 1.0);
    }

    #[test]
    fn test_progress_and_remaining() {
        let mut tween = started(Tween::<f32>::new().from(0.0).to(1.0).duration(1.0).delay(1.0).loops(2));
        assert_eq!(tween.total_duration(), 4.0);

        tween.advance(1.0);
        assert!((tween.progress() - 0.25).abs() < 1e-5);
        assert!((tween.remaining() - 3.0).abs() < 1e-5);

        tween.advance(1.0);
        assert!((tween.progress() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_infinite_never_completes() {
        let mut tween = started(Tween::<f32>::new().from(0.0).to(1.0).duration(0.5).infinite());
        for _ in 0..100 {
            assert!(!tween.advance(0.5).is_finished());
        }
        assert_eq!(tween.remaining(), f32::INFINITY);
        assert_eq!(tween.current_loop(), 100);
    }

    #[test]
    fn test_relative_reads_start_from_accessor() {
        let store = PropertyStore::<f32>::new().shared();
        let node = store.borrow_mut().spawn();
        store.borrow_mut().insert(node, "x", 5.0);

        let mut tween = started(
            Tween::<f32>::new()
                .to(10.0)
                .duration(1.0)
                .relative()
                .bind(node, "x", store.clone()),
        );
        tween.advance(1.0);

        assert_eq!(store.borrow().get(node, "x"), Some(15.0));
    }

    #[test]
    fn test_invalid_target_skips_or_cancels() {
        let store = PropertyStore::<f32>::new().shared();
        let node = store.borrow_mut().spawn();

        let mut skip = started(
            Tween::<f32>::new()
                .from(0.0)
                .to(1.0)
                .duration(1.0)
                .bind(node, "x", store.clone()),
        );
        let mut cancel = started(
            Tween::<f32>::new()
                .from(0.0)
                .to(1.0)
                .duration(1.0)
                .bind(node, "x", store.clone())
                .cancel_on_invalid_target(true),
        );

        store.borrow_mut().despawn(node);
        assert_eq!(skip.advance(0.5), Advance::Progressed);
        assert!(skip.is_active());
        assert_eq!(cancel.advance(0.5), Advance::Cancelled);
        assert_eq!(store.borrow().write_count(), 0);
    }

    #[test]
    fn test_start_fails_on_dead_target() {
        let store = PropertyStore::<f32>::new().shared();
        let node = store.borrow_mut().spawn();
        store.borrow_mut().despawn(node);

        let mut tween = Tween::<f32>::new()
            .from(0.0)
            .to(1.0)
            .duration(1.0)
            .bind(node, "x", store.clone());
        assert_eq!(tween.begin(), Err(TweenError::InvalidTarget(node)));
    }

    #[test]
    fn test_reset_clears_configuration() {
        let mut tween = started(
            Tween::<f32>::new()
                .from(3.0)
                .to(4.0)
                .duration(2.0)
                .delay(1.0)
                .group("ui")
                .on_complete(|| {}),
        );
        tween.reset();

        assert!(tween.is_released());
        assert!(tween.start_value().is_none());
        assert!(tween.end_value().is_none());
        assert_eq!(tween.get_duration(), 0.0);
        assert_eq!(tween.get_delay(), 0.0);
        assert!(tween.groups().is_empty());
        assert_eq!(tween.callback_count(), 0);
        assert!(!tween.has_interpolator());
    }
}

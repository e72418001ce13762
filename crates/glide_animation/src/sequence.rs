//! Sequence timelines
//!
//! A [`Sequence`] places tweens, intervals and callbacks on a shared
//! timeline. Steps are recorded at start offsets relative to the sequence
//! start; a cursor tracks where the next appended step lands.
//!
//! ```text
//! append(A:1).append(B:2).join(C:0.5)
//!
//!   0         1                   3
//!   |--- A ---|------- B ---------|
//!             |-- C --|
//! ```
//!
//! Child tweens are owned by the sequence, not by the active set. They are
//! started when playback crosses their offset and receive exactly the part
//! of each tick that lies past it.

use crate::error::{Result, TweenError};
use crate::tween::{Animation, LoopMode, Tween};
use slotmap::new_key_type;

new_key_type! {
    /// Handle to a sequence started on the runtime
    pub struct SequenceId;
}

/// Lifecycle state of a sequence
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SequenceState {
    /// Steps can still be added
    #[default]
    Building,
    /// Being played by the runtime
    Running,
    /// Every step finished
    Completed,
}

/// How the most recent step was placed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placement {
    Append,
    Join,
    Insert,
    Prepend,
}

enum Step {
    Tween(Box<dyn Animation>),
    Interval(f32),
    Callback(Box<dyn FnMut()>),
}

impl Step {
    fn duration(&self) -> f32 {
        match self {
            Step::Tween(animation) => animation.total_duration(),
            Step::Interval(seconds) => *seconds,
            Step::Callback(_) => 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepStatus {
    Pending,
    Running,
    Done,
}

struct Entry {
    offset: f32,
    step: Step,
    status: StepStatus,
}

/// A timeline of tweens, intervals and callbacks
#[derive(Default)]
pub struct Sequence {
    entries: Vec<Entry>,
    /// Entry indices sorted by offset, built at start
    order: Vec<usize>,
    cursor: f32,
    last: Option<(usize, Placement)>,
    elapsed: f32,
    paused: bool,
    state: SequenceState,
    cancel_on_invalid_target: bool,
    on_update: Vec<Box<dyn FnMut(f32)>>,
    on_complete: Vec<Box<dyn FnMut()>>,
    /// Tweens turned away by the builders, pooled once the runtime takes the sequence
    rejected: Vec<Box<dyn Animation>>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_building(&self) -> Result<()> {
        if self.state == SequenceState::Building {
            Ok(())
        } else {
            Err(TweenError::InvalidStep(
                "sequence has already started".to_string(),
            ))
        }
    }

    /// Accept a tween as a step, or keep it aside for pooling if rejected
    fn tween_step<T: Clone + 'static>(&mut self, tween: Tween<T>, at: Option<f32>) -> Result<Step> {
        match self.check_tween(&tween, at) {
            Ok(()) => Ok(Step::Tween(Box::new(tween))),
            Err(err) => {
                self.rejected.push(Box::new(tween));
                Err(err)
            }
        }
    }

    fn check_tween<T: Clone + 'static>(&self, tween: &Tween<T>, at: Option<f32>) -> Result<()> {
        self.ensure_building()?;
        if let Some(time) = at {
            check_time(time)?;
        }
        tween
            .validate()
            .map_err(|err| TweenError::InvalidStep(err.to_string()))?;
        if tween.get_loops().is_infinite() {
            return Err(TweenError::InvalidStep(
                "a tween with infinite loops never ends and cannot be sequenced".to_string(),
            ));
        }
        Ok(())
    }

    fn interval_step(&self, seconds: f32) -> Result<Step> {
        self.ensure_building()?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(TweenError::InvalidStep(format!(
                "interval must be finite and non-negative, got {seconds}"
            )));
        }
        Ok(Step::Interval(seconds))
    }

    fn push(&mut self, offset: f32, step: Step, placement: Placement) {
        self.entries.push(Entry {
            offset,
            step,
            status: StepStatus::Pending,
        });
        self.last = Some((self.entries.len() - 1, placement));
    }

    fn place_append(&mut self, step: Step) {
        let offset = self.cursor;
        self.cursor += step.duration();
        self.push(offset, step, Placement::Append);
    }

    fn place_prepend(&mut self, step: Step) {
        let shift = step.duration();
        for entry in &mut self.entries {
            entry.offset += shift;
        }
        self.cursor += shift;
        self.push(0.0, step, Placement::Prepend);
    }

    /// Place a tween at the cursor and advance the cursor past it
    pub fn append<T: Clone + 'static>(&mut self, tween: Tween<T>) -> Result<&mut Self> {
        let step = self.tween_step(tween, None)?;
        self.place_append(step);
        Ok(self)
    }

    /// Run a tween in parallel with the previous step
    ///
    /// On an empty sequence this behaves like [`append`](Self::append).
    pub fn join<T: Clone + 'static>(&mut self, tween: Tween<T>) -> Result<&mut Self> {
        let step = self.tween_step(tween, None)?;
        match self.last {
            Some((index, _)) => {
                let offset = self.entries[index].offset;
                self.push(offset, step, Placement::Join);
            }
            None => self.place_append(step),
        }
        Ok(self)
    }

    /// Place a tween at an absolute time; the cursor does not move
    pub fn insert<T: Clone + 'static>(&mut self, time: f32, tween: Tween<T>) -> Result<&mut Self> {
        let step = self.tween_step(tween, Some(time))?;
        self.push(time, step, Placement::Insert);
        Ok(self)
    }

    /// Place a tween at time zero, shifting everything else later
    pub fn prepend<T: Clone + 'static>(&mut self, tween: Tween<T>) -> Result<&mut Self> {
        let step = self.tween_step(tween, None)?;
        self.place_prepend(step);
        Ok(self)
    }

    /// Leave a gap at the cursor
    pub fn append_interval(&mut self, seconds: f32) -> Result<&mut Self> {
        let step = self.interval_step(seconds)?;
        self.place_append(step);
        Ok(self)
    }

    /// Leave a gap at time zero, shifting everything else later
    pub fn prepend_interval(&mut self, seconds: f32) -> Result<&mut Self> {
        let step = self.interval_step(seconds)?;
        self.place_prepend(step);
        Ok(self)
    }

    /// Fire `f` once when playback reaches the cursor
    pub fn append_callback(&mut self, f: impl FnMut() + 'static) -> Result<&mut Self> {
        self.ensure_building()?;
        self.place_append(Step::Callback(Box::new(f)));
        Ok(self)
    }

    /// Fire `f` once when playback reaches `time`
    pub fn insert_callback(&mut self, time: f32, f: impl FnMut() + 'static) -> Result<&mut Self> {
        self.ensure_building()?;
        check_time(time)?;
        self.push(time, Step::Callback(Box::new(f)), Placement::Insert);
        Ok(self)
    }

    /// Apply loop settings to the most recently added tween
    pub fn set_loops_on_last(&mut self, count: u32, mode: LoopMode) -> Result<&mut Self> {
        self.ensure_building()?;
        let Some((index, placement)) = self.last else {
            return Err(TweenError::InvalidStep("sequence has no steps".to_string()));
        };

        let entry = &mut self.entries[index];
        let Step::Tween(animation) = &mut entry.step else {
            return Err(TweenError::InvalidStep(
                "last step is not a tween".to_string(),
            ));
        };
        let before = animation.total_duration();
        animation.set_looping(count, mode)?;
        let delta = animation.total_duration() - before;

        match placement {
            Placement::Append => self.cursor += delta,
            Placement::Prepend => {
                for (i, entry) in self.entries.iter_mut().enumerate() {
                    if i != index {
                        entry.offset += delta;
                    }
                }
                self.cursor += delta;
            }
            Placement::Join | Placement::Insert => {}
        }
        Ok(self)
    }

    /// Called every tick while the sequence plays
    pub fn on_update(&mut self, f: impl FnMut(f32) + 'static) -> &mut Self {
        self.on_update.push(Box::new(f));
        self
    }

    /// Called once when every step has finished
    pub fn on_complete(&mut self, f: impl FnMut() + 'static) -> &mut Self {
        self.on_complete.push(Box::new(f));
        self
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// `max(offset + duration)` over all steps
    pub fn total_duration(&self) -> f32 {
        self.entries
            .iter()
            .map(|entry| entry.offset + entry.step.duration())
            .fold(0.0, f32::max)
    }

    /// Start offsets in the order steps were added
    pub fn offsets(&self) -> Vec<f32> {
        self.entries.iter().map(|entry| entry.offset).collect()
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn progress(&self) -> f32 {
        let total = self.total_duration();
        if total <= 0.0 {
            return if self.state == SequenceState::Completed { 1.0 } else { 0.0 };
        }
        (self.elapsed / total).clamp(0.0, 1.0)
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // =========================================================================
    // Playback
    // =========================================================================

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Begin playback; steps at offset zero start immediately
    ///
    /// Returns true if the sequence finished on the spot (an empty
    /// sequence, or one made only of zero-length steps).
    pub(crate) fn start(&mut self, cancel_on_invalid_target: bool) -> bool {
        self.cancel_on_invalid_target = cancel_on_invalid_target;
        self.order = (0..self.entries.len()).collect();
        let entries = &self.entries;
        self.order
            .sort_by(|a, b| entries[*a].offset.total_cmp(&entries[*b].offset));
        self.elapsed = 0.0;
        self.paused = false;
        self.state = SequenceState::Running;
        tracing::debug!(
            "Sequence: starting {} steps, total {:.3}s",
            self.entries.len(),
            self.total_duration()
        );
        self.step(0.0)
    }

    /// Advance playback by `dt` seconds; returns true once complete
    pub(crate) fn advance(&mut self, dt: f32) -> bool {
        if self.state != SequenceState::Running || self.paused {
            return false;
        }
        let dt = dt.max(0.0);
        self.elapsed += dt;
        for f in &mut self.on_update {
            f(dt);
        }
        self.step(dt)
    }

    fn step(&mut self, dt: f32) -> bool {
        let elapsed = self.elapsed;
        let cancel_default = self.cancel_on_invalid_target;

        for &index in &self.order {
            let entry = &mut self.entries[index];
            match entry.status {
                StepStatus::Done => {}
                StepStatus::Pending if entry.offset <= elapsed => {
                    let local = elapsed - entry.offset;
                    entry.status = start_step(&mut entry.step, local, cancel_default);
                }
                StepStatus::Pending => {}
                StepStatus::Running => {
                    entry.status = match &mut entry.step {
                        Step::Tween(animation) => {
                            if animation.advance(dt).is_finished() {
                                StepStatus::Done
                            } else {
                                StepStatus::Running
                            }
                        }
                        Step::Interval(seconds) => {
                            if elapsed >= entry.offset + *seconds {
                                StepStatus::Done
                            } else {
                                StepStatus::Running
                            }
                        }
                        Step::Callback(_) => StepStatus::Done,
                    };
                }
            }
        }

        let all_done = self
            .entries
            .iter()
            .all(|entry| entry.status == StepStatus::Done);
        if all_done && elapsed >= self.total_duration() {
            self.finish();
            return true;
        }
        false
    }

    fn finish(&mut self) {
        self.state = SequenceState::Completed;
        tracing::debug!("Sequence: completed after {:.3}s", self.elapsed);
        for f in &mut self.on_complete {
            f();
        }
    }

    /// Stop playback, cancelling running children without completion callbacks
    pub(crate) fn kill(&mut self) {
        for entry in &mut self.entries {
            if let Step::Tween(animation) = &mut entry.step {
                animation.cancel();
            }
            entry.status = StepStatus::Done;
        }
        self.state = SequenceState::Completed;
    }

    /// Number of tweens rejected by the builders and still held
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub(crate) fn take_rejected(&mut self) -> Vec<Box<dyn Animation>> {
        std::mem::take(&mut self.rejected)
    }

    /// Hand back every child tween so it can be pooled
    pub(crate) fn drain_tweens(&mut self) -> Vec<Box<dyn Animation>> {
        self.order.clear();
        let mut tweens = self.take_rejected();
        tweens.extend(self.entries.drain(..).filter_map(|entry| match entry.step {
            Step::Tween(animation) => Some(animation),
            _ => None,
        }));
        tweens
    }
}

fn check_time(time: f32) -> Result<()> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(TweenError::InvalidStep(format!(
            "insert time must be finite and non-negative, got {time}"
        )))
    }
}

/// Start a step whose offset was just crossed, `local` seconds late
fn start_step(step: &mut Step, local: f32, cancel_on_invalid_target: bool) -> StepStatus {
    match step {
        Step::Tween(animation) => {
            if let Err(err) = animation.begin(cancel_on_invalid_target) {
                tracing::warn!("Sequence: step failed to start: {}", err);
                return StepStatus::Done;
            }
            if animation.advance(local).is_finished() {
                StepStatus::Done
            } else {
                StepStatus::Running
            }
        }
        Step::Interval(seconds) => {
            if local >= *seconds {
                StepStatus::Done
            } else {
                StepStatus::Running
            }
        }
        Step::Callback(f) => {
            f();
            StepStatus::Done
        }
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("steps", &self.entries.len())
            .field("offsets", &self.offsets())
            .field("cursor", &self.cursor)
            .field("elapsed", &self.elapsed)
            .field("state", &self.state)
            .field("rejected", &self.rejected.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn tween(duration: f32) -> Tween<f32> {
        Tween::<f32>::new().from(0.0).to(1.0).duration(duration)
    }

    #[test]
    fn test_append_join_offsets() {
        let mut seq = Sequence::new();
        seq.append(tween(1.0))
            .unwrap()
            .append(tween(2.0))
            .unwrap()
            .join(tween(0.5))
            .unwrap();

        assert_eq!(seq.offsets(), vec![0.0, 1.0, 1.0]);
        assert_eq!(seq.total_duration(), 3.0);
        assert_eq!(seq.cursor(), 3.0);
    }

    #[test]
    fn test_insert_keeps_cursor() {
        let mut seq = Sequence::new();
        seq.append(tween(1.0)).unwrap();
        seq.insert(5.0, tween(1.0)).unwrap();

        assert_eq!(seq.cursor(), 1.0);
        assert_eq!(seq.total_duration(), 6.0);
    }

    #[test]
    fn test_prepend_shifts_offsets() {
        let mut seq = Sequence::new();
        seq.append(tween(1.0)).unwrap().append(tween(1.0)).unwrap();
        seq.prepend(tween(0.5)).unwrap();

        assert_eq!(seq.offsets(), vec![0.5, 1.5, 0.0]);
        assert_eq!(seq.cursor(), 2.5);
    }

    #[test]
    fn test_failed_step_keeps_cursor() {
        let mut seq = Sequence::new();
        seq.append(tween(1.0)).unwrap();

        let missing_end = Tween::<f32>::new().from(0.0).duration(1.0);
        let err = seq.append(missing_end).unwrap_err();
        assert!(matches!(err, TweenError::InvalidStep(_)));
        assert!(seq.append(tween(1.0).infinite()).is_err());
        assert!(seq.append_interval(-1.0).is_err());

        assert_eq!(seq.cursor(), 1.0);
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_set_loops_on_last_moves_cursor() {
        let mut seq = Sequence::new();
        seq.append(tween(1.0)).unwrap();
        seq.set_loops_on_last(3, LoopMode::PingPong).unwrap();

        assert_eq!(seq.cursor(), 3.0);
        assert_eq!(seq.total_duration(), 3.0);
        assert!(seq.set_loops_on_last(0, LoopMode::Normal).is_err());
    }

    #[test]
    fn test_interval_only_completes_after_its_length() {
        let completes = Rc::new(Cell::new(0));
        let c = completes.clone();
        let mut seq = Sequence::new();
        seq.append_interval(1.0).unwrap();
        seq.on_complete(move || c.set(c.get() + 1));

        assert!(!seq.start(false));
        for _ in 0..3 {
            assert!(!seq.advance(0.25));
        }
        assert!(seq.advance(0.25));
        assert_eq!(completes.get(), 1);
    }

    #[test]
    fn test_empty_sequence_finishes_on_start() {
        let mut seq = Sequence::new();
        assert!(seq.start(false));
        assert_eq!(seq.state(), SequenceState::Completed);
        assert_eq!(seq.progress(), 1.0);
    }

    #[test]
    fn test_callback_fires_once_at_offset() {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let mut seq = Sequence::new();
        seq.append_interval(0.5)
            .unwrap()
            .append_callback(move || h.set(h.get() + 1))
            .unwrap()
            .append_interval(0.5)
            .unwrap();

        seq.start(false);
        seq.advance(0.25);
        assert_eq!(hits.get(), 0);
        seq.advance(0.5);
        assert_eq!(hits.get(), 1);
        seq.advance(0.5);
        assert_eq!(hits.get(), 1);
        assert_eq!(seq.state(), SequenceState::Completed);
    }

    #[test]
    fn test_building_is_locked_after_start() {
        let mut seq = Sequence::new();
        seq.append_interval(1.0).unwrap();
        seq.start(false);
        assert!(seq.append(tween(1.0)).is_err());
    }
}

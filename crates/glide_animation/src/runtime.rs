//! Animation runtime
//!
//! The explicit context that owns every active tween and sequence and
//! advances them once per host tick.

use crate::config::RuntimeConfig;
use crate::error::{Result, TweenError};
use crate::registry::{Registry, TweenId};
use crate::sequence::{Sequence, SequenceId, SequenceState};
use crate::tween::{Animation, Tween};
use glide_core::{Interpolate, TargetRef};
use slotmap::SlotMap;

/// Drives tweens and sequences from a single thread
pub struct AnimationRuntime {
    config: RuntimeConfig,
    registry: Registry,
    sequences: SlotMap<SequenceId, Sequence>,
    scratch: Vec<TweenId>,
    sequence_scratch: Vec<SequenceId>,
}

impl AnimationRuntime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            registry: Registry::new(config.pool_capacity),
            config,
            sequences: SlotMap::with_key(),
            scratch: Vec::new(),
            sequence_scratch: Vec::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    // =========================================================================
    // Tweens
    // =========================================================================

    /// A pooled tween using the value type's linear interpolation
    pub fn tween<T: Interpolate + 'static>(&mut self) -> Tween<T> {
        self.registry
            .acquire::<T>()
            .interpolator(crate::clip::lerp_interpolator())
    }

    /// A blank pooled tween; an interpolator must be supplied before start
    pub fn acquire<T: Clone + 'static>(&mut self) -> Tween<T> {
        self.registry.acquire::<T>()
    }

    /// Validate a tween and register it as active
    ///
    /// On failure the tween is returned to its pool and never runs.
    pub fn start<T: Clone + 'static>(&mut self, mut tween: Tween<T>) -> Result<TweenId> {
        tween.set_default_cancel_on_invalid_target(self.config.cancel_on_invalid_target);
        if let Err(err) = tween.begin() {
            tracing::debug!("Runtime: tween failed to start: {}", err);
            self.registry.release(Box::new(tween));
            return Err(err);
        }
        let id = self.registry.register_active(Box::new(tween));
        tracing::debug!("Runtime: started tween {:?}", id);
        Ok(id)
    }

    pub fn get<T: Clone + 'static>(&self, id: TweenId) -> Option<&Tween<T>> {
        self.registry.get(id)
    }

    pub fn get_mut<T: Clone + 'static>(&mut self, id: TweenId) -> Option<&mut Tween<T>> {
        self.registry.get_mut(id)
    }

    pub fn is_active(&self, id: TweenId) -> bool {
        self.registry.contains(id)
    }

    fn active_mut(&mut self, id: TweenId) -> Result<&mut (dyn Animation + 'static)> {
        self.registry.animation_mut(id).ok_or(TweenError::NotActive)
    }

    pub fn pause(&mut self, id: TweenId) -> Result<()> {
        self.active_mut(id)?.pause();
        Ok(())
    }

    pub fn resume(&mut self, id: TweenId) -> Result<()> {
        self.active_mut(id)?.resume();
        Ok(())
    }

    pub fn is_paused(&self, id: TweenId) -> bool {
        self.registry
            .animation(id)
            .is_some_and(|animation| animation.is_paused())
    }

    /// Stop a tween without completion callbacks and pool it
    pub fn cancel(&mut self, id: TweenId) -> Result<()> {
        self.active_mut(id)?.cancel();
        self.registry.retire(id);
        tracing::debug!("Runtime: cancelled tween {:?}", id);
        Ok(())
    }

    /// Jump a tween to its end, fire completion and pool it
    pub fn complete(&mut self, id: TweenId) -> Result<()> {
        self.active_mut(id)?.complete();
        self.registry.retire(id);
        Ok(())
    }

    /// Restart an active tween from the beginning, keeping its id
    ///
    /// With `clear_complete_callbacks` the tracked completion subscribers
    /// are dropped first.
    pub fn replay(&mut self, id: TweenId, clear_complete_callbacks: bool) -> Result<()> {
        let animation = self.active_mut(id)?;
        if let Err(err) = animation.restart(clear_complete_callbacks) {
            tracing::debug!("Runtime: replay of {:?} failed: {}", id, err);
            self.registry.retire(id);
            return Err(err);
        }
        self.registry.reindex(id);
        Ok(())
    }

    pub fn progress(&self, id: TweenId) -> Option<f32> {
        self.registry.animation(id).map(|animation| animation.progress())
    }

    pub fn remaining(&self, id: TweenId) -> Option<f32> {
        self.registry.animation(id).map(|animation| animation.remaining())
    }

    pub fn total_duration(&self, id: TweenId) -> Option<f32> {
        self.registry
            .animation(id)
            .map(|animation| animation.total_duration())
    }

    // =========================================================================
    // Groups and bulk operations
    // =========================================================================

    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    pub fn active_count_for_target(&self, target: TargetRef) -> usize {
        self.registry.active_count_for_target(target)
    }

    pub fn find_active(&self, target: TargetRef, path: &str) -> Vec<TweenId> {
        self.registry.find_active(target, path)
    }

    pub fn group_members(&self, name: &str) -> Vec<TweenId> {
        self.registry.group_members(name)
    }

    pub fn active_groups(&self) -> Vec<String> {
        self.registry.active_groups()
    }

    pub fn remove_from_group(&mut self, id: TweenId, name: &str) -> bool {
        self.registry.remove_from_group(id, name)
    }

    pub fn remove_from_all_groups(&mut self, id: TweenId) {
        self.registry.remove_from_all_groups(id)
    }

    pub fn pause_all(&mut self) -> usize {
        for sequence in self.sequences.values_mut() {
            sequence.pause();
        }
        self.registry.pause_all()
    }

    pub fn resume_all(&mut self) -> usize {
        for sequence in self.sequences.values_mut() {
            sequence.resume();
        }
        self.registry.resume_all()
    }

    /// Cancel every tween and sequence
    pub fn kill_all(&mut self) -> usize {
        let ids: Vec<SequenceId> = self.sequences.keys().collect();
        for id in ids {
            self.kill_sequence(id);
        }
        self.registry.kill_all()
    }

    pub fn pause_group(&mut self, name: &str) -> usize {
        self.registry.pause_group(name)
    }

    pub fn resume_group(&mut self, name: &str) -> usize {
        self.registry.resume_group(name)
    }

    /// Cancel every member of a group except the ids in `exclude`
    pub fn kill_group(&mut self, name: &str, exclude: &[TweenId]) -> usize {
        let killed = self.registry.kill_group(name, exclude);
        tracing::debug!("Runtime: killed {} tweens in group {:?}", killed, name);
        killed
    }

    pub fn complete_group(&mut self, name: &str) -> usize {
        self.registry.complete_group(name)
    }

    /// Cancel every tween bound to `target`
    pub fn kill_target(&mut self, target: TargetRef) -> usize {
        self.registry.kill_target(target)
    }

    // =========================================================================
    // Pools
    // =========================================================================

    pub fn pooled_count<T: Clone + 'static>(&self) -> usize {
        self.registry.pooled_count::<T>()
    }

    pub fn clear_pools(&mut self) {
        self.registry.clear_pools();
    }

    // =========================================================================
    // Sequences
    // =========================================================================

    /// Start playing a sequence
    ///
    /// A sequence that finishes immediately (for example an empty one)
    /// fires its completion callbacks here and the returned id is never
    /// active.
    pub fn start_sequence(&mut self, mut sequence: Sequence) -> SequenceId {
        if sequence.state() != SequenceState::Building {
            tracing::warn!("Runtime: sequence was already started, ignoring");
            return SequenceId::default();
        }
        for animation in sequence.take_rejected() {
            self.registry.release(animation);
        }
        if sequence.start(self.config.cancel_on_invalid_target) {
            self.recycle_sequence(sequence);
            return SequenceId::default();
        }
        self.sequences.insert(sequence)
    }

    pub fn sequence(&self, id: SequenceId) -> Option<&Sequence> {
        self.sequences.get(id)
    }

    pub fn is_sequence_active(&self, id: SequenceId) -> bool {
        self.sequences.contains_key(id)
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn pause_sequence(&mut self, id: SequenceId) -> Result<()> {
        self.sequences
            .get_mut(id)
            .ok_or(TweenError::NotActive)?
            .pause();
        Ok(())
    }

    pub fn resume_sequence(&mut self, id: SequenceId) -> Result<()> {
        self.sequences
            .get_mut(id)
            .ok_or(TweenError::NotActive)?
            .resume();
        Ok(())
    }

    /// Stop a sequence without completion callbacks
    pub fn kill_sequence(&mut self, id: SequenceId) -> bool {
        match self.sequences.remove(id) {
            Some(mut sequence) => {
                sequence.kill();
                self.recycle_sequence(sequence);
                true
            }
            None => false,
        }
    }

    fn recycle_sequence(&mut self, mut sequence: Sequence) {
        for animation in sequence.drain_tweens() {
            self.registry.release(animation);
        }
    }

    // =========================================================================
    // Driver
    // =========================================================================

    /// Advance everything by `dt` seconds
    ///
    /// Tweens are advanced over a snapshot of the active set taken before
    /// any of them runs; finished ones are pooled. Sequences follow.
    pub fn tick(&mut self, dt: f32) {
        let dt = self.config.clamp_delta(dt);

        let mut ids = std::mem::take(&mut self.scratch);
        self.registry.snapshot_into(&mut ids);
        for id in &ids {
            if self.registry.advance(*id, dt) {
                tracing::debug!("Runtime: tween {:?} finished", id);
            }
        }
        self.scratch = ids;

        let mut seq_ids = std::mem::take(&mut self.sequence_scratch);
        seq_ids.clear();
        seq_ids.extend(self.sequences.keys());
        for id in &seq_ids {
            let finished = match self.sequences.get_mut(*id) {
                Some(sequence) => sequence.advance(dt),
                None => false,
            };
            if finished {
                if let Some(sequence) = self.sequences.remove(*id) {
                    self.recycle_sequence(sequence);
                }
            }
        }
        self.sequence_scratch = seq_ids;
    }

    /// Whether anything is still playing
    pub fn has_active_animations(&self) -> bool {
        self.registry.active_count() > 0 || !self.sequences.is_empty()
    }

    /// Drop every tween, sequence and pooled handle
    pub fn clear(&mut self) {
        self.kill_all();
        self.registry.clear();
        self.registry.clear_pools();
    }
}

impl Default for AnimationRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AnimationRuntime {
    fn drop(&mut self) {
        let active = self.registry.active_count() + self.sequences.len();
        if active > 0 {
            tracing::trace!("Runtime: dropping with {} active animations", active);
        }
    }
}

//! Active tween registry
//!
//! Owns every started tween, the group index over them, and the pools
//! finished tweens return to. Handles are type-erased behind
//! [`Animation`]; typed access goes through [`Registry::get`].

use crate::pool::{PoolSet, Release};
use crate::tween::{Animation, Tween, TweenState};
use glide_core::TargetRef;
use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a tween registered with the runtime
    pub struct TweenId;
}

type GroupSet = IndexSet<TweenId, FxBuildHasher>;

/// Active set, group index and pools
pub struct Registry {
    active: SlotMap<TweenId, Box<dyn Animation>>,
    groups: FxHashMap<String, GroupSet>,
    pools: PoolSet,
}

impl Registry {
    pub fn new(pool_capacity: usize) -> Self {
        Self {
            active: SlotMap::with_key(),
            groups: FxHashMap::default(),
            pools: PoolSet::new(pool_capacity),
        }
    }

    // =========================================================================
    // Pooling
    // =========================================================================

    /// Take a blank tween from the pool for `T`
    pub fn acquire<T: Clone + 'static>(&mut self) -> Tween<T> {
        self.pools.acquire::<Tween<T>>()
    }

    /// Return a handle to its pool
    pub fn release(&mut self, animation: Box<dyn Animation>) -> Release {
        let outcome = animation.release_into(&mut self.pools);
        match outcome {
            Release::Discarded => {
                tracing::debug!("Registry: pool full, discarding released tween")
            }
            Release::AlreadyReleased => {
                tracing::debug!("Registry: ignoring release of an already pooled tween")
            }
            Release::Retained => {}
        }
        outcome
    }

    /// Free handles retained for value type `T`
    pub fn pooled_count<T: Clone + 'static>(&self) -> usize {
        self.pools.len_of::<Tween<T>>()
    }

    /// Free handles retained across all value types
    pub fn pooled_total(&self) -> usize {
        self.pools.total_len()
    }

    pub fn pool_capacity(&self) -> usize {
        self.pools.capacity()
    }

    pub fn clear_pools(&mut self) {
        self.pools.clear();
    }

    // =========================================================================
    // Active set
    // =========================================================================

    /// Insert a started tween and index its group tags
    pub fn register_active(&mut self, animation: Box<dyn Animation>) -> TweenId {
        let id = self.active.insert(animation);
        if let Some(animation) = self.active.get(id) {
            for name in animation.groups() {
                self.groups.entry(name.clone()).or_default().insert(id);
            }
        }
        id
    }

    /// Remove a tween from the active set and every group, without pooling it
    pub fn take(&mut self, id: TweenId) -> Option<Box<dyn Animation>> {
        let animation = self.active.remove(id)?;
        for name in animation.groups() {
            self.unindex(id, name);
        }
        Some(animation)
    }

    /// Remove a tween from the active set and return it to its pool
    pub fn retire(&mut self, id: TweenId) -> bool {
        match self.take(id) {
            Some(animation) => {
                self.release(animation);
                true
            }
            None => false,
        }
    }

    /// Re-index a tween's groups after its tags changed
    pub(crate) fn reindex(&mut self, id: TweenId) {
        for set in self.groups.values_mut() {
            set.shift_remove(&id);
        }
        self.groups.retain(|_, set| !set.is_empty());
        if let Some(animation) = self.active.get(id) {
            for name in animation.groups() {
                self.groups.entry(name.clone()).or_default().insert(id);
            }
        }
    }

    fn unindex(&mut self, id: TweenId, name: &str) {
        if let Some(set) = self.groups.get_mut(name) {
            set.shift_remove(&id);
            if set.is_empty() {
                self.groups.remove(name);
            }
        }
    }

    /// Drop one group tag from an active tween
    pub fn remove_from_group(&mut self, id: TweenId, name: &str) -> bool {
        let removed = match self.active.get_mut(id) {
            Some(animation) => animation.remove_group(name),
            None => return false,
        };
        if removed {
            self.unindex(id, name);
        }
        removed
    }

    /// Drop every group tag from an active tween
    pub fn remove_from_all_groups(&mut self, id: TweenId) {
        let names: Vec<String> = match self.active.get_mut(id) {
            Some(animation) => {
                let names = animation.groups().to_vec();
                animation.clear_groups();
                names
            }
            None => return,
        };
        for name in &names {
            self.unindex(id, name);
        }
    }

    pub fn contains(&self, id: TweenId) -> bool {
        self.active.contains_key(id)
    }

    pub fn animation(&self, id: TweenId) -> Option<&dyn Animation> {
        self.active.get(id).map(|boxed| boxed.as_ref())
    }

    pub fn animation_mut(&mut self, id: TweenId) -> Option<&mut (dyn Animation + 'static)> {
        self.active.get_mut(id).map(|boxed| boxed.as_mut())
    }

    /// Typed view of an active tween
    pub fn get<T: Clone + 'static>(&self, id: TweenId) -> Option<&Tween<T>> {
        self.active.get(id)?.as_any().downcast_ref::<Tween<T>>()
    }

    pub fn get_mut<T: Clone + 'static>(&mut self, id: TweenId) -> Option<&mut Tween<T>> {
        self.active.get_mut(id)?.as_any_mut().downcast_mut::<Tween<T>>()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Snapshot of active ids in slot order
    pub fn active_ids(&self) -> Vec<TweenId> {
        self.active.keys().collect()
    }

    /// Fill `buf` with the active ids, reusing its allocation
    pub(crate) fn snapshot_into(&self, buf: &mut Vec<TweenId>) {
        buf.clear();
        buf.extend(self.active.keys());
    }

    pub fn active_count_for_target(&self, target: TargetRef) -> usize {
        self.active
            .values()
            .filter(|animation| animation.target() == Some(target))
            .count()
    }

    /// Active tweens driving `path` on `target`
    pub fn find_active(&self, target: TargetRef, path: &str) -> Vec<TweenId> {
        self.active
            .iter()
            .filter(|(_, animation)| {
                animation.target() == Some(target) && animation.property_path() == Some(path)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Snapshot of a group's members in insertion order
    pub fn group_members(&self, name: &str) -> Vec<TweenId> {
        self.groups
            .get(name)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_in_group(&self, id: TweenId, name: &str) -> bool {
        self.groups.get(name).is_some_and(|set| set.contains(&id))
    }

    /// Names of groups with at least one active member, sorted
    pub fn active_groups(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort();
        names
    }

    // =========================================================================
    // Bulk operations
    // =========================================================================

    pub fn pause_all(&mut self) -> usize {
        for animation in self.active.values_mut() {
            animation.pause();
        }
        self.active.len()
    }

    pub fn resume_all(&mut self) -> usize {
        for animation in self.active.values_mut() {
            animation.resume();
        }
        self.active.len()
    }

    /// Cancel and pool every active tween
    pub fn kill_all(&mut self) -> usize {
        let ids = self.active_ids();
        self.kill_each(&ids)
    }

    pub fn pause_group(&mut self, name: &str) -> usize {
        let ids = self.group_members(name);
        for id in &ids {
            if let Some(animation) = self.active.get_mut(*id) {
                animation.pause();
            }
        }
        ids.len()
    }

    pub fn resume_group(&mut self, name: &str) -> usize {
        let ids = self.group_members(name);
        for id in &ids {
            if let Some(animation) = self.active.get_mut(*id) {
                animation.resume();
            }
        }
        ids.len()
    }

    /// Cancel every member of a group except `exclude`
    pub fn kill_group(&mut self, name: &str, exclude: &[TweenId]) -> usize {
        let ids: Vec<TweenId> = self
            .group_members(name)
            .into_iter()
            .filter(|id| !exclude.contains(id))
            .collect();
        self.kill_each(&ids)
    }

    /// Jump every member of a group to its end and fire completion
    pub fn complete_group(&mut self, name: &str) -> usize {
        let ids = self.group_members(name);
        for id in &ids {
            if let Some(animation) = self.active.get_mut(*id) {
                animation.complete();
            }
            self.retire(*id);
        }
        ids.len()
    }

    /// Cancel every tween bound to `target`
    pub fn kill_target(&mut self, target: TargetRef) -> usize {
        let ids: Vec<TweenId> = self
            .active
            .iter()
            .filter(|(_, animation)| animation.target() == Some(target))
            .map(|(id, _)| id)
            .collect();
        self.kill_each(&ids)
    }

    fn kill_each(&mut self, ids: &[TweenId]) -> usize {
        let mut killed = 0;
        for id in ids {
            if let Some(animation) = self.active.get_mut(*id) {
                animation.cancel();
                killed += 1;
            }
            self.retire(*id);
        }
        killed
    }

    /// Advance one tween; retires it if it finished
    pub(crate) fn advance(&mut self, id: TweenId, dt: f32) -> bool {
        let finished = match self.active.get_mut(id) {
            Some(animation) => {
                let step = animation.advance(dt);
                step.is_finished() || animation.state() == TweenState::Completed
            }
            None => return false,
        };
        if finished {
            self.retire(id);
        }
        finished
    }

    /// Cancel and pool everything
    pub fn clear(&mut self) {
        let count = self.kill_all();
        if count > 0 {
            tracing::debug!("Registry: cleared {} active tweens", count);
        }
        self.groups.clear();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(crate::pool::DEFAULT_POOL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(registry: &mut Registry, group: Option<&str>) -> TweenId {
        let mut tween = registry
            .acquire::<f32>()
            .interpolator(crate::clip::lerp_interpolator())
            .from(0.0)
            .to(1.0)
            .duration(1.0);
        if let Some(name) = group {
            tween.add_group(name);
        }
        tween.begin().unwrap();
        registry.register_active(Box::new(tween))
    }

    #[test]
    fn test_register_indexes_groups() {
        let mut registry = Registry::default();
        let a = running(&mut registry, Some("ui"));
        let b = running(&mut registry, Some("ui"));
        running(&mut registry, None);

        assert_eq!(registry.active_count(), 3);
        assert_eq!(registry.group_members("ui"), vec![a, b]);
        assert_eq!(registry.active_groups(), vec!["ui".to_string()]);
    }

    #[test]
    fn test_retire_removes_from_groups_and_pools() {
        let mut registry = Registry::default();
        let a = running(&mut registry, Some("ui"));

        assert!(registry.retire(a));
        assert!(!registry.contains(a));
        assert!(registry.group_members("ui").is_empty());
        assert!(registry.active_groups().is_empty());
        assert_eq!(registry.pooled_count::<f32>(), 1);
        assert!(!registry.retire(a));
    }

    #[test]
    fn test_remove_from_group() {
        let mut registry = Registry::default();
        let a = running(&mut registry, Some("ui"));

        assert!(registry.remove_from_group(a, "ui"));
        assert!(!registry.remove_from_group(a, "ui"));
        assert!(registry.contains(a));
        assert!(!registry.is_in_group(a, "ui"));
        assert!(registry.get::<f32>(a).unwrap().groups().is_empty());
    }

    #[test]
    fn test_kill_group_with_exclusion() {
        let mut registry = Registry::default();
        let a = running(&mut registry, Some("fx"));
        let b = running(&mut registry, Some("fx"));
        let c = running(&mut registry, Some("fx"));
        let d = running(&mut registry, Some("fx"));

        assert_eq!(registry.kill_group("fx", &[b, d]), 2);
        assert!(!registry.contains(a));
        assert!(registry.contains(b));
        assert!(!registry.contains(c));
        assert!(registry.contains(d));
        assert_eq!(registry.group_members("fx"), vec![b, d]);

        assert_eq!(registry.kill_group("fx", &[]), 2);
        assert!(registry.active_groups().is_empty());
    }

    #[test]
    fn test_typed_access() {
        let mut registry = Registry::default();
        let a = running(&mut registry, None);

        assert!(registry.get::<f32>(a).is_some());
        assert!(registry.get::<f64>(a).is_none());
    }
}

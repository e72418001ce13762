//! Animation targets and property access
//!
//! The engine never resolves property paths itself. A host describes the
//! objects it animates with opaque [`TargetRef`]s and exposes their
//! properties through a [`PropertyAccessor`]. The accessor is also asked
//! whether a target is still alive before every write.

use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::rc::Rc;

/// Opaque reference to a host object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetRef(pub u64);

impl TargetRef {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Host capability for reading and writing animated properties
///
/// `path` is whatever the host uses to name a property (`"position:x"`,
/// `"opacity"`, ...). It is passed through untouched.
pub trait PropertyAccessor<T> {
    /// Whether the target still exists and may be written to
    fn is_valid(&self, target: TargetRef) -> bool;

    /// Read the current value of a property
    fn get(&self, target: TargetRef, path: &str) -> Option<T>;

    /// Write a new value to a property
    fn set(&mut self, target: TargetRef, path: &str, value: T);
}

/// Shared, single-threaded handle to a property accessor
pub type SharedAccessor<T> = Rc<RefCell<dyn PropertyAccessor<T>>>;

/// In-memory property host
///
/// Useful for headless playback and tests: targets are plain ids, and
/// properties are stored in a map keyed by `(target, path)`.
#[derive(Debug)]
pub struct PropertyStore<T> {
    values: FxHashMap<(TargetRef, String), T>,
    alive: FxHashSet<TargetRef>,
    next_id: u64,
    writes: usize,
}

impl<T: Clone> PropertyStore<T> {
    pub fn new() -> Self {
        Self {
            values: FxHashMap::default(),
            alive: FxHashSet::default(),
            next_id: 1,
            writes: 0,
        }
    }

    /// Wrap the store so it can be handed to tweens as a [`SharedAccessor`]
    pub fn shared(self) -> Rc<RefCell<Self>>
    where
        T: 'static,
    {
        Rc::new(RefCell::new(self))
    }

    /// Create a new live target
    pub fn spawn(&mut self) -> TargetRef {
        let target = TargetRef(self.next_id);
        self.next_id += 1;
        self.alive.insert(target);
        target
    }

    /// Register an externally chosen target id as alive
    pub fn adopt(&mut self, target: TargetRef) {
        self.next_id = self.next_id.max(target.0 + 1);
        self.alive.insert(target);
    }

    /// Destroy a target; its properties are dropped and later writes are refused
    pub fn despawn(&mut self, target: TargetRef) {
        self.alive.remove(&target);
        self.values.retain(|(t, _), _| *t != target);
    }

    /// Seed a property value without counting it as an animation write
    pub fn insert(&mut self, target: TargetRef, path: &str, value: T) {
        self.values.insert((target, path.to_string()), value);
    }

    /// Current value of a property
    pub fn value(&self, target: TargetRef, path: &str) -> Option<&T> {
        self.values.get(&(target, path.to_string()))
    }

    /// Number of writes performed through [`PropertyAccessor::set`]
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Iterate over every stored property
    pub fn iter(&self) -> impl Iterator<Item = (TargetRef, &str, &T)> {
        self.values.iter().map(|((t, p), v)| (*t, p.as_str(), v))
    }
}

impl<T: Clone> Default for PropertyStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> PropertyAccessor<T> for PropertyStore<T> {
    fn is_valid(&self, target: TargetRef) -> bool {
        self.alive.contains(&target)
    }

    fn get(&self, target: TargetRef, path: &str) -> Option<T> {
        self.value(target, path).cloned()
    }

    fn set(&mut self, target: TargetRef, path: &str, value: T) {
        if !self.alive.contains(&target) {
            tracing::trace!("PropertyStore: dropping write to dead target {:?}", target);
            return;
        }
        self.writes += 1;
        self.values.insert((target, path.to_string()), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_round_trip() {
        let mut store = PropertyStore::<f32>::new();
        let target = store.spawn();

        store.insert(target, "opacity", 0.25);
        assert_eq!(store.get(target, "opacity"), Some(0.25));
        assert_eq!(store.write_count(), 0);

        store.set(target, "opacity", 0.75);
        assert_eq!(store.value(target, "opacity"), Some(&0.75));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_despawned_target_is_invalid() {
        let mut store = PropertyStore::<f32>::new();
        let a = store.spawn();
        let b = store.spawn();
        assert_ne!(a, b);

        store.insert(a, "x", 1.0);
        store.despawn(a);

        assert!(!store.is_valid(a));
        assert!(store.is_valid(b));
        assert_eq!(store.get(a, "x"), None);

        store.set(a, "x", 2.0);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_store_coerces_to_shared_accessor() {
        let store = PropertyStore::<f32>::new().shared();
        let target = store.borrow_mut().spawn();
        let accessor: SharedAccessor<f32> = store.clone();

        accessor.borrow_mut().set(target, "x", 3.0);
        assert_eq!(store.borrow().value(target, "x"), Some(&3.0));
    }

    #[test]
    fn test_adopt_reserves_id() {
        let mut store = PropertyStore::<f32>::new();
        store.adopt(TargetRef::new(10));
        assert!(store.is_valid(TargetRef::new(10)));
        assert_eq!(store.spawn(), TargetRef::new(11));
    }
}

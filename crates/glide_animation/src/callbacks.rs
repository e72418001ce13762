//! Callback lists owned by tweens
//!
//! Callbacks are kept in insertion order and can be removed individually
//! through the [`CallbackId`] returned when they were added.

use smallvec::SmallVec;

/// Identifies a callback registered on a tween
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Called every tick while running, with the unscaled frame delta
pub type UpdateCallback = Box<dyn FnMut(f32)>;
/// Called with each newly computed value
pub type ValueCallback<T> = Box<dyn FnMut(&T)>;
/// Called at each loop boundary with the number of loops completed so far
pub type LoopCallback = Box<dyn FnMut(u32)>;
/// Called once when the animation completes
pub type CompleteCallback = Box<dyn FnMut()>;

/// Ordered list of callbacks of one kind
pub struct CallbackList<F: ?Sized> {
    entries: SmallVec<[(CallbackId, Box<F>); 2]>,
}

impl<F: ?Sized> CallbackList<F> {
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    fn push(&mut self, id: CallbackId, callback: Box<F>) {
        self.entries.push((id, callback));
    }

    fn remove(&mut self, id: CallbackId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate callbacks in registration order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<F>> {
        self.entries.iter_mut().map(|(_, cb)| cb)
    }
}

impl<F: ?Sized> Default for CallbackList<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// All callback lists of a tween
pub struct TweenCallbacks<T> {
    pub(crate) update: CallbackList<dyn FnMut(f32)>,
    pub(crate) value: CallbackList<dyn FnMut(&T)>,
    pub(crate) looped: CallbackList<dyn FnMut(u32)>,
    pub(crate) complete: CallbackList<dyn FnMut()>,
    next_id: u64,
}

impl<T> TweenCallbacks<T> {
    pub fn new() -> Self {
        Self {
            update: CallbackList::new(),
            value: CallbackList::new(),
            looped: CallbackList::new(),
            complete: CallbackList::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> CallbackId {
        self.next_id += 1;
        CallbackId(self.next_id)
    }

    pub fn add_update(&mut self, callback: UpdateCallback) -> CallbackId {
        let id = self.next_id();
        self.update.push(id, callback);
        id
    }

    pub fn add_value(&mut self, callback: ValueCallback<T>) -> CallbackId {
        let id = self.next_id();
        self.value.push(id, callback);
        id
    }

    pub fn add_loop(&mut self, callback: LoopCallback) -> CallbackId {
        let id = self.next_id();
        self.looped.push(id, callback);
        id
    }

    pub fn add_complete(&mut self, callback: CompleteCallback) -> CallbackId {
        let id = self.next_id();
        self.complete.push(id, callback);
        id
    }

    /// Remove a callback from whichever list holds it
    pub fn remove(&mut self, id: CallbackId) -> bool {
        self.update.remove(id)
            || self.value.remove(id)
            || self.looped.remove(id)
            || self.complete.remove(id)
    }

    /// Drop the tracked completion subscribers
    pub fn clear_complete(&mut self) {
        self.complete.clear();
    }

    /// Drop every callback of every kind
    pub fn clear(&mut self) {
        self.update.clear();
        self.value.clear();
        self.looped.clear();
        self.complete.clear();
    }

    pub fn len(&self) -> usize {
        self.update.len() + self.value.len() + self.looped.len() + self.complete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn fire_update(&mut self, dt: f32) {
        for cb in self.update.iter_mut() {
            cb(dt);
        }
    }

    pub(crate) fn fire_value(&mut self, value: &T) {
        for cb in self.value.iter_mut() {
            cb(value);
        }
    }

    pub(crate) fn fire_loop(&mut self, index: u32) {
        for cb in self.looped.iter_mut() {
            cb(index);
        }
    }

    pub(crate) fn fire_complete(&mut self) {
        for cb in self.complete.iter_mut() {
            cb();
        }
    }
}

impl<T> Default for TweenCallbacks<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_fires_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut callbacks = TweenCallbacks::<f32>::new();

        for i in 0..3 {
            let log = log.clone();
            callbacks.add_complete(Box::new(move || log.borrow_mut().push(i)));
        }
        callbacks.fire_complete();

        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_by_id() {
        let hits = Rc::new(RefCell::new(0));
        let mut callbacks = TweenCallbacks::<f32>::new();

        let h = hits.clone();
        let keep = callbacks.add_loop(Box::new(move |_| *h.borrow_mut() += 1));
        let h = hits.clone();
        let drop_me = callbacks.add_loop(Box::new(move |_| *h.borrow_mut() += 10));

        assert!(callbacks.remove(drop_me));
        assert!(!callbacks.remove(drop_me));
        callbacks.fire_loop(1);

        assert_eq!(*hits.borrow(), 1);
        assert_ne!(keep, drop_me);
    }

    #[test]
    fn test_clear_complete_leaves_other_lists() {
        let mut callbacks = TweenCallbacks::<f32>::new();
        callbacks.add_complete(Box::new(|| {}));
        callbacks.add_update(Box::new(|_| {}));

        callbacks.clear_complete();
        assert_eq!(callbacks.len(), 1);
        assert!(callbacks.complete.is_empty());
    }
}

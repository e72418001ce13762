//! Object pooling for tween handles
//!
//! [`Pool`] is a bounded free list for one handle type. [`PoolSet`] keeps
//! one pool per handle type so the registry can recycle tweens of any
//! value type without knowing them up front.

use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};

/// Default number of free handles retained per type
pub const DEFAULT_POOL_CAPACITY: usize = 1000;

/// A handle that can be recycled through a [`Pool`]
pub trait Poolable: Default {
    /// Return every configuration field to its default and mark the handle released
    fn reset(&mut self);

    /// Whether the handle has already been returned to a pool
    fn is_released(&self) -> bool;

    /// Mark a recycled handle as ready for configuration
    fn revive(&mut self);
}

/// What happened to a handle passed to [`Pool::release`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// Reset and kept on the free list
    Retained,
    /// Reset and dropped because the free list was full
    Discarded,
    /// Handle was already released; nothing happened
    AlreadyReleased,
}

/// Bounded free list for one handle type
#[derive(Debug)]
pub struct Pool<H> {
    free: Vec<H>,
    capacity: usize,
    created: usize,
}

impl<H: Poolable> Pool<H> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
            created: 0,
        }
    }

    /// Pop a recycled handle, or construct a new one
    pub fn acquire(&mut self) -> H {
        let mut handle = match self.free.pop() {
            Some(handle) => handle,
            None => {
                self.created += 1;
                H::default()
            }
        };
        handle.revive();
        handle
    }

    /// Reset a handle and keep it for reuse unless the pool is full
    pub fn release(&mut self, mut handle: H) -> Release {
        if handle.is_released() {
            return Release::AlreadyReleased;
        }
        handle.reset();
        if self.free.len() >= self.capacity {
            return Release::Discarded;
        }
        self.free.push(handle);
        Release::Retained
    }

    /// Number of free handles currently retained
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of handles this pool had to construct
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn clear(&mut self) {
        self.free.clear();
    }
}

impl<H: Poolable> Default for Pool<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a pool, for bookkeeping across types
trait ErasedPool {
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_any(&self) -> &dyn Any;
}

impl<H: Poolable + 'static> ErasedPool for Pool<H> {
    fn len(&self) -> usize {
        Pool::len(self)
    }

    fn clear(&mut self) {
        Pool::clear(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One [`Pool`] per handle type
pub struct PoolSet {
    pools: FxHashMap<TypeId, Box<dyn ErasedPool>>,
    capacity: usize,
}

impl PoolSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            pools: FxHashMap::default(),
            capacity,
        }
    }

    /// The pool for handle type `H`, created on first use
    pub fn pool_mut<H: Poolable + 'static>(&mut self) -> &mut Pool<H> {
        let capacity = self.capacity;
        let erased = self
            .pools
            .entry(TypeId::of::<H>())
            .or_insert_with(|| Box::new(Pool::<H>::with_capacity(capacity)));
        match erased.as_any_mut().downcast_mut::<Pool<H>>() {
            Some(pool) => pool,
            None => unreachable!("pool registered under the wrong TypeId"),
        }
    }

    /// The pool for handle type `H`, if one exists
    pub fn pool<H: Poolable + 'static>(&self) -> Option<&Pool<H>> {
        self.pools
            .get(&TypeId::of::<H>())
            .and_then(|pool| pool.as_any().downcast_ref::<Pool<H>>())
    }

    pub fn acquire<H: Poolable + 'static>(&mut self) -> H {
        self.pool_mut::<H>().acquire()
    }

    pub fn release<H: Poolable + 'static>(&mut self, handle: H) -> Release {
        self.pool_mut::<H>().release(handle)
    }

    /// Free handles retained for type `H`
    pub fn len_of<H: Poolable + 'static>(&self) -> usize {
        self.pool::<H>().map_or(0, Pool::len)
    }

    /// Free handles retained across every type
    pub fn total_len(&self) -> usize {
        self.pools.values().map(|pool| pool.len()).sum()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every retained handle
    pub fn clear(&mut self) {
        for pool in self.pools.values_mut() {
            pool.clear();
        }
    }
}

impl Default for PoolSet {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coalescing of style invalidations within one tick.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

/// Instances whose style declaration must be re-evaluated.
///
/// Marking the same key any number of times before the next
/// [`drain`](Self::drain) queues it once, so a burst of synchronous state
/// changes yields exactly one recompute per instance. Keys drain in the
/// order they were first marked. A generation counter bumps on every
/// mutation, for callers that want to detect changes cheaply.
///
/// # Example
///
/// ```rust
/// use understory_class_style::UpdateQueue;
///
/// let mut queue = UpdateQueue::<u32>::new();
/// assert!(queue.mark(7));
/// assert!(queue.mark(3));
/// assert!(!queue.mark(7));
///
/// let order: Vec<_> = queue.drain().collect();
/// assert_eq!(order, [7, 3]);
/// assert!(queue.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct UpdateQueue<K>
where
    K: Copy + Eq + Hash,
{
    pending: Vec<K>,
    queued: HashSet<K>,
    generation: u64,
}

impl<K> Default for UpdateQueue<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> UpdateQueue<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            queued: HashSet::new(),
            generation: 0,
        }
    }

    /// Returns the current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queues `key`. Returns `true` if it was not already queued.
    pub fn mark(&mut self, key: K) -> bool {
        if !self.queued.insert(key) {
            return false;
        }
        self.pending.push(key);
        self.generation = self.generation.wrapping_add(1);
        true
    }

    /// Returns `true` if `key` is queued.
    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.queued.contains(&key)
    }

    /// Returns the number of queued keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops `key` from the queue, e.g. when its instance goes away.
    pub fn remove(&mut self, key: K) -> bool {
        if !self.queued.remove(&key) {
            return false;
        }
        self.pending.retain(|k| *k != key);
        self.generation = self.generation.wrapping_add(1);
        true
    }

    /// Takes every queued key, in first-marked order.
    ///
    /// Keys marked while the returned iterator is alive belong to the next
    /// drain.
    pub fn drain(&mut self) -> alloc::vec::IntoIter<K> {
        self.queued.clear();
        self.generation = self.generation.wrapping_add(1);
        core::mem::take(&mut self.pending).into_iter()
    }
}

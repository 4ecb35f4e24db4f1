//! # Object Pool
//!
//! Fixed-capacity manager of reusable entities with manual reference counting.
//!
//! ```text
//!            allocate                add_reference
//!   Free ──────────────▶ InUse[1] ────────────────▶ InUse[n]
//!    ▲                      │   ◀──────────────────────┘
//!    │       release        │        release (n > 1)
//!    └──────────────────────┘
//!    ▲   (count hits 0)
//!    └──────────── force_release / cleanup (any n)
//! ```
//!
//! ## Thread Safety
//!
//! One `RwLock` covers the free list, the in-use registry, the identity
//! counter and the statistics block. Every mutating operation runs under the
//! write lock as a unit; `statistics` and the read-only accessors take the
//! read lock. Nothing ever waits for capacity: exhaustion is reported
//! immediately.
//!
//! Entity identities and in-use flags live in pool-owned cells, so no entity
//! lock is ever taken under the pool lock. Holders may lock their entity and
//! keep calling into the pool. Allocate resets a recycled entity after the
//! pool lock is dropped.
//!
//! ## Example
//!
//! ```rust
//! use reclaim_core::{BufferEntity, ObjectPool, PoolError};
//!
//! let pool: ObjectPool<BufferEntity> = ObjectPool::new(2);
//!
//! let a = pool.allocate()?;
//! a.lock().write(b"frame");
//! assert!(pool.add_reference(&a));   // second holder
//! assert!(!pool.release(&a));        // one holder left
//! assert!(pool.release(&a));         // back on the free list
//! # Ok::<(), PoolError>(())
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::config::{PoolConfig, ReuseOrder};
use crate::entity::{EntityId, Poolable};
use crate::error::{PoolError, PoolResult};
use crate::guard::PoolGuard;
use crate::handle::{EntityCell, EntityHandle};
use crate::stats::{Counters, PoolStats};
use crate::sync::RwLock;

/// How a successful release left the entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The count hit zero; the entity is back on the free list.
    Returned,
    /// Other holders remain.
    StillShared {
        /// Reference count after this release.
        remaining: usize,
    },
}

/// An in-use entity together with its holder count.
struct Slot<T> {
    cell: Arc<EntityCell<T>>,
    ref_count: usize,
}

/// Everything guarded by the pool lock.
struct PoolState<T> {
    /// Entities with no holders. Reset when they next go out.
    free: VecDeque<Arc<EntityCell<T>>>,
    /// Allocated entities, keyed by identity.
    in_use: HashMap<EntityId, Slot<T>>,
    /// Raw value of the next identity to assign.
    next_id: u64,
    counters: Counters,
}

/// A bounded pool of reusable entities.
///
/// Entities are constructed lazily, at most `capacity` of them, and never
/// destroyed individually: they cycle between the free list and the in-use
/// registry until the pool is dropped.
///
/// Build one explicitly and pass it (usually as `Arc<ObjectPool<T>>`) to
/// whoever needs it. There is no global instance.
pub struct ObjectPool<T: Poolable> {
    capacity: usize,
    reuse_order: ReuseOrder,
    state: RwLock<PoolState<T>>,
}

impl<T: Poolable> ObjectPool<T> {
    /// Creates a LIFO pool that constructs at most `capacity` entities.
    ///
    /// No entity is constructed up front. A zero capacity is accepted and
    /// yields a pool whose every allocate reports exhaustion.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_reuse_order(capacity, ReuseOrder::Lifo)
    }

    /// Creates a pool with an explicit free-list order.
    #[must_use]
    pub fn with_reuse_order(capacity: usize, reuse_order: ReuseOrder) -> Self {
        Self {
            capacity,
            reuse_order,
            state: RwLock::new(PoolState {
                free: VecDeque::with_capacity(capacity),
                in_use: HashMap::with_capacity(capacity),
                next_id: 1,
                counters: Counters::default(),
            }),
        }
    }

    /// Creates a pool from a validated config.
    pub fn with_config(config: &PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        Ok(Self::with_reuse_order(config.capacity, config.reuse_order))
    }

    /// Returns the capacity bound.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the free-list order.
    #[inline]
    #[must_use]
    pub const fn reuse_order(&self) -> ReuseOrder {
        self.reuse_order
    }

    /// Hands out an entity with a reference count of one.
    ///
    /// Recycles a free entity (resetting it first) when there is one,
    /// otherwise constructs a new entity if fewer than `capacity` exist.
    ///
    /// # Errors
    ///
    /// [`PoolError::Exhausted`] when every constructible entity is in use.
    pub fn allocate(&self) -> PoolResult<EntityHandle<T>> {
        let (cell, constructed) = {
            let mut guard = self.state.write();
            let state = &mut *guard;

            let recycled = match self.reuse_order {
                ReuseOrder::Lifo => state.free.pop_back(),
                ReuseOrder::Fifo => state.free.pop_front(),
            };

            let (cell, constructed) = match recycled {
                Some(cell) => (cell, false),
                None if state.counters.created < self.capacity as u64 => {
                    let id = EntityId::new(state.next_id);
                    state.next_id += 1;
                    (Arc::new(EntityCell::new(id, T::create(id))), true)
                }
                None => {
                    return Err(PoolError::Exhausted {
                        capacity: self.capacity,
                    })
                }
            };

            cell.set_in_use(true);
            state.in_use.insert(
                cell.id(),
                Slot {
                    cell: Arc::clone(&cell),
                    ref_count: 1,
                },
            );
            state
                .counters
                .record_allocation(constructed, state.in_use.len());
            (cell, constructed)
        };

        // Off the free list and not yet handed out: only stale handles can
        // contend for this lock.
        if !constructed {
            cell.lock().reset();
        }
        Ok(EntityHandle::new(cell))
    }

    /// Allocates and wraps the entity in a guard that releases on drop.
    ///
    /// This is the default way to borrow from the pool. Cloning the guard
    /// adds a reference; [`PoolGuard::into_handle`] switches to manual calls.
    ///
    /// # Errors
    ///
    /// [`PoolError::Exhausted`] when every constructible entity is in use.
    pub fn acquire(&self) -> PoolResult<PoolGuard<'_, T>> {
        self.allocate().map(|handle| PoolGuard::new(self, handle))
    }

    /// Drops one reference. Returns true only when that was the last one and
    /// the entity went back to the free list.
    ///
    /// False covers both "other holders remain" and "not in use"; use
    /// [`try_release`](Self::try_release) to tell them apart.
    pub fn release(&self, handle: &EntityHandle<T>) -> bool {
        self.release_id(handle.id())
    }

    /// [`release`](Self::release) by identity.
    pub fn release_id(&self, id: EntityId) -> bool {
        matches!(self.try_release_id(id), Ok(ReleaseOutcome::Returned))
    }

    /// Drops one reference and reports what happened.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidHandle`] when the entity is not in use, including
    /// a second release after the count already reached zero.
    pub fn try_release(&self, handle: &EntityHandle<T>) -> PoolResult<ReleaseOutcome> {
        self.try_release_id(handle.id())
    }

    /// [`try_release`](Self::try_release) by identity.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidHandle`] when the entity is not in use.
    pub fn try_release_id(&self, id: EntityId) -> PoolResult<ReleaseOutcome> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let slot = state
            .in_use
            .get_mut(&id)
            .ok_or(PoolError::InvalidHandle(id))?;
        slot.ref_count -= 1;
        if slot.ref_count > 0 {
            return Ok(ReleaseOutcome::StillShared {
                remaining: slot.ref_count,
            });
        }

        Self::reclaim(state, id);
        Ok(ReleaseOutcome::Returned)
    }

    /// Adds a holder to an in-use entity. Returns false if it is not in use.
    pub fn add_reference(&self, handle: &EntityHandle<T>) -> bool {
        self.add_reference_id(handle.id())
    }

    /// [`add_reference`](Self::add_reference) by identity.
    pub fn add_reference_id(&self, id: EntityId) -> bool {
        self.try_add_reference_id(id).is_ok()
    }

    /// Adds a holder and returns the new count.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidHandle`] when the entity is not in use.
    pub fn try_add_reference_id(&self, id: EntityId) -> PoolResult<usize> {
        let mut state = self.state.write();
        let slot = state
            .in_use
            .get_mut(&id)
            .ok_or(PoolError::InvalidHandle(id))?;
        slot.ref_count += 1;
        Ok(slot.ref_count)
    }

    /// Returns an in-use entity to the free list whatever its count.
    ///
    /// # Unsafety towards other holders
    ///
    /// This is a leak-recovery escape hatch. Every outstanding holder is
    /// silently invalidated and is not notified; their later `release` or
    /// `add_reference` calls return false, or, once the entity has been
    /// handed out again, act on the new holder's allocation. Only call it
    /// when no other holder can still be using the entity.
    pub fn force_release(&self, handle: &EntityHandle<T>) -> bool {
        self.force_release_id(handle.id())
    }

    /// [`force_release`](Self::force_release) by identity.
    pub fn force_release_id(&self, id: EntityId) -> bool {
        self.try_force_release_id(id).is_ok()
    }

    /// Force-releases and returns the count that was discarded.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidHandle`] when the entity is not in use.
    pub fn try_force_release_id(&self, id: EntityId) -> PoolResult<usize> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let discarded = state
            .in_use
            .get(&id)
            .map(|slot| slot.ref_count)
            .ok_or(PoolError::InvalidHandle(id))?;
        Self::reclaim(state, id);
        Ok(discarded)
    }

    /// Force-releases every in-use entity. Returns how many were reclaimed.
    ///
    /// Historical counters are kept; `released` grows by the returned amount.
    /// Entities go onto the free list in identity order. Carries the same
    /// caveat towards outstanding holders as [`force_release`](Self::force_release).
    pub fn cleanup(&self) -> usize {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let mut ids: Vec<EntityId> = state.in_use.keys().copied().collect();
        ids.sort_unstable();
        for &id in &ids {
            Self::reclaim(state, id);
        }
        ids.len()
    }

    /// Returns a consistent snapshot of the usage counters.
    #[must_use]
    pub fn statistics(&self) -> PoolStats {
        let state = self.state.read();
        state
            .counters
            .snapshot(state.in_use.len(), state.free.len(), self.capacity)
    }

    /// Returns the reference count of an in-use entity.
    #[must_use]
    pub fn ref_count(&self, id: EntityId) -> Option<usize> {
        self.state.read().in_use.get(&id).map(|slot| slot.ref_count)
    }

    /// Returns true if the entity is in the in-use registry.
    #[must_use]
    pub fn is_tracked(&self, id: EntityId) -> bool {
        self.state.read().in_use.contains_key(&id)
    }

    /// Returns the number of entities in use.
    #[must_use]
    pub fn in_use_count(&self) -> usize {
        self.state.read().in_use.len()
    }

    /// Returns the number of entities on the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.state.read().free.len()
    }

    /// Returns the free-list identities in the order allocate will take them.
    #[must_use]
    pub fn free_ids(&self) -> Vec<EntityId> {
        let state = self.state.read();
        let ids = state.free.iter().map(|cell| cell.id());
        match self.reuse_order {
            ReuseOrder::Lifo => ids.rev().collect(),
            ReuseOrder::Fifo => ids.collect(),
        }
    }

    /// Verifies every structural invariant under the pool lock.
    ///
    /// Reads only pool-owned state and never waits on an entity lock, so it
    /// is safe to call while holding an entity guard.
    ///
    /// # Errors
    ///
    /// [`PoolError::InvariantViolated`] naming the first broken invariant.
    pub fn check_invariants(&self) -> PoolResult<()> {
        let state = self.state.read();
        let violated = |what: String| Err(PoolError::InvariantViolated(what));

        let tracked = state.free.len() + state.in_use.len();
        if tracked > self.capacity {
            return violated(format!(
                "{tracked} entities tracked, capacity is {}",
                self.capacity
            ));
        }
        if tracked as u64 != state.counters.created {
            return violated(format!(
                "{tracked} entities tracked, {} created",
                state.counters.created
            ));
        }

        let mut seen = Vec::with_capacity(tracked);
        for (&id, slot) in &state.in_use {
            if slot.ref_count == 0 {
                return violated(format!("in-use entity {id} has no references"));
            }
            if !slot.cell.is_in_use() {
                return violated(format!("in-use entity {id} is flagged free"));
            }
            if slot.cell.id() != id {
                return violated(format!("entity {} registered as {id}", slot.cell.id()));
            }
            seen.push(id);
        }
        for cell in &state.free {
            if cell.is_in_use() {
                return violated(format!("free entity {} is flagged in use", cell.id()));
            }
            seen.push(cell.id());
        }
        seen.sort_unstable();
        if let Some(pair) = seen.windows(2).find(|pair| pair[0] == pair[1]) {
            return violated(format!("entity {} is tracked twice", pair[0]));
        }

        let counters = &state.counters;
        if counters.created > counters.allocated {
            return violated(format!(
                "created {} exceeds allocated {}",
                counters.created, counters.allocated
            ));
        }
        if counters.allocated - counters.released != state.in_use.len() as u64 {
            return violated(format!(
                "allocated {} - released {} != in use {}",
                counters.allocated,
                counters.released,
                state.in_use.len()
            ));
        }
        if counters.peak_in_use < state.in_use.len() {
            return violated(format!(
                "peak {} below current in use {}",
                counters.peak_in_use,
                state.in_use.len()
            ));
        }
        Ok(())
    }

    /// Moves an in-use entity to the free list. Caller holds the write lock.
    fn reclaim(state: &mut PoolState<T>, id: EntityId) {
        if let Some(slot) = state.in_use.remove(&id) {
            slot.cell.set_in_use(false);
            state.free.push_back(slot.cell);
            state.counters.record_release();
        }
    }
}

impl<T: Poolable> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("capacity", &self.capacity)
            .field("reuse_order", &self.reuse_order)
            .field("stats", &self.statistics())
            .finish()
    }
}

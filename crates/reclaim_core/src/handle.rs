//! # Entity Handles
//!
//! What a successful allocate hands out: the entity's identity plus shared
//! access to its storage. A handle does not own the entity and does not count
//! as a reference by itself; cloning one is free and does not touch the pool.
//! Pair clones with [`ObjectPool::add_reference`](crate::ObjectPool::add_reference)
//! when more than one holder is going to call `release`.

use std::fmt;
use std::sync::Arc;

use crate::entity::EntityId;
use crate::sync::atomic::{AtomicBool, Ordering};
use crate::sync::{Mutex, MutexGuard};

/// Pool-owned storage for one entity.
///
/// The identity and the in-use flag live outside the payload lock. The pool
/// reads and flips them under its own lock without ever waiting on a holder.
pub(crate) struct EntityCell<T> {
    id: EntityId,
    /// Written only under the pool's write lock.
    in_use: AtomicBool,
    value: Mutex<T>,
}

impl<T> EntityCell<T> {
    pub(crate) fn new(id: EntityId, value: T) -> Self {
        Self {
            id,
            in_use: AtomicBool::new(false),
            value: Mutex::new(value),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub(crate) fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_in_use(&self, in_use: bool) {
        self.in_use.store(in_use, Ordering::Release);
    }

    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock()
    }
}

/// Non-owning handle to an entity held by a pool.
///
/// Valid from a successful allocate until the entity's reference count
/// reaches zero, or until someone force-releases it. Using it afterwards is a
/// caller error the pool cannot detect: the storage stays alive (nothing
/// dangles), but it may already belong to the next holder.
pub struct EntityHandle<T> {
    cell: Arc<EntityCell<T>>,
}

impl<T> EntityHandle<T> {
    pub(crate) fn new(cell: Arc<EntityCell<T>>) -> Self {
        Self { cell }
    }

    /// Returns the identity of the entity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.cell.id()
    }

    /// Returns true while the entity is allocated to someone.
    ///
    /// Only the pool changes this flag. A stale handle reads the flag of
    /// whoever holds the entity now.
    #[inline]
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        self.cell.is_in_use()
    }

    /// Locks the entity for reading or writing its payload.
    ///
    /// The pool never takes an entity lock while it holds its own lock, so
    /// any pool operation, on this entity or another, may be called while
    /// the returned guard is alive. The only pool code that locks an entity
    /// is allocate, which resets a recycled entity after taking it off the
    /// free list and before handing it out. A stale handle holding the lock
    /// at that moment stalls that one allocate, never the pool.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.cell.lock()
    }

    /// Returns true if both handles point at the same physical entity.
    #[inline]
    #[must_use]
    pub fn same_entity(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T> Clone for EntityHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> fmt::Debug for EntityHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandle")
            .field("id", &self.id())
            .field("in_use", &self.is_in_use())
            .finish()
    }
}

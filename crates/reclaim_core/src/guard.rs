//! # Scoped Acquisition
//!
//! [`PoolGuard`] ties one reference to a scope: it releases on drop, and
//! cloning it adds a reference. Forgetting a manual `release` leaks capacity
//! for good, so this is the default path. Manual calls stay available through
//! [`PoolGuard::into_handle`].

use std::fmt;

use crate::entity::{EntityId, Poolable};
use crate::handle::EntityHandle;
use crate::pool::ObjectPool;
use crate::sync::MutexGuard;

/// One reference to a pooled entity, released when dropped.
///
/// # Example
///
/// ```rust
/// use reclaim_core::{BufferEntity, ObjectPool};
///
/// let pool: ObjectPool<BufferEntity> = ObjectPool::new(1);
/// {
///     let guard = pool.acquire().unwrap();
///     guard.lock().write(b"scratch");
///     let shared = guard.clone();          // count = 2
///     assert_eq!(shared.ref_count(), Some(2));
/// } // both dropped, entity back on the free list
/// assert_eq!(pool.free_count(), 1);
/// ```
pub struct PoolGuard<'a, T: Poolable> {
    pool: &'a ObjectPool<T>,
    handle: EntityHandle<T>,
    /// Cleared by `into_handle` so drop does not release.
    armed: bool,
}

impl<'a, T: Poolable> PoolGuard<'a, T> {
    pub(crate) fn new(pool: &'a ObjectPool<T>, handle: EntityHandle<T>) -> Self {
        Self {
            pool,
            handle,
            armed: true,
        }
    }

    /// Returns the identity of the guarded entity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.handle.id()
    }

    /// Returns the underlying handle.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> &EntityHandle<T> {
        &self.handle
    }

    /// Locks the entity.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.handle.lock()
    }

    /// Returns the current reference count, or `None` if the entity was
    /// force-released underneath this guard.
    #[must_use]
    pub fn ref_count(&self) -> Option<usize> {
        self.pool.ref_count(self.handle.id())
    }

    /// Returns the pool this guard borrows from.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &'a ObjectPool<T> {
        self.pool
    }

    /// Gives up automatic release. The caller now owns one reference and must
    /// `release` it manually.
    #[must_use]
    pub fn into_handle(mut self) -> EntityHandle<T> {
        self.armed = false;
        self.handle.clone()
    }
}

impl<T: Poolable> Clone for PoolGuard<'_, T> {
    /// Adds a reference for the new guard.
    ///
    /// If the entity was force-released in the meantime no reference is
    /// added, and the clone releases nothing when dropped.
    fn clone(&self) -> Self {
        let added = self.pool.add_reference(&self.handle);
        Self {
            pool: self.pool,
            handle: self.handle.clone(),
            armed: added,
        }
    }
}

impl<T: Poolable> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.release(&self.handle);
        }
    }
}

impl<T: Poolable> fmt::Debug for PoolGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolGuard")
            .field("id", &self.handle.id())
            .field("armed", &self.armed)
            .finish()
    }
}

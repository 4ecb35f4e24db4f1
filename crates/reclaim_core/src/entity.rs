//! # Poolable Entities
//!
//! An entity is a reusable unit of state with:
//! - An identity assigned once at construction and never reassigned
//! - A payload that the pool treats as opaque and clears on reset
//! - An in-use flag the pool flips as the entity cycles free <-> in-use
//!
//! Only the first two are up to the entity type. The in-use flag and the
//! reference count belong to the pool: it keeps the flag in the storage cell
//! around the entity (readable through
//! [`EntityHandle::is_in_use`](crate::EntityHandle::is_in_use)) and the count
//! in its in-use registry. Holders cannot flip either, and a reset entity
//! always starts over at zero holders.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a pooled entity.
///
/// Identities are handed out by the pool from a monotonically increasing
/// counter starting at 1. `0` is reserved as [`EntityId::NULL`] and is never
/// assigned, so it can stand in for "no entity".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID. No pool ever tracks it.
    pub const NULL: Self = Self(0);

    /// Creates an entity ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability set a type needs to live in an [`ObjectPool`](crate::ObjectPool).
///
/// The pool calls `create` on a cache miss and `reset` before handing a
/// recycled entity out again.
pub trait Poolable: Send + 'static {
    /// Constructs a fresh entity carrying `id`.
    fn create(id: EntityId) -> Self
    where
        Self: Sized;

    /// Clears the payload. The identity must survive.
    fn reset(&mut self);

    /// Returns the identity assigned at construction.
    fn id(&self) -> EntityId;
}

/// Stock entity: an identity plus a growable byte buffer.
///
/// `reset` clears the buffer but keeps its allocation, so a recycled entity
/// does not touch the heap until it outgrows what earlier holders used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferEntity {
    id: EntityId,
    data: Vec<u8>,
}

impl BufferEntity {
    /// Returns the payload.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the payload for in-place edits.
    #[inline]
    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    /// Appends bytes to the payload.
    pub fn write(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the bytes the payload can hold without reallocating.
    #[inline]
    #[must_use]
    pub fn buffer_capacity(&self) -> usize {
        self.data.capacity()
    }
}

impl Poolable for BufferEntity {
    fn create(id: EntityId) -> Self {
        Self {
            id,
            data: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.data.clear();
    }

    fn id(&self) -> EntityId {
        self.id
    }
}

//! # RECLAIM Core
//!
//! A bounded object pool with manual reference counting, safe to drive from
//! many threads at once.
//!
//! - A fixed capacity bound: at most `capacity` entities are ever constructed
//! - Recycling: freed entities are reset and handed out again, identity intact
//! - Shared holders: explicit `add_reference` / `release`, or scoped guards
//! - Exhaustion and unknown handles come back as values, never panics
//!
//! ## Architecture Rules
//!
//! 1. **One lock for pool state** - free list, registry, identities and
//!    counters change together or not at all
//! 2. **No waiting** - allocate never blocks for capacity
//! 3. **No I/O in the core** - logging happens in [`report`]
//! 4. **No entity lock under the pool lock** - holders may call into the pool
//!    while their entity is locked
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use reclaim_core::{BufferEntity, ObjectPool, PoolError};
//!
//! let pool: Arc<ObjectPool<BufferEntity>> = Arc::new(ObjectPool::new(16));
//!
//! {
//!     let guard = pool.acquire()?;
//!     guard.lock().write(b"payload");
//! } // released here
//!
//! let stats = pool.statistics();
//! assert_eq!(stats.allocated, 1);
//! assert_eq!(stats.released, 1);
//! # Ok::<(), PoolError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod entity;
pub mod error;
pub mod guard;
pub mod handle;
pub mod pool;
pub mod report;
pub mod stats;

mod loom_tests;
mod sync;

pub use config::{PoolConfig, ReuseOrder};
pub use entity::{BufferEntity, EntityId, Poolable};
pub use error::{PoolError, PoolResult};
pub use guard::PoolGuard;
pub use handle::EntityHandle;
pub use pool::{ObjectPool, ReleaseOutcome};
pub use report::{HighWaterMark, PoolReporter};
pub use stats::PoolStats;

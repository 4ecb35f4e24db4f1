//! Loom model-checked tests for the pool lock.
//!
//! Run with `RUSTFLAGS="--cfg loom" cargo test -p reclaim_core --lib --release`.
//!
//! Thread counts stay at two and each thread issues at most three pool calls;
//! loom enumerates every interleaving, so the state space grows fast.

#[cfg(loom)]
mod tests {
    use loom::sync::Arc;
    use loom::thread;

    use crate::entity::BufferEntity;
    use crate::pool::ObjectPool;

    #[test]
    fn loom_competing_allocations_respect_capacity() {
        loom::model(|| {
            let pool = Arc::new(ObjectPool::<BufferEntity>::new(1));

            let workers: Vec<_> = (0..2)
                .map(|_| {
                    let pool = Arc::clone(&pool);
                    thread::spawn(move || match pool.allocate() {
                        Ok(handle) => {
                            assert!(pool.release(&handle));
                            1u64
                        }
                        Err(_) => 0,
                    })
                })
                .collect();

            let served: u64 = workers.into_iter().map(|w| w.join().unwrap()).sum();

            pool.check_invariants().unwrap();
            let stats = pool.statistics();
            assert!(served >= 1);
            assert_eq!(stats.allocated, served);
            assert_eq!(stats.released, served);
            assert_eq!(stats.created, 1);
        });
    }

    #[test]
    fn loom_add_reference_races_last_release() {
        loom::model(|| {
            let pool = Arc::new(ObjectPool::<BufferEntity>::new(1));
            let handle = pool.allocate().unwrap();

            let sharer = {
                let pool = Arc::clone(&pool);
                let handle = handle.clone();
                thread::spawn(move || {
                    if pool.add_reference(&handle) {
                        pool.release(&handle);
                    }
                })
            };
            pool.release(&handle);
            sharer.join().unwrap();

            // Whoever ran last returned it; either way exactly once.
            pool.check_invariants().unwrap();
            let stats = pool.statistics();
            assert_eq!(stats.released, 1);
            assert_eq!(stats.free, 1);
            assert!(!pool.is_tracked(handle.id()));
        });
    }

    #[test]
    fn loom_force_release_races_release() {
        loom::model(|| {
            let pool = Arc::new(ObjectPool::<BufferEntity>::new(1));
            let handle = pool.allocate().unwrap();
            assert!(pool.add_reference(&handle));

            let forcer = {
                let pool = Arc::clone(&pool);
                let handle = handle.clone();
                thread::spawn(move || pool.force_release(&handle))
            };
            let returned = pool.release(&handle);
            let forced = forcer.join().unwrap();

            assert!(forced);
            assert!(!returned);
            pool.check_invariants().unwrap();
            assert_eq!(pool.statistics().released, 1);
        });
    }

    #[test]
    fn loom_entity_lock_holder_calls_pool_during_check() {
        loom::model(|| {
            let pool = Arc::new(ObjectPool::<BufferEntity>::new(2));
            let handle = pool.allocate().unwrap();

            let checker = {
                let pool = Arc::clone(&pool);
                thread::spawn(move || pool.check_invariants().unwrap())
            };

            {
                let mut entity = handle.lock();
                entity.write(b"x");
                assert!(pool.add_reference(&handle));
                assert!(!pool.release(&handle));
            }
            checker.join().unwrap();

            assert!(pool.release(&handle));
            assert!(!handle.is_in_use());
            pool.check_invariants().unwrap();
        });
    }
}

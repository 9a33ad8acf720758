//! Per-instance hash memoization.

use std::sync::atomic::{AtomicU64, Ordering};

const UNSET: u64 = 0;
const SET_FLAG: u64 = 1 << 32;

/// Lazily populated hash slot, held as a field of the instance it caches.
///
/// The slot moves from *unset* to *set(value)* exactly once and never back.
/// The flag and the value travel in one atomic word, so a reader sees either
/// nothing or a complete value. Concurrent first computations race benignly:
/// every contender computes the same value and the first publication wins.
///
/// Only sound when every member contributing to the hash stays fixed for the
/// lifetime of the instance.
#[derive(Default)]
pub struct HashCache {
    slot: AtomicU64,
}

impl HashCache {
    pub const fn new() -> Self {
        Self {
            slot: AtomicU64::new(UNSET),
        }
    }

    /// The published hash, if any.
    pub fn get(&self) -> Option<i32> {
        unpack(self.slot.load(Ordering::Acquire))
    }

    /// Returns the published hash, computing and publishing it first if unset.
    pub fn get_or_init(&self, compute: impl FnOnce() -> i32) -> i32 {
        if let Some(hash) = self.get() {
            return hash;
        }
        let hash = compute();
        match self
            .slot
            .compare_exchange(UNSET, pack(hash), Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => hash,
            // Lost the race; the winner computed the same value.
            Err(published) => unpack(published).unwrap_or(hash),
        }
    }
}

fn pack(hash: i32) -> u64 {
    SET_FLAG | u64::from(hash as u32)
}

fn unpack(word: u64) -> Option<i32> {
    (word & SET_FLAG != 0).then_some(word as u32 as i32)
}

/// A clone is a new instance: it starts unset.
impl Clone for HashCache {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for HashCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.get() {
            Some(hash) => write!(f, "HashCache({hash})"),
            None => f.write_str("HashCache(unset)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn starts_unset_and_publishes_once() {
        let cache = HashCache::new();
        assert_eq!(cache.get(), None);

        assert_eq!(cache.get_or_init(|| 42), 42);
        assert_eq!(cache.get(), Some(42));
        assert_eq!(cache.get_or_init(|| 7), 42);
    }

    #[test]
    fn zero_and_negative_hashes_are_distinguished_from_unset() {
        let zero = HashCache::new();
        assert_eq!(zero.get_or_init(|| 0), 0);
        assert_eq!(zero.get(), Some(0));

        let negative = HashCache::new();
        assert_eq!(negative.get_or_init(|| -1), -1);
        assert_eq!(negative.get(), Some(-1));
    }

    #[test]
    fn clone_starts_unset() {
        let cache = HashCache::new();
        cache.get_or_init(|| 9);
        assert_eq!(cache.clone().get(), None);
    }

    #[test]
    fn concurrent_first_reads_agree() {
        let cache = Arc::new(HashCache::new());
        let computed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let computed = Arc::clone(&computed);
                std::thread::spawn(move || {
                    cache.get_or_init(|| {
                        computed.fetch_add(1, Ordering::SeqCst);
                        1234
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1234);
        }
        assert!(computed.load(Ordering::SeqCst) >= 1);
        assert_eq!(cache.get(), Some(1234));
    }
}

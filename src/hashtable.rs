//! Open-addressed, fixed-capacity hash table keyed by canonical k-mer.
//!
//! The table never rehashes: it is sized once from a caller-supplied
//! capacity and an insert that would push the load factor past the
//! configured ceiling fails hard with [`GraphError::CapacityExceeded`]
//! (§4.2's load-factor policy). Handles (bucket indices) are therefore
//! stable for the table's entire lifetime, which is the property the rest
//! of the engine (edges, coverage, links) builds on.
//!
//! Concurrency: each bucket is its own `RwLock`. A reader never observes a
//! torn key because the lock makes partial writes impossible — stricter
//! than the single-word CAS the spec allows for k<=31, but it is the
//! "lock-per-bucket fallback" the spec explicitly permits for wider keys,
//! applied uniformly so the table has one code path regardless of k.

use crate::error::{GraphError, Result};
use crate::kmer::Kmer;
use rustc_hash::FxHasher;
use std::hash::Hasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// A stable integer handle into the hash table's bucket array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub usize);

impl NodeHandle {
    /// Sentinel value meaning "not found".
    pub const NONE: NodeHandle = NodeHandle(usize::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

struct BucketSlot {
    /// `None` = empty bucket. `Some(words)` = filled with this canonical
    /// k-mer's packed words.
    words: Option<Vec<u64>>,
}

/// The default load-factor ceiling (§4.2).
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

/// Fixed-capacity open-addressed hash table of canonical k-mers.
pub struct HashTable {
    buckets: Vec<RwLock<BucketSlot>>,
    k: usize,
    capacity: usize,
    max_load_factor: f64,
    len: AtomicUsize,
}

impl HashTable {
    /// Allocate a table for k-mers of length `k` with room for `capacity`
    /// buckets, using the default 0.75 load-factor ceiling.
    pub fn with_capacity(k: usize, capacity: usize) -> Self {
        Self::with_capacity_and_load_factor(k, capacity, DEFAULT_MAX_LOAD_FACTOR)
    }

    /// As [`Self::with_capacity`] but with an explicit load-factor ceiling.
    pub fn with_capacity_and_load_factor(k: usize, capacity: usize, max_load_factor: f64) -> Self {
        let capacity = capacity.max(1);
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, || RwLock::new(BucketSlot { words: None }));
        Self {
            buckets,
            k,
            capacity,
            max_load_factor,
            len: AtomicUsize::new(0),
        }
    }

    /// The k-mer length this table was built for.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of buckets allocated.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of filled buckets.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current load factor (`len / capacity`).
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity as f64
    }

    fn hash_words(&self, words: &[u64]) -> usize {
        let mut hasher = FxHasher::default();
        for w in words {
            hasher.write_u64(*w);
        }
        (hasher.finish() as usize) % self.capacity
    }

    fn reconstruct(&self, words: Vec<u64>) -> Kmer {
        Kmer::from_words(self.k, words)
    }

    /// Look up a k-mer (any orientation — it is canonicalized first).
    /// Returns [`NodeHandle::NONE`] if not present.
    pub fn find(&self, kmer: &Kmer) -> NodeHandle {
        let canon = kmer.canonical();
        let start = self.hash_words(canon.words());
        for step in 0..self.capacity {
            let idx = (start + step) % self.capacity;
            let guard = self.buckets[idx].read().expect("bucket lock poisoned");
            match &guard.words {
                Some(words) if words == canon.words() => return NodeHandle(idx),
                Some(_) => continue,
                None => return NodeHandle::NONE,
            }
        }
        NodeHandle::NONE
    }

    /// Look up a k-mer, inserting it if absent. Returns the handle and
    /// whether this call performed the insertion.
    ///
    /// Fails with `CapacityExceeded` if inserting a genuinely new key would
    /// push the load factor past the configured ceiling, or if linear
    /// probing exhausts the whole table without finding a slot.
    pub fn find_or_insert(&self, kmer: &Kmer) -> Result<(NodeHandle, bool)> {
        let canon = kmer.canonical();
        let start = self.hash_words(canon.words());
        for step in 0..self.capacity {
            let idx = (start + step) % self.capacity;
            {
                let guard = self.buckets[idx].read().expect("bucket lock poisoned");
                match &guard.words {
                    Some(words) if words == canon.words() => return Ok((NodeHandle(idx), false)),
                    Some(_) => continue,
                    None => {}
                }
            }
            let mut guard = self.buckets[idx].write().expect("bucket lock poisoned");
            match &guard.words {
                Some(words) if words == canon.words() => return Ok((NodeHandle(idx), false)),
                Some(_) => continue, // raced with another insert; keep probing
                None => {
                    let projected = self.len.load(Ordering::Acquire) + 1;
                    if projected as f64 > self.capacity as f64 * self.max_load_factor {
                        return Err(GraphError::CapacityExceeded(format!(
                            "load factor would exceed {:.2} at capacity {}",
                            self.max_load_factor, self.capacity
                        )));
                    }
                    guard.words = Some(canon.words().to_vec());
                    self.len.fetch_add(1, Ordering::AcqRel);
                    return Ok((NodeHandle(idx), true));
                }
            }
        }
        Err(GraphError::CapacityExceeded(
            "linear probing exhausted the table".to_string(),
        ))
    }

    /// The canonical k-mer stored at `handle`, if any.
    pub fn kmer_at(&self, handle: NodeHandle) -> Option<Kmer> {
        if handle.is_none() || handle.0 >= self.capacity {
            return None;
        }
        let guard = self.buckets[handle.0].read().expect("bucket lock poisoned");
        guard.words.clone().map(|w| self.reconstruct(w))
    }

    /// Shift `handle`'s k-mer by `base` in `dir` and look up the result.
    /// Used by the builder/traversal engine to find a neighboring node
    /// without round-tripping through a string.
    pub fn neighbor_lookup(
        &self,
        handle: NodeHandle,
        dir: crate::kmer::Direction,
        base: u8,
    ) -> NodeHandle {
        let Some(kmer) = self.kmer_at(handle) else {
            return NodeHandle::NONE;
        };
        let shifted = match dir {
            crate::kmer::Direction::Forward => kmer.shift_left_append(base),
            crate::kmer::Direction::Reverse => {
                let rc = kmer.reverse_complement();
                rc.shift_left_append(crate::kmer::base_char(crate::kmer::complement_code(
                    crate::kmer::base_code(base).unwrap_or(0),
                )))
                .map(|k| k.reverse_complement())
            }
        };
        match shifted {
            Ok(k) => self.find(&k),
            Err(_) => NodeHandle::NONE,
        }
    }

    /// Iterate over every filled bucket in bucket order (ascending
    /// handle), yielding `(handle, canonical kmer)`. Used by the binary
    /// format writer, which must emit records in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, Kmer)> + '_ {
        (0..self.capacity).filter_map(move |idx| {
            let guard = self.buckets[idx].read().expect("bucket lock poisoned");
            guard
                .words
                .clone()
                .map(|w| (NodeHandle(idx), self.reconstruct(w)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::Kmer;

    fn km(s: &str) -> Kmer {
        Kmer::pack(s.as_bytes()).unwrap()
    }

    #[test]
    fn insert_then_find() {
        let table = HashTable::with_capacity(9, 16);
        let k1 = km("ACGTACGTA");
        let (h1, inserted) = table.find_or_insert(&k1).unwrap();
        assert!(inserted);
        assert_eq!(table.find(&k1), h1);
    }

    #[test]
    fn find_or_insert_is_idempotent() {
        let table = HashTable::with_capacity(9, 16);
        let k1 = km("ACGTACGTA");
        let (h1, inserted1) = table.find_or_insert(&k1).unwrap();
        let (h2, inserted2) = table.find_or_insert(&k1).unwrap();
        assert!(inserted1);
        assert!(!inserted2);
        assert_eq!(h1, h2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn find_missing_returns_none() {
        let table = HashTable::with_capacity(9, 16);
        let k1 = km("ACGTACGTA");
        assert_eq!(table.find(&k1), NodeHandle::NONE);
    }

    #[test]
    fn stores_only_canonical_form() {
        let table = HashTable::with_capacity(9, 16);
        let fwd = km("AAAAACGTA");
        let rc = fwd.reverse_complement();
        let (h1, _) = table.find_or_insert(&fwd).unwrap();
        let (h2, inserted) = table.find_or_insert(&rc).unwrap();
        assert!(!inserted);
        assert_eq!(h1, h2);
        assert_eq!(table.kmer_at(h1).unwrap(), fwd.canonical());
    }

    #[test]
    fn capacity_exceeded_at_load_factor_ceiling() {
        // capacity 4, load factor 0.75 => at most 3 distinct kmers fit.
        let table = HashTable::with_capacity(9, 4);
        let seqs = [
            "AAAAAAAAA", "AAAAAAAAC", "AAAAAAAAG", "AAAAAAAAT", "AAAAAAACA",
        ];
        let mut inserted = 0;
        let mut last_result = Ok((NodeHandle::NONE, false));
        for s in seqs {
            last_result = table.find_or_insert(&km(s));
            if last_result.is_ok() {
                inserted += 1;
            } else {
                break;
            }
        }
        assert_eq!(inserted, 3);
        assert!(matches!(last_result, Err(GraphError::CapacityExceeded(_))));
    }

    #[test]
    fn iter_visits_every_filled_bucket_in_order() {
        let table = HashTable::with_capacity(9, 32);
        let a = km("AAAAAAAAA");
        let b = km("CCCCCCCCC");
        table.find_or_insert(&a).unwrap();
        table.find_or_insert(&b).unwrap();
        let handles: Vec<NodeHandle> = table.iter().map(|(h, _)| h).collect();
        let mut sorted = handles.clone();
        sorted.sort();
        assert_eq!(handles, sorted);
        assert_eq!(handles.len(), 2);
    }

    #[test]
    fn neighbor_lookup_finds_shifted_kmer() {
        let table = HashTable::with_capacity(9, 32);
        let a = km("ACGTACGTA");
        let b = km("CGTACGTAC");
        let (ha, _) = table.find_or_insert(&a).unwrap();
        let (hb, _) = table.find_or_insert(&b).unwrap();
        let found = table.neighbor_lookup(ha, crate::kmer::Direction::Forward, b'C');
        assert_eq!(found, hb);
    }
}

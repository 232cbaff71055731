//! Link cleaner: per-`(node, direction)` trie threshold pruning (§4.7
//! "Cleaning"). Every trie subtree whose root coverage falls strictly
//! below the selected threshold is removed outright (its coverage implies
//! it came from sequencing error, not a real alternative path).

use crate::links::store::{Cursor, LinkStore};
use crate::links::threshold::{self, DEFAULT_FALSE_POSITIVE_RATE};
use rand::Rng;

/// Default number of trie roots sampled to estimate the coverage
/// threshold (§4.8's "a sampled set of N link tries").
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;

#[derive(Debug, Default, Clone, Copy)]
pub struct LinkCleanStats {
    pub tries_processed: u64,
    pub subtrees_pruned: u64,
    pub threshold_used: u32,
}

/// Clean every trie in `store` in place, choosing a single threshold from
/// a sample of `sample_size` roots and applying it to all of them.
pub fn clean_links<R: Rng>(
    store: &mut LinkStore,
    p: f64,
    max_threshold: u32,
    sample_size: usize,
    rng: &mut R,
) -> LinkCleanStats {
    let sample = threshold::sample_roots(store, sample_size, rng);
    let cutoff = threshold::select_threshold(store, &sample, p, max_threshold);

    let roots: Vec<Cursor> = store.roots().map(|(_, _, c)| c).collect();
    let mut stats = LinkCleanStats {
        threshold_used: cutoff,
        ..Default::default()
    };
    for root in roots {
        prune_subtree(store, root, cutoff, &mut stats);
    }
    stats
}

/// Convenience wrapper using the §4.8 default false-positive rate and
/// sample size.
pub fn clean_links_default<R: Rng>(
    store: &mut LinkStore,
    max_threshold: u32,
    rng: &mut R,
) -> LinkCleanStats {
    clean_links(
        store,
        DEFAULT_FALSE_POSITIVE_RATE,
        max_threshold,
        DEFAULT_SAMPLE_SIZE,
        rng,
    )
}

fn prune_subtree(store: &mut LinkStore, node: Cursor, cutoff: u32, stats: &mut LinkCleanStats) {
    stats.tries_processed += 1;
    let children: Vec<(u8, Cursor)> = store.children(node).collect();
    for (base, child) in children {
        if store.coverage(child) < cutoff {
            store.prune_child(node, base);
            stats.subtrees_pruned += 1;
        } else {
            prune_subtree(store, child, cutoff, stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashtable::NodeHandle;
    use crate::kmer::Direction;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn low_coverage_subtree_is_pruned() {
        let mut store = LinkStore::new();
        let root = store.root_or_create(NodeHandle(0), Direction::Forward);
        // Strong path: 50 reads all take 'A'.
        for _ in 0..50 {
            store.advance_and_bump(root, b'A', 1);
        }
        // Weak path: a single erroneous read takes 'C'.
        store.advance_and_bump(root, b'C', 1);

        let mut rng = SmallRng::seed_from_u64(42);
        let stats = clean_links_default(&mut store, 1000, &mut rng);
        assert!(stats.subtrees_pruned >= 1);

        let remaining: Vec<u8> = store.children(root).map(|(b, _)| b).collect();
        assert!(remaining.contains(&b'A'));
    }

    #[test]
    fn clean_links_is_a_no_op_on_empty_store() {
        let mut store = LinkStore::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let stats = clean_links_default(&mut store, 1000, &mut rng);
        assert_eq!(stats.tries_processed, 0);
        assert_eq!(stats.subtrees_pruned, 0);
    }
}

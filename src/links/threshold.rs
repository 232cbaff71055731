//! Link threshold selection: estimate a per-kmer Poisson rate from a
//! sampled set of tries and derive the smallest coverage cutoff that
//! keeps the false-positive rate at or below a target `p` (§4.8).

use crate::links::store::{Cursor, LinkStore};
use rand::seq::SliceRandom;
use rand::Rng;

/// Default target false-positive rate (§4.8).
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.001;

/// Smallest integer `t` such that `P(X >= t | X ~ Poisson(lambda)) <= p`,
/// capped at `max_threshold`.
///
/// Computed by accumulating the Poisson CDF term by term rather than via a
/// closed form (no `statrs`-style special-function crate in this stack);
/// fine for the coverage magnitudes this toolkit deals with (reads per
/// branch, not astronomically large rates).
pub fn poisson_tail_threshold(lambda: f64, p: f64, max_threshold: u32) -> u32 {
    if lambda <= 0.0 {
        return 1;
    }
    let target = 1.0 - p;
    let mut term = (-lambda).exp();
    let mut cdf = term;
    let mut n: u32 = 0;
    while cdf < target {
        if n >= max_threshold {
            return max_threshold;
        }
        n += 1;
        term *= lambda / n as f64;
        cdf += term;
    }
    (n + 1).min(max_threshold)
}

/// Estimate a trie's effective per-kmer coverage `lambda`: the total
/// number of reads observed taking any branch at its root, i.e. the
/// summed coverage of its immediate children.
pub fn estimate_lambda(store: &LinkStore, root: Cursor) -> f64 {
    store.children(root).map(|(_, c)| store.coverage(c) as u64).sum::<u64>() as f64
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Reservoir-sample up to `n` trie roots out of every root in `store`.
pub fn sample_roots<R: Rng>(store: &LinkStore, n: usize, rng: &mut R) -> Vec<Cursor> {
    let mut all: Vec<Cursor> = store.roots().map(|(_, _, c)| c).collect();
    if all.len() <= n {
        return all;
    }
    all.shuffle(rng);
    all.truncate(n);
    all
}

/// Derive a single coverage threshold from a sample of trie roots: the
/// median of each sampled trie's `lambda` estimate feeds the Poisson tail
/// bound (§4.8 "the implementer may use a median of per-kmer lambda
/// estimates as the central value").
pub fn select_threshold(
    store: &LinkStore,
    sample: &[Cursor],
    p: f64,
    max_threshold: u32,
) -> u32 {
    let mut lambdas: Vec<f64> = sample
        .iter()
        .map(|&c| estimate_lambda(store, c))
        .filter(|&l| l > 0.0)
        .collect();
    if lambdas.is_empty() {
        return 1;
    }
    let central = median(&mut lambdas);
    poisson_tail_threshold(central, p, max_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashtable::NodeHandle;
    use crate::kmer::Direction;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn threshold_increases_with_rate() {
        let low = poisson_tail_threshold(1.0, 0.001, 100);
        let high = poisson_tail_threshold(50.0, 0.001, 100);
        assert!(high > low);
    }

    #[test]
    fn threshold_respects_cap() {
        let t = poisson_tail_threshold(1000.0, 0.001, 10);
        assert_eq!(t, 10);
    }

    #[test]
    fn zero_rate_gives_minimum_threshold() {
        assert_eq!(poisson_tail_threshold(0.0, 0.001, 100), 1);
    }

    #[test]
    fn select_threshold_from_sampled_tries() {
        let mut store = LinkStore::new();
        let root = store.root_or_create(NodeHandle(0), Direction::Forward);
        for _ in 0..30 {
            store.advance_and_bump(root, b'A', 1);
        }
        let sample = sample_roots(&store, 10, &mut SmallRng::seed_from_u64(1));
        let t = select_threshold(&store, &sample, 0.001, 1000);
        assert!(t >= 1);
    }

    #[test]
    fn sample_roots_caps_at_n() {
        let mut store = LinkStore::new();
        for i in 0..20u32 {
            let root = store.root_or_create(NodeHandle(i as usize), Direction::Forward);
            store.advance_and_bump(root, b'A', 1);
        }
        let sample = sample_roots(&store, 5, &mut SmallRng::seed_from_u64(7));
        assert_eq!(sample.len(), 5);
    }
}

//! Graph cleaner (§4.5): tip removal followed by coverage-histogram-driven
//! unitig pruning. Both phases operate on the union of edges across
//! whichever colors the caller selects — a unitig spanning colors is either
//! kept or dropped as a whole, never kept in one color and dropped in
//! another.

use crate::colors::ColorMask;
use crate::graph::Graph;
use crate::hashtable::NodeHandle;
use crate::kmer::Direction;
use crate::stats::CoverageHistogram;
use std::collections::HashSet;

/// Default tip length threshold, `2k` (§4.5).
pub fn default_tip_len_threshold(k: usize) -> usize {
    2 * k
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CleanStats {
    pub tips_removed: u64,
    pub tip_nodes_removed: u64,
    pub unitigs_considered: u64,
    pub unitigs_pruned: u64,
    pub unitig_nodes_removed: u64,
    pub cutoff_used: u32,
}

/// A maximal non-branching walk, recorded node-by-node in one consistent
/// traversal direction.
struct Unitig {
    nodes: Vec<NodeHandle>,
}

impl Unitig {
    fn avg_coverage(&self, graph: &Graph, mask: &ColorMask) -> u32 {
        let total: u64 = self
            .nodes
            .iter()
            .map(|&h| graph.nodes().coverage_sum(h, mask))
            .sum();
        (total / self.nodes.len() as u64) as u32
    }
}

/// Whether `handle` has zero edges in `dir` across `mask` (a true dead end,
/// as opposed to a branch with more than one).
fn is_dead_end(graph: &Graph, mask: &ColorMask, handle: NodeHandle, dir: Direction) -> bool {
    let union = graph.nodes().edges_union(handle, mask);
    let shifted = match dir {
        Direction::Forward => union & 0x0f,
        Direction::Reverse => (union >> 4) & 0x0f,
    };
    shifted == 0
}

/// Walk outward from `start` in `dir`, stopping as soon as the chain
/// branches, dead-ends, loops back on itself, or runs into a node already
/// claimed by another unitig. `dir` never changes meaning across the walk:
/// each step moves from a node's `dir` side to the far side of its unique
/// neighbor (verified symmetric via the matching back-edge), which is the
/// same consistent direction the whole way down the chain.
fn walk_one_direction(
    graph: &Graph,
    mask: &ColorMask,
    start: NodeHandle,
    dir: Direction,
    visited: &HashSet<NodeHandle>,
) -> Vec<NodeHandle> {
    let mut path = Vec::new();
    let mut cur = start;
    loop {
        let Some(next) = graph.unique_neighbor(cur, dir, mask) else {
            break;
        };
        if next == start || visited.contains(&next) {
            break;
        }
        if graph.unique_neighbor(next, dir.flip(), mask) != Some(cur) {
            break;
        }
        path.push(next);
        cur = next;
    }
    path
}

/// Enumerate every unitig in the graph (restricted to non-removed nodes),
/// consuming each node into exactly one unitig.
fn find_unitigs(graph: &Graph, mask: &ColorMask) -> Vec<Unitig> {
    let mut visited: HashSet<NodeHandle> = HashSet::new();
    let mut unitigs = Vec::new();
    for (handle, _) in graph.table().iter() {
        if graph.nodes().is_removed(handle) || visited.contains(&handle) {
            continue;
        }
        let mut backward = walk_one_direction(graph, mask, handle, Direction::Reverse, &visited);
        let forward = walk_one_direction(graph, mask, handle, Direction::Forward, &visited);
        backward.reverse();
        let mut nodes = backward;
        nodes.push(handle);
        nodes.extend(forward);
        for &h in &nodes {
            visited.insert(h);
        }
        unitigs.push(Unitig { nodes });
    }
    unitigs
}

/// Clear the edge bit(s) connecting `from` (on its `from_dir` side) to
/// `to`, in both directions, for every color in `mask`. Safe to clear
/// every edge base at that side because the caller only calls this after
/// confirming exactly one candidate base exists there across `mask` — each
/// individual color's byte is therefore either empty or that single bit.
fn sever_edge_between(
    graph: &Graph,
    mask: &ColorMask,
    from: NodeHandle,
    from_dir: Direction,
    to: NodeHandle,
) {
    let to_dir = from_dir.flip();
    for c in 0..graph.num_colors() {
        if !mask.contains(c) {
            continue;
        }
        for base in graph.nodes().edge_bases(from, c, from_dir) {
            graph.nodes().remove_edge(from, c, from_dir, base);
        }
        for base in graph.nodes().edge_bases(to, c, to_dir) {
            graph.nodes().remove_edge(to, c, to_dir, base);
        }
    }
}

fn remove_unitig(graph: &Graph, mask: &ColorMask, unitig: &Unitig) {
    let first = unitig.nodes[0];
    let last = *unitig.nodes.last().unwrap();
    if let Some(neighbor) = graph.unique_neighbor(first, Direction::Reverse, mask) {
        if !unitig.nodes.contains(&neighbor) {
            sever_edge_between(graph, mask, first, Direction::Reverse, neighbor);
        }
    }
    if last != first {
        if let Some(neighbor) = graph.unique_neighbor(last, Direction::Forward, mask) {
            if !unitig.nodes.contains(&neighbor) {
                sever_edge_between(graph, mask, last, Direction::Forward, neighbor);
            }
        }
    }
    for &h in &unitig.nodes {
        graph.nodes().mark_removed(h);
    }
}

/// Remove tips: unitigs under `tip_len_threshold` nodes long with a true
/// dead end on at least one side.
fn remove_tips(graph: &Graph, mask: &ColorMask, tip_len_threshold: usize, stats: &mut CleanStats) {
    for unitig in find_unitigs(graph, mask) {
        if unitig.nodes.len() >= tip_len_threshold {
            continue;
        }
        let first = unitig.nodes[0];
        let last = *unitig.nodes.last().unwrap();
        let dead_at_start = is_dead_end(graph, mask, first, Direction::Reverse);
        let dead_at_end = is_dead_end(graph, mask, last, Direction::Forward);
        if dead_at_start || dead_at_end {
            stats.tips_removed += 1;
            stats.tip_nodes_removed += unitig.nodes.len() as u64;
            remove_unitig(graph, mask, &unitig);
        }
    }
}

/// Longest run of non-increasing-then-increasing structure: the largest
/// bucket value actually recorded, used to bound the dense scan below.
const MAX_DENSE_HISTOGRAM_SPAN: u32 = 1_000_000;

/// Derive a coverage cutoff from a histogram the way §4.5 describes: the
/// first local minimum above the error tail, or the point below which 99%
/// of the presumed-erroneous population (everything left of the true-
/// coverage peak) falls, whichever is lower. Falls back to 1 if the
/// histogram has no discernible peak.
pub fn derive_cutoff(histogram: &CoverageHistogram) -> u32 {
    let buckets = histogram.buckets();
    if buckets.is_empty() {
        return 1;
    }
    let max_bucket = buckets.last().unwrap().0;
    if max_bucket > MAX_DENSE_HISTOGRAM_SPAN {
        return 1;
    }

    let mut dense = vec![0u64; max_bucket as usize + 1];
    for &(b, n) in buckets {
        dense[b as usize] = n;
    }

    let (peak_idx, _) = dense
        .iter()
        .enumerate()
        .max_by_key(|&(_, &count)| count)
        .unwrap();

    // No discernible peak: the mode sits at the very first bucket, so
    // there's no separate error tail to climb out of.
    if peak_idx == 0 {
        return 1;
    }

    let mut local_min: Option<u32> = None;
    for i in 1..peak_idx {
        if dense[i] < dense[i - 1] && dense[i] <= dense[i + 1] {
            local_min = Some(i as u32);
            break;
        }
    }

    let erroneous_total: u64 = dense[..peak_idx].iter().sum();
    let tail99 = if erroneous_total == 0 {
        None
    } else {
        let target = (erroneous_total as f64 * 0.99).ceil() as u64;
        let mut running = 0u64;
        let mut cutoff = None;
        for (i, &count) in dense.iter().enumerate().take(peak_idx) {
            running += count;
            if running >= target {
                cutoff = Some(i as u32 + 1);
                break;
            }
        }
        cutoff
    };

    match (local_min, tail99) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => 1,
    }
}

/// Run both cleaning phases against `graph`, restricted to `mask`'s
/// colors. `user_cutoff` overrides the derived coverage cutoff when given.
/// Returns cleaning stats plus the coverage-before histogram (computed
/// after tip removal, before coverage pruning, per §4.5's diagnostics
/// requirement).
pub fn clean(
    graph: &mut Graph,
    mask: &ColorMask,
    tip_len_threshold: usize,
    user_cutoff: Option<u32>,
) -> (CleanStats, CoverageHistogram) {
    let mut stats = CleanStats::default();
    remove_tips(graph, mask, tip_len_threshold, &mut stats);

    let unitigs = find_unitigs(graph, mask);
    let mut histogram = CoverageHistogram::new();
    for unitig in &unitigs {
        histogram.record(unitig.avg_coverage(graph, mask));
    }

    let cutoff = user_cutoff.unwrap_or_else(|| derive_cutoff(&histogram));
    stats.cutoff_used = cutoff;

    for unitig in &unitigs {
        stats.unitigs_considered += 1;
        if unitig.avg_coverage(graph, mask) < cutoff {
            stats.unitigs_pruned += 1;
            stats.unitig_nodes_removed += unitig.nodes.len() as u64;
            remove_unitig(graph, mask, unitig);
        }
    }

    for c in 0..graph.num_colors() {
        if mask.contains(c) {
            let meta = graph.color_meta_mut(c);
            meta.cleaned_tips = true;
            meta.cleaned_unitigs = true;
            meta.unitig_cutoff = cutoff;
        }
    }

    (stats, histogram)
}

//! Breakpoint caller (§4.10): walk from anchors in a designated reference
//! color until the walk leaves the reference, emit the novel interval with
//! reference anchors.

use crate::colors::ColorMask;
use crate::graph::Graph;
use crate::hashtable::NodeHandle;
use crate::kmer::{base_char, Direction};
use crate::traversal::Walker;

/// A novel interval: `anchor` is the last reference node before the walk
/// diverged, `reanchor` is the reference node it rejoined (`None` if the
/// walk dead-ended, cycled, or ran out of budget before rejoining).
#[derive(Debug, Clone)]
pub struct BreakpointCall {
    pub anchor: NodeHandle,
    pub anchor_seq: String,
    pub novel_sequence: String,
    pub reanchor: Option<NodeHandle>,
    pub reanchor_seq: Option<String>,
}

/// Whether `handle` participates in `ref_color` (has any recorded coverage
/// there) -- the definition of "in the reference" used throughout.
fn in_reference(graph: &Graph, ref_color: usize, handle: NodeHandle) -> bool {
    graph.nodes().coverage(handle, ref_color) > 0
}

/// Find every breakpoint in `graph`: a reference-color node with a
/// `sample_mask` edge the reference doesn't have, followed out until the
/// walk either rejoins the reference or gives up after `max_walk` steps.
pub fn find_breakpoints(
    graph: &Graph,
    ref_color: usize,
    sample_mask: &ColorMask,
    max_walk: usize,
) -> Vec<BreakpointCall> {
    let mut calls = Vec::new();
    let ref_mask = ColorMask::single(ref_color);

    for (handle, _) in graph.table().iter() {
        if graph.nodes().is_removed(handle) || !in_reference(graph, ref_color, handle) {
            continue;
        }
        let sample_bases = graph.nodes().edge_bases_union(handle, sample_mask, Direction::Forward);
        let ref_bases = graph.nodes().edge_bases_union(handle, &ref_mask, Direction::Forward);

        for &base in &sample_bases {
            if ref_bases.contains(&base) {
                continue; // this edge is shared with the reference, not novel.
            }
            let first = graph.table().neighbor_lookup(handle, Direction::Forward, base);
            if first.is_none() || in_reference(graph, ref_color, first) {
                // Either a dead edge, or the sample rejoins the reference
                // in a single step (a SNP-like event, no novel interval).
                continue;
            }
            if let Some(call) = walk_until_reanchor(graph, ref_color, sample_mask, handle, base, max_walk) {
                calls.push(call);
            }
        }
    }

    calls
}

fn walk_until_reanchor(
    graph: &Graph,
    ref_color: usize,
    sample_mask: &ColorMask,
    anchor: NodeHandle,
    first_base: u8,
    max_walk: usize,
) -> Option<BreakpointCall> {
    let first = graph.table().neighbor_lookup(anchor, Direction::Forward, first_base);
    if first.is_none() {
        return None;
    }

    let mut novel_bases = vec![first_base];
    let mut reanchor = None;
    if in_reference(graph, ref_color, first) {
        reanchor = Some(first);
    } else {
        let walker = Walker::new(graph, None, first, Direction::Forward, sample_mask.clone());
        for node in walker.skip(1).take(max_walk.saturating_sub(1)) {
            let base = graph
                .table()
                .kmer_at(node)
                .map(|k| k.last_base())
                .unwrap_or(0);
            if in_reference(graph, ref_color, node) {
                reanchor = Some(node);
                break;
            }
            novel_bases.push(base);
        }
    }

    let anchor_seq = graph.table().kmer_at(anchor).map(|k| k.unpack()).unwrap_or_default();
    let reanchor_seq = reanchor.and_then(|h| graph.table().kmer_at(h)).map(|k| k.unpack());
    Some(BreakpointCall {
        anchor,
        anchor_seq,
        novel_sequence: novel_bases.iter().map(|&c| base_char(c) as char).collect(),
        reanchor,
        reanchor_seq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::graph::Graph;

    #[test]
    fn insertion_between_two_reference_anchors_is_found() {
        // Reference (color 0): a straight run of k-mers.
        // Sample (color 1): the same run, but with a short novel insertion
        // spliced in partway through, diverging from and rejoining the
        // reference.
        let k = 9;
        let reference: Vec<u8> = "ACGTACGTT".repeat(4).into_bytes();
        let graph = Graph::new(k, 1024, 2);
        Builder::new(&graph, 0).add_sequence(&reference).unwrap();

        let mut sample = reference[..18].to_vec();
        sample.extend_from_slice(b"GGGGGGGGGGGGGGGGGG");
        sample.extend_from_slice(&reference[18..]);
        Builder::new(&graph, 1).add_sequence(&sample).unwrap();

        let sample_mask = ColorMask::single(1);
        let calls = find_breakpoints(&graph, 0, &sample_mask, 64);
        assert!(!calls.is_empty(), "expected at least one breakpoint call");
    }

    #[test]
    fn identical_sample_has_no_breakpoints() {
        let k = 9;
        let reference: Vec<u8> = "ACGTACGTT".repeat(4).into_bytes();
        let graph = Graph::new(k, 1024, 2);
        Builder::new(&graph, 0).add_sequence(&reference).unwrap();
        Builder::new(&graph, 1).add_sequence(&reference).unwrap();

        let sample_mask = ColorMask::single(1);
        let calls = find_breakpoints(&graph, 0, &sample_mask, 64);
        assert!(calls.is_empty());
    }
}

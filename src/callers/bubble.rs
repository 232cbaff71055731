//! Bubble caller (§4.10): pick pairs of paths that start at a common
//! branching node, diverge, and reconverge within a bounded length, and
//! emit each pair as a candidate variant with flanking sequences.

use crate::colors::ColorMask;
use crate::graph::Graph;
use crate::hashtable::NodeHandle;
use crate::kmer::Direction;
use crate::traversal::Walker;

/// A candidate bubble: two alleles diverging from `anchor` and
/// reconverging at `reanchor`, with flanking k-mer sequence on either side.
#[derive(Debug, Clone)]
pub struct BubbleCall {
    pub anchor: NodeHandle,
    pub reanchor: NodeHandle,
    pub flank_before: String,
    pub flank_after: String,
    pub allele_a: String,
    pub allele_b: String,
}

/// Follow one arm of a branch out of `start` (already past the first
/// diverging base) for up to `max_len` further steps, using the traversal
/// engine with no links (so a secondary branch stops the walk rather than
/// guessing). Returns the visited node handles and the bases appended at
/// each step, in order.
fn walk_arm(graph: &Graph, mask: &ColorMask, start: NodeHandle, max_len: usize) -> Vec<(NodeHandle, u8)> {
    let mut path = Vec::new();
    let mut cur = start;
    path.push((start, graph.table().kmer_at(start).map(|k| k.last_base()).unwrap_or(0)));

    let walker = Walker::new(graph, None, start, Direction::Forward, mask.clone());
    for node in walker.skip(1).take(max_len.saturating_sub(1)) {
        let base = graph
            .table()
            .kmer_at(node)
            .map(|k| k.last_base())
            .unwrap_or(0);
        path.push((node, base));
        cur = node;
    }
    let _ = cur;
    path
}

fn bases_to_string(bases: &[u8]) -> String {
    bases
        .iter()
        .map(|&code| crate::kmer::base_char(code) as char)
        .collect()
}

/// Find every simple bubble in `graph` restricted to `mask`'s colors: a
/// branch point whose two (or more) arms reconverge at a common node
/// within `max_bubble_len` steps.
pub fn find_bubbles(graph: &Graph, mask: &ColorMask, max_bubble_len: usize) -> Vec<BubbleCall> {
    let mut calls = Vec::new();

    for (handle, kmer) in graph.table().iter() {
        if graph.nodes().is_removed(handle) {
            continue;
        }
        let out_bases = graph.nodes().edge_bases_union(handle, mask, Direction::Forward);
        if out_bases.len() < 2 {
            continue;
        }

        let mut arms = Vec::with_capacity(out_bases.len());
        for &base in &out_bases {
            let first = graph.table().neighbor_lookup(handle, Direction::Forward, base);
            if first.is_none() {
                continue;
            }
            arms.push((base, walk_arm(graph, mask, first, max_bubble_len)));
        }

        for i in 0..arms.len() {
            for j in (i + 1)..arms.len() {
                let (base_a, path_a) = &arms[i];
                let (base_b, path_b) = &arms[j];
                if let Some(call) = try_reconverge(graph, handle, &kmer.unpack(), *base_a, path_a, *base_b, path_b) {
                    calls.push(call);
                }
            }
        }
    }

    calls
}

fn try_reconverge(
    graph: &Graph,
    anchor: NodeHandle,
    anchor_seq: &str,
    base_a: u8,
    path_a: &[(NodeHandle, u8)],
    base_b: u8,
    path_b: &[(NodeHandle, u8)],
) -> Option<BubbleCall> {
    for (idx_a, &(node_a, _)) in path_a.iter().enumerate() {
        if let Some(idx_b) = path_b.iter().position(|&(n, _)| n == node_a) {
            let reanchor = node_a;
            let allele_a = bases_to_string(
                &std::iter::once(base_a)
                    .chain(path_a[..idx_a].iter().map(|&(_, b)| b))
                    .collect::<Vec<_>>(),
            );
            let allele_b = bases_to_string(
                &std::iter::once(base_b)
                    .chain(path_b[..idx_b].iter().map(|&(_, b)| b))
                    .collect::<Vec<_>>(),
            );
            let flank_after = graph
                .table()
                .kmer_at(reanchor)
                .map(|k| k.unpack())
                .unwrap_or_default();
            return Some(BubbleCall {
                anchor,
                reanchor,
                flank_before: anchor_seq.to_string(),
                flank_after,
                allele_a,
                allele_b,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::graph::Graph;

    #[test]
    fn simple_y_bubble_does_not_reconverge_within_one_node() {
        // Two single-node dead-end arms never meet, so no bubble is found.
        let graph = Graph::new(9, 256, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(b"AAAAAAAAAC").unwrap();
        builder.add_sequence(b"AAAAAAAAAG").unwrap();

        let mask = graph.all_colors();
        let calls = find_bubbles(&graph, &mask, 10);
        assert!(calls.is_empty());
    }

    #[test]
    fn diverge_then_reconverge_is_found() {
        // Shared stem "AAAAAAAAA" diverges on the 10th base (C vs G) then
        // both arms continue with the identical shared suffix "TTTTTTTTT",
        // which reconverges at the same node from both sides.
        let graph = Graph::new(9, 512, 1);
        let builder = Builder::new(&graph, 0);
        let mut seq_c = b"AAAAAAAAA".to_vec();
        seq_c.push(b'C');
        seq_c.extend_from_slice(b"TTTTTTTTT");
        let mut seq_g = b"AAAAAAAAA".to_vec();
        seq_g.push(b'G');
        seq_g.extend_from_slice(b"TTTTTTTTT");
        builder.add_sequence(&seq_c).unwrap();
        builder.add_sequence(&seq_g).unwrap();

        let mask = graph.all_colors();
        let calls = find_bubbles(&graph, &mask, 20);
        assert!(!calls.is_empty(), "expected at least one reconverging bubble");
    }
}

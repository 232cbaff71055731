//! Traversal engine: a pull-style lazy walk over the graph that uses edges
//! to find candidates and links to disambiguate branches (§4.9).
//!
//! Externally a plain [`Iterator<Item = NodeHandle>`]; internally a state
//! struct advanced one node per `next()` call (Design Notes, §9's
//! "coroutine-like iterator" guidance). The reason a walk stopped is
//! recorded on the walker and recoverable via [`Walker::termination_reason`]
//! once iteration ends -- callers are expected to inspect it and keep
//! scanning for the next start point (§7's `WalkTerminated` recovery rule).

use crate::colors::ColorMask;
use crate::config;
use crate::error::TerminationReason;
use crate::graph::Graph;
use crate::hashtable::NodeHandle;
use crate::kmer::{base_char, Direction};
use crate::links::store::{Cursor, LinkStore};
use std::collections::VecDeque;

/// A pull-style walk over `graph`, starting at `start` and moving in `dir`,
/// restricted to `mask`'s colors. `links` is optional: without it every
/// branch point is immediately `LinkExhausted` (no cursor can ever endorse
/// a base), which is itself useful -- callers that don't have links yet
/// (e.g. the bubble caller following one arm manually) get "stop at the
/// first ambiguity" for free.
pub struct Walker<'g> {
    graph: &'g Graph,
    links: Option<&'g LinkStore>,
    mask: ColorMask,
    dir: Direction,
    current: NodeHandle,
    started: bool,
    finished: bool,
    termination: Option<TerminationReason>,
    active: Vec<Cursor>,
    visited: VecDeque<NodeHandle>,
    max_cycle_len: usize,
}

impl<'g> Walker<'g> {
    /// Start a walk at `start`. `links` is consulted at every branch point
    /// (out-degree > 1); pass `None` to walk unambiguous stretches only.
    pub fn new(
        graph: &'g Graph,
        links: Option<&'g LinkStore>,
        start: NodeHandle,
        dir: Direction,
        mask: ColorMask,
    ) -> Self {
        Self {
            graph,
            links,
            mask,
            dir,
            current: start,
            started: false,
            finished: false,
            termination: None,
            active: Vec::new(),
            visited: VecDeque::new(),
            max_cycle_len: config::max_cycle_len(),
        }
    }

    /// The reason the walk stopped, once iteration has ended. `None` while
    /// the walk is still in progress (including before the first `next()`
    /// call).
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.termination
    }

    fn out_degree_bases(&self, handle: NodeHandle) -> Vec<u8> {
        let byte = self.graph.nodes().edges_union(handle, &self.mask);
        let shifted = match self.dir {
            Direction::Forward => byte & 0x0f,
            Direction::Reverse => (byte >> 4) & 0x0f,
        };
        (0u8..4)
            .filter(|&code| shifted & (1 << code) != 0)
            .map(base_char)
            .collect()
    }

    fn is_branching(&self, handle: NodeHandle) -> bool {
        self.out_degree_bases(handle).len() > 1
    }

    fn seed_cursor_if_branching(&mut self, handle: NodeHandle) {
        if let Some(links) = self.links {
            if self.is_branching(handle) {
                if let Some(root) = links.existing_root(handle, self.dir) {
                    self.active.push(root);
                }
            }
        }
    }

    fn advance_cursors(&mut self, links: &LinkStore, base: u8) {
        self.active = self
            .active
            .iter()
            .filter_map(|&cursor| {
                links
                    .children(cursor)
                    .find(|&(b, _)| b == base)
                    .map(|(_, child)| child)
            })
            .collect();
    }

    fn push_visited(&mut self, handle: NodeHandle) {
        self.visited.push_back(handle);
        if self.visited.len() > self.max_cycle_len {
            self.visited.pop_front();
        }
    }

    fn stop(&mut self, reason: TerminationReason) {
        self.termination = Some(reason);
        self.finished = true;
    }

    fn step(&mut self) -> Option<NodeHandle> {
        let candidates = self.out_degree_bases(self.current);
        if candidates.is_empty() {
            self.stop(TerminationReason::DeadEnd);
            return None;
        }

        let chosen = if candidates.len() == 1 {
            candidates[0]
        } else {
            let endorsed: Vec<u8> = match self.links {
                Some(links) => candidates
                    .iter()
                    .copied()
                    .filter(|&b| {
                        self.active
                            .iter()
                            .any(|&cursor| links.children(cursor).any(|(cb, _)| cb == b))
                    })
                    .collect(),
                None => Vec::new(),
            };
            match endorsed.len() {
                0 => {
                    self.stop(TerminationReason::LinkExhausted);
                    return None;
                }
                1 => {
                    // A cursor's position only encodes a junction choice
                    // (§3, §4.9), so only the branching case consumes one --
                    // a linear node never held a junction in the first place.
                    if let Some(links) = self.links {
                        self.advance_cursors(links, endorsed[0]);
                    }
                    endorsed[0]
                }
                _ => {
                    self.stop(TerminationReason::Ambiguous);
                    return None;
                }
            }
        };

        let next = self.graph.table().neighbor_lookup(self.current, self.dir, chosen);
        if next.is_none() || self.graph.nodes().is_removed(next) {
            self.stop(TerminationReason::DeadEnd);
            return None;
        }
        if self.visited.contains(&next) {
            self.stop(TerminationReason::Cycle);
            return None;
        }

        self.push_visited(next);
        self.seed_cursor_if_branching(next);
        self.current = next;
        Some(next)
    }
}

impl<'g> Iterator for Walker<'g> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            self.push_visited(self.current);
            self.seed_cursor_if_branching(self.current);
            return Some(self.current);
        }
        self.step()
    }
}

/// Start a walk from `start_node` in `direction`, restricted to `color_mask`,
/// consulting `links` (if any) to resolve branches (§4.9).
pub fn walk<'g>(
    graph: &'g Graph,
    links: Option<&'g LinkStore>,
    start_node: NodeHandle,
    direction: Direction,
    color_mask: ColorMask,
) -> Walker<'g> {
    Walker::new(graph, links, start_node, direction, color_mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::graph::Graph;
    use crate::links::builder::thread_read;

    #[test]
    fn straight_line_walk_has_no_termination_until_dead_end() {
        let seq: Vec<u8> = "ACGT".repeat(10).into_bytes();
        let graph = Graph::new(9, 256, 1);
        Builder::new(&graph, 0).add_sequence(&seq).unwrap();

        let start = crate::kmer::Kmer::pack(&seq[..9]).unwrap();
        let h = graph.table().find(&start);
        let mask = graph.all_colors();
        let mut w = Walker::new(&graph, None, h, Direction::Forward, mask);
        let visited: Vec<_> = w.by_ref().collect();
        assert!(visited.len() >= 1);
        assert_eq!(w.termination_reason(), Some(TerminationReason::DeadEnd));
    }

    #[test]
    fn branch_with_no_links_terminates_link_exhausted() {
        let graph = Graph::new(9, 256, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(b"AAAAAAAAAC").unwrap();
        builder.add_sequence(b"AAAAAAAAAG").unwrap();

        let stem = crate::kmer::Kmer::pack(b"AAAAAAAAA").unwrap();
        let h = graph.table().find(&stem);
        let mask = graph.all_colors();
        let mut w = Walker::new(&graph, None, h, Direction::Forward, mask);
        let _visited: Vec<_> = w.by_ref().collect();
        assert_eq!(w.termination_reason(), Some(TerminationReason::LinkExhausted));
    }

    #[test]
    fn branch_with_endorsing_link_is_resolved() {
        let graph = Graph::new(9, 256, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(b"AAAAAAAAAC").unwrap();
        builder.add_sequence(b"AAAAAAAAAG").unwrap();

        let mut store = LinkStore::new();
        thread_read(&graph, &mut store, 0, b"AAAAAAAAAC").unwrap();

        let stem = crate::kmer::Kmer::pack(b"AAAAAAAAA").unwrap();
        let h = graph.table().find(&stem);
        let mask = graph.all_colors();
        let w = Walker::new(&graph, Some(&store), h, Direction::Forward, mask);
        let visited: Vec<_> = w.collect();
        // Should step at least once past the branch onto the endorsed 'C' arm.
        assert!(visited.len() >= 2);
    }

    #[test]
    fn linear_stretch_between_two_branches_does_not_strand_the_cursor() {
        // stem "AAAAA" branches C/G, the C arm runs through one
        // non-branching node ("AAAAC" has out-degree 1, only ever
        // continuing to T), then "AAACT" branches again into A/G. A
        // cursor advanced on every step (instead of only at branches)
        // would be consumed by the linear T and show up empty at the
        // second branch, terminating `LinkExhausted` instead of resolving
        // to the endorsed 'A' arm.
        let graph = Graph::new(5, 256, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(b"AAAAACTA").unwrap();
        builder.add_sequence(b"AAAAAG").unwrap();
        builder.add_sequence(b"AAAAACTG").unwrap();

        let mut store = LinkStore::new();
        thread_read(&graph, &mut store, 0, b"AAAAACTA").unwrap();

        let stem = crate::kmer::Kmer::pack(b"AAAAA").unwrap();
        let h = graph.table().find(&stem);
        let mask = graph.all_colors();
        let mut w = Walker::new(&graph, Some(&store), h, Direction::Forward, mask);
        let visited: Vec<_> = w.by_ref().collect();
        // Walks the full "AAAAACTA" tail: AAAAC, AAACT, AACTA (3 steps).
        assert_eq!(visited.len(), 3);
        assert_eq!(w.termination_reason(), Some(TerminationReason::DeadEnd));
    }

    #[test]
    fn cycle_guard_terminates_on_self_loop() {
        // A run of A's longer than k creates a genuine self-loop: shifting
        // "AAAAA" left and appending 'A' yields "AAAAA" again.
        let graph = Graph::new(5, 32, 1);
        Builder::new(&graph, 0).add_sequence(b"AAAAAAAAAA").unwrap();

        let a = crate::kmer::Kmer::pack(b"AAAAA").unwrap();
        let h = graph.table().find(&a);
        let mask = graph.all_colors();
        let mut w = Walker::new(&graph, None, h, Direction::Forward, mask);
        let visited: Vec<_> = w.by_ref().collect();
        assert!(visited.len() <= config::max_cycle_len() + 1);
        assert_eq!(w.termination_reason(), Some(TerminationReason::Cycle));
    }
}

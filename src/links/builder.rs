//! Link builder: thread reads through a finished graph, emitting a
//! junction-choice record into every active origin's trie at each branch
//! point encountered along the way (§4.7 "Building").

use crate::builder::split_contigs;
use crate::error::Result;
use crate::graph::Graph;
use crate::kmer::{self, Kmer};
use crate::links::store::{Cursor, LinkStore};

/// Compaction threshold for the active-origin set, mirroring the active
/// interval set's amortized-compaction idiom: origins are pushed as new
/// branches are entered and the whole set is cleared at contig/read
/// boundaries, so this only matters for pathologically bushy single reads.
const COMPACTION_THRESHOLD: usize = 4096;

/// The set of link-trie cursors currently "listening" for the next
/// junction base as a read is threaded through the graph. Modeled on the
/// graph toolkit's `ActiveSet<T>` (push + compact-by-draining-a-dead-head),
/// specialized to cursors that are always live until an explicit `clear`.
#[derive(Default)]
struct ActiveOrigins {
    cursors: Vec<Cursor>,
}

impl ActiveOrigins {
    fn push(&mut self, cursor: Cursor) {
        self.cursors.push(cursor);
        if self.cursors.len() > COMPACTION_THRESHOLD {
            self.cursors.shrink_to_fit();
        }
    }

    fn clear(&mut self) {
        self.cursors.clear();
    }

    fn iter_mut(&mut self) -> std::slice::IterMut<'_, Cursor> {
        self.cursors.iter_mut()
    }
}

/// Thread every maximal in-alphabet contig of `seq` through `graph`
/// restricted to `color`, recording junction choices into `store`.
pub fn thread_read(graph: &Graph, store: &mut LinkStore, color: usize, seq: &[u8]) -> Result<()> {
    let k = graph.k();
    for contig in split_contigs(seq)? {
        if contig.len() < k {
            continue;
        }
        thread_contig(graph, store, color, contig)?;
    }
    Ok(())
}

fn thread_contig(graph: &Graph, store: &mut LinkStore, color: usize, contig: &[u8]) -> Result<()> {
    let k = graph.k();
    let mut origins = ActiveOrigins::default();

    let mut prev: Option<(crate::hashtable::NodeHandle, Kmer)> = None;
    for window in contig.windows(k) {
        let kmer = Kmer::pack(window)?;
        let handle = graph.table().find(&kmer);
        if handle.is_none() {
            // The walk has left the graph; retire every active origin.
            origins.clear();
            prev = None;
            continue;
        }

        if let Some((prev_handle, prev_kmer)) = prev.take() {
            let (out_dir, out_code) = kmer::successor_edge(&prev_kmer, &kmer);
            let out_base = kmer::base_char(out_code);

            let edge_exists = graph
                .nodes()
                .edge_bases(prev_handle, color, out_dir)
                .contains(&out_base);
            if !edge_exists {
                // Read disagrees with the graph: terminate this walk.
                origins.clear();
                prev = Some((handle, kmer));
                continue;
            }

            // Only a branching node hands out a junction choice (§3, §4.7):
            // gate both the new-origin creation and the advance of every
            // active cursor on this node's out-degree, so a linear node in
            // between two branches neither starts nor extends a link.
            if graph.nodes().out_degree(prev_handle, color, out_dir) > 1 {
                let root = store.root_or_create(prev_handle, out_dir);
                origins.push(root);
                for cursor in origins.iter_mut() {
                    *cursor = store.advance_and_bump(*cursor, out_base, 1);
                }
            }
        }
        prev = Some((handle, kmer));
    }
    Ok(())
}

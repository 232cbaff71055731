//! Graph builder: ingest sequences into a colored dBG, accumulating
//! coverage and edges as it slides a k-mer window over each read (§4.4).

use crate::config;
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::hashtable::NodeHandle;
use crate::kmer::{self, Direction, Kmer};
use crate::stats::BuildStats;

/// Split `seq` into maximal runs of `ACGTacgt` bytes (§4.4 step 1).
/// A byte outside that alphabet ends the current contig; in strict mode
/// ([`config::is_strict_mode`]) it is instead a hard error.
pub(crate) fn split_contigs(seq: &[u8]) -> Result<Vec<&[u8]>> {
    let mut contigs = Vec::new();
    let mut start = None;
    for (i, &b) in seq.iter().enumerate() {
        if kmer::base_code(b).is_some() {
            if start.is_none() {
                start = Some(i);
            }
        } else {
            if config::is_strict_mode() {
                return Err(GraphError::InvalidInput(format!(
                    "unrecognized base byte {b:#x} at offset {i} (strict mode)"
                )));
            }
            if let Some(s) = start.take() {
                contigs.push(&seq[s..i]);
            }
        }
    }
    if let Some(s) = start {
        contigs.push(&seq[s..]);
    }
    Ok(contigs)
}

/// Ingests sequences for one color into a [`Graph`], tracking [`BuildStats`].
pub struct Builder<'g> {
    graph: &'g Graph,
    color: usize,
    stats: BuildStats,
}

impl<'g> Builder<'g> {
    pub fn new(graph: &'g Graph, color: usize) -> Self {
        Self {
            graph,
            color,
            stats: BuildStats::new(),
        }
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Ingest one read. Contigs shorter than `k` are discarded and counted
    /// in [`BuildStats::contigs_too_short`].
    pub fn add_sequence(&self, seq: &[u8]) -> Result<()> {
        self.stats.add_bases_read(seq.len() as u64);
        let k = self.graph.k();
        for contig in split_contigs(seq)? {
            if contig.len() < k {
                if !contig.is_empty() {
                    self.stats.add_contig_too_short();
                }
                continue;
            }
            self.stats.add_contig_loaded();
            self.add_contig(contig)?;
        }
        Ok(())
    }

    fn add_contig(&self, contig: &[u8]) -> Result<()> {
        let k = self.graph.k();
        self.stats.add_bases_loaded(contig.len() as u64);

        let mut prev: Option<(NodeHandle, Kmer)> = None;
        for window in contig.windows(k) {
            let kmer = Kmer::pack(window)?;
            let (handle, inserted) = self
                .graph
                .find_or_insert_with_coverage(&kmer, self.color, 1)?;
            self.stats.add_kmer_loaded(inserted);

            if let Some((prev_handle, prev_kmer)) = &prev {
                let (out_dir, out_code) = kmer::successor_edge(prev_kmer, &kmer);
                self.graph
                    .add_edge(*prev_handle, self.color, out_dir, kmer::base_char(out_code));

                let (in_dir, in_code) = kmer::predecessor_edge(prev_kmer, &kmer);
                self.graph
                    .add_edge(handle, self.color, in_dir, kmer::base_char(in_code));
            }
            prev = Some((handle, kmer));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_contigs_breaks_on_n() {
        let contigs = split_contigs(b"ACGTNNNACGT").unwrap();
        assert_eq!(contigs, vec![b"ACGT".as_slice(), b"ACGT".as_slice()]);
    }

    #[test]
    fn split_contigs_strict_mode_errors() {
        config::set_strict_mode(true);
        let result = split_contigs(b"ACGTN");
        config::set_strict_mode(false);
        assert!(result.is_err());
    }

    #[test]
    fn scenario_two_identical_reads_have_coverage_two() {
        // §8 scenario 1: k=21 from two identical 100-base sequences.
        let seq: Vec<u8> = (0..100).map(|i| b"ACGT"[i % 4]).collect();
        let graph = Graph::new(21, 256, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(&seq).unwrap();
        builder.add_sequence(&seq).unwrap();

        assert_eq!(graph.len(), 100 - 21 + 1);
        for (handle, _) in graph.table().iter() {
            assert_eq!(graph.nodes().coverage(handle, 0), 2);
        }
    }

    #[test]
    fn contig_too_short_is_discarded() {
        let graph = Graph::new(21, 32, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(b"ACGT").unwrap();
        assert!(graph.is_empty());
        assert_eq!(
            builder.stats().contigs_too_short.load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[test]
    fn novel_kmers_are_counted() {
        let graph = Graph::new(9, 32, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(b"ACGTACGTACGT").unwrap();
        let novel = builder.stats().kmers_novel.load(std::sync::atomic::Ordering::Relaxed);
        let loaded = builder.stats().kmers_loaded.load(std::sync::atomic::Ordering::Relaxed);
        assert_eq!(loaded, 12 - 9 + 1);
        assert!(novel <= loaded);
        assert!(novel >= 1);
    }
}

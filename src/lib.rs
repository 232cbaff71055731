// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! `dbg-toolkit`: a colored, linked de Bruijn graph engine for genome
//! assembly and variant calling.
//!
//! # Pipeline
//!
//! - **Build** ([`builder`]): ingest reads into a colored [`graph::Graph`].
//! - **Clean** ([`cleaner`]): remove tips and low-coverage unitigs.
//! - **Thread / Links** ([`links`]): record junction choices observed in
//!   reads as link tries, then threshold-select and prune them.
//! - **Traverse** ([`traversal`]): walk the graph, consulting links to
//!   resolve branches.
//! - **Call** ([`callers`], [`vcf`], [`vcfcov`]): thin consumers of the
//!   traversal engine that emit candidate variants and annotate VCFs.
//!
//! Graphs and link tries round-trip through the binary `.ctx` and
//! gzip-text `.ctp.gz` formats in [`format`] and [`links::format`].

pub mod builder;
pub mod callers;
pub mod cleaner;
pub mod colors;
pub mod commands;
pub mod config;
pub mod error;
pub mod fasta;
pub mod format;
pub mod graph;
pub mod hashtable;
pub mod kmer;
pub mod links;
pub mod nodestore;
pub mod stats;
pub mod traversal;
pub mod vcf;
pub mod vcfcov;
pub mod worker_pool;

pub use error::{GraphError, Result, TerminationReason};
pub use graph::Graph;
pub use kmer::{Direction, Kmer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::Builder;
    pub use crate::callers::{find_breakpoints, find_bubbles, BreakpointCall, BubbleCall};
    pub use crate::colors::ColorMask;
    pub use crate::error::{GraphError, Result, TerminationReason};
    pub use crate::graph::Graph;
    pub use crate::hashtable::NodeHandle;
    pub use crate::kmer::{Direction, Kmer};
    pub use crate::traversal::{walk, Walker};
}

#[cfg(test)]
mod tests {
    use crate::builder::Builder;
    use crate::graph::Graph;

    #[test]
    fn end_to_end_build_clean_and_walk() {
        let seq: Vec<u8> = "ACGT".repeat(10).into_bytes();
        let graph = Graph::new(9, 256, 1);
        Builder::new(&graph, 0).add_sequence(&seq).unwrap();
        assert!(!graph.is_empty());

        let mask = graph.all_colors();
        let (handle, _) = graph
            .find_or_insert_with_coverage(&crate::kmer::Kmer::pack(&seq[..9]).unwrap(), 0, 0)
            .unwrap();
        let walker = crate::traversal::walk(&graph, None, handle, crate::kmer::Direction::Forward, mask);
        let visited: Vec<_> = walker.collect();
        assert!(!visited.is_empty());
    }
}

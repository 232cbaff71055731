//! Command implementations for `dbgtk`.

pub mod breakpoints;
pub mod bubbles;
pub mod build;
pub mod calls2vcf;
pub mod clean;
pub mod links;
pub mod reads;
pub mod thread;
pub mod vcfcov;

pub use breakpoints::BreakpointsCommand;
pub use bubbles::BubblesCommand;
pub use build::BuildCommand;
pub use calls2vcf::Calls2VcfCommand;
pub use clean::CleanCommand;
pub use links::LinksCommand;
pub use reads::ReadsCommand;
pub use thread::ThreadCommand;
pub use vcfcov::VcfcovCommand;

/// Bytes of backing storage one hash table slot plus its colored node
/// entries need: the k-mer words, plus per-color edge byte and `u32`
/// coverage counter (§5 "one monolithic allocation ... sized from a user
/// (memory_budget, bits_per_kmer) calculation").
pub fn bytes_per_kmer(k: usize, num_colors: usize) -> usize {
    let words = crate::kmer::words_per_kmer(k);
    words * 8 + num_colors * (1 + 4)
}

/// Derive a hash table capacity (a kmer count) that fits `memory_bytes`
/// for a graph of the given shape, respecting the table's max load factor
/// so the derived capacity leaves room to actually insert that many
/// k-mers before `find_or_insert` starts failing.
pub fn capacity_for_budget(memory_bytes: u64, k: usize, num_colors: usize) -> usize {
    let per_kmer = bytes_per_kmer(k, num_colors) as u64;
    let raw = (memory_bytes / per_kmer.max(1)).max(1);
    ((raw as f64) / crate::hashtable::DEFAULT_MAX_LOAD_FACTOR).ceil() as usize
}

//! Accumulators written out alongside a build or clean pass: `BuildStats`
//! (§4.4's load-stats record) and `CoverageHistogram` (§4.5's
//! coverage-before diagnostics CSV).

use crate::error::Result;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomically-updated counters for a single builder pass, matched to
/// §4.4's "builder writes a load-stats record" requirement.
#[derive(Default)]
pub struct BuildStats {
    pub bases_read: AtomicU64,
    pub bases_loaded: AtomicU64,
    pub kmers_loaded: AtomicU64,
    pub kmers_novel: AtomicU64,
    pub contigs_loaded: AtomicU64,
    pub contigs_too_short: AtomicU64,
}

impl BuildStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bases_read(&self, n: u64) {
        self.bases_read.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_bases_loaded(&self, n: u64) {
        self.bases_loaded.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_kmer_loaded(&self, novel: bool) {
        self.kmers_loaded.fetch_add(1, Ordering::Relaxed);
        if novel {
            self.kmers_novel.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add_contig_loaded(&self) {
        self.contigs_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_contig_too_short(&self) {
        self.contigs_too_short.fetch_add(1, Ordering::Relaxed);
    }

    /// A snapshot suitable for a single-line stderr summary (§7's
    /// "every command emits a single-line summary to stderr on success").
    pub fn summary_line(&self) -> String {
        format!(
            "bases_read={} bases_loaded={} kmers_loaded={} kmers_novel={} contigs_loaded={} contigs_too_short={}",
            self.bases_read.load(Ordering::Relaxed),
            self.bases_loaded.load(Ordering::Relaxed),
            self.kmers_loaded.load(Ordering::Relaxed),
            self.kmers_novel.load(Ordering::Relaxed),
            self.contigs_loaded.load(Ordering::Relaxed),
            self.contigs_too_short.load(Ordering::Relaxed),
        )
    }
}

/// A sorted coverage-bucket histogram over unitigs, built by the cleaner
/// before it prunes anything, so the "before" distribution is always
/// available for diagnostics regardless of the cutoff chosen.
#[derive(Debug, Default, Clone)]
pub struct CoverageHistogram {
    /// `(coverage_bucket, unitig_count)`, sorted ascending by bucket.
    buckets: Vec<(u32, u64)>,
}

impl CoverageHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one unitig's rounded-down average coverage.
    pub fn record(&mut self, avg_coverage: u32) {
        match self.buckets.binary_search_by_key(&avg_coverage, |&(b, _)| b) {
            Ok(idx) => self.buckets[idx].1 += 1,
            Err(idx) => self.buckets.insert(idx, (avg_coverage, 1)),
        }
    }

    pub fn buckets(&self) -> &[(u32, u64)] {
        &self.buckets
    }

    pub fn total_unitigs(&self) -> u64 {
        self.buckets.iter().map(|&(_, n)| n).sum()
    }

    /// Count of unitigs whose average coverage is strictly below `cutoff`.
    pub fn count_below(&self, cutoff: u32) -> u64 {
        self.buckets
            .iter()
            .filter(|&&(b, _)| b < cutoff)
            .map(|&(_, n)| n)
            .sum()
    }

    /// Write as a two-column CSV (`coverage,unitig_count`), one bucket per
    /// line, ascending by bucket.
    pub fn write_csv<W: Write>(&self, mut w: W) -> Result<()> {
        writeln!(w, "coverage,unitig_count")?;
        let mut int_buf = itoa::Buffer::new();
        for &(bucket, count) in &self.buckets {
            w.write_all(int_buf.format(bucket).as_bytes())?;
            w.write_all(b",")?;
            w.write_all(int_buf.format(count).as_bytes())?;
            w.write_all(b"\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_stats_accumulate() {
        let stats = BuildStats::new();
        stats.add_bases_read(100);
        stats.add_bases_loaded(80);
        stats.add_kmer_loaded(true);
        stats.add_kmer_loaded(false);
        stats.add_contig_loaded();
        stats.add_contig_too_short();
        assert_eq!(stats.bases_read.load(Ordering::Relaxed), 100);
        assert_eq!(stats.kmers_loaded.load(Ordering::Relaxed), 2);
        assert_eq!(stats.kmers_novel.load(Ordering::Relaxed), 1);
        assert!(stats.summary_line().contains("bases_read=100"));
    }

    #[test]
    fn histogram_buckets_stay_sorted() {
        let mut hist = CoverageHistogram::new();
        hist.record(5);
        hist.record(2);
        hist.record(5);
        hist.record(10);
        assert_eq!(hist.buckets(), &[(2, 1), (5, 2), (10, 1)]);
        assert_eq!(hist.total_unitigs(), 4);
    }

    #[test]
    fn count_below_cutoff() {
        let mut hist = CoverageHistogram::new();
        hist.record(1);
        hist.record(1);
        hist.record(3);
        hist.record(10);
        assert_eq!(hist.count_below(3), 2);
        assert_eq!(hist.count_below(11), 4);
    }

    #[test]
    fn writes_csv_with_header() {
        let mut hist = CoverageHistogram::new();
        hist.record(4);
        hist.record(4);
        let mut buf = Vec::new();
        hist.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "coverage,unitig_count\n4,2\n");
    }
}

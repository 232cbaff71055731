//! VCF coverage annotator (§4.10): for each allele (REF and every ALT) of
//! length >= k, compute the median per-k-mer coverage in each color and
//! attach it as a per-sample annotation.

use crate::graph::Graph;
use crate::kmer::Kmer;
use crate::vcf::VcfRecord;
use std::collections::VecDeque;

/// The `FORMAT` key this annotator adds: median per-k-mer coverage, one
/// value per color, comma-separated.
pub const FORMAT_KEY: &str = "MEDK";

/// Median per-color coverage for one allele, or `None` if the allele is
/// shorter than the graph's k-mer size and can't be annotated.
fn allele_median_coverage(graph: &Graph, allele: &str) -> Option<Vec<u32>> {
    let k = graph.k();
    let bytes = allele.as_bytes();
    if bytes.len() < k {
        return None;
    }

    let num_colors = graph.num_colors();
    let mut per_color: Vec<Vec<u32>> = vec![Vec::new(); num_colors];
    for window in bytes.windows(k) {
        let kmer = match Kmer::pack(window) {
            Ok(kmer) => kmer.canonical(),
            Err(_) => continue, // non-ACGT window, e.g. a symbolic ALT; skip it.
        };
        let handle = graph.table().find(&kmer);
        if handle.is_none() {
            continue;
        }
        for (color, values) in per_color.iter_mut().enumerate() {
            values.push(graph.nodes().coverage(handle, color));
        }
    }

    Some(
        per_color
            .into_iter()
            .map(|mut values| {
                if values.is_empty() {
                    return 0;
                }
                values.sort_unstable();
                values[values.len() / 2]
            })
            .collect(),
    )
}

/// Format a per-color median vector as one allele's slice of the `MEDK`
/// value.
fn format_medians(medians: &[u32]) -> String {
    medians
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Compute REF's and every ALT's per-color median coverage. Each allele
/// shorter than `k` contributes `.` in its slot rather than being dropped,
/// so the number of `|`-separated slots always matches REF followed by
/// `record.alt`'s comma-separated alleles. Returns `None` only when every
/// allele in the record is too short to annotate at all.
fn record_allele_medians(graph: &Graph, record: &VcfRecord) -> Option<String> {
    let alleles = std::iter::once(record.reference.as_str()).chain(record.alt.split(','));

    let mut slots = Vec::new();
    let mut any_annotated = false;
    for allele in alleles {
        match allele_median_coverage(graph, allele) {
            Some(medians) => {
                any_annotated = true;
                slots.push(format_medians(&medians));
            }
            None => slots.push(".".to_string()),
        }
    }

    any_annotated.then(|| slots.join("|"))
}

/// Annotate `record` in place: appends `MEDK` to the `FORMAT` column and a
/// formatted value (REF's median, then each ALT's median, `|`-separated)
/// to every sample column. Records where every allele is shorter than `k`
/// are left untouched.
pub fn annotate(graph: &Graph, record: &mut VcfRecord) -> bool {
    let value = match record_allele_medians(graph, record) {
        Some(value) => value,
        None => return false,
    };

    if record.format_and_samples.is_empty() {
        record.format_and_samples.push(FORMAT_KEY.to_string());
        return true;
    }

    record.format_and_samples[0] = format!("{}:{FORMAT_KEY}", record.format_and_samples[0]);
    for sample in record.format_and_samples.iter_mut().skip(1) {
        sample.push(':');
        sample.push_str(&value);
    }
    true
}

/// Streams VCF records through [`annotate`], retaining at most
/// `max_nvars` consecutive records at a time (the bounded-memory property
/// the annotator must hold regardless of input size).
pub struct CoverageAnnotator<'g> {
    graph: &'g Graph,
    max_nvars: usize,
    buffer: VecDeque<VcfRecord>,
}

impl<'g> CoverageAnnotator<'g> {
    pub fn new(graph: &'g Graph, max_nvars: usize) -> Self {
        Self {
            graph,
            max_nvars: max_nvars.max(1),
            buffer: VecDeque::new(),
        }
    }

    /// Annotate and buffer `record`. Returns the oldest buffered record,
    /// evicted to keep the buffer at or under `max_nvars`, once the
    /// buffer is full; `None` while it's still filling up.
    pub fn push(&mut self, mut record: VcfRecord) -> Option<VcfRecord> {
        annotate(self.graph, &mut record);
        self.buffer.push_back(record);
        if self.buffer.len() > self.max_nvars {
            self.buffer.pop_front()
        } else {
            None
        }
    }

    /// Drain every remaining buffered record, oldest first.
    pub fn drain(&mut self) -> Vec<VcfRecord> {
        self.buffer.drain(..).collect()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn record(reference: &str) -> VcfRecord {
        record_with_alt(reference, "G")
    }

    fn record_with_alt(reference: &str, alt: &str) -> VcfRecord {
        VcfRecord {
            chrom: "chr1".into(),
            pos: 1,
            id: ".".into(),
            reference: reference.to_string(),
            alt: alt.to_string(),
            qual: ".".into(),
            filter: ".".into(),
            info: ".".into(),
            format_and_samples: vec!["GT".into(), "0/1".into()],
        }
    }

    #[test]
    fn annotate_appends_medk_with_observed_coverage() {
        let graph = Graph::new(5, 256, 1);
        // A single 5-base sequence is exactly one k-mer window, so its
        // canonical node's coverage is unambiguously 1.
        Builder::new(&graph, 0).add_sequence(b"ACGTA").unwrap();

        // ALT "G" is shorter than k=5, so its slot is "." -- only REF's
        // median is observed here.
        let mut rec = record("ACGTA");
        assert!(annotate(&graph, &mut rec));
        assert_eq!(rec.format_and_samples[0], "GT:MEDK");
        assert_eq!(rec.format_and_samples[1], "0/1:1|.");
    }

    #[test]
    fn annotate_computes_a_distinct_median_per_alt_allele() {
        let graph = Graph::new(5, 256, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(b"ACGTA").unwrap();
        for _ in 0..5 {
            builder.add_sequence(b"TTTTT").unwrap();
        }

        // REF "ACGTA" was loaded once (coverage 1); ALT "TTTTT" was loaded
        // 5 times (coverage 5) -- the two alleles must not share one
        // REF-only median.
        let mut rec = record_with_alt("ACGTA", "TTTTT");
        assert!(annotate(&graph, &mut rec));
        assert_eq!(rec.format_and_samples[1], "0/1:1|5");
    }

    #[test]
    fn annotate_handles_multiple_alt_alleles() {
        let graph = Graph::new(5, 256, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(b"ACGTA").unwrap();
        builder.add_sequence(b"TTTTT").unwrap();

        let mut rec = record_with_alt("ACGTA", "TTTTT,CCCCC");
        assert!(annotate(&graph, &mut rec));
        // REF observed, first ALT observed, second ALT absent from the
        // graph entirely (median over zero covered kmers is 0).
        assert_eq!(rec.format_and_samples[1], "0/1:1|1|0");
    }

    #[test]
    fn annotate_skips_record_when_every_allele_is_shorter_than_k() {
        let graph = Graph::new(9, 256, 1);
        Builder::new(&graph, 0).add_sequence(b"ACGTACGTACGT").unwrap();

        let mut rec = record_with_alt("AC", "G");
        assert!(!annotate(&graph, &mut rec));
        assert_eq!(rec.format_and_samples[0], "GT");
    }

    #[test]
    fn buffer_never_exceeds_max_nvars() {
        let graph = Graph::new(5, 256, 1);
        Builder::new(&graph, 0).add_sequence(b"ACGTACGTACGT").unwrap();

        let mut annotator = CoverageAnnotator::new(&graph, 3);
        let mut evicted = 0;
        for _ in 0..10 {
            if annotator.push(record("ACGTA")).is_some() {
                evicted += 1;
            }
            assert!(annotator.buffered_len() <= 3);
        }
        assert_eq!(evicted, 7);
        assert_eq!(annotator.drain().len(), 3);
        assert_eq!(annotator.buffered_len(), 0);
    }
}

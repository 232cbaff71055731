//! `reads` command (§6): filter a read file down to the reads whose
//! k-mers are entirely present in a given color of the graph, useful for
//! sanity-checking a build or isolating reads that didn't make it in.

use crate::error::Result;
use crate::fasta::SequenceReader;
use crate::format::{load_graph, ColorFilter};
use crate::graph::Graph;
use crate::kmer::Kmer;
use crate::worker_pool::WorkerPool;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct ReadsCommand {
    pub graph_path: PathBuf,
    pub capacity: usize,
    pub num_colors_hint: usize,
    pub color: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    /// If true, write reads NOT fully represented in the graph instead.
    pub invert: bool,
    /// Worker count for the filtering pool (§5: "size set per command,
    /// default 2").
    pub workers: usize,
}

fn fully_present(graph: &Graph, color: usize, seq: &str) -> bool {
    let k = graph.k();
    seq.len() >= k
        && seq.as_bytes().windows(k).all(|window| {
            Kmer::pack(window)
                .map(|kmer| {
                    let handle = graph.table().find(&kmer.canonical());
                    !handle.is_none() && graph.nodes().coverage(handle, color) > 0
                })
                .unwrap_or(false)
        })
}

impl ReadsCommand {
    pub fn run(&self) -> Result<()> {
        let filter = ColorFilter::identity(self.num_colors_hint.max(1));
        let graph = Arc::new(load_graph(&self.graph_path, self.capacity, &filter)?);

        let mut reader = SequenceReader::from_path(&self.input)?;
        let mut reads = Vec::new();
        while let Some(seq) = reader.read_sequence()? {
            reads.push(seq);
        }
        let total = reads.len() as u64;

        let out_file = std::fs::File::create(&self.output)?;
        let writer = Arc::new(Mutex::new(std::io::BufWriter::new(out_file)));
        let kept = Arc::new(AtomicU64::new(0));

        // §5: each worker tests one read's k-mers against the graph and
        // writes it (self-labeled with its original index, so workers
        // never need to coordinate on output order) through the single
        // mutex guarding this command's output file.
        let pool = WorkerPool::new(self.workers.max(1));
        for (idx, seq) in reads.into_iter().enumerate() {
            let graph = Arc::clone(&graph);
            let writer = Arc::clone(&writer);
            let kept = Arc::clone(&kept);
            let color = self.color;
            let invert = self.invert;
            pool.submit(move || {
                if fully_present(&graph, color, &seq) != invert {
                    let mut w = writer.lock().expect("reads output mutex poisoned");
                    let _ = writeln!(w, ">read{idx}");
                    let _ = writeln!(w, "{seq}");
                    kept.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
        pool.shutdown();

        Arc::try_unwrap(writer)
            .unwrap_or_else(|_| panic!("output writer outlived worker pool shutdown"))
            .into_inner()
            .expect("reads output mutex poisoned")
            .flush()?;
        eprintln!("reads_total={total} reads_kept={}", kept.load(Ordering::Relaxed));
        Ok(())
    }
}

//! `thread` command (§6): walk reads back over an existing graph to
//! build a link store (junction-choice tries), then write it as a
//! `.ctp.gz` file.

use crate::error::Result;
use crate::fasta::SequenceReader;
use crate::format::{load_graph, ColorFilter};
use crate::links::builder::thread_read;
use crate::links::format::write_links;
use crate::links::store::LinkStore;
use std::path::PathBuf;

pub struct ThreadCommand {
    pub graph_path: PathBuf,
    pub capacity: usize,
    pub color: usize,
    pub reads: Vec<PathBuf>,
    pub output: PathBuf,
}

impl ThreadCommand {
    pub fn run(&self) -> Result<()> {
        let filter = ColorFilter::identity(self.color + 1);
        let graph = load_graph(&self.graph_path, self.capacity, &filter)?;
        let mut store = LinkStore::new();

        for path in &self.reads {
            let mut reader = SequenceReader::from_path(path)?;
            while let Some(seq) = reader.read_sequence()? {
                thread_read(&graph, &mut store, self.color, seq.as_bytes())?;
            }
        }

        eprintln!("num_kmers_with_paths={}", store.num_kmers_with_paths());
        write_links(&graph, &store, &self.output)?;
        Ok(())
    }
}

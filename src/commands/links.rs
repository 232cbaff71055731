//! `links` command (§6): load one `.ctp.gz` link file per color (the
//! `-p col:file` attachment flag lets each color's trie come from a
//! separate `thread` run), merge them into one store, select a coverage
//! threshold from a sample of tries (§4.8), prune every trie against it,
//! and write the combined, cleaned link file back out.

use crate::error::Result;
use crate::format::{load_graph, ColorFilter};
use crate::links::cleaner::{clean_links_default, DEFAULT_SAMPLE_SIZE};
use crate::links::format::{load_links, write_links};
use crate::links::store::LinkStore;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::path::PathBuf;

pub struct LinksCommand {
    pub graph_path: PathBuf,
    pub capacity: usize,
    pub num_colors_hint: usize,
    /// `-p col:file` attachments, one link file per color; merged in
    /// order into a single store before thresholding.
    pub link_paths: Vec<PathBuf>,
    pub output: PathBuf,
    pub max_threshold: u32,
    pub seed: u64,
}

impl LinksCommand {
    pub fn run(&self) -> Result<()> {
        let filter = ColorFilter::identity(self.num_colors_hint.max(1));
        let graph = load_graph(&self.graph_path, self.capacity, &filter)?;
        let mut store = LinkStore::new();
        for path in &self.link_paths {
            load_links(&graph, &mut store, path)?;
        }

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let stats = clean_links_default(&mut store, self.max_threshold, &mut rng);
        eprintln!(
            "tries_processed={} subtrees_pruned={} threshold_used={} sample_size={}",
            stats.tries_processed, stats.subtrees_pruned, stats.threshold_used, DEFAULT_SAMPLE_SIZE
        );

        write_links(&graph, &store, &self.output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::graph::Graph;
    use crate::links::builder::thread_read;

    #[test]
    fn links_round_trip_through_threshold_selection() {
        let dir = tempfile::tempdir().unwrap();
        let graph_path = dir.path().join("g.ctx");
        let links_path = dir.path().join("in.ctp.gz");
        let output = dir.path().join("out.ctp.gz");

        let graph = Graph::new(9, 256, 1);
        let builder = Builder::new(&graph, 0);
        builder.add_sequence(b"AAAAAAAAAC").unwrap();
        builder.add_sequence(b"AAAAAAAAAG").unwrap();
        crate::format::write_graph(&graph, &graph_path).unwrap();

        let mut store = LinkStore::new();
        thread_read(&graph, &mut store, 0, b"AAAAAAAAAC").unwrap();
        crate::links::format::write_links(&graph, &store, &links_path).unwrap();

        let cmd = LinksCommand {
            graph_path,
            capacity: 256,
            num_colors_hint: 1,
            link_paths: vec![links_path],
            output: output.clone(),
            max_threshold: 255,
            seed: 42,
        };
        cmd.run().unwrap();
        assert!(output.exists());
    }
}

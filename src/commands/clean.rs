//! `clean` command (§6): load a `.ctx` file, run tip removal and
//! coverage-cutoff pruning, and write the cleaned graph plus a
//! coverage-before histogram CSV.

use crate::cleaner::{clean, default_tip_len_threshold};
use crate::error::Result;
use crate::format::{load_graph, write_graph, ColorFilter};
use std::path::PathBuf;

pub struct CleanCommand {
    pub input: PathBuf,
    pub output: PathBuf,
    pub capacity: usize,
    pub tip_len_threshold: Option<usize>,
    pub cutoff: Option<u32>,
    pub histogram_csv: Option<PathBuf>,
}

impl CleanCommand {
    pub fn run(&self) -> Result<()> {
        let filter = ColorFilter::identity(self.placeholder_num_colors());
        let mut graph = load_graph(&self.input, self.capacity, &filter)?;
        let mask = graph.all_colors();
        let tip_len_threshold = self
            .tip_len_threshold
            .unwrap_or_else(|| default_tip_len_threshold(graph.k()));

        let (stats, histogram) = clean(&mut graph, &mask, tip_len_threshold, self.cutoff);
        eprintln!(
            "tips_removed={} unitigs_considered={} unitigs_pruned={} cutoff_used={}",
            stats.tips_removed, stats.unitigs_considered, stats.unitigs_pruned, stats.cutoff_used
        );

        if let Some(csv_path) = &self.histogram_csv {
            let file = std::fs::File::create(csv_path)?;
            histogram.write_csv(file)?;
        }

        write_graph(&graph, &self.output)?;
        Ok(())
    }

    /// `ColorFilter::identity` just needs a color count to build an
    /// identity mapping; the real count comes from the file's own header,
    /// so any value at least as large works as a conservative default
    /// before the header is parsed. `load_graph` itself resizes colors to
    /// `max(mapped) + 1`, so this only needs to not under-count.
    fn placeholder_num_colors(&self) -> usize {
        64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::graph::Graph;

    #[test]
    fn clean_round_trips_through_ctx_files() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.ctx");
        let output_path = dir.path().join("out.ctx");

        let graph = Graph::new(9, 256, 1);
        Builder::new(&graph, 0).add_sequence(b"ACGTACGTACGTACGTACGT").unwrap();
        write_graph(&graph, &input_path).unwrap();

        let cmd = CleanCommand {
            input: input_path,
            output: output_path.clone(),
            capacity: 256,
            tip_len_threshold: None,
            cutoff: Some(0),
            histogram_csv: None,
        };
        cmd.run().unwrap();
        assert!(output_path.exists());
    }
}

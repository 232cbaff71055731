//! `bubbles` command (§6): load a graph and emit every bubble call found
//! by the bubble caller as tab-separated text.

use crate::callers::find_bubbles;
use crate::error::Result;
use crate::format::{load_graph, ColorFilter};
use std::io::Write;
use std::path::PathBuf;

pub struct BubblesCommand {
    pub graph_path: PathBuf,
    pub capacity: usize,
    pub num_colors_hint: usize,
    pub max_bubble_len: usize,
    pub output: PathBuf,
}

impl BubblesCommand {
    pub fn run(&self) -> Result<()> {
        let filter = ColorFilter::identity(self.num_colors_hint.max(1));
        let graph = load_graph(&self.graph_path, self.capacity, &filter)?;
        let mask = graph.all_colors();

        let calls = find_bubbles(&graph, &mask, self.max_bubble_len);
        let file = std::fs::File::create(&self.output)?;
        let mut w = std::io::BufWriter::new(file);
        for call in &calls {
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                call.flank_before, call.allele_a, call.allele_b, call.flank_after, call.reanchor.0
            )?;
        }
        w.flush()?;
        eprintln!("bubbles_found={}", calls.len());
        Ok(())
    }
}

//! `breakpoints` command (§6): load a graph and emit every breakpoint
//! call between a reference color and a sample color mask.

use crate::callers::find_breakpoints;
use crate::colors::ColorMask;
use crate::error::Result;
use crate::format::{load_graph, ColorFilter};
use std::io::Write;
use std::path::PathBuf;

pub struct BreakpointsCommand {
    pub graph_path: PathBuf,
    pub capacity: usize,
    pub num_colors_hint: usize,
    pub ref_color: usize,
    pub sample_colors: Vec<usize>,
    pub max_walk: usize,
    pub output: PathBuf,
}

impl BreakpointsCommand {
    pub fn run(&self) -> Result<()> {
        let filter = ColorFilter::identity(self.num_colors_hint.max(1));
        let graph = load_graph(&self.graph_path, self.capacity, &filter)?;
        let mut mask = ColorMask::empty();
        for &c in &self.sample_colors {
            mask = mask.union(&ColorMask::single(c));
        }

        let calls = find_breakpoints(&graph, self.ref_color, &mask, self.max_walk);
        let file = std::fs::File::create(&self.output)?;
        let mut w = std::io::BufWriter::new(file);
        for call in &calls {
            writeln!(
                w,
                "{}\t{}\t{}",
                call.anchor_seq,
                call.novel_sequence,
                call.reanchor_seq.as_deref().unwrap_or("."),
            )?;
        }
        w.flush()?;
        eprintln!("breakpoints_found={}", calls.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::graph::Graph;

    #[test]
    fn writes_one_line_per_breakpoint() {
        let dir = tempfile::tempdir().unwrap();
        let graph_path = dir.path().join("g.ctx");
        let output = dir.path().join("breakpoints.tsv");

        let k = 9;
        let reference: Vec<u8> = "ACGTACGTT".repeat(4).into_bytes();
        let graph = Graph::new(k, 1024, 2);
        Builder::new(&graph, 0).add_sequence(&reference).unwrap();

        let mut sample = reference[..18].to_vec();
        sample.extend_from_slice(b"GGGGGGGGGGGGGGGGGG");
        sample.extend_from_slice(&reference[18..]);
        Builder::new(&graph, 1).add_sequence(&sample).unwrap();
        crate::format::write_graph(&graph, &graph_path).unwrap();

        let cmd = BreakpointsCommand {
            graph_path,
            capacity: 1024,
            num_colors_hint: 2,
            ref_color: 0,
            sample_colors: vec![1],
            max_walk: 64,
            output: output.clone(),
        };
        cmd.run().unwrap();
        let contents = std::fs::read_to_string(&output).unwrap();
        assert!(!contents.is_empty());
    }
}

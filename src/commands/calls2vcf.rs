//! `calls2vcf` command (§6): format bubble and breakpoint calls as
//! minimal VCF records. The graph has no genomic coordinates of its own,
//! so each call is emitted against a synthetic per-caller contig, one
//! record per call in discovery order -- a compatibility point (§9 Open
//! Question on `calls2vcf`'s exact coordinate system), not a claim that
//! these are alignment-derived positions.

use crate::callers::{find_breakpoints, find_bubbles};
use crate::colors::ColorMask;
use crate::error::Result;
use crate::format::{load_graph, ColorFilter};
use std::io::Write;
use std::path::PathBuf;

pub struct Calls2VcfCommand {
    pub graph_path: PathBuf,
    pub capacity: usize,
    pub num_colors_hint: usize,
    pub ref_color: usize,
    pub sample_colors: Vec<usize>,
    pub max_len: usize,
    pub output: PathBuf,
}

impl Calls2VcfCommand {
    pub fn run(&self) -> Result<()> {
        let filter = ColorFilter::identity(self.num_colors_hint.max(1));
        let graph = load_graph(&self.graph_path, self.capacity, &filter)?;

        let file = std::fs::File::create(&self.output)?;
        let mut w = std::io::BufWriter::new(file);
        writeln!(w, "##fileformat=VCFv4.2")?;
        writeln!(w, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")?;

        let mask = graph.all_colors();
        let bubbles = find_bubbles(&graph, &mask, self.max_len);
        for (idx, call) in bubbles.iter().enumerate() {
            writeln!(
                w,
                "bubble\t{}\t.\t{}\t{}\t.\tPASS\tSVTYPE=BUBBLE",
                idx + 1,
                call.allele_a,
                call.allele_b,
            )?;
        }

        let mut sample_mask = ColorMask::empty();
        for &c in &self.sample_colors {
            sample_mask = sample_mask.union(&ColorMask::single(c));
        }
        let breakpoints = find_breakpoints(&graph, self.ref_color, &sample_mask, self.max_len);
        for (idx, call) in breakpoints.iter().enumerate() {
            writeln!(
                w,
                "breakpoint\t{}\t.\t{}\t{}{}\t.\tPASS\tSVTYPE=BREAKPOINT",
                idx + 1,
                call.anchor_seq,
                call.anchor_seq,
                call.novel_sequence,
            )?;
        }

        w.flush()?;
        eprintln!(
            "bubbles_emitted={} breakpoints_emitted={}",
            bubbles.len(),
            breakpoints.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::graph::Graph;

    #[test]
    fn emits_a_header_and_data_lines() {
        let dir = tempfile::tempdir().unwrap();
        let graph_path = dir.path().join("g.ctx");
        let output = dir.path().join("calls.vcf");

        let graph = Graph::new(9, 512, 1);
        let builder = Builder::new(&graph, 0);
        let mut seq_c = b"AAAAAAAAA".to_vec();
        seq_c.push(b'C');
        seq_c.extend_from_slice(b"TTTTTTTTT");
        let mut seq_g = b"AAAAAAAAA".to_vec();
        seq_g.push(b'G');
        seq_g.extend_from_slice(b"TTTTTTTTT");
        builder.add_sequence(&seq_c).unwrap();
        builder.add_sequence(&seq_g).unwrap();
        crate::format::write_graph(&graph, &graph_path).unwrap();

        let cmd = Calls2VcfCommand {
            graph_path,
            capacity: 512,
            num_colors_hint: 1,
            ref_color: 0,
            sample_colors: vec![0],
            max_len: 20,
            output: output.clone(),
        };
        cmd.run().unwrap();
        let contents = std::fs::read_to_string(&output).unwrap();
        assert!(contents.starts_with("##fileformat"));
        assert!(contents.lines().count() > 2);
    }
}

//! `build` command (§6): ingest one or more per-color read files into a
//! fresh graph and write it out as a `.ctx` file.

use crate::builder::Builder;
use crate::commands::capacity_for_budget;
use crate::error::Result;
use crate::fasta::SequenceReader;
use crate::format::write_graph;
use crate::graph::Graph;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// One color's worth of input: a sample name and the read files to load
/// into it.
pub struct ColorInput {
    pub sample_name: String,
    pub paths: Vec<PathBuf>,
}

pub struct BuildCommand {
    pub k: usize,
    pub memory_bytes: u64,
    pub colors: Vec<ColorInput>,
    pub output: PathBuf,
}

impl BuildCommand {
    pub fn run(&self) -> Result<()> {
        let capacity = capacity_for_budget(self.memory_bytes, self.k, self.colors.len());
        let mut graph = Graph::new(self.k, capacity, self.colors.len());
        for (color, input) in self.colors.iter().enumerate() {
            graph.color_meta_mut(color).sample_name = input.sample_name.clone();
        }

        // §5: colors never share a hash table bucket lock for long and
        // never share node-store bytes at all, so every color's files are
        // ingested on rayon's global pool (sized from `--threads` in
        // main.rs) instead of one at a time.
        let graph_ref = &graph;
        let results: Vec<Result<(String, u64)>> = self
            .colors
            .par_iter()
            .enumerate()
            .map(|(color, input)| -> Result<(String, u64)> {
                let builder = Builder::new(graph_ref, color);
                for path in &input.paths {
                    ingest_file(&builder, path)?;
                }
                let total_sequence = builder.stats().bases_loaded.load(std::sync::atomic::Ordering::Relaxed);
                Ok((builder.stats().summary_line(), total_sequence))
            })
            .collect();

        for (color, result) in results.into_iter().enumerate() {
            let (summary, total_sequence) = result?;
            graph.color_meta_mut(color).total_sequence = total_sequence;
            eprintln!("{}: {summary}", self.colors[color].sample_name);
        }

        write_graph(&graph, &self.output)?;
        Ok(())
    }
}

fn ingest_file(builder: &Builder<'_>, path: &Path) -> Result<()> {
    let mut reader = SequenceReader::from_path(path)?;
    while let Some(seq) = reader.read_sequence()? {
        builder.add_sequence(seq.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builds_and_writes_a_single_color_graph() {
        let dir = tempfile::tempdir().unwrap();
        let reads_path = dir.path().join("reads.fa");
        std::fs::File::create(&reads_path)
            .unwrap()
            .write_all(b">r1\nACGTACGTACGTACGTACGTACGT\n")
            .unwrap();

        let output = dir.path().join("out.ctx");
        let cmd = BuildCommand {
            k: 9,
            memory_bytes: 1 << 20,
            colors: vec![ColorInput {
                sample_name: "sample0".to_string(),
                paths: vec![reads_path],
            }],
            output: output.clone(),
        };
        cmd.run().unwrap();
        assert!(output.exists());
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }

    #[test]
    fn builds_multiple_colors_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let mut colors = Vec::new();
        for (i, seq) in [b"ACGTACGTACGTACGTACGTACGT".as_slice(), b"TTTTTTTTTTTTTTTTTTTTTTTT".as_slice()]
            .into_iter()
            .enumerate()
        {
            let reads_path = dir.path().join(format!("reads{i}.fa"));
            std::fs::File::create(&reads_path).unwrap().write_all(b">r1\n").unwrap();
            std::fs::OpenOptions::new()
                .append(true)
                .open(&reads_path)
                .unwrap()
                .write_all(seq)
                .unwrap();
            colors.push(ColorInput {
                sample_name: format!("sample{i}"),
                paths: vec![reads_path],
            });
        }

        let output = dir.path().join("out.ctx");
        let cmd = BuildCommand {
            k: 9,
            memory_bytes: 1 << 20,
            colors,
            output: output.clone(),
        };
        cmd.run().unwrap();
        assert!(output.exists());
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }
}

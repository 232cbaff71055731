//! Gzip-compressed text link file (`.ctp.gz`-equivalent) reader/writer
//! (§4.7, §6).
//!
//! ```text
//! kmer_size:<k>
//! num_colors:<c>
//! num_kmers_with_paths:<n>
//! num_paths:<p>
//! path_bytes:<b>
//! <canonical-kmer> <num_paths-for-this-kmer>
//! <F|R> <num_juncs> <counts_per_color> <junction_string>
//! ...
//! ```
//!
//! One kmer block per node that has at least one recorded path, one path
//! line per distinct junction-choice sequence recorded against it in
//! either direction. `counts_per_color` is comma-separated per §6's wire
//! shape; since [`LinkStore`] keeps a single summed coverage integer per
//! path rather than a per-color breakdown (Design Notes, §9's resolved
//! Open Question), the total is emitted in color 0's slot and the rest
//! are written as zero. A reader MUST sum the per-color field back down
//! to reconstruct that total rather than assume any particular color
//! carried it.

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::hashtable::NodeHandle;
use crate::kmer::Direction;
use crate::links::store::{Cursor, LinkStore};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

fn dir_char(dir: Direction) -> char {
    match dir {
        Direction::Forward => 'F',
        Direction::Reverse => 'R',
    }
}

fn parse_dir(s: &str) -> Result<Direction> {
    match s {
        "F" => Ok(Direction::Forward),
        "R" => Ok(Direction::Reverse),
        _ => Err(GraphError::FormatError(format!(
            "expected F or R direction marker, got {s:?}"
        ))),
    }
}

/// One distinct junction-choice sequence recorded at a node, with the
/// number of reads that terminated exactly at its end (not merely passed
/// through it on the way to a longer path).
struct PathLine {
    dir: Direction,
    juncs: Vec<u8>,
    count: u32,
}

/// Walk every node in `root`'s trie (excluding the root itself, which
/// never carries its own count) and emit one [`PathLine`]-shaped tuple per
/// node whose own coverage exceeds the sum of its children's coverage.
fn collect_paths(store: &LinkStore, root: Cursor) -> Vec<(Vec<u8>, u32)> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let children: Vec<(u8, Cursor)> = store.children(node).collect();
        let children_sum: u64 = children.iter().map(|&(_, c)| store.coverage(c) as u64).sum();
        if node != root {
            let local = (store.coverage(node) as u64).saturating_sub(children_sum);
            if local > 0 {
                out.push((store.path(node), local.min(u32::MAX as u64) as u32));
            }
        }
        for (_, child) in children {
            stack.push(child);
        }
    }
    out
}

/// Write every link in `store` to `path` as a gzip-compressed text file.
pub fn write_links<P: AsRef<Path>>(graph: &Graph, store: &LinkStore, path: P) -> Result<()> {
    let mut by_handle: HashMap<NodeHandle, Vec<PathLine>> = HashMap::new();
    let mut num_paths: u64 = 0;
    let mut path_bytes: u64 = 0;
    for (handle, dir, root) in store.roots() {
        for (juncs, count) in collect_paths(store, root) {
            num_paths += 1;
            path_bytes += juncs.len() as u64;
            by_handle.entry(handle).or_default().push(PathLine {
                dir,
                juncs,
                count,
            });
        }
    }

    let file = File::create(path)?;
    let mut w = BufWriter::new(GzEncoder::new(file, Compression::default()));

    writeln!(w, "kmer_size:{}", graph.k())?;
    writeln!(w, "num_colors:{}", graph.num_colors())?;
    writeln!(w, "num_kmers_with_paths:{}", by_handle.len())?;
    writeln!(w, "num_paths:{num_paths}")?;
    writeln!(w, "path_bytes:{path_bytes}")?;

    let mut handles: Vec<NodeHandle> = by_handle.keys().copied().collect();
    handles.sort();
    for handle in handles {
        let kmer = graph
            .table()
            .kmer_at(handle)
            .ok_or_else(|| GraphError::FormatError(format!("dangling link handle {handle:?}")))?;
        let lines = &by_handle[&handle];
        writeln!(w, "{kmer} {}", lines.len())?;
        for line in lines {
            let juncs = String::from_utf8(line.juncs.clone())
                .expect("junction bases are always ASCII ACGT");
            let mut counts = vec!["0".to_string(); graph.num_colors().max(1)];
            counts[0] = line.count.to_string();
            writeln!(
                w,
                "{} {} {} {}",
                dir_char(line.dir),
                line.juncs.len(),
                counts.join(","),
                juncs
            )?;
        }
    }
    w.flush()?;
    Ok(())
}

fn parse_header_line<'a>(line: &'a str, key: &str) -> Result<&'a str> {
    line.strip_prefix(key)
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| GraphError::FormatError(format!("expected {key}:<value>, got {line:?}")))
}

fn parse_usize(line: &str, key: &str) -> Result<usize> {
    parse_header_line(line, key)?
        .trim()
        .parse()
        .map_err(|e| GraphError::FormatError(format!("bad {key} value: {e}")))
}

/// Load every link recorded in `path` into `store`, resolving each
/// serialized k-mer against `graph`'s table.
///
/// Fails with `InvalidInput` if the file's `kmer_size` doesn't match
/// `graph`'s, and with `FormatError` on any other structural problem.
pub fn load_links<P: AsRef<Path>>(graph: &Graph, store: &mut LinkStore, path: P) -> Result<()> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(GzDecoder::new(file));
    let mut line = String::new();

    let mut read_line = |line: &mut String| -> Result<bool> {
        line.clear();
        Ok(reader.read_line(line)? > 0)
    };

    if !read_line(&mut line)? {
        return Err(GraphError::FormatError("empty link file".into()));
    }
    let kmer_size = parse_usize(line.trim_end(), "kmer_size")?;
    if kmer_size != graph.k() {
        return Err(GraphError::InvalidInput(format!(
            "link file k-mer size {kmer_size} does not match graph k {}",
            graph.k()
        )));
    }
    read_line(&mut line)?;
    let _num_colors = parse_usize(line.trim_end(), "num_colors")?;
    read_line(&mut line)?;
    let num_kmers_with_paths = parse_usize(line.trim_end(), "num_kmers_with_paths")?;
    read_line(&mut line)?;
    let _num_paths = parse_usize(line.trim_end(), "num_paths")?;
    read_line(&mut line)?;
    let _path_bytes = parse_usize(line.trim_end(), "path_bytes")?;

    for _ in 0..num_kmers_with_paths {
        if !read_line(&mut line)? {
            return Err(GraphError::FormatError("truncated kmer block header".into()));
        }
        let mut fields = line.trim_end().split_whitespace();
        let kmer_str = fields
            .next()
            .ok_or_else(|| GraphError::FormatError("missing kmer string".into()))?;
        let path_count: usize = fields
            .next()
            .ok_or_else(|| GraphError::FormatError("missing path count".into()))?
            .parse()
            .map_err(|e| GraphError::FormatError(format!("bad path count: {e}")))?;

        let kmer = crate::kmer::Kmer::pack(kmer_str.as_bytes())?;
        let handle = graph.table().find(&kmer);
        if handle.is_none() {
            return Err(GraphError::FormatError(format!(
                "link file references kmer {kmer_str} not present in graph"
            )));
        }

        for _ in 0..path_count {
            if !read_line(&mut line)? {
                return Err(GraphError::FormatError("truncated path line".into()));
            }
            let trimmed = line.trim_end();
            let mut fields = trimmed.splitn(4, ' ');
            let dir = parse_dir(fields.next().unwrap_or(""))?;
            let num_juncs: usize = fields
                .next()
                .ok_or_else(|| GraphError::FormatError("missing junction count".into()))?
                .parse()
                .map_err(|e| GraphError::FormatError(format!("bad junction count: {e}")))?;
            let counts_field = fields
                .next()
                .ok_or_else(|| GraphError::FormatError("missing per-color counts".into()))?;
            let juncs = fields
                .next()
                .ok_or_else(|| GraphError::FormatError("missing junction string".into()))?;
            if juncs.len() != num_juncs {
                return Err(GraphError::FormatError(format!(
                    "junction string length {} does not match declared count {num_juncs}",
                    juncs.len()
                )));
            }
            let total: u32 = counts_field
                .split(',')
                .map(|s| {
                    s.parse::<u32>()
                        .map_err(|e| GraphError::FormatError(format!("bad count field: {e}")))
                })
                .sum::<Result<u32>>()?;

            let mut cursor = store.root_or_create(handle, dir);
            for &base in juncs.as_bytes() {
                cursor = store.advance_and_bump(cursor, base, total);
            }
        }
    }
    Ok(())
}

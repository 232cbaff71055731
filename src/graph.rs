//! Top-level `Graph`: a hash table of canonical k-mers plus its colored
//! node store and per-color metadata, the unit everything else in this
//! crate is built from and serialized around (§3, §6).

use crate::colors::ColorMask;
use crate::error::{GraphError, Result};
use crate::hashtable::{HashTable, NodeHandle};
use crate::kmer::{Direction, Kmer};
use crate::nodestore::NodeStore;

/// Per-color provenance and cleaning metadata carried in the `.ctx` header
/// (§6) and updated by the cleaner as it processes each color.
#[derive(Debug, Clone)]
pub struct ColorMeta {
    pub sample_name: String,
    pub mean_read_length: u32,
    pub total_sequence: u64,
    /// Stored as a fraction in memory; the binary format multiplies by
    /// 1e16 to serialize it as a `uint32`.
    pub error_rate: f64,
    pub cleaned_tips: bool,
    pub cleaned_unitigs: bool,
    pub unitig_cutoff: u32,
    pub unitig_kmer_cutoff: u32,
}

impl ColorMeta {
    pub fn named(sample_name: impl Into<String>) -> Self {
        Self {
            sample_name: sample_name.into(),
            mean_read_length: 0,
            total_sequence: 0,
            error_rate: 0.0,
            cleaned_tips: false,
            cleaned_unitigs: false,
            unitig_cutoff: 0,
            unitig_kmer_cutoff: 0,
        }
    }
}

/// The colored, linked de Bruijn graph: a fixed-capacity hash table of
/// canonical k-mers, their per-color edges and coverage, and per-color
/// metadata. Links (§4.7) live in a separate arena built after the graph
/// is final and are not owned here.
pub struct Graph {
    table: HashTable,
    nodes: NodeStore,
    colors: Vec<ColorMeta>,
}

impl Graph {
    /// Allocate a graph sized for `capacity` distinct k-mers of length `k`
    /// with `num_colors` colors, each initially unnamed.
    pub fn new(k: usize, capacity: usize, num_colors: usize) -> Self {
        let num_colors = num_colors.max(1);
        let table = HashTable::with_capacity(k, capacity);
        let nodes = NodeStore::new(capacity, num_colors);
        let colors = (0..num_colors)
            .map(|c| ColorMeta::named(format!("color{c}")))
            .collect();
        Self {
            table,
            nodes,
            colors,
        }
    }

    pub fn k(&self) -> usize {
        self.table.k()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn num_colors(&self) -> usize {
        self.colors.len()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn table(&self) -> &HashTable {
        &self.table
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn color_meta(&self, color: usize) -> &ColorMeta {
        &self.colors[color]
    }

    pub fn color_meta_mut(&mut self, color: usize) -> &mut ColorMeta {
        &mut self.colors[color]
    }

    pub fn all_colors(&self) -> ColorMask {
        ColorMask::all(self.num_colors())
    }

    /// Find (or insert) `kmer`'s canonical handle, then bump `color`'s
    /// coverage by `delta`. Returns the handle and whether it was newly
    /// inserted.
    pub fn find_or_insert_with_coverage(
        &self,
        kmer: &Kmer,
        color: usize,
        delta: u32,
    ) -> Result<(NodeHandle, bool)> {
        if color >= self.num_colors() {
            return Err(GraphError::InvalidInput(format!(
                "color {color} out of range (num_colors = {})",
                self.num_colors()
            )));
        }
        let (handle, inserted) = self.table.find_or_insert(kmer)?;
        self.nodes.add_coverage(handle, color, delta);
        Ok((handle, inserted))
    }

    pub fn add_edge(&self, handle: NodeHandle, color: usize, dir: Direction, base: u8) {
        self.nodes.add_edge(handle, color, dir, base);
    }

    /// Follow the single edge out of `handle` in `dir` restricted to
    /// `mask`'s colors, if exactly one candidate base has an edge bit set.
    /// Used by the cleaner to walk unitigs without consulting links.
    pub fn unique_neighbor(
        &self,
        handle: NodeHandle,
        dir: Direction,
        mask: &ColorMask,
    ) -> Option<NodeHandle> {
        let union = self.nodes.edges_union(handle, mask);
        let shifted = match dir {
            Direction::Forward => union & 0x0f,
            Direction::Reverse => (union >> 4) & 0x0f,
        };
        if shifted.count_ones() != 1 {
            return None;
        }
        let base_bits = shifted.trailing_zeros() as u8;
        let base = crate::kmer::base_char(base_bits);
        let found = self.table.neighbor_lookup(handle, dir, base);
        found.is_some().then_some(found)
    }
}

//! Streaming VCF record reader (§4.10 supplement), in the shape of the
//! teacher's BED parser: a tab-split line reader over any [`Read`], not a
//! general VCF/BCF library.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VcfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, VcfError>;

/// One data line of a VCF file. `format_and_samples` is every column from
/// `FORMAT` onward, kept as raw tab-split fields so the annotator can
/// append its own `FORMAT` key without having to reparse genotype fields
/// it doesn't care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfRecord {
    pub chrom: String,
    pub pos: u64,
    pub id: String,
    pub reference: String,
    pub alt: String,
    pub qual: String,
    pub filter: String,
    pub info: String,
    pub format_and_samples: Vec<String>,
}

impl VcfRecord {
    /// Longest allele (reference or alt) in this record, the length the
    /// coverage annotator checks against `k` before it can annotate.
    pub fn longest_allele_len(&self) -> usize {
        self.reference
            .len()
            .max(self.alt.split(',').map(str::len).max().unwrap_or(0))
    }
}

/// A streaming VCF reader: skips the meta (`##`) and header (`#CHROM`)
/// lines and yields one [`VcfRecord`] per data line, in file order.
pub struct VcfReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
}

impl VcfReader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> VcfReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(256),
        }
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
            buffer: String::with_capacity(256),
        }
    }

    /// Read the next data record, skipping meta and header lines.
    pub fn read_record(&mut self) -> Result<Option<VcfRecord>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            return self.parse_line(line).map(Some);
        }
    }

    fn parse_line(&self, line: &str) -> Result<VcfRecord> {
        let mut fields = line.split('\t');
        let mut next = |name: &str| -> Result<&str> {
            fields.next().ok_or_else(|| VcfError::Parse {
                line: self.line_number,
                message: format!("missing {name} column"),
            })
        };

        let chrom = next("CHROM")?.to_string();
        let pos: u64 = next("POS")?.parse().map_err(|_| VcfError::Parse {
            line: self.line_number,
            message: "POS is not an integer".to_string(),
        })?;
        let id = next("ID")?.to_string();
        let reference = next("REF")?.to_string();
        let alt = next("ALT")?.to_string();
        let qual = next("QUAL")?.to_string();
        let filter = next("FILTER")?.to_string();
        let info = next("INFO")?.to_string();
        let format_and_samples: Vec<String> = fields.map(str::to_string).collect();

        Ok(VcfRecord {
            chrom,
            pos,
            id,
            reference,
            alt,
            qual,
            filter,
            info,
            format_and_samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_meta_and_header_lines() {
        let text = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
chr1\t100\t.\tA\tG\t60\tPASS\t.\n";
        let mut reader = VcfReader::new(text.as_bytes());
        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.chrom, "chr1");
        assert_eq!(record.pos, 100);
        assert_eq!(record.reference, "A");
        assert_eq!(record.alt, "G");
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn rejects_non_numeric_pos() {
        let text = "chr1\tnotanumber\t.\tA\tG\t60\tPASS\t.\n";
        let mut reader = VcfReader::new(text.as_bytes());
        assert!(reader.read_record().is_err());
    }

    #[test]
    fn longest_allele_len_checks_both_sides() {
        let record = VcfRecord {
            chrom: "chr1".into(),
            pos: 1,
            id: ".".into(),
            reference: "AC".into(),
            alt: "A,ACGTGT".into(),
            qual: ".".into(),
            filter: ".".into(),
            info: ".".into(),
            format_and_samples: Vec::new(),
        };
        assert_eq!(record.longest_allele_len(), 6);
    }
}

//! Minimal streaming FASTA/FASTQ sequence reader, in the same spirit as
//! `vcf.rs`'s tab-split reader: a plain `>`/`@`-aware line scanner, not a
//! format-preserving parser. Only the sequence bytes matter to a builder.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Iterates the sequence (not header) lines of one read/record at a time
/// from a FASTA or FASTQ file. FASTQ quality/plus lines are skipped.
/// Multi-line FASTA sequences are concatenated into one string.
pub struct SequenceReader<R: Read> {
    reader: BufReader<R>,
    /// A header line already read while looking for the end of the
    /// previous record's sequence, held over for the next call.
    pending_header: Option<String>,
}

impl SequenceReader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> SequenceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending_header: None,
        }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::with_capacity(256);
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Read the next record's full sequence, or `None` at EOF.
    pub fn read_sequence(&mut self) -> io::Result<Option<String>> {
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => loop {
                match self.read_line()? {
                    None => return Ok(None),
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => break line,
                }
            },
        };

        if header.starts_with('@') {
            let seq = self.read_line()?.unwrap_or_default().trim_end().to_string();
            self.read_line()?; // '+' separator line
            self.read_line()?; // quality line
            return Ok(Some(seq));
        }

        let mut seq = String::new();
        loop {
            match self.read_line()? {
                None => break,
                Some(line) if line.starts_with('>') || line.starts_with('@') => {
                    self.pending_header = Some(line);
                    break;
                }
                Some(line) => seq.push_str(line.trim_end()),
            }
        }
        Ok(Some(seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_single_line_fasta_records() {
        let text = ">r1\nACGTACGT\n>r2\nTTTTGGGG\n";
        let mut reader = SequenceReader::new(text.as_bytes());
        assert_eq!(reader.read_sequence().unwrap(), Some("ACGTACGT".to_string()));
        assert_eq!(reader.read_sequence().unwrap(), Some("TTTTGGGG".to_string()));
        assert_eq!(reader.read_sequence().unwrap(), None);
    }

    #[test]
    fn concatenates_wrapped_fasta_lines() {
        let text = ">r1\nACGT\nACGT\n>r2\nGGGG\n";
        let mut reader = SequenceReader::new(text.as_bytes());
        assert_eq!(reader.read_sequence().unwrap(), Some("ACGTACGT".to_string()));
        assert_eq!(reader.read_sequence().unwrap(), Some("GGGG".to_string()));
    }

    #[test]
    fn reads_fastq_records() {
        let text = "@r1\nACGTACGT\n+\nIIIIIIII\n@r2\nTTTT\n+\nIIII\n";
        let mut reader = SequenceReader::new(text.as_bytes());
        assert_eq!(reader.read_sequence().unwrap(), Some("ACGTACGT".to_string()));
        assert_eq!(reader.read_sequence().unwrap(), Some("TTTT".to_string()));
        assert_eq!(reader.read_sequence().unwrap(), None);
    }
}

//! K-mer codec: packs DNA strings into fixed-width canonical binary k-mers.
//!
//! Encoding: two bits per base (A=0, C=1, G=2, T=3), packed into a
//! big-endian `Vec<u64>` of `words_per_kmer(k)` words. The first base of
//! the string occupies the most significant occupied bits, so that plain
//! word-by-word comparison of two same-length `Kmer`s matches 5'-end
//! lexicographic string comparison (§4.1's canonicalization policy) without
//! any extra shifting.

use crate::error::GraphError;
use std::fmt;

/// Largest k-mer length this codec supports.
pub const MAX_K: usize = 255;

/// Which end of a node a walk or edge bit refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn flip(self) -> Direction {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Number of 64-bit words needed to store a k-mer of length `k`
/// (32 bases fit per word at 2 bits each).
#[inline]
pub fn words_per_kmer(k: usize) -> usize {
    k.div_ceil(32).max(1)
}

/// Encode a single base. Accepts upper and lower case `ACGT`.
#[inline]
pub fn base_code(b: u8) -> Option<u8> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Decode a 2-bit base code back to its uppercase ASCII character.
#[inline]
pub fn base_char(code: u8) -> u8 {
    match code & 0x3 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => b'T',
    }
}

/// Watson-Crick complement of a 2-bit base code (A<->T, C<->G).
#[inline]
pub fn complement_code(code: u8) -> u8 {
    code ^ 0x3
}

/// A fixed-width, packed representation of a DNA k-mer.
///
/// `k` is always odd (3 <= k <= [`MAX_K`]) so a k-mer can never equal its
/// own reverse complement, which makes canonicalization well defined.
#[derive(Clone, Eq, Hash)]
pub struct Kmer {
    k: u8,
    words: Vec<u64>,
}

impl Kmer {
    /// The k-mer's length.
    #[inline]
    pub fn k(&self) -> usize {
        self.k as usize
    }

    /// The packed words, most significant word first.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Reconstruct a `Kmer` from its length and already-packed words.
    ///
    /// Used by the hash table to hand back a `Kmer` for a stored bucket
    /// without re-deriving it from a string. `words` must already be
    /// masked to `k`'s occupied-bit window (true of anything that came out
    /// of [`Self::pack`] or [`Self::shift_left_append`]).
    pub fn from_words(k: usize, words: Vec<u64>) -> Kmer {
        debug_assert_eq!(words.len(), words_per_kmer(k));
        Kmer { k: k as u8, words }
    }

    fn validate_k(k: usize) -> crate::error::Result<()> {
        if !(3..=MAX_K).contains(&k) {
            return Err(GraphError::InvalidInput(format!(
                "k-mer size {k} out of range 3..={MAX_K}"
            )));
        }
        if k % 2 == 0 {
            return Err(GraphError::InvalidInput(format!(
                "k-mer size {k} must be odd"
            )));
        }
        Ok(())
    }

    /// Pack an ASCII DNA string into a canonical-width k-mer.
    ///
    /// Fails with `InvalidInput` if the length isn't odd and in range, or
    /// if the sequence contains a base outside `ACGTacgt`. Callers that
    /// need to tolerate `N`s (e.g. the graph builder) must split the
    /// sequence into in-alphabet contigs before calling this.
    pub fn pack(seq: &[u8]) -> crate::error::Result<Kmer> {
        Self::validate_k(seq.len())?;
        let k = seq.len();
        let mut words = vec![0u64; words_per_kmer(k)];
        for &b in seq {
            let code = base_code(b).ok_or_else(|| {
                GraphError::InvalidInput(format!("invalid base byte {b:#x} in k-mer"))
            })? as u64;
            shift_left_append_words(&mut words, k, code);
        }
        Ok(Kmer {
            k: k as u8,
            words,
        })
    }

    /// Decode back to an uppercase ASCII string.
    pub fn unpack(&self) -> String {
        let k = self.k();
        let mut out = Vec::with_capacity(k);
        for i in 0..k {
            out.push(base_char(self.base_at(i)));
        }
        String::from_utf8(out).expect("base_char only emits ASCII")
    }

    /// The 2-bit code of the base at position `i` (0 = 5' end).
    fn base_at(&self, i: usize) -> u8 {
        let k = self.k();
        let bit_from_lsb = (k - 1 - i) * 2;
        let word_idx_from_end = bit_from_lsb / 64;
        let word_idx = self.words.len() - 1 - word_idx_from_end;
        let shift = bit_from_lsb % 64;
        ((self.words[word_idx] >> shift) & 0x3) as u8
    }

    /// The reverse complement of this k-mer.
    pub fn reverse_complement(&self) -> Kmer {
        let k = self.k();
        let mut words = vec![0u64; self.words.len()];
        for i in 0..k {
            let code = complement_code(self.base_at(k - 1 - i)) as u64;
            shift_left_append_words(&mut words, k, code);
        }
        Kmer { k: self.k, words }
    }

    /// The lexicographically smaller of this k-mer and its reverse
    /// complement.
    pub fn canonical(&self) -> Kmer {
        let rc = self.reverse_complement();
        if self.words <= rc.words {
            self.clone()
        } else {
            rc
        }
    }

    /// True if this k-mer is already in canonical form.
    pub fn is_canonical(&self) -> bool {
        self.words <= self.reverse_complement().words
    }

    /// Drop the leftmost base and append `base` on the right, returning
    /// the new k-mer (used to slide a builder's window one base forward).
    pub fn shift_left_append(&self, base: u8) -> crate::error::Result<Kmer> {
        let code = base_code(base)
            .ok_or_else(|| GraphError::InvalidInput(format!("invalid base byte {base:#x}")))?
            as u64;
        let mut words = self.words.clone();
        shift_left_append_words(&mut words, self.k(), code);
        Ok(Kmer { k: self.k, words })
    }

    /// Enumerate the up to 4 possible k-mers reachable by appending one of
    /// `ACGT` in `dir`. For [`Direction::Forward`] this shifts a base onto
    /// the right end (successor candidates); for [`Direction::Reverse`] it
    /// prepends a base on the left (predecessor candidates, computed via
    /// the reverse complement's forward shift).
    pub fn enumerate_neighbors(&self, dir: Direction) -> Vec<Kmer> {
        (0u8..4)
            .map(|code| match dir {
                Direction::Forward => self
                    .shift_left_append(base_char(code))
                    .expect("base_char always yields a valid base"),
                Direction::Reverse => {
                    // Prepending base `b` to the front of `self` (dropping
                    // its last base) is the reverse-complement of
                    // appending complement(b) to the reverse complement
                    // of `self`.
                    let rc = self.reverse_complement();
                    let shifted = rc
                        .shift_left_append(base_char(complement_code(code)))
                        .expect("base_char always yields a valid base");
                    shifted.reverse_complement()
                }
            })
            .collect()
    }

    /// The first base of the k-mer (5' end), as a 2-bit code.
    pub fn first_base(&self) -> u8 {
        self.base_at(0)
    }

    /// The last base of the k-mer (3' end), as a 2-bit code.
    pub fn last_base(&self) -> u8 {
        self.base_at(self.k() - 1)
    }
}

/// The edge direction and 2-bit base code to record at `prev`'s own
/// stored (canonical) orientation for the read-order transition `prev ->
/// cur`, where `cur` is `prev` shifted left by one base. Edges are always
/// recorded relative to a node's canonical form: if `prev` already IS its
/// canonical form, read-order motion is `Forward` there and the appended
/// base is used as-is; otherwise read-order motion is `Reverse` from the
/// stored form's point of view and the base must be complemented.
pub fn successor_edge(prev: &Kmer, cur: &Kmer) -> (Direction, u8) {
    let appended = cur.last_base();
    if prev.is_canonical() {
        (Direction::Forward, appended)
    } else {
        (Direction::Reverse, complement_code(appended))
    }
}

/// The edge direction and 2-bit base code to record at `cur`'s own stored
/// (canonical) orientation for the same transition, from `cur`'s
/// perspective (the predecessor edge, mirroring [`successor_edge`]).
pub fn predecessor_edge(prev: &Kmer, cur: &Kmer) -> (Direction, u8) {
    let preceding = prev.first_base();
    if cur.is_canonical() {
        (Direction::Reverse, preceding)
    } else {
        (Direction::Forward, complement_code(preceding))
    }
}

impl PartialEq for Kmer {
    fn eq(&self, other: &Self) -> bool {
        self.k == other.k && self.words == other.words
    }
}

impl PartialOrd for Kmer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Kmer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.k.cmp(&other.k).then_with(|| self.words.cmp(&other.words))
    }
}

impl fmt::Debug for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kmer({})", self.unpack())
    }
}

impl fmt::Display for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.unpack())
    }
}

/// Shift a big-endian `words` array (representing a `k`-base, `2k`-bit
/// value right-aligned in the low bits) left by one base and OR `code`
/// into the new low 2 bits, masking off anything that overflows the
/// `2k`-bit window.
fn shift_left_append_words(words: &mut [u64], k: usize, code: u64) {
    let n = words.len();
    let mut carry = code;
    for word in words.iter_mut().rev() {
        let new_carry = *word >> 62;
        *word = (*word << 2) | carry;
        carry = new_carry;
    }
    // Mask off bits beyond the occupied 2k-bit window (only the most
    // significant word can have padding, since words_per_kmer = ceil(k/32)).
    let occupied_bits_in_msw = (k * 2) - (n - 1) * 64;
    if occupied_bits_in_msw < 64 {
        let mask = (1u64 << occupied_bits_in_msw) - 1;
        words[0] &= mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trips() {
        let km = Kmer::pack(b"ACGTACGTA").unwrap();
        assert_eq!(km.unpack(), "ACGTACGTA");
        assert_eq!(km.k(), 9);
    }

    #[test]
    fn pack_rejects_even_length() {
        assert!(Kmer::pack(b"ACGT").is_err());
    }

    #[test]
    fn pack_rejects_invalid_base() {
        assert!(Kmer::pack(b"ACGNT").is_err());
    }

    #[test]
    fn reverse_complement_involution() {
        let km = Kmer::pack(b"ACGTACGTA").unwrap();
        let rc = km.reverse_complement();
        assert_eq!(rc.reverse_complement(), km);
    }

    #[test]
    fn reverse_complement_is_correct_string() {
        let km = Kmer::pack(b"AAACCCT").unwrap();
        assert_eq!(km.reverse_complement().unpack(), "AGGGTTT");
    }

    #[test]
    fn canonical_idempotence() {
        let km = Kmer::pack(b"TTTACGTAC").unwrap();
        let c1 = km.canonical();
        let c2 = c1.canonical();
        assert_eq!(c1, c2);
        assert!(c1.is_canonical());
    }

    #[test]
    fn canonical_picks_lexicographically_smaller() {
        let a = Kmer::pack(b"AAAAAAAAA").unwrap();
        let b = a.reverse_complement();
        assert_eq!(b.unpack(), "TTTTTTTTT");
        assert_eq!(a.canonical().unpack(), "AAAAAAAAA");
        assert_eq!(b.canonical().unpack(), "AAAAAAAAA");
    }

    #[test]
    fn shift_left_append_slides_window() {
        let km = Kmer::pack(b"ACGTACGTA").unwrap();
        let shifted = km.shift_left_append(b'C').unwrap();
        assert_eq!(shifted.unpack(), "CGTACGTAC");
    }

    #[test]
    fn enumerate_neighbors_forward_has_four() {
        let km = Kmer::pack(b"ACGTACGTA").unwrap();
        let neighbors = km.enumerate_neighbors(Direction::Forward);
        assert_eq!(neighbors.len(), 4);
        let strings: Vec<String> = neighbors.iter().map(|n| n.unpack()).collect();
        assert!(strings.contains(&"CGTACGTAA".to_string()));
        assert!(strings.contains(&"CGTACGTAT".to_string()));
    }

    #[test]
    fn enumerate_neighbors_reverse_prepends() {
        let km = Kmer::pack(b"ACGTACGTA").unwrap();
        let neighbors = km.enumerate_neighbors(Direction::Reverse);
        let strings: Vec<String> = neighbors.iter().map(|n| n.unpack()).collect();
        assert!(strings.contains(&"AACGTACGT".to_string()));
        assert!(strings.contains(&"CACGTACGT".to_string()));
    }

    #[test]
    fn supports_k_beyond_one_word() {
        // 40 bases needs words_per_kmer = 2 (>32 bases per 1 word).
        let seq: Vec<u8> = b"ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTA".to_vec();
        // trim to an odd length > 32
        let seq = &seq[..41];
        let km = Kmer::pack(seq).unwrap();
        assert_eq!(km.k(), 41);
        assert_eq!(words_per_kmer(41), 2);
        assert_eq!(km.unpack().as_bytes(), seq);
        assert_eq!(km.reverse_complement().reverse_complement(), km);
    }

    #[test]
    fn ordering_matches_string_lexicographic_order() {
        let a = Kmer::pack(b"AAACCCGGG").unwrap();
        let b = Kmer::pack(b"AAACCCGGT").unwrap();
        assert!(a < b);
    }

    #[test]
    fn successor_and_predecessor_edges_agree_on_canonical_windows() {
        let prev = Kmer::pack(b"ACGTACGTA").unwrap();
        let cur = prev.shift_left_append(b'C').unwrap();
        assert!(prev.is_canonical());
        let (dir, code) = successor_edge(&prev, &cur);
        assert_eq!(dir, Direction::Forward);
        assert_eq!(base_char(code), b'C');

        let (dir2, code2) = predecessor_edge(&prev, &cur);
        if cur.is_canonical() {
            assert_eq!(dir2, Direction::Reverse);
            assert_eq!(base_char(code2), base_char(prev.first_base()));
        } else {
            assert_eq!(dir2, Direction::Forward);
        }
    }
}

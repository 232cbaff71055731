//! Color masks: a bitset selecting which colors participate in an operation.
//!
//! Up to 64 colors fit a single machine word; beyond that a fixed-length
//! `Vec<u64>` bitset takes over transparently (Design Notes, §9).

use std::fmt;

/// A set of color indices, used to restrict edge/coverage queries and
/// traversal to a subset of colors.
#[derive(Clone, PartialEq, Eq)]
pub struct ColorMask {
    words: Vec<u64>,
}

impl ColorMask {
    /// An empty mask (no colors selected).
    pub fn empty() -> Self {
        Self { words: vec![0] }
    }

    /// A mask selecting every color in `0..num_colors`.
    pub fn all(num_colors: usize) -> Self {
        let mut mask = Self::with_capacity(num_colors);
        for c in 0..num_colors {
            mask.set(c);
        }
        mask
    }

    /// A mask selecting a single color.
    pub fn single(color: usize) -> Self {
        let mut mask = Self::with_capacity(color + 1);
        mask.set(color);
        mask
    }

    fn with_capacity(num_colors: usize) -> Self {
        let words = num_colors.div_ceil(64).max(1);
        Self {
            words: vec![0u64; words],
        }
    }

    /// Select `color` in this mask, growing the backing storage if needed.
    pub fn set(&mut self, color: usize) {
        let word = color / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (color % 64);
    }

    /// Deselect `color` in this mask.
    pub fn clear(&mut self, color: usize) {
        let word = color / 64;
        if word < self.words.len() {
            self.words[word] &= !(1u64 << (color % 64));
        }
    }

    /// Whether `color` is selected.
    #[inline]
    pub fn contains(&self, color: usize) -> bool {
        let word = color / 64;
        match self.words.get(word) {
            Some(w) => (w >> (color % 64)) & 1 == 1,
            None => false,
        }
    }

    /// Whether no color is selected.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Iterate the selected color indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| {
            (0..64).filter_map(move |bit| {
                if (w >> bit) & 1 == 1 {
                    Some(wi * 64 + bit)
                } else {
                    None
                }
            })
        })
    }

    /// Union of two masks.
    pub fn union(&self, other: &ColorMask) -> ColorMask {
        let len = self.words.len().max(other.words.len());
        let mut words = vec![0u64; len];
        for (i, w) in words.iter_mut().enumerate() {
            let a = self.words.get(i).copied().unwrap_or(0);
            let b = other.words.get(i).copied().unwrap_or(0);
            *w = a | b;
        }
        ColorMask { words }
    }
}

impl fmt::Debug for ColorMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selects_every_color() {
        let mask = ColorMask::all(3);
        assert!(mask.contains(0));
        assert!(mask.contains(1));
        assert!(mask.contains(2));
        assert!(!mask.contains(3));
    }

    #[test]
    fn single_selects_one_color() {
        let mask = ColorMask::single(5);
        assert!(mask.contains(5));
        assert!(!mask.contains(4));
    }

    #[test]
    fn grows_beyond_64_colors() {
        let mut mask = ColorMask::empty();
        mask.set(130);
        assert!(mask.contains(130));
        assert!(!mask.contains(129));
    }

    #[test]
    fn union_combines_masks() {
        let a = ColorMask::single(1);
        let b = ColorMask::single(2);
        let u = a.union(&b);
        assert!(u.contains(1));
        assert!(u.contains(2));
        assert!(!u.contains(3));
    }

    #[test]
    fn iter_yields_sorted_colors() {
        let mut mask = ColorMask::empty();
        mask.set(3);
        mask.set(1);
        mask.set(70);
        let got: Vec<usize> = mask.iter().collect();
        assert_eq!(got, vec![1, 3, 70]);
    }

    #[test]
    fn clear_removes_a_color() {
        let mut mask = ColorMask::all(4);
        mask.clear(2);
        assert!(!mask.contains(2));
        assert!(mask.contains(1));
    }
}

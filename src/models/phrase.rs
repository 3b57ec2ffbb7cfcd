//! Phrase model.
//!
//! A phrase is a contiguous, inclusive measure range of one voice treated
//! as a unit of musical content. Phrases of one voice never overlap.

use serde::{Deserialize, Serialize};

/// An inclusive measure range `[start_measure, end_measure]` in one voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phrase {
    /// First measure (inclusive).
    pub start_measure: u32,
    /// Last measure (inclusive). Always `>= start_measure`.
    pub end_measure: u32,
    /// Index of the originating voice.
    pub voice: usize,
}

impl Phrase {
    /// Creates a phrase. The bounds are ordered if given reversed.
    pub fn new(start_measure: u32, end_measure: u32, voice: usize) -> Self {
        Self {
            start_measure: start_measure.min(end_measure),
            end_measure: start_measure.max(end_measure),
            voice,
        }
    }

    /// Number of measures spanned.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end_measure - self.start_measure + 1
    }

    /// Always false; a phrase spans at least one measure.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `measure` lies in this phrase.
    #[inline]
    pub fn contains(&self, measure: u32) -> bool {
        measure >= self.start_measure && measure <= self.end_measure
    }
}

/// Longest phrase in a partition (0 for an empty one).
pub fn longest_phrase(phrases: &[Phrase]) -> u32 {
    phrases.iter().map(Phrase::len).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_len_and_contains() {
        let p = Phrase::new(3, 6, 0);
        assert_eq!(p.len(), 4);
        assert!(p.contains(3));
        assert!(p.contains(6));
        assert!(!p.contains(7));
    }

    #[test]
    fn test_phrase_reversed_bounds() {
        let p = Phrase::new(5, 2, 1);
        assert_eq!(p.start_measure, 2);
        assert_eq!(p.end_measure, 5);
        assert!(p.end_measure >= p.start_measure);
    }

    #[test]
    fn test_longest_phrase() {
        let ps = vec![Phrase::new(1, 2, 0), Phrase::new(3, 7, 0)];
        assert_eq!(longest_phrase(&ps), 5);
        assert_eq!(longest_phrase(&[]), 0);
    }
}

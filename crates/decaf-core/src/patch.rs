//! Byte ranges into source text.
//!
//! Every syntax node, token, and error location in decaf is described by a
//! `Span`. Spans are half-open byte intervals into the original source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte offsets into source content.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Zero-width span at `offset`.
    pub fn empty_at(offset: usize) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if `offset` lies within `[start, end]` (end inclusive).
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let span = Span::new(3, 8);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert!(Span::empty_at(4).is_empty());
        assert_eq!(span.to_string(), "[3, 8)");
    }

    #[test]
    fn span_overlap_and_containment() {
        let a = Span::new(0, 5);
        let b = Span::new(5, 9);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&Span::new(4, 6)));
        assert!(a.contains(&Span::new(1, 5)));
        assert!(!a.contains(&b));
        assert_eq!(a.cover(&b), Span::new(0, 9));
    }

    #[test]
    fn touches_is_end_inclusive() {
        let span = Span::new(2, 4);
        assert!(span.touches(2));
        assert!(span.touches(4));
        assert!(!span.touches(5));
        assert!(!span.touches(1));
    }

    #[test]
    #[should_panic(expected = "must be <= end")]
    fn inverted_span_panics() {
        let _ = Span::new(5, 2);
    }
}

//! Document positions and spans
//!
//! Lines are zero-based physical line indices. Columns are zero-based offsets
//! counted in UTF-16 code units, so positions line up with what editors report.

use serde::{Deserialize, Serialize};

/// A (line, column) location inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    /// Line index (0-indexed)
    pub line: u32,
    /// Column in UTF-16 code units (0-indexed)
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        SourcePosition { line, column }
    }
}

/// An ordered pair of positions
///
/// Name spans end just after the matched header token. Block spans end at the
/// last character of the block's final line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    /// Create a new source span
    pub fn new(start: SourcePosition, end: SourcePosition) -> Self {
        SourceSpan { start, end }
    }

    /// Check if this span contains another span
    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Length of `text` in UTF-16 code units
pub(crate) fn utf16_len(text: &str) -> u32 {
    u32::try_from(text.encode_utf16().count()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, column: u32) -> SourcePosition {
        SourcePosition::new(line, column)
    }

    #[test]
    fn test_position_ordering() {
        assert!(pos(0, 10) < pos(1, 0));
        assert!(pos(2, 3) < pos(2, 4));
        assert_eq!(pos(5, 5), pos(5, 5));
    }

    #[test]
    fn test_contains() {
        let outer = SourceSpan::new(pos(1, 0), pos(5, 12));
        let inner = SourceSpan::new(pos(1, 0), pos(1, 14));
        let outside = SourceSpan::new(pos(0, 0), pos(2, 0));

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&outside));

        // Span contains itself
        assert!(outer.contains(&outer));
    }

    #[test]
    fn test_utf16_len_counts_code_units() {
        assert_eq!(utf16_len("abc"), 3);
        assert_eq!(utf16_len("é"), 1);
        // Astral plane characters take a surrogate pair
        assert_eq!(utf16_len("𝄞"), 2);
    }
}

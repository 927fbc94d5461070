//! Positions and ranges in the source text. Everything is 0-based, and the end of a range
//! is inclusive, so a single character at line 1 column 0 is `((1, 0), (1, 0))`

use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[display(fmt = "({}, {})", line, column)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[display(fmt = "({}, {})", start, end)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl From<(usize, usize)> for TextPosition {
    fn from((line, column): (usize, usize)) -> Self {
        Self { line, column }
    }
}

impl TextRange {
    pub fn new(start: impl Into<TextPosition>, end: impl Into<TextPosition>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// a range that covers exactly one character
    pub fn at(position: TextPosition) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// the smallest range that covers both self and other
    pub fn to(self, other: TextRange) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, position: TextPosition) -> bool {
        self.start <= position && position <= self.end
    }
}

impl<S, E> From<(S, E)> for TextRange
where
    S: Into<TextPosition>,
    E: Into<TextPosition>,
{
    fn from((start, end): (S, E)) -> Self {
        Self::new(start, end)
    }
}

/// Implemented for every node of the syntax and the bound tree, usually via
/// `#[derive(SyntaxNode)]`
pub trait SyntaxNode {
    /// the source range this node was produced from
    fn range(&self) -> TextRange;

    /// name of the node, used by debugging output
    fn kind(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let range = TextRange::new((1, 4), (1, 8));
        assert_eq!(range.to_string(), "((1, 4), (1, 8))");
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = TextRange::new((0, 2), (0, 5));
        assert!(range.contains(TextPosition::new(0, 5)));
        assert!(range.contains(TextPosition::new(0, 2)));
        assert!(!range.contains(TextPosition::new(0, 6)));
        assert!(!range.contains(TextPosition::new(1, 3)));
    }

    #[test]
    fn test_to_spans_both() {
        let a = TextRange::new((2, 4), (2, 6));
        let b = TextRange::new((2, 0), (2, 1));
        assert_eq!(a.to(b), TextRange::new((2, 0), (2, 6)));
    }
}

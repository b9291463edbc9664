//! Source location tracking for diagnostics
//!
//! Locations point either into the text being parsed (a `.sil` or `.swirl`
//! file) or, for instruction metadata, into the original program source the
//! compiler recorded in its dump.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in a text file (line and column are 1-based)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub filename: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// Create a location with filename
    pub fn new(filename: &str, line: u32, column: u32) -> Self {
        Self {
            filename: filename.to_string(),
            line,
            column,
        }
    }

    /// Create a dummy location for testing
    pub fn dummy() -> Self {
        Self::new("<unknown>", 0, 0)
    }

    /// Same file and line, different column
    pub fn with_column(&self, column: u32) -> Self {
        Self {
            filename: self.filename.clone(),
            line: self.line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location() {
        let loc = SourceLocation::new("main.sil", 42, 10);
        assert_eq!(loc.filename, "main.sil");
        assert_eq!(loc.line, 42);
        assert_eq!(loc.column, 10);
        assert_eq!(format!("{}", loc), "main.sil:42:10");
    }

    #[test]
    fn test_with_column() {
        let loc = SourceLocation::new("main.sil", 3, 1).with_column(17);
        assert_eq!(loc, SourceLocation::new("main.sil", 3, 17));
    }
}

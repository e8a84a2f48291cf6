use std::fmt;

use serde::{Deserialize, Serialize};

/// A single point in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeLoc {
    /// Line number, 1-indexed.
    pub line: u32,
    /// Column number, 1-indexed.
    pub column: u32,
}

impl CodeLoc {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Source range information carried by every AST node and every emitted
/// instruction.
///
/// The parser produces these; the compiler only copies them through so the
/// virtual machine can report where a runtime failure came from.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeRange {
    start: CodeLoc,
    end: CodeLoc,
}

/// Custom Debug implementation to make displaying ranges much less verbose.
impl fmt::Debug for CodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}..{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

impl CodeRange {
    pub fn new(start: CodeLoc, end: CodeLoc) -> Self {
        Self { start, end }
    }

    /// Returns the start position.
    #[must_use]
    pub fn start(&self) -> CodeLoc {
        self.start
    }

    /// Returns the end position.
    #[must_use]
    pub fn end(&self) -> CodeLoc {
        self.end
    }

    /// Returns the range covering this range through the end of `end`.
    pub fn extend(&self, end: &CodeRange) -> Self {
        Self {
            start: self.start,
            end: end.end,
        }
    }
}

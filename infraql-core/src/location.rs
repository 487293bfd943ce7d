use core::fmt;

/// A position in the query text, attached to every token.
///
/// `line` and `column` are 1-based; `offset` is the 0-based character
/// offset from the start of the input.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    /// Character offset from the start of the input.
    pub offset: usize,
    /// 1-based line number.
    pub line: u64,
    /// 1-based column number.
    pub column: u64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line: {}, Column: {}", self.line, self.column)
    }
}

impl Location {
    /// Creates a new location from a line-column pair.
    pub fn new(offset: usize, line: u64, column: u64) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Advances the location over the given character.
    pub fn advance(&mut self, ch: char) {
        self.offset += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

#[cfg(not(feature = "std"))]
use alloc::string::String;
use core::fmt;

use infraql_core::Location;

/// Lexer error
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LexerError {
    /// What went wrong.
    pub message: String,
    /// Where it went wrong.
    pub location: Location,
}

impl LexerError {
    /// Creates a new lexer error at the given location.
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LexerError {}

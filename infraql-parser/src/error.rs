#[cfg(not(feature = "std"))]
use alloc::string::String;
use core::fmt;

use infraql_core::Location;
use infraql_lexer::LexerError;

/// Parser error
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParserError {
    /// Tokenize error.
    Tokenize(LexerError),
    /// Parse error, carrying the offending token's location when known.
    Parse {
        /// What went wrong.
        message: String,
        /// The location of the offending token.
        location: Option<Location>,
    },
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::Tokenize(err) => write!(f, "{}", err),
            ParserError::Parse {
                message,
                location: Some(location),
            } => write!(f, "{} at {}", message, location),
            ParserError::Parse {
                message,
                location: None,
            } => write!(f, "{}", message),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParserError {}

impl From<LexerError> for ParserError {
    fn from(err: LexerError) -> Self {
        Self::Tokenize(err)
    }
}

/// A helper function to create a parser error.
pub(crate) fn parse_error<R>(
    message: impl Into<String>,
    location: Option<Location>,
) -> Result<R, ParserError> {
    Err(ParserError::Parse {
        message: message.into(),
        location,
    })
}

#[cfg(not(feature = "std"))]
use alloc::string::String;
use core::fmt;

use crate::{keyword::Keyword, location::Location};

/// A single token of query text.
///
/// Equality compares the token kind only, so statement trees built from
/// differently-positioned but otherwise identical inputs compare equal.
#[derive(Clone, Debug)]
pub struct Token {
    /// What was lexed.
    pub kind: TokenKind,
    /// Where it starts in the source text.
    pub location: Location,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl Token {
    /// Creates a new token at the given location.
    pub fn new(kind: TokenKind, location: Location) -> Self {
        Self { kind, location }
    }

    /// Creates an identifier or keyword token: an upper-cased form matching
    /// the keyword table yields a keyword, anything else stays an
    /// identifier. Both retain the original case of the source text.
    pub fn word(value: impl Into<String>, location: Location) -> Self {
        let value = value.into();
        let kind = match Keyword::lookup(&value) {
            Some(keyword) => TokenKind::Keyword(keyword, value),
            None => TokenKind::Ident(value),
        };
        Self { kind, location }
    }

    /// Returns true if this is a whitespace token.
    pub fn is_whitespace(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace(_))
    }

    /// Returns true if this is a comment token.
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::Comment(_))
    }

    /// Returns true if this token is the given keyword.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.kind, TokenKind::Keyword(kw, _) if kw == keyword)
    }

    /// Returns the matched keyword if this token is one of the expected
    /// keywords.
    pub fn is_one_of_keywords(&self, keywords: &[Keyword]) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(kw, _) => keywords.iter().copied().find(|k| *k == kw),
            _ => None,
        }
    }
}

/// The kind of a [`Token`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum TokenKind {
    /// Whitespace (space, newline, tab).
    Whitespace(Whitespace),
    /// A `--` comment, up to but excluding the trailing newline.
    Comment(String),

    /// An unsigned numeric literal, classified by the parser.
    Number(String),
    /// A quoted string literal, with escape sequences processed.
    String(String),

    /// An identifier, retaining the original case of the source text.
    Ident(String),
    /// A keyword, retaining the original case of the source text; the
    /// canonical upper-case form is [`Keyword::canonical`].
    Keyword(Keyword, String),

    /// Comma `,`
    Comma,
    /// Period `.`
    Period,
    /// SemiColon `;`
    SemiColon,
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Asterisk `*`
    Asterisk,

    /// Equal `=`
    Equal,
    /// Not equal `!=`
    NotEqual,
    /// Less than `<`
    LessThan,
    /// Less than or equal `<=`
    LessThanOrEqual,
    /// Greater than `>`
    GreaterThan,
    /// Greater than or equal `>=`
    GreaterThanOrEqual,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Whitespace(space) => write!(f, "{}", space),
            TokenKind::Comment(comment) => write!(f, "--{}", comment),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "'{}'", s),
            TokenKind::Ident(ident) => write!(f, "{}", ident),
            TokenKind::Keyword(_, text) => write!(f, "{}", text),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Period => f.write_str("."),
            TokenKind::SemiColon => f.write_str(";"),
            TokenKind::LeftParen => f.write_str("("),
            TokenKind::RightParen => f.write_str(")"),
            TokenKind::Asterisk => f.write_str("*"),
            TokenKind::Equal => f.write_str("="),
            TokenKind::NotEqual => f.write_str("!="),
            TokenKind::LessThan => f.write_str("<"),
            TokenKind::LessThanOrEqual => f.write_str("<="),
            TokenKind::GreaterThan => f.write_str(">"),
            TokenKind::GreaterThanOrEqual => f.write_str(">="),
        }
    }
}

/// Whitespace token
#[doc(hidden)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Whitespace {
    Space,
    Newline,
    Tab,
}

impl fmt::Display for Whitespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space => f.write_str(" "),
            Self::Newline => f.write_str("\n"),
            Self::Tab => f.write_str("\t"),
        }
    }
}

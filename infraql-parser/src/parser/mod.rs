mod command;
mod select;

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, format, string::String, vec, vec::Vec};
use core::fmt::Display;
use core::iter::Peekable;

use infraql_ast::Statement;
use infraql_core::{Keyword, Token, TokenKind};
use infraql_lexer::Lexer;

use crate::error::{parse_error, ParserError};

/// Query parser
pub struct Parser {
    iter: Peekable<Box<dyn Iterator<Item = Token>>>,
}

impl Parser {
    /// Creates a new parser with the given tokens.
    pub fn new_with_tokens(tokens: Vec<Token>) -> Self {
        // ignore whitespace and comments.
        let filter = tokens
            .into_iter()
            .filter(|token| !token.is_whitespace() && !token.is_comment());
        Self {
            iter: (Box::new(filter) as Box<dyn Iterator<Item = Token>>).peekable(),
        }
    }

    /// Creates a new parser for the given query text.
    pub fn new_with_text(text: &str) -> Result<Self, ParserError> {
        let tokens = Lexer::new(text).tokenize()?;
        Ok(Self::new_with_tokens(tokens))
    }

    /// Parses a single statement, dispatching on the leading keyword, and
    /// requires the input to end after it (one trailing `;` is accepted).
    pub fn parse_statement(&mut self) -> Result<Statement, ParserError> {
        let statement = match self.peek_token() {
            Some(token) => match token.kind {
                TokenKind::Keyword(Keyword::SELECT, _) => {
                    Statement::Select(self.parse_select_stmt()?)
                }
                TokenKind::Keyword(Keyword::TRACE, _) => Statement::Trace(self.parse_trace_stmt()?),
                TokenKind::Keyword(Keyword::DESCRIBE, _) => {
                    Statement::Describe(self.parse_describe_stmt()?)
                }
                TokenKind::Keyword(Keyword::SHOW, _) => self.parse_show_stmt()?,
                TokenKind::Keyword(Keyword::CACHE, _) => Statement::Cache(self.parse_cache_stmt()?),
                _ => {
                    let found = self.peek_token().cloned();
                    return self.expected("SELECT, TRACE, DESCRIBE, SHOW or CACHE", found);
                }
            },
            None => return parse_error("Empty query", None),
        };
        self.next_token_if_kind(&TokenKind::SemiColon);
        match self.next_token() {
            Some(token) => {
                let location = token.location;
                parse_error(format!("Expected end of input, found: {}", token), Some(location))
            }
            None => Ok(statement),
        }
    }

    /// Parses a comma-separated list of 1+ items accepted by `F`.
    pub fn parse_comma_separated<T, F>(&mut self, mut f: F) -> Result<Vec<T>, ParserError>
    where
        F: FnMut(&mut Parser) -> Result<T, ParserError>,
    {
        let mut values = vec![];
        loop {
            values.push(f(self)?);
            if !self.next_token_if_kind(&TokenKind::Comma) {
                break;
            }
        }
        Ok(values)
    }

    /// Report unexpected token.
    pub fn expected<R>(
        &self,
        expected: impl Display,
        found: Option<Token>,
    ) -> Result<R, ParserError> {
        if let Some(found) = found {
            parse_error(
                format!("Expected: {}, found: {}", expected, found),
                Some(found.location),
            )
        } else {
            parse_error(format!("Expected: {}, but not found", expected), None)
        }
    }

    /// Consumes the next keyword token and returns ok if it matches the
    /// expected keyword, otherwise returns an error.
    pub fn expect_keyword(&mut self, expected: Keyword) -> Result<(), ParserError> {
        if self.parse_keyword(expected) {
            Ok(())
        } else {
            let found = self.peek_token().cloned();
            self.expected(expected, found)
        }
    }

    /// Consumes the next keyword token if the token is one of the expected
    /// keywords.
    pub fn expect_one_of_keywords(&mut self, keywords: &[Keyword]) -> Result<Keyword, ParserError> {
        if let Some(keyword) = self.parse_one_of_keywords(keywords) {
            Ok(keyword)
        } else {
            let found = self.peek_token().cloned();
            self.expected(format!("one of {:?}", keywords), found)
        }
    }

    /// Consumes the next keyword token and returns true if it matches the
    /// expected keyword, otherwise returns false.
    pub fn parse_keyword(&mut self, keyword: Keyword) -> bool {
        self.next_token_if(|token| token.is_keyword(keyword))
            .is_some()
    }

    /// Consumes the next keyword token if the token is one of the expected
    /// keywords.
    pub fn parse_one_of_keywords(&mut self, keywords: &[Keyword]) -> Option<Keyword> {
        let matched = self
            .peek_token()
            .and_then(|token| token.is_one_of_keywords(keywords))?;
        self.next_token();
        Some(matched)
    }

    /// Consumes the next token and returns ok if its kind matches the
    /// expected kind, otherwise returns an error.
    pub fn expect_token(&mut self, expected: &TokenKind) -> Result<(), ParserError> {
        if self.next_token_if_kind(expected) {
            Ok(())
        } else {
            let found = self.peek_token().cloned();
            self.expected(expected, found)
        }
    }

    /// Consumes the next token and returns the identifier it names.
    ///
    /// Keywords that name aggregate functions are accepted as identifiers so
    /// aliases and HAVING fields can reference them; like identifiers they
    /// keep the case the source text used.
    pub fn parse_identifier(&mut self) -> Result<String, ParserError> {
        let value = match self.peek_token().map(|token| token.kind.clone()) {
            Some(TokenKind::Ident(value)) => value,
            Some(TokenKind::Keyword(keyword, text)) if AGGREGATE_KEYWORDS.contains(&keyword) => {
                text
            }
            _ => {
                let found = self.peek_token().cloned();
                return self.expected("identifier", found);
            }
        };
        self.next_token();
        Ok(value)
    }

    /// Parses an optionally qualified `table.column` name into its dotted
    /// source form.
    pub fn parse_qualified_name(&mut self) -> Result<String, ParserError> {
        let mut name = self.parse_identifier()?;
        if self.next_token_if_kind(&TokenKind::Period) {
            let column = self.parse_identifier()?;
            name.push('.');
            name.push_str(&column);
        }
        Ok(name)
    }

    /// Parses an unsigned integer literal.
    pub fn parse_integer(&mut self, what: &str) -> Result<u64, ParserError> {
        let token = match self.peek_token().cloned() {
            Some(token) => token,
            None => return self.expected(format!("non-negative integer {}", what), None),
        };
        if let TokenKind::Number(text) = &token.kind {
            if !text.contains('.') {
                let value = text.parse::<u64>().map_err(|_| ParserError::Parse {
                    message: format!("Invalid {}: {}", what, text),
                    location: Some(token.location),
                })?;
                self.next_token();
                return Ok(value);
            }
        }
        self.expected(format!("non-negative integer {}", what), Some(token))
    }

    /// Returns a reference to the next token without advancing the iterator.
    pub fn peek_token(&mut self) -> Option<&Token> {
        self.iter.peek()
    }

    /// Consumes the next token and returns it.
    pub fn next_token(&mut self) -> Option<Token> {
        self.iter.next()
    }

    /// Consumes the next token and returns it if `func` returns true,
    /// otherwise returns None.
    pub fn next_token_if(&mut self, func: impl FnOnce(&Token) -> bool) -> Option<Token> {
        self.iter.next_if(func)
    }

    /// Consumes the next token and returns true if its kind matches the
    /// expected kind, otherwise returns false.
    pub fn next_token_if_kind(&mut self, expected: &TokenKind) -> bool {
        self.iter.next_if(|token| &token.kind == expected).is_some()
    }
}

pub(crate) const AGGREGATE_KEYWORDS: &[Keyword] = &[
    Keyword::COUNT,
    Keyword::SUM,
    Keyword::AVG,
    Keyword::MIN,
    Keyword::MAX,
];

pub(crate) fn aggregate_func(keyword: Keyword) -> infraql_ast::AggregateFunc {
    use infraql_ast::AggregateFunc;
    match keyword {
        Keyword::COUNT => AggregateFunc::Count,
        Keyword::SUM => AggregateFunc::Sum,
        Keyword::AVG => AggregateFunc::Avg,
        Keyword::MIN => AggregateFunc::Min,
        Keyword::MAX => AggregateFunc::Max,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_dispatch_rejects_unknown_leading_token() {
        let err = crate::parse("EXPLAIN SELECT * FROM services").unwrap_err();
        assert!(matches!(err, ParserError::Parse { .. }));
    }

    #[test]
    fn trailing_semicolon_is_accepted_once() {
        assert!(crate::parse("SHOW TABLES;").is_ok());
        assert!(crate::parse("SHOW TABLES;;").is_err());
        assert!(crate::parse("SHOW TABLES; SELECT 1").is_err());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(crate::parse("").is_err());
        assert!(crate::parse("   -- just a comment").is_err());
    }
}

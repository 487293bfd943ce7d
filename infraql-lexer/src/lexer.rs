#[cfg(not(feature = "std"))]
use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::{iter::Peekable, str::Chars};

use infraql_core::{Location, Token, TokenKind, Whitespace};

use crate::error::LexerError;

/// Query lexer
pub struct Lexer<'a> {
    iter: Peekable<Chars<'a>>,
    location: Location,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            iter: input.chars().peekable(),
            location: Location::default(),
        }
    }

    /// Returns the current location scanned by the lexer.
    pub fn location(&self) -> Location {
        self.location
    }

    /// Tokenizes the input and produces a sequence of tokens.
    ///
    /// Whitespace and comment tokens are kept; the parser filters them out.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = vec![];
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        let start = self.location;
        match self.iter.peek() {
            Some(&ch) => match ch {
                // whitespace
                ' ' | '\t' | '\n' | '\r' => Ok(self
                    .tokenize_whitespace()
                    .map(|ws| Token::new(TokenKind::Whitespace(ws), start))),
                // string literal, single or double quoted
                quote @ '\'' | quote @ '"' => {
                    self.next_char(); // consume the open quotation mark
                    let s = self.tokenize_string_literal(quote, start)?;
                    Ok(Some(Token::new(TokenKind::String(s), start)))
                }
                // identifier or keyword
                ch if is_identifier_start(ch) => {
                    self.next_char(); // consume the identifier start character
                    let word = self.tokenize_word(ch);
                    Ok(Some(Token::word(word, start)))
                }
                // number
                ch if ch.is_ascii_digit() => {
                    let number = self.tokenize_number();
                    Ok(Some(Token::new(TokenKind::Number(number), start)))
                }
                _ => self.tokenize_symbol(start),
            },
            None => Ok(None),
        }
    }

    fn tokenize_whitespace(&mut self) -> Option<Whitespace> {
        self.next_char().map(|ch| match ch {
            ' ' => Whitespace::Space,
            '\t' => Whitespace::Tab,
            '\n' => Whitespace::Newline,
            '\r' => {
                // Emit a single Whitespace::Newline token for \r and \r\n
                if self.iter.peek() == Some(&'\n') {
                    self.next_char();
                }
                Whitespace::Newline
            }
            _ => unreachable!(),
        })
    }

    /// Consumes a string literal whose open quote has already been consumed.
    /// A backslash escapes the next character; an unterminated literal is
    /// reported at the opening quote.
    fn tokenize_string_literal(
        &mut self,
        quote: char,
        start: Location,
    ) -> Result<String, LexerError> {
        let mut s = String::new();
        loop {
            match self.next_char() {
                Some(ch) if ch == quote => return Ok(s),
                Some('\\') => match self.next_char() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some(escaped) => s.push(escaped),
                    None => {
                        return Err(LexerError::new("Unterminated string literal", start));
                    }
                },
                Some(ch) => s.push(ch),
                None => return Err(LexerError::new("Unterminated string literal", start)),
            }
        }
    }

    fn tokenize_word(&mut self, first: char) -> String {
        let mut word = first.to_string();
        word.push_str(&self.next_while(|&ch| is_identifier_part(ch)));
        word
    }

    fn tokenize_number(&mut self) -> String {
        let mut s = self.next_while(|ch| ch.is_ascii_digit());
        // match one period; integer vs real classification is the parser's job
        if self.next_if_is('.') {
            s.push('.');
            s += &self.next_while(|ch| ch.is_ascii_digit());
        }
        s
    }

    fn tokenize_symbol(&mut self, start: Location) -> Result<Option<Token>, LexerError> {
        let ch = match self.next_char() {
            Some(ch) => ch,
            None => return Ok(None),
        };
        let kind = match ch {
            ',' => TokenKind::Comma,
            '.' => TokenKind::Period,
            ';' => TokenKind::SemiColon,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '*' => TokenKind::Asterisk,
            '=' => TokenKind::Equal,
            '<' if self.next_if_is('=') => TokenKind::LessThanOrEqual,
            '<' => TokenKind::LessThan,
            '>' if self.next_if_is('=') => TokenKind::GreaterThanOrEqual,
            '>' => TokenKind::GreaterThan,
            '!' if self.next_if_is('=') => TokenKind::NotEqual,
            '-' if self.next_if_is('-') => {
                let comment = self.next_while(|&ch| ch != '\n');
                TokenKind::Comment(comment)
            }
            other => {
                return Err(LexerError::new(
                    format!("Unexpected character '{}'", other),
                    start,
                ));
            }
        };
        Ok(Some(Token::new(kind, start)))
    }

    /// Consumes the next character and records the current location.
    fn next_char(&mut self) -> Option<char> {
        if let Some(ch) = self.iter.next() {
            self.location.advance(ch);
            Some(ch)
        } else {
            None
        }
    }

    /// Consumes the next character if it matches `ch`, returning true if it
    /// matched.
    #[inline]
    fn next_if_is(&mut self, ch: char) -> bool {
        if self.iter.next_if_eq(&ch).is_some() {
            self.location.advance(ch);
            true
        } else {
            false
        }
    }

    /// Grabs the next characters that match the predicate, as a string.
    fn next_while<F: Fn(&char) -> bool>(&mut self, predicate: F) -> String {
        let mut value = String::new();
        while let Some(ch) = self.iter.next_if(&predicate) {
            self.location.advance(ch);
            value.push(ch);
        }
        value
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

//! # infraql-parser
//!
//! infraql-parser builds a [`Statement`](infraql_ast::Statement) tree from
//! query text, by recursive descent with one-token lookahead.

#![deny(missing_docs)]
#![deny(unused_imports)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod error;
mod parser;

pub use self::{error::ParserError, parser::Parser};

use infraql_ast::Statement;

/// Parses one statement from the given query text.
///
/// Callers split multi-statement input on `;` boundaries first; a single
/// trailing `;` is accepted.
pub fn parse(text: &str) -> Result<Statement, ParserError> {
    Parser::new_with_text(text)?.parse_statement()
}

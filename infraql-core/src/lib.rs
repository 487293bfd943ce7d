//! # infraql-core
//!
//! infraql-core holds the token and keyword types shared by the infraql
//! lexer and parser.

#![deny(missing_docs)]
#![deny(unused_imports)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[macro_use]
mod keyword;
mod location;
mod tokens;

pub use self::{
    keyword::Keyword,
    location::Location,
    tokens::{Token, TokenKind, Whitespace},
};

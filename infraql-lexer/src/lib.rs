//! # infraql-lexer
//!
//! infraql-lexer converts query text into a sequence of tokens with source
//! locations.

#![deny(missing_docs)]
#![deny(unused_imports)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod error;
mod lexer;

pub use self::{error::LexerError, lexer::Lexer};

//! # infraql-ast
//!
//! infraql-ast is the immutable statement model produced by the parser and
//! consumed by the executor.

#![deny(missing_docs)]
#![deny(unused_imports)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod statement;
mod types;
mod utils;

pub use self::{statement::*, types::*};

//! USDA (ASCII) reading and writing.
//!
//! The reader is line oriented: statements are accumulated until their
//! brackets balance, then parsed into literals and converted by declared type.

mod literal;
mod parser;
mod writer;

pub use parser::{parse_stage, ParseError, ParseResult};
pub use writer::write_stage;

//! rsharp_parser: Recursive descent parser for C#.
//!
//! Consumes the scanner's token stream and builds an arena-allocated tree.
//! Syntax errors never abort parsing: the parser reports them to the unit's
//! diagnostic bag, synthesizes missing nodes and keeps going.

mod parser;
mod precedence;
mod utilities;

pub use parser::{ParseOptions, Parser, DEFAULT_MAX_DEPTH};

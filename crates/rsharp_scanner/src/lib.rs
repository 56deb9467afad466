//! rsharp_scanner: Lexer for C# source text.
//!
//! Produces the fully materialized token stream the parser consumes:
//! - Punctuation, operators and reserved keywords
//! - Integer and real literals with type suffixes
//! - Regular and verbatim strings, character literals
//! - Unicode identifiers, including `@`-escaped keywords

mod char_codes;
mod scanner;
mod token;

pub use scanner::{scan_tokens, Scanner};
pub use token::{TokenInfo, TokenStream};

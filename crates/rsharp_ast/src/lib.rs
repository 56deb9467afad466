//! rsharp_ast: Syntax tree definitions for the rsharp front end.
//!
//! Defines the `SyntaxKind` enum shared by the scanner and parser, the flag
//! types, and the arena-allocated node sum types.

pub mod node;
pub mod syntax_kind;
pub mod types;

// Re-export key types
pub use node::*;
pub use syntax_kind::SyntaxKind;
pub use types::*;

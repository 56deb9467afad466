//! rsharp_core: Core utilities shared by every stage of the rsharp front end.
//!
//! Provides text spans and line maps, the per-unit node arena, string
//! interning for identifiers, and the cooperative cancellation token.

pub mod arena;
pub mod cancel;
pub mod intern;
pub mod text;

// Re-export commonly used types
pub use arena::CompilerArena;
pub use cancel::{CancellationToken, Cancelled};
pub use intern::{InternedString, StringInterner};
pub use text::{LineMap, LinePosition, TextRange, TextSpan};

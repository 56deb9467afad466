//! Identifier interning.
//!
//! The parser interns every identifier and label it builds. Scopes in the
//! binder are keyed by the resulting handle, so name lookup never hashes or
//! compares string contents.

use lasso::{Key, Spur, ThreadedRodeo};
use std::fmt;

/// Handle to an interned identifier. Only meaningful together with the
/// interner of the unit that produced it.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct InternedString(Spur);

impl InternedString {
    /// Dense index of the handle, in interning order.
    #[inline]
    pub fn index(self) -> usize {
        self.0.into_usize()
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

/// Per-unit identifier table.
///
/// `intern` takes `&self` so the parser can intern through a shared borrow
/// while it also holds the tree arena.
#[derive(Default)]
pub struct StringInterner {
    names: ThreadedRodeo,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn intern(&self, name: &str) -> InternedString {
        InternedString(self.names.get_or_intern(name))
    }

    /// The text of a handle from this interner.
    #[inline]
    pub fn resolve(&self, name: InternedString) -> &str {
        self.names.resolve(&name.0)
    }

    /// Number of distinct names interned so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Debug for StringInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringInterner({} names)", self.len())
    }
}

//! Arena allocation for syntax trees.
//!
//! Every node of a compilation unit is allocated from one bump arena owned
//! by that unit. The tree is dropped wholesale with the arena.

use bumpalo::Bump;

/// Owns the bump allocator for one compilation unit.
pub struct CompilerArena {
    bump: Bump,
}

impl CompilerArena {
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Create an arena sized for roughly `source_len` bytes of source text.
    pub fn for_source(source_len: usize) -> Self {
        // Trees run a few times larger than their text.
        Self {
            bump: Bump::with_capacity(source_len.saturating_mul(4)),
        }
    }

    /// Get a reference to the underlying bump allocator.
    #[inline]
    pub fn bump(&self) -> &Bump {
        &self.bump
    }

    /// Returns the total bytes allocated in this arena.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

impl Default for CompilerArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_allocates() {
        let arena = CompilerArena::for_source(16);
        let value = arena.bump().alloc(42u32);
        assert_eq!(*value, 42);
        assert!(arena.allocated_bytes() > 0);
    }
}

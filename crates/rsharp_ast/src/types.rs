//! Flag types for tokens, nodes and declarations.

use crate::SyntaxKind;

bitflags::bitflags! {
    /// Flags for syntax nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u16 {
        const NONE                  = 0;
        /// Synthesized by recovery; occupies no source text.
        const MISSING               = 1 << 0;
        const VERBATIM_IDENTIFIER   = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Flags set by the scanner on individual tokens.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TokenFlags: u16 {
        const NONE                  = 0;
        const PRECEDING_LINE_BREAK  = 1 << 0;
        const UNTERMINATED          = 1 << 1;
        const VERBATIM              = 1 << 2;
        const HEX_SPECIFIER         = 1 << 3;
        const BINARY_SPECIFIER      = 1 << 4;
        const REAL                  = 1 << 5;
        const CONTAINS_INVALID_ESCAPE = 1 << 6;
        /// The token text carries a type suffix such as `L` or `m`.
        const SUFFIXED              = 1 << 7;
    }
}

bitflags::bitflags! {
    /// Declaration modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const NONE      = 0;
        const PUBLIC    = 1 << 0;
        const PRIVATE   = 1 << 1;
        const PROTECTED = 1 << 2;
        const INTERNAL  = 1 << 3;
        const STATIC    = 1 << 4;
        const READONLY  = 1 << 5;
        const CONST     = 1 << 6;
        const ABSTRACT  = 1 << 7;
        const SEALED    = 1 << 8;
        const VIRTUAL   = 1 << 9;
        const OVERRIDE  = 1 << 10;
        const EXTERN    = 1 << 11;
        const UNSAFE    = 1 << 12;
        const VOLATILE  = 1 << 13;
        const ASYNC     = 1 << 14;
        const PARTIAL   = 1 << 15;
        const NEW       = 1 << 16;
    }
}

impl Modifiers {
    /// The modifier for a reserved keyword.
    pub fn from_keyword(kind: SyntaxKind) -> Modifiers {
        match kind {
            SyntaxKind::PublicKeyword => Modifiers::PUBLIC,
            SyntaxKind::PrivateKeyword => Modifiers::PRIVATE,
            SyntaxKind::ProtectedKeyword => Modifiers::PROTECTED,
            SyntaxKind::InternalKeyword => Modifiers::INTERNAL,
            SyntaxKind::StaticKeyword => Modifiers::STATIC,
            SyntaxKind::ReadOnlyKeyword => Modifiers::READONLY,
            SyntaxKind::ConstKeyword => Modifiers::CONST,
            SyntaxKind::AbstractKeyword => Modifiers::ABSTRACT,
            SyntaxKind::SealedKeyword => Modifiers::SEALED,
            SyntaxKind::VirtualKeyword => Modifiers::VIRTUAL,
            SyntaxKind::OverrideKeyword => Modifiers::OVERRIDE,
            SyntaxKind::ExternKeyword => Modifiers::EXTERN,
            SyntaxKind::UnsafeKeyword => Modifiers::UNSAFE,
            SyntaxKind::VolatileKeyword => Modifiers::VOLATILE,
            SyntaxKind::NewKeyword => Modifiers::NEW,
            _ => Modifiers::NONE,
        }
    }

    /// The modifier for a contextual keyword spelled `text`.
    pub fn from_contextual(text: &str) -> Modifiers {
        match text {
            "async" => Modifiers::ASYNC,
            "partial" => Modifiers::PARTIAL,
            _ => Modifiers::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_lookup() {
        assert_eq!(Modifiers::from_keyword(SyntaxKind::StaticKeyword), Modifiers::STATIC);
        assert_eq!(Modifiers::from_keyword(SyntaxKind::ForKeyword), Modifiers::NONE);
        assert_eq!(Modifiers::from_contextual("async"), Modifiers::ASYNC);
        assert_eq!(Modifiers::from_keyword(SyntaxKind::InternalKeyword), Modifiers::INTERNAL);
    }
}

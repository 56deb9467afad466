//! Token information produced by the scanner.

use rsharp_ast::syntax_kind::SyntaxKind;
use rsharp_ast::types::TokenFlags;
use rsharp_core::text::TextSpan;

/// Information about a scanned token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub kind: SyntaxKind,
    /// Start offset in the source text, after leading trivia.
    pub pos: u32,
    /// End offset in the source text (exclusive).
    pub end: u32,
    /// Source text of the token. Verbatim identifiers drop the `@`.
    pub text: String,
    pub flags: TokenFlags,
}

impl TokenInfo {
    pub fn new(kind: SyntaxKind, pos: u32, end: u32) -> Self {
        Self {
            kind,
            pos,
            end,
            text: String::new(),
            flags: TokenFlags::NONE,
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = text;
        self
    }

    pub fn with_flags(mut self, flags: TokenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// The length of this token in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.end
    }

    #[inline]
    pub fn span(&self) -> TextSpan {
        TextSpan::from_bounds(self.pos, self.end)
    }

    /// Whether there was a line break before this token.
    #[inline]
    pub fn has_preceding_line_break(&self) -> bool {
        self.flags.contains(TokenFlags::PRECEDING_LINE_BREAK)
    }
}

/// The scanned tokens of one compilation unit, always ending in
/// `EndOfFileToken` at the text length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<TokenInfo>,
}

impl TokenStream {
    pub(crate) fn new(tokens: Vec<TokenInfo>) -> Self {
        debug_assert!(tokens.last().is_some_and(|t| t.kind == SyntaxKind::EndOfFileToken));
        Self { tokens }
    }

    #[inline]
    pub fn tokens(&self) -> &[TokenInfo] {
        &self.tokens
    }

    /// Number of tokens, end of file included.
    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TokenInfo> {
        self.tokens.get(index)
    }

    /// The first token starting at or after `pos`.
    pub fn token_at(&self, pos: u32) -> Option<&TokenInfo> {
        let index = self.tokens.partition_point(|t| t.pos < pos);
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TokenInfo> {
        self.tokens.iter()
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a TokenInfo;
    type IntoIter = std::slice::Iter<'a, TokenInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

//! The C# scanner.
//!
//! Works directly on the UTF-8 bytes of the source, so every token and
//! diagnostic position is a byte offset into the original text.

use crate::char_codes::*;
use crate::token::{TokenInfo, TokenStream};
use memchr::{memchr2, memmem};
use rsharp_ast::syntax_kind::SyntaxKind;
use rsharp_ast::types::TokenFlags;
use rsharp_core::text::TextSpan;
use rsharp_diagnostics::{messages, DiagnosticBag, DiagnosticMessage};

/// Scan `text` to the end, appending lexical diagnostics to `diagnostics`.
pub fn scan_tokens(text: &str, diagnostics: &mut DiagnosticBag) -> TokenStream {
    let mut scanner = Scanner::new(text, diagnostics);
    let mut tokens = Vec::with_capacity(text.len() / 4 + 1);
    loop {
        let kind = scanner.scan();
        tokens.push(scanner.token_info());
        if kind == SyntaxKind::EndOfFileToken {
            break;
        }
    }
    TokenStream::new(tokens)
}

/// Operators that start with the same byte, longest spelling first.
type OperatorTable = &'static [(&'static [u8], SyntaxKind)];

const LESS_THAN_OPERATORS: OperatorTable = &[
    (b"<<=", SyntaxKind::LessThanLessThanEqualsToken),
    (b"<<", SyntaxKind::LessThanLessThanToken),
    (b"<=", SyntaxKind::LessThanEqualsToken),
    (b"<", SyntaxKind::LessThanToken),
];
// `>>` and `>>=` are composed by the parser so that `A<B<C>>` closes twice.
const GREATER_THAN_OPERATORS: OperatorTable = &[
    (b">=", SyntaxKind::GreaterThanEqualsToken),
    (b">", SyntaxKind::GreaterThanToken),
];
const EQUALS_OPERATORS: OperatorTable = &[
    (b"==", SyntaxKind::EqualsEqualsToken),
    (b"=>", SyntaxKind::EqualsGreaterThanToken),
    (b"=", SyntaxKind::EqualsToken),
];
const EXCLAMATION_OPERATORS: OperatorTable = &[
    (b"!=", SyntaxKind::ExclamationEqualsToken),
    (b"!", SyntaxKind::ExclamationToken),
];
const PLUS_OPERATORS: OperatorTable = &[
    (b"++", SyntaxKind::PlusPlusToken),
    (b"+=", SyntaxKind::PlusEqualsToken),
    (b"+", SyntaxKind::PlusToken),
];
const MINUS_OPERATORS: OperatorTable = &[
    (b"--", SyntaxKind::MinusMinusToken),
    (b"-=", SyntaxKind::MinusEqualsToken),
    (b"-", SyntaxKind::MinusToken),
];
const ASTERISK_OPERATORS: OperatorTable = &[
    (b"*=", SyntaxKind::AsteriskEqualsToken),
    (b"*", SyntaxKind::AsteriskToken),
];
const SLASH_OPERATORS: OperatorTable = &[
    (b"/=", SyntaxKind::SlashEqualsToken),
    (b"/", SyntaxKind::SlashToken),
];
const PERCENT_OPERATORS: OperatorTable = &[
    (b"%=", SyntaxKind::PercentEqualsToken),
    (b"%", SyntaxKind::PercentToken),
];
const AMPERSAND_OPERATORS: OperatorTable = &[
    (b"&&", SyntaxKind::AmpersandAmpersandToken),
    (b"&=", SyntaxKind::AmpersandEqualsToken),
    (b"&", SyntaxKind::AmpersandToken),
];
const BAR_OPERATORS: OperatorTable = &[
    (b"||", SyntaxKind::BarBarToken),
    (b"|=", SyntaxKind::BarEqualsToken),
    (b"|", SyntaxKind::BarToken),
];
const CARET_OPERATORS: OperatorTable = &[
    (b"^=", SyntaxKind::CaretEqualsToken),
    (b"^", SyntaxKind::CaretToken),
];
const COLON_OPERATORS: OperatorTable = &[
    (b"::", SyntaxKind::ColonColonToken),
    (b":", SyntaxKind::ColonToken),
];

/// The scanner converts C# source text into tokens.
pub struct Scanner<'s, 'd> {
    text: &'s str,
    bytes: &'s [u8],
    /// Current byte position.
    pos: usize,
    /// Start of the current token (after leading trivia).
    token_start: usize,
    token: SyntaxKind,
    token_flags: TokenFlags,
    diagnostics: &'d mut DiagnosticBag,
}

impl<'s, 'd> Scanner<'s, 'd> {
    pub fn new(text: &'s str, diagnostics: &'d mut DiagnosticBag) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            token_start: 0,
            token: SyntaxKind::Unknown,
            token_flags: TokenFlags::NONE,
            diagnostics,
        }
    }

    #[inline]
    pub fn token(&self) -> SyntaxKind {
        self.token
    }

    /// Start of the current token (after trivia).
    #[inline]
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// End of the current token.
    #[inline]
    pub fn token_end(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn token_flags(&self) -> TokenFlags {
        self.token_flags
    }

    #[inline]
    pub fn has_preceding_line_break(&self) -> bool {
        self.token_flags.contains(TokenFlags::PRECEDING_LINE_BREAK)
    }

    /// Source text of the current token; a verbatim identifier loses its `@`.
    pub fn token_text(&self) -> &'s str {
        let start = if self.token == SyntaxKind::IdentifierToken
            && self.token_flags.contains(TokenFlags::VERBATIM)
        {
            self.token_start + 1
        } else {
            self.token_start
        };
        self.text.get(start..self.pos).unwrap_or_default()
    }

    pub fn token_info(&self) -> TokenInfo {
        TokenInfo::new(self.token, self.token_start as u32, self.pos as u32)
            .with_text(self.token_text().to_string())
            .with_flags(self.token_flags)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    #[inline]
    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    #[inline]
    fn current_byte(&self) -> Option<u8> {
        self.byte_at(0)
    }

    /// Decode the character at the current position.
    #[inline]
    fn current_char(&self) -> Option<char> {
        self.text.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    /// Step over one character, however many bytes it takes.
    #[inline]
    fn advance_char(&mut self) {
        self.pos += self.current_char().map_or(1, char::len_utf8);
    }

    #[inline]
    fn advance(&mut self, len: usize, kind: SyntaxKind) -> SyntaxKind {
        self.pos += len;
        kind
    }

    fn skip_while(&mut self, predicate: impl Fn(u8) -> bool) -> usize {
        let start = self.pos;
        while self.current_byte().is_some_and(&predicate) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn report(&mut self, message: &'static DiagnosticMessage, start: usize, end: usize, args: &[&str]) {
        let span = TextSpan::from_bounds(start as u32, end as u32);
        self.diagnostics.report(message, span, args);
    }

    // ========================================================================
    // Trivia
    // ========================================================================

    fn skip_trivia(&mut self) {
        while let Some(b) = self.current_byte() {
            match b {
                CARRIAGE_RETURN | LINE_FEED => {
                    self.token_flags |= TokenFlags::PRECEDING_LINE_BREAK;
                    self.pos += 1;
                }
                _ if is_ascii_white_space_single_line(b) => self.pos += 1,
                SLASH if self.byte_at(1) == Some(SLASH) => {
                    let bytes = self.bytes;
                    let rest = &bytes[self.pos..];
                    self.pos += memchr2(LINE_FEED, CARRIAGE_RETURN, rest).unwrap_or(rest.len());
                }
                SLASH if self.byte_at(1) == Some(ASTERISK) => self.skip_block_comment(),
                _ if !b.is_ascii() => match self.current_char() {
                    Some(ch) if is_unicode_white_space(ch) => self.pos += ch.len_utf8(),
                    _ => return,
                },
                _ => return,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.pos;
        let bytes = self.bytes;
        let body = &bytes[start + 2..];
        let (len, terminated) = match memmem::find(body, b"*/") {
            Some(offset) => (offset, true),
            None => (body.len(), false),
        };
        if memchr2(LINE_FEED, CARRIAGE_RETURN, &body[..len]).is_some() {
            self.token_flags |= TokenFlags::PRECEDING_LINE_BREAK;
        }
        if terminated {
            self.pos = start + 2 + len + 2;
        } else {
            self.pos = self.bytes.len();
            self.report(&messages::END_OF_FILE_FOUND_COMMENT_EXPECTED, start, start + 2, &[]);
        }
    }

    // ========================================================================
    // Core scanning
    // ========================================================================

    /// Scan the next token and return its kind.
    pub fn scan(&mut self) -> SyntaxKind {
        self.token_flags = TokenFlags::NONE;
        loop {
            self.skip_trivia();
            self.token_start = self.pos;
            let Some(b) = self.current_byte() else {
                self.token = SyntaxKind::EndOfFileToken;
                return self.token;
            };
            if let Some(kind) = self.scan_token(b) {
                self.token = kind;
                return kind;
            }
        }
    }

    /// Scan one token starting with byte `b`. Returns `None` after skipping
    /// a character that cannot start a token.
    fn scan_token(&mut self, b: u8) -> Option<SyntaxKind> {
        let kind = match b {
            b'(' => self.advance(1, SyntaxKind::OpenParenToken),
            b')' => self.advance(1, SyntaxKind::CloseParenToken),
            b'{' => self.advance(1, SyntaxKind::OpenBraceToken),
            b'}' => self.advance(1, SyntaxKind::CloseBraceToken),
            b'[' => self.advance(1, SyntaxKind::OpenBracketToken),
            b']' => self.advance(1, SyntaxKind::CloseBracketToken),
            b';' => self.advance(1, SyntaxKind::SemicolonToken),
            b',' => self.advance(1, SyntaxKind::CommaToken),
            b'~' => self.advance(1, SyntaxKind::TildeToken),

            DOT => {
                if self.byte_at(1).is_some_and(is_digit) {
                    self.scan_number()
                } else {
                    self.advance(1, SyntaxKind::DotToken)
                }
            }
            b'?' => self.scan_question(),
            b':' => self.scan_operator(COLON_OPERATORS),
            b'<' => self.scan_operator(LESS_THAN_OPERATORS),
            b'>' => self.scan_operator(GREATER_THAN_OPERATORS),
            b'=' => self.scan_operator(EQUALS_OPERATORS),
            b'!' => self.scan_operator(EXCLAMATION_OPERATORS),
            b'+' => self.scan_operator(PLUS_OPERATORS),
            b'-' => self.scan_operator(MINUS_OPERATORS),
            b'*' => self.scan_operator(ASTERISK_OPERATORS),
            b'/' => self.scan_operator(SLASH_OPERATORS),
            b'%' => self.scan_operator(PERCENT_OPERATORS),
            b'&' => self.scan_operator(AMPERSAND_OPERATORS),
            b'|' => self.scan_operator(BAR_OPERATORS),
            b'^' => self.scan_operator(CARET_OPERATORS),

            DOUBLE_QUOTE => self.scan_string_literal(),
            SINGLE_QUOTE => self.scan_character_literal(),
            AT => return self.scan_at(),

            b'0'..=b'9' => self.scan_number(),

            _ => match self.current_char() {
                Some(ch) if is_identifier_start(ch) => self.scan_identifier(),
                Some(ch) => {
                    self.skip_unexpected_character(ch);
                    return None;
                }
                None => {
                    self.pos += 1;
                    return None;
                }
            },
        };
        Some(kind)
    }

    fn skip_unexpected_character(&mut self, ch: char) {
        let start = self.pos;
        self.pos += ch.len_utf8();
        let text = ch.to_string();
        self.report(&messages::UNEXPECTED_CHARACTER, start, self.pos, &[&text]);
    }

    fn scan_operator(&mut self, table: OperatorTable) -> SyntaxKind {
        let bytes = self.bytes;
        let rest = &bytes[self.pos..];
        for (spelling, kind) in table {
            if rest.starts_with(spelling) {
                return self.advance(spelling.len(), *kind);
            }
        }
        // Tables always end with the single-byte spelling.
        self.advance(1, SyntaxKind::Unknown)
    }

    fn scan_question(&mut self) -> SyntaxKind {
        match (self.byte_at(1), self.byte_at(2)) {
            (Some(b'?'), Some(b'=')) => self.advance(3, SyntaxKind::QuestionQuestionEqualsToken),
            (Some(b'?'), _) => self.advance(2, SyntaxKind::QuestionQuestionToken),
            // `c ?.5 : x` is a conditional, not a null-conditional access.
            (Some(DOT), next) if !next.is_some_and(is_digit) => {
                self.advance(2, SyntaxKind::QuestionDotToken)
            }
            _ => self.advance(1, SyntaxKind::QuestionToken),
        }
    }

    fn scan_at(&mut self) -> Option<SyntaxKind> {
        if self.byte_at(1) == Some(DOUBLE_QUOTE) {
            return Some(self.scan_verbatim_string());
        }
        let next = self.text.get(self.pos + 1..).and_then(|rest| rest.chars().next());
        if next.is_some_and(is_identifier_start) {
            self.token_flags |= TokenFlags::VERBATIM;
            self.pos += 1;
            self.scan_identifier_part();
            return Some(SyntaxKind::IdentifierToken);
        }
        self.skip_unexpected_character('@');
        None
    }

    // ========================================================================
    // Identifiers
    // ========================================================================

    fn scan_identifier(&mut self) -> SyntaxKind {
        let start = self.pos;
        self.scan_identifier_part();
        let text = self.text.get(start..self.pos).unwrap_or_default();
        SyntaxKind::from_keyword(text).unwrap_or(SyntaxKind::IdentifierToken)
    }

    fn scan_identifier_part(&mut self) {
        while let Some(b) = self.current_byte() {
            if b.is_ascii() {
                if b.is_ascii_alphanumeric() || b == UNDERSCORE {
                    self.pos += 1;
                    continue;
                }
                return;
            }
            match self.current_char() {
                Some(ch) if is_identifier_part(ch) => self.pos += ch.len_utf8(),
                _ => return,
            }
        }
    }

    // ========================================================================
    // Numbers
    // ========================================================================

    fn scan_number(&mut self) -> SyntaxKind {
        let start = self.pos;

        if self.current_byte() == Some(b'0') {
            match self.byte_at(1) {
                Some(b'x' | b'X') => {
                    return self.scan_radix_number(start, TokenFlags::HEX_SPECIFIER, is_hex_digit)
                }
                Some(b'b' | b'B') => {
                    return self.scan_radix_number(start, TokenFlags::BINARY_SPECIFIER, is_binary_digit)
                }
                _ => {}
            }
        }

        self.skip_while(|b| is_digit(b) || b == UNDERSCORE);

        if self.current_byte() == Some(DOT) && self.byte_at(1).is_some_and(is_digit) {
            self.pos += 1;
            self.token_flags |= TokenFlags::REAL;
            self.skip_while(|b| is_digit(b) || b == UNDERSCORE);
        }

        if let Some(b'e' | b'E') = self.current_byte() {
            self.pos += 1;
            self.token_flags |= TokenFlags::REAL;
            if let Some(b'+' | b'-') = self.current_byte() {
                self.pos += 1;
            }
            if self.skip_while(is_digit) == 0 {
                self.report(&messages::INVALID_NUMBER, start, self.pos, &[]);
            }
        }

        match self.current_byte() {
            Some(b'f' | b'F' | b'd' | b'D' | b'm' | b'M') => {
                self.pos += 1;
                self.token_flags |= TokenFlags::REAL | TokenFlags::SUFFIXED;
            }
            _ if !self.token_flags.contains(TokenFlags::REAL) => self.scan_integer_suffix(),
            _ => {}
        }
        SyntaxKind::NumericLiteralToken
    }

    fn scan_radix_number(&mut self, start: usize, flag: TokenFlags, is_radix_digit: fn(u8) -> bool) -> SyntaxKind {
        self.pos += 2;
        self.token_flags |= flag;
        if self.skip_while(|b| is_radix_digit(b) || b == UNDERSCORE) == 0 {
            self.report(&messages::INVALID_NUMBER, start, self.pos, &[]);
        }
        self.scan_integer_suffix();
        SyntaxKind::NumericLiteralToken
    }

    /// `u`, `l`, `ul` or `lu` in any case.
    fn scan_integer_suffix(&mut self) {
        let is_unsigned = |b: Option<u8>| matches!(b, Some(b'u' | b'U'));
        let is_long = |b: Option<u8>| matches!(b, Some(b'l' | b'L'));
        let first = self.current_byte();
        if is_unsigned(first) || is_long(first) {
            self.pos += 1;
            self.token_flags |= TokenFlags::SUFFIXED;
            let second = self.current_byte();
            if (is_unsigned(first) && is_long(second)) || (is_long(first) && is_unsigned(second)) {
                self.pos += 1;
            }
        }
    }

    // ========================================================================
    // Strings and characters
    // ========================================================================

    fn scan_string_literal(&mut self) -> SyntaxKind {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.current_byte() {
                Some(DOUBLE_QUOTE) => {
                    self.pos += 1;
                    break;
                }
                Some(BACKSLASH) => self.scan_escape_sequence(),
                Some(b) if !is_line_break(b) => self.advance_char(),
                _ => {
                    self.token_flags |= TokenFlags::UNTERMINATED;
                    self.report(&messages::NEWLINE_IN_CONSTANT, start, self.pos, &[]);
                    break;
                }
            }
        }
        SyntaxKind::StringLiteralToken
    }

    /// `@"..."`: no escapes except `""`, may span lines.
    fn scan_verbatim_string(&mut self) -> SyntaxKind {
        let start = self.pos;
        self.pos += 2;
        self.token_flags |= TokenFlags::VERBATIM;
        loop {
            match self.current_byte() {
                Some(DOUBLE_QUOTE) if self.byte_at(1) == Some(DOUBLE_QUOTE) => self.pos += 2,
                Some(DOUBLE_QUOTE) => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.advance_char(),
                None => {
                    self.token_flags |= TokenFlags::UNTERMINATED;
                    self.report(&messages::UNTERMINATED_STRING_LITERAL, start, self.pos, &[]);
                    break;
                }
            }
        }
        SyntaxKind::StringLiteralToken
    }

    fn scan_character_literal(&mut self) -> SyntaxKind {
        let start = self.pos;
        self.pos += 1;
        let mut count = 0;
        loop {
            match self.current_byte() {
                Some(SINGLE_QUOTE) => {
                    self.pos += 1;
                    break;
                }
                Some(BACKSLASH) => {
                    self.scan_escape_sequence();
                    count += 1;
                }
                Some(b) if !is_line_break(b) => {
                    self.advance_char();
                    count += 1;
                }
                _ => {
                    self.token_flags |= TokenFlags::UNTERMINATED;
                    self.report(&messages::NEWLINE_IN_CONSTANT, start, self.pos, &[]);
                    return SyntaxKind::CharacterLiteralToken;
                }
            }
        }
        match count {
            0 => self.report(&messages::EMPTY_CHARACTER_LITERAL, start, self.pos, &[]),
            1 => {}
            _ => self.report(&messages::TOO_MANY_CHARACTERS_IN_CHARACTER_LITERAL, start, self.pos, &[]),
        }
        SyntaxKind::CharacterLiteralToken
    }

    fn scan_escape_sequence(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let valid = match self.current_byte() {
            Some(b'\'' | b'"' | b'\\' | b'0' | b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v') => {
                self.pos += 1;
                true
            }
            Some(b'u') => self.scan_hex_escape(4, 4),
            Some(b'U') => self.scan_hex_escape(8, 8),
            Some(b'x') => self.scan_hex_escape(1, 4),
            Some(b) if !is_line_break(b) => {
                self.advance_char();
                false
            }
            // The enclosing literal reports the line break or end of file.
            _ => false,
        };
        if !valid {
            self.token_flags |= TokenFlags::CONTAINS_INVALID_ESCAPE;
            self.report(&messages::UNRECOGNIZED_ESCAPE_SEQUENCE, start, self.pos, &[]);
        }
    }

    fn scan_hex_escape(&mut self, min: usize, max: usize) -> bool {
        self.pos += 1;
        let mut digits = 0;
        while digits < max && self.current_byte().is_some_and(is_hex_digit) {
            self.pos += 1;
            digits += 1;
        }
        digits >= min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<SyntaxKind> {
        let mut bag = DiagnosticBag::new();
        scan_tokens(text, &mut bag).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_stream_ends_with_eof_at_text_length() {
        let mut bag = DiagnosticBag::new();
        let stream = scan_tokens("for (;;) { }  ", &mut bag);
        let eof = &stream.tokens()[stream.len() - 1];
        assert_eq!(eof.kind, SyntaxKind::EndOfFileToken);
        assert_eq!(eof.pos, 14);
        assert!(eof.is_empty());
    }

    #[test]
    fn test_greater_than_is_never_joined() {
        assert_eq!(
            kinds(">> >>= >="),
            vec![
                SyntaxKind::GreaterThanToken,
                SyntaxKind::GreaterThanToken,
                SyntaxKind::GreaterThanToken,
                SyntaxKind::GreaterThanEqualsToken,
                SyntaxKind::GreaterThanEqualsToken,
                SyntaxKind::EndOfFileToken,
            ]
        );
    }

    #[test]
    fn test_question_dot_before_digit() {
        assert_eq!(
            kinds("a?.5"),
            vec![
                SyntaxKind::IdentifierToken,
                SyntaxKind::QuestionToken,
                SyntaxKind::NumericLiteralToken,
                SyntaxKind::EndOfFileToken,
            ]
        );
    }
}

//! Byte and character classification used by the scanner.

use unicode_xid::UnicodeXID;

pub const LINE_FEED: u8 = b'\n';
pub const CARRIAGE_RETURN: u8 = b'\r';
pub const SPACE: u8 = b' ';
pub const TAB: u8 = b'\t';
pub const VERTICAL_TAB: u8 = 0x0B;
pub const FORM_FEED: u8 = 0x0C;

pub const DOUBLE_QUOTE: u8 = b'"';
pub const SINGLE_QUOTE: u8 = b'\'';
pub const BACKSLASH: u8 = b'\\';
pub const AT: u8 = b'@';
pub const SLASH: u8 = b'/';
pub const ASTERISK: u8 = b'*';
pub const DOT: u8 = b'.';
pub const UNDERSCORE: u8 = b'_';

/// Byte order mark, tolerated as whitespace anywhere.
pub const BYTE_ORDER_MARK: char = '\u{FEFF}';

#[inline]
pub fn is_line_break(b: u8) -> bool {
    b == LINE_FEED || b == CARRIAGE_RETURN
}

/// ASCII whitespace other than line breaks.
#[inline]
pub fn is_ascii_white_space_single_line(b: u8) -> bool {
    matches!(b, SPACE | TAB | VERTICAL_TAB | FORM_FEED)
}

/// Non-ASCII whitespace (Unicode category Zs) plus the byte order mark.
#[inline]
pub fn is_unicode_white_space(ch: char) -> bool {
    matches!(
        ch,
        '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | BYTE_ORDER_MARK
    )
}

#[inline]
pub fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

#[inline]
pub fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

#[inline]
pub fn is_binary_digit(b: u8) -> bool {
    b == b'0' || b == b'1'
}

#[inline]
pub fn is_identifier_start(ch: char) -> bool {
    if ch.is_ascii() {
        ch.is_ascii_alphabetic() || ch == '_'
    } else {
        UnicodeXID::is_xid_start(ch)
    }
}

#[inline]
pub fn is_identifier_part(ch: char) -> bool {
    if ch.is_ascii() {
        ch.is_ascii_alphanumeric() || ch == '_'
    } else {
        UnicodeXID::is_xid_continue(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_classes() {
        assert!(is_identifier_start('_'));
        assert!(is_identifier_start('é'));
        assert!(!is_identifier_start('1'));
        assert!(is_identifier_part('1'));
        assert!(!is_identifier_part('-'));
    }

    #[test]
    fn test_white_space() {
        assert!(is_ascii_white_space_single_line(b'\t'));
        assert!(!is_ascii_white_space_single_line(b'\n'));
        assert!(is_unicode_white_space('\u{00A0}'));
        assert!(!is_unicode_white_space('a'));
    }
}

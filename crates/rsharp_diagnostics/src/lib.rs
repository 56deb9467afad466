//! rsharp_diagnostics: Diagnostic messages and error reporting infrastructure.
//!
//! Defines the diagnostic catalog, the per-unit `DiagnosticBag` that the
//! scanner, parser, binder and flow pass append to, the text and JSON
//! renderers, and the verification helpers used by tests.

pub mod render;
pub mod verify;

use rsharp_core::text::TextSpan;
use serde::Serialize;
use std::fmt;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hidden,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hidden => write!(f, "hidden"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message template with a code and default severity.
#[derive(Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    /// The numeric code, printed as `CS` followed by four digits.
    pub code: u32,
    /// The severity a diagnostic gets unless options override it.
    pub severity: Severity,
    /// Warning level (1-4) at which a warning starts being reported. 0 for errors.
    pub level: u8,
    /// The message template string. May contain `{0}`, `{1}`, etc. placeholders.
    pub template: &'static str,
}

impl DiagnosticMessage {
    /// The printed identifier, e.g. `CS1002`.
    pub fn id(&self) -> String {
        format_code(self.code)
    }
}

/// Format a numeric code as its printed identifier.
pub fn format_code(code: u32) -> String {
    format!("CS{:04}", code)
}

/// Parse a `CS1002`-style identifier (the prefix is optional and case-insensitive).
pub fn parse_code(id: &str) -> Option<u32> {
    let digits = match id.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("cs") => &id[2..],
        _ => id,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A realized diagnostic: a catalog entry, its location and its arguments.
///
/// Line and column are not stored; they are derived from the span through
/// the unit's `LineMap` when rendering.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: &'static DiagnosticMessage,
    pub severity: Severity,
    pub span: TextSpan,
    pub arguments: Vec<String>,
}

impl Diagnostic {
    pub fn new(message: &'static DiagnosticMessage, span: TextSpan, args: &[&str]) -> Self {
        Self {
            message,
            severity: message.severity,
            span,
            arguments: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[inline]
    pub fn code(&self) -> u32 {
        self.message.code
    }

    pub fn id(&self) -> String {
        self.message.id()
    }

    /// The message text with arguments substituted.
    pub fn message_text(&self) -> String {
        let args: Vec<&str> = self.arguments.iter().map(String::as_str).collect();
        format_message(self.message.template, &args)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl PartialEq for Diagnostic {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
            && self.severity == other.severity
            && self.span == other.span
            && self.arguments == other.arguments
    }
}

impl Eq for Diagnostic {}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.id(), self.message_text())
    }
}

/// Format a diagnostic message template by replacing `{0}`, `{1}`, etc. with arguments.
///
/// The template is read once from left to right, so argument text is never
/// substituted again. Placeholders without a matching argument are kept.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = after
            .find('}')
            .and_then(|close| Some((close, after[..close].parse::<usize>().ok()?)))
            .and_then(|(close, index)| Some((close, *args.get(index)?)));
        match placeholder {
            Some((close, arg)) => {
                result.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                result.push('{');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

/// The ordered diagnostics of one compilation unit.
///
/// Insertion order is detection order and is the canonical order for
/// comparison. The bag only grows; sorted views are copies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Append a diagnostic built from a catalog entry.
    pub fn report(&mut self, message: &'static DiagnosticMessage, span: TextSpan, args: &[&str]) {
        self.add(Diagnostic::new(message, span, args));
    }

    /// Move every diagnostic of `other` to the end of this bag.
    pub fn append(&mut self, other: DiagnosticBag) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// A copy sorted by position. Diagnostics at the same position keep
    /// their detection order.
    pub fn sorted(&self) -> Vec<Diagnostic> {
        let mut sorted = self.diagnostics.clone();
        sorted.sort_by_key(|d| (d.span.start, d.span.length));
        sorted
    }
}

impl<'a> IntoIterator for &'a DiagnosticBag {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

// ============================================================================
// Diagnostic Messages
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, Error, $msg:expr) => {
            DiagnosticMessage { code: $code, severity: Severity::Error, level: 0, template: $msg }
        };
        ($code:expr, Warning($level:expr), $msg:expr) => {
            DiagnosticMessage { code: $code, severity: Severity::Warning, level: $level, template: $msg }
        };
    }

    // ========================================================================
    // Scanner errors
    // ========================================================================

    pub const UNRECOGNIZED_ESCAPE_SEQUENCE: DiagnosticMessage = diag!(1009, Error, "Unrecognized escape sequence");
    pub const NEWLINE_IN_CONSTANT: DiagnosticMessage = diag!(1010, Error, "Newline in constant");
    pub const EMPTY_CHARACTER_LITERAL: DiagnosticMessage = diag!(1011, Error, "Empty character literal");
    pub const TOO_MANY_CHARACTERS_IN_CHARACTER_LITERAL: DiagnosticMessage = diag!(1012, Error, "Too many characters in character literal");
    pub const INVALID_NUMBER: DiagnosticMessage = diag!(1013, Error, "Invalid number");
    pub const END_OF_FILE_FOUND_COMMENT_EXPECTED: DiagnosticMessage = diag!(1035, Error, "End-of-file found, '*/' expected");
    pub const UNTERMINATED_STRING_LITERAL: DiagnosticMessage = diag!(1039, Error, "Unterminated string literal");
    pub const UNEXPECTED_CHARACTER: DiagnosticMessage = diag!(1056, Error, "Unexpected character '{0}'");

    // ========================================================================
    // Parser errors
    // ========================================================================

    pub const IDENTIFIER_EXPECTED: DiagnosticMessage = diag!(1001, Error, "Identifier expected");
    pub const SEMICOLON_EXPECTED: DiagnosticMessage = diag!(1002, Error, "; expected");
    pub const SYNTAX_ERROR_0_EXPECTED: DiagnosticMessage = diag!(1003, Error, "Syntax error, '{0}' expected");
    pub const TYPE_OR_NAMESPACE_DEFINITION_OR_END_OF_FILE_EXPECTED: DiagnosticMessage = diag!(1022, Error, "Type or namespace definition, or end-of-file expected");
    pub const CLOSE_PAREN_EXPECTED: DiagnosticMessage = diag!(1026, Error, ") expected");
    pub const TYPE_EXPECTED: DiagnosticMessage = diag!(1031, Error, "Type expected");
    pub const RBRACE_EXPECTED: DiagnosticMessage = diag!(1513, Error, "} expected");
    pub const LBRACE_EXPECTED: DiagnosticMessage = diag!(1514, Error, "{ expected");
    pub const INVALID_TOKEN_0_IN_MEMBER_DECLARATION: DiagnosticMessage = diag!(1519, Error, "Invalid token '{0}' in class, record, struct, or interface member declaration");
    pub const INVALID_EXPRESSION_TERM_0: DiagnosticMessage = diag!(1525, Error, "Invalid expression term '{0}'");
    pub const NEW_EXPRESSION_REQUIRES_ARGUMENTS: DiagnosticMessage = diag!(1526, Error, "A new expression requires an argument list or (), [], or {} after type");
    pub const EXPRESSION_EXPECTED: DiagnosticMessage = diag!(1733, Error, "Expected expression");
    pub const QUERY_BODY_MUST_END_WITH_SELECT_OR_GROUP: DiagnosticMessage = diag!(742, Error, "A query body must end with a select clause or a group clause");
    pub const ONLY_ASSIGNMENT_CALL_INCREMENT_DECREMENT_AWAIT_AND_NEW_AS_STATEMENT: DiagnosticMessage = diag!(201, Error, "Only assignment, call, increment, decrement, await, and new object expressions can be used as a statement");
    pub const EXPRESSION_TOO_LONG_OR_COMPLEX: DiagnosticMessage = diag!(8078, Error, "An expression is too long or complex to compile");

    // ========================================================================
    // Binder errors
    // ========================================================================

    pub const CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1: DiagnosticMessage = diag!(29, Error, "Cannot implicitly convert type '{0}' to '{1}'");
    pub const CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1_EXPLICIT_EXISTS: DiagnosticMessage = diag!(266, Error, "Cannot implicitly convert type '{0}' to '{1}'. An explicit conversion exists (are you missing a cast?)");
    pub const CANNOT_CONVERT_TYPE_0_TO_1: DiagnosticMessage = diag!(30, Error, "Cannot convert type '{0}' to '{1}'");
    pub const LOCAL_0_ALREADY_DEFINED_IN_SCOPE: DiagnosticMessage = diag!(128, Error, "A local variable or function named '{0}' is already defined in this scope");
    pub const NO_ENCLOSING_LOOP: DiagnosticMessage = diag!(139, Error, "No enclosing loop out of which to break or continue");
    pub const LABEL_0_IS_A_DUPLICATE: DiagnosticMessage = diag!(140, Error, "The label '{0}' is a duplicate");
    pub const NO_SUCH_LABEL_0_WITHIN_SCOPE_OF_GOTO: DiagnosticMessage = diag!(159, Error, "No such label '{0}' within the scope of the goto statement");

    // ========================================================================
    // Flow analysis warnings
    // ========================================================================

    pub const UNREACHABLE_CODE_DETECTED: DiagnosticMessage = diag!(162, Warning(2), "Unreachable code detected");
    pub const LABEL_NOT_REFERENCED: DiagnosticMessage = diag!(164, Warning(2), "This label has not been referenced");

    /// Every catalog entry, for lookups by code.
    pub static ALL: &[&DiagnosticMessage] = &[
        &UNRECOGNIZED_ESCAPE_SEQUENCE,
        &NEWLINE_IN_CONSTANT,
        &EMPTY_CHARACTER_LITERAL,
        &TOO_MANY_CHARACTERS_IN_CHARACTER_LITERAL,
        &INVALID_NUMBER,
        &END_OF_FILE_FOUND_COMMENT_EXPECTED,
        &UNTERMINATED_STRING_LITERAL,
        &UNEXPECTED_CHARACTER,
        &IDENTIFIER_EXPECTED,
        &SEMICOLON_EXPECTED,
        &SYNTAX_ERROR_0_EXPECTED,
        &TYPE_OR_NAMESPACE_DEFINITION_OR_END_OF_FILE_EXPECTED,
        &CLOSE_PAREN_EXPECTED,
        &TYPE_EXPECTED,
        &RBRACE_EXPECTED,
        &LBRACE_EXPECTED,
        &INVALID_TOKEN_0_IN_MEMBER_DECLARATION,
        &INVALID_EXPRESSION_TERM_0,
        &NEW_EXPRESSION_REQUIRES_ARGUMENTS,
        &EXPRESSION_EXPECTED,
        &QUERY_BODY_MUST_END_WITH_SELECT_OR_GROUP,
        &ONLY_ASSIGNMENT_CALL_INCREMENT_DECREMENT_AWAIT_AND_NEW_AS_STATEMENT,
        &EXPRESSION_TOO_LONG_OR_COMPLEX,
        &CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1,
        &CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1_EXPLICIT_EXISTS,
        &CANNOT_CONVERT_TYPE_0_TO_1,
        &LOCAL_0_ALREADY_DEFINED_IN_SCOPE,
        &NO_ENCLOSING_LOOP,
        &LABEL_0_IS_A_DUPLICATE,
        &NO_SUCH_LABEL_0_WITHIN_SCOPE_OF_GOTO,
        &UNREACHABLE_CODE_DETECTED,
        &LABEL_NOT_REFERENCED,
    ];

    /// Find the catalog entry for a numeric code.
    pub fn lookup(code: u32) -> Option<&'static DiagnosticMessage> {
        ALL.iter().copied().find(|m| m.code == code)
    }
}

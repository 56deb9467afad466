//! Rendering diagnostics to text and to machine-readable records.

use crate::{Diagnostic, Severity};
use rsharp_core::text::{LineMap, LinePosition};
use serde::Serialize;

/// Render `(line,column): <severity> <code>: <message>`, prefixed by the
/// file name when one is given.
pub fn render(diagnostic: &Diagnostic, file_name: Option<&str>, line_map: &LineMap) -> String {
    let position = line_map.position_of(diagnostic.span.start);
    match file_name {
        Some(file) => format!("{}{}: {}", file, position, diagnostic),
        None => format!("{}: {}", position, diagnostic),
    }
}

/// Render every diagnostic, one per line, in the order given.
pub fn render_all<'d>(
    diagnostics: impl IntoIterator<Item = &'d Diagnostic>,
    file_name: Option<&str>,
    line_map: &LineMap,
) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        out.push_str(&render(diagnostic, file_name, line_map));
        out.push('\n');
    }
    out
}

/// A diagnostic flattened for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub arguments: Vec<String>,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub start: u32,
    pub length: u32,
}

impl DiagnosticRecord {
    pub fn new(diagnostic: &Diagnostic, file_name: Option<&str>, line_map: &LineMap) -> Self {
        let LinePosition { line, column } = line_map.position_of(diagnostic.span.start);
        let end = line_map.position_of(diagnostic.span.end());
        Self {
            file: file_name.map(str::to_string),
            code: diagnostic.id(),
            severity: diagnostic.severity,
            message: diagnostic.message_text(),
            arguments: diagnostic.arguments.clone(),
            line,
            column,
            end_line: end.line,
            end_column: end.column,
            start: diagnostic.span.start,
            length: diagnostic.span.length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages;
    use rsharp_core::text::TextSpan;

    const FOR_LINE: &str = "\nclass C\n{\n    static void Main(string[] args)\n    {\n        for (int k = 0, j = 0; k < 100, j > 5; k++)\n";

    fn offset_of(needle: &str) -> u32 {
        FOR_LINE.find(needle).map(|i| i as u32).unwrap_or(0)
    }

    #[test]
    fn test_render_one_based_position() {
        let map = LineMap::new(FOR_LINE);
        let comma = offset_of(", j > 5");
        let diag = Diagnostic::new(&messages::SEMICOLON_EXPECTED, TextSpan::new(comma, 1), &[]);
        assert_eq!(render(&diag, None, &map), "(6,39): error CS1002: ; expected");
        assert_eq!(
            render(&diag, Some("a.cs"), &map),
            "a.cs(6,39): error CS1002: ; expected"
        );
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let map = LineMap::new(FOR_LINE);
        let semicolon = offset_of("; k++");
        let diag = Diagnostic::new(&messages::SYNTAX_ERROR_0_EXPECTED, TextSpan::new(semicolon, 1), &[","]);
        let record = DiagnosticRecord::new(&diag, Some("a.cs"), &map);
        assert_eq!(record.line, 6);
        assert_eq!(record.column, 46);
        assert_eq!(record.end_column, 47);

        let json = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(json["code"], "CS1003");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["endLine"], 6);
        assert_eq!(json["message"], "Syntax error, ',' expected");
    }

    #[test]
    fn test_render_all() {
        let map = LineMap::new("x");
        let diags = vec![
            Diagnostic::new(&messages::UNREACHABLE_CODE_DETECTED, TextSpan::new(0, 1), &[]),
            Diagnostic::new(&messages::LABEL_NOT_REFERENCED, TextSpan::new(0, 1), &[]),
        ];
        let text = render_all(&diags, None, &map);
        assert_eq!(
            text,
            "(1,1): warning CS0162: Unreachable code detected\n(1,1): warning CS0164: This label has not been referenced\n"
        );
    }
}

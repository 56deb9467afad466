//! Verification helpers for tests.
//!
//! Two styles are supported. `verify_diagnostics` compares the exact
//! sequence: code, squiggled source text, arguments and, when given, the
//! 1-based location and severity. `verify_error_codes_no_line_column` compares codes only.

use crate::{format_code, Diagnostic, DiagnosticMessage, Severity};
use rsharp_core::text::{LineMap, LinePosition};
use std::fmt;
use thiserror::Error;

/// An expected diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticDescription {
    code: u32,
    squiggle: Option<String>,
    arguments: Option<Vec<String>>,
    location: Option<LinePosition>,
    severity: Option<Severity>,
}

/// Expect `message` over the source text `squiggle`.
pub fn diagnostic(message: &DiagnosticMessage, squiggle: &str) -> DiagnosticDescription {
    DiagnosticDescription::new(message.code).with_squiggle(squiggle)
}

impl DiagnosticDescription {
    pub fn new(code: u32) -> Self {
        Self {
            code,
            squiggle: None,
            arguments: None,
            location: None,
            severity: None,
        }
    }

    pub fn with_squiggle(mut self, squiggle: &str) -> Self {
        self.squiggle = Some(squiggle.to_string());
        self
    }

    pub fn with_arguments(mut self, arguments: &[&str]) -> Self {
        self.arguments = Some(arguments.iter().map(|a| a.to_string()).collect());
        self
    }

    pub fn with_location(mut self, line: u32, column: u32) -> Self {
        self.location = Some(LinePosition::new(line, column));
        self
    }

    /// Expect an effective severity, for diagnostics whose severity was
    /// changed after they were reported.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Describe an actual diagnostic. The severity is filled in only when it
    /// differs from the message's default.
    pub fn of(diagnostic: &Diagnostic, source: &str, line_map: &LineMap) -> Self {
        let squiggle = source.get(diagnostic.span.to_range()).unwrap_or_default();
        Self {
            code: diagnostic.code(),
            squiggle: Some(squiggle.to_string()),
            arguments: Some(diagnostic.arguments.clone()),
            location: Some(line_map.position_of(diagnostic.span.start)),
            severity: (diagnostic.severity != diagnostic.message.severity).then_some(diagnostic.severity),
        }
    }

    /// Whether `diagnostic` satisfies every field this description sets.
    pub fn matches(&self, diagnostic: &Diagnostic, source: &str, line_map: &LineMap) -> bool {
        if diagnostic.code() != self.code {
            return false;
        }
        if let Some(squiggle) = &self.squiggle {
            if source.get(diagnostic.span.to_range()) != Some(squiggle.as_str()) {
                return false;
            }
        }
        if let Some(arguments) = &self.arguments {
            if &diagnostic.arguments != arguments {
                return false;
            }
        }
        if let Some(location) = self.location {
            if line_map.position_of(diagnostic.span.start) != location {
                return false;
            }
        }
        self.severity.map_or(true, |severity| diagnostic.severity == severity)
    }
}

impl fmt::Display for DiagnosticDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Diagnostic({}", format_code(self.code))?;
        if let Some(squiggle) = &self.squiggle {
            write!(f, ", {:?}", squiggle)?;
        }
        write!(f, ")")?;
        if let Some(arguments) = &self.arguments {
            if !arguments.is_empty() {
                let quoted: Vec<String> = arguments.iter().map(|a| format!("{:?}", a)).collect();
                write!(f, ".WithArguments({})", quoted.join(", "))?;
            }
        }
        if let Some(location) = self.location {
            write!(f, ".WithLocation({}, {})", location.line, location.column)?;
        }
        if let Some(severity) = self.severity {
            write!(f, ".WithSeverity({})", severity)?;
        }
        Ok(())
    }
}

/// The expected and actual sequences did not agree.
#[derive(Debug, Clone, Error)]
#[error("{}", render_mismatch(.expected, .actual))]
pub struct VerificationFailure {
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

fn render_mismatch(expected: &[String], actual: &[String]) -> String {
    let mut out = String::from("diagnostics did not match\nexpected:\n");
    for line in expected {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("actual:\n");
    for line in actual {
        out.push_str("    ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Compare the exact sequence of diagnostics against `expected`.
pub fn check_diagnostics(
    actual: &[Diagnostic],
    source: &str,
    expected: &[DiagnosticDescription],
) -> Result<(), VerificationFailure> {
    let line_map = LineMap::new(source);
    let matched = actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(diag, description)| description.matches(diag, source, &line_map));
    if matched {
        return Ok(());
    }
    Err(VerificationFailure {
        expected: expected.iter().map(ToString::to_string).collect(),
        actual: actual
            .iter()
            .map(|d| DiagnosticDescription::of(d, source, &line_map).to_string())
            .collect(),
    })
}

/// Compare codes only, ignoring positions and arguments.
pub fn check_error_codes_no_line_column(
    actual: &[Diagnostic],
    expected_codes: &[u32],
) -> Result<(), VerificationFailure> {
    let actual_codes: Vec<u32> = actual.iter().map(Diagnostic::code).collect();
    if actual_codes == expected_codes {
        return Ok(());
    }
    Err(VerificationFailure {
        expected: expected_codes.iter().map(|c| format_code(*c)).collect(),
        actual: actual_codes.iter().map(|c| format_code(*c)).collect(),
    })
}

/// Assert form of [`check_diagnostics`]; panics with both sequences on mismatch.
#[track_caller]
pub fn verify_diagnostics(actual: &[Diagnostic], source: &str, expected: &[DiagnosticDescription]) {
    if let Err(failure) = check_diagnostics(actual, source, expected) {
        panic!("{}", failure);
    }
}

/// Assert form of [`check_error_codes_no_line_column`].
#[track_caller]
pub fn verify_error_codes_no_line_column(actual: &[Diagnostic], expected_codes: &[u32]) {
    if let Err(failure) = check_error_codes_no_line_column(actual, expected_codes) {
        panic!("{}", failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages;
    use rsharp_core::text::TextSpan;

    const SOURCE: &str = "\nfor ();\n";

    fn paren_diagnostics() -> Vec<Diagnostic> {
        let paren = TextSpan::new(6, 1);
        vec![
            Diagnostic::new(&messages::SEMICOLON_EXPECTED, paren, &[]),
            Diagnostic::new(&messages::INVALID_EXPRESSION_TERM_0, paren, &[")"]),
            Diagnostic::new(&messages::SEMICOLON_EXPECTED, paren, &[]),
        ]
    }

    #[test]
    fn test_exact_sequence_matches() {
        let expected = [
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ")").with_arguments(&[")"]),
            diagnostic(&messages::SEMICOLON_EXPECTED, ")").with_location(2, 6),
        ];
        assert!(check_diagnostics(&paren_diagnostics(), SOURCE, &expected).is_ok());
    }

    #[test]
    fn test_order_matters() {
        let expected = [
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ")"),
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
        ];
        let failure = check_diagnostics(&paren_diagnostics(), SOURCE, &expected);
        assert!(failure.is_err());
    }

    #[test]
    fn test_wrong_arguments_or_location_fail() {
        let diags = paren_diagnostics();
        let wrong_args = [
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ")").with_arguments(&[";"]),
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
        ];
        assert!(check_diagnostics(&diags, SOURCE, &wrong_args).is_err());

        let wrong_location = [
            diagnostic(&messages::SEMICOLON_EXPECTED, ")").with_location(2, 5),
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ")"),
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
        ];
        assert!(check_diagnostics(&diags, SOURCE, &wrong_location).is_err());
    }

    #[test]
    fn test_severity_is_checked_when_given() {
        let unreachable = Diagnostic::new(&messages::UNREACHABLE_CODE_DETECTED, TextSpan::new(1, 3), &[]);
        let promoted = vec![unreachable.clone().with_severity(Severity::Error)];
        let as_warning = [diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "for").with_severity(Severity::Warning)];
        let as_error = [diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "for").with_severity(Severity::Error)];

        assert!(check_diagnostics(&[unreachable], SOURCE, &as_warning).is_ok());
        assert!(check_diagnostics(&promoted, SOURCE, &as_warning).is_err());
        assert!(check_diagnostics(&promoted, SOURCE, &as_error).is_ok());
        assert!(check_diagnostics(&promoted, SOURCE, &[diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "for")]).is_ok());

        let message = check_diagnostics(&promoted, SOURCE, &[]).unwrap_err().to_string();
        assert!(message.contains(".WithSeverity(error)"));
    }

    #[test]
    fn test_failure_lists_actual_diagnostics() {
        let failure = check_diagnostics(&paren_diagnostics(), SOURCE, &[]);
        let message = match failure {
            Err(failure) => failure.to_string(),
            Ok(()) => String::new(),
        };
        assert!(message.contains("Diagnostic(CS1525, \")\").WithArguments(\")\").WithLocation(2, 6)"));
    }

    #[test]
    fn test_codes_only() {
        assert!(check_error_codes_no_line_column(&paren_diagnostics(), &[1002, 1525, 1002]).is_ok());
        assert!(check_error_codes_no_line_column(&paren_diagnostics(), &[1002, 1525]).is_err());
    }

    #[test]
    #[should_panic(expected = "diagnostics did not match")]
    fn test_verify_panics_on_mismatch() {
        verify_error_codes_no_line_column(&paren_diagnostics(), &[201]);
    }
}

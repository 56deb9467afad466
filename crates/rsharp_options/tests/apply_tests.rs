//! Reported-view tests for `CompilerOptions::apply`.

use rsharp_core::text::TextSpan;
use rsharp_diagnostics::{messages, DiagnosticBag, Severity};
use rsharp_options::{parse_config_str, CompilerOptions, ReportDiagnostic};

/// Helper: one error followed by the two flow warnings.
fn mixed_bag() -> DiagnosticBag {
    let mut bag = DiagnosticBag::new();
    bag.report(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, TextSpan::new(10, 1), &["int", "bool"]);
    bag.report(&messages::UNREACHABLE_CODE_DETECTED, TextSpan::new(20, 3), &[]);
    bag.report(&messages::LABEL_NOT_REFERENCED, TextSpan::new(30, 5), &[]);
    bag
}

fn codes_and_severities(options: &CompilerOptions, bag: &DiagnosticBag) -> Vec<(u32, Severity)> {
    options.apply(bag).iter().map(|d| (d.code(), d.severity)).collect()
}

#[test]
fn test_default_options_report_everything() {
    let bag = mixed_bag();
    assert_eq!(
        codes_and_severities(&CompilerOptions::default(), &bag),
        vec![(29, Severity::Error), (162, Severity::Warning), (164, Severity::Warning)]
    );
}

#[test]
fn test_no_warn_removes_warnings_only() {
    let bag = mixed_bag();
    let options = CompilerOptions {
        no_warn: vec!["CS0164".to_string(), "CS0029".to_string()],
        ..Default::default()
    };
    assert_eq!(
        codes_and_severities(&options, &bag),
        vec![(29, Severity::Error), (162, Severity::Warning)]
    );
}

#[test]
fn test_warning_level_filters_by_level() {
    let bag = mixed_bag();
    let options = CompilerOptions {
        warning_level: 1,
        ..Default::default()
    };
    assert_eq!(codes_and_severities(&options, &bag), vec![(29, Severity::Error)]);
}

#[test]
fn test_warnings_as_errors() {
    let bag = mixed_bag();
    let options = CompilerOptions {
        treat_warnings_as_errors: true,
        ..Default::default()
    };
    assert!(options.apply(&bag).iter().all(|d| d.is_error()));
}

#[test]
fn test_per_code_overrides_win() {
    let bag = mixed_bag();
    let mut options = CompilerOptions {
        treat_warnings_as_errors: true,
        warning_level: 0,
        ..Default::default()
    };
    options.diagnostic_options.insert("CS0162".to_string(), ReportDiagnostic::Hidden);
    options.diagnostic_options.insert("CS0164".to_string(), ReportDiagnostic::Warning);
    assert_eq!(
        codes_and_severities(&options, &bag),
        vec![(29, Severity::Error), (162, Severity::Hidden), (164, Severity::Warning)]
    );

    options.diagnostic_options.insert("CS0162".to_string(), ReportDiagnostic::Suppress);
    assert_eq!(
        codes_and_severities(&options, &bag),
        vec![(29, Severity::Error), (164, Severity::Warning)]
    );
}

#[test]
fn test_apply_leaves_bag_untouched() {
    let bag = mixed_bag();
    let before = bag.clone();
    let config = parse_config_str(r#"{ "compilerOptions": { "treatWarningsAsErrors": true, "noWarn": ["CS0162"] } }"#)
        .unwrap();
    let reported = config.compiler_options.apply(&bag);
    assert_eq!(reported.len(), 2);
    assert_eq!(bag, before);
    assert_eq!(bag.warning_count(), 2);
}

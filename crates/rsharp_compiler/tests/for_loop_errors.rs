//! `for` statement diagnostics through the whole pipeline.
//!
//! Each case compiles a complete program and verifies the exact diagnostic
//! sequence: syntax recovery first, then binding, then the flow pass.

use rsharp_compiler::compile_source;
use rsharp_core::LineMap;
use rsharp_diagnostics::render::render_all;
use rsharp_diagnostics::verify::{diagnostic, verify_diagnostics, verify_error_codes_no_line_column};
use rsharp_diagnostics::messages;

fn verify(source: &str, expected: &[rsharp_diagnostics::verify::DiagnosticDescription]) {
    let bag = compile_source(source);
    verify_diagnostics(bag.diagnostics(), source, expected);
}

// ============================================================================
// Syntax recovery
// ============================================================================

#[test]
fn test_comma_between_condition_parts() {
    let source = r#"
class C
{
    static void Main(string[] args)
    {
        for (int k = 0, j = 0; k < 100, j > 5; k++)
        {
        }
    }
}
"#;
    verify(
        source,
        &[
            diagnostic(&messages::SEMICOLON_EXPECTED, ",").with_location(6, 39),
            diagnostic(&messages::SYNTAX_ERROR_0_EXPECTED, ";")
                .with_arguments(&[","])
                .with_location(6, 46),
            diagnostic(&messages::ONLY_ASSIGNMENT_CALL_INCREMENT_DECREMENT_AWAIT_AND_NEW_AS_STATEMENT, "j > 5")
                .with_location(6, 41),
        ],
    );
}

#[test]
fn test_extra_semicolon_in_header() {
    let source = r#"
class C
{
    static void Main(string[] args)
    {
        for (int i = 10; i < 100;;);
    }
}
"#;
    verify(
        source,
        &[
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ";")
                .with_arguments(&[";"])
                .with_location(6, 34),
            diagnostic(&messages::SYNTAX_ERROR_0_EXPECTED, ";")
                .with_arguments(&[","])
                .with_location(6, 34),
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ")")
                .with_arguments(&[")"])
                .with_location(6, 35),
        ],
    );
}

#[test]
fn test_empty_header() {
    let source = r#"
class C
{
    static void Main(string[] args)
    {
        for ();
    }
}
"#;
    verify(
        source,
        &[
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ")").with_arguments(&[")"]),
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
        ],
    );
}

#[test]
fn test_columns_after_non_ascii_text() {
    let source = "class C { void M() { string s = \"\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\"; for (); } }";
    verify(
        source,
        &[
            diagnostic(&messages::SEMICOLON_EXPECTED, ")").with_location(1, 47),
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ")")
                .with_arguments(&[")"])
                .with_location(1, 47),
            diagnostic(&messages::SEMICOLON_EXPECTED, ")").with_location(1, 47),
        ],
    );
}

// ============================================================================
// Condition binding
// ============================================================================

#[test]
fn test_int_condition() {
    let source = r#"
class C
{
    static void Main(string[] args)
    {
        for (int i = 10; i; i = i - 1)
        {
        }
    }
}
"#;
    verify(
        source,
        &[diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "i").with_arguments(&["int", "bool"])],
    );
}

#[test]
fn test_nullable_bool_condition() {
    let source = r#"
class C
{
    static void Main(string[] args)
    {
        bool? b = true;
        for (int i = 0; b; i = i + 1)
        {
        }
    }
}
"#;
    verify(
        source,
        &[diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1_EXPLICIT_EXISTS, "b")
            .with_arguments(&["bool?", "bool"])],
    );
}

#[test]
fn test_query_condition() {
    let source = r#"
using System.Linq;
class C
{
    static void Main(string[] args)
    {
        for (;from x in new[] { 1, 2, 3 }
             let z = x.ToString()
             select z into w
             select w;  ) { }        // invalid
    }
}
"#;
    verify(
        source,
        &[diagnostic(
            &messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1,
            "from x in new[] { 1, 2, 3 }
             let z = x.ToString()
             select z into w
             select w",
        )
        .with_arguments(&["System.Collections.Generic.IEnumerable<string>", "bool"])],
    );
}

#[test]
fn test_query_incrementor() {
    let source = r#"
using System.Linq;
class C
{
    static void Main(string[] args)
    {
        for (;;from x in new[] { 1, 2, 3 }
             let z = x.ToString()
             select z into w
             select w) { }        // invalid
    }
}
"#;
    let bag = compile_source(source);
    verify_error_codes_no_line_column(
        bag.diagnostics(),
        &[messages::ONLY_ASSIGNMENT_CALL_INCREMENT_DECREMENT_AWAIT_AND_NEW_AS_STATEMENT.code],
    );
}

#[test]
fn test_well_formed_headers() {
    let source = r#"
class C
{
    static void Main(string[] args)
    {
        bool done = false;
        int n = 0;
        for (;;) { break; }
        for (int i = 0; ; i++) { if (i > 3) break; }
        for (; n < 10;) { n++; }
        for (n = 0, done = true; !done; n++, done = n > 5) { }
        for (int i = 0, j = 10; i < j; i++, j--) { }
        for (var k = 0L; k < 3; k += 1) { continue; }
    }
}
"#;
    let bag = compile_source(source);
    assert!(bag.is_empty(), "{:?}", bag.diagnostics());
}

// ============================================================================
// Labels and reachability
// ============================================================================

#[test]
fn test_goto_into_nested_loop() {
    let source = r#"
class C
{
    static void Main(string[] args)
    {
        for (int i = 0; i < 5; i = i + 1)
        {
            goto outerLoop;
            for (int j = 0; j < 10; j = j + 1)
            {
            outerLoop:
                return;
            }
        }
    }
}
"#;
    verify(
        source,
        &[
            diagnostic(&messages::NO_SUCH_LABEL_0_WITHIN_SCOPE_OF_GOTO, "outerLoop").with_arguments(&["outerLoop"]),
            diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "j"),
            diagnostic(&messages::LABEL_NOT_REFERENCED, "outerLoop"),
        ],
    );
}

// ============================================================================
// Whole-bag properties
// ============================================================================

const MIXED_SOURCE: &str = r#"
using System.Linq;
class C
{
    static void Main(string[] args)
    {
        for (int k = 0, j = 0; k < 100, j > 5; k++) { }
        for (int i = 10; i; i = i - 1) { }
        for ();
        goto missing;
        for (;from x in args select x;) { }
"#;

#[test]
fn test_compilation_is_idempotent() {
    let first = compile_source(MIXED_SOURCE);
    let second = compile_source(MIXED_SOURCE);
    assert!(!first.is_empty());
    assert_eq!(first, second);

    let line_map = LineMap::new(MIXED_SOURCE);
    assert_eq!(
        render_all(first.iter(), Some("mixed.cs"), &line_map),
        render_all(second.iter(), Some("mixed.cs"), &line_map)
    );
}

#[test]
fn test_spans_lie_within_text() {
    let len = MIXED_SOURCE.len() as u32;
    for source in [MIXED_SOURCE, "for (", "class C { void M() { for (int i = 0; i <", ""] {
        let bag = compile_source(source);
        for diagnostic in bag.iter() {
            assert!(diagnostic.span.end() <= source.len() as u32, "{:?} out of {:?}", diagnostic, source);
        }
    }
    assert!(compile_source(MIXED_SOURCE).iter().all(|d| d.span.end() <= len));
}

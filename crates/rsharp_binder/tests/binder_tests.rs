//! Binder and flow pass integration tests.
//!
//! Each test scans, parses, binds and runs the flow pass over a C# program
//! and verifies the semantic diagnostics in order.

use bumpalo::Bump;
use rsharp_binder::{check_reachability, Binder};
use rsharp_core::cancel::CancellationToken;
use rsharp_core::intern::StringInterner;
use rsharp_diagnostics::verify::{diagnostic, verify_diagnostics, DiagnosticDescription};
use rsharp_diagnostics::{messages, DiagnosticBag};
use rsharp_parser::Parser;
use rsharp_scanner::scan_tokens;

/// Helper: run the whole front end and return the bag.
fn bind_diagnostics(source: &str) -> DiagnosticBag {
    let arena = Bump::new();
    let interner = StringInterner::new();
    let mut bag = DiagnosticBag::new();
    let tokens = scan_tokens(source, &mut bag);
    let unit = Parser::new(&arena, &interner, &tokens, &mut bag)
        .parse_compilation_unit()
        .expect("no cancellation requested");

    let mut binder = Binder::new(&mut bag);
    binder
        .bind_compilation_unit(&unit)
        .expect("no cancellation requested");
    let bound = binder.finish();
    check_reachability(&unit, &tokens, &bound, &mut bag);
    bag
}

/// Helper: wrap members in `class C`.
fn in_class(members: &str) -> String {
    format!("class C\n{{\n{}\n}}\n", members)
}

fn verify(source: &str, expected: &[DiagnosticDescription]) {
    let bag = bind_diagnostics(source);
    verify_diagnostics(bag.diagnostics(), source, expected);
}

fn assert_clean(source: &str) {
    let bag = bind_diagnostics(source);
    assert!(bag.is_empty(), "source: {}\ndiagnostics: {:?}", source, bag.diagnostics());
}

// ============================================================================
// Well-formed programs
// ============================================================================

#[test]
fn test_well_typed_program_is_clean() {
    let source = r#"
using System;
using System.Collections.Generic;
using System.Linq;

namespace Samples
{
    public class Matrix
    {
        private int size;

        public static implicit operator bool(Matrix m)
        {
            return m != null;
        }

        public int Trace(int[] cells)
        {
            int total = 0;
            for (int i = 0; i < size; i++)
            {
                total += cells[i];
            }
            return total;
        }
    }

    public class Program
    {
        static void Main(string[] args)
        {
            Matrix m = new Matrix();
            if (m) { }
            while (m) { break; }
            bool? flag = true;
            if (flag == true) { }
            byte small = 5;
            long wide = small;
            double d = wide;
            var names = from a in args where a.Length > 3 select a.ToUpper();
            IEnumerable<string> copy = names;
            string first = args[0];
            int? maybe = null;
            int value = maybe ?? 0;
            object boxed = value;
            int back = (int)boxed;
            int[] array = { 1, 2, 3 };
            var inferred = new[] { 1, 2, 3 };
            int[] again = inferred;
            char c = first[0];
            int code = c;
            for (;;) { break; }
            do { value--; } while (value > 0);
        }
    }
}
"#;
    assert_clean(source);
}

#[test]
fn test_unknown_names_do_not_cascade() {
    assert_clean(&in_class(
        "    void M()\n    {\n        if (Undefined.Value) { }\n        while (missing) { }\n        Console.WriteLine(1);\n    }",
    ));
}

// ============================================================================
// Conditions and conversions
// ============================================================================

#[test]
fn test_non_boolean_conditions() {
    let source = in_class(
        "    void M(int i, bool? b, string s)\n    {\n        if (i) { }\n        while (b) { }\n        do { } while (s);\n    }",
    );
    verify(
        &source,
        &[
            diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "i").with_arguments(&["int", "bool"]),
            diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1_EXPLICIT_EXISTS, "b")
                .with_arguments(&["bool?", "bool"]),
            diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "s").with_arguments(&["string", "bool"]),
        ],
    );
}

#[test]
fn test_nullable_int_condition() {
    let source = in_class("    void M(int? n)\n    {\n        if (n) { }\n    }");
    verify(
        &source,
        &[diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "n").with_arguments(&["int?", "bool"])],
    );
}

#[test]
fn test_conditional_operator_condition() {
    let source = in_class("    void M(int b)\n    {\n        int x = b ? 1 : 2;\n    }");
    verify(
        &source,
        &[diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "b").with_arguments(&["int", "bool"])],
    );
}

#[test]
fn test_explicit_operator_condition() {
    let source = r#"
class Flag
{
    public static explicit operator bool(Flag f) { return true; }
}
class C
{
    void M(Flag f)
    {
        if (f) { }
        bool b = (bool)f;
    }
}
"#;
    verify(
        source,
        &[diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1_EXPLICIT_EXISTS, "f")
            .with_arguments(&["Flag", "bool"])],
    );
}

#[test]
fn test_initializer_and_assignment_conversions() {
    let source = in_class(
        "    void M()\n    {\n        int x = \"text\";\n        long big = 1;\n        int narrow = big;\n        string s = null;\n        s = 42;\n        byte ok = 200;\n    }",
    );
    verify(
        &source,
        &[
            diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "\"text\"").with_arguments(&["string", "int"]),
            diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1_EXPLICIT_EXISTS, "big")
                .with_arguments(&["long", "int"]),
            diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "42").with_arguments(&["int", "string"]),
        ],
    );
}

#[test]
fn test_return_value_conversion() {
    let source = in_class("    string M()\n    {\n        return 1;\n    }");
    verify(
        &source,
        &[diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "1").with_arguments(&["int", "string"])],
    );
}

#[test]
fn test_invalid_casts() {
    let source = in_class(
        "    void M(string s)\n    {\n        int n = (int)s;\n        bool b = (bool)1;\n        double d = (double)n;\n    }",
    );
    verify(
        &source,
        &[
            diagnostic(&messages::CANNOT_CONVERT_TYPE_0_TO_1, "(int)s").with_arguments(&["string", "int"]),
            diagnostic(&messages::CANNOT_CONVERT_TYPE_0_TO_1, "(bool)1").with_arguments(&["int", "bool"]),
        ],
    );
}

#[test]
fn test_group_query_type() {
    let source = "using System.Linq;\nclass C\n{\n    void M(int[] numbers)\n    {\n        bool b = from n in numbers group n by n % 2;\n    }\n}\n";
    verify(
        source,
        &[diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "from n in numbers group n by n % 2")
            .with_arguments(&[
                "System.Collections.Generic.IEnumerable<System.Linq.IGrouping<int, int>>",
                "bool",
            ])],
    );
}

#[test]
fn test_top_level_statements_are_bound() {
    let source = "int i = 0;\nfor (; i; i++) { }\n";
    verify(
        source,
        &[diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "i")
            .with_arguments(&["int", "bool"])
            .with_location(2, 8)],
    );
}

// ============================================================================
// Scopes, labels and jumps
// ============================================================================

#[test]
fn test_duplicate_local() {
    let source = in_class(
        "    void M()\n    {\n        int x = 1;\n        { int y = 2; }\n        { int y = 3; }\n        int x = 4;\n        for (int i = 0; i < 1; i++) { }\n        for (int i = 0; i < 1; i++) { }\n    }",
    );
    verify(
        &source,
        &[diagnostic(&messages::LOCAL_0_ALREADY_DEFINED_IN_SCOPE, "x")
            .with_arguments(&["x"])
            .with_location(8, 13)],
    );
}

#[test]
fn test_duplicate_label() {
    let source = in_class("    void M()\n    {\n        a: ;\n        a: ;\n        goto a;\n    }");
    verify(
        &source,
        &[
            diagnostic(&messages::LABEL_0_IS_A_DUPLICATE, "a")
                .with_arguments(&["a"])
                .with_location(6, 9),
            diagnostic(&messages::LABEL_NOT_REFERENCED, "a").with_location(6, 9),
        ],
    );
}

#[test]
fn test_goto_to_visible_labels() {
    assert_clean(&in_class(
        "    void M(int x)\n    {\n        start:\n        if (x > 0) goto done;\n        { goto start; }\n        done: return;\n    }",
    ));
}

#[test]
fn test_goto_into_nested_block() {
    let source = in_class("    void M()\n    {\n        goto inner;\n        { inner: return; }\n    }");
    verify(
        &source,
        &[
            diagnostic(&messages::NO_SUCH_LABEL_0_WITHIN_SCOPE_OF_GOTO, "inner").with_arguments(&["inner"]),
            diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "inner"),
            diagnostic(&messages::LABEL_NOT_REFERENCED, "inner"),
        ],
    );
}

#[test]
fn test_jumps_outside_loops() {
    let source = in_class("    void M()\n    {\n        break;\n    }\n    void N()\n    {\n        continue;\n    }");
    verify(
        &source,
        &[
            diagnostic(&messages::NO_ENCLOSING_LOOP, "break;"),
            diagnostic(&messages::NO_ENCLOSING_LOOP, "continue;"),
        ],
    );
}

// ============================================================================
// Flow analysis
// ============================================================================

#[test]
fn test_unreachable_region_reported_once() {
    let source = in_class("    int M()\n    {\n        return 1;\n        int x = 2;\n        x = 3;\n        return x;\n    }");
    verify(
        &source,
        &[diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "int").with_location(6, 9)],
    );
}

#[test]
fn test_infinite_loop_makes_rest_unreachable() {
    let source = in_class("    void M()\n    {\n        while (true) { }\n        M();\n    }");
    verify(&source, &[diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "M").with_location(6, 9)]);
}

#[test]
fn test_break_leaves_infinite_loop() {
    assert_clean(&in_class("    void M()\n    {\n        while (true) { break; }\n        for (;;) { if (true) break; }\n        M();\n    }"));
}

#[test]
fn test_constant_false_condition() {
    let source = in_class("    void M()\n    {\n        if (false) { M(); }\n    }");
    verify(&source, &[diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "M")]);
}

#[test]
fn test_referenced_label_restores_reachability() {
    let source = in_class("    void M(int x)\n    {\n        goto skip;\n        x = 1;\n        skip:\n        x = 2;\n    }");
    verify(&source, &[diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "x").with_location(6, 9)]);
}

#[test]
fn test_unreferenced_label() {
    let source = in_class("    void M()\n    {\n        unused: ;\n    }");
    verify(&source, &[diagnostic(&messages::LABEL_NOT_REFERENCED, "unused")]);
}

#[test]
fn test_semantic_errors_precede_flow_warnings() {
    let source = in_class("    void M(int i)\n    {\n        return;\n        if (i) { }\n    }");
    verify(
        &source,
        &[
            diagnostic(&messages::CANNOT_IMPLICITLY_CONVERT_TYPE_0_TO_1, "i").with_arguments(&["int", "bool"]),
            diagnostic(&messages::UNREACHABLE_CODE_DETECTED, "if"),
        ],
    );
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_binder_honors_cancellation() {
    let arena = Bump::new();
    let interner = StringInterner::new();
    let mut bag = DiagnosticBag::new();
    let source = in_class("    void M() { }");
    let tokens = scan_tokens(&source, &mut bag);
    let unit = Parser::new(&arena, &interner, &tokens, &mut bag)
        .parse_compilation_unit()
        .expect("no cancellation requested");

    let token = CancellationToken::new();
    token.cancel();
    let mut binder = Binder::new(&mut bag).with_cancellation(&token);
    assert!(binder.bind_compilation_unit(&unit).is_err());
}

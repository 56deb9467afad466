//! Parser integration tests.
//!
//! Verifies the trees the parser builds from C# source and the syntax
//! diagnostics it reports for malformed input.

use bumpalo::Bump;
use rsharp_ast::node::*;
use rsharp_ast::syntax_kind::SyntaxKind;
use rsharp_ast::types::NodeFlags;
use rsharp_core::cancel::CancellationToken;
use rsharp_core::intern::StringInterner;
use rsharp_diagnostics::verify::{diagnostic, verify_diagnostics, verify_error_codes_no_line_column};
use rsharp_diagnostics::{messages, DiagnosticBag};
use rsharp_parser::{ParseOptions, Parser};
use rsharp_scanner::scan_tokens;

/// Helper: parse a unit and hand the tree and the bag to `check`.
fn with_unit<R>(source: &str, check: impl FnOnce(&CompilationUnit<'_>, &DiagnosticBag) -> R) -> R {
    let arena = Bump::new();
    let interner = StringInterner::new();
    let mut bag = DiagnosticBag::new();
    let tokens = scan_tokens(source, &mut bag);
    let parser = Parser::new(&arena, &interner, &tokens, &mut bag);
    let unit = parser
        .parse_compilation_unit()
        .expect("no cancellation requested");
    check(&unit, &bag)
}

/// Helper: parse and return the diagnostic bag.
fn parse_diagnostics(source: &str) -> DiagnosticBag {
    let arena = Bump::new();
    let interner = StringInterner::new();
    let mut bag = DiagnosticBag::new();
    let tokens = scan_tokens(source, &mut bag);
    Parser::new(&arena, &interner, &tokens, &mut bag)
        .parse_compilation_unit()
        .expect("no cancellation requested");
    bag
}

/// Helper: wrap statements in a method body.
fn in_method(body: &str) -> String {
    format!("class C {{\n    void M() {{\n        {}\n    }}\n}}\n", body)
}

/// Helper: assert that the source parses without diagnostics.
fn assert_clean(source: &str) {
    let bag = parse_diagnostics(source);
    assert!(bag.is_empty(), "source: {}\ndiagnostics: {:?}", source, bag.diagnostics());
}

/// Helper: the statements of the method `M` in `class C`.
fn with_method_body<R>(body: &str, check: impl FnOnce(&[Statement<'_>]) -> R) -> R {
    with_unit(&in_method(body), |unit, _| {
        let Member::Type(class) = &unit.members[0] else {
            panic!("expected a class");
        };
        let ClassMember::Method(method) = &class.members[0] else {
            panic!("expected a method");
        };
        check(method.body.expect("method has a body").statements)
    })
}

// ============================================================================
// Declarations
// ============================================================================

#[test]
fn test_parse_empty_unit() {
    with_unit("", |unit, bag| {
        assert!(unit.members.is_empty());
        assert!(bag.is_empty());
        assert_eq!(unit.end_of_file.kind(), SyntaxKind::EndOfFileToken);
    });
}

#[test]
fn test_parse_usings_and_namespace() {
    let source = "using System;\nusing static System.Math;\nusing L = System.Collections.Generic.List<int>;\nnamespace A.B { class C { } }";
    with_unit(source, |unit, bag| {
        assert!(bag.is_empty(), "{:?}", bag.diagnostics());
        assert_eq!(unit.usings.len(), 3);
        assert!(unit.usings[1].is_static);
        assert_eq!(unit.usings[2].alias.map(|a| a.text), Some("L"));
        let Member::Namespace(ns) = &unit.members[0] else {
            panic!("expected a namespace");
        };
        assert!(matches!(ns.name, TypeSyntax::Qualified(_)));
        assert_eq!(ns.members.len(), 1);
    });
}

#[test]
fn test_parse_file_scoped_namespace() {
    with_unit("namespace N;\nclass A { }\nclass B { }", |unit, bag| {
        assert!(bag.is_empty());
        let Member::Namespace(ns) = &unit.members[0] else {
            panic!("expected a namespace");
        };
        assert_eq!(ns.members.len(), 2);
    });
}

#[test]
fn test_parse_class_members() {
    let source = "public partial class C : Base {\n    private static int count = 0, other;\n    public C(int x) : base(x) { }\n    public static implicit operator bool(C c) { return true; }\n    async Task RunAsync() { await Task.Delay(1); }\n    struct Inner { }\n    abstract void Later();\n}";
    with_unit(source, |unit, bag| {
        assert!(bag.is_empty(), "{:?}", bag.diagnostics());
        let Member::Type(class) = &unit.members[0] else {
            panic!("expected a class");
        };
        assert_eq!(class.identifier.text, "C");
        assert_eq!(class.members.len(), 6);
        let ClassMember::Field(field) = &class.members[0] else {
            panic!("expected a field");
        };
        assert_eq!(field.declaration.declarators.len(), 2);
        let ClassMember::Method(ctor) = &class.members[1] else {
            panic!("expected a constructor");
        };
        assert_eq!(ctor.data.kind, SyntaxKind::ConstructorDeclaration);
        assert!(ctor.return_type.is_none());
        let ClassMember::ConversionOperator(op) = &class.members[2] else {
            panic!("expected a conversion operator");
        };
        assert!(op.is_implicit());
        assert!(matches!(class.members[4], ClassMember::NestedType(_)));
        let ClassMember::Method(later) = &class.members[5] else {
            panic!("expected a method");
        };
        assert!(later.body.is_none());
    });
}

#[test]
fn test_invalid_member_token() {
    let source = "class C { + }";
    let bag = parse_diagnostics(source);
    verify_diagnostics(
        bag.diagnostics(),
        source,
        &[diagnostic(&messages::INVALID_TOKEN_0_IN_MEMBER_DECLARATION, "+").with_arguments(&["+"])],
    );
}

#[test]
fn test_stray_close_brace_at_top_level() {
    let source = "class C { }\n}";
    let bag = parse_diagnostics(source);
    verify_diagnostics(
        bag.diagnostics(),
        source,
        &[diagnostic(&messages::TYPE_OR_NAMESPACE_DEFINITION_OR_END_OF_FILE_EXPECTED, "}")],
    );
}

#[test]
fn test_top_level_statements() {
    with_unit("int x = 1;\nx++;\nfor (;;) { break; }", |unit, bag| {
        assert!(bag.is_empty());
        assert_eq!(unit.members.len(), 3);
        assert!(unit
            .members
            .iter()
            .all(|m| matches!(m, Member::GlobalStatement(_))));
    });
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_parse_statement_kinds() {
    let body = "int i = 0; if (i > 0) i--; else { } while (true) break; do { continue; } while (false); return; ; goto done; done: return;";
    with_method_body(body, |statements| {
        let kinds: Vec<SyntaxKind> = statements.iter().map(Statement::kind).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::LocalDeclarationStatement,
                SyntaxKind::IfStatement,
                SyntaxKind::WhileStatement,
                SyntaxKind::DoStatement,
                SyntaxKind::ReturnStatement,
                SyntaxKind::EmptyStatement,
                SyntaxKind::GotoStatement,
                SyntaxKind::LabeledStatement,
            ]
        );
    });
}

#[test]
fn test_declaration_versus_expression() {
    with_method_body("List<int> xs = null; a ? b : c; int? n = null; x = y;", |statements| {
        assert!(matches!(statements[0], Statement::LocalDeclaration(_)));
        assert!(matches!(statements[1], Statement::Expression(_)));
        assert!(matches!(statements[2], Statement::LocalDeclaration(_)));
        assert!(matches!(statements[3], Statement::Expression(_)));
    });
}

#[test]
fn test_const_local() {
    with_method_body("const int limit = 10;", |statements| {
        let Statement::LocalDeclaration(decl) = &statements[0] else {
            panic!("expected a declaration");
        };
        assert!(decl.modifiers.contains(rsharp_ast::types::Modifiers::CONST));
    });
}

#[test]
fn test_well_formed_for_headers() {
    for header in [
        "for (int i = 0; i < 10; i++) { }",
        "for (;;) { }",
        "for (int i = 0;;) { }",
        "for (; true;) { }",
        "for (;; i++) { }",
        "for (i = 0, j = 1; i < j; i++, j--) { }",
        "for (int i = 0, j = 10; i < j; i += 2, --j) ;",
        "for (var e = list.GetEnumerator(); e.MoveNext();) { }",
    ] {
        assert_clean(&in_method(header));
    }
}

#[test]
fn test_for_statement_shape() {
    with_method_body("for (int i = 0, j = 1; i < j; i++, j--) { }", |statements| {
        let Statement::For(for_statement) = &statements[0] else {
            panic!("expected a for statement");
        };
        let Some(ForInitializer::Declaration(decl)) = &for_statement.initializer else {
            panic!("expected a declaration initializer");
        };
        assert_eq!(decl.declarators.len(), 2);
        assert!(for_statement.condition.is_some());
        assert_eq!(for_statement.incrementors.len(), 2);
        assert!(!for_statement.close_paren.is_missing());
    });
}

#[test]
fn test_for_without_header_clauses() {
    let source = "for ();";
    let bag = parse_diagnostics(source);
    verify_diagnostics(
        bag.diagnostics(),
        source,
        &[
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ")").with_arguments(&[")"]),
            diagnostic(&messages::SEMICOLON_EXPECTED, ")"),
        ],
    );
}

#[test]
fn test_for_with_comma_between_condition_and_incrementor() {
    let source = in_method("for (int k = 0, j = 0; k < 100, j > 5; k++) { }");
    let bag = parse_diagnostics(&source);
    verify_diagnostics(
        bag.diagnostics(),
        &source,
        &[
            diagnostic(&messages::SEMICOLON_EXPECTED, ","),
            diagnostic(&messages::SYNTAX_ERROR_0_EXPECTED, ";").with_arguments(&[","]),
            diagnostic(
                &messages::ONLY_ASSIGNMENT_CALL_INCREMENT_DECREMENT_AWAIT_AND_NEW_AS_STATEMENT,
                "j > 5",
            ),
        ],
    );
}

#[test]
fn test_for_with_extra_semicolon() {
    let source = in_method("for (int i = 10; i < 100;;);");
    let bag = parse_diagnostics(&source);
    verify_diagnostics(
        bag.diagnostics(),
        &source,
        &[
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ";").with_arguments(&[";"]),
            diagnostic(&messages::SYNTAX_ERROR_0_EXPECTED, ";").with_arguments(&[","]),
            diagnostic(&messages::INVALID_EXPRESSION_TERM_0, ")").with_arguments(&[")"]),
        ],
    );
}

#[test]
fn test_for_close_paren_after_stray_separators() {
    let source = in_method("for (;; i++,) { }");
    let bag = parse_diagnostics(&source);
    verify_error_codes_no_line_column(bag.diagnostics(), &[1525]);
}

#[test]
fn test_non_statement_expression() {
    let source = in_method("x + 1;");
    let bag = parse_diagnostics(&source);
    verify_diagnostics(
        bag.diagnostics(),
        &source,
        &[diagnostic(
            &messages::ONLY_ASSIGNMENT_CALL_INCREMENT_DECREMENT_AWAIT_AND_NEW_AS_STATEMENT,
            "x + 1",
        )],
    );
}

#[test]
fn test_missing_semicolon_goes_to_end_of_line() {
    let source = "class C {\n    void M() {\n        x = 1\n        y = 2;\n    }\n}";
    let bag = parse_diagnostics(source);
    verify_diagnostics(
        bag.diagnostics(),
        source,
        &[diagnostic(&messages::SEMICOLON_EXPECTED, "").with_location(3, 14)],
    );
}

#[test]
fn test_unclosed_block() {
    let bag = parse_diagnostics("class C { void M() { int x = 1;");
    verify_error_codes_no_line_column(bag.diagnostics(), &[1513, 1513]);
}

#[test]
fn test_garbage_in_block_terminates() {
    let bag = parse_diagnostics(&in_method(") ] ) ; x++;"));
    assert!(!bag.is_empty());
    assert!(bag.iter().all(|d| d.is_error()));
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_parse_expression_forms() {
    for statement in [
        "x = a + b * c - d / e % f;",
        "x = a << 2 >> 1;",
        "x >>= 2;",
        "x = a && b || !c;",
        "x = a ?? b ?? c;",
        "x = a ? b : c;",
        "x = (int)y;",
        "x = (a) + b;",
        "x = y as string;",
        "b = y is int;",
        "x = obj?.Field;",
        "x = arr[0, 1];",
        "x = new List<int>();",
        "x = new Point { X = 1 };",
        "x = new int[3];",
        "x = new int[] { 1, 2, 3, };",
        "x = new[] { 1, 2 };",
        "x = new int[2, 3][];",
        "x = int.Parse(s);",
        "x = this.value;",
        "F(ref a, out b, in c);",
        "x = 'c';",
        "x = @\"verbatim\";",
        "x = -~y;",
        "++x;",
        "x--;",
    ] {
        assert_clean(&in_method(statement));
    }
}

#[test]
fn test_left_associative_binary() {
    with_method_body("x = a - b - c;", |statements| {
        let Statement::Expression(statement) = &statements[0] else {
            panic!("expected an expression statement");
        };
        let Expression::Assignment(assignment) = statement.expression else {
            panic!("expected an assignment");
        };
        let Expression::Binary(outer) = assignment.right else {
            panic!("expected a binary expression");
        };
        assert!(matches!(outer.left, Expression::Binary(_)));
        assert!(matches!(outer.right, Expression::Identifier(_)));
    });
}

#[test]
fn test_await_only_in_async_context() {
    assert_clean("class C { async Task M() { await F(); } }");
    let bag = parse_diagnostics("class C { void M() { await F(); } }");
    assert!(!bag.is_empty());
}

#[test]
fn test_invalid_expression_term() {
    let source = in_method("x = ];");
    let bag = parse_diagnostics(&source);
    assert_eq!(bag.diagnostics()[0].code(), 1525);
    assert_eq!(bag.diagnostics()[0].arguments, vec!["]".to_string()]);
}

#[test]
fn test_expression_expected_at_end_of_file() {
    let bag = parse_diagnostics("x = ");
    let codes: Vec<u32> = bag.iter().map(|d| d.code()).collect();
    assert_eq!(codes, vec![1733, 1002]);
}

#[test]
fn test_new_requires_arguments() {
    let source = in_method("x = new Foo;");
    let bag = parse_diagnostics(&source);
    verify_error_codes_no_line_column(bag.diagnostics(), &[1526]);
}

// ============================================================================
// Query expressions
// ============================================================================

#[test]
fn test_parse_query_expression() {
    let source = in_method(
        "var q = from x in xs let y = x * 2 where y > 1 orderby y descending, x select y;",
    );
    with_unit(&source, |unit, bag| {
        assert!(bag.is_empty(), "{:?}", bag.diagnostics());
        let Member::Type(class) = &unit.members[0] else {
            panic!("expected a class");
        };
        let ClassMember::Method(method) = &class.members[0] else {
            panic!("expected a method");
        };
        let Statement::LocalDeclaration(decl) = &method.body.expect("body").statements[0] else {
            panic!("expected a declaration");
        };
        let Some(Expression::Query(query)) = decl.declaration.declarators[0].initializer else {
            panic!("expected a query");
        };
        assert_eq!(query.from_clause.identifier.text, "x");
        assert_eq!(query.body.clauses.len(), 3);
        assert!(matches!(query.body.select_or_group, SelectOrGroupClause::Select(_)));
    });
}

#[test]
fn test_query_with_group_and_continuation() {
    assert_clean(&in_method(
        "var q = from int x in xs group x by x % 2 into g from y in g select y;",
    ));
}

#[test]
fn test_query_without_select() {
    let source = in_method("var q = from x in xs where x;");
    let bag = parse_diagnostics(&source);
    verify_error_codes_no_line_column(bag.diagnostics(), &[742]);
}

#[test]
fn test_from_as_identifier() {
    assert_clean(&in_method("int from = 1; from = from + 1;"));
}

#[test]
fn test_query_as_statement_is_not_a_statement_expression() {
    let source = in_method("from x in xs select x;");
    let bag = parse_diagnostics(&source);
    verify_error_codes_no_line_column(bag.diagnostics(), &[201]);
}

// ============================================================================
// Limits and cancellation
// ============================================================================

#[test]
fn test_deep_nesting_reports_once() {
    let source = format!("x = {}1{};", "(".repeat(2000), ")".repeat(2000));
    let bag = parse_diagnostics(&source);
    verify_error_codes_no_line_column(bag.diagnostics(), &[8078]);
}

#[test]
fn test_long_chains_are_bounded() {
    let source = format!("x = a{};", " + a".repeat(5000));
    let bag = parse_diagnostics(&source);
    verify_error_codes_no_line_column(bag.diagnostics(), &[8078]);
}

#[test]
fn test_verbatim_identifier() {
    with_unit("class @class { } class D { }", |unit, bag| {
        assert!(bag.is_empty());
        let (Member::Type(verbatim), Member::Type(plain)) = (&unit.members[0], &unit.members[1]) else {
            panic!("expected two classes");
        };
        assert_eq!(verbatim.identifier.text, "class");
        assert!(verbatim.identifier.data.flags.contains(NodeFlags::VERBATIM_IDENTIFIER));
        assert!(!plain.identifier.data.flags.contains(NodeFlags::VERBATIM_IDENTIFIER));
    });
}

#[test]
fn test_nested_namespaces_are_bounded() {
    let source = format!("{}{}", "namespace N { ".repeat(5000), "}".repeat(5000));
    let bag = parse_diagnostics(&source);
    verify_error_codes_no_line_column(bag.diagnostics(), &[8078]);
}

#[test]
fn test_nested_types_are_bounded() {
    for open in ["class N { ", "struct S { ", "public class N { "] {
        let source = format!("{}{}", open.repeat(5000), "}".repeat(5000));
        let bag = parse_diagnostics(&source);
        verify_error_codes_no_line_column(bag.diagnostics(), &[8078]);
    }
}

#[test]
fn test_shallow_nesting_is_clean() {
    let source = format!("{}{}{}", "namespace N { ".repeat(20), "class C { ".repeat(20), "}".repeat(40));
    assert_clean(&source);
}

#[test]
fn test_custom_depth_limit() {
    let arena = Bump::new();
    let interner = StringInterner::new();
    let mut bag = DiagnosticBag::new();
    let tokens = scan_tokens("x = ((((1))));", &mut bag);
    Parser::new(&arena, &interner, &tokens, &mut bag)
        .with_options(ParseOptions { max_depth: 4 })
        .parse_compilation_unit()
        .expect("no cancellation requested");
    verify_error_codes_no_line_column(bag.diagnostics(), &[8078]);
}

#[test]
fn test_cancelled_parse() {
    let arena = Bump::new();
    let interner = StringInterner::new();
    let mut bag = DiagnosticBag::new();
    let tokens = scan_tokens("class A { } class B { }", &mut bag);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = Parser::new(&arena, &interner, &tokens, &mut bag)
        .with_cancellation(&cancel)
        .parse_compilation_unit();
    assert!(result.is_err());
}

#[test]
fn test_spans_stay_within_source() {
    for source in ["for (", "class C { void M( { for (;", "x = new", "@", "from x in"] {
        let bag = parse_diagnostics(source);
        for diagnostic in bag.iter() {
            assert!(diagnostic.span.end() as usize <= source.len(), "source: {}", source);
        }
    }
}

//! Parser utility functions.

use rsharp_ast::syntax_kind::SyntaxKind;

/// Check if a token kind can start an expression.
///
/// Contextual keywords (`from`, `await`) scan as identifiers and are
/// covered by `IdentifierToken`.
pub fn is_possible_expression(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::IdentifierToken
            | SyntaxKind::NumericLiteralToken
            | SyntaxKind::StringLiteralToken
            | SyntaxKind::CharacterLiteralToken
            | SyntaxKind::TrueKeyword
            | SyntaxKind::FalseKeyword
            | SyntaxKind::NullKeyword
            | SyntaxKind::ThisKeyword
            | SyntaxKind::NewKeyword
            | SyntaxKind::OpenParenToken
            | SyntaxKind::PlusToken
            | SyntaxKind::MinusToken
            | SyntaxKind::ExclamationToken
            | SyntaxKind::TildeToken
            | SyntaxKind::PlusPlusToken
            | SyntaxKind::MinusMinusToken
    ) || (kind.is_predefined_type() && kind != SyntaxKind::VoidKeyword)
}

/// Check if a token kind can start a statement.
pub fn can_start_statement(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::OpenBraceToken
            | SyntaxKind::SemicolonToken
            | SyntaxKind::IfKeyword
            | SyntaxKind::WhileKeyword
            | SyntaxKind::DoKeyword
            | SyntaxKind::ForKeyword
            | SyntaxKind::ReturnKeyword
            | SyntaxKind::BreakKeyword
            | SyntaxKind::ContinueKeyword
            | SyntaxKind::GotoKeyword
            | SyntaxKind::ConstKeyword
    ) || is_possible_expression(kind)
}

/// Tokens that may follow a parenthesized type to make it a cast, as in
/// `(T)x` or `(T)(x)`.
pub fn can_follow_cast(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::IdentifierToken
            | SyntaxKind::NumericLiteralToken
            | SyntaxKind::StringLiteralToken
            | SyntaxKind::CharacterLiteralToken
            | SyntaxKind::OpenParenToken
            | SyntaxKind::TildeToken
            | SyntaxKind::ExclamationToken
            | SyntaxKind::TrueKeyword
            | SyntaxKind::FalseKeyword
            | SyntaxKind::NullKeyword
            | SyntaxKind::ThisKeyword
            | SyntaxKind::NewKeyword
            | SyntaxKind::BaseKeyword
            | SyntaxKind::TypeOfKeyword
            | SyntaxKind::DefaultKeyword
            | SyntaxKind::CheckedKeyword
            | SyntaxKind::UncheckedKeyword
            | SyntaxKind::SizeOfKeyword
    ) || kind.is_predefined_type()
}

/// Parameter modifiers: `ref`, `out`, `in`, `params`.
pub fn is_parameter_modifier(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::RefKeyword
            | SyntaxKind::OutKeyword
            | SyntaxKind::InKeyword
            | SyntaxKind::ParamsKeyword
    )
}

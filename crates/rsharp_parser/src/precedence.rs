//! Operator precedence for binary operators.

use rsharp_ast::syntax_kind::SyntaxKind;

/// Operator precedence levels, matching the C# precedence table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum OperatorPrecedence {
    // Lowest to highest. Assignment and `?:` are parsed above this table.
    Coalescing = 0,
    ConditionalOr = 1,
    ConditionalAnd = 2,
    LogicalOr = 3,
    LogicalXor = 4,
    LogicalAnd = 5,
    Equality = 6,
    /// Also `is` and `as`.
    Relational = 7,
    Shift = 8,
    Additive = 9,
    Multiplicative = 10,
    Unary = 11,
    Primary = 12,
    Invalid = 255,
}

impl OperatorPrecedence {
    /// The level one step tighter than this one.
    pub fn next(self) -> OperatorPrecedence {
        use OperatorPrecedence::*;
        match self {
            Coalescing => ConditionalOr,
            ConditionalOr => ConditionalAnd,
            ConditionalAnd => LogicalOr,
            LogicalOr => LogicalXor,
            LogicalXor => LogicalAnd,
            LogicalAnd => Equality,
            Equality => Relational,
            Relational => Shift,
            Shift => Additive,
            Additive => Multiplicative,
            Multiplicative => Unary,
            Unary => Primary,
            Primary | Invalid => Invalid,
        }
    }

    /// `??` groups to the right; every other binary operator to the left.
    pub fn is_right_associative(self) -> bool {
        self == OperatorPrecedence::Coalescing
    }
}

/// Get the binary operator precedence for a given token kind.
pub fn get_binary_operator_precedence(kind: SyntaxKind) -> OperatorPrecedence {
    match kind {
        SyntaxKind::QuestionQuestionToken => OperatorPrecedence::Coalescing,
        SyntaxKind::BarBarToken => OperatorPrecedence::ConditionalOr,
        SyntaxKind::AmpersandAmpersandToken => OperatorPrecedence::ConditionalAnd,
        SyntaxKind::BarToken => OperatorPrecedence::LogicalOr,
        SyntaxKind::CaretToken => OperatorPrecedence::LogicalXor,
        SyntaxKind::AmpersandToken => OperatorPrecedence::LogicalAnd,
        SyntaxKind::EqualsEqualsToken | SyntaxKind::ExclamationEqualsToken => {
            OperatorPrecedence::Equality
        }
        SyntaxKind::LessThanToken
        | SyntaxKind::GreaterThanToken
        | SyntaxKind::LessThanEqualsToken
        | SyntaxKind::GreaterThanEqualsToken
        | SyntaxKind::IsKeyword
        | SyntaxKind::AsKeyword => OperatorPrecedence::Relational,
        SyntaxKind::LessThanLessThanToken | SyntaxKind::GreaterThanGreaterThanToken => {
            OperatorPrecedence::Shift
        }
        SyntaxKind::PlusToken | SyntaxKind::MinusToken => OperatorPrecedence::Additive,
        SyntaxKind::AsteriskToken | SyntaxKind::SlashToken | SyntaxKind::PercentToken => {
            OperatorPrecedence::Multiplicative
        }
        _ => OperatorPrecedence::Invalid,
    }
}

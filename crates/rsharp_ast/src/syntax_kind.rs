//! SyntaxKind enum - all token and node kinds in the syntax tree.

/// The kind of a syntax token or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum SyntaxKind {
    // ========================================================================
    // Tokens
    // ========================================================================
    Unknown,
    EndOfFileToken,

    IdentifierToken,
    NumericLiteralToken,
    StringLiteralToken,
    CharacterLiteralToken,

    // Punctuation
    OpenBraceToken,
    CloseBraceToken,
    OpenParenToken,
    CloseParenToken,
    OpenBracketToken,
    CloseBracketToken,
    DotToken,
    CommaToken,
    ColonToken,
    ColonColonToken,
    SemicolonToken,
    QuestionToken,
    QuestionQuestionToken,
    QuestionDotToken,
    EqualsGreaterThanToken,
    PlusToken,
    MinusToken,
    AsteriskToken,
    SlashToken,
    PercentToken,
    AmpersandToken,
    BarToken,
    CaretToken,
    ExclamationToken,
    TildeToken,
    LessThanToken,
    GreaterThanToken,
    PlusPlusToken,
    MinusMinusToken,
    AmpersandAmpersandToken,
    BarBarToken,
    EqualsEqualsToken,
    ExclamationEqualsToken,
    LessThanEqualsToken,
    GreaterThanEqualsToken,
    LessThanLessThanToken,
    /// Never produced by the scanner; the parser joins two adjacent `>`.
    GreaterThanGreaterThanToken,

    // Assignment operators
    EqualsToken,
    PlusEqualsToken,
    MinusEqualsToken,
    AsteriskEqualsToken,
    SlashEqualsToken,
    PercentEqualsToken,
    AmpersandEqualsToken,
    BarEqualsToken,
    CaretEqualsToken,
    LessThanLessThanEqualsToken,
    /// Never produced by the scanner; the parser joins `>` and `>=`.
    GreaterThanGreaterThanEqualsToken,
    QuestionQuestionEqualsToken,

    // Keywords
    AbstractKeyword,
    AsKeyword,
    BaseKeyword,
    BoolKeyword,
    BreakKeyword,
    ByteKeyword,
    CaseKeyword,
    CatchKeyword,
    CharKeyword,
    CheckedKeyword,
    ClassKeyword,
    ConstKeyword,
    ContinueKeyword,
    DecimalKeyword,
    DefaultKeyword,
    DelegateKeyword,
    DoKeyword,
    DoubleKeyword,
    ElseKeyword,
    EnumKeyword,
    EventKeyword,
    ExplicitKeyword,
    ExternKeyword,
    FalseKeyword,
    FinallyKeyword,
    FixedKeyword,
    FloatKeyword,
    ForKeyword,
    ForEachKeyword,
    GotoKeyword,
    IfKeyword,
    ImplicitKeyword,
    InKeyword,
    IntKeyword,
    InterfaceKeyword,
    InternalKeyword,
    IsKeyword,
    LockKeyword,
    LongKeyword,
    NamespaceKeyword,
    NewKeyword,
    NullKeyword,
    ObjectKeyword,
    OperatorKeyword,
    OutKeyword,
    OverrideKeyword,
    ParamsKeyword,
    PrivateKeyword,
    ProtectedKeyword,
    PublicKeyword,
    ReadOnlyKeyword,
    RefKeyword,
    ReturnKeyword,
    SByteKeyword,
    SealedKeyword,
    ShortKeyword,
    SizeOfKeyword,
    StackAllocKeyword,
    StaticKeyword,
    StringKeyword,
    StructKeyword,
    SwitchKeyword,
    ThisKeyword,
    ThrowKeyword,
    TrueKeyword,
    TryKeyword,
    TypeOfKeyword,
    UIntKeyword,
    ULongKeyword,
    UncheckedKeyword,
    UnsafeKeyword,
    UShortKeyword,
    UsingKeyword,
    VirtualKeyword,
    VoidKeyword,
    VolatileKeyword,
    WhileKeyword,

    // ========================================================================
    // Nodes
    // ========================================================================
    CompilationUnit,
    UsingDirective,
    NamespaceDeclaration,
    ClassDeclaration,
    StructDeclaration,
    FieldDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    ConversionOperatorDeclaration,
    Parameter,
    GlobalStatement,
    IncompleteMember,

    // Types
    PredefinedType,
    IdentifierName,
    QualifiedName,
    GenericName,
    NullableType,
    ArrayType,

    // Statements
    Block,
    EmptyStatement,
    LocalDeclarationStatement,
    VariableDeclaration,
    VariableDeclarator,
    ExpressionStatement,
    IfStatement,
    WhileStatement,
    DoStatement,
    ForStatement,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    GotoStatement,
    LabeledStatement,

    // Expressions
    NumericLiteralExpression,
    StringLiteralExpression,
    CharacterLiteralExpression,
    TrueLiteralExpression,
    FalseLiteralExpression,
    NullLiteralExpression,
    ThisExpression,
    ParenthesizedExpression,
    BinaryExpression,
    AssignmentExpression,
    ConditionalExpression,
    PrefixUnaryExpression,
    PostfixUnaryExpression,
    CastExpression,
    AsExpression,
    IsExpression,
    MemberAccessExpression,
    InvocationExpression,
    ElementAccessExpression,
    ObjectCreationExpression,
    ArrayCreationExpression,
    ImplicitArrayCreationExpression,
    ArrayInitializerExpression,
    AwaitExpression,

    // Query expressions
    QueryExpression,
    QueryBody,
    FromClause,
    LetClause,
    WhereClause,
    OrderByClause,
    Ordering,
    SelectClause,
    GroupClause,
    QueryContinuation,
}

/// Reserved words, in alphabetical order.
static KEYWORDS: &[(&str, SyntaxKind)] = &[
    ("abstract", SyntaxKind::AbstractKeyword),
    ("as", SyntaxKind::AsKeyword),
    ("base", SyntaxKind::BaseKeyword),
    ("bool", SyntaxKind::BoolKeyword),
    ("break", SyntaxKind::BreakKeyword),
    ("byte", SyntaxKind::ByteKeyword),
    ("case", SyntaxKind::CaseKeyword),
    ("catch", SyntaxKind::CatchKeyword),
    ("char", SyntaxKind::CharKeyword),
    ("checked", SyntaxKind::CheckedKeyword),
    ("class", SyntaxKind::ClassKeyword),
    ("const", SyntaxKind::ConstKeyword),
    ("continue", SyntaxKind::ContinueKeyword),
    ("decimal", SyntaxKind::DecimalKeyword),
    ("default", SyntaxKind::DefaultKeyword),
    ("delegate", SyntaxKind::DelegateKeyword),
    ("do", SyntaxKind::DoKeyword),
    ("double", SyntaxKind::DoubleKeyword),
    ("else", SyntaxKind::ElseKeyword),
    ("enum", SyntaxKind::EnumKeyword),
    ("event", SyntaxKind::EventKeyword),
    ("explicit", SyntaxKind::ExplicitKeyword),
    ("extern", SyntaxKind::ExternKeyword),
    ("false", SyntaxKind::FalseKeyword),
    ("finally", SyntaxKind::FinallyKeyword),
    ("fixed", SyntaxKind::FixedKeyword),
    ("float", SyntaxKind::FloatKeyword),
    ("for", SyntaxKind::ForKeyword),
    ("foreach", SyntaxKind::ForEachKeyword),
    ("goto", SyntaxKind::GotoKeyword),
    ("if", SyntaxKind::IfKeyword),
    ("implicit", SyntaxKind::ImplicitKeyword),
    ("in", SyntaxKind::InKeyword),
    ("int", SyntaxKind::IntKeyword),
    ("interface", SyntaxKind::InterfaceKeyword),
    ("internal", SyntaxKind::InternalKeyword),
    ("is", SyntaxKind::IsKeyword),
    ("lock", SyntaxKind::LockKeyword),
    ("long", SyntaxKind::LongKeyword),
    ("namespace", SyntaxKind::NamespaceKeyword),
    ("new", SyntaxKind::NewKeyword),
    ("null", SyntaxKind::NullKeyword),
    ("object", SyntaxKind::ObjectKeyword),
    ("operator", SyntaxKind::OperatorKeyword),
    ("out", SyntaxKind::OutKeyword),
    ("override", SyntaxKind::OverrideKeyword),
    ("params", SyntaxKind::ParamsKeyword),
    ("private", SyntaxKind::PrivateKeyword),
    ("protected", SyntaxKind::ProtectedKeyword),
    ("public", SyntaxKind::PublicKeyword),
    ("readonly", SyntaxKind::ReadOnlyKeyword),
    ("ref", SyntaxKind::RefKeyword),
    ("return", SyntaxKind::ReturnKeyword),
    ("sbyte", SyntaxKind::SByteKeyword),
    ("sealed", SyntaxKind::SealedKeyword),
    ("short", SyntaxKind::ShortKeyword),
    ("sizeof", SyntaxKind::SizeOfKeyword),
    ("stackalloc", SyntaxKind::StackAllocKeyword),
    ("static", SyntaxKind::StaticKeyword),
    ("string", SyntaxKind::StringKeyword),
    ("struct", SyntaxKind::StructKeyword),
    ("switch", SyntaxKind::SwitchKeyword),
    ("this", SyntaxKind::ThisKeyword),
    ("throw", SyntaxKind::ThrowKeyword),
    ("true", SyntaxKind::TrueKeyword),
    ("try", SyntaxKind::TryKeyword),
    ("typeof", SyntaxKind::TypeOfKeyword),
    ("uint", SyntaxKind::UIntKeyword),
    ("ulong", SyntaxKind::ULongKeyword),
    ("unchecked", SyntaxKind::UncheckedKeyword),
    ("unsafe", SyntaxKind::UnsafeKeyword),
    ("ushort", SyntaxKind::UShortKeyword),
    ("using", SyntaxKind::UsingKeyword),
    ("virtual", SyntaxKind::VirtualKeyword),
    ("void", SyntaxKind::VoidKeyword),
    ("volatile", SyntaxKind::VolatileKeyword),
    ("while", SyntaxKind::WhileKeyword),
];

impl SyntaxKind {
    pub const FIRST_PUNCTUATION: SyntaxKind = SyntaxKind::OpenBraceToken;
    pub const LAST_PUNCTUATION: SyntaxKind = SyntaxKind::QuestionQuestionEqualsToken;
    pub const FIRST_ASSIGNMENT: SyntaxKind = SyntaxKind::EqualsToken;
    pub const LAST_ASSIGNMENT: SyntaxKind = SyntaxKind::QuestionQuestionEqualsToken;
    pub const FIRST_KEYWORD: SyntaxKind = SyntaxKind::AbstractKeyword;
    pub const LAST_KEYWORD: SyntaxKind = SyntaxKind::WhileKeyword;
    pub const FIRST_NODE: SyntaxKind = SyntaxKind::CompilationUnit;

    #[inline]
    fn in_range(self, first: SyntaxKind, last: SyntaxKind) -> bool {
        let v = self as u16;
        v >= first as u16 && v <= last as u16
    }

    /// Whether this kind represents a reserved keyword.
    #[inline]
    pub fn is_keyword(self) -> bool {
        self.in_range(Self::FIRST_KEYWORD, Self::LAST_KEYWORD)
    }

    /// Whether this kind represents a punctuation or operator token.
    #[inline]
    pub fn is_punctuation(self) -> bool {
        self.in_range(Self::FIRST_PUNCTUATION, Self::LAST_PUNCTUATION)
    }

    /// Whether this kind is `=` or a compound assignment operator.
    #[inline]
    pub fn is_assignment_operator(self) -> bool {
        self.in_range(Self::FIRST_ASSIGNMENT, Self::LAST_ASSIGNMENT)
    }

    /// Whether this kind is a token rather than a node.
    #[inline]
    pub fn is_token(self) -> bool {
        (self as u16) < Self::FIRST_NODE as u16
    }

    /// Whether this keyword names a predefined type.
    pub fn is_predefined_type(self) -> bool {
        matches!(
            self,
            SyntaxKind::BoolKeyword
                | SyntaxKind::ByteKeyword
                | SyntaxKind::SByteKeyword
                | SyntaxKind::ShortKeyword
                | SyntaxKind::UShortKeyword
                | SyntaxKind::IntKeyword
                | SyntaxKind::UIntKeyword
                | SyntaxKind::LongKeyword
                | SyntaxKind::ULongKeyword
                | SyntaxKind::CharKeyword
                | SyntaxKind::FloatKeyword
                | SyntaxKind::DoubleKeyword
                | SyntaxKind::DecimalKeyword
                | SyntaxKind::StringKeyword
                | SyntaxKind::ObjectKeyword
                | SyntaxKind::VoidKeyword
        )
    }

    /// Whether this keyword is a declaration modifier.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            SyntaxKind::AbstractKeyword
                | SyntaxKind::ConstKeyword
                | SyntaxKind::ExternKeyword
                | SyntaxKind::InternalKeyword
                | SyntaxKind::NewKeyword
                | SyntaxKind::OverrideKeyword
                | SyntaxKind::PrivateKeyword
                | SyntaxKind::ProtectedKeyword
                | SyntaxKind::PublicKeyword
                | SyntaxKind::ReadOnlyKeyword
                | SyntaxKind::SealedKeyword
                | SyntaxKind::StaticKeyword
                | SyntaxKind::UnsafeKeyword
                | SyntaxKind::VirtualKeyword
                | SyntaxKind::VolatileKeyword
        )
    }

    /// Look up the reserved keyword spelled `text`.
    pub fn from_keyword(text: &str) -> Option<SyntaxKind> {
        KEYWORDS
            .binary_search_by(|(word, _)| (*word).cmp(text))
            .ok()
            .map(|i| KEYWORDS[i].1)
    }

    pub fn keyword_text(self) -> Option<&'static str> {
        if !self.is_keyword() {
            return None;
        }
        KEYWORDS.iter().find(|(_, kind)| *kind == self).map(|(word, _)| *word)
    }

    pub fn punctuation_text(self) -> Option<&'static str> {
        let text = match self {
            SyntaxKind::OpenBraceToken => "{",
            SyntaxKind::CloseBraceToken => "}",
            SyntaxKind::OpenParenToken => "(",
            SyntaxKind::CloseParenToken => ")",
            SyntaxKind::OpenBracketToken => "[",
            SyntaxKind::CloseBracketToken => "]",
            SyntaxKind::DotToken => ".",
            SyntaxKind::CommaToken => ",",
            SyntaxKind::ColonToken => ":",
            SyntaxKind::ColonColonToken => "::",
            SyntaxKind::SemicolonToken => ";",
            SyntaxKind::QuestionToken => "?",
            SyntaxKind::QuestionQuestionToken => "??",
            SyntaxKind::QuestionDotToken => "?.",
            SyntaxKind::EqualsGreaterThanToken => "=>",
            SyntaxKind::PlusToken => "+",
            SyntaxKind::MinusToken => "-",
            SyntaxKind::AsteriskToken => "*",
            SyntaxKind::SlashToken => "/",
            SyntaxKind::PercentToken => "%",
            SyntaxKind::AmpersandToken => "&",
            SyntaxKind::BarToken => "|",
            SyntaxKind::CaretToken => "^",
            SyntaxKind::ExclamationToken => "!",
            SyntaxKind::TildeToken => "~",
            SyntaxKind::LessThanToken => "<",
            SyntaxKind::GreaterThanToken => ">",
            SyntaxKind::PlusPlusToken => "++",
            SyntaxKind::MinusMinusToken => "--",
            SyntaxKind::AmpersandAmpersandToken => "&&",
            SyntaxKind::BarBarToken => "||",
            SyntaxKind::EqualsEqualsToken => "==",
            SyntaxKind::ExclamationEqualsToken => "!=",
            SyntaxKind::LessThanEqualsToken => "<=",
            SyntaxKind::GreaterThanEqualsToken => ">=",
            SyntaxKind::LessThanLessThanToken => "<<",
            SyntaxKind::GreaterThanGreaterThanToken => ">>",
            SyntaxKind::EqualsToken => "=",
            SyntaxKind::PlusEqualsToken => "+=",
            SyntaxKind::MinusEqualsToken => "-=",
            SyntaxKind::AsteriskEqualsToken => "*=",
            SyntaxKind::SlashEqualsToken => "/=",
            SyntaxKind::PercentEqualsToken => "%=",
            SyntaxKind::AmpersandEqualsToken => "&=",
            SyntaxKind::BarEqualsToken => "|=",
            SyntaxKind::CaretEqualsToken => "^=",
            SyntaxKind::LessThanLessThanEqualsToken => "<<=",
            SyntaxKind::GreaterThanGreaterThanEqualsToken => ">>=",
            SyntaxKind::QuestionQuestionEqualsToken => "??=",
            _ => return None,
        };
        Some(text)
    }

    /// The fixed spelling of a punctuation or keyword token.
    pub fn text(self) -> Option<&'static str> {
        self.punctuation_text().or_else(|| self.keyword_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_sorted() {
        assert!(KEYWORDS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_keyword_round_trip() {
        for (word, kind) in KEYWORDS {
            assert_eq!(SyntaxKind::from_keyword(word), Some(*kind));
            assert_eq!(kind.keyword_text(), Some(*word));
            assert!(kind.is_keyword());
        }
        assert_eq!(SyntaxKind::from_keyword("from"), None);
        assert_eq!(SyntaxKind::from_keyword("var"), None);
    }

    #[test]
    fn test_classification() {
        assert!(SyntaxKind::CommaToken.is_punctuation());
        assert!(!SyntaxKind::CommaToken.is_keyword());
        assert!(SyntaxKind::PlusEqualsToken.is_assignment_operator());
        assert!(!SyntaxKind::EqualsEqualsToken.is_assignment_operator());
        assert!(SyntaxKind::IntKeyword.is_predefined_type());
        assert!(SyntaxKind::SemicolonToken.is_token());
        assert!(!SyntaxKind::ForStatement.is_token());
        assert_eq!(SyntaxKind::CloseParenToken.text(), Some(")"));
        assert_eq!(SyntaxKind::ForKeyword.text(), Some("for"));
    }
}

//! Syntax node definitions.
//!
//! Nodes are plain sum types allocated in a per-unit arena. A parent refers
//! to its children through `&'a` references, so a tree is discarded in one
//! piece together with its arena.

use crate::syntax_kind::SyntaxKind;
use crate::types::*;
use rsharp_core::intern::InternedString;
use rsharp_core::text::{TextRange, TextSpan};

// ============================================================================
// Core Node Wrapper
// ============================================================================

/// Common data shared by all syntax nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeData {
    pub kind: SyntaxKind,
    /// Source range, excluding leading trivia.
    pub range: TextRange,
    pub flags: NodeFlags,
}

impl NodeData {
    pub fn new(kind: SyntaxKind, pos: u32, end: u32) -> Self {
        Self {
            kind,
            range: TextRange::new(pos, end),
            flags: NodeFlags::NONE,
        }
    }

    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn span(&self) -> TextSpan {
        self.range.to_span()
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.flags.contains(NodeFlags::MISSING)
    }
}

/// A list of nodes, allocated in the arena.
pub type NodeList<'a, T> = &'a [T];

/// An optional arena-allocated node.
pub type OptionalNode<'a, T> = Option<&'a T>;

// ============================================================================
// Token
// ============================================================================

/// A punctuation or keyword token kept in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub data: NodeData,
}

impl Token {
    pub fn new(kind: SyntaxKind, pos: u32, end: u32) -> Self {
        Self {
            data: NodeData::new(kind, pos, end),
        }
    }

    /// A zero-width placeholder at `pos` standing in for an expected token.
    pub fn missing(kind: SyntaxKind, pos: u32) -> Self {
        Self {
            data: NodeData::new(kind, pos, pos).with_flags(NodeFlags::MISSING),
        }
    }

    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data.kind
    }

    #[inline]
    pub fn span(&self) -> TextSpan {
        self.data.span()
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.data.is_missing()
    }
}

// ============================================================================
// Identifier and placeholders
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Identifier<'a> {
    pub data: NodeData,
    pub name: InternedString,
    /// Source text without a leading `@`.
    pub text: &'a str,
}

impl<'a> Identifier<'a> {
    #[inline]
    pub fn span(&self) -> TextSpan {
        self.data.span()
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.data.is_missing()
    }
}

/// A zero-width node synthesized where a construct was expected.
#[derive(Debug, Clone, Copy)]
pub struct MissingNode {
    pub data: NodeData,
    pub expected: SyntaxKind,
}

impl MissingNode {
    pub fn new(expected: SyntaxKind, pos: u32) -> Self {
        Self {
            data: NodeData::new(expected, pos, pos).with_flags(NodeFlags::MISSING),
            expected,
        }
    }
}

// ============================================================================
// Compilation unit and declarations
// ============================================================================

#[derive(Debug)]
pub struct CompilationUnit<'a> {
    pub data: NodeData,
    pub usings: NodeList<'a, UsingDirective<'a>>,
    pub members: NodeList<'a, Member<'a>>,
    pub end_of_file: Token,
}

#[derive(Debug)]
pub struct UsingDirective<'a> {
    pub data: NodeData,
    pub is_static: bool,
    pub alias: Option<Identifier<'a>>,
    pub name: &'a TypeSyntax<'a>,
}

#[derive(Debug)]
pub enum Member<'a> {
    Namespace(NamespaceDeclaration<'a>),
    Type(TypeDeclaration<'a>),
    GlobalStatement(&'a Statement<'a>),
    Incomplete(IncompleteMember),
}

impl<'a> Member<'a> {
    pub fn data(&self) -> &NodeData {
        match self {
            Member::Namespace(n) => &n.data,
            Member::Type(t) => &t.data,
            Member::GlobalStatement(s) => s.data(),
            Member::Incomplete(m) => &m.data,
        }
    }
}

#[derive(Debug)]
pub struct NamespaceDeclaration<'a> {
    pub data: NodeData,
    pub name: &'a TypeSyntax<'a>,
    pub usings: NodeList<'a, UsingDirective<'a>>,
    pub members: NodeList<'a, Member<'a>>,
}

/// A `class` or `struct` declaration; `data.kind` tells which.
#[derive(Debug)]
pub struct TypeDeclaration<'a> {
    pub data: NodeData,
    pub modifiers: Modifiers,
    pub identifier: Identifier<'a>,
    pub members: NodeList<'a, ClassMember<'a>>,
}

#[derive(Debug)]
pub enum ClassMember<'a> {
    Field(FieldDeclaration<'a>),
    Method(MethodDeclaration<'a>),
    ConversionOperator(ConversionOperatorDeclaration<'a>),
    NestedType(TypeDeclaration<'a>),
    Incomplete(IncompleteMember),
}

impl<'a> ClassMember<'a> {
    pub fn data(&self) -> &NodeData {
        match self {
            ClassMember::Field(f) => &f.data,
            ClassMember::Method(m) => &m.data,
            ClassMember::ConversionOperator(o) => &o.data,
            ClassMember::NestedType(t) => &t.data,
            ClassMember::Incomplete(m) => &m.data,
        }
    }
}

#[derive(Debug)]
pub struct FieldDeclaration<'a> {
    pub data: NodeData,
    pub modifiers: Modifiers,
    pub declaration: VariableDeclaration<'a>,
}

/// A method, or a constructor when `return_type` is `None`.
#[derive(Debug)]
pub struct MethodDeclaration<'a> {
    pub data: NodeData,
    pub modifiers: Modifiers,
    pub return_type: OptionalNode<'a, TypeSyntax<'a>>,
    pub identifier: Identifier<'a>,
    pub parameters: NodeList<'a, Parameter<'a>>,
    pub body: OptionalNode<'a, Block<'a>>,
}

/// `implicit operator T(S s)` or `explicit operator T(S s)`.
#[derive(Debug)]
pub struct ConversionOperatorDeclaration<'a> {
    pub data: NodeData,
    pub modifiers: Modifiers,
    pub implicit_or_explicit: Token,
    pub ty: &'a TypeSyntax<'a>,
    pub parameters: NodeList<'a, Parameter<'a>>,
    pub body: OptionalNode<'a, Block<'a>>,
}

impl<'a> ConversionOperatorDeclaration<'a> {
    #[inline]
    pub fn is_implicit(&self) -> bool {
        self.implicit_or_explicit.kind() == SyntaxKind::ImplicitKeyword
    }
}

#[derive(Debug)]
pub struct Parameter<'a> {
    pub data: NodeData,
    /// `ref`, `out`, `in` or `params`.
    pub modifier: Option<Token>,
    pub ty: &'a TypeSyntax<'a>,
    pub identifier: Identifier<'a>,
}

/// Tokens skipped while looking for a member.
#[derive(Debug, Clone, Copy)]
pub struct IncompleteMember {
    pub data: NodeData,
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug)]
pub enum TypeSyntax<'a> {
    Predefined(PredefinedType),
    Name(Identifier<'a>),
    Qualified(QualifiedName<'a>),
    Generic(GenericName<'a>),
    Nullable(NullableType<'a>),
    Array(ArrayType<'a>),
    Missing(MissingNode),
}

#[derive(Debug, Clone, Copy)]
pub struct PredefinedType {
    pub data: NodeData,
    pub keyword: SyntaxKind,
}

#[derive(Debug)]
pub struct QualifiedName<'a> {
    pub data: NodeData,
    pub left: &'a TypeSyntax<'a>,
    /// A simple or generic name.
    pub right: &'a TypeSyntax<'a>,
}

#[derive(Debug)]
pub struct GenericName<'a> {
    pub data: NodeData,
    pub identifier: Identifier<'a>,
    pub arguments: NodeList<'a, &'a TypeSyntax<'a>>,
}

#[derive(Debug)]
pub struct NullableType<'a> {
    pub data: NodeData,
    pub element: &'a TypeSyntax<'a>,
}

/// `T[]`, or `T[,]` with `rank` 2. Jagged arrays nest.
#[derive(Debug)]
pub struct ArrayType<'a> {
    pub data: NodeData,
    pub element: &'a TypeSyntax<'a>,
    pub rank: u32,
}

impl<'a> TypeSyntax<'a> {
    pub fn data(&self) -> &NodeData {
        match self {
            TypeSyntax::Predefined(t) => &t.data,
            TypeSyntax::Name(n) => &n.data,
            TypeSyntax::Qualified(q) => &q.data,
            TypeSyntax::Generic(g) => &g.data,
            TypeSyntax::Nullable(n) => &n.data,
            TypeSyntax::Array(a) => &a.data,
            TypeSyntax::Missing(m) => &m.data,
        }
    }

    #[inline]
    pub fn span(&self) -> TextSpan {
        self.data().span()
    }

    /// Whether this is the contextual `var` of an implicitly typed local.
    pub fn is_var(&self) -> bool {
        matches!(self, TypeSyntax::Name(n) if n.text == "var")
    }

    pub fn contains_missing(&self) -> bool {
        match self {
            TypeSyntax::Predefined(_) => false,
            TypeSyntax::Name(n) => n.is_missing(),
            TypeSyntax::Qualified(q) => q.left.contains_missing() || q.right.contains_missing(),
            TypeSyntax::Generic(g) => {
                g.identifier.is_missing() || g.arguments.iter().any(|a| a.contains_missing())
            }
            TypeSyntax::Nullable(n) => n.element.contains_missing(),
            TypeSyntax::Array(a) => a.element.contains_missing(),
            TypeSyntax::Missing(_) => true,
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug)]
pub enum Statement<'a> {
    Block(Block<'a>),
    Empty(EmptyStatement),
    LocalDeclaration(LocalDeclarationStatement<'a>),
    Expression(ExpressionStatement<'a>),
    If(IfStatement<'a>),
    While(WhileStatement<'a>),
    Do(DoStatement<'a>),
    For(ForStatement<'a>),
    Return(ReturnStatement<'a>),
    Break(JumpStatement),
    Continue(JumpStatement),
    Goto(GotoStatement<'a>),
    Labeled(LabeledStatement<'a>),
}

impl<'a> Statement<'a> {
    pub fn data(&self) -> &NodeData {
        match self {
            Statement::Block(s) => &s.data,
            Statement::Empty(s) => &s.data,
            Statement::LocalDeclaration(s) => &s.data,
            Statement::Expression(s) => &s.data,
            Statement::If(s) => &s.data,
            Statement::While(s) => &s.data,
            Statement::Do(s) => &s.data,
            Statement::For(s) => &s.data,
            Statement::Return(s) => &s.data,
            Statement::Break(s) | Statement::Continue(s) => &s.data,
            Statement::Goto(s) => &s.data,
            Statement::Labeled(s) => &s.data,
        }
    }

    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data().kind
    }

    #[inline]
    pub fn span(&self) -> TextSpan {
        self.data().span()
    }
}

#[derive(Debug)]
pub struct Block<'a> {
    pub data: NodeData,
    pub open_brace: Token,
    pub statements: NodeList<'a, Statement<'a>>,
    pub close_brace: Token,
}

#[derive(Debug, Clone, Copy)]
pub struct EmptyStatement {
    pub data: NodeData,
}

#[derive(Debug)]
pub struct LocalDeclarationStatement<'a> {
    pub data: NodeData,
    pub modifiers: Modifiers,
    pub declaration: VariableDeclaration<'a>,
    pub semicolon: Token,
}

#[derive(Debug)]
pub struct VariableDeclaration<'a> {
    pub data: NodeData,
    pub ty: &'a TypeSyntax<'a>,
    pub declarators: NodeList<'a, VariableDeclarator<'a>>,
}

#[derive(Debug)]
pub struct VariableDeclarator<'a> {
    pub data: NodeData,
    pub identifier: Identifier<'a>,
    pub initializer: OptionalNode<'a, Expression<'a>>,
}

#[derive(Debug)]
pub struct ExpressionStatement<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub semicolon: Token,
}

#[derive(Debug)]
pub struct IfStatement<'a> {
    pub data: NodeData,
    pub condition: &'a Expression<'a>,
    pub statement: &'a Statement<'a>,
    pub else_statement: OptionalNode<'a, Statement<'a>>,
}

#[derive(Debug)]
pub struct WhileStatement<'a> {
    pub data: NodeData,
    pub condition: &'a Expression<'a>,
    pub statement: &'a Statement<'a>,
}

#[derive(Debug)]
pub struct DoStatement<'a> {
    pub data: NodeData,
    pub statement: &'a Statement<'a>,
    pub condition: &'a Expression<'a>,
}

/// `for ( [initializer] ; [condition] ; [incrementors] ) statement`.
///
/// An absent clause is `None` or an empty list. A clause that failed to parse
/// holds an [`Expression::Missing`] instead.
#[derive(Debug)]
pub struct ForStatement<'a> {
    pub data: NodeData,
    pub for_keyword: Token,
    pub open_paren: Token,
    pub initializer: Option<ForInitializer<'a>>,
    pub first_semicolon: Token,
    pub condition: OptionalNode<'a, Expression<'a>>,
    pub second_semicolon: Token,
    pub incrementors: NodeList<'a, Expression<'a>>,
    pub close_paren: Token,
    pub statement: &'a Statement<'a>,
}

#[derive(Debug)]
pub enum ForInitializer<'a> {
    Declaration(VariableDeclaration<'a>),
    Expressions(NodeList<'a, Expression<'a>>),
}

#[derive(Debug)]
pub struct ReturnStatement<'a> {
    pub data: NodeData,
    pub expression: OptionalNode<'a, Expression<'a>>,
}

/// `break;` or `continue;`.
#[derive(Debug, Clone, Copy)]
pub struct JumpStatement {
    pub data: NodeData,
}

#[derive(Debug)]
pub struct GotoStatement<'a> {
    pub data: NodeData,
    pub label: Identifier<'a>,
}

#[derive(Debug)]
pub struct LabeledStatement<'a> {
    pub data: NodeData,
    pub label: Identifier<'a>,
    pub statement: &'a Statement<'a>,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug)]
pub enum Expression<'a> {
    Identifier(Identifier<'a>),
    Literal(LiteralExpression<'a>),
    This(NodeData),
    /// A keyword type used as an expression, as in `int.Parse(s)`.
    PredefinedType(PredefinedType),
    Parenthesized(ParenthesizedExpression<'a>),
    Binary(BinaryExpression<'a>),
    Assignment(AssignmentExpression<'a>),
    Conditional(ConditionalExpression<'a>),
    PrefixUnary(PrefixUnaryExpression<'a>),
    PostfixUnary(PostfixUnaryExpression<'a>),
    Cast(CastExpression<'a>),
    /// `e as T` or `e is T`.
    TypeTest(TypeTestExpression<'a>),
    MemberAccess(MemberAccessExpression<'a>),
    Invocation(InvocationExpression<'a>),
    ElementAccess(ElementAccessExpression<'a>),
    ObjectCreation(ObjectCreationExpression<'a>),
    ArrayCreation(ArrayCreationExpression<'a>),
    ImplicitArrayCreation(ImplicitArrayCreationExpression<'a>),
    Initializer(InitializerExpression<'a>),
    Await(AwaitExpression<'a>),
    Query(QueryExpression<'a>),
    Missing(MissingNode),
}

/// A literal; `data.kind` is one of the `*LiteralExpression` kinds.
#[derive(Debug, Clone, Copy)]
pub struct LiteralExpression<'a> {
    pub data: NodeData,
    /// Source text of the literal token.
    pub text: &'a str,
    pub token_flags: TokenFlags,
}

#[derive(Debug)]
pub struct ParenthesizedExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct BinaryExpression<'a> {
    pub data: NodeData,
    pub left: &'a Expression<'a>,
    pub operator: Token,
    pub right: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct AssignmentExpression<'a> {
    pub data: NodeData,
    pub left: &'a Expression<'a>,
    pub operator: Token,
    pub right: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct ConditionalExpression<'a> {
    pub data: NodeData,
    pub condition: &'a Expression<'a>,
    pub when_true: &'a Expression<'a>,
    pub when_false: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct PrefixUnaryExpression<'a> {
    pub data: NodeData,
    pub operator: Token,
    pub operand: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct PostfixUnaryExpression<'a> {
    pub data: NodeData,
    pub operand: &'a Expression<'a>,
    pub operator: Token,
}

#[derive(Debug)]
pub struct CastExpression<'a> {
    pub data: NodeData,
    pub ty: &'a TypeSyntax<'a>,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct TypeTestExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub operator: Token,
    pub ty: &'a TypeSyntax<'a>,
}

#[derive(Debug)]
pub struct MemberAccessExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    /// `.` or `?.`
    pub operator: Token,
    pub name: Identifier<'a>,
}

#[derive(Debug)]
pub struct InvocationExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub arguments: NodeList<'a, Expression<'a>>,
}

#[derive(Debug)]
pub struct ElementAccessExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub arguments: NodeList<'a, Expression<'a>>,
}

#[derive(Debug)]
pub struct ObjectCreationExpression<'a> {
    pub data: NodeData,
    pub ty: &'a TypeSyntax<'a>,
    pub arguments: Option<NodeList<'a, Expression<'a>>>,
    pub initializer: OptionalNode<'a, InitializerExpression<'a>>,
}

/// `new T[n]` or `new T[] { ... }`; `ty` is the array type.
#[derive(Debug)]
pub struct ArrayCreationExpression<'a> {
    pub data: NodeData,
    pub ty: &'a TypeSyntax<'a>,
    pub sizes: NodeList<'a, Expression<'a>>,
    pub initializer: OptionalNode<'a, InitializerExpression<'a>>,
}

/// `new[] { ... }`
#[derive(Debug)]
pub struct ImplicitArrayCreationExpression<'a> {
    pub data: NodeData,
    pub initializer: &'a InitializerExpression<'a>,
}

#[derive(Debug)]
pub struct InitializerExpression<'a> {
    pub data: NodeData,
    pub expressions: NodeList<'a, Expression<'a>>,
}

#[derive(Debug)]
pub struct AwaitExpression<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
}

// -- Query Expressions --

/// `from x in e <body>`
#[derive(Debug)]
pub struct QueryExpression<'a> {
    pub data: NodeData,
    pub from_clause: FromClause<'a>,
    pub body: &'a QueryBody<'a>,
}

#[derive(Debug)]
pub struct FromClause<'a> {
    pub data: NodeData,
    pub ty: OptionalNode<'a, TypeSyntax<'a>>,
    pub identifier: Identifier<'a>,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct LetClause<'a> {
    pub data: NodeData,
    pub identifier: Identifier<'a>,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct WhereClause<'a> {
    pub data: NodeData,
    pub condition: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct OrderByClause<'a> {
    pub data: NodeData,
    pub orderings: NodeList<'a, Ordering<'a>>,
}

#[derive(Debug)]
pub struct Ordering<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
    pub descending: bool,
}

#[derive(Debug)]
pub enum QueryClause<'a> {
    From(FromClause<'a>),
    Let(LetClause<'a>),
    Where(WhereClause<'a>),
    OrderBy(OrderByClause<'a>),
}

#[derive(Debug)]
pub struct SelectClause<'a> {
    pub data: NodeData,
    pub expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub struct GroupClause<'a> {
    pub data: NodeData,
    pub group_expression: &'a Expression<'a>,
    pub by_expression: &'a Expression<'a>,
}

#[derive(Debug)]
pub enum SelectOrGroupClause<'a> {
    Select(SelectClause<'a>),
    Group(GroupClause<'a>),
    Missing(MissingNode),
}

#[derive(Debug)]
pub struct QueryBody<'a> {
    pub data: NodeData,
    pub clauses: NodeList<'a, QueryClause<'a>>,
    pub select_or_group: SelectOrGroupClause<'a>,
    pub continuation: OptionalNode<'a, QueryContinuation<'a>>,
}

/// `into x <body>`
#[derive(Debug)]
pub struct QueryContinuation<'a> {
    pub data: NodeData,
    pub identifier: Identifier<'a>,
    pub body: &'a QueryBody<'a>,
}

impl<'a> Expression<'a> {
    pub fn data(&self) -> &NodeData {
        match self {
            Expression::Identifier(e) => &e.data,
            Expression::Literal(e) => &e.data,
            Expression::This(data) => data,
            Expression::PredefinedType(e) => &e.data,
            Expression::Parenthesized(e) => &e.data,
            Expression::Binary(e) => &e.data,
            Expression::Assignment(e) => &e.data,
            Expression::Conditional(e) => &e.data,
            Expression::PrefixUnary(e) => &e.data,
            Expression::PostfixUnary(e) => &e.data,
            Expression::Cast(e) => &e.data,
            Expression::TypeTest(e) => &e.data,
            Expression::MemberAccess(e) => &e.data,
            Expression::Invocation(e) => &e.data,
            Expression::ElementAccess(e) => &e.data,
            Expression::ObjectCreation(e) => &e.data,
            Expression::ArrayCreation(e) => &e.data,
            Expression::ImplicitArrayCreation(e) => &e.data,
            Expression::Initializer(e) => &e.data,
            Expression::Await(e) => &e.data,
            Expression::Query(e) => &e.data,
            Expression::Missing(e) => &e.data,
        }
    }

    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.data().kind
    }

    #[inline]
    pub fn span(&self) -> TextSpan {
        self.data().span()
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Expression::Missing(_))
    }

    /// Whether this expression may stand alone as a statement.
    pub fn is_statement_expression(&self) -> bool {
        match self {
            Expression::Assignment(_)
            | Expression::Invocation(_)
            | Expression::ObjectCreation(_)
            | Expression::Await(_) => true,
            Expression::PrefixUnary(e) => is_increment_or_decrement(e.operator.kind()),
            Expression::PostfixUnary(e) => is_increment_or_decrement(e.operator.kind()),
            _ => false,
        }
    }

    /// Whether recovery synthesized any part of this expression.
    pub fn contains_missing(&self) -> bool {
        match self {
            Expression::Missing(_) => true,
            Expression::Identifier(id) => id.is_missing(),
            Expression::Literal(_) | Expression::This(_) | Expression::PredefinedType(_) => false,
            Expression::Parenthesized(e) => e.expression.contains_missing(),
            Expression::Binary(e) => e.left.contains_missing() || e.right.contains_missing(),
            Expression::Assignment(e) => e.left.contains_missing() || e.right.contains_missing(),
            Expression::Conditional(e) => {
                e.condition.contains_missing()
                    || e.when_true.contains_missing()
                    || e.when_false.contains_missing()
            }
            Expression::PrefixUnary(e) => e.operand.contains_missing(),
            Expression::PostfixUnary(e) => e.operand.contains_missing(),
            Expression::Cast(e) => e.ty.contains_missing() || e.expression.contains_missing(),
            Expression::TypeTest(e) => e.expression.contains_missing() || e.ty.contains_missing(),
            Expression::MemberAccess(e) => e.expression.contains_missing() || e.name.is_missing(),
            Expression::Invocation(e) => {
                e.expression.contains_missing() || any_missing(e.arguments)
            }
            Expression::ElementAccess(e) => {
                e.expression.contains_missing() || any_missing(e.arguments)
            }
            Expression::ObjectCreation(e) => {
                e.ty.contains_missing()
                    || e.arguments.is_some_and(any_missing)
                    || e.initializer.is_some_and(|i| any_missing(i.expressions))
            }
            Expression::ArrayCreation(e) => {
                e.ty.contains_missing()
                    || any_missing(e.sizes)
                    || e.initializer.is_some_and(|i| any_missing(i.expressions))
            }
            Expression::ImplicitArrayCreation(e) => any_missing(e.initializer.expressions),
            Expression::Initializer(e) => any_missing(e.expressions),
            Expression::Await(e) => e.expression.contains_missing(),
            Expression::Query(q) => q.contains_missing(),
        }
    }
}

fn is_increment_or_decrement(kind: SyntaxKind) -> bool {
    matches!(kind, SyntaxKind::PlusPlusToken | SyntaxKind::MinusMinusToken)
}

fn any_missing(expressions: NodeList<'_, Expression<'_>>) -> bool {
    expressions.iter().any(Expression::contains_missing)
}

impl<'a> QueryExpression<'a> {
    pub fn contains_missing(&self) -> bool {
        self.from_clause.contains_missing() || self.body.contains_missing()
    }
}

impl<'a> FromClause<'a> {
    fn contains_missing(&self) -> bool {
        self.ty.is_some_and(TypeSyntax::contains_missing)
            || self.identifier.is_missing()
            || self.expression.contains_missing()
    }
}

impl<'a> QueryBody<'a> {
    fn contains_missing(&self) -> bool {
        let clauses = self.clauses.iter().any(|clause| match clause {
            QueryClause::From(from) => from.contains_missing(),
            QueryClause::Let(l) => l.identifier.is_missing() || l.expression.contains_missing(),
            QueryClause::Where(w) => w.condition.contains_missing(),
            QueryClause::OrderBy(o) => o.orderings.iter().any(|o| o.expression.contains_missing()),
        });
        let ending = match &self.select_or_group {
            SelectOrGroupClause::Select(s) => s.expression.contains_missing(),
            SelectOrGroupClause::Group(g) => {
                g.group_expression.contains_missing() || g.by_expression.contains_missing()
            }
            SelectOrGroupClause::Missing(_) => true,
        };
        clauses
            || ending
            || self
                .continuation
                .is_some_and(|c| c.identifier.is_missing() || c.body.contains_missing())
    }
}

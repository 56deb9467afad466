//! The C# parser implementation.
//!
//! This is a recursive descent parser over the scanner's materialized token
//! stream. Lookahead is plain indexing into the stream, and every loop checks
//! that it made progress, so arbitrary input terminates. Syntax errors are
//! reported to the unit's diagnostic bag and replaced by missing nodes.

use bumpalo::Bump;
use rsharp_ast::node::*;
use rsharp_ast::syntax_kind::SyntaxKind;
use rsharp_ast::types::*;
use rsharp_core::cancel::{CancellationToken, Cancelled};
use rsharp_core::intern::StringInterner;
use rsharp_core::text::TextSpan;
use rsharp_diagnostics::{messages, DiagnosticBag, DiagnosticMessage};
use rsharp_scanner::{TokenInfo, TokenStream};
use tracing::trace;

use crate::precedence::{get_binary_operator_precedence, OperatorPrecedence};
use crate::utilities::*;

/// Default limit on syntactic nesting.
pub const DEFAULT_MAX_DEPTH: u32 = 256;

/// Options that affect parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Nesting depth past which CS8078 is reported and the rest of the unit
    /// is skipped.
    pub max_depth: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// What a type lookahead found.
#[derive(Debug, Clone, Copy)]
struct TypeScan {
    /// Index of the first token after the type.
    end: usize,
    is_predefined: bool,
    ends_with_nullable: bool,
}

/// An operator at the current position. `>>` and `>>=` are composed from
/// adjacent `>` tokens so that nested type argument lists close cleanly.
#[derive(Debug, Clone, Copy)]
struct OperatorToken {
    kind: SyntaxKind,
    pos: u32,
    end: u32,
    token_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostSkipAction {
    Continue,
    Abort,
}

/// The parser produces a `CompilationUnit` from one unit's tokens.
pub struct Parser<'a, 's> {
    arena: &'a Bump,
    interner: &'s StringInterner,
    tokens: &'s [TokenInfo],
    index: usize,
    /// End of the last consumed token.
    prev_end: u32,
    options: ParseOptions,
    cancellation: Option<&'s CancellationToken>,
    recursion_depth: u32,
    /// Set once the nesting limit was hit. The rest of the unit is skipped
    /// and no further syntax errors are reported.
    too_deep: bool,
    /// Inside an `async` method body or top-level statements.
    in_async: bool,
    diagnostics: &'s mut DiagnosticBag,
}

impl<'a, 's> Parser<'a, 's> {
    pub fn new(
        arena: &'a Bump,
        interner: &'s StringInterner,
        tokens: &'s TokenStream,
        diagnostics: &'s mut DiagnosticBag,
    ) -> Self {
        Self {
            arena,
            interner,
            tokens: tokens.tokens(),
            index: 0,
            prev_end: 0,
            options: ParseOptions::default(),
            cancellation: None,
            recursion_depth: 0,
            too_deep: false,
            in_async: false,
            diagnostics,
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, token: &'s CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Parse the whole unit.
    ///
    /// Fails only when cancellation was requested; syntax errors end up in
    /// the diagnostic bag.
    pub fn parse_compilation_unit(mut self) -> Result<CompilationUnit<'a>, Cancelled> {
        let usings = self.parse_using_directives();
        let members = self.parse_members(false)?;
        let eof = self.current();
        trace!(members = members.len(), too_deep = self.too_deep, "parsed compilation unit");
        Ok(CompilationUnit {
            data: NodeData::new(SyntaxKind::CompilationUnit, 0, eof.end),
            usings,
            members,
            end_of_file: Token::new(SyntaxKind::EndOfFileToken, eof.pos, eof.end),
        })
    }

    // ========================================================================
    // Token management
    // ========================================================================

    #[inline]
    fn current(&self) -> &'s TokenInfo {
        &self.tokens[self.index]
    }

    #[inline]
    fn current_kind(&self) -> SyntaxKind {
        self.current().kind
    }

    #[inline]
    fn token_pos(&self) -> u32 {
        self.current().pos
    }

    /// The token at `index`, clamped to end of file.
    #[inline]
    fn token(&self, index: usize) -> &'s TokenInfo {
        &self.tokens[index.min(self.tokens.len() - 1)]
    }

    #[inline]
    fn peek(&self, n: usize) -> &'s TokenInfo {
        self.token(self.index + n)
    }

    fn next_token(&mut self) {
        let token = self.current();
        if token.kind != SyntaxKind::EndOfFileToken {
            self.prev_end = token.end;
            self.index += 1;
        }
    }

    /// The text of the current token when it is a non-verbatim identifier,
    /// for matching contextual keywords.
    fn current_contextual(&self) -> Option<&'s str> {
        let token = self.current();
        (token.kind == SyntaxKind::IdentifierToken && !token.flags.contains(TokenFlags::VERBATIM))
            .then_some(token.text.as_str())
    }

    fn is_contextual(&self, text: &str) -> bool {
        self.current_contextual() == Some(text)
    }

    fn eat_token(&mut self, kind: SyntaxKind) -> Token {
        let token = self.current();
        if token.kind == kind {
            self.next_token();
            return Token::new(kind, token.pos, token.end);
        }
        let span = self.expected_token_span();
        self.report_expected(kind, span);
        trace!(expected = ?kind, found = ?token.kind, pos = token.pos, "missing token");
        Token::missing(kind, self.prev_end)
    }

    fn optional_token(&mut self, kind: SyntaxKind) -> Option<Token> {
        let token = self.current();
        if token.kind == kind {
            self.next_token();
            Some(Token::new(kind, token.pos, token.end))
        } else {
            None
        }
    }

    /// Consume the current token, reporting that `kind` was expected in its
    /// place.
    fn eat_token_with_prejudice(&mut self, kind: SyntaxKind) -> Token {
        let token = self.current();
        self.report_expected(kind, token.span());
        trace!(expected = ?kind, found = ?token.kind, pos = token.pos, "skipped token");
        self.next_token();
        Token::missing(kind, token.pos)
    }

    fn eat_contextual(&mut self, text: &'static str) -> Token {
        let token = self.current();
        if self.is_contextual(text) {
            self.next_token();
            return Token::new(SyntaxKind::IdentifierToken, token.pos, token.end);
        }
        let span = self.expected_token_span();
        self.report(&messages::SYNTAX_ERROR_0_EXPECTED, span, &[text]);
        Token::missing(SyntaxKind::IdentifierToken, self.prev_end)
    }

    /// Where to put an "expected" error: on the current token, unless it
    /// starts a new line or is end of file, in which case just past the
    /// previous token.
    fn expected_token_span(&self) -> TextSpan {
        let token = self.current();
        if token.kind == SyntaxKind::EndOfFileToken || token.has_preceding_line_break() {
            TextSpan::empty(self.prev_end)
        } else {
            token.span()
        }
    }

    fn report_expected(&mut self, kind: SyntaxKind, span: TextSpan) {
        let message = match kind {
            SyntaxKind::SemicolonToken => &messages::SEMICOLON_EXPECTED,
            SyntaxKind::CloseParenToken => &messages::CLOSE_PAREN_EXPECTED,
            SyntaxKind::IdentifierToken => &messages::IDENTIFIER_EXPECTED,
            SyntaxKind::CloseBraceToken => &messages::RBRACE_EXPECTED,
            SyntaxKind::OpenBraceToken => &messages::LBRACE_EXPECTED,
            _ => {
                let text = kind.text().unwrap_or("token");
                self.report(&messages::SYNTAX_ERROR_0_EXPECTED, span, &[text]);
                return;
            }
        };
        self.report(message, span, &[]);
    }

    fn report(&mut self, message: &'static DiagnosticMessage, span: TextSpan, args: &[&str]) {
        if !self.too_deep {
            self.diagnostics.report(message, span, args);
        }
    }

    fn check_cancelled(&self) -> Result<(), Cancelled> {
        match self.cancellation {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Nesting limit
    // ========================================================================

    /// Enter one nesting level. Returns false once the limit is exceeded, at
    /// which point the parser has reported CS8078 and jumped to end of file.
    fn enter(&mut self) -> bool {
        if self.too_deep {
            return false;
        }
        if self.recursion_depth >= self.options.max_depth {
            let span = self.current().span();
            self.diagnostics
                .report(&messages::EXPRESSION_TOO_LONG_OR_COMPLEX, span, &[]);
            self.too_deep = true;
            self.index = self.tokens.len() - 1;
            self.prev_end = self.current().pos;
            trace!(depth = self.recursion_depth, "nesting limit exceeded");
            return false;
        }
        self.recursion_depth += 1;
        true
    }

    #[inline]
    fn leave(&mut self, levels: u32) {
        self.recursion_depth -= levels;
    }

    // ========================================================================
    // Node construction
    // ========================================================================

    /// Node data spanning from `start` to the end of the last consumed token.
    #[inline]
    fn node(&self, kind: SyntaxKind, start: u32) -> NodeData {
        NodeData::new(kind, start, self.prev_end.max(start))
    }

    #[inline]
    fn alloc<T>(&self, value: T) -> &'a T {
        self.arena.alloc(value)
    }

    fn alloc_list<T>(&self, items: Vec<T>) -> &'a [T] {
        self.arena.alloc_slice_fill_iter(items)
    }

    fn make_identifier(&self, token: &TokenInfo) -> Identifier<'a> {
        let mut data = NodeData::new(SyntaxKind::IdentifierName, token.pos, token.end);
        if token.flags.contains(TokenFlags::VERBATIM) {
            data = data.with_flags(NodeFlags::VERBATIM_IDENTIFIER);
        }
        Identifier {
            data,
            name: self.interner.intern(&token.text),
            text: self.arena.alloc_str(&token.text),
        }
    }

    fn missing_identifier(&self) -> Identifier<'a> {
        Identifier {
            data: NodeData::new(SyntaxKind::IdentifierName, self.prev_end, self.prev_end)
                .with_flags(NodeFlags::MISSING),
            name: self.interner.intern(""),
            text: "",
        }
    }

    fn missing_expression(&self) -> Expression<'a> {
        Expression::Missing(MissingNode::new(SyntaxKind::IdentifierName, self.prev_end))
    }

    fn parse_identifier(&mut self) -> Identifier<'a> {
        let token = self.current();
        if token.kind == SyntaxKind::IdentifierToken {
            self.next_token();
            return self.make_identifier(token);
        }
        let span = self.expected_token_span();
        self.report_expected(SyntaxKind::IdentifierToken, span);
        self.missing_identifier()
    }

    // ========================================================================
    // Compilation unit and namespace members
    // ========================================================================

    fn parse_using_directives(&mut self) -> NodeList<'a, UsingDirective<'a>> {
        let mut usings = Vec::new();
        while self.current_kind() == SyntaxKind::UsingKeyword {
            usings.push(self.parse_using_directive());
        }
        self.alloc_list(usings)
    }

    fn parse_using_directive(&mut self) -> UsingDirective<'a> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::UsingKeyword);
        let is_static = self.optional_token(SyntaxKind::StaticKeyword).is_some();
        let alias = if self.current_kind() == SyntaxKind::IdentifierToken
            && self.peek(1).kind == SyntaxKind::EqualsToken
        {
            let alias = self.parse_identifier();
            self.next_token();
            Some(alias)
        } else {
            None
        };
        let name = self.parse_name();
        self.eat_token(SyntaxKind::SemicolonToken);
        UsingDirective {
            data: self.node(SyntaxKind::UsingDirective, start),
            is_static,
            alias,
            name,
        }
    }

    fn parse_members(&mut self, in_namespace: bool) -> Result<NodeList<'a, Member<'a>>, Cancelled> {
        let mut members = Vec::new();
        loop {
            let kind = self.current_kind();
            if kind == SyntaxKind::EndOfFileToken
                || (in_namespace && kind == SyntaxKind::CloseBraceToken)
            {
                break;
            }
            self.check_cancelled()?;
            let saved = self.index;
            let member = self.parse_member(in_namespace)?;
            members.push(member);
            if self.index == saved {
                self.next_token();
            }
        }
        Ok(self.alloc_list(members))
    }

    fn parse_member(&mut self, in_namespace: bool) -> Result<Member<'a>, Cancelled> {
        let kind = self.current_kind();
        if kind == SyntaxKind::NamespaceKeyword || self.is_type_declaration_start() {
            let start = self.token_pos();
            if !self.enter() {
                return Ok(Member::Incomplete(IncompleteMember {
                    data: self.node(SyntaxKind::IncompleteMember, start),
                }));
            }
            let member = if kind == SyntaxKind::NamespaceKeyword {
                self.parse_namespace_declaration().map(Member::Namespace)
            } else {
                let modifiers = self.parse_modifiers();
                self.parse_type_declaration(start, modifiers).map(Member::Type)
            };
            self.leave(1);
            return member;
        }
        if !in_namespace && can_start_statement(kind) {
            let saved = self.in_async;
            self.in_async = true;
            let statement = self.parse_statement();
            self.in_async = saved;
            return Ok(Member::GlobalStatement(self.alloc(statement)));
        }
        let token = self.current();
        self.report(
            &messages::TYPE_OR_NAMESPACE_DEFINITION_OR_END_OF_FILE_EXPECTED,
            token.span(),
            &[],
        );
        self.next_token();
        Ok(Member::Incomplete(IncompleteMember {
            data: self.node(SyntaxKind::IncompleteMember, token.pos),
        }))
    }

    fn parse_namespace_declaration(&mut self) -> Result<NamespaceDeclaration<'a>, Cancelled> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::NamespaceKeyword);
        let name = self.parse_name();
        let (usings, members) = if self.optional_token(SyntaxKind::SemicolonToken).is_some() {
            // File-scoped: the rest of the unit belongs to the namespace.
            let usings = self.parse_using_directives();
            (usings, self.parse_members(true)?)
        } else {
            self.eat_token(SyntaxKind::OpenBraceToken);
            let usings = self.parse_using_directives();
            let members = self.parse_members(true)?;
            self.eat_token(SyntaxKind::CloseBraceToken);
            (usings, members)
        };
        Ok(NamespaceDeclaration {
            data: self.node(SyntaxKind::NamespaceDeclaration, start),
            name,
            usings,
            members,
        })
    }

    fn is_type_declaration_start(&self) -> bool {
        let mut index = self.index;
        loop {
            let kind = self.token(index).kind;
            if kind.is_modifier() || self.is_contextual_modifier_at(index) {
                index += 1;
                continue;
            }
            return matches!(kind, SyntaxKind::ClassKeyword | SyntaxKind::StructKeyword);
        }
    }

    /// `async` or `partial` in modifier position.
    fn is_contextual_modifier_at(&self, index: usize) -> bool {
        let token = self.token(index);
        if token.kind != SyntaxKind::IdentifierToken
            || token.flags.contains(TokenFlags::VERBATIM)
            || Modifiers::from_contextual(&token.text).is_empty()
        {
            return false;
        }
        let next = self.token(index + 1).kind;
        next == SyntaxKind::IdentifierToken
            || next.is_predefined_type()
            || next.is_modifier()
            || matches!(next, SyntaxKind::ClassKeyword | SyntaxKind::StructKeyword)
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::NONE;
        loop {
            let token = self.current();
            let modifier = if token.kind.is_modifier() {
                Modifiers::from_keyword(token.kind)
            } else if self.is_contextual_modifier_at(self.index) {
                Modifiers::from_contextual(&token.text)
            } else {
                break;
            };
            modifiers |= modifier;
            self.next_token();
        }
        modifiers
    }

    // ========================================================================
    // Type declarations and class members
    // ========================================================================

    /// Parse a class or struct whose modifiers have already been consumed.
    fn parse_type_declaration(
        &mut self,
        start: u32,
        modifiers: Modifiers,
    ) -> Result<TypeDeclaration<'a>, Cancelled> {
        let kind = if self.current_kind() == SyntaxKind::StructKeyword {
            SyntaxKind::StructDeclaration
        } else {
            SyntaxKind::ClassDeclaration
        };
        self.next_token();
        let identifier = self.parse_identifier();

        // Base list. Base types carry no meaning for analysis.
        if self.optional_token(SyntaxKind::ColonToken).is_some() {
            loop {
                self.parse_type();
                if self.optional_token(SyntaxKind::CommaToken).is_none() {
                    break;
                }
            }
        }

        self.eat_token(SyntaxKind::OpenBraceToken);
        let members = self.parse_class_members()?;
        self.eat_token(SyntaxKind::CloseBraceToken);
        Ok(TypeDeclaration {
            data: self.node(kind, start),
            modifiers,
            identifier,
            members,
        })
    }

    fn parse_class_members(&mut self) -> Result<NodeList<'a, ClassMember<'a>>, Cancelled> {
        let mut members = Vec::new();
        while !matches!(
            self.current_kind(),
            SyntaxKind::CloseBraceToken | SyntaxKind::EndOfFileToken
        ) {
            self.check_cancelled()?;
            let saved = self.index;
            let member = self.parse_class_member()?;
            members.push(member);
            if self.index == saved {
                self.next_token();
            }
        }
        Ok(self.alloc_list(members))
    }

    fn parse_class_member(&mut self) -> Result<ClassMember<'a>, Cancelled> {
        let start = self.token_pos();
        let modifiers = self.parse_modifiers();
        let token = self.current();
        let member = match token.kind {
            SyntaxKind::ClassKeyword | SyntaxKind::StructKeyword => {
                if !self.enter() {
                    return Ok(ClassMember::Incomplete(IncompleteMember {
                        data: self.node(SyntaxKind::IncompleteMember, start),
                    }));
                }
                let nested = self.parse_type_declaration(start, modifiers);
                self.leave(1);
                ClassMember::NestedType(nested?)
            }
            SyntaxKind::ImplicitKeyword | SyntaxKind::ExplicitKeyword => {
                ClassMember::ConversionOperator(self.parse_conversion_operator(start, modifiers))
            }
            SyntaxKind::IdentifierToken if self.peek(1).kind == SyntaxKind::OpenParenToken => {
                let identifier = self.parse_identifier();
                ClassMember::Method(self.parse_method_rest(start, modifiers, None, identifier))
            }
            kind if kind == SyntaxKind::IdentifierToken || kind.is_predefined_type() => {
                let ty = self.parse_type();
                let identifier = self.parse_identifier();
                if self.current_kind() == SyntaxKind::OpenParenToken {
                    ClassMember::Method(self.parse_method_rest(start, modifiers, Some(ty), identifier))
                } else {
                    let declaration = self.finish_variable_declaration(ty.span().start, ty, identifier);
                    self.eat_token(SyntaxKind::SemicolonToken);
                    ClassMember::Field(FieldDeclaration {
                        data: self.node(SyntaxKind::FieldDeclaration, start),
                        modifiers,
                        declaration,
                    })
                }
            }
            _ => {
                self.skip_bad_member_tokens();
                ClassMember::Incomplete(IncompleteMember {
                    data: self.node(SyntaxKind::IncompleteMember, start),
                })
            }
        };
        Ok(member)
    }

    /// Report the current token as invalid in a member declaration and skip
    /// to something that can start a member.
    fn skip_bad_member_tokens(&mut self) {
        let token = self.current();
        self.report(&messages::INVALID_TOKEN_0_IN_MEMBER_DECLARATION, token.span(), &[&token.text]);
        if matches!(
            token.kind,
            SyntaxKind::CloseBraceToken | SyntaxKind::EndOfFileToken
        ) {
            return;
        }
        self.next_token();
        loop {
            let kind = self.current_kind();
            let can_start_member = kind == SyntaxKind::IdentifierToken
                || kind.is_predefined_type()
                || kind.is_modifier()
                || matches!(
                    kind,
                    SyntaxKind::ClassKeyword
                        | SyntaxKind::StructKeyword
                        | SyntaxKind::ImplicitKeyword
                        | SyntaxKind::ExplicitKeyword
                        | SyntaxKind::CloseBraceToken
                        | SyntaxKind::EndOfFileToken
                );
            if can_start_member {
                break;
            }
            self.next_token();
        }
    }

    fn parse_method_rest(
        &mut self,
        start: u32,
        modifiers: Modifiers,
        return_type: Option<&'a TypeSyntax<'a>>,
        identifier: Identifier<'a>,
    ) -> MethodDeclaration<'a> {
        let kind = if return_type.is_some() {
            SyntaxKind::MethodDeclaration
        } else {
            SyntaxKind::ConstructorDeclaration
        };
        let parameters = self.parse_parameter_list();

        // Constructor initializer: `: base(...)` or `: this(...)`.
        if return_type.is_none() && self.optional_token(SyntaxKind::ColonToken).is_some() {
            if matches!(
                self.current_kind(),
                SyntaxKind::BaseKeyword | SyntaxKind::ThisKeyword
            ) {
                self.next_token();
            } else {
                let span = self.expected_token_span();
                self.report(&messages::SYNTAX_ERROR_0_EXPECTED, span, &["base"]);
            }
            self.parse_argument_list(SyntaxKind::OpenParenToken, SyntaxKind::CloseParenToken);
        }

        let body = self.parse_method_body(modifiers.contains(Modifiers::ASYNC));
        MethodDeclaration {
            data: self.node(kind, start),
            modifiers,
            return_type,
            identifier,
            parameters,
            body,
        }
    }

    fn parse_conversion_operator(
        &mut self,
        start: u32,
        modifiers: Modifiers,
    ) -> ConversionOperatorDeclaration<'a> {
        let token = self.current();
        self.next_token();
        let implicit_or_explicit = Token::new(token.kind, token.pos, token.end);
        self.eat_token(SyntaxKind::OperatorKeyword);
        let ty = self.parse_type();
        let parameters = self.parse_parameter_list();
        let body = self.parse_method_body(false);
        ConversionOperatorDeclaration {
            data: self.node(SyntaxKind::ConversionOperatorDeclaration, start),
            modifiers,
            implicit_or_explicit,
            ty,
            parameters,
            body,
        }
    }

    fn parse_method_body(&mut self, is_async: bool) -> OptionalNode<'a, Block<'a>> {
        if self.optional_token(SyntaxKind::SemicolonToken).is_some() {
            return None;
        }
        let saved = self.in_async;
        self.in_async = is_async;
        let block = self.parse_block();
        self.in_async = saved;
        Some(self.alloc(block))
    }

    fn parse_parameter_list(&mut self) -> NodeList<'a, Parameter<'a>> {
        self.eat_token(SyntaxKind::OpenParenToken);
        let mut parameters = Vec::new();
        if self.current_kind() != SyntaxKind::CloseParenToken {
            loop {
                parameters.push(self.parse_parameter());
                if self.optional_token(SyntaxKind::CommaToken).is_none() {
                    break;
                }
            }
        }
        self.eat_token(SyntaxKind::CloseParenToken);
        self.alloc_list(parameters)
    }

    fn parse_parameter(&mut self) -> Parameter<'a> {
        let start = self.token_pos();
        let token = self.current();
        let modifier = if is_parameter_modifier(token.kind) {
            self.next_token();
            Some(Token::new(token.kind, token.pos, token.end))
        } else {
            None
        };
        let ty = self.parse_type();
        let identifier = self.parse_identifier();
        Parameter {
            data: self.node(SyntaxKind::Parameter, start),
            modifier,
            ty,
            identifier,
        }
    }

    // ========================================================================
    // Statement parsing
    // ========================================================================

    pub fn parse_statement(&mut self) -> Statement<'a> {
        if !self.enter() {
            return Statement::Empty(EmptyStatement {
                data: NodeData::new(SyntaxKind::EmptyStatement, self.prev_end, self.prev_end),
            });
        }
        let statement = self.parse_statement_worker();
        self.leave(1);
        statement
    }

    fn parse_statement_worker(&mut self) -> Statement<'a> {
        let token = self.current();
        match token.kind {
            SyntaxKind::OpenBraceToken => Statement::Block(self.parse_block()),
            SyntaxKind::SemicolonToken => {
                self.next_token();
                Statement::Empty(EmptyStatement {
                    data: NodeData::new(SyntaxKind::EmptyStatement, token.pos, token.end),
                })
            }
            SyntaxKind::IfKeyword => self.parse_if_statement(),
            SyntaxKind::WhileKeyword => self.parse_while_statement(),
            SyntaxKind::DoKeyword => self.parse_do_statement(),
            SyntaxKind::ForKeyword => self.parse_for_statement(),
            SyntaxKind::ReturnKeyword => self.parse_return_statement(),
            SyntaxKind::BreakKeyword => {
                Statement::Break(self.parse_jump_statement(SyntaxKind::BreakStatement))
            }
            SyntaxKind::ContinueKeyword => {
                Statement::Continue(self.parse_jump_statement(SyntaxKind::ContinueStatement))
            }
            SyntaxKind::GotoKeyword => self.parse_goto_statement(),
            SyntaxKind::ConstKeyword => self.parse_local_declaration_statement(),
            SyntaxKind::IdentifierToken if self.peek(1).kind == SyntaxKind::ColonToken => {
                self.parse_labeled_statement()
            }
            _ if self.is_local_declaration_start() => self.parse_local_declaration_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block(&mut self) -> Block<'a> {
        let start = self.token_pos();
        let open_brace = self.eat_token(SyntaxKind::OpenBraceToken);
        let mut statements = Vec::new();
        while !matches!(
            self.current_kind(),
            SyntaxKind::CloseBraceToken | SyntaxKind::EndOfFileToken
        ) {
            let saved = self.index;
            statements.push(self.parse_statement());

            // Error recovery: if the parser hasn't advanced, skip forward to
            // the next statement-starting token to avoid infinite loops.
            if self.index == saved {
                self.skip_to_next_statement();
            }
        }
        let close_brace = self.eat_token(SyntaxKind::CloseBraceToken);
        Block {
            data: self.node(SyntaxKind::Block, start),
            open_brace,
            statements: self.alloc_list(statements),
            close_brace,
        }
    }

    /// Error recovery: drop the current token and whatever follows it until
    /// a statement can begin.
    fn skip_to_next_statement(&mut self) {
        trace!(pos = self.token_pos(), "skipping to next statement");
        self.next_token();
        while !matches!(
            self.current_kind(),
            SyntaxKind::CloseBraceToken | SyntaxKind::EndOfFileToken
        ) && !can_start_statement(self.current_kind())
        {
            self.next_token();
        }
    }

    /// A type followed by a declarator name starts a local declaration.
    fn is_local_declaration_start(&self) -> bool {
        let token = self.current();
        if token.kind == SyntaxKind::IdentifierToken {
            if self.is_query_expression_start() {
                return false;
            }
            if self.in_async && token.text == "await" {
                return false;
            }
        } else if !token.kind.is_predefined_type() {
            return false;
        }
        match self.scan_type(self.index, 0) {
            Some(scan) if self.token(scan.end).kind == SyntaxKind::IdentifierToken => {
                // `T? x` needs a declarator continuation; otherwise `a ? b : c`.
                !scan.ends_with_nullable
                    || matches!(
                        self.token(scan.end + 1).kind,
                        SyntaxKind::EqualsToken | SyntaxKind::SemicolonToken | SyntaxKind::CommaToken
                    )
            }
            _ => false,
        }
    }

    fn parse_local_declaration_statement(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        let mut modifiers = Modifiers::NONE;
        while self.optional_token(SyntaxKind::ConstKeyword).is_some() {
            modifiers |= Modifiers::CONST;
        }
        let declaration = self.parse_variable_declaration();
        let semicolon = self.eat_token(SyntaxKind::SemicolonToken);
        Statement::LocalDeclaration(LocalDeclarationStatement {
            data: self.node(SyntaxKind::LocalDeclarationStatement, start),
            modifiers,
            declaration,
            semicolon,
        })
    }

    fn parse_variable_declaration(&mut self) -> VariableDeclaration<'a> {
        let start = self.token_pos();
        let ty = self.parse_type();
        let first = self.parse_identifier();
        self.finish_variable_declaration(start, ty, first)
    }

    /// Parse the declarators of a declaration whose type and first name have
    /// been consumed.
    fn finish_variable_declaration(
        &mut self,
        start: u32,
        ty: &'a TypeSyntax<'a>,
        first: Identifier<'a>,
    ) -> VariableDeclaration<'a> {
        let mut declarators = vec![self.parse_variable_declarator(first)];
        while self.optional_token(SyntaxKind::CommaToken).is_some() {
            let identifier = self.parse_identifier();
            declarators.push(self.parse_variable_declarator(identifier));
        }
        VariableDeclaration {
            data: self.node(SyntaxKind::VariableDeclaration, start),
            ty,
            declarators: self.alloc_list(declarators),
        }
    }

    fn parse_variable_declarator(&mut self, identifier: Identifier<'a>) -> VariableDeclarator<'a> {
        let start = identifier.data.range.pos;
        let initializer = if self.optional_token(SyntaxKind::EqualsToken).is_some() {
            let value = if self.current_kind() == SyntaxKind::OpenBraceToken {
                Expression::Initializer(self.parse_initializer_expression())
            } else {
                self.parse_expression()
            };
            Some(self.alloc(value))
        } else {
            None
        };
        VariableDeclarator {
            data: self.node(SyntaxKind::VariableDeclarator, start),
            identifier,
            initializer,
        }
    }

    fn parse_expression_statement(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        let expression = self.parse_expression();
        let semicolon = self.eat_token(SyntaxKind::SemicolonToken);
        self.check_statement_expression(&expression);
        Statement::Expression(ExpressionStatement {
            data: self.node(SyntaxKind::ExpressionStatement, start),
            expression: self.alloc(expression),
            semicolon,
        })
    }

    /// CS0201 for an expression that cannot stand alone. Expressions that
    /// already failed to parse are exempt.
    fn check_statement_expression(&mut self, expression: &Expression<'_>) {
        if !expression.contains_missing() && !expression.is_statement_expression() {
            self.report(
                &messages::ONLY_ASSIGNMENT_CALL_INCREMENT_DECREMENT_AWAIT_AND_NEW_AS_STATEMENT,
                expression.span(),
                &[],
            );
        }
    }

    fn parse_if_statement(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::IfKeyword);
        self.eat_token(SyntaxKind::OpenParenToken);
        let condition = self.parse_expression();
        self.eat_token(SyntaxKind::CloseParenToken);
        let statement = self.parse_statement();
        let else_statement = if self.optional_token(SyntaxKind::ElseKeyword).is_some() {
            let else_statement = self.parse_statement();
            Some(self.alloc(else_statement))
        } else {
            None
        };
        Statement::If(IfStatement {
            data: self.node(SyntaxKind::IfStatement, start),
            condition: self.alloc(condition),
            statement: self.alloc(statement),
            else_statement,
        })
    }

    fn parse_while_statement(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::WhileKeyword);
        self.eat_token(SyntaxKind::OpenParenToken);
        let condition = self.parse_expression();
        self.eat_token(SyntaxKind::CloseParenToken);
        let statement = self.parse_statement();
        Statement::While(WhileStatement {
            data: self.node(SyntaxKind::WhileStatement, start),
            condition: self.alloc(condition),
            statement: self.alloc(statement),
        })
    }

    fn parse_do_statement(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::DoKeyword);
        let statement = self.parse_statement();
        self.eat_token(SyntaxKind::WhileKeyword);
        self.eat_token(SyntaxKind::OpenParenToken);
        let condition = self.parse_expression();
        self.eat_token(SyntaxKind::CloseParenToken);
        self.eat_token(SyntaxKind::SemicolonToken);
        Statement::Do(DoStatement {
            data: self.node(SyntaxKind::DoStatement, start),
            statement: self.alloc(statement),
            condition: self.alloc(condition),
        })
    }

    fn parse_for_statement(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        let for_keyword = self.eat_token(SyntaxKind::ForKeyword);
        let open_paren = self.eat_token(SyntaxKind::OpenParenToken);

        let initializer = if self.is_local_declaration_start() {
            Some(ForInitializer::Declaration(self.parse_variable_declaration()))
        } else if self.current_kind() != SyntaxKind::SemicolonToken {
            // Not a type followed by a name, so it must be an expression list.
            let expressions = self.parse_for_expression_list(false);
            (!expressions.is_empty()).then_some(ForInitializer::Expressions(expressions))
        } else {
            None
        };

        let first_semicolon = self.eat_comma_or_semicolon();

        let condition = if matches!(
            self.current_kind(),
            SyntaxKind::SemicolonToken | SyntaxKind::CommaToken
        ) {
            None
        } else {
            let condition = self.parse_expression();
            Some(self.alloc(condition))
        };

        let second_semicolon = self.eat_comma_or_semicolon();

        let incrementors = if self.current_kind() != SyntaxKind::CloseParenToken {
            self.parse_for_expression_list(true)
        } else {
            self.alloc_list(Vec::new())
        };

        let close_paren = self.eat_unexpected_tokens_and_close_paren();

        if let Some(ForInitializer::Expressions(expressions)) = &initializer {
            for expression in expressions.iter() {
                self.check_statement_expression(expression);
            }
        }
        for expression in incrementors {
            self.check_statement_expression(expression);
        }

        let statement = self.parse_statement();
        Statement::For(ForStatement {
            data: self.node(SyntaxKind::ForStatement, start),
            for_keyword,
            open_paren,
            initializer,
            first_semicolon,
            condition,
            second_semicolon,
            incrementors,
            close_paren,
            statement: self.alloc(statement),
        })
    }

    /// A `,` where a header `;` belongs still yields the `;`, reported as
    /// missing, and the comma is skipped.
    fn eat_comma_or_semicolon(&mut self) -> Token {
        if self.current_kind() == SyntaxKind::CommaToken {
            let semicolon = self.eat_token(SyntaxKind::SemicolonToken);
            self.next_token();
            semicolon
        } else {
            self.eat_token(SyntaxKind::SemicolonToken)
        }
    }

    fn eat_unexpected_tokens_and_close_paren(&mut self) -> Token {
        while matches!(
            self.current_kind(),
            SyntaxKind::SemicolonToken | SyntaxKind::CommaToken
        ) {
            self.eat_token_with_prejudice(SyntaxKind::CloseParenToken);
        }
        self.eat_token(SyntaxKind::CloseParenToken)
    }

    /// Comma-separated expressions of a `for` header. In the incrementor
    /// position a `;` is accepted as a misplaced separator.
    fn parse_for_expression_list(
        &mut self,
        allow_semicolon_separator: bool,
    ) -> NodeList<'a, Expression<'a>> {
        let mut list = Vec::new();
        if self.current_kind() == SyntaxKind::CloseParenToken {
            return self.alloc_list(list);
        }
        loop {
            if self.is_separator_or_element(allow_semicolon_separator) {
                list.push(self.parse_expression());
                let mut last_index = None;
                while last_index != Some(self.index) {
                    last_index = Some(self.index);
                    if self.current_kind() == SyntaxKind::CloseParenToken {
                        break;
                    }
                    if self.is_separator_or_element(allow_semicolon_separator) {
                        if self.current_kind() == SyntaxKind::SemicolonToken {
                            self.eat_token_with_prejudice(SyntaxKind::CommaToken);
                        } else {
                            self.eat_token(SyntaxKind::CommaToken);
                        }
                        list.push(self.parse_expression());
                        continue;
                    }
                    if self.skip_bad_for_list_tokens(SyntaxKind::CommaToken) == PostSkipAction::Abort {
                        break;
                    }
                }
                break;
            }
            if self.skip_bad_for_list_tokens(SyntaxKind::IdentifierToken) == PostSkipAction::Abort {
                break;
            }
        }
        self.alloc_list(list)
    }

    fn is_separator_or_element(&self, allow_semicolon_separator: bool) -> bool {
        let kind = self.current_kind();
        kind == SyntaxKind::CommaToken
            || (allow_semicolon_separator && kind == SyntaxKind::SemicolonToken)
            || is_possible_expression(kind)
    }

    /// Skip tokens that cannot continue a `for` expression list. The first
    /// one is reported as `expected`; the rest are dropped silently.
    fn skip_bad_for_list_tokens(&mut self, expected: SyntaxKind) -> PostSkipAction {
        if matches!(
            self.current_kind(),
            SyntaxKind::CloseParenToken | SyntaxKind::SemicolonToken
        ) {
            return PostSkipAction::Abort;
        }
        let mut first = true;
        loop {
            let kind = self.current_kind();
            if kind == SyntaxKind::CommaToken || is_possible_expression(kind) {
                return PostSkipAction::Continue;
            }
            if matches!(
                kind,
                SyntaxKind::CloseParenToken
                    | SyntaxKind::SemicolonToken
                    | SyntaxKind::OpenBraceToken
                    | SyntaxKind::CloseBraceToken
                    | SyntaxKind::EndOfFileToken
            ) {
                return PostSkipAction::Abort;
            }
            if first {
                self.eat_token_with_prejudice(expected);
                first = false;
            } else {
                self.next_token();
            }
        }
    }

    fn parse_return_statement(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::ReturnKeyword);
        let expression = if self.current_kind() != SyntaxKind::SemicolonToken {
            let expression = self.parse_expression();
            Some(self.alloc(expression))
        } else {
            None
        };
        self.eat_token(SyntaxKind::SemicolonToken);
        Statement::Return(ReturnStatement {
            data: self.node(SyntaxKind::ReturnStatement, start),
            expression,
        })
    }

    fn parse_jump_statement(&mut self, kind: SyntaxKind) -> JumpStatement {
        let start = self.token_pos();
        self.next_token();
        self.eat_token(SyntaxKind::SemicolonToken);
        JumpStatement {
            data: self.node(kind, start),
        }
    }

    fn parse_goto_statement(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::GotoKeyword);
        let label = self.parse_identifier();
        self.eat_token(SyntaxKind::SemicolonToken);
        Statement::Goto(GotoStatement {
            data: self.node(SyntaxKind::GotoStatement, start),
            label,
        })
    }

    fn parse_labeled_statement(&mut self) -> Statement<'a> {
        let start = self.token_pos();
        let label = self.parse_identifier();
        self.eat_token(SyntaxKind::ColonToken);
        let statement = self.parse_statement();
        Statement::Labeled(LabeledStatement {
            data: self.node(SyntaxKind::LabeledStatement, start),
            label,
            statement: self.alloc(statement),
        })
    }

    // ========================================================================
    // Expression parsing
    // ========================================================================

    pub fn parse_expression(&mut self) -> Expression<'a> {
        if !self.enter() {
            return self.missing_expression();
        }
        let expression = if self.is_query_expression_start() {
            Expression::Query(self.parse_query_expression())
        } else {
            self.parse_assignment_expression()
        };
        self.leave(1);
        expression
    }

    fn parse_assignment_expression(&mut self) -> Expression<'a> {
        let start = self.token_pos();
        let left = self.parse_conditional_expression();
        let op = self.peek_operator();
        if !op.kind.is_assignment_operator() {
            return left;
        }
        let operator = self.eat_operator(op);
        let right = self.parse_expression();
        Expression::Assignment(AssignmentExpression {
            data: self.node(SyntaxKind::AssignmentExpression, start),
            left: self.alloc(left),
            operator,
            right: self.alloc(right),
        })
    }

    fn parse_conditional_expression(&mut self) -> Expression<'a> {
        let start = self.token_pos();
        let condition = self.parse_binary_expression(OperatorPrecedence::Coalescing);
        if self.optional_token(SyntaxKind::QuestionToken).is_none() {
            return condition;
        }
        let when_true = self.parse_expression();
        self.eat_token(SyntaxKind::ColonToken);
        let when_false = self.parse_expression();
        Expression::Conditional(ConditionalExpression {
            data: self.node(SyntaxKind::ConditionalExpression, start),
            condition: self.alloc(condition),
            when_true: self.alloc(when_true),
            when_false: self.alloc(when_false),
        })
    }

    fn peek_operator(&self) -> OperatorToken {
        let token = self.current();
        if token.kind == SyntaxKind::GreaterThanToken {
            let next = self.peek(1);
            if next.pos == token.end {
                let composed = match next.kind {
                    SyntaxKind::GreaterThanToken => Some(SyntaxKind::GreaterThanGreaterThanToken),
                    SyntaxKind::GreaterThanEqualsToken => {
                        Some(SyntaxKind::GreaterThanGreaterThanEqualsToken)
                    }
                    _ => None,
                };
                if let Some(kind) = composed {
                    return OperatorToken {
                        kind,
                        pos: token.pos,
                        end: next.end,
                        token_count: 2,
                    };
                }
            }
        }
        OperatorToken {
            kind: token.kind,
            pos: token.pos,
            end: token.end,
            token_count: 1,
        }
    }

    fn eat_operator(&mut self, op: OperatorToken) -> Token {
        for _ in 0..op.token_count {
            self.next_token();
        }
        Token::new(op.kind, op.pos, op.end)
    }

    /// Precedence climbing. Each operator in a chain counts as one nesting
    /// level, so left-deep trees stay within the limit too.
    fn parse_binary_expression(&mut self, min: OperatorPrecedence) -> Expression<'a> {
        let start = self.token_pos();
        let mut left = self.parse_unary_expression();
        let mut levels = 0;
        loop {
            let op = self.peek_operator();
            let precedence = get_binary_operator_precedence(op.kind);
            if precedence == OperatorPrecedence::Invalid || precedence < min {
                break;
            }
            if !self.enter() {
                break;
            }
            levels += 1;
            let operator = self.eat_operator(op);
            left = if matches!(op.kind, SyntaxKind::IsKeyword | SyntaxKind::AsKeyword) {
                let kind = if op.kind == SyntaxKind::IsKeyword {
                    SyntaxKind::IsExpression
                } else {
                    SyntaxKind::AsExpression
                };
                let ty = self.parse_type();
                Expression::TypeTest(TypeTestExpression {
                    data: self.node(kind, start),
                    expression: self.alloc(left),
                    operator,
                    ty,
                })
            } else {
                let next = if precedence.is_right_associative() {
                    precedence
                } else {
                    precedence.next()
                };
                let right = self.parse_binary_expression(next);
                Expression::Binary(BinaryExpression {
                    data: self.node(SyntaxKind::BinaryExpression, start),
                    left: self.alloc(left),
                    operator,
                    right: self.alloc(right),
                })
            };
        }
        self.leave(levels);
        left
    }

    fn parse_unary_expression(&mut self) -> Expression<'a> {
        if !self.enter() {
            return self.missing_expression();
        }
        let expression = self.parse_unary_worker();
        self.leave(1);
        expression
    }

    fn parse_unary_worker(&mut self) -> Expression<'a> {
        let token = self.current();
        match token.kind {
            SyntaxKind::PlusToken
            | SyntaxKind::MinusToken
            | SyntaxKind::ExclamationToken
            | SyntaxKind::TildeToken
            | SyntaxKind::PlusPlusToken
            | SyntaxKind::MinusMinusToken => {
                self.next_token();
                let operator = Token::new(token.kind, token.pos, token.end);
                let operand = self.parse_unary_expression();
                Expression::PrefixUnary(PrefixUnaryExpression {
                    data: self.node(SyntaxKind::PrefixUnaryExpression, token.pos),
                    operator,
                    operand: self.alloc(operand),
                })
            }
            SyntaxKind::IdentifierToken if self.in_async && self.is_contextual("await") => {
                self.next_token();
                let operand = self.parse_unary_expression();
                Expression::Await(AwaitExpression {
                    data: self.node(SyntaxKind::AwaitExpression, token.pos),
                    expression: self.alloc(operand),
                })
            }
            SyntaxKind::OpenParenToken if self.is_cast_expression() => self.parse_cast_expression(),
            _ => {
                let primary = self.parse_primary_expression();
                self.parse_postfix_expression(token.pos, primary)
            }
        }
    }

    /// `(T)x` is a cast when `T` is a keyword type, or when the token after
    /// `)` can only begin an operand.
    fn is_cast_expression(&self) -> bool {
        let Some(scan) = self.scan_type(self.index + 1, 0) else {
            return false;
        };
        if self.token(scan.end).kind != SyntaxKind::CloseParenToken {
            return false;
        }
        scan.is_predefined || can_follow_cast(self.token(scan.end + 1).kind)
    }

    fn parse_cast_expression(&mut self) -> Expression<'a> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::OpenParenToken);
        let ty = self.parse_type();
        self.eat_token(SyntaxKind::CloseParenToken);
        let expression = self.parse_unary_expression();
        Expression::Cast(CastExpression {
            data: self.node(SyntaxKind::CastExpression, start),
            ty,
            expression: self.alloc(expression),
        })
    }

    fn parse_primary_expression(&mut self) -> Expression<'a> {
        let token = self.current();
        match token.kind {
            SyntaxKind::IdentifierToken => {
                self.next_token();
                Expression::Identifier(self.make_identifier(token))
            }
            SyntaxKind::NumericLiteralToken => self.parse_literal(SyntaxKind::NumericLiteralExpression),
            SyntaxKind::StringLiteralToken => self.parse_literal(SyntaxKind::StringLiteralExpression),
            SyntaxKind::CharacterLiteralToken => {
                self.parse_literal(SyntaxKind::CharacterLiteralExpression)
            }
            SyntaxKind::TrueKeyword => self.parse_literal(SyntaxKind::TrueLiteralExpression),
            SyntaxKind::FalseKeyword => self.parse_literal(SyntaxKind::FalseLiteralExpression),
            SyntaxKind::NullKeyword => self.parse_literal(SyntaxKind::NullLiteralExpression),
            SyntaxKind::ThisKeyword => {
                self.next_token();
                Expression::This(NodeData::new(SyntaxKind::ThisExpression, token.pos, token.end))
            }
            SyntaxKind::OpenParenToken => {
                self.next_token();
                let expression = self.parse_expression();
                self.eat_token(SyntaxKind::CloseParenToken);
                Expression::Parenthesized(ParenthesizedExpression {
                    data: self.node(SyntaxKind::ParenthesizedExpression, token.pos),
                    expression: self.alloc(expression),
                })
            }
            SyntaxKind::NewKeyword => self.parse_new_expression(),
            kind if kind.is_predefined_type() => {
                self.next_token();
                Expression::PredefinedType(PredefinedType {
                    data: NodeData::new(SyntaxKind::PredefinedType, token.pos, token.end),
                    keyword: kind,
                })
            }
            _ => {
                if token.kind == SyntaxKind::EndOfFileToken {
                    self.report(&messages::EXPRESSION_EXPECTED, token.span(), &[]);
                } else {
                    self.report(&messages::INVALID_EXPRESSION_TERM_0, token.span(), &[&token.text]);
                }
                self.missing_expression()
            }
        }
    }

    fn parse_literal(&mut self, kind: SyntaxKind) -> Expression<'a> {
        let token = self.current();
        self.next_token();
        Expression::Literal(LiteralExpression {
            data: NodeData::new(kind, token.pos, token.end),
            text: self.arena.alloc_str(&token.text),
            token_flags: token.flags,
        })
    }

    fn parse_postfix_expression(&mut self, start: u32, mut expression: Expression<'a>) -> Expression<'a> {
        let mut levels = 0;
        loop {
            let token = self.current();
            if !matches!(
                token.kind,
                SyntaxKind::DotToken
                    | SyntaxKind::QuestionDotToken
                    | SyntaxKind::OpenParenToken
                    | SyntaxKind::OpenBracketToken
                    | SyntaxKind::PlusPlusToken
                    | SyntaxKind::MinusMinusToken
            ) {
                break;
            }
            if !self.enter() {
                break;
            }
            levels += 1;
            expression = match token.kind {
                SyntaxKind::DotToken | SyntaxKind::QuestionDotToken => {
                    self.next_token();
                    let operator = Token::new(token.kind, token.pos, token.end);
                    let name = self.parse_identifier();
                    Expression::MemberAccess(MemberAccessExpression {
                        data: self.node(SyntaxKind::MemberAccessExpression, start),
                        expression: self.alloc(expression),
                        operator,
                        name,
                    })
                }
                SyntaxKind::OpenParenToken => {
                    let arguments = self
                        .parse_argument_list(SyntaxKind::OpenParenToken, SyntaxKind::CloseParenToken);
                    Expression::Invocation(InvocationExpression {
                        data: self.node(SyntaxKind::InvocationExpression, start),
                        expression: self.alloc(expression),
                        arguments,
                    })
                }
                SyntaxKind::OpenBracketToken => {
                    let arguments = self.parse_argument_list(
                        SyntaxKind::OpenBracketToken,
                        SyntaxKind::CloseBracketToken,
                    );
                    Expression::ElementAccess(ElementAccessExpression {
                        data: self.node(SyntaxKind::ElementAccessExpression, start),
                        expression: self.alloc(expression),
                        arguments,
                    })
                }
                _ => {
                    self.next_token();
                    Expression::PostfixUnary(PostfixUnaryExpression {
                        data: self.node(SyntaxKind::PostfixUnaryExpression, start),
                        operand: self.alloc(expression),
                        operator: Token::new(token.kind, token.pos, token.end),
                    })
                }
            };
        }
        self.leave(levels);
        expression
    }

    fn parse_argument_list(&mut self, open: SyntaxKind, close: SyntaxKind) -> NodeList<'a, Expression<'a>> {
        self.eat_token(open);
        let mut arguments = Vec::new();
        if self.current_kind() != close {
            loop {
                // `ref`, `out` and `in` arguments are typed like plain ones.
                if matches!(
                    self.current_kind(),
                    SyntaxKind::RefKeyword | SyntaxKind::OutKeyword | SyntaxKind::InKeyword
                ) {
                    self.next_token();
                }
                arguments.push(self.parse_expression());
                if self.optional_token(SyntaxKind::CommaToken).is_none() {
                    break;
                }
            }
        }
        self.eat_token(close);
        self.alloc_list(arguments)
    }

    fn parse_new_expression(&mut self) -> Expression<'a> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::NewKeyword);

        if self.optional_token(SyntaxKind::OpenBracketToken).is_some() {
            while self.optional_token(SyntaxKind::CommaToken).is_some() {}
            self.eat_token(SyntaxKind::CloseBracketToken);
            let initializer = self.parse_initializer_expression();
            return Expression::ImplicitArrayCreation(ImplicitArrayCreationExpression {
                data: self.node(SyntaxKind::ImplicitArrayCreationExpression, start),
                initializer: self.alloc(initializer),
            });
        }

        let ty = self.parse_type_core(false);
        match self.current_kind() {
            SyntaxKind::OpenBracketToken => self.parse_array_creation_rest(start, ty),
            SyntaxKind::OpenParenToken => {
                let arguments =
                    self.parse_argument_list(SyntaxKind::OpenParenToken, SyntaxKind::CloseParenToken);
                let initializer = self.parse_optional_initializer();
                Expression::ObjectCreation(ObjectCreationExpression {
                    data: self.node(SyntaxKind::ObjectCreationExpression, start),
                    ty,
                    arguments: Some(arguments),
                    initializer,
                })
            }
            SyntaxKind::OpenBraceToken => {
                let initializer = self.parse_optional_initializer();
                Expression::ObjectCreation(ObjectCreationExpression {
                    data: self.node(SyntaxKind::ObjectCreationExpression, start),
                    ty,
                    arguments: None,
                    initializer,
                })
            }
            _ => {
                let span = self.expected_token_span();
                self.report(&messages::NEW_EXPRESSION_REQUIRES_ARGUMENTS, span, &[]);
                Expression::ObjectCreation(ObjectCreationExpression {
                    data: self.node(SyntaxKind::ObjectCreationExpression, start),
                    ty,
                    arguments: None,
                    initializer: None,
                })
            }
        }
    }

    /// `new T[n, m][]` or `new T[] { ... }` once `new T` has been consumed.
    fn parse_array_creation_rest(&mut self, start: u32, element: &'a TypeSyntax<'a>) -> Expression<'a> {
        self.eat_token(SyntaxKind::OpenBracketToken);
        let mut sizes = Vec::new();
        let mut rank = 1;
        loop {
            match self.current_kind() {
                SyntaxKind::CloseBracketToken | SyntaxKind::EndOfFileToken => break,
                SyntaxKind::CommaToken => {
                    rank += 1;
                    self.next_token();
                }
                _ => {
                    sizes.push(self.parse_expression());
                    if self.optional_token(SyntaxKind::CommaToken).is_none() {
                        break;
                    }
                    rank += 1;
                }
            }
        }
        self.eat_token(SyntaxKind::CloseBracketToken);
        let mut ty = self.alloc(TypeSyntax::Array(ArrayType {
            data: self.node(SyntaxKind::ArrayType, element.span().start),
            element,
            rank,
        }));
        ty = self.parse_rank_specifiers(element.span().start, ty);
        let initializer = self.parse_optional_initializer();
        Expression::ArrayCreation(ArrayCreationExpression {
            data: self.node(SyntaxKind::ArrayCreationExpression, start),
            ty,
            sizes: self.alloc_list(sizes),
            initializer,
        })
    }

    fn parse_optional_initializer(&mut self) -> OptionalNode<'a, InitializerExpression<'a>> {
        if self.current_kind() != SyntaxKind::OpenBraceToken {
            return None;
        }
        let initializer = self.parse_initializer_expression();
        Some(self.alloc(initializer))
    }

    /// `{ a, b, }`, as an array, collection or object initializer.
    fn parse_initializer_expression(&mut self) -> InitializerExpression<'a> {
        let start = self.token_pos();
        self.eat_token(SyntaxKind::OpenBraceToken);
        let mut expressions = Vec::new();
        if self.enter() {
            while !matches!(
                self.current_kind(),
                SyntaxKind::CloseBraceToken | SyntaxKind::EndOfFileToken
            ) {
                let expression = if self.current_kind() == SyntaxKind::OpenBraceToken {
                    Expression::Initializer(self.parse_initializer_expression())
                } else {
                    self.parse_expression()
                };
                expressions.push(expression);
                if self.optional_token(SyntaxKind::CommaToken).is_none() {
                    break;
                }
            }
            self.leave(1);
        }
        self.eat_token(SyntaxKind::CloseBraceToken);
        InitializerExpression {
            data: self.node(SyntaxKind::ArrayInitializerExpression, start),
            expressions: self.alloc_list(expressions),
        }
    }

    // ========================================================================
    // Query expressions
    // ========================================================================

    /// `from` followed by a range variable, optionally typed.
    fn is_query_expression_start(&self) -> bool {
        if !self.is_contextual("from") {
            return false;
        }
        let next = self.peek(1).kind;
        if next.is_predefined_type() {
            return true;
        }
        next == SyntaxKind::IdentifierToken
            && !matches!(
                self.peek(2).kind,
                SyntaxKind::SemicolonToken | SyntaxKind::CommaToken | SyntaxKind::EqualsToken
            )
    }

    fn parse_query_expression(&mut self) -> QueryExpression<'a> {
        let start = self.token_pos();
        let from_clause = self.parse_from_clause();
        let body = self.parse_query_body();
        QueryExpression {
            data: self.node(SyntaxKind::QueryExpression, start),
            from_clause,
            body: self.alloc(body),
        }
    }

    fn parse_from_clause(&mut self) -> FromClause<'a> {
        let start = self.token_pos();
        self.next_token();
        let ty = if self.current_kind() == SyntaxKind::IdentifierToken
            && self.peek(1).kind == SyntaxKind::InKeyword
        {
            None
        } else {
            Some(self.parse_type())
        };
        let identifier = self.parse_identifier();
        self.eat_token(SyntaxKind::InKeyword);
        let expression = self.parse_expression();
        FromClause {
            data: self.node(SyntaxKind::FromClause, start),
            ty,
            identifier,
            expression: self.alloc(expression),
        }
    }

    fn parse_query_body(&mut self) -> QueryBody<'a> {
        let start = self.token_pos();
        let mut clauses = Vec::new();
        loop {
            let clause = match self.current_contextual() {
                Some("from") => QueryClause::From(self.parse_from_clause()),
                Some("let") => QueryClause::Let(self.parse_let_clause()),
                Some("where") => {
                    let clause_start = self.token_pos();
                    self.next_token();
                    let condition = self.parse_expression();
                    QueryClause::Where(WhereClause {
                        data: self.node(SyntaxKind::WhereClause, clause_start),
                        condition: self.alloc(condition),
                    })
                }
                Some("orderby") => QueryClause::OrderBy(self.parse_orderby_clause()),
                _ => break,
            };
            clauses.push(clause);
        }

        let select_or_group = self.parse_select_or_group_clause();

        let continuation = if self.is_contextual("into") {
            let into_start = self.token_pos();
            self.next_token();
            let identifier = self.parse_identifier();
            if self.enter() {
                let body = self.parse_query_body();
                self.leave(1);
                let body = self.alloc(body);
                Some(self.alloc(QueryContinuation {
                    data: self.node(SyntaxKind::QueryContinuation, into_start),
                    identifier,
                    body,
                }))
            } else {
                None
            }
        } else {
            None
        };

        QueryBody {
            data: self.node(SyntaxKind::QueryBody, start),
            clauses: self.alloc_list(clauses),
            select_or_group,
            continuation,
        }
    }

    fn parse_let_clause(&mut self) -> LetClause<'a> {
        let start = self.token_pos();
        self.next_token();
        let identifier = self.parse_identifier();
        self.eat_token(SyntaxKind::EqualsToken);
        let expression = self.parse_expression();
        LetClause {
            data: self.node(SyntaxKind::LetClause, start),
            identifier,
            expression: self.alloc(expression),
        }
    }

    fn parse_orderby_clause(&mut self) -> OrderByClause<'a> {
        let start = self.token_pos();
        self.next_token();
        let mut orderings = Vec::new();
        loop {
            let ordering_start = self.token_pos();
            let expression = self.parse_expression();
            let descending = match self.current_contextual() {
                Some("ascending") => {
                    self.next_token();
                    false
                }
                Some("descending") => {
                    self.next_token();
                    true
                }
                _ => false,
            };
            orderings.push(Ordering {
                data: self.node(SyntaxKind::Ordering, ordering_start),
                expression: self.alloc(expression),
                descending,
            });
            if self.optional_token(SyntaxKind::CommaToken).is_none() {
                break;
            }
        }
        OrderByClause {
            data: self.node(SyntaxKind::OrderByClause, start),
            orderings: self.alloc_list(orderings),
        }
    }

    fn parse_select_or_group_clause(&mut self) -> SelectOrGroupClause<'a> {
        let start = self.token_pos();
        match self.current_contextual() {
            Some("select") => {
                self.next_token();
                let expression = self.parse_expression();
                SelectOrGroupClause::Select(SelectClause {
                    data: self.node(SyntaxKind::SelectClause, start),
                    expression: self.alloc(expression),
                })
            }
            Some("group") => {
                self.next_token();
                let group_expression = self.parse_expression();
                self.eat_contextual("by");
                let by_expression = self.parse_expression();
                SelectOrGroupClause::Group(GroupClause {
                    data: self.node(SyntaxKind::GroupClause, start),
                    group_expression: self.alloc(group_expression),
                    by_expression: self.alloc(by_expression),
                })
            }
            _ => {
                let span = self.current().span();
                self.report(&messages::QUERY_BODY_MUST_END_WITH_SELECT_OR_GROUP, span, &[]);
                SelectOrGroupClause::Missing(MissingNode::new(SyntaxKind::SelectClause, self.prev_end))
            }
        }
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn parse_type(&mut self) -> &'a TypeSyntax<'a> {
        self.parse_type_core(true)
    }

    /// Parse a type. Without `allow_rank_specifiers`, `[` is left for an
    /// array creation expression.
    fn parse_type_core(&mut self, allow_rank_specifiers: bool) -> &'a TypeSyntax<'a> {
        if !self.enter() {
            return self.alloc(TypeSyntax::Missing(MissingNode::new(
                SyntaxKind::IdentifierName,
                self.prev_end,
            )));
        }
        let ty = self.parse_type_worker(allow_rank_specifiers);
        self.leave(1);
        ty
    }

    fn parse_type_worker(&mut self, allow_rank_specifiers: bool) -> &'a TypeSyntax<'a> {
        let token = self.current();
        let start = token.pos;
        let mut ty = if token.kind.is_predefined_type() {
            self.next_token();
            self.alloc(TypeSyntax::Predefined(PredefinedType {
                data: NodeData::new(SyntaxKind::PredefinedType, token.pos, token.end),
                keyword: token.kind,
            }))
        } else if token.kind == SyntaxKind::IdentifierToken {
            self.parse_name()
        } else {
            let span = self.expected_token_span();
            self.report(&messages::TYPE_EXPECTED, span, &[]);
            return self.alloc(TypeSyntax::Missing(MissingNode::new(
                SyntaxKind::IdentifierName,
                self.prev_end,
            )));
        };

        if self.optional_token(SyntaxKind::QuestionToken).is_some() {
            ty = self.alloc(TypeSyntax::Nullable(NullableType {
                data: self.node(SyntaxKind::NullableType, start),
                element: ty,
            }));
        }
        if allow_rank_specifiers {
            ty = self.parse_rank_specifiers(start, ty);
        }
        ty
    }

    /// Trailing `[]`, `[,]` specifiers. Each one wraps the type so far.
    fn parse_rank_specifiers(&mut self, start: u32, mut ty: &'a TypeSyntax<'a>) -> &'a TypeSyntax<'a> {
        while self.current_kind() == SyntaxKind::OpenBracketToken
            && matches!(
                self.peek(1).kind,
                SyntaxKind::CloseBracketToken | SyntaxKind::CommaToken
            )
        {
            self.next_token();
            let mut rank = 1;
            while self.optional_token(SyntaxKind::CommaToken).is_some() {
                rank += 1;
            }
            self.eat_token(SyntaxKind::CloseBracketToken);
            ty = self.alloc(TypeSyntax::Array(ArrayType {
                data: self.node(SyntaxKind::ArrayType, start),
                element: ty,
                rank,
            }));
        }
        ty
    }

    /// A simple, generic or dotted name.
    fn parse_name(&mut self) -> &'a TypeSyntax<'a> {
        let start = self.token_pos();
        let mut name = self.parse_simple_name();
        while matches!(
            self.current_kind(),
            SyntaxKind::DotToken | SyntaxKind::ColonColonToken
        ) && self.peek(1).kind == SyntaxKind::IdentifierToken
        {
            self.next_token();
            let right = self.parse_simple_name();
            name = self.alloc(TypeSyntax::Qualified(QualifiedName {
                data: self.node(SyntaxKind::QualifiedName, start),
                left: name,
                right,
            }));
        }
        name
    }

    fn parse_simple_name(&mut self) -> &'a TypeSyntax<'a> {
        let start = self.token_pos();
        let identifier = self.parse_identifier();
        if self.current_kind() != SyntaxKind::LessThanToken
            || self.scan_type_argument_list(self.index, 0).is_none()
        {
            return self.alloc(TypeSyntax::Name(identifier));
        }
        self.next_token();
        let mut arguments = Vec::new();
        loop {
            arguments.push(self.parse_type());
            if self.optional_token(SyntaxKind::CommaToken).is_none() {
                break;
            }
        }
        self.eat_token(SyntaxKind::GreaterThanToken);
        self.alloc(TypeSyntax::Generic(GenericName {
            data: self.node(SyntaxKind::GenericName, start),
            identifier,
            arguments: self.alloc_list(arguments),
        }))
    }

    // ========================================================================
    // Lookahead
    // ========================================================================

    /// Scan a type starting at token `start` without consuming anything.
    fn scan_type(&self, start: usize, depth: u32) -> Option<TypeScan> {
        if depth > self.options.max_depth {
            return None;
        }
        let first = self.token(start).kind;
        let is_predefined = first.is_predefined_type();
        let mut end = if is_predefined {
            start + 1
        } else if first == SyntaxKind::IdentifierToken {
            let mut end = self.scan_simple_name(start + 1, depth);
            while matches!(
                self.token(end).kind,
                SyntaxKind::DotToken | SyntaxKind::ColonColonToken
            ) && self.token(end + 1).kind == SyntaxKind::IdentifierToken
            {
                end = self.scan_simple_name(end + 2, depth);
            }
            end
        } else {
            return None;
        };

        let mut ends_with_nullable = false;
        if self.token(end).kind == SyntaxKind::QuestionToken {
            end += 1;
            ends_with_nullable = true;
        }
        while self.token(end).kind == SyntaxKind::OpenBracketToken {
            let mut close = end + 1;
            while self.token(close).kind == SyntaxKind::CommaToken {
                close += 1;
            }
            if self.token(close).kind != SyntaxKind::CloseBracketToken {
                break;
            }
            end = close + 1;
            ends_with_nullable = false;
        }
        Some(TypeScan {
            end,
            is_predefined,
            ends_with_nullable,
        })
    }

    /// `after_identifier` is the index just past a name's identifier.
    fn scan_simple_name(&self, after_identifier: usize, depth: u32) -> usize {
        if self.token(after_identifier).kind == SyntaxKind::LessThanToken {
            if let Some(end) = self.scan_type_argument_list(after_identifier, depth + 1) {
                return end;
            }
        }
        after_identifier
    }

    /// Scan `<T, U>` starting at the `<`. Returns the index past the `>`.
    fn scan_type_argument_list(&self, open: usize, depth: u32) -> Option<usize> {
        let mut index = open + 1;
        loop {
            let scan = self.scan_type(index, depth)?;
            index = scan.end;
            match self.token(index).kind {
                SyntaxKind::CommaToken => index += 1,
                SyntaxKind::GreaterThanToken => return Some(index + 1),
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsharp_scanner::scan_tokens;

    fn with_parser<R>(source: &str, f: impl FnOnce(&mut Parser<'_, '_>) -> R) -> (R, Vec<u32>) {
        let arena = Bump::new();
        let interner = StringInterner::new();
        let mut bag = DiagnosticBag::new();
        let tokens = scan_tokens(source, &mut bag);
        let result = {
            let mut parser = Parser::new(&arena, &interner, &tokens, &mut bag);
            f(&mut parser)
        };
        (result, bag.iter().map(|d| d.code()).collect())
    }

    #[test]
    fn test_declaration_lookahead() {
        let (is_decl, _) = with_parser("int x = 1;", |p| p.is_local_declaration_start());
        assert!(is_decl);
        let (is_decl, _) = with_parser("x = 1;", |p| p.is_local_declaration_start());
        assert!(!is_decl);
        let (is_decl, _) = with_parser("List<int> xs;", |p| p.is_local_declaration_start());
        assert!(is_decl);
        let (is_decl, _) = with_parser("a ? b : c;", |p| p.is_local_declaration_start());
        assert!(!is_decl);
        let (is_decl, _) = with_parser("int? n = null;", |p| p.is_local_declaration_start());
        assert!(is_decl);
        let (is_decl, _) = with_parser("from x in xs select x;", |p| p.is_local_declaration_start());
        assert!(!is_decl);
    }

    #[test]
    fn test_cast_lookahead() {
        let (is_cast, _) = with_parser("(int)x", |p| p.is_cast_expression());
        assert!(is_cast);
        let (is_cast, _) = with_parser("(a) + b", |p| p.is_cast_expression());
        assert!(!is_cast);
        let (is_cast, _) = with_parser("(Foo)bar", |p| p.is_cast_expression());
        assert!(is_cast);
    }

    #[test]
    fn test_shift_is_composed() {
        let (kind, codes) = with_parser("a >> 2", |p| p.parse_expression().kind());
        assert_eq!(kind, SyntaxKind::BinaryExpression);
        assert!(codes.is_empty());
    }

    #[test]
    fn test_precedence_shapes_tree() {
        let (is_add_at_root, _) = with_parser("1 + 2 * 3", |p| {
            matches!(p.parse_expression(), Expression::Binary(b) if b.operator.kind() == SyntaxKind::PlusToken)
        });
        assert!(is_add_at_root);
    }
}

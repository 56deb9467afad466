//! Binder: resolves names and types over a parsed compilation unit.
//!
//! Binding runs in three passes over the members:
//! 1. declare the source classes and structs so type names resolve,
//! 2. record their fields, method return types and conversion operators,
//! 3. bind every body: scopes, labels, loop nesting and expression types.
//!
//! Semantic errors go to the diagnostic bag as they are found. Expressions
//! that cannot be typed get the error type, which reports nothing further.

use indexmap::IndexMap;
use rsharp_ast::node::*;
use rsharp_ast::syntax_kind::SyntaxKind;
use rsharp_ast::types::TokenFlags;
use rsharp_core::cancel::{CancellationToken, Cancelled};
use rsharp_diagnostics::{messages, DiagnosticBag};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::condition::{bind_condition, check_implicit_conversion};
use crate::conversions::{ConversionClassifier, ConversionKind, UserDefinedConversion};
use crate::scope::{Label, Local, Scope};
use crate::types::{SpecialType, TypeId, TypeKind, TypeTable, WellKnownGeneric};

/// What binding leaves behind for the flow pass and for tests.
#[derive(Debug)]
pub struct BoundUnit {
    pub types: TypeTable,
    referenced_labels: FxHashSet<u32>,
}

impl BoundUnit {
    /// Whether some `goto` resolved to the label whose identifier starts at `pos`.
    pub fn is_label_referenced(&self, pos: u32) -> bool {
        self.referenced_labels.contains(&pos)
    }
}

/// What the left side of a member access names.
#[derive(Debug, Clone, Copy)]
enum Receiver {
    Value(TypeId),
    Type(TypeId),
    /// A namespace or library type the binder does not model.
    Unknown,
}

/// The binder walks the AST and reports semantic diagnostics.
pub struct Binder<'i, 'd> {
    diagnostics: &'d mut DiagnosticBag,
    cancellation: Option<&'i CancellationToken>,
    types: TypeTable,
    /// Source types by qualified and by simple name. First declaration wins.
    type_names: IndexMap<String, TypeId>,
    referenced_labels: FxHashSet<u32>,
    /// Current scope chain (innermost first).
    scope: Option<Box<Scope>>,
    /// The scope shared by all top-level statements.
    global_scope: Option<Box<Scope>>,
    loop_depth: u32,
    current_type: Option<TypeId>,
    return_type: Option<TypeId>,
}

impl<'i, 'd> Binder<'i, 'd> {
    pub fn new(diagnostics: &'d mut DiagnosticBag) -> Self {
        Self {
            diagnostics,
            cancellation: None,
            types: TypeTable::new(),
            type_names: IndexMap::new(),
            referenced_labels: FxHashSet::default(),
            scope: None,
            global_scope: None,
            loop_depth: 0,
            current_type: None,
            return_type: None,
        }
    }

    pub fn with_cancellation(mut self, token: &'i CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Bind a whole compilation unit. Cancellation is checked before each member.
    pub fn bind_compilation_unit(&mut self, unit: &CompilationUnit<'_>) -> Result<(), Cancelled> {
        self.declare_types(unit.members, "");
        self.declare_members(unit.members, "");

        let mut globals = Scope::new(None);
        for member in unit.members {
            if let Member::GlobalStatement(statement) = member {
                self.declare_label_chain(&mut globals, statement);
            }
        }
        self.global_scope = Some(Box::new(globals));

        self.bind_members(unit.members, "")?;
        debug!(types = self.types.len(), "bound compilation unit");
        Ok(())
    }

    pub fn finish(self) -> BoundUnit {
        BoundUnit {
            types: self.types,
            referenced_labels: self.referenced_labels,
        }
    }

    fn check_cancelled(&self) -> Result<(), Cancelled> {
        match self.cancellation {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn declare_types(&mut self, members: &[Member<'_>], container: &str) {
        for member in members {
            match member {
                Member::Namespace(namespace) => {
                    let name = qualify(container, &dotted_name(namespace.name));
                    self.declare_types(namespace.members, &name);
                }
                Member::Type(declaration) => self.declare_type(declaration, container),
                Member::GlobalStatement(_) | Member::Incomplete(_) => {}
            }
        }
    }

    fn declare_type(&mut self, declaration: &TypeDeclaration<'_>, container: &str) {
        if declaration.identifier.is_missing() {
            return;
        }
        let qualified = qualify(container, declaration.identifier.text);
        let is_struct = declaration.data.kind == SyntaxKind::StructDeclaration;
        let id = self.types.named(&qualified, is_struct);
        self.type_names.entry(qualified.clone()).or_insert(id);
        self.type_names.entry(declaration.identifier.text.to_string()).or_insert(id);

        for member in declaration.members {
            if let ClassMember::NestedType(nested) = member {
                self.declare_type(nested, &qualified);
            }
        }
    }

    fn declare_members(&mut self, members: &[Member<'_>], container: &str) {
        for member in members {
            match member {
                Member::Namespace(namespace) => {
                    let name = qualify(container, &dotted_name(namespace.name));
                    self.declare_members(namespace.members, &name);
                }
                Member::Type(declaration) => self.declare_type_members(declaration, container),
                Member::GlobalStatement(_) | Member::Incomplete(_) => {}
            }
        }
    }

    fn declare_type_members(&mut self, declaration: &TypeDeclaration<'_>, container: &str) {
        if declaration.identifier.is_missing() {
            return;
        }
        let qualified = qualify(container, declaration.identifier.text);
        let Some(&owner) = self.type_names.get(&qualified) else {
            return;
        };

        for member in declaration.members {
            match member {
                ClassMember::Field(field) => {
                    let ty = self.resolve_type(field.declaration.ty);
                    for declarator in field.declaration.declarators {
                        if !declarator.identifier.is_missing() {
                            self.types.add_field(owner, declarator.identifier.text, ty);
                        }
                    }
                }
                ClassMember::Method(method) => {
                    if let Some(return_type) = method.return_type {
                        let ty = self.resolve_type(return_type);
                        if !method.identifier.is_missing() {
                            self.types.add_method(owner, method.identifier.text, ty);
                        }
                    }
                }
                ClassMember::ConversionOperator(operator) => {
                    let target = self.resolve_type(operator.ty);
                    let source = match operator.parameters.first() {
                        Some(parameter) => self.resolve_type(parameter.ty),
                        None => self.types.error_type,
                    };
                    if !self.types.is_error(source) && !self.types.is_error(target) {
                        self.types.add_user_conversion(UserDefinedConversion {
                            source,
                            target,
                            is_implicit: operator.is_implicit(),
                        });
                    }
                }
                ClassMember::NestedType(nested) => self.declare_type_members(nested, &qualified),
                ClassMember::Incomplete(_) => {}
            }
        }
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn bind_members(&mut self, members: &[Member<'_>], container: &str) -> Result<(), Cancelled> {
        for member in members {
            self.check_cancelled()?;
            match member {
                Member::Namespace(namespace) => {
                    let name = qualify(container, &dotted_name(namespace.name));
                    self.bind_members(namespace.members, &name)?;
                }
                Member::Type(declaration) => self.bind_type_declaration(declaration, container)?,
                Member::GlobalStatement(statement) => {
                    self.scope = self.global_scope.take();
                    self.loop_depth = 0;
                    self.return_type = None;
                    self.bind_statement(statement);
                    self.global_scope = self.scope.take();
                }
                Member::Incomplete(_) => {}
            }
        }
        Ok(())
    }

    fn bind_type_declaration(&mut self, declaration: &TypeDeclaration<'_>, container: &str) -> Result<(), Cancelled> {
        if declaration.identifier.is_missing() {
            return Ok(());
        }
        let qualified = qualify(container, declaration.identifier.text);
        let owner = self.type_names.get(&qualified).copied();
        let saved = std::mem::replace(&mut self.current_type, owner);

        for member in declaration.members {
            self.check_cancelled()?;
            match member {
                ClassMember::Field(field) => self.bind_field(field),
                ClassMember::Method(method) => {
                    let return_type = method.return_type.map(|ty| self.resolve_type(ty));
                    self.bind_body(return_type, method.parameters, method.body);
                }
                ClassMember::ConversionOperator(operator) => {
                    let return_type = self.resolve_type(operator.ty);
                    self.bind_body(Some(return_type), operator.parameters, operator.body);
                }
                ClassMember::NestedType(nested) => self.bind_type_declaration(nested, &qualified)?,
                ClassMember::Incomplete(_) => {}
            }
        }

        self.current_type = saved;
        Ok(())
    }

    fn bind_field(&mut self, field: &FieldDeclaration<'_>) {
        let ty = self.resolve_type(field.declaration.ty);
        self.scope = Some(Box::new(Scope::new(None)));
        for declarator in field.declaration.declarators {
            if let Some(initializer) = declarator.initializer {
                self.bind_initializer(initializer, ty);
            }
        }
        self.scope = None;
    }

    fn bind_body(&mut self, return_type: Option<TypeId>, parameters: &[Parameter<'_>], body: Option<&Block<'_>>) {
        self.scope = Some(Box::new(Scope::new(None)));
        self.loop_depth = 0;
        self.return_type = return_type;

        for parameter in parameters {
            let ty = self.resolve_type(parameter.ty);
            self.declare_local(&parameter.identifier, ty);
        }
        if let Some(body) = body {
            self.bind_block(body);
        }

        self.scope = None;
        self.return_type = None;
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    fn push_scope(&mut self) {
        let parent = self.scope.take();
        self.scope = Some(Box::new(Scope::new(parent)));
    }

    fn pop_scope(&mut self) {
        if let Some(scope) = self.scope.take() {
            self.scope = scope.parent;
        }
    }

    /// Declare a local in the innermost scope, reporting CS0128 on a clash.
    fn declare_local(&mut self, identifier: &Identifier<'_>, ty: TypeId) {
        if identifier.is_missing() {
            return;
        }
        let local = Local { ty, span: identifier.span() };
        let declared = match self.scope.as_mut() {
            Some(scope) => scope.declare_local(identifier.name, local),
            None => true,
        };
        if !declared {
            self.diagnostics
                .report(&messages::LOCAL_0_ALREADY_DEFINED_IN_SCOPE, identifier.span(), &[identifier.text]);
        }
    }

    /// Range variables shadow quietly; clashes among them are not diagnosed.
    fn declare_range_variable(&mut self, identifier: &Identifier<'_>, ty: TypeId) {
        if identifier.is_missing() {
            return;
        }
        if let Some(scope) = self.scope.as_mut() {
            scope.locals.insert(identifier.name, Local { ty, span: identifier.span() });
        }
    }

    fn lookup_local(&self, identifier: &Identifier<'_>) -> Option<Local> {
        self.scope.as_ref().and_then(|scope| scope.lookup_local(identifier.name))
    }

    /// Declare the labels of `statement` (`a: b: stmt` declares both) in `scope`.
    fn declare_label_chain(&mut self, scope: &mut Scope, statement: &Statement<'_>) {
        let mut current = statement;
        while let Statement::Labeled(labeled) = current {
            let label = &labeled.label;
            if !label.is_missing() && !scope.declare_label(label.name, Label { pos: label.data.range.pos }) {
                self.diagnostics
                    .report(&messages::LABEL_0_IS_A_DUPLICATE, label.span(), &[label.text]);
            }
            current = labeled.statement;
        }
    }

    fn declare_labels_in_current_scope(&mut self, statements: &[Statement<'_>]) {
        let Some(mut scope) = self.scope.take() else {
            return;
        };
        for statement in statements {
            self.declare_label_chain(&mut scope, statement);
        }
        self.scope = Some(scope);
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn bind_block(&mut self, block: &Block<'_>) {
        self.push_scope();
        self.declare_labels_in_current_scope(block.statements);
        for statement in block.statements {
            self.bind_statement(statement);
        }
        self.pop_scope();
    }

    /// The body of an `if`, loop or `else`. A non-block body gets its own scope.
    fn bind_embedded_statement(&mut self, statement: &Statement<'_>) {
        if let Statement::Block(block) = statement {
            self.bind_block(block);
            return;
        }
        self.push_scope();
        self.declare_labels_in_current_scope(std::slice::from_ref(statement));
        self.bind_statement(statement);
        self.pop_scope();
    }

    fn bind_loop_body(&mut self, statement: &Statement<'_>) {
        self.loop_depth += 1;
        self.bind_embedded_statement(statement);
        self.loop_depth -= 1;
    }

    fn bind_statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::Block(block) => self.bind_block(block),
            Statement::Empty(_) => {}
            Statement::LocalDeclaration(declaration) => self.bind_variable_declaration(&declaration.declaration),
            Statement::Expression(statement) => {
                self.bind_expression(statement.expression);
            }
            Statement::If(statement) => {
                self.bind_condition_expression(statement.condition);
                self.bind_embedded_statement(statement.statement);
                if let Some(else_statement) = statement.else_statement {
                    self.bind_embedded_statement(else_statement);
                }
            }
            Statement::While(statement) => {
                self.bind_condition_expression(statement.condition);
                self.bind_loop_body(statement.statement);
            }
            Statement::Do(statement) => {
                self.bind_loop_body(statement.statement);
                self.bind_condition_expression(statement.condition);
            }
            Statement::For(statement) => self.bind_for(statement),
            Statement::Return(statement) => self.bind_return(statement),
            Statement::Break(jump) | Statement::Continue(jump) => {
                if self.loop_depth == 0 {
                    self.diagnostics.report(&messages::NO_ENCLOSING_LOOP, jump.data.span(), &[]);
                }
            }
            Statement::Goto(statement) => self.bind_goto(statement),
            Statement::Labeled(statement) => self.bind_statement(statement.statement),
        }
    }

    /// Initializer, condition and incrementors share one scope that encloses
    /// the body.
    fn bind_for(&mut self, statement: &ForStatement<'_>) {
        self.push_scope();
        match &statement.initializer {
            Some(ForInitializer::Declaration(declaration)) => self.bind_variable_declaration(declaration),
            Some(ForInitializer::Expressions(expressions)) => {
                for expression in expressions.iter() {
                    self.bind_expression(expression);
                }
            }
            None => {}
        }
        if let Some(condition) = statement.condition {
            self.bind_condition_expression(condition);
        }
        for incrementor in statement.incrementors {
            self.bind_expression(incrementor);
        }
        self.bind_loop_body(statement.statement);
        self.pop_scope();
    }

    fn bind_condition_expression(&mut self, condition: &Expression<'_>) {
        let ty = self.bind_expression(condition);
        bind_condition(Some(condition), ty, &self.types, self.diagnostics);
    }

    fn bind_return(&mut self, statement: &ReturnStatement<'_>) {
        let Some(expression) = statement.expression else {
            return;
        };
        let ty = self.bind_expression(expression);
        if let Some(return_type) = self.return_type {
            if return_type != self.types.void_type {
                self.check_assignable(expression, ty, return_type);
            }
        }
    }

    fn bind_goto(&mut self, statement: &GotoStatement<'_>) {
        let label = &statement.label;
        if label.is_missing() {
            return;
        }
        match self.scope.as_ref().and_then(|scope| scope.lookup_label(label.name)) {
            Some(target) => {
                self.referenced_labels.insert(target.pos);
            }
            None => {
                self.diagnostics
                    .report(&messages::NO_SUCH_LABEL_0_WITHIN_SCOPE_OF_GOTO, label.span(), &[label.text]);
            }
        }
    }

    fn bind_variable_declaration(&mut self, declaration: &VariableDeclaration<'_>) {
        let declared = if declaration.ty.is_var() {
            None
        } else {
            Some(self.resolve_type(declaration.ty))
        };

        for declarator in declaration.declarators {
            let ty = match (declared, declarator.initializer) {
                (Some(ty), Some(initializer)) => {
                    self.bind_initializer(initializer, ty);
                    ty
                }
                (Some(ty), None) => ty,
                (None, Some(initializer)) => {
                    let ty = self.bind_expression(initializer);
                    if ty == self.types.null_type || ty == self.types.void_type {
                        self.types.error_type
                    } else {
                        ty
                    }
                }
                (None, None) => self.types.error_type,
            };
            self.declare_local(&declarator.identifier, ty);
        }
    }

    /// Bind the value assigned to a variable of type `target`.
    fn bind_initializer(&mut self, initializer: &Expression<'_>, target: TypeId) {
        if let Expression::Initializer(list) = initializer {
            match self.types.kind(target).clone() {
                TypeKind::Array { element, rank } => self.bind_array_initializer(list, element, rank),
                _ => {
                    for expression in list.expressions {
                        self.bind_expression(expression);
                    }
                }
            }
            return;
        }
        let ty = self.bind_expression(initializer);
        self.check_assignable(initializer, ty, target);
    }

    fn bind_array_initializer(&mut self, list: &InitializerExpression<'_>, element: TypeId, rank: u32) {
        for expression in list.expressions {
            match expression {
                Expression::Initializer(nested) if rank > 1 => {
                    self.bind_array_initializer(nested, element, rank - 1);
                }
                _ => self.bind_initializer(expression, element),
            }
        }
    }

    /// CS0029 or CS0266 unless `expression` converts implicitly to `target`.
    /// Integer constants that fit a narrower integral type convert implicitly.
    fn check_assignable(&mut self, expression: &Expression<'_>, source: TypeId, target: TypeId) {
        if self.is_constant_conversion(expression, source, target) {
            return;
        }
        check_implicit_conversion(expression.span(), source, target, &self.types, self.diagnostics);
    }

    fn is_constant_conversion(&self, expression: &Expression<'_>, source: TypeId, target: TypeId) -> bool {
        if source != self.types.int_type {
            return false;
        }
        let target = self.types.nullable_underlying(target).unwrap_or(target);
        let Some(special) = self.types.special_of(target) else {
            return false;
        };
        let Some(value) = constant_integer(expression) else {
            return false;
        };
        let (min, max): (i128, i128) = match special {
            SpecialType::SByte => (i8::MIN.into(), i8::MAX.into()),
            SpecialType::Byte => (0, u8::MAX.into()),
            SpecialType::Short => (i16::MIN.into(), i16::MAX.into()),
            SpecialType::UShort => (0, u16::MAX.into()),
            SpecialType::UInt => (0, u32::MAX.into()),
            SpecialType::ULong => (0, u64::MAX.into()),
            _ => return false,
        };
        (min..=max).contains(&value)
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn resolve_type(&mut self, ty: &TypeSyntax<'_>) -> TypeId {
        match ty {
            TypeSyntax::Predefined(predefined) => match SpecialType::from_keyword(predefined.keyword) {
                Some(special) => self.types.special(special),
                None => self.types.error_type,
            },
            TypeSyntax::Name(name) => self.type_names.get(name.text).copied().unwrap_or(self.types.error_type),
            TypeSyntax::Qualified(qualified) => {
                if let TypeSyntax::Generic(generic) = qualified.right {
                    return self.resolve_generic(generic);
                }
                let full = dotted_name(ty);
                if let Some(&id) = self.type_names.get(&full) {
                    return id;
                }
                self.resolve_type(qualified.right)
            }
            TypeSyntax::Generic(generic) => self.resolve_generic(generic),
            TypeSyntax::Nullable(nullable) => {
                let element = self.resolve_type(nullable.element);
                self.types.nullable(element)
            }
            TypeSyntax::Array(array) => {
                let element = self.resolve_type(array.element);
                self.types.array(element, array.rank)
            }
            TypeSyntax::Missing(_) => self.types.error_type,
        }
    }

    fn resolve_generic(&mut self, generic: &GenericName<'_>) -> TypeId {
        let mut arguments = Vec::with_capacity(generic.arguments.len());
        for argument in generic.arguments {
            let ty = self.resolve_type(argument);
            if self.types.is_error(ty) {
                return ty;
            }
            arguments.push(ty);
        }
        match WellKnownGeneric::from_name(generic.identifier.text, arguments.len()) {
            Some(definition) => self.types.generic(definition, arguments),
            None => self.types.error_type,
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn bind_expression(&mut self, expression: &Expression<'_>) -> TypeId {
        match expression {
            Expression::Identifier(identifier) => self.bind_identifier(identifier),
            Expression::Literal(literal) => self.literal_type(literal),
            Expression::This(_) => self.current_type.unwrap_or(self.types.error_type),
            Expression::PredefinedType(_) => self.types.error_type,
            Expression::Parenthesized(parenthesized) => self.bind_expression(parenthesized.expression),
            Expression::Binary(binary) => self.bind_binary(binary),
            Expression::Assignment(assignment) => {
                let left = self.bind_expression(assignment.left);
                let right = self.bind_expression(assignment.right);
                if assignment.operator.kind() == SyntaxKind::EqualsToken {
                    self.check_assignable(assignment.right, right, left);
                }
                left
            }
            Expression::Conditional(conditional) => self.bind_conditional(conditional),
            Expression::PrefixUnary(unary) => {
                let operand = self.bind_expression(unary.operand);
                self.unary_result(unary.operator.kind(), operand)
            }
            Expression::PostfixUnary(unary) => self.bind_expression(unary.operand),
            Expression::Cast(cast) => self.bind_cast(cast),
            Expression::TypeTest(test) => {
                self.bind_expression(test.expression);
                let ty = self.resolve_type(test.ty);
                if test.data.kind == SyntaxKind::IsExpression {
                    self.types.bool_type
                } else {
                    ty
                }
            }
            Expression::MemberAccess(access) => {
                let receiver = self.bind_receiver(access.expression);
                let ty = self.member_type(receiver, access.name.text, false);
                self.lift_conditional_access(access, ty)
            }
            Expression::Invocation(invocation) => self.bind_invocation(invocation),
            Expression::ElementAccess(access) => {
                let receiver = self.bind_expression(access.expression);
                for argument in access.arguments {
                    self.bind_expression(argument);
                }
                self.element_access_type(receiver)
            }
            Expression::ObjectCreation(creation) => self.bind_object_creation(creation),
            Expression::ArrayCreation(creation) => {
                let ty = self.resolve_type(creation.ty);
                for size in creation.sizes {
                    self.bind_expression(size);
                }
                if let Some(initializer) = creation.initializer {
                    if let TypeKind::Array { element, rank } = self.types.kind(ty).clone() {
                        self.bind_array_initializer(initializer, element, rank);
                    }
                }
                ty
            }
            Expression::ImplicitArrayCreation(creation) => self.bind_implicit_array(creation.initializer),
            Expression::Initializer(list) => {
                for expression in list.expressions {
                    self.bind_expression(expression);
                }
                self.types.error_type
            }
            Expression::Await(await_expression) => {
                self.bind_expression(await_expression.expression);
                self.types.error_type
            }
            Expression::Query(query) => self.bind_query(query),
            Expression::Missing(_) => self.types.error_type,
        }
    }

    fn bind_identifier(&mut self, identifier: &Identifier<'_>) -> TypeId {
        if identifier.is_missing() {
            return self.types.error_type;
        }
        if let Some(local) = self.lookup_local(identifier) {
            return local.ty;
        }
        self.current_type
            .and_then(|owner| self.types.field(owner, identifier.text))
            .unwrap_or(self.types.error_type)
    }

    fn literal_type(&self, literal: &LiteralExpression<'_>) -> TypeId {
        match literal.data.kind {
            SyntaxKind::TrueLiteralExpression | SyntaxKind::FalseLiteralExpression => self.types.bool_type,
            SyntaxKind::StringLiteralExpression => self.types.string_type,
            SyntaxKind::CharacterLiteralExpression => self.types.char_type,
            SyntaxKind::NullLiteralExpression => self.types.null_type,
            SyntaxKind::NumericLiteralExpression => {
                let special = numeric_literal_type(literal.text, literal.token_flags);
                self.types.special(special)
            }
            _ => self.types.error_type,
        }
    }

    fn bind_binary(&mut self, binary: &BinaryExpression<'_>) -> TypeId {
        let left = self.bind_expression(binary.left);
        let right = self.bind_expression(binary.right);
        match binary.operator.kind() {
            SyntaxKind::AmpersandAmpersandToken
            | SyntaxKind::BarBarToken
            | SyntaxKind::EqualsEqualsToken
            | SyntaxKind::ExclamationEqualsToken
            | SyntaxKind::LessThanToken
            | SyntaxKind::GreaterThanToken
            | SyntaxKind::LessThanEqualsToken
            | SyntaxKind::GreaterThanEqualsToken => self.types.bool_type,
            SyntaxKind::QuestionQuestionToken => self.coalesce_result(left, right),
            SyntaxKind::PlusToken
                if left == self.types.string_type || right == self.types.string_type =>
            {
                self.types.string_type
            }
            SyntaxKind::AmpersandToken | SyntaxKind::BarToken | SyntaxKind::CaretToken
                if self.is_boolean_like(left) && self.is_boolean_like(right) =>
            {
                if left == self.types.bool_type && right == self.types.bool_type {
                    self.types.bool_type
                } else {
                    self.types.nullable(self.types.bool_type)
                }
            }
            SyntaxKind::PlusToken
            | SyntaxKind::MinusToken
            | SyntaxKind::AsteriskToken
            | SyntaxKind::SlashToken
            | SyntaxKind::PercentToken
            | SyntaxKind::AmpersandToken
            | SyntaxKind::BarToken
            | SyntaxKind::CaretToken => self.arithmetic_result(left, right),
            SyntaxKind::LessThanLessThanToken | SyntaxKind::GreaterThanGreaterThanToken => {
                self.arithmetic_result(left, left)
            }
            _ => self.types.error_type,
        }
    }

    fn is_boolean_like(&self, ty: TypeId) -> bool {
        let underlying = self.types.nullable_underlying(ty).unwrap_or(ty);
        underlying == self.types.bool_type
    }

    /// Binary numeric promotion, lifted over nullable operands.
    fn arithmetic_result(&mut self, left: TypeId, right: TypeId) -> TypeId {
        let (l, left_nullable) = self.strip_nullable(left);
        let (r, right_nullable) = self.strip_nullable(right);
        let promoted = match (self.types.special_of(l), self.types.special_of(r)) {
            (Some(a), Some(b)) => promote(a, b),
            _ => None,
        };
        match promoted {
            Some(special) => {
                let ty = self.types.special(special);
                if left_nullable || right_nullable {
                    self.types.nullable(ty)
                } else {
                    ty
                }
            }
            None => self.types.error_type,
        }
    }

    fn strip_nullable(&self, ty: TypeId) -> (TypeId, bool) {
        match self.types.nullable_underlying(ty) {
            Some(underlying) => (underlying, true),
            None => (ty, false),
        }
    }

    fn unary_result(&mut self, operator: SyntaxKind, operand: TypeId) -> TypeId {
        match operator {
            SyntaxKind::ExclamationToken if self.is_boolean_like(operand) => operand,
            SyntaxKind::ExclamationToken => self.types.error_type,
            SyntaxKind::PlusPlusToken | SyntaxKind::MinusMinusToken => operand,
            SyntaxKind::MinusToken if self.types.special_of(operand) == Some(SpecialType::UInt) => {
                self.types.long_type
            }
            _ => self.arithmetic_result(operand, operand),
        }
    }

    fn coalesce_result(&mut self, left: TypeId, right: TypeId) -> TypeId {
        if self.types.is_error(left) || self.types.is_error(right) {
            return self.types.error_type;
        }
        match self.types.nullable_underlying(left) {
            Some(underlying) if self.types.nullable_underlying(right).is_none() => underlying,
            _ => left,
        }
    }

    fn bind_conditional(&mut self, conditional: &ConditionalExpression<'_>) -> TypeId {
        self.bind_condition_expression(conditional.condition);
        let when_true = self.bind_expression(conditional.when_true);
        let when_false = self.bind_expression(conditional.when_false);
        if when_true == when_false {
            return when_true;
        }
        if self.types.is_error(when_true) || self.types.is_error(when_false) {
            return self.types.error_type;
        }
        let to_false = self.types.classify_conversion(when_true, when_false).is_implicit();
        let to_true = self.types.classify_conversion(when_false, when_true).is_implicit();
        match (to_false, to_true) {
            (true, false) => when_false,
            (false, true) => when_true,
            _ => self.types.error_type,
        }
    }

    fn bind_cast(&mut self, cast: &CastExpression<'_>) -> TypeId {
        let target = self.resolve_type(cast.ty);
        let source = self.bind_expression(cast.expression);
        if !self.types.is_error(source)
            && !self.types.is_error(target)
            && self.types.classify_conversion(source, target) == ConversionKind::None
        {
            let source_name = self.types.display(source);
            let target_name = self.types.display(target);
            self.diagnostics
                .report(&messages::CANNOT_CONVERT_TYPE_0_TO_1, cast.data.span(), &[&source_name, &target_name]);
        }
        target
    }

    fn bind_receiver(&mut self, expression: &Expression<'_>) -> Receiver {
        match expression {
            Expression::Identifier(identifier) => {
                if identifier.is_missing() {
                    return Receiver::Unknown;
                }
                if let Some(local) = self.lookup_local(identifier) {
                    return Receiver::Value(local.ty);
                }
                if let Some(ty) = self.current_type.and_then(|owner| self.types.field(owner, identifier.text)) {
                    return Receiver::Value(ty);
                }
                match self.type_names.get(identifier.text) {
                    Some(&ty) => Receiver::Type(ty),
                    None => Receiver::Unknown,
                }
            }
            Expression::PredefinedType(predefined) => match SpecialType::from_keyword(predefined.keyword) {
                Some(special) => Receiver::Type(self.types.special(special)),
                None => Receiver::Unknown,
            },
            Expression::MemberAccess(access) => match self.bind_receiver(access.expression) {
                Receiver::Unknown => Receiver::Unknown,
                receiver => {
                    let ty = self.member_type(receiver, access.name.text, false);
                    Receiver::Value(self.lift_conditional_access(access, ty))
                }
            },
            _ => Receiver::Value(self.bind_expression(expression)),
        }
    }

    /// The type of `receiver.name`, or of `receiver.name(...)` when `invoked`.
    /// Source members come first, then a handful of library members.
    fn member_type(&mut self, receiver: Receiver, name: &str, invoked: bool) -> TypeId {
        let error = self.types.error_type;
        match receiver {
            Receiver::Unknown => error,
            Receiver::Type(ty) => {
                let member = if invoked { self.types.method(ty, name) } else { self.types.field(ty, name) };
                match member {
                    Some(member) => member,
                    None if invoked && name == "Parse" && self.types.special_of(ty).is_some() => ty,
                    None => error,
                }
            }
            Receiver::Value(ty) => {
                if self.types.is_error(ty) {
                    return error;
                }
                let member = if invoked { self.types.method(ty, name) } else { self.types.field(ty, name) };
                if let Some(member) = member {
                    return member;
                }
                if invoked {
                    self.library_method_type(ty, name)
                } else {
                    self.library_property_type(ty, name)
                }
            }
        }
    }

    fn library_method_type(&mut self, receiver: TypeId, name: &str) -> TypeId {
        let types = &mut self.types;
        let element = types.element_type(receiver);
        match name {
            "ToString" => types.string_type,
            "Equals" | "Contains" | "StartsWith" | "EndsWith" | "Any" | "All" => types.bool_type,
            "GetHashCode" | "CompareTo" | "IndexOf" => types.int_type,
            "ToUpper" | "ToLower" | "Trim" | "Substring" | "Replace" if receiver == types.string_type => {
                types.string_type
            }
            "Count" if element.is_some() => types.int_type,
            "First" | "Last" | "Single" | "FirstOrDefault" | "LastOrDefault" => {
                element.unwrap_or(types.error_type)
            }
            "ToList" => match element {
                Some(element) => types.generic(WellKnownGeneric::List, vec![element]),
                None => types.error_type,
            },
            "ToArray" => match element {
                Some(element) => types.array(element, 1),
                None => types.error_type,
            },
            _ => types.error_type,
        }
    }

    fn library_property_type(&self, receiver: TypeId, name: &str) -> TypeId {
        let is_list = matches!(
            self.types.kind(receiver),
            TypeKind::Generic { definition: WellKnownGeneric::List, .. }
        );
        let is_sized = receiver == self.types.string_type
            || matches!(self.types.kind(receiver), TypeKind::Array { .. });
        match name {
            "Length" if is_sized => self.types.int_type,
            "Count" if is_list => self.types.int_type,
            _ => self.types.error_type,
        }
    }

    /// `a?.b` has type `T?` when `b` is a non-nullable value type.
    fn lift_conditional_access(&mut self, access: &MemberAccessExpression<'_>, ty: TypeId) -> TypeId {
        if access.operator.kind() == SyntaxKind::QuestionDotToken {
            self.types.nullable(ty)
        } else {
            ty
        }
    }

    fn bind_invocation(&mut self, invocation: &InvocationExpression<'_>) -> TypeId {
        let ty = match invocation.expression {
            Expression::MemberAccess(access) => {
                let receiver = self.bind_receiver(access.expression);
                let ty = self.member_type(receiver, access.name.text, true);
                self.lift_conditional_access(access, ty)
            }
            Expression::Identifier(identifier) => self
                .current_type
                .and_then(|owner| self.types.method(owner, identifier.text))
                .unwrap_or(self.types.error_type),
            expression => {
                self.bind_expression(expression);
                self.types.error_type
            }
        };
        for argument in invocation.arguments {
            self.bind_expression(argument);
        }
        ty
    }

    fn element_access_type(&self, receiver: TypeId) -> TypeId {
        match self.types.kind(receiver) {
            TypeKind::Array { element, .. } => *element,
            TypeKind::Special(SpecialType::String) => self.types.char_type,
            TypeKind::Generic { definition: WellKnownGeneric::List, arguments } => {
                arguments.first().copied().unwrap_or(self.types.error_type)
            }
            _ => self.types.error_type,
        }
    }

    fn bind_object_creation(&mut self, creation: &ObjectCreationExpression<'_>) -> TypeId {
        let ty = self.resolve_type(creation.ty);
        for argument in creation.arguments.unwrap_or_default() {
            self.bind_expression(argument);
        }
        let Some(initializer) = creation.initializer else {
            return ty;
        };
        for expression in initializer.expressions {
            match expression {
                // Object initializer: the left side names a member of the new object.
                Expression::Assignment(assignment) => {
                    let target = match assignment.left {
                        Expression::Identifier(member) => self.types.field(ty, member.text),
                        _ => None,
                    };
                    let value = self.bind_expression(assignment.right);
                    if let Some(target) = target {
                        self.check_assignable(assignment.right, value, target);
                    }
                }
                _ => {
                    self.bind_expression(expression);
                }
            }
        }
        ty
    }

    /// `new[] { ... }`: the element type is the element type every other
    /// element converts to implicitly.
    fn bind_implicit_array(&mut self, initializer: &InitializerExpression<'_>) -> TypeId {
        let element_types: Vec<TypeId> = initializer
            .expressions
            .iter()
            .map(|expression| self.bind_expression(expression))
            .collect();
        let best = element_types.iter().copied().find(|&candidate| {
            candidate != self.types.null_type
                && element_types
                    .iter()
                    .all(|&other| self.types.classify_conversion(other, candidate).is_implicit())
        });
        match best {
            Some(element) => self.types.array(element, 1),
            None => self.types.error_type,
        }
    }

    // ========================================================================
    // Query expressions
    // ========================================================================

    /// A query is `IEnumerable<T>` of its final `select`, or of
    /// `IGrouping<K, E>` for `group e by k`.
    fn bind_query(&mut self, query: &QueryExpression<'_>) -> TypeId {
        let source = self.bind_expression(query.from_clause.expression);
        let element = self.range_variable_type(query.from_clause.ty, source);
        self.push_scope();
        self.declare_range_variable(&query.from_clause.identifier, element);
        let ty = self.bind_query_body(query.body);
        self.pop_scope();
        ty
    }

    fn range_variable_type(&mut self, explicit: Option<&TypeSyntax<'_>>, source: TypeId) -> TypeId {
        match explicit {
            Some(ty) => self.resolve_type(ty),
            None => self.types.element_type(source).unwrap_or(self.types.error_type),
        }
    }

    fn bind_query_body(&mut self, body: &QueryBody<'_>) -> TypeId {
        for clause in body.clauses {
            match clause {
                QueryClause::From(from) => {
                    let source = self.bind_expression(from.expression);
                    let element = self.range_variable_type(from.ty, source);
                    self.declare_range_variable(&from.identifier, element);
                }
                QueryClause::Let(let_clause) => {
                    let ty = self.bind_expression(let_clause.expression);
                    self.declare_range_variable(&let_clause.identifier, ty);
                }
                QueryClause::Where(where_clause) => self.bind_condition_expression(where_clause.condition),
                QueryClause::OrderBy(order_by) => {
                    for ordering in order_by.orderings {
                        self.bind_expression(ordering.expression);
                    }
                }
            }
        }

        let element = match &body.select_or_group {
            SelectOrGroupClause::Select(select) => self.bind_expression(select.expression),
            SelectOrGroupClause::Group(group) => {
                let element = self.bind_expression(group.group_expression);
                let key = self.bind_expression(group.by_expression);
                if self.types.is_error(element) || self.types.is_error(key) {
                    self.types.error_type
                } else {
                    self.types.generic(WellKnownGeneric::IGrouping, vec![key, element])
                }
            }
            SelectOrGroupClause::Missing(_) => self.types.error_type,
        };
        if self.types.is_error(element) || element == self.types.void_type {
            return self.types.error_type;
        }

        match body.continuation {
            Some(continuation) => {
                self.push_scope();
                self.declare_range_variable(&continuation.identifier, element);
                let ty = self.bind_query_body(continuation.body);
                self.pop_scope();
                ty
            }
            None => self.types.enumerable_of(element),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn qualify(container: &str, name: &str) -> String {
    if container.is_empty() {
        name.to_string()
    } else {
        format!("{container}.{name}")
    }
}

/// `A.B.C` for a (possibly qualified) name.
fn dotted_name(ty: &TypeSyntax<'_>) -> String {
    match ty {
        TypeSyntax::Name(name) => name.text.to_string(),
        TypeSyntax::Qualified(qualified) => {
            format!("{}.{}", dotted_name(qualified.left), dotted_name(qualified.right))
        }
        TypeSyntax::Generic(generic) => generic.identifier.text.to_string(),
        _ => String::new(),
    }
}

/// Binary numeric promotion. `None` when no predefined operator applies.
fn promote(a: SpecialType, b: SpecialType) -> Option<SpecialType> {
    use SpecialType::*;
    let numeric_like = |s: SpecialType| s.is_numeric() || s == Char;
    if !numeric_like(a) || !numeric_like(b) {
        return None;
    }
    let signed = |s: SpecialType| matches!(s, SByte | Short | Int | Long);
    let either = |s: SpecialType| a == s || b == s;
    if either(Decimal) {
        return (!either(Float) && !either(Double)).then_some(Decimal);
    }
    if either(Double) {
        return Some(Double);
    }
    if either(Float) {
        return Some(Float);
    }
    if either(ULong) {
        return (!signed(a) && !signed(b)).then_some(ULong);
    }
    if either(Long) {
        return Some(Long);
    }
    if either(UInt) {
        return Some(if signed(a) || signed(b) { Long } else { UInt });
    }
    Some(Int)
}

/// The type of a numeric literal from its spelling and suffix.
fn numeric_literal_type(text: &str, flags: TokenFlags) -> SpecialType {
    let lower = text.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    let is_binary = lower.starts_with("0b");
    if !is_hex {
        if lower.ends_with('f') {
            return SpecialType::Float;
        }
        if lower.ends_with('m') {
            return SpecialType::Decimal;
        }
        if lower.ends_with('d') || flags.contains(TokenFlags::REAL) {
            return SpecialType::Double;
        }
    }

    let suffix_start = lower.trim_end_matches(['u', 'l']).len();
    let suffix = &lower[suffix_start..];
    let value = parse_integer(&lower[..suffix_start], is_hex, is_binary).unwrap_or(u128::MAX);
    let fits = |max: u128| value <= max;
    match suffix {
        "" if fits(i32::MAX as u128) => SpecialType::Int,
        "" if fits(u32::MAX as u128) => SpecialType::UInt,
        "" | "l" if fits(i64::MAX as u128) => SpecialType::Long,
        "u" if fits(u32::MAX as u128) => SpecialType::UInt,
        _ => SpecialType::ULong,
    }
}

fn parse_integer(digits: &str, is_hex: bool, is_binary: bool) -> Option<u128> {
    let (digits, radix) = if is_hex {
        (&digits[2..], 16)
    } else if is_binary {
        (&digits[2..], 2)
    } else {
        (digits, 10)
    };
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    u128::from_str_radix(&cleaned, radix).ok()
}

/// The value of an integer constant expression built from literals,
/// parentheses and unary signs.
fn constant_integer(expression: &Expression<'_>) -> Option<i128> {
    match expression {
        Expression::Literal(literal) if literal.data.kind == SyntaxKind::NumericLiteralExpression => {
            if literal.token_flags.contains(TokenFlags::REAL) {
                return None;
            }
            let lower = literal.text.to_ascii_lowercase();
            if lower.ends_with(['u', 'l']) {
                return None;
            }
            let value = parse_integer(&lower, lower.starts_with("0x"), lower.starts_with("0b"))?;
            i128::try_from(value).ok()
        }
        Expression::Parenthesized(parenthesized) => constant_integer(parenthesized.expression),
        Expression::PrefixUnary(unary) => {
            let value = constant_integer(unary.operand)?;
            match unary.operator.kind() {
                SyntaxKind::MinusToken => Some(-value),
                SyntaxKind::PlusToken => Some(value),
                _ => None,
            }
        }
        _ => None,
    }
}

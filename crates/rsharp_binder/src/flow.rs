//! Reachability analysis over member bodies.
//!
//! Runs after binding. Tracks whether the current point of a body can be
//! reached and reports CS0162 once at the start of each unreachable region,
//! plus CS0164 for labels no `goto` refers to. A label that some `goto`
//! resolved to makes the code after it reachable again.
//!
//! Only `true`, `false` and their parenthesized or negated forms are
//! treated as constant conditions.

use rsharp_ast::node::*;
use rsharp_ast::syntax_kind::SyntaxKind;
use rsharp_core::text::TextSpan;
use rsharp_diagnostics::{messages, DiagnosticBag};
use rsharp_scanner::TokenStream;
use tracing::debug;

use crate::binder::BoundUnit;

/// Run the flow pass over every body of `unit`. Top-level statements form
/// one body and are analyzed first.
pub fn check_reachability(
    unit: &CompilationUnit<'_>,
    tokens: &TokenStream,
    bound: &BoundUnit,
    diagnostics: &mut DiagnosticBag,
) {
    let mut pass = FlowPass {
        tokens,
        bound,
        diagnostics,
        reachable: true,
        reported: false,
        loops: Vec::new(),
    };

    pass.start_body();
    for member in unit.members {
        if let Member::GlobalStatement(statement) = member {
            pass.visit_statement(statement);
        }
    }
    pass.visit_members(unit.members);
}

#[derive(Debug, Default, Clone, Copy)]
struct LoopState {
    /// A reachable `break` targets this loop.
    broken: bool,
    /// A reachable `continue` targets this loop.
    continued: bool,
}

struct FlowPass<'f, 'd> {
    tokens: &'f TokenStream,
    bound: &'f BoundUnit,
    diagnostics: &'d mut DiagnosticBag,
    reachable: bool,
    /// CS0162 was already reported for the current unreachable region.
    reported: bool,
    loops: Vec<LoopState>,
}

impl FlowPass<'_, '_> {
    fn start_body(&mut self) {
        self.reachable = true;
        self.reported = false;
        self.loops.clear();
    }

    fn set_reachable(&mut self, reachable: bool) {
        if reachable {
            self.reported = false;
        }
        self.reachable = reachable;
    }

    /// Report CS0162 at the first token of `span` if this point opens an
    /// unreachable region.
    fn check_reachable(&mut self, span: TextSpan) {
        if self.reachable || self.reported || span.is_empty() {
            return;
        }
        let anchor = self
            .tokens
            .token_at(span.start)
            .map(|token| token.span())
            .unwrap_or(span);
        debug!(start = anchor.start, "unreachable region");
        self.diagnostics.report(&messages::UNREACHABLE_CODE_DETECTED, anchor, &[]);
        self.reported = true;
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn visit_members(&mut self, members: &[Member<'_>]) {
        for member in members {
            match member {
                Member::Namespace(namespace) => self.visit_members(namespace.members),
                Member::Type(declaration) => self.visit_type(declaration),
                Member::GlobalStatement(_) | Member::Incomplete(_) => {}
            }
        }
    }

    fn visit_type(&mut self, declaration: &TypeDeclaration<'_>) {
        for member in declaration.members {
            let body = match member {
                ClassMember::Method(method) => method.body,
                ClassMember::ConversionOperator(operator) => operator.body,
                ClassMember::NestedType(nested) => {
                    self.visit_type(nested);
                    None
                }
                ClassMember::Field(_) | ClassMember::Incomplete(_) => None,
            };
            if let Some(body) = body {
                self.start_body();
                self.visit_block(body);
            }
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn visit_block(&mut self, block: &Block<'_>) {
        for statement in block.statements {
            self.visit_statement(statement);
        }
    }

    fn visit_statement(&mut self, statement: &Statement<'_>) {
        match statement {
            Statement::Block(block) => self.visit_block(block),
            Statement::Empty(_) => {}
            Statement::LocalDeclaration(_) | Statement::Expression(_) => self.check_reachable(statement.span()),
            Statement::If(statement_if) => {
                self.check_reachable(statement.span());
                let constant = constant_bool(statement_if.condition);
                let entry = self.reachable;

                self.set_reachable(entry && constant != Some(false));
                self.visit_statement(statement_if.statement);
                let after_then = self.reachable;

                self.set_reachable(entry && constant != Some(true));
                if let Some(else_statement) = statement_if.else_statement {
                    self.visit_statement(else_statement);
                }
                let after_else = self.reachable;
                self.set_reachable(after_then || after_else);
            }
            Statement::While(statement_while) => {
                self.check_reachable(statement.span());
                let constant = constant_bool(statement_while.condition);
                let entry = self.reachable;

                self.loops.push(LoopState::default());
                self.set_reachable(entry && constant != Some(false));
                self.visit_statement(statement_while.statement);
                let state = self.loops.pop().unwrap_or_default();
                self.set_reachable((entry && constant != Some(true)) || state.broken);
            }
            Statement::Do(statement_do) => {
                self.check_reachable(statement.span());
                let constant = constant_bool(statement_do.condition);

                self.loops.push(LoopState::default());
                self.visit_statement(statement_do.statement);
                let state = self.loops.last().copied().unwrap_or_default();
                let condition_reachable = self.reachable || state.continued;
                self.loops.pop();
                self.set_reachable((condition_reachable && constant != Some(true)) || state.broken);
            }
            Statement::For(statement_for) => self.visit_for(statement_for),
            Statement::Return(_) | Statement::Goto(_) => {
                self.check_reachable(statement.span());
                self.set_reachable(false);
            }
            // Outside any loop these are CS0139 and leave reachability alone.
            Statement::Break(_) => {
                self.check_reachable(statement.span());
                let reachable = self.reachable;
                if let Some(state) = self.loops.last_mut() {
                    state.broken |= reachable;
                    self.set_reachable(false);
                }
            }
            Statement::Continue(_) => {
                self.check_reachable(statement.span());
                let reachable = self.reachable;
                if let Some(state) = self.loops.last_mut() {
                    state.continued |= reachable;
                    self.set_reachable(false);
                }
            }
            Statement::Labeled(labeled) => {
                let label = &labeled.label;
                if !label.is_missing() && self.bound.is_label_referenced(label.data.range.pos) {
                    self.set_reachable(true);
                } else {
                    self.check_reachable(statement.span());
                    if !label.is_missing() {
                        self.diagnostics.report(&messages::LABEL_NOT_REFERENCED, label.span(), &[]);
                    }
                }
                self.visit_statement(labeled.statement);
            }
        }
    }

    /// The `for` keyword itself is never an anchor: an unreachable `for`
    /// reports at its first initializer, or failing that inside its body.
    fn visit_for(&mut self, statement: &ForStatement<'_>) {
        match &statement.initializer {
            Some(ForInitializer::Declaration(declaration)) => {
                for declarator in declaration.declarators {
                    self.check_reachable(declarator.identifier.span());
                }
            }
            Some(ForInitializer::Expressions(expressions)) => {
                for expression in expressions.iter() {
                    self.check_reachable(expression.span());
                }
            }
            None => {}
        }

        // An absent condition loops forever.
        let constant = match statement.condition {
            Some(condition) => constant_bool(condition),
            None => Some(true),
        };
        let entry = self.reachable;

        self.loops.push(LoopState::default());
        self.set_reachable(entry && constant != Some(false));
        self.visit_statement(statement.statement);

        let state = self.loops.last().copied().unwrap_or_default();
        if state.continued {
            self.set_reachable(true);
        }
        for incrementor in statement.incrementors {
            self.check_reachable(incrementor.span());
        }
        self.loops.pop();
        self.set_reachable((entry && constant != Some(true)) || state.broken);
    }
}

/// `true`, `false`, and parenthesized or negated forms of them.
fn constant_bool(expression: &Expression<'_>) -> Option<bool> {
    match expression {
        Expression::Literal(literal) => match literal.data.kind {
            SyntaxKind::TrueLiteralExpression => Some(true),
            SyntaxKind::FalseLiteralExpression => Some(false),
            _ => None,
        },
        Expression::Parenthesized(parenthesized) => constant_bool(parenthesized.expression),
        Expression::PrefixUnary(unary) if unary.operator.kind() == SyntaxKind::ExclamationToken => {
            constant_bool(unary.operand).map(|value| !value)
        }
        _ => None,
    }
}

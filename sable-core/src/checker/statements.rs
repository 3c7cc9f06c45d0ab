#![forbid(unsafe_code)]

//! Statement checking and the flow-state bookkeeping around branches,
//! loops and transfers.

use sable_ast::{
    self as ast, AssignStmt, BinOp, Block, CompositeKind, ElseBranch, Expr, ExprKind, IfStmt,
    IfTest, Span, Stmt, SwapStmt, Transfer, VarKind, VariableDecl,
};
use tracing::trace;

use super::{Checker, FunctionKind, LoopFrame};
use crate::access::{DeclarationKind, Receiver};
use crate::elaboration::ValueKind;
use crate::error::SemanticError;
use crate::flow::FlowState;
use crate::resources::{InvalidationKind, ResourceInfo, ResourceKey, ResourceState};
use crate::scope::BindingKind;
use crate::subtype::{is_equal, is_subtype};
use crate::types::{MemberKind, Type};

/// What an assignment target is used for. Swaps and double transfers read
/// the old value as well as writing a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum TargetUse {
    Assign,
    Swap,
    Transfer,
}

#[derive(Debug)]
pub(super) struct AssignTarget {
    pub(super) ty: Type,
    /// First assignment of a field of `self` inside an initializer.
    first_init: bool,
    init_field: Option<String>,
    /// Tracked variable written by the assignment.
    var: Option<ResourceKey>,
}

impl AssignTarget {
    fn invalid() -> Self {
        Self {
            ty: Type::Invalid,
            first_init: false,
            init_field: None,
            var: None,
        }
    }
}

impl Checker<'_> {
    pub(super) fn check_block(&mut self, block: &Block) {
        self.scopes.push();
        for stmt in &block.stmts {
            if self.flow.halted {
                self.report(SemanticError::UnreachableStatement { span: stmt.span() });
                break;
            }
            self.check_statement(stmt);
        }
        let vars = self.scopes.pop();
        self.end_scope(vars);
    }

    fn check_statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Variable(v) => self.check_variable_declaration(v, false),
            Stmt::Function(f) => self.check_local_function(f),
            Stmt::Composite(c) => self.report(SemanticError::InvalidNestedDeclaration {
                nested: c.kind.keyword().to_string(),
                container: "function".to_string(),
                span: c.name.span,
            }),
            Stmt::Assign(assign) => self.check_assignment(assign),
            Stmt::Swap(swap) => self.check_swap(swap),
            Stmt::If(stmt) => self.check_if(stmt),
            Stmt::While(stmt) => self.check_while(stmt),
            Stmt::Return(stmt) => self.check_return(stmt),
            Stmt::Break(span) => self.check_jump("break", *span),
            Stmt::Continue(span) => self.check_jump("continue", *span),
            Stmt::Destroy(stmt) => self.check_destroy(stmt),
            Stmt::Emit(stmt) => self.check_emit(stmt),
            Stmt::Expr(expr) => self.check_expression_statement(expr),
        }
    }

    // --- Bindings ---

    pub(super) fn check_variable_declaration(&mut self, v: &VariableDecl, is_global: bool) {
        let kind = match v.kind {
            VarKind::Let => DeclarationKind::Constant,
            VarKind::Var => DeclarationKind::Variable,
        };
        self.check_access_modifier(&v.access, kind, !is_global, false);
        let annotated = v.ty.as_ref().map(|annot| self.convert_annotation(annot));

        let ty = match &v.second {
            Some((second_transfer, second)) => {
                // `let old <- target <- new`: the target's old value is bound
                // and the target receives the new one.
                let target = self.check_assignment_target(&v.value, TargetUse::Transfer);
                let new_ty = self.check_expression(second, Some(&target.ty));
                self.check_transfer(*second_transfer, &target.ty, second.span);
                if self.is_resource(&new_ty) {
                    self.move_out(second);
                }
                self.finish_target(&target);

                let old = target.ty;
                if let Some(expected) = &annotated
                    && !is_subtype(&self.registry, &old, expected)
                {
                    self.report(SemanticError::TypeMismatch {
                        expected: self.type_name(expected),
                        actual: self.type_name(&old),
                        span: v.value.span,
                    });
                }
                annotated.unwrap_or(old)
            }
            None => {
                let value_ty = self.check_expression(&v.value, annotated.as_ref());
                let ty = annotated.unwrap_or(value_ty);
                if self.is_resource(&ty) {
                    self.move_out(&v.value);
                }
                ty
            }
        };
        self.check_transfer(v.transfer, &ty, v.value.span);
        self.elaboration.set_declaration_type(v.id, ty.clone());

        let halts = ty.is_never();
        if is_global {
            let access = self.convert_access(&v.access);
            let value_kind = match v.kind {
                VarKind::Let => ValueKind::Constant,
                VarKind::Var => ValueKind::Variable,
            };
            self.declare_global(&v.name, ty, BindingKind::Global, access, value_kind);
        } else {
            let referenced = match &v.second {
                Some(_) => Vec::new(),
                None => self.referenced_resources(&v.value),
            };
            let id = self.declare_variable(
                &v.name.node,
                v.name.span,
                ty,
                v.kind,
                BindingKind::Local,
                crate::access::Access::NOT_SPECIFIED,
            );
            if let Some(id) = id
                && !referenced.is_empty()
            {
                self.references.insert(id, referenced);
            }
        }
        if halts {
            self.flow.halted = true;
        }
    }

    /// `<-` for resources, `=` for everything else.
    fn check_transfer(&mut self, transfer: Transfer, ty: &Type, span: Span) {
        if ty.is_invalid() || ty.is_never() {
            return;
        }
        let expected = match (self.is_resource(ty), transfer) {
            (true, Transfer::Copy) => "<-",
            (false, Transfer::Move | Transfer::ForceMove) => "=",
            _ => return,
        };
        self.report(SemanticError::IncorrectTransferOperation { expected, span });
    }

    // --- Assignment ---

    pub(super) fn check_assignment_target(&mut self, target: &Expr, usage: TargetUse) -> AssignTarget {
        let result = match &target.kind {
            ExprKind::Ident(name) => self.check_variable_target(name, usage),
            ExprKind::Member {
                base,
                optional,
                member,
            } => self.check_member_target(target, base, *optional, member, usage),
            ExprKind::Index { base, index } => {
                let base_ty = self.check_expression(base, None);
                let ty = self.check_index(&base_ty, index, target.span);
                AssignTarget {
                    ty,
                    ..AssignTarget::invalid()
                }
            }
            _ => {
                self.check_expression(target, None);
                let span = target.span;
                self.report(match usage {
                    TargetUse::Swap => SemanticError::InvalidSwapExpression { span },
                    _ => SemanticError::InvalidAssignmentTarget { span },
                });
                AssignTarget::invalid()
            }
        };
        self.elaboration
            .set_expression_type(target.id, result.ty.clone());
        result
    }

    fn check_variable_target(&mut self, name: &ast::Ident, usage: TargetUse) -> AssignTarget {
        let Some(var) = self.scopes.lookup_value(&name.node).cloned() else {
            self.report(SemanticError::NotDeclared {
                kind: "variable",
                name: name.node.clone(),
                span: name.span,
            });
            return AssignTarget::invalid();
        };
        let assignable = var.kind == VarKind::Var
            && matches!(var.binding, BindingKind::Local | BindingKind::Global)
            && var.imported_from.is_none();
        if !assignable {
            self.report(SemanticError::AssignmentToConstant {
                name: name.node.clone(),
                span: name.span,
            });
        }
        match usage {
            TargetUse::Assign => {
                self.check_capture(&var, name.span);
            }
            TargetUse::Swap | TargetUse::Transfer => self.check_variable_use(&var, name.span),
        }
        AssignTarget {
            ty: var.ty.clone(),
            first_init: false,
            init_field: None,
            var: var.is_tracked().then_some(ResourceKey::Var(var.id)),
        }
    }

    fn check_member_target(
        &mut self,
        target: &Expr,
        base: &Expr,
        optional: bool,
        member: &ast::Ident,
        usage: TargetUse,
    ) -> AssignTarget {
        if optional {
            self.check_expression(base, None);
            self.report(SemanticError::InvalidAssignmentTarget { span: target.span });
            return AssignTarget::invalid();
        }
        if let Some(result) = self.check_initializer_field_target(base, member, usage) {
            return result;
        }

        let is_self = matches!(base.kind, ExprKind::SelfRef);
        let base_ty = if is_self {
            let ty = self.self_value_type(base.span);
            self.elaboration.set_expression_type(base.id, ty.clone());
            ty
        } else {
            self.check_expression(base, None)
        };
        let (receiver_ty, authorization) = match base_ty {
            Type::Reference {
                authorization,
                referenced,
            } => (*referenced, Some(authorization)),
            other => (other, None),
        };
        let Some(found) = self.lookup_member(&receiver_ty, member) else {
            return AssignTarget::invalid();
        };

        if let Some(container) = found.container {
            let receiver = match (&authorization, is_self) {
                (Some(authorization), _) => Receiver::Reference(authorization),
                (None, true) => Receiver::SelfValue,
                (None, false) => Receiver::Owned,
            };
            let access = found.info.access.clone();
            let readable = self.access_context().can_read_member(
                &self.registry,
                container,
                &access,
                receiver,
            );
            if !readable {
                self.report(SemanticError::InvalidAccess {
                    name: member.node.clone(),
                    declaration: found.declaration().to_string(),
                    access: access.describe(&self.registry),
                    span: member.span,
                });
            }
            if found.info.is_field() && !self.access_context().can_write_member(container, &access) {
                self.report(SemanticError::InvalidAssignmentAccess {
                    name: member.node.clone(),
                    declaration: found.declaration().to_string(),
                    access: access.describe(&self.registry),
                    span: member.span,
                });
            }
        }

        match found.info.kind {
            MemberKind::Field(VarKind::Var) => {}
            MemberKind::Field(VarKind::Let) => {
                self.report(SemanticError::AssignmentToConstantMember {
                    name: member.node.clone(),
                    span: member.span,
                });
            }
            MemberKind::Function | MemberKind::EnumCase => {
                self.report(SemanticError::InvalidAssignmentTarget { span: target.span });
            }
        }
        AssignTarget {
            ty: found.info.ty,
            ..AssignTarget::invalid()
        }
    }

    /// `self.f` on the left of an assignment inside an initializer. Swaps
    /// and double transfers read the old value, so the field must already
    /// be set for them.
    fn check_initializer_field_target(
        &mut self,
        base: &Expr,
        member: &ast::Ident,
        usage: TargetUse,
    ) -> Option<AssignTarget> {
        if !matches!(base.kind, ExprKind::SelfRef) {
            return None;
        }
        let context = self.current_function()?;
        let id = context.composite?;
        if context.kind != FunctionKind::Initializer {
            return None;
        }
        let fields = self.flow.fields.as_ref()?;
        let field = self
            .registry
            .composite(id)
            .member(&member.node)
            .filter(|m| m.is_field())?
            .clone();
        let initialized = fields.is_initialized(&member.node);

        let self_ty = self.composite_type(id);
        self.elaboration.set_expression_type(base.id, self_ty);
        if !initialized {
            if usage != TargetUse::Assign {
                self.report(SemanticError::UninitializedFieldAccess {
                    name: member.node.clone(),
                    span: member.span,
                });
            }
            return Some(AssignTarget {
                ty: field.ty,
                first_init: true,
                init_field: Some(member.node.clone()),
                var: None,
            });
        }
        if field.kind == MemberKind::Field(VarKind::Let) {
            self.report(SemanticError::AssignmentToConstantMember {
                name: member.node.clone(),
                span: member.span,
            });
        }
        Some(AssignTarget {
            ty: field.ty,
            ..AssignTarget::invalid()
        })
    }

    /// Marks an initializer field assigned once the value is checked, so
    /// the value itself may not read the field.
    fn finish_target(&mut self, target: &AssignTarget) {
        if let Some(name) = &target.init_field
            && let Some(fields) = self.flow.fields.as_mut()
        {
            fields.assign(name);
        }
    }

    fn check_assignment(&mut self, stmt: &AssignStmt) {
        let target = self.check_assignment_target(&stmt.target, TargetUse::Assign);
        let value_ty = self.check_expression(&stmt.value, Some(&target.ty));
        let ty = if target.ty.is_invalid() {
            value_ty
        } else {
            target.ty.clone()
        };
        self.check_transfer(stmt.transfer, &ty, stmt.span);

        if self.is_resource(&ty) {
            match stmt.transfer {
                Transfer::ForceMove => {
                    if !target.ty.is_optional() && !target.ty.is_invalid() {
                        self.report(SemanticError::IncorrectTransferOperation {
                            expected: "<-",
                            span: stmt.span,
                        });
                    }
                    if let Some(key) = &target.var {
                        self.flow.resources.set(key, ResourceInfo::UNUSED);
                    }
                }
                Transfer::Move | Transfer::Copy => {
                    if !target.first_init && !target.ty.is_invalid() {
                        self.report(SemanticError::InvalidResourceAssignment { span: stmt.span });
                    }
                }
            }
            self.move_out(&stmt.value);
        }
        self.finish_target(&target);

        if let ExprKind::Ident(name) = &stmt.target.kind
            && let Some(id) = self.scopes.lookup_value(&name.node).map(|var| var.id)
        {
            let referenced = self.referenced_resources(&stmt.value);
            if referenced.is_empty() {
                self.references.remove(&id);
            } else {
                self.references.insert(id, referenced);
            }
        }
    }

    fn check_swap(&mut self, stmt: &SwapStmt) {
        let left = self.check_assignment_target(&stmt.left, TargetUse::Swap);
        let right = self.check_assignment_target(&stmt.right, TargetUse::Swap);
        if !left.ty.is_invalid()
            && !right.ty.is_invalid()
            && !is_equal(&self.registry, &left.ty, &right.ty)
        {
            self.report(SemanticError::TypeMismatch {
                expected: self.type_name(&left.ty),
                actual: self.type_name(&right.ty),
                span: stmt.right.span,
            });
        }
        self.finish_target(&left);
        self.finish_target(&right);
    }

    // --- Control flow ---

    fn check_if(&mut self, stmt: &IfStmt) {
        match &stmt.test {
            IfTest::Expr(cond) => {
                self.check_expression(cond, Some(&Type::BOOL));
                let before = self.snapshot();
                self.check_block(&stmt.then_block);
                let then_flow = std::mem::replace(&mut self.flow, before);
                self.check_else(stmt.else_branch.as_ref());
                self.flow = then_flow.join(&self.flow);
            }
            IfTest::Binding(binding) => self.check_if_let(stmt, binding),
        }
    }

    fn check_else(&mut self, branch: Option<&ElseBranch>) {
        match branch {
            Some(ElseBranch::Block(block)) => self.check_block(block),
            Some(ElseBranch::If(stmt)) => self.check_if(stmt),
            None => {}
        }
    }

    /// `if let x = e`. A failable resource cast only moves its operand on
    /// the successful branch; the operand stays owned otherwise.
    fn check_if_let(&mut self, stmt: &IfStmt, binding: &VariableDecl) {
        let annotated = binding
            .ty
            .as_ref()
            .map(|annot| self.convert_annotation(annot));
        let expected = annotated.clone().map(Type::optional);

        let failable_cast = matches!(
            binding.value.kind,
            ExprKind::Cast {
                kind: ast::CastKind::Failable,
                ..
            }
        );
        if failable_cast {
            self.binding_cast = Some(binding.value.id);
        }
        let value_ty = self.check_expression(&binding.value, expected.as_ref());
        self.binding_cast = None;

        let inner = match &value_ty {
            Type::Optional(inner) => (**inner).clone(),
            Type::Invalid => Type::Invalid,
            other => {
                self.report(SemanticError::TypeMismatch {
                    expected: format!("{}?", self.type_name(other)),
                    actual: self.type_name(other),
                    span: binding.value.span,
                });
                Type::Invalid
            }
        };
        self.check_transfer(binding.transfer, &value_ty, binding.value.span);
        let is_resource = self.is_resource(&value_ty);
        if is_resource && !failable_cast {
            self.move_out(&binding.value);
        }

        let before = self.snapshot();
        self.scopes.push();
        if is_resource && failable_cast {
            self.move_out(&binding.value);
        }
        let ty = annotated.unwrap_or(inner);
        self.elaboration.set_declaration_type(binding.id, ty.clone());
        self.declare_variable(
            &binding.name.node,
            binding.name.span,
            ty,
            binding.kind,
            BindingKind::Local,
            crate::access::Access::NOT_SPECIFIED,
        );
        self.check_block(&stmt.then_block);
        let vars = self.scopes.pop();
        self.end_scope(vars);

        let then_flow = std::mem::replace(&mut self.flow, before);
        self.check_else(stmt.else_branch.as_ref());
        self.flow = then_flow.join(&self.flow);
    }

    fn check_while(&mut self, stmt: &ast::WhileStmt) {
        self.check_expression(&stmt.cond, Some(&Type::BOOL));
        let before = self.snapshot();

        // Dry run: find the outer resources the body invalidates.
        let exits = self.current_function().map_or(0, |f| f.init_exits.len());
        self.suppressed += 1;
        let dry = self.check_loop_body(&stmt.body);
        self.suppressed -= 1;
        if let Some(context) = self.current_function_mut() {
            context.init_exits.truncate(exits);
        }
        let invalidated = dry.resources.invalidated_since(&before.resources);
        trace!(count = invalidated.len(), "loop invalidates outer resources");

        self.flow = before.clone();
        for key in &invalidated {
            let invalidation = dry.resources.get(key).and_then(|info| info.invalidation);
            self.flow.resources.set(
                key,
                ResourceInfo {
                    state: ResourceState::MaybeInvalidated,
                    invalidation,
                },
            );
        }
        let post = self.check_loop_body(&stmt.body);
        self.flow = before.join(&post);
    }

    /// Checks a loop body; the result joins the normal end of the body with
    /// every `break` and `continue`.
    fn check_loop_body(&mut self, body: &Block) -> FlowState {
        let scope_depth = self.scopes.depth();
        if let Some(context) = self.current_function_mut() {
            context.loops.push(LoopFrame {
                scope_depth,
                jumps: Vec::new(),
            });
        }
        self.check_block(body);
        let jumps = self
            .current_function_mut()
            .and_then(|context| context.loops.pop())
            .map(|frame| frame.jumps)
            .unwrap_or_default();
        let end = std::mem::take(&mut self.flow);
        jumps.iter().fold(end, |acc, jump| acc.join(jump))
    }

    /// `break` and `continue` leave the body's scopes, so resources
    /// declared inside the body must be gone by then.
    fn check_jump(&mut self, control: &'static str, span: Span) {
        let Some(depth) = self
            .current_function()
            .and_then(|context| context.loops.last())
            .map(|frame| frame.scope_depth)
        else {
            self.report(SemanticError::ControlStatement { control, span });
            return;
        };

        let locals: Vec<ResourceKey> = self
            .scopes
            .values_from(depth)
            .into_iter()
            .map(|var| ResourceKey::Var(var.id))
            .filter(|key| self.flow.resources.is_tracked(key))
            .collect();
        let mut state = self.flow.clone();
        for key in &locals {
            if state
                .resources
                .get(key)
                .is_some_and(|info| info.state != ResourceState::DefinitelyInvalidated)
            {
                self.report(SemanticError::ResourceLoss { span });
            }
            state.resources.untrack(key);
        }

        if let Some(frame) = self
            .current_function_mut()
            .and_then(|context| context.loops.last_mut())
        {
            frame.jumps.push(state);
        }
        self.flow.halted = true;
    }

    fn check_return(&mut self, stmt: &ast::ReturnStmt) {
        let Some((ret, depth)) = self
            .current_function()
            .map(|context| (context.ret.clone(), context.scope_depth))
        else {
            return;
        };
        match &stmt.value {
            None => {
                if !ret.is_void() && !ret.is_invalid() {
                    self.report(SemanticError::MissingReturnValue {
                        expected: self.type_name(&ret),
                        span: stmt.span,
                    });
                }
            }
            Some(value) if ret.is_void() => {
                self.check_expression(value, None);
                self.report(SemanticError::InvalidReturnValue { span: value.span });
            }
            Some(value) => {
                let ty = self.check_expression(value, Some(&ret));
                if self.is_resource(&ty) && !matches!(value.kind, ExprKind::Move(_)) {
                    self.report(SemanticError::MissingMoveOperation { span: value.span });
                    self.move_out(value);
                }
            }
        }

        let lost = self
            .scopes
            .values_from(depth)
            .into_iter()
            .filter(|var| {
                self.flow
                    .resources
                    .get(&ResourceKey::Var(var.id))
                    .is_some_and(|info| info.state != ResourceState::DefinitelyInvalidated)
            })
            .count();
        for _ in 0..lost {
            self.report(SemanticError::ResourceLoss { span: stmt.span });
        }
        self.record_function_exit();
        self.flow.halted = true;
    }

    // --- Resources and events ---

    fn check_destroy(&mut self, stmt: &ast::DestroyStmt) {
        let ty = self.check_expression(&stmt.expr, None);
        if ty.is_invalid() {
            return;
        }
        if !self.is_resource(&ty) {
            self.report(SemanticError::InvalidDestruction {
                ty: self.type_name(&ty),
                span: stmt.expr.span,
            });
            return;
        }
        self.invalidate(&stmt.expr, InvalidationKind::Destroyed);
    }

    fn check_emit(&mut self, stmt: &ast::EmitStmt) {
        let ty = self.check_expression(&stmt.event, None);
        let is_event = match &ty {
            Type::Composite(id) => self.registry.composite(*id).kind == CompositeKind::Event,
            Type::Invalid => true,
            _ => false,
        };
        if !is_event {
            self.report(SemanticError::EmitNonEvent {
                ty: self.type_name(&ty),
                span: stmt.event.span,
            });
        }
    }

    fn check_expression_statement(&mut self, expr: &Expr) {
        let ty = self.check_expression(expr, None);
        if self.is_resource(&ty) {
            self.report(SemanticError::ResourceLoss { span: expr.span });
        }
        if ty.is_never() {
            self.flow.halted = true;
        }
    }

    /// The value of `expr` is transferred away.
    pub(super) fn move_out(&mut self, expr: &Expr) {
        self.invalidate(expr, InvalidationKind::Moved);
    }

    fn invalidate(&mut self, expr: &Expr, kind: InvalidationKind) {
        match &expr.kind {
            ExprKind::Ident(name) => {
                let Some(var) = self.scopes.lookup_value(&name.node) else {
                    return;
                };
                let key = ResourceKey::Var(var.id);
                self.flow.resources.invalidate(&key, kind, expr.span);
            }
            ExprKind::SelfRef => {
                let in_resource = self
                    .current_function()
                    .and_then(|context| context.composite)
                    .is_some_and(|id| self.registry.composite(id).is_resource);
                if in_resource {
                    self.report(SemanticError::InvalidSelfInvalidation { span: expr.span });
                }
            }
            ExprKind::Member { base, member, .. } => {
                let in_destructor = self
                    .current_function()
                    .is_some_and(|context| context.kind == FunctionKind::Destructor);
                let key = ResourceKey::SelfField(member.node.clone());
                if matches!(base.kind, ExprKind::SelfRef)
                    && in_destructor
                    && self.flow.resources.is_tracked(&key)
                {
                    self.flow.resources.invalidate(&key, kind, expr.span);
                } else {
                    self.report(SemanticError::InvalidNestedResourceMove { span: expr.span });
                }
            }
            ExprKind::Index { .. } => {
                self.report(SemanticError::InvalidNestedResourceMove { span: expr.span });
            }
            ExprKind::Move(inner) | ExprKind::Force(inner) => self.invalidate(inner, kind),
            ExprKind::Cast { expr: inner, .. } => self.invalidate(inner, kind),
            ExprKind::Binary {
                left,
                op: BinOp::NilCoalesce,
                right,
            } => {
                self.invalidate(left, kind);
                self.invalidate(right, kind);
            }
            ExprKind::Conditional {
                then, otherwise, ..
            } => {
                self.invalidate(then, kind);
                self.invalidate(otherwise, kind);
            }
            // Calls, constructions and literals produce fresh values.
            _ => {}
        }
    }
}

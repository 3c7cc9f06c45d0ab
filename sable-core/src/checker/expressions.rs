#![forbid(unsafe_code)]

use sable_ast::{self as ast, BinOp, CastKind, Expr, ExprKind, Span, UnaryOp};

use super::{Checker, FunctionKind};
use crate::elaboration::CastRecord;
use crate::error::SemanticError;
use crate::resources::{ResourceKey, ResourceState};
use crate::scope::Variable;
use crate::subtype::{is_equal, is_subtype, is_valid_dynamic_cast};
use crate::types::{Authorization, PrimitiveType, Type};

impl Checker<'_> {
    /// Infers the type of `expr`, records it, and checks it against
    /// `expected` when given.
    pub(super) fn check_expression(&mut self, expr: &Expr, expected: Option<&Type>) -> Type {
        let ty = self.check_with_hint(expr, expected);
        if let Some(expected) = expected
            && !is_subtype(&self.registry, &ty, expected)
        {
            self.report(SemanticError::TypeMismatch {
                expected: self.type_name(expected),
                actual: self.type_name(&ty),
                span: expr.span,
            });
        }
        ty
    }

    /// Like [`Self::check_expression`], but `hint` only steers literal
    /// typing and is not enforced.
    fn check_with_hint(&mut self, expr: &Expr, hint: Option<&Type>) -> Type {
        let ty = self.infer_expression(expr, hint);
        self.elaboration.set_expression_type(expr.id, ty.clone());
        ty
    }

    fn infer_expression(&mut self, expr: &Expr, expected: Option<&Type>) -> Type {
        match &expr.kind {
            ExprKind::Ident(name) => self.check_identifier(name),
            ExprKind::SelfRef => self.check_self(expr.span),
            ExprKind::Nil => Type::optional(Type::NEVER),
            ExprKind::Bool(_) => Type::BOOL,
            ExprKind::Int(value) => self.check_integer_literal(expr, *value, expected, false),
            ExprKind::Fixed { .. } => self.check_fixed_literal(expr, expected, false),
            ExprKind::String(value) => {
                let wants_character = expected
                    .map(Type::unwrap_optional)
                    .and_then(Type::primitive)
                    == Some(PrimitiveType::Character);
                if wants_character && value.chars().count() == 1 {
                    self.elaboration.mark_same_as_expected(expr.id);
                    Type::Primitive(PrimitiveType::Character)
                } else {
                    Type::STRING
                }
            }
            ExprKind::Array(elems) => self.check_array(elems, expected),
            ExprKind::Dictionary(entries) => self.check_dictionary(entries, expected),
            ExprKind::Member {
                base,
                optional,
                member,
            } => self.check_member_expression(expr, base, *optional, member),
            ExprKind::Index { base, index } => {
                let base_ty = self.check_expression(base, None);
                self.check_index(&base_ty, index, expr.span)
            }
            ExprKind::Call {
                callee,
                type_args,
                args,
            } => self.check_call(expr, callee, type_args, args, false),
            ExprKind::Unary { op, expr: inner } => self.check_unary(expr, *op, inner, expected),
            ExprKind::Binary { left, op, right } => {
                self.check_binary(expr, left, *op, right, expected)
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => self.check_conditional(expr, cond, then, otherwise, expected),
            ExprKind::Force(inner) => {
                let hint = expected.cloned().map(Type::optional);
                match self.check_with_hint(inner, hint.as_ref()) {
                    Type::Optional(inner) => *inner,
                    other => other,
                }
            }
            ExprKind::Cast {
                expr: inner,
                kind,
                ty,
            } => self.check_cast(expr, inner, *kind, ty),
            ExprKind::Create(inner) => match &inner.kind {
                ExprKind::Call {
                    callee,
                    type_args,
                    args,
                } => {
                    let ty = self.check_call(inner, callee, type_args, args, true);
                    self.elaboration.set_expression_type(inner.id, ty.clone());
                    ty
                }
                _ => {
                    let ty = self.check_expression(inner, None);
                    self.report(SemanticError::InvalidConstruction {
                        name: self.type_name(&ty),
                        span: expr.span,
                    });
                    Type::Invalid
                }
            },
            ExprKind::Move(inner) => {
                let ty = self.check_with_hint(inner, expected);
                if !ty.is_invalid() && !self.is_resource(&ty) {
                    self.report(SemanticError::InvalidMoveOperation { span: expr.span });
                } else {
                    self.move_out(inner);
                }
                ty
            }
            ExprKind::Reference { expr: inner, ty } => self.check_reference(inner, ty),
            ExprKind::Function(function) => self.check_closure(function),
        }
    }

    // --- Names ---

    fn check_identifier(&mut self, name: &ast::Ident) -> Type {
        let Some(var) = self.scopes.lookup_value(&name.node).cloned() else {
            self.report(SemanticError::NotDeclared {
                kind: "variable",
                name: name.node.clone(),
                span: name.span,
            });
            return Type::Invalid;
        };
        self.check_variable_use(&var, name.span);
        self.check_reference_validity(&var, name.span);
        var.ty
    }

    /// A reference is unusable once a resource it points into was moved or
    /// destroyed on some path.
    fn check_reference_validity(&mut self, var: &Variable, span: Span) {
        let Some(keys) = self.references.get(&var.id).cloned() else {
            return;
        };
        for key in keys {
            if let Some(info) = self.flow.resources.get(&key)
                && !info.state.is_live()
            {
                self.report(SemanticError::InvalidatedResourceReference {
                    span,
                    invalidated_at: info.invalidation.map(|i| i.span),
                });
            }
        }
    }

    /// Resources the value of `expr` refers to, when it is a reference.
    pub(super) fn referenced_resources(&self, expr: &Expr) -> Vec<ResourceKey> {
        match &expr.kind {
            ExprKind::Reference { expr: inner, .. } => self.reference_root(inner),
            ExprKind::Ident(name) => self
                .scopes
                .lookup_value(&name.node)
                .and_then(|var| self.references.get(&var.id).cloned())
                .unwrap_or_default(),
            ExprKind::Cast { expr: inner, .. } | ExprKind::Force(inner) => {
                self.referenced_resources(inner)
            }
            ExprKind::Conditional {
                then, otherwise, ..
            } => {
                let mut keys = self.referenced_resources(then);
                keys.extend(self.referenced_resources(otherwise));
                keys
            }
            ExprKind::Binary {
                left,
                op: BinOp::NilCoalesce,
                right,
            } => {
                let mut keys = self.referenced_resources(left);
                keys.extend(self.referenced_resources(right));
                keys
            }
            _ => Vec::new(),
        }
    }

    /// The owning variable at the root of a borrowed access path such as
    /// `&vault.tokens[0]`.
    fn reference_root(&self, expr: &Expr) -> Vec<ResourceKey> {
        match &expr.kind {
            ExprKind::Ident(name) => {
                let Some(var) = self.scopes.lookup_value(&name.node) else {
                    return Vec::new();
                };
                if let Some(keys) = self.references.get(&var.id) {
                    keys.clone()
                } else if var.is_tracked() {
                    vec![ResourceKey::Var(var.id)]
                } else {
                    Vec::new()
                }
            }
            ExprKind::Member { base, .. } | ExprKind::Index { base, .. } => self.reference_root(base),
            ExprKind::Force(inner) => self.reference_root(inner),
            _ => Vec::new(),
        }
    }

    /// Closures may not refer to resources of enclosing functions.
    pub(super) fn check_capture(&mut self, var: &Variable, span: Span) -> bool {
        if var.is_tracked() && var.function_depth < self.function_depth() {
            self.report(SemanticError::ResourceCapturing {
                name: var.name.clone(),
                span,
            });
            return false;
        }
        true
    }

    pub(super) fn check_variable_use(&mut self, var: &Variable, span: Span) {
        if self.check_capture(var, span) {
            self.check_resource_use(&ResourceKey::Var(var.id), &var.name, span);
        }
    }

    /// Reports a read of a resource that was moved or destroyed on some path.
    pub(super) fn check_resource_use(&mut self, key: &ResourceKey, name: &str, span: Span) {
        let Some(info) = self.flow.resources.get(key) else {
            return;
        };
        let maybe = match info.state {
            ResourceState::DefinitelyInvalidated => false,
            ResourceState::MaybeInvalidated => true,
            ResourceState::Unused | ResourceState::UsedAsReferenceOnly => return,
        };
        self.report(SemanticError::ResourceUseAfterInvalidation {
            name: name.to_string(),
            maybe,
            span,
            invalidated_at: info.invalidation.map(|i| i.span),
        });
    }

    /// `self` as a value. Inside an initializer it may only escape once
    /// every field is set.
    fn check_self(&mut self, span: Span) -> Type {
        let ty = self.self_value_type(span);
        let in_initializer = self
            .current_function()
            .is_some_and(|context| context.kind == FunctionKind::Initializer);
        let complete = self
            .flow
            .fields
            .as_ref()
            .is_none_or(|fields| fields.all_initialized());
        if in_initializer && !complete {
            self.report(SemanticError::UninitializedUse {
                name: "self".to_string(),
                span,
            });
        }
        ty
    }

    /// Type of `self` without the initialization check, for member bases.
    pub(super) fn self_value_type(&mut self, span: Span) -> Type {
        match self.scopes.lookup_value("self") {
            Some(var) => var.ty.clone(),
            None => {
                self.report(SemanticError::NotDeclared {
                    kind: "variable",
                    name: "self".to_string(),
                    span,
                });
                Type::Invalid
            }
        }
    }

    // --- Literals ---

    fn check_integer_literal(
        &mut self,
        expr: &Expr,
        value: u128,
        expected: Option<&Type>,
        negated: bool,
    ) -> Type {
        let target = expected
            .map(Type::unwrap_optional)
            .and_then(Type::primitive)
            .filter(|p| p.is_integer());
        let Some(target) = target else {
            return Type::INT;
        };

        let in_range = if negated {
            target.is_signed() && target.integer_max().is_none_or(|max| value <= max + 1)
        } else {
            target.integer_max().is_none_or(|max| value <= max)
        };
        if !in_range {
            let sign = if negated { "-" } else { "" };
            self.report(SemanticError::TypeMismatch {
                expected: target.name().to_string(),
                actual: format!("integer literal {sign}{value}"),
                span: expr.span,
            });
        }
        self.elaboration.mark_same_as_expected(expr.id);
        Type::Primitive(target)
    }

    fn check_fixed_literal(&mut self, expr: &Expr, expected: Option<&Type>, negated: bool) -> Type {
        let target = expected
            .map(Type::unwrap_optional)
            .and_then(Type::primitive)
            .filter(|p| p.is_fixed_point());
        match target {
            Some(target) => {
                if negated && !target.is_signed() {
                    self.report(SemanticError::TypeMismatch {
                        expected: target.name().to_string(),
                        actual: "negative fixed-point literal".to_string(),
                        span: expr.span,
                    });
                }
                self.elaboration.mark_same_as_expected(expr.id);
                Type::Primitive(target)
            }
            None if negated => Type::Primitive(PrimitiveType::Fix64),
            None => Type::Primitive(PrimitiveType::UFix64),
        }
    }

    fn check_array(&mut self, elems: &[Expr], expected: Option<&Type>) -> Type {
        let (expected_elem, size) = match expected.map(Type::unwrap_optional) {
            Some(Type::VariableSized(elem)) => (Some((**elem).clone()), None),
            Some(Type::ConstantSized(elem, size)) => (Some((**elem).clone()), Some(*size)),
            _ => (None, None),
        };
        let mut types = Vec::with_capacity(elems.len());
        for elem in elems {
            let ty = self.check_expression(elem, expected_elem.as_ref());
            self.check_moved_element(elem, &ty);
            types.push(ty);
        }
        let elem = expected_elem.unwrap_or_else(|| self.common_supertype(&types));
        match size {
            Some(size) if size == elems.len() as u64 => Type::ConstantSized(Box::new(elem), size),
            _ => Type::VariableSized(Box::new(elem)),
        }
    }

    fn check_dictionary(&mut self, entries: &[(Expr, Expr)], expected: Option<&Type>) -> Type {
        let (expected_key, expected_value) = match expected.map(Type::unwrap_optional) {
            Some(Type::Dictionary(k, v)) => (Some((**k).clone()), Some((**v).clone())),
            _ => (None, None),
        };
        let mut keys = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let key_ty = self.check_expression(key, expected_key.as_ref());
            if self.is_resource(&key_ty) {
                self.report(SemanticError::TypeMismatch {
                    expected: "AnyStruct".to_string(),
                    actual: self.type_name(&key_ty),
                    span: key.span,
                });
            }
            let value_ty = self.check_expression(value, expected_value.as_ref());
            self.check_moved_element(value, &value_ty);
            keys.push(key_ty);
            values.push(value_ty);
        }
        let key = expected_key.unwrap_or_else(|| self.common_supertype(&keys));
        let value = expected_value.unwrap_or_else(|| self.common_supertype(&values));
        Type::Dictionary(Box::new(key), Box::new(value))
    }

    /// Resources placed into a container must be moved in explicitly.
    fn check_moved_element(&mut self, elem: &Expr, ty: &Type) {
        if self.is_resource(ty) && !matches!(elem.kind, ExprKind::Move(_)) {
            self.report(SemanticError::MissingMoveOperation { span: elem.span });
            self.move_out(elem);
        }
    }

    /// Smallest type of the ones given that all others are subtypes of,
    /// falling back to the matching top type.
    fn common_supertype(&self, types: &[Type]) -> Type {
        let Some((first, rest)) = types.split_first() else {
            return Type::NEVER;
        };
        let mut common = first.clone();
        for ty in rest {
            if is_subtype(&self.registry, ty, &common) {
                continue;
            }
            if is_subtype(&self.registry, &common, ty) {
                common = ty.clone();
                continue;
            }
            return if types.iter().any(|t| self.is_resource(t)) {
                Type::ANY_RESOURCE
            } else {
                Type::ANY_STRUCT
            };
        }
        common
    }

    // --- Indexing ---

    pub(super) fn check_index(&mut self, base: &Type, index: &Expr, span: Span) -> Type {
        let (base, through_reference) = match base {
            Type::Reference { referenced, .. } => (&**referenced, true),
            other => (other, false),
        };
        let result = match base {
            Type::VariableSized(elem) | Type::ConstantSized(elem, _) => {
                let index_ty = self.check_with_hint(index, Some(&Type::INT));
                let integral = index_ty.is_invalid()
                    || index_ty.primitive().is_some_and(PrimitiveType::is_integer);
                if !integral {
                    self.report(SemanticError::TypeMismatch {
                        expected: "Integer".to_string(),
                        actual: self.type_name(&index_ty),
                        span: index.span,
                    });
                }
                (**elem).clone()
            }
            Type::Dictionary(key, value) => {
                let key = (**key).clone();
                self.check_expression(index, Some(&key));
                Type::optional((**value).clone())
            }
            Type::Invalid => {
                self.check_expression(index, None);
                return Type::Invalid;
            }
            other => {
                self.check_expression(index, None);
                self.report(SemanticError::NotIndexable {
                    ty: self.type_name(other),
                    span,
                });
                return Type::Invalid;
            }
        };
        if through_reference && self.is_resource(&result) {
            Type::reference(Authorization::Unauthorized, result)
        } else {
            result
        }
    }

    // --- Operators ---

    fn check_unary(
        &mut self,
        expr: &Expr,
        op: UnaryOp,
        inner: &Expr,
        expected: Option<&Type>,
    ) -> Type {
        match op {
            UnaryOp::Neg => {
                let ty = match &inner.kind {
                    ExprKind::Int(value) => {
                        self.check_integer_literal(inner, *value, expected, true)
                    }
                    ExprKind::Fixed { .. } => self.check_fixed_literal(inner, expected, true),
                    _ => self.check_with_hint(inner, expected),
                };
                self.elaboration.set_expression_type(inner.id, ty.clone());
                let signed = ty
                    .primitive()
                    .is_some_and(|p| p.is_numeric() && p.is_signed());
                // Negated literals already reported a sign mismatch.
                if !ty.is_invalid() && !signed && !is_literal(inner) {
                    self.report(SemanticError::InvalidUnaryOperand {
                        op: "-",
                        ty: self.type_name(&ty),
                        span: expr.span,
                    });
                    return Type::Invalid;
                }
                ty
            }
            UnaryOp::Not => {
                let ty = self.check_with_hint(inner, None);
                if !ty.is_invalid() && ty != Type::BOOL {
                    self.report(SemanticError::InvalidUnaryOperand {
                        op: "!",
                        ty: self.type_name(&ty),
                        span: expr.span,
                    });
                }
                Type::BOOL
            }
        }
    }

    fn check_binary(
        &mut self,
        expr: &Expr,
        left: &Expr,
        op: BinOp,
        right: &Expr,
        expected: Option<&Type>,
    ) -> Type {
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                let (l, r) = self.check_operands(left, right, expected);
                if self.numeric_operands(expr, op, &l, &r) {
                    l
                } else {
                    Type::Invalid
                }
            }
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                let (l, r) = self.check_operands(left, right, None);
                self.numeric_operands(expr, op, &l, &r);
                Type::BOOL
            }
            BinOp::Eq | BinOp::Ne => {
                let (l, r) = self.check_operands(left, right, None);
                let comparable = l.is_invalid()
                    || r.is_invalid()
                    || (!self.is_resource(&l)
                        && !self.is_resource(&r)
                        && (is_subtype(&self.registry, &l, &r)
                            || is_subtype(&self.registry, &r, &l)));
                if !comparable {
                    self.report(SemanticError::InvalidBinaryOperands {
                        op: op.symbol(),
                        left: self.type_name(&l),
                        right: self.type_name(&r),
                        span: expr.span,
                    });
                }
                Type::BOOL
            }
            BinOp::And | BinOp::Or => {
                self.check_expression(left, Some(&Type::BOOL));
                // The right operand only runs on some paths.
                let before = self.snapshot();
                self.check_expression(right, Some(&Type::BOOL));
                self.flow = before.join(&self.flow);
                Type::BOOL
            }
            BinOp::NilCoalesce => self.check_nil_coalescing(expr, left, right, expected),
        }
    }

    /// Checks both operands, letting a literal on either side take the type
    /// of the other side.
    fn check_operands(&mut self, left: &Expr, right: &Expr, hint: Option<&Type>) -> (Type, Type) {
        let numeric_hint = hint
            .filter(|t| t.primitive().is_some_and(PrimitiveType::is_numeric))
            .cloned();
        if is_literal(left) && !is_literal(right) {
            let r = self.check_with_hint(right, numeric_hint.as_ref());
            let l = self.check_with_hint(left, Some(&r));
            (l, r)
        } else {
            let l = self.check_with_hint(left, numeric_hint.as_ref());
            let r = self.check_with_hint(right, Some(&l));
            (l, r)
        }
    }

    fn numeric_operands(&mut self, expr: &Expr, op: BinOp, l: &Type, r: &Type) -> bool {
        if l.is_invalid() || r.is_invalid() {
            return true;
        }
        let numeric = l.primitive().is_some_and(PrimitiveType::is_numeric);
        if numeric && l == r {
            return true;
        }
        self.report(SemanticError::InvalidBinaryOperands {
            op: op.symbol(),
            left: self.type_name(l),
            right: self.type_name(r),
            span: expr.span,
        });
        false
    }

    fn check_nil_coalescing(
        &mut self,
        expr: &Expr,
        left: &Expr,
        right: &Expr,
        expected: Option<&Type>,
    ) -> Type {
        let hint = expected.cloned().map(Type::optional);
        let l = self.check_with_hint(left, hint.as_ref());
        let inner = match &l {
            Type::Optional(inner) => (**inner).clone(),
            Type::Invalid => Type::Invalid,
            other => {
                self.report(SemanticError::InvalidBinaryOperands {
                    op: BinOp::NilCoalesce.symbol(),
                    left: self.type_name(other),
                    right: String::new(),
                    span: expr.span,
                });
                Type::Invalid
            }
        };

        // The right side runs only when the left is nil.
        let before = self.snapshot();
        let hint = if inner.is_never() { expected.cloned() } else { Some(inner.clone()) };
        let r = self.check_with_hint(right, hint.as_ref());
        self.flow = before.join(&self.flow);

        let ty = if inner.is_invalid() || r.is_invalid() {
            Type::Invalid
        } else if is_subtype(&self.registry, &r, &inner) {
            inner
        } else if is_subtype(&self.registry, &inner, &r) {
            r
        } else {
            self.report(SemanticError::TypeMismatch {
                expected: self.type_name(&inner),
                actual: self.type_name(&r),
                span: right.span,
            });
            inner
        };
        self.check_discarded_operands(expr, &ty, &[left, right]);
        ty
    }

    fn check_conditional(
        &mut self,
        expr: &Expr,
        cond: &Expr,
        then: &Expr,
        otherwise: &Expr,
        expected: Option<&Type>,
    ) -> Type {
        self.check_expression(cond, Some(&Type::BOOL));
        let before = self.snapshot();
        let then_ty = self.check_with_hint(then, expected);
        let then_flow = std::mem::replace(&mut self.flow, before);
        let else_ty = self.check_with_hint(otherwise, expected.or(Some(&then_ty)));
        self.flow = then_flow.join(&self.flow);

        let ty = if is_subtype(&self.registry, &else_ty, &then_ty) {
            then_ty
        } else if is_subtype(&self.registry, &then_ty, &else_ty) {
            else_ty
        } else {
            self.report(SemanticError::TypeMismatch {
                expected: self.type_name(&then_ty),
                actual: self.type_name(&else_ty),
                span: otherwise.span,
            });
            then_ty
        };
        self.check_discarded_operands(expr, &ty, &[then, otherwise]);
        ty
    }

    /// A resource chosen between operands that are not plain variables
    /// loses the operand that was not chosen.
    fn check_discarded_operands(&mut self, expr: &Expr, ty: &Type, operands: &[&Expr]) {
        let all_variables = operands.iter().all(|operand| {
            let operand = match &operand.kind {
                ExprKind::Move(inner) => inner,
                _ => *operand,
            };
            matches!(operand.kind, ExprKind::Ident(_))
        });
        if self.is_resource(ty) && !all_variables {
            self.report(SemanticError::ResourceLoss { span: expr.span });
        }
    }

    // --- Casts and references ---

    fn check_cast(&mut self, expr: &Expr, inner: &Expr, kind: CastKind, annot: &ast::TypeAnnot) -> Type {
        let target = self.convert_annotation(annot);
        let inner_ty = match kind {
            CastKind::Static => self.check_expression(inner, Some(&target)),
            CastKind::Failable | CastKind::Force => {
                let inner_ty = self.check_expression(inner, None);
                if !is_valid_dynamic_cast(&self.registry, &inner_ty, &target) {
                    self.report(SemanticError::TypeMismatch {
                        expected: self.type_name(&target),
                        actual: self.type_name(&inner_ty),
                        span: expr.span,
                    });
                }
                let resource = self.is_resource(&inner_ty);
                if kind == CastKind::Failable && resource && self.binding_cast != Some(expr.id) {
                    self.report(
                        SemanticError::InvalidFailableResourceDowncastOutsideOptionalBinding {
                            span: expr.span,
                        },
                    );
                }
                inner_ty
            }
        };

        let redundant = !target.is_invalid()
            && !inner_ty.is_invalid()
            && is_equal(&self.registry, &inner_ty, &target)
            && !self.elaboration.is_same_as_expected(inner.id);
        self.elaboration.add_cast(
            expr.id,
            CastRecord {
                kind,
                target: target.clone(),
                expr_type: inner_ty,
                redundant,
            },
        );
        match kind {
            CastKind::Failable => Type::optional(target),
            CastKind::Static | CastKind::Force => target,
        }
    }

    fn check_reference(&mut self, inner: &Expr, annot: &ast::TypeAnnot) -> Type {
        let target = self.convert_annotation(annot);
        let referenced = match target.unwrap_optional() {
            Type::Reference { referenced, .. } => (**referenced).clone(),
            Type::Invalid => {
                self.check_expression(inner, None);
                return Type::Invalid;
            }
            other => {
                self.report(SemanticError::NonReferenceTypeReference {
                    ty: self.type_name(other),
                    span: annot.span,
                });
                self.check_expression(inner, None);
                return Type::Invalid;
            }
        };
        let expected = if target.is_optional() {
            Type::optional(referenced)
        } else {
            referenced
        };
        self.check_expression(inner, Some(&expected));
        if let ExprKind::Ident(name) = &inner.kind
            && let Some(var) = self.scopes.lookup_value(&name.node)
        {
            let key = ResourceKey::Var(var.id);
            self.flow.resources.mark_referenced(&key);
        }
        target
    }
}

fn is_literal(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Int(_) | ExprKind::Fixed { .. } => true,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            expr,
        } => is_literal(expr),
        _ => false,
    }
}

#![forbid(unsafe_code)]

//! Member access and invocation.

use rustc_hash::FxHashMap;
use sable_ast::{self as ast, CompositeKind, Expr, ExprKind, Ident, VarKind};

use super::{Checker, FunctionKind};
use crate::access::{Access, Receiver};
use crate::error::SemanticError;
use crate::resources::ResourceKey;
use crate::scope::BindingKind;
use crate::subtype::{interface_member, intersection_member, is_equal, is_subtype};
use crate::types::{
    Authorization, CompositeId, FunctionType, MemberInfo, MemberKind, ParamType, PrimitiveType,
    Type,
};

/// A resolved member. Built-in members of arrays, dictionaries, strings
/// and capabilities have no declaring composite and are always accessible.
#[derive(Clone, Debug)]
pub(super) struct FoundMember {
    pub(super) container: Option<CompositeId>,
    pub(super) info: MemberInfo,
}

impl FoundMember {
    pub(super) fn declaration(&self) -> &'static str {
        match self.info.kind {
            MemberKind::Field(_) => "field",
            MemberKind::Function => "function",
            MemberKind::EnumCase => "case",
        }
    }
}

impl Checker<'_> {
    pub(super) fn check_member_expression(
        &mut self,
        expr: &Expr,
        base: &Expr,
        optional: bool,
        member: &Ident,
    ) -> Type {
        let is_self = matches!(base.kind, ExprKind::SelfRef);
        let base_ty = if is_self {
            let ty = self.self_value_type(base.span);
            self.elaboration.set_expression_type(base.id, ty.clone());
            ty
        } else {
            self.check_expression(base, None)
        };
        if base_ty.is_invalid() {
            return Type::Invalid;
        }

        let receiver_ty = if optional {
            match base_ty {
                Type::Optional(inner) => *inner,
                other => {
                    self.report(SemanticError::InvalidOptionalChaining {
                        ty: self.type_name(&other),
                        span: expr.span,
                    });
                    return Type::Invalid;
                }
            }
        } else {
            base_ty
        };
        let (receiver_ty, authorization) = match receiver_ty {
            Type::Reference {
                authorization,
                referenced,
            } => (*referenced, Some(authorization)),
            other => (other, None),
        };

        let Some(found) = self.lookup_member(&receiver_ty, member) else {
            return Type::Invalid;
        };
        if let Some(container) = found.container {
            let receiver = match (&authorization, is_self) {
                (Some(authorization), _) => Receiver::Reference(authorization),
                (None, true) => Receiver::SelfValue,
                (None, false) => Receiver::Owned,
            };
            let readable = self.access_context().can_read_member(
                &self.registry,
                container,
                &found.info.access,
                receiver,
            );
            if !readable {
                self.report(SemanticError::InvalidAccess {
                    name: member.node.clone(),
                    declaration: found.declaration().to_string(),
                    access: found.info.access.describe(&self.registry),
                    span: member.span,
                });
            }
        }
        if is_self {
            self.check_self_member_use(base, member, &found);
        }

        let mut ty = found.info.ty;
        if authorization.is_some() && found.container.is_some() && self.is_resource(&ty) {
            ty = Type::reference(Authorization::Unauthorized, ty);
        }
        if optional && !ty.is_optional() {
            ty = Type::optional(ty);
        }
        ty
    }

    /// Initialization and destruction rules for `self.member`.
    fn check_self_member_use(&mut self, base: &Expr, member: &Ident, found: &FoundMember) {
        let Some(kind) = self.current_function().map(|context| context.kind) else {
            return;
        };
        match kind {
            FunctionKind::Initializer => {
                let Some(fields) = &self.flow.fields else {
                    return;
                };
                if found.info.is_field() && !fields.is_initialized(&member.node) {
                    self.report(SemanticError::UninitializedFieldAccess {
                        name: member.node.clone(),
                        span: member.span,
                    });
                } else if found.info.kind == MemberKind::Function && !fields.all_initialized() {
                    self.report(SemanticError::UninitializedUse {
                        name: "self".to_string(),
                        span: base.span,
                    });
                }
            }
            FunctionKind::Destructor if found.info.is_field() => {
                let key = ResourceKey::SelfField(member.node.clone());
                self.check_resource_use(&key, &member.node, member.span);
            }
            FunctionKind::Destructor | FunctionKind::Function => {}
        }
    }

    /// Resolves `member` on a value of type `ty`, reporting it when absent.
    pub(super) fn lookup_member(&mut self, ty: &Type, member: &Ident) -> Option<FoundMember> {
        let name = member.node.as_str();
        let found = match ty {
            Type::Invalid => return None,
            Type::Composite(id) => self.composite_member(*id, name),
            Type::Interface(id) => {
                interface_member(&self.registry, *id, name).map(|(container, info)| FoundMember {
                    container: Some(container),
                    info: info.clone(),
                })
            }
            Type::Intersection(set) => {
                intersection_member(&self.registry, set, name).map(|(container, info)| {
                    FoundMember {
                        container: Some(container),
                        info: info.clone(),
                    }
                })
            }
            other => builtin_member(other, member),
        };
        if found.is_none() {
            self.report(SemanticError::NotDeclaredMember {
                name: name.to_string(),
                ty: self.type_name(ty),
                span: member.span,
            });
        }
        found
    }

    fn composite_member(&self, id: CompositeId, name: &str) -> Option<FoundMember> {
        let record = self.registry.composite(id);
        if let Some(info) = record.member(name) {
            return Some(FoundMember {
                container: Some(id),
                info: info.clone(),
            });
        }
        // Default implementations inherited from interfaces.
        for interface in self.registry.all_conformances(id) {
            if self.default_functions.contains(&(interface, name.to_string()))
                && let Some(info) = self.registry.composite(interface).member(name)
            {
                return Some(FoundMember {
                    container: Some(interface),
                    info: info.clone(),
                });
            }
        }
        // `C.R` names the constructor or singleton of a nested declaration.
        if let Some(nested) = self.nested_composite(id, name)
            && let Some((ty, binding, _)) = self.composite_value(nested)
        {
            let nested_record = self.registry.composite(nested);
            let kind = match binding {
                BindingKind::Constructor => MemberKind::Function,
                _ => MemberKind::Field(VarKind::Let),
            };
            return Some(FoundMember {
                container: Some(id),
                info: MemberInfo {
                    name: name.to_string(),
                    access: nested_record.access.clone(),
                    kind,
                    ty,
                    span: nested_record.span,
                },
            });
        }
        if record.kind == CompositeKind::Enum && name == "rawValue" {
            let ty = record.enum_raw.clone().unwrap_or(Type::INT);
            return Some(FoundMember {
                container: None,
                info: MemberInfo {
                    name: name.to_string(),
                    access: Access::ALL,
                    kind: MemberKind::Field(VarKind::Let),
                    ty,
                    span: record.span,
                },
            });
        }
        None
    }

    // --- Invocation ---

    pub(super) fn check_call(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        type_args: &[ast::TypeAnnot],
        args: &[ast::Argument],
        is_create: bool,
    ) -> Type {
        let callee_ty = self.check_expression(callee, None);
        match self.constructed_composite(callee, &callee_ty) {
            Some(id) => {
                let record = self.registry.composite(id);
                let (is_resource, name) = (record.is_resource, record.qualified_name.clone());
                if is_resource && !is_create {
                    self.report(SemanticError::MissingCreate { span: expr.span });
                } else if !is_resource && is_create {
                    self.report(SemanticError::InvalidConstruction {
                        name,
                        span: expr.span,
                    });
                }
            }
            None if is_create && !callee_ty.is_invalid() => {
                self.report(SemanticError::InvalidConstruction {
                    name: self.type_name(&callee_ty),
                    span: expr.span,
                });
            }
            None => {}
        }

        let fun = match callee_ty {
            Type::Function(fun) => *fun,
            other => {
                if !other.is_invalid() {
                    self.report(SemanticError::NotCallable {
                        ty: self.type_name(&other),
                        span: callee.span,
                    });
                }
                for arg in args {
                    self.check_expression(&arg.value, None);
                }
                return Type::Invalid;
            }
        };

        let mut bindings: FxHashMap<String, Type> = FxHashMap::default();
        if !type_args.is_empty() {
            if type_args.len() == fun.type_params.len() {
                for (name, annot) in fun.type_params.iter().zip(type_args) {
                    let ty = self.convert_annotation(annot);
                    bindings.insert(name.clone(), ty);
                }
            } else {
                self.report(SemanticError::InvalidTypeArgumentCount {
                    expected: fun.type_params.len(),
                    actual: type_args.len(),
                    span: expr.span,
                });
            }
        }

        if args.len() != fun.params.len() {
            self.report(SemanticError::ArgumentCount {
                expected: fun.params.len(),
                actual: args.len(),
                span: expr.span,
            });
        }
        let generic = !fun.type_params.is_empty();
        for (arg, param) in args.iter().zip(&fun.params) {
            self.check_argument_label(arg, param);
            self.check_argument(arg, &param.ty, generic, &mut bindings);
        }
        for arg in args.iter().skip(fun.params.len()) {
            self.check_expression(&arg.value, None);
        }

        if !generic {
            return fun.ret;
        }
        let mut inferred = true;
        for param in &fun.type_params {
            if !bindings.contains_key(param) {
                inferred = false;
                self.report(SemanticError::TypeParameterTypeInference {
                    name: param.clone(),
                    span: expr.span,
                });
            }
        }
        if inferred {
            substitute(&fun.ret, &bindings)
        } else {
            Type::Invalid
        }
    }

    /// The composite a call constructs, if the callee is a constructor.
    fn constructed_composite(&self, callee: &Expr, callee_ty: &Type) -> Option<CompositeId> {
        let Type::Function(fun) = callee_ty else {
            return None;
        };
        let Type::Composite(id) = &fun.ret else {
            return None;
        };
        let id = *id;
        let is_constructor = match &callee.kind {
            ExprKind::Ident(name) => self
                .scopes
                .lookup_value(&name.node)
                .is_some_and(|var| var.binding == BindingKind::Constructor),
            ExprKind::Member { base, member, .. } => match self.elaboration.expression_type(base.id) {
                Some(Type::Composite(container)) => {
                    self.nested_composite(*container, &member.node) == Some(id)
                }
                _ => false,
            },
            _ => false,
        };
        is_constructor.then_some(id)
    }

    fn check_argument_label(&mut self, arg: &ast::Argument, param: &ParamType) {
        match (&param.label, &arg.label) {
            (Some(expected), None) => self.report(SemanticError::MissingArgumentLabel {
                label: expected.clone(),
                span: arg.span,
            }),
            (Some(expected), Some(actual)) if *expected != actual.node => {
                self.report(SemanticError::IncorrectArgumentLabel {
                    expected: expected.clone(),
                    actual: actual.node.clone(),
                    span: actual.span,
                })
            }
            (None, Some(actual)) => self.report(SemanticError::IncorrectArgumentLabel {
                expected: "_".to_string(),
                actual: actual.node.clone(),
                span: actual.span,
            }),
            _ => {}
        }
    }

    fn check_argument(
        &mut self,
        arg: &ast::Argument,
        param_ty: &Type,
        generic: bool,
        bindings: &mut FxHashMap<String, Type>,
    ) {
        let param_ty = substitute_partial(param_ty, bindings);
        let ty = if generic && mentions_generic(&param_ty) {
            let ty = self.check_expression(&arg.value, None);
            if !self.unify(&param_ty, &ty, bindings) {
                self.report(SemanticError::TypeMismatch {
                    expected: self.type_name(&substitute_partial(&param_ty, bindings)),
                    actual: self.type_name(&ty),
                    span: arg.value.span,
                });
            }
            ty
        } else {
            self.check_expression(&arg.value, Some(&param_ty))
        };
        if self.is_resource(&ty) && !matches!(arg.value.kind, ExprKind::Move(_)) {
            self.report(SemanticError::MissingMoveOperation {
                span: arg.value.span,
            });
            self.move_out(&arg.value);
        }
    }

    /// Binds the type parameters in `param` from `arg`; false on a conflict.
    fn unify(&self, param: &Type, arg: &Type, bindings: &mut FxHashMap<String, Type>) -> bool {
        match (param, arg) {
            (Type::Generic(name), _) => match bindings.get(name) {
                Some(bound) => is_subtype(&self.registry, arg, bound),
                None => {
                    bindings.insert(name.clone(), arg.clone());
                    true
                }
            },
            (Type::Optional(p), Type::Optional(a))
            | (Type::VariableSized(p), Type::VariableSized(a))
            | (Type::ConstantSized(p, _), Type::ConstantSized(a, _)) => self.unify(p, a, bindings),
            (Type::Optional(p), a) => self.unify(p, a, bindings),
            (Type::Dictionary(pk, pv), Type::Dictionary(ak, av)) => {
                self.unify(pk, ak, bindings) && self.unify(pv, av, bindings)
            }
            (_, Type::Invalid) => true,
            _ => is_equal(&self.registry, param, arg) || is_subtype(&self.registry, arg, param),
        }
    }
}

/// Members every array, dictionary, string or capability has.
fn builtin_member(ty: &Type, member: &Ident) -> Option<FoundMember> {
    let field = |ty: Type| (MemberKind::Field(VarKind::Let), ty);
    let function = |params: Vec<(Option<&str>, Type)>, ret: Type| {
        let params = params
            .into_iter()
            .map(|(label, ty)| ParamType {
                label: label.map(str::to_string),
                name: label.unwrap_or("value").to_string(),
                ty,
            })
            .collect();
        (MemberKind::Function, Type::function(params, ret))
    };
    let (kind, ty) = match (ty, member.node.as_str()) {
        (Type::VariableSized(_) | Type::ConstantSized(..), "length") => field(Type::INT),
        (Type::VariableSized(elem), "append") => function(vec![(None, (**elem).clone())], Type::VOID),
        (Type::VariableSized(elem), "remove") => {
            function(vec![(Some("at"), Type::INT)], (**elem).clone())
        }
        (Type::VariableSized(elem) | Type::ConstantSized(elem, _), "contains") => {
            function(vec![(None, (**elem).clone())], Type::BOOL)
        }
        (Type::Dictionary(..), "length") => field(Type::INT),
        (Type::Dictionary(key, _), "keys") => field(Type::VariableSized(key.clone())),
        (Type::Dictionary(_, value), "values") => field(Type::VariableSized(value.clone())),
        (Type::Dictionary(key, value), "remove") => function(
            vec![(Some("key"), (**key).clone())],
            Type::optional((**value).clone()),
        ),
        (Type::Dictionary(key, value), "insert") => function(
            vec![(Some("key"), (**key).clone()), (None, (**value).clone())],
            Type::optional((**value).clone()),
        ),
        (Type::Primitive(PrimitiveType::String), "length") => field(Type::INT),
        (Type::Primitive(PrimitiveType::String), "utf8") => field(Type::VariableSized(Box::new(
            Type::Primitive(PrimitiveType::UInt8),
        ))),
        (Type::Primitive(PrimitiveType::String), "concat") => {
            function(vec![(None, Type::STRING)], Type::STRING)
        }
        (Type::Capability(Some(borrow)), "borrow") => {
            function(Vec::new(), Type::optional((**borrow).clone()))
        }
        (Type::Capability(Some(_)), "check") => function(Vec::new(), Type::BOOL),
        (Type::Capability(_), "address") => field(Type::Primitive(PrimitiveType::Address)),
        _ => return None,
    };
    Some(FoundMember {
        container: None,
        info: MemberInfo {
            name: member.node.clone(),
            access: Access::ALL,
            kind,
            ty,
            span: member.span,
        },
    })
}

fn mentions_generic(ty: &Type) -> bool {
    match ty {
        Type::Generic(_) => true,
        Type::Optional(t) | Type::VariableSized(t) | Type::ConstantSized(t, _) => {
            mentions_generic(t)
        }
        Type::Dictionary(k, v) => mentions_generic(k) || mentions_generic(v),
        Type::Reference { referenced, .. } => mentions_generic(referenced),
        Type::Function(f) => f.params.iter().any(|p| mentions_generic(&p.ty)) || mentions_generic(&f.ret),
        Type::Capability(Some(b)) => mentions_generic(b),
        _ => false,
    }
}

/// Replaces bound type parameters, leaving unbound ones in place.
fn substitute_partial(ty: &Type, bindings: &FxHashMap<String, Type>) -> Type {
    match ty {
        Type::Generic(name) => bindings.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Optional(t) => Type::optional(substitute_partial(t, bindings)),
        Type::VariableSized(t) => Type::VariableSized(Box::new(substitute_partial(t, bindings))),
        Type::ConstantSized(t, n) => {
            Type::ConstantSized(Box::new(substitute_partial(t, bindings)), *n)
        }
        Type::Dictionary(k, v) => Type::Dictionary(
            Box::new(substitute_partial(k, bindings)),
            Box::new(substitute_partial(v, bindings)),
        ),
        Type::Reference {
            authorization,
            referenced,
        } => Type::reference(authorization.clone(), substitute_partial(referenced, bindings)),
        Type::Function(f) => Type::Function(Box::new(FunctionType {
            type_params: f.type_params.clone(),
            params: f
                .params
                .iter()
                .map(|p| ParamType {
                    ty: substitute_partial(&p.ty, bindings),
                    ..p.clone()
                })
                .collect(),
            ret: substitute_partial(&f.ret, bindings),
        })),
        Type::Capability(Some(b)) => Type::Capability(Some(Box::new(substitute_partial(b, bindings)))),
        other => other.clone(),
    }
}

/// Like [`substitute_partial`]; anything still generic becomes invalid.
fn substitute(ty: &Type, bindings: &FxHashMap<String, Type>) -> Type {
    let ty = substitute_partial(ty, bindings);
    if mentions_generic(&ty) { Type::Invalid } else { ty }
}

#![forbid(unsafe_code)]

//! Conversion of type annotations and access modifiers into checker types.

use std::collections::BTreeSet;

use sable_ast::{self as ast, Ident, Span, TypeAnnot, TypeExpr};

use super::Checker;
use crate::access::{
    Access, AccessViolation, DeclarationKind, DeclarationSite, PrimitiveAccess,
    check_declaration_access,
};
use crate::error::SemanticError;
use crate::subtype::find_member_clash;
use crate::types::{
    Authorization, CompositeId, EntitlementId, EntitlementSet, ParamType, PrimitiveType, Type,
};

impl Checker<'_> {
    /// Converts a full annotation and checks its `@` marker.
    pub(super) fn convert_annotation(&mut self, annot: &TypeAnnot) -> Type {
        let ty = self.convert_type_expr(&annot.ty);
        if ty.is_invalid() {
            return ty;
        }
        let is_resource = self.is_resource(&ty);
        if is_resource && !annot.is_resource {
            self.report(SemanticError::MissingResourceAnnotation { span: annot.span });
        } else if !is_resource && annot.is_resource {
            self.report(SemanticError::InvalidResourceAnnotation { span: annot.span });
        }
        ty
    }

    /// Element annotations of arrays and dictionaries share the outer
    /// marker; only a stray inner `@` is an error.
    fn convert_element(&mut self, annot: &TypeAnnot) -> Type {
        let ty = self.convert_type_expr(&annot.ty);
        if annot.is_resource && !ty.is_invalid() && !self.is_resource(&ty) {
            self.report(SemanticError::InvalidResourceAnnotation { span: annot.span });
        }
        ty
    }

    pub(super) fn convert_type_expr(&mut self, ty: &TypeExpr) -> Type {
        match ty {
            TypeExpr::Named(name) => self.resolve_type_name(name),
            TypeExpr::Instantiation { span, base, args } => {
                let resolved = self.resolve_type_name(base);
                if !matches!(resolved, Type::Capability(_)) {
                    if !resolved.is_invalid() {
                        self.report(SemanticError::InvalidTypeArgumentCount {
                            expected: 0,
                            actual: args.len(),
                            span: *span,
                        });
                    }
                    return Type::Invalid;
                }
                match args.as_slice() {
                    [borrow] => {
                        let borrow = self.convert_annotation(borrow);
                        Type::Capability(Some(Box::new(borrow)))
                    }
                    _ => {
                        self.report(SemanticError::InvalidTypeArgumentCount {
                            expected: 1,
                            actual: args.len(),
                            span: *span,
                        });
                        Type::Invalid
                    }
                }
            }
            TypeExpr::Optional { inner, .. } => Type::optional(self.convert_type_expr(inner)),
            TypeExpr::VariableSized { elem, .. } => {
                Type::VariableSized(Box::new(self.convert_element(elem)))
            }
            TypeExpr::ConstantSized { elem, size, .. } => {
                Type::ConstantSized(Box::new(self.convert_element(elem)), *size)
            }
            TypeExpr::Dictionary { key, value, .. } => {
                let key = self.convert_element(key);
                let value = self.convert_element(value);
                Type::Dictionary(Box::new(key), Box::new(value))
            }
            TypeExpr::Function { params, ret, .. } => {
                let params = params
                    .iter()
                    .map(|p| ParamType {
                        label: None,
                        name: String::new(),
                        ty: self.convert_annotation(p),
                    })
                    .collect();
                let ret = self.convert_annotation(ret);
                Type::function(params, ret)
            }
            TypeExpr::Reference {
                auth, referenced, ..
            } => {
                let authorization = match auth {
                    Some(auth) => self.convert_authorization(auth),
                    None => Authorization::Unauthorized,
                };
                let referenced = self.convert_type_expr(referenced);
                Type::reference(authorization, referenced)
            }
            TypeExpr::Intersection { span, types } => self.convert_intersection(types, *span),
        }
    }

    /// Primitive names, then scoped names, then `Outer.Inner` paths.
    pub(super) fn resolve_type_name(&mut self, name: &Ident) -> Type {
        if let Some(primitive) = PrimitiveType::from_name(&name.node) {
            return Type::Primitive(primitive);
        }
        if name.node == "Capability" {
            return Type::Capability(None);
        }
        if let Some(ty) = self.lookup_type_path(&name.node) {
            return ty;
        }
        self.report(SemanticError::NotDeclared {
            kind: "type",
            name: name.node.clone(),
            span: name.span,
        });
        Type::Invalid
    }

    fn lookup_type_path(&self, path: &str) -> Option<Type> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut ty = self.scopes.lookup_type(first)?.clone();
        for part in parts {
            let (Type::Composite(id) | Type::Interface(id)) = ty else {
                return None;
            };
            let nested = self
                .registry
                .composite(id)
                .nested
                .iter()
                .copied()
                .find(|n| self.registry.composite(*n).name == part)?;
            ty = self.composite_type(nested);
        }
        Some(ty)
    }

    /// Finds a nested composite of `container` by name.
    pub(super) fn nested_composite(&self, container: CompositeId, name: &str) -> Option<CompositeId> {
        self.registry
            .composite(container)
            .nested
            .iter()
            .copied()
            .find(|n| self.registry.composite(*n).name == name)
    }

    fn convert_intersection(&mut self, types: &[Ident], span: Span) -> Type {
        if types.is_empty() {
            self.report(SemanticError::AmbiguousIntersectionType { span });
            return Type::Invalid;
        }

        let mut set = BTreeSet::new();
        let mut invalid = false;
        for name in types {
            match self.resolve_type_name(name) {
                Type::Interface(id) => {
                    if !set.insert(id) {
                        self.report(SemanticError::InvalidIntersectionTypeDuplicate {
                            name: name.node.clone(),
                            span: name.span,
                        });
                    }
                }
                Type::Invalid => invalid = true,
                other => {
                    self.report(SemanticError::InvalidIntersectedType {
                        name: self.type_name(&other),
                        span: name.span,
                    });
                    invalid = true;
                }
            }
        }
        if invalid {
            return Type::Invalid;
        }

        let mut kinds = set.iter().map(|id| self.registry.composite(*id).is_resource);
        if let Some(first) = kinds.next()
            && kinds.any(|k| k != first)
        {
            self.report(SemanticError::IntersectionCompositeKindMismatch { span });
            return Type::Invalid;
        }

        match &mut self.pending_intersections {
            // Members are not all known yet; checked once signatures are.
            Some(pending) => pending.push((set.clone(), span)),
            None => self.check_intersection_members(&set, span),
        }
        Type::Intersection(set)
    }

    pub(super) fn check_intersection_members(&mut self, set: &BTreeSet<CompositeId>, span: Span) {
        if let Some(clash) = find_member_clash(&self.registry, set.iter().copied()) {
            self.report(SemanticError::IntersectionMemberClash {
                member: clash.member,
                first: self.registry.composite(clash.first).qualified_name.clone(),
                second: self.registry.composite(clash.second).qualified_name.clone(),
                span,
            });
        }
    }

    fn convert_authorization(&mut self, auth: &ast::Authorization) -> Authorization {
        let set = self.resolve_entitlements(&auth.entitlements);
        Authorization::Entitlements(EntitlementSet {
            kind: auth.kind,
            set,
        })
    }

    fn resolve_entitlements(&mut self, names: &[Ident]) -> BTreeSet<EntitlementId> {
        let mut set = BTreeSet::new();
        for name in names {
            match self.lookup_entitlement(&name.node) {
                Some(id) => {
                    set.insert(id);
                }
                None => self.report(SemanticError::NotDeclared {
                    kind: "entitlement",
                    name: name.node.clone(),
                    span: name.span,
                }),
            }
        }
        set
    }

    /// Innermost enclosing declaration first, then the program level.
    fn lookup_entitlement(&self, name: &str) -> Option<EntitlementId> {
        self.containers
            .iter()
            .rev()
            .map(|c| self.qualified_name(Some(*c), name))
            .chain(std::iter::once(name.to_string()))
            .find_map(|qualified| self.entitlements.get(&qualified).copied())
    }

    /// The access a modifier grants. Entitlements that do not resolve have
    /// already been reported; the member then counts as public.
    pub(super) fn convert_access(&mut self, modifier: &ast::AccessModifier) -> Access {
        match &modifier.access {
            ast::Access::Entitlements { kind, names } => {
                let set = self.resolve_entitlements(names);
                if set.is_empty() {
                    Access::ALL
                } else {
                    Access::Entitlements(EntitlementSet { kind: *kind, set })
                }
            }
            other => Access::Primitive(primitive_access(other)),
        }
    }

    /// Declaration-site modifier rules.
    pub(super) fn check_access_modifier(
        &mut self,
        modifier: &ast::AccessModifier,
        kind: DeclarationKind,
        is_local: bool,
        is_member: bool,
    ) {
        let shape = match &modifier.access {
            ast::Access::Entitlements { kind, .. } => Access::Entitlements(EntitlementSet {
                kind: *kind,
                set: BTreeSet::new(),
            }),
            other => Access::Primitive(primitive_access(other)),
        };
        let site = DeclarationSite {
            kind,
            is_local,
            is_member,
        };
        match check_declaration_access(&shape, site, self.config.access_check_mode) {
            None => {}
            Some(AccessViolation::Invalid { explanation }) => {
                self.report(SemanticError::InvalidAccessModifier {
                    declaration: kind.name().to_string(),
                    access: modifier.access.keyword(),
                    explanation: explanation.to_string(),
                    span: modifier.span,
                });
            }
            Some(AccessViolation::Missing) => {
                self.report(SemanticError::MissingAccessModifier {
                    declaration: kind.name().to_string(),
                    span: modifier.span,
                });
            }
        }
    }

    /// Parameter list of a declaration, labels included.
    pub(super) fn convert_params(&mut self, params: &[ast::Param]) -> Vec<ParamType> {
        params
            .iter()
            .map(|p| ParamType {
                label: p.label.as_ref().map(|l| l.node.clone()),
                name: p.name.node.clone(),
                ty: self.convert_annotation(&p.ty),
            })
            .collect()
    }

    pub(super) fn convert_return(&mut self, ret: Option<&TypeAnnot>) -> Type {
        match ret {
            Some(annot) => self.convert_annotation(annot),
            None => Type::VOID,
        }
    }
}

fn primitive_access(access: &ast::Access) -> PrimitiveAccess {
    match access {
        ast::Access::NotSpecified => PrimitiveAccess::NotSpecified,
        ast::Access::Private => PrimitiveAccess::Private,
        ast::Access::Contract => PrimitiveAccess::Contract,
        ast::Access::Account => PrimitiveAccess::Account,
        ast::Access::All => PrimitiveAccess::All,
        ast::Access::AllSettable => PrimitiveAccess::AllSettable,
        // Entitlement sets are handled by the callers.
        ast::Access::Entitlements { .. } => PrimitiveAccess::All,
    }
}

#![forbid(unsafe_code)]

//! Registration of type declarations, signature resolution and the
//! per-declaration checks that do not descend into function bodies.

use sable_ast::{self as ast, CompositeDecl, CompositeKind, Decl, Member, VarKind};
use tracing::{debug, instrument};

use super::{Checker, FunctionKind};
use crate::access::{Access, DeclarationKind};
use crate::elaboration::{GlobalType, ValueKind};
use crate::error::SemanticError;
use crate::scope::BindingKind;
use crate::subtype::{check_conformance, find_member_clash};
use crate::types::{
    CompositeId, CompositeType, EntitlementType, FunctionType, MemberInfo, MemberKind, ParamType,
    PrimitiveType, Type,
};

impl Checker<'_> {
    // --- Pass 1: registration ---

    pub(super) fn declare_type_decl(&mut self, decl: &Decl, container: Option<CompositeId>) {
        match decl {
            Decl::Composite(c) => self.declare_composite(c, container),
            Decl::Entitlement(e) => self.declare_entitlement(e, container),
            Decl::Function(_) | Decl::Variable(_) => {}
        }
    }

    fn declare_composite(&mut self, c: &CompositeDecl, container: Option<CompositeId>) {
        if c.kind == CompositeKind::Attachment && !self.config.attachments_enabled {
            self.report(SemanticError::AttachmentsNotEnabled { span: c.span });
            self.skipped.insert(c.id);
            return;
        }
        if let Some(outer) = container
            && self.registry.composite(outer).kind != CompositeKind::Contract
        {
            self.report(SemanticError::InvalidNestedDeclaration {
                nested: c.kind.keyword().to_string(),
                container: self.registry.composite(outer).kind.keyword().to_string(),
                span: c.name.span,
            });
            self.skipped.insert(c.id);
            return;
        }

        let name = c.name.node.clone();
        let id = self.registry.add_composite(CompositeType {
            location: self.config.location.clone(),
            qualified_name: self.qualified_name(container, &name),
            name: name.clone(),
            kind: c.kind,
            is_interface: c.is_interface,
            is_resource: c.kind == CompositeKind::Resource,
            access: Access::NOT_SPECIFIED,
            conformances: Vec::new(),
            members: Vec::new(),
            container,
            nested: Vec::new(),
            init: None,
            has_destructor: false,
            base: None,
            enum_raw: None,
            span: c.name.span,
        });
        self.composite_ids.insert(c.id, id);

        // A duplicate is still registered so its body gets checked, but the
        // name keeps referring to the first declaration.
        if self.check_type_name_available(&c.name, container) {
            match container {
                Some(outer) => self.registry.composite_mut(outer).nested.push(id),
                None => {
                    self.scopes.declare_type(&name, self.composite_type(id));
                    let global = if c.is_interface {
                        GlobalType::Interface(id)
                    } else {
                        GlobalType::Composite(id)
                    };
                    self.elaboration.add_global_type(name, global);
                }
            }
        }

        for member in &c.members {
            if let Member::Nested(nested) = member {
                self.declare_type_decl(nested, Some(id));
            }
        }
    }

    fn declare_entitlement(&mut self, e: &ast::EntitlementDecl, container: Option<CompositeId>) {
        if let Some(outer) = container
            && self.registry.composite(outer).kind != CompositeKind::Contract
        {
            self.report(SemanticError::InvalidNestedDeclaration {
                nested: "entitlement".to_string(),
                container: self.registry.composite(outer).kind.keyword().to_string(),
                span: e.name.span,
            });
            return;
        }
        let qualified = self.qualified_name(container, &e.name.node);
        if let Some(previous) = self.entitlements.get(&qualified) {
            let previous = self.registry.entitlement(*previous).span;
            self.report(SemanticError::Redeclaration {
                kind: "entitlement",
                name: e.name.node.clone(),
                span: e.name.span,
                previous: Some(previous),
            });
            return;
        }
        let access = self.convert_access(&e.access);
        let id = self.registry.add_entitlement(EntitlementType {
            location: self.config.location.clone(),
            qualified_name: qualified.clone(),
            name: e.name.node.clone(),
            access,
            span: e.name.span,
        });
        self.entitlements.insert(qualified, id);
        if container.is_none() {
            self.elaboration
                .add_global_type(e.name.node.clone(), GlobalType::Entitlement(id));
        }
    }

    /// Built-in names and names already declared at the same level are taken.
    fn check_type_name_available(&mut self, name: &ast::Ident, container: Option<CompositeId>) -> bool {
        if PrimitiveType::from_name(&name.node).is_some() || name.node == "Capability" {
            self.report(SemanticError::Redeclaration {
                kind: "type",
                name: name.node.clone(),
                span: name.span,
                previous: None,
            });
            return false;
        }
        let previous = match container {
            Some(outer) => self
                .nested_composite(outer, &name.node)
                .map(|id| Some(self.registry.composite(id).span)),
            None => self.scopes.lookup_type(&name.node).map(|ty| match ty {
                Type::Composite(id) | Type::Interface(id) => Some(self.registry.composite(*id).span),
                _ => None,
            }),
        };
        match previous {
            None => true,
            Some(previous) => {
                self.report(SemanticError::Redeclaration {
                    kind: "type",
                    name: name.node.clone(),
                    span: name.span,
                    previous,
                });
                false
            }
        }
    }

    // --- Pass 2: signatures ---

    pub(super) fn resolve_signatures(&mut self, decls: &[Decl]) {
        self.pending_intersections = Some(Vec::new());
        for decl in decls {
            if let Decl::Composite(c) = decl {
                self.resolve_composite_signature(c);
            }
        }
        let pending = self.pending_intersections.take().unwrap_or_default();
        for (set, span) in pending {
            self.check_intersection_members(&set, span);
        }
        debug!("signatures resolved");
    }

    fn resolve_composite_signature(&mut self, c: &CompositeDecl) {
        let Some(&id) = self.composite_ids.get(&c.id) else {
            return;
        };

        let access = self.convert_access(&c.access);
        self.registry.composite_mut(id).access = access;

        let mut conformances = c.conformances.as_slice();
        if c.kind == CompositeKind::Enum
            && let Some((raw, rest)) = conformances.split_first()
        {
            conformances = rest;
            let raw_ty = self.resolve_type_name(raw);
            let valid = raw_ty.primitive().is_some_and(PrimitiveType::is_integer);
            if !valid && !raw_ty.is_invalid() {
                self.report(SemanticError::InvalidEnumRawType {
                    ty: self.type_name(&raw_ty),
                    span: raw.span,
                });
            }
            self.registry.composite_mut(id).enum_raw = Some(raw_ty);
        }
        self.resolve_conformances(id, c, conformances);

        if let Some(base) = &c.base {
            let base_ty = self.convert_type_expr(&base.ty);
            let is_resource = self.is_resource(&base_ty);
            let record = self.registry.composite_mut(id);
            record.is_resource = is_resource;
            record.base = Some(base_ty);
        }

        self.enter_composite(id);
        for member in &c.members {
            self.resolve_member_signature(id, c, member);
        }
        self.exit_composite();
    }

    fn resolve_conformances(&mut self, id: CompositeId, c: &CompositeDecl, names: &[ast::Ident]) {
        for name in names {
            match self.resolve_type_name(name) {
                Type::Interface(interface) => {
                    let interface_kind = self.registry.composite(interface).kind;
                    if interface_kind != c.kind {
                        self.report(SemanticError::CompositeKindMismatch {
                            expected: c.kind.keyword().to_string(),
                            actual: interface_kind.keyword().to_string(),
                            span: name.span,
                        });
                        continue;
                    }
                    let record = self.registry.composite_mut(id);
                    if record.conformances.contains(&interface) {
                        self.report(SemanticError::DuplicateConformance {
                            composite: c.name.node.clone(),
                            interface: name.node.clone(),
                            span: name.span,
                        });
                    } else {
                        record.conformances.push(interface);
                    }
                }
                Type::Invalid => {}
                other => self.report(SemanticError::InvalidConformance {
                    name: self.type_name(&other),
                    span: name.span,
                }),
            }
        }
    }

    fn resolve_member_signature(&mut self, id: CompositeId, c: &CompositeDecl, member: &Member) {
        match member {
            Member::Field(f) => {
                let access = self.convert_access(&f.access);
                let ty = self.convert_annotation(&f.ty);
                self.elaboration.set_declaration_type(f.id, ty.clone());
                self.add_member(
                    id,
                    MemberInfo {
                        name: f.name.node.clone(),
                        access,
                        kind: MemberKind::Field(f.kind),
                        ty,
                        span: f.name.span,
                    },
                );
            }
            Member::Function(fd) => {
                let access = self.convert_access(&fd.access);
                let fun = self.convert_function_signature(&fd.type_params, &fd.params, fd.ret.as_ref());
                let ty = Type::Function(Box::new(fun));
                self.elaboration.set_declaration_type(fd.id, ty.clone());
                if c.is_interface && fd.body.is_some() {
                    self.default_functions.insert((id, fd.name.node.clone()));
                }
                self.add_member(
                    id,
                    MemberInfo {
                        name: fd.name.node.clone(),
                        access,
                        kind: MemberKind::Function,
                        ty,
                        span: fd.name.span,
                    },
                );
            }
            Member::Init(init) => {
                let params = self.convert_params(&init.params);
                self.elaboration
                    .set_declaration_type(init.id, Type::function(params.clone(), Type::VOID));
                if c.kind == CompositeKind::Event {
                    for (param, ast_param) in params.iter().zip(&init.params) {
                        self.add_member(
                            id,
                            MemberInfo {
                                name: param.name.clone(),
                                access: Access::ALL,
                                kind: MemberKind::Field(VarKind::Let),
                                ty: param.ty.clone(),
                                span: ast_param.name.span,
                            },
                        );
                    }
                }
                let record = self.registry.composite_mut(id);
                if record.init.is_none() {
                    record.init = Some(params);
                }
            }
            Member::Destroy(_) => self.registry.composite_mut(id).has_destructor = true,
            Member::Case(case) => {
                let access = self.convert_access(&case.access);
                self.add_member(
                    id,
                    MemberInfo {
                        name: case.name.node.clone(),
                        access,
                        kind: MemberKind::EnumCase,
                        ty: Type::Composite(id),
                        span: case.name.span,
                    },
                );
            }
            Member::Nested(Decl::Composite(nested)) => self.resolve_composite_signature(nested),
            Member::Nested(_) => {}
        }
    }

    fn add_member(&mut self, id: CompositeId, member: MemberInfo) {
        if let Some(previous) = self.registry.composite(id).member(&member.name) {
            let previous = previous.span;
            self.report(SemanticError::Redeclaration {
                kind: "member",
                name: member.name,
                span: member.span,
                previous: Some(previous),
            });
            return;
        }
        self.registry.composite_mut(id).members.push(member);
    }

    /// Type parameters are in scope while the signature is converted.
    pub(super) fn convert_function_signature(
        &mut self,
        type_params: &[ast::Ident],
        params: &[ast::Param],
        ret: Option<&ast::TypeAnnot>,
    ) -> FunctionType {
        self.scopes.push();
        for param in type_params {
            self.scopes
                .declare_type(&param.node, Type::Generic(param.node.clone()));
        }
        let params = self.convert_params(params);
        let ret = self.convert_return(ret);
        self.scopes.pop();
        FunctionType {
            type_params: type_params.iter().map(|p| p.node.clone()).collect(),
            params,
            ret,
        }
    }

    // --- Pass 3: global values ---

    pub(super) fn declare_global_value(&mut self, decl: &Decl) {
        match decl {
            Decl::Composite(c) => {
                let Some(&id) = self.composite_ids.get(&c.id) else {
                    return;
                };
                // A redeclared type was already reported; its value is not.
                if self.scopes.lookup_type(&c.name.node) != Some(&self.composite_type(id)) {
                    return;
                }
                if let Some((ty, binding, kind)) = self.composite_value(id) {
                    let access = self.registry.composite(id).access.clone();
                    self.declare_global(&c.name, ty, binding, access, kind);
                }
            }
            Decl::Function(f) => {
                let access = self.convert_access(&f.access);
                let fun = self.convert_function_signature(&f.type_params, &f.params, f.ret.as_ref());
                let ty = Type::Function(Box::new(fun));
                self.elaboration.set_declaration_type(f.id, ty.clone());
                self.declare_global(&f.name, ty, BindingKind::Function, access, ValueKind::Function);
            }
            // Declared in order while checking.
            Decl::Variable(_) | Decl::Entitlement(_) => {}
        }
    }

    // --- Pass 4: checking ---

    pub(super) fn check_declaration(&mut self, decl: &Decl) {
        match decl {
            Decl::Composite(c) => self.check_composite(c),
            Decl::Function(f) => {
                self.check_access_modifier(&f.access, DeclarationKind::Function, false, false);
                self.check_function_declaration(f, None);
            }
            Decl::Variable(v) => self.check_variable_declaration(v, true),
            Decl::Entitlement(e) => self.check_access_modifier(
                &e.access,
                DeclarationKind::Entitlement,
                false,
                !self.containers.is_empty(),
            ),
        }
    }

    #[instrument(level = "debug", skip_all, fields(name = %c.name.node))]
    fn check_composite(&mut self, c: &CompositeDecl) {
        let Some(&id) = self.composite_ids.get(&c.id) else {
            return;
        };
        self.check_access_modifier(
            &c.access,
            DeclarationKind::Type,
            false,
            !self.containers.is_empty(),
        );

        self.enter_composite(id);
        if !c.is_interface {
            self.check_conformances(id, c);
        }
        self.check_composite_shape(id, c);

        for member in &c.members {
            match member {
                Member::Field(f) => {
                    let kind = match f.kind {
                        VarKind::Let => DeclarationKind::Constant,
                        VarKind::Var => DeclarationKind::Variable,
                    };
                    self.check_access_modifier(&f.access, kind, false, true);
                }
                Member::Function(fd) => {
                    self.check_access_modifier(&fd.access, DeclarationKind::Function, false, true);
                    match &fd.body {
                        Some(_) => self.check_function_declaration(fd, Some(id)),
                        None if !c.is_interface => {
                            self.report(SemanticError::MissingFunctionBody { span: fd.span })
                        }
                        None => {}
                    }
                }
                Member::Init(init) => {
                    let params = self.registry.composite(id).init.clone().unwrap_or_default();
                    self.check_special_function(init, params, FunctionKind::Initializer, id, c);
                }
                Member::Destroy(destroy) => {
                    if !self.registry.composite(id).is_resource {
                        self.report(SemanticError::InvalidDestructor { span: destroy.span });
                        continue;
                    }
                    self.check_special_function(destroy, Vec::new(), FunctionKind::Destructor, id, c);
                }
                Member::Case(_) => {}
                Member::Nested(Decl::Composite(nested)) => self.check_composite(nested),
                Member::Nested(Decl::Entitlement(e)) => {
                    self.check_access_modifier(&e.access, DeclarationKind::Entitlement, false, true)
                }
                Member::Nested(_) => {}
            }
        }
        self.exit_composite();
    }

    fn check_special_function(
        &mut self,
        function: &ast::SpecialFunction,
        params: Vec<ParamType>,
        kind: FunctionKind,
        id: CompositeId,
        c: &CompositeDecl,
    ) {
        match &function.body {
            Some(body) => {
                let fun = FunctionType::new(params, Type::VOID);
                self.check_function_body(&[], &function.params, &fun, body, kind, Some(id));
            }
            // Event initializers only declare the fields.
            None if c.is_interface || c.kind == CompositeKind::Event => {}
            None => self.report(SemanticError::MissingFunctionBody {
                span: function.span,
            }),
        }
    }

    fn check_conformances(&mut self, id: CompositeId, c: &CompositeDecl) {
        let interfaces = self.registry.all_conformances(id);
        for &interface in &interfaces {
            let mut result =
                check_conformance(&self.registry, id, interface, self.config.access_check_mode);
            result
                .missing
                .retain(|name| !self.default_functions.contains(&(interface, name.clone())));
            if result.is_ok() {
                continue;
            }
            let required = self.registry.composite(interface);
            self.report(SemanticError::Conformance {
                kind: c.kind.keyword().to_string(),
                composite: self.registry.composite(id).qualified_name.clone(),
                interface_kind: required.kind.keyword().to_string(),
                interface: required.qualified_name.clone(),
                missing: result.missing,
                mismatched: result.mismatched,
                span: c.name.span,
            });
        }
        if let Some(clash) = find_member_clash(&self.registry, interfaces.iter().copied()) {
            self.report(SemanticError::IntersectionMemberClash {
                member: clash.member,
                first: self.registry.composite(clash.first).qualified_name.clone(),
                second: self.registry.composite(clash.second).qualified_name.clone(),
                span: c.name.span,
            });
        }
        debug!(composite = %c.name.node, interfaces = interfaces.len(), "conformance checked");
    }

    fn check_composite_shape(&mut self, id: CompositeId, c: &CompositeDecl) {
        let record = self.registry.composite(id);
        let may_hold_resources = record.is_resource || record.kind == CompositeKind::Contract;
        let resource_fields: Vec<(String, ast::Span)> = record
            .fields()
            .filter(|f| self.registry.is_resource(&f.ty))
            .map(|f| (f.name.clone(), f.span))
            .collect();
        let has_fields = record.fields().next().is_some();
        let missing_destructor = record.is_resource
            && !record.is_interface
            && !record.has_destructor
            && !resource_fields.is_empty();
        let missing_init = !record.is_interface
            && record.kind != CompositeKind::Event
            && record.init.is_none()
            && has_fields;

        if !may_hold_resources {
            for (name, span) in resource_fields {
                self.report(SemanticError::InvalidResourceField {
                    name,
                    container: c.kind.keyword().to_string(),
                    span,
                });
            }
        }
        if missing_destructor {
            self.report(SemanticError::MissingDestructor {
                name: c.name.node.clone(),
                span: c.name.span,
            });
        }
        if missing_init {
            self.report(SemanticError::MissingInitializer {
                name: c.name.node.clone(),
                span: c.name.span,
            });
        }
    }

    /// Global or member function with a body; the signature was converted
    /// while declaring it.
    pub(super) fn check_function_declaration(
        &mut self,
        f: &ast::FunctionDecl,
        composite: Option<CompositeId>,
    ) {
        let Some(body) = &f.body else {
            self.report(SemanticError::MissingFunctionBody { span: f.span });
            return;
        };
        let fun = match self.elaboration.declaration_type(f.id) {
            Some(Type::Function(fun)) => (**fun).clone(),
            _ => self.convert_function_signature(&f.type_params, &f.params, f.ret.as_ref()),
        };
        self.check_function_body(&f.type_params, &f.params, &fun, body, FunctionKind::Function, composite);
    }
}

#![forbid(unsafe_code)]

use sable_ast::{self as ast, Block, Ident, VarKind};

use super::{Checker, FunctionContext, FunctionKind};
use crate::access::{Access, DeclarationKind};
use crate::error::SemanticError;
use crate::flow::FlowState;
use crate::init::FieldInits;
use crate::resources::{ResourceKey, ResourceState};
use crate::scope::{BindingKind, Variable};
use crate::types::{CompositeId, FunctionType, MemberKind, Type};

impl Checker<'_> {
    /// Checks one function body against its converted signature.
    ///
    /// The body starts from a fresh flow state; the caller's state is
    /// restored afterwards.
    pub(super) fn check_function_body(
        &mut self,
        type_params: &[Ident],
        params: &[ast::Param],
        fun: &FunctionType,
        body: &Block,
        kind: FunctionKind,
        composite: Option<CompositeId>,
    ) {
        let saved = std::mem::take(&mut self.flow);
        if let (FunctionKind::Initializer, Some(id)) = (kind, composite) {
            let record = self.registry.composite(id);
            let fields = record.fields().filter_map(|f| match f.kind {
                MemberKind::Field(kind) => Some((f.name.as_str(), kind)),
                _ => None,
            });
            self.flow.fields = Some(FieldInits::new(fields));
        }

        self.functions.push(FunctionContext {
            kind,
            ret: fun.ret.clone(),
            scope_depth: self.scopes.depth(),
            composite,
            loops: Vec::new(),
            init_exits: Vec::new(),
        });
        self.scopes.push();

        for param in type_params {
            self.scopes
                .declare_type(&param.node, Type::Generic(param.node.clone()));
        }
        if let Some(id) = composite {
            self.declare_self(id, kind);
        }
        for (param, ty) in params.iter().zip(&fun.params) {
            self.declare_variable(
                &param.name.node,
                param.name.span,
                ty.ty.clone(),
                VarKind::Let,
                BindingKind::Parameter,
                Access::NOT_SPECIFIED,
            );
        }

        self.check_block(body);
        if !self.flow.halted {
            let needs_return = matches!(kind, FunctionKind::Function)
                && !fun.ret.is_void()
                && !fun.ret.is_invalid()
                && !fun.ret.is_never();
            if needs_return {
                self.report(SemanticError::MissingReturnStatement { span: body.span });
            }
            self.record_function_exit();
        }

        let params = self.scopes.pop();
        self.end_scope(params);
        let context = self.functions.pop();

        if let (Some(context), Some(id)) = (context, composite)
            && context.kind == FunctionKind::Initializer
        {
            self.report_uninitialized_fields(id, &context.init_exits);
        }
        self.flow = saved;
    }

    fn declare_self(&mut self, id: CompositeId, kind: FunctionKind) {
        let var = self.fresh_var();
        let variable = Variable {
            id: var,
            name: "self".to_string(),
            ty: self.composite_type(id),
            kind: VarKind::Let,
            access: Access::NOT_SPECIFIED,
            binding: BindingKind::SelfValue,
            span: self.registry.composite(id).span,
            function_depth: self.function_depth(),
            imported_from: None,
            is_resource: false,
        };
        let _ = self.scopes.declare_value(variable);

        if kind == FunctionKind::Destructor {
            let fields: Vec<String> = self
                .registry
                .composite(id)
                .fields()
                .filter(|f| self.registry.is_resource(&f.ty))
                .map(|f| f.name.clone())
                .collect();
            for name in fields {
                self.flow.resources.track(ResourceKey::SelfField(name));
            }
        }
    }

    fn report_uninitialized_fields(&mut self, id: CompositeId, exits: &[FieldInits]) {
        // Every path panicked or otherwise never returned.
        let Some((first, rest)) = exits.split_first() else {
            return;
        };
        let joined = rest.iter().fold(first.clone(), |acc, f| acc.join(f));
        let record = self.registry.composite(id);
        let errors: Vec<SemanticError> = joined
            .uninitialized()
            .filter_map(|name| record.member(name))
            .map(|field| SemanticError::FieldUninitialized {
                name: field.name.clone(),
                container: record.qualified_name.clone(),
                span: field.span,
            })
            .collect();
        for error in errors {
            self.report(error);
        }
    }

    /// Per-kind bookkeeping at a normal exit of the current function.
    pub(super) fn record_function_exit(&mut self) {
        let Some(context) = self.current_function() else {
            return;
        };
        match (context.kind, context.composite) {
            (FunctionKind::Initializer, _) => {
                if let Some(fields) = self.flow.fields.clone()
                    && let Some(context) = self.current_function_mut()
                {
                    context.init_exits.push(fields);
                }
            }
            (FunctionKind::Destructor, Some(id)) => {
                let record = self.registry.composite(id);
                let errors: Vec<SemanticError> = record
                    .fields()
                    .filter(|f| {
                        self.flow
                            .resources
                            .get(&ResourceKey::SelfField(f.name.clone()))
                            .is_some_and(|info| info.state != ResourceState::DefinitelyInvalidated)
                    })
                    .map(|f| SemanticError::ResourceFieldNotInvalidated {
                        name: f.name.clone(),
                        ty: self.registry.type_name(&f.ty),
                        span: f.span,
                    })
                    .collect();
                for error in errors {
                    self.report(error);
                }
            }
            _ => {}
        }
    }

    /// Resources declared in a scope that is being left must have been
    /// moved or destroyed on every path reaching the end of the scope.
    pub(super) fn end_scope(&mut self, vars: Vec<Variable>) {
        for var in vars {
            let key = ResourceKey::Var(var.id);
            let Some(info) = self.flow.resources.get(&key) else {
                continue;
            };
            if !self.flow.halted && info.state != ResourceState::DefinitelyInvalidated {
                self.report(SemanticError::ResourceLoss { span: var.span });
            }
            self.flow.resources.untrack(&key);
        }
    }

    /// `fun` declared inside a block.
    pub(super) fn check_local_function(&mut self, f: &ast::FunctionDecl) {
        self.check_access_modifier(&f.access, DeclarationKind::Function, true, false);
        let fun = self.convert_function_signature(&f.type_params, &f.params, f.ret.as_ref());
        let ty = Type::Function(Box::new(fun.clone()));
        self.elaboration.set_declaration_type(f.id, ty.clone());
        self.declare_variable(
            &f.name.node,
            f.name.span,
            ty,
            VarKind::Let,
            BindingKind::Function,
            Access::NOT_SPECIFIED,
        );
        match &f.body {
            Some(body) => self.check_function_body(
                &f.type_params,
                &f.params,
                &fun,
                body,
                FunctionKind::Function,
                None,
            ),
            None => self.report(SemanticError::MissingFunctionBody { span: f.span }),
        }
    }

    /// Function expressions; the body checks like a local function.
    pub(super) fn check_closure(&mut self, function: &ast::FunctionExpr) -> Type {
        let fun = self.convert_function_signature(&[], &function.params, function.ret.as_ref());
        self.check_function_body(
            &[],
            &function.params,
            &fun,
            &function.body,
            FunctionKind::Function,
            None,
        );
        Type::Function(Box::new(fun))
    }

    /// Flow state of the current path, for branch bookkeeping.
    pub(super) fn snapshot(&self) -> FlowState {
        self.flow.clone()
    }
}

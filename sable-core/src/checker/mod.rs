#![forbid(unsafe_code)]

//! The checker driver.
//!
//! Checking runs in passes so that declarations may refer to each other
//! regardless of textual order:
//!
//! 1. imports are resolved and their records copied into the registry
//! 2. type declarations are registered, then their signatures resolved
//! 3. global values (constructors, singletons, functions) are declared
//! 4. declarations are checked in source order, bodies included
//!
//! Diagnostics accumulate in discovery order and never stop the walk.

mod declarations;
mod expressions;
mod functions;
mod imports;
mod members;
mod statements;
mod types;

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use sable_ast::{Ident, NodeId, Program, Span, VarKind};
use tracing::{debug, info, instrument};

use crate::access::{Access, AccessContext};
use crate::config::CheckerConfig;
use crate::elaboration::{Elaboration, GlobalValue, ValueKind};
use crate::error::{CheckerError, ErrorKind, SemanticError};
use crate::flow::FlowState;
use crate::init::FieldInits;
use crate::resources::{ResourceKey, VarId};
use crate::scope::{BindingKind, Scopes, Variable};
use crate::stdlib::{ImportResolver, StandardLibrary};
use crate::types::{CompositeId, EntitlementId, Type, TypeRegistry};

/// Outcome of checking one program.
#[derive(Debug)]
pub struct Checked {
    pub elaboration: Elaboration,
    /// In discovery order.
    pub diagnostics: Vec<SemanticError>,
}

impl Checked {
    /// No diagnostics at all, warnings included.
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.diagnostics.iter().map(SemanticError::kind).collect()
    }

    pub fn into_result(self) -> Result<Elaboration, CheckerError> {
        if self.diagnostics.is_empty() {
            Ok(self.elaboration)
        } else {
            Err(CheckerError {
                errors: self.diagnostics,
            })
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Function,
    Initializer,
    Destructor,
}

#[derive(Debug)]
pub(crate) struct FunctionContext {
    kind: FunctionKind,
    ret: Type,
    /// Scope depth just outside the parameter scope.
    scope_depth: usize,
    /// Composite whose `self` the function binds.
    composite: Option<CompositeId>,
    /// Enclosing loops, innermost last.
    loops: Vec<LoopFrame>,
    /// Field states at every exit of an initializer.
    init_exits: Vec<FieldInits>,
}

#[derive(Debug, Default)]
pub(crate) struct LoopFrame {
    /// Scope depth just outside the loop body.
    scope_depth: usize,
    /// Flow states leaving the body early through `break` or `continue`.
    jumps: Vec<FlowState>,
}

/// Semantic checker for one program.
///
/// A checker is consumed by [`Checker::check_program`]; independent
/// programs use independent checkers and may run in parallel.
pub struct Checker<'a> {
    config: CheckerConfig,
    stdlib: StandardLibrary,
    resolver: Option<&'a dyn ImportResolver>,

    registry: TypeRegistry,
    elaboration: Elaboration,
    diagnostics: Vec<SemanticError>,
    /// Diagnostics are dropped while positive (loop dry runs).
    suppressed: u32,

    scopes: Scopes,
    functions: Vec<FunctionContext>,
    /// Composites lexically enclosing the current position, outermost first.
    containers: Vec<CompositeId>,
    flow: FlowState,
    next_var: u32,
    /// Resources each reference-typed local points into.
    references: FxHashMap<VarId, Vec<ResourceKey>>,

    composite_ids: FxHashMap<NodeId, CompositeId>,
    entitlements: FxHashMap<String, EntitlementId>,
    /// Interface functions that come with a default implementation.
    default_functions: FxHashSet<(CompositeId, String)>,
    /// Declarations rejected while registering; their bodies are skipped.
    skipped: FxHashSet<NodeId>,
    /// Intersections seen while signatures are still incomplete.
    pending_intersections: Option<Vec<(BTreeSet<CompositeId>, Span)>>,
    /// The failable cast an `if let` binding is allowed to apply to a resource.
    binding_cast: Option<NodeId>,
}

impl<'a> Checker<'a> {
    pub fn new(config: CheckerConfig) -> Self {
        let elaboration = Elaboration::new(config.location.clone());
        Self {
            config,
            stdlib: StandardLibrary::empty(),
            resolver: None,
            registry: TypeRegistry::new(),
            elaboration,
            diagnostics: Vec::new(),
            suppressed: 0,
            scopes: Scopes::default(),
            functions: Vec::new(),
            containers: Vec::new(),
            flow: FlowState::default(),
            next_var: 0,
            references: FxHashMap::default(),
            composite_ids: FxHashMap::default(),
            entitlements: FxHashMap::default(),
            default_functions: FxHashSet::default(),
            skipped: FxHashSet::default(),
            pending_intersections: None,
            binding_cast: None,
        }
    }

    pub fn with_standard_library(mut self, stdlib: StandardLibrary) -> Self {
        self.stdlib = stdlib;
        self
    }

    pub fn with_import_resolver(mut self, resolver: &'a dyn ImportResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[instrument(
        skip_all,
        fields(location = %self.config.location, mode = %self.config.access_check_mode)
    )]
    pub fn check_program(mut self, program: &Program) -> Checked {
        self.declare_standard_library();

        // Program globals live one scope above the standard library so
        // they may shadow it.
        self.scopes.push();
        self.check_imports(&program.imports);

        for decl in &program.decls {
            self.declare_type_decl(decl, None);
        }
        self.resolve_signatures(&program.decls);
        debug!(
            composites = self.registry.composites().count(),
            "type declarations registered"
        );

        for decl in &program.decls {
            self.declare_global_value(decl);
        }
        debug!("global values declared");

        for decl in &program.decls {
            self.check_declaration(decl);
        }
        debug!("declarations checked");

        self.finish()
    }

    fn finish(mut self) -> Checked {
        let has_errors = self.diagnostics.iter().any(|d| !d.is_warning());
        info!(diagnostics = self.diagnostics.len(), "checking finished");
        self.elaboration.finish(self.registry, has_errors);
        Checked {
            elaboration: self.elaboration,
            diagnostics: self.diagnostics,
        }
    }

    fn declare_standard_library(&mut self) {
        let types: Vec<(String, Type)> = self
            .stdlib
            .types()
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();
        for (name, ty) in types {
            self.scopes.declare_type(&name, ty);
        }

        let values: Vec<(String, Type)> = self
            .stdlib
            .values()
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();
        for (name, ty) in values {
            let id = self.fresh_var();
            let is_resource = self.registry.is_resource(&ty);
            let _ = self.scopes.declare_value(Variable {
                id,
                name,
                ty,
                kind: VarKind::Let,
                access: Access::ALL,
                binding: BindingKind::Builtin,
                span: sable_ast::span(0, 0),
                function_depth: 0,
                imported_from: None,
                is_resource,
            });
        }
    }

    // --- Shared helpers ---

    fn report(&mut self, error: SemanticError) {
        if self.suppressed == 0 {
            self.diagnostics.push(error);
        }
    }

    fn fresh_var(&mut self) -> VarId {
        let id = VarId(self.next_var);
        self.next_var += 1;
        id
    }

    fn access_context(&self) -> AccessContext<'_> {
        AccessContext {
            mode: self.config.access_check_mode,
            containers: &self.containers,
            location: &self.config.location,
        }
    }

    fn type_name(&self, ty: &Type) -> String {
        self.registry.type_name(ty)
    }

    fn is_resource(&self, ty: &Type) -> bool {
        self.registry.is_resource(ty)
    }

    /// `Composite` or `Interface`, depending on the record.
    fn composite_type(&self, id: CompositeId) -> Type {
        if self.registry.composite(id).is_interface {
            Type::Interface(id)
        } else {
            Type::Composite(id)
        }
    }

    fn qualified_name(&self, container: Option<CompositeId>, name: &str) -> String {
        match container {
            Some(c) => format!("{}.{name}", self.registry.composite(c).qualified_name),
            None => name.to_string(),
        }
    }

    fn current_function(&self) -> Option<&FunctionContext> {
        self.functions.last()
    }

    fn current_function_mut(&mut self) -> Option<&mut FunctionContext> {
        self.functions.last_mut()
    }

    fn function_depth(&self) -> usize {
        self.functions.len()
    }

    /// Declares a value in the innermost scope, reporting a redeclaration
    /// when the name is taken there. Resource locals start being tracked.
    fn declare_variable(
        &mut self,
        name: &str,
        span: Span,
        ty: Type,
        kind: VarKind,
        binding: BindingKind,
        access: Access,
    ) -> Option<VarId> {
        let id = self.fresh_var();
        let is_resource = self.registry.is_resource(&ty);
        let variable = Variable {
            id,
            name: name.to_string(),
            ty,
            kind,
            access,
            binding,
            span,
            function_depth: self.function_depth(),
            imported_from: None,
            is_resource,
        };
        let tracked = variable.is_tracked();
        match self.scopes.declare_value(variable) {
            Ok(()) => {
                if tracked {
                    self.flow.resources.track(ResourceKey::Var(id));
                }
                Some(id)
            }
            Err(previous) => {
                self.report(SemanticError::Redeclaration {
                    kind: "value",
                    name: name.to_string(),
                    span,
                    previous: Some(previous),
                });
                None
            }
        }
    }

    /// Declares a program-level value and records it for importers.
    fn declare_global(
        &mut self,
        name: &Ident,
        ty: Type,
        binding: BindingKind,
        access: Access,
        value_kind: ValueKind,
    ) -> bool {
        let kind = match value_kind {
            ValueKind::Variable => VarKind::Var,
            _ => VarKind::Let,
        };
        let declared = self
            .declare_variable(&name.node, name.span, ty.clone(), kind, binding, access.clone())
            .is_some();
        if declared {
            self.elaboration.add_global_value(
                name.node.clone(),
                GlobalValue {
                    ty,
                    access,
                    kind: value_kind,
                    location: self.config.location.clone(),
                    span: name.span,
                },
            );
        }
        declared
    }

    /// Makes the members of a composite's body visible: its nested types,
    /// and the constructors or singletons of its nested composites.
    fn enter_composite(&mut self, id: CompositeId) {
        self.containers.push(id);
        self.scopes.push();
        let nested = self.registry.composite(id).nested.clone();
        for n in nested {
            let name = self.registry.composite(n).name.clone();
            let ty = self.composite_type(n);
            self.scopes.declare_type(&name, ty);
            if let Some((value_ty, binding, _)) = self.composite_value(n) {
                let access = self.registry.composite(n).access.clone();
                let span = self.registry.composite(n).span;
                let id = self.fresh_var();
                let _ = self.scopes.declare_value(Variable {
                    id,
                    name,
                    ty: value_ty,
                    kind: VarKind::Let,
                    access,
                    binding,
                    span,
                    function_depth: self.functions.len(),
                    imported_from: None,
                    is_resource: false,
                });
            }
        }
    }

    fn exit_composite(&mut self) {
        self.scopes.pop();
        self.containers.pop();
    }

    /// The value a composite declaration introduces: a constructor for
    /// structures, resources, events and attachments, the singleton for
    /// contracts and enums, nothing for interfaces.
    fn composite_value(&self, id: CompositeId) -> Option<(Type, BindingKind, ValueKind)> {
        use sable_ast::CompositeKind as K;
        let record = self.registry.composite(id);
        if record.is_interface {
            return None;
        }
        match record.kind {
            K::Struct | K::Resource | K::Event | K::Attachment => {
                let params = record.init.clone().unwrap_or_default();
                Some((
                    Type::function(params, Type::Composite(id)),
                    BindingKind::Constructor,
                    ValueKind::Constructor,
                ))
            }
            K::Contract | K::Enum => Some((
                Type::Composite(id),
                BindingKind::Singleton,
                ValueKind::Singleton,
            )),
        }
    }
}

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use sable_ast::{CastKind, NodeId, Span};

use crate::access::Access;
use crate::location::Location;
use crate::types::{CompositeId, EntitlementId, Type, TypeRegistry};

#[derive(Clone, Debug, PartialEq)]
pub struct CastRecord {
    pub kind: CastKind,
    pub target: Type,
    pub expr_type: Type,
    /// The expression already had the target type.
    pub redundant: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Constant,
    Variable,
    Function,
    /// Constructor of a struct, resource, event or attachment.
    Constructor,
    /// The singleton value of a contract or enum.
    Singleton,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Constant => "constant",
            ValueKind::Variable => "variable",
            ValueKind::Function => "function",
            ValueKind::Constructor => "constructor",
            ValueKind::Singleton => "value",
        }
    }
}

/// Record of a global value, as seen by importers.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalValue {
    pub ty: Type,
    pub access: Access,
    pub kind: ValueKind,
    pub location: Location,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlobalType {
    Composite(CompositeId),
    Interface(CompositeId),
    Entitlement(EntitlementId),
}

/// Result of checking one program. Immutable once the checker returns it.
#[derive(Clone, Debug, Default)]
pub struct Elaboration {
    pub location: Location,
    expression_types: FxHashMap<NodeId, Type>,
    declaration_types: FxHashMap<NodeId, Type>,
    casts: BTreeMap<NodeId, CastRecord>,
    expected_literals: BTreeSet<NodeId>,
    global_values: BTreeMap<String, GlobalValue>,
    global_types: BTreeMap<String, GlobalType>,
    registry: TypeRegistry,
    has_errors: bool,
}

impl Elaboration {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    pub fn expression_type(&self, id: NodeId) -> Option<&Type> {
        self.expression_types.get(&id)
    }

    pub fn declaration_type(&self, id: NodeId) -> Option<&Type> {
        self.declaration_types.get(&id)
    }

    pub fn cast(&self, id: NodeId) -> Option<&CastRecord> {
        self.casts.get(&id)
    }

    pub fn casts(&self) -> impl Iterator<Item = (&NodeId, &CastRecord)> {
        self.casts.iter()
    }

    /// Whether the literal at `id` was checked against an expected type
    /// and took it over unchanged.
    pub fn is_same_as_expected(&self, id: NodeId) -> bool {
        self.expected_literals.contains(&id)
    }

    pub fn global_value(&self, name: &str) -> Option<&GlobalValue> {
        self.global_values.get(name)
    }

    pub fn global_values(&self) -> impl Iterator<Item = (&String, &GlobalValue)> {
        self.global_values.iter()
    }

    pub fn global_type(&self, name: &str) -> Option<GlobalType> {
        self.global_types.get(name).copied()
    }

    pub fn global_types(&self) -> impl Iterator<Item = (&String, &GlobalType)> {
        self.global_types.iter()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Whether checking reported any diagnostic.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn type_name(&self, ty: &Type) -> String {
        self.registry.type_name(ty)
    }

    // --- Recording, used by the checker ---

    pub(crate) fn set_expression_type(&mut self, id: NodeId, ty: Type) {
        self.expression_types.insert(id, ty);
    }

    pub(crate) fn set_declaration_type(&mut self, id: NodeId, ty: Type) {
        self.declaration_types.insert(id, ty);
    }

    pub(crate) fn add_cast(&mut self, id: NodeId, record: CastRecord) {
        self.casts.insert(id, record);
    }

    pub(crate) fn mark_same_as_expected(&mut self, id: NodeId) {
        self.expected_literals.insert(id);
    }

    pub(crate) fn add_global_value(&mut self, name: String, value: GlobalValue) {
        self.global_values.insert(name, value);
    }

    pub(crate) fn add_global_type(&mut self, name: String, ty: GlobalType) {
        self.global_types.insert(name, ty);
    }

    pub(crate) fn finish(&mut self, registry: TypeRegistry, has_errors: bool) {
        self.registry = registry;
        self.has_errors = has_errors;
    }
}

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use sable_ast::{CompositeKind, SetKind, Span, VarKind};

use crate::access::Access;
use crate::location::Location;

/// Handle of a composite or interface record in a [`TypeRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntitlementId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Never,
    Void,
    Bool,
    String,
    Character,
    Address,
    Path,
    AnyStruct,
    AnyResource,
    Any,

    Number,
    SignedNumber,
    Integer,
    SignedInteger,
    FixedPoint,
    SignedFixedPoint,

    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Word8,
    Word16,
    Word32,
    Word64,
    Fix64,
    UFix64,
}

impl PrimitiveType {
    pub const ALL: &'static [PrimitiveType] = &[
        PrimitiveType::Never,
        PrimitiveType::Void,
        PrimitiveType::Bool,
        PrimitiveType::String,
        PrimitiveType::Character,
        PrimitiveType::Address,
        PrimitiveType::Path,
        PrimitiveType::AnyStruct,
        PrimitiveType::AnyResource,
        PrimitiveType::Any,
        PrimitiveType::Number,
        PrimitiveType::SignedNumber,
        PrimitiveType::Integer,
        PrimitiveType::SignedInteger,
        PrimitiveType::FixedPoint,
        PrimitiveType::SignedFixedPoint,
        PrimitiveType::Int,
        PrimitiveType::Int8,
        PrimitiveType::Int16,
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::Int128,
        PrimitiveType::Int256,
        PrimitiveType::UInt,
        PrimitiveType::UInt8,
        PrimitiveType::UInt16,
        PrimitiveType::UInt32,
        PrimitiveType::UInt64,
        PrimitiveType::UInt128,
        PrimitiveType::UInt256,
        PrimitiveType::Word8,
        PrimitiveType::Word16,
        PrimitiveType::Word32,
        PrimitiveType::Word64,
        PrimitiveType::Fix64,
        PrimitiveType::UFix64,
    ];

    pub fn name(self) -> &'static str {
        use PrimitiveType as P;
        match self {
            P::Never => "Never",
            P::Void => "Void",
            P::Bool => "Bool",
            P::String => "String",
            P::Character => "Character",
            P::Address => "Address",
            P::Path => "Path",
            P::AnyStruct => "AnyStruct",
            P::AnyResource => "AnyResource",
            P::Any => "Any",
            P::Number => "Number",
            P::SignedNumber => "SignedNumber",
            P::Integer => "Integer",
            P::SignedInteger => "SignedInteger",
            P::FixedPoint => "FixedPoint",
            P::SignedFixedPoint => "SignedFixedPoint",
            P::Int => "Int",
            P::Int8 => "Int8",
            P::Int16 => "Int16",
            P::Int32 => "Int32",
            P::Int64 => "Int64",
            P::Int128 => "Int128",
            P::Int256 => "Int256",
            P::UInt => "UInt",
            P::UInt8 => "UInt8",
            P::UInt16 => "UInt16",
            P::UInt32 => "UInt32",
            P::UInt64 => "UInt64",
            P::UInt128 => "UInt128",
            P::UInt256 => "UInt256",
            P::Word8 => "Word8",
            P::Word16 => "Word16",
            P::Word32 => "Word32",
            P::Word64 => "Word64",
            P::Fix64 => "Fix64",
            P::UFix64 => "UFix64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Concrete integer types, not the abstract supertypes.
    pub fn is_integer(self) -> bool {
        use PrimitiveType as P;
        matches!(
            self,
            P::Int
                | P::Int8
                | P::Int16
                | P::Int32
                | P::Int64
                | P::Int128
                | P::Int256
                | P::UInt
                | P::UInt8
                | P::UInt16
                | P::UInt32
                | P::UInt64
                | P::UInt128
                | P::UInt256
                | P::Word8
                | P::Word16
                | P::Word32
                | P::Word64
        )
    }

    pub fn is_signed_integer(self) -> bool {
        use PrimitiveType as P;
        matches!(
            self,
            P::Int | P::Int8 | P::Int16 | P::Int32 | P::Int64 | P::Int128 | P::Int256
        )
    }

    pub fn is_fixed_point(self) -> bool {
        matches!(self, PrimitiveType::Fix64 | PrimitiveType::UFix64)
    }

    pub fn is_numeric(self) -> bool {
        use PrimitiveType as P;
        self.is_integer()
            || self.is_fixed_point()
            || matches!(
                self,
                P::Number
                    | P::SignedNumber
                    | P::Integer
                    | P::SignedInteger
                    | P::FixedPoint
                    | P::SignedFixedPoint
            )
    }

    pub fn is_signed(self) -> bool {
        use PrimitiveType as P;
        self.is_signed_integer()
            || matches!(
                self,
                P::Fix64 | P::SignedNumber | P::SignedInteger | P::SignedFixedPoint
            )
    }

    /// Largest value an integer type can hold, if bounded.
    pub fn integer_max(self) -> Option<u128> {
        use PrimitiveType as P;
        Some(match self {
            P::Int8 => i8::MAX as u128,
            P::Int16 => i16::MAX as u128,
            P::Int32 => i32::MAX as u128,
            P::Int64 => i64::MAX as u128,
            P::Int128 => i128::MAX as u128,
            P::UInt8 | P::Word8 => u8::MAX as u128,
            P::UInt16 | P::Word16 => u16::MAX as u128,
            P::UInt32 | P::Word32 => u32::MAX as u128,
            P::UInt64 | P::Word64 => u64::MAX as u128,
            P::UInt128 => u128::MAX,
            _ => return None,
        })
    }
}

/// A required or held entitlement set.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntitlementSet {
    pub kind: SetKind,
    pub set: BTreeSet<EntitlementId>,
}

impl EntitlementSet {
    pub fn conjunction(set: impl IntoIterator<Item = EntitlementId>) -> Self {
        Self {
            kind: SetKind::Conjunction,
            set: set.into_iter().collect(),
        }
    }

    pub fn disjunction(set: impl IntoIterator<Item = EntitlementId>) -> Self {
        Self {
            kind: SetKind::Disjunction,
            set: set.into_iter().collect(),
        }
    }

    /// Whether holding `held` satisfies `self` as a requirement.
    pub fn permits(&self, held: &EntitlementSet) -> bool {
        match (self.kind, held.kind) {
            (SetKind::Conjunction, SetKind::Conjunction) => self.set.is_subset(&held.set),
            (SetKind::Disjunction, SetKind::Disjunction) => held.set.is_subset(&self.set),
            (SetKind::Disjunction, SetKind::Conjunction) => {
                self.set.intersection(&held.set).next().is_some()
            }
            // Holding "one of H" only satisfies "all of R" when every
            // element of both sets is the same entitlement.
            (SetKind::Conjunction, SetKind::Disjunction) => self
                .set
                .iter()
                .all(|r| held.set.iter().all(|h| h == r)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Authorization {
    Unauthorized,
    Entitlements(EntitlementSet),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamType {
    /// `None` when the argument is passed without a label.
    pub label: Option<String>,
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub type_params: Vec<String>,
    pub params: Vec<ParamType>,
    pub ret: Type,
}

impl FunctionType {
    pub fn new(params: Vec<ParamType>, ret: Type) -> Self {
        Self {
            type_params: Vec::new(),
            params,
            ret,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// Result of an expression whose type could not be determined.
    /// Compatible with everything so errors do not cascade.
    Invalid,
    Primitive(PrimitiveType),
    Optional(Box<Type>),
    VariableSized(Box<Type>),
    ConstantSized(Box<Type>, u64),
    Dictionary(Box<Type>, Box<Type>),
    Function(Box<FunctionType>),
    Reference {
        authorization: Authorization,
        referenced: Box<Type>,
    },
    Composite(CompositeId),
    Interface(CompositeId),
    Intersection(BTreeSet<CompositeId>),
    Capability(Option<Box<Type>>),
    Generic(String),
}

impl Type {
    pub const NEVER: Type = Type::Primitive(PrimitiveType::Never);
    pub const VOID: Type = Type::Primitive(PrimitiveType::Void);
    pub const BOOL: Type = Type::Primitive(PrimitiveType::Bool);
    pub const STRING: Type = Type::Primitive(PrimitiveType::String);
    pub const INT: Type = Type::Primitive(PrimitiveType::Int);
    pub const ANY_STRUCT: Type = Type::Primitive(PrimitiveType::AnyStruct);
    pub const ANY_RESOURCE: Type = Type::Primitive(PrimitiveType::AnyResource);

    pub fn optional(inner: Type) -> Type {
        Type::Optional(Box::new(inner))
    }

    pub fn reference(authorization: Authorization, referenced: Type) -> Type {
        Type::Reference {
            authorization,
            referenced: Box::new(referenced),
        }
    }

    pub fn function(params: Vec<ParamType>, ret: Type) -> Type {
        Type::Function(Box::new(FunctionType::new(params, ret)))
    }

    pub fn is_invalid(&self) -> bool {
        match self {
            Type::Invalid => true,
            Type::Optional(t) | Type::VariableSized(t) | Type::ConstantSized(t, _) => {
                t.is_invalid()
            }
            Type::Dictionary(k, v) => k.is_invalid() || v.is_invalid(),
            Type::Reference { referenced, .. } => referenced.is_invalid(),
            _ => false,
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveType::Never))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveType::Void))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Type::Optional(_))
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Strips every layer of optionality.
    pub fn unwrap_optional(&self) -> &Type {
        match self {
            Type::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    Field(VarKind),
    Function,
    EnumCase,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MemberInfo {
    pub name: String,
    /// Access as written; see [`Access::effective`].
    pub access: Access,
    pub kind: MemberKind,
    pub ty: Type,
    pub span: Span,
}

impl MemberInfo {
    pub fn is_field(&self) -> bool {
        matches!(self.kind, MemberKind::Field(_))
    }
}

/// Record of a composite or interface declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeType {
    pub location: Location,
    /// Dotted path through enclosing declarations, e.g. `C.R`.
    pub qualified_name: String,
    pub name: String,
    pub kind: CompositeKind,
    pub is_interface: bool,
    pub is_resource: bool,
    pub access: Access,
    pub conformances: Vec<CompositeId>,
    pub members: Vec<MemberInfo>,
    pub container: Option<CompositeId>,
    pub nested: Vec<CompositeId>,
    /// Constructor parameters; `None` when no initializer is declared.
    pub init: Option<Vec<ParamType>>,
    pub has_destructor: bool,
    /// Base type of an attachment.
    pub base: Option<Type>,
    /// Raw type of an enum.
    pub enum_raw: Option<Type>,
    pub span: Span,
}

impl CompositeType {
    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &MemberInfo> {
        self.members.iter().filter(|m| m.is_field())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntitlementType {
    pub location: Location,
    pub qualified_name: String,
    pub name: String,
    pub access: Access,
    pub span: Span,
}

/// Arena of composite, interface and entitlement records.
///
/// Types refer to records by handle so that declarations may mention each
/// other before all of their members are known.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    composites: Vec<CompositeType>,
    entitlements: Vec<EntitlementType>,
    composite_index: FxHashMap<(Location, String), CompositeId>,
    entitlement_index: FxHashMap<(Location, String), EntitlementId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_composite(&mut self, composite: CompositeType) -> CompositeId {
        let id = CompositeId(self.composites.len() as u32);
        self.composite_index.insert(
            (composite.location.clone(), composite.qualified_name.clone()),
            id,
        );
        self.composites.push(composite);
        id
    }

    pub fn add_entitlement(&mut self, entitlement: EntitlementType) -> EntitlementId {
        let id = EntitlementId(self.entitlements.len() as u32);
        self.entitlement_index.insert(
            (entitlement.location.clone(), entitlement.qualified_name.clone()),
            id,
        );
        self.entitlements.push(entitlement);
        id
    }

    pub fn composite(&self, id: CompositeId) -> &CompositeType {
        match self.composites.get(id.0 as usize) {
            Some(c) => c,
            None => unreachable!("composite handle {id:?} outside its registry"),
        }
    }

    pub fn composite_mut(&mut self, id: CompositeId) -> &mut CompositeType {
        match self.composites.get_mut(id.0 as usize) {
            Some(c) => c,
            None => unreachable!("composite handle {id:?} outside its registry"),
        }
    }

    pub fn entitlement(&self, id: EntitlementId) -> &EntitlementType {
        match self.entitlements.get(id.0 as usize) {
            Some(e) => e,
            None => unreachable!("entitlement handle {id:?} outside its registry"),
        }
    }

    pub fn composites(&self) -> impl Iterator<Item = (CompositeId, &CompositeType)> {
        self.composites
            .iter()
            .enumerate()
            .map(|(i, c)| (CompositeId(i as u32), c))
    }

    pub fn entitlements(&self) -> impl Iterator<Item = (EntitlementId, &EntitlementType)> {
        self.entitlements
            .iter()
            .enumerate()
            .map(|(i, e)| (EntitlementId(i as u32), e))
    }

    pub fn lookup_composite(&self, location: &Location, qualified_name: &str) -> Option<CompositeId> {
        self.composite_index
            .get(&(location.clone(), qualified_name.to_string()))
            .copied()
    }

    pub fn lookup_entitlement(
        &self,
        location: &Location,
        qualified_name: &str,
    ) -> Option<EntitlementId> {
        self.entitlement_index
            .get(&(location.clone(), qualified_name.to_string()))
            .copied()
    }

    /// Whether values of `ty` are linear.
    pub fn is_resource(&self, ty: &Type) -> bool {
        match ty {
            Type::Primitive(PrimitiveType::AnyResource) => true,
            Type::Optional(t) | Type::VariableSized(t) | Type::ConstantSized(t, _) => {
                self.is_resource(t)
            }
            Type::Dictionary(_, v) => self.is_resource(v),
            Type::Composite(id) | Type::Interface(id) => self.composite(*id).is_resource,
            Type::Intersection(set) => set.iter().any(|id| self.composite(*id).is_resource),
            _ => false,
        }
    }

    /// The composite this one is lexically nested in, if it is a contract,
    /// or the composite itself when it is a contract.
    pub fn containing_contract(&self, id: CompositeId) -> Option<CompositeId> {
        let mut current = Some(id);
        while let Some(c) = current {
            let record = self.composite(c);
            if record.kind == CompositeKind::Contract {
                return Some(c);
            }
            current = record.container;
        }
        None
    }

    /// Every interface `id` conforms to, transitively.
    pub fn all_conformances(&self, id: CompositeId) -> BTreeSet<CompositeId> {
        let mut out = BTreeSet::new();
        let mut stack = self.composite(id).conformances.clone();
        while let Some(next) = stack.pop() {
            if out.insert(next) {
                stack.extend(self.composite(next).conformances.iter().copied());
            }
        }
        out
    }

    pub fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Invalid => "<<invalid>>".to_string(),
            Type::Primitive(p) => p.name().to_string(),
            Type::Optional(inner) => format!("{}?", self.type_name(inner)),
            Type::VariableSized(elem) => format!("[{}]", self.type_name(elem)),
            Type::ConstantSized(elem, size) => format!("[{}; {size}]", self.type_name(elem)),
            Type::Dictionary(k, v) => {
                format!("{{{}: {}}}", self.type_name(k), self.type_name(v))
            }
            Type::Function(f) => {
                let params = f
                    .params
                    .iter()
                    .map(|p| self.type_name(&p.ty))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("fun({params}): {}", self.type_name(&f.ret))
            }
            Type::Reference {
                authorization,
                referenced,
            } => match authorization {
                Authorization::Unauthorized => format!("&{}", self.type_name(referenced)),
                Authorization::Entitlements(set) => format!(
                    "auth({}) &{}",
                    self.entitlement_set_name(set),
                    self.type_name(referenced)
                ),
            },
            Type::Composite(id) | Type::Interface(id) => {
                self.composite(*id).qualified_name.clone()
            }
            Type::Intersection(set) => {
                let names = set
                    .iter()
                    .map(|id| self.composite(*id).qualified_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{names}}}")
            }
            Type::Capability(None) => "Capability".to_string(),
            Type::Capability(Some(borrow)) => format!("Capability<{}>", self.type_name(borrow)),
            Type::Generic(name) => name.clone(),
        }
    }

    pub fn entitlement_set_name(&self, set: &EntitlementSet) -> String {
        let sep = match set.kind {
            SetKind::Conjunction => ", ",
            SetKind::Disjunction => " | ",
        };
        set.set
            .iter()
            .map(|id| self.entitlement(*id).qualified_name.as_str())
            .collect::<Vec<_>>()
            .join(sep)
    }

    // --- Import copying ---

    /// Copies the records `ty` mentions from `other` into this registry and
    /// returns `ty` with its handles rewritten. Records already present under
    /// the same location and qualified name are reused.
    pub fn import_type(&mut self, other: &TypeRegistry, ty: &Type) -> Type {
        match ty {
            Type::Invalid | Type::Primitive(_) | Type::Generic(_) => ty.clone(),
            Type::Optional(t) => Type::Optional(Box::new(self.import_type(other, t))),
            Type::VariableSized(t) => Type::VariableSized(Box::new(self.import_type(other, t))),
            Type::ConstantSized(t, n) => {
                Type::ConstantSized(Box::new(self.import_type(other, t)), *n)
            }
            Type::Dictionary(k, v) => Type::Dictionary(
                Box::new(self.import_type(other, k)),
                Box::new(self.import_type(other, v)),
            ),
            Type::Function(f) => Type::Function(Box::new(self.import_function(other, f))),
            Type::Reference {
                authorization,
                referenced,
            } => Type::Reference {
                authorization: self.import_authorization(other, authorization),
                referenced: Box::new(self.import_type(other, referenced)),
            },
            Type::Composite(id) => Type::Composite(self.import_composite(other, *id)),
            Type::Interface(id) => Type::Interface(self.import_composite(other, *id)),
            Type::Intersection(set) => Type::Intersection(
                set.iter()
                    .map(|id| self.import_composite(other, *id))
                    .collect(),
            ),
            Type::Capability(borrow) => Type::Capability(
                borrow
                    .as_ref()
                    .map(|b| Box::new(self.import_type(other, b))),
            ),
        }
    }

    pub fn import_composite(&mut self, other: &TypeRegistry, id: CompositeId) -> CompositeId {
        let source = other.composite(id);
        if let Some(existing) = self.lookup_composite(&source.location, &source.qualified_name) {
            return existing;
        }

        // Register first so cyclic references resolve to the new handle.
        let new_id = self.add_composite(source.clone());

        let conformances = source
            .conformances
            .iter()
            .map(|c| self.import_composite(other, *c))
            .collect();
        let container = source.container.map(|c| self.import_composite(other, c));
        let nested = source
            .nested
            .iter()
            .map(|c| self.import_composite(other, *c))
            .collect();
        let members = source
            .members
            .iter()
            .map(|m| MemberInfo {
                access: self.import_access(other, &m.access),
                ty: self.import_type(other, &m.ty),
                ..m.clone()
            })
            .collect();
        let init = source
            .init
            .as_ref()
            .map(|params| self.import_params(other, params));
        let base = source.base.as_ref().map(|b| self.import_type(other, b));
        let enum_raw = source.enum_raw.as_ref().map(|r| self.import_type(other, r));
        let access = self.import_access(other, &source.access);

        let record = self.composite_mut(new_id);
        record.conformances = conformances;
        record.container = container;
        record.nested = nested;
        record.members = members;
        record.init = init;
        record.base = base;
        record.enum_raw = enum_raw;
        record.access = access;
        new_id
    }

    pub fn import_entitlement(&mut self, other: &TypeRegistry, id: EntitlementId) -> EntitlementId {
        let source = other.entitlement(id);
        match self.lookup_entitlement(&source.location, &source.qualified_name) {
            Some(existing) => existing,
            None => self.add_entitlement(source.clone()),
        }
    }

    fn import_entitlement_set(&mut self, other: &TypeRegistry, set: &EntitlementSet) -> EntitlementSet {
        EntitlementSet {
            kind: set.kind,
            set: set
                .set
                .iter()
                .map(|e| self.import_entitlement(other, *e))
                .collect(),
        }
    }

    fn import_authorization(&mut self, other: &TypeRegistry, auth: &Authorization) -> Authorization {
        match auth {
            Authorization::Unauthorized => Authorization::Unauthorized,
            Authorization::Entitlements(set) => {
                Authorization::Entitlements(self.import_entitlement_set(other, set))
            }
        }
    }

    pub fn import_access(&mut self, other: &TypeRegistry, access: &Access) -> Access {
        match access {
            Access::Primitive(p) => Access::Primitive(*p),
            Access::Entitlements(set) => Access::Entitlements(self.import_entitlement_set(other, set)),
        }
    }

    fn import_params(&mut self, other: &TypeRegistry, params: &[ParamType]) -> Vec<ParamType> {
        params
            .iter()
            .map(|p| ParamType {
                ty: self.import_type(other, &p.ty),
                ..p.clone()
            })
            .collect()
    }

    fn import_function(&mut self, other: &TypeRegistry, f: &FunctionType) -> FunctionType {
        FunctionType {
            type_params: f.type_params.clone(),
            params: self.import_params(other, &f.params),
            ret: self.import_type(other, &f.ret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::PrimitiveAccess;

    fn composite(name: &str, kind: CompositeKind, is_interface: bool) -> CompositeType {
        CompositeType {
            location: Location::named("test"),
            qualified_name: name.to_string(),
            name: name.to_string(),
            kind,
            is_interface,
            is_resource: kind == CompositeKind::Resource,
            access: Access::Primitive(PrimitiveAccess::All),
            conformances: Vec::new(),
            members: Vec::new(),
            container: None,
            nested: Vec::new(),
            init: None,
            has_destructor: false,
            base: None,
            enum_raw: None,
            span: sable_ast::span(0, 0),
        }
    }

    #[test]
    fn permits_follows_set_kinds() {
        let e = |ids: &[u32]| ids.iter().map(|i| EntitlementId(*i)).collect::<Vec<_>>();

        let required = EntitlementSet::conjunction(e(&[0, 1]));
        assert!(required.permits(&EntitlementSet::conjunction(e(&[0, 1, 2]))));
        assert!(!required.permits(&EntitlementSet::conjunction(e(&[0]))));
        assert!(!required.permits(&EntitlementSet::disjunction(e(&[0, 1]))));

        let either = EntitlementSet::disjunction(e(&[0, 1]));
        assert!(either.permits(&EntitlementSet::conjunction(e(&[1]))));
        assert!(either.permits(&EntitlementSet::disjunction(e(&[0]))));
        assert!(!either.permits(&EntitlementSet::disjunction(e(&[0, 2]))));

        let single = EntitlementSet::conjunction(e(&[0]));
        assert!(single.permits(&EntitlementSet::disjunction(e(&[0]))));
    }

    #[test]
    fn resource_kind_propagates_through_containers() {
        let mut registry = TypeRegistry::new();
        let r = registry.add_composite(composite("R", CompositeKind::Resource, false));
        let s = registry.add_composite(composite("S", CompositeKind::Struct, false));

        let r_ty = Type::Composite(r);
        assert!(registry.is_resource(&r_ty));
        assert!(registry.is_resource(&Type::optional(Type::VariableSized(Box::new(r_ty.clone())))));
        assert!(registry.is_resource(&Type::Dictionary(Box::new(Type::STRING), Box::new(r_ty.clone()))));
        assert!(!registry.is_resource(&Type::Composite(s)));
        assert!(!registry.is_resource(&Type::reference(Authorization::Unauthorized, r_ty)));
    }

    #[test]
    fn import_deduplicates_by_qualified_name() {
        let mut source = TypeRegistry::new();
        let i = source.add_composite(composite("I", CompositeKind::Resource, true));
        let mut r = composite("R", CompositeKind::Resource, false);
        r.conformances.push(i);
        let r = source.add_composite(r);

        let mut target = TypeRegistry::new();
        let first = target.import_type(&source, &Type::Composite(r));
        let second = target.import_type(&source, &Type::Composite(r));
        assert_eq!(first, second);
        assert_eq!(target.composites().count(), 2);

        let Type::Composite(imported) = first else {
            panic!("expected composite");
        };
        let interface = target.composite(imported).conformances[0];
        assert_eq!(target.composite(interface).name, "I");
    }

    #[test]
    fn type_names_render_like_annotations() {
        let mut registry = TypeRegistry::new();
        let r = registry.add_composite(composite("R", CompositeKind::Resource, false));
        let ty = Type::optional(Type::Dictionary(
            Box::new(Type::STRING),
            Box::new(Type::VariableSized(Box::new(Type::Composite(r)))),
        ));
        assert_eq!(registry.type_name(&ty), "{String: [R]}?");
    }
}

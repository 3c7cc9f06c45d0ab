#![forbid(unsafe_code)]

//! Subtyping, casting and interface conformance.
//!
//! Everything here is a pure function of the [`TypeRegistry`]; the checker
//! calls in whenever a value flows into a typed position.

use std::collections::BTreeSet;

use crate::access::Access;
use crate::config::AccessCheckMode;
use crate::types::{
    Authorization, CompositeId, FunctionType, MemberKind, PrimitiveType, Type, TypeRegistry,
};
use sable_ast::VarKind;

pub fn is_subtype(registry: &TypeRegistry, sub: &Type, sup: &Type) -> bool {
    if sub == sup {
        return true;
    }
    match (sub, sup) {
        (Type::Invalid, _) | (_, Type::Invalid) => return true,
        (Type::Primitive(PrimitiveType::Never), _) => return true,
        _ => {}
    }

    match sup {
        Type::Invalid => true,
        Type::Primitive(PrimitiveType::Any) => true,
        Type::Primitive(PrimitiveType::AnyStruct) => {
            !registry.is_resource(sub) && !is_unrestricted_top(sub)
        }
        Type::Primitive(PrimitiveType::AnyResource) => {
            registry.is_resource(sub) && !is_unrestricted_top(sub)
        }
        Type::Primitive(p) if p.is_numeric() => match sub {
            Type::Primitive(q) => is_numeric_subtype(*q, *p),
            _ => false,
        },
        Type::Primitive(_) => false,

        Type::Optional(sup_inner) => match sub {
            Type::Optional(sub_inner) => is_subtype(registry, sub_inner, sup_inner),
            _ => is_subtype(registry, sub, sup_inner),
        },

        Type::VariableSized(sup_elem) => match sub {
            Type::VariableSized(sub_elem) => is_subtype(registry, sub_elem, sup_elem),
            _ => false,
        },

        Type::ConstantSized(sup_elem, n) => match sub {
            Type::ConstantSized(sub_elem, m) => m == n && is_subtype(registry, sub_elem, sup_elem),
            _ => false,
        },

        Type::Dictionary(sup_key, sup_value) => match sub {
            Type::Dictionary(sub_key, sub_value) => {
                is_subtype(registry, sub_key, sup_key) && is_subtype(registry, sub_value, sup_value)
            }
            _ => false,
        },

        Type::Function(sup_fn) => match sub {
            Type::Function(sub_fn) => is_function_subtype(registry, sub_fn, sup_fn),
            _ => false,
        },

        Type::Reference {
            authorization: sup_auth,
            referenced: sup_ref,
        } => match sub {
            Type::Reference {
                authorization: sub_auth,
                referenced: sub_ref,
            } => {
                is_equal(registry, sub_ref, sup_ref) && is_authorization_subtype(sub_auth, sup_auth)
            }
            _ => false,
        },

        Type::Composite(_) => false,

        Type::Interface(interface) => match sub {
            Type::Composite(id) | Type::Interface(id) => {
                registry.all_conformances(*id).contains(interface)
            }
            Type::Intersection(set) => set
                .iter()
                .any(|id| id == interface || registry.all_conformances(*id).contains(interface)),
            _ => false,
        },

        Type::Intersection(required) => {
            let provided = match sub {
                Type::Composite(id) => registry.all_conformances(*id),
                Type::Interface(id) => {
                    let mut set = registry.all_conformances(*id);
                    set.insert(*id);
                    set
                }
                Type::Intersection(set) => intersection_closure(registry, set),
                _ => return false,
            };
            required.is_subset(&provided)
        }

        Type::Capability(None) => matches!(sub, Type::Capability(_)),
        Type::Capability(Some(sup_borrow)) => match sub {
            Type::Capability(Some(sub_borrow)) => is_subtype(registry, sub_borrow, sup_borrow),
            _ => false,
        },

        Type::Generic(_) => false,
    }
}

/// Mutual subtyping; ignores parameter labels of function types.
pub fn is_equal(registry: &TypeRegistry, a: &Type, b: &Type) -> bool {
    is_subtype(registry, a, b) && is_subtype(registry, b, a)
}

fn is_unrestricted_top(ty: &Type) -> bool {
    matches!(ty, Type::Primitive(PrimitiveType::Any))
}

fn is_numeric_subtype(sub: PrimitiveType, sup: PrimitiveType) -> bool {
    use PrimitiveType as P;
    if sub == sup {
        return true;
    }
    match sup {
        P::Number => sub.is_numeric(),
        P::SignedNumber => sub.is_numeric() && sub.is_signed(),
        P::Integer => sub.is_integer() || sub == P::SignedInteger,
        P::SignedInteger => sub.is_signed_integer(),
        P::FixedPoint => sub.is_fixed_point() || sub == P::SignedFixedPoint,
        P::SignedFixedPoint => sub == P::Fix64,
        _ => false,
    }
}

fn is_function_subtype(registry: &TypeRegistry, sub: &FunctionType, sup: &FunctionType) -> bool {
    sub.type_params.len() == sup.type_params.len()
        && sub.params.len() == sup.params.len()
        && sub
            .params
            .iter()
            .zip(&sup.params)
            .all(|(a, b)| is_subtype(registry, &b.ty, &a.ty))
        && is_subtype(registry, &sub.ret, &sup.ret)
}

/// `auth(E1) &T <: auth(E2) &T` iff `E2` permits `E1`; unauthorized is the top.
pub fn is_authorization_subtype(sub: &Authorization, sup: &Authorization) -> bool {
    match (sub, sup) {
        (_, Authorization::Unauthorized) => true,
        (Authorization::Unauthorized, Authorization::Entitlements(_)) => false,
        (Authorization::Entitlements(held), Authorization::Entitlements(required)) => {
            required.permits(held)
        }
    }
}

fn intersection_closure(registry: &TypeRegistry, set: &BTreeSet<CompositeId>) -> BTreeSet<CompositeId> {
    let mut out = set.clone();
    for id in set {
        out.extend(registry.all_conformances(*id));
    }
    out
}

/// Static casts never narrow.
pub fn is_valid_static_cast(registry: &TypeRegistry, from: &Type, to: &Type) -> bool {
    is_subtype(registry, from, to)
}

/// A failable or force cast is rejected only when it can never succeed
/// because exactly one side is a resource.
pub fn is_valid_dynamic_cast(registry: &TypeRegistry, from: &Type, to: &Type) -> bool {
    if from.is_invalid() || to.is_invalid() {
        return true;
    }
    let loose = |ty: &Type| matches!(ty.unwrap_optional(), Type::Primitive(PrimitiveType::Any));
    loose(from) || loose(to) || registry.is_resource(from) == registry.is_resource(to)
}

/// Finds the member of an intersection or interface set by name.
pub fn intersection_member<'r>(
    registry: &'r TypeRegistry,
    set: &BTreeSet<CompositeId>,
    name: &str,
) -> Option<(CompositeId, &'r crate::types::MemberInfo)> {
    set.iter().find_map(|id| {
        interface_member(registry, *id, name)
    })
}

/// Looks a member up on an interface and the interfaces it inherits.
pub fn interface_member<'r>(
    registry: &'r TypeRegistry,
    id: CompositeId,
    name: &str,
) -> Option<(CompositeId, &'r crate::types::MemberInfo)> {
    if let Some(member) = registry.composite(id).member(name) {
        return Some((id, member));
    }
    registry
        .all_conformances(id)
        .into_iter()
        .find_map(|parent| registry.composite(parent).member(name).map(|m| (parent, m)))
}

/// Two interfaces in the set declaring the same member name with different
/// types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberClash {
    pub member: String,
    pub first: CompositeId,
    pub second: CompositeId,
}

pub fn find_member_clash(
    registry: &TypeRegistry,
    interfaces: impl IntoIterator<Item = CompositeId>,
) -> Option<MemberClash> {
    let interfaces: Vec<CompositeId> = interfaces.into_iter().collect();
    for (i, first) in interfaces.iter().enumerate() {
        for second in &interfaces[i + 1..] {
            for member in &registry.composite(*first).members {
                let Some(other) = registry.composite(*second).member(&member.name) else {
                    continue;
                };
                let same_kind = std::mem::discriminant(&member.kind)
                    == std::mem::discriminant(&other.kind);
                if !same_kind || !is_equal(registry, &member.ty, &other.ty) {
                    return Some(MemberClash {
                        member: member.name.clone(),
                        first: *first,
                        second: *second,
                    });
                }
            }
        }
    }
    None
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConformanceResult {
    /// Interface members with no counterpart.
    pub missing: Vec<String>,
    /// Members present with an incompatible kind, type or access.
    pub mismatched: Vec<String>,
    pub initializer_mismatch: bool,
}

impl ConformanceResult {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty() && !self.initializer_mismatch
    }
}

/// Member-by-member check of `composite` against `interface`.
pub fn check_conformance(
    registry: &TypeRegistry,
    composite: CompositeId,
    interface: CompositeId,
    mode: AccessCheckMode,
) -> ConformanceResult {
    let mut result = ConformanceResult::default();
    let record = registry.composite(composite);
    let required = registry.composite(interface);

    for requirement in &required.members {
        let Some(member) = record.member(&requirement.name) else {
            result.missing.push(requirement.name.clone());
            continue;
        };

        let kind_ok = match (requirement.kind, member.kind) {
            (MemberKind::Field(VarKind::Var), MemberKind::Field(VarKind::Var)) => true,
            (MemberKind::Field(VarKind::Var), MemberKind::Field(VarKind::Let)) => false,
            (MemberKind::Field(VarKind::Let), MemberKind::Field(_)) => true,
            (MemberKind::Function, MemberKind::Function) => true,
            (MemberKind::EnumCase, MemberKind::EnumCase) => true,
            _ => false,
        };
        let type_ok = match member.kind {
            // Settable fields are read and written, so they are invariant.
            MemberKind::Field(VarKind::Var) => is_equal(registry, &member.ty, &requirement.ty),
            _ => is_subtype(registry, &member.ty, &requirement.ty),
        };
        let access_ok = !member_access(&member.access, mode, record.is_interface)
            .is_less_permissive(&member_access(&requirement.access, mode, true));

        if !(kind_ok && type_ok && access_ok) {
            result.mismatched.push(requirement.name.clone());
        }
    }

    if let Some(required_params) = &required.init {
        let params = record.init.as_deref().unwrap_or(&[]);
        result.initializer_mismatch = params.len() != required_params.len()
            || params
                .iter()
                .zip(required_params)
                .any(|(a, b)| !is_equal(registry, &a.ty, &b.ty));
    }

    result
}

fn member_access(access: &Access, mode: AccessCheckMode, in_interface: bool) -> Access {
    access.effective(mode, in_interface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::types::{CompositeType, EntitlementId, EntitlementSet, MemberInfo, ParamType};
    use proptest::prelude::{Just, Strategy, prop, prop_oneof};
    use proptest::test_runner::{Config, TestRunner};
    use sable_ast::CompositeKind;

    fn record(name: &str, kind: CompositeKind, is_interface: bool) -> CompositeType {
        CompositeType {
            location: Location::named("test"),
            qualified_name: name.to_string(),
            name: name.to_string(),
            kind,
            is_interface,
            is_resource: kind == CompositeKind::Resource,
            access: Access::ALL,
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

    fn field(name: &str, kind: VarKind, ty: Type, access: Access) -> MemberInfo {
        MemberInfo {
            name: name.to_string(),
            access,
            kind: MemberKind::Field(kind),
            ty,
            span: sable_ast::span(0, 0),
        }
    }

    /// `R: I1, I2` plus the two interfaces.
    fn resource_world() -> (TypeRegistry, CompositeId, CompositeId, CompositeId) {
        let mut registry = TypeRegistry::new();
        let i1 = registry.add_composite(record("I1", CompositeKind::Resource, true));
        let i2 = registry.add_composite(record("I2", CompositeKind::Resource, true));
        let mut r = record("R", CompositeKind::Resource, false);
        r.conformances = vec![i1, i2];
        let r = registry.add_composite(r);
        (registry, r, i1, i2)
    }

    #[test]
    fn never_is_bottom_and_optional_wraps() {
        let registry = TypeRegistry::new();
        assert!(is_subtype(&registry, &Type::NEVER, &Type::INT));
        assert!(is_subtype(&registry, &Type::INT, &Type::optional(Type::INT)));
        assert!(is_subtype(
            &registry,
            &Type::optional(Type::NEVER),
            &Type::optional(Type::STRING)
        ));
        assert!(!is_subtype(&registry, &Type::optional(Type::INT), &Type::INT));
    }

    #[test]
    fn invalid_is_compatible_both_ways() {
        let (registry, r, _, _) = resource_world();
        let r = Type::Composite(r);
        assert!(is_subtype(&registry, &Type::Invalid, &r));
        assert!(is_subtype(&registry, &r, &Type::Invalid));
        assert!(is_subtype(&registry, &Type::optional(Type::INT), &Type::Invalid));
        assert!(is_equal(&registry, &Type::Invalid, &Type::STRING));
    }

    #[test]
    fn numeric_hierarchy() {
        let registry = TypeRegistry::new();
        let p = |p| Type::Primitive(p);
        assert!(is_subtype(&registry, &p(PrimitiveType::Int8), &p(PrimitiveType::SignedInteger)));
        assert!(is_subtype(&registry, &p(PrimitiveType::UInt8), &p(PrimitiveType::Integer)));
        assert!(!is_subtype(&registry, &p(PrimitiveType::UInt8), &p(PrimitiveType::SignedNumber)));
        assert!(is_subtype(&registry, &p(PrimitiveType::Fix64), &p(PrimitiveType::SignedFixedPoint)));
        assert!(is_subtype(&registry, &p(PrimitiveType::UFix64), &p(PrimitiveType::Number)));
        assert!(!is_subtype(&registry, &p(PrimitiveType::Int), &p(PrimitiveType::UInt)));
    }

    #[test]
    fn top_types_are_scoped_by_kind() {
        let (registry, r, _, _) = resource_world();
        let r = Type::Composite(r);
        assert!(is_subtype(&registry, &r, &Type::ANY_RESOURCE));
        assert!(!is_subtype(&registry, &r, &Type::ANY_STRUCT));
        assert!(is_subtype(&registry, &Type::INT, &Type::ANY_STRUCT));
        assert!(!is_subtype(&registry, &Type::ANY_RESOURCE, &r));
        assert!(!is_subtype(&registry, &Type::Primitive(PrimitiveType::Any), &Type::ANY_STRUCT));
    }

    #[test]
    fn intersections_widen_with_fewer_requirements() {
        let (registry, r, i1, i2) = resource_world();
        let both = Type::Intersection([i1, i2].into());
        let one = Type::Intersection([i1].into());

        assert!(is_subtype(&registry, &both, &one));
        assert!(!is_subtype(&registry, &one, &both));
        assert!(is_subtype(&registry, &Type::Composite(r), &both));
        assert!(is_subtype(&registry, &both, &Type::Interface(i2)));
        assert!(is_subtype(&registry, &both, &Type::ANY_RESOURCE));

        assert!(is_valid_static_cast(&registry, &both, &one));
        assert!(!is_valid_static_cast(&registry, &one, &both));
        assert!(is_valid_dynamic_cast(&registry, &one, &both));
        assert!(!is_valid_dynamic_cast(&registry, &one, &Type::INT));
    }

    #[test]
    fn references_are_invariant_in_the_pointee() {
        let (registry, r, i1, _) = resource_world();
        let e = |ids: &[u32]| {
            Authorization::Entitlements(EntitlementSet::conjunction(
                ids.iter().map(|i| EntitlementId(*i)),
            ))
        };
        let r_ref = |auth| Type::reference(auth, Type::Composite(r));

        assert!(is_subtype(&registry, &r_ref(e(&[0])), &r_ref(Authorization::Unauthorized)));
        assert!(!is_subtype(&registry, &r_ref(Authorization::Unauthorized), &r_ref(e(&[0]))));
        assert!(is_subtype(&registry, &r_ref(e(&[0, 1])), &r_ref(e(&[0]))));
        assert!(!is_subtype(&registry, &r_ref(e(&[0])), &r_ref(e(&[0, 1]))));
        assert!(!is_subtype(
            &registry,
            &r_ref(Authorization::Unauthorized),
            &Type::reference(Authorization::Unauthorized, Type::Intersection([i1].into()))
        ));
    }

    #[test]
    fn functions_are_contravariant_in_parameters() {
        let registry = TypeRegistry::new();
        let param = |ty| ParamType {
            label: None,
            name: "x".to_string(),
            ty,
        };
        let takes_optional = Type::function(vec![param(Type::optional(Type::INT))], Type::INT);
        let takes_int = Type::function(vec![param(Type::INT)], Type::optional(Type::INT));
        assert!(is_subtype(&registry, &takes_optional, &takes_int));
        assert!(!is_subtype(&registry, &takes_int, &takes_optional));
    }

    #[test]
    fn conformance_checks_kind_type_and_access() {
        let mut registry = TypeRegistry::new();
        let mut interface = record("I", CompositeKind::Struct, true);
        interface.members = vec![
            field("a", VarKind::Var, Type::INT, Access::NOT_SPECIFIED),
            field("b", VarKind::Let, Type::ANY_STRUCT, Access::NOT_SPECIFIED),
            field("c", VarKind::Let, Type::INT, Access::NOT_SPECIFIED),
        ];
        let interface = registry.add_composite(interface);

        let mut good = record("Good", CompositeKind::Struct, false);
        good.conformances = vec![interface];
        good.members = vec![
            field("a", VarKind::Var, Type::INT, Access::ALL),
            field("b", VarKind::Let, Type::STRING, Access::ALL),
            field("c", VarKind::Var, Type::INT, Access::ALL),
        ];
        let good = registry.add_composite(good);

        let mut bad = record("Bad", CompositeKind::Struct, false);
        bad.conformances = vec![interface];
        bad.members = vec![
            field("a", VarKind::Let, Type::INT, Access::ALL),
            field("b", VarKind::Let, Type::STRING, Access::PRIVATE),
        ];
        let bad = registry.add_composite(bad);

        let mode = AccessCheckMode::NotSpecifiedUnrestricted;
        assert!(check_conformance(&registry, good, interface, mode).is_ok());
        let result = check_conformance(&registry, bad, interface, mode);
        assert_eq!(result.missing, vec!["c".to_string()]);
        assert_eq!(result.mismatched, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn clashing_interface_members_are_found() {
        let mut registry = TypeRegistry::new();
        let mut a = record("A", CompositeKind::Struct, true);
        a.members = vec![field("x", VarKind::Let, Type::INT, Access::ALL)];
        let a = registry.add_composite(a);
        let mut b = record("B", CompositeKind::Struct, true);
        b.members = vec![field("x", VarKind::Let, Type::STRING, Access::ALL)];
        let b = registry.add_composite(b);
        let mut c = record("C", CompositeKind::Struct, true);
        c.members = vec![field("x", VarKind::Let, Type::INT, Access::ALL)];
        let c = registry.add_composite(c);

        assert_eq!(
            find_member_clash(&registry, [a, b]),
            Some(MemberClash {
                member: "x".to_string(),
                first: a,
                second: b
            })
        );
        assert_eq!(find_member_clash(&registry, [a, c]), None);
    }

    fn simple_type() -> impl Strategy<Value = Type> {
        let leaf = prop_oneof![
            Just(Type::NEVER),
            Just(Type::BOOL),
            Just(Type::STRING),
            Just(Type::ANY_STRUCT),
            Just(Type::Primitive(PrimitiveType::Int8)),
            Just(Type::Primitive(PrimitiveType::UInt64)),
            Just(Type::Primitive(PrimitiveType::Fix64)),
            Just(Type::Primitive(PrimitiveType::Integer)),
            Just(Type::Primitive(PrimitiveType::SignedNumber)),
            Just(Type::Primitive(PrimitiveType::Number)),
        ];
        leaf.prop_recursive(3, 8, 1, |inner| {
            prop_oneof![
                inner.clone().prop_map(Type::optional),
                inner.prop_map(|t| Type::VariableSized(Box::new(t))),
            ]
        })
    }

    #[test]
    fn subtyping_is_reflexive_and_transitive() {
        let registry = TypeRegistry::new();
        let mut runner = TestRunner::new(Config {
            cases: 256,
            ..Config::default()
        });
        runner
            .run(&(simple_type(), simple_type(), simple_type()), |(a, b, c)| {
                assert!(is_subtype(&registry, &a, &a));
                if is_subtype(&registry, &a, &b) && is_subtype(&registry, &b, &c) {
                    assert!(
                        is_subtype(&registry, &a, &c),
                        "{} <: {} <: {}",
                        registry.type_name(&a),
                        registry.type_name(&b),
                        registry.type_name(&c)
                    );
                }
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn static_casts_never_narrow() {
        let registry = TypeRegistry::new();
        let mut runner = TestRunner::new(Config {
            cases: 256,
            ..Config::default()
        });
        runner
            .run(&prop::collection::vec(simple_type(), 2), |types| {
                let (wide, narrow) = (&types[0], &types[1]);
                if is_subtype(&registry, narrow, wide) && !is_subtype(&registry, wide, narrow) {
                    assert!(!is_valid_static_cast(&registry, wide, narrow));
                    assert!(is_valid_static_cast(&registry, narrow, wide));
                }
                Ok(())
            })
            .unwrap();
    }
}

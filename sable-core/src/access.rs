#![forbid(unsafe_code)]

use crate::config::AccessCheckMode;
use crate::location::Location;
use crate::types::{Authorization, CompositeId, EntitlementSet, TypeRegistry};

/// Non-entitlement access levels, ordered from least to most permissive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveAccess {
    NotSpecified,
    Private,
    Contract,
    Account,
    All,
    AllSettable,
}

impl PrimitiveAccess {
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveAccess::NotSpecified => "not specified",
            PrimitiveAccess::Private => "access(self)",
            PrimitiveAccess::Contract => "access(contract)",
            PrimitiveAccess::Account => "access(account)",
            PrimitiveAccess::All => "access(all)",
            PrimitiveAccess::AllSettable => "pub(set)",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    Primitive(PrimitiveAccess),
    Entitlements(EntitlementSet),
}

impl Access {
    pub const NOT_SPECIFIED: Access = Access::Primitive(PrimitiveAccess::NotSpecified);
    pub const PRIVATE: Access = Access::Primitive(PrimitiveAccess::Private);
    pub const ALL: Access = Access::Primitive(PrimitiveAccess::All);

    pub fn is_not_specified(&self) -> bool {
        matches!(self, Access::Primitive(PrimitiveAccess::NotSpecified))
    }

    pub fn is_primitive(&self, access: PrimitiveAccess) -> bool {
        matches!(self, Access::Primitive(p) if *p == access)
    }

    /// Entitlement access is more restrictive than every primitive level
    /// except `self`.
    pub fn is_less_permissive(&self, other: &Access) -> bool {
        match (self, other) {
            (Access::Primitive(a), Access::Primitive(b)) => a < b,
            (Access::Primitive(a), Access::Entitlements(_)) => *a == PrimitiveAccess::Private,
            (Access::Entitlements(_), Access::Primitive(b)) => *b != PrimitiveAccess::Private,
            (Access::Entitlements(a), Access::Entitlements(b)) => !a.permits(b),
        }
    }

    /// What a missing modifier means for a member of a composite or
    /// interface under `mode`.
    pub fn effective(&self, mode: AccessCheckMode, in_interface: bool) -> Access {
        if !self.is_not_specified() {
            return self.clone();
        }
        if in_interface || !mode.restricts_not_specified() {
            Access::ALL
        } else {
            Access::PRIVATE
        }
    }

    pub fn describe(&self, registry: &TypeRegistry) -> String {
        match self {
            Access::Primitive(p) => p.keyword().to_string(),
            Access::Entitlements(set) => format!("access({})", registry.entitlement_set_name(set)),
        }
    }
}

/// How the value whose member is accessed was obtained.
#[derive(Clone, Copy, Debug)]
pub enum Receiver<'a> {
    /// An owned composite value, fully authorized.
    Owned,
    /// `self` inside the composite.
    SelfValue,
    Reference(&'a Authorization),
}

/// Reference-site view used to decide whether a member may be read or written.
#[derive(Clone, Copy, Debug)]
pub struct AccessContext<'a> {
    pub mode: AccessCheckMode,
    /// Composites lexically enclosing the reference site, outermost first.
    pub containers: &'a [CompositeId],
    pub location: &'a Location,
}

impl AccessContext<'_> {
    pub fn is_inside(&self, id: CompositeId) -> bool {
        self.containers.contains(&id)
    }

    pub fn can_read_member(
        &self,
        registry: &TypeRegistry,
        container: CompositeId,
        access: &Access,
        receiver: Receiver<'_>,
    ) -> bool {
        if self.mode == AccessCheckMode::None {
            return true;
        }
        let record = registry.composite(container);
        let effective = access.effective(self.mode, record.is_interface);
        match effective {
            Access::Entitlements(required) => match receiver {
                Receiver::Owned | Receiver::SelfValue => true,
                Receiver::Reference(Authorization::Unauthorized) => false,
                Receiver::Reference(Authorization::Entitlements(held)) => required.permits(held),
            },
            Access::Primitive(level) => {
                if self.is_inside(container) {
                    return true;
                }
                match level {
                    PrimitiveAccess::All | PrimitiveAccess::AllSettable => true,
                    PrimitiveAccess::NotSpecified => {
                        self.mode == AccessCheckMode::NotSpecifiedUnrestricted
                    }
                    PrimitiveAccess::Private => false,
                    PrimitiveAccess::Contract => registry
                        .containing_contract(container)
                        .is_some_and(|contract| self.is_inside(contract)),
                    PrimitiveAccess::Account => self.location.same_account(&record.location),
                }
            }
        }
    }

    /// Writes use the declared access; only settable fields are writable
    /// from outside their composite.
    pub fn can_write_member(&self, container: CompositeId, declared: &Access) -> bool {
        if self.mode == AccessCheckMode::None || self.is_inside(container) {
            return true;
        }
        match declared {
            Access::Primitive(PrimitiveAccess::AllSettable) => true,
            Access::Primitive(PrimitiveAccess::NotSpecified) => {
                self.mode == AccessCheckMode::NotSpecifiedUnrestricted
            }
            _ => false,
        }
    }

    /// Whether a global declared with `declared` access at `from` may be
    /// imported into this location.
    pub fn can_import(&self, declared: &Access, from: &Location) -> bool {
        if self.mode == AccessCheckMode::None {
            return true;
        }
        match declared {
            Access::Primitive(PrimitiveAccess::Private | PrimitiveAccess::Contract) => false,
            Access::Primitive(PrimitiveAccess::Account) => self.location.same_account(from),
            Access::Primitive(PrimitiveAccess::NotSpecified) => {
                !self.mode.restricts_not_specified()
            }
            _ => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    Constant,
    Variable,
    Function,
    Type,
    Entitlement,
}

impl DeclarationKind {
    pub fn name(self) -> &'static str {
        match self {
            DeclarationKind::Constant => "constant",
            DeclarationKind::Variable => "variable",
            DeclarationKind::Function => "function",
            DeclarationKind::Type => "type",
            DeclarationKind::Entitlement => "entitlement",
        }
    }

    fn is_type_declaration(self) -> bool {
        matches!(self, DeclarationKind::Type | DeclarationKind::Entitlement)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessViolation {
    Invalid { explanation: &'static str },
    Missing,
}

/// Where a declaration sits, for declaration-site modifier rules.
#[derive(Clone, Copy, Debug)]
pub struct DeclarationSite {
    pub kind: DeclarationKind,
    pub is_local: bool,
    /// Member of a composite or interface.
    pub is_member: bool,
}

const TYPE_ACCESS_EXPLANATION: &str = "type declarations must be public";

/// Declaration-site validation. Reports at most one violation.
pub fn check_declaration_access(
    access: &Access,
    site: DeclarationSite,
    mode: AccessCheckMode,
) -> Option<AccessViolation> {
    if site.is_local {
        return (!access.is_not_specified()).then_some(AccessViolation::Invalid {
            explanation: "local declarations may not have an access modifier",
        });
    }

    let is_type = site.kind.is_type_declaration();
    let is_constant = matches!(
        site.kind,
        DeclarationKind::Constant | DeclarationKind::Function
    );

    match access {
        Access::Primitive(PrimitiveAccess::AllSettable) => {
            if is_constant {
                Some(AccessViolation::Invalid {
                    explanation: "constants can never be set",
                })
            } else if is_type {
                Some(AccessViolation::Invalid {
                    explanation: TYPE_ACCESS_EXPLANATION,
                })
            } else {
                None
            }
        }
        Access::Primitive(
            PrimitiveAccess::Private | PrimitiveAccess::Contract | PrimitiveAccess::Account,
        ) => is_type.then_some(AccessViolation::Invalid {
            explanation: TYPE_ACCESS_EXPLANATION,
        }),
        Access::Primitive(PrimitiveAccess::All) => None,
        Access::Primitive(PrimitiveAccess::NotSpecified) => {
            if mode == AccessCheckMode::Strict
                || (is_type && mode == AccessCheckMode::NotSpecifiedRestricted)
            {
                Some(AccessViolation::Missing)
            } else {
                None
            }
        }
        Access::Entitlements(_) => {
            if is_type {
                Some(AccessViolation::Invalid {
                    explanation: TYPE_ACCESS_EXPLANATION,
                })
            } else if !site.is_member {
                Some(AccessViolation::Invalid {
                    explanation: "entitlement access is only valid on composite members",
                })
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompositeType, EntitlementId};
    use sable_ast::CompositeKind;

    fn registry_with(kinds: &[(CompositeKind, Option<u32>)], location: &Location) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        for (i, (kind, container)) in kinds.iter().enumerate() {
            registry.add_composite(CompositeType {
                location: location.clone(),
                qualified_name: format!("C{i}"),
                name: format!("C{i}"),
                kind: *kind,
                is_interface: false,
                is_resource: false,
                access: Access::ALL,
                conformances: Vec::new(),
                members: Vec::new(),
                container: container.map(CompositeId),
                nested: Vec::new(),
                init: None,
                has_destructor: false,
                base: None,
                enum_raw: None,
                span: sable_ast::span(0, 0),
            });
        }
        registry
    }

    #[test]
    fn primitive_levels_are_ordered() {
        let private = Access::PRIVATE;
        let contract = Access::Primitive(PrimitiveAccess::Contract);
        assert!(private.is_less_permissive(&contract));
        assert!(contract.is_less_permissive(&Access::ALL));
        assert!(!Access::ALL.is_less_permissive(&private));

        let e = Access::Entitlements(EntitlementSet::conjunction([EntitlementId(0)]));
        assert!(e.is_less_permissive(&Access::ALL));
        assert!(!e.is_less_permissive(&private));
        assert!(private.is_less_permissive(&e));
        assert!(!Access::ALL.is_less_permissive(&e));
    }

    #[test]
    fn not_specified_resolves_per_mode() {
        for mode in AccessCheckMode::ALL {
            let member = Access::NOT_SPECIFIED.effective(mode, false);
            let expected = if mode.restricts_not_specified() {
                Access::PRIVATE
            } else {
                Access::ALL
            };
            assert_eq!(member, expected, "{mode}");
            assert_eq!(Access::NOT_SPECIFIED.effective(mode, true), Access::ALL);
        }
    }

    #[test]
    fn private_members_are_readable_only_inside() {
        let location = Location::named("test");
        let registry = registry_with(&[(CompositeKind::Struct, None)], &location);
        let outside = AccessContext {
            mode: AccessCheckMode::Strict,
            containers: &[],
            location: &location,
        };
        let inside_stack = [CompositeId(0)];
        let inside = AccessContext {
            containers: &inside_stack,
            ..outside
        };

        for mode in AccessCheckMode::ALL {
            let ctx = AccessContext { mode, ..outside };
            let readable =
                ctx.can_read_member(&registry, CompositeId(0), &Access::PRIVATE, Receiver::Owned);
            assert_eq!(readable, mode == AccessCheckMode::None, "{mode}");
        }
        assert!(inside.can_read_member(&registry, CompositeId(0), &Access::PRIVATE, Receiver::Owned));
    }

    #[test]
    fn contract_access_extends_to_nested_types() {
        let location = Location::named("test");
        let registry = registry_with(
            &[
                (CompositeKind::Contract, None),
                (CompositeKind::Struct, Some(0)),
                (CompositeKind::Resource, Some(0)),
            ],
            &location,
        );
        let in_sibling = [CompositeId(0), CompositeId(2)];
        let ctx = AccessContext {
            mode: AccessCheckMode::Strict,
            containers: &in_sibling,
            location: &location,
        };
        let contract = Access::Primitive(PrimitiveAccess::Contract);
        assert!(ctx.can_read_member(&registry, CompositeId(1), &contract, Receiver::Owned));
        assert!(!ctx.can_read_member(&registry, CompositeId(1), &Access::PRIVATE, Receiver::Owned));

        let top = AccessContext {
            containers: &[],
            ..ctx
        };
        assert!(!top.can_read_member(&registry, CompositeId(1), &contract, Receiver::Owned));
    }

    #[test]
    fn account_access_follows_address() {
        let defining = Location::address(1, "A");
        let registry = registry_with(&[(CompositeKind::Struct, None)], &defining);
        let account = Access::Primitive(PrimitiveAccess::Account);
        let same = Location::address(1, "B");
        let other = Location::address(2, "B");
        for (location, expected) in [(&same, true), (&other, false)] {
            let ctx = AccessContext {
                mode: AccessCheckMode::Strict,
                containers: &[],
                location,
            };
            assert_eq!(
                ctx.can_read_member(&registry, CompositeId(0), &account, Receiver::Owned),
                expected
            );
        }
    }

    #[test]
    fn entitled_members_need_authorized_references() {
        let location = Location::named("test");
        let registry = registry_with(&[(CompositeKind::Struct, None)], &location);
        let ctx = AccessContext {
            mode: AccessCheckMode::NotSpecifiedUnrestricted,
            containers: &[],
            location: &location,
        };
        let required = Access::Entitlements(EntitlementSet::conjunction([EntitlementId(0)]));
        let held = Authorization::Entitlements(EntitlementSet::conjunction([
            EntitlementId(0),
            EntitlementId(1),
        ]));
        let wrong = Authorization::Entitlements(EntitlementSet::conjunction([EntitlementId(1)]));

        let read = |receiver| ctx.can_read_member(&registry, CompositeId(0), &required, receiver);
        assert!(read(Receiver::Owned));
        assert!(read(Receiver::Reference(&held)));
        assert!(!read(Receiver::Reference(&wrong)));
        assert!(!read(Receiver::Reference(&Authorization::Unauthorized)));
    }

    #[test]
    fn writes_need_settable_access_outside() {
        let location = Location::named("test");
        let settable = Access::Primitive(PrimitiveAccess::AllSettable);
        for mode in AccessCheckMode::ALL {
            let ctx = AccessContext {
                mode,
                containers: &[],
                location: &location,
            };
            let none = mode == AccessCheckMode::None;
            assert!(ctx.can_write_member(CompositeId(0), &settable));
            assert_eq!(ctx.can_write_member(CompositeId(0), &Access::ALL), none);
            assert_eq!(ctx.can_write_member(CompositeId(0), &Access::PRIVATE), none);
            assert_eq!(
                ctx.can_write_member(CompositeId(0), &Access::NOT_SPECIFIED),
                none || mode == AccessCheckMode::NotSpecifiedUnrestricted
            );
        }
    }

    #[test]
    fn declaration_site_rules() {
        let global = |kind| DeclarationSite {
            kind,
            is_local: false,
            is_member: false,
        };
        let settable = Access::Primitive(PrimitiveAccess::AllSettable);
        let mode = AccessCheckMode::NotSpecifiedUnrestricted;

        assert!(matches!(
            check_declaration_access(
                &Access::ALL,
                DeclarationSite {
                    kind: DeclarationKind::Variable,
                    is_local: true,
                    is_member: false
                },
                mode
            ),
            Some(AccessViolation::Invalid { .. })
        ));
        assert!(check_declaration_access(&settable, global(DeclarationKind::Variable), mode).is_none());
        assert!(check_declaration_access(&settable, global(DeclarationKind::Constant), mode).is_some());
        assert!(check_declaration_access(&settable, global(DeclarationKind::Function), mode).is_some());
        assert!(check_declaration_access(&Access::PRIVATE, global(DeclarationKind::Type), mode).is_some());
        assert!(check_declaration_access(&Access::PRIVATE, global(DeclarationKind::Function), mode).is_none());

        assert_eq!(
            check_declaration_access(
                &Access::NOT_SPECIFIED,
                global(DeclarationKind::Type),
                AccessCheckMode::NotSpecifiedRestricted
            ),
            Some(AccessViolation::Missing)
        );
        assert_eq!(
            check_declaration_access(
                &Access::NOT_SPECIFIED,
                global(DeclarationKind::Function),
                AccessCheckMode::NotSpecifiedRestricted
            ),
            None
        );
        assert_eq!(
            check_declaration_access(
                &Access::NOT_SPECIFIED,
                global(DeclarationKind::Function),
                AccessCheckMode::Strict
            ),
            Some(AccessViolation::Missing)
        );

        let entitled = Access::Entitlements(EntitlementSet::conjunction([EntitlementId(0)]));
        assert!(check_declaration_access(&entitled, global(DeclarationKind::Function), mode).is_some());
        assert!(
            check_declaration_access(
                &entitled,
                DeclarationSite {
                    kind: DeclarationKind::Function,
                    is_local: false,
                    is_member: true
                },
                mode
            )
            .is_none()
        );
    }
}

mod common;

use common::{check, check_in_mode, check_with};
use sable_core::{AccessCheckMode, CheckerConfig, ErrorKind, SemanticError};

#[test]
fn global_modifiers_per_mode() {
    let src = r#"
        struct S {}
        fun f() {}
    "#;
    expect_errors!(
        check_in_mode(src, AccessCheckMode::Strict),
        MissingAccessModifier,
        MissingAccessModifier
    );
    // Only type declarations need a modifier here.
    expect_errors!(
        check_in_mode(src, AccessCheckMode::NotSpecifiedRestricted),
        MissingAccessModifier
    );
    expect_errors!(check_in_mode(src, AccessCheckMode::NotSpecifiedUnrestricted));
    expect_errors!(check_in_mode(src, AccessCheckMode::None));
}

#[test]
fn unspecified_type_access_per_composite_kind() {
    let kinds = [
        "struct",
        "resource",
        "contract",
        "struct interface",
        "resource interface",
    ];
    for kind in kinds {
        let bare = format!("{kind} T {{}}");
        let public = format!("access(all) {kind} T {{}}");
        for mode in AccessCheckMode::ALL {
            let expected = match mode {
                AccessCheckMode::Strict | AccessCheckMode::NotSpecifiedRestricted => {
                    vec![ErrorKind::MissingAccessModifier]
                }
                AccessCheckMode::NotSpecifiedUnrestricted | AccessCheckMode::None => Vec::new(),
            };
            assert_eq!(check_in_mode(&bare, mode).kinds(), expected, "{kind} under {mode}");
            assert!(check_in_mode(&public, mode).is_ok(), "access(all) {kind} under {mode}");
        }
    }
}

#[test]
fn explicit_modifiers_satisfy_strict_mode() {
    let src = r#"
        access(all) struct S {
            access(all) let x: Int
            access(self) var y: Int
            init() {
                self.x = 1
                self.y = 2
            }
            access(account) fun f() {}
        }
        access(all) fun g() {}
        access(account) let c: Int = 1
    "#;
    expect_errors!(check_in_mode(src, AccessCheckMode::Strict));
}

#[test]
fn type_declarations_must_be_public() {
    let checked = check("access(self) struct S {}");
    expect_errors!(checked, InvalidAccessModifier);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::InvalidAccessModifier { declaration, .. } if declaration == "type"
    ));
}

#[test]
fn settable_access_is_only_for_variables() {
    let src = r#"
        pub(set) let c: Int = 1
        pub(set) var v: Int = 1
        pub(set) fun f() {}
    "#;
    expect_errors!(check(src), InvalidAccessModifier, InvalidAccessModifier);
}

#[test]
fn local_declarations_take_no_modifier() {
    let src = r#"
        fun test() {
            access(all) let x = 1
            fun inner() {}
            access(self) fun hidden() {}
        }
    "#;
    expect_errors!(check(src), InvalidAccessModifier, InvalidAccessModifier);
}

#[test]
fn entitlement_access_belongs_on_members() {
    let src = r#"
        entitlement E
        access(E) fun f() {}
        struct S {
            access(E) fun g() {}
        }
    "#;
    expect_errors!(check(src), InvalidAccessModifier);
}

#[test]
fn redeclarations_are_reported_once() {
    let src = r#"
        struct S {}
        struct S {}
        fun f() {}
        fun f() {}
        entitlement E
        entitlement E
    "#;
    let checked = check(src);
    expect_errors!(checked, Redeclaration, Redeclaration, Redeclaration);
    let kinds: Vec<&str> = checked
        .diagnostics
        .iter()
        .map(|d| match d {
            SemanticError::Redeclaration { kind, .. } => *kind,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(kinds, vec!["type", "entitlement", "value"]);
}

#[test]
fn builtin_type_names_cannot_be_redeclared() {
    expect_errors!(check("struct Int {}"), Redeclaration);
}

#[test]
fn declarations_may_refer_forward() {
    let src = r#"
        fun first(): Int {
            return second() + Later().value
        }

        fun second(): Int {
            return 2
        }

        struct Later {
            let value: Int
            init() {
                self.value = 1
            }
        }
    "#;
    expect_errors!(check(src));
}

#[test]
fn attachments_are_feature_gated() {
    let src = r#"
        struct S {}
        attachment A for S {}
    "#;
    expect_errors!(check(src), AttachmentsNotEnabled);
    expect_errors!(check_with(
        src,
        CheckerConfig::default().with_attachments(true)
    ));
}

#[test]
fn only_contracts_nest_declarations() {
    let src = r#"
        struct Outer {
            struct Inner {}
        }

        contract C {
            struct Inner {}
            resource R {}
        }

        fun test() {
            struct Local {}
        }
    "#;
    let checked = check(src);
    expect_errors!(checked, InvalidNestedDeclaration, InvalidNestedDeclaration);
    assert!(matches!(
        &checked.diagnostics[1],
        SemanticError::InvalidNestedDeclaration { container, .. } if container == "function"
    ));
}

#[test]
fn composite_shape_rules() {
    let src = r#"
        resource R {}

        struct HoldsResource {
            var r: @R
            init(r: @R) {
                self.r <- r
            }
        }

        resource NoDestructor {
            var r: @R
            init() {
                self.r <- create R()
            }
        }

        struct NoInit {
            let x: Int
        }

        struct Destructible {
            destroy() {}
        }

        struct Abstract {
            fun f(): Int
        }
    "#;
    expect_errors!(
        check(src),
        InvalidResourceField,
        MissingDestructor,
        MissingInitializer,
        InvalidDestructor,
        MissingFunctionBody
    );
}

#[test]
fn resource_annotations_must_match_the_kind() {
    let src = r#"
        resource R {}
        struct S {}

        fun f(r: R, s: @S) {
            destroy r
        }
    "#;
    expect_errors!(
        check(src),
        MissingResourceAnnotation,
        InvalidResourceAnnotation
    );
}

#[test]
fn conformance_requires_every_member() {
    let src = r#"
        struct interface HasValue {
            fun value(): Int
            fun name(): String {
                return "default"
            }
        }

        struct Missing: HasValue {}

        struct Complete: HasValue {
            fun value(): Int {
                return 1
            }
        }

        struct WrongType: HasValue {
            fun value(): String {
                return "one"
            }
        }
    "#;
    let checked = check(src);
    expect_errors!(checked, Conformance, Conformance);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::Conformance { missing, .. } if missing == &vec!["value".to_string()]
    ));
    assert!(matches!(
        &checked.diagnostics[1],
        SemanticError::Conformance { missing, mismatched, .. }
            if missing.is_empty() && mismatched == &vec!["value".to_string()]
    ));
}

#[test]
fn conformance_compares_access() {
    let src = r#"
        struct interface I {
            access(all) fun f()
        }

        struct S: I {
            access(self) fun f() {}
        }
    "#;
    expect_errors!(check(src), Conformance);
}

#[test]
fn conformance_kinds_and_targets() {
    let src = r#"
        resource interface RI {}
        struct interface SI {}
        struct Plain {}

        struct A: RI {}
        struct B: SI, SI {}
        struct C: Plain {}
    "#;
    expect_errors!(
        check(src),
        CompositeKindMismatch,
        DuplicateConformance,
        InvalidConformance
    );
}

#[test]
fn clashing_requirements_are_rejected() {
    let src = r#"
        struct interface A {
            fun f(): Int
        }

        struct interface B {
            fun f(): String
        }

        struct S: A, B {
            fun f(): Int {
                return 1
            }
        }
    "#;
    let checked = check(src);
    assert!(
        checked
            .kinds()
            .contains(&sable_core::ErrorKind::IntersectionMemberClash),
        "{:#?}",
        checked.diagnostics
    );
}

#[test]
fn enum_raw_types_must_be_integers() {
    let src = r#"
        enum Color: UInt8 {
            case red
            case green
        }

        enum Bad: String {
            case a
        }

        fun raw(): UInt8 {
            return Color.red.rawValue
        }
    "#;
    expect_errors!(check(src), InvalidEnumRawType);
}

#[test]
fn elaboration_records_globals() {
    let src = r#"
        access(all) contract C {}
        access(all) resource R {}
        access(all) resource interface I {}
        access(all) entitlement E
        access(account) fun f(): Int {
            return 1
        }
        access(all) var counter: Int = 0
    "#;
    let checked = check(src);
    expect_errors!(checked);
    let elaboration = checked.elaboration;

    let kinds: Vec<(&str, sable_core::ValueKind)> = elaboration
        .global_values()
        .map(|(name, value)| (name.as_str(), value.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("C", sable_core::ValueKind::Singleton),
            ("R", sable_core::ValueKind::Constructor),
            ("counter", sable_core::ValueKind::Variable),
            ("f", sable_core::ValueKind::Function),
        ]
    );
    assert!(matches!(
        elaboration.global_type("I"),
        Some(sable_core::GlobalType::Interface(_))
    ));
    assert!(matches!(
        elaboration.global_type("E"),
        Some(sable_core::GlobalType::Entitlement(_))
    ));
    assert!(!elaboration.has_errors());
}

mod common;

use common::{check, check_in_mode};
use sable_core::{AccessCheckMode, ErrorKind, SemanticError};

fn field_program(modifier: &str) -> String {
    format!(
        r#"
        access(all) struct S {{
            {modifier} var x: Int
            init() {{
                self.x = 1
            }}
        }}

        access(all) fun test() {{
            var s = S()
            let read = s.x
            s.x = 2
        }}
        "#
    )
}

#[test]
fn private_members_are_hidden_outside_under_every_mode_but_none() {
    let src = r#"
        access(all) struct S {
            access(self) let secret: Int
            init() {
                self.secret = 1
            }
        }

        access(all) fun test() {
            let s = S()
            let x = s.secret
        }
    "#;
    for mode in AccessCheckMode::ALL {
        let checked = check_in_mode(src, mode);
        if mode == AccessCheckMode::None {
            expect_errors!(checked);
        } else {
            expect_errors!(checked, InvalidAccess);
        }
    }
}

#[test]
fn private_members_are_visible_inside_their_composite() {
    let src = r#"
        access(all) struct S {
            access(self) let secret: Int
            init() {
                self.secret = 1
            }
            access(all) fun reveal(): Int {
                return self.secret
            }
        }
    "#;
    for mode in AccessCheckMode::ALL {
        expect_errors!(check_in_mode(src, mode));
    }
}

#[test]
fn assignment_access_table() {
    // (modifier, errors outside `none`)
    let table: [(&str, &[ErrorKind]); 3] = [
        ("pub(set)", &[]),
        ("access(all)", &[ErrorKind::InvalidAssignmentAccess]),
        (
            "access(self)",
            &[
                ErrorKind::InvalidAccess,
                ErrorKind::InvalidAccess,
                ErrorKind::InvalidAssignmentAccess,
            ],
        ),
    ];
    for (modifier, expected) in table {
        let src = field_program(modifier);
        for mode in AccessCheckMode::ALL {
            let checked = check_in_mode(&src, mode);
            let expected: Vec<ErrorKind> = if mode == AccessCheckMode::None {
                Vec::new()
            } else {
                expected.to_vec()
            };
            assert_eq!(checked.kinds(), expected, "{modifier} under {mode}");
        }
    }
}

#[test]
fn swap_needs_write_access_on_both_sides() {
    let src = r#"
        access(all) struct S {
            access(all) var x: Int
            init() {
                self.x = 1
            }
        }

        access(all) fun test() {
            let a = S()
            let b = S()
            a.x <-> b.x
        }
    "#;
    expect_errors!(
        check_in_mode(src, AccessCheckMode::Strict),
        InvalidAssignmentAccess,
        InvalidAssignmentAccess
    );
    expect_errors!(check_in_mode(src, AccessCheckMode::None));
}

fn second_value_program(modifier: &str) -> String {
    format!(
        r#"
        access(all) resource R {{}}

        access(all) resource B {{
            {modifier} var a: @R
            init() {{
                self.a <- create R()
            }}
            destroy() {{
                destroy self.a
            }}
        }}

        access(all) fun test() {{
            let b <- create B()
            let oldA <- b.a <- create R()
            destroy oldA
            destroy b
        }}
        "#
    )
}

#[test]
fn double_transfer_access_table() {
    let table: [(&str, &[ErrorKind]); 3] = [
        ("pub(set)", &[]),
        ("access(all)", &[ErrorKind::InvalidAssignmentAccess]),
        (
            "access(self)",
            &[ErrorKind::InvalidAccess, ErrorKind::InvalidAssignmentAccess],
        ),
    ];
    for (modifier, expected) in table {
        let src = second_value_program(modifier);
        for mode in AccessCheckMode::ALL {
            let checked = check_in_mode(&src, mode);
            let expected: Vec<ErrorKind> = if mode == AccessCheckMode::None {
                Vec::new()
            } else {
                expected.to_vec()
            };
            assert_eq!(checked.kinds(), expected, "{modifier} under {mode}");
        }
    }
}

#[test]
fn contract_access_reaches_nested_declarations() {
    let src = r#"
        access(all) contract C {
            access(contract) fun helper(): Int {
                return 1
            }

            access(all) struct Inner {
                access(all) fun call(): Int {
                    return C.helper()
                }
            }
        }

        access(all) fun outside(): Int {
            return C.helper()
        }
    "#;
    let checked = check(src);
    expect_errors!(checked, InvalidAccess);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::InvalidAccess { name, .. } if name == "helper"
    ));
}

#[test]
fn not_specified_members_follow_the_mode() {
    let src = r#"
        access(all) struct S {
            let x: Int
            init() {
                self.x = 1
            }
        }

        access(all) fun test() {
            let s = S()
            let x = s.x
        }
    "#;
    expect_errors!(
        check_in_mode(src, AccessCheckMode::Strict),
        MissingAccessModifier,
        InvalidAccess
    );
    expect_errors!(
        check_in_mode(src, AccessCheckMode::NotSpecifiedRestricted),
        InvalidAccess
    );
    expect_errors!(check_in_mode(src, AccessCheckMode::NotSpecifiedUnrestricted));
    expect_errors!(check_in_mode(src, AccessCheckMode::None));
}

#[test]
fn entitled_members_need_an_authorized_reference() {
    let src = r#"
        entitlement Withdraw

        resource Vault {
            access(Withdraw) fun withdraw() {}
        }

        fun test() {
            let v <- create Vault()
            let plain = &v as &Vault
            plain.withdraw()
            let authorized = &v as auth(Withdraw) &Vault
            authorized.withdraw()
            v.withdraw()
            destroy v
        }
    "#;
    let checked = check(src);
    expect_errors!(checked, InvalidAccess);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::InvalidAccess { name, declaration, .. }
            if name == "withdraw" && declaration == "function"
    ));
}

#[test]
fn reading_a_reference_borrows_without_consuming() {
    let src = r#"
        resource R {
            access(all) let n: Int
            init() {
                self.n = 1
            }
        }

        fun test(): Int {
            let r <- create R()
            let borrowed = &r as &R
            let n = borrowed.n
            destroy r
            return n
        }
    "#;
    expect_errors!(check(src));
}

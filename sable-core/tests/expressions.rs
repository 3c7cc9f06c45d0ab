mod common;

use common::check;
use sable_ast::{Decl, Stmt};
use sable_core::{CheckerConfig, SemanticError};

#[test]
fn arguments_carry_the_declared_labels() {
    let checked = check(
        r#"
        fun f(x: Int) {}
        fun g(_ x: Int) {}

        fun test() {
            f(1)
            f(b: 1)
            f()
            f(x: 1)
            g(1)
            g(x: 1)
        }
        "#,
    );
    expect_errors!(
        checked,
        MissingArgumentLabel,
        IncorrectArgumentLabel,
        ArgumentCount,
        IncorrectArgumentLabel
    );
    assert!(matches!(
        &checked.diagnostics[1],
        SemanticError::IncorrectArgumentLabel { expected, actual, .. }
            if expected == "x" && actual == "b"
    ));
}

#[test]
fn type_arguments_are_counted_and_inferred() {
    let checked = check(
        r#"
        fun id<T>(_ value: T): T {
            return value
        }

        fun make<T>(): Int {
            return 1
        }

        fun test() {
            let a: Int = id(1)
            let b = id<Int>(2)
            let c = id<Int, Int>(3)
            let d = make()
        }
        "#,
    );
    expect_errors!(checked, InvalidTypeArgumentCount, TypeParameterTypeInference);
}

#[test]
fn integer_literals_must_fit_their_type() {
    let checked = check(
        r#"
        fun test() {
            let fits: UInt8 = 255
            let over: UInt8 = 256
            let lowest: Int8 = -128
            let under: Int8 = -129
            let unsigned: UInt = -1
        }
        "#,
    );
    // The sign of a literal is checked once, against its target type.
    expect_errors!(checked, TypeMismatch, TypeMismatch, TypeMismatch);
}

#[test]
fn numeric_supertypes_accept_their_members() {
    let checked = check(
        r#"
        fun test(small: UInt8, fee: UFix64) {
            let i: Integer = small
            let n: Number = fee
            let s: SignedInteger = small
            let sum = small + 1
            let mixed = small + fee
        }
        "#,
    );
    expect_errors!(checked, TypeMismatch, InvalidBinaryOperands);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::TypeMismatch { expected, actual, .. }
            if expected == "SignedInteger" && actual == "UInt8"
    ));
}

#[test]
fn only_events_are_emitted() {
    let checked = check(
        r#"
        event Deposited(amount: UFix64)
        struct Receipt {}

        fun test() {
            emit Deposited(amount: 1.0)
            emit Receipt()
        }
        "#,
    );
    expect_errors!(checked, EmitNonEvent);
}

#[test]
fn optionals_chain_and_coalesce() {
    let checked = check(
        r#"
        struct Box {
            let value: Int
            init(value: Int) {
                self.value = value
            }
        }

        fun test(box: Box?, plain: Box): Int {
            let inner: Int? = box?.value
            let bad = plain?.value
            return inner ?? 0
        }
        "#,
    );
    expect_errors!(checked, InvalidOptionalChaining);
}

#[test]
fn unknown_names_are_reported() {
    let checked = check(
        r#"
        struct S {}

        fun test() {
            let a = missing
            let b = S().field
            let c: Unknown = 1
        }
        "#,
    );
    expect_errors!(checked, NotDeclared, NotDeclaredMember, NotDeclared);
}

#[test]
fn containers_infer_a_common_element_type() {
    let program = common::parse(
        r#"
        fun test() {
            let numbers = [1, 2, 3]
            let mixed = [1, "two"]
            let byName = {"a": 1, "b": 2}
            let first = numbers[0]
            let maybe = byName["a"]
        }
        "#,
    );
    let checked = sable_core::check(&program, CheckerConfig::default());
    expect_errors!(checked);

    let Decl::Function(test) = &program.decls[0] else {
        panic!("expected a function");
    };
    let elaboration = &checked.elaboration;
    let types: Vec<String> = test
        .body
        .iter()
        .flat_map(|body| &body.stmts)
        .filter_map(|stmt| match stmt {
            Stmt::Variable(v) => elaboration.declaration_type(v.id).map(|ty| elaboration.type_name(ty)),
            _ => None,
        })
        .collect();
    assert_eq!(types, vec!["[Int]", "[AnyStruct]", "{String: Int}", "Int", "Int?"]);
}

#[test]
fn references_need_a_reference_type() {
    let checked = check(
        r#"
        resource R {}

        fun test() {
            let r <- create R()
            let ok = &r as &R
            let bad = &r as Int
            destroy r
        }
        "#,
    );
    expect_errors!(checked, NonReferenceTypeReference);
}

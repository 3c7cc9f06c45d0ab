mod common;

use common::check;
use proptest::prelude::prop;
use proptest::test_runner::{Config, TestRunner};
use sable_core::{ErrorKind, SemanticError};

const R: &str = "resource R {}\n";

fn with_r(body: &str) -> String {
    format!("{R}{body}")
}

#[test]
fn moving_in_one_branch_leaves_the_resource_maybe_invalid() {
    let checked = check(&with_r(
        r#"
        fun test(c: Bool) {
            let r <- create R()
            if c {
                destroy r
            }
            destroy r
        }
        "#,
    ));
    expect_errors!(checked, ResourceUseAfterInvalidation);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::ResourceUseAfterInvalidation { maybe: true, invalidated_at: Some(_), .. }
    ));
}

#[test]
fn moving_in_both_branches_invalidates_definitely() {
    let checked = check(&with_r(
        r#"
        fun test(c: Bool) {
            let r <- create R()
            if c {
                destroy r
            } else {
                destroy r
            }
            destroy r
        }
        "#,
    ));
    expect_errors!(checked, ResourceUseAfterInvalidation);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::ResourceUseAfterInvalidation { maybe: false, .. }
    ));
}

#[test]
fn moving_in_neither_branch_keeps_the_resource() {
    expect_errors!(check(&with_r(
        r#"
        fun test(c: Bool) {
            let r <- create R()
            if c {
                log("no move")
            }
            destroy r
        }
        "#,
    )));
}

#[test]
fn returning_paths_do_not_join() {
    expect_errors!(check(&with_r(
        r#"
        fun take(c: Bool): @R? {
            let r <- create R()
            if c {
                return <-r
            }
            destroy r
            return nil
        }
        "#,
    )));
}

#[test]
fn unconsumed_resources_are_lost() {
    let checked = check(&with_r(
        r#"
        fun test(c: Bool) {
            let kept <- create R()
            let half <- create R()
            if c {
                destroy half
            }
        }
        "#,
    ));
    expect_errors!(checked, ResourceLoss, ResourceLoss);
}

#[test]
fn parameters_must_be_consumed() {
    expect_errors!(
        check(&with_r("fun test(r: @R) {}")),
        ResourceLoss
    );
}

#[test]
fn return_checks_every_open_scope() {
    let checked = check(&with_r(
        r#"
        fun test(c: Bool) {
            let outer <- create R()
            if c {
                let inner <- create R()
                return
            }
            destroy outer
        }
        "#,
    ));
    expect_errors!(checked, ResourceLoss, ResourceLoss);
}

#[test]
fn discarded_results_are_lost() {
    let checked = check(&with_r(
        r#"
        fun make(): @R {
            return <-create R()
        }

        fun maybe(): @R? {
            return <-create R()
        }

        fun test(a: @R?, b: @R) {
            make()
            let c <- a ?? <-b
            destroy c
            let d <- maybe() ?? <-create R()
            destroy d
        }
        "#,
    ));
    // `make()` alone, then the `??` whose left side is not a variable.
    expect_errors!(checked, ResourceLoss, ResourceLoss);
}

#[test]
fn loops_make_outer_moves_uncertain() {
    let checked = check(&with_r(
        r#"
        fun test() {
            let r <- create R()
            var i = 0
            while i < 3 {
                destroy r
                i = i + 1
            }
        }
        "#,
    ));
    expect_errors!(checked, ResourceUseAfterInvalidation, ResourceLoss);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::ResourceUseAfterInvalidation { maybe: true, .. }
    ));
}

#[test]
fn loop_bodies_consume_their_own_resources() {
    expect_errors!(check(&with_r(
        r#"
        fun test() {
            var again = true
            while again {
                let r <- create R()
                destroy r
                again = false
            }
        }
        "#,
    )));

    expect_errors!(
        check(&with_r(
            r#"
            fun test() {
                var again = true
                while again {
                    let r <- create R()
                    again = false
                }
            }
            "#,
        )),
        ResourceLoss
    );
}

#[test]
fn break_ends_the_iteration_of_body_resources() {
    let checked = check(&with_r(
        r#"
        fun test() {
            while true {
                let r <- create R()
                break
            }
        }
        "#,
    ));
    expect_errors!(checked, ResourceLoss);

    expect_errors!(check(&with_r(
        r#"
        fun test() {
            while true {
                let r <- create R()
                destroy r
                break
            }
        }
        "#,
    )));
}

#[test]
fn continue_on_one_path_loses_the_resource_there() {
    expect_errors!(
        check(&with_r(
            r#"
            fun test(c: Bool) {
                while c {
                    let r <- create R()
                    if c {
                        continue
                    }
                    destroy r
                }
            }
            "#,
        )),
        ResourceLoss
    );
}

#[test]
fn inner_jumps_only_leave_the_inner_body() {
    expect_errors!(check(&with_r(
        r#"
        fun test(a: Bool, b: Bool) {
            while a {
                let r <- create R()
                while b {
                    break
                }
                destroy r
            }
        }
        "#,
    )));
}

#[test]
fn break_and_continue_need_a_loop() {
    let checked = check(
        r#"
        fun test() {
            while true {
                break
            }
            continue
        }
        "#,
    );
    expect_errors!(checked, ControlStatement);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::ControlStatement { control: "continue", .. }
    ));
}

const READABLE: &str = r#"
    resource R {
        access(all) let x: Int
        init() {
            self.x = 1
        }
    }
"#;

#[test]
fn references_die_with_their_resource() {
    let checked = check(&format!(
        r#"{READABLE}
        fun test(): Int {{
            let r <- create R()
            let borrowed = &r as &R
            destroy r
            return borrowed.x
        }}
        "#
    ));
    expect_errors!(checked, InvalidatedResourceReference);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::InvalidatedResourceReference { invalidated_at: Some(_), .. }
    ));

    expect_errors!(check(&format!(
        r#"{READABLE}
        fun test(): Int {{
            let r <- create R()
            let borrowed = &r as &R
            let x = borrowed.x
            destroy r
            return x
        }}
        "#
    )));
}

#[test]
fn aliased_and_moved_references_are_invalidated_too() {
    let checked = check(&format!(
        r#"{READABLE}
        fun consume(r: @R) {{
            destroy r
        }}

        fun test(c: Bool): Int {{
            let r <- create R()
            let borrowed = &r as &R
            let alias = borrowed
            if c {{
                consume(r: <-r)
            }} else {{
                destroy r
            }}
            return alias.x
        }}
        "#
    ));
    expect_errors!(checked, InvalidatedResourceReference);
}

#[test]
fn references_are_checked_on_each_path() {
    expect_errors!(
        check(&format!(
            r#"{READABLE}
            fun test(c: Bool): Int {{
                let r <- create R()
                let borrowed = &r as &R
                if c {{
                    destroy r
                    return borrowed.x
                }}
                let x = borrowed.x
                destroy r
                return x
            }}
            "#
        )),
        InvalidatedResourceReference
    );
}

#[test]
fn reassigned_references_follow_their_new_target() {
    expect_errors!(check(&format!(
        r#"{READABLE}
        fun test(): Int {{
            let a <- create R()
            let b <- create R()
            var borrowed = &a as &R
            borrowed = &b as &R
            destroy a
            let x = borrowed.x
            destroy b
            return x
        }}
        "#
    )));
}

#[test]
fn closures_cannot_capture_resources() {
    let checked = check(&with_r(
        r#"
        fun test() {
            let r <- create R()
            let f = fun () {
                destroy r
            }
            destroy r
        }
        "#,
    ));
    expect_errors!(checked, ResourceCapturing);
}

#[test]
fn resources_cannot_destroy_themselves() {
    expect_errors!(
        check(
            r#"
            resource R {
                fun drop() {
                    destroy self
                }
            }
            "#,
        ),
        InvalidSelfInvalidation
    );
}

#[test]
fn transfers_use_the_right_operator() {
    let checked = check(&with_r(
        r#"
        fun test() {
            let r = create R()
            let n <- 1
            destroy r
        }
        "#,
    ));
    expect_errors!(checked, IncorrectTransferOperation, IncorrectTransferOperation);
    assert!(matches!(
        &checked.diagnostics[..],
        [
            SemanticError::IncorrectTransferOperation { expected: "<-", .. },
            SemanticError::IncorrectTransferOperation { expected: "=", .. },
        ]
    ));
}

#[test]
fn move_operator_is_only_for_resources() {
    expect_errors!(
        check(
            r#"
            fun test() {
                let a = 1
                let b = <-a
            }
            "#
        ),
        InvalidMoveOperation
    );
}

#[test]
fn arguments_and_returns_need_explicit_moves() {
    let checked = check(&with_r(
        r#"
        fun consume(r: @R) {
            destroy r
        }

        fun give(): @R {
            let r <- create R()
            return r
        }

        fun test() {
            let a <- create R()
            consume(r: a)
            let b <- create R()
            consume(r: <-b)
            let c <- create R()
            let all <- [c]
            destroy all
        }
        "#,
    ));
    expect_errors!(
        checked,
        MissingMoveOperation,
        MissingMoveOperation,
        MissingMoveOperation
    );
}

#[test]
fn nested_resources_cannot_be_moved_out() {
    let checked = check(&with_r(
        r#"
        resource Holder {
            var inner: @R
            init() {
                self.inner <- create R()
            }
            destroy() {
                destroy self.inner
            }
        }

        fun test(h: @Holder, rs: @[R]) {
            let stolen <- h.inner
            let first <- rs[0]
            destroy stolen
            destroy first
            destroy h
            destroy rs
        }
        "#,
    ));
    expect_errors!(checked, InvalidNestedResourceMove, InvalidNestedResourceMove);
}

#[test]
fn assignments_into_live_resources() {
    let checked = check(&with_r(
        r#"
        fun test() {
            var a <- create R()
            a <- create R()
            destroy a

            var b: @R? <- nil
            b <-! create R()
            destroy b

            var c <- create R()
            c <-! create R()
            destroy c
        }
        "#,
    ));
    expect_errors!(checked, InvalidResourceAssignment, IncorrectTransferOperation);
}

#[test]
fn swapping_resources_keeps_both_alive() {
    expect_errors!(check(&with_r(
        r#"
        fun test() {
            var a <- create R()
            var b <- create R()
            a <-> b
            destroy a
            destroy b
        }
        "#,
    )));
}

#[test]
fn swap_sides_must_be_storage_of_equal_type() {
    let checked = check(
        r#"
        fun test() {
            var x = 1
            var s = "text"
            x <-> s
            x <-> 2
        }
        "#,
    );
    expect_errors!(checked, TypeMismatch, InvalidSwapExpression);
}

#[test]
fn constants_cannot_be_assigned() {
    expect_errors!(
        check(
            r#"
            let limit: Int = 10
            fun test() {
                let x = 1
                x = 2
                limit = 3
            }
            "#
        ),
        AssignmentToConstant,
        AssignmentToConstant
    );
}

#[test]
fn destructors_must_invalidate_resource_fields() {
    let checked = check(&with_r(
        r#"
        resource Pair {
            var left: @R
            var right: @R
            init() {
                self.left <- create R()
                self.right <- create R()
            }
            destroy() {
                destroy self.left
            }
        }
        "#,
    ));
    expect_errors!(checked, ResourceFieldNotInvalidated);
    assert!(matches!(
        &checked.diagnostics[0],
        SemanticError::ResourceFieldNotInvalidated { name, .. } if name == "right"
    ));
}

#[test]
fn destroy_is_only_for_resources() {
    expect_errors!(
        check("fun test() { let x = 1\n destroy x }"),
        InvalidDestruction
    );
}

#[test]
fn create_is_only_for_resources() {
    let checked = check(&with_r(
        r#"
        struct S {}
        fun test() {
            let s = create S()
            let r <- R()
            destroy r
        }
        "#,
    ));
    expect_errors!(checked, InvalidConstruction, MissingCreate);
}

#[test]
fn statements_after_return_are_unreachable() {
    let checked = check(
        r#"
        fun test(): Int {
            return 1
            let x = 2
            let y = 3
        }
        "#,
    );
    expect_errors!(checked, UnreachableStatement);
    assert!(checked.diagnostics[0].is_warning());
    assert!(!checked.elaboration.has_errors());
}

#[test]
fn never_returning_calls_end_the_path() {
    expect_errors!(check(&with_r(
        r#"
        fun test(c: Bool): Int {
            let r <- create R()
            if c {
                destroy r
                return 1
            }
            panic("unreachable")
        }
        "#,
    )));
}

#[test]
fn functions_must_return_on_every_path() {
    expect_errors!(
        check(
            r#"
            fun f(c: Bool): Int {
                if c {
                    return 1
                }
            }
            "#
        ),
        MissingReturnStatement
    );
}

#[test]
fn unconsumed_resources_are_reported_in_declaration_order() {
    let mut runner = TestRunner::new(Config {
        cases: 48,
        ..Config::default()
    });
    let strategy = prop::collection::vec(prop::bool::ANY, 1..6);
    runner
        .run(&strategy, |destroyed: Vec<bool>| {
            let mut body = String::new();
            for i in 0..destroyed.len() {
                body.push_str(&format!("    let r{i} <- create R()\n"));
            }
            for (i, destroy) in destroyed.iter().enumerate() {
                if *destroy {
                    body.push_str(&format!("    destroy r{i}\n"));
                }
            }
            let src = with_r(&format!("fun test() {{\n{body}}}\n"));

            let first = check(&src);
            let lost = destroyed.iter().filter(|d| !**d).count();
            assert_eq!(first.kinds(), vec![ErrorKind::ResourceLoss; lost]);

            // Re-checking identical input yields identical diagnostics.
            let second = check(&src);
            let spans = |c: &sable_core::Checked| {
                c.diagnostics.iter().map(SemanticError::span).collect::<Vec<_>>()
            };
            assert_eq!(spans(&first), spans(&second));
            Ok(())
        })
        .unwrap();
}

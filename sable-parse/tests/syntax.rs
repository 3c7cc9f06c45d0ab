use sable_ast::{
    Access, CastKind, CompositeKind, Decl, ExprKind, IfTest, ImportLocation, Member, SetKind,
    Stmt, Transfer, TypeExpr,
};
use sable_parse::{parse_expr, parse_source, parse_source_with_recovery};

fn function_body(decl: &Decl) -> &[Stmt] {
    match decl {
        Decl::Function(f) => &f.body.as_ref().expect("body").stmts,
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn composite_with_members_parses() {
    let src = r#"
        access(all) resource Vault: Provider, Receiver {
            access(all) var balance: UFix64
            pub(set) var label: String

            init(balance: UFix64) {
                self.balance = balance
                self.label = "vault"
            }

            access(Withdraw) fun withdraw(amount: UFix64): @Vault {
                return <-create Vault(balance: amount)
            }

            destroy() {}
        }
    "#;
    let program = parse_source(src).expect("parse");
    let Decl::Composite(vault) = &program.decls[0] else {
        panic!("expected composite");
    };
    assert_eq!(vault.kind, CompositeKind::Resource);
    assert!(!vault.is_interface);
    assert_eq!(vault.access.access, Access::All);
    assert_eq!(vault.conformances.len(), 2);
    assert_eq!(vault.members.len(), 5);
    assert!(matches!(
        &vault.members[1],
        Member::Field(f) if f.access.access == Access::AllSettable
    ));
    assert!(matches!(
        &vault.members[3],
        Member::Function(f) if matches!(&f.access.access, Access::Entitlements { names, .. } if names.len() == 1)
    ));
}

#[test]
fn entitlement_sets_record_their_kind() {
    let src = r#"
        entitlement X
        entitlement Y
        struct S {
            access(X | Y) fun either() {}
            access(X, Y) fun both() {}
        }
    "#;
    let program = parse_source(src).expect("parse");
    let Decl::Composite(s) = &program.decls[2] else {
        panic!("expected composite");
    };
    let kinds: Vec<SetKind> = s
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Function(f) => match &f.access.access {
                Access::Entitlements { kind, .. } => Some(*kind),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![SetKind::Disjunction, SetKind::Conjunction]);
}

#[test]
fn imports_parse_address_and_path_locations() {
    let program = parse_source("import A, B from 0x1\nimport C from \"other\"\n").expect("parse");
    assert_eq!(program.imports.len(), 2);
    assert_eq!(program.imports[0].names.len(), 2);
    assert!(matches!(
        program.imports[0].location,
        ImportLocation::Address(ref a) if a.node == 1
    ));
    assert!(matches!(
        program.imports[1].location,
        ImportLocation::Path(ref p) if p.node == "other"
    ));
}

#[test]
fn path_imports_may_omit_names() {
    let program = parse_source("import \"lib\"\n").expect("parse");
    assert!(program.imports[0].names.is_empty());
    assert!(matches!(
        program.imports[0].location,
        ImportLocation::Path(ref p) if p.node == "lib"
    ));
}

#[test]
fn double_transfer_declaration_parses() {
    let src = r#"
        fun test() {
            let oldA <- b.a <- create A()
        }
    "#;
    let program = parse_source(src).expect("parse");
    let Stmt::Variable(decl) = &function_body(&program.decls[0])[0] else {
        panic!("expected variable declaration");
    };
    assert_eq!(decl.transfer, Transfer::Move);
    assert!(matches!(decl.value.kind, ExprKind::Member { .. }));
    let (transfer, second) = decl.second.as_ref().expect("second value");
    assert_eq!(*transfer, Transfer::Move);
    assert!(matches!(second.kind, ExprKind::Create(_)));
}

#[test]
fn assignment_and_swap_statements_parse() {
    let src = r#"
        fun test() {
            x <- y
            x <-! y
            x = 1
            a.b <-> c
        }
    "#;
    let program = parse_source(src).expect("parse");
    let body = function_body(&program.decls[0]);
    assert!(matches!(&body[0], Stmt::Assign(a) if a.transfer == Transfer::Move));
    assert!(matches!(&body[1], Stmt::Assign(a) if a.transfer == Transfer::ForceMove));
    assert!(matches!(&body[2], Stmt::Assign(a) if a.transfer == Transfer::Copy));
    assert!(matches!(&body[3], Stmt::Swap(_)));
}

#[test]
fn if_let_with_failable_cast_parses() {
    let src = r#"
        fun test(r: @AnyResource) {
            if let s <- r as? @S {
                destroy s
            } else {
                destroy r
            }
        }
    "#;
    let program = parse_source(src).expect("parse");
    let Stmt::If(stmt) = &function_body(&program.decls[0])[0] else {
        panic!("expected if");
    };
    let IfTest::Binding(binding) = &stmt.test else {
        panic!("expected binding");
    };
    assert!(matches!(
        &binding.value.kind,
        ExprKind::Cast { kind: CastKind::Failable, ty, .. } if ty.is_resource
    ));
}

#[test]
fn reference_and_intersection_types_parse() {
    let expr = parse_expr("&r as auth(E) &{I1, I2}").expect("parse");
    let ExprKind::Reference { ty, .. } = expr.kind else {
        panic!("expected reference");
    };
    let TypeExpr::Reference { auth, referenced, .. } = ty.ty else {
        panic!("expected reference type");
    };
    assert_eq!(auth.expect("auth").entitlements.len(), 1);
    assert!(matches!(*referenced, TypeExpr::Intersection { ref types, .. } if types.len() == 2));
}

#[test]
fn generic_call_and_comparison_are_distinguished() {
    let call = parse_expr("f<Int>(1)").expect("parse");
    assert!(matches!(call.kind, ExprKind::Call { ref type_args, .. } if type_args.len() == 1));

    let cmp = parse_expr("a < b").expect("parse");
    assert!(matches!(cmp.kind, ExprKind::Binary { .. }));
}

#[test]
fn return_value_stops_at_line_break() {
    let src = "fun test() {\n    return\n    [<-self]\n}\n";
    let program = parse_source(src).expect("parse");
    let body = function_body(&program.decls[0]);
    assert!(matches!(&body[0], Stmt::Return(r) if r.value.is_none()));
    assert!(matches!(&body[1], Stmt::Expr(e) if matches!(e.kind, ExprKind::Array(_))));
}

#[test]
fn event_parameters_become_initializer() {
    let program = parse_source("event Deposit(amount: UFix64, to: Address?)").expect("parse");
    let Decl::Composite(event) = &program.decls[0] else {
        panic!("expected composite");
    };
    assert_eq!(event.kind, CompositeKind::Event);
    assert!(matches!(&event.members[0], Member::Init(init) if init.params.len() == 2));
}

#[test]
fn parameter_labels_follow_declaration() {
    let program = parse_source("fun f(_ a: Int, to b: Int, c: Int) {}").expect("parse");
    let Decl::Function(f) = &program.decls[0] else {
        panic!("expected function");
    };
    let labels: Vec<Option<&str>> = f
        .params
        .iter()
        .map(|p| p.label.as_ref().map(|l| l.node.as_str()))
        .collect();
    assert_eq!(labels, vec![None, Some("to"), Some("c")]);
}

#[test]
fn node_ids_are_unique() {
    let expr = parse_expr("a + b * c").expect("parse");
    let ExprKind::Binary { left, right, .. } = &expr.kind else {
        panic!("expected binary");
    };
    assert_ne!(expr.id, left.id);
    assert_ne!(left.id, right.id);
}

#[test]
fn recovery_collects_multiple_errors() {
    let src = "fun a( {}\nstruct S {}\nfun b() { let }\nstruct T {}\n";
    let (program, errors) = parse_source_with_recovery(src).expect("lex");
    assert_eq!(errors.len(), 2);
    let names: Vec<&str> = program.decls.iter().map(|d| d.name().node.as_str()).collect();
    assert_eq!(names, vec!["S", "T"]);
}

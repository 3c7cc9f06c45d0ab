mod common;

use common::{check, check_importing, library};
use sable_core::{CheckerConfig, Location, MapImportResolver, SemanticError};

const LIB: &str = r#"
    access(all) contract C {
        access(all) fun get(): Int {
            return 1
        }

        access(self) fun hidden(): Int {
            return 2
        }
    }

    access(all) resource Token {}

    access(all) var counter: Int = 0
"#;

fn resolver() -> MapImportResolver {
    MapImportResolver::new().with(library(LIB, Location::named("lib")))
}

fn main_location() -> Location {
    Location::named("main")
}

#[test]
fn imported_contracts_are_usable() {
    let checked = check_importing(
        r#"
        import C, Token from "lib"

        access(all) fun test(): Int {
            return C.get()
        }

        access(all) fun mint(): @Token {
            return <-create Token()
        }
        "#,
        main_location(),
        &resolver(),
    );
    expect_errors!(checked);
}

#[test]
fn imported_members_keep_their_access() {
    let checked = check_importing(
        r#"
        import C from "lib"

        access(all) fun test(): Int {
            return C.hidden()
        }
        "#,
        main_location(),
        &resolver(),
    );
    expect_errors!(checked, InvalidAccess);
}

#[test]
fn imported_variables_are_constant_here() {
    let checked = check_importing(
        r#"
        import counter from "lib"

        access(all) fun test() {
            counter = 1
        }
        "#,
        main_location(),
        &resolver(),
    );
    expect_errors!(checked, AssignmentToConstant);
}

#[test]
fn account_access_spans_programs_of_one_address() {
    let fee = library(
        r#"
        access(account) fun Fee(): Int {
            return 3
        }
        "#,
        Location::address(1, "Fee"),
    );
    let resolver = MapImportResolver::new().with(fee);

    let same_account = check_importing(
        r#"
        import Fee from 0x1

        access(all) fun test(): Int {
            return Fee()
        }
        "#,
        Location::address(1, "Main"),
        &resolver,
    );
    expect_errors!(same_account);

    let other_account = check_importing("import Fee from 0x1", Location::address(2, "Main"), &resolver);
    expect_errors!(other_account, InvalidAccess);
    assert!(matches!(
        &other_account.diagnostics[0],
        SemanticError::InvalidAccess { name, declaration, .. }
            if name == "Fee" && declaration == "function"
    ));
}

#[test]
fn missing_names_are_not_exported() {
    let checked = check_importing(r#"import Nope from "lib""#, main_location(), &resolver());
    expect_errors!(checked, NotExported);
}

#[test]
fn unknown_locations_are_unresolved() {
    let with_resolver = check_importing(r#"import C from "elsewhere""#, main_location(), &resolver());
    expect_errors!(with_resolver, UnresolvedImport);

    let without_resolver = check(r#"import C from "lib""#);
    expect_errors!(without_resolver, UnresolvedImport);
}

#[test]
fn programs_with_errors_cannot_be_imported() {
    let broken = common::check_with(
        r#"access(all) let x: Int = "not a number""#,
        CheckerConfig::default().with_location(Location::named("broken")),
    );
    assert!(broken.elaboration.has_errors());
    let resolver = MapImportResolver::new().with(broken.elaboration);

    let checked = check_importing(r#"import x from "broken""#, main_location(), &resolver);
    expect_errors!(checked, ImportedProgram);
}

#[test]
fn whole_program_imports_skip_inaccessible_names() {
    let resolver = MapImportResolver::new().with(library(
        r#"
        access(all) fun shown(): Int {
            return 1
        }

        access(self) fun secret(): Int {
            return 2
        }
        "#,
        Location::named("util"),
    ));

    let visible = check_importing(
        r#"
        import "util"

        access(all) fun test(): Int {
            return shown()
        }
        "#,
        main_location(),
        &resolver,
    );
    expect_errors!(visible);

    let hidden = check_importing(
        r#"
        import "util"

        access(all) fun test(): Int {
            return secret()
        }
        "#,
        main_location(),
        &resolver,
    );
    expect_errors!(hidden, NotDeclared);
}

#![allow(dead_code)]

use sable_core::{
    AccessCheckMode, Checked, Checker, CheckerConfig, Elaboration, ErrorKind, ImportResolver,
    Location, StandardLibrary,
};

pub fn parse(src: &str) -> sable_ast::Program {
    match sable_parse::parse_source(src) {
        Ok(program) => program,
        Err(err) => panic!("parse failed: {err:?}\n{src}"),
    }
}

pub fn check(src: &str) -> Checked {
    check_with(src, CheckerConfig::default())
}

pub fn check_with(src: &str, config: CheckerConfig) -> Checked {
    sable_core::check(&parse(src), config)
}

pub fn check_in_mode(src: &str, mode: AccessCheckMode) -> Checked {
    check_with(src, CheckerConfig::default().with_mode(mode))
}

/// Checks a program at `location` that may import from `resolver`.
pub fn check_importing(src: &str, location: Location, resolver: &dyn ImportResolver) -> Checked {
    Checker::new(CheckerConfig::default().with_location(location))
        .with_standard_library(StandardLibrary::base())
        .with_import_resolver(resolver)
        .check_program(&parse(src))
}

/// A dependency that must check cleanly.
pub fn library(src: &str, location: Location) -> Elaboration {
    let checked = check_with(src, CheckerConfig::default().with_location(location));
    assert!(checked.is_ok(), "library failed: {:#?}", checked.diagnostics);
    checked.elaboration
}

pub fn kinds(checked: &Checked) -> Vec<ErrorKind> {
    checked.kinds()
}

#[macro_export]
macro_rules! expect_errors {
    ($checked:expr $(,)?) => {{
        let checked = &$checked;
        assert!(
            checked.diagnostics.is_empty(),
            "expected no diagnostics, got {:#?}",
            checked.diagnostics
        );
    }};
    ($checked:expr, $($kind:ident),+ $(,)?) => {{
        let checked = &$checked;
        assert_eq!(
            checked.kinds(),
            vec![$(sable_core::ErrorKind::$kind),+],
            "diagnostics: {:#?}",
            checked.diagnostics
        );
    }};
}

#![forbid(unsafe_code)]

pub mod access;
pub mod checker;
pub mod config;
pub mod elaboration;
pub mod error;
pub mod flow;
pub mod init;
pub mod location;
pub mod resources;
pub mod scope;
pub mod stdlib;
pub mod subtype;
pub mod types;

pub use access::{Access, PrimitiveAccess};
pub use checker::{Checked, Checker};
pub use config::{AccessCheckMode, CheckerConfig};
pub use elaboration::{CastRecord, Elaboration, GlobalType, GlobalValue, ValueKind};
pub use error::{CheckerError, ErrorKind, SemanticError};
pub use location::Location;
pub use resources::ResourceState;
pub use stdlib::{ImportError, ImportResolver, MapImportResolver, StandardLibrary};
pub use types::{CompositeId, PrimitiveType, Type, TypeRegistry};

/// Checks `program` with the base standard library and no imports.
pub fn check(program: &sable_ast::Program, config: CheckerConfig) -> Checked {
    Checker::new(config)
        .with_standard_library(StandardLibrary::base())
        .check_program(program)
}

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::elaboration::Elaboration;
use crate::location::Location;
use crate::types::{ParamType, PrimitiveType, Type};

/// Predeclared values and type names visible to every program.
///
/// Primitive types (`Int`, `AnyStruct`, ...) are always in scope and need
/// not be listed here.
#[derive(Clone, Debug, Default)]
pub struct StandardLibrary {
    values: BTreeMap<String, Type>,
    types: BTreeMap<String, Type>,
}

impl StandardLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// `panic` and `log`.
    pub fn base() -> Self {
        let unlabeled = |name: &str, ty: Type| ParamType {
            label: None,
            name: name.to_string(),
            ty,
        };
        Self::empty()
            .with_value(
                "panic",
                Type::function(vec![unlabeled("message", Type::STRING)], Type::NEVER),
            )
            .with_value(
                "log",
                Type::function(
                    vec![unlabeled("value", Type::Primitive(PrimitiveType::AnyStruct))],
                    Type::VOID,
                ),
            )
    }

    pub fn with_value(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.values.insert(name.into(), ty);
        self
    }

    pub fn with_type(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.types.insert(name.into(), ty);
        self
    }

    pub fn values(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.values.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.types.iter()
    }
}

#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("no program at location `{location}`")]
    #[diagnostic(code(sable::import::not_found))]
    NotFound { location: Location },

    /// The program exists but checking it reported errors.
    #[error("program at location `{location}` has errors")]
    #[diagnostic(code(sable::import::failed))]
    Failed { location: Location },
}

/// Supplies already-checked dependencies.
pub trait ImportResolver: Sync {
    fn resolve(&self, location: &Location) -> Result<Arc<Elaboration>, ImportError>;
}

#[derive(Clone, Debug, Default)]
pub struct MapImportResolver {
    programs: FxHashMap<Location, Arc<Elaboration>>,
}

impl MapImportResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, elaboration: Arc<Elaboration>) {
        self.programs
            .insert(elaboration.location.clone(), elaboration);
    }

    pub fn with(mut self, elaboration: Elaboration) -> Self {
        self.insert(Arc::new(elaboration));
        self
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

impl ImportResolver for MapImportResolver {
    fn resolve(&self, location: &Location) -> Result<Arc<Elaboration>, ImportError> {
        let elaboration = self
            .programs
            .get(location)
            .cloned()
            .ok_or_else(|| ImportError::NotFound {
                location: location.clone(),
            })?;
        if elaboration.has_errors() {
            return Err(ImportError::Failed {
                location: location.clone(),
            });
        }
        Ok(elaboration)
    }
}

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use sable_ast::{Ident, Import, ImportLocation, VarKind};
use tracing::{debug, warn};

use super::Checker;
use crate::elaboration::{Elaboration, GlobalType, ValueKind};
use crate::error::SemanticError;
use crate::location::Location;
use crate::scope::{BindingKind, Variable};
use crate::stdlib::ImportError;

impl Checker<'_> {
    pub(super) fn check_imports(&mut self, imports: &[Import]) {
        for import in imports {
            match &import.location {
                ImportLocation::Address(address) => {
                    // Each name lives in its own program under the account.
                    for name in &import.names {
                        let location = Location::address(address.node, name.node.clone());
                        self.import_from(&location, import, std::slice::from_ref(name));
                    }
                }
                ImportLocation::Path(path) => {
                    let location = Location::named(path.node.clone());
                    self.import_from(&location, import, &import.names);
                }
            }
        }
    }

    fn import_from(&mut self, location: &Location, import: &Import, names: &[Ident]) {
        let Some(resolver) = self.resolver else {
            self.report(SemanticError::UnresolvedImport {
                location: location.to_string(),
                span: import.span,
            });
            return;
        };
        let program = match resolver.resolve(location) {
            Ok(program) => program,
            Err(ImportError::NotFound { .. }) => {
                warn!(%location, "import not found");
                self.report(SemanticError::UnresolvedImport {
                    location: location.to_string(),
                    span: import.span,
                });
                return;
            }
            Err(ImportError::Failed { .. }) => {
                self.report(SemanticError::ImportedProgram {
                    location: location.to_string(),
                    span: import.span,
                });
                return;
            }
        };

        if names.is_empty() {
            // `import "path"` brings in everything it may see.
            let all: BTreeSet<String> = program
                .global_types()
                .map(|(name, _)| name.clone())
                .chain(program.global_values().map(|(name, _)| name.clone()))
                .collect();
            for name in all {
                let name = Ident::new(import.span, name);
                self.import_name(&program, location, &name, true);
            }
        } else {
            for name in names {
                self.import_name(&program, location, name, false);
            }
        }
        debug!(%location, "import resolved");
    }

    /// Imports one global type and/or value. In a wildcard import names the
    /// importer may not access are skipped silently.
    fn import_name(&mut self, program: &Elaboration, location: &Location, name: &Ident, wildcard: bool) {
        let ty = program.global_type(&name.node);
        let value = program.global_value(&name.node);
        if ty.is_none() && value.is_none() {
            self.report(SemanticError::NotExported {
                name: name.node.clone(),
                location: location.to_string(),
                span: name.span,
            });
            return;
        }

        let (declared, declared_at) = match (value, ty) {
            (Some(value), _) => (value.access.clone(), value.location.clone()),
            (None, Some(GlobalType::Composite(id) | GlobalType::Interface(id))) => {
                let record = program.registry().composite(id);
                (record.access.clone(), record.location.clone())
            }
            (None, Some(GlobalType::Entitlement(id))) => {
                let record = program.registry().entitlement(id);
                (record.access.clone(), record.location.clone())
            }
            (None, None) => return,
        };
        if !self.access_context().can_import(&declared, &declared_at) {
            if !wildcard {
                self.report(SemanticError::InvalidAccess {
                    name: name.node.clone(),
                    declaration: value.map_or("type", |v| v.kind.name()).to_string(),
                    access: declared.describe(program.registry()),
                    span: name.span,
                });
            }
            return;
        }

        if let Some(ty) = ty {
            self.import_global_type(program, name, ty);
        }
        if let Some(value) = value {
            let ty = self.registry.import_type(program.registry(), &value.ty);
            let access = self.registry.import_access(program.registry(), &value.access);
            let (binding, kind) = match value.kind {
                ValueKind::Constant => (BindingKind::Global, VarKind::Let),
                ValueKind::Variable => (BindingKind::Global, VarKind::Var),
                ValueKind::Function => (BindingKind::Function, VarKind::Let),
                ValueKind::Constructor => (BindingKind::Constructor, VarKind::Let),
                ValueKind::Singleton => (BindingKind::Singleton, VarKind::Let),
            };
            let id = self.fresh_var();
            let variable = Variable {
                id,
                name: name.node.clone(),
                ty,
                kind,
                access,
                binding,
                span: name.span,
                function_depth: 0,
                imported_from: Some(value.location.clone()),
                is_resource: false,
            };
            if let Err(previous) = self.scopes.declare_value(variable) {
                self.report(SemanticError::Redeclaration {
                    kind: "value",
                    name: name.node.clone(),
                    span: name.span,
                    previous: Some(previous),
                });
            }
        }
    }

    fn import_global_type(&mut self, program: &Elaboration, name: &Ident, ty: GlobalType) {
        match ty {
            GlobalType::Composite(id) | GlobalType::Interface(id) => {
                let id = self.registry.import_composite(program.registry(), id);
                let ty = self.composite_type(id);
                if !self.scopes.declare_type(&name.node, ty) {
                    self.report(SemanticError::Redeclaration {
                        kind: "type",
                        name: name.node.clone(),
                        span: name.span,
                        previous: None,
                    });
                }
            }
            GlobalType::Entitlement(id) => {
                let id = self.registry.import_entitlement(program.registry(), id);
                self.entitlements.insert(name.node.clone(), id);
            }
        }
    }
}

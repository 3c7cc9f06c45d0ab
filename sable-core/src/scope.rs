#![forbid(unsafe_code)]

use rustc_hash::FxHashMap;
use sable_ast::{Span, VarKind};

use crate::access::Access;
use crate::location::Location;
use crate::resources::VarId;
use crate::types::Type;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Local,
    Parameter,
    Global,
    Function,
    Constructor,
    Singleton,
    /// `self` inside a composite.
    SelfValue,
    Builtin,
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub id: VarId,
    pub name: String,
    pub ty: Type,
    pub kind: VarKind,
    pub access: Access,
    pub binding: BindingKind,
    pub span: Span,
    /// Number of enclosing functions at the declaration site.
    pub function_depth: usize,
    /// Set for imported values.
    pub imported_from: Option<Location>,
    pub is_resource: bool,
}

impl Variable {
    /// Locals and parameters take part in resource tracking.
    pub fn is_tracked(&self) -> bool {
        self.is_resource && matches!(self.binding, BindingKind::Local | BindingKind::Parameter)
    }
}

#[derive(Clone, Debug, Default)]
struct Scope {
    values: FxHashMap<String, Variable>,
    types: FxHashMap<String, Type>,
}

/// Lexical value and type scopes, innermost last.
#[derive(Clone, Debug)]
pub struct Scopes {
    stack: Vec<Scope>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self {
            stack: vec![Scope::default()],
        }
    }
}

impl Scopes {
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push(&mut self) {
        self.stack.push(Scope::default());
    }

    /// Pops the innermost scope and returns its values in declaration order.
    pub fn pop(&mut self) -> Vec<Variable> {
        let mut values: Vec<Variable> = self
            .stack
            .pop()
            .map(|scope| scope.values.into_values().collect())
            .unwrap_or_default();
        values.sort_by_key(|v| v.id);
        values
    }

    /// Declares in the innermost scope; returns the previous declaration's
    /// span when the name is already taken there.
    pub fn declare_value(&mut self, variable: Variable) -> Result<(), Span> {
        let Some(scope) = self.stack.last_mut() else {
            unreachable!("scope stack is never empty");
        };
        if let Some(previous) = scope.values.get(&variable.name) {
            return Err(previous.span);
        }
        scope.values.insert(variable.name.clone(), variable);
        Ok(())
    }

    pub fn declare_type(&mut self, name: &str, ty: Type) -> bool {
        let Some(scope) = self.stack.last_mut() else {
            unreachable!("scope stack is never empty");
        };
        if scope.types.contains_key(name) {
            return false;
        }
        scope.types.insert(name.to_string(), ty);
        true
    }

    pub fn lookup_value(&self, name: &str) -> Option<&Variable> {
        self.stack.iter().rev().find_map(|s| s.values.get(name))
    }

    pub fn lookup_type(&self, name: &str) -> Option<&Type> {
        self.stack.iter().rev().find_map(|s| s.types.get(name))
    }

    /// Values of every scope at or above `depth`, innermost scopes last.
    pub fn values_from(&self, depth: usize) -> Vec<&Variable> {
        let mut values: Vec<&Variable> = self
            .stack
            .iter()
            .skip(depth)
            .flat_map(|s| s.values.values())
            .collect();
        values.sort_by_key(|v| v.id);
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(id: u32, name: &str) -> Variable {
        Variable {
            id: VarId(id),
            name: name.to_string(),
            ty: Type::INT,
            kind: VarKind::Let,
            access: Access::NOT_SPECIFIED,
            binding: BindingKind::Local,
            span: sable_ast::span(id as usize, 1),
            function_depth: 1,
            imported_from: None,
            is_resource: false,
        }
    }

    #[test]
    fn inner_scopes_shadow_and_pop_in_order() {
        let mut scopes = Scopes::default();
        scopes.declare_value(var(0, "x")).unwrap();
        scopes.push();
        scopes.declare_value(var(2, "y")).unwrap();
        scopes.declare_value(var(1, "x")).unwrap();
        assert_eq!(scopes.lookup_value("x").unwrap().id, VarId(1));

        let popped: Vec<VarId> = scopes.pop().into_iter().map(|v| v.id).collect();
        assert_eq!(popped, vec![VarId(1), VarId(2)]);
        assert_eq!(scopes.lookup_value("x").unwrap().id, VarId(0));
    }

    #[test]
    fn redeclaration_in_same_scope_is_rejected() {
        let mut scopes = Scopes::default();
        scopes.declare_value(var(0, "x")).unwrap();
        assert_eq!(scopes.declare_value(var(1, "x")), Err(sable_ast::span(0, 1)));
        assert!(scopes.declare_type("T", Type::INT));
        assert!(!scopes.declare_type("T", Type::BOOL));
    }
}

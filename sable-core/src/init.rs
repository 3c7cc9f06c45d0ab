#![forbid(unsafe_code)]

use sable_ast::VarKind;

#[derive(Clone, Debug, PartialEq, Eq)]
struct FieldInit {
    name: String,
    kind: VarKind,
    initialized: bool,
}

/// Definite-initialization state of the fields of `self` inside an
/// initializer, along one control-flow path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInits {
    fields: Vec<FieldInit>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldAssignment {
    /// First assignment on this path.
    Initialized,
    /// The field was already initialized; fine for `var`.
    Reassigned { constant: bool },
    /// Not a tracked field.
    Unknown,
}

impl FieldInits {
    pub fn new<'a>(fields: impl IntoIterator<Item = (&'a str, VarKind)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, kind)| FieldInit {
                    name: name.to_string(),
                    kind,
                    initialized: false,
                })
                .collect(),
        }
    }

    pub fn assign(&mut self, name: &str) -> FieldAssignment {
        match self.fields.iter_mut().find(|f| f.name == name) {
            None => FieldAssignment::Unknown,
            Some(field) if field.initialized => FieldAssignment::Reassigned {
                constant: field.kind == VarKind::Let,
            },
            Some(field) => {
                field.initialized = true;
                FieldAssignment::Initialized
            }
        }
    }

    /// Untracked names count as initialized.
    pub fn is_initialized(&self, name: &str) -> bool {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .is_none_or(|f| f.initialized)
    }

    pub fn all_initialized(&self) -> bool {
        self.fields.iter().all(|f| f.initialized)
    }

    /// Uninitialized fields in declaration order.
    pub fn uninitialized(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| !f.initialized)
            .map(|f| f.name.as_str())
    }

    /// A field is initialized after a merge only if it was on both paths.
    pub fn join(&self, other: &FieldInits) -> FieldInits {
        FieldInits {
            fields: self
                .fields
                .iter()
                .map(|f| FieldInit {
                    initialized: f.initialized && other.is_initialized(&f.name),
                    ..f.clone()
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_tracks_let_reassignment() {
        let mut inits = FieldInits::new([("a", VarKind::Let), ("b", VarKind::Var)]);
        assert_eq!(inits.assign("a"), FieldAssignment::Initialized);
        assert_eq!(inits.assign("a"), FieldAssignment::Reassigned { constant: true });
        assert_eq!(inits.assign("b"), FieldAssignment::Initialized);
        assert_eq!(inits.assign("b"), FieldAssignment::Reassigned { constant: false });
        assert_eq!(inits.assign("c"), FieldAssignment::Unknown);
        assert!(inits.all_initialized());
    }

    #[test]
    fn join_requires_both_paths() {
        let base = FieldInits::new([("a", VarKind::Let), ("b", VarKind::Let)]);
        let mut then_branch = base.clone();
        then_branch.assign("a");
        then_branch.assign("b");
        let mut else_branch = base.clone();
        else_branch.assign("b");

        let joined = then_branch.join(&else_branch);
        assert!(!joined.is_initialized("a"));
        assert!(joined.is_initialized("b"));
        assert_eq!(joined.uninitialized().collect::<Vec<_>>(), vec!["a"]);
    }
}

#![forbid(unsafe_code)]

use crate::init::FieldInits;
use crate::resources::ResourceTracker;

/// Everything the checker threads along one control-flow path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowState {
    pub resources: ResourceTracker,
    /// Present only while checking an initializer.
    pub fields: Option<FieldInits>,
    /// The path returned, jumped, or called a `Never` function.
    pub halted: bool,
}

impl FlowState {
    /// Merge point of two paths. A halted path does not reach the merge.
    pub fn join(&self, other: &FlowState) -> FlowState {
        if self.halted {
            return other.clone();
        }
        if other.halted {
            return self.clone();
        }
        FlowState {
            resources: self.resources.join(&other.resources),
            fields: match (&self.fields, &other.fields) {
                (Some(a), Some(b)) => Some(a.join(b)),
                (a, b) => a.clone().or_else(|| b.clone()),
            },
            halted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{InvalidationKind, ResourceKey, ResourceState, VarId};

    #[test]
    fn halted_paths_do_not_contribute() {
        let x = ResourceKey::Var(VarId(0));
        let mut live = FlowState::default();
        live.resources.track(x.clone());

        let mut returned = live.clone();
        returned
            .resources
            .invalidate(&x, InvalidationKind::Moved, sable_ast::span(0, 1));
        returned.halted = true;

        let joined = live.join(&returned);
        assert!(!joined.halted);
        assert_eq!(joined.resources.get(&x).unwrap().state, ResourceState::Unused);

        let both = returned.join(&returned);
        assert!(both.halted);
    }
}

#![forbid(unsafe_code)]

use rustc_hash::FxHashMap;
use sable_ast::Span;
use tracing::trace;

/// Ownership state of one tracked resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Unused,
    /// Only borrowed through references so far; still owned.
    UsedAsReferenceOnly,
    DefinitelyInvalidated,
    /// Invalidated on some incoming paths but not others.
    MaybeInvalidated,
}

impl ResourceState {
    pub const ALL: [ResourceState; 4] = [
        ResourceState::Unused,
        ResourceState::UsedAsReferenceOnly,
        ResourceState::DefinitelyInvalidated,
        ResourceState::MaybeInvalidated,
    ];

    pub fn join(self, other: ResourceState) -> ResourceState {
        use ResourceState as S;
        match (self, other) {
            (a, b) if a == b => a,
            (S::MaybeInvalidated, _) | (_, S::MaybeInvalidated) => S::MaybeInvalidated,
            (S::DefinitelyInvalidated, _) | (_, S::DefinitelyInvalidated) => S::MaybeInvalidated,
            // Unused joined with UsedAsReferenceOnly.
            _ => S::UsedAsReferenceOnly,
        }
    }

    /// Still owned on every path.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ResourceState::Unused | ResourceState::UsedAsReferenceOnly
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidationKind {
    Moved,
    Destroyed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Invalidation {
    pub kind: InvalidationKind,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceInfo {
    pub state: ResourceState,
    /// First invalidation seen on any path.
    pub invalidation: Option<Invalidation>,
}

impl ResourceInfo {
    pub const UNUSED: ResourceInfo = ResourceInfo {
        state: ResourceState::Unused,
        invalidation: None,
    };

    fn join(self, other: ResourceInfo) -> ResourceInfo {
        ResourceInfo {
            state: self.state.join(other.state),
            invalidation: self.invalidation.or(other.invalidation),
        }
    }
}

/// Identity of a local binding; unique per checker run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKey {
    Var(VarId),
    /// A resource field of `self`, tracked inside destructors.
    SelfField(String),
}

/// Resource states along one control-flow path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceTracker {
    entries: FxHashMap<ResourceKey, ResourceInfo>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, key: ResourceKey) {
        self.entries.insert(key, ResourceInfo::UNUSED);
    }

    pub fn untrack(&mut self, key: &ResourceKey) {
        self.entries.remove(key);
    }

    pub fn get(&self, key: &ResourceKey) -> Option<ResourceInfo> {
        self.entries.get(key).copied()
    }

    pub fn is_tracked(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&mut self, key: &ResourceKey, info: ResourceInfo) {
        if let Some(entry) = self.entries.get_mut(key) {
            *entry = info;
        }
    }

    pub fn invalidate(&mut self, key: &ResourceKey, kind: InvalidationKind, span: Span) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.state = ResourceState::DefinitelyInvalidated;
            entry.invalidation = Some(Invalidation { kind, span });
        }
    }

    /// Borrowing keeps ownership but remembers the reference use.
    pub fn mark_referenced(&mut self, key: &ResourceKey) {
        if let Some(entry) = self.entries.get_mut(key)
            && entry.state == ResourceState::Unused
        {
            entry.state = ResourceState::UsedAsReferenceOnly;
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.entries.keys()
    }

    /// Pointwise join. A key tracked on only one side keeps that side's info.
    pub fn join(&self, other: &ResourceTracker) -> ResourceTracker {
        let mut entries = self.entries.clone();
        for (key, theirs) in &other.entries {
            let joined = match entries.get(key) {
                Some(ours) => ours.join(*theirs),
                None => *theirs,
            };
            if Some(&joined) != self.entries.get(key) {
                trace!(?key, ?joined, "resource state joined");
            }
            entries.insert(key.clone(), joined);
        }
        ResourceTracker { entries }
    }

    /// Keys whose state differs between `self` and `before`, i.e. the
    /// resources some code invalidated.
    pub fn invalidated_since(&self, before: &ResourceTracker) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = before
            .entries
            .iter()
            .filter(|(key, info)| {
                info.state.is_live()
                    && self
                        .entries
                        .get(*key)
                        .is_some_and(|now| !now.state.is_live())
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

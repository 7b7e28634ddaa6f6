//! Traversal state threaded through one top-level dispatch.
//!
//! The source of truth for "where do new host nodes go", "which context
//! values are visible here" and "which effects run after this pass". An
//! [`Ambient`] value is created per entry-point call and passed by `&mut`
//! through every recursive step; whoever changes the insertion parent or the
//! context map restores the caller's value before returning, so sibling
//! subtrees never observe a descendant's temporary change.

use core::fmt;
use std::collections::HashMap;

use crate::instance::{Effect, Instance};
use crate::value::{ContextId, HostId, SharedValue};

/// Mapping from context provider to the value currently in scope.
#[derive(Debug, Clone, Default)]
pub struct ContextMap {
    values: HashMap<ContextId, SharedValue>,
}

impl ContextMap {
    /// An empty context map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a provider value for the subtree currently being rendered.
    /// The dispatcher restores the enclosing map once the subtree completes.
    pub fn provide(&mut self, id: ContextId, value: SharedValue) {
        self.values.insert(id, value);
    }

    /// Looks up the nearest enclosing provider's value.
    #[must_use]
    pub fn get(&self, id: ContextId) -> Option<&SharedValue> {
        self.values.get(&id)
    }
}

/// The context a component sees when it executes.
#[derive(Debug, Clone)]
pub enum ResolvedContext {
    /// The component declared a dependency: the nearest provider's value, or
    /// the dependency's declared default.
    Value(SharedValue),
    /// No dependency declared: the ambient map passes through unchanged.
    Map(ContextMap),
}

impl ResolvedContext {
    /// The resolved single value, when a dependency was declared.
    #[must_use]
    pub const fn value(&self) -> Option<&SharedValue> {
        match self {
            Self::Value(value) => Some(value),
            Self::Map(_) => None,
        }
    }
}

/// State ambient to one top-level dispatch.
pub struct Ambient {
    insertion_parent: Option<HostId>,
    context: ContextMap,
    commit: Vec<Effect>,
}

impl Ambient {
    /// Creates the ambient state for a fresh dispatch rooted at the given
    /// insertion parent.
    #[must_use]
    pub fn new(insertion_parent: Option<HostId>) -> Self {
        Self {
            insertion_parent,
            context: ContextMap::new(),
            commit: Vec::new(),
        }
    }

    /// The host parent new nodes are currently inserted into.
    #[must_use]
    pub const fn insertion_parent(&self) -> Option<HostId> {
        self.insertion_parent
    }

    pub(crate) const fn set_insertion_parent(&mut self, parent: Option<HostId>) {
        self.insertion_parent = parent;
    }

    /// The context values visible at the current position.
    #[must_use]
    pub const fn context(&self) -> &ContextMap {
        &self.context
    }

    /// Mutable access for provider components publishing values to their
    /// subtree. The dispatcher restores the previous map afterwards.
    pub const fn context_mut(&mut self) -> &mut ContextMap {
        &mut self.context
    }

    pub(crate) fn replace_context(&mut self, context: ContextMap) -> ContextMap {
        core::mem::replace(&mut self.context, context)
    }

    /// Drains the instance's pending effect callbacks into the commit queue,
    /// preserving visitation order.
    pub fn enqueue_effects(&mut self, instance: &mut Instance) {
        self.commit.append(&mut instance.take_effects());
    }

    /// Number of effects waiting in the commit queue.
    #[must_use]
    pub const fn pending_effects(&self) -> usize {
        self.commit.len()
    }

    pub(crate) fn take_commit_queue(&mut self) -> Vec<Effect> {
        core::mem::take(&mut self.commit)
    }
}

impl fmt::Debug for Ambient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ambient")
            .field("insertion_parent", &self.insertion_parent)
            .field("context", &self.context)
            .field("commit", &self.commit.len())
            .finish()
    }
}

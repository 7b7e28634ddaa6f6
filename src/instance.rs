//! Mutable record of what is actually live at one tree position.
//!
//! An [`Instance`] is created when a description is first mounted, mutated in
//! place on every later pass, and destroyed by the external child-list
//! reconciler when it disappears from a children list. The fixed kind of an
//! instance never changes; everything transient lives in [`Mode`].

use core::any::Any;
use core::fmt;

use crate::description::{ComponentStyle, Content, Description, Props, Stamp};
use crate::value::{HostId, RefTarget};

/// A deferred commit callback registered by a component during one pass.
pub type Effect = Box<dyn FnOnce()>;

/// The fixed type of an instance, set at creation for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceKind {
    /// A host text node, owning its scalar value.
    Text {
        /// The last value written to the host text node.
        value: String,
    },
    /// A host element.
    Element {
        /// Host element name.
        tag: String,
    },
    /// A root container rendering into a specific host parent.
    Root {
        /// The host parent this root currently renders into.
        target: HostId,
    },
    /// A function-style component (fragments included).
    FunctionComponent,
    /// A class-style component.
    ClassComponent,
}

/// Transient per-pass state, cleared as each concern resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Mode {
    /// Claiming existing host nodes produced by server rendering.
    pub hydrating: bool,
    /// Adopting an existing host subtree that was not produced by hydration.
    pub mutative_hydrating: bool,
    /// The last pass over this subtree suspended.
    pub suspended: bool,
    /// The last pass over this subtree failed.
    pub errored: bool,
    /// An error boundary scheduled this instance for a recovery pass.
    pub pending_error: bool,
    /// This pass is the recovery re-render after an error.
    pub rerendering_error: bool,
    /// A state change is waiting to be flushed.
    pub dirty: bool,
    /// The executor decided the children need no work this pass.
    pub skip_children: bool,
    /// Inside an SVG namespace.
    pub svg: bool,
}

impl Mode {
    /// Clears the hydration and error-recovery bookkeeping that only has
    /// meaning within a single pass. The suspended/errored marks are cleared
    /// separately, once a pass over the instance succeeds.
    pub(crate) const fn clear_transient(&mut self) {
        self.hydrating = false;
        self.mutative_hydrating = false;
        self.pending_error = false;
        self.rerendering_error = false;
    }
}

/// One live position in the tree, owned exclusively by its parent.
pub struct Instance {
    kind: InstanceKind,
    /// Transient state bits for the current pass.
    pub mode: Mode,
    props: Props,
    host: Option<HostId>,
    children: Option<Vec<Instance>>,
    component_state: Option<Box<dyn Any>>,
    pending_effects: Vec<Effect>,
    last_stamp: Option<Stamp>,
    current_ref: Option<RefTarget>,
    previous_ref: Option<RefTarget>,
}

impl Instance {
    /// Creates a fresh, unmounted instance of the given kind.
    #[must_use]
    pub fn new(kind: InstanceKind) -> Self {
        Self {
            kind,
            mode: Mode::default(),
            props: Props::new(),
            host: None,
            children: None,
            component_state: None,
            pending_effects: Vec::new(),
            last_stamp: None,
            current_ref: None,
            previous_ref: None,
        }
    }

    /// Derives the instance kind matching a description.
    ///
    /// Returns `None` for foreign descriptions, which must never become live
    /// instances.
    #[must_use]
    pub fn from_description(description: &Description) -> Option<Self> {
        if !description.is_trusted() {
            return None;
        }
        let kind = match description.content() {
            Content::Text(value) => InstanceKind::Text {
                value: value.clone(),
            },
            Content::Element { tag, .. } => InstanceKind::Element { tag: tag.clone() },
            Content::Root { target, .. } => InstanceKind::Root { target: *target },
            Content::Fragment { .. } => InstanceKind::FunctionComponent,
            Content::Component { component, .. } => match component.style() {
                ComponentStyle::Function => InstanceKind::FunctionComponent,
                ComponentStyle::Class => InstanceKind::ClassComponent,
            },
        };
        Some(Self::new(kind))
    }

    /// The fixed kind of this instance.
    #[must_use]
    pub const fn kind(&self) -> &InstanceKind {
        &self.kind
    }

    pub(crate) const fn kind_mut(&mut self) -> &mut InstanceKind {
        &mut self.kind
    }

    /// Whether this instance takes the component branch of the dispatcher.
    #[must_use]
    pub const fn is_component(&self) -> bool {
        matches!(
            self.kind,
            InstanceKind::Root { .. }
                | InstanceKind::FunctionComponent
                | InstanceKind::ClassComponent
        )
    }

    /// The last-applied props.
    #[must_use]
    pub const fn props(&self) -> &Props {
        &self.props
    }

    /// Replaces the last-applied props. Executors call this when adopting a
    /// description's props during component execution.
    pub fn set_props(&mut self, props: Props) {
        self.props = props;
    }

    pub(crate) fn replace_props(&mut self, props: Props) -> Props {
        core::mem::replace(&mut self.props, props)
    }

    /// The host node this instance designates.
    ///
    /// Text and element instances own their host node; component instances
    /// carry a back-reference to the nearest descendant host node, used only
    /// for sibling-anchor lookup.
    #[must_use]
    pub const fn host(&self) -> Option<HostId> {
        self.host
    }

    /// Sets the designated host node.
    pub const fn set_host(&mut self, host: Option<HostId>) {
        self.host = host;
    }

    /// The mounted children, or `None` when not yet mounted (or invalidated
    /// by a raw-markup write).
    #[must_use]
    pub fn children(&self) -> Option<&[Instance]> {
        self.children.as_deref()
    }

    /// Mutable access to the mounted children.
    pub const fn children_mut(&mut self) -> Option<&mut Vec<Instance>> {
        self.children.as_mut()
    }

    /// Installs a mounted children list.
    pub fn set_children(&mut self, children: Vec<Instance>) {
        self.children = Some(children);
    }

    /// Takes the children list out for reconciliation.
    pub const fn take_children(&mut self) -> Option<Vec<Instance>> {
        self.children.take()
    }

    pub(crate) fn invalidate_children(&mut self) {
        self.children = None;
    }

    /// Whether a component instance has been executed at least once.
    #[must_use]
    pub const fn has_state(&self) -> bool {
        self.component_state.is_some()
    }

    /// Installs the opaque running-component state on first mount.
    pub fn set_state(&mut self, state: Box<dyn Any>) {
        self.component_state = Some(state);
    }

    /// Borrows the running-component state as `T`.
    #[must_use]
    pub fn state<T: 'static>(&self) -> Option<&T> {
        self.component_state.as_ref()?.downcast_ref()
    }

    /// Mutably borrows the running-component state as `T`.
    pub fn state_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.component_state.as_mut()?.downcast_mut()
    }

    /// Registers a deferred commit callback for this pass.
    pub fn push_effect(&mut self, effect: Effect) {
        self.pending_effects.push(effect);
    }

    pub(crate) const fn has_pending_effects(&self) -> bool {
        !self.pending_effects.is_empty()
    }

    pub(crate) fn take_effects(&mut self) -> Vec<Effect> {
        core::mem::take(&mut self.pending_effects)
    }

    /// The stamp of the description last successfully applied.
    #[must_use]
    pub const fn last_applied_stamp(&self) -> Option<Stamp> {
        self.last_stamp
    }

    pub(crate) const fn set_last_applied_stamp(&mut self, stamp: Stamp) {
        self.last_stamp = Some(stamp);
    }

    /// The currently attached ref cell.
    #[must_use]
    pub const fn current_ref(&self) -> Option<&RefTarget> {
        self.current_ref.as_ref()
    }

    /// The previously attached ref cell, kept so an external concern can
    /// detach it before attaching the current one.
    #[must_use]
    pub const fn previous_ref(&self) -> Option<&RefTarget> {
        self.previous_ref.as_ref()
    }

    pub(crate) fn rotate_refs(&mut self, next: Option<RefTarget>) {
        self.previous_ref = self.current_ref.take();
        self.current_ref = next;
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("host", &self.host)
            .field("children", &self.children.as_ref().map(Vec::len))
            .field("last_stamp", &self.last_stamp)
            .finish_non_exhaustive()
    }
}

//! Contracts for the collaborators the dispatcher depends on.
//!
//! The reconciler decides *what* must change; everything platform- or
//! component-specific is behind these traits: how an attribute is written,
//! how a keyed child list is diffed, how a component executes, and what
//! recovery looks like when a subtree suspends or fails. A backend implements
//! both traits on one type; [`Backend`] extends [`Host`] so a single `&mut`
//! reaches every collaborator during a pass.

use crate::ambient::{Ambient, ResolvedContext};
use crate::description::Description;
use crate::error::Failure;
use crate::instance::Instance;
use crate::value::{HostId, PropValue};

/// The raw result of executing a component, before normalization.
#[derive(Debug, Clone)]
pub enum Rendered {
    /// The component rendered nothing.
    Nothing,
    /// A single child description.
    One(Description),
    /// An explicit list of child descriptions.
    Many(Vec<Description>),
}

/// Low-level mutations and queries against the host platform's tree.
///
/// Nodes are designated by opaque [`HostId`] handles; property-application
/// failures are the host's own concern and are not surfaced here.
pub trait Host {
    /// Overwrites the content of a host text node.
    fn set_text(&mut self, node: HostId, value: &str);

    /// Applies, updates or (when `value` is `None`) removes one property.
    fn set_property(
        &mut self,
        node: HostId,
        name: &str,
        value: Option<&PropValue>,
        previous: Option<&PropValue>,
        svg: bool,
    );

    /// Reads the node's current raw markup, if the host tracks it.
    fn raw_markup(&self, node: HostId) -> Option<String>;

    /// Replaces the node's markup wholesale. An empty string clears it.
    fn set_raw_markup(&mut self, node: HostId, markup: &str);

    /// The live value of a controlled form property (`checked`/`value`),
    /// which user interaction can change behind the engine's back. `None`
    /// when the node does not expose the property.
    fn live_control_value(&self, node: HostId, name: &str) -> Option<PropValue>;

    /// Whether the node is a controlled form input.
    fn is_controlled(&self, node: HostId) -> bool;

    /// Records the last virtual value of a controlled input, the baseline for
    /// the next drift check.
    fn set_shadow_value(&mut self, node: HostId, value: PropValue);

    /// The first child of a container, used as the hydration anchor.
    fn first_child(&self, container: HostId) -> Option<HostId>;

    /// Whether the node sits inside an SVG namespace.
    fn in_svg_namespace(&self, node: HostId) -> bool {
        let _ = node;
        false
    }
}

/// The full collaborator surface consumed by one reconciliation pass.
///
/// Child-list methods are expected to re-enter [`patch`](crate::patch) for
/// each surviving child; the dispatcher hands them the live [`Ambient`] so
/// stack discipline carries through the re-entry. `patch_children` must
/// tolerate a parent whose children were invalidated by a raw-markup write
/// (treat `None` as an empty list).
pub trait Backend: Host {
    /// Creates and attaches instances for a normalized children list, leaving
    /// the parent's children populated. `anchor` is the host node to insert
    /// before, or `None` for append.
    fn mount_children(
        &mut self,
        ambient: &mut Ambient,
        parent: &mut Instance,
        children: Vec<Description>,
        anchor: Option<HostId>,
    ) -> Result<(), Failure>;

    /// Reconciles a normalized children list against the parent's existing
    /// children by key and position, creating, moving and destroying child
    /// instances as needed.
    fn patch_children(
        &mut self,
        ambient: &mut Ambient,
        parent: &mut Instance,
        children: Vec<Description>,
    ) -> Result<(), Failure>;

    /// Executes a function-style component, returning its raw render result
    /// or an already-classified failure.
    fn run_function_component(
        &mut self,
        ambient: &mut Ambient,
        instance: &mut Instance,
        description: &Description,
        context: ResolvedContext,
    ) -> Result<Rendered, Failure>;

    /// Executes a class-style component.
    fn run_class_component(
        &mut self,
        ambient: &mut Ambient,
        instance: &mut Instance,
        description: &Description,
        context: ResolvedContext,
    ) -> Result<Rendered, Failure>;

    /// The next host sibling after the instance's subtree, suitable as an
    /// insertion anchor.
    fn host_sibling(&self, instance: &Instance) -> Option<HostId>;

    /// Moves the instance's entire host subtree under `parent`, before
    /// `anchor` (append when `None`).
    fn insert_subtree(&mut self, instance: &mut Instance, anchor: Option<HostId>, parent: HostId);

    /// Decides and performs recovery for a marked instance: unmount, render a
    /// fallback, or return `Err` to re-throw to an ancestor boundary.
    fn dispatch_failure(&mut self, failure: Failure, instance: &mut Instance)
    -> Result<(), Failure>;

    /// Observer fired once per entry-point call, before dispatch.
    fn before_root(&mut self, description: &Description, container: HostId) {
        let _ = (description, container);
    }

    /// Observer fired before each node is diffed (past the integrity guard).
    fn before_patch(&mut self, instance: &Instance, description: &Description) {
        let _ = (instance, description);
    }

    /// Observer fired after each node is diffed, whether or not the pass over
    /// it failed.
    fn after_patch(&mut self, instance: &Instance) {
        let _ = instance;
    }
}

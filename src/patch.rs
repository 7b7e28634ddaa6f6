//! The reconciliation dispatcher and the element patcher.
//!
//! [`patch`] brings one live instance into agreement with one description of
//! matching position. Child-list collaborators re-enter it for every
//! surviving child, so a single entry-point call drives a full depth-first
//! pass over the tree.

use tracing::{debug, trace};

use crate::ambient::{Ambient, ResolvedContext};
use crate::backend::{Backend, Rendered};
use crate::description::{ComponentRef, Content, Description};
use crate::error::Failure;
use crate::instance::{Instance, InstanceKind};

/// Reconciles `instance` against `description`.
///
/// Failures surface at the nearest component-typed instance: they are
/// classified there, marked on the instance's mode, and handed to
/// [`Backend::dispatch_failure`]. A failure the backend re-throws propagates
/// out of this call (and past the post-diff bookkeeping), ultimately leaving
/// the top-level entry point as an error.
///
/// # Errors
///
/// Returns the failure re-thrown by [`Backend::dispatch_failure`], or a
/// failure raised below an element instance (elements have no execution step
/// of their own to catch at).
pub fn patch<B: Backend + ?Sized>(
    backend: &mut B,
    ambient: &mut Ambient,
    instance: &mut Instance,
    description: &Description,
) -> Result<(), Failure> {
    // Text fast path. Text instances never recurse, and the scalar applies
    // before any trust consideration, matching the mount-time behavior.
    let host = instance.host();
    if let InstanceKind::Text { value } = instance.kind_mut() {
        if let Content::Text(next) = description.content() {
            if value != next {
                if let Some(node) = host {
                    backend.set_text(node, next);
                }
                *value = next.clone();
            }
        }
        return Ok(());
    }

    // Integrity guard: data shaped like a description but not built by the
    // engine is opaque. No diff, no recursion, no host mutation, and no
    // distinguishable signal for whoever crafted it.
    if !description.is_trusted() {
        return Ok(());
    }

    backend.before_patch(instance, description);

    // Roots render their children into a specific host parent, which may
    // change between two descriptions. That moves the subtree; it does not
    // remount it.
    let previous_parent = ambient.insertion_parent();
    if let (InstanceKind::Root { target }, Content::Root { target: next_target, .. }) =
        (instance.kind(), description.content())
    {
        let current = *target;
        let next = *next_target;
        ambient.set_insertion_parent(Some(next));
        if current != next {
            trace!(from = ?current, to = ?next, "re-parenting root subtree");
            let anchor = if ambient.insertion_parent() == previous_parent {
                backend.host_sibling(instance)
            } else {
                None
            };
            backend.insert_subtree(instance, anchor, next);
            if let InstanceKind::Root { target } = instance.kind_mut() {
                *target = next;
            }
        }
    }

    let mut failed = false;
    if matches!(instance.kind(), InstanceKind::Element { .. }) {
        // Identical stamps mean a structurally identical description: the
        // instance is already in agreement, skip the whole subtree.
        if instance.last_applied_stamp() != Some(description.stamp()) {
            patch_element(backend, ambient, instance, description)?;
        }
    } else {
        if instance.mode.pending_error {
            instance.mode.pending_error = false;
            instance.mode.rerendering_error = true;
        }

        let previous_context = ambient.context().clone();
        let resolved = description
            .component_ref()
            .and_then(ComponentRef::context_dependency)
            .map_or_else(
                || ResolvedContext::Map(previous_context.clone()),
                |dependency| {
                    ResolvedContext::Value(
                        ambient
                            .context()
                            .get(dependency.id())
                            .cloned()
                            .unwrap_or_else(|| dependency.default_value().clone()),
                    )
                },
            );
        let is_new = !instance.has_state();

        let result = run_component(backend, ambient, instance, description, resolved, is_new);

        // Stack discipline: whatever this subtree did to the insertion parent
        // or the context map must not leak to siblings.
        ambient.set_insertion_parent(previous_parent);
        ambient.replace_context(previous_context);

        if let Err(failure) = result {
            if failure.is_suspension() {
                instance.mode.suspended = true;
            } else {
                instance.mode.errored = true;
            }
            debug!(
                suspension = failure.is_suspension(),
                "subtree failed; delegating recovery"
            );
            failed = true;
            backend.dispatch_failure(failure, instance)?;
        }
    }

    backend.after_patch(instance);

    instance.mode.clear_transient();
    if !failed {
        instance.mode.suspended = false;
        instance.mode.errored = false;
    }
    instance.set_last_applied_stamp(description.stamp());
    instance.rotate_refs(description.ref_target().cloned());
    Ok(())
}

/// Executes the component and reconciles its normalized result, returning the
/// first failure for the dispatcher to classify.
fn run_component<B: Backend + ?Sized>(
    backend: &mut B,
    ambient: &mut Ambient,
    instance: &mut Instance,
    description: &Description,
    context: ResolvedContext,
    is_new: bool,
) -> Result<(), Failure> {
    let rendered = match instance.kind() {
        // Roots and fragments are transparent: their children are the result.
        InstanceKind::Root { .. } => Rendered::Many(description.children().to_vec()),
        InstanceKind::FunctionComponent if description.component_ref().is_none() => {
            Rendered::Many(description.children().to_vec())
        }
        InstanceKind::FunctionComponent => {
            backend.run_function_component(ambient, instance, description, context)?
        }
        InstanceKind::ClassComponent => {
            backend.run_class_component(ambient, instance, description, context)?
        }
        InstanceKind::Text { .. } | InstanceKind::Element { .. } => return Ok(()),
    };
    let normalized = normalize(rendered);

    if instance.mode.skip_children {
        if let Some(props) = description.props() {
            instance.set_props(props.clone());
        }
        instance.mode.skip_children = false;
        // A forced re-render that was explicitly skipped must not leave the
        // instance marked dirty.
        if instance.last_applied_stamp() != Some(description.stamp()) {
            instance.mode.dirty = false;
        }
    } else if instance.children().is_none() {
        let anchor = if instance.mode.hydrating && instance.mode.suspended {
            instance.host()
        } else if is_new || instance.mode.hydrating {
            None
        } else {
            backend.host_sibling(instance)
        };
        backend.mount_children(ambient, instance, normalized, anchor)?;
    } else {
        backend.patch_children(ambient, instance, normalized)?;
    }

    if instance.has_pending_effects() {
        ambient.enqueue_effects(instance);
    }
    Ok(())
}

/// Reconciles one host element's properties and children against a new
/// description. Called only when the stamps differ.
fn patch_element<B: Backend + ?Sized>(
    backend: &mut B,
    ambient: &mut Ambient,
    instance: &mut Instance,
    description: &Description,
) -> Result<(), Failure> {
    let Some(dom) = instance.host() else {
        return Ok(());
    };
    let Some(new_props) = description.props() else {
        return Ok(());
    };
    let svg = instance.mode.svg;
    let old_props = instance.replace_props(new_props.clone());

    for (name, value) in old_props.attributes() {
        if !new_props.has_attribute(name) {
            backend.set_property(dom, name, None, Some(value), svg);
        }
    }

    for (name, value) in new_props.attributes() {
        let previous = old_props.attribute(name);
        // A controlled input's live value can drift under user interaction,
        // so equality with the previous virtual value is not enough.
        let drifted = (name == "checked" || name == "value")
            && backend
                .live_control_value(dom, name)
                .is_some_and(|live| live != *value);
        if previous != Some(value) || drifted {
            backend.set_property(dom, name, Some(value), previous, svg);
        }
    }

    let old_markup = old_props.raw_markup_value();
    if let Some(markup) = new_props.raw_markup_value() {
        let write = match old_markup {
            None => true,
            Some(old) => markup != old && backend.raw_markup(dom).as_deref() != Some(markup),
        };
        if write {
            trace!(node = ?dom, "replacing raw markup");
            backend.set_raw_markup(dom, markup);
        }
        // Whatever structure now lives under this node is unknown to the
        // engine.
        instance.invalidate_children();
    } else {
        if old_markup.is_some() {
            backend.set_raw_markup(dom, "");
        }
        let previous_parent = ambient.insertion_parent();
        ambient.set_insertion_parent(Some(dom));
        let children = new_props.child_list().to_vec();
        let result = backend.patch_children(ambient, instance, children);
        ambient.set_insertion_parent(previous_parent);
        result?;
    }

    if backend.is_controlled(dom) {
        if let Some(checked) = new_props.attribute("checked") {
            backend.set_shadow_value(dom, checked.clone());
        } else if let Some(value) = new_props.attribute("value") {
            backend.set_shadow_value(dom, value.clone());
        }
    }
    Ok(())
}

/// Normalizes a raw render result into a children list: nothing becomes an
/// empty list, an unkeyed fragment is a transparent passthrough, and any
/// other single result is wrapped.
fn normalize(rendered: Rendered) -> Vec<Description> {
    match rendered {
        Rendered::Nothing => Vec::new(),
        Rendered::One(single) => {
            if single.is_fragment() && single.key().is_none() {
                single.children().to_vec()
            } else {
                vec![single]
            }
        }
        Rendered::Many(list) => list,
    }
}

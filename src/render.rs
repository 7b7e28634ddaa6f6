//! Entry points: mounting, updating and hydrating a tree in a container.

use std::collections::HashMap;

use tracing::trace;

use crate::ambient::Ambient;
use crate::backend::Backend;
use crate::description::Description;
use crate::error::Failure;
use crate::instance::{Instance, InstanceKind, Mode};
use crate::patch::patch;
use crate::value::HostId;

/// How a render call attaches to the container.
#[derive(Debug, Clone, Copy)]
enum Attach {
    /// Mount fresh, update an existing tree, or adopt stray host children.
    Auto,
    /// Attach into an existing, non-hydrated host subtree at this anchor.
    At(HostId),
    /// Claim server-rendered host nodes.
    Hydrate,
}

/// Owns the link between each host container and the tree last rendered into
/// it, and drives one full reconciliation plus one effect flush per call.
#[derive(Debug, Default)]
pub struct Renderer {
    trees: HashMap<HostId, Instance>,
}

impl Renderer {
    /// Creates a renderer with no live trees.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }

    /// Renders `description` into `container`, mounting on the first call and
    /// patching the existing tree on every later one.
    ///
    /// # Errors
    ///
    /// Returns the failure re-thrown by the root-most recovery dispatch; the
    /// commit queue is not flushed in that case.
    pub fn render<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        description: Description,
        container: HostId,
    ) -> Result<(), Failure> {
        self.render_impl(backend, description, container, Attach::Auto)
    }

    /// Renders `description` into `container`, adopting the existing host
    /// subtree rooted at `anchor` instead of creating fresh nodes.
    ///
    /// # Errors
    ///
    /// Same contract as [`Renderer::render`].
    pub fn render_at<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        description: Description,
        container: HostId,
        anchor: HostId,
    ) -> Result<(), Failure> {
        self.render_impl(backend, description, container, Attach::At(anchor))
    }

    /// Claims the server-rendered host children of `container` for
    /// `description`. Hydration is a mode on the same algorithm as
    /// [`Renderer::render`], not a separate one.
    ///
    /// # Errors
    ///
    /// Same contract as [`Renderer::render`].
    pub fn hydrate<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        description: Description,
        container: HostId,
    ) -> Result<(), Failure> {
        self.render_impl(backend, description, container, Attach::Hydrate)
    }

    /// The live tree linked to `link` (the container, or the anchor node for
    /// [`Renderer::render_at`] calls), if one has been rendered.
    #[must_use]
    pub fn tree(&self, link: HostId) -> Option<&Instance> {
        self.trees.get(&link)
    }

    /// Mutable access to a live tree, for external mechanisms that mark
    /// instances between passes (an error boundary scheduling a recovery
    /// re-render sets [`Mode::pending_error`] this way).
    pub fn tree_mut(&mut self, link: HostId) -> Option<&mut Instance> {
        self.trees.get_mut(&link)
    }

    fn render_impl<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        description: Description,
        container: HostId,
        attach: Attach,
    ) -> Result<(), Failure> {
        backend.before_root(&description, container);

        // Hydration deliberately ignores any previous tree; attaching at an
        // anchor looks the anchor's own link up first.
        let previous = match attach {
            Attach::Hydrate => {
                self.trees.remove(&container);
                None
            }
            Attach::At(anchor) => self
                .trees
                .remove(&anchor)
                .or_else(|| self.trees.remove(&container)),
            Attach::Auto => self.trees.remove(&container),
        };
        let link = match attach {
            Attach::At(anchor) => anchor,
            Attach::Auto | Attach::Hydrate => container,
        };

        // The implicit grouping makes top-level lists and fragments behave
        // like any other child list.
        let wrapped = Description::root(container, vec![description]);

        let first = backend.first_child(container);
        let mut mode = Mode::default();
        let anchor = match attach {
            Attach::Hydrate => {
                mode.hydrating = true;
                first
            }
            Attach::At(anchor) => {
                mode.mutative_hydrating = true;
                Some(anchor)
            }
            Attach::Auto => match &previous {
                Some(tree) => tree.host(),
                None => {
                    if first.is_some() {
                        mode.mutative_hydrating = true;
                    }
                    first
                }
            },
        };
        trace!(
            ?container,
            existing = previous.is_some(),
            hydrating = mode.hydrating,
            "render pass"
        );

        let mut ambient = Ambient::new(Some(container));
        if let Some(mut tree) = previous {
            let result = patch(backend, &mut ambient, &mut tree, &wrapped);
            self.trees.insert(link, tree);
            result?;
        } else {
            let mut root = Instance::new(InstanceKind::Root { target: container });
            root.mode = mode;
            root.mode.svg = backend.in_svg_namespace(container);
            root.set_host(anchor);

            let children = wrapped.children().to_vec();
            let result = backend.mount_children(&mut ambient, &mut root, children, anchor);
            root.mode.clear_transient();
            root.set_last_applied_stamp(wrapped.stamp());
            self.trees.insert(link, root);
            result?;
        }

        // Exactly one flush, after the entire tree has been reconciled.
        // Effects never interleave with in-progress diffing.
        for effect in ambient.take_commit_queue() {
            effect();
        }
        Ok(())
    }
}

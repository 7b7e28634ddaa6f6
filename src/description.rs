//! Immutable description of a desired tree shape.
//!
//! A [`Description`] is produced fresh for every render pass and discarded
//! once it has been diffed against the live tree. Descriptions are cheap to
//! clone (reference counted), and a clone shares its [`Stamp`] with the
//! original: two descriptions carrying the same stamp are guaranteed to be
//! structurally identical, which is what lets the dispatcher skip whole
//! subtrees without a deep comparison.

use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::rc::Rc;

use crate::value::{ContextId, HostId, PropValue, RefTarget, SharedValue};

/// Monotonically increasing identifier assigned to every description at
/// construction. Equal stamps imply structural identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stamp(u64);

impl Stamp {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a description came from.
///
/// Only the constructors in this module produce [`Provenance::Engine`]. Data
/// that merely looks like a description (deserialized payloads, hand-built
/// structures from outside the crate) is ingested as
/// [`Provenance::Foreign`] and treated as opaque by the dispatcher: never
/// diffed, never recursed into, never allowed to mutate the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Built by the engine's own construction path.
    Engine,
    /// Shaped like a description, but not built by the engine.
    Foreign,
}

/// Whether a component executes through the function-style or class-style
/// executor collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStyle {
    /// Executed via [`Backend::run_function_component`](crate::backend::Backend::run_function_component).
    Function,
    /// Executed via [`Backend::run_class_component`](crate::backend::Backend::run_class_component).
    Class,
}

/// A component's declared dependency on a context provider.
#[derive(Debug, Clone)]
pub struct ContextDependency {
    id: ContextId,
    default: SharedValue,
}

impl ContextDependency {
    /// Declares a dependency on the provider `id`, falling back to `default`
    /// when no enclosing provider is found.
    #[must_use]
    pub const fn new(id: ContextId, default: SharedValue) -> Self {
        Self { id, default }
    }

    /// The provider this dependency resolves against.
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    /// The declared fallback value.
    #[must_use]
    pub const fn default_value(&self) -> &SharedValue {
        &self.default
    }
}

/// Reference to a component definition.
///
/// The engine never executes components itself; this is just enough identity
/// for the executor collaborators to find the right definition, plus the
/// component's optional context dependency.
#[derive(Debug, Clone)]
pub struct ComponentRef {
    name: String,
    style: ComponentStyle,
    context: Option<ContextDependency>,
}

impl ComponentRef {
    /// A function-style component.
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: ComponentStyle::Function,
            context: None,
        }
    }

    /// A class-style component.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: ComponentStyle::Class,
            context: None,
        }
    }

    /// Declares a context dependency for this component.
    #[must_use]
    pub fn with_context(mut self, dependency: ContextDependency) -> Self {
        self.context = Some(dependency);
        self
    }

    /// The component's name, as registered with the executor.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Which executor variant runs this component.
    #[must_use]
    pub const fn style(&self) -> ComponentStyle {
        self.style
    }

    /// The component's context dependency, if declared.
    #[must_use]
    pub const fn context_dependency(&self) -> Option<&ContextDependency> {
        self.context.as_ref()
    }
}

/// Attribute map, nested children and raw markup carried by a description.
#[derive(Debug, Clone, Default)]
pub struct Props {
    attributes: BTreeMap<String, PropValue>,
    children: Vec<Description>,
    raw_markup: Option<String>,
}

impl Props {
    /// An empty props set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: BTreeMap::new(),
            children: Vec::new(),
            raw_markup: None,
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Appends a child description.
    #[must_use]
    pub fn child(mut self, child: Description) -> Self {
        self.children.push(child);
        self
    }

    /// Replaces the children list.
    #[must_use]
    pub fn children(mut self, children: Vec<Description>) -> Self {
        self.children = children;
        self
    }

    /// Sets the raw-markup property, which bypasses child reconciliation.
    #[must_use]
    pub fn raw_markup(mut self, markup: impl Into<String>) -> Self {
        self.raw_markup = Some(markup.into());
        self
    }

    /// Looks up one attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    /// Returns whether the attribute is present.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Iterates over all attributes in name order.
    pub fn attributes(&self) -> btree_map::Iter<'_, String, PropValue> {
        self.attributes.iter()
    }

    /// The nested child descriptions.
    #[must_use]
    pub fn child_list(&self) -> &[Description] {
        &self.children
    }

    /// The raw-markup string, if present.
    #[must_use]
    pub fn raw_markup_value(&self) -> Option<&str> {
        self.raw_markup.as_deref()
    }
}

/// The kind-specific payload of a description.
#[derive(Debug, Clone)]
pub enum Content {
    /// A text node holding a scalar value.
    Text(String),
    /// A host element.
    Element {
        /// Host element name.
        tag: String,
        /// Attributes and children.
        props: Props,
    },
    /// A component, executed externally.
    Component {
        /// Which component, and how to execute it.
        component: ComponentRef,
        /// Props passed to the component.
        props: Props,
    },
    /// A transparent grouping of children.
    Fragment {
        /// Carries only children.
        props: Props,
    },
    /// A root container rendering its children into a specific host parent.
    Root {
        /// The host parent this root renders into.
        target: HostId,
        /// Carries only children.
        props: Props,
    },
}

#[derive(Debug, Clone)]
struct Inner {
    content: Content,
    key: Option<String>,
    stamp: Stamp,
    provenance: Provenance,
    ref_target: Option<RefTarget>,
}

/// Immutable specification of the desired tree shape at one position.
#[derive(Debug, Clone)]
pub struct Description {
    inner: Rc<Inner>,
}

impl Description {
    fn build(content: Content) -> Self {
        Self {
            inner: Rc::new(Inner {
                content,
                key: None,
                stamp: Stamp::next(),
                provenance: Provenance::Engine,
                ref_target: None,
            }),
        }
    }

    /// A text description.
    pub fn text(value: impl Into<String>) -> Self {
        Self::build(Content::Text(value.into()))
    }

    /// A host-element description.
    pub fn element(tag: impl Into<String>, props: Props) -> Self {
        Self::build(Content::Element {
            tag: tag.into(),
            props,
        })
    }

    /// A component description.
    pub fn component(component: ComponentRef, props: Props) -> Self {
        Self::build(Content::Component { component, props })
    }

    /// A transparent grouping of children.
    #[must_use]
    pub fn fragment(children: Vec<Description>) -> Self {
        Self::build(Content::Fragment {
            props: Props::new().children(children),
        })
    }

    /// A root container rendering `children` into the host parent `target`.
    #[must_use]
    pub fn root(target: HostId, children: Vec<Description>) -> Self {
        Self::build(Content::Root {
            target,
            props: Props::new().children(children),
        })
    }

    /// Copy-on-write access for the builder mutators. A mutation that has to
    /// detach from shared inner data also takes a fresh stamp, since the
    /// result is no longer interchangeable with the other holders.
    fn make_unique(&mut self) -> &mut Inner {
        let shared = Rc::strong_count(&self.inner) > 1;
        let inner = Rc::make_mut(&mut self.inner);
        if shared {
            inner.stamp = Stamp::next();
        }
        inner
    }

    /// Attaches a list-identity key.
    #[must_use]
    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.make_unique().key = Some(key.into());
        self
    }

    /// Attaches a ref cell the host node will be bound to.
    #[must_use]
    pub fn with_ref(mut self, target: RefTarget) -> Self {
        self.make_unique().ref_target = Some(target);
        self
    }

    /// Demotes this description to foreign provenance, as happens when
    /// description-shaped data is ingested from outside the engine. The
    /// dispatcher treats foreign descriptions as opaque.
    #[must_use]
    pub fn into_foreign(mut self) -> Self {
        self.make_unique().provenance = Provenance::Foreign;
        self
    }

    /// The kind-specific payload.
    #[must_use]
    pub fn content(&self) -> &Content {
        &self.inner.content
    }

    /// The list-identity key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.inner.key.as_deref()
    }

    /// The stamp assigned at construction. Clones share it; a builder
    /// mutation applied to a shared description takes a fresh one.
    #[must_use]
    pub fn stamp(&self) -> Stamp {
        self.inner.stamp
    }

    /// Whether this description was built by the engine itself.
    #[must_use]
    pub fn is_trusted(&self) -> bool {
        self.inner.provenance == Provenance::Engine
    }

    /// The attached ref cell, if any.
    #[must_use]
    pub fn ref_target(&self) -> Option<&RefTarget> {
        self.inner.ref_target.as_ref()
    }

    /// The props of any non-text description.
    #[must_use]
    pub fn props(&self) -> Option<&Props> {
        match &self.inner.content {
            Content::Text(_) => None,
            Content::Element { props, .. }
            | Content::Component { props, .. }
            | Content::Fragment { props }
            | Content::Root { props, .. } => Some(props),
        }
    }

    /// The nested child descriptions (empty for text).
    #[must_use]
    pub fn children(&self) -> &[Description] {
        self.props().map_or(&[], Props::child_list)
    }

    /// The component reference, for component descriptions.
    #[must_use]
    pub fn component_ref(&self) -> Option<&ComponentRef> {
        match &self.inner.content {
            Content::Component { component, .. } => Some(component),
            _ => None,
        }
    }

    /// Whether this is a transparent grouping node.
    #[must_use]
    pub fn is_fragment(&self) -> bool {
        matches!(self.inner.content, Content::Fragment { .. })
    }
}

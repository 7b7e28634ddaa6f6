//! A scripted backend over an arena of fake host nodes.
//!
//! Implements every collaborator contract the dispatcher consumes: a
//! positional (unkeyed) child reconciler, registry-based component executors,
//! and a host that records each mutation in an operation log.

use std::collections::{BTreeMap, HashMap};

use osmosis::{
    Ambient, Backend, ComponentStyle, Content, Description, Failure, Host, HostId, Instance,
    InstanceKind, PropValue, Rendered, ResolvedContext, patch,
};

/// One recorded host mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Create {
        node: HostId,
    },
    Attach {
        node: HostId,
        parent: HostId,
    },
    SetText {
        node: HostId,
        value: String,
    },
    SetProperty {
        node: HostId,
        name: String,
        value: Option<PropValue>,
    },
    SetRawMarkup {
        node: HostId,
        markup: String,
    },
    MoveSubtree {
        node: HostId,
        parent: HostId,
    },
}

#[derive(Debug, Default)]
struct ElementState {
    tag: String,
    attrs: BTreeMap<String, PropValue>,
    live: BTreeMap<String, PropValue>,
    raw: Option<String>,
    shadow: Option<PropValue>,
    controlled: bool,
}

#[derive(Debug)]
enum NodeKind {
    Element(ElementState),
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<HostId>,
    children: Vec<HostId>,
}

type ComponentFn = Box<
    dyn FnMut(
        &mut Instance,
        &Description,
        &ResolvedContext,
        &mut Ambient,
    ) -> Result<Rendered, Failure>,
>;

pub struct MockBackend {
    nodes: Vec<Node>,
    components: HashMap<String, ComponentFn>,
    /// Every host mutation, in execution order.
    pub ops: Vec<Op>,
    /// Failures handed to `dispatch_failure`.
    pub recoveries: Vec<Failure>,
    /// When set, `dispatch_failure` re-throws instead of recovering.
    pub rethrow: bool,
    /// Number of `before_patch` observations.
    pub patched: usize,
    /// Number of component instances given state for the first time.
    pub instantiated: usize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            components: HashMap::new(),
            ops: Vec::new(),
            recoveries: Vec::new(),
            rethrow: false,
            patched: 0,
            instantiated: 0,
        }
    }

    pub fn register<F>(&mut self, name: &str, run: F)
    where
        F: FnMut(
                &mut Instance,
                &Description,
                &ResolvedContext,
                &mut Ambient,
            ) -> Result<Rendered, Failure>
            + 'static,
    {
        self.components.insert(name.to_string(), Box::new(run));
    }

    pub fn create_element(&mut self, tag: &str) -> HostId {
        self.alloc(NodeKind::Element(ElementState {
            tag: tag.to_string(),
            controlled: tag == "input",
            ..ElementState::default()
        }))
    }

    pub fn append(&mut self, parent: HostId, node: HostId) {
        self.attach_node(parent, node, None);
    }

    pub fn children_of(&self, node: HostId) -> &[HostId] {
        &self.nodes[node.index()].children
    }

    pub fn tag_of(&self, node: HostId) -> &str {
        &self.element(node).tag
    }

    pub fn text_of(&self, node: HostId) -> &str {
        match &self.nodes[node.index()].kind {
            NodeKind::Text(value) => value,
            NodeKind::Element(_) => panic!("node {node:?} is not a text node"),
        }
    }

    pub fn attribute_of(&self, node: HostId, name: &str) -> Option<PropValue> {
        self.element(node).attrs.get(name).cloned()
    }

    pub fn shadow_of(&self, node: HostId) -> Option<PropValue> {
        self.element(node).shadow.clone()
    }

    pub fn live_of(&self, node: HostId, name: &str) -> Option<PropValue> {
        self.element(node).live.get(name).cloned()
    }

    pub fn raw_of(&self, node: HostId) -> Option<String> {
        self.element(node).raw.clone()
    }

    /// Mutates a live control value directly, simulating user interaction the
    /// engine never sees.
    pub fn poke_live(&mut self, node: HostId, name: &str, value: PropValue) {
        self.element_mut(node).live.insert(name.to_string(), value);
    }

    pub fn text_writes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::SetText { .. }))
            .count()
    }

    pub fn markup_writes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, Op::SetRawMarkup { .. }))
            .count()
    }

    fn element(&self, node: HostId) -> &ElementState {
        match &self.nodes[node.index()].kind {
            NodeKind::Element(element) => element,
            NodeKind::Text(_) => panic!("node {node:?} is not an element"),
        }
    }

    fn element_mut(&mut self, node: HostId) -> &mut ElementState {
        match &mut self.nodes[node.index()].kind {
            NodeKind::Element(element) => element,
            NodeKind::Text(_) => panic!("node {node:?} is not an element"),
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> HostId {
        let id = HostId::new(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.ops.push(Op::Create { node: id });
        id
    }

    fn detach(&mut self, node: HostId) {
        if let Some(parent) = self.nodes[node.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != node);
        }
    }

    fn attach_node(&mut self, parent: HostId, node: HostId, anchor: Option<HostId>) {
        self.detach(node);
        let children = &mut self.nodes[parent.index()].children;
        let at = anchor
            .and_then(|a| children.iter().position(|&c| c == a))
            .unwrap_or(children.len());
        children.insert(at, node);
        self.nodes[node.index()].parent = Some(parent);
        self.ops.push(Op::Attach { node, parent });
    }

    fn remove_subtree(&mut self, instance: &Instance) {
        if let Some(host) = instance.host() {
            self.detach(host);
        }
    }

    fn mount_one(
        &mut self,
        ambient: &mut Ambient,
        description: &Description,
        anchor: Option<HostId>,
        parent_svg: bool,
        out: &mut Vec<Instance>,
    ) -> Result<(), Failure> {
        let Some(mut instance) = Instance::from_description(description) else {
            return Ok(());
        };
        instance.mode.svg = parent_svg;
        match description.content() {
            Content::Text(value) => {
                let node = self.alloc(NodeKind::Text(value.clone()));
                let parent = ambient
                    .insertion_parent()
                    .expect("no insertion parent during mount");
                self.attach_node(parent, node, anchor);
                instance.set_host(Some(node));
                out.push(instance);
                Ok(())
            }
            Content::Element { tag, .. } => {
                instance.mode.svg = parent_svg || tag == "svg";
                let node = self.create_element(tag);
                let parent = ambient
                    .insertion_parent()
                    .expect("no insertion parent during mount");
                self.attach_node(parent, node, anchor);
                instance.set_host(Some(node));
                let result = patch(self, ambient, &mut instance, description);
                out.push(instance);
                result
            }
            _ => {
                let result = patch(self, ambient, &mut instance, description);
                if instance.host().is_none() {
                    let descendant = first_host(&instance);
                    instance.set_host(descendant);
                }
                out.push(instance);
                result
            }
        }
    }

    fn run_component_impl(
        &mut self,
        ambient: &mut Ambient,
        instance: &mut Instance,
        description: &Description,
        context: &ResolvedContext,
    ) -> Result<Rendered, Failure> {
        let Some(component) = description.component_ref() else {
            return Ok(Rendered::Many(description.children().to_vec()));
        };
        let name = component.name().to_string();
        if !instance.has_state() {
            instance.set_state(Box::new(()));
            self.instantiated += 1;
        }
        if let Some(props) = description.props() {
            instance.set_props(props.clone());
        }
        let mut run = self
            .components
            .remove(&name)
            .unwrap_or_else(|| panic!("component `{name}` is not registered"));
        let result = run(instance, description, context, ambient);
        self.components.insert(name, run);
        result
    }
}

impl Host for MockBackend {
    fn set_text(&mut self, node: HostId, value: &str) {
        if let NodeKind::Text(stored) = &mut self.nodes[node.index()].kind {
            *stored = value.to_string();
        }
        self.ops.push(Op::SetText {
            node,
            value: value.to_string(),
        });
    }

    fn set_property(
        &mut self,
        node: HostId,
        name: &str,
        value: Option<&PropValue>,
        _previous: Option<&PropValue>,
        _svg: bool,
    ) {
        let element = self.element_mut(node);
        match value {
            Some(value) => {
                element.attrs.insert(name.to_string(), value.clone());
                element.live.insert(name.to_string(), value.clone());
            }
            None => {
                element.attrs.remove(name);
                element.live.remove(name);
            }
        }
        self.ops.push(Op::SetProperty {
            node,
            name: name.to_string(),
            value: value.cloned(),
        });
    }

    fn raw_markup(&self, node: HostId) -> Option<String> {
        self.element(node).raw.clone()
    }

    fn set_raw_markup(&mut self, node: HostId, markup: &str) {
        self.element_mut(node).raw = if markup.is_empty() {
            None
        } else {
            Some(markup.to_string())
        };
        self.ops.push(Op::SetRawMarkup {
            node,
            markup: markup.to_string(),
        });
    }

    fn live_control_value(&self, node: HostId, name: &str) -> Option<PropValue> {
        self.element(node).live.get(name).cloned()
    }

    fn is_controlled(&self, node: HostId) -> bool {
        self.element(node).controlled
    }

    fn set_shadow_value(&mut self, node: HostId, value: PropValue) {
        self.element_mut(node).shadow = Some(value);
    }

    fn first_child(&self, container: HostId) -> Option<HostId> {
        self.nodes[container.index()].children.first().copied()
    }

    fn in_svg_namespace(&self, node: HostId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if let NodeKind::Element(element) = &self.nodes[id.index()].kind {
                if element.tag == "svg" {
                    return true;
                }
            }
            current = self.nodes[id.index()].parent;
        }
        false
    }
}

impl Backend for MockBackend {
    fn mount_children(
        &mut self,
        ambient: &mut Ambient,
        parent: &mut Instance,
        children: Vec<Description>,
        anchor: Option<HostId>,
    ) -> Result<(), Failure> {
        let parent_svg = parent.mode.svg;
        let mut mounted = Vec::new();
        let mut first_err = None;
        for description in &children {
            if let Err(failure) =
                self.mount_one(ambient, description, anchor, parent_svg, &mut mounted)
            {
                first_err.get_or_insert(failure);
            }
        }
        parent.set_children(mounted);
        first_err.map_or(Ok(()), Err)
    }

    fn patch_children(
        &mut self,
        ambient: &mut Ambient,
        parent: &mut Instance,
        children: Vec<Description>,
    ) -> Result<(), Failure> {
        let parent_svg = parent.mode.svg;
        let mut old = parent.take_children().unwrap_or_default().into_iter();
        let mut next = Vec::new();
        let mut first_err = None;
        for description in &children {
            match old.next() {
                Some(mut instance) if compatible(&instance, description) => {
                    if let Err(failure) = patch(self, ambient, &mut instance, description) {
                        first_err.get_or_insert(failure);
                    }
                    next.push(instance);
                }
                Some(instance) => {
                    self.remove_subtree(&instance);
                    if let Err(failure) =
                        self.mount_one(ambient, description, None, parent_svg, &mut next)
                    {
                        first_err.get_or_insert(failure);
                    }
                }
                None => {
                    if let Err(failure) =
                        self.mount_one(ambient, description, None, parent_svg, &mut next)
                    {
                        first_err.get_or_insert(failure);
                    }
                }
            }
        }
        for leftover in old {
            self.remove_subtree(&leftover);
        }
        parent.set_children(next);
        first_err.map_or(Ok(()), Err)
    }

    fn run_function_component(
        &mut self,
        ambient: &mut Ambient,
        instance: &mut Instance,
        description: &Description,
        context: ResolvedContext,
    ) -> Result<Rendered, Failure> {
        self.run_component_impl(ambient, instance, description, &context)
    }

    fn run_class_component(
        &mut self,
        ambient: &mut Ambient,
        instance: &mut Instance,
        description: &Description,
        context: ResolvedContext,
    ) -> Result<Rendered, Failure> {
        self.run_component_impl(ambient, instance, description, &context)
    }

    fn host_sibling(&self, instance: &Instance) -> Option<HostId> {
        let host = instance.host()?;
        let parent = self.nodes[host.index()].parent?;
        let siblings = &self.nodes[parent.index()].children;
        let position = siblings.iter().position(|&c| c == host)?;
        siblings.get(position + 1).copied()
    }

    fn insert_subtree(&mut self, instance: &mut Instance, anchor: Option<HostId>, parent: HostId) {
        let Some(host) = instance.host() else {
            return;
        };
        self.attach_node(parent, host, anchor);
        self.ops.push(Op::MoveSubtree { node: host, parent });
    }

    fn dispatch_failure(
        &mut self,
        failure: Failure,
        _instance: &mut Instance,
    ) -> Result<(), Failure> {
        self.recoveries.push(failure.clone());
        if self.rethrow { Err(failure) } else { Ok(()) }
    }

    fn before_patch(&mut self, _instance: &Instance, _description: &Description) {
        self.patched += 1;
    }
}

fn compatible(instance: &Instance, description: &Description) -> bool {
    match (instance.kind(), description.content()) {
        (InstanceKind::Text { .. }, Content::Text(_)) => true,
        (InstanceKind::Element { tag }, Content::Element { tag: next, .. }) => tag == next,
        (InstanceKind::Root { .. }, Content::Root { .. }) => true,
        (InstanceKind::FunctionComponent, Content::Fragment { .. }) => true,
        (InstanceKind::FunctionComponent, Content::Component { component, .. }) => {
            component.style() == ComponentStyle::Function
        }
        (InstanceKind::ClassComponent, Content::Component { component, .. }) => {
            component.style() == ComponentStyle::Class
        }
        _ => false,
    }
}

fn first_host(instance: &Instance) -> Option<HostId> {
    instance
        .host()
        .or_else(|| instance.children()?.iter().find_map(first_host))
}

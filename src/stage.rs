//! In-memory document model
//!
//! The stage is the tree lights live on: nodes with classes, attributes
//! and inline-style state, plus a stylesheet slot for the injected base
//! style. Everything here is pure data so the core pipeline runs headless;
//! the presenter mirrors stage state onto real windows, using the revision
//! counter to skip clean frames.
//!
//! Style and surface writes report an explicit [`StyleOutcome`] instead of
//! erroring: a write against a missing node or a non-surface node is a
//! logged skip, never a failure.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Numeric form for log fields
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// What a node is; fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Owns a pixel buffer and can be drawn to
    Surface,
    /// Anything else; occupies a slot but draws are skipped
    Plain,
}

/// Pixel buffer a surface node owns; premultiplied ARGB, row-major
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u32>,
}

/// Opacity transition parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub duration_ms: f64,
    pub easing: String,
}

/// Inline-style state of one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleState {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub opacity: Option<f64>,
    pub transition: Option<Transition>,
    /// Pixel offset applied after left/top, the center-on-point shift
    pub translate: Option<(f64, f64)>,
    pub blend: Option<String>,
    pub zindex: Option<f64>,
    pub hidden: bool,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub style: StyleState,
    pub surface: Option<Surface>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            name: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            style: StyleState::default(),
            surface: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Result of a style or surface write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleOutcome {
    Applied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingNode,
    NotSurface,
}

/// A subtree lifted out of the stage, remembering where it came from
#[derive(Debug)]
pub struct DetachedNode {
    id: NodeId,
    original_parent: Option<NodeId>,
    nodes: Vec<(NodeId, Node)>,
}

impl DetachedNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn original_parent(&self) -> Option<NodeId> {
        self.original_parent
    }
}

pub struct Stage {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next: u64,
    revision: u64,
    base_styles: BTreeMap<String, String>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut root_node = Node::new(NodeKind::Plain);
        root_node.name = Some("body".to_string());
        let mut nodes = HashMap::new();
        nodes.insert(root, root_node);
        Stage { nodes, root, next: 1, revision: 0, base_styles: BTreeMap::new() }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Bumps on every mutation; presenters compare against a remembered
    /// value to skip clean frames
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Allocate a node outside the tree; invisible to queries until
    /// inserted
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, Node::new(kind));
        id
    }

    /// Create and insert in one step
    pub fn create_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.create(kind);
        self.insert_batch(parent, &[id]);
        id
    }

    /// Append `ids` in order under `parent` with a single revision bump.
    /// An unknown parent or id is skipped with a debug log.
    pub fn insert_batch(&mut self, parent: NodeId, ids: &[NodeId]) {
        if !self.nodes.contains_key(&parent) {
            debug!(parent = parent.raw(), "batch insert under missing parent skipped");
            return;
        }
        let mut inserted = Vec::new();
        for &id in ids {
            match self.nodes.get_mut(&id) {
                Some(node) if node.parent.is_none() && id != self.root => {
                    node.parent = Some(parent);
                    inserted.push(id);
                }
                Some(_) => debug!(node = id.raw(), "already attached, insert skipped"),
                None => debug!(node = id.raw(), "unknown node, insert skipped"),
            }
        }
        if inserted.is_empty() {
            return;
        }
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.extend(inserted);
        }
        self.revision += 1;
    }

    /// Detach a subtree, recording the original parent for re-attachment.
    /// The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Option<DetachedNode> {
        if id == self.root || !self.nodes.contains_key(&id) {
            return None;
        }
        let original_parent = self.nodes.get(&id).and_then(|n| n.parent);
        if let Some(parent) = original_parent
            && let Some(parent_node) = self.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|c| *c != id);
        }
        let mut nodes = Vec::new();
        self.extract(id, &mut nodes);
        self.revision += 1;
        Some(DetachedNode { id, original_parent, nodes })
    }

    fn extract(&mut self, id: NodeId, out: &mut Vec<(NodeId, Node)>) {
        if let Some(node) = self.nodes.remove(&id) {
            let children = node.children.clone();
            out.push((id, node));
            for child in children {
                self.extract(child, out);
            }
        }
    }

    /// Re-insert a detached subtree under its recorded parent when that
    /// parent still exists, else under `fallback`, else under the root.
    pub fn attach(&mut self, detached: DetachedNode, fallback: NodeId) -> NodeId {
        let target = detached.id;
        let parent = detached
            .original_parent
            .filter(|p| self.nodes.contains_key(p))
            .or_else(|| self.nodes.contains_key(&fallback).then_some(fallback))
            .unwrap_or(self.root);
        for (id, mut node) in detached.nodes {
            if id == target {
                node.parent = Some(parent);
            }
            self.nodes.insert(id, node);
        }
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(target);
        }
        self.revision += 1;
        target
    }

    /// Re-insert a detached subtree under `parent`, ignoring the recorded
    /// one. Falls back to the root when `parent` is gone.
    pub fn attach_under(&mut self, mut detached: DetachedNode, parent: NodeId) -> NodeId {
        detached.original_parent = self.nodes.contains_key(&parent).then_some(parent);
        self.attach(detached, self.root)
    }

    /// Every attached node in tree order, root first. Detached subtrees
    /// and never-inserted nodes are not visited.
    pub fn tree_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_tree(self.root, &mut out);
        out
    }

    fn collect_tree(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(&id) {
            out.push(id);
            for &child in &node.children {
                self.collect_tree(child, out);
            }
        }
    }

    /// Nodes bearing `class`, in tree order
    pub fn query_class(&self, class: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_class(self.root, class, &mut out);
        out
    }

    fn collect_class(&self, id: NodeId, class: &str, out: &mut Vec<NodeId>) {
        if let Some(node) = self.nodes.get(&id) {
            if node.classes.iter().any(|c| c == class) {
                out.push(id);
            }
            for &child in &node.children {
                self.collect_class(child, class, out);
            }
        }
    }

    /// First node with the given name, in tree order
    pub fn find_named(&self, name: &str) -> Option<NodeId> {
        self.find_named_from(self.root, name)
    }

    fn find_named_from(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        if node.name.as_deref() == Some(name) {
            return Some(id);
        }
        node.children.iter().find_map(|&child| self.find_named_from(child, name))
    }

    pub fn set_name(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.name = Some(name.to_string());
            self.revision += 1;
        }
    }

    pub fn set_classes(&mut self, id: NodeId, classes: Vec<String>) -> StyleOutcome {
        self.with_node(id, |node| node.classes = classes)
    }

    /// Add a class if not already present
    pub fn add_class(&mut self, id: NodeId, class: &str) -> StyleOutcome {
        self.with_node(id, |node| {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        })
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) -> StyleOutcome {
        self.with_node(id, |node| {
            node.attrs.insert(key.to_string(), value.to_string());
        })
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes.get(&id)?.attrs.get(key).map(String::as_str)
    }

    pub fn style(&self, id: NodeId) -> Option<&StyleState> {
        self.nodes.get(&id).map(|n| &n.style)
    }

    pub fn set_position(&mut self, id: NodeId, left: f64, top: f64) -> StyleOutcome {
        self.with_node(id, |node| {
            node.style.left = Some(left);
            node.style.top = Some(top);
        })
    }

    /// Opacity clamped to 0..=1
    pub fn set_opacity(&mut self, id: NodeId, opacity: f64) -> StyleOutcome {
        self.with_node(id, |node| node.style.opacity = Some(opacity.clamp(0.0, 1.0)))
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> StyleOutcome {
        self.with_node(id, |node| node.style.hidden = hidden)
    }

    pub fn set_transition(&mut self, id: NodeId, duration_ms: f64, easing: &str) -> StyleOutcome {
        self.with_node(id, |node| {
            node.style.transition =
                Some(Transition { duration_ms, easing: easing.to_string() });
        })
    }

    pub fn set_translate(&mut self, id: NodeId, dx: f64, dy: f64) -> StyleOutcome {
        self.with_node(id, |node| node.style.translate = Some((dx, dy)))
    }

    pub fn set_blend(&mut self, id: NodeId, blend: &str) -> StyleOutcome {
        self.with_node(id, |node| node.style.blend = Some(blend.to_string()))
    }

    pub fn set_zindex(&mut self, id: NodeId, zindex: f64) -> StyleOutcome {
        self.with_node(id, |node| node.style.zindex = Some(zindex))
    }

    /// Install a pixel buffer on a surface node. Plain nodes skip; this is
    /// the draw no-op gate.
    pub fn set_surface(&mut self, id: NodeId, surface: Surface) -> StyleOutcome {
        match self.nodes.get_mut(&id) {
            Some(node) if node.kind == NodeKind::Surface => {
                node.surface = Some(surface);
                self.revision += 1;
                StyleOutcome::Applied
            }
            Some(_) => {
                debug!(node = id.raw(), "draw target is not a surface, skipped");
                StyleOutcome::Skipped(SkipReason::NotSurface)
            }
            None => {
                debug!(node = id.raw(), "draw target missing, skipped");
                StyleOutcome::Skipped(SkipReason::MissingNode)
            }
        }
    }

    pub fn surface(&self, id: NodeId) -> Option<&Surface> {
        self.nodes.get(&id)?.surface.as_ref()
    }

    /// Install (or replace) the base style stored under `tag`
    pub fn install_base_style(&mut self, tag: &str, content: String) {
        self.base_styles.insert(tag.to_string(), content);
        self.revision += 1;
    }

    /// Remove the base style stored under `tag`; false if none was installed
    pub fn remove_base_style(&mut self, tag: &str) -> bool {
        let removed = self.base_styles.remove(tag).is_some();
        if removed {
            self.revision += 1;
        }
        removed
    }

    pub fn base_style(&self, tag: &str) -> Option<&str> {
        self.base_styles.get(tag).map(String::as_str)
    }

    fn with_node<F: FnOnce(&mut Node)>(&mut self, id: NodeId, f: F) -> StyleOutcome {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                f(node);
                self.revision += 1;
                StyleOutcome::Applied
            }
            None => {
                debug!(node = id.raw(), "write on missing node skipped");
                StyleOutcome::Skipped(SkipReason::MissingNode)
            }
        }
    }
}

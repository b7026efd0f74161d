//! Host tree abstraction and the in-memory default host.

use std::collections::BTreeMap;

/// Opaque handle to a node owned by a [`Dom`] implementation.
///
/// The reconciler never inspects host nodes; it only threads these handles
/// back into the [`Dom`] that allocated them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Mutation contract the reconciler emits patches into.
///
/// Implement this trait to drive a real presentation tree (a browser DOM via
/// bindings, a terminal scene graph, a retained widget tree). The engine
/// only requires the minimal operations the index-based child diff produces;
/// there is deliberately no query surface here, because the reconciler keeps
/// its own mirror of everything it created.
///
/// [`MemoryDom`] is the built-in headless implementation used by the tests
/// and by hosts that only need the rendered tree as data.
#[cfg_attr(test, mockall::automock)]
pub trait Dom {
    /// Allocate a new element node with the given tag name.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Allocate a new text node.
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Replace the content of a text node.
    fn set_text(&mut self, node: NodeId, text: &str);

    /// Set or overwrite an attribute on an element node.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// Remove an attribute from an element node, if present.
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Swap `new` into the position `old` occupies under `old`'s parent.
    ///
    /// `old` is left detached. When `old` has no parent this only detaches
    /// `new` from wherever it was.
    fn replace_node(&mut self, old: NodeId, new: NodeId);

    /// Remove `node` and its subtree from its parent, if any.
    fn detach(&mut self, node: NodeId);
}

enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<NodeId>,
    },
    Text(String),
}

struct NodeData {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// Arena-backed [`Dom`] implementation.
///
/// Nodes live for the lifetime of the arena; `detach` unlinks a subtree but
/// does not reclaim it. Beyond the [`Dom`] trait, `MemoryDom` offers the
/// inspection methods tests and headless hosts need: [`tag_name`],
/// [`text_content`], [`attribute`], [`children`], [`parent`] and a
/// [`to_html`] debug serialization.
///
/// [`tag_name`]: MemoryDom::tag_name
/// [`text_content`]: MemoryDom::text_content
/// [`attribute`]: MemoryDom::attribute
/// [`children`]: MemoryDom::children
/// [`parent`]: MemoryDom::parent
/// [`to_html`]: MemoryDom::to_html
pub struct MemoryDom {
    nodes: Vec<NodeData>,
}

impl MemoryDom {
    pub fn new() -> Self {
        MemoryDom { nodes: Vec::new() }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(NodeData { parent: None, kind });
        id
    }

    fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0 as usize]
    }

    fn data_mut(&mut self, node: NodeId) -> &mut NodeData {
        &mut self.nodes[node.0 as usize]
    }

    fn unlink(&mut self, child: NodeId) {
        if let Some(parent) = self.data(child).parent {
            if let NodeKind::Element { children, .. } = &mut self.data_mut(parent).kind {
                children.retain(|existing| *existing != child);
            }
        }
        self.data_mut(child).parent = None;
    }

    /// Tag name of an element node, `None` for text nodes.
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.data(node).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    /// Current value of an attribute, if set.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.data(node).kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    /// Child nodes in document order. Empty for text nodes.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        match &self.data(node).kind {
            NodeKind::Element { children, .. } => children,
            NodeKind::Text(_) => &[],
        }
    }

    /// The node's parent, if attached.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).parent
    }

    /// Concatenated text of the node and all its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.data(node).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { children, .. } => {
                for child in children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Serialize the subtree as HTML-ish markup, for assertions and logs.
    pub fn to_html(&self, node: NodeId) -> String {
        match &self.data(node).kind {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Element {
                tag,
                attributes,
                children,
            } => {
                let mut out = format!("<{tag}");
                for (name, value) in attributes {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                for child in children {
                    out.push_str(&self.to_html(*child));
                }
                out.push_str(&format!("</{tag}>"));
                out
            }
        }
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom for MemoryDom {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_owned(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        })
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_owned()))
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let NodeKind::Text(existing) = &mut self.data_mut(node).kind {
            *existing = text.to_owned();
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.data_mut(node).kind {
            attributes.insert(name.to_owned(), value.to_owned());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.data_mut(node).kind {
            attributes.remove(name);
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        if let NodeKind::Element { children, .. } = &mut self.data_mut(parent).kind {
            children.push(child);
        }
        self.data_mut(child).parent = Some(parent);
    }

    fn replace_node(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.data(old).parent else {
            self.unlink(new);
            return;
        };
        self.unlink(new);
        if let NodeKind::Element { children, .. } = &mut self.data_mut(parent).kind {
            match children.iter().position(|existing| *existing == old) {
                Some(slot) => children[slot] = new,
                None => children.push(new),
            }
        }
        self.data_mut(new).parent = Some(parent);
        self.data_mut(old).parent = None;
    }

    fn detach(&mut self, node: NodeId) {
        self.unlink(node);
    }
}

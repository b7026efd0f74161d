//! Live ref tracking for mounted components.
//!
//! A node in a render can carry a ref name
//! ([`VNode::reference`](crate::VNode::reference)). After every successful
//! patch the owning component's refs table is rebuilt from the new tree, so
//! the table always reflects exactly the latest render: a ref present in a
//! previous render but absent from the new one simply disappears.

use std::collections::HashMap;

use crate::component::Handle;
use crate::dom::NodeId;
use crate::patch::InstanceNode;
use crate::vnode::VNode;

/// What a ref name resolves to.
#[derive(Clone, Debug)]
pub enum RefTarget {
    /// A host node created for an element vnode.
    Node(NodeId),
    /// A live nested component instance.
    Component(Handle),
}

impl RefTarget {
    /// The host node, if this ref points at an element.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            RefTarget::Node(node) => Some(*node),
            RefTarget::Component(_) => None,
        }
    }

    /// The component handle, if this ref points at a nested component.
    pub fn component(&self) -> Option<&Handle> {
        match self {
            RefTarget::Node(_) => None,
            RefTarget::Component(handle) => Some(handle),
        }
    }
}

/// A component's refs table.
pub type RefMap = HashMap<String, RefTarget>;

/// Walk a freshly patched vnode/instance pair and record every ref.
///
/// Scoped to the owning component: the walk does not descend into a nested
/// component's own tree, so refs never leak across component boundaries.
pub(crate) fn collect_refs(vnode: &VNode, instance: &InstanceNode, refs: &mut RefMap) {
    match (vnode, instance) {
        (VNode::Element(element), InstanceNode::Element { node, children }) => {
            if let Some(name) = &element.ref_name {
                refs.insert(name.clone(), RefTarget::Node(*node));
            }
            for (child_vnode, child_instance) in element.children.iter().zip(children) {
                collect_refs(child_vnode, child_instance, refs);
            }
        }
        (VNode::Component(component), InstanceNode::Component { handle }) => {
            if let Some(name) = component.ref_name() {
                refs.insert(name.clone(), RefTarget::Component(handle.clone()));
            }
        }
        _ => {}
    }
}

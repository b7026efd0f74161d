//! The reconciler: mounts vnode trees and patches mounted trees in place.
//!
//! The engine keeps one [`Mount`] per live component: the vnode tree of its
//! last render, an [`InstanceNode`] mirror holding the host nodes that tree
//! produced, and the refs table collected from it. Patching walks the old
//! and new trees together, matching children by position, and emits the
//! minimal [`Dom`] mutations: identical nodes produce no host calls at all.

use std::cell::{RefCell, RefMut};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::trace;

use crate::cascade::destroy_subtree;
use crate::component::{ComponentId, Handle};
use crate::dom::{Dom, NodeId};
use crate::error::Error;
use crate::refs::{collect_refs, RefMap};
use crate::vnode::VNode;

/// Runtime mirror of a rendered vnode tree.
///
/// Element and text instances own the host node created for them; component
/// instances point at the live instance, whose own subtree lives in its
/// [`Mount`]. Every host node in a mounted tree is reachable from exactly
/// one instance node.
pub(crate) enum InstanceNode {
    Element {
        node: NodeId,
        children: Vec<InstanceNode>,
    },
    Text {
        node: NodeId,
    },
    Component {
        handle: Handle,
    },
}

/// The result of a component's most recent render.
pub(crate) struct Rendered {
    pub(crate) vnode: VNode,
    pub(crate) root: InstanceNode,
}

/// Engine-side bookkeeping for one mounted component.
pub(crate) struct Mount {
    /// Root host node of the component's rendered tree.
    pub(crate) element: NodeId,
    /// Taken while the component is being patched, otherwise always set.
    pub(crate) rendered: Option<Rendered>,
    pub(crate) refs: RefMap,
    /// Registered in the pending cycle.
    pub(crate) scheduled: bool,
    /// Destruction has begun; the destroy hook must not run again.
    pub(crate) destroyed: bool,
}

/// Per-cycle scratch state threaded through mounting and patching.
#[derive(Default)]
pub(crate) struct CycleState {
    /// Components whose subtree was patched, in patch completion order.
    /// Children complete before the parents that contain them, which is the
    /// order the hook dispatcher wants.
    pub(crate) touched: Vec<Handle>,
    /// Components that already rendered this cycle. Guards the
    /// exactly-once-per-cycle contract when a scheduled component is also
    /// reached transitively through a parent's render.
    pub(crate) rendered: HashSet<ComponentId>,
    /// First non-fatal error hit during the cycle. Later errors are dropped;
    /// the cycle keeps going so one component cannot starve the batch.
    pub(crate) deferred: Option<Error>,
}

impl CycleState {
    pub(crate) fn defer(&mut self, error: Error) {
        if self.deferred.is_none() {
            self.deferred = Some(error);
        } else {
            trace!(%error, "dropping subsequent cycle error");
        }
    }

    pub(crate) fn take_result(&mut self) -> Result<(), Error> {
        match self.deferred.take() {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }
}

/// The mounted component forest and the host tree it projects into.
pub(crate) struct Tree {
    dom: Rc<RefCell<dyn Dom>>,
    pub(crate) mounts: HashMap<ComponentId, Mount>,
}

impl Tree {
    pub(crate) fn new(dom: Rc<RefCell<dyn Dom>>) -> Self {
        Tree {
            dom,
            mounts: HashMap::new(),
        }
    }

    pub(crate) fn dom(&self) -> RefMut<'_, dyn Dom> {
        self.dom.borrow_mut()
    }

    /// Host node an instance resolves to. Component instances resolve
    /// through their mount's cached root element; a component unmounted out
    /// of band (through [`Engine::destroy`](crate::Engine::destroy)) no
    /// longer resolves and yields `None`.
    pub(crate) fn node_of(&self, instance: &InstanceNode) -> Option<NodeId> {
        match instance {
            InstanceNode::Element { node, .. } | InstanceNode::Text { node } => Some(*node),
            InstanceNode::Component { handle } => {
                self.mounts.get(&handle.id()).map(|mount| mount.element)
            }
        }
    }

    /// First mount of a component: render, build the host subtree, collect
    /// refs, and record the mount.
    pub(crate) fn mount_component(
        &mut self,
        handle: &Handle,
        cycle: &mut CycleState,
    ) -> Result<NodeId, Error> {
        let id = handle.id();
        if self.mounts.contains_key(&id) {
            return Err(Error::AlreadyMounted);
        }
        let vnode = handle.borrow_mut().render();
        cycle.rendered.insert(id);
        let root = self.mount_vnode(&vnode, cycle);
        let Some(element) = self.node_of(&root) else {
            return Err(cycle.take_result().err().unwrap_or(Error::NotMounted));
        };
        let mut refs = RefMap::new();
        collect_refs(&vnode, &root, &mut refs);
        self.mounts.insert(
            id,
            Mount {
                element,
                rendered: Some(Rendered { vnode, root }),
                refs,
                scheduled: false,
                destroyed: false,
            },
        );
        Ok(element)
    }

    /// Build host nodes and instances for a vnode subtree.
    fn mount_vnode(&mut self, vnode: &VNode, cycle: &mut CycleState) -> InstanceNode {
        match vnode {
            VNode::Text(text) => {
                let node = self.dom().create_text(text);
                InstanceNode::Text { node }
            }
            VNode::Element(element) => {
                let node = self.dom().create_element(&element.tag);
                for (name, value) in &element.attributes {
                    self.dom().set_attribute(node, name, value);
                }
                let mut children = Vec::with_capacity(element.children.len());
                for child in &element.children {
                    let instance = self.mount_vnode(child, cycle);
                    if let Some(child_node) = self.node_of(&instance) {
                        self.dom().append_child(node, child_node);
                    }
                    children.push(instance);
                }
                InstanceNode::Element { node, children }
            }
            VNode::Component(component) => {
                let handle = component.instantiate();
                let props = component.props();
                if !props.is_none() {
                    if let Err(error) = handle.borrow_mut().update(props) {
                        cycle.defer(error);
                    }
                }
                if let Err(error) = self.mount_component(&handle, cycle) {
                    cycle.defer(error);
                }
                InstanceNode::Component { handle }
            }
        }
    }

    /// Re-render a mounted component and patch its host subtree in place.
    ///
    /// With `allow_root_change` unset, a render whose root differs in kind
    /// or tag from the mounted root fails with [`Error::RootTypeChange`]
    /// before any host mutation; the previous tree stays mounted and valid.
    pub(crate) fn patch_component(
        &mut self,
        handle: &Handle,
        allow_root_change: bool,
        cycle: &mut CycleState,
    ) -> Result<(), Error> {
        let id = handle.id();
        let old = {
            let mount = self.mounts.get_mut(&id).ok_or(Error::NotMounted)?;
            if mount.destroyed {
                return Err(Error::NotMounted);
            }
            mount.rendered.take().ok_or(Error::NotMounted)?
        };

        let new_vnode = handle.borrow_mut().render();
        cycle.rendered.insert(id);

        let new_root = if old.vnode.same_type(&new_vnode) {
            self.patch_vnode(old.vnode, old.root, &new_vnode, cycle)
        } else if allow_root_change {
            trace!(
                from = %old.vnode.type_label(),
                to = %new_vnode.type_label(),
                "replacing root node"
            );
            let old_node = self.node_of(&old.root);
            let new_root = self.mount_vnode(&new_vnode, cycle);
            if let Some(old_node) = old_node {
                match self.node_of(&new_root) {
                    Some(new_node) => self.dom().replace_node(old_node, new_node),
                    None => self.dom().detach(old_node),
                }
            }
            let mut first_error = None;
            destroy_subtree(self, &old.root, &mut first_error);
            if let Some(error) = first_error {
                cycle.defer(error);
            }
            new_root
        } else {
            let error = Error::RootTypeChange {
                from: old.vnode.type_label(),
                to: new_vnode.type_label(),
            };
            let mount = self.mounts.get_mut(&id).ok_or(Error::NotMounted)?;
            mount.rendered = Some(old);
            return Err(error);
        };

        let element = self.node_of(&new_root);
        let mut refs = RefMap::new();
        collect_refs(&new_vnode, &new_root, &mut refs);

        let mount = self.mounts.get_mut(&id).ok_or(Error::NotMounted)?;
        if let Some(element) = element {
            mount.element = element;
        }
        mount.refs = refs;
        mount.rendered = Some(Rendered {
            vnode: new_vnode,
            root: new_root,
        });
        cycle.touched.push(handle.clone());
        Ok(())
    }

    /// Patch one tree position. Same-type pairs are updated in place; any
    /// other combination replaces the old subtree wholesale, destroying the
    /// component instances it contained.
    fn patch_vnode(
        &mut self,
        old_vnode: VNode,
        old_instance: InstanceNode,
        new_vnode: &VNode,
        cycle: &mut CycleState,
    ) -> InstanceNode {
        match (old_vnode, old_instance, new_vnode) {
            (VNode::Text(old), InstanceNode::Text { node }, VNode::Text(new)) => {
                if old != **new {
                    self.dom().set_text(node, new);
                }
                InstanceNode::Text { node }
            }
            (VNode::Element(old), InstanceNode::Element { node, children }, VNode::Element(new))
                if old.tag == new.tag =>
            {
                for (name, value) in &new.attributes {
                    if old.attributes.get(name) != Some(value) {
                        self.dom().set_attribute(node, name, value);
                    }
                }
                for name in old.attributes.keys() {
                    if !new.attributes.contains_key(name) {
                        self.dom().remove_attribute(node, name);
                    }
                }

                let mut new_children = Vec::with_capacity(new.children.len());
                let mut old_pairs = old.children.into_iter().zip(children);
                for new_child in &new.children {
                    match old_pairs.next() {
                        Some((old_child_vnode, old_child_instance)) => {
                            new_children.push(self.patch_vnode(
                                old_child_vnode,
                                old_child_instance,
                                new_child,
                                cycle,
                            ));
                        }
                        None => {
                            let instance = self.mount_vnode(new_child, cycle);
                            if let Some(child_node) = self.node_of(&instance) {
                                self.dom().append_child(node, child_node);
                            }
                            new_children.push(instance);
                        }
                    }
                }
                for (_, removed) in old_pairs {
                    if let Some(removed_node) = self.node_of(&removed) {
                        self.dom().detach(removed_node);
                    }
                    let mut first_error = None;
                    destroy_subtree(self, &removed, &mut first_error);
                    if let Some(error) = first_error {
                        cycle.defer(error);
                    }
                }
                InstanceNode::Element {
                    node,
                    children: new_children,
                }
            }
            (VNode::Component(old), InstanceNode::Component { handle }, VNode::Component(new))
                if old.type_id() == new.type_id() =>
            {
                // Same component type at the same position: apply the new
                // props through its update and refresh it within this cycle,
                // unless it already rendered (it was scheduled on its own).
                // The update result is bound first so the component borrow
                // ends before the patch re-borrows it.
                let updated = handle.borrow_mut().update(new.props());
                match updated {
                    Err(error) => cycle.defer(error),
                    Ok(()) => {
                        if !cycle.rendered.contains(&handle.id()) {
                            if let Err(error) = self.patch_component(&handle, true, cycle) {
                                cycle.defer(error);
                            }
                        }
                    }
                }
                InstanceNode::Component { handle }
            }
            (_, old_instance, new_vnode) => {
                let old_node = self.node_of(&old_instance);
                let new_instance = self.mount_vnode(new_vnode, cycle);
                if let Some(old_node) = old_node {
                    match self.node_of(&new_instance) {
                        Some(new_node) => self.dom().replace_node(old_node, new_node),
                        None => self.dom().detach(old_node),
                    }
                }
                let mut first_error = None;
                destroy_subtree(self, &old_instance, &mut first_error);
                if let Some(error) = first_error {
                    cycle.defer(error);
                }
                new_instance
            }
        }
    }
}

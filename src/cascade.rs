//! Teardown of removed component subtrees.
//!
//! Destruction runs depth-first: a component's descendant components are
//! destroyed before its own destroy hook runs. The first hook error is
//! recorded and teardown continues, so one failing component never leaves
//! its siblings mounted.

use tracing::debug;

use crate::component::{ComponentId, Handle};
use crate::error::Error;
use crate::patch::{InstanceNode, Tree};

/// Context handed to [`Component::destroy`](crate::Component::destroy).
///
/// By the time the hook runs the engine has already destroyed the
/// component's descendant components, so [`destroy_children`] finds nothing
/// left and returns `Ok(())`; overriding hooks call it unconditionally and
/// then release their own resources.
///
/// [`destroy_children`]: Cascade::destroy_children
pub struct Cascade<'a> {
    tree: &'a mut Tree,
    id: ComponentId,
}

impl Cascade<'_> {
    /// Destroy any still-mounted component in this component's rendered
    /// tree, children before parents. Returns the first hook error.
    pub fn destroy_children(&mut self) -> Result<(), Error> {
        let Some(mount) = self.tree.mounts.get_mut(&self.id) else {
            return Ok(());
        };
        let Some(rendered) = mount.rendered.take() else {
            return Ok(());
        };
        let mut first_error = None;
        destroy_subtree(self.tree, &rendered.root, &mut first_error);
        if let Some(mount) = self.tree.mounts.get_mut(&self.id) {
            mount.rendered = Some(rendered);
        }
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }
}

/// Destroy every component instance inside an unmounted instance subtree.
pub(crate) fn destroy_subtree(
    tree: &mut Tree,
    instance: &InstanceNode,
    first_error: &mut Option<Error>,
) {
    match instance {
        InstanceNode::Text { .. } => {}
        InstanceNode::Element { children, .. } => {
            for child in children {
                destroy_subtree(tree, child, first_error);
            }
        }
        InstanceNode::Component { handle } => {
            destroy_component(tree, handle, first_error);
        }
    }
}

/// Destroy one component: descendants first, then its own destroy hook,
/// then drop the mount. Safe to call on an already destroyed component.
pub(crate) fn destroy_component(
    tree: &mut Tree,
    handle: &Handle,
    first_error: &mut Option<Error>,
) {
    let id = handle.id();
    let rendered = {
        let Some(mount) = tree.mounts.get_mut(&id) else {
            return;
        };
        if mount.destroyed {
            return;
        }
        mount.destroyed = true;
        mount.rendered.take()
    };

    if let Some(rendered) = &rendered {
        destroy_subtree(tree, &rendered.root, first_error);
    }

    debug!(component = ?id, "destroying component");
    let mut cascade = Cascade {
        tree: &mut *tree,
        id,
    };
    if let Err(error) = handle.borrow_mut().destroy(&mut cascade) {
        if first_error.is_none() {
            *first_error = Some(error);
        }
    }
    tree.mounts.remove(&id);
}

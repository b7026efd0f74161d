//! Batched update scheduling and the engine facade.
//!
//! [`Engine::update`] records state immediately but defers rendering: the
//! component is marked dirty and the caller gets a [`Flush`] future. All
//! updates registered before the next flush share one cycle, each component
//! renders at most once in it, and every `Flush` handed out for the cycle
//! resolves together once the cycle's patches and hooks are done.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures::channel::oneshot;
use tracing::debug;

use crate::cascade::destroy_subtree;
use crate::component::{Handle, Props};
use crate::dom::{Dom, NodeId};
use crate::error::Error;
use crate::patch::{CycleState, Tree};
use crate::refs::{RefMap, RefTarget};

/// Whether a synchronous update may replace the component's root node when
/// a render changes its type or tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootTypeChange {
    /// Replace the root host node in place, preserving its tree position.
    Allow,
    /// Fail with [`Error::RootTypeChange`] and leave the tree untouched.
    Deny,
}

struct Inner {
    tree: Tree,
    /// Components marked dirty for the next cycle, in scheduling order.
    pending: Vec<Handle>,
    /// Payloads from hooks scheduling their own component; the component was
    /// borrowed at scheduling time, so these apply when the cycle flushes.
    deferred_props: Vec<(Handle, Props)>,
    /// Flush futures handed out for the next cycle.
    waiters: Vec<oneshot::Sender<Result<(), Error>>>,
    /// A flush is in progress; re-entrant flushes are no-ops.
    flushing: bool,
}

/// The update scheduler and reconciler, shared by cheap clones.
///
/// Single-threaded and cooperative: the engine, its components, and the
/// [`Dom`] it drives all live on one thread, shared through `Rc`.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use weft::{Component, Engine, Error, Handle, MemoryDom, Props, VNode};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// impl Component for Greeter {
///     fn render(&mut self) -> VNode {
///         VNode::element("div").child(VNode::text(format!("{} World", self.greeting)))
///     }
///
///     fn update(&mut self, props: Props) -> Result<(), Error> {
///         if let Some(greeting) = props.get::<String>() {
///             self.greeting = greeting.clone();
///         }
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), Error> {
/// let dom = Rc::new(RefCell::new(MemoryDom::new()));
/// let engine = Engine::new(dom.clone());
///
/// let greeter = Handle::new(Greeter { greeting: "Hello".to_string() });
/// let element = engine.initialize(&greeter)?;
/// assert_eq!(dom.borrow().text_content(element), "Hello World");
///
/// let flush = engine.update(&greeter, Props::new("Goodbye".to_string()))?;
/// // State changed, but the tree only changes once the flush runs.
/// assert_eq!(dom.borrow().text_content(element), "Hello World");
///
/// futures::executor::block_on(flush)?;
/// assert_eq!(dom.borrow().text_content(element), "Goodbye World");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Rc<RefCell<Inner>>,
}

impl Engine {
    /// An engine projecting into the given host tree.
    pub fn new(dom: Rc<RefCell<dyn Dom>>) -> Self {
        Engine {
            inner: Rc::new(RefCell::new(Inner {
                tree: Tree::new(dom),
                pending: Vec::new(),
                deferred_props: Vec::new(),
                waiters: Vec::new(),
                flushing: false,
            })),
        }
    }

    /// Mount a component: render it once and build its host subtree.
    ///
    /// The mount render counts as the component's first render. No
    /// after-update hooks run for it. Returns the root host node of the
    /// rendered tree.
    pub fn initialize(&self, component: &Handle) -> Result<NodeId, Error> {
        let mut cycle = CycleState::default();
        let element = self
            .inner
            .borrow_mut()
            .tree
            .mount_component(component, &mut cycle)?;
        cycle.take_result()?;
        Ok(element)
    }

    /// Apply an update payload and schedule the component for the next
    /// cycle.
    ///
    /// State changes immediately through the component's
    /// [`update`](crate::Component::update); a mutator error is returned
    /// here and the component is not scheduled. Rendering is deferred: the
    /// returned [`Flush`] drives the cycle when awaited, or the cycle can
    /// be driven explicitly with [`flush`](Engine::flush). Repeated calls
    /// before the flush coalesce into a single render.
    ///
    /// When called from inside the component's own after-update hook the
    /// component is still borrowed by that hook, so the payload is held and
    /// applied when the next cycle flushes instead of immediately.
    pub fn update(&self, component: &Handle, props: Props) -> Result<Flush, Error> {
        self.ensure_mounted(component)?;
        // A hook scheduling its own component still holds the component
        // borrow; the payload is then held and applied at flush time.
        let deferred = match component.try_borrow_mut() {
            Ok(mut state) => {
                state.update(props)?;
                None
            }
            Err(_) => Some(props),
        };

        let inner = &mut *self.inner.borrow_mut();
        let Inner {
            tree,
            pending,
            deferred_props,
            waiters,
            ..
        } = inner;
        if let Some(props) = deferred {
            deferred_props.push((component.clone(), props));
        }
        if let Some(mount) = tree.mounts.get_mut(&component.id()) {
            if !mount.scheduled {
                mount.scheduled = true;
                pending.push(component.clone());
            }
        }
        let (sender, receiver) = oneshot::channel();
        waiters.push(sender);
        Ok(Flush {
            engine: Rc::downgrade(&self.inner),
            receiver,
        })
    }

    /// Run the pending cycle now: render each dirty component at most once,
    /// patch the host tree, then dispatch the after-update hooks.
    ///
    /// Resolves every [`Flush`] handed out for the cycle with this same
    /// result. A no-op while a flush is already in progress.
    pub fn flush(&self) -> Result<(), Error> {
        let (batch, carried, waiters) = {
            let mut inner = self.inner.borrow_mut();
            if inner.flushing {
                return Ok(());
            }
            let waiters = mem::take(&mut inner.waiters);
            if inner.pending.is_empty() {
                drop(inner);
                for waiter in waiters {
                    let _ = waiter.send(Ok(()));
                }
                return Ok(());
            }
            inner.flushing = true;
            (
                mem::take(&mut inner.pending),
                mem::take(&mut inner.deferred_props),
                waiters,
            )
        };
        debug!(scheduled = batch.len(), "flushing update cycle");

        let mut cycle = CycleState::default();
        for (component, props) in carried {
            if let Err(error) = component.borrow_mut().update(props) {
                cycle.defer(error);
            }
        }
        for component in &batch {
            let result = {
                let mut inner = self.inner.borrow_mut();
                let id = component.id();
                let alive = match inner.tree.mounts.get_mut(&id) {
                    Some(mount) => {
                        mount.scheduled = false;
                        !mount.destroyed
                    }
                    None => false,
                };
                if !alive || cycle.rendered.contains(&id) {
                    // Destroyed since scheduling, or already rendered this
                    // cycle through a parent's patch.
                    Ok(())
                } else {
                    inner.tree.patch_component(component, true, &mut cycle)
                }
            };
            if let Err(error) = result {
                cycle.defer(error);
            }
        }

        dispatch_hooks(&cycle.touched);
        self.inner.borrow_mut().flushing = false;

        let result = cycle.take_result();
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
        result
    }

    /// Apply an update payload and re-render immediately, outside any cycle.
    ///
    /// Hooks for this component (and any nested component it re-rendered)
    /// run before this returns. `root` controls what happens when the new
    /// render changes the root node's type or tag; with
    /// [`RootTypeChange::Deny`] such a render fails and the mounted tree is
    /// left as it was.
    pub fn update_sync(
        &self,
        component: &Handle,
        props: Props,
        root: RootTypeChange,
    ) -> Result<(), Error> {
        self.ensure_mounted(component)?;
        component.borrow_mut().update(props)?;

        let mut cycle = CycleState::default();
        self.inner.borrow_mut().tree.patch_component(
            component,
            matches!(root, RootTypeChange::Allow),
            &mut cycle,
        )?;
        dispatch_hooks(&cycle.touched);
        cycle.take_result()
    }

    /// Unmount a component: detach its root host node, destroy every nested
    /// component (children before parents), and drop the mount.
    ///
    /// The component's own destroy hook does not run; this is the operation
    /// such a hook calls into. Returns the first nested destroy error.
    pub fn destroy(&self, component: &Handle) -> Result<(), Error> {
        let mut inner = self.inner.borrow_mut();
        let id = component.id();
        let (element, rendered) = {
            let mount = inner.tree.mounts.get_mut(&id).ok_or(Error::NotMounted)?;
            if mount.destroyed {
                return Err(Error::NotMounted);
            }
            mount.destroyed = true;
            (mount.element, mount.rendered.take())
        };
        debug!(component = ?id, "unmounting component");
        inner.tree.dom().detach(element);

        let mut first_error = None;
        if let Some(rendered) = &rendered {
            destroy_subtree(&mut inner.tree, &rendered.root, &mut first_error);
        }
        inner.tree.mounts.remove(&id);
        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    /// Root host node of a mounted component's rendered tree.
    pub fn element(&self, component: &Handle) -> Result<NodeId, Error> {
        let inner = self.inner.borrow();
        let mount = inner
            .tree
            .mounts
            .get(&component.id())
            .ok_or(Error::NotMounted)?;
        Ok(mount.element)
    }

    /// Snapshot of a mounted component's refs table, as of its last render.
    pub fn refs(&self, component: &Handle) -> Result<RefMap, Error> {
        let inner = self.inner.borrow();
        let mount = inner
            .tree
            .mounts
            .get(&component.id())
            .ok_or(Error::NotMounted)?;
        Ok(mount.refs.clone())
    }

    /// Look up a single ref by name.
    pub fn ref_target(&self, component: &Handle, name: &str) -> Result<Option<RefTarget>, Error> {
        let inner = self.inner.borrow();
        let mount = inner
            .tree
            .mounts
            .get(&component.id())
            .ok_or(Error::NotMounted)?;
        Ok(mount.refs.get(name).cloned())
    }

    /// Whether the component is currently mounted.
    pub fn is_mounted(&self, component: &Handle) -> bool {
        self.inner.borrow().tree.mounts.contains_key(&component.id())
    }

    fn ensure_mounted(&self, component: &Handle) -> Result<(), Error> {
        let inner = self.inner.borrow();
        match inner.tree.mounts.get(&component.id()) {
            Some(mount) if !mount.destroyed => Ok(()),
            _ => Err(Error::NotMounted),
        }
    }
}

/// Write phase first across every patched component, then the read phase,
/// both in patch completion order (children before parents). Runs outside
/// the engine borrow so hooks may schedule next-cycle updates.
fn dispatch_hooks(touched: &[Handle]) {
    for component in touched {
        component.borrow_mut().write_after_update();
    }
    for component in touched {
        component.borrow_mut().read_after_update();
    }
}

/// Future resolving when the cycle its update joined has flushed.
///
/// Lazy: the cycle runs when some `Flush` for it is polled, or when
/// [`Engine::flush`] is called explicitly, whichever comes first. Dropping
/// a `Flush` without awaiting it never loses the update; the cycle still
/// runs on the next poll or explicit flush.
pub struct Flush {
    engine: Weak<RefCell<Inner>>,
    receiver: oneshot::Receiver<Result<(), Error>>,
}

impl fmt::Debug for Flush {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flush").finish_non_exhaustive()
    }
}

impl Future for Flush {
    type Output = Result<(), Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Poll::Ready(result) = Pin::new(&mut this.receiver).poll(cx) {
            // A dropped engine resolves the flush as a no-op.
            return Poll::Ready(result.unwrap_or(Ok(())));
        }
        if let Some(inner) = this.engine.upgrade() {
            let _ = Engine { inner }.flush();
        }
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(result) => Poll::Ready(result.unwrap_or(Ok(()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

//! Component capability contract and the handles the engine works through.

use std::any::Any;
use std::cell::{BorrowMutError, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::cascade::Cascade;
use crate::error::Error;
use crate::vnode::VNode;

/// The capability set the engine consumes.
///
/// `render` and `update` are required; the remaining hooks default to no-ops,
/// which is the analog of the hook simply being absent. The engine owns the
/// component's mounted element and refs table and exposes them through
/// [`Engine::element`](crate::Engine::element) and
/// [`Engine::refs`](crate::Engine::refs); the component itself only holds
/// its visible state.
///
/// Implementations must not call back into the [`Engine`](crate::Engine)
/// from `render`, `update`, or `destroy`; those run while the engine's
/// internals are borrowed. The after-update hooks are dispatched outside
/// that borrow and may schedule further updates, which land in the next
/// cycle. A hook scheduling an update for its own component cannot have the
/// payload applied on the spot (the component is borrowed by the running
/// hook); the engine holds it and applies it when that next cycle flushes.
pub trait Component: 'static {
    /// Produce a fresh vnode tree describing the component's current state.
    fn render(&mut self) -> VNode;

    /// Apply an update payload to the component's visible state.
    ///
    /// This is the only place state is expected to change. Rendering and
    /// patching happen afterwards, driven by the scheduler. An error aborts
    /// this component's participation in the cycle without disturbing other
    /// scheduled components.
    fn update(&mut self, props: Props) -> Result<(), Error>;

    /// Called when the component is removed from the tree.
    ///
    /// The engine destroys removed descendants before their parents, so by
    /// the time this runs the component's own child components are already
    /// gone; [`Cascade::destroy_children`] is then a no-op and safe to call
    /// unconditionally. The engine never invokes this hook twice for the
    /// same component.
    fn destroy(&mut self, cascade: &mut Cascade<'_>) -> Result<(), Error> {
        let _ = cascade;
        Ok(())
    }

    /// First hook phase after a cycle's patches: mutate the DOM here.
    fn write_after_update(&mut self) {}

    /// Second hook phase after a cycle's patches: measure the DOM here.
    fn read_after_update(&mut self) {}
}

/// Stable identity of a component instance, derived from its allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentId(usize);

/// Cheap-clone shared handle to a component instance.
///
/// The engine is single-threaded and cooperative; handles are `Rc`-backed
/// and borrow the component through a `RefCell` at well-defined points
/// (render, update, hooks). Cloning a handle never clones the component.
pub struct Handle {
    inner: Rc<RefCell<dyn Component>>,
}

impl Handle {
    /// Wrap a freshly constructed component.
    pub fn new<C: Component>(component: C) -> Self {
        Handle {
            inner: Rc::new(RefCell::new(component)),
        }
    }

    /// Wrap an existing shared component cell.
    ///
    /// Useful in tests and hosts that keep a typed `Rc<RefCell<C>>` around
    /// for direct state access; the handle shares the same allocation, so
    /// identity is preserved.
    pub fn from_rc<C: Component>(component: Rc<RefCell<C>>) -> Self {
        Handle { inner: component }
    }

    /// The component's stable identity.
    pub fn id(&self) -> ComponentId {
        ComponentId(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Immutably borrow the component.
    ///
    /// Panics if the component is currently borrowed mutably, which happens
    /// when called from inside the component's own hooks.
    pub fn borrow(&self) -> Ref<'_, dyn Component> {
        self.inner.borrow()
    }

    /// Mutably borrow the component. Same panic caveat as [`borrow`](Self::borrow).
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Component> {
        self.inner.borrow_mut()
    }

    /// Mutably borrow the component, failing instead of panicking when it is
    /// already borrowed (for example from inside one of its own hooks).
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn Component>, BorrowMutError> {
        self.inner.try_borrow_mut()
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        Handle {
            inner: self.inner.clone(),
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Handle {}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.id()).finish()
    }
}

/// Type-erased update payload.
///
/// Replaces variadic argument forwarding with a fixed, explicit contract:
/// a payload is either empty or a single shared value the receiving
/// component downcasts with [`get`](Props::get).
///
/// ```
/// use weft::Props;
///
/// let props = Props::new(42u32);
/// assert_eq!(props.get::<u32>(), Some(&42));
/// assert_eq!(props.get::<String>(), None);
/// assert!(Props::none().is_none());
/// ```
#[derive(Clone, Default)]
pub struct Props {
    value: Option<Rc<dyn Any>>,
}

impl Props {
    /// Wrap a payload value.
    pub fn new<T: Any>(value: T) -> Self {
        Props {
            value: Some(Rc::new(value)),
        }
    }

    /// The empty payload.
    pub fn none() -> Self {
        Props { value: None }
    }

    /// Whether the payload is empty.
    pub fn is_none(&self) -> bool {
        self.value.is_none()
    }

    /// Downcast the payload to a concrete type.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.value.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(_) => f.write_str("Props(..)"),
            None => f.write_str("Props(none)"),
        }
    }
}

//! Immutable virtual node model produced by component renders.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::component::{Component, Handle, Props};

/// Immutable description of a rendered node.
///
/// A render produces a fresh `VNode` tree every time; the reconciler diffs
/// the new tree against the tree of the previous render and never mutates
/// either. Trees are built with the combinators on this type, standing in
/// for the call tree a JSX-style transform would emit:
///
/// ```
/// use weft::{Props, VNode};
/// # use weft::{Component, Error};
/// # #[derive(Default)]
/// # struct Title;
/// # impl Component for Title {
/// #     fn render(&mut self) -> VNode { VNode::element("h1") }
/// #     fn update(&mut self, _props: Props) -> Result<(), Error> { Ok(()) }
/// # }
///
/// let tree = VNode::element("div")
///     .attribute("class", "card")
///     .child(VNode::component::<Title>(Props::none()))
///     .child(VNode::element("span").reference("body").child(VNode::text("hi")));
/// ```
#[derive(Debug)]
pub enum VNode {
    /// A plain element with a tag name, attributes, and ordered children.
    Element(ElementNode),
    /// A text node.
    Text(String),
    /// A nested component, instantiated on first mount and updated in place
    /// on later renders.
    Component(ComponentNode),
}

/// Element payload of [`VNode::Element`].
#[derive(Debug)]
pub struct ElementNode {
    /// Tag name, matched for identity during patching.
    pub tag: String,
    /// Attribute map. Ordered so diffs and serializations are deterministic.
    pub attributes: BTreeMap<String, String>,
    /// Ordered children, matched by position during patching.
    pub children: Vec<VNode>,
    /// Name under which the element's node is recorded in the owning
    /// component's refs table.
    pub ref_name: Option<String>,
}

/// Component payload of [`VNode::Component`].
///
/// Carries the component's type identity, a factory run once on first mount,
/// and the props applied on every render that reaches this position.
pub struct ComponentNode {
    type_id: TypeId,
    type_name: &'static str,
    init: Rc<dyn Fn() -> Handle>,
    props: Props,
    ref_name: Option<String>,
}

impl ComponentNode {
    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Full type name of the component, mostly useful in logs and errors.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn instantiate(&self) -> Handle {
        (self.init)()
    }

    pub(crate) fn props(&self) -> Props {
        self.props.clone()
    }

    pub(crate) fn ref_name(&self) -> Option<&String> {
        self.ref_name.as_ref()
    }
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentNode")
            .field("type_name", &self.type_name)
            .field("ref_name", &self.ref_name)
            .finish_non_exhaustive()
    }
}

impl VNode {
    /// A new element node with the given tag and no attributes or children.
    pub fn element(tag: impl Into<String>) -> Self {
        VNode::Element(ElementNode {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            ref_name: None,
        })
    }

    /// A new text node.
    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text(text.into())
    }

    /// A nested component constructed with `C::default()` on first mount.
    pub fn component<C>(props: Props) -> Self
    where
        C: Component + Default,
    {
        Self::component_with(props, C::default)
    }

    /// A nested component constructed by `init` on first mount.
    ///
    /// `init` runs exactly once per mounted position; later renders reuse
    /// the live instance and only apply `props` through its `update`.
    pub fn component_with<C, F>(props: Props, init: F) -> Self
    where
        C: Component,
        F: Fn() -> C + 'static,
    {
        VNode::Component(ComponentNode {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            init: Rc::new(move || Handle::new(init())),
            props,
            ref_name: None,
        })
    }

    /// Set an attribute. Has no effect on text or component nodes.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let VNode::Element(element) = &mut self {
            element.attributes.insert(name.into(), value.into());
        }
        self
    }

    /// Append a child. Has no effect on text or component nodes.
    pub fn child(mut self, child: VNode) -> Self {
        if let VNode::Element(element) = &mut self {
            element.children.push(child);
        }
        self
    }

    /// Append several children. Has no effect on text or component nodes.
    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        if let VNode::Element(element) = &mut self {
            element.children.extend(children);
        }
        self
    }

    /// Record this node in the owning component's refs table under `name`.
    ///
    /// Applies to element and component nodes; text nodes cannot carry refs.
    pub fn reference(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            VNode::Element(element) => element.ref_name = Some(name.into()),
            VNode::Component(component) => component.ref_name = Some(name.into()),
            VNode::Text(_) => {}
        }
        self
    }

    /// Whether two nodes share kind and tag/type identity, which is the
    /// precondition for patching in place instead of remounting.
    pub(crate) fn same_type(&self, other: &VNode) -> bool {
        match (self, other) {
            (VNode::Text(_), VNode::Text(_)) => true,
            (VNode::Element(a), VNode::Element(b)) => a.tag == b.tag,
            (VNode::Component(a), VNode::Component(b)) => a.type_id == b.type_id,
            _ => false,
        }
    }

    /// Short human-readable type label for error messages.
    pub(crate) fn type_label(&self) -> String {
        match self {
            VNode::Element(element) => element.tag.clone(),
            VNode::Text(_) => "#text".to_owned(),
            VNode::Component(component) => component
                .type_name
                .rsplit("::")
                .next()
                .unwrap_or(component.type_name)
                .to_owned(),
        }
    }
}

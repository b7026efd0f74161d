//! A batching update scheduler and DOM reconciler for component trees.
//!
//! Components implement [`Component`]: `render` describes the current state
//! as a [`VNode`] tree, `update` applies a [`Props`] payload to state. The
//! [`Engine`] mounts components into a host tree behind the [`Dom`] trait,
//! diffs consecutive renders, and applies the minimal host mutations.
//! [`Engine::update`] batches: state changes immediately, rendering waits
//! for the cycle to flush, and every component renders at most once per
//! cycle no matter how many updates it received.
//!
//! ## Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use weft::{Component, Engine, Error, Handle, MemoryDom, Props, VNode};
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! impl Component for Greeter {
//!     fn render(&mut self) -> VNode {
//!         VNode::element("div")
//!             .attribute("class", "greeting")
//!             .child(VNode::text(format!("{} World", self.greeting)))
//!     }
//!
//!     fn update(&mut self, props: Props) -> Result<(), Error> {
//!         if let Some(greeting) = props.get::<String>() {
//!             self.greeting = greeting.clone();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), Error> {
//! let dom = Rc::new(RefCell::new(MemoryDom::new()));
//! let engine = Engine::new(dom.clone());
//!
//! let greeter = Handle::new(Greeter { greeting: "Hello".to_string() });
//! let element = engine.initialize(&greeter)?;
//! assert_eq!(dom.borrow().to_html(element), "<div class=\"greeting\">Hello World</div>");
//!
//! let flush = engine.update(&greeter, Props::new("Goodbye".to_string()))?;
//! assert_eq!(dom.borrow().text_content(element), "Hello World");
//!
//! futures::executor::block_on(flush)?;
//! assert_eq!(dom.borrow().text_content(element), "Goodbye World");
//! # Ok(())
//! # }
//! ```

mod cascade;
mod component;
mod dom;
mod error;
mod patch;
mod refs;
mod scheduler;
mod vnode;

pub use cascade::Cascade;
pub use component::{Component, ComponentId, Handle, Props};
pub use dom::{Dom, MemoryDom, NodeId};
pub use error::Error;
pub use refs::{RefMap, RefTarget};
pub use scheduler::{Engine, Flush, RootTypeChange};
pub use vnode::{ComponentNode, ElementNode, VNode};

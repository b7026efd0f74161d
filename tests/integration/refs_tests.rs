use futures::executor::block_on;
use weft::{Component, Error, Handle, Props, VNode};

use crate::fixtures::new_engine;

struct ConditionalGreeting {
    condition: bool,
}

impl Component for ConditionalGreeting {
    fn render(&mut self) -> VNode {
        if self.condition {
            VNode::element("div").child(
                VNode::element("span")
                    .reference("greeting")
                    .child(VNode::text("Hello")),
            )
        } else {
            VNode::element("div").child(
                VNode::element("span")
                    .reference("greeted")
                    .child(VNode::text("World")),
            )
        }
    }

    fn update(&mut self, props: Props) -> Result<(), Error> {
        if let Some(condition) = props.get::<bool>() {
            self.condition = *condition;
        }
        Ok(())
    }
}

#[test]
fn given_a_rerender_should_rebuild_refs_from_the_latest_tree() {
    let (engine, dom) = new_engine();
    let greeting = Handle::new(ConditionalGreeting { condition: true });
    engine.initialize(&greeting).expect("initialize");

    let refs = engine.refs(&greeting).expect("refs");
    let node = refs
        .get("greeting")
        .and_then(|target| target.node())
        .expect("greeting ref");
    assert_eq!(dom.borrow().text_content(node), "Hello");
    assert!(!refs.contains_key("greeted"));

    block_on(engine.update(&greeting, Props::new(false)).expect("update")).expect("flush");

    let refs = engine.refs(&greeting).expect("refs");
    assert!(!refs.contains_key("greeting"));
    let node = refs
        .get("greeted")
        .and_then(|target| target.node())
        .expect("greeted ref");
    assert_eq!(dom.borrow().text_content(node), "World");
}

struct Inner;

impl Component for Inner {
    fn render(&mut self) -> VNode {
        VNode::element("span").child(VNode::text("nested"))
    }

    fn update(&mut self, _props: Props) -> Result<(), Error> {
        Ok(())
    }
}

struct Outer;

impl Component for Outer {
    fn render(&mut self) -> VNode {
        VNode::element("div").child(
            VNode::component_with(Props::none(), || Inner)
                .reference("inner")
                .child(VNode::text("ignored")),
        )
    }

    fn update(&mut self, _props: Props) -> Result<(), Error> {
        Ok(())
    }
}

#[test]
fn given_a_component_ref_should_resolve_to_the_live_instance() {
    let (engine, dom) = new_engine();
    let outer = Handle::new(Outer);
    engine.initialize(&outer).expect("initialize");

    let inner = engine
        .ref_target(&outer, "inner")
        .expect("ref_target")
        .and_then(|target| target.component().cloned())
        .expect("inner ref");

    assert!(engine.is_mounted(&inner));
    let element = engine.element(&inner).expect("element");
    assert_eq!(dom.borrow().text_content(element), "nested");
    // Refs are per owning component; the nested tree keeps its own table.
    assert!(engine.refs(&inner).expect("refs").is_empty());
}

#[test]
fn given_a_missing_ref_should_resolve_to_none() {
    let (engine, _dom) = new_engine();
    let outer = Handle::new(Outer);
    engine.initialize(&outer).expect("initialize");

    assert!(engine
        .ref_target(&outer, "nonexistent")
        .expect("ref_target")
        .is_none());
}

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::executor::block_on;
use weft::{Component, Error, Handle, Props, RootTypeChange, VNode};

use crate::fixtures::{new_engine, Greeter, RenderCounter};

#[test]
fn given_a_batched_update_should_render_the_new_state_only_after_the_flush() {
    let (engine, dom) = new_engine();
    let greeter = Handle::new(Greeter::new("Hello"));
    let element = engine.initialize(&greeter).expect("initialize");
    assert_eq!(dom.borrow().text_content(element), "Hello World");

    let flush = engine
        .update(&greeter, Props::new("Goodbye".to_string()))
        .expect("update");
    assert_eq!(dom.borrow().text_content(element), "Hello World");

    block_on(flush).expect("flush");
    assert_eq!(dom.borrow().text_content(element), "Goodbye World");
}

#[test]
fn given_interleaved_updates_should_render_each_component_once_per_cycle() {
    let (engine, _dom) = new_engine();
    let first = Rc::new(RefCell::new(RenderCounter::default()));
    let second = Rc::new(RefCell::new(RenderCounter::default()));
    let first_handle = Handle::from_rc(first.clone());
    let second_handle = Handle::from_rc(second.clone());
    engine.initialize(&first_handle).expect("initialize");
    engine.initialize(&second_handle).expect("initialize");

    let _ = engine.update(&first_handle, Props::none()).expect("update");
    let _ = engine.update(&second_handle, Props::none()).expect("update");
    let _ = engine.update(&first_handle, Props::none()).expect("update");
    let flush = engine.update(&second_handle, Props::none()).expect("update");
    block_on(flush).expect("flush");

    // One render to mount, one for the whole coalesced cycle.
    assert_eq!(first.borrow().render_count, 2);
    assert_eq!(second.borrow().render_count, 2);
}

#[test]
fn given_updates_in_separate_cycles_should_render_once_per_cycle() {
    let (engine, _dom) = new_engine();
    let counter = Rc::new(RefCell::new(RenderCounter::default()));
    let handle = Handle::from_rc(counter.clone());
    engine.initialize(&handle).expect("initialize");

    block_on(engine.update(&handle, Props::none()).expect("update")).expect("flush");
    block_on(engine.update(&handle, Props::none()).expect("update")).expect("flush");

    assert_eq!(counter.borrow().render_count, 3);
}

struct CountingChild {
    renders: Rc<Cell<usize>>,
}

impl Component for CountingChild {
    fn render(&mut self) -> VNode {
        self.renders.set(self.renders.get() + 1);
        VNode::element("span")
    }

    fn update(&mut self, _props: Props) -> Result<(), Error> {
        Ok(())
    }
}

struct NestingParent {
    child_renders: Rc<Cell<usize>>,
}

impl Component for NestingParent {
    fn render(&mut self) -> VNode {
        let renders = self.child_renders.clone();
        VNode::element("div").child(
            VNode::component_with(Props::none(), move || CountingChild {
                renders: renders.clone(),
            })
            .reference("child"),
        )
    }

    fn update(&mut self, _props: Props) -> Result<(), Error> {
        Ok(())
    }
}

#[test]
fn given_a_child_reached_through_its_parent_should_render_once_per_cycle() {
    let (engine, _dom) = new_engine();
    let child_renders = Rc::new(Cell::new(0));
    let parent = Handle::new(NestingParent {
        child_renders: child_renders.clone(),
    });
    engine.initialize(&parent).expect("initialize");
    assert_eq!(child_renders.get(), 1);

    let child = engine
        .ref_target(&parent, "child")
        .expect("ref_target")
        .and_then(|target| target.component().cloned())
        .expect("child ref");

    // Both dirty in the same cycle; the parent's patch already refreshes
    // the child, so its own scheduling entry must not render it again.
    let _ = engine.update(&child, Props::none()).expect("update");
    let flush = engine.update(&parent, Props::none()).expect("update");
    block_on(flush).expect("flush");

    assert_eq!(child_renders.get(), 2);
}

struct Fussy;

impl Component for Fussy {
    fn render(&mut self) -> VNode {
        VNode::element("div")
    }

    fn update(&mut self, props: Props) -> Result<(), Error> {
        if props.is_none() {
            Ok(())
        } else {
            Err(Error::component("refused"))
        }
    }
}

#[test]
fn given_a_failing_update_payload_should_report_before_scheduling() {
    let (engine, dom) = new_engine();
    let fussy = Handle::new(Fussy);
    let greeter = Handle::new(Greeter::new("Hello"));
    engine.initialize(&fussy).expect("initialize");
    let element = engine.initialize(&greeter).expect("initialize");

    let error = engine
        .update(&fussy, Props::new(1u32))
        .expect_err("the payload should be refused");
    assert_eq!(error, Error::component("refused"));

    // The failure must not disturb components scheduled around it.
    let flush = engine
        .update(&greeter, Props::new("Goodbye".to_string()))
        .expect("update");
    block_on(flush).expect("flush");
    assert_eq!(dom.borrow().text_content(element), "Goodbye World");
}

#[test]
fn given_an_unmounted_component_should_refuse_updates() {
    let (engine, _dom) = new_engine();
    let greeter = Handle::new(Greeter::new("Hello"));

    assert!(matches!(
        engine.update(&greeter, Props::none()),
        Err(Error::NotMounted)
    ));
}

#[test]
fn given_a_mounted_component_should_refuse_a_second_initialize() {
    let (engine, _dom) = new_engine();
    let greeter = Handle::new(Greeter::new("Hello"));
    engine.initialize(&greeter).expect("initialize");

    assert!(matches!(
        engine.initialize(&greeter),
        Err(Error::AlreadyMounted)
    ));
}

struct Styled {
    emphasized: bool,
}

impl Component for Styled {
    fn render(&mut self) -> VNode {
        if self.emphasized {
            VNode::element("div")
                .attribute("class", "loud")
                .attribute("title", "emphasized")
        } else {
            VNode::element("div").attribute("class", "quiet")
        }
    }

    fn update(&mut self, props: Props) -> Result<(), Error> {
        if let Some(emphasized) = props.get::<bool>() {
            self.emphasized = *emphasized;
        }
        Ok(())
    }
}

#[test]
fn given_changed_attributes_should_set_and_remove_to_match_the_render() {
    let (engine, dom) = new_engine();
    let styled = Handle::new(Styled { emphasized: true });
    let element = engine.initialize(&styled).expect("initialize");
    assert_eq!(dom.borrow().attribute(element, "class"), Some("loud"));
    assert_eq!(dom.borrow().attribute(element, "title"), Some("emphasized"));

    block_on(engine.update(&styled, Props::new(false)).expect("update")).expect("flush");

    assert_eq!(dom.borrow().attribute(element, "class"), Some("quiet"));
    assert_eq!(dom.borrow().attribute(element, "title"), None);
}

struct Listing {
    items: Vec<String>,
}

impl Component for Listing {
    fn render(&mut self) -> VNode {
        VNode::element("ul").children(
            self.items
                .iter()
                .map(|item| VNode::element("li").child(VNode::text(item.clone()))),
        )
    }

    fn update(&mut self, props: Props) -> Result<(), Error> {
        if let Some(items) = props.get::<Vec<String>>() {
            self.items = items.clone();
        }
        Ok(())
    }
}

#[test]
fn given_changed_children_should_append_and_detach_to_match_the_render() {
    let (engine, dom) = new_engine();
    let listing = Handle::new(Listing {
        items: vec!["one".to_string(), "two".to_string()],
    });
    let element = engine.initialize(&listing).expect("initialize");
    assert_eq!(dom.borrow().children(element).len(), 2);
    assert_eq!(dom.borrow().text_content(element), "onetwo");

    let grown = vec!["one".to_string(), "two".to_string(), "three".to_string()];
    block_on(engine.update(&listing, Props::new(grown)).expect("update")).expect("flush");
    assert_eq!(dom.borrow().children(element).len(), 3);
    assert_eq!(dom.borrow().text_content(element), "onetwothree");

    let shrunk = vec!["one".to_string()];
    block_on(engine.update(&listing, Props::new(shrunk)).expect("update")).expect("flush");
    assert_eq!(dom.borrow().children(element).len(), 1);
    assert_eq!(dom.borrow().text_content(element), "one");
}

struct ChildLabel {
    text: String,
}

impl Component for ChildLabel {
    fn render(&mut self) -> VNode {
        VNode::element("span").child(VNode::text(self.text.clone()))
    }

    fn update(&mut self, props: Props) -> Result<(), Error> {
        if let Some(text) = props.get::<String>() {
            self.text = text.clone();
        }
        Ok(())
    }
}

struct LabelParent {
    text: String,
}

impl Component for LabelParent {
    fn render(&mut self) -> VNode {
        VNode::element("div").child(VNode::component_with(
            Props::new(self.text.clone()),
            || ChildLabel {
                text: String::new(),
            },
        ))
    }

    fn update(&mut self, props: Props) -> Result<(), Error> {
        if let Some(text) = props.get::<String>() {
            self.text = text.clone();
        }
        Ok(())
    }
}

#[test]
fn given_new_props_in_a_parent_render_should_patch_the_nested_child() {
    let (engine, dom) = new_engine();
    let parent = Handle::new(LabelParent {
        text: "first".to_string(),
    });
    let element = engine.initialize(&parent).expect("initialize");
    assert_eq!(dom.borrow().text_content(element), "first");

    let flush = engine
        .update(&parent, Props::new("second".to_string()))
        .expect("update");
    block_on(flush).expect("flush");
    assert_eq!(dom.borrow().text_content(element), "second");

    engine
        .update_sync(&parent, Props::new("third".to_string()), RootTypeChange::Allow)
        .expect("update_sync");
    assert_eq!(dom.borrow().text_content(element), "third");
}

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::block_on;
use weft::{Component, Engine, Error, Handle, Props, RootTypeChange, VNode};

use crate::fixtures::{new_engine, new_event_log, EventLog};

struct HookChild {
    log: EventLog,
}

impl Component for HookChild {
    fn render(&mut self) -> VNode {
        VNode::element("span")
    }

    fn update(&mut self, _props: Props) -> Result<(), Error> {
        Ok(())
    }

    fn write_after_update(&mut self) {
        self.log.borrow_mut().push("child-write");
    }

    fn read_after_update(&mut self) {
        self.log.borrow_mut().push("child-read");
    }
}

struct HookParent {
    log: EventLog,
}

impl Component for HookParent {
    fn render(&mut self) -> VNode {
        let log = self.log.clone();
        VNode::element("div").child(VNode::component_with(Props::none(), move || HookChild {
            log: log.clone(),
        }))
    }

    fn update(&mut self, _props: Props) -> Result<(), Error> {
        Ok(())
    }

    fn write_after_update(&mut self) {
        self.log.borrow_mut().push("parent-write");
    }

    fn read_after_update(&mut self) {
        self.log.borrow_mut().push("parent-read");
    }
}

#[test]
fn given_a_mount_render_should_run_no_hooks() {
    let (engine, _dom) = new_engine();
    let log = new_event_log();
    let parent = Handle::new(HookParent { log: log.clone() });
    engine.initialize(&parent).expect("initialize");

    assert!(log.borrow().is_empty());
}

#[test]
fn given_a_parent_update_should_run_writes_before_reads_children_first() {
    let (engine, _dom) = new_engine();
    let log = new_event_log();
    let parent = Handle::new(HookParent { log: log.clone() });
    engine.initialize(&parent).expect("initialize");

    block_on(engine.update(&parent, Props::none()).expect("update")).expect("flush");

    assert_eq!(
        *log.borrow(),
        ["child-write", "parent-write", "child-read", "parent-read"]
    );
}

#[test]
fn given_a_synchronous_update_should_dispatch_the_same_hook_phases() {
    let (engine, _dom) = new_engine();
    let log = new_event_log();
    let parent = Handle::new(HookParent { log: log.clone() });
    engine.initialize(&parent).expect("initialize");

    engine
        .update_sync(&parent, Props::none(), RootTypeChange::Allow)
        .expect("update_sync");

    assert_eq!(
        *log.borrow(),
        ["child-write", "parent-write", "child-read", "parent-read"]
    );
}

struct SelfAdjusting {
    engine: Engine,
    handle: Option<Handle>,
    width: u32,
    adjusted: bool,
}

impl Component for SelfAdjusting {
    fn render(&mut self) -> VNode {
        VNode::element("div").attribute("width", self.width.to_string())
    }

    fn update(&mut self, props: Props) -> Result<(), Error> {
        if let Some(width) = props.get::<u32>() {
            self.width = *width;
        }
        Ok(())
    }

    fn read_after_update(&mut self) {
        // Measure-then-adjust: the first read schedules a follow-up update
        // for this same component.
        if !self.adjusted {
            self.adjusted = true;
            if let Some(handle) = &self.handle {
                let _ = self.engine.update(handle, Props::new(80u32));
            }
        }
    }
}

#[test]
fn given_a_read_hook_scheduling_its_own_update_should_apply_it_next_cycle() {
    let (engine, dom) = new_engine();
    let component = Rc::new(RefCell::new(SelfAdjusting {
        engine: engine.clone(),
        handle: None,
        width: 10,
        adjusted: false,
    }));
    let handle = Handle::from_rc(component.clone());
    component.borrow_mut().handle = Some(handle.clone());
    let element = engine.initialize(&handle).expect("initialize");

    block_on(engine.update(&handle, Props::new(20u32)).expect("update")).expect("flush");
    assert_eq!(dom.borrow().attribute(element, "width"), Some("20"));

    // The payload scheduled from inside the read hook lands in the next
    // cycle, applied at its flush.
    engine.flush().expect("flush");
    assert_eq!(dom.borrow().attribute(element, "width"), Some("80"));
}

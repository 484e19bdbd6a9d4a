use std::cell::RefCell;

use assert_call::{call, CallRecorder};
use tracing_test::traced_test;

use super::*;
use crate::state;

fn registry() -> Rc<ListenerRegistry> {
    Rc::new(ListenerRegistry::new())
}

fn notify(r: &ListenerRegistry) {
    r.notify(&state! {}, &state! {}, &StoreConfig::new());
}

#[test]
fn notify_in_registration_order() {
    let mut cr = CallRecorder::new();
    let r = registry();
    let _s0 = r.subscribe(Box::new(|_, _| {
        call!("0");
        Ok(())
    }));
    let _s1 = r.subscribe(Box::new(|_, _| {
        call!("1");
        Ok(())
    }));
    notify(&r);
    cr.verify(["0", "1"]);
}

#[test]
fn passes_next_and_prev() {
    let mut cr = CallRecorder::new();
    let r = registry();
    let _s = r.subscribe(Box::new(|next, prev| {
        call!("{} {}", prev["n"], next["n"]);
        Ok(())
    }));
    r.notify(&state! { "n" => 2 }, &state! { "n" => 1 }, &StoreConfig::new());
    cr.verify("1 2");
}

#[test]
fn drop_subscription_unsubscribes() {
    let mut cr = CallRecorder::new();
    let r = registry();
    let s = r.subscribe(Box::new(|_, _| {
        call!("x");
        Ok(())
    }));
    assert_eq!(r.len(), 1);
    drop(s);
    assert_eq!(r.len(), 0);
    notify(&r);
    cr.verify(());
}

#[test]
fn detach_keeps_listener() {
    let mut cr = CallRecorder::new();
    let r = registry();
    r.subscribe(Box::new(|_, _| {
        call!("x");
        Ok(())
    }))
    .detach();
    notify(&r);
    cr.verify("x");
}

#[test]
fn same_closure_twice_is_called_twice() {
    let mut cr = CallRecorder::new();
    let r = registry();
    let f = Rc::new(|| call!("x"));
    let f0 = f.clone();
    let _s0 = r.subscribe(Box::new(move |_, _| {
        f0();
        Ok(())
    }));
    let _s1 = r.subscribe(Box::new(move |_, _| {
        f();
        Ok(())
    }));
    notify(&r);
    cr.verify(["x", "x"]);
}

#[test]
fn added_during_pass_waits_for_next_pass() {
    let mut cr = CallRecorder::new();
    let r = registry();
    let added = Rc::new(RefCell::new(Vec::new()));
    let r0 = Rc::downgrade(&r);
    let added0 = added.clone();
    let _s = r.subscribe(Box::new(move |_, _| {
        call!("first");
        if let Some(r) = r0.upgrade() {
            added0.borrow_mut().push(r.subscribe(Box::new(|_, _| {
                call!("added");
                Ok(())
            })));
        }
        Ok(())
    }));
    notify(&r);
    cr.verify("first");
    notify(&r);
    cr.verify(["first", "added"]);
}

#[test]
fn removed_during_pass_is_skipped() {
    let mut cr = CallRecorder::new();
    let r = registry();
    let victim = Rc::new(RefCell::new(None::<Subscription>));
    let victim0 = victim.clone();
    let _s0 = r.subscribe(Box::new(move |_, _| {
        call!("0");
        victim0.borrow_mut().take();
        Ok(())
    }));
    *victim.borrow_mut() = Some(r.subscribe(Box::new(|_, _| {
        call!("1");
        Ok(())
    })));
    notify(&r);
    cr.verify("0");
    assert_eq!(r.len(), 1);
}

#[test]
fn error_does_not_stop_pass() {
    let mut cr = CallRecorder::new();
    let r = registry();
    let _s0 = r.subscribe(Box::new(|_, _| Err("boom".into())));
    let _s1 = r.subscribe(Box::new(|_, _| {
        call!("1");
        Ok(())
    }));
    let config = StoreConfig::new().error_handler(|e, context, info| {
        call!("{context} {} {e}", info.unwrap_or("-"));
    });
    r.notify(&state! {}, &state! {}, &config);
    cr.verify(["listener 0 listener failed: boom", "1"]);
}

#[test]
#[traced_test]
fn error_with_handler_is_not_logged() {
    let r = registry();
    let _s = r.subscribe(Box::new(|_, _| Err("boom".into())));
    r.notify(&state! {}, &state! {}, &StoreConfig::new().error_handler(|_, _, _| {}));
    assert!(!logs_contain("listener failed: boom"));
}

#[test]
#[traced_test]
fn error_without_handler_is_logged() {
    let mut cr = CallRecorder::new();
    let r = registry();
    let _s0 = r.subscribe(Box::new(|_, _| Err("boom".into())));
    let _s1 = r.subscribe(Box::new(|_, _| {
        call!("1");
        Ok(())
    }));
    notify(&r);
    cr.verify("1");
    assert!(logs_contain("listener failed: boom"));
    assert!(logs_contain("ERROR"));
}

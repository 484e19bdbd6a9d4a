use std::{cell::RefCell, rc::Rc};

use assert_call::{call, CallRecorder};
use cellstore::*;
use futures::{executor::LocalPool, task::LocalSpawnExt};

fn counter() -> Store {
    create_store(state! { "count" => 0, "theme" => "light" }, None)
        .try_action("increment", |s, args| {
            let n = args.get::<i64>(0)?.unwrap_or(1);
            Ok(patch! { "count" => s.value::<i64>("count").unwrap_or(0) + n })
        })
        .action("set_theme", |_, args| patch! { "theme" => args.raw(0).cloned() })
        .build()
}

#[test]
fn increment_with_default_and_explicit_argument() {
    let store = counter();
    let increment = store.use_actions(|a| a.action("increment")).unwrap();
    increment.call(()).unwrap();
    increment.call(args![5]).unwrap();
    assert_eq!(store.get_untracked(|s| s.value::<i64>("count")), Some(6));
}

#[test]
fn async_fetch_on_local_pool() {
    let mut cr = CallRecorder::new();
    let store = create_store(state! {}, None)
        .async_action("fetchItems", |_, _| async {
            Ok::<_, ActionError>(vec!["a".to_string(), "b".to_string()])
        })
        .build();
    let _s = store.subscribe(|next, _| call!("{}", next["fetchItems"]));
    let fetch = store.actions().async_action("fetchItems").unwrap();

    let mut pool = LocalPool::new();
    let result = Rc::new(RefCell::new(None));
    let call = fetch.call(());
    cr.verify(r#"{"data":null,"error":null,"loading":true}"#);
    pool.spawner()
        .spawn_local({
            let result = result.clone();
            async move {
                *result.borrow_mut() = Some(call.await);
            }
        })
        .unwrap();
    pool.run();
    cr.verify(r#"{"data":["a","b"],"error":null,"loading":false}"#);
    assert_eq!(*result.borrow(), Some(Ok(json!(["a", "b"]))));
    assert_eq!(
        store.get_async_status("fetchItems").data,
        Some(json!(["a", "b"]))
    );
}

#[test]
fn async_failure_is_recorded_and_returned() {
    let store = create_store(state! {}, None)
        .async_action("failingAction", |_, _| async {
            Err::<(), _>(ActionError::new("boom"))
        })
        .build();
    let failing = store.actions().async_action("failingAction").unwrap();
    let e = futures::executor::block_on(failing.call(())).unwrap_err();
    assert_eq!(e.message(), "boom");
    let status = store.get_async_status("failingAction");
    assert!(!status.loading);
    assert_eq!(status.error.map(|e| e.message().to_string()), Some("boom".into()));
}

#[test]
fn unrelated_change_reaches_listener_not_selection() {
    let mut cr = CallRecorder::new();
    let store = counter();
    let _s = store.subscribe(|next, prev| {
        call!("listener ptr_eq={}", State::ptr_eq(next, prev));
    });
    let sel = Selection::new(
        store.clone(),
        |s: &State| s.value::<i64>("count"),
        equality::eq,
    );
    let _sel = sel.subscribe(|| call!("count changed"));
    let observer = Observer::new(|| call!("render"));
    observer.observe(|| store.get(|s| s.value::<i64>("count")));

    store
        .actions()
        .action("set_theme")
        .unwrap()
        .call(args!["dark"])
        .unwrap();
    cr.verify("listener ptr_eq=false");

    store.actions().action("increment").unwrap().call(()).unwrap();
    cr.verify(["listener ptr_eq=false", "count changed", "render"]);
}

#[test]
fn listener_may_dispatch() {
    let store = counter();
    let increment = store.actions().action("increment").unwrap();
    let set_theme = store.actions().action("set_theme").unwrap();
    let _s = store.subscribe(move |next, prev| {
        if next["count"] != prev["count"] && next["count"] == 3 {
            set_theme.call(args!["dark"]).unwrap();
        }
    });
    for _ in 0..3 {
        increment.call(()).unwrap();
    }
    assert_eq!(store.get_state()["theme"], "dark");
}

#[test]
fn hook_view() {
    let hook = create_store(state! { "count" => 0 }, None)
        .action("reset", |_, _| patch! { "count" => 0 })
        .as_hook();
    assert_eq!(hook.state(), state! { "count" => 0 });
    assert_eq!(hook.actions().names().collect::<Vec<_>>(), ["reset"]);
    assert!(!is_observing());
}

#[test]
fn unknown_action() {
    let store = counter();
    let e = store.use_actions(|a| a.action("decrement")).unwrap_err();
    assert_eq!(e.to_string(), "no action named `decrement`");
}

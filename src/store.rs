use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

use crate::{
    core::StoreCore,
    observer::select_observed,
    selector::{EqualityFn, SelectorFn},
    Actions, AsyncStatus, ErrorContext, ExternalSource, ListenerError, State, StoreConfig,
    StoreError, Subscription,
};


/// A store: one state cell, its listeners and its frozen action map.
///
/// Created by [`create_store`](crate::create_store). Clones share the same store.
#[derive(Clone)]
pub struct Store(Rc<StoreInner>);

struct StoreInner {
    core: Rc<StoreCore>,
    actions: Actions,
    malformed_statuses: RefCell<BTreeMap<String, StoreError>>,
}

impl Store {
    pub(crate) fn new(core: Rc<StoreCore>, actions: Actions) -> Self {
        Self(Rc::new(StoreInner {
            core,
            actions,
            malformed_statuses: RefCell::new(BTreeMap::new()),
        }))
    }

    /// Reads a slice of the state.
    ///
    /// Inside [`Observer::observe`](crate::Observer::observe) the read is memoized and the observer
    /// is notified when the slice changes (compared with `PartialEq`). Elsewhere it is a one-shot read.
    pub fn get<T>(&self, selector: impl Fn(&State) -> T + 'static) -> T
    where
        T: Clone + PartialEq + 'static,
    {
        self.get_with(selector, |a: &T, b: &T| a == b)
    }

    /// Like [`get`](Self::get) with a custom equality function.
    pub fn get_with<T>(
        &self,
        selector: impl Fn(&State) -> T + 'static,
        equality: impl Fn(&T, &T) -> bool + 'static,
    ) -> T
    where
        T: Clone + 'static,
    {
        self.select(Rc::new(selector), Rc::new(equality))
    }

    /// Reads a slice of the current state without observing it.
    pub fn get_untracked<T>(&self, selector: impl FnOnce(&State) -> T) -> T {
        selector(&self.0.core.snapshot())
    }

    fn select<T: Clone + 'static>(
        &self,
        selector: SelectorFn<State, T>,
        equality: EqualityFn<T>,
    ) -> T {
        if let Some(value) = select_observed(self, self.id(), selector.clone(), equality) {
            return value;
        }
        if self.config().dev_mode {
            tracing::warn!("store read outside an observer; returning a non-reactive snapshot");
        }
        selector(&self.0.core.snapshot())
    }

    /// Looks up actions. The action map never changes, so this is not observed.
    pub fn use_actions<T>(&self, selector: impl FnOnce(&Actions) -> T) -> T {
        selector(&self.0.actions)
    }

    pub fn actions(&self) -> &Actions {
        &self.0.actions
    }

    /// Reads the status of the async action `name`.
    ///
    /// An absent field reads as [`AsyncStatus::idle`]. A field that is not a status reads as idle
    /// and is reported to the error handler, once per distinct decode failure.
    pub fn get_async_status(&self, name: &str) -> AsyncStatus {
        let field: Rc<str> = name.into();
        let status = self.get(move |state| match state.get(&field) {
            None => Ok(AsyncStatus::idle()),
            Some(value) => AsyncStatus::decode(&field, value),
        });
        let mut malformed = self.0.malformed_statuses.borrow_mut();
        match status {
            Ok(status) => {
                malformed.remove(name);
                status
            }
            Err(e) => {
                if malformed.get(name) != Some(&e) {
                    malformed.insert(name.into(), e.clone());
                    drop(malformed);
                    self.config()
                        .report(&e, ErrorContext::AsyncStatus, Some(name));
                }
                AsyncStatus::idle()
            }
        }
    }

    /// Registers a listener called with `(next, prev)` after every commit.
    pub fn subscribe(&self, listener: impl Fn(&State, &State) + 'static) -> Subscription {
        self.0.core.subscribe(move |next, prev| {
            listener(next, prev);
            Ok(())
        })
    }

    /// Registers a listener that may fail.
    ///
    /// Failures never interrupt a notification pass; they go to the configured error handler,
    /// or to the log.
    pub fn try_subscribe(
        &self,
        listener: impl Fn(&State, &State) -> Result<(), ListenerError> + 'static,
    ) -> Subscription {
        self.0.core.subscribe(listener)
    }

    pub fn get_state(&self) -> State {
        self.0.core.snapshot()
    }

    /// Runs `f`, delivering its commits in one notification pass when
    /// [`batch_updates`](StoreConfig::batch_updates) is enabled.
    pub fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
        self.0.core.batch(f)
    }

    pub fn config(&self) -> &StoreConfig {
        self.0.core.config()
    }

    pub fn listener_count(&self) -> usize {
        self.0.core.listener_count()
    }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }

    fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl ExternalSource for Store {
    type Snapshot = State;

    fn subscribe(&self, on_change: Rc<dyn Fn()>) -> Subscription {
        self.0.core.subscribe(move |_, _| {
            on_change();
            Ok(())
        })
    }
    fn snapshot(&self) -> State {
        self.get_state()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.get_state())
            .field("actions", &self.0.actions)
            .finish()
    }
}

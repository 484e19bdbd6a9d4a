use std::{
    cell::RefCell,
    rc::Rc,
    time::Instant,
};

use crate::{listeners::ListenerRegistry, ListenerError, Patch, State, StoreConfig, Subscription};


/// The state cell: current snapshot, listeners and the commit primitive.
pub(crate) struct StoreCore {
    state: RefCell<State>,
    listeners: Rc<ListenerRegistry>,
    config: StoreConfig,
    batch: RefCell<BatchFrame>,
}

#[derive(Default)]
struct BatchFrame {
    depth: usize,
    base: Option<State>,
}

impl StoreCore {
    pub fn new(state: State, config: StoreConfig) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(state),
            listeners: Rc::new(ListenerRegistry::new()),
            config,
            batch: RefCell::new(BatchFrame::default()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn snapshot(&self) -> State {
        self.state.borrow().clone()
    }

    pub fn subscribe(
        &self,
        f: impl Fn(&State, &State) -> Result<(), ListenerError> + 'static,
    ) -> Subscription {
        self.listeners.subscribe(Box::new(f))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Merges `patch` into the current state, then notifies listeners with `(next, prev)`.
    ///
    /// No borrow is held while listeners run, so they may commit again.
    pub fn commit(&self, patch: Patch) {
        let (next, prev) = {
            let mut state = self.state.borrow_mut();
            let prev = state.clone();
            let next = prev.merge(patch);
            *state = next.clone();
            (next, prev)
        };
        {
            let mut batch = self.batch.borrow_mut();
            if batch.depth > 0 {
                batch.base.get_or_insert(prev);
                return;
            }
        }
        self.notify(&next, &prev);
    }

    fn notify(&self, next: &State, prev: &State) {
        let start = self.config.enable_performance_tracking.then(Instant::now);
        self.listeners.notify(next, prev, &self.config);
        if let Some(start) = start {
            tracing::debug!(
                elapsed_us = start.elapsed().as_micros() as u64,
                listeners = self.listeners.len(),
                "notification pass"
            );
        }
    }

    /// Runs `f` with notifications deferred until the outermost batch ends.
    pub fn batch<T>(&self, f: impl FnOnce() -> T) -> T {
        if !self.config.batch_updates {
            return f();
        }
        struct BatchGuard<'a>(&'a StoreCore);
        impl Drop for BatchGuard<'_> {
            fn drop(&mut self) {
                self.0.batch.borrow_mut().depth -= 1;
            }
        }
        {
            let mut batch = self.batch.borrow_mut();
            if batch.depth == 0 {
                batch.base = None;
            }
            batch.depth += 1;
        }
        let value = {
            let _guard = BatchGuard(self);
            f()
        };
        let base = {
            let mut batch = self.batch.borrow_mut();
            if batch.depth > 0 {
                return value;
            }
            batch.base.take()
        };
        if let Some(prev) = base {
            let next = self.snapshot();
            self.notify(&next, &prev);
        }
        value
    }
}

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use derive_ex::derive_ex;

use crate::{ErrorContext, ListenerError, State, StoreConfig, StoreError, Subscription};

#[cfg(test)]
mod tests;

pub(crate) type ListenerFn = dyn Fn(&State, &State) -> Result<(), ListenerError>;

struct Registration {
    id: u64,
    is_active: Cell<bool>,
    f: Box<ListenerFn>,
}

/// Change listeners in registration order.
#[derive_ex(Default)]
#[default(Self::new())]
pub(crate) struct ListenerRegistry {
    entries: RefCell<Vec<Rc<Registration>>>,
    next_id: Cell<u64>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Registers `f`. The same closure registered twice is called twice.
    pub fn subscribe(self: &Rc<Self>, f: Box<ListenerFn>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push(Rc::new(Registration {
            id,
            is_active: Cell::new(true),
            f,
        }));
        Subscription::from_weak_fn(Rc::downgrade(self), move |this| this.unsubscribe(id))
    }

    fn unsubscribe(&self, id: u64) {
        let mut entries = self.entries.borrow_mut();
        if let Some(index) = entries.iter().position(|e| e.id == id) {
            entries.remove(index).is_active.set(false);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Runs one notification pass.
    ///
    /// The pass covers the registrations present when it starts. A registration removed during the
    /// pass is skipped if its turn has not come yet. Errors are reported after each call and never
    /// stop the pass.
    pub fn notify(&self, next: &State, prev: &State, config: &StoreConfig) {
        let entries = self.entries.borrow().clone();
        tracing::trace!(listeners = entries.len(), "notify");
        for (index, entry) in entries.iter().enumerate() {
            if !entry.is_active.get() {
                continue;
            }
            if let Err(e) = (entry.f)(next, prev) {
                let index = index.to_string();
                config.report(
                    &StoreError::Listener(e),
                    ErrorContext::Listener,
                    Some(index.as_str()),
                );
            }
        }
    }
}

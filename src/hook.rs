use crate::{equality, Actions, State, Store};


/// A store viewed the way a rendering component uses it.
///
/// Reads go through [`Store::get`], so inside an [`Observer`](crate::Observer) they are reactive.
#[derive(Clone, Debug)]
pub struct StoreHook {
    store: Store,
}

impl StoreHook {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The whole state. Changes whenever any field is committed.
    pub fn state(&self) -> State {
        self.store.get_with(State::clone, State::ptr_eq)
    }

    pub fn select<T>(&self, selector: impl Fn(&State) -> T + 'static) -> T
    where
        T: Clone + PartialEq + 'static,
    {
        self.store.get_with(selector, equality::eq)
    }

    pub fn actions(&self) -> &Actions {
        self.store.actions()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

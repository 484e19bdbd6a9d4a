use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use derive_ex::derive_ex;

use crate::Subscription;


pub type SelectorFn<S, T> = Rc<dyn Fn(&S) -> T>;
pub type EqualityFn<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// A mutable source that can be observed from outside: the shape a rendering framework needs to
/// read a store.
pub trait ExternalSource: Clone + 'static {
    type Snapshot;

    /// Calls `on_change` after every change until the subscription is dropped.
    fn subscribe(&self, on_change: Rc<dyn Fn()>) -> Subscription;

    /// The current snapshot.
    fn snapshot(&self) -> Self::Snapshot;

    /// Snapshot to use while rendering on a server, if it differs from [`snapshot`](Self::snapshot).
    fn server_snapshot(&self) -> Option<Self::Snapshot> {
        None
    }
}

/// A memoized slice of an [`ExternalSource`].
///
/// The selected value is replaced only when the equality function reports a difference, and only
/// then are subscribers of the selection notified. The selector and equality function in effect are
/// always the ones most recently supplied.
#[derive_ex(Clone, bound())]
pub struct Selection<S: ExternalSource, T: 'static>(Rc<SelectionNode<S, T>>);

struct SelectionNode<S: ExternalSource, T> {
    source: S,
    selector: RefCell<SelectorFn<S::Snapshot, T>>,
    equality: RefCell<EqualityFn<T>>,
    selected: RefCell<T>,
}

impl<S: ExternalSource, T: Clone + 'static> Selection<S, T> {
    pub fn new(
        source: S,
        selector: impl Fn(&S::Snapshot) -> T + 'static,
        equality: impl Fn(&T, &T) -> bool + 'static,
    ) -> Self {
        Self::from_rc(source, Rc::new(selector), Rc::new(equality))
    }

    pub(crate) fn from_rc(
        source: S,
        selector: SelectorFn<S::Snapshot, T>,
        equality: EqualityFn<T>,
    ) -> Self {
        let selected = selector(&source.snapshot());
        Self(Rc::new(SelectionNode {
            source,
            selector: RefCell::new(selector),
            equality: RefCell::new(equality),
            selected: RefCell::new(selected),
        }))
    }

    pub fn set_selector(&self, selector: impl Fn(&S::Snapshot) -> T + 'static) {
        self.set_selector_rc(Rc::new(selector));
    }
    pub(crate) fn set_selector_rc(&self, selector: SelectorFn<S::Snapshot, T>) {
        *self.0.selector.borrow_mut() = selector;
    }

    pub fn set_equality(&self, equality: impl Fn(&T, &T) -> bool + 'static) {
        self.set_equality_rc(Rc::new(equality));
    }
    pub(crate) fn set_equality_rc(&self, equality: EqualityFn<T>) {
        *self.0.equality.borrow_mut() = equality;
    }

    /// Reselects from the current snapshot and returns the memoized value.
    pub fn get(&self) -> T {
        let next = self.0.select();
        self.0.update(next);
        self.0.selected.borrow().clone()
    }

    /// Like [`get`](Self::get), but reads the server snapshot when the source has one.
    pub fn get_server(&self) -> T {
        match self.0.source.server_snapshot() {
            Some(snapshot) => {
                let selector = self.0.selector.borrow().clone();
                selector(&snapshot)
            }
            None => self.get(),
        }
    }

    /// Calls `notify` each time the selected value changes.
    ///
    /// Each subscription compares against the value it last saw, so a change already picked up by
    /// [`get`](Self::get) or by another subscriber still reaches this one.
    pub fn subscribe(&self, notify: impl Fn() + 'static) -> Subscription {
        self.subscribe_from(Rc::new(RefCell::new(self.get())), notify)
    }

    /// Like [`subscribe`](Self::subscribe), comparing against a value the caller keeps current.
    pub(crate) fn subscribe_from(
        &self,
        last: Rc<RefCell<T>>,
        notify: impl Fn() + 'static,
    ) -> Subscription {
        let node: Weak<SelectionNode<S, T>> = Rc::downgrade(&self.0);
        self.0.source.subscribe(Rc::new(move || {
            let Some(node) = node.upgrade() else {
                return;
            };
            let next = node.select();
            let equality = node.equality.borrow().clone();
            let is_same = equality(&*last.borrow(), &next);
            if is_same {
                node.update(next);
                return;
            }
            node.update(next.clone());
            *last.borrow_mut() = next;
            notify();
        }))
    }
}

impl<S: ExternalSource, T: 'static> SelectionNode<S, T> {
    fn select(&self) -> T {
        let selector = self.selector.borrow().clone();
        selector(&self.source.snapshot())
    }
    fn update(&self, next: T) {
        let equality = self.equality.borrow().clone();
        if !equality(&*self.selected.borrow(), &next) {
            *self.selected.borrow_mut() = next;
        }
    }
}

/// Equality functions for selections.
pub mod equality {
    use std::rc::Rc;

    /// `PartialEq`, the default.
    pub fn eq<T: PartialEq>(a: &T, b: &T) -> bool {
        a == b
    }

    /// Identity of shared handles, such as the ones returned by [`State::field`](crate::State::field).
    pub fn ptr_eq<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
        Rc::ptr_eq(a, b)
    }

    /// Compares the keys extracted by `key`.
    pub fn by_key<T, K: PartialEq>(key: impl Fn(&T) -> K) -> impl Fn(&T, &T) -> bool {
        move |a, b| key(a) == key(b)
    }

    /// Identity for optional shared handles.
    pub fn opt_ptr_eq<T: ?Sized>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

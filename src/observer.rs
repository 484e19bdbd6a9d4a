use std::{
    any::{Any, TypeId},
    cell::{Cell, RefCell},
    mem::take,
    rc::Rc,
};

use crate::{
    selector::{EqualityFn, SelectorFn},
    ExternalSource, Selection, Subscription,
};


thread_local! {
    static SCOPES: RefCell<Vec<Rc<ObserverNode>>> = const { RefCell::new(Vec::new()) };
}

/// An observation point, such as a component being rendered.
///
/// Reads made through [`Store::get`](crate::Store::get) inside [`observe`](Self::observe) become
/// memoized selections owned by the observer. `on_change` is called when any of them changes.
/// Reads are matched to selections by call order, so a pass should make the same reads in the same
/// order as the previous one; a read whose source or value type differs from the previous pass
/// replaces that selection.
pub struct Observer(Rc<ObserverNode>);

struct ObserverNode {
    on_change: Box<dyn Fn()>,
    slots: RefCell<Vec<ObservedSlot>>,
    cursor: Cell<usize>,
    is_observing: Cell<bool>,
    is_changed_during_pass: Cell<bool>,
}

struct ObservedSlot {
    key: SlotKey,
    selection: Rc<dyn Any>,
    _subscription: Subscription,
}

/// A selection together with the value the observer last read from it.
struct ObservedSelection<S: ExternalSource, T: 'static> {
    selection: Selection<S, T>,
    last: Rc<RefCell<T>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct SlotKey {
    source: usize,
    ty: TypeId,
}

impl Observer {
    /// Creates an observer that calls `on_change` when a selection read in its last pass changes.
    ///
    /// A change that happens while a pass is running is reported once, after the pass ends, so
    /// `on_change` may start the next pass synchronously. Calling [`observe`](Self::observe) from
    /// inside a pass of the same observer panics.
    pub fn new(on_change: impl Fn() + 'static) -> Self {
        Self(Rc::new(ObserverNode {
            on_change: Box::new(on_change),
            slots: RefCell::new(Vec::new()),
            cursor: Cell::new(0),
            is_observing: Cell::new(false),
            is_changed_during_pass: Cell::new(false),
        }))
    }

    /// Runs `f` as one observation pass.
    ///
    /// Selections not read during the pass are disposed when it ends.
    pub fn observe<T>(&self, f: impl FnOnce() -> T) -> T {
        assert!(
            !self.0.is_observing.replace(true),
            "`Observer::observe` called recursively."
        );
        struct ScopeGuard<'a>(&'a ObserverNode);
        impl Drop for ScopeGuard<'_> {
            fn drop(&mut self) {
                SCOPES.with(|s| s.borrow_mut().pop());
                self.0.is_observing.set(false);
                let unused = {
                    let mut slots = self.0.slots.borrow_mut();
                    let cursor = self.0.cursor.get().min(slots.len());
                    slots.split_off(cursor)
                };
                drop(unused);
                if self.0.is_changed_during_pass.replace(false) && !std::thread::panicking() {
                    (self.0.on_change)();
                }
            }
        }
        self.0.cursor.set(0);
        self.0.is_changed_during_pass.set(false);
        SCOPES.with(|s| s.borrow_mut().push(self.0.clone()));
        let _guard = ScopeGuard(&self.0);
        f()
    }

    /// Number of selections held from the last pass.
    pub fn len(&self) -> usize {
        self.0.slots.borrow().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObserverNode {
    fn changed(&self) {
        if self.is_observing.get() {
            self.is_changed_during_pass.set(true);
        } else {
            (self.on_change)();
        }
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        let slots = take(&mut *self.0.slots.borrow_mut());
        drop(slots);
    }
}

/// Returns `true` inside [`Observer::observe`].
pub fn is_observing() -> bool {
    SCOPES.with(|s| !s.borrow().is_empty())
}

/// Reads through the innermost active observer, or returns `None` when there is none.
pub(crate) fn select_observed<S, T>(
    source: &S,
    source_id: usize,
    selector: SelectorFn<S::Snapshot, T>,
    equality: EqualityFn<T>,
) -> Option<T>
where
    S: ExternalSource,
    T: Clone + 'static,
{
    let node = SCOPES.with(|s| s.borrow().last().cloned())?;
    let index = node.cursor.get();
    node.cursor.set(index + 1);
    let key = SlotKey {
        source: source_id,
        ty: TypeId::of::<ObservedSelection<S, T>>(),
    };

    let existing = node
        .slots
        .borrow()
        .get(index)
        .filter(|slot| slot.key == key)
        .map(|slot| slot.selection.clone());
    if let Some(observed) = existing.and_then(|s| s.downcast::<ObservedSelection<S, T>>().ok()) {
        observed.selection.set_selector_rc(selector);
        observed.selection.set_equality_rc(equality);
        let value = observed.selection.get();
        *observed.last.borrow_mut() = value.clone();
        return Some(value);
    }

    let selection = Selection::from_rc(source.clone(), selector, equality);
    let value = selection.get();
    let last = Rc::new(RefCell::new(value.clone()));
    let weak = Rc::downgrade(&node);
    let subscription = selection.subscribe_from(last.clone(), move || {
        if let Some(node) = weak.upgrade() {
            node.changed();
        }
    });
    let slot = ObservedSlot {
        key,
        selection: Rc::new(ObservedSelection { selection, last }),
        _subscription: subscription,
    };
    let replaced = {
        let mut slots = node.slots.borrow_mut();
        if index < slots.len() {
            Some(std::mem::replace(&mut slots[index], slot))
        } else {
            slots.push(slot);
            None
        }
    };
    drop(replaced);
    Some(value)
}

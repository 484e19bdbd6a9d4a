use std::{collections::BTreeMap, fmt, rc::Rc, time::Instant};

use parse_display::Display;

use crate::{core::StoreCore, ActionError, Args, AsyncAction, Patch, State, StoreError};


pub(crate) type TransitionFn = dyn Fn(&State, &Args) -> Result<Patch, ActionError>;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display(style = "snake_case")]
pub enum ActionKind {
    Sync,
    Async,
}

/// A named synchronous state transition bound to its store.
#[derive(Clone)]
pub struct Action(Rc<ActionNode>);

struct ActionNode {
    name: String,
    transition: Box<TransitionFn>,
    core: Rc<StoreCore>,
}

impl Action {
    pub(crate) fn new(name: String, transition: Box<TransitionFn>, core: Rc<StoreCore>) -> Self {
        Self(Rc::new(ActionNode {
            name,
            transition,
            core,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Reads the current state, runs the transition and commits its patch.
    ///
    /// If the transition fails nothing is committed and the error is returned.
    pub fn call(&self, args: impl Into<Args>) -> Result<(), StoreError> {
        let args = args.into();
        let node = &*self.0;
        let start = node
            .core
            .config()
            .enable_performance_tracking
            .then(Instant::now);
        tracing::trace!(action = %node.name, "dispatch");
        let state = node.core.snapshot();
        let patch = (node.transition)(&state, &args).map_err(|source| StoreError::Action {
            name: node.name.clone(),
            source,
        })?;
        node.core.commit(patch);
        if let Some(start) = start {
            tracing::debug!(
                action = %node.name,
                elapsed_us = start.elapsed().as_micros() as u64,
                "action"
            );
        }
        Ok(())
    }
}
impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Action").field(&self.0.name).finish()
    }
}

/// An entry of the action map.
#[derive(Clone, Debug)]
pub enum ActionHandle {
    Sync(Action),
    Async(AsyncAction),
}

impl ActionHandle {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionHandle::Sync(_) => ActionKind::Sync,
            ActionHandle::Async(_) => ActionKind::Async,
        }
    }
    pub fn name(&self) -> &str {
        match self {
            ActionHandle::Sync(a) => a.name(),
            ActionHandle::Async(a) => a.name(),
        }
    }
}

/// The frozen action map of a store.
#[derive(Clone, Default)]
pub struct Actions(Rc<BTreeMap<String, ActionHandle>>);

impl Actions {
    pub(crate) fn new(actions: BTreeMap<String, ActionHandle>) -> Self {
        Self(Rc::new(actions))
    }

    pub fn get(&self, name: &str) -> Option<&ActionHandle> {
        self.0.get(name)
    }

    /// Looks up a synchronous action.
    pub fn action(&self, name: &str) -> Result<Action, StoreError> {
        match self.find(name)? {
            ActionHandle::Sync(a) => Ok(a.clone()),
            handle => Err(kind_mismatch(name, ActionKind::Sync, handle)),
        }
    }

    /// Looks up an async action.
    pub fn async_action(&self, name: &str) -> Result<AsyncAction, StoreError> {
        match self.find(name)? {
            ActionHandle::Async(a) => Ok(a.clone()),
            handle => Err(kind_mismatch(name, ActionKind::Async, handle)),
        }
    }

    fn find(&self, name: &str) -> Result<&ActionHandle, StoreError> {
        self.get(name)
            .ok_or_else(|| StoreError::UnknownAction(name.into()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter().map(|(k, v)| (k, v.kind()))).finish()
    }
}

fn kind_mismatch(name: &str, expected: ActionKind, handle: &ActionHandle) -> StoreError {
    StoreError::ActionKind {
        name: name.into(),
        expected,
        actual: handle.kind(),
    }
}

use std::{collections::BTreeMap, future::Future};

use serde::Serialize;

use crate::{
    action::TransitionFn,
    async_action::{into_async_fn, AsyncFn},
    core::StoreCore,
    Action, ActionError, ActionHandle, Actions, Args, AsyncAction, AsyncStatus, Patch, State,
    Store, StoreConfig, StoreHook,
};


/// Starts building a store with `initial` as its state.
///
/// ```
/// use cellstore::{create_store, patch, state};
///
/// let store = create_store(state! { "count" => 0 }, None)
///     .action("increment", |s, args| {
///         let n = args.get::<i64>(0).ok().flatten().unwrap_or(1);
///         patch! { "count" => s.value::<i64>("count").unwrap_or(0) + n }
///     })
///     .build();
///
/// let increment = store.use_actions(|a| a.action("increment")).unwrap();
/// increment.call(()).unwrap();
/// assert_eq!(store.get_untracked(|s| s["count"].clone()), 1);
/// ```
pub fn create_store(initial: impl Into<State>, config: Option<StoreConfig>) -> StoreBuilder {
    StoreBuilder::new(initial.into(), config.unwrap_or_default())
}

enum Declaration {
    Sync(Box<TransitionFn>),
    Async(Box<AsyncFn>),
}

/// Accumulates action declarations until [`build`](Self::build).
///
/// Declaring a name twice keeps the last declaration, whatever its kind.
pub struct StoreBuilder {
    initial: State,
    config: StoreConfig,
    declarations: Vec<(String, Declaration)>,
}

impl StoreBuilder {
    pub fn new(initial: State, config: StoreConfig) -> Self {
        Self {
            initial,
            config,
            declarations: Vec::new(),
        }
    }

    /// Declares an action whose transition cannot fail.
    pub fn action(
        self,
        name: impl Into<String>,
        f: impl Fn(&State, &Args) -> Patch + 'static,
    ) -> Self {
        self.try_action(name, move |state, args| Ok(f(state, args)))
    }

    /// Declares an action whose transition may fail; a failure commits nothing.
    pub fn try_action(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&State, &Args) -> Result<Patch, ActionError> + 'static,
    ) -> Self {
        self.declare(name.into(), Declaration::Sync(Box::new(f)));
        self
    }

    /// Declares an async action. Its status is kept in the state field named `name`.
    pub fn async_action<F, Fut, T>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(State, Args) -> Fut + 'static,
        Fut: Future<Output = Result<T, ActionError>> + 'static,
        T: Serialize,
    {
        self.declare(name.into(), Declaration::Async(into_async_fn(f)));
        self
    }

    fn declare(&mut self, name: String, declaration: Declaration) {
        if let Some(index) = self.declarations.iter().position(|(n, _)| *n == name) {
            tracing::debug!(action = %name, "action redeclared; the last declaration wins");
            self.declarations.remove(index);
        }
        self.declarations.push((name, declaration));
    }

    /// Freezes the declarations into a store.
    ///
    /// Async actions whose field is absent from the initial state get an idle status field.
    pub fn build(self) -> Store {
        let mut seed = Patch::new();
        for (name, declaration) in &self.declarations {
            if matches!(declaration, Declaration::Async(_)) && !self.initial.contains(name) {
                seed.set(name.as_str(), AsyncStatus::idle().to_value());
            }
        }
        let initial = if seed.is_empty() {
            self.initial
        } else {
            self.initial.merge(seed)
        };
        let core = StoreCore::new(initial, self.config);
        let actions = self
            .declarations
            .into_iter()
            .map(|(name, declaration)| {
                let handle = match declaration {
                    Declaration::Sync(f) => {
                        ActionHandle::Sync(Action::new(name.clone(), f, core.clone()))
                    }
                    Declaration::Async(f) => {
                        ActionHandle::Async(AsyncAction::new(name.clone(), f, core.clone()))
                    }
                };
                (name, handle)
            })
            .collect::<BTreeMap<_, _>>();
        Store::new(core, Actions::new(actions))
    }

    /// Builds the store and wraps it in a [`StoreHook`].
    pub fn as_hook(self) -> StoreHook {
        StoreHook::new(self.build())
    }
}

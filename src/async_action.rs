use std::{
    cell::Cell,
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::{future::LocalBoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{core::StoreCore, ActionError, Args, Patch, State, StoreError};


pub(crate) type AsyncFn = dyn Fn(State, Args) -> LocalBoxFuture<'static, Result<Value, ActionError>>;

/// Lifecycle record of an async action, stored in the state under the action's name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AsyncStatus {
    pub loading: bool,
    pub error: Option<ActionError>,
    pub data: Option<Value>,
}

impl AsyncStatus {
    pub fn idle() -> Self {
        Self::default()
    }
    pub fn pending() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }
    /// `Value::Null` data is recorded as no data, matching how the status field reads back.
    pub fn fulfilled(data: Value) -> Self {
        Self {
            data: (!data.is_null()).then_some(data),
            ..Self::default()
        }
    }
    pub fn rejected(error: ActionError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::idle()
    }

    pub(crate) fn decode(name: &str, value: &Value) -> Result<Self, StoreError> {
        Self::deserialize(value).map_err(|e| StoreError::AsyncStatus {
            name: name.into(),
            message: e.to_string(),
        })
    }

    pub(crate) fn to_patch(&self, name: &str) -> Patch {
        Patch::new().with(name, self.to_value())
    }

    pub(crate) fn to_value(&self) -> Value {
        let error = match &self.error {
            Some(e) => serde_json::json!({ "message": e.message() }),
            None => Value::Null,
        };
        serde_json::json!({
            "loading": self.loading,
            "error": error,
            "data": self.data.clone().unwrap_or(Value::Null),
        })
    }
}

/// A named async operation whose progress is tracked as an [`AsyncStatus`] field.
#[derive(Clone)]
pub struct AsyncAction(Rc<AsyncActionNode>);

struct AsyncActionNode {
    name: String,
    f: Box<AsyncFn>,
    core: Rc<StoreCore>,
    generation: Cell<u64>,
}

impl AsyncAction {
    pub(crate) fn new(name: String, f: Box<AsyncFn>, core: Rc<StoreCore>) -> Self {
        Self(Rc::new(AsyncActionNode {
            name,
            f,
            core,
            generation: Cell::new(0),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Commits the pending status and starts the operation.
    ///
    /// The pending commit has been observed by listeners when this returns. The returned future
    /// commits the final status and yields the operation's result; the same [`ActionError`] is
    /// recorded in the status on failure. Dropping the future before it completes leaves the
    /// status pending.
    pub fn call(&self, args: impl Into<Args>) -> AsyncCall {
        let node = self.0.clone();
        let generation = node.generation.get() + 1;
        node.generation.set(generation);

        tracing::trace!(action = %node.name, generation, "dispatch async");
        node.core.commit(AsyncStatus::pending().to_patch(&node.name));
        let fut = (node.f)(node.core.snapshot(), args.into());

        let settle = async move {
            let result = fut.await;
            if node.core.config().supersede_stale_async && node.generation.get() != generation {
                tracing::debug!(action = %node.name, generation, "superseded; not committed");
                return result;
            }
            let status = match &result {
                Ok(data) => {
                    tracing::debug!(action = %node.name, "fulfilled");
                    AsyncStatus::fulfilled(data.clone())
                }
                Err(e) => {
                    tracing::debug!(action = %node.name, error = %e, "rejected");
                    AsyncStatus::rejected(e.clone())
                }
            };
            node.core.commit(status.to_patch(&node.name));
            result
        };
        AsyncCall(settle.boxed_local())
    }
}
impl fmt::Debug for AsyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AsyncAction").field(&self.0.name).finish()
    }
}

/// The settlement of one async action invocation.
#[must_use = "the final status is committed only when the call is driven to completion"]
pub struct AsyncCall(LocalBoxFuture<'static, Result<Value, ActionError>>);

impl Future for AsyncCall {
    type Output = Result<Value, ActionError>;
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.0.as_mut().poll(cx)
    }
}

pub(crate) fn into_async_fn<F, Fut, T>(f: F) -> Box<AsyncFn>
where
    F: Fn(State, Args) -> Fut + 'static,
    Fut: Future<Output = Result<T, ActionError>> + 'static,
    T: Serialize,
{
    Box::new(
        move |state: State, args: Args| -> LocalBoxFuture<'static, Result<Value, ActionError>> {
            let fut = f(state, args);
            async move { Ok(serde_json::to_value(fut.await?)?) }.boxed_local()
        },
    )
}

use std::{fmt, rc::Rc};

use parse_display::Display;

use crate::StoreError;

/// Receives faults that are not attributable to a direct caller.
///
/// Arguments are the error, where it happened, and an optional detail such as a field name.
pub type ErrorHandler = Rc<dyn Fn(&StoreError, ErrorContext, Option<&str>)>;

/// Where a fault routed to an [`ErrorHandler`] came from.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display(style = "snake_case")]
pub enum ErrorContext {
    /// A listener returned an error during a notification pass.
    Listener,
    /// A state field read as an async status could not be decoded.
    AsyncStatus,
}

/// Options for a store.
#[derive(Clone, Default)]
pub struct StoreConfig {
    pub(crate) error_handler: Option<ErrorHandler>,
    pub(crate) dev_mode: bool,
    pub(crate) batch_updates: bool,
    pub(crate) enable_performance_tracking: bool,
    pub(crate) supersede_stale_async: bool,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes listener failures and other background faults to `f` instead of the log.
    pub fn error_handler(
        mut self,
        f: impl Fn(&StoreError, ErrorContext, Option<&str>) + 'static,
    ) -> Self {
        self.error_handler = Some(Rc::new(f));
        self
    }

    /// Enables diagnostics such as the warning for reads outside an [`Observer`](crate::Observer).
    pub fn dev_mode(mut self, value: bool) -> Self {
        self.dev_mode = value;
        self
    }

    /// Lets [`Store::batch`](crate::Store::batch) coalesce its commits into one notification pass.
    pub fn batch_updates(mut self, value: bool) -> Self {
        self.batch_updates = value;
        self
    }

    /// Emits timing events for action invocations and notification passes.
    pub fn enable_performance_tracking(mut self, value: bool) -> Self {
        self.enable_performance_tracking = value;
        self
    }

    /// Drops settlement commits of async invocations that were superseded by a later
    /// invocation of the same action.
    ///
    /// By default overlapping invocations all commit and the last one to settle wins.
    pub fn supersede_stale_async(mut self, value: bool) -> Self {
        self.supersede_stale_async = value;
        self
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub(crate) fn report(&self, e: &StoreError, context: ErrorContext, info: Option<&str>) {
        if let Some(handler) = &self.error_handler {
            handler(e, context, info);
        } else {
            tracing::error!(%context, info, "{e}");
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("error_handler", &self.error_handler.is_some())
            .field("dev_mode", &self.dev_mode)
            .field("batch_updates", &self.batch_updates)
            .field(
                "enable_performance_tracking",
                &self.enable_performance_tracking,
            )
            .field("supersede_stale_async", &self.supersede_stale_async)
            .finish()
    }
}

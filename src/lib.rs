//! A single-cell reactive store.
//!
//! A store holds one [`State`], a map of named fields. [`Action`]s and [`AsyncAction`]s are the only
//! way to change it; every change is a shallow merge followed by one notification pass over the
//! listeners. Readers select slices of the state inside an [`Observer`] and are told only when their
//! slice changes.

mod action;
mod async_action;
mod builder;
mod config;
mod core;
mod error;
mod hook;
mod listeners;
mod observer;
mod selector;
mod state;
mod store;
mod subscription;

#[cfg(test)]
mod test_helpers;

pub use action::*;
pub use async_action::{AsyncAction, AsyncCall, AsyncStatus};
pub use builder::*;
pub use config::*;
pub use error::*;
pub use hook::*;
pub use observer::{is_observing, Observer};
pub use selector::{equality, ExternalSource, Selection};
pub use serde_json::{json, Value};
pub use state::*;
pub use store::*;
pub use subscription::*;

//! Event model for orbit.
//!
//! This crate holds the data the dispatcher works on, independent of how
//! the dispatcher is scheduled:
//!
//! - [`EventHooks`]: identity plus optional pre/post dispatch hooks
//! - [`SimpleEvent`], [`TransformEvent`]: host-side event variants
//! - [`Subscription`]: default arguments plus a script and/or host callback
//! - [`DispatchError`]: the error taxonomy reported across the bridge
//!
//! # Argument Flow
//!
//! ```text
//! emit("E", a, b) ──► for each subscriber:
//!                       args = [a, b]  (or the subscriber's defaults if none)
//!                       args = pre(args)          -- if the event has one
//!                       script_callback(args)     -- if set
//!                       host_callback(args)       -- if set
//!                       remove = post(args)       -- if the event has one
//! ```

mod error;
mod hooks;
mod subscription;

pub use error::DispatchError;
pub use hooks::{EventHooks, PostHook, PreHook, SimpleEvent, TransformEvent};
pub use subscription::{Args, HostCallback, ScriptCallback, Subscription, Value};

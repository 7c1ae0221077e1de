//! Orbit Runtime - the event loop.
//!
//! Owns the registry and the dispatcher thread that serializes every
//! registry change and every callback invocation.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  orbit-types : ErrorCode, TimerId, LoopId                   │
//! │  orbit-event : EventHooks, Subscription, DispatchError      │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Runtime Layer (THIS CRATE)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EventLoop   : public handle (register/subscribe/emit/...)  │
//! │  Dispatcher  : queue consumer on a dedicated thread         │
//! │  timer       : setTimeout / setInterval on top of events    │
//! │  config      : layered OrbitConfig                          │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  orbit-lua : script bridge     orbit-cli : `orbit` binary   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use orbit_runtime::{config::OrbitConfig, EventLoop};
//! use serde_json::json;
//! use std::sync::{Arc, Mutex};
//!
//! let el = EventLoop::start(&OrbitConfig::default(), None)?;
//! el.register_event("PING", true)?;
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! el.subscribe_host("PING", move |args| sink.lock().unwrap().push(args.to_vec()), vec![])?;
//!
//! el.emit("PING", vec![json!("PONG")]);
//! el.flush()?;
//! assert_eq!(*seen.lock().unwrap(), vec![vec![json!("PONG")]]);
//!
//! el.shutdown();
//! # Ok::<(), orbit_event::DispatchError>(())
//! ```

pub mod config;
mod context;
mod dispatcher;
mod event;
mod event_loop;
mod registry;
mod script;
mod stats;
mod timer;

pub use event::Event;
pub use event_loop::{Emitter, EventLoop};
pub use registry::RegistryView;
pub use script::ScriptRuntime;
pub use stats::{DispatchStats, StatsSnapshot};
pub use timer::{TimerEvent, TimerHandle};

pub use orbit_event::{
    Args, DispatchError, EventHooks, HostCallback, ScriptCallback, SimpleEvent, Subscription,
    TransformEvent, Value,
};

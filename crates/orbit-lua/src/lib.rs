//! Lua scripting bridge for the orbit event loop.
//!
//! Exposes the loop's pub/sub and timer operations to Lua as plain
//! globals, and runs Lua callbacks on the dispatcher thread.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              LuaEventLoop (Rust)                    │
//! │  ┌───────────────────────────────────────────────┐  │
//! │  │  lua: Lua (mlua)                              │  │
//! │  │  event_loop: EventLoop ──► dispatcher thread  │  │
//! │  └───────────────────────────────────────────────┘  │
//! │         │ bridge globals          ▲ LuaRuntime      │
//! │         ▼                         │ (callbacks)     │
//! │  ┌───────────────────────────────────────────────┐  │
//! │  │  subscribe / unsubscribe / emit               │  │
//! │  │  setTimeout / setInterval / clear*            │  │
//! │  │  orbit.log                                    │  │
//! │  └───────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Lua Script
//!
//! ```lua
//! local count = 0
//! local h
//! h = setInterval(function()
//!     count = count + 1
//!     if count == 5 then clearInterval(h) end
//! end, 100)
//! ```
//!
//! # Host Example
//!
//! ```no_run
//! use orbit_lua::LuaEventLoop;
//! use orbit_runtime::config::OrbitConfig;
//!
//! let host = LuaEventLoop::new(&OrbitConfig::default())?;
//! host.event_loop().register_event("PING", true)?;
//! host.exec(r#"subscribe("PING", function(msg) orbit.log("info", msg) end)"#)?;
//! host.event_loop().emit("PING", vec![serde_json::json!("PONG")]);
//! host.event_loop().flush()?;
//! # Ok::<(), orbit_lua::LuaError>(())
//! ```

mod bridge;
mod error;
mod host;
mod runtime;
pub mod sandbox;

pub use error::LuaError;
pub use host::LuaEventLoop;
pub use runtime::LuaRuntime;

use mlua::Lua;
use orbit_runtime::config::OrbitConfig;

/// Starts an event loop around `lua` and installs the bridge globals.
///
/// Shorthand for [`LuaEventLoop::with_lua`].
///
/// # Errors
///
/// Returns error if the loop cannot start or bridge installation fails.
pub fn init(lua: Lua, config: &OrbitConfig) -> Result<LuaEventLoop, LuaError> {
    LuaEventLoop::with_lua(lua, config)
}

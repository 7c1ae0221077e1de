//! [`LuaEventLoop`]: a Lua VM wired to its own event loop.

use crate::bridge;
use crate::error::LuaError;
use crate::runtime::LuaRuntime;
use crate::sandbox;
use mlua::{Lua, LuaSerdeExt, Value as LuaValue};
use orbit_runtime::config::OrbitConfig;
use orbit_runtime::EventLoop;
use std::path::Path;
use tracing::{debug, info};

/// A Lua VM whose bridge globals drive a dedicated [`EventLoop`].
///
/// Script code always runs on the dispatcher thread. `exec` and friends
/// block the caller until the chunk has finished; callbacks the chunk
/// schedules run later, in emission order.
///
/// Dropping the value shuts the loop down.
pub struct LuaEventLoop {
    lua: Lua,
    event_loop: EventLoop,
}

impl LuaEventLoop {
    /// Creates a fresh VM and starts its loop.
    ///
    /// # Errors
    ///
    /// Returns error if the loop cannot start or bridge installation fails.
    pub fn new(config: &OrbitConfig) -> Result<Self, LuaError> {
        Self::with_lua(Lua::new(), config)
    }

    /// Starts a loop around an existing VM.
    ///
    /// Globals the caller defined beforehand stay visible to scripts,
    /// except those removed by the sandbox when `lua.sandbox` is enabled.
    ///
    /// # Errors
    ///
    /// Returns error if the loop cannot start or bridge installation fails.
    pub fn with_lua(lua: Lua, config: &OrbitConfig) -> Result<Self, LuaError> {
        if config.lua.sandbox {
            sandbox::apply(&lua)?;
        }

        let runtime = LuaRuntime::new(lua.clone());
        let event_loop = EventLoop::start(config, Some(Box::new(runtime)))?;

        let (vm, handle) = (lua.clone(), event_loop.clone());
        let installed = event_loop.invoke(move || bridge::register(&vm, &handle));
        if let Err(e) = installed.map_err(LuaError::from).and_then(|r| r.map_err(LuaError::from)) {
            event_loop.shutdown();
            return Err(e);
        }

        info!(
            "LuaEventLoop {} ready (sandbox: {})",
            event_loop.id(),
            config.lua.sandbox
        );
        Ok(Self { lua, event_loop })
    }

    /// Runs a chunk of Lua source.
    ///
    /// # Errors
    ///
    /// Returns [`LuaError::Runtime`] if the chunk fails to compile or raises.
    pub fn exec(&self, source: &str) -> Result<(), LuaError> {
        self.exec_named(source, "=chunk")
    }

    /// Runs a chunk under `name`, which appears in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`LuaError::Runtime`] if the chunk fails to compile or raises.
    pub fn exec_named(&self, source: &str, name: &str) -> Result<(), LuaError> {
        let lua = self.lua.clone();
        let source = source.to_string();
        let name = name.to_string();
        debug!(chunk = %name, "exec");
        self.event_loop
            .invoke(move || lua.load(source).set_name(name).exec())??;
        Ok(())
    }

    /// Reads and runs a script file.
    ///
    /// # Errors
    ///
    /// Returns [`LuaError::ScriptNotFound`] if the file cannot be read, or
    /// [`LuaError::Runtime`] if it fails.
    pub fn exec_file(&self, path: impl AsRef<Path>) -> Result<(), LuaError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| LuaError::ScriptNotFound(format!("{}: {e}", path.display())))?;
        self.exec_named(&source, &format!("@{}", path.display()))
    }

    /// Evaluates an expression and converts its value to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LuaError::Runtime`] if evaluation fails or the value has
    /// no JSON form.
    pub fn eval(&self, expr: &str) -> Result<serde_json::Value, LuaError> {
        let lua = self.lua.clone();
        let expr = expr.to_string();
        let value = self.event_loop.invoke(move || {
            let value: LuaValue = lua.load(expr).set_name("=eval").eval()?;
            lua.from_value::<serde_json::Value>(value)
        })??;
        Ok(value)
    }

    /// The underlying loop, for host-side registration and emission.
    #[must_use]
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Stops the loop. Idempotent.
    pub fn shutdown(&self) {
        self.event_loop.shutdown();
    }
}

impl Drop for LuaEventLoop {
    fn drop(&mut self) {
        self.event_loop.shutdown();
    }
}

impl std::fmt::Debug for LuaEventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaEventLoop")
            .field("event_loop", &self.event_loop.id())
            .finish_non_exhaustive()
    }
}

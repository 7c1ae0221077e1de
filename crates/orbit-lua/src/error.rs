//! Error types for the Lua bridge.

use orbit_event::DispatchError;
use orbit_types::ErrorCode;
use thiserror::Error;

/// Errors raised while driving scripts through the event loop.
#[derive(Debug, Error)]
pub enum LuaError {
    /// Lua runtime error.
    #[error("lua error: {0}")]
    Runtime(#[from] mlua::Error),

    /// The event loop rejected the request.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Script file could not be read.
    #[error("script not found: {0}")]
    ScriptNotFound(String),
}

impl ErrorCode for LuaError {
    fn code(&self) -> &'static str {
        match self {
            Self::Runtime(_) => "LUA_RUNTIME",
            Self::Dispatch(_) => "LUA_DISPATCH",
            Self::ScriptNotFound(_) => "LUA_SCRIPT_NOT_FOUND",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Dispatch(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

impl From<LuaError> for DispatchError {
    fn from(err: LuaError) -> Self {
        match err {
            LuaError::Dispatch(e) => e,
            LuaError::Runtime(e) => Self::Invocation(e.to_string()),
            LuaError::ScriptNotFound(path) => Self::Invocation(format!("script not found: {path}")),
        }
    }
}

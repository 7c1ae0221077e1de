//! [`ScriptRuntime`] implementation backed by an mlua VM.

use mlua::{Function, Lua, LuaSerdeExt, MultiValue, SerializeOptions, Value as LuaValue};
use orbit_event::{DispatchError, ScriptCallback, Value};
use orbit_runtime::ScriptRuntime;

/// Serialization options used for every host → Lua conversion.
///
/// JSON `null` becomes `nil` rather than mlua's light-userdata sentinel.
pub(crate) fn to_lua_options() -> SerializeOptions {
    SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false)
}

/// Converts a host value into a Lua value.
pub(crate) fn to_lua(lua: &Lua, value: &Value) -> Result<LuaValue, DispatchError> {
    lua.to_value_with(value, to_lua_options())
        .map_err(|e| DispatchError::Marshal(e.to_string()))
}

/// Converts a Lua value into a host value.
///
/// Functions, userdata and threads have no data representation and fail.
pub(crate) fn from_lua(lua: &Lua, value: LuaValue) -> Result<Value, DispatchError> {
    lua.from_value(value)
        .map_err(|e| DispatchError::Marshal(e.to_string()))
}

/// Calls Lua callbacks on behalf of the dispatcher.
///
/// Holds a handle to the same VM the bridge functions live in.
pub struct LuaRuntime {
    lua: Lua,
}

impl LuaRuntime {
    /// Wraps a VM.
    #[must_use]
    pub fn new(lua: Lua) -> Self {
        Self { lua }
    }

    /// Wraps a Lua function as an opaque callback.
    #[must_use]
    pub fn callback(function: Function) -> ScriptCallback {
        ScriptCallback::new(function)
    }

    /// Wraps a Lua function with a receiver passed as its first argument.
    #[must_use]
    pub fn bound_callback(receiver: LuaValue, function: Function) -> ScriptCallback {
        ScriptCallback::new(function).with_receiver(receiver)
    }
}

impl ScriptRuntime for LuaRuntime {
    fn call(&self, callback: &ScriptCallback, args: &[Value]) -> Result<(), DispatchError> {
        let function = callback.function::<Function>().ok_or_else(|| {
            DispatchError::Invocation("callback does not belong to the Lua runtime".to_string())
        })?;

        let mut values = Vec::with_capacity(args.len() + 1);
        if let Some(receiver) = callback.receiver::<LuaValue>() {
            values.push(receiver.clone());
        }
        for arg in args {
            values.push(to_lua(&self.lua, arg)?);
        }

        function
            .call::<()>(MultiValue::from_vec(values))
            .map_err(|e| DispatchError::Invocation(e.to_string()))
    }
}

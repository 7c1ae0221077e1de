//! Bridge globals installed into the Lua VM.
//!
//! # Available Functions
//!
//! | Function | Result |
//! |----------|--------|
//! | `subscribe(name, callback, ...defaults)` | `{err, result = index}` |
//! | `unsubscribe(name, index)` | `{err, result = "unsubscribed"}` |
//! | `emit(name, ...args)` | `{err}` |
//! | `setTimeout(callback, delay_ms, ...args)` | `{err, event_id, result = index}` |
//! | `setInterval(callback, delay_ms, ...args)` | `{err, event_id, result = index}` |
//! | `clearTimeout(handle)` / `clearInterval(handle)` | same as `unsubscribe` |
//! | `orbit.log(level, msg)` | nothing |
//!
//! Failures never raise: `err` carries the message and `code` the error
//! code, `result` is absent.
//!
//! A callback is either a function or a `{receiver, fn}` pair; in the
//! latter case `fn` is called with `receiver` as its first argument.
//!
//! ```lua
//! local sub = subscribe("PING", function(msg) print(msg) end, "default")
//! emit("PING", "PONG")
//!
//! local h = setInterval(function() end, 100)
//! clearInterval(h)
//! ```

use crate::runtime::{from_lua, LuaRuntime};
use mlua::{IntoLua, Lua, Table, Value as LuaValue, Variadic};
use orbit_event::{Args, DispatchError, ScriptCallback, Subscription};
use orbit_runtime::{EventLoop, TimerHandle};
use orbit_types::ErrorCode;
use std::time::Duration;

/// Global table name for orbit helpers in Lua.
const ORBIT_TABLE_NAME: &str = "orbit";

/// Installs every bridge global into `lua`, bound to `event_loop`.
///
/// # Errors
///
/// Returns error if function registration fails.
pub fn register(lua: &Lua, event_loop: &EventLoop) -> mlua::Result<()> {
    let globals = lua.globals();

    // subscribe(name, callback, ...defaults)
    let el = event_loop.clone();
    let subscribe = lua.create_function(
        move |lua, (name, callback, defaults): (LuaValue, LuaValue, Variadic<LuaValue>)| {
            let outcome = (|| {
                let name = event_name(&name)?;
                let subscription = Subscription::script(parse_callback(callback)?)
                    .with_default_args(marshal_args(lua, defaults)?);
                el.subscribe(&name, subscription)
            })();
            reply(lua, outcome)
        },
    )?;
    globals.set("subscribe", subscribe)?;

    // unsubscribe(name, index)
    let el = event_loop.clone();
    let unsubscribe = lua.create_function(move |lua, (name, index): (LuaValue, LuaValue)| {
        let outcome = (|| {
            let name = event_name(&name)?;
            el.unsubscribe(&name, integer(&index, "subscription index")?)
                .map(|()| "unsubscribed")
        })();
        reply(lua, outcome)
    })?;
    globals.set("unsubscribe", unsubscribe)?;

    // emit(name, ...args)
    let el = event_loop.clone();
    let emit = lua.create_function(move |lua, (name, args): (LuaValue, Variadic<LuaValue>)| {
        let outcome = (|| {
            let name = event_name(&name)?;
            el.emit_checked(&name, marshal_args(lua, args)?)
                .map(|()| LuaValue::Nil)
        })();
        reply(lua, outcome)
    })?;
    globals.set("emit", emit)?;

    for (global, repeat) in [("setTimeout", false), ("setInterval", true)] {
        let el = event_loop.clone();
        let set_timer = lua.create_function(
            move |lua, (callback, delay, args): (LuaValue, LuaValue, Variadic<LuaValue>)| {
                let outcome = (|| {
                    let subscription = Subscription::script(parse_callback(callback)?)
                        .with_default_args(marshal_args(lua, args)?);
                    let delay = delay_ms(&delay)?;
                    if repeat {
                        el.set_interval(subscription, delay)
                    } else {
                        el.set_timeout(subscription, delay)
                    }
                })();
                timer_reply(lua, outcome)
            },
        )?;
        globals.set(global, set_timer)?;
    }

    for global in ["clearTimeout", "clearInterval"] {
        let el = event_loop.clone();
        let clear_timer = lua.create_function(move |lua, handle: LuaValue| {
            let outcome = timer_handle(&handle)
                .and_then(|h| el.clear_timeout(&h))
                .map(|()| "unsubscribed");
            reply(lua, outcome)
        })?;
        globals.set(global, clear_timer)?;
    }

    register_log(lua)
}

/// Adds `orbit.log(level, msg)`, creating the `orbit` table if needed.
fn register_log(lua: &Lua) -> mlua::Result<()> {
    let orbit_table = match lua.globals().get::<Option<Table>>(ORBIT_TABLE_NAME)? {
        Some(table) => table,
        None => {
            let table = lua.create_table()?;
            lua.globals().set(ORBIT_TABLE_NAME, table.clone())?;
            table
        }
    };

    let log_fn = lua.create_function(|_, (level, msg): (String, String)| {
        match level.to_lowercase().as_str() {
            "trace" => tracing::trace!("[lua] {}", msg),
            "debug" => tracing::debug!("[lua] {}", msg),
            "warn" => tracing::warn!("[lua] {}", msg),
            "error" => tracing::error!("[lua] {}", msg),
            _ => tracing::info!("[lua] {}", msg),
        }
        Ok(())
    })?;
    orbit_table.set("log", log_fn)
}

/// Builds the `{err, code, result}` table returned by every bridge call.
fn reply<T: IntoLua>(lua: &Lua, outcome: Result<T, DispatchError>) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    match outcome {
        Ok(result) => table.set("result", result)?,
        Err(e) => {
            table.set("err", e.to_string())?;
            table.set("code", e.code())?;
        }
    }
    Ok(table)
}

fn timer_reply(lua: &Lua, outcome: Result<TimerHandle, DispatchError>) -> mlua::Result<Table> {
    match outcome {
        Ok(TimerHandle { event_id, index }) => {
            let table = reply(lua, Ok(index))?;
            table.set("event_id", event_id)?;
            Ok(table)
        }
        Err(e) => reply::<LuaValue>(lua, Err(e)),
    }
}

fn event_name(value: &LuaValue) -> Result<String, DispatchError> {
    match value {
        LuaValue::String(s) => Ok(str::to_owned(&s.to_str().map_err(marshal)?)),
        LuaValue::Integer(i) => Ok(i.to_string()),
        LuaValue::Number(n) => Ok(n.to_string()),
        other => Err(DispatchError::Marshal(format!(
            "event name must be a string, got {}",
            other.type_name()
        ))),
    }
}

fn parse_callback(value: LuaValue) -> Result<ScriptCallback, DispatchError> {
    match value {
        LuaValue::Function(f) => Ok(LuaRuntime::callback(f)),
        LuaValue::Table(pair) => {
            let receiver: LuaValue = pair.get(1).map_err(marshal)?;
            match pair.get::<LuaValue>(2).map_err(marshal)? {
                LuaValue::Function(f) => Ok(LuaRuntime::bound_callback(receiver, f)),
                _ => Err(DispatchError::Marshal(
                    "callback pair must be {receiver, function}".to_string(),
                )),
            }
        }
        other => Err(DispatchError::Marshal(format!(
            "callback must be a function or {{receiver, function}} pair, got {}",
            other.type_name()
        ))),
    }
}

fn marshal_args(lua: &Lua, values: Variadic<LuaValue>) -> Result<Args, DispatchError> {
    values.into_iter().map(|v| from_lua(lua, v)).collect()
}

fn integer(value: &LuaValue, what: &str) -> Result<i64, DispatchError> {
    match value {
        LuaValue::Integer(i) => Ok(*i),
        LuaValue::Number(n) if n.fract() == 0.0 => Ok(*n as i64),
        other => Err(DispatchError::Marshal(format!(
            "{what} must be an integer, got {}",
            other.type_name()
        ))),
    }
}

/// Reads a delay in milliseconds; negative values clamp to zero.
fn delay_ms(value: &LuaValue) -> Result<Duration, DispatchError> {
    let millis = match value {
        LuaValue::Integer(i) => *i as f64,
        LuaValue::Number(n) if n.is_finite() => *n,
        LuaValue::Nil => 0.0,
        other => {
            return Err(DispatchError::Marshal(format!(
                "delay must be a number, got {}",
                other.type_name()
            )))
        }
    };
    Ok(Duration::from_millis(millis.max(0.0) as u64))
}

fn timer_handle(value: &LuaValue) -> Result<TimerHandle, DispatchError> {
    let LuaValue::Table(handle) = value else {
        return Err(DispatchError::Marshal(format!(
            "timer handle must be a table, got {}",
            value.type_name()
        )));
    };
    let event_id = event_name(&handle.get::<LuaValue>("event_id").map_err(marshal)?)?;
    let index = integer(&handle.get::<LuaValue>("result").map_err(marshal)?, "timer index")?;
    let index = usize::try_from(index)
        .map_err(|_| DispatchError::out_of_range(event_id.clone(), index, 0))?;
    Ok(TimerHandle { event_id, index })
}

fn marshal(err: mlua::Error) -> DispatchError {
    DispatchError::Marshal(err.to_string())
}

//! Script global sandboxing.

use mlua::{Lua, Value};

/// Globals removed from sandboxed VMs.
pub const REMOVED_GLOBALS: &[&str] = &[
    "io", "os", "dofile", "loadfile", "load", "require", "package", "debug",
];

/// Strips filesystem, process and loader access from `lua`'s globals.
///
/// # Errors
///
/// Returns error if the globals table cannot be written.
pub fn apply(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    for name in REMOVED_GLOBALS {
        globals.set(*name, Value::Nil)?;
    }
    Ok(())
}

//! Script runtime seam.

use orbit_event::{DispatchError, ScriptCallback, Value};

/// A single-threaded scripting runtime the dispatcher calls into.
///
/// The runtime is moved onto the dispatcher thread when the loop starts
/// and is only ever used from there, so implementations need `Send` but
/// not `Sync`.
pub trait ScriptRuntime: Send {
    /// Calls `callback` with `args`.
    ///
    /// If the callback has a bound receiver, it is passed as the first
    /// argument. Marshalling problems surface as
    /// [`DispatchError::Marshal`], script-raised errors as
    /// [`DispatchError::Invocation`].
    fn call(&self, callback: &ScriptCallback, args: &[Value]) -> Result<(), DispatchError>;
}

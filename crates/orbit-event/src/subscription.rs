//! Subscriptions and callback targets.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A single argument crossing the host/script boundary.
pub type Value = serde_json::Value;

/// Ordered argument list passed to a callback.
pub type Args = Vec<Value>;

/// Host-side callback.
pub type HostCallback = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Opaque reference to a script-side function plus an optional bound receiver.
///
/// The dispatcher never looks inside; it hands the callback back to the
/// script runtime that created it. Runtimes recover their own function
/// type with [`ScriptCallback::function`].
#[derive(Clone)]
pub struct ScriptCallback {
    function: Arc<dyn Any + Send + Sync>,
    receiver: Option<Arc<dyn Any + Send + Sync>>,
}

impl ScriptCallback {
    /// Wraps a runtime-specific function handle.
    pub fn new<F: Any + Send + Sync>(function: F) -> Self {
        Self {
            function: Arc::new(function),
            receiver: None,
        }
    }

    /// Binds a receiver passed as the callback's first argument.
    #[must_use]
    pub fn with_receiver<R: Any + Send + Sync>(mut self, receiver: R) -> Self {
        self.receiver = Some(Arc::new(receiver));
        self
    }

    /// Returns the function handle if it is of type `F`.
    #[must_use]
    pub fn function<F: Any>(&self) -> Option<&F> {
        self.function.downcast_ref::<F>()
    }

    /// Returns the bound receiver if present and of type `R`.
    #[must_use]
    pub fn receiver<R: Any>(&self) -> Option<&R> {
        self.receiver.as_ref().and_then(|r| r.downcast_ref::<R>())
    }

    /// Returns `true` if a receiver is bound.
    #[must_use]
    pub fn has_receiver(&self) -> bool {
        self.receiver.is_some()
    }
}

impl fmt::Debug for ScriptCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptCallback")
            .field("bound", &self.has_receiver())
            .finish_non_exhaustive()
    }
}

/// One subscriber attached to an event.
///
/// Carries default arguments (used when an emission has none) and up to
/// two callback targets. When both are set the script callback runs first.
#[derive(Clone, Default)]
pub struct Subscription {
    default_args: Args,
    script: Option<ScriptCallback>,
    host: Option<HostCallback>,
}

impl Subscription {
    /// Subscription backed by a script function.
    #[must_use]
    pub fn script(callback: ScriptCallback) -> Self {
        Self {
            script: Some(callback),
            ..Self::default()
        }
    }

    /// Subscription backed by a host closure.
    pub fn host<F>(callback: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        Self {
            host: Some(Arc::new(callback)),
            ..Self::default()
        }
    }

    /// Adds (or replaces) the host callback.
    #[must_use]
    pub fn with_host<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.host = Some(Arc::new(callback));
        self
    }

    /// Adds (or replaces) the script callback.
    #[must_use]
    pub fn with_script(mut self, callback: ScriptCallback) -> Self {
        self.script = Some(callback);
        self
    }

    /// Sets the default arguments.
    #[must_use]
    pub fn with_default_args(mut self, args: Args) -> Self {
        self.default_args = args;
        self
    }

    /// Default arguments used when an emission carries none.
    #[must_use]
    pub fn default_args(&self) -> &[Value] {
        &self.default_args
    }

    /// Script callback, if any.
    #[must_use]
    pub fn script_callback(&self) -> Option<&ScriptCallback> {
        self.script.as_ref()
    }

    /// Host callback, if any.
    #[must_use]
    pub fn host_callback(&self) -> Option<&HostCallback> {
        self.host.as_ref()
    }

    /// Picks the arguments this subscriber receives for one emission.
    ///
    /// Explicit emission arguments win; an empty list means "none given"
    /// and falls back to this subscriber's own defaults.
    #[must_use]
    pub fn resolve_args(&self, explicit: &[Value]) -> Args {
        if explicit.is_empty() {
            self.default_args.clone()
        } else {
            explicit.to_vec()
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("default_args", &self.default_args)
            .field("script", &self.script)
            .field("host", &self.host.is_some())
            .finish()
    }
}

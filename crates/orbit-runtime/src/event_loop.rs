//! EventLoop - the public handle to a running dispatcher.
//!
//! Cheap to clone; every clone talks to the same dispatcher thread.
//!
//! # Calling Convention
//!
//! | Caller | `register_event` / `subscribe` / `unsubscribe` | `invoke` | `emit` |
//! |--------|------------------------------------------------|----------|--------|
//! | dispatcher thread (inside a callback) | applied immediately | runs inline | enqueued |
//! | any other thread | sent to the loop, blocks for the reply | runs on the loop, blocks | enqueued |
//!
//! Emissions are always enqueued, even from inside a callback, so an
//! emission never interrupts the one being dispatched.
//!
//! Blocking calls must not be made from inside an async task; use
//! `tokio::task::spawn_blocking` there.

use crate::config::OrbitConfig;
use crate::context;
use crate::dispatcher::{Command, Dispatcher, Emission, Registration};
use crate::event::Event;
use crate::registry::{Registry, RegistryView};
use crate::script::ScriptRuntime;
use crate::stats::{DispatchStats, StatsSnapshot};
use orbit_event::{Args, DispatchError, Subscription, Value};
use orbit_types::LoopId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Fire-and-forget emission sender.
///
/// Holds only the emission queue, so it can be stored inside events
/// (timers) without keeping the rest of the loop alive.
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::UnboundedSender<Emission>,
}

impl Emitter {
    /// Enqueues an emission. Dropped silently once the loop is shut down.
    pub fn emit(&self, name: impl Into<String>, args: Args) {
        let name = name.into();
        if self.tx.send(Emission::Fire { name, args }).is_err() {
            debug!("Emitter: loop closed, emission dropped");
        }
    }

    /// Returns `true` once the loop no longer accepts emissions.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct Inner {
    id: LoopId,
    registration_tx: mpsc::UnboundedSender<Registration>,
    command_tx: mpsc::UnboundedSender<Command>,
    emitter: Emitter,
    shutdown_tx: watch::Sender<bool>,
    view: RegistryView,
    stats: Arc<DispatchStats>,
    runtime: Handle,
    min_timer_delay: Duration,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running event loop.
#[derive(Clone)]
pub struct EventLoop {
    inner: Arc<Inner>,
}

impl EventLoop {
    /// Spawns the dispatcher thread and waits until it is ready.
    ///
    /// `script` is moved onto the dispatcher thread and used for every
    /// script callback. Without one, script subscriptions fail at
    /// dispatch time.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Startup`] if the thread or its runtime
    /// cannot be created, or the loop does not report ready within
    /// `dispatcher.ready_timeout_ms`.
    pub fn start(
        config: &OrbitConfig,
        script: Option<Box<dyn ScriptRuntime>>,
    ) -> Result<Self, DispatchError> {
        let id = LoopId::new();
        let (registration_tx, registration_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (emission_tx, emission_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let view = RegistryView::default();
        let stats = Arc::new(DispatchStats::default());

        let dispatcher = Dispatcher::new(
            id,
            registration_rx,
            command_rx,
            emission_rx,
            shutdown_rx,
            script,
            Arc::clone(&stats),
        );
        let registry = Registry::new(view.clone());
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<Handle, String>>();

        let thread = std::thread::Builder::new()
            .name(config.dispatcher.thread_name.clone())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _context = context::enter(id, registry);
                let _ = ready_tx.send(Ok(runtime.handle().clone()));
                runtime.block_on(dispatcher.run());
            })
            .map_err(|e| DispatchError::Startup(e.to_string()))?;

        let runtime = match ready_rx.recv_timeout(config.dispatcher.ready_timeout()) {
            Ok(Ok(handle)) => handle,
            Ok(Err(reason)) => return Err(DispatchError::Startup(reason)),
            Err(_) => {
                return Err(DispatchError::Startup(format!(
                    "dispatcher not ready within {}ms",
                    config.dispatcher.ready_timeout_ms
                )))
            }
        };

        info!(
            "EventLoop {} started on thread '{}'",
            id, config.dispatcher.thread_name
        );

        Ok(Self {
            inner: Arc::new(Inner {
                id,
                registration_tx,
                command_tx,
                emitter: Emitter { tx: emission_tx },
                shutdown_tx,
                view,
                stats,
                runtime,
                min_timer_delay: config.timers.min_delay(),
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Loop identifier.
    #[must_use]
    pub fn id(&self) -> LoopId {
        self.inner.id
    }

    /// Returns `true` if the calling thread is this loop's dispatcher.
    #[must_use]
    pub fn in_dispatcher(&self) -> bool {
        context::is_active(self.inner.id)
    }

    fn local<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        context::with_registry(self.inner.id, f)
            .unwrap_or_else(|| panic!("{} registry accessed outside its dispatcher", self.inner.id))
    }

    fn ensure_open(&self) -> Result<(), DispatchError> {
        if *self.inner.shutdown_tx.borrow() {
            Err(DispatchError::Closed)
        } else {
            Ok(())
        }
    }

    fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DispatchError> {
        self.ensure_open()?;
        let (reply, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(command(reply))
            .map_err(|_| DispatchError::Closed)?;
        rx.blocking_recv().map_err(|_| DispatchError::Closed)
    }

    /// Adds `event` to the registry. A name that is already registered is
    /// left untouched.
    ///
    /// With `wait_for_ack`, blocks until the dispatcher has applied the
    /// registration. Without it, an emission enqueued afterwards still
    /// sees the event: registrations are processed ahead of emissions.
    pub fn register_event(
        &self,
        event: impl Into<Event>,
        wait_for_ack: bool,
    ) -> Result<(), DispatchError> {
        let event = event.into();
        if self.in_dispatcher() {
            self.local(|r| r.register(event));
            return Ok(());
        }
        self.ensure_open()?;

        let (ack, ack_rx) = if wait_for_ack {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        self.inner
            .registration_tx
            .send(Registration { event, ack })
            .map_err(|_| DispatchError::Closed)?;

        match ack_rx {
            Some(rx) => rx.blocking_recv().map_err(|_| DispatchError::Closed),
            None => Ok(()),
        }
    }

    /// Appends a subscriber to `name` and returns its position.
    ///
    /// Positions shift down when an earlier subscriber is removed.
    pub fn subscribe(&self, name: &str, subscription: Subscription) -> Result<usize, DispatchError> {
        if self.in_dispatcher() {
            return self.local(|r| r.subscribe(name, subscription));
        }
        self.request(|reply| Command::Subscribe {
            name: name.to_owned(),
            subscription,
            reply,
        })?
    }

    /// Subscribes a host closure with optional default arguments.
    pub fn subscribe_host<F>(
        &self,
        name: &str,
        callback: F,
        default_args: Args,
    ) -> Result<usize, DispatchError>
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.subscribe(
            name,
            Subscription::host(callback).with_default_args(default_args),
        )
    }

    /// Removes the subscriber at `index`. The event stays registered.
    pub fn unsubscribe(&self, name: &str, index: i64) -> Result<(), DispatchError> {
        if self.in_dispatcher() {
            return self.local(|r| r.unsubscribe(name, index));
        }
        self.request(|reply| Command::Unsubscribe {
            name: name.to_owned(),
            index,
            reply,
        })?
    }

    /// Enqueues an emission without checking that `name` exists.
    ///
    /// Unknown names are dropped by the dispatcher. Never blocks.
    pub fn emit(&self, name: impl Into<String>, args: Args) {
        self.inner.emitter.emit(name, args);
    }

    /// Enqueues an emission after checking that `name` is registered.
    ///
    /// The check reads the registry view, which is current on the
    /// dispatcher thread and may lag behind queued registrations elsewhere.
    pub fn emit_checked(&self, name: &str, args: Args) -> Result<(), DispatchError> {
        if !self.inner.view.is_registered(name) {
            return Err(DispatchError::NotFound(name.to_owned()));
        }
        self.ensure_open()?;
        self.inner
            .emitter
            .tx
            .send(Emission::Fire {
                name: name.to_owned(),
                args,
            })
            .map_err(|_| DispatchError::Closed)
    }

    /// Returns a detached emission sender.
    #[must_use]
    pub fn emitter(&self) -> Emitter {
        self.inner.emitter.clone()
    }

    /// Runs `f` inside the dispatcher context and returns its result.
    ///
    /// Called from the dispatcher thread, `f` runs inline.
    pub fn invoke<F, R>(&self, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.in_dispatcher() {
            return Ok(f());
        }
        self.request(|reply| {
            Command::Invoke(Box::new(move || {
                let _ = reply.send(f());
            }))
        })
    }

    /// Blocks until every emission enqueued before this call is handled.
    ///
    /// Emissions produced while handling them are not waited for. Returns
    /// immediately on the dispatcher thread.
    pub fn flush(&self) -> Result<(), DispatchError> {
        if self.in_dispatcher() {
            return Ok(());
        }
        self.ensure_open()?;
        let (tx, rx) = oneshot::channel();
        self.inner
            .emitter
            .tx
            .send(Emission::Fence(tx))
            .map_err(|_| DispatchError::Closed)?;
        rx.blocking_recv().map_err(|_| DispatchError::Closed)
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.view.is_registered(name)
    }

    /// Number of subscribers of `name`, or `None` if not registered.
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> Option<usize> {
        self.inner.view.subscriber_count(name)
    }

    /// Registered event names, sorted.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        self.inner.view.event_names()
    }

    /// Current dispatch counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Runtime driving the dispatcher; used to schedule timers.
    #[must_use]
    pub fn runtime_handle(&self) -> &Handle {
        &self.inner.runtime
    }

    /// Lower bound applied to timer delays.
    #[must_use]
    pub fn min_timer_delay(&self) -> Duration {
        self.inner.min_timer_delay
    }

    /// Returns `true` until shutdown has been requested or the loop exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !*self.inner.shutdown_tx.borrow() && !self.inner.emitter.is_closed()
    }

    /// Stops the loop.
    ///
    /// The message being handled finishes; queued messages are discarded
    /// and their waiters get [`DispatchError::Closed`]. Joins the
    /// dispatcher thread unless called from it. Idempotent.
    pub fn shutdown(&self) {
        let already = self.inner.shutdown_tx.send_replace(true);
        if !already {
            info!("EventLoop {}: shutdown requested", self.inner.id);
        }
        if self.in_dispatcher() {
            return;
        }
        let thread = self.inner.thread.lock().take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                warn!("EventLoop {}: dispatcher thread panicked", self.inner.id);
            }
        }
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("id", &self.inner.id)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn start() -> EventLoop {
        EventLoop::start(&OrbitConfig::default(), None).expect("start loop")
    }

    #[test]
    fn start_and_shutdown() {
        let el = start();
        assert!(el.is_running());
        el.shutdown();
        assert!(!el.is_running());
        el.shutdown();
    }

    #[test]
    fn calls_after_shutdown_are_closed() {
        let el = start();
        el.shutdown();

        assert_eq!(el.register_event("E", true), Err(DispatchError::Closed));
        assert_eq!(
            el.subscribe("E", Subscription::default()),
            Err(DispatchError::Closed)
        );
        assert_eq!(el.unsubscribe("E", 0), Err(DispatchError::Closed));
        assert_eq!(el.flush(), Err(DispatchError::Closed));
        assert_eq!(el.invoke(|| 1), Err(DispatchError::Closed));
        el.emit("E", vec![json!(1)]);
    }

    #[test]
    fn thread_is_named_from_config() {
        let mut config = OrbitConfig::default();
        config.dispatcher.thread_name = "orbit-test-dispatch".into();
        let el = EventLoop::start(&config, None).unwrap();

        let name = el
            .invoke(|| std::thread::current().name().map(str::to_owned))
            .unwrap();
        assert_eq!(name.as_deref(), Some("orbit-test-dispatch"));
        el.shutdown();
    }

    #[test]
    fn invoke_runs_inside_dispatcher() {
        let el = start();
        assert!(!el.in_dispatcher());
        let probe = el.clone();
        assert!(el.invoke(move || probe.in_dispatcher()).unwrap());
        el.shutdown();
    }

    #[test]
    fn emit_checked_rejects_unknown() {
        let el = start();
        assert_eq!(
            el.emit_checked("ghost", Args::new()),
            Err(DispatchError::NotFound("ghost".into()))
        );
        el.register_event("real", true).unwrap();
        assert_eq!(el.emit_checked("real", Args::new()), Ok(()));
        el.flush().unwrap();
        assert_eq!(el.stats().emissions, 1);
        el.shutdown();
    }

    #[test]
    fn debug_format() {
        let el = start();
        assert!(format!("{el:?}").contains("EventLoop"));
        assert!(format!("{:?}", el.emitter()).contains("closed: false"));
        el.shutdown();
    }
}

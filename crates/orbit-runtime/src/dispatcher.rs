//! Dispatcher - the single consumer of an event loop's queues.
//!
//! Runs on the loop's dedicated thread inside a current-thread tokio
//! runtime. Every registry mutation and every callback invocation happens
//! here, one message at a time.
//!
//! # Architecture
//!
//! ```text
//!                         ┌───────────────────────────────┐
//!                         │          Dispatcher           │
//! shutdown() ── watch ──► │  shutdown_rx     (priority 1) │
//! register   ── mpsc ───► │  registration_rx (priority 2) │
//! subscribe  ── mpsc ───► │  command_rx      (priority 3) │
//! emit       ── mpsc ───► │  emission_rx     (priority 4) │
//!                         │        │                      │
//!                         │        ▼                      │
//!                         │  thread-local Registry        │
//!                         │        │                      │
//!                         │        ▼                      │
//!                         │  script / host callbacks      │
//!                         └───────────────────────────────┘
//! ```
//!
//! Emissions are handled strictly in enqueue order. Registration only
//! takes precedence over emissions that are still queued, so an event
//! registered before an emission is enqueued is always visible to it.

use crate::context;
use crate::event::Event;
use crate::registry::{EventSubscription, Registry};
use crate::script::ScriptRuntime;
use crate::stats::DispatchStats;
use orbit_event::{Args, DispatchError, EventHooks, Subscription, Value};
use orbit_types::LoopId;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Work run on the dispatcher thread on behalf of another thread.
pub(crate) type Job = Box<dyn FnOnce() + Send>;

/// Request to add an event to the registry.
pub(crate) struct Registration {
    pub(crate) event: Event,
    pub(crate) ack: Option<oneshot::Sender<()>>,
}

/// Message on the emission queue.
pub(crate) enum Emission {
    /// Dispatch `args` to every subscriber of `name`.
    Fire { name: String, args: Args },
    /// Completes once every emission enqueued before it has been handled.
    Fence(oneshot::Sender<()>),
}

/// Registry operation requested from outside the dispatcher thread.
pub(crate) enum Command {
    Subscribe {
        name: String,
        subscription: Subscription,
        reply: oneshot::Sender<Result<usize, DispatchError>>,
    },
    Unsubscribe {
        name: String,
        index: i64,
        reply: oneshot::Sender<Result<(), DispatchError>>,
    },
    Invoke(Job),
}

/// Receiving half of an event loop.
pub(crate) struct Dispatcher {
    id: LoopId,
    registration_rx: mpsc::UnboundedReceiver<Registration>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    emission_rx: mpsc::UnboundedReceiver<Emission>,
    shutdown_rx: watch::Receiver<bool>,
    script: Option<Box<dyn ScriptRuntime>>,
    stats: Arc<DispatchStats>,
}

impl Dispatcher {
    pub(crate) fn new(
        id: LoopId,
        registration_rx: mpsc::UnboundedReceiver<Registration>,
        command_rx: mpsc::UnboundedReceiver<Command>,
        emission_rx: mpsc::UnboundedReceiver<Emission>,
        shutdown_rx: watch::Receiver<bool>,
        script: Option<Box<dyn ScriptRuntime>>,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            id,
            registration_rx,
            command_rx,
            emission_rx,
            shutdown_rx,
            script,
            stats,
        }
    }

    /// Processes messages until shutdown is requested or every sender is gone.
    ///
    /// Must be polled on the thread that entered this loop's dispatch context.
    pub(crate) async fn run(mut self) {
        info!("Dispatcher {} started", self.id);

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Dispatcher {}: shutdown requested", self.id);
                        break;
                    }
                }

                registration = self.registration_rx.recv() => {
                    match registration {
                        Some(r) => self.handle_registration(r),
                        None => {
                            info!("Dispatcher {}: registration channel closed", self.id);
                            break;
                        }
                    }
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(c) => self.handle_command(c),
                        None => {
                            info!("Dispatcher {}: command channel closed", self.id);
                            break;
                        }
                    }
                }

                emission = self.emission_rx.recv() => {
                    match emission {
                        Some(Emission::Fire { name, args }) => self.dispatch(&name, &args),
                        Some(Emission::Fence(done)) => {
                            let _ = done.send(());
                        }
                        None => {
                            info!("Dispatcher {}: emission channel closed", self.id);
                            break;
                        }
                    }
                }
            }
        }

        self.discard_pending();
        info!("Dispatcher {} stopped", self.id);
    }

    fn registry<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        context::with_registry(self.id, f)
            .unwrap_or_else(|| panic!("dispatcher {} polled outside its dispatch context", self.id))
    }

    fn handle_registration(&mut self, registration: Registration) {
        let Registration { event, ack } = registration;
        let id = event.id().to_owned();
        if self.registry(|r| r.register(event)) {
            debug!("Dispatcher {}: registered '{}'", self.id, id);
        } else {
            debug!("Dispatcher {}: '{}' already registered", self.id, id);
        }
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe {
                name,
                subscription,
                reply,
            } => {
                let result = self.registry(|r| r.subscribe(&name, subscription));
                let _ = reply.send(result);
            }
            Command::Unsubscribe { name, index, reply } => {
                let result = self.registry(|r| r.unsubscribe(&name, index));
                let _ = reply.send(result);
            }
            Command::Invoke(job) => {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!("Dispatcher {}: invoked job panicked", self.id);
                }
            }
        }
    }

    /// Delivers one emission.
    fn dispatch(&mut self, name: &str, explicit: &[Value]) {
        let Some(snapshot) = self.registry(|r| r.snapshot(name)) else {
            self.stats.record_dropped();
            debug!(event = name, "Dispatcher {}: dropped emission for unknown event", self.id);
            return;
        };
        self.stats.record_emission();

        let unregister = if snapshot.subscribers().is_empty() {
            Self::fire_depleted(snapshot.event(), explicit)
        } else {
            self.fire_subscribers(name, &snapshot, explicit)
        };

        if unregister {
            self.registry(|r| r.remove(name));
            self.stats.record_unregistered();
            debug!(event = name, "Dispatcher {}: event unregistered itself", self.id);
        }
    }

    /// Runs the hooks once with `subscribers_depleted = true`.
    fn fire_depleted(event: &Event, explicit: &[Value]) -> bool {
        let mut args = explicit.to_vec();
        if let Some(pre) = event.pre(true) {
            args = pre(args);
        }
        event.post(true).is_some_and(|post| post(&args))
    }

    /// Invokes each subscriber in order. Returns the last post verdict.
    fn fire_subscribers(&self, name: &str, snapshot: &EventSubscription, explicit: &[Value]) -> bool {
        let event = snapshot.event();
        let mut unregister = false;

        for (index, subscription) in snapshot.subscribers().iter().enumerate() {
            let mut args = subscription.resolve_args(explicit);
            if let Some(pre) = event.pre(false) {
                args = pre(args);
            }

            self.invoke(name, index, subscription, &args);

            if let Some(post) = event.post(false) {
                unregister = post(&args);
            }
        }

        unregister
    }

    /// Calls the script callback, then the host callback.
    ///
    /// Failures are logged and counted; the remaining subscribers still run.
    fn invoke(&self, name: &str, index: usize, subscription: &Subscription, args: &[Value]) {
        if let Some(callback) = subscription.script_callback() {
            self.stats.record_invocation();
            let result = match &self.script {
                Some(runtime) => runtime.call(callback, args),
                None => Err(DispatchError::Invocation(
                    "no script runtime attached".to_string(),
                )),
            };
            if let Err(e) = result {
                self.stats.record_failure();
                warn!(
                    event = name,
                    subscriber = index,
                    "Dispatcher {}: script callback failed: {}",
                    self.id,
                    e
                );
            }
        }

        if let Some(callback) = subscription.host_callback() {
            self.stats.record_invocation();
            if catch_unwind(AssertUnwindSafe(|| callback(args))).is_err() {
                self.stats.record_failure();
                warn!(
                    event = name,
                    subscriber = index,
                    "Dispatcher {}: host callback panicked",
                    self.id
                );
            }
        }
    }

    /// Drops everything still queued so waiting callers observe `Closed`.
    fn discard_pending(&mut self) {
        self.registration_rx.close();
        self.command_rx.close();
        self.emission_rx.close();

        let mut discarded = 0usize;
        while self.registration_rx.try_recv().is_ok() {
            discarded += 1;
        }
        while self.command_rx.try_recv().is_ok() {
            discarded += 1;
        }
        while let Ok(emission) = self.emission_rx.try_recv() {
            if matches!(emission, Emission::Fire { .. }) {
                self.stats.record_dropped();
            }
            discarded += 1;
        }
        if discarded > 0 {
            debug!("Dispatcher {}: discarded {} pending messages", self.id, discarded);
        }
    }
}

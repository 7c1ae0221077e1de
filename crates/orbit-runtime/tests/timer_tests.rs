//! Integration tests for the timer layer.
//!
//! Timing assertions use generous margins; only ordering and counts are
//! checked exactly.

use orbit_runtime::config::OrbitConfig;
use orbit_runtime::{EventLoop, Subscription, TimerHandle};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn start() -> EventLoop {
    EventLoop::start(&OrbitConfig::default(), None).expect("start loop")
}

fn wait_until(timeout: Duration, pred: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    pred()
}

fn counting(hits: &Arc<AtomicUsize>) -> Subscription {
    let hits = Arc::clone(hits);
    Subscription::host(move |_| {
        hits.fetch_add(1, Ordering::SeqCst);
    })
}

// =============================================================================
// setTimeout
// =============================================================================

mod timeout {
    use super::*;

    #[test]
    fn fires_exactly_once_and_unregisters() {
        let el = start();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = el
            .set_timeout(counting(&hits), Duration::from_millis(20))
            .unwrap();

        assert!(handle.event_id.starts_with("timer:"));
        assert_eq!(handle.index, 0);
        assert!(wait_until(Duration::from_secs(2), || {
            hits.load(Ordering::SeqCst) == 1
        }));
        assert!(wait_until(Duration::from_secs(2), || {
            !el.is_registered(&handle.event_id)
        }));
        assert_eq!(el.active_timers(), 0);

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        el.shutdown();
    }

    #[test]
    fn does_not_fire_before_delay() {
        let el = start();
        let hits = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();
        let fired_at = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&fired_at);
        let counter = Arc::clone(&hits);
        el.set_timeout(
            Subscription::host(move |_| {
                *slot.lock() = Some(started.elapsed());
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Duration::from_millis(50),
        )
        .unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            hits.load(Ordering::SeqCst) == 1
        }));
        let elapsed = (*fired_at.lock()).expect("fired");
        assert!(elapsed >= Duration::from_millis(50), "fired after {elapsed:?}");
        el.shutdown();
    }

    #[test]
    fn cleared_before_firing_never_runs() {
        let el = start();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = el
            .set_timeout(counting(&hits), Duration::from_millis(50))
            .unwrap();

        el.clear_timeout(&handle).unwrap();
        assert_eq!(el.subscriber_count(&handle.event_id), Some(0));

        // the timer still fires once, finds no subscribers and removes itself
        assert!(wait_until(Duration::from_secs(2), || {
            !el.is_registered(&handle.event_id)
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(el.stats().unregistered, 1);
        el.shutdown();
    }

    #[test]
    fn clearing_twice_is_out_of_range() {
        let el = start();
        let handle = el
            .set_timeout(Subscription::default(), Duration::from_secs(60))
            .unwrap();
        assert_eq!(el.active_timers(), 1);
        el.clear_timeout(&handle).unwrap();
        assert!(el.clear_timeout(&handle).is_err());
        // still registered until it fires
        assert_eq!(el.active_timers(), 1);
        el.shutdown();
    }

    #[test]
    fn short_delays_never_miss_their_subscriber() {
        let el = start();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let handle = el
                .set_timeout(counting(&hits), Duration::from_millis(1))
                .expect("timeout with short delay");
            assert_eq!(handle.index, 0);
            // host stalls past the delay before doing anything else
            std::thread::sleep(Duration::from_millis(3));
        }

        assert!(wait_until(Duration::from_secs(2), || {
            hits.load(Ordering::SeqCst) == 50
        }));
        assert!(wait_until(Duration::from_secs(2), || el.active_timers() == 0));
        el.shutdown();
    }

    #[test]
    fn subscriber_is_attached_on_return() {
        let el = start();
        let handle = el
            .set_timeout(Subscription::default(), Duration::from_secs(60))
            .unwrap();
        assert_eq!(el.subscriber_count(&handle.event_id), Some(1));
        el.shutdown();
    }

    #[test]
    fn default_args_reach_timer_callbacks() {
        let el = start();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        el.set_timeout(
            Subscription::host(move |args| sink.lock().push(args.to_vec()))
                .with_default_args(vec![serde_json::json!("tick")]),
            Duration::from_millis(10),
        )
        .unwrap();

        assert!(wait_until(Duration::from_secs(2), || seen.lock().len() == 1));
        assert_eq!(seen.lock()[0], vec![serde_json::json!("tick")]);
        el.shutdown();
    }
}

// =============================================================================
// setInterval
// =============================================================================

mod interval {
    use super::*;

    #[test]
    fn fires_repeatedly_until_cleared() {
        let el = start();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = el
            .set_interval(counting(&hits), Duration::from_millis(10))
            .unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            hits.load(Ordering::SeqCst) >= 3
        }));
        el.clear_interval(&handle).unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            !el.is_registered(&handle.event_id)
        }));
        let settled = hits.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(hits.load(Ordering::SeqCst), settled);
        el.shutdown();
    }

    #[test]
    fn callback_clears_its_own_interval() {
        let el = start();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle: Arc<Mutex<Option<TimerHandle>>> = Arc::default();

        let inner = el.clone();
        let counter = Arc::clone(&hits);
        let own = Arc::clone(&handle);
        let registered = el
            .set_interval(
                Subscription::host(move |_| {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 5 {
                        if let Some(h) = own.lock().as_ref() {
                            inner.clear_interval(h).expect("clear from callback");
                        }
                    }
                }),
                Duration::from_millis(15),
            )
            .unwrap();
        let event_id = registered.event_id.clone();
        *handle.lock() = Some(registered);

        assert!(wait_until(Duration::from_secs(3), || {
            !el.is_registered(&event_id)
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 5);
        el.shutdown();
    }

    #[test]
    fn multiple_subscribers_share_one_schedule() {
        let el = start();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();
        let handle = el
            .set_interval(counting(&a), Duration::from_millis(20))
            .unwrap();
        el.subscribe(&handle.event_id, counting(&b)).unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            b.load(Ordering::SeqCst) >= 3
        }));
        std::thread::sleep(Duration::from_millis(200));
        el.shutdown();
        let max_firings = started.elapsed().as_millis() as u64 / 20 + 1;

        let (a, b) = (a.load(Ordering::SeqCst), b.load(Ordering::SeqCst));
        assert!(a >= b, "a={a} b={b}");
        // two post hooks per firing still leave a single pending countdown
        let firings = el.stats().emissions;
        assert!(firings <= max_firings, "{firings} firings, at most {max_firings}");
        assert_eq!(a as u64, firings);
    }
}

// =============================================================================
// Timers created from inside callbacks
// =============================================================================

mod nested {
    use super::*;

    #[test]
    fn timeout_scheduled_from_callback() {
        let el = start();
        let hits = Arc::new(AtomicUsize::new(0));
        el.register_event("kick", true).unwrap();

        let inner = el.clone();
        let sub = counting(&hits);
        el.subscribe_host(
            "kick",
            move |_| {
                inner
                    .set_timeout(sub.clone(), Duration::from_millis(10))
                    .expect("timeout from callback");
            },
            vec![],
        )
        .unwrap();

        el.emit("kick", vec![]);
        assert!(wait_until(Duration::from_secs(2), || {
            hits.load(Ordering::SeqCst) == 1
        }));
        el.shutdown();
    }

    #[test]
    fn stalled_callback_keeps_its_new_timeout() {
        let el = start();
        let hits = Arc::new(AtomicUsize::new(0));
        el.register_event("kick", true).unwrap();

        let inner = el.clone();
        let sub = counting(&hits);
        el.subscribe_host(
            "kick",
            move |_| {
                inner
                    .set_timeout(sub.clone(), Duration::from_millis(1))
                    .expect("timeout from callback");
                std::thread::sleep(Duration::from_millis(20));
            },
            vec![],
        )
        .unwrap();

        el.emit("kick", vec![]);
        assert!(wait_until(Duration::from_secs(2), || {
            hits.load(Ordering::SeqCst) == 1
        }));
        assert!(wait_until(Duration::from_secs(2), || el.active_timers() == 0));
        el.shutdown();
    }
}

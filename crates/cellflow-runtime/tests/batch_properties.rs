//! Batch dispatch properties, exercised through `ChangeQueue`.
//!
//! 1. Immediate cells update synchronously.
//! 2. Announcements are deferred to `run_batch` and delivered once.
//! 3. Buffered cells expose now/then consistently; the buffer drains.
//! 4. Several changes to one buffered cell in a batch share the buffer head.
//! 5. Cascades advance one hop per batch (snapshot) or fully (fixpoint).
//! 6. Observers run in registration order.
//!
//! Plus tracing instrumentation of a batch.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use cellflow_core::{
    BufferedValue, Coordinator, Lifo, ObservableCell, Observer, Priority, Subscription, Value,
};
use cellflow_runtime::{ChangeQueue, DrainPolicy, QueueConfig};

fn snapshot_queue() -> Rc<ChangeQueue> {
    Rc::new(ChangeQueue::new())
}

fn fixpoint_queue() -> Rc<ChangeQueue> {
    Rc::new(ChangeQueue::with_config(QueueConfig::fixpoint()).expect("valid config"))
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Immediate-cell synchronous update
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn immediate_cell_updates_before_batch() {
    let queue = snapshot_queue();
    let a: Value<i32> = Value::bound(0, &queue);
    a.change(1);
    assert_eq!(a.get(), 1);
    assert_eq!(queue.len(), 1);
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Deferred announcement
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn announcement_delivered_once_after_batch() {
    let queue = snapshot_queue();
    let a: Value<i32> = Value::bound(0, &queue);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let _sub = a.subscribe(move |cell: &Value<i32>| log.borrow_mut().push(cell.get()));

    a.change(1);
    assert!(seen.borrow().is_empty());

    let report = queue.run_batch();
    assert_eq!(*seen.borrow(), vec![1]);
    assert_eq!(report.notifications, 1);

    queue.run_batch();
    assert_eq!(*seen.borrow(), vec![1]);
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Buffered now/then consistency
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn buffered_now_then_consistency() {
    let queue = snapshot_queue();
    let b: BufferedValue<i32> = BufferedValue::bound(0, &queue);
    let during = Rc::new(Cell::new((0, 0)));
    let d = Rc::clone(&during);
    let _sub = b.subscribe(move |cell: &BufferedValue<i32>| d.set((cell.now(), cell.then())));

    b.change(21);
    assert_eq!(b.now(), 0);
    assert_eq!(b.then(), 21);

    queue.run_batch();
    assert_eq!(during.get(), (0, 21));
    assert_eq!(b.now(), 21);
    assert!(!b.has_pending());
    assert_eq!(b.try_then(), None);
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Multiple enqueues before one batch
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn repeated_changes_share_buffer_head() {
    let queue = snapshot_queue();
    let b: BufferedValue<i32> = BufferedValue::bound(0, &queue);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let _sub = b.subscribe(move |cell: &BufferedValue<i32>| {
        log.borrow_mut().push((cell.now(), cell.then()));
    });

    b.change(21);
    b.change(42);
    let report = queue.run_batch();

    assert_eq!(report.entries, 2);
    assert_eq!(*seen.borrow(), vec![(0, 21), (0, 21)]);
    assert_eq!(b.now(), 42);
    assert_eq!(b.pending_len(), 0);
}

#[test]
fn lifo_buffer_changes_next_value_not_protocol() {
    let queue = snapshot_queue();
    let b: BufferedValue<i32, Lifo<i32>> = BufferedValue::bound(0, &queue);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let _sub = b.subscribe(move |cell: &BufferedValue<i32, Lifo<i32>>| {
        log.borrow_mut().push(cell.then());
    });

    b.change(21);
    b.change(42);
    queue.run_batch();
    assert_eq!(*seen.borrow(), vec![42, 42]);
    assert_eq!(b.now(), 21);
    assert!(!b.has_pending());
}

#[test]
fn priority_buffer_commits_lowest_rank_last() {
    let queue = snapshot_queue();
    let b: BufferedValue<u8, Priority<u8>> = BufferedValue::bound(0, &queue);
    b.change(3);
    b.change(9);
    b.change(5);
    assert_eq!(b.then(), 9);
    queue.run_batch();
    assert_eq!(b.now(), 3);
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Cascade ordering
// ═════════════════════════════════════════════════════════════════════════

struct Cascade {
    a: BufferedValue<i32>,
    b: BufferedValue<i32>,
    c: BufferedValue<i32>,
    _subs: Vec<Subscription>,
}

fn cascade(queue: &Rc<ChangeQueue>) -> Cascade {
    let a: BufferedValue<i32> = BufferedValue::bound(0, queue);
    let b: BufferedValue<i32> = BufferedValue::bound(0, queue);
    let c: BufferedValue<i32> = BufferedValue::bound(0, queue);
    let (b2, c2) = (b.clone(), c.clone());
    let subs = vec![
        a.subscribe(move |a: &BufferedValue<i32>| b2.change(a.then() + 1)),
        b.subscribe(move |b: &BufferedValue<i32>| c2.change(b.then() + 1)),
    ];
    Cascade { a, b, c, _subs: subs }
}

#[test]
fn snapshot_cascade_one_hop_per_batch() {
    let queue = snapshot_queue();
    assert_eq!(queue.config().policy, DrainPolicy::Snapshot);
    let g = cascade(&queue);

    g.a.change(10);
    let r1 = queue.run_batch();
    assert_eq!((g.a.now(), g.b.now(), g.c.now()), (10, 0, 0));
    assert_eq!(g.b.then(), 11);
    assert_eq!(r1.deferred, 1);

    let r2 = queue.run_batch();
    assert_eq!((g.b.now(), g.c.now()), (11, 0));
    assert_eq!(r2.deferred, 1);

    let r3 = queue.run_batch();
    assert_eq!(g.c.now(), 12);
    assert_eq!(r3.deferred, 0);
}

#[test]
fn fixpoint_cascade_completes_in_one_batch() {
    let queue = fixpoint_queue();
    let g = cascade(&queue);

    g.a.change(10);
    let report = queue.run_batch();
    assert_eq!((g.a.now(), g.b.now(), g.c.now()), (10, 11, 12));
    assert_eq!(report.rounds, 3);
    assert_eq!(report.deferred, 0);
    assert!(queue.is_empty());
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Observer registration order
// ═════════════════════════════════════════════════════════════════════════

struct Tagged {
    tag: usize,
    log: Rc<RefCell<Vec<usize>>>,
}

impl Observer<Value<()>> for Tagged {
    fn on_change(&self, _cell: &Value<()>) {
        self.log.borrow_mut().push(self.tag);
    }
}

#[test]
fn observers_run_in_registration_order() {
    let queue = snapshot_queue();
    let cell: Value<()> = Value::bound((), &queue);
    let log = Rc::new(RefCell::new(Vec::new()));
    let observers: Vec<Rc<Tagged>> = (0..8)
        .map(|tag| {
            Rc::new(Tagged {
                tag,
                log: Rc::clone(&log),
            })
        })
        .collect();
    for obs in &observers {
        cell.register_observer(obs);
    }
    // A duplicate registration is notified again, at its own position.
    cell.register_observer(&observers[2]);

    cell.change(());
    queue.run_batch();
    assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4, 5, 6, 7, 2]);

    log.borrow_mut().clear();
    drop(observers);
    cell.change(());
    assert_eq!(queue.run_batch().notifications, 0);
    assert!(log.borrow().is_empty());
    assert_eq!(cell.observer_count(), 0);
}

// ═════════════════════════════════════════════════════════════════════════
// Tracing
// ═════════════════════════════════════════════════════════════════════════

mod tracing_capture {
    use super::*;
    use tracing::Subscriber;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    #[derive(Default)]
    struct BatchTraceState {
        saw_batch_span: bool,
        recorded_rounds: Option<u64>,
        announce_events: usize,
        saw_round_limit_warning: bool,
    }

    struct BatchTraceCapture {
        state: Arc<Mutex<BatchTraceState>>,
    }

    impl<S> Layer<S> for BatchTraceCapture
    where
        S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
    {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::Id,
            _ctx: Context<'_, S>,
        ) {
            if attrs.metadata().name() == "cellflow.batch" {
                self.state.lock().expect("trace lock").saw_batch_span = true;
            }
        }

        fn on_record(
            &self,
            id: &tracing::Id,
            values: &tracing::span::Record<'_>,
            ctx: Context<'_, S>,
        ) {
            let Some(span) = ctx.span(id) else {
                return;
            };
            if span.metadata().name() != "cellflow.batch" {
                return;
            }
            struct V {
                rounds: Option<u64>,
            }
            impl tracing::field::Visit for V {
                fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
                    if field.name() == "rounds" {
                        self.rounds = Some(value);
                    }
                }

                fn record_debug(
                    &mut self,
                    _field: &tracing::field::Field,
                    _value: &dyn std::fmt::Debug,
                ) {
                }
            }
            let mut v = V { rounds: None };
            values.record(&mut v);
            if let Some(rounds) = v.rounds {
                self.state.lock().expect("trace lock").recorded_rounds = Some(rounds);
            }
        }

        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct Msg {
                message: Option<String>,
            }
            impl tracing::field::Visit for Msg {
                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    if field.name() == "message" {
                        self.message = Some(value.to_string());
                    }
                }

                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.message = Some(format!("{value:?}").trim_matches('"').to_string());
                    }
                }
            }
            let mut msg = Msg { message: None };
            event.record(&mut msg);
            let mut state = self.state.lock().expect("trace lock");
            match msg.message.as_deref() {
                Some("cellflow.announce") => state.announce_events += 1,
                Some(m) if m.contains("round limit") => state.saw_round_limit_warning = true,
                _ => {}
            }
        }
    }

    #[test]
    fn batch_span_and_announce_events_emitted() {
        let state = Arc::new(Mutex::new(BatchTraceState::default()));
        let subscriber = tracing_subscriber::registry().with(BatchTraceCapture {
            state: Arc::clone(&state),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let queue = snapshot_queue();
        let a: Value<i32> = Value::bound(0, &queue);
        let b: BufferedValue<i32> = BufferedValue::bound(0, &queue);
        a.change(1);
        b.change(2);
        queue.run_batch();

        let snapshot = state.lock().expect("trace lock");
        assert!(snapshot.saw_batch_span, "expected cellflow.batch span");
        assert_eq!(snapshot.recorded_rounds, Some(1));
        assert_eq!(snapshot.announce_events, 2);
        assert!(!snapshot.saw_round_limit_warning);
    }

    #[test]
    fn round_limit_warning_emitted() {
        let state = Arc::new(Mutex::new(BatchTraceState::default()));
        let subscriber = tracing_subscriber::registry().with(BatchTraceCapture {
            state: Arc::clone(&state),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let config = QueueConfig::fixpoint().with_max_rounds(2);
        let queue = Rc::new(ChangeQueue::with_config(config).expect("valid config"));
        let ping: Value<u32> = Value::bound(0, &queue);
        let _sub = ping.subscribe(|p: &Value<u32>| p.change(p.get() + 1));
        ping.change(1);
        let report = queue.run_batch();
        assert_eq!(report.deferred, 1);

        let snapshot = state.lock().expect("trace lock");
        assert!(snapshot.saw_round_limit_warning, "expected round limit warning");
        assert_eq!(snapshot.recorded_rounds, Some(2));
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chainemit::prelude::*;
use chainemit::{ArgumentErrorKind, EmitterConfig};
use parking_lot::Mutex;

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().clone()
}

fn record<A: 'static>(log: &Log, label: &str) -> Listener<A> {
    let log = Arc::clone(log);
    let label = label.to_string();
    Listener::infallible(move |_, _| log.lock().push(label.clone()))
}

/// Run `emit_with` and hand back whatever the completion saw
fn emit_and_capture<A>(emitter: &Emitter<A>, event: impl Into<Event<A>>, args: A) -> Option<Outcome<A>>
where
    A: Send + Sync + 'static,
{
    let seen = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&seen);
    emitter
        .emit_with(event, args, move |outcome| *slot.lock() = Some(outcome))
        .unwrap();
    seen.lock().take()
}

#[test]
fn sync_listener_then_completion() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    emitter.on("test", record(&log, "listener #1")).unwrap();

    let done = Arc::clone(&log);
    emitter
        .emit_with("test", (), move |outcome| {
            assert!(outcome.error.is_none());
            done.lock().push("done".into());
        })
        .unwrap();

    assert_eq!(entries(&log), vec!["listener #1", "done"]);
}

#[test]
fn wildcard_listeners_run_first() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    emitter.on("test", record(&log, "named #1")).unwrap();
    emitter.on_any(record(&log, "any #1"));
    emitter.on("test", record(&log, "named #2")).unwrap();
    emitter.on_any(record(&log, "any #2"));

    emitter.emit("test", ()).unwrap();
    assert_eq!(
        entries(&log),
        vec!["any #1", "any #2", "named #1", "named #2"]
    );
}

#[test]
fn wildcard_listener_sees_every_name() {
    let emitter: Emitter = Emitter::new();
    let names = new_log();
    let sink = Arc::clone(&names);
    emitter.on_any(Listener::infallible(move |event, _| {
        sink.lock().push(event.name().to_string())
    }));

    emitter.emit("open", ()).unwrap().emit("close", ()).unwrap();
    assert_eq!(entries(&names), vec!["open", "close"]);
}

#[test]
fn emit_without_listeners_completes() {
    let emitter: Emitter<&'static str> = Emitter::new();
    let outcome = emit_and_capture(&emitter, "nobody", "payload").unwrap();
    assert!(outcome.is_ok());
    assert_eq!(outcome.event.name(), "nobody");
    assert_eq!(*outcome.args(), "payload");
}

#[test]
fn args_reach_every_listener_and_the_completion() {
    let emitter: Emitter<(String, u32)> = Emitter::new();
    let seen = new_log();
    for _ in 0..2 {
        let sink = Arc::clone(&seen);
        emitter
            .on(
                "save",
                Listener::infallible(move |_, (path, size): &(String, u32)| {
                    sink.lock().push(format!("{path}:{size}"))
                }),
            )
            .unwrap();
    }

    let outcome = emit_and_capture(&emitter, "save", ("a.txt".to_string(), 3)).unwrap();
    assert_eq!(entries(&seen), vec!["a.txt:3", "a.txt:3"]);
    assert_eq!(outcome.args().0, "a.txt");
}

#[test]
fn sync_error_skips_remaining_listeners() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    emitter.on_any(record(&log, "any"));
    emitter
        .on(
            "test",
            Listener::sync(|_, _| Err("A test error".into())),
        )
        .unwrap();
    emitter.on("test", record(&log, "never")).unwrap();

    let outcome = emit_and_capture(&emitter, "test", ()).unwrap();
    let err = outcome.error.unwrap();
    assert_eq!(entries(&log), vec!["any"]);
    assert!(err.is_listener_failure());
    assert_eq!(err.message(), "A test error");
    assert_eq!(err.event_name(), Some("test"));
    assert_eq!(err.position(), Some(1));
}

#[test]
fn continuation_error_skips_remaining_listeners() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    emitter
        .on(
            "test",
            Listener::with_next(|_, _, next| next.fail("A test error")),
        )
        .unwrap();
    emitter.on("test", record(&log, "never")).unwrap();

    let outcome = emit_and_capture(&emitter, "test", ()).unwrap();
    assert!(entries(&log).is_empty());
    assert_eq!(outcome.error.unwrap().message(), "A test error");
}

#[test]
fn error_without_completion_is_absorbed() {
    let emitter: Emitter = Emitter::with_config(
        EmitterConfig::new().with_unhandled_error_logging(false),
    );
    emitter
        .on("test", Listener::sync(|_, _| Err("ignored".into())))
        .unwrap();
    assert!(emitter.emit("test", ()).is_ok());
}

#[test]
fn stop_propagation_ends_the_walk() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    let sink = Arc::clone(&log);
    emitter
        .on(
            "test",
            Listener::infallible(move |event, _| {
                sink.lock().push("listener #1".into());
                assert!(event.stop_propagation());
            }),
        )
        .unwrap();
    emitter.on("test", record(&log, "listener #2")).unwrap();

    let outcome = emit_and_capture(&emitter, Event::<()>::stoppable("test"), ()).unwrap();
    assert_eq!(entries(&log), vec!["listener #1"]);
    assert!(outcome.is_ok());
    assert!(outcome.stopped());
}

#[test]
fn wildcard_listener_can_stop_named_listeners() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    emitter.on_any(Listener::infallible(|event, _| {
        event.stop_propagation();
    }));
    emitter.on("test", record(&log, "named")).unwrap();

    emitter.emit(Event::<()>::stoppable("test"), ()).unwrap();
    assert!(entries(&log).is_empty());
}

#[test]
fn plain_event_ignores_stop_propagation() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    let sink = Arc::clone(&log);
    emitter
        .on(
            "test",
            Listener::infallible(move |event, _| {
                sink.lock().push(format!("stopped={}", event.stop_propagation()));
            }),
        )
        .unwrap();
    emitter.on("test", record(&log, "listener #2")).unwrap();

    let outcome = emit_and_capture(&emitter, "test", ()).unwrap();
    assert_eq!(entries(&log), vec!["stopped=false", "listener #2"]);
    assert!(!outcome.stopped());
}

#[test]
fn prevent_default_is_reported_but_does_not_stop() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    emitter
        .on(
            "submit",
            Listener::infallible(|event, _| {
                event.prevent_default();
            }),
        )
        .unwrap();
    emitter.on("submit", record(&log, "after")).unwrap();

    let outcome = emit_and_capture(&emitter, Event::<()>::stoppable("submit"), ()).unwrap();
    assert_eq!(entries(&log), vec!["after"]);
    assert!(outcome.event.is_default_prevented());
    assert!(!outcome.stopped());
}

#[test]
fn once_is_removed_before_it_runs() {
    let emitter: Emitter = Emitter::new();
    let counts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&counts);
    let handle = emitter.clone();
    emitter
        .once(
            "test",
            Listener::infallible(move |_, _| sink.lock().push(handle.listener_count("test"))),
        )
        .unwrap();

    emitter.emit("test", ()).unwrap();
    emitter.emit("test", ()).unwrap();
    assert_eq!(*counts.lock(), vec![0]);
}

#[test]
fn failing_once_listener_is_still_removed() {
    let emitter: Emitter = Emitter::new();
    emitter
        .once("test", Listener::sync(|_, _| Err("nope".into())))
        .unwrap();

    let outcome = emit_and_capture(&emitter, "test", ()).unwrap();
    assert!(outcome.error.is_some());
    assert_eq!(emitter.listener_count("test"), 0);

    let outcome = emit_and_capture(&emitter, "test", ()).unwrap();
    assert!(outcome.error.is_none());
}

#[test]
fn once_fires_once_across_reentrant_emits() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    let depth = Arc::new(Mutex::new(0));

    let handle = emitter.clone();
    let guard = Arc::clone(&depth);
    emitter
        .on(
            "tick",
            Listener::infallible(move |_, _| {
                let first = {
                    let mut depth = guard.lock();
                    *depth += 1;
                    *depth == 1
                };
                if first {
                    handle.emit("tick", ()).unwrap();
                }
            }),
        )
        .unwrap();
    emitter.once("tick", record(&log, "once")).unwrap();

    emitter.emit("tick", ()).unwrap();
    assert_eq!(*depth.lock(), 2);
    assert_eq!(entries(&log), vec!["once"]);
}

#[test]
fn listener_may_emit_another_event() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    let handle = emitter.clone();
    let sink = Arc::clone(&log);
    emitter
        .on(
            "outer",
            Listener::infallible(move |_, _| {
                sink.lock().push("outer:start".into());
                handle.emit("inner", ()).unwrap();
                sink.lock().push("outer:end".into());
            }),
        )
        .unwrap();
    emitter.on("inner", record(&log, "inner")).unwrap();

    emitter.emit("outer", ()).unwrap();
    assert_eq!(entries(&log), vec!["outer:start", "inner", "outer:end"]);
}

#[test]
fn registrations_during_dispatch_apply_to_the_next_emit() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    let late = record::<()>(&log, "late");

    let handle = emitter.clone();
    let added = late.clone();
    emitter
        .once(
            "test",
            Listener::infallible(move |_, _| {
                handle.on("test", added.clone()).unwrap();
            }),
        )
        .unwrap();

    emitter.emit("test", ()).unwrap();
    assert!(entries(&log).is_empty());

    emitter.emit("test", ()).unwrap();
    assert_eq!(entries(&log), vec!["late"]);
}

#[test]
fn removal_during_dispatch_keeps_the_current_walk() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    let second = record::<()>(&log, "second");

    let handle = emitter.clone();
    let target = second.clone();
    emitter
        .on(
            "test",
            Listener::infallible(move |_, _| {
                handle.off("test", &target).unwrap();
            }),
        )
        .unwrap();
    emitter.on("test", second).unwrap();

    emitter.emit("test", ()).unwrap();
    emitter.emit("test", ()).unwrap();
    assert_eq!(entries(&log), vec!["second"]);
}

#[test]
fn same_listener_registered_twice_runs_twice() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    let listener = record::<()>(&log, "dup");
    emitter.on("test", listener.clone()).unwrap();
    emitter.on("test", listener).unwrap();

    emitter.emit("test", ()).unwrap();
    assert_eq!(entries(&log), vec!["dup", "dup"]);
}

#[test]
fn event_points_back_at_its_emitter() {
    let emitter: Emitter = Emitter::new();
    let matched = Arc::new(Mutex::new(false));
    let slot = Arc::clone(&matched);
    let handle = emitter.clone();
    emitter
        .on(
            "test",
            Listener::infallible(move |event, _| {
                *slot.lock() = event.emitter().is_some_and(|e| e.ptr_eq(&handle));
            }),
        )
        .unwrap();

    let event: Event = Event::new("test");
    assert!(event.emitter().is_none());
    emitter.emit(&event, ()).unwrap();
    assert!(*matched.lock());
    assert!(event.emitter().is_some());
}

#[test]
fn invalid_names_are_rejected_synchronously() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    emitter.on_any(record(&log, "any"));

    let err = emitter.emit("", ()).unwrap_err();
    assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::EmptyName));
    assert_eq!(err.operation(), Some("emit"));

    let err = emitter.emit(WILDCARD, ()).unwrap_err();
    assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::ReservedName));
    assert!(entries(&log).is_empty());
}

#[test]
fn emitting_wildcard_reaches_wildcard_listeners_only_when_allowed() {
    let emitter: Emitter =
        Emitter::with_config(EmitterConfig::new().with_wildcard_emit(true));
    let log = new_log();
    emitter.on_any(record(&log, "any"));

    emitter.emit(WILDCARD, ()).unwrap();
    assert_eq!(entries(&log), vec!["any"]);
}

#[test]
fn long_chain_of_inline_continuations_completes() {
    const CHAIN: usize = 100_000;
    let emitter: Emitter = Emitter::with_config(EmitterConfig::new().with_max_listeners(0));
    let hits = Arc::new(AtomicUsize::new(0));
    for _ in 0..CHAIN {
        let hits = Arc::clone(&hits);
        emitter
            .on(
                "x",
                Listener::with_next(move |_, _, next| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    next.done();
                }),
            )
            .unwrap();
    }

    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);
    emitter
        .emit_with("x", (), move |outcome| {
            assert!(outcome.is_ok());
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), CHAIN);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[test]
fn inline_continuations_interleave_with_sync_listeners() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    let inline = |label: &'static str| {
        let log = Arc::clone(&log);
        Listener::<()>::with_next(move |_, _, next| {
            log.lock().push(label.to_string());
            next.done();
        })
    };
    emitter.on_any(inline("any"));
    emitter
        .on("test", record(&log, "sync #1"))
        .unwrap()
        .on("test", inline("inline #1"))
        .unwrap()
        .on("test", inline("inline #2"))
        .unwrap()
        .on("test", record(&log, "sync #2"))
        .unwrap();

    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);
    emitter
        .emit_with("test", (), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(
        entries(&log),
        vec!["any", "sync #1", "inline #1", "inline #2", "sync #2"]
    );
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_listener_is_reported_to_the_completion() {
    let emitter: Emitter = Emitter::new();
    let log = new_log();
    emitter
        .on("test", Listener::infallible(|_, _| panic!("listener blew up")))
        .unwrap();
    emitter.on("test", record(&log, "never")).unwrap();

    let outcome = emit_and_capture(&emitter, "test", ()).unwrap();
    let err = outcome.error.unwrap();
    assert!(err.is_listener_failure());
    assert_eq!(err.position(), Some(0));
    assert!(entries(&log).is_empty());
}

#[test]
fn plain_event_default_can_be_prevented() {
    let emitter: Emitter = Emitter::new();
    emitter
        .on("submit", Listener::infallible(|event, _| event.prevent_default()))
        .unwrap();

    let outcome = emit_and_capture(&emitter, "submit", ()).unwrap();
    assert!(outcome.event.is_default_prevented());
    assert!(!outcome.event.is_stoppable());
}

//! Sequential dispatch of one emission
//!
//! A `Dispatch` owns the snapshot of listeners taken when the event was
//! emitted and walks it one listener at a time. A continuation-style listener
//! takes ownership of the dispatch through its [`Next`]. If the continuation
//! is consumed before the listener returns, the state is handed back to the
//! running loop through a `Handoff` slot, so inline completions never grow
//! the stack. Only a continuation consumed later restarts the loop itself.
//!
//! A panicking listener is reported like any other listener failure.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::emitter::{Emitter, Entry};
use crate::error::{BoxError, Error, ListenerResult, Result};
use crate::event::Event;
use crate::listener::Callback;

/// Completion callback of one dispatch
pub(crate) type Done<A> = Box<dyn FnOnce(Outcome<A>) + Send>;

/// What a completion receives: the error first, then the event and the
/// arguments the listeners were given.
pub struct Outcome<A = ()> {
    pub error: Option<Error>,
    pub event: Event<A>,
    pub args: Arc<A>,
}

impl<A> Outcome<A> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// True if a listener stopped propagation
    pub fn stopped(&self) -> bool {
        self.event.is_propagation_stopped()
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    pub fn into_result(self) -> Result<Event<A>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.event),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for Outcome<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outcome")
            .field("error", &self.error)
            .field("event", &self.event)
            .field("args", &self.args)
            .finish()
    }
}

pub(crate) struct Dispatch<A> {
    emitter: Emitter<A>,
    event: Event<A>,
    args: Arc<A>,
    listeners: Vec<Entry<A>>,
    cursor: usize,
    done: Option<Done<A>>,
}

/// Where a [`Next`] leaves the dispatch state while its listener may still be
/// on the stack.
enum Handoff<A> {
    /// The listener has not returned yet and the continuation is unused
    Pending,
    /// Consumed before the listener returned; the loop picks it up
    Resumed(Box<Dispatch<A>>, Option<Error>),
    /// Dropped unused before the listener returned
    Dropped(Box<Dispatch<A>>),
    /// The listener returned; the continuation restarts the loop itself
    Detached,
}

type Slot<A> = Arc<Mutex<Handoff<A>>>;

/// Render a panic payload the way `std` prints it
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("listener panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("listener panicked: {s}")
    } else {
        "listener panicked".to_string()
    }
}

impl<A> Dispatch<A>
where
    A: Send + Sync + 'static,
{
    pub(crate) fn new(
        emitter: Emitter<A>,
        event: Event<A>,
        args: A,
        listeners: Vec<Entry<A>>,
        done: Option<Done<A>>,
    ) -> Box<Self> {
        Box::new(Self {
            emitter,
            event,
            args: Arc::new(args),
            listeners,
            cursor: 0,
            done,
        })
    }

    /// Advance until the snapshot is exhausted, a listener fails, propagation
    /// is stopped, or a continuation outlives its listener.
    pub(crate) fn run(self: Box<Self>, failure: Option<Error>) {
        let mut current = self;
        let mut failure = failure;
        loop {
            if let Some(err) = failure.take() {
                return current.finish(Some(err));
            }
            if current.event.is_propagation_stopped() {
                log::trace!(
                    "'{}' stopped after {} listener(s)",
                    current.event.name(),
                    current.cursor
                );
                return current.finish(None);
            }
            let Some(entry) = current.listeners.get(current.cursor).cloned() else {
                return current.finish(None);
            };
            let position = current.cursor;
            current.cursor += 1;

            if !current.emitter.consume_once(&entry) {
                continue;
            }

            log::trace!("'{}' -> listener #{}", current.event.name(), position + 1);
            match entry.listener.callback() {
                Callback::Sync(f) => {
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        f(&current.event, &*current.args)
                    }));
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => failure = Some(current.failure(position, err)),
                        Err(panic) => {
                            failure = Some(current.failure(position, panic_message(panic).into()))
                        }
                    }
                }
                Callback::WithNext(f) => {
                    let event = current.event.clone();
                    let args = Arc::clone(&current.args);
                    let slot: Slot<A> = Arc::new(Mutex::new(Handoff::Pending));
                    let next = Next::new(current, position, Arc::clone(&slot));
                    let panicked = catch_unwind(AssertUnwindSafe(move || f(&event, &*args, next)))
                        .err()
                        .map(panic_message);

                    let handoff = std::mem::replace(&mut *slot.lock(), Handoff::Detached);
                    match (handoff, panicked) {
                        (Handoff::Resumed(dispatch, resumed), None) => {
                            current = dispatch;
                            failure = resumed;
                        }
                        (Handoff::Resumed(dispatch, _), Some(message))
                        | (Handoff::Dropped(dispatch), Some(message)) => {
                            failure = Some(dispatch.failure(position, message.into()));
                            current = dispatch;
                        }
                        (Handoff::Dropped(dispatch), None) => {
                            log::warn!(
                                "listener #{} for '{}' dropped its continuation; dispatch abandoned",
                                position + 1,
                                dispatch.event.name()
                            );
                            return;
                        }
                        (Handoff::Pending, Some(message)) => {
                            log::warn!(
                                "{message} after handing off its continuation; the continuation still owns the dispatch"
                            );
                            return;
                        }
                        (Handoff::Pending, None) | (Handoff::Detached, _) => return,
                    }
                }
            }
        }
    }

    fn failure(&self, position: usize, err: BoxError) -> Error {
        Error::listener_failure(self.event.name(), err).with_position(position)
    }

    fn finish(self: Box<Self>, error: Option<Error>) {
        let Dispatch {
            emitter,
            event,
            args,
            done,
            ..
        } = *self;
        log::debug!(
            "'{}' finished{}",
            event.name(),
            if error.is_some() { " with error" } else { "" }
        );

        match done {
            Some(done) => done(Outcome { error, event, args }),
            None => {
                if let Some(err) = error {
                    if emitter.config().log_unhandled_errors {
                        log::warn!("unhandled: {}", err.user_message());
                    } else {
                        log::debug!("unhandled: {}", err.user_message());
                    }
                }
            }
        }
    }
}

/// Continuation handed to listeners registered with
/// [`Listener::with_next`](crate::Listener::with_next).
///
/// The dispatch is suspended until one of [`done`](Self::done),
/// [`fail`](Self::fail) or [`finish`](Self::finish) is called. Dropping it
/// instead leaves the dispatch stalled for good: the completion never runs.
pub struct Next<A = ()> {
    dispatch: Option<Box<Dispatch<A>>>,
    position: usize,
    slot: Slot<A>,
}

impl<A> Next<A>
where
    A: Send + Sync + 'static,
{
    fn new(dispatch: Box<Dispatch<A>>, position: usize, slot: Slot<A>) -> Self {
        Self {
            dispatch: Some(dispatch),
            position,
            slot,
        }
    }

    /// The listener completed successfully
    pub fn done(self) {
        self.finish(Ok(()));
    }

    /// The listener failed; remaining listeners are skipped
    pub fn fail<E: Into<BoxError>>(self, error: E) {
        self.finish(Err(error.into()));
    }

    pub fn finish(mut self, result: ListenerResult) {
        let Some(dispatch) = self.dispatch.take() else {
            return;
        };
        let failure = result.err().map(|err| dispatch.failure(self.position, err));

        let mut slot = self.slot.lock();
        if let Handoff::Pending = *slot {
            *slot = Handoff::Resumed(dispatch, failure);
            return;
        }
        drop(slot);
        dispatch.run(failure);
    }
}

impl<A> Drop for Next<A> {
    fn drop(&mut self) {
        let Some(dispatch) = self.dispatch.take() else {
            return;
        };
        let mut slot = self.slot.lock();
        if let Handoff::Pending = *slot {
            *slot = Handoff::Dropped(dispatch);
            return;
        }
        drop(slot);
        log::warn!(
            "listener #{} for '{}' dropped its continuation; dispatch abandoned",
            self.position + 1,
            dispatch.event.name()
        );
    }
}

impl<A> fmt::Debug for Next<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("pending", &self.dispatch.is_some())
            .finish()
    }
}

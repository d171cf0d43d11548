//! Event objects carried through a dispatch
//!
//! An [`Event`] is a shared handle: the emitter, every listener of one dispatch
//! and the completion all see the same name, back-reference and flags.
//!
//! Propagation stopping has to be opted into with [`Event::stoppable`] or
//! [`Event::into_stoppable`]. The prevent-default flag is independent of it and
//! available on every event.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::emitter::{Emitter, WeakEmitter};

/// A named event, optionally stoppable
pub struct Event<A = ()> {
    inner: Arc<EventInner<A>>,
}

struct EventInner<A> {
    name: String,
    stoppable: bool,
    stopped: AtomicBool,
    default_prevented: AtomicBool,
    emitter: Mutex<Option<WeakEmitter<A>>>,
    timestamp: DateTime<Utc>,
}

impl<A> EventInner<A> {
    fn new(name: String, stoppable: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            name,
            stoppable,
            stopped: AtomicBool::new(false),
            default_prevented: AtomicBool::new(false),
            emitter: Mutex::new(None),
            timestamp,
        }
    }
}

impl<A> Event<A> {
    /// Create a plain event. Its propagation cannot be stopped, but its
    /// default can still be prevented.
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            inner: Arc::new(EventInner::new(name.into(), false, Utc::now())),
        }
    }

    /// Create an event whose propagation can be stopped by a listener
    pub fn stoppable<N: Into<String>>(name: N) -> Self {
        Self {
            inner: Arc::new(EventInner::new(name.into(), true, Utc::now())),
        }
    }

    /// Turn this event into a stoppable one.
    ///
    /// If other handles to the event exist, a fresh stoppable event with the
    /// same name and timestamp is returned and the other handles keep
    /// observing the original.
    pub fn into_stoppable(mut self) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => {
                inner.stoppable = true;
                self
            }
            None => Self {
                inner: Arc::new(EventInner::new(
                    self.inner.name.clone(),
                    true,
                    self.inner.timestamp,
                )),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The emitter currently dispatching (or last dispatching) this event.
    ///
    /// Returns `None` before the first dispatch and once the emitter is gone.
    pub fn emitter(&self) -> Option<Emitter<A>> {
        self.inner
            .emitter
            .lock()
            .as_ref()
            .and_then(WeakEmitter::upgrade)
    }

    /// When the event object was created
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.inner.timestamp
    }

    pub fn is_stoppable(&self) -> bool {
        self.inner.stoppable
    }

    /// Stop the remaining listeners of the current dispatch from running.
    ///
    /// Returns `false` (and does nothing) on a plain event.
    pub fn stop_propagation(&self) -> bool {
        if !self.inner.stoppable {
            log::debug!("stop_propagation ignored: '{}' is not stoppable", self.name());
            return false;
        }
        self.inner.stopped.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.inner.stoppable && self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Mark the default action as prevented. Purely advisory; dispatch does
    /// not look at this flag.
    pub fn prevent_default(&self) {
        self.inner.default_prevented.store(true, Ordering::SeqCst);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.inner.default_prevented.load(Ordering::SeqCst)
    }

    /// Returns true if both handles refer to the same event object
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn bind(&self, emitter: WeakEmitter<A>) {
        *self.inner.emitter.lock() = Some(emitter);
    }
}

impl<A> Clone for Event<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.inner.name)
            .field("stoppable", &self.inner.stoppable)
            .field("stopped", &self.is_propagation_stopped())
            .field("default_prevented", &self.is_default_prevented())
            .field("timestamp", &self.inner.timestamp)
            .finish()
    }
}

impl<A> From<&str> for Event<A> {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl<A> From<String> for Event<A> {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl<A> From<&Event<A>> for Event<A> {
    fn from(event: &Event<A>) -> Self {
        event.clone()
    }
}

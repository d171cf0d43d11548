//! The emitter: listener registry plus the entry points into dispatch
//!
//! Registry state lives behind a `parking_lot::Mutex` that is only held for
//! bookkeeping and never while a listener or a completion runs, so listeners
//! may register, remove and emit (including the same name) reentrantly.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::EmitterConfig;
use crate::dispatch::{Dispatch, Done, Outcome};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::listener::Listener;

/// Reserved name whose listeners receive every emitted event
pub const WILDCARD: &str = "*";

/// A named-event emitter.
///
/// Cloning yields another handle to the same registry.
pub struct Emitter<A = ()> {
    shared: Arc<Shared<A>>,
}

struct Shared<A> {
    config: EmitterConfig,
    registry: Mutex<HashMap<String, Vec<Entry<A>>>>,
    next_id: AtomicU64,
}

/// Weak back-reference held by events
pub(crate) struct WeakEmitter<A>(Weak<Shared<A>>);

impl<A> WeakEmitter<A> {
    pub(crate) fn upgrade(&self) -> Option<Emitter<A>> {
        self.0.upgrade().map(|shared| Emitter { shared })
    }
}

/// One registration of a listener under one name
pub(crate) struct Entry<A> {
    pub(crate) id: u64,
    pub(crate) listener: Listener<A>,
    pub(crate) once: Option<Arc<OnceState>>,
}

/// Bookkeeping for `once` registrations, shared by every snapshot holding the entry
pub(crate) struct OnceState {
    key: String,
    fired: AtomicBool,
}

impl<A> Clone for Entry<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            listener: self.listener.clone(),
            once: self.once.clone(),
        }
    }
}

fn check_name(name: &str, operation: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::empty_name().with_operation(operation));
    }
    Ok(())
}

impl<A> Emitter<A>
where
    A: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config: config.validate(),
                registry: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.shared.config
    }

    // === Registration ===

    /// Append `listener` to the listeners of `name`.
    ///
    /// Registering under [`WILDCARD`] listens to every event.
    pub fn on(&self, name: &str, listener: Listener<A>) -> Result<&Self> {
        check_name(name, "on")?;
        self.insert(name, listener, None);
        Ok(self)
    }

    /// Listen to every event
    pub fn on_any(&self, listener: Listener<A>) -> &Self {
        self.insert(WILDCARD, listener, None);
        self
    }

    /// Register `listener` for the next emission of `name` only.
    ///
    /// The registration is removed before the listener runs, whether it then
    /// succeeds or fails.
    pub fn once(&self, name: &str, listener: Listener<A>) -> Result<&Self> {
        check_name(name, "once")?;
        let state = Arc::new(OnceState {
            key: name.to_string(),
            fired: AtomicBool::new(false),
        });
        self.insert(name, listener, Some(state));
        Ok(self)
    }

    /// Remove the first registration of `listener` under `name`.
    ///
    /// Unknown names and listeners are ignored.
    pub fn off(&self, name: &str, listener: &Listener<A>) -> Result<&Self> {
        check_name(name, "off")?;
        let mut registry = self.shared.registry.lock();
        if let Some(entries) = registry.get_mut(name) {
            if let Some(pos) = entries.iter().position(|e| e.listener.ptr_eq(listener)) {
                entries.remove(pos);
                log::trace!("removed listener from '{name}'");
            }
            if entries.is_empty() {
                registry.remove(name);
            }
        }
        Ok(self)
    }

    /// Remove every listener of `name`, or of every name when `None`
    pub fn remove_all_listeners(&self, name: Option<&str>) -> &Self {
        let mut registry = self.shared.registry.lock();
        match name {
            Some(name) => {
                registry.remove(name);
            }
            None => registry.clear(),
        }
        self
    }

    fn insert(&self, name: &str, listener: Listener<A>, once: Option<Arc<OnceState>>) {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut registry = self.shared.registry.lock();
            let entries = registry.entry(name.to_string()).or_default();
            entries.push(Entry { id, listener, once });
            entries.len()
        };
        if self.shared.config.exceeds_max_listeners(count) {
            log::warn!(
                "possible listener leak: {count} listeners on '{name}' (max {})",
                self.shared.config.max_listeners
            );
        }
    }

    /// Drop a fired `once` entry. Returns false if this entry already fired.
    pub(crate) fn consume_once(&self, entry: &Entry<A>) -> bool {
        let Some(state) = &entry.once else {
            return true;
        };
        if state.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        let mut registry = self.shared.registry.lock();
        if let Some(entries) = registry.get_mut(&state.key) {
            entries.retain(|e| e.id != entry.id);
            if entries.is_empty() {
                registry.remove(&state.key);
            }
        }
        true
    }

    // === Introspection ===

    /// Listeners registered directly under `name`, in registration order
    pub fn listeners(&self, name: &str) -> Vec<Listener<A>> {
        self.shared
            .registry
            .lock()
            .get(name)
            .map(|entries| entries.iter().map(|e| e.listener.clone()).collect())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.shared
            .registry
            .lock()
            .get(name)
            .map_or(0, |entries| entries.len())
    }

    /// Names with at least one listener, in no particular order
    pub fn event_names(&self) -> Vec<String> {
        self.shared
            .registry
            .lock()
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Wildcard listeners first, then those of `name`, both in registration order
    fn snapshot(&self, name: &str) -> Vec<Entry<A>> {
        let registry = self.shared.registry.lock();
        let mut entries = Vec::new();
        if let Some(any) = registry.get(WILDCARD) {
            entries.extend(any.iter().cloned());
        }
        if name != WILDCARD {
            if let Some(named) = registry.get(name) {
                entries.extend(named.iter().cloned());
            }
        }
        entries
    }

    // === Dispatch ===

    /// Emit an event without a completion.
    ///
    /// Listener failures are absorbed (and logged); only argument errors are
    /// returned.
    pub fn emit<E: Into<Event<A>>>(&self, event: E, args: A) -> Result<&Self> {
        self.start(event.into(), args, None)?;
        Ok(self)
    }

    /// Emit an event and call `done` once the dispatch finishes.
    ///
    /// `done` receives the first listener error (if any), the event and the
    /// original arguments. It runs on whichever thread finished the last
    /// listener, and never if a continuation is dropped unused.
    pub fn emit_with<E, F>(&self, event: E, args: A, done: F) -> Result<&Self>
    where
        E: Into<Event<A>>,
        F: FnOnce(Outcome<A>) + Send + 'static,
    {
        self.start(event.into(), args, Some(Box::new(done)))?;
        Ok(self)
    }

    /// Emit an event and wait for the dispatch to finish.
    ///
    /// Resolves with [`DispatchErrorKind::Abandoned`](crate::DispatchErrorKind::Abandoned)
    /// if a listener drops its continuation without calling it.
    pub async fn dispatch<E: Into<Event<A>>>(&self, event: E, args: A) -> Result<Outcome<A>> {
        let event = event.into();
        let name = event.name().to_string();
        let (tx, rx) = oneshot::channel();
        self.start(
            event,
            args,
            Some(Box::new(move |outcome: Outcome<A>| {
                let _ = tx.send(outcome);
            })),
        )?;
        rx.await.map_err(|_| Error::abandoned(&name))
    }

    /// Like [`dispatch`](Self::dispatch), but give up waiting after `limit`.
    ///
    /// The dispatch itself is not cancelled; a late continuation still runs
    /// the remaining listeners.
    pub async fn dispatch_timeout<E: Into<Event<A>>>(
        &self,
        event: E,
        args: A,
        limit: Duration,
    ) -> Result<Outcome<A>> {
        let event = event.into();
        let name = event.name().to_string();
        match tokio::time::timeout(limit, self.dispatch(event, args)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timed_out(&name, limit)),
        }
    }

    fn start(&self, event: Event<A>, args: A, done: Option<Done<A>>) -> Result<()> {
        let name = event.name();
        check_name(name, "emit")?;
        if name == WILDCARD && !self.shared.config.allow_wildcard_emit {
            return Err(Error::reserved_name(name).with_operation("emit"));
        }

        event.bind(self.downgrade());
        let listeners = self.snapshot(name);
        log::debug!("emitting '{name}' to {} listener(s)", listeners.len());

        Dispatch::new(self.clone(), event, args, listeners, done).run(None);
        Ok(())
    }

    pub(crate) fn downgrade(&self) -> WeakEmitter<A> {
        WeakEmitter(Arc::downgrade(&self.shared))
    }
}

impl<A> Emitter<A> {
    /// Returns true if both handles share one registry
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<A> Clone for Emitter<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A> Default for Emitter<A>
where
    A: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Emitter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.shared.registry.lock();
        let listeners: usize = registry.values().map(Vec::len).sum();
        f.debug_struct("Emitter")
            .field("names", &registry.len())
            .field("listeners", &listeners)
            .field("config", &self.shared.config)
            .finish()
    }
}

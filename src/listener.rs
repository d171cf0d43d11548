//! Listener handles
//!
//! A listener is registered in one of two explicit forms:
//!
//! - [`Listener::sync`] / [`Listener::infallible`]: complete as soon as the
//!   callback returns. An `Err` halts the dispatch.
//! - [`Listener::with_next`]: receive a [`Next`] continuation and complete
//!   when it is consumed, possibly later and from another thread.
//!
//! Handles are cheap to clone. Identity is the identity of the callback
//! allocation, which is what [`Emitter::off`](crate::Emitter::off) matches on.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::Next;
use crate::error::ListenerResult;
use crate::event::Event;

pub(crate) type SyncFn<A> = dyn Fn(&Event<A>, &A) -> ListenerResult + Send + Sync;
pub(crate) type NextFn<A> = dyn Fn(&Event<A>, &A, Next<A>) + Send + Sync;

pub(crate) enum Callback<A> {
    Sync(Arc<SyncFn<A>>),
    WithNext(Arc<NextFn<A>>),
}

/// A registered (or registrable) event callback
pub struct Listener<A = ()> {
    callback: Callback<A>,
}

impl<A: 'static> Listener<A> {
    /// A synchronous listener. Returning `Err` halts the dispatch and the
    /// error is handed to the completion.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Event<A>, &A) -> ListenerResult + Send + Sync + 'static,
    {
        Self {
            callback: Callback::Sync(Arc::new(f)),
        }
    }

    /// A synchronous listener that cannot fail
    pub fn infallible<F>(f: F) -> Self
    where
        F: Fn(&Event<A>, &A) + Send + Sync + 'static,
    {
        Self::sync(move |event, args| {
            f(event, args);
            Ok(())
        })
    }

    /// A listener that signals completion through its [`Next`] continuation.
    /// The dispatch does not advance until the continuation is consumed.
    pub fn with_next<F>(f: F) -> Self
    where
        F: Fn(&Event<A>, &A, Next<A>) + Send + Sync + 'static,
    {
        Self {
            callback: Callback::WithNext(Arc::new(f)),
        }
    }
}

impl<A> Listener<A> {
    pub fn is_async(&self) -> bool {
        matches!(self.callback, Callback::WithNext(_))
    }

    /// Returns true if both handles refer to the same listener
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    pub(crate) fn callback(&self) -> &Callback<A> {
        &self.callback
    }

    // Compare data pointers only; vtable pointers are not guaranteed unique.
    fn addr(&self) -> *const () {
        match &self.callback {
            Callback::Sync(f) => Arc::as_ptr(f) as *const (),
            Callback::WithNext(f) => Arc::as_ptr(f) as *const (),
        }
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(f) => Self::Sync(Arc::clone(f)),
            Self::WithNext(f) => Self::WithNext(Arc::clone(f)),
        }
    }
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            callback: self.callback.clone(),
        }
    }
}

impl<A> PartialEq for Listener<A> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<A> Eq for Listener<A> {}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("kind", &if self.is_async() { "with_next" } else { "sync" })
            .field("addr", &self.addr())
            .finish()
    }
}

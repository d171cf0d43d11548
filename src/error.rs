//! Error types and Result alias for chainemit
//!
//! Errors fall into three domains:
//! - argument errors, raised synchronously by registration and `emit`
//! - listener failures, only ever delivered through a completion
//! - dispatch errors, produced by the future-based helpers

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Boxed error type returned by listener callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by listener callbacks
pub type ListenerResult = std::result::Result<(), BoxError>;

/// Specific kinds of argument errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ArgumentErrorKind {
    #[error("Empty event name")]
    EmptyName,
    #[error("Reserved event name")]
    ReservedName,
}

/// Specific kinds of dispatch errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DispatchErrorKind {
    #[error("Continuation dropped without being called")]
    Abandoned,
    #[error("Dispatch timed out")]
    TimedOut,
}

/// The main error type
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A caller passed an argument that can never be valid
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        operation: Option<String>,
        kind: ArgumentErrorKind,
    },

    /// A listener returned an error or failed its continuation
    #[error("Listener failed on `{event}`: {message}")]
    ListenerFailure {
        message: String,
        event: String,
        position: Option<usize>,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The dispatch did not reach its completion
    #[error("Dispatch error on `{event}`: {message}")]
    Dispatch {
        message: String,
        event: String,
        kind: DispatchErrorKind,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// === Constructors ===

impl Error {
    /// Create a new argument error
    pub fn invalid_argument<M: Into<String>>(message: M, kind: ArgumentErrorKind) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            operation: None,
            kind,
        }
    }

    /// Argument error for an empty event name
    pub fn empty_name() -> Self {
        Self::invalid_argument("event name must not be empty", ArgumentErrorKind::EmptyName)
    }

    /// Argument error for a name that collides with a reserved name
    pub fn reserved_name(name: &str) -> Self {
        Self::invalid_argument(
            format!("`{name}` is reserved and cannot be emitted as an ordinary event"),
            ArgumentErrorKind::ReservedName,
        )
    }

    /// Wrap an error produced by a listener
    pub fn listener_failure<E: Into<BoxError>>(event: &str, error: E) -> Self {
        let source: Arc<dyn std::error::Error + Send + Sync> = Arc::from(error.into());
        Self::ListenerFailure {
            message: source.to_string(),
            event: event.to_string(),
            position: None,
            source,
        }
    }

    /// Create a new dispatch error
    pub fn dispatch<M: Into<String>>(message: M, event: &str, kind: DispatchErrorKind) -> Self {
        Self::Dispatch {
            message: message.into(),
            event: event.to_string(),
            kind,
        }
    }

    /// Dispatch error for a continuation that was dropped
    pub fn abandoned(event: &str) -> Self {
        Self::dispatch(
            "a listener dropped its continuation without calling it",
            event,
            DispatchErrorKind::Abandoned,
        )
    }

    /// Dispatch error for a timed out dispatch
    pub fn timed_out(event: &str, after: Duration) -> Self {
        Self::dispatch(
            format!("no completion after {} ms", after.as_millis()),
            event,
            DispatchErrorKind::TimedOut,
        )
    }
}

// === Contextual builder methods ===

impl Error {
    /// Add operation context to argument errors
    pub fn with_operation<O: Into<String>>(mut self, operation: O) -> Self {
        if let Self::InvalidArgument { operation: op, .. } = &mut self {
            *op = Some(operation.into());
        }
        self
    }

    /// Add the listener's position in the invocation list
    pub fn with_position(mut self, index: usize) -> Self {
        if let Self::ListenerFailure { position, .. } = &mut self {
            *position = Some(index);
        }
        self
    }
}

// === Type checking methods ===

impl Error {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    pub fn is_listener_failure(&self) -> bool {
        matches!(self, Self::ListenerFailure { .. })
    }

    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch { .. })
    }
}

// === Context accessor methods ===

impl Error {
    /// The bare message, without the domain prefix
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument { message, .. }
            | Self::ListenerFailure { message, .. }
            | Self::Dispatch { message, .. } => message,
        }
    }

    /// Name of the event being dispatched, if any
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::ListenerFailure { event, .. } | Self::Dispatch { event, .. } => Some(event),
            Self::InvalidArgument { .. } => None,
        }
    }

    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::InvalidArgument { operation, .. } => operation.as_deref(),
            _ => None,
        }
    }

    /// Position of the failing listener in the invocation list
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::ListenerFailure { position, .. } => *position,
            _ => None,
        }
    }

    pub fn argument_kind(&self) -> Option<ArgumentErrorKind> {
        match self {
            Self::InvalidArgument { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn dispatch_kind(&self) -> Option<DispatchErrorKind> {
        match self {
            Self::Dispatch { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Downcast the wrapped listener error
    pub fn listener_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::ListenerFailure { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Get a short message suitable for printing to end users
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument {
                message, operation, ..
            } => match operation {
                Some(op) => format!("Rejected `{op}`: {message}"),
                None => format!("Rejected: {message}"),
            },
            Self::ListenerFailure {
                message,
                event,
                position,
                ..
            } => match position {
                Some(index) => format!("Listener #{} for '{event}' failed: {message}", index + 1),
                None => format!("Listener for '{event}' failed: {message}"),
            },
            Self::Dispatch { message, event, .. } => {
                format!("Dispatch of '{event}' incomplete: {message}")
            }
        }
    }
}

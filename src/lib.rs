//! # chainemit - Sequential Named-Event Emitter
//!
//! A small publish/subscribe primitive:
//!
//! - Listeners are registered per event name, or under the [`WILDCARD`] name
//!   to receive every event
//! - One-shot listeners remove themselves before their first invocation
//! - Dispatch is strictly sequential; wildcard listeners run first
//! - Synchronous listeners and continuation-style listeners ([`Next`]) can be
//!   mixed freely; the walk only advances once the current listener completes
//! - The first listener error skips the rest and is handed to the completion
//! - Stoppable events let a listener end the walk early
//!
//! ## Example
//!
//! ```rust
//! use chainemit::prelude::*;
//!
//! let emitter: Emitter<u32> = Emitter::new();
//! emitter
//!     .on_any(Listener::infallible(|event, _| println!("saw {}", event.name())))
//!     .on("tick", Listener::sync(|_, n| {
//!         if *n > 3 {
//!             return Err("too many ticks".into());
//!         }
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! emitter
//!     .emit_with("tick", 5, |outcome| {
//!         assert!(outcome.error.is_some());
//!     })
//!     .unwrap();
//! ```

pub mod capability;
pub mod config;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod event;
pub mod format;
pub mod listener;

// Re-export commonly used types
pub use capability::Emits;
pub use config::EmitterConfig;
pub use dispatch::{Next, Outcome};
pub use emitter::{Emitter, WILDCARD};
pub use error::{
    ArgumentErrorKind, BoxError, DispatchErrorKind, Error, ListenerResult, Result,
};
pub use event::Event;
pub use listener::Listener;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::capability::Emits;
    pub use crate::config::EmitterConfig;
    pub use crate::dispatch::{Next, Outcome};
    pub use crate::emitter::{Emitter, WILDCARD};
    pub use crate::error::{Error, ListenerResult, Result};
    pub use crate::event::Event;
    pub use crate::listener::Listener;
}

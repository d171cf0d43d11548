//! Emitting capability for types that own an [`Emitter`]
//!
//! Instead of grafting emitter methods onto arbitrary objects, a type keeps an
//! emitter as a field and implements [`Emits`] by handing out a reference to
//! it. The provided methods then delegate and return the owner for chaining.
//!
//! ```rust
//! use chainemit::{Emits, Emitter, Listener};
//!
//! struct Document {
//!     title: String,
//!     events: Emitter<String>,
//! }
//!
//! impl Emits<String> for Document {
//!     fn as_emitter(&self) -> &Emitter<String> {
//!         &self.events
//!     }
//! }
//!
//! let doc = Document { title: "notes".into(), events: Emitter::new() };
//! doc.on("saved", Listener::infallible(|_, path: &String| println!("saved to {path}")))
//!     .unwrap()
//!     .emit("saved", format!("/tmp/{}.md", doc.title))
//!     .unwrap();
//! ```

use crate::dispatch::Outcome;
use crate::emitter::Emitter;
use crate::error::Result;
use crate::event::Event;
use crate::listener::Listener;

/// Something that can register listeners and emit events
pub trait Emits<A = ()>
where
    A: Send + Sync + 'static,
{
    /// The emitter backing this capability
    fn as_emitter(&self) -> &Emitter<A>;

    fn on(&self, name: &str, listener: Listener<A>) -> Result<&Self> {
        self.as_emitter().on(name, listener)?;
        Ok(self)
    }

    fn once(&self, name: &str, listener: Listener<A>) -> Result<&Self> {
        self.as_emitter().once(name, listener)?;
        Ok(self)
    }

    fn off(&self, name: &str, listener: &Listener<A>) -> Result<&Self> {
        self.as_emitter().off(name, listener)?;
        Ok(self)
    }

    fn emit<E: Into<Event<A>>>(&self, event: E, args: A) -> Result<&Self> {
        self.as_emitter().emit(event, args)?;
        Ok(self)
    }

    fn emit_with<E, F>(&self, event: E, args: A, done: F) -> Result<&Self>
    where
        E: Into<Event<A>>,
        F: FnOnce(Outcome<A>) + Send + 'static,
    {
        self.as_emitter().emit_with(event, args, done)?;
        Ok(self)
    }
}

impl<A> Emits<A> for Emitter<A>
where
    A: Send + Sync + 'static,
{
    fn as_emitter(&self) -> &Emitter<A> {
        self
    }
}

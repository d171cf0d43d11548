//! Emitter configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of listeners per event name before a leak warning is logged.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Per-emitter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EmitterConfig {
    /// Listeners per name before a warning is logged; `0` disables the check.
    pub max_listeners: usize,
    /// Allow `emit("*")`, delivered to wildcard listeners only.
    pub allow_wildcard_emit: bool,
    /// Log listener failures at `warn` when no completion was supplied.
    pub log_unhandled_errors: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            max_listeners: DEFAULT_MAX_LISTENERS,
            allow_wildcard_emit: false,
            log_unhandled_errors: true,
        }
    }
}

impl EmitterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_listeners(mut self, n: usize) -> Self {
        self.max_listeners = n;
        self
    }

    pub fn with_wildcard_emit(mut self, allow: bool) -> Self {
        self.allow_wildcard_emit = allow;
        self
    }

    pub fn with_unhandled_error_logging(mut self, log: bool) -> Self {
        self.log_unhandled_errors = log;
        self
    }

    /// Returns true when `count` listeners on one name should trigger a warning.
    pub fn exceeds_max_listeners(&self, count: usize) -> bool {
        self.max_listeners > 0 && count > self.max_listeners
    }

    /// Normalise the settings; an unbounded `max_listeners` means "off".
    pub fn validate(self) -> Self {
        let max_listeners = if self.max_listeners == usize::MAX {
            0
        } else {
            self.max_listeners
        };
        Self {
            max_listeners,
            ..self
        }
    }
}

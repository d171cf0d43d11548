//! Outcome formatting for human-readable output
//!
//! This module provides different formatters for finished dispatches:
//! - PrettyFormatter: Colorized, human-friendly output (default)
//! - PlainFormatter: Single-line, no color output for piping
//! - JsonFormatter: JSON output for machine consumption (feature gated)

use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dispatch::Outcome;

/// How a dispatch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OutcomeStatus {
    /// Every listener ran
    Completed,
    /// A listener stopped propagation
    Stopped,
    /// A listener failed
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Completed => "completed",
            OutcomeStatus::Stopped => "stopped",
            OutcomeStatus::Failed => "failed",
        }
    }
}

/// Payload-independent view of an [`Outcome`]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutcomeSummary {
    pub event: String,
    pub status: OutcomeStatus,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
    pub default_prevented: bool,
    pub timestamp: DateTime<Utc>,
}

impl<A> From<&Outcome<A>> for OutcomeSummary {
    fn from(outcome: &Outcome<A>) -> Self {
        let status = if outcome.error.is_some() {
            OutcomeStatus::Failed
        } else if outcome.stopped() {
            OutcomeStatus::Stopped
        } else {
            OutcomeStatus::Completed
        };
        Self {
            event: outcome.event.name().to_string(),
            status,
            error: outcome.error.as_ref().map(|e| e.message().to_string()),
            default_prevented: outcome.event.is_default_prevented(),
            timestamp: outcome.event.timestamp(),
        }
    }
}

/// Trait for formatting outcomes into strings
pub trait Formatter: Send + Sync {
    /// Format an outcome into a string for display
    fn format(&self, outcome: &OutcomeSummary) -> String;
}

/// Pretty formatter with colors
#[derive(Debug, Clone)]
pub struct PrettyFormatter {
    /// Whether to include timestamps
    pub show_timestamps: bool,
}

impl Default for PrettyFormatter {
    fn default() -> Self {
        Self {
            show_timestamps: true,
        }
    }
}

impl PrettyFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    fn format_status(&self, status: OutcomeStatus) -> ColoredString {
        match status {
            OutcomeStatus::Completed => "✓".green(),
            OutcomeStatus::Stopped => "■".yellow(),
            OutcomeStatus::Failed => "✗".red().bold(),
        }
    }

    fn format_timestamp(&self, timestamp: DateTime<Utc>) -> String {
        timestamp
            .format("%H:%M:%S%.3f")
            .to_string()
            .bright_black()
            .to_string()
    }
}

impl Formatter for PrettyFormatter {
    fn format(&self, outcome: &OutcomeSummary) -> String {
        let mut parts = Vec::new();

        if self.show_timestamps {
            parts.push(self.format_timestamp(outcome.timestamp));
        }

        parts.push(self.format_status(outcome.status).to_string());
        parts.push(outcome.event.bold().to_string());
        parts.push(outcome.status.as_str().to_string());

        if let Some(error) = &outcome.error {
            parts.push(format!("- {}", error.red()));
        }
        if outcome.default_prevented {
            parts.push("(default prevented)".bright_black().to_string());
        }

        parts.join(" ")
    }
}

/// Plain formatter for simple, non-colored output
#[derive(Debug, Clone, Default)]
pub struct PlainFormatter {
    /// Whether to include timestamps
    pub show_timestamps: bool,
}

impl PlainFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }
}

impl Formatter for PlainFormatter {
    fn format(&self, outcome: &OutcomeSummary) -> String {
        let mut parts = Vec::new();

        if self.show_timestamps {
            parts.push(outcome.timestamp.format("%H:%M:%S%.3f").to_string());
        }

        parts.push(outcome.status.as_str().to_uppercase());
        parts.push(outcome.event.clone());

        if let Some(error) = &outcome.error {
            parts.push(format!("error={error}"));
        }
        if outcome.default_prevented {
            parts.push("default_prevented".to_string());
        }

        parts.join(" ")
    }
}

/// JSON formatter for machine consumption (requires 'json' feature)
#[cfg(feature = "json")]
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    /// Whether to pretty-print JSON
    pub pretty: bool,
}

#[cfg(feature = "json")]
impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

#[cfg(feature = "json")]
impl Formatter for JsonFormatter {
    fn format(&self, outcome: &OutcomeSummary) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(outcome)
        } else {
            serde_json::to_string(outcome)
        };
        rendered.unwrap_or_else(|_| "{}".to_string())
    }
}

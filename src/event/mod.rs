//! Container events.
//!
//! Every container action is reported as exactly one [`Event`], delivered
//! synchronously to the configured [`EventSink`] in the order the actions
//! occur. Events are never queued or dropped; a slow sink slows the
//! container down, which is a cooperative contract the sink must honor.

mod log;

pub use log::TracingSink;

use std::time::Duration;

use serde::Serialize;

/// A structured record of one container action.
///
/// The enum is `non_exhaustive`: sinks must keep a default arm so that kinds
/// added later are rendered generically instead of rejected.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum Event {
    /// A constructor ran and its output was cached.
    Provided {
        constructor: String,
        module: Option<String>,
        type_name: String,
        error: Option<String>,
    },
    /// A pre-built value was placed into the cache.
    Supplied {
        type_name: String,
        module: Option<String>,
    },
    /// An invoke target is about to run.
    Invoking {
        function: String,
        module: Option<String>,
    },
    /// An invoke target finished (or its dependency build failed).
    Invoked {
        function: String,
        module: Option<String>,
        error: Option<String>,
    },
    OnStartExecuting {
        caller: String,
        function: String,
    },
    OnStartExecuted {
        caller: String,
        function: String,
        runtime: Duration,
        error: Option<String>,
    },
    OnStopExecuting {
        caller: String,
        function: String,
    },
    OnStopExecuted {
        caller: String,
        function: String,
        runtime: Duration,
        error: Option<String>,
    },
    /// Start finished; carries the terminal error if it failed.
    Started {
        error: Option<String>,
    },
    /// A shutdown signal was observed.
    Stopping {
        signal: String,
    },
    /// Stop finished; carries the first stop error, if any.
    Stopped {
        error: Option<String>,
    },
    /// A start hook failed; previously started hooks are being unwound.
    RollingBack {
        error: String,
    },
    /// Rollback finished; carries the first rollback error, if any.
    RolledBack {
        error: Option<String>,
    },
}

impl Event {
    /// Short tag naming the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Provided { .. } => "Provided",
            Event::Supplied { .. } => "Supplied",
            Event::Invoking { .. } => "Invoking",
            Event::Invoked { .. } => "Invoked",
            Event::OnStartExecuting { .. } => "OnStartExecuting",
            Event::OnStartExecuted { .. } => "OnStartExecuted",
            Event::OnStopExecuting { .. } => "OnStopExecuting",
            Event::OnStopExecuted { .. } => "OnStopExecuted",
            Event::Started { .. } => "Started",
            Event::Stopping { .. } => "Stopping",
            Event::Stopped { .. } => "Stopped",
            Event::RollingBack { .. } => "RollingBack",
            Event::RolledBack { .. } => "RolledBack",
            #[allow(unreachable_patterns)]
            _ => "Unhandled",
        }
    }

    /// The error carried by this event, if any. Sinks use this to pick a
    /// severity.
    pub fn error_text(&self) -> Option<&str> {
        match self {
            Event::Provided { error, .. }
            | Event::Invoked { error, .. }
            | Event::OnStartExecuted { error, .. }
            | Event::OnStopExecuted { error, .. }
            | Event::Started { error }
            | Event::Stopped { error }
            | Event::RolledBack { error } => error.as_deref(),
            Event::RollingBack { error } => Some(error),
            _ => None,
        }
    }
}

/// Observer for container events.
///
/// `handle` is called synchronously, once per action, in the exact order
/// actions occur. Implementations must not block for unbounded time.
pub trait EventSink: Send + Sync {
    fn handle(&self, event: &Event);
}

//! Default event sink backed by `tracing`.

use super::{Event, EventSink};

/// Renders each event as one structured log line.
///
/// Events that carry an error log at `error`, everything else at `info`.
/// Unrecognized kinds are logged generically rather than rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingSink {
    fn handle(&self, event: &Event) {
        match event {
            Event::Provided {
                constructor,
                module,
                type_name,
                error,
            } => match error {
                Some(err) => tracing::error!(
                    constructor = %constructor,
                    module = module.as_deref().unwrap_or(""),
                    r#type = %type_name,
                    error = %err,
                    "provide failed"
                ),
                None => tracing::info!(
                    constructor = %constructor,
                    module = module.as_deref().unwrap_or(""),
                    r#type = %type_name,
                    "provided"
                ),
            },
            Event::Supplied { type_name, module } => tracing::info!(
                r#type = %type_name,
                module = module.as_deref().unwrap_or(""),
                "supplied"
            ),
            Event::Invoking { function, module } => tracing::info!(
                function = %function,
                module = module.as_deref().unwrap_or(""),
                "invoking"
            ),
            Event::Invoked {
                function,
                module,
                error,
            } => match error {
                Some(err) => tracing::error!(
                    function = %function,
                    module = module.as_deref().unwrap_or(""),
                    error = %err,
                    "invoke failed"
                ),
                None => tracing::info!(
                    function = %function,
                    module = module.as_deref().unwrap_or(""),
                    "invoked"
                ),
            },
            Event::OnStartExecuting { caller, function } => tracing::info!(
                caller = %caller,
                function = %function,
                "OnStart hook executing"
            ),
            Event::OnStartExecuted {
                caller,
                function,
                runtime,
                error,
            } => match error {
                Some(err) => tracing::error!(
                    caller = %caller,
                    function = %function,
                    runtime = ?runtime,
                    error = %err,
                    "OnStart hook failed"
                ),
                None => tracing::info!(
                    caller = %caller,
                    function = %function,
                    runtime = ?runtime,
                    "OnStart hook executed"
                ),
            },
            Event::OnStopExecuting { caller, function } => tracing::info!(
                caller = %caller,
                function = %function,
                "OnStop hook executing"
            ),
            Event::OnStopExecuted {
                caller,
                function,
                runtime,
                error,
            } => match error {
                Some(err) => tracing::error!(
                    caller = %caller,
                    function = %function,
                    runtime = ?runtime,
                    error = %err,
                    "OnStop hook failed"
                ),
                None => tracing::info!(
                    caller = %caller,
                    function = %function,
                    runtime = ?runtime,
                    "OnStop hook executed"
                ),
            },
            Event::Started { error } => match error {
                Some(err) => tracing::error!(error = %err, "start failed"),
                None => tracing::info!("started"),
            },
            Event::Stopping { signal } => tracing::info!(signal = %signal, "stopping"),
            Event::Stopped { error } => match error {
                Some(err) => tracing::error!(error = %err, "stopped with error"),
                None => tracing::info!("stopped"),
            },
            Event::RollingBack { error } => {
                tracing::error!(error = %error, "rolling back due to start failure")
            }
            Event::RolledBack { error } => match error {
                Some(err) => tracing::error!(error = %err, "rollback failed"),
                None => tracing::info!("rolled back"),
            },
            #[allow(unreachable_patterns)]
            other => tracing::info!(kind = other.kind(), event = ?other, "container event"),
        }
    }
}

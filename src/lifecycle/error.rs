//! Lifecycle-specific error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Errors that can occur while starting or stopping the application.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// An `on_start` hook failed. Triggers rollback of every hook that
    /// already started.
    #[error("start hook {hook} failed: {source}")]
    StartHook { hook: String, source: anyhow::Error },

    /// An `on_stop` hook failed. Recorded, but remaining stop hooks still
    /// run.
    #[error("stop hook {hook} failed: {source}")]
    StopHook { hook: String, source: anyhow::Error },

    #[error("start deadline exceeded while running hook {hook}")]
    StartTimeout { hook: String },

    #[error("stop deadline exceeded while running hook {hook}")]
    StopTimeout { hook: String },

    /// The orchestrator was asked to do something its state machine does
    /// not allow, e.g. starting twice.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

//! Lifecycle orchestrator.
//!
//! Owns the registered hooks and drives them through the application state
//! machine: start hooks in registration order under a shared deadline, stop
//! hooks in exact reverse order, rollback of the started prefix when a start
//! hook fails.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout};

use super::error::{LifecycleError, Result};
use super::hook::Hook;
use crate::event::{Event, EventSink};

/// Application lifecycle state.
///
/// `StartFailed` is terminal and reachable only from `Starting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
    StartFailed,
}

impl AppState {
    pub fn name(&self) -> &'static str {
        match self {
            AppState::NotStarted => "not started",
            AppState::Starting => "starting",
            AppState::Running => "running",
            AppState::Stopping => "stopping",
            AppState::Stopped => "stopped",
            AppState::StartFailed => "start failed",
        }
    }
}

pub struct Orchestrator {
    hooks: Vec<Hook>,
    state: AppState,
    /// Number of leading hooks considered started; only these are unwound.
    started: usize,
    sink: Arc<dyn EventSink>,
}

impl Orchestrator {
    pub(crate) fn new(hooks: Vec<Hook>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            hooks,
            state: AppState::NotStarted,
            started: 0,
            sink,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Executes every registered `on_start` hook in registration order.
    ///
    /// Each hook is bounded by what remains of the shared `budget`. On the
    /// first failure or exhausted budget, hooks that already started are
    /// unwound in reverse order and the original error is returned; rollback
    /// errors are emitted through the sink, never substituted.
    pub async fn start(&mut self, budget: Duration) -> Result<()> {
        if self.state != AppState::NotStarted {
            return Err(LifecycleError::InvalidTransition {
                action: "start",
                state: self.state.name(),
            });
        }
        self.state = AppState::Starting;
        let deadline = Instant::now() + budget;

        for index in 0..self.hooks.len() {
            let caller = self.hooks[index].caller.clone();
            let function = self.hooks[index].start_function();
            let label = self.hooks[index].label();
            let Some(run) = self.hooks[index].on_start.take() else {
                // Nothing to execute counts as started: its on_stop still
                // participates in teardown.
                self.started = index + 1;
                continue;
            };

            self.sink.handle(&Event::OnStartExecuting {
                caller: caller.clone(),
                function: function.clone(),
            });
            let begin = Instant::now();
            let remaining = deadline.saturating_duration_since(begin);
            let outcome = timeout(remaining, run()).await;
            let runtime = begin.elapsed();

            match outcome {
                Ok(Ok(())) => {
                    self.sink.handle(&Event::OnStartExecuted {
                        caller,
                        function,
                        runtime,
                        error: None,
                    });
                    self.started = index + 1;
                }
                Ok(Err(source)) => {
                    self.sink.handle(&Event::OnStartExecuted {
                        caller,
                        function,
                        runtime,
                        error: Some(source.to_string()),
                    });
                    let err = LifecycleError::StartHook {
                        hook: label,
                        source,
                    };
                    self.rollback(&err).await;
                    return Err(err);
                }
                Err(_) => {
                    let err = LifecycleError::StartTimeout { hook: label };
                    self.sink.handle(&Event::OnStartExecuted {
                        caller,
                        function,
                        runtime,
                        error: Some(err.to_string()),
                    });
                    self.rollback(&err).await;
                    return Err(err);
                }
            }
        }

        self.state = AppState::Running;
        self.sink.handle(&Event::Started { error: None });
        Ok(())
    }

    /// Executes every `on_stop` hook in exact reverse registration order.
    ///
    /// A failing stop hook does not skip the ones after it; all failures are
    /// emitted and the first is returned. Calling `stop` when the
    /// application is not running is a no-op that still emits `Stopped`.
    pub async fn stop(&mut self, budget: Duration) -> Result<()> {
        if self.state != AppState::Running {
            self.sink.handle(&Event::Stopped { error: None });
            return Ok(());
        }
        self.state = AppState::Stopping;
        let deadline = Instant::now() + budget;

        let mut first_err: Option<LifecycleError> = None;
        for index in (0..self.started).rev() {
            if let Some(err) = self.run_stop_hook(index, Some(deadline)).await {
                first_err.get_or_insert(err);
            }
        }

        self.state = AppState::Stopped;
        self.sink.handle(&Event::Stopped {
            error: first_err.as_ref().map(|e| e.to_string()),
        });
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Unwinds the started prefix after a start failure.
    ///
    /// Runs without a deadline: the start budget may already be exhausted
    /// and teardown still has to happen.
    async fn rollback(&mut self, cause: &LifecycleError) {
        self.sink.handle(&Event::RollingBack {
            error: cause.to_string(),
        });

        let mut first_err: Option<String> = None;
        for index in (0..self.started).rev() {
            if let Some(err) = self.run_stop_hook(index, None).await {
                first_err.get_or_insert(err.to_string());
            }
        }

        self.sink.handle(&Event::RolledBack { error: first_err });
        self.state = AppState::StartFailed;
    }

    async fn run_stop_hook(
        &mut self,
        index: usize,
        deadline: Option<Instant>,
    ) -> Option<LifecycleError> {
        let caller = self.hooks[index].caller.clone();
        let function = self.hooks[index].stop_function();
        let label = self.hooks[index].label();
        let run = self.hooks[index].on_stop.take()?;

        self.sink.handle(&Event::OnStopExecuting {
            caller: caller.clone(),
            function: function.clone(),
        });
        let begin = Instant::now();
        let outcome = match deadline {
            Some(deadline) => {
                timeout(deadline.saturating_duration_since(begin), run()).await
            }
            None => Ok(run().await),
        };
        let runtime = begin.elapsed();

        match outcome {
            Ok(Ok(())) => {
                self.sink.handle(&Event::OnStopExecuted {
                    caller,
                    function,
                    runtime,
                    error: None,
                });
                None
            }
            Ok(Err(source)) => {
                self.sink.handle(&Event::OnStopExecuted {
                    caller,
                    function,
                    runtime,
                    error: Some(source.to_string()),
                });
                Some(LifecycleError::StopHook {
                    hook: label,
                    source,
                })
            }
            Err(_) => {
                let err = LifecycleError::StopTimeout { hook: label };
                self.sink.handle(&Event::OnStopExecuted {
                    caller,
                    function,
                    runtime,
                    error: Some(err.to_string()),
                });
                Some(err)
            }
        }
    }
}

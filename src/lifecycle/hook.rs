//! Lifecycle hooks and the registrar handed to constructors.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

pub(crate) type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
pub(crate) type HookFn = Box<dyn FnOnce() -> HookFuture + Send>;

/// An ordered pair of start/stop callables registered by a constructor.
///
/// Either side may be absent. Each callable runs at most once: execution
/// consumes it.
///
/// # Example
///
/// ```rust,ignore
/// cx.lifecycle().append(
///     Hook::named("serve")
///         .on_start(move || async move { listener.bind().await })
///         .on_stop(move || async move { server.shutdown().await }),
/// );
/// ```
pub struct Hook {
    pub(crate) caller: String,
    pub(crate) name: Option<String>,
    pub(crate) on_start: Option<HookFn>,
    pub(crate) on_stop: Option<HookFn>,
}

impl Default for Hook {
    fn default() -> Self {
        Self::new()
    }
}

impl Hook {
    pub fn new() -> Self {
        Self {
            caller: "anonymous".into(),
            name: None,
            on_start: None,
            on_stop: None,
        }
    }

    /// A hook with its own label, shown in events alongside the caller.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new()
        }
    }

    pub fn on_start<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_start = Some(Box::new(move || Box::pin(f())));
        self
    }

    pub fn on_stop<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on_stop = Some(Box::new(move || Box::pin(f())));
        self
    }

    /// Identifier used in lifecycle errors.
    pub(crate) fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{}::{}", self.caller, name),
            None => self.caller.clone(),
        }
    }

    pub(crate) fn start_function(&self) -> String {
        self.name.clone().unwrap_or_else(|| "on_start".into())
    }

    pub(crate) fn stop_function(&self) -> String {
        self.name.clone().unwrap_or_else(|| "on_stop".into())
    }
}

/// Registrar passed to constructors through the build context.
///
/// `append` records intent only: nothing executes until the orchestrator
/// starts. Hooks keep the global registration order across all constructors
/// invoked during resolution, which is exactly the order start hooks run in
/// and the reverse of the order stop hooks run in.
pub struct Lifecycle {
    hooks: Vec<Hook>,
    caller: Option<String>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            hooks: Vec::new(),
            caller: None,
        }
    }

    /// Appends one hook pair, tagged with the invoking constructor's name.
    pub fn append(&mut self, mut hook: Hook) {
        if let Some(caller) = &self.caller {
            hook.caller = caller.clone();
        }
        debug!(caller = %hook.caller, "registered lifecycle hook");
        self.hooks.push(hook);
    }

    /// Set while a constructor runs so its hooks carry the right tag.
    pub(crate) fn set_caller(&mut self, caller: Option<String>) {
        self.caller = caller;
    }

    pub(crate) fn into_hooks(self) -> Vec<Hook> {
        self.hooks
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

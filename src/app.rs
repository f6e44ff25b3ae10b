//! Application assembly and process supervision.
//!
//! [`AppBuilder`] collects providers and invoke targets; `build()` resolves
//! the object graph by running every invoke target in order, which is when
//! constructors execute and lifecycle hooks get registered. The resulting
//! [`App`] starts and stops the hooks through the orchestrator, and
//! [`App::run`] adds the process glue: start, block on SIGINT/SIGTERM, stop,
//! exit code.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::di::{
    BuildContext, Instance, InstanceCache, InvokeTarget, Provider, ProviderRegistry, Resolver,
    ServiceKey,
};
use crate::error::{ArmatureError, Result};
use crate::event::{Event, EventSink, TracingSink};
use crate::lifecycle::{self, AppState, Orchestrator, shutdown_signal};

pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Fluent builder for an [`App`].
///
/// # Example
///
/// ```rust,ignore
/// let app = App::builder()
///     .provide("new_server", &[ServiceKey::of::<Router>()], new_server)
///     .invoke("serve", &[ServiceKey::of::<HttpServer>()], |cx: &mut BuildContext| {
///         let _ = cx.get::<HttpServer>();
///         async {}
///     })
///     .build()
///     .await?;
/// std::process::exit(app.run().await);
/// ```
pub struct AppBuilder {
    registry: ProviderRegistry,
    invokes: Vec<InvokeTarget>,
    sink: Option<Arc<dyn EventSink>>,
    start_timeout: Duration,
    stop_timeout: Duration,
    current_module: Option<String>,
    /// First registration error; surfaced by `build()` so the fluent chain
    /// stays ergonomic.
    deferred: Option<DeferredError>,
}

struct DeferredError {
    constructor: String,
    module: Option<String>,
    type_name: &'static str,
    error: ArmatureError,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            invokes: Vec::new(),
            sink: None,
            start_timeout: DEFAULT_START_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            current_module: None,
            deferred: None,
        }
    }

    /// Registers a constructor for `T`.
    ///
    /// `dependencies` lists the parameter types in declaration order; the
    /// resolver constructs them first and the constructor reads them back
    /// through [`BuildContext::get`]. The constructor may also register
    /// lifecycle hooks via [`BuildContext::lifecycle`].
    pub fn provide<T, F>(
        self,
        name: impl Into<String>,
        dependencies: &[ServiceKey],
        constructor: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&mut BuildContext<'a>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let provider = Provider {
            key: ServiceKey::of::<T>(),
            dependencies: dependencies.to_vec(),
            constructor: Arc::new(move |cx| Ok(Arc::new(constructor(cx)?) as Instance)),
            fallible: true,
            name: name.into(),
            module: self.current_module.clone(),
            supplied: false,
        };
        self.register(provider)
    }

    /// Places a pre-built value into the graph as-is.
    pub fn supply<T>(self, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let key = ServiceKey::of::<T>();
        let instance: Instance = Arc::new(value);
        let provider = Provider {
            key,
            dependencies: vec![],
            constructor: Arc::new(move |_| Ok(Arc::clone(&instance))),
            fallible: false,
            name: format!("supply({})", key.type_name()),
            module: self.current_module.clone(),
            supplied: true,
        };
        self.register(provider)
    }

    /// Registers a side-effecting entry point.
    ///
    /// Invoke targets run during `build()`, in the order given, after their
    /// dependency types are resolved. They return nothing; errors must be
    /// handled inside the target.
    pub fn invoke<F, Fut>(
        mut self,
        name: impl Into<String>,
        dependencies: &[ServiceKey],
        target: F,
    ) -> Self
    where
        F: for<'a> FnOnce(&mut BuildContext<'a>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.invokes.push(InvokeTarget {
            name: name.into(),
            module: self.current_module.clone(),
            dependencies: dependencies.to_vec(),
            run: Box::new(move |cx| Box::pin(target(cx))),
        });
        self
    }

    /// Groups registrations under a module name, shown in events.
    pub fn module(mut self, name: impl Into<String>, register: impl FnOnce(Self) -> Self) -> Self {
        let previous = self.current_module.take();
        self.current_module = Some(name.into());
        let mut built = register(self);
        built.current_module = previous;
        built
    }

    /// Replaces the default [`TracingSink`].
    pub fn event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Resolves the graph by running every invoke target in order.
    ///
    /// # Errors
    /// Any registry or resolver error aborts the build; no partially
    /// constructed application is ever started.
    pub async fn build(self) -> Result<App> {
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingSink::new()) as Arc<dyn EventSink>);

        if let Some(deferred) = self.deferred {
            sink.handle(&Event::Provided {
                constructor: deferred.constructor,
                module: deferred.module,
                type_name: deferred.type_name.to_string(),
                error: Some(deferred.error.to_string()),
            });
            return Err(deferred.error);
        }

        let mut resolver = Resolver::new(self.registry, Arc::clone(&sink));
        for target in self.invokes {
            resolver.invoke(target).await?;
        }

        let (hooks, cache) = resolver.into_parts();
        tracing::debug!(hooks = hooks.len(), instances = cache.len(), "application graph built");
        Ok(App {
            orchestrator: Orchestrator::new(hooks, Arc::clone(&sink)),
            cache,
            sink,
            start_timeout: self.start_timeout,
            stop_timeout: self.stop_timeout,
        })
    }

    fn register(mut self, provider: Provider) -> Self {
        let constructor = provider.name.clone();
        let module = provider.module.clone();
        let type_name = provider.key.type_name();
        if let Err(error) = self.registry.register(provider) {
            self.deferred.get_or_insert(DeferredError {
                constructor,
                module,
                type_name,
                error,
            });
        }
        self
    }
}

/// A fully resolved application: the instantiated object graph plus its
/// lifecycle orchestrator.
pub struct App {
    orchestrator: Orchestrator,
    cache: InstanceCache,
    sink: Arc<dyn EventSink>,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("state", &self.orchestrator.state())
            .field("start_timeout", &self.start_timeout)
            .field("stop_timeout", &self.stop_timeout)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn state(&self) -> AppState {
        self.orchestrator.state()
    }

    /// Reads a constructed instance out of the graph, if present.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let instance = self.cache.get(&ServiceKey::of::<T>())?;
        Arc::clone(instance.value()).downcast::<T>().ok()
    }

    /// Runs every start hook in registration order under the configured
    /// budget. See [`Orchestrator::start`] for rollback semantics.
    pub async fn start(&mut self) -> lifecycle::Result<()> {
        self.orchestrator.start(self.start_timeout).await
    }

    /// Runs every stop hook in reverse registration order under the
    /// configured budget. Idempotent.
    pub async fn stop(&mut self) -> lifecycle::Result<()> {
        self.orchestrator.stop(self.stop_timeout).await
    }

    /// Starts the application, blocks until SIGINT or SIGTERM, then stops
    /// it. Returns the process exit code: 0 on a clean start-then-stop, 1
    /// if either phase failed.
    pub async fn run(mut self) -> i32 {
        if let Err(err) = self.start().await {
            tracing::error!(error = %err, "failed to start application");
            return 1;
        }

        let signal = shutdown_signal().await;
        self.sink.handle(&Event::Stopping {
            signal: signal.into(),
        });

        if let Err(err) = self.stop().await {
            tracing::error!(error = %err, "failed to stop application");
            return 1;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::test_support::RecordingSink;
    use crate::lifecycle::Hook;
    use std::sync::Mutex;

    struct Config {
        greeting: &'static str,
    }

    struct Greeter {
        line: String,
    }

    #[tokio::test]
    async fn build_resolves_supplied_and_provided() {
        let app = App::builder()
            .supply(Config { greeting: "hello" })
            .provide(
                "new_greeter",
                &[ServiceKey::of::<Config>()],
                |cx: &mut BuildContext| {
                    let config = cx.get::<Config>()?;
                    Ok(Greeter {
                        line: format!("{} world", config.greeting),
                    })
                },
            )
            .invoke(
                "greet",
                &[ServiceKey::of::<Greeter>()],
                |cx: &mut BuildContext| {
                    let greeter = cx.get::<Greeter>();
                    async move {
                        if let Ok(greeter) = greeter {
                            tracing::info!(line = %greeter.line, "greeting");
                        }
                    }
                },
            )
            .build()
            .await
            .unwrap();

        assert_eq!(app.get::<Greeter>().unwrap().line, "hello world");
        assert_eq!(app.state(), AppState::NotStarted);
    }

    #[tokio::test]
    async fn duplicate_provider_fails_the_build() {
        let err = App::builder()
            .supply(Config { greeting: "a" })
            .supply(Config { greeting: "b" })
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, ArmatureError::DuplicateProvider { .. }));
    }

    #[tokio::test]
    async fn missing_invoke_dependency_fails_the_build() {
        let err = App::builder()
            .invoke(
                "greet",
                &[ServiceKey::of::<Greeter>()],
                |_: &mut BuildContext| async {},
            )
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, ArmatureError::UnknownType { .. }));
    }

    #[tokio::test]
    async fn full_start_stop_cycle_through_hooks() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let ctor_order = Arc::clone(&order);

        let mut app = App::builder()
            .provide("new_greeter", &[], move |cx: &mut BuildContext| {
                let start_order = Arc::clone(&ctor_order);
                let stop_order = Arc::clone(&ctor_order);
                cx.lifecycle().append(
                    Hook::new()
                        .on_start(move || async move {
                            start_order.lock().unwrap().push("start");
                            Ok(())
                        })
                        .on_stop(move || async move {
                            stop_order.lock().unwrap().push("stop");
                            Ok(())
                        }),
                );
                Ok(Greeter { line: "hi".into() })
            })
            .invoke(
                "main",
                &[ServiceKey::of::<Greeter>()],
                |_: &mut BuildContext| async {},
            )
            .build()
            .await
            .unwrap();

        app.start().await.unwrap();
        assert_eq!(app.state(), AppState::Running);
        app.stop().await.unwrap();
        assert_eq!(app.state(), AppState::Stopped);

        assert_eq!(*order.lock().unwrap(), ["start", "stop"]);
    }

    #[tokio::test]
    async fn events_flow_through_a_custom_sink() {
        let sink = Arc::new(RecordingSink::new());

        struct SharedSink(Arc<RecordingSink>);
        impl EventSink for SharedSink {
            fn handle(&self, event: &Event) {
                self.0.handle(event);
            }
        }

        let mut app = App::builder()
            .event_sink(SharedSink(Arc::clone(&sink)))
            .supply(Config { greeting: "hi" })
            .invoke(
                "main",
                &[ServiceKey::of::<Config>()],
                |_: &mut BuildContext| async {},
            )
            .build()
            .await
            .unwrap();
        app.start().await.unwrap();
        app.stop().await.unwrap();

        assert_eq!(
            sink.kinds(),
            ["Invoking", "Supplied", "Invoked", "Started", "Stopped"]
        );
    }

    #[tokio::test]
    async fn modules_tag_their_providers() {
        let sink = Arc::new(RecordingSink::new());

        struct SharedSink(Arc<RecordingSink>);
        impl EventSink for SharedSink {
            fn handle(&self, event: &Event) {
                self.0.handle(event);
            }
        }

        let _app = App::builder()
            .event_sink(SharedSink(Arc::clone(&sink)))
            .module("config", |builder| builder.supply(Config { greeting: "hi" }))
            .invoke(
                "main",
                &[ServiceKey::of::<Config>()],
                |_: &mut BuildContext| async {},
            )
            .build()
            .await
            .unwrap();

        let supplied = sink
            .events()
            .into_iter()
            .find(|event| event.kind() == "Supplied")
            .unwrap();
        match supplied {
            Event::Supplied { module, .. } => assert_eq!(module.as_deref(), Some("config")),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

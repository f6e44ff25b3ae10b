//! Depth-first graph resolution.
//!
//! The resolver turns the provider registry into live instances: it walks
//! the declared dependency types depth-first, memoizes every constructed
//! value as a shared singleton, and hands each constructor a
//! [`BuildContext`] through which it reads its dependencies and registers
//! lifecycle hooks. Resolution is single-threaded; the cache and the hook
//! registry are only mutated here, before the application starts.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::di::key::ServiceKey;
use crate::di::provider::Provider;
use crate::di::registry::ProviderRegistry;
use crate::error::{ArmatureError, Result};
use crate::event::{Event, EventSink};
use crate::lifecycle::{Hook, Lifecycle};

pub(crate) type Instance = Arc<dyn Any + Send + Sync>;
pub(crate) type InstanceCache = DashMap<ServiceKey, Instance>;

pub(crate) type InvokeFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A side-effecting entry point: dependency-typed parameters, no return
/// value. Errors are handled inside the target; they cannot propagate
/// through this boundary.
pub(crate) struct InvokeTarget {
    pub name: String,
    pub module: Option<String>,
    pub dependencies: Vec<ServiceKey>,
    pub run: Box<dyn for<'a> FnOnce(&mut BuildContext<'a>) -> InvokeFuture + Send>,
}

/// What a constructor sees while it runs: its already-resolved
/// dependencies and the lifecycle registrar.
pub struct BuildContext<'a> {
    cache: &'a InstanceCache,
    lifecycle: &'a mut Lifecycle,
    caller: &'a str,
}

impl<'a> BuildContext<'a> {
    /// Reads a resolved dependency from the instance cache.
    ///
    /// Only types the surrounding provider declared (and the resolver has
    /// therefore already constructed) are served; asking for anything else
    /// fails with [`ArmatureError::UnknownType`] instead of silently
    /// extending the graph.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let key = ServiceKey::of::<T>();
        let instance = self
            .cache
            .get(&key)
            .ok_or_else(|| ArmatureError::UnknownType {
                type_name: key.type_name(),
                required_by: Some(self.caller.to_string()),
            })?;
        Ok(Arc::clone(instance.value())
            .downcast::<T>()
            .expect("instance cache holds a mismatched type; this is a bug in armature"))
    }

    /// The lifecycle registrar, tagged with the invoking constructor's
    /// name. Hooks appended here execute only once the orchestrator
    /// starts.
    pub fn lifecycle(&mut self) -> &mut Lifecycle {
        self.lifecycle
    }
}

pub(crate) struct Resolver {
    registry: ProviderRegistry,
    cache: InstanceCache,
    lifecycle: Lifecycle,
    sink: Arc<dyn EventSink>,
    /// DFS path of the in-flight resolution, for cycle reporting.
    resolving: Vec<ServiceKey>,
}

impl Resolver {
    pub fn new(registry: ProviderRegistry, sink: Arc<dyn EventSink>) -> Self {
        Self {
            registry,
            cache: DashMap::new(),
            lifecycle: Lifecycle::new(),
            sink,
            resolving: Vec::new(),
        }
    }

    /// Runs one invoke target: resolves its dependency types in declaration
    /// order, then executes the target with a build context.
    pub async fn invoke(&mut self, target: InvokeTarget) -> Result<()> {
        self.sink.handle(&Event::Invoking {
            function: target.name.clone(),
            module: target.module.clone(),
        });

        for dep in &target.dependencies {
            if let Err(err) = self.resolve_key(dep, Some(target.name.as_str())) {
                self.sink.handle(&Event::Invoked {
                    function: target.name.clone(),
                    module: target.module.clone(),
                    error: Some(err.to_string()),
                });
                return Err(err);
            }
        }

        self.lifecycle.set_caller(Some(target.name.clone()));
        let future = {
            let mut cx = BuildContext {
                cache: &self.cache,
                lifecycle: &mut self.lifecycle,
                caller: &target.name,
            };
            (target.run)(&mut cx)
        };
        future.await;
        self.lifecycle.set_caller(None);

        self.sink.handle(&Event::Invoked {
            function: target.name,
            module: target.module,
            error: None,
        });
        Ok(())
    }

    /// Resolves `key`, constructing every transitive dependency exactly
    /// once.
    fn resolve_key(&mut self, key: &ServiceKey, required_by: Option<&str>) -> Result<Instance> {
        if let Some(cached) = self.cache.get(key) {
            trace!(key = %key, "cache hit");
            return Ok(Arc::clone(cached.value()));
        }

        if self.resolving.contains(key) {
            return Err(ArmatureError::CyclicDependency {
                cycle: self.cycle_chain(key),
            });
        }

        let provider = self.registry.lookup(key, required_by)?.clone();
        self.resolving.push(*key);
        let result = self.construct(&provider);
        self.resolving.pop();
        result
    }

    fn construct(&mut self, provider: &Provider) -> Result<Instance> {
        // Declaration order fixes hook registration order.
        for dep in &provider.dependencies {
            self.resolve_key(dep, Some(provider.name.as_str()))?;
        }

        self.lifecycle.set_caller(Some(provider.name.clone()));
        let produced = {
            let mut cx = BuildContext {
                cache: &self.cache,
                lifecycle: &mut self.lifecycle,
                caller: &provider.name,
            };
            (provider.constructor)(&mut cx)
        };
        self.lifecycle.set_caller(None);

        match produced {
            Ok(instance) => {
                self.cache.insert(provider.key, Arc::clone(&instance));
                self.sink.handle(&if provider.supplied {
                    Event::Supplied {
                        type_name: provider.key.type_name().to_string(),
                        module: provider.module.clone(),
                    }
                } else {
                    Event::Provided {
                        constructor: provider.name.clone(),
                        module: provider.module.clone(),
                        type_name: provider.key.type_name().to_string(),
                        error: None,
                    }
                });
                Ok(instance)
            }
            Err(source) => {
                self.sink.handle(&Event::Provided {
                    constructor: provider.name.clone(),
                    module: provider.module.clone(),
                    type_name: provider.key.type_name().to_string(),
                    error: Some(source.to_string()),
                });
                Err(ArmatureError::Construction {
                    constructor: provider.name.clone(),
                    source,
                })
            }
        }
    }

    fn cycle_chain(&self, key: &ServiceKey) -> String {
        let start = self
            .resolving
            .iter()
            .position(|k| k == key)
            .unwrap_or(0);
        let mut chain: Vec<&str> = self.resolving[start..]
            .iter()
            .map(|k| k.type_name())
            .collect();
        chain.push(key.type_name());
        chain.join(" -> ")
    }

    #[cfg(test)]
    pub fn cached<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let instance = self.cache.get(&ServiceKey::of::<T>())?;
        Arc::clone(instance.value()).downcast::<T>().ok()
    }

    #[cfg(test)]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn into_parts(self) -> (Vec<Hook>, InstanceCache) {
        (self.lifecycle.into_hooks(), self.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::test_support::RecordingSink;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct A(String);
    struct B(String);
    struct C;

    fn provider<T, F>(name: &str, dependencies: Vec<ServiceKey>, ctor: F) -> Provider
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&mut BuildContext<'a>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Provider {
            key: ServiceKey::of::<T>(),
            dependencies,
            constructor: Arc::new(move |cx| Ok(Arc::new(ctor(cx)?) as Instance)),
            fallible: true,
            name: name.into(),
            module: None,
            supplied: false,
        }
    }

    fn resolver(providers: Vec<Provider>, sink: Arc<RecordingSink>) -> Resolver {
        let mut registry = ProviderRegistry::new();
        for p in providers {
            registry.register(p).unwrap();
        }
        Resolver::new(registry, sink)
    }

    fn target(name: &str, dependencies: Vec<ServiceKey>) -> InvokeTarget {
        InvokeTarget {
            name: name.into(),
            module: None,
            dependencies,
            run: Box::new(|_| Box::pin(async {})),
        }
    }

    #[tokio::test]
    async fn resolves_dependency_chain_and_caches() {
        let sink = Arc::new(RecordingSink::new());
        let mut resolver = resolver(
            vec![
                provider("new_a", vec![], |_| Ok(A("a".into()))),
                provider("new_b", vec![ServiceKey::of::<A>()], |cx| {
                    let a = cx.get::<A>()?;
                    Ok(B(format!("{}b", a.0)))
                }),
            ],
            Arc::clone(&sink),
        );

        resolver
            .invoke(target("f", vec![ServiceKey::of::<B>()]))
            .await
            .unwrap();

        assert_eq!(resolver.cached::<A>().unwrap().0, "a");
        assert_eq!(resolver.cached::<B>().unwrap().0, "ab");
        assert_eq!(resolver.cache_len(), 2);

        // Dependency-first event order, then the invoke bracket.
        assert_eq!(sink.kinds(), ["Invoking", "Provided", "Provided", "Invoked"]);
        let events = sink.events();
        match (&events[1], &events[2]) {
            (
                Event::Provided { constructor: first, .. },
                Event::Provided { constructor: second, .. },
            ) => {
                assert_eq!(first, "new_a");
                assert_eq!(second, "new_b");
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn providers_invoked_at_most_once() {
        let invocations = Arc::new(AtomicU32::new(0));
        let sink = Arc::new(RecordingSink::new());
        let counter = Arc::clone(&invocations);

        // Diamond: B and C both depend on A; the target depends on both.
        let mut resolver = resolver(
            vec![
                provider("new_a", vec![], move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(A("a".into()))
                }),
                provider("new_b", vec![ServiceKey::of::<A>()], |cx| {
                    cx.get::<A>()?;
                    Ok(B("b".into()))
                }),
                provider("new_c", vec![ServiceKey::of::<A>()], |cx| {
                    cx.get::<A>()?;
                    Ok(C)
                }),
            ],
            sink,
        );

        resolver
            .invoke(target(
                "f",
                vec![ServiceKey::of::<B>(), ServiceKey::of::<C>()],
            ))
            .await
            .unwrap();
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cycle_fails_without_running_constructors() {
        let invocations = Arc::new(AtomicU32::new(0));
        let sink = Arc::new(RecordingSink::new());
        let a_count = Arc::clone(&invocations);
        let b_count = Arc::clone(&invocations);

        let mut resolver = resolver(
            vec![
                provider("new_a", vec![ServiceKey::of::<B>()], move |_| {
                    a_count.fetch_add(1, Ordering::SeqCst);
                    Ok(A("a".into()))
                }),
                provider("new_b", vec![ServiceKey::of::<A>()], move |_| {
                    b_count.fetch_add(1, Ordering::SeqCst);
                    Ok(B("b".into()))
                }),
            ],
            sink,
        );

        let err = resolver
            .invoke(target("f", vec![ServiceKey::of::<A>()]))
            .await
            .unwrap_err();
        match err {
            ArmatureError::CyclicDependency { cycle } => {
                assert!(cycle.contains("A"));
                assert!(cycle.contains("B"));
            }
            other => panic!("expected cycle error, got {other}"),
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn construction_failure_aborts_resolution() {
        let sink = Arc::new(RecordingSink::new());
        let mut resolver = resolver(
            vec![
                provider("new_a", vec![], |_| Ok(A("a".into()))),
                provider("new_b", vec![ServiceKey::of::<A>()], |_| {
                    Err::<B, _>(anyhow!("connection refused"))
                }),
            ],
            Arc::clone(&sink),
        );

        let err = resolver
            .invoke(target("f", vec![ServiceKey::of::<B>()]))
            .await
            .unwrap_err();
        assert!(matches!(err, ArmatureError::Construction { .. }));
        assert!(err.to_string().contains("new_b"));

        // A stays cached but the failed B is not.
        assert!(resolver.cached::<A>().is_some());
        assert!(resolver.cached::<B>().is_none());

        // The failed provide and the failed invoke are both emitted.
        assert_eq!(sink.kinds(), ["Invoking", "Provided", "Provided", "Invoked"]);
        let events = sink.events();
        assert!(events[2].error_text().unwrap().contains("connection refused"));
        assert!(events[3].error_text().is_some());
    }

    #[tokio::test]
    async fn unknown_dependency_names_the_requester() {
        let sink = Arc::new(RecordingSink::new());
        let mut resolver = resolver(
            vec![provider("new_b", vec![ServiceKey::of::<A>()], |cx| {
                let a = cx.get::<A>()?;
                Ok(B(a.0.clone()))
            })],
            sink,
        );

        let err = resolver
            .invoke(target("f", vec![ServiceKey::of::<B>()]))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("A"));
        assert!(message.contains("new_b"));
    }

    #[tokio::test]
    async fn repeated_requests_share_one_instance() {
        let sink = Arc::new(RecordingSink::new());
        let mut resolver = resolver(
            vec![provider("new_a", vec![], |_| Ok(A("a".into())))],
            Arc::clone(&sink),
        );

        resolver
            .invoke(target("f", vec![ServiceKey::of::<A>()]))
            .await
            .unwrap();
        resolver
            .invoke(target("g", vec![ServiceKey::of::<A>()]))
            .await
            .unwrap();

        // One Provided despite two invokes touching A.
        let provides = sink
            .kinds()
            .iter()
            .filter(|kind| **kind == "Provided")
            .count();
        assert_eq!(provides, 1);
    }

    #[tokio::test]
    async fn hooks_registered_during_construction_keep_order() {
        let sink = Arc::new(RecordingSink::new());
        let mut resolver = resolver(
            vec![
                provider("new_a", vec![], |cx| {
                    cx.lifecycle().append(Hook::new());
                    Ok(A("a".into()))
                }),
                provider("new_b", vec![ServiceKey::of::<A>()], |cx| {
                    cx.lifecycle().append(Hook::new());
                    Ok(B("b".into()))
                }),
            ],
            sink,
        );

        resolver
            .invoke(target("f", vec![ServiceKey::of::<B>()]))
            .await
            .unwrap();

        let (hooks, _) = resolver.into_parts();
        let callers: Vec<String> = hooks.into_iter().map(|hook| hook.caller).collect();
        assert_eq!(callers, ["new_a", "new_b"]);
    }
}

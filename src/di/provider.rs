//! Provider metadata.
//!
//! A [`Provider`] records everything the resolver needs to know about one
//! registered constructor: what it produces, what it consumes, and how to
//! invoke it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::di::key::ServiceKey;
use crate::di::resolver::BuildContext;

/// Type-erased constructor function.
///
/// The constructor receives a [`BuildContext`] through which it reads its
/// already-resolved dependencies and registers lifecycle hooks. The produced
/// value is cached as a shared singleton.
///
/// # Why `Arc` and not `Box`?
/// Providers are cloned out of the registry during resolution so the
/// registry stays borrowable while the constructor runs.
pub type ConstructorFn = Arc<
    dyn for<'a> Fn(&mut BuildContext<'a>) -> anyhow::Result<Arc<dyn Any + Send + Sync>>
        + Send
        + Sync,
>;

/// A registered constructor plus its declared dependency and output types.
#[derive(Clone)]
pub struct Provider {
    /// The type this provider produces.
    pub key: ServiceKey,
    /// Dependency types, in declaration order. Declaration order fixes the
    /// order in which transitive constructors run, and therefore the global
    /// hook registration order.
    pub dependencies: Vec<ServiceKey>,
    pub constructor: ConstructorFn,
    /// Whether construction can fail. Supplied values cannot.
    pub fallible: bool,
    /// Human-readable constructor name, used in events and errors.
    pub name: String,
    /// Owning module, if the provider was registered inside a module group.
    pub module: Option<String>,
    /// True for pre-built values handed to the container as-is.
    pub supplied: bool,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("module", &self.module)
            .field("fallible", &self.fallible)
            .field("supplied", &self.supplied)
            .finish()
    }
}

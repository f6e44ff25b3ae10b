//! Provider registry.
//!
//! Maps each output [`ServiceKey`] to the single [`Provider`] that produces
//! it. The registry is populated through the application builder and becomes
//! read-only once resolution begins.

use std::collections::HashMap;

use tracing::debug;

use crate::di::key::ServiceKey;
use crate::di::provider::Provider;
use crate::error::{ArmatureError, Result};

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ServiceKey, Provider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a provider.
    ///
    /// # Errors
    /// Returns [`ArmatureError::DuplicateProvider`] if the output type is
    /// already registered. Silent overwrite would make the graph depend on
    /// registration order, so it is rejected.
    pub fn register(&mut self, provider: Provider) -> Result<()> {
        let key = provider.key;
        if self.providers.contains_key(&key) {
            return Err(ArmatureError::DuplicateProvider {
                type_name: key.type_name(),
            });
        }
        debug!(key = %key, constructor = %provider.name, "registered provider");
        self.providers.insert(key, provider);
        Ok(())
    }

    /// Looks up the provider for `key`.
    ///
    /// # Errors
    /// Returns [`ArmatureError::UnknownType`] naming the requesting
    /// constructor when the type was never registered.
    pub fn lookup(&self, key: &ServiceKey, required_by: Option<&str>) -> Result<&Provider> {
        self.providers.get(key).ok_or_else(|| ArmatureError::UnknownType {
            type_name: key.type_name(),
            required_by: required_by.map(String::from),
        })
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

//! Adapter seam between resource providers and the stores.
//!
//! A provider builds `ResourceDef` and `Resource` values directly; nothing
//! here inspects host types at runtime.

use crate::model::{ResourceDef, Resource};
use crate::store::{InstanceStore, StoreError};
use thiserror::Error;

/// Source of schema and instance data for one or more resource kinds.
pub trait ResourceProvider {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Definitions for every kind this provider emits.
    fn definitions(&self) -> Vec<ResourceDef>;

    /// Instances to store. Called after all definitions are registered.
    fn resources(&self) -> Result<Vec<Resource>, ProviderError>;
}

/// Failure reported by a provider while producing resources.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Errors that abort a load before validation begins.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("provider '{provider}' produced an invalid resource: {source}")]
    Store {
        provider: String,
        #[source]
        source: StoreError,
    },
}

/// Counts reported after a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub definitions: usize,
    pub resources: usize,
}

/// Register every provider's definitions, then store every provider's resources.
///
/// Definitions go first so resources may link across providers.
pub fn load_providers(
    store: &mut InstanceStore,
    providers: &[&dyn ResourceProvider],
) -> Result<LoadStats, LoadError> {
    let mut stats = LoadStats::default();

    for provider in providers {
        for def in provider.definitions() {
            store.schemas_mut().put(def);
            stats.definitions += 1;
        }
    }

    for provider in providers {
        let resources = provider.resources().map_err(|source| LoadError::Provider {
            provider: provider.name().to_string(),
            source,
        })?;
        let count = resources.len();
        for resource in resources {
            store
                .put_resource(resource)
                .map_err(|source| LoadError::Store {
                    provider: provider.name().to_string(),
                    source,
                })?;
        }
        tracing::debug!(provider = provider.name(), resources = count, "loaded provider");
        stats.resources += count;
    }

    Ok(stats)
}

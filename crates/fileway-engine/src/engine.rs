//! Engine lifecycle: adaptor registration, properties, shutdown.

use indexmap::IndexMap;
use fileway_props::PropertySet;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::adaptor::{Adaptor, AdaptorFactory, AdaptorRegistry};
use crate::adaptors::{LocalAdaptor, MemoryAdaptor};
use crate::credentials::Credentials;
use crate::error::{FilesError, FilesResult};
use crate::files::Files;

/// Name of the designated local adaptor.
pub const LOCAL_ADAPTOR_NAME: &str = "local";

/// Prefix of every adaptor property.
pub const ADAPTOR_PROPERTY_PREFIX: &str = "fileway.adaptors.";

/// Property prefix of the adaptor called `name`.
pub fn adaptor_prefix(name: &str) -> String {
    format!("{ADAPTOR_PROPERTY_PREFIX}{name}.")
}

/// Engine configuration.
pub struct EngineConfig {
    /// Explicit engine-level properties, validated against every adaptor's
    /// descriptors.
    pub properties: IndexMap<String, String>,
    /// Adaptors to register, in order.
    pub adaptors: Vec<Arc<dyn AdaptorFactory>>,
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("properties", &self.properties)
            .field(
                "adaptors",
                &self.adaptors.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for EngineConfig {
    /// The local and memory adaptors, no explicit properties.
    fn default() -> Self {
        Self {
            properties: IndexMap::new(),
            adaptors: vec![Arc::new(LocalAdaptor), Arc::new(MemoryAdaptor)],
        }
    }
}

impl EngineConfig {
    /// Configuration with no adaptors at all.
    pub fn empty() -> Self {
        Self {
            properties: IndexMap::new(),
            adaptors: Vec::new(),
        }
    }

    /// Set one property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Register one more adaptor.
    pub fn with_adaptor(mut self, factory: Arc<dyn AdaptorFactory>) -> Self {
        self.adaptors.push(factory);
        self
    }
}

/// A running engine. Obtain [`Files`] and [`Credentials`] from it.
pub struct Engine {
    registry: AdaptorRegistry,
    properties: PropertySet,
    ended: AtomicBool,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("properties", &self.properties.to_string())
            .field("ended", &self.ended.load(Ordering::Relaxed))
            .finish()
    }
}

impl Engine {
    /// Validate properties, build every adaptor and freeze the registry.
    pub fn init(config: EngineConfig) -> FilesResult<Arc<Engine>> {
        let mut names = HashSet::new();
        for factory in &config.adaptors {
            if !names.insert(factory.name().to_string()) {
                return Err(FilesError::DuplicateAdaptor(format!(
                    "adaptor name {}",
                    factory.name()
                )));
            }
        }

        let descriptors = config
            .adaptors
            .iter()
            .flat_map(|factory| factory.supported_properties());
        let properties = PropertySet::new(descriptors, config.properties)?;

        let mut adaptors: Vec<Adaptor> = Vec::with_capacity(config.adaptors.len());
        for factory in &config.adaptors {
            let scoped = properties.filter(&adaptor_prefix(factory.name()));
            debug!(adaptor = %factory.name(), properties = %scoped, "creating adaptor");
            adaptors.push(factory.create(scoped)?);
        }
        let registry = AdaptorRegistry::build(adaptors)?;

        info!(
            adaptors = ?registry.adaptors().map(|a| a.name()).collect::<Vec<_>>(),
            "engine started"
        );
        Ok(Arc::new(Engine {
            registry,
            properties,
            ended: AtomicBool::new(false),
        }))
    }

    /// The router façade.
    pub fn files(self: &Arc<Self>) -> Files {
        Files::new(Arc::clone(self))
    }

    /// Credential construction, routed by scheme.
    pub fn credentials(self: &Arc<Self>) -> Credentials {
        Credentials::new(Arc::clone(self))
    }

    pub fn registry(&self) -> &AdaptorRegistry {
        &self.registry
    }

    /// All engine-level properties.
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Adaptor answering to `scheme`.
    pub fn adaptor_for(&self, scheme: &str) -> FilesResult<Arc<Adaptor>> {
        self.registry.for_scheme(scheme)
    }

    /// Adaptor by name.
    pub fn adaptor(&self, name: &str) -> Option<Arc<Adaptor>> {
        self.registry.get(name)
    }

    /// True once `shutdown` has run.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// End every adaptor: close connections and cancel in-flight copies.
    ///
    /// Idempotent.
    pub async fn shutdown(&self) {
        if self.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        for adaptor in self.registry.adaptors() {
            if let Ok(files) = adaptor.files() {
                files.end().await;
            }
            debug!(adaptor = %adaptor.name(), "adaptor ended");
        }
        info!("engine shut down");
    }
}

//! Configuration of a [`Hateoas`] instance.

use std::path::PathBuf;
use std::sync::Arc;

use hateoas_core::{ExpressionEvaluator, Relation, Result, UrlGenerator, Value};
use hateoas_expr::ExpressionLanguage;
use hateoas_metadata::{
    ClassDeclaredDriver, DriverChain, FileCache, FileLocator, MetadataStore, StaticDriver, YamlDriver,
};
use hateoas_serializer::{EventSubscriber, NamingStrategy, Serializer};

use crate::driver::EmbeddedMetadataDriver;
use crate::subscriber::InjectionSubscriber;
use crate::synthetic::SyntheticTypeRegistry;
use crate::url::{ServiceContainer, UrlGeneratorRegistry};
use crate::Hateoas;

/// Builds a [`Hateoas`] serializer.
///
/// Relations are looked up, in order, in YAML files from the metadata
/// directories, on the classes themselves, then among the relations
/// registered with [`HateoasBuilder::register_relations`].
///
/// Methods that validate their input fail immediately:
///
/// ```no_run
/// # fn main() -> hateoas_core::Result<()> {
/// let hateoas = hateoas::HateoasBuilder::new()
///     .add_metadata_dir("app::model", "config/hateoas")?
///     .cache_dir("var/cache/hateoas")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct HateoasBuilder {
    debug: bool,
    cache_dir: Option<PathBuf>,
    include_interfaces: bool,
    dedup_interface_relations: bool,
    locator: FileLocator,
    relations: StaticDriver,
    generators: UrlGeneratorRegistry,
    container: ServiceContainer,
    marker: Option<String>,
    naming: NamingStrategy,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl HateoasBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            debug: false,
            cache_dir: None,
            include_interfaces: false,
            dedup_interface_relations: false,
            locator: FileLocator::new(),
            relations: StaticDriver::new(),
            generators: UrlGeneratorRegistry::new(),
            container: ServiceContainer::default(),
            marker: None,
            naming: NamingStrategy::default(),
            evaluator: None,
            subscribers: Vec::new(),
        }
    }

    /// Disable the in-process metadata caches and revalidate file cache
    /// entries against their sources.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Persist merged relation metadata under `<dir>/metadata/`. The
    /// directory is created by [`HateoasBuilder::build`].
    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Append relations declared on implemented interfaces.
    #[must_use]
    pub fn include_interface_metadata(mut self, include: bool) -> Self {
        self.include_interfaces = include;
        self
    }

    /// With interface metadata included, skip interface relations whose
    /// name the class already declares.
    #[must_use]
    pub fn dedup_interface_relations(mut self, dedup: bool) -> Self {
        self.dedup_interface_relations = dedup;
        self
    }

    /// Look up relation files for classes under `prefix` in `dir`.
    ///
    /// # Errors
    ///
    /// Fails if `dir` does not exist or `prefix` already has a directory.
    pub fn add_metadata_dir(mut self, prefix: &str, dir: impl Into<PathBuf>) -> Result<Self> {
        self.locator.add_dir(prefix, dir)?;
        Ok(self)
    }

    /// # Errors
    ///
    /// See [`HateoasBuilder::add_metadata_dir`].
    pub fn add_metadata_dirs<I, P, D>(mut self, dirs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, D)>,
        P: AsRef<str>,
        D: Into<PathBuf>,
    {
        for (prefix, dir) in dirs {
            self.locator.add_dir(prefix.as_ref(), dir)?;
        }
        Ok(self)
    }

    /// # Errors
    ///
    /// Fails if `dir` does not exist or `prefix` has no directory yet.
    pub fn replace_metadata_dir(mut self, prefix: &str, dir: impl Into<PathBuf>) -> Result<Self> {
        self.locator.replace_dir(prefix, dir)?;
        Ok(self)
    }

    /// Replace all metadata directories.
    ///
    /// # Errors
    ///
    /// See [`HateoasBuilder::add_metadata_dir`].
    pub fn set_metadata_dirs<I, P, D>(mut self, dirs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, D)>,
        P: AsRef<str>,
        D: Into<PathBuf>,
    {
        self.locator.set_dirs(dirs)?;
        Ok(self)
    }

    /// Declare the relations of `class` in code.
    ///
    /// # Errors
    ///
    /// Fails if a relation is invalid or a name is used twice.
    pub fn register_relations(self, class: &str, relations: Vec<Relation>) -> Result<Self> {
        self.relations.register(class, relations)?;
        Ok(self)
    }

    /// Register a URL generator for route hrefs; `None` sets the default
    /// one, a name serves routes declaring that `generator`.
    #[must_use]
    pub fn url_generator(mut self, name: Option<&str>, generator: impl UrlGenerator + 'static) -> Self {
        self.generators.set(name, Arc::new(generator));
        self
    }

    /// A value reachable from expressions as `parameter(name)`.
    #[must_use]
    pub fn add_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.container.add_parameter(name, value.into());
        self
    }

    /// A value reachable from expressions as `service(id)`.
    #[must_use]
    pub fn add_service(mut self, id: impl Into<String>, service: impl Into<Value>) -> Self {
        self.container.add_service(id, service.into());
        self
    }

    /// Marker separating owner and kind in synthetic type names. Validated
    /// by [`HateoasBuilder::build`].
    #[must_use]
    pub fn synthetic_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    #[must_use]
    pub fn naming_strategy(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Replace the built-in [`ExpressionLanguage`].
    #[must_use]
    pub fn expression_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Run after relation injection for every object.
    #[must_use]
    pub fn add_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// # Errors
    ///
    /// Returns a [`hateoas_core::ConfigError`] if the cache directory cannot
    /// be created or the synthetic marker is invalid.
    pub fn build(self) -> Result<Hateoas> {
        let registry = Arc::new(match self.marker {
            Some(marker) => SyntheticTypeRegistry::with_marker(marker)?,
            None => SyntheticTypeRegistry::new(),
        });

        let mut chain = DriverChain::default();
        if !self.locator.is_empty() {
            chain.push(YamlDriver::new(self.locator));
        }
        chain.push(ClassDeclaredDriver);
        chain.push(self.relations);

        let mut store = MetadataStore::new(chain)
            .include_interfaces(self.include_interfaces)
            .dedup_interface_relations(self.dedup_interface_relations)
            .debug(self.debug);
        if let Some(dir) = &self.cache_dir {
            store = store.with_file_cache(FileCache::new(dir)?);
        }
        let store = Arc::new(store);

        let mut container = self.container;
        container.set_generators(self.generators);

        let mut serializer = Serializer::builder()
            .add_metadata_driver(Arc::new(EmbeddedMetadataDriver::new(
                Arc::clone(&store),
                Arc::clone(&registry),
            )))
            .naming_strategy(self.naming)
            .debug(self.debug)
            .expression_evaluator(
                self.evaluator
                    .unwrap_or_else(|| Arc::new(ExpressionLanguage::new())),
            )
            .container(Arc::new(container))
            .add_subscriber(Arc::new(InjectionSubscriber::new(
                Arc::clone(&store),
                Arc::clone(&registry),
            )));
        for subscriber in self.subscribers {
            serializer = serializer.add_subscriber(subscriber);
        }

        tracing::debug!(debug = self.debug, marker = registry.marker(), "built hateoas serializer");
        Ok(Hateoas {
            serializer: serializer.build(),
            store,
            registry,
        })
    }
}

impl Default for HateoasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HateoasBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HateoasBuilder")
            .field("debug", &self.debug)
            .field("cache_dir", &self.cache_dir)
            .field("include_interfaces", &self.include_interfaces)
            .field("locator", &self.locator)
            .field("generators", &self.generators)
            .field("marker", &self.marker)
            .finish_non_exhaustive()
    }
}

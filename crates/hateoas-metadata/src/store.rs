//! The class metadata store: merged, cached relation metadata per class.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use hateoas_core::{ClassInfo, ClassRelationMetadata, MetadataError};

use crate::cache::{CacheEntry, FileCache, SourceHash};
use crate::driver::RelationDriver;

/// Resolves the relations of a class, including those inherited from its
/// ancestors and (optionally) declared on its interfaces.
///
/// Results are cached for the lifetime of the store unless `debug` is on.
pub struct MetadataStore {
    driver: Box<dyn RelationDriver>,
    include_interfaces: bool,
    dedup_interface_relations: bool,
    debug: bool,
    file_cache: Option<FileCache>,
    loaded: RwLock<HashMap<&'static str, Option<Arc<ClassRelationMetadata>>>>,
}

impl MetadataStore {
    #[must_use]
    pub fn new(driver: impl RelationDriver + 'static) -> Self {
        Self {
            driver: Box::new(driver),
            include_interfaces: false,
            dedup_interface_relations: false,
            debug: false,
            file_cache: None,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Append relations declared on implemented interfaces.
    #[must_use]
    pub fn include_interfaces(mut self, include: bool) -> Self {
        self.include_interfaces = include;
        self
    }

    /// Skip interface relations whose name the class already declares.
    #[must_use]
    pub fn dedup_interface_relations(mut self, dedup: bool) -> Self {
        self.dedup_interface_relations = dedup;
        self
    }

    /// Bypass the in-process cache and revalidate file cache entries.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_file_cache(mut self, cache: FileCache) -> Self {
        self.file_cache = Some(cache);
        self
    }

    /// Relations of `class`, or `None` if neither the class, its ancestors,
    /// nor (when enabled) its interfaces declare any.
    ///
    /// # Errors
    ///
    /// Propagates driver failures (unreadable or invalid declarations).
    pub fn metadata_for_class(
        &self,
        class: &'static ClassInfo,
    ) -> Result<Option<Arc<ClassRelationMetadata>>, MetadataError> {
        if !self.debug {
            if let Some(cached) = self.loaded.read().get(class.name) {
                return Ok(cached.clone());
            }
        }

        let metadata = self.load_cached(class)?.map(Arc::new);
        if !self.debug {
            self.loaded.write().insert(class.name, metadata.clone());
        }
        Ok(metadata)
    }

    fn load_cached(&self, class: &'static ClassInfo) -> Result<Option<ClassRelationMetadata>, MetadataError> {
        let Some(cache) = &self.file_cache else {
            return self.load(class);
        };

        if let Some(entry) = cache.load(class.name) {
            if !self.debug || entry.is_fresh() {
                tracing::debug!(class = class.name, "relation metadata cache hit");
                return Ok(entry.metadata);
            }
            tracing::warn!(class = class.name, "relation metadata cache entry is stale");
        }

        let loaded = self.load_merged(class)?;
        cache.store(&CacheEntry {
            class: class.name.to_string(),
            metadata: loaded.metadata.clone(),
            sources: self.sources(class),
            file_backed: loaded.file_backed,
        });
        Ok(loaded.metadata)
    }

    fn load(&self, class: &'static ClassInfo) -> Result<Option<ClassRelationMetadata>, MetadataError> {
        Ok(self.load_merged(class)?.metadata)
    }

    fn load_merged(&self, class: &'static ClassInfo) -> Result<Merged, MetadataError> {
        let mut merged = ClassRelationMetadata::new(class.name, Vec::new());
        let mut file_backed = true;

        for level in class.hierarchy() {
            if let Some(declared) = self.driver.load_class(level)? {
                file_backed &= !self.driver.sources(level).is_empty();
                merged.merge(&declared);
            }
        }

        if self.include_interfaces {
            for interface in class.all_interfaces() {
                let Some(declared) = self.driver.load_class(interface)? else {
                    continue;
                };
                file_backed &= !self.driver.sources(interface).is_empty();
                if self.dedup_interface_relations {
                    merged.merge_missing(&declared);
                } else {
                    merged.merge(&declared);
                }
            }
        }

        tracing::debug!(
            class = class.name,
            relations = merged.relations().len(),
            file_backed,
            "loaded relation metadata"
        );
        let metadata = (!merged.is_empty()).then_some(merged);
        Ok(Merged {
            file_backed: file_backed && metadata.is_some(),
            metadata,
        })
    }

    fn sources(&self, class: &'static ClassInfo) -> Vec<SourceHash> {
        let mut classes = class.hierarchy();
        if self.include_interfaces {
            classes.extend(class.all_interfaces());
        }
        classes
            .into_iter()
            .flat_map(|c| self.driver.sources(c))
            .filter_map(|path| SourceHash::of(&path))
            .collect()
    }
}

/// Merged relations of one class. `file_backed` holds when every declaring
/// level was read from a file whose content the cache entry can hash.
struct Merged {
    metadata: Option<ClassRelationMetadata>,
    file_backed: bool,
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("include_interfaces", &self.include_interfaces)
            .field("dedup_interface_relations", &self.dedup_interface_relations)
            .field("debug", &self.debug)
            .field("file_cache", &self.file_cache)
            .field("loaded", &self.loaded.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hateoas_core::Relation;
    use tempfile::TempDir;

    use crate::driver::{DriverChain, StaticDriver, YamlDriver};
    use crate::locator::FileLocator;

    static NAMED: ClassInfo = ClassInfo::new("app::Named")
        .with_relations(|| vec![Relation::new("self").with_href("/named"), Relation::new("doc").with_href("/doc")]);
    static BASE: ClassInfo = ClassInfo::new("app::Base")
        .with_relations(|| vec![Relation::new("self").with_href("/base")]);
    static CHILD: ClassInfo = ClassInfo::new("app::Child")
        .with_parent(&BASE)
        .with_interfaces(&[&NAMED])
        .with_relations(|| vec![Relation::new("child").with_href("/child")]);
    static PLAIN: ClassInfo = ClassInfo::new("app::Plain");

    fn names(metadata: &ClassRelationMetadata) -> Vec<&str> {
        metadata.relations().iter().map(|r| r.name.as_str()).collect()
    }

    fn class_declared() -> DriverChain {
        let mut chain = DriverChain::default();
        chain.push(crate::driver::ClassDeclaredDriver);
        chain
    }

    #[test]
    fn inherited_relations_come_first() {
        let store = MetadataStore::new(class_declared());
        let metadata = store.metadata_for_class(&CHILD).unwrap().unwrap();
        assert_eq!(metadata.class(), "app::Child");
        assert_eq!(names(&metadata), vec!["self", "child"]);
    }

    #[test]
    fn interface_relations_are_appended_when_enabled() {
        let store = MetadataStore::new(class_declared()).include_interfaces(true);
        let metadata = store.metadata_for_class(&CHILD).unwrap().unwrap();
        assert_eq!(names(&metadata), vec!["self", "child", "self", "doc"]);

        let store = MetadataStore::new(class_declared())
            .include_interfaces(true)
            .dedup_interface_relations(true);
        let metadata = store.metadata_for_class(&CHILD).unwrap().unwrap();
        assert_eq!(names(&metadata), vec!["self", "child", "doc"]);
    }

    #[test]
    fn classes_without_relations_have_no_metadata() {
        let store = MetadataStore::new(class_declared());
        assert!(store.metadata_for_class(&PLAIN).unwrap().is_none());
    }

    struct CountingDriver {
        inner: StaticDriver,
        loads: Arc<AtomicUsize>,
    }

    impl RelationDriver for CountingDriver {
        fn load_class(&self, class: &'static ClassInfo) -> Result<Option<ClassRelationMetadata>, MetadataError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load_class(class)
        }
    }

    fn counting() -> (CountingDriver, Arc<AtomicUsize>) {
        let inner = StaticDriver::new();
        inner
            .register(PLAIN.name, vec![Relation::new("self").with_href("/plain")])
            .unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        (
            CountingDriver {
                inner,
                loads: Arc::clone(&loads),
            },
            loads,
        )
    }

    #[test]
    fn results_are_cached_unless_debugging() {
        let (driver, loads) = counting();
        let store = MetadataStore::new(driver);
        let first = store.metadata_for_class(&PLAIN).unwrap().unwrap();
        let second = store.metadata_for_class(&PLAIN).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let (driver, loads) = counting();
        let store = MetadataStore::new(driver).debug(true);
        store.metadata_for_class(&PLAIN).unwrap();
        store.metadata_for_class(&PLAIN).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn file_cache_is_reused_across_stores() {
        let cache_dir = TempDir::new().unwrap();

        let (driver, loads) = counting();
        MetadataStore::new(driver)
            .with_file_cache(FileCache::new(cache_dir.path()).unwrap())
            .metadata_for_class(&PLAIN)
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let (driver, loads) = counting();
        let metadata = MetadataStore::new(driver)
            .with_file_cache(FileCache::new(cache_dir.path()).unwrap())
            .metadata_for_class(&PLAIN)
            .unwrap()
            .unwrap();
        assert_eq!(names(&metadata), vec!["self"]);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn debug_mode_reloads_edited_relation_files() {
        let metadata_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let file = metadata_dir.path().join("Plain.yml");
        fs::write(&file, "app::Plain:\n  relations:\n    - { rel: self, href: /v1 }\n").unwrap();

        let store = || {
            let mut locator = FileLocator::new();
            locator.add_dir("app", metadata_dir.path()).unwrap();
            MetadataStore::new(YamlDriver::new(locator))
                .debug(true)
                .with_file_cache(FileCache::new(cache_dir.path()).unwrap())
        };

        let href = |store: &MetadataStore| {
            let metadata = store.metadata_for_class(&PLAIN).unwrap().unwrap();
            serde_json::to_value(&metadata.relations()[0].href).unwrap()
        };

        assert_eq!(href(&store()), serde_json::json!("/v1"));
        fs::write(&file, "app::Plain:\n  relations:\n    - { rel: self, href: /v2 }\n").unwrap();
        assert_eq!(href(&store()), serde_json::json!("/v2"));
    }

    #[test]
    fn debug_mode_reloads_relations_declared_in_code() {
        let cache_dir = TempDir::new().unwrap();
        let store = |relations: Vec<Relation>| {
            let driver = StaticDriver::new();
            if !relations.is_empty() {
                driver.register(PLAIN.name, relations).unwrap();
            }
            MetadataStore::new(driver)
                .debug(true)
                .with_file_cache(FileCache::new(cache_dir.path()).unwrap())
        };

        assert!(store(Vec::new()).metadata_for_class(&PLAIN).unwrap().is_none());
        for href in ["/v1", "/v2"] {
            let metadata = store(vec![Relation::new("self").with_href(href)])
                .metadata_for_class(&PLAIN)
                .unwrap()
                .unwrap();
            assert_eq!(
                serde_json::to_value(&metadata.relations()[0].href).unwrap(),
                serde_json::json!(href)
            );
        }

        let entry = FileCache::new(cache_dir.path()).unwrap().load(PLAIN.name).unwrap();
        assert!(!entry.file_backed);
        assert!(!entry.is_fresh());
    }
}

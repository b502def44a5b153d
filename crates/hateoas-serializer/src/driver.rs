//! Metadata drivers and the caching factory in front of them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use hateoas_core::{ClassInfo, Result};

use crate::metadata::{ClassMetadata, PropertyMetadata};

/// The type a value is navigated as. `class` is set when the type is a
/// real class and `None` for names only some driver understands.
#[derive(Debug, Clone, Copy)]
pub struct TypeRef<'a> {
    pub name: &'a str,
    pub class: Option<&'static ClassInfo>,
}

impl<'a> TypeRef<'a> {
    #[must_use]
    pub fn named(name: &'a str) -> Self {
        Self { name, class: None }
    }
}

impl TypeRef<'static> {
    #[must_use]
    pub fn class(class: &'static ClassInfo) -> Self {
        Self {
            name: class.name,
            class: Some(class),
        }
    }
}

/// Produces host metadata for a type.
pub trait MetadataDriver: Send + Sync {
    /// `Ok(None)` lets the next driver try.
    ///
    /// # Errors
    ///
    /// Driver specific; failures abort the serialization call.
    fn load_metadata_for_class(&self, ty: &TypeRef<'_>) -> Result<Option<ClassMetadata>>;
}

/// Translates declared property names into output keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamingStrategy {
    /// `firstName` → `first_name`
    #[default]
    SnakeCase,
    Identical,
}

impl NamingStrategy {
    #[must_use]
    pub fn translate(self, name: &str) -> String {
        match self {
            Self::Identical => name.to_string(),
            Self::SnakeCase => {
                let mut out = String::with_capacity(name.len() + 4);
                let mut previous_upper = true;
                for c in name.chars() {
                    if c.is_uppercase() {
                        if !previous_upper {
                            out.push('_');
                        }
                        out.extend(c.to_lowercase());
                        previous_upper = true;
                    } else {
                        out.push(c);
                        previous_upper = false;
                    }
                }
                out
            }
        }
    }
}

/// Builds metadata from [`ClassInfo::properties`] of a class and its
/// ancestors (inherited properties first).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectionDriver {
    naming: NamingStrategy,
}

impl ReflectionDriver {
    #[must_use]
    pub fn new(naming: NamingStrategy) -> Self {
        Self { naming }
    }
}

impl MetadataDriver for ReflectionDriver {
    fn load_metadata_for_class(&self, ty: &TypeRef<'_>) -> Result<Option<ClassMetadata>> {
        let Some(class) = ty.class else {
            return Ok(None);
        };

        let mut metadata = ClassMetadata::new(class.name);
        for level in class.hierarchy() {
            for info in level.properties {
                let serialized_name = info
                    .serialized_name
                    .map_or_else(|| self.naming.translate(info.name), str::to_string);
                let mut property =
                    PropertyMetadata::reflection(level.name, info.name).serialized_as(serialized_name);
                if !info.groups.is_empty() {
                    property.groups = Some(info.groups.iter().map(|g| (*g).to_string()).collect());
                }
                property.since_version = info.since_version.map(str::to_string);
                property.until_version = info.until_version.map(str::to_string);
                property.max_depth = info.max_depth;
                metadata.add_property(property);
            }
        }
        Ok(Some(metadata))
    }
}

/// Asks drivers in order and caches the answer per type name.
pub struct MetadataFactory {
    drivers: Vec<Arc<dyn MetadataDriver>>,
    debug: bool,
    loaded: RwLock<HashMap<String, Option<Arc<ClassMetadata>>>>,
}

impl MetadataFactory {
    #[must_use]
    pub fn new(drivers: Vec<Arc<dyn MetadataDriver>>) -> Self {
        Self {
            drivers,
            debug: false,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Disable caching.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Metadata of the first driver that knows the type.
    ///
    /// # Errors
    ///
    /// Propagates driver errors.
    pub fn metadata_for(&self, ty: &TypeRef<'_>) -> Result<Option<Arc<ClassMetadata>>> {
        if !self.debug {
            if let Some(cached) = self.loaded.read().get(ty.name) {
                return Ok(cached.clone());
            }
        }

        let mut metadata = None;
        for driver in &self.drivers {
            if let Some(found) = driver.load_metadata_for_class(ty)? {
                metadata = Some(Arc::new(found));
                break;
            }
        }
        tracing::trace!(type_name = ty.name, found = metadata.is_some(), "loaded class metadata");

        if !self.debug {
            self.loaded.write().insert(ty.name.to_string(), metadata.clone());
        }
        Ok(metadata)
    }
}

impl std::fmt::Debug for MetadataFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataFactory")
            .field("drivers", &self.drivers.len())
            .field("debug", &self.debug)
            .field("loaded", &self.loaded.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hateoas_core::PropertyInfo;

    use crate::metadata::Accessor;

    static PERSON: ClassInfo = ClassInfo::new("test::Person")
        .with_properties(&[PropertyInfo::new("id"), PropertyInfo::new("fullName").groups(&["detail"])]);
    static EMPLOYEE: ClassInfo = ClassInfo::new("test::Employee")
        .with_parent(&PERSON)
        .with_properties(&[PropertyInfo::new("employeeNumber").serialized_name("number")]);

    #[test]
    fn snake_case_naming() {
        assert_eq!(NamingStrategy::SnakeCase.translate("firstName"), "first_name");
        assert_eq!(NamingStrategy::SnakeCase.translate("_links"), "_links");
        assert_eq!(NamingStrategy::SnakeCase.translate("URLValue"), "urlvalue");
        assert_eq!(NamingStrategy::SnakeCase.translate("id"), "id");
        assert_eq!(NamingStrategy::Identical.translate("firstName"), "firstName");
    }

    #[test]
    fn reflection_walks_the_hierarchy() {
        let metadata = ReflectionDriver::default()
            .load_metadata_for_class(&TypeRef::class(&EMPLOYEE))
            .unwrap()
            .unwrap();
        let keys: Vec<&str> = metadata
            .properties
            .iter()
            .map(|p| p.serialized_name.as_str())
            .collect();
        assert_eq!(keys, vec!["id", "full_name", "number"]);
        assert_eq!(metadata.properties[0].accessor, Accessor::Reflection);
        assert_eq!(
            metadata.properties[1].groups.as_deref(),
            Some(&["detail".to_string()][..])
        );

        assert!(ReflectionDriver::default()
            .load_metadata_for_class(&TypeRef::named("virtual"))
            .unwrap()
            .is_none());
    }

    struct Counting(AtomicUsize);

    impl MetadataDriver for Counting {
        fn load_metadata_for_class(&self, ty: &TypeRef<'_>) -> Result<Option<ClassMetadata>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Some(ClassMetadata::new(ty.name)))
        }
    }

    #[test]
    fn factory_caches_per_type_name() {
        let driver = Arc::new(Counting(AtomicUsize::new(0)));
        let factory = MetadataFactory::new(vec![driver.clone() as Arc<dyn MetadataDriver>]);
        factory.metadata_for(&TypeRef::named("a")).unwrap();
        factory.metadata_for(&TypeRef::named("a")).unwrap();
        factory.metadata_for(&TypeRef::named("b")).unwrap();
        assert_eq!(driver.0.load(Ordering::SeqCst), 2);

        let driver = Arc::new(Counting(AtomicUsize::new(0)));
        let factory =
            MetadataFactory::new(vec![driver.clone() as Arc<dyn MetadataDriver>]).debug(true);
        factory.metadata_for(&TypeRef::named("a")).unwrap();
        factory.metadata_for(&TypeRef::named("a")).unwrap();
        assert_eq!(driver.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn first_driver_wins() {
        let drivers: Vec<Arc<dyn MetadataDriver>> = vec![
            Arc::new(ReflectionDriver::default()),
            Arc::new(Counting(AtomicUsize::new(0))),
        ];
        let factory = MetadataFactory::new(drivers);
        let metadata = factory.metadata_for(&TypeRef::class(&PERSON)).unwrap().unwrap();
        assert_eq!(metadata.properties.len(), 2);
        let metadata = factory.metadata_for(&TypeRef::named("virtual")).unwrap().unwrap();
        assert!(metadata.properties.is_empty());
    }
}

//! Relation drivers: where the relations of a single class come from.
//!
//! A driver answers for one class at a time and ignores inheritance; the
//! [`crate::MetadataStore`] walks the hierarchy and merges.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Deserialize;

use hateoas_core::{ClassInfo, ClassRelationMetadata, MetadataError, Relation};

use crate::locator::FileLocator;

/// Source of relation declarations for individual classes.
pub trait RelationDriver: Send + Sync {
    /// Relations declared directly on `class`, or `None` if this driver
    /// knows nothing about it.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] when a declaration exists but is
    /// unreadable or invalid.
    fn load_class(&self, class: &'static ClassInfo) -> Result<Option<ClassRelationMetadata>, MetadataError>;

    /// Files backing the declaration of `class`, used to detect stale cache
    /// entries.
    fn sources(&self, _class: &'static ClassInfo) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Queries drivers in order; the first one with metadata for a class wins.
#[derive(Default)]
pub struct DriverChain {
    drivers: Vec<Box<dyn RelationDriver>>,
}

impl DriverChain {
    #[must_use]
    pub fn new(drivers: Vec<Box<dyn RelationDriver>>) -> Self {
        Self { drivers }
    }

    pub fn push(&mut self, driver: impl RelationDriver + 'static) {
        self.drivers.push(Box::new(driver));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl RelationDriver for DriverChain {
    fn load_class(&self, class: &'static ClassInfo) -> Result<Option<ClassRelationMetadata>, MetadataError> {
        for driver in &self.drivers {
            if let Some(metadata) = driver.load_class(class)? {
                return Ok(Some(metadata));
            }
        }
        Ok(None)
    }

    fn sources(&self, class: &'static ClassInfo) -> Vec<PathBuf> {
        self.drivers
            .iter()
            .flat_map(|driver| driver.sources(class))
            .collect()
    }
}

/// Top-level shape of a relation file:
///
/// ```yaml
/// app::model::User:
///   relations:
///     - rel: self
///       href: /users/1
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassDocument {
    #[serde(default)]
    relations: Vec<Relation>,
}

/// Reads relations from YAML files found through a [`FileLocator`].
#[derive(Debug, Clone)]
pub struct YamlDriver {
    locator: FileLocator,
}

impl YamlDriver {
    #[must_use]
    pub fn new(locator: FileLocator) -> Self {
        Self { locator }
    }

    #[must_use]
    pub fn locator(&self) -> &FileLocator {
        &self.locator
    }

    fn parse_file(path: &Path, class: &str) -> Result<ClassRelationMetadata, MetadataError> {
        let content = fs::read_to_string(path).map_err(|source| MetadataError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut documents: HashMap<String, ClassDocument> =
            serde_yaml::from_str(&content).map_err(|e| MetadataError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let document = documents
            .remove(class)
            .ok_or_else(|| MetadataError::ClassMismatch {
                path: path.to_path_buf(),
                class: class.to_string(),
            })?;
        ClassRelationMetadata::declared(class, document.relations)
    }
}

impl RelationDriver for YamlDriver {
    fn load_class(&self, class: &'static ClassInfo) -> Result<Option<ClassRelationMetadata>, MetadataError> {
        let Some(path) = self.locator.find_file(class.name) else {
            return Ok(None);
        };
        tracing::debug!(class = class.name, path = %path.display(), "loading relation file");
        Self::parse_file(&path, class.name).map(Some)
    }

    fn sources(&self, class: &'static ClassInfo) -> Vec<PathBuf> {
        self.locator.find_file(class.name).into_iter().collect()
    }
}

/// Reads relations declared on the class itself through
/// [`ClassInfo::with_relations`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassDeclaredDriver;

impl RelationDriver for ClassDeclaredDriver {
    fn load_class(&self, class: &'static ClassInfo) -> Result<Option<ClassRelationMetadata>, MetadataError> {
        class
            .relations
            .map(|declare| ClassRelationMetadata::declared(class.name, declare()))
            .transpose()
    }
}

/// Relations registered in code at configuration time.
#[derive(Debug, Default)]
pub struct StaticDriver {
    classes: RwLock<HashMap<String, ClassRelationMetadata>>,
}

impl StaticDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the relations of `class`, replacing any earlier
    /// registration.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] if a relation is invalid or a name is
    /// declared twice.
    pub fn register(&self, class: &str, relations: Vec<Relation>) -> Result<(), MetadataError> {
        let metadata = ClassRelationMetadata::declared(class, relations)?;
        self.classes.write().insert(class.to_string(), metadata);
        Ok(())
    }
}

impl RelationDriver for StaticDriver {
    fn load_class(&self, class: &'static ClassInfo) -> Result<Option<ClassRelationMetadata>, MetadataError> {
        Ok(self.classes.read().get(class.name).cloned())
    }
}

//! Static class descriptions.
//!
//! Rust has no runtime reflection, so every serializable domain type
//! describes itself with a `static` [`ClassInfo`]: its name, parent class,
//! implemented interfaces, serializable properties and (optionally) the
//! relations declared directly on the class.
//!
//! ```
//! use hateoas_core::{ClassInfo, PropertyInfo};
//!
//! static NAMED: ClassInfo = ClassInfo::new("app::model::Named");
//! static USER: ClassInfo = ClassInfo::new("app::model::User")
//!     .with_interfaces(&[&NAMED])
//!     .with_properties(&[
//!         PropertyInfo::new("firstName").groups(&["Default", "simple"]),
//!         PropertyInfo::new("email").since("2.0"),
//!     ]);
//!
//! assert_eq!(USER.all_interfaces()[0].name, "app::model::Named");
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::relation::Relation;

/// Separator between path segments of a class name.
pub const PATH_SEPARATOR: &str = "::";

/// Compile-time description of a domain class.
pub struct ClassInfo {
    /// Fully qualified name, `::`-separated (e.g. `app::model::User`).
    pub name: &'static str,
    pub parent: Option<&'static ClassInfo>,
    pub interfaces: &'static [&'static ClassInfo],
    /// Serializable properties in declaration order.
    pub properties: &'static [PropertyInfo],
    /// Relations declared on the class itself.
    pub relations: Option<fn() -> Vec<Relation>>,
}

impl ClassInfo {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            parent: None,
            interfaces: &[],
            properties: &[],
            relations: None,
        }
    }

    #[must_use]
    pub const fn with_parent(mut self, parent: &'static ClassInfo) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub const fn with_interfaces(mut self, interfaces: &'static [&'static ClassInfo]) -> Self {
        self.interfaces = interfaces;
        self
    }

    #[must_use]
    pub const fn with_properties(mut self, properties: &'static [PropertyInfo]) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub const fn with_relations(mut self, relations: fn() -> Vec<Relation>) -> Self {
        self.relations = Some(relations);
        self
    }

    /// The class and its ancestors, root first.
    #[must_use]
    pub fn hierarchy(&'static self) -> Vec<&'static ClassInfo> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            chain.push(class);
            current = class.parent;
        }
        chain.reverse();
        chain
    }

    /// Every interface implemented by the class, its ancestors, or
    /// (transitively) by those interfaces. Each interface appears once, in
    /// discovery order starting from the hierarchy root.
    #[must_use]
    pub fn all_interfaces(&'static self) -> Vec<&'static ClassInfo> {
        let mut found: Vec<&'static ClassInfo> = Vec::new();
        let mut pending: Vec<&'static ClassInfo> = Vec::new();

        for class in self.hierarchy() {
            pending.extend(class.interfaces.iter().rev().copied());
            while let Some(interface) = pending.pop() {
                if found.iter().any(|known| known.name == interface.name) {
                    continue;
                }
                found.push(interface);
                pending.extend(interface.interfaces.iter().rev().copied());
            }
        }

        found
    }
}

impl PartialEq for ClassInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassInfo {}

impl Hash for ClassInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("parent", &self.parent.map(|p| p.name))
            .field(
                "interfaces",
                &self.interfaces.iter().map(|i| i.name).collect::<Vec<_>>(),
            )
            .field("properties", &self.properties)
            .field("declares_relations", &self.relations.is_some())
            .finish()
    }
}

impl fmt::Display for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A serializable property of a class, with its serializer annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: &'static str,
    /// Output key; the host naming strategy applies when absent.
    pub serialized_name: Option<&'static str>,
    /// Empty means the property belongs to the `Default` group only.
    pub groups: &'static [&'static str],
    pub since_version: Option<&'static str>,
    pub until_version: Option<&'static str>,
    pub max_depth: Option<usize>,
}

impl PropertyInfo {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            serialized_name: None,
            groups: &[],
            since_version: None,
            until_version: None,
            max_depth: None,
        }
    }

    #[must_use]
    pub const fn serialized_name(mut self, name: &'static str) -> Self {
        self.serialized_name = Some(name);
        self
    }

    #[must_use]
    pub const fn groups(mut self, groups: &'static [&'static str]) -> Self {
        self.groups = groups;
        self
    }

    #[must_use]
    pub const fn since(mut self, version: &'static str) -> Self {
        self.since_version = Some(version);
        self
    }

    #[must_use]
    pub const fn until(mut self, version: &'static str) -> Self {
        self.until_version = Some(version);
        self
    }

    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

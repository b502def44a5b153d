//! Per-class relation metadata.

use serde::{Deserialize, Serialize};

use crate::error::MetadataError;
use crate::relation::Relation;

/// The ordered relations declared for one class (including inherited and,
/// when enabled, interface relations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRelationMetadata {
    class: String,
    relations: Vec<Relation>,
}

impl ClassRelationMetadata {
    #[must_use]
    pub fn new(class: impl Into<String>, relations: Vec<Relation>) -> Self {
        Self {
            class: class.into(),
            relations,
        }
    }

    /// Build metadata for a single class declaration, enforcing the relation
    /// invariants and unique relation names.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::InvalidRelation`] or
    /// [`MetadataError::DuplicateRelation`].
    pub fn declared(class: impl Into<String>, relations: Vec<Relation>) -> Result<Self, MetadataError> {
        let class = class.into();
        for (i, relation) in relations.iter().enumerate() {
            relation.validate(&class)?;
            if relations[..i].iter().any(|r| r.name == relation.name) {
                return Err(MetadataError::DuplicateRelation {
                    class,
                    relation: relation.name.clone(),
                });
            }
        }
        Ok(Self { class, relations })
    }

    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    #[must_use]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// First relation with the given name.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// At least one relation declares an href.
    #[must_use]
    pub fn has_links(&self) -> bool {
        self.relations.iter().any(|r| r.href.is_some())
    }

    /// At least one relation declares embedded content.
    #[must_use]
    pub fn has_embedded(&self) -> bool {
        self.relations.iter().any(|r| r.embedded.is_some())
    }

    /// Append every relation of `other`, keeping duplicates.
    pub fn merge(&mut self, other: &ClassRelationMetadata) {
        self.relations.extend(other.relations.iter().cloned());
    }

    /// Append the relations of `other` whose names are not declared yet.
    pub fn merge_missing(&mut self, other: &ClassRelationMetadata) {
        for relation in &other.relations {
            if self.relation(&relation.name).is_none() {
                self.relations.push(relation.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Embedded;

    fn link(name: &str) -> Relation {
        Relation::new(name).with_href(format!("/{name}"))
    }

    #[test]
    fn declared_rejects_duplicate_names() {
        let err = ClassRelationMetadata::declared("app::User", vec![link("self"), link("self")])
            .unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateRelation { relation, .. } if relation == "self"));
    }

    #[test]
    fn link_and_embedded_flags() {
        let links_only = ClassRelationMetadata::new("app::User", vec![link("self")]);
        assert!(links_only.has_links());
        assert!(!links_only.has_embedded());

        let embedded_only = ClassRelationMetadata::new(
            "app::User",
            vec![Relation::new("friends").with_embedded(Embedded::new("object.friends"))],
        );
        assert!(!embedded_only.has_links());
        assert!(embedded_only.has_embedded());
    }

    #[test]
    fn merge_appends_and_merge_missing_skips_known_names() {
        let mut own = ClassRelationMetadata::new("app::User", vec![link("self")]);
        let iface = ClassRelationMetadata::new("app::Named", vec![link("self"), link("profile")]);

        let mut appended = own.clone();
        appended.merge(&iface);
        let names: Vec<&str> = appended.relations().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["self", "self", "profile"]);

        own.merge_missing(&iface);
        let names: Vec<&str> = own.relations().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["self", "profile"]);
    }
}

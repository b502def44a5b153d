//! Relation configuration model: the hypermedia affordances declared on a
//! class.
//!
//! These are plain values. They are built either in code (through the
//! `with_*` constructors) or deserialized from relation files:
//!
//! ```yaml
//! - rel: self
//!   href: "http://example.com/users/1"
//!   attributes: { method: GET }
//! - rel: manager
//!   href:
//!     route: user_get
//!     parameters: { id: "expr(object.managerId)" }
//!     absolute: true
//!   embedded:
//!     content: "object.getManager()"
//!     exclusion: { groups: [detail] }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

/// Ordered literal map used for relation attributes and route parameters.
pub type LiteralMap = serde_json::Map<String, serde_json::Value>;

/// One named hypermedia affordance: a link, embedded content, or both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(alias = "rel")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<Href>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<Embedded>,

    /// Extra literal attributes rendered next to the href.
    #[serde(default, skip_serializing_if = "LiteralMap::is_empty")]
    pub attributes: LiteralMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<Exclusion>,
}

impl Relation {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: None,
            embedded: None,
            attributes: LiteralMap::new(),
            exclusion: None,
        }
    }

    #[must_use]
    pub fn with_href(mut self, href: impl Into<Href>) -> Self {
        self.href = Some(href.into());
        self
    }

    #[must_use]
    pub fn with_embedded(mut self, embedded: impl Into<Embedded>) -> Self {
        self.embedded = Some(embedded.into());
        self
    }

    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusion = Some(exclusion);
        self
    }

    /// Check the relation invariants for a relation declared on `class`.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::InvalidRelation`] when the name is empty,
    /// when neither href nor embedded content is declared, or when either of
    /// them is empty.
    pub fn validate(&self, class: &str) -> Result<(), MetadataError> {
        let invalid = |reason: String| MetadataError::InvalidRelation {
            class: class.to_string(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("relation name must not be empty".to_string()));
        }
        if self.href.is_none() && self.embedded.is_none() {
            return Err(invalid(format!(
                "relation '{}' declares neither an href nor embedded content",
                self.name
            )));
        }
        match &self.href {
            Some(Href::Url(url)) if url.is_empty() => {
                return Err(invalid(format!("relation '{}' has an empty href", self.name)));
            }
            Some(Href::Route(route)) if route.name.is_empty() => {
                return Err(invalid(format!(
                    "relation '{}' has a route without a name",
                    self.name
                )));
            }
            _ => {}
        }
        if let Some(embedded) = &self.embedded {
            if embedded.content.trim().is_empty() {
                return Err(invalid(format!(
                    "relation '{}' has empty embedded content",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Link target: a literal URL or a route resolved by a URL generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Href {
    Url(String),
    Route(Route),
}

impl From<&str> for Href {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for Href {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<Route> for Href {
    fn from(route: Route) -> Self {
        Self::Route(route)
    }
}

/// A named route plus the parameters handed to the URL generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(alias = "route")]
    pub name: String,

    /// Literal values, or `expr(...)` strings evaluated against the object.
    #[serde(default, skip_serializing_if = "LiteralMap::is_empty")]
    pub parameters: LiteralMap,

    #[serde(default)]
    pub absolute: bool,

    /// URL generator name; the default generator when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl Route {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: LiteralMap::new(),
            absolute: false,
            generator: None,
        }
    }

    #[must_use]
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn absolute(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }

    #[must_use]
    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = Some(generator.into());
        self
    }
}

/// Returns the inner expression of an `expr(...)` wrapped string.
#[must_use]
pub fn unwrap_expr(value: &str) -> Option<&str> {
    value
        .trim()
        .strip_prefix("expr(")
        .and_then(|rest| rest.strip_suffix(')'))
        .map(str::trim)
}

/// Content embedded under the relation name in `_embedded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EmbeddedSpec")]
pub struct Embedded {
    /// Expression evaluated against the owning object.
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_element_name: Option<String>,

    /// Overrides the relation's exclusion for the embedded part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<Exclusion>,
}

impl Embedded {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            xml_element_name: None,
            exclusion: None,
        }
    }

    #[must_use]
    pub fn with_xml_element_name(mut self, name: impl Into<String>) -> Self {
        self.xml_element_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusion = Some(exclusion);
        self
    }
}

impl From<&str> for Embedded {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

/// Either the short string form or the full map form of `embedded`.
#[derive(Deserialize)]
#[serde(untagged)]
enum EmbeddedSpec {
    Content(String),
    Full {
        content: String,
        #[serde(default, alias = "xmlElementName")]
        xml_element_name: Option<String>,
        #[serde(default)]
        exclusion: Option<Exclusion>,
    },
}

impl From<EmbeddedSpec> for Embedded {
    fn from(value: EmbeddedSpec) -> Self {
        match value {
            EmbeddedSpec::Content(content) => Self::new(content),
            EmbeddedSpec::Full {
                content,
                xml_element_name,
                exclusion,
            } => Self {
                content,
                xml_element_name,
                exclusion,
            },
        }
    }
}

/// Rules deciding whether a relation is omitted for a serialization call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exclusion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,

    #[serde(alias = "sinceVersion", skip_serializing_if = "Option::is_none")]
    pub since_version: Option<String>,

    #[serde(alias = "untilVersion", skip_serializing_if = "Option::is_none")]
    pub until_version: Option<String>,

    /// Expression; the relation is omitted when it evaluates truthy.
    #[serde(alias = "excludeIf", skip_serializing_if = "Option::is_none")]
    pub exclude_if: Option<String>,

    #[serde(alias = "maxDepth", skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl Exclusion {
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(groups.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn since(mut self, version: impl Into<String>) -> Self {
        self.since_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn until(mut self, version: impl Into<String>) -> Self {
        self.until_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn exclude_if(mut self, expression: impl Into<String>) -> Self {
        self.exclude_if = Some(expression.into());
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_yaml_accepts_short_and_full_forms() {
        let yaml = r#"
- rel: self
  href: "http://adrienbrault.fr"
  attributes: { foo: bar, answer: 42 }
  exclusion:
    groups: [Default, simple]
    excludeIf: "object.firstName != 'Adrien'"
- rel: manager
  href:
    route: user_get
    parameters: { id: "expr(object.id)", format: json }
    absolute: true
  embedded:
    content: "object.getManager()"
    xmlElementName: boss
    exclusion: { max_depth: 1 }
- rel: smartphone
  embedded: "object.getiOSSmartphone()"
"#;
        let relations: Vec<Relation> = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(relations.len(), 3);

        let own = &relations[0];
        assert_eq!(own.href, Some(Href::Url("http://adrienbrault.fr".to_string())));
        let keys: Vec<&String> = own.attributes.keys().collect();
        assert_eq!(keys, vec!["foo", "answer"]);
        let exclusion = own.exclusion.as_ref().unwrap();
        assert_eq!(
            exclusion.groups.as_deref(),
            Some(&["Default".to_string(), "simple".to_string()][..])
        );
        assert!(exclusion.exclude_if.is_some());

        let Some(Href::Route(route)) = &relations[1].href else {
            panic!("expected a route href");
        };
        assert_eq!(route.name, "user_get");
        assert!(route.absolute);
        assert_eq!(route.generator, None);
        let embedded = relations[1].embedded.as_ref().unwrap();
        assert_eq!(embedded.xml_element_name.as_deref(), Some("boss"));
        assert_eq!(embedded.exclusion.as_ref().unwrap().max_depth, Some(1));

        assert_eq!(relations[2].href, None);
        assert_eq!(
            relations[2].embedded,
            Some(Embedded::new("object.getiOSSmartphone()"))
        );
    }

    #[test]
    fn validate_rejects_empty_affordances() {
        assert!(Relation::new("self").validate("app::User").is_err());
        assert!(Relation::new("").with_href("/u/1").validate("app::User").is_err());
        assert!(Relation::new("self").with_href("").validate("app::User").is_err());
        assert!(Relation::new("self").with_href("/u/1").validate("app::User").is_ok());
        assert!(Relation::new("friends")
            .with_embedded("object.friends")
            .validate("app::User")
            .is_ok());
    }

    #[test]
    fn unwrap_expr_only_matches_wrapped_values() {
        assert_eq!(unwrap_expr("expr(object.id)"), Some("object.id"));
        assert_eq!(unwrap_expr(" expr( object.getId() ) "), Some("object.getId()"));
        assert_eq!(unwrap_expr("object.id"), None);
        assert_eq!(unwrap_expr("expression"), None);
    }

    #[test]
    fn builders_keep_attribute_order() {
        let relation = Relation::new("self")
            .with_href(Route::new("user_get").with_parameter("id", 7).absolute(true))
            .with_attribute("z", "last")
            .with_attribute("a", "first");
        let keys: Vec<&String> = relation.attributes.keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}

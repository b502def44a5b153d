//! Host metadata for synthetic types.
//!
//! The driver answers only for names minted by the
//! [`SyntheticTypeRegistry`] and describes them from the owner's relations:
//!
//! | kind         | one field per relation with | field value                     |
//! |--------------|-----------------------------|---------------------------------|
//! | `Embedded`   | `embedded`                  | the embedded content expression |
//! | `Links`      | `href`                      | the `Link:<name>` synthetic type |
//! | `Link:<name>`| `href`, name matches        | `href`, then the attributes      |

use std::sync::Arc;

use hateoas_core::relation::unwrap_expr;
use hateoas_core::{Exclusion, Href, LiteralMap, Relation, Result, Route, Value};
use hateoas_metadata::MetadataStore;
use hateoas_serializer::{ClassMetadata, MetadataDriver, PropertyMetadata, TypeRef};

use crate::synthetic::{SyntheticKind, SyntheticTypeIdentity, SyntheticTypeRegistry};
use crate::url::url_generator_service_id;

/// Where a synthetic field takes its value from.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntheticValue {
    Literal(Value),
    /// Evaluated with `object` bound to the owner.
    Expression(String),
    /// The owner itself, navigated as another synthetic type.
    Nested(SyntheticTypeIdentity),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticField {
    pub name: String,
    pub value: SyntheticValue,
    pub exclusion: Option<Exclusion>,
    pub xml_attribute: bool,
    pub xml_entry_name: Option<String>,
}

impl SyntheticField {
    fn new(name: impl Into<String>, value: SyntheticValue) -> Self {
        Self {
            name: name.into(),
            value,
            exclusion: None,
            xml_attribute: false,
            xml_entry_name: None,
        }
    }

    fn with_exclusion(mut self, exclusion: Option<&Exclusion>) -> Self {
        self.exclusion = exclusion.cloned();
        self
    }

    fn xml_attribute(mut self) -> Self {
        self.xml_attribute = true;
        self
    }

    fn into_property(self, class: &str) -> PropertyMetadata {
        let mut property = match self.value {
            SyntheticValue::Literal(value) => PropertyMetadata::static_value(class, self.name, value),
            SyntheticValue::Expression(expression) => {
                PropertyMetadata::expression(class, self.name, expression)
            }
            SyntheticValue::Nested(identity) => {
                PropertyMetadata::source(class, self.name).typed(identity.as_str())
            }
        };
        if let Some(exclusion) = self.exclusion {
            property.groups = exclusion.groups;
            property.since_version = exclusion.since_version;
            property.until_version = exclusion.until_version;
            property.exclude_if = exclusion.exclude_if;
            property.max_depth = exclusion.max_depth;
        }
        property.xml_attribute = self.xml_attribute;
        property.xml_entry_name = self.xml_entry_name;
        property
    }
}

/// The fields of one synthetic type, in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticMetadataDescriptor {
    pub identity: SyntheticTypeIdentity,
    pub fields: Vec<SyntheticField>,
}

impl SyntheticMetadataDescriptor {
    #[must_use]
    pub fn into_class_metadata(self) -> ClassMetadata {
        let class = self.identity.as_str();
        let mut metadata = ClassMetadata::new(class);
        for field in self.fields {
            metadata.add_property(field.into_property(class));
        }
        metadata
    }
}

/// Host [`MetadataDriver`] for synthetic types. Registered ahead of the
/// reflection driver; real classes fall through to it.
#[derive(Debug, Clone)]
pub struct EmbeddedMetadataDriver {
    store: Arc<MetadataStore>,
    registry: Arc<SyntheticTypeRegistry>,
}

impl EmbeddedMetadataDriver {
    #[must_use]
    pub fn new(store: Arc<MetadataStore>, registry: Arc<SyntheticTypeRegistry>) -> Self {
        Self { store, registry }
    }

    /// Describe a synthetic type. An owner without relations yields an
    /// empty descriptor.
    ///
    /// # Errors
    ///
    /// Propagates relation metadata failures.
    pub fn load_descriptor(&self, identity: &SyntheticTypeIdentity) -> Result<SyntheticMetadataDescriptor> {
        let mut descriptor = SyntheticMetadataDescriptor {
            identity: identity.clone(),
            fields: Vec::new(),
        };
        let Some(metadata) = self.store.metadata_for_class(identity.owner())? else {
            return Ok(descriptor);
        };

        for relation in metadata.relations() {
            match identity.kind() {
                SyntheticKind::Embedded => {
                    let Some(embedded) = &relation.embedded else {
                        continue;
                    };
                    let mut field = SyntheticField::new(
                        relation.name.as_str(),
                        SyntheticValue::Expression(embedded.content.clone()),
                    )
                    .with_exclusion(embedded.exclusion.as_ref().or(relation.exclusion.as_ref()));
                    field.xml_entry_name.clone_from(&embedded.xml_element_name);
                    descriptor.fields.push(field);
                }
                SyntheticKind::Links => {
                    if relation.href.is_none() {
                        continue;
                    }
                    let link = self
                        .registry
                        .mint(identity.owner(), SyntheticKind::Link(relation.name.clone()));
                    descriptor.fields.push(
                        SyntheticField::new(relation.name.as_str(), SyntheticValue::Nested(link))
                            .with_exclusion(relation.exclusion.as_ref()),
                    );
                }
                SyntheticKind::Link(name) if *name == relation.name => {
                    let Some(href) = &relation.href else {
                        continue;
                    };
                    // a later relation of the same name replaces the link
                    descriptor.fields = link_fields(relation, href);
                }
                SyntheticKind::Link(_) => {}
            }
        }
        Ok(descriptor)
    }
}

impl MetadataDriver for EmbeddedMetadataDriver {
    fn load_metadata_for_class(&self, ty: &TypeRef<'_>) -> Result<Option<ClassMetadata>> {
        if !self.registry.is_synthetic(ty.name) {
            return Ok(None);
        }
        let (owner, kind) = match self.registry.decode(ty.name) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::debug!(type_name = ty.name, error = %err, "not a synthetic type");
                return Ok(None);
            }
        };

        let identity = self.registry.mint(owner, kind);
        let descriptor = self.load_descriptor(&identity)?;
        tracing::debug!(
            identity = %identity,
            fields = descriptor.fields.len(),
            "synthesized metadata"
        );
        Ok(Some(descriptor.into_class_metadata()))
    }
}

/// Fields of a link object. They share the relation's groups so that a
/// link kept by a group filter is not emptied by the same filter; the other
/// exclusion rules were already applied to the link itself.
fn link_fields(relation: &Relation, href: &Href) -> Vec<SyntheticField> {
    let groups = relation
        .exclusion
        .as_ref()
        .and_then(|exclusion| exclusion.groups.clone())
        .map(|groups| Exclusion {
            groups: Some(groups),
            ..Exclusion::default()
        });
    let href = match href {
        Href::Url(url) => SyntheticValue::Literal(Value::String(url.clone())),
        Href::Route(route) => SyntheticValue::Expression(route_expression(route)),
    };

    let mut fields = vec![SyntheticField::new("href", href)];
    fields.extend(relation.attributes.iter().map(|(name, value)| {
        SyntheticField::new(name.as_str(), SyntheticValue::Literal(Value::from(value.clone())))
    }));
    fields
        .into_iter()
        .map(|field| field.with_exclusion(groups.as_ref()).xml_attribute())
        .collect()
}

/// `service('<generator>').generate('<route>', {<parameters>}, <absolute>)`
fn route_expression(route: &Route) -> String {
    format!(
        "service({}).generate({}, {}, {})",
        quote(&url_generator_service_id(route.generator.as_deref())),
        quote(&route.name),
        parameters_expression(&route.parameters),
        route.absolute,
    )
}

fn parameters_expression(parameters: &LiteralMap) -> String {
    let entries: Vec<String> = parameters
        .iter()
        .map(|(name, value)| {
            let value = match value {
                serde_json::Value::String(s) => {
                    unwrap_expr(s).map_or_else(|| quote(s), |expression| format!("({expression})"))
                }
                other => literal_expression(other),
            };
            format!("{}: {value}", quote(name))
        })
        .collect();
    format!("{{{}}}", entries.join(", "))
}

fn literal_expression(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => quote(s),
        serde_json::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(literal_expression).collect();
            format!("[{}]", items.join(", "))
        }
        serde_json::Value::Object(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), literal_expression(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if matches!(c, '\'' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use hateoas_core::{ClassInfo, Embedded, HateoasError};
    use hateoas_metadata::StaticDriver;
    use hateoas_serializer::Accessor;

    static USER: ClassInfo = ClassInfo::new("app::User");
    static PLAIN: ClassInfo = ClassInfo::new("app::Plain");
    static TAGGED: ClassInfo = ClassInfo::new("app::Tagged")
        .with_parent(&USER)
        .with_interfaces(&[&PLAIN]);

    fn relations() -> Vec<Relation> {
        vec![
            Relation::new("self")
                .with_href("http://adrienbrault.fr")
                .with_attribute("foo", "bar")
                .with_attribute("answer", 42)
                .with_exclusion(Exclusion::default().with_groups(["simple"])),
            Relation::new("manager")
                .with_href(
                    Route::new("user_get")
                        .with_parameter("id", "expr(object.managerId)")
                        .with_parameter("format", "it's")
                        .absolute(true)
                        .with_generator("admin"),
                )
                .with_embedded(
                    Embedded::new("object.getManager()")
                        .with_xml_element_name("boss")
                        .with_exclusion(Exclusion::default().max_depth(1)),
                )
                .with_exclusion(Exclusion::default().exclude_if("object.managerId == null")),
            Relation::new("friends").with_embedded("object.friends"),
        ]
    }

    fn driver() -> (EmbeddedMetadataDriver, Arc<SyntheticTypeRegistry>) {
        let relations_driver = StaticDriver::new();
        relations_driver.register(USER.name, relations()).unwrap();
        let store = Arc::new(MetadataStore::new(relations_driver));
        let registry = Arc::new(SyntheticTypeRegistry::new());
        (EmbeddedMetadataDriver::new(store, Arc::clone(&registry)), registry)
    }

    fn names(descriptor: &SyntheticMetadataDescriptor) -> Vec<&str> {
        descriptor.fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn links_reference_one_link_type_per_href_relation() {
        let (driver, registry) = driver();
        let links = registry.mint(&USER, SyntheticKind::Links);
        let descriptor = driver.load_descriptor(&links).unwrap();

        assert_eq!(names(&descriptor), vec!["self", "manager"]);
        assert_eq!(
            descriptor.fields[0].value,
            SyntheticValue::Nested(registry.mint(&USER, SyntheticKind::Link("self".into())))
        );
        assert_eq!(
            descriptor.fields[0].exclusion.as_ref().unwrap().groups.as_deref(),
            Some(&["simple".to_string()][..])
        );
    }

    #[test]
    fn embedded_prefers_its_own_exclusion() {
        let (driver, registry) = driver();
        let embedded = registry.mint(&USER, SyntheticKind::Embedded);
        let descriptor = driver.load_descriptor(&embedded).unwrap();

        assert_eq!(names(&descriptor), vec!["manager", "friends"]);
        let manager = &descriptor.fields[0];
        assert_eq!(
            manager.value,
            SyntheticValue::Expression("object.getManager()".to_string())
        );
        assert_eq!(manager.exclusion, Some(Exclusion::default().max_depth(1)));
        assert_eq!(manager.xml_entry_name.as_deref(), Some("boss"));
        assert_eq!(descriptor.fields[1].exclusion, None);
    }

    #[test]
    fn literal_link_has_href_then_attributes() {
        let (driver, registry) = driver();
        let link = registry.mint(&USER, SyntheticKind::Link("self".into()));
        let descriptor = driver.load_descriptor(&link).unwrap();

        assert_eq!(names(&descriptor), vec!["href", "foo", "answer"]);
        assert!(descriptor.fields.iter().all(|f| f.xml_attribute));
        assert_eq!(
            descriptor.fields[0].value,
            SyntheticValue::Literal(Value::from("http://adrienbrault.fr"))
        );
        assert_eq!(descriptor.fields[2].value, SyntheticValue::Literal(Value::Int(42)));
        assert!(descriptor
            .fields
            .iter()
            .all(|f| f.exclusion == Some(Exclusion::default().with_groups(["simple"]))));
    }

    #[test]
    fn later_relations_replace_links_of_the_same_name() {
        let relations_driver = StaticDriver::new();
        relations_driver
            .register(
                USER.name,
                vec![
                    Relation::new("self").with_href("/users/1").with_attribute("type", "user"),
                    Relation::new("author").with_href("/authors/1"),
                ],
            )
            .unwrap();
        relations_driver
            .register(PLAIN.name, vec![Relation::new("self").with_href("/plain").with_attribute("templated", false)])
            .unwrap();

        let store = MetadataStore::new(relations_driver).include_interfaces(true);
        let registry = Arc::new(SyntheticTypeRegistry::new());
        let driver = EmbeddedMetadataDriver::new(Arc::new(store), Arc::clone(&registry));

        let links = driver
            .load_metadata_for_class(&TypeRef::named(registry.mint(&TAGGED, SyntheticKind::Links).as_str()))
            .unwrap()
            .unwrap();
        let link_names: Vec<&str> = links.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(link_names, vec!["self", "author"]);

        let link = registry.mint(&TAGGED, SyntheticKind::Link("self".into()));
        let descriptor = driver.load_descriptor(&link).unwrap();
        assert_eq!(names(&descriptor), vec!["href", "templated"]);
        assert_eq!(
            descriptor.fields[0].value,
            SyntheticValue::Literal(Value::from("/plain"))
        );
    }

    #[test]
    fn route_link_compiles_to_a_generator_call() {
        let (driver, registry) = driver();
        let link = registry.mint(&USER, SyntheticKind::Link("manager".into()));
        let descriptor = driver.load_descriptor(&link).unwrap();

        assert_eq!(names(&descriptor), vec!["href"]);
        assert_eq!(
            descriptor.fields[0].value,
            SyntheticValue::Expression(
                r"service('hateoas.url_generator.admin').generate('user_get', {'id': (object.managerId), 'format': 'it\'s'}, true)"
                    .to_string()
            )
        );
    }

    #[test]
    fn parameter_literals_keep_their_type() {
        let parameters: LiteralMap = serde_json::from_str(
            r#"{"page": 2, "draft": false, "tags": ["a", "b"], "none": null}"#,
        )
        .unwrap();
        assert_eq!(
            parameters_expression(&parameters),
            "{'page': 2, 'draft': false, 'tags': ['a', 'b'], 'none': null}"
        );
        assert_eq!(parameters_expression(&LiteralMap::new()), "{}");
    }

    #[test]
    fn unknown_link_names_and_plain_owners_are_empty() {
        let (driver, registry) = driver();
        let unknown = registry.mint(&USER, SyntheticKind::Link("nope".into()));
        assert!(driver.load_descriptor(&unknown).unwrap().fields.is_empty());

        let plain = registry.mint(&PLAIN, SyntheticKind::Links);
        assert!(driver.load_descriptor(&plain).unwrap().fields.is_empty());
    }

    #[test]
    fn host_driver_answers_only_for_synthetic_types() {
        let (driver, registry) = driver();
        assert!(driver
            .load_metadata_for_class(&TypeRef::class(&USER))
            .unwrap()
            .is_none());
        assert!(driver
            .load_metadata_for_class(&TypeRef::named("never::Minted#hateoas#Links"))
            .unwrap()
            .is_none());

        let embedded = registry.mint(&USER, SyntheticKind::Embedded);
        let metadata = driver
            .load_metadata_for_class(&TypeRef::named(embedded.as_str()))
            .unwrap()
            .unwrap();
        assert_eq!(metadata.name, embedded.as_str());
        let manager = metadata.property("manager").unwrap();
        assert_eq!(
            manager.accessor,
            Accessor::Expression("object.getManager()".to_string())
        );
        assert_eq!(manager.max_depth, Some(1));

        let links = registry.mint(&USER, SyntheticKind::Links);
        let metadata = driver
            .load_metadata_for_class(&TypeRef::named(links.as_str()))
            .unwrap()
            .unwrap();
        let manager = metadata.property("manager").unwrap();
        assert_eq!(manager.accessor, Accessor::Source);
        assert_eq!(manager.type_name.as_deref(), Some("app::User#hateoas#Link:manager"));
        assert_eq!(manager.exclude_if.as_deref(), Some("object.managerId == null"));
    }

    #[test]
    fn relation_failures_propagate() {
        struct Failing;

        impl hateoas_metadata::RelationDriver for Failing {
            fn load_class(
                &self,
                class: &'static ClassInfo,
            ) -> std::result::Result<Option<hateoas_core::ClassRelationMetadata>, hateoas_core::MetadataError>
            {
                Err(hateoas_core::MetadataError::InvalidRelation {
                    class: class.name.to_string(),
                    reason: "broken".to_string(),
                })
            }
        }

        let registry = Arc::new(SyntheticTypeRegistry::new());
        let driver = EmbeddedMetadataDriver::new(Arc::new(MetadataStore::new(Failing)), Arc::clone(&registry));
        let links = registry.mint(&USER, SyntheticKind::Links);
        assert!(matches!(
            driver.load_descriptor(&links),
            Err(HateoasError::Metadata(_))
        ));
    }
}

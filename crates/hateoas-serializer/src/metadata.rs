//! Host class and property metadata: what gets written for an object and
//! under which conditions.

use hateoas_core::Value;

/// How a property obtains its value from the object being serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// [`hateoas_core::Object::property`] with the property name.
    Reflection,
    /// A fixed value.
    Static(Value),
    /// An expression evaluated with `object` bound to the object.
    Expression(String),
    /// The object itself, usually viewed through another type.
    Source,
}

/// One serialized property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMetadata {
    /// Declaring type.
    pub class: String,
    pub name: String,
    /// Key written to the output.
    pub serialized_name: String,
    pub accessor: Accessor,
    /// Type used to navigate the value instead of its runtime class.
    pub type_name: Option<String>,
    pub groups: Option<Vec<String>>,
    pub since_version: Option<String>,
    pub until_version: Option<String>,
    pub exclude_if: Option<String>,
    pub max_depth: Option<usize>,
    /// Omit the property when it serializes to an empty map or list.
    pub skip_when_empty: bool,
    pub xml_attribute: bool,
    pub xml_entry_name: Option<String>,
}

impl PropertyMetadata {
    fn with_accessor(class: impl Into<String>, name: impl Into<String>, accessor: Accessor) -> Self {
        let name = name.into();
        Self {
            class: class.into(),
            serialized_name: name.clone(),
            name,
            accessor,
            type_name: None,
            groups: None,
            since_version: None,
            until_version: None,
            exclude_if: None,
            max_depth: None,
            skip_when_empty: false,
            xml_attribute: false,
            xml_entry_name: None,
        }
    }

    #[must_use]
    pub fn reflection(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_accessor(class, name, Accessor::Reflection)
    }

    #[must_use]
    pub fn static_value(class: impl Into<String>, name: impl Into<String>, value: Value) -> Self {
        Self::with_accessor(class, name, Accessor::Static(value))
    }

    #[must_use]
    pub fn expression(
        class: impl Into<String>,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self::with_accessor(class, name, Accessor::Expression(expression.into()))
    }

    #[must_use]
    pub fn source(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_accessor(class, name, Accessor::Source)
    }

    #[must_use]
    pub fn serialized_as(mut self, name: impl Into<String>) -> Self {
        self.serialized_name = name.into();
        self
    }

    #[must_use]
    pub fn typed(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    #[must_use]
    pub fn skip_when_empty(mut self) -> Self {
        self.skip_when_empty = true;
        self
    }
}

/// Properties of one type, in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetadata {
    pub name: String,
    pub properties: Vec<PropertyMetadata>,
}

impl ClassMetadata {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Add a property, replacing an earlier one with the same name.
    pub fn add_property(&mut self, property: PropertyMetadata) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }
}

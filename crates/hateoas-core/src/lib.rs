//! # hateoas-core
//!
//! Core types shared by every hateoas crate:
//! - [`Value`], [`Object`] and [`ClassInfo`]: the object model the
//!   serializer walks and expressions inspect
//! - [`Relation`] and friends: declared hypermedia affordances
//! - [`ClassRelationMetadata`]: the relations of one class
//! - Collaborator contracts ([`ExpressionEvaluator`], [`Container`],
//!   [`UrlGenerator`])
//! - Error hierarchy ([`HateoasError`], [`ExpressionError`], [`ConfigError`],
//!   [`MetadataError`])

pub mod class;
pub mod error;
pub mod expression;
pub mod metadata;
pub mod relation;
pub mod value;

pub use class::{ClassInfo, PropertyInfo};
pub use error::{ConfigError, ExpressionError, HateoasError, MetadataError, Result};
pub use expression::{Bindings, Container, ExpressionEvaluator, UrlGenerator};
pub use metadata::ClassRelationMetadata;
pub use relation::{Embedded, Exclusion, Href, LiteralMap, Relation, Route};
pub use value::{Object, ObjectRef, Value};

//! Error types for the hateoas workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level result type for hateoas operations.
pub type Result<T> = std::result::Result<T, HateoasError>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum HateoasError {
    /// A type name carries no synthetic marker, or carries one that this
    /// process never minted. Metadata drivers treat this as "not my class".
    #[error("malformed synthetic type identity '{identity}': {reason}")]
    MalformedSyntheticIdentity { identity: String, reason: String },

    /// An embedding expression, href expression or route could not be
    /// resolved while serializing a synthetic property.
    #[error("cannot resolve relation target '{property}': {source}")]
    UnknownRelationTarget {
        property: String,
        #[source]
        source: ExpressionError,
    },

    #[error("expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while evaluating an expression or generating a URL.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("syntax error in '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("unknown property '{property}' on {class}")]
    UnknownProperty { class: String, property: String },

    #[error("unknown method '{method}' on {class}")]
    UnknownMethod { class: String, method: String },

    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("unknown route '{0}'")]
    UnknownRoute(String),

    #[error("type error: {0}")]
    Type(String),
}

/// Errors raised while building a configured instance. All of them are
/// fatal and happen before any serialization.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not create or write directory '{}': {source}", path.display())]
    DirectoryOrCacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("a metadata directory is already configured for the namespace prefix '{prefix}'; use replace_metadata_dir() to override it")]
    DuplicateMetadataDirectory { prefix: String },

    #[error("no metadata directory is configured for the namespace prefix '{prefix}'; use add_metadata_dir() to add it")]
    UnknownMetadataDirectory { prefix: String },

    #[error("invalid synthetic marker '{0}': it must contain a character that cannot appear in a type path")]
    InvalidMarker(String),
}

/// Errors raised while loading relation metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("cannot read metadata file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse metadata file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("metadata file '{}' does not describe class '{class}'", path.display())]
    ClassMismatch { path: PathBuf, class: String },

    #[error("invalid relation on '{class}': {reason}")]
    InvalidRelation { class: String, reason: String },

    #[error("relation '{relation}' is declared more than once on '{class}'")]
    DuplicateRelation { class: String, relation: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_human_readable_messages() {
        let err = ConfigError::DuplicateMetadataDirectory {
            prefix: "app::model".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("app::model"));
        assert!(msg.contains("replace_metadata_dir"));

        let err = HateoasError::UnknownRelationTarget {
            property: "href".to_string(),
            source: ExpressionError::UnknownRoute("user_get".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("href"));
        assert!(msg.contains("user_get"));
    }

    #[test]
    fn nested_errors_convert_into_top_level() {
        let err: HateoasError = ExpressionError::UnknownVariable("foo".to_string()).into();
        assert!(matches!(err, HateoasError::Expression(_)));

        let err: HateoasError = MetadataError::DuplicateRelation {
            class: "app::User".to_string(),
            relation: "self".to_string(),
        }
        .into();
        assert!(err.to_string().contains("more than once"));
    }
}

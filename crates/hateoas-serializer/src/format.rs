//! Output rendering: compact JSON, pretty JSON and YAML.

use hateoas_core::{HateoasError, Result};

/// Output format of [`crate::Serializer::serialize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    JsonPretty,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = HateoasError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "json-pretty" => Ok(Self::JsonPretty),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(HateoasError::Serialization(format!(
                "unknown output format '{other}'"
            ))),
        }
    }
}

/// Render a serialized tree.
///
/// # Errors
///
/// Returns [`HateoasError::Serialization`] if the encoder fails.
pub fn render(tree: &serde_json::Value, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(tree).map_err(|e| e.to_string()),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(tree).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(tree).map_err(|e| e.to_string()),
    };
    rendered.map_err(HateoasError::Serialization)
}

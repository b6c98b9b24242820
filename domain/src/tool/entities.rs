//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared shape of a single input field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldShape {
    /// Field name as it appears in the arguments object
    pub name: String,
    /// JSON type hint (e.g., "string", "number", "array"); "any" when undeclared
    pub field_type: String,
    /// Human-readable description, if the provider declared one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the provider lists this field as required
    pub required: bool,
    /// Enumerated allowed values (empty when unconstrained)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    /// Default value, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Input-shape declaration of a tool: field name → field constraints.
///
/// Built from the JSON Schema object a provider reports as `inputSchema`.
/// Fields are ordered by name, required-ness is taken from the schema's
/// top-level `required` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputShape {
    pub fields: Vec<FieldShape>,
}

impl InputShape {
    /// Build an input shape from a JSON Schema value.
    ///
    /// Anything that is not an object with `properties` yields an empty shape.
    pub fn from_json_schema(schema: &Value) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
            return Self::default();
        };

        let fields = properties
            .iter()
            .map(|(name, prop)| FieldShape {
                name: name.clone(),
                field_type: prop
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("any")
                    .to_string(),
                description: prop
                    .get("description")
                    .and_then(|d| d.as_str())
                    .map(str::to_string),
                required: required.contains(&name.as_str()),
                enum_values: prop
                    .get("enum")
                    .and_then(|e| e.as_array())
                    .cloned()
                    .unwrap_or_default(),
                default: prop.get("default").cloned(),
            })
            .collect();

        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldShape> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Compact one-line summary, e.g. `query: string (required), limit: number = 10`.
    pub fn summary(&self) -> String {
        self.fields
            .iter()
            .map(|f| {
                let mut s = format!("{}: {}", f.name, f.field_type);
                if f.required {
                    s.push_str(" (required)");
                }
                if !f.enum_values.is_empty() {
                    let values: Vec<String> = f.enum_values.iter().map(|v| v.to_string()).collect();
                    s.push_str(&format!(" one of [{}]", values.join(", ")));
                }
                if let Some(default) = &f.default {
                    s.push_str(&format!(" = {}", default));
                }
                s
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Wire form of a tool definition as returned by `tools/list`.
#[derive(Debug, Clone, Deserialize)]
struct WireToolDescriptor {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "inputSchema")]
    input_schema: Value,
}

/// One callable operation exposed by a provider.
///
/// Immutable once fetched from the provider's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireToolDescriptor")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_shape: InputShape,
}

impl From<WireToolDescriptor> for ToolDescriptor {
    fn from(wire: WireToolDescriptor) -> Self {
        Self {
            input_shape: InputShape::from_json_schema(&wire.input_schema),
            name: wire.name,
            description: wire.description.unwrap_or_default(),
        }
    }
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_shape: InputShape::default(),
        }
    }

    pub fn with_input_shape(mut self, shape: InputShape) -> Self {
        self.input_shape = shape;
        self
    }
}

/// A tool annotated with the name of the provider that owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderTool {
    pub provider: String,
    #[serde(flatten)]
    pub tool: ToolDescriptor,
}

impl ProviderTool {
    pub fn new(provider: impl Into<String>, tool: ToolDescriptor) -> Self {
        Self {
            provider: provider.into(),
            tool,
        }
    }

    /// `provider.tool`, the form the reasoning oracle refers to tools by.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.provider, self.tool.name)
    }
}

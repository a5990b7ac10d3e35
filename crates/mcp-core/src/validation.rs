//! Argument validation for tool calls.
//!
//! An [`ArgumentSchema`] pairs the JSON schema advertised for a tool with a
//! compiled validator. [`ArgumentSchema::normalize`] is the only entry point
//! the dispatcher uses: it fills in declared defaults, checks the result and
//! hands back either the normalized payload or every failing field at once.

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use serde_path_to_error::Segment;

use crate::handler::{generate_schema, ToolError, ToolResult};

/// Pointer used when the failure concerns the payload as a whole.
const ROOT_PATH: &str = "/";

pub struct ArgumentSchema {
    schema: Value,
    validator: Validator,
}

impl std::fmt::Debug for ArgumentSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentSchema")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl ArgumentSchema {
    pub fn new(schema: Value) -> ToolResult<Self> {
        if !schema.is_object() {
            return Err(ToolError::SchemaError(
                "tool input schema must be a JSON object".to_string(),
            ));
        }
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| ToolError::SchemaError(format!("Failed to compile schema: {}", e)))?;
        Ok(Self { schema, validator })
    }

    /// Builds the schema from a typed parameter struct.
    pub fn for_type<T: JsonSchema>() -> ToolResult<Self> {
        Self::new(generate_schema::<T>()?)
    }

    /// The schema as a JSON object, the shape MCP expects for `inputSchema`.
    pub fn as_object(&self) -> Map<String, Value> {
        self.schema.as_object().cloned().unwrap_or_default()
    }

    /// Applies defaults and validates `arguments`.
    ///
    /// A missing (`null`) payload is treated as an empty object. The payload
    /// is returned untouched by validation failures: either every default is
    /// applied and every constraint holds, or the error lists all offending
    /// field paths.
    pub fn normalize(&self, arguments: Value) -> ToolResult<Value> {
        let mut arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        apply_defaults(&self.schema, &mut arguments);

        let mut fields = Vec::new();
        let mut messages = Vec::new();
        for error in self.validator.iter_errors(&arguments) {
            let path = field_path(&error);
            messages.push(format!("{}: {}", path, error));
            if !fields.contains(&path) {
                fields.push(path);
            }
        }

        if fields.is_empty() {
            Ok(arguments)
        } else {
            Err(ToolError::invalid_parameters(messages.join("; "), fields))
        }
    }
}

/// Converts an already normalized payload into the handler's typed arguments.
///
/// The schema can accept values the typed struct still refuses; such a
/// failure is reported at the pointer of the field serde rejected.
pub fn deserialize_arguments<T: DeserializeOwned>(arguments: Value) -> ToolResult<T> {
    serde_path_to_error::deserialize(arguments).map_err(|e| {
        let path = pointer(e.path());
        let message = format!("{}: {}", path, e.inner());
        ToolError::invalid_parameters(message, vec![path])
    })
}

fn pointer(path: &serde_path_to_error::Path) -> String {
    let mut pointer = String::new();
    for segment in path.iter() {
        match segment {
            Segment::Seq { index } => pointer.push_str(&format!("/{}", index)),
            Segment::Map { key } => pointer.push_str(&format!("/{}", key)),
            Segment::Enum { variant } => pointer.push_str(&format!("/{}", variant)),
            Segment::Unknown => break,
        }
    }
    if pointer.is_empty() {
        ROOT_PATH.to_string()
    } else {
        pointer
    }
}

fn apply_defaults(schema: &Value, arguments: &mut Value) {
    let (Some(properties), Some(target)) = (
        schema.get("properties").and_then(Value::as_object),
        arguments.as_object_mut(),
    ) else {
        return;
    };

    for (name, property) in properties {
        if let Some(default) = property.get("default") {
            if !target.contains_key(name) {
                target.insert(name.clone(), default.clone());
            }
        }
    }
}

fn field_path(error: &ValidationError<'_>) -> String {
    let base = error.instance_path.to_string();
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| property.to_string());
            format!("{}/{}", base, name)
        }
        _ if base.is_empty() => ROOT_PATH.to_string(),
        _ => base,
    }
}

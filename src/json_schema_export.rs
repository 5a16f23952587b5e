//! Typedef registry → JSON Schema (draft 2020-12) export.
//!
//! Every registered typedef becomes an entry of the `$defs` map. Property
//! types naming another registered typedef become `$ref`s.

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::ast::{PropDef, Structure, TypeBounds, TypeDef};
use crate::jsdoc::classify_type;
use crate::registry::TypeRegistry;
use crate::FunarError;

// ── Public API ─────────────────────────────────────────────────────────────

/// Converts every typedef of `registry` into a JSON Schema document string.
///
/// Set `pretty` to `true` for indented output.
pub fn typedefs_to_json_schema(registry: &TypeRegistry, pretty: bool) -> Result<String, FunarError> {
    let mut defs = JsonMap::new();
    for def in registry.iter() {
        defs.insert(def.name.clone(), def.to_json_schema(registry));
    }

    let mut root = JsonMap::new();
    root.insert(
        "$schema".to_string(),
        JsonValue::String("https://json-schema.org/draft/2020-12/schema".to_string()),
    );
    root.insert("$defs".to_string(), JsonValue::Object(defs));

    let root_value = JsonValue::Object(root);
    if pretty {
        serde_json::to_string_pretty(&root_value)
            .map_err(|e| FunarError::SerializationError(e.to_string()))
    } else {
        serde_json::to_string(&root_value)
            .map_err(|e| FunarError::SerializationError(e.to_string()))
    }
}

impl TypeDef {
    /// JSON Schema node for this typedef; `registry` resolves `$ref` targets.
    pub fn to_json_schema(&self, registry: &TypeRegistry) -> JsonValue {
        let mut out = if self.is_object() {
            object_schema(&self.props, registry)
        } else {
            as_map(convert_type(&self.base_type, registry))
        };
        if let Some(description) = &self.description {
            out.insert(
                "description".to_string(),
                JsonValue::String(description.clone()),
            );
        }
        insert_bounds(&mut out, &self.bounds);
        JsonValue::Object(out)
    }
}

// ── Conversion helpers ──────────────────────────────────────────────────────

fn object_schema(
    props: &IndexMap<String, PropDef>,
    registry: &TypeRegistry,
) -> JsonMap<String, JsonValue> {
    let mut out = JsonMap::new();
    out.insert("type".to_string(), JsonValue::String("object".to_string()));

    let mut properties = JsonMap::new();
    let mut required = Vec::new();
    for (name, prop) in props {
        properties.insert(name.clone(), convert_prop(prop, registry));
        if !prop.is_optional {
            required.push(JsonValue::String(name.clone()));
        }
    }
    if !properties.is_empty() {
        out.insert("properties".to_string(), JsonValue::Object(properties));
    }
    if !required.is_empty() {
        out.insert("required".to_string(), JsonValue::Array(required));
    }
    out
}

fn convert_prop(prop: &PropDef, registry: &TypeRegistry) -> JsonValue {
    let mut out = match prop.type_name.as_deref() {
        Some(type_name) => as_map(convert_type(type_name, registry)),
        None => JsonMap::new(),
    };
    if let Some(description) = &prop.description {
        out.insert(
            "description".to_string(),
            JsonValue::String(description.clone()),
        );
    }
    if let Some(default) = &prop.default {
        out.insert("default".to_string(), default.clone());
    }
    insert_bounds(&mut out, &prop.bounds);
    JsonValue::Object(out)
}

/// Convert a type expression (`string`, `ColorHex`, `number[]`, `"a"|"b"`).
fn convert_type(type_expr: &str, registry: &TypeRegistry) -> JsonValue {
    let type_expr = type_expr.trim();
    if registry.contains(type_expr) {
        return ref_to(type_expr);
    }
    if let Some(primitive) = primitive_name(type_expr) {
        return type_only(primitive);
    }

    match classify_type(type_expr) {
        Some((Structure::Array, element)) => {
            let mut out = as_map(type_only("array"));
            out.insert("items".to_string(), convert_type(&element, registry));
            JsonValue::Object(out)
        }
        Some((Structure::Object, value)) => {
            let mut out = as_map(type_only("object"));
            out.insert(
                "additionalProperties".to_string(),
                convert_type(&value, registry),
            );
            JsonValue::Object(out)
        }
        Some((Structure::Enum, _)) => {
            let members = type_expr
                .split('|')
                .filter_map(|m| serde_json::from_str::<JsonValue>(m.trim()).ok())
                .collect();
            let mut out = JsonMap::new();
            out.insert("enum".to_string(), JsonValue::Array(members));
            JsonValue::Object(out)
        }
        None if type_expr.contains('|') => {
            let any_of = type_expr
                .split('|')
                .map(|member| convert_type(member, registry))
                .collect();
            let mut out = JsonMap::new();
            out.insert("anyOf".to_string(), JsonValue::Array(any_of));
            JsonValue::Object(out)
        }
        // Unknown names are left unconstrained.
        None => JsonValue::Object(JsonMap::new()),
    }
}

fn primitive_name(type_expr: &str) -> Option<&'static str> {
    match type_expr {
        "string" | "String" => Some("string"),
        "number" | "Number" => Some("number"),
        "bigint" | "integer" => Some("integer"),
        "boolean" | "Boolean" => Some("boolean"),
        "null" => Some("null"),
        "Object" | "object" => Some("object"),
        "Array" | "array" => Some("array"),
        _ => None,
    }
}

fn type_only(name: &str) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("type".to_string(), JsonValue::String(name.to_string()));
    JsonValue::Object(out)
}

fn ref_to(name: &str) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert(
        "$ref".to_string(),
        JsonValue::String(format!("#/$defs/{name}")),
    );
    JsonValue::Object(out)
}

fn as_map(value: JsonValue) -> JsonMap<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        _ => JsonMap::new(),
    }
}

/// Range bounds already use JSON Schema keyword names.
fn insert_bounds(out: &mut JsonMap<String, JsonValue>, bounds: &TypeBounds) {
    if let Ok(JsonValue::Object(map)) = serde_json::to_value(bounds) {
        out.extend(map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prop(name: &str, type_name: &str, optional: bool) -> (String, PropDef) {
        (
            name.to_string(),
            PropDef {
                name: name.to_string(),
                type_name: Some(type_name.to_string()),
                is_optional: optional,
                ..Default::default()
            },
        )
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDef::new(
            "ColorHex",
            Some("string"),
            IndexMap::new(),
            Some("6"),
            Some("RGB Color in hex".to_string()),
        ));
        registry.register(TypeDef::new(
            "Query",
            None,
            IndexMap::from([
                prop("color", "ColorHex", false),
                prop("tags", "string[]", true),
                prop("mode", "\"fast\"|\"slow\"", true),
            ]),
            Some("1-"),
            None,
        ));
        registry
    }

    #[test]
    fn exports_typedefs_with_bounds_and_refs() {
        let registry = registry();
        let out: JsonValue =
            serde_json::from_str(&typedefs_to_json_schema(&registry, false).unwrap()).unwrap();

        assert_eq!(
            out["$schema"],
            json!("https://json-schema.org/draft/2020-12/schema")
        );
        assert_eq!(
            out["$defs"]["ColorHex"],
            json!({
                "type": "string",
                "description": "RGB Color in hex",
                "minLength": 6,
                "maxLength": 6
            })
        );
        assert_eq!(
            out["$defs"]["Query"],
            json!({
                "type": "object",
                "properties": {
                    "color": {"$ref": "#/$defs/ColorHex"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "mode": {"enum": ["fast", "slow"]}
                },
                "required": ["color"],
                "minProperties": 1
            })
        );
    }

    #[test]
    fn unions_and_unknown_names() {
        let registry = TypeRegistry::new();
        assert_eq!(
            convert_type("string|number", &registry),
            json!({"anyOf": [{"type": "string"}, {"type": "number"}]})
        );
        assert_eq!(convert_type("Function", &registry), json!({}));
        assert_eq!(
            convert_type("Record<boolean>", &registry),
            json!({"type": "object", "additionalProperties": {"type": "boolean"}})
        );
    }
}

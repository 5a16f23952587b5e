//! Argument mapper: flat CLI options to and from nested call arguments.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::ast::{FunContract, ParameterDescriptor, Structure};
use crate::error::FunarError;
use crate::source::parser::number_literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Value kind understood by the flag parser.
pub enum OptionKind {
    String,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One CLI option.
pub struct OptionSpec {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    /// Option may repeat and collects into an array.
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// Option schema plus the placement table driving the mapper.
pub struct CliSchema {
    pub options: IndexMap<String, OptionSpec>,
    pub placement: IndexMap<String, ParameterDescriptor>,
}

impl CliSchema {
    pub fn mapper(&self) -> ArgumentMapper {
        ArgumentMapper::new(self.placement.clone())
    }
}

/// Builds the option schema of `contract`.
///
/// Variables without a resolved type are left out. An option is boolean
/// only when the variable type (or its element type, for composites) is
/// `boolean`.
pub fn build_cli_schema(contract: &FunContract) -> CliSchema {
    let mut schema = CliSchema::default();

    for (name, var) in &contract.vars {
        let Some(type_name) = var.type_name.as_deref() else {
            continue;
        };
        let effective = match (&var.structure, var.contains.as_deref()) {
            (Some(_), Some(contains)) => contains,
            _ => type_name,
        };
        let kind = if effective == "boolean" {
            OptionKind::Boolean
        } else {
            OptionKind::String
        };
        let short = var
            .alias
            .clone()
            .filter(|alias| alias.chars().count() == 1);

        schema.options.insert(
            name.clone(),
            OptionSpec {
                kind,
                multiple: var.structure == Some(Structure::Array),
                short,
                default: var.default.clone(),
                description: var.description.clone(),
            },
        );
        schema.placement.insert(name.clone(), var.clone());
    }
    schema
}

#[derive(Debug, Clone)]
/// Maps parsed option values onto the call-argument array and back.
pub struct ArgumentMapper {
    placement: IndexMap<String, ParameterDescriptor>,
}

impl ArgumentMapper {
    pub fn new(placement: IndexMap<String, ParameterDescriptor>) -> Self {
        Self { placement }
    }

    /// Builds call arguments from option values keyed by option name.
    ///
    /// Required options must carry a truthy value. `number` and `bigint`
    /// options (or arrays of them) are coerced from their string form; other
    /// values pass through unchanged. Positional gaps are filled with `null`.
    pub fn map(&self, values: &JsonMap<String, JsonValue>) -> Result<Vec<JsonValue>, FunarError> {
        let mut args: Vec<JsonValue> = Vec::new();

        for (option, var) in &self.placement {
            let value = values.get(option).filter(|v| !v.is_null());
            if !var.optional() && value.map_or(true, is_falsy) {
                return Err(FunarError::MissingRequired {
                    option: option.clone(),
                });
            }
            let value_type = match var.structure {
                Some(Structure::Array) => var.contains.as_deref().or(var.type_name.as_deref()),
                _ => var.type_name.as_deref(),
            };
            let value = value
                .map(|v| coerce(option, value_type, v))
                .transpose()?;

            let path = var.path.as_str();
            let segments = path_segments(path);
            let (first, rest) = segments
                .split_first()
                .ok_or_else(|| FunarError::PathError(format!("empty path for '{option}'")))?;
            let index: usize = first.parse().map_err(|_| {
                FunarError::PathError(format!("path '{path}' does not start with a position"))
            })?;

            if rest.is_empty() {
                if let Some(value) = value {
                    *slot(&mut args, index) = value;
                }
                continue;
            }

            let mut target = slot(&mut args, index);
            if !target.is_object() {
                *target = JsonValue::Object(JsonMap::new());
            }
            let (last, middle) = rest.split_last().ok_or_else(|| {
                FunarError::PathError(format!("path '{path}' has no property key"))
            })?;
            for key in middle {
                target = target
                    .as_object_mut()
                    .ok_or_else(|| not_an_object(path, key))?
                    .entry(key.clone())
                    .or_insert_with(|| JsonValue::Object(JsonMap::new()));
            }
            let map = target
                .as_object_mut()
                .ok_or_else(|| not_an_object(path, last))?;
            if let Some(value) = value {
                map.insert(last.clone(), value);
            }
        }

        Ok(args)
    }

    /// Reads option values back out of call arguments.
    ///
    /// Options whose path is absent from `args` are omitted.
    pub fn flatten(&self, args: &[JsonValue]) -> JsonMap<String, JsonValue> {
        let mut values = JsonMap::new();
        for (option, var) in &self.placement {
            let segments = path_segments(var.path.as_str());
            let Some((first, rest)) = segments.split_first() else {
                continue;
            };
            let Some(mut current) = first.parse::<usize>().ok().and_then(|i| args.get(i)) else {
                continue;
            };
            let mut found = true;
            for key in rest {
                match current.as_object().and_then(|map| map.get(key)) {
                    Some(next) => current = next,
                    None => {
                        found = false;
                        break;
                    }
                }
            }
            if found && !current.is_null() {
                values.insert(option.clone(), current.clone());
            }
        }
        values
    }
}

fn slot(args: &mut Vec<JsonValue>, index: usize) -> &mut JsonValue {
    if args.len() <= index {
        args.resize(index + 1, JsonValue::Null);
    }
    &mut args[index]
}

fn not_an_object(path: &str, key: &str) -> FunarError {
    FunarError::PathError(format!(
        "path '{path}' crosses a non-object value before '{key}'"
    ))
}

/// Splits a placement path on dots outside double-quoted keys.
fn path_segments(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in path.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            '.' if !quoted => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
        .into_iter()
        .map(|s| {
            if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
                serde_json::from_str(&s).unwrap_or(s)
            } else {
                s
            }
        })
        .collect()
}

fn is_falsy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::Array(_) | JsonValue::Object(_) => false,
    }
}

fn float_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)").expect("valid regex")
    })
}

fn coerce(option: &str, type_name: Option<&str>, value: &JsonValue) -> Result<JsonValue, FunarError> {
    let expected = match type_name {
        Some(t @ ("number" | "bigint")) => t,
        _ => return Ok(value.clone()),
    };
    if let JsonValue::Array(items) = value {
        return items
            .iter()
            .map(|item| coerce(option, type_name, item))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array);
    }

    let coerced = match (expected, value) {
        ("number", JsonValue::Number(_)) => Some(value.clone()),
        ("number", JsonValue::String(s)) => float_prefix_re()
            .captures(s)
            .and_then(|caps| number_literal(&caps[1], false)),
        ("bigint", JsonValue::Number(n)) => n
            .as_i64()
            .map(JsonValue::from)
            .or_else(|| n.as_u64().map(JsonValue::from)),
        ("bigint", JsonValue::String(s)) => parse_integer(s.trim()),
        _ => None,
    };

    coerced.ok_or_else(|| FunarError::TypeMismatch {
        option: option.to_string(),
        expected: expected.to_string(),
        value: match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        },
    })
}

fn parse_integer(raw: &str) -> Option<JsonValue> {
    let raw = raw.strip_suffix('n').unwrap_or(raw);
    raw.parse::<i64>()
        .map(JsonValue::from)
        .ok()
        .or_else(|| raw.parse::<u64>().ok().map(JsonValue::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn var(name: &str, path: &str, type_name: &str, optional: bool) -> ParameterDescriptor {
        ParameterDescriptor {
            type_name: Some(type_name.to_string()),
            is_optional: Some(optional),
            ..ParameterDescriptor::new(name, path.into())
        }
    }

    fn mapper(vars: Vec<ParameterDescriptor>) -> ArgumentMapper {
        ArgumentMapper::new(vars.into_iter().map(|v| (v.name.clone(), v)).collect())
    }

    fn values(value: JsonValue) -> JsonMap<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn schema_kinds_and_flags() {
        let mut vars = IndexMap::new();
        let mut path = var("path", "0.path", "string", false);
        path.alias = Some("p".to_string());
        vars.insert("path".to_string(), path);
        let mut flags = var("flags", "0.flags", "boolean[]", true);
        flags.structure = Some(Structure::Array);
        flags.contains = Some("boolean".to_string());
        vars.insert("flags".to_string(), flags);
        let mut parity = var("parity", "0.parity", "\"none\"|\"odd\"", true);
        parity.structure = Some(Structure::Enum);
        parity.contains = Some("string".to_string());
        parity.default = Some(json!("none"));
        vars.insert("parity".to_string(), parity);
        let mut long_alias = var("port", "0.port", "number", true);
        long_alias.alias = Some("envPort".to_string());
        vars.insert("port".to_string(), long_alias);
        vars.insert(
            "untyped".to_string(),
            ParameterDescriptor::new("untyped", "1".into()),
        );

        let contract = FunContract {
            name: "connect".to_string(),
            description: None,
            vars,
        };
        let schema = build_cli_schema(&contract);

        assert_eq!(
            serde_json::to_value(&schema.options).unwrap(),
            json!({
                "path": {"type": "string", "multiple": false, "short": "p"},
                "flags": {"type": "boolean", "multiple": true},
                "parity": {"type": "string", "multiple": false, "default": "none"},
                "port": {"type": "string", "multiple": false}
            })
        );
        assert!(!schema.placement.contains_key("untyped"));
    }

    #[test]
    fn nested_placement_creates_slot() {
        let m = mapper(vec![
            var("path", "0.path", "string", false),
            var("baudrate", "0.baudrate", "number", true),
            var("logDiff", "0.log.diff", "boolean", true),
        ]);
        let args = m
            .map(&values(json!({"path": "/dev/ttyUSB0", "baudrate": "115200", "logDiff": true})))
            .unwrap();
        assert_eq!(
            args,
            vec![json!({"path": "/dev/ttyUSB0", "baudrate": 115200, "log": {"diff": true}})]
        );

        let args = m.map(&values(json!({"path": "/dev/ttyUSB0"}))).unwrap();
        assert_eq!(args, vec![json!({"path": "/dev/ttyUSB0", "log": {}})]);
    }

    #[test]
    fn missing_required_names_option() {
        let m = mapper(vec![var("path", "0.path", "string", false)]);
        let err = m.map(&values(json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: path");
        let err = m.map(&values(json!({"path": ""}))).unwrap_err();
        assert!(err.to_string().contains("path"));
    }

    #[test]
    fn numeric_coercion() {
        let m = mapper(vec![var("count", "0", "number", false)]);
        assert_eq!(m.map(&values(json!({"count": "25"}))).unwrap(), vec![json!(25)]);
        assert_eq!(m.map(&values(json!({"count": "2.5kg"}))).unwrap(), vec![json!(2.5)]);

        let err = m.map(&values(json!({"count": "abc"}))).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("count"));
        assert!(message.contains("number"));
    }

    #[test]
    fn bigint_coercion_and_arrays() {
        let m = mapper(vec![
            var("id", "0", "bigint", false),
            var("sizes", "1", "number", true),
        ]);
        let args = m
            .map(&values(json!({"id": "9007199254740993", "sizes": ["1", "2.5"]})))
            .unwrap();
        assert_eq!(args, vec![json!(9007199254740993i64), json!([1, 2.5])]);

        let err = m.map(&values(json!({"id": "1.5"}))).unwrap_err();
        assert!(err.to_string().contains("bigint"));
    }

    #[test]
    fn positional_gaps_are_null() {
        let m = mapper(vec![
            var("a", "0", "string", true),
            var("c", "2", "string", false),
        ]);
        assert_eq!(
            m.map(&values(json!({"c": "x"}))).unwrap(),
            vec![JsonValue::Null, JsonValue::Null, json!("x")]
        );
    }

    #[test]
    fn quoted_keys_and_flatten() {
        let m = mapper(vec![
            var("ab", "0.\"a.b\"", "string", false),
            var("mode", "1", "string", true),
        ]);
        let args = m.map(&values(json!({"ab": "x", "mode": "fast"}))).unwrap();
        assert_eq!(args, vec![json!({"a.b": "x"}), json!("fast")]);
        assert_eq!(
            JsonValue::Object(m.flatten(&args)),
            json!({"ab": "x", "mode": "fast"})
        );
    }
}

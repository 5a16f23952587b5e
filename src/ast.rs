//! Public data model shared by the extractor, reconciler and mapper.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Dot-delimited address into the call-argument tree.
///
/// The first segment is the zero-based position of the top-level argument,
/// every following segment is an object-property key (`"0.query.color"`).
pub struct ParameterPath(String);

impl ParameterPath {
    /// Path of the top-level argument at `index`.
    pub fn root(index: usize) -> Self {
        Self(index.to_string())
    }

    /// Path of property `key` nested under this path.
    pub fn child(&self, key: &str) -> Self {
        Self(format!("{}.{}", self.0, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final property key for nested paths.
    pub fn last_key(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, key)| key)
    }
}

impl From<&str> for ParameterPath {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for ParameterPath {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Composite shape of a parameter value.
pub enum Structure {
    Array,
    Object,
    Enum,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One row of a function contract.
pub struct ParameterDescriptor {
    /// Binding name used inside the function body (or the tag name for
    /// documented entries).
    pub name: String,
    pub path: ParameterPath,
    /// Alternate source-level name this binding was renamed from or falls back to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_optional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<Structure>,
    /// Element or value type when `structure` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rest: bool,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, path: ParameterPath) -> Self {
        Self {
            name: name.into(),
            path,
            ..Default::default()
        }
    }

    /// Optionality as consumed by the argument mapper.
    pub fn optional(&self) -> bool {
        self.is_optional.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Range bounds derived from a `@range` annotation.
///
/// Which pair is populated depends on the typedef's base kind.
pub struct TypeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
}

impl TypeBounds {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Property of an object typedef.
///
/// After registry expansion a property typed by another alias also carries
/// that alias' props and bounds, with the alias name kept in `wrap_type`.
pub struct PropDef {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_type: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub props: IndexMap<String, PropDef>,
    #[serde(flatten)]
    pub bounds: TypeBounds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Named type alias declared by a `@typedef` comment.
pub struct TypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Base kind, `"Object"` unless declared otherwise.
    #[serde(rename = "type")]
    pub base_type: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub props: IndexMap<String, PropDef>,
    #[serde(flatten)]
    pub bounds: TypeBounds,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// One `@keyword ...` entry of a documentation comment.
pub struct Tag {
    /// Keyword without the `@` (`param`, `typedef`, `prop`, ...).
    pub tag: String,
    /// Dotted name or path; empty when the tag carries none.
    pub name: String,
    /// Type annotation without braces; empty when absent.
    #[serde(rename = "type")]
    pub type_expr: String,
    pub description: String,
    /// Raw default text from `[name=default]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub optional: bool,
    /// Everything after the keyword, continuation lines included.
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Comment text split into free description and tags.
pub struct CommentBlock {
    pub description: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// What a documentation comment describes.
pub enum DocKind {
    /// Free text only, no parameter or typedef tags.
    Description,
    /// Documents function parameters.
    Params,
    /// Declares a type alias.
    Typedef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Parsed documentation comment.
pub struct FunJsDoc {
    pub kind: DocKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Documented parameters keyed by their call-argument path.
    pub params_by_path: IndexMap<ParameterPath, ParameterDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typedef: Option<TypeDef>,
    pub tags: Vec<Tag>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Final per-function contract.
pub struct FunContract {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub vars: IndexMap<String, ParameterDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
/// Right-hand side of a parameter default (`pattern = expr`).
pub enum DefaultExpr {
    /// String, number, boolean or null literal.
    Literal(JsonValue),
    /// Plain identifier reference.
    Identifier(String),
    /// `identifier ?? literal`.
    Coalesce { left: String, right: JsonValue },
    /// Anything else, kept as source text.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
/// Key of an object-pattern property.
pub enum PropertyKey {
    Ident(String),
    /// Quoted key: decoded value plus raw source spelling.
    String { value: String, raw: String },
    Number(String),
}

impl PropertyKey {
    /// Segment used for this key in a [`ParameterPath`].
    ///
    /// Quoted keys containing a dot keep their quotes so they stay a single segment.
    pub fn path_segment(&self) -> &str {
        match self {
            PropertyKey::Ident(name) | PropertyKey::Number(name) => name,
            PropertyKey::String { value, raw } => {
                if value.contains('.') {
                    raw
                } else {
                    value
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One entry of an object destructuring pattern.
pub enum PropertyPattern {
    Property { key: PropertyKey, value: Pattern },
    Rest(Box<Pattern>),
}

#[derive(Debug, Clone, PartialEq)]
/// Formal parameter pattern.
pub enum Pattern {
    Identifier(String),
    Rest(Box<Pattern>),
    Object(Vec<PropertyPattern>),
    Array(Vec<Option<Pattern>>),
    Assignment {
        left: Box<Pattern>,
        right: DefaultExpr,
    },
    /// Parameter the source parser could not read, kept as raw text.
    Unsupported(String),
}

impl Pattern {
    /// Node-kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Pattern::Identifier(_) => "Identifier",
            Pattern::Rest(_) => "RestElement",
            Pattern::Object(_) => "ObjectPattern",
            Pattern::Array(_) => "ArrayPattern",
            Pattern::Assignment { .. } => "AssignmentPattern",
            Pattern::Unsupported(_) => "Unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Top-level function-like declaration found in a source file.
pub struct Declaration {
    pub name: String,
    pub params: Vec<Pattern>,
    pub start: usize,
    pub end: usize,
    /// End offset of the top-level statement right before this one.
    pub prev_end: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Comment reported by the source parser.
pub struct RawComment {
    pub is_block: bool,
    /// Text between the comment delimiters.
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Output of a [`crate::source::SourceParser`].
pub struct SourceFile {
    pub declarations: Vec<Declaration>,
    /// Every comment in source order.
    pub comments: Vec<RawComment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_descriptor_leaves_optional_fields_unset() {
        let descriptor = ParameterDescriptor::new("port", ParameterPath::root(0).child("port"));
        assert_eq!(descriptor.path.as_str(), "0.port");
        assert_eq!(descriptor.path.last_key(), Some("port"));
        assert_eq!(descriptor.alias, None);
        assert!(!descriptor.rest);
        assert_eq!(ParameterDescriptor::default().path.as_str(), "");
    }
}

//! Documentation extractor: turns one documentation comment into a [`FunJsDoc`].

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::ast::{
    DocKind, FunJsDoc, ParameterDescriptor, ParameterPath, PropDef, RawComment, Structure, Tag,
    TypeDef,
};
use crate::comment_tags::CommentTagParser;
use crate::registry::TypeRegistry;

/// Parses `comment` when it is a documentation comment (`/** ... */`).
///
/// Typedef comments build a [`TypeDef`] and register it in `registry`
/// before returning. Plain block comments and line comments yield `None`.
pub fn extract_doc(
    comment: &RawComment,
    parser: &dyn CommentTagParser,
    registry: &mut TypeRegistry,
) -> Option<FunJsDoc> {
    if !comment.is_block || !comment.text.starts_with('*') {
        return None;
    }
    let block = parser.parse_comment(&comment.text);

    let find = |keyword: &str| block.tags.iter().find(|t| t.tag == keyword);
    let param_tags: Vec<&Tag> = block.tags.iter().filter(|t| t.tag == "param").collect();

    let description = Some(block.description.trim().to_string())
        .filter(|d| !d.is_empty())
        .or_else(|| {
            find("description")
                .map(|t| t.source.trim().to_string())
                .filter(|d| !d.is_empty())
        });

    let mut doc = FunJsDoc {
        kind: DocKind::Description,
        description,
        params_by_path: IndexMap::new(),
        typedef: None,
        tags: block.tags.clone(),
        start: comment.start,
        end: comment.end,
    };

    if !param_tags.is_empty() {
        doc.kind = DocKind::Params;
        doc.params_by_path = document_params(&param_tags);
    } else if let Some(typedef_tag) = find("typedef") {
        let props: IndexMap<String, PropDef> = block
            .tags
            .iter()
            .filter(|t| t.tag == "prop" || t.tag == "property")
            .map(|t| (t.name.clone(), prop_from_tag(t)))
            .collect();
        let base_type = find("type")
            .map(|t| t.type_expr.as_str())
            .or(Some(typedef_tag.type_expr.as_str()))
            .filter(|t| !t.is_empty());
        let range = find("range").map(|t| t.name.as_str());

        let typedef = TypeDef::new(
            typedef_tag.name.clone(),
            base_type,
            props,
            range,
            doc.description.clone(),
        );
        registry.register(typedef.clone());
        doc.kind = DocKind::Typedef;
        doc.typedef = Some(typedef);
    }

    Some(doc)
}

/// Assigns call-argument paths to `@param` tags.
///
/// A dotted tag name belongs to the most recent top-level parameter; its
/// leading name segment is replaced by that parameter's position.
fn document_params(tags: &[&Tag]) -> IndexMap<ParameterPath, ParameterDescriptor> {
    let mut by_path = IndexMap::new();
    let mut top: Option<usize> = None;

    for tag in tags {
        let path = match tag.name.split_once('.') {
            Some((_, rest)) => ParameterPath::root(top.unwrap_or(0)).child(rest),
            None => {
                let index = top.map_or(0, |i| i + 1);
                top = Some(index);
                ParameterPath::root(index)
            }
        };

        let mut param = ParameterDescriptor::new(tag.name.clone(), path.clone());
        param.type_name = Some(tag.type_expr.clone()).filter(|t| !t.is_empty());
        param.description = Some(tag.description.clone()).filter(|d| !d.is_empty());
        param.is_optional = Some(tag.optional);
        param.default = tag.default.as_deref().and_then(parse_default);
        if let Some((structure, contains)) = classify_type(&tag.type_expr) {
            param.structure = Some(structure);
            param.contains = Some(contains);
        }

        by_path.insert(path, param);
    }
    by_path
}

fn prop_from_tag(tag: &Tag) -> PropDef {
    PropDef {
        name: tag.name.clone(),
        type_name: Some(tag.type_expr.clone()).filter(|t| !t.is_empty()),
        description: Some(tag.description.clone()).filter(|d| !d.is_empty()),
        default: tag.default.as_deref().and_then(parse_default),
        is_optional: tag.optional,
        ..Default::default()
    }
}

/// Documented defaults are JSON literals; anything else is kept verbatim.
pub(crate) fn parse_default(raw: &str) -> Option<JsonValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string())))
}

fn composite_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(.*)\[\]$|^Array<(.*)>$|^Object<(.*)>$|^Record<(.*)>$")
            .expect("valid regex")
    })
}

/// Classifies composite type spellings into a structure and element type.
///
/// `T[]` and `Array<T>` are arrays, `Object<T>` and `Record<T>` objects,
/// and a union of string or number literals is an enum.
pub(crate) fn classify_type(type_expr: &str) -> Option<(Structure, String)> {
    let type_expr = type_expr.trim();
    if let Some(caps) = composite_re().captures(type_expr) {
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            return Some((Structure::Array, m.as_str().trim().to_string()));
        }
        if let Some(m) = caps.get(3).or_else(|| caps.get(4)) {
            return Some((Structure::Object, m.as_str().trim().to_string()));
        }
    }
    literal_union_kind(type_expr).map(|kind| (Structure::Enum, kind.to_string()))
}

fn literal_union_kind(type_expr: &str) -> Option<&'static str> {
    if !type_expr.contains('|') {
        return None;
    }
    let mut kind = None;
    for member in type_expr.split('|') {
        let member_kind = match serde_json::from_str::<JsonValue>(member.trim()).ok()? {
            JsonValue::String(_) => "string",
            JsonValue::Number(_) => "number",
            _ => return None,
        };
        if kind.is_some_and(|k| k != member_kind) {
            return None;
        }
        kind = Some(member_kind);
    }
    kind
}

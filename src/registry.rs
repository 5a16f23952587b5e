//! Type-alias registry for `@typedef` declarations.
//!
//! The registry is an explicit value owned by the caller. Lookups return
//! expanded copies; the stored definitions are never handed out mutably.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::ast::{PropDef, TypeBounds, TypeDef};
use crate::error::Diagnostic;

/// Base kind of typedefs declared without an explicit type.
pub const OBJECT_TYPE: &str = "Object";

impl TypeDef {
    /// Builds a typedef, deriving bounds from an optional `@range` annotation.
    ///
    /// The range is either a single integer (exact bound) or
    /// `start?<sep>end?` where the separator is any single non-digit.
    pub fn new(
        name: impl Into<String>,
        base_type: Option<&str>,
        props: IndexMap<String, PropDef>,
        range: Option<&str>,
        description: Option<String>,
    ) -> Self {
        let base_type = base_type.unwrap_or(OBJECT_TYPE).to_string();
        let bounds = range
            .and_then(parse_range)
            .map(|(start, end)| bounds_for(&base_type, start, end))
            .unwrap_or_default();

        Self {
            name: name.into(),
            description,
            base_type,
            props,
            bounds,
        }
    }

    pub fn is_object(&self) -> bool {
        self.base_type == OBJECT_TYPE
    }
}

fn range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)?\D(\d+)?$").expect("valid regex"))
}

fn parse_range(range: &str) -> Option<(Option<u64>, Option<u64>)> {
    let range = range.trim();
    if range.len() > 1 {
        if let Some(caps) = range_re().captures(range) {
            let bound = |i: usize| caps.get(i).and_then(|m| m.as_str().parse().ok());
            return Some((bound(1), bound(2)));
        }
    }
    if !range.is_empty() && range.bytes().all(|b| b.is_ascii_digit()) {
        let exact = range.parse().ok()?;
        return Some((Some(exact), Some(exact)));
    }
    None
}

fn bounds_for(base_type: &str, start: Option<u64>, end: Option<u64>) -> TypeBounds {
    let mut bounds = TypeBounds::default();
    if base_type == "string" {
        bounds.min_length = start;
        bounds.max_length = end;
    } else if base_type == "number" {
        bounds.minimum = start;
        bounds.maximum = end;
    } else if base_type.starts_with("Array") || base_type.ends_with("[]") {
        bounds.min_items = start;
        bounds.max_items = end;
    } else if base_type.starts_with("Object") || base_type.ends_with("{}") {
        bounds.min_properties = start;
        bounds.max_properties = end;
    }
    bounds
}

#[derive(Debug, Clone, Default)]
/// Named typedef table. Later registrations replace earlier ones.
pub struct TypeRegistry {
    types: IndexMap<String, TypeDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `def` under its name, replacing any previous definition.
    pub fn register(&mut self, def: TypeDef) {
        tracing::debug!("registering typedef '{}' ({})", def.name, def.base_type);
        self.types.insert(def.name.clone(), def);
    }

    /// Moves every definition of `other` into this registry.
    pub fn extend(&mut self, other: TypeRegistry) {
        for (_, def) in other.types {
            self.register(def);
        }
    }

    /// Stored definition without expansion.
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    /// Resolves `name` to an expanded copy of its definition.
    pub fn lookup(&self, name: &str) -> Option<TypeDef> {
        self.lookup_with_diagnostics(name, &mut Vec::new())
    }

    /// Like [`TypeRegistry::lookup`], recording circular references in `warnings`.
    ///
    /// Object typedefs have every alias-typed property replaced by the
    /// referenced definition, recursively. A property that refers back to a
    /// type already being expanded keeps its plain type name.
    pub fn lookup_with_diagnostics(
        &self,
        name: &str,
        warnings: &mut Vec<Diagnostic>,
    ) -> Option<TypeDef> {
        let mut stack = Vec::new();
        self.expand(name, &mut stack, warnings)
    }

    fn expand(
        &self,
        name: &str,
        stack: &mut Vec<String>,
        warnings: &mut Vec<Diagnostic>,
    ) -> Option<TypeDef> {
        let def = self.types.get(name)?;
        if !def.is_object() {
            return Some(def.clone());
        }

        stack.push(name.to_string());
        let props = def
            .props
            .iter()
            .map(|(key, prop)| (key.clone(), self.expand_prop(prop, stack, warnings)))
            .collect();
        stack.pop();

        Some(TypeDef {
            props,
            ..def.clone()
        })
    }

    fn expand_prop(
        &self,
        prop: &PropDef,
        stack: &mut Vec<String>,
        warnings: &mut Vec<Diagnostic>,
    ) -> PropDef {
        let Some(type_name) = prop.type_name.as_deref() else {
            return prop.clone();
        };

        if stack.iter().any(|t| t == type_name) {
            let mut cycle = stack.clone();
            cycle.push(type_name.to_string());
            let diagnostic = Diagnostic::CircularTypeAlias(cycle.join(" -> "));
            tracing::warn!("{diagnostic}");
            warnings.push(diagnostic);
            return prop.clone();
        }

        let Some(nested) = self.expand(type_name, stack, warnings) else {
            return prop.clone();
        };

        PropDef {
            name: prop.name.clone(),
            type_name: Some(nested.base_type),
            description: prop.description.clone().or(nested.description),
            default: prop.default.clone(),
            is_optional: prop.is_optional,
            wrap_type: Some(type_name.to_string()),
            props: nested.props,
            bounds: nested.bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str, type_name: &str) -> PropDef {
        PropDef {
            name: name.to_string(),
            type_name: Some(type_name.to_string()),
            ..Default::default()
        }
    }

    fn props(entries: &[(&str, &str)]) -> IndexMap<String, PropDef> {
        entries
            .iter()
            .map(|(n, t)| (n.to_string(), prop(n, t)))
            .collect()
    }

    #[test]
    fn range_is_reinterpreted_by_base_type() {
        let s = TypeDef::new("ColorHex", Some("string"), IndexMap::new(), Some("6"), None);
        assert_eq!(s.bounds.min_length, Some(6));
        assert_eq!(s.bounds.max_length, Some(6));

        let n = TypeDef::new("PageSize", Some("number"), IndexMap::new(), Some("10-100"), None);
        assert_eq!(n.bounds.minimum, Some(10));
        assert_eq!(n.bounds.maximum, Some(100));

        let a = TypeDef::new("Tags", Some("string[]"), IndexMap::new(), Some("..5"), None);
        assert!(a.bounds.is_empty());

        let a = TypeDef::new("Tags", Some("Array<string>"), IndexMap::new(), Some("-5"), None);
        assert_eq!(a.bounds.min_items, None);
        assert_eq!(a.bounds.max_items, Some(5));

        let o = TypeDef::new("Bag", None, IndexMap::new(), Some("2:"), None);
        assert_eq!(o.base_type, "Object");
        assert_eq!(o.bounds.min_properties, Some(2));
        assert_eq!(o.bounds.max_properties, None);

        let exact = TypeDef::new("Id", Some("number"), IndexMap::new(), Some("10"), None);
        assert_eq!(exact.bounds.minimum, Some(10));
        assert_eq!(exact.bounds.maximum, Some(10));
    }

    #[test]
    fn lookup_expands_nested_aliases() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDef::new(
            "ColorHex",
            Some("string"),
            IndexMap::new(),
            Some("6"),
            Some("RGB Color in hex".to_string()),
        ));
        registry.register(TypeDef::new(
            "QueryWithColor",
            Some("Object"),
            props(&[("color", "ColorHex"), ("page", "number")]),
            None,
            None,
        ));

        let expanded = registry.lookup("QueryWithColor").unwrap();
        let color = &expanded.props["color"];
        assert_eq!(color.type_name.as_deref(), Some("string"));
        assert_eq!(color.wrap_type.as_deref(), Some("ColorHex"));
        assert_eq!(color.description.as_deref(), Some("RGB Color in hex"));
        assert_eq!(color.bounds.max_length, Some(6));
        assert_eq!(expanded.props["page"].wrap_type, None);

        // stored definition is untouched
        let stored = registry.get("QueryWithColor").unwrap();
        assert_eq!(stored.props["color"].type_name.as_deref(), Some("ColorHex"));
    }

    #[test]
    fn unknown_names_and_non_objects() {
        let mut registry = TypeRegistry::new();
        assert!(registry.lookup("Missing").is_none());
        let def = TypeDef::new("Size", Some("number"), props(&[("x", "Size")]), None, None);
        registry.register(def.clone());
        assert_eq!(registry.lookup("Size"), Some(def));
    }

    #[test]
    fn circular_aliases_stay_opaque() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDef::new("Node", None, props(&[("next", "Node")]), None, None));
        registry.register(TypeDef::new("A", None, props(&[("b", "B")]), None, None));
        registry.register(TypeDef::new("B", None, props(&[("a", "A")]), None, None));

        let mut warnings = Vec::new();
        let node = registry.lookup_with_diagnostics("Node", &mut warnings).unwrap();
        assert_eq!(node.props["next"].type_name.as_deref(), Some("Node"));
        assert_eq!(
            warnings,
            vec![Diagnostic::CircularTypeAlias("Node -> Node".to_string())]
        );

        let a = registry.lookup("A").unwrap();
        let b = &a.props["b"];
        assert_eq!(b.wrap_type.as_deref(), Some("B"));
        assert_eq!(b.props["a"].type_name.as_deref(), Some("A"));
        assert!(b.props["a"].props.is_empty());
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDef::new("T", Some("string"), IndexMap::new(), None, None));
        let mut other = TypeRegistry::new();
        other.register(TypeDef::new("T", Some("number"), IndexMap::new(), None, None));
        registry.extend(other);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("T").unwrap().base_type, "number");
    }
}

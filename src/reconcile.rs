//! Contract reconciliation: merges structural descriptors with documentation.

use indexmap::IndexMap;

use crate::ast::{FunJsDoc, ParameterDescriptor, ParameterPath, PropDef};
use crate::error::Diagnostic;
use crate::jsdoc::classify_type;
use crate::registry::TypeRegistry;

/// Merges one structural descriptor with its documented counterpart.
///
/// Identity fields (`name`, `path`, `alias`, `rest`) always come from the
/// structural side. For the metadata fields the structural value wins and
/// the documented value only fills gaps.
pub fn merge_descriptor(
    structural: &ParameterDescriptor,
    documented: &ParameterDescriptor,
) -> ParameterDescriptor {
    ParameterDescriptor {
        name: structural.name.clone(),
        path: structural.path.clone(),
        alias: structural.alias.clone(),
        rest: structural.rest,
        description: structural
            .description
            .clone()
            .or_else(|| documented.description.clone()),
        type_name: structural
            .type_name
            .clone()
            .or_else(|| documented.type_name.clone()),
        is_optional: structural.is_optional.or(documented.is_optional),
        default: structural
            .default
            .clone()
            .or_else(|| documented.default.clone()),
        structure: structural.structure.or(documented.structure),
        contains: structural
            .contains
            .clone()
            .or_else(|| documented.contains.clone()),
    }
}

/// Documented parameters plus one synthesized entry per property of every
/// parameter typed by an object alias.
pub fn expand_documented_params(
    doc: &FunJsDoc,
    registry: &TypeRegistry,
    warnings: &mut Vec<Diagnostic>,
) -> IndexMap<ParameterPath, ParameterDescriptor> {
    let mut expanded = doc.params_by_path.clone();
    for (path, param) in &doc.params_by_path {
        let Some(type_name) = param.type_name.as_deref() else {
            continue;
        };
        let Some(def) = registry.lookup_with_diagnostics(type_name, warnings) else {
            continue;
        };
        if def.is_object() {
            add_prop_entries(&mut expanded, path, &def.props);
        }
    }
    expanded
}

fn add_prop_entries(
    expanded: &mut IndexMap<ParameterPath, ParameterDescriptor>,
    parent: &ParameterPath,
    props: &IndexMap<String, PropDef>,
) {
    for (name, prop) in props {
        let path = parent.child(name);
        expanded
            .entry(path.clone())
            .or_insert_with(|| descriptor_from_prop(name, path.clone(), prop));
        add_prop_entries(expanded, &path, &prop.props);
    }
}

fn descriptor_from_prop(name: &str, path: ParameterPath, prop: &PropDef) -> ParameterDescriptor {
    let mut param = ParameterDescriptor::new(name, path);
    param.type_name = prop.type_name.clone();
    param.description = prop.description.clone();
    param.default = prop.default.clone();
    param.is_optional = Some(prop.is_optional);
    if let Some((structure, contains)) = prop.type_name.as_deref().and_then(classify_type) {
        param.structure = Some(structure);
        param.contains = Some(contains);
    }
    param
}

/// Builds the final variable table of `function`.
///
/// Every structural leaf is kept in declaration order. Leaves with a
/// documented entry at the same path are merged with it; a leaf documented
/// with an object alias is replaced by that alias' properties.
pub fn reconcile(
    function: &str,
    vars: IndexMap<String, ParameterDescriptor>,
    doc: Option<&FunJsDoc>,
    registry: &TypeRegistry,
    warnings: &mut Vec<Diagnostic>,
) -> IndexMap<String, ParameterDescriptor> {
    let Some(doc) = doc else {
        return vars;
    };
    let documented = expand_documented_params(doc, registry, warnings);

    let mut result: IndexMap<String, ParameterDescriptor> = IndexMap::new();
    let mut synthesized: Vec<ParameterDescriptor> = Vec::new();

    for (name, leaf) in vars {
        let Some(entry) = documented.get(&leaf.path) else {
            result.insert(name, leaf);
            continue;
        };

        if let (Some(declared), Some(doc_default)) = (&leaf.default, &entry.default) {
            if declared != doc_default {
                let diagnostic = Diagnostic::DefaultMismatch {
                    function: function.to_string(),
                    name: name.clone(),
                    declared: declared.to_string(),
                    documented: doc_default.to_string(),
                };
                tracing::warn!("{diagnostic}");
                warnings.push(diagnostic);
            }
        }

        let merged = merge_descriptor(&leaf, entry);
        let alias_typed = merged
            .type_name
            .as_deref()
            .and_then(|t| registry.get(t))
            .is_some_and(|def| def.is_object());
        let props = if alias_typed && !merged.rest {
            documented_leaves_under(&documented, &merged.path)
        } else {
            Vec::new()
        };
        if props.is_empty() {
            result.insert(name, merged);
        } else {
            tracing::debug!(
                "'{}' in '{function}' expands into {} alias properties",
                name,
                props.len()
            );
            synthesized.extend(props);
        }
    }

    for param in synthesized {
        if result.contains_key(&param.name) {
            let diagnostic = Diagnostic::AliasCollision {
                function: function.to_string(),
                name: param.name.clone(),
            };
            tracing::warn!("{diagnostic}");
            warnings.push(diagnostic);
            continue;
        }
        result.insert(param.name.clone(), param);
    }
    result
}

/// Innermost documented entries nested under `parent`, synthesized or explicit.
fn documented_leaves_under(
    documented: &IndexMap<ParameterPath, ParameterDescriptor>,
    parent: &ParameterPath,
) -> Vec<ParameterDescriptor> {
    let prefix = format!("{parent}.");
    let under: Vec<&ParameterDescriptor> = documented
        .values()
        .filter(|d| d.path.as_str().starts_with(&prefix))
        .collect();
    under
        .iter()
        .filter(|d| {
            let own = format!("{}.", d.path);
            !under.iter().any(|other| other.path.as_str().starts_with(&own))
        })
        .map(|d| ParameterDescriptor {
            name: d.path.last_key().unwrap_or(&d.name).to_string(),
            ..(*d).clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DocKind, Structure, TypeDef};
    use serde_json::json;

    fn documented(name: &str, path: &str, type_name: &str, description: &str) -> ParameterDescriptor {
        ParameterDescriptor {
            type_name: Some(type_name.to_string()),
            description: Some(description.to_string()),
            is_optional: Some(false),
            ..ParameterDescriptor::new(name, path.into())
        }
    }

    fn doc_with(params: Vec<ParameterDescriptor>) -> FunJsDoc {
        FunJsDoc {
            kind: DocKind::Params,
            description: Some("handler".to_string()),
            params_by_path: params.into_iter().map(|p| (p.path.clone(), p)).collect(),
            typedef: None,
            tags: Vec::new(),
            start: 0,
            end: 0,
        }
    }

    fn vars(leaves: Vec<ParameterDescriptor>) -> IndexMap<String, ParameterDescriptor> {
        leaves.into_iter().map(|l| (l.name.clone(), l)).collect()
    }

    fn query_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register(TypeDef::new(
            "ColorHex",
            Some("string"),
            IndexMap::new(),
            Some("6"),
            Some("RGB Color in hex".to_string()),
        ));
        let color = PropDef {
            name: "color".to_string(),
            type_name: Some("ColorHex".to_string()),
            description: Some("color from query string".to_string()),
            ..Default::default()
        };
        registry.register(TypeDef::new(
            "QueryWithColor",
            Some("Object"),
            IndexMap::from([("color".to_string(), color)]),
            None,
            Some("parsed query string".to_string()),
        ));
        registry
    }

    #[test]
    fn structural_fields_win() {
        let structural = ParameterDescriptor {
            default: Some(json!("global")),
            is_optional: Some(true),
            ..ParameterDescriptor::new("apiScope", "0.app.scope".into())
        };
        let doc = ParameterDescriptor {
            default: Some(json!("local")),
            is_optional: Some(false),
            structure: Some(Structure::Enum),
            contains: Some("string".to_string()),
            ..documented("params.app.scope", "0.app.scope", "string", "scope")
        };
        let merged = merge_descriptor(&structural, &doc);
        assert_eq!(merged.name, "apiScope");
        assert_eq!(merged.default, Some(json!("global")));
        assert_eq!(merged.is_optional, Some(true));
        assert_eq!(merged.type_name.as_deref(), Some("string"));
        assert_eq!(merged.description.as_deref(), Some("scope"));
        assert_eq!(merged.structure, Some(Structure::Enum));
    }

    #[test]
    fn conflicting_defaults_are_reported() {
        let leaf = ParameterDescriptor {
            default: Some(json!(9600)),
            is_optional: Some(true),
            ..ParameterDescriptor::new("baudrate", "0".into())
        };
        let doc = doc_with(vec![ParameterDescriptor {
            default: Some(json!(115200)),
            ..documented("baudrate", "0", "number", "baudrate")
        }]);
        let mut warnings = Vec::new();
        let result = reconcile("connect", vars(vec![leaf]), Some(&doc), &TypeRegistry::new(), &mut warnings);
        assert_eq!(result["baudrate"].default, Some(json!(9600)));
        assert_eq!(
            warnings,
            vec![Diagnostic::DefaultMismatch {
                function: "connect".to_string(),
                name: "baudrate".to_string(),
                declared: "9600".to_string(),
                documented: "115200".to_string(),
            }]
        );
    }

    #[test]
    fn undocumented_leaves_are_kept() {
        let leaves = vars(vec![
            ParameterDescriptor::new("a", "0".into()),
            ParameterDescriptor::new("b", "1".into()),
        ]);
        let doc = doc_with(vec![documented("a", "0", "string", "the a string")]);
        let result = reconcile("f", leaves, Some(&doc), &TypeRegistry::new(), &mut Vec::new());
        assert_eq!(result["a"].type_name.as_deref(), Some("string"));
        assert_eq!(result["b"], ParameterDescriptor::new("b", "1".into()));
    }

    #[test]
    fn alias_typed_parameter_documents_destructured_leaf() {
        let registry = query_registry();
        let doc = doc_with(vec![
            documented("req", "0", "Object", "request object"),
            documented("req.query", "0.query", "QueryWithColor", "parsed query string"),
        ]);

        let expanded = expand_documented_params(&doc, &registry, &mut Vec::new());
        let color = &expanded[&ParameterPath::from("0.query.color")];
        assert_eq!(color.type_name.as_deref(), Some("string"));

        let leaves = vars(vec![ParameterDescriptor::new("color", "0.query.color".into())]);
        let result = reconcile("handler", leaves, Some(&doc), &registry, &mut Vec::new());
        assert_eq!(
            result["color"],
            ParameterDescriptor {
                type_name: Some("string".to_string()),
                description: Some("color from query string".to_string()),
                is_optional: Some(false),
                ..ParameterDescriptor::new("color", "0.query.color".into())
            }
        );
    }

    #[test]
    fn alias_typed_leaf_is_replaced_by_properties() {
        let registry = query_registry();
        let doc = doc_with(vec![documented("query", "0", "QueryWithColor", "parsed query string")]);
        let leaves = vars(vec![ParameterDescriptor::new("query", "0".into())]);
        let result = reconcile("search", leaves, Some(&doc), &registry, &mut Vec::new());
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["color"]);
        assert_eq!(result["color"].path.as_str(), "0.color");
    }

    #[test]
    fn plain_object_leaf_is_not_split() {
        let doc = doc_with(vec![
            documented("options", "0", "Object", "options"),
            documented("options.a", "0.a", "string", "the a string"),
        ]);
        let leaves = vars(vec![ParameterDescriptor::new("options", "0".into())]);
        let result = reconcile("f", leaves, Some(&doc), &TypeRegistry::new(), &mut Vec::new());
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["options"]);
        assert_eq!(result["options"].type_name.as_deref(), Some("Object"));
    }

    #[test]
    fn colliding_alias_properties_are_reported() {
        let registry = query_registry();
        let doc = doc_with(vec![
            documented("query", "0", "QueryWithColor", "parsed query string"),
            documented("color", "1", "string", "other color"),
        ]);
        let leaves = vars(vec![
            ParameterDescriptor::new("query", "0".into()),
            ParameterDescriptor::new("color", "1".into()),
        ]);
        let mut warnings = Vec::new();
        let result = reconcile("search", leaves, Some(&doc), &registry, &mut warnings);
        assert_eq!(result.len(), 1);
        assert_eq!(result["color"].path.as_str(), "1");
        assert_eq!(
            warnings,
            vec![Diagnostic::AliasCollision {
                function: "search".to_string(),
                name: "color".to_string(),
            }]
        );
    }
}

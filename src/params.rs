//! Structural parameter extraction.
//!
//! Walks one declaration's parameter patterns and flattens every bound
//! variable into a [`ParameterDescriptor`] addressed by its call-argument path.

use indexmap::IndexMap;

use crate::ast::{
    DefaultExpr, ParameterDescriptor, ParameterPath, Pattern, PropertyPattern, Structure,
};
use crate::error::Diagnostic;

/// Flattens `params` of `function` into a name-keyed descriptor table.
///
/// Parameters using unsupported pattern kinds are skipped and reported in
/// `warnings`. Bindings that reach the same path under two names, or that
/// only serve as the fallback of another binding, are collapsed.
pub fn extract_params(
    function: &str,
    params: &[Pattern],
    warnings: &mut Vec<Diagnostic>,
) -> IndexMap<String, ParameterDescriptor> {
    let mut leaves = Vec::new();
    for (position, param) in params.iter().enumerate() {
        let mut walker = Walker {
            function,
            position,
            warnings: &mut *warnings,
        };
        leaves.extend(walker.walk(param, ParameterPath::root(position)));
    }

    let mut vars: IndexMap<String, ParameterDescriptor> = IndexMap::new();
    for leaf in leaves {
        vars.insert(leaf.name.clone(), leaf);
    }
    collapse_shared_paths(&mut vars);
    collapse_fallbacks(&mut vars);
    vars
}

struct Walker<'a> {
    function: &'a str,
    position: usize,
    warnings: &'a mut Vec<Diagnostic>,
}

impl Walker<'_> {
    fn walk(&mut self, pattern: &Pattern, path: ParameterPath) -> Vec<ParameterDescriptor> {
        match pattern {
            Pattern::Identifier(name) => vec![ParameterDescriptor::new(name.clone(), path)],
            Pattern::Rest(inner) => self
                .walk(inner, path)
                .into_iter()
                .map(|leaf| ParameterDescriptor {
                    rest: true,
                    structure: Some(Structure::Array),
                    ..leaf
                })
                .collect(),
            Pattern::Object(props) => props
                .iter()
                .flat_map(|prop| match prop {
                    PropertyPattern::Property { key, value } => {
                        self.walk(value, path.child(key.path_segment()))
                    }
                    PropertyPattern::Rest(_) => Vec::new(),
                })
                .collect(),
            Pattern::Assignment { left, right } => {
                let leaves = self.walk(left, path);
                if !matches!(**left, Pattern::Identifier(_)) {
                    return leaves;
                }
                leaves
                    .into_iter()
                    .map(|leaf| apply_default(leaf, right))
                    .collect()
            }
            Pattern::Array(_) | Pattern::Unsupported(_) => {
                let diagnostic = Diagnostic::UnsupportedPattern {
                    function: self.function.to_string(),
                    kind: pattern.kind_name().to_string(),
                    position: self.position,
                };
                tracing::warn!("{diagnostic}");
                self.warnings.push(diagnostic);
                Vec::new()
            }
        }
    }
}

fn apply_default(leaf: ParameterDescriptor, right: &DefaultExpr) -> ParameterDescriptor {
    match right {
        DefaultExpr::Literal(value) => ParameterDescriptor {
            default: Some(value.clone()),
            is_optional: Some(true),
            ..leaf
        },
        DefaultExpr::Identifier(name) => ParameterDescriptor {
            alias: Some(name.clone()),
            ..leaf
        },
        DefaultExpr::Coalesce { left, right } => ParameterDescriptor {
            alias: Some(left.clone()),
            default: Some(right.clone()),
            is_optional: Some(true),
            ..leaf
        },
        DefaultExpr::Other(_) => ParameterDescriptor {
            is_optional: Some(true),
            ..leaf
        },
    }
}

/// `({path: p, path})`: keep `p`, remember `path` as its alias.
fn collapse_shared_paths(vars: &mut IndexMap<String, ParameterDescriptor>) {
    let names: Vec<String> = vars.keys().cloned().collect();
    for name in names {
        let Some(current) = vars.get(&name) else {
            continue;
        };
        if current.path.last_key() != Some(name.as_str()) {
            continue;
        }
        let path = current.path.clone();
        let keeper = vars
            .iter()
            .find(|(other, d)| **other != name && d.path == path)
            .map(|(other, _)| other.clone());
        if let Some(keeper) = keeper {
            vars.shift_remove(&name);
            if let Some(kept) = vars.get_mut(&keeper) {
                kept.alias.get_or_insert(name);
            }
        }
    }
}

/// `({b = 9600, baudrate = b})`: `b` only feeds `baudrate` and is dropped.
fn collapse_fallbacks(vars: &mut IndexMap<String, ParameterDescriptor>) {
    let names: Vec<String> = vars.keys().cloned().collect();
    for name in names {
        let Some(alias) = vars.get(&name).and_then(|d| d.alias.clone()) else {
            continue;
        };
        if alias == name {
            continue;
        }
        let Some(fallback) = vars.shift_remove(&alias) else {
            continue;
        };
        if let Some(kept) = vars.get_mut(&name) {
            if kept.default.is_none() {
                kept.default = fallback.default;
            }
            if kept.is_optional.is_none() {
                kept.is_optional = fallback.is_optional;
            }
        }
    }
}

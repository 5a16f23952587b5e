pub mod associate;
pub mod ast;
pub mod comment_tags;
pub mod error;
pub mod jsdoc;
pub mod json_schema_export;
pub mod mapper;
pub mod params;
pub mod reconcile;
pub mod registry;
pub mod source;

use ast::{FunContract, FunJsDoc};
use associate::find_preceding_comment;
pub use comment_tags::{CommentTagParser, JsDocTagParser};
pub use error::{Diagnostic, FunarError};
use jsdoc::extract_doc;
pub use json_schema_export::typedefs_to_json_schema;
pub use mapper::{build_cli_schema, ArgumentMapper, CliSchema, OptionKind, OptionSpec};
use params::extract_params;
use reconcile::reconcile;
pub use registry::TypeRegistry;
pub use source::{EcmaParser, SourceParser};

/// Extraction settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Register every typedef of the file before reconciling any declaration,
    /// so aliases may be used before the comment declaring them.
    pub hoist_typedefs: bool,
}

/// Contracts of one source file plus the non-fatal diagnostics met on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub contracts: Vec<FunContract>,
    pub warnings: Vec<Diagnostic>,
}

/// Extracts contracts with the built-in parsers and default options.
///
/// Typedefs found in `source` are registered into `registry`.
pub fn extract_contracts(
    source: &str,
    registry: &mut TypeRegistry,
) -> Result<Extraction, FunarError> {
    extract_contracts_with(
        source,
        registry,
        &ExtractOptions::default(),
        &EcmaParser,
        &JsDocTagParser,
    )
}

/// Extracts one contract per top-level function-like declaration.
///
/// Only a failure of `parser` is fatal. Unsupported parameters, default
/// mismatches and alias problems end up in [`Extraction::warnings`].
pub fn extract_contracts_with(
    source: &str,
    registry: &mut TypeRegistry,
    options: &ExtractOptions,
    parser: &dyn SourceParser,
    tag_parser: &dyn CommentTagParser,
) -> Result<Extraction, FunarError> {
    let file = parser.parse(source)?;
    tracing::debug!(
        "parsed {} declarations and {} comments",
        file.declarations.len(),
        file.comments.len()
    );

    let mut docs: Vec<FunJsDoc> = Vec::new();
    let mut pending = file.comments.iter().peekable();
    if options.hoist_typedefs {
        docs.extend(pending.by_ref().filter_map(|c| extract_doc(c, tag_parser, registry)));
    }

    let mut extraction = Extraction::default();
    let mut cursor = None;
    for decl in &file.declarations {
        while let Some(comment) = pending.next_if(|c| c.start < decl.end) {
            docs.extend(extract_doc(comment, tag_parser, registry));
        }

        let found = find_preceding_comment(&docs, decl, cursor);
        cursor = found.cursor;
        let doc = found.doc.map(|index| &docs[index]);

        let vars = extract_params(&decl.name, &decl.params, &mut extraction.warnings);
        let vars = reconcile(&decl.name, vars, doc, registry, &mut extraction.warnings);
        extraction.contracts.push(FunContract {
            name: decl.name.clone(),
            description: doc.and_then(|d| d.description.clone()),
            vars,
        });
    }

    // trailing typedefs still land in the registry
    for comment in pending {
        extract_doc(comment, tag_parser, registry);
    }

    Ok(extraction)
}

/// Contracts of `source` using a fresh registry, warnings discarded.
pub fn parse_source(source: &str) -> Result<Vec<FunContract>, FunarError> {
    let mut registry = TypeRegistry::new();
    extract_contracts(source, &mut registry).map(|e| e.contracts)
}

pub fn contracts_to_json(contracts: &[FunContract], pretty: bool) -> Result<String, FunarError> {
    if pretty {
        serde_json::to_string_pretty(contracts)
            .map_err(|e| FunarError::SerializationError(e.to_string()))
    } else {
        serde_json::to_string(contracts).map_err(|e| FunarError::SerializationError(e.to_string()))
    }
}

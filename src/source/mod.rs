//! Source-text front end: tokenizer, declaration scanner and the parser seam.

/// Tokenizer with a comment side channel.
pub mod lexer;
/// Top-level declaration and parameter-pattern parser.
pub mod parser;

use crate::ast::SourceFile;
use crate::error::FunarError;

/// Syntax-parsing collaborator.
///
/// Implementations return top-level function-like declarations and every
/// comment of the file, both in source order.
pub trait SourceParser {
    fn parse(&self, source: &str) -> Result<SourceFile, FunarError>;
}

/// Built-in [`SourceParser`] for ECMAScript modules and scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcmaParser;

impl SourceParser for EcmaParser {
    fn parse(&self, source: &str) -> Result<SourceFile, FunarError> {
        parser::parse_module(source)
    }
}

//! Top-level statement scanner and parameter-pattern parser.
//!
//! Only function-like top-level statements are parsed in detail; every other
//! statement is skipped by bracket balancing but still recorded as a
//! predecessor for the next declaration.

use serde_json::Value as JsonValue;

use crate::ast::{Declaration, DefaultExpr, Pattern, PropertyKey, PropertyPattern, SourceFile};
use crate::error::FunarError;

use super::lexer::{tokenize, Token, TokenKind};

/// Parses source text into top-level declarations plus all comments.
pub fn parse_module(input: &str) -> Result<SourceFile, FunarError> {
    let lexed = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens: &lexed.tokens,
        pos: 0,
    };
    let declarations = parser.parse_top_level()?;
    Ok(SourceFile {
        declarations,
        comments: lexed.comments,
    })
}

struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_top_level(&mut self) -> Result<Vec<Declaration>, FunarError> {
        let mut declarations = Vec::new();
        let mut prev_end = None;

        while !matches!(self.current().kind, TokenKind::Eof) {
            if matches!(self.current().kind, TokenKind::Semicolon) {
                self.pos += 1;
                continue;
            }

            let start = self.current().start;
            let saved = self.pos;
            let function = match self.try_function_statement() {
                Ok(found) => found,
                Err(err) => {
                    tracing::debug!("skipping statement at {start}: {err}");
                    None
                }
            };
            if function.is_none() {
                self.pos = saved;
                self.skip_statement()?;
            }

            let end = self.tokens[self.pos - 1].end;
            if let Some((name, params)) = function {
                declarations.push(Declaration {
                    name,
                    params,
                    start,
                    end,
                    prev_end,
                });
            }
            prev_end = Some(end);
        }

        Ok(declarations)
    }

    /// Recognises `function` declarations and `const name = <function>` forms.
    fn try_function_statement(&mut self) -> Result<Option<(String, Vec<Pattern>)>, FunarError> {
        let mut default_export = false;
        if self.is_word("export") {
            self.pos += 1;
            if self.is_word("default") {
                self.pos += 1;
                default_export = true;
            }
        }

        if self.is_word("async") && self.peek_is_word(1, "function") {
            self.pos += 1;
        }

        if self.is_word("function") {
            self.pos += 1;
            if matches!(self.current().kind, TokenKind::Star) {
                self.pos += 1;
            }
            let name = match &self.current().kind {
                TokenKind::Ident(name) => {
                    let name = name.clone();
                    self.pos += 1;
                    name
                }
                _ if default_export => "default".to_string(),
                _ => return Ok(None),
            };
            let params = self.parse_params()?;
            self.skip_block()?;
            return Ok(Some((name, params)));
        }

        if default_export || !(self.is_word("const") || self.is_word("let") || self.is_word("var")) {
            return Ok(None);
        }
        self.pos += 1;

        let name = match &self.current().kind {
            TokenKind::Ident(name) => name.clone(),
            _ => return Ok(None),
        };
        self.pos += 1;
        if !matches!(self.current().kind, TokenKind::Assign) {
            return Ok(None);
        }
        self.pos += 1;

        let Some(params) = self.try_function_value()? else {
            return Ok(None);
        };
        Ok(Some((name, params)))
    }

    /// Parses a function expression or arrow function and the rest of its statement.
    fn try_function_value(&mut self) -> Result<Option<Vec<Pattern>>, FunarError> {
        if self.is_word("async")
            && (self.peek_is_word(1, "function")
                || matches!(self.peek(1).kind, TokenKind::LParen)
                || (matches!(self.peek(1).kind, TokenKind::Ident(_))
                    && matches!(self.peek(2).kind, TokenKind::Arrow)))
        {
            self.pos += 1;
        }

        if self.is_word("function") {
            self.pos += 1;
            if matches!(self.current().kind, TokenKind::Star) {
                self.pos += 1;
            }
            if matches!(self.current().kind, TokenKind::Ident(_)) {
                self.pos += 1;
            }
            let params = self.parse_params()?;
            self.skip_block()?;
            self.finish_statement()?;
            return Ok(Some(params));
        }

        let params = match &self.current().kind {
            TokenKind::Ident(name) if matches!(self.peek(1).kind, TokenKind::Arrow) => {
                let param = Pattern::Identifier(name.clone());
                self.pos += 1;
                vec![param]
            }
            TokenKind::LParen => self.parse_params()?,
            _ => return Ok(None),
        };

        if !matches!(self.current().kind, TokenKind::Arrow) {
            return Ok(None);
        }
        self.pos += 1;

        if matches!(self.current().kind, TokenKind::LBrace) {
            self.skip_block()?;
            self.finish_statement()?;
        } else {
            self.skip_statement()?;
        }
        Ok(Some(params))
    }

    fn parse_params(&mut self) -> Result<Vec<Pattern>, FunarError> {
        self.expect(|k| matches!(k, TokenKind::LParen), "expected '(' before parameters")?;
        let mut params = Vec::new();
        loop {
            if matches!(self.current().kind, TokenKind::RParen) {
                self.pos += 1;
                break;
            }
            let first = self.pos;
            let param = match self.parse_binding_element() {
                Ok(param) => param,
                Err(err) => {
                    tracing::debug!("unreadable parameter: {err}");
                    self.pos = first;
                    self.skip_parameter()?
                }
            };
            params.push(param);
            if matches!(self.current().kind, TokenKind::Comma) {
                self.pos += 1;
                continue;
            }
            self.expect(|k| matches!(k, TokenKind::RParen), "expected ')' after parameters")?;
            break;
        }
        Ok(params)
    }

    fn parse_binding_element(&mut self) -> Result<Pattern, FunarError> {
        if matches!(self.current().kind, TokenKind::Ellipsis) {
            self.pos += 1;
            let target = self.parse_binding_target()?;
            return Ok(Pattern::Rest(Box::new(target)));
        }

        let target = self.parse_binding_target()?;
        if matches!(self.current().kind, TokenKind::Assign) {
            self.pos += 1;
            let right = self.parse_default_expr()?;
            return Ok(Pattern::Assignment {
                left: Box::new(target),
                right,
            });
        }
        Ok(target)
    }

    fn parse_binding_target(&mut self) -> Result<Pattern, FunarError> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let pattern = Pattern::Identifier(name.clone());
                self.pos += 1;
                Ok(pattern)
            }
            TokenKind::LBrace => self.parse_object_pattern(),
            TokenKind::LBracket => self.parse_array_pattern(),
            _ => Err(self.error("expected binding pattern")),
        }
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, FunarError> {
        self.pos += 1;
        let mut properties = Vec::new();
        loop {
            if matches!(self.current().kind, TokenKind::RBrace) {
                self.pos += 1;
                break;
            }

            if matches!(self.current().kind, TokenKind::Ellipsis) {
                self.pos += 1;
                let target = self.parse_binding_target()?;
                properties.push(PropertyPattern::Rest(Box::new(target)));
            } else {
                let token = self.current().clone();
                let key = match token.kind {
                    TokenKind::Ident(name) => PropertyKey::Ident(name),
                    TokenKind::Str(value) => PropertyKey::String {
                        value,
                        raw: self.input[token.start..token.end].to_string(),
                    },
                    TokenKind::Number(raw) => PropertyKey::Number(raw),
                    TokenKind::LBracket => {
                        return Err(self.error("computed property keys are not supported"))
                    }
                    _ => return Err(self.error("expected property key")),
                };
                self.pos += 1;

                let value = if matches!(self.current().kind, TokenKind::Colon) {
                    self.pos += 1;
                    self.parse_binding_element()?
                } else {
                    let PropertyKey::Ident(name) = &key else {
                        return Err(self.error("expected ':' after quoted property key"));
                    };
                    let binding = Pattern::Identifier(name.clone());
                    if matches!(self.current().kind, TokenKind::Assign) {
                        self.pos += 1;
                        Pattern::Assignment {
                            left: Box::new(binding),
                            right: self.parse_default_expr()?,
                        }
                    } else {
                        binding
                    }
                };
                properties.push(PropertyPattern::Property { key, value });
            }

            if matches!(self.current().kind, TokenKind::Comma) {
                self.pos += 1;
                continue;
            }
            self.expect(|k| matches!(k, TokenKind::RBrace), "expected '}' after object pattern")?;
            break;
        }
        Ok(Pattern::Object(properties))
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, FunarError> {
        self.pos += 1;
        let mut elements = Vec::new();
        loop {
            match self.current().kind {
                TokenKind::RBracket => {
                    self.pos += 1;
                    break;
                }
                TokenKind::Comma => {
                    self.pos += 1;
                    elements.push(None);
                    continue;
                }
                _ => {}
            }
            elements.push(Some(self.parse_binding_element()?));
            if matches!(self.current().kind, TokenKind::Comma) {
                self.pos += 1;
                continue;
            }
            self.expect(|k| matches!(k, TokenKind::RBracket), "expected ']' after array pattern")?;
            break;
        }
        Ok(Pattern::Array(elements))
    }

    /// Skips one parameter up to the next `,` or `)` at depth zero.
    fn skip_parameter(&mut self) -> Result<Pattern, FunarError> {
        let first = self.pos;
        let mut depth = 0usize;
        loop {
            match self.current().kind {
                TokenKind::Comma | TokenKind::RParen if depth == 0 => break,
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    if depth == 0 {
                        return Err(self.error("unexpected closing bracket in parameters"));
                    }
                    depth -= 1;
                }
                TokenKind::Eof => return Err(self.error("unterminated parameter list")),
                _ => {}
            }
            self.pos += 1;
        }

        let raw = match &self.tokens[first..self.pos] {
            [] => String::new(),
            tokens => self.input[tokens[0].start..tokens[tokens.len() - 1].end].to_string(),
        };
        Ok(Pattern::Unsupported(raw))
    }

    /// Consumes a default-value expression up to the next separator at depth zero.
    fn parse_default_expr(&mut self) -> Result<DefaultExpr, FunarError> {
        let first = self.pos;
        let mut depth = 0usize;
        loop {
            match self.current().kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket if depth == 0 => break,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => depth -= 1,
                TokenKind::Comma if depth == 0 => break,
                TokenKind::Eof => return Err(self.error("unterminated default value")),
                _ => {}
            }
            self.pos += 1;
        }

        let tokens = &self.tokens[first..self.pos];
        if tokens.is_empty() {
            return Err(self.error("expected default value"));
        }
        Ok(classify_default(self.input, tokens))
    }

    fn skip_block(&mut self) -> Result<(), FunarError> {
        if !matches!(self.current().kind, TokenKind::LBrace) {
            return Err(self.error("expected '{' before function body"));
        }
        let mut depth = 0usize;
        loop {
            match self.current().kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                TokenKind::Eof => return Err(self.error("unterminated block")),
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Consumes a trailing `;` or whatever continues the current statement.
    fn finish_statement(&mut self) -> Result<(), FunarError> {
        if matches!(self.current().kind, TokenKind::Semicolon) {
            self.pos += 1;
            return Ok(());
        }
        if self.at_statement_boundary() {
            return Ok(());
        }
        self.skip_statement()
    }

    fn skip_statement(&mut self) -> Result<(), FunarError> {
        let mut depth = 0usize;
        loop {
            match self.current().kind {
                TokenKind::Eof if depth == 0 => return Ok(()),
                TokenKind::Eof => return Err(self.error("unbalanced brackets at end of input")),
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    if depth == 0 {
                        return Err(self.error("unexpected closing bracket"));
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => {}
            }
            self.pos += 1;
            if depth == 0 && self.at_statement_boundary() {
                return Ok(());
            }
        }
    }

    /// Automatic-semicolon heuristic between the previous and current token.
    fn at_statement_boundary(&self) -> bool {
        let next = self.current();
        if matches!(next.kind, TokenKind::Eof) {
            return true;
        }
        if self.pos == 0 || continues_statement(&next.kind) {
            return false;
        }
        let previous = &self.tokens[self.pos - 1];
        if matches!(previous.kind, TokenKind::RBrace) {
            return !matches!(&next.kind, TokenKind::Ident(w) if matches!(w.as_str(), "else" | "catch" | "finally" | "while" | "from" | "as"));
        }
        next.newline_before && ends_expression(&previous.kind)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Ident(w) if w == word)
    }

    fn peek_is_word(&self, offset: usize, word: &str) -> bool {
        matches!(&self.peek(offset).kind, TokenKind::Ident(w) if w == word)
    }

    fn expect(&mut self, predicate: fn(&TokenKind) -> bool, message: &str) -> Result<(), FunarError> {
        if predicate(&self.current().kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> FunarError {
        FunarError::SourceError {
            pos: self.current().start,
            message: message.to_string(),
        }
    }
}

fn continues_statement(kind: &TokenKind) -> bool {
    match kind {
        TokenKind::Dot
        | TokenKind::Assign
        | TokenKind::Arrow
        | TokenKind::Nullish
        | TokenKind::Star
        | TokenKind::Minus
        | TokenKind::Plus
        | TokenKind::Comma
        | TokenKind::Colon
        | TokenKind::LParen
        | TokenKind::LBracket
        | TokenKind::RParen
        | TokenKind::RBrace
        | TokenKind::RBracket
        | TokenKind::Template(_) => true,
        TokenKind::Op(op) => !matches!(op.as_str(), "!" | "~" | "++" | "--" | "@" | "#"),
        TokenKind::Ident(word) => matches!(word.as_str(), "instanceof" | "in" | "of"),
        _ => false,
    }
}

fn ends_expression(kind: &TokenKind) -> bool {
    match kind {
        TokenKind::Ident(word) => !matches!(
            word.as_str(),
            "return" | "typeof" | "new" | "delete" | "void" | "throw" | "await" | "yield"
                | "const" | "let" | "var" | "export" | "import" | "async"
        ),
        TokenKind::Number(_)
        | TokenKind::Str(_)
        | TokenKind::Template(_)
        | TokenKind::Regex
        | TokenKind::RParen
        | TokenKind::RBracket
        | TokenKind::RBrace => true,
        TokenKind::Op(op) => op == "++" || op == "--",
        _ => false,
    }
}

fn classify_default(input: &str, tokens: &[Token]) -> DefaultExpr {
    if let Some(value) = literal_value(tokens) {
        return DefaultExpr::Literal(value);
    }

    if let [first, rest @ ..] = tokens {
        if let TokenKind::Ident(name) = &first.kind {
            match rest {
                [] => return DefaultExpr::Identifier(name.clone()),
                [op, literal @ ..] if matches!(op.kind, TokenKind::Nullish) => {
                    if let Some(value) = literal_value(literal) {
                        return DefaultExpr::Coalesce {
                            left: name.clone(),
                            right: value,
                        };
                    }
                }
                _ => {}
            }
        }
    }

    let start = tokens.first().map_or(0, |t| t.start);
    let end = tokens.last().map_or(start, |t| t.end);
    DefaultExpr::Other(input[start..end].to_string())
}

fn literal_value(tokens: &[Token]) -> Option<JsonValue> {
    match tokens {
        [token] => match &token.kind {
            TokenKind::Str(value) => Some(JsonValue::String(value.clone())),
            TokenKind::Template(Some(value)) => Some(JsonValue::String(value.clone())),
            TokenKind::Number(raw) => number_literal(raw, false),
            TokenKind::Ident(word) => match word.as_str() {
                "true" => Some(JsonValue::Bool(true)),
                "false" => Some(JsonValue::Bool(false)),
                "null" => Some(JsonValue::Null),
                _ => None,
            },
            _ => None,
        },
        [sign, token] if matches!(sign.kind, TokenKind::Minus) => match &token.kind {
            TokenKind::Number(raw) => number_literal(raw, true),
            _ => None,
        },
        _ => None,
    }
}

/// Converts a numeric literal to JSON, keeping integral values integral.
pub(crate) fn number_literal(raw: &str, negative: bool) -> Option<JsonValue> {
    let cleaned = raw.replace('_', "");
    let cleaned = cleaned.strip_suffix('n').unwrap_or(&cleaned);
    let lower = cleaned.to_ascii_lowercase();

    let radix = if lower.starts_with("0x") {
        Some(16)
    } else if lower.starts_with("0o") {
        Some(8)
    } else if lower.starts_with("0b") {
        Some(2)
    } else {
        None
    };

    let value = match radix {
        Some(radix) => i64::from_str_radix(&lower[2..], radix).ok()? as f64,
        None => lower.parse::<f64>().ok()?,
    };
    let value = if negative { -value } else { value };

    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(JsonValue::from(value as i64))
    } else {
        serde_json::Number::from_f64(value).map(JsonValue::Number)
    }
}

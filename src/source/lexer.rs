use crate::ast::RawComment;
use crate::error::FunarError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// Numeric literal as written (`9600`, `1.5`, `0xff`, `10n`).
    Number(String),
    Str(String),
    /// Template literal body; `None` when it contains substitutions.
    Template(Option<String>),
    Regex,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Ellipsis,
    Assign,
    Arrow,
    Nullish,
    Star,
    Minus,
    Plus,
    Op(String),
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<RawComment>,
}

const OPERATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "=", "+", "-", "*", "/", "%", "<", ">", "!", "&", "|", "^",
    "~", "?", ":", ";", ",", ".", "(", ")", "{", "}", "[", "]", "@", "#",
];

/// Keywords after which a `/` starts a regular expression.
const REGEX_PREFIX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
    "do", "else", "yield", "await",
];

/// Splits source text into tokens and reports every comment on the side.
pub fn tokenize(input: &str) -> Result<Lexed, FunarError> {
    let bytes = input.as_bytes();
    let mut lexed = Lexed::default();
    let mut pos = 0usize;
    let mut newline_before = false;

    while pos < bytes.len() {
        let ch = bytes[pos];

        if ch == b'\n' {
            newline_before = true;
            pos += 1;
            continue;
        }
        if ch.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if ch == b'/' && bytes.get(pos + 1) == Some(&b'/') {
            let end = input[pos..].find('\n').map_or(bytes.len(), |i| pos + i);
            lexed.comments.push(RawComment {
                is_block: false,
                text: input[pos + 2..end].to_string(),
                start: pos,
                end,
            });
            pos = end;
            continue;
        }

        if ch == b'/' && bytes.get(pos + 1) == Some(&b'*') {
            let close = input[pos + 2..]
                .find("*/")
                .ok_or_else(|| source_error(pos, "unterminated block comment"))?;
            let end = pos + 2 + close + 2;
            let text = &input[pos + 2..end - 2];
            if text.contains('\n') {
                newline_before = true;
            }
            lexed.comments.push(RawComment {
                is_block: true,
                text: text.to_string(),
                start: pos,
                end,
            });
            pos = end;
            continue;
        }

        let start = pos;
        let kind = match ch {
            b'"' | b'\'' => {
                let (value, end) = scan_string(input, pos)?;
                pos = end;
                TokenKind::Str(value)
            }
            b'`' => {
                let (value, end) = scan_template(input, pos)?;
                pos = end;
                TokenKind::Template(value)
            }
            b'0'..=b'9' => {
                pos = scan_number(bytes, pos);
                TokenKind::Number(input[start..pos].to_string())
            }
            b'.' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                pos = scan_number(bytes, pos);
                TokenKind::Number(input[start..pos].to_string())
            }
            b'/' if regex_allowed(lexed.tokens.last()) => {
                pos = scan_regex(bytes, pos)?;
                TokenKind::Regex
            }
            c if is_ident_start(c) => {
                while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                    pos += 1;
                }
                TokenKind::Ident(input[start..pos].to_string())
            }
            _ => {
                let op = OPERATORS
                    .iter()
                    .find(|op| input[pos..].starts_with(**op))
                    .ok_or_else(|| {
                        source_error(
                            pos,
                            &format!("unexpected character '{}'", input[pos..].chars().next().unwrap_or('?')),
                        )
                    })?;
                pos += op.len();
                operator_kind(op)
            }
        };

        lexed.tokens.push(Token {
            kind,
            start,
            end: pos,
            newline_before,
        });
        newline_before = false;
    }

    lexed.tokens.push(Token {
        kind: TokenKind::Eof,
        start: input.len(),
        end: input.len(),
        newline_before: true,
    });
    Ok(lexed)
}

fn operator_kind(op: &str) -> TokenKind {
    match op {
        "(" => TokenKind::LParen,
        ")" => TokenKind::RParen,
        "{" => TokenKind::LBrace,
        "}" => TokenKind::RBrace,
        "[" => TokenKind::LBracket,
        "]" => TokenKind::RBracket,
        "," => TokenKind::Comma,
        ";" => TokenKind::Semicolon,
        ":" => TokenKind::Colon,
        "." => TokenKind::Dot,
        "..." => TokenKind::Ellipsis,
        "=" => TokenKind::Assign,
        "=>" => TokenKind::Arrow,
        "??" => TokenKind::Nullish,
        "*" => TokenKind::Star,
        "-" => TokenKind::Minus,
        "+" => TokenKind::Plus,
        other => TokenKind::Op(other.to_string()),
    }
}

fn regex_allowed(previous: Option<&Token>) -> bool {
    match previous.map(|t| &t.kind) {
        None => true,
        Some(TokenKind::Ident(word)) => REGEX_PREFIX_KEYWORDS.contains(&word.as_str()),
        Some(
            TokenKind::Number(_)
            | TokenKind::Str(_)
            | TokenKind::Template(_)
            | TokenKind::Regex
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace,
        ) => false,
        Some(TokenKind::Op(op)) => op != "++" && op != "--",
        Some(_) => true,
    }
}

fn scan_string(input: &str, start: usize) -> Result<(String, usize), FunarError> {
    let quote = input.as_bytes()[start] as char;
    let mut out = String::new();
    let mut chars = input[start + 1..].char_indices();
    let bad_escape = || source_error(start, "invalid escape sequence");

    while let Some((offset, c)) = chars.next() {
        if c == quote {
            return Ok((out, start + 1 + offset + 1));
        }
        if c == '\n' {
            break;
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '0')) => out.push('\0'),
                Some((_, 'b')) => out.push('\u{8}'),
                Some((_, 'f')) => out.push('\u{c}'),
                Some((_, 'v')) => out.push('\u{b}'),
                Some((_, 'x')) => out.push(hex_escape(&mut chars, 2).ok_or_else(bad_escape)?),
                Some((_, 'u')) => out.push(unicode_escape(&mut chars).ok_or_else(bad_escape)?),
                Some((_, '\n')) => {}
                Some((_, other)) => out.push(other),
                None => break,
            }
        } else {
            out.push(c);
        }
    }

    Err(source_error(start, "unterminated string literal"))
}

/// Reads exactly `len` hex digits as one code point.
fn hex_escape(chars: &mut std::str::CharIndices<'_>, len: usize) -> Option<char> {
    let digits: String = chars.by_ref().take(len).map(|(_, c)| c).collect();
    if digits.len() != len {
        return None;
    }
    u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
}

/// `\uXXXX` or `\u{X...}`, joining a surrogate pair when one follows.
fn unicode_escape(chars: &mut std::str::CharIndices<'_>) -> Option<char> {
    let mut lookahead = chars.clone();
    if let Some((_, '{')) = lookahead.next() {
        let digits: String = lookahead
            .by_ref()
            .map(|(_, c)| c)
            .take_while(|c| *c != '}')
            .collect();
        *chars = lookahead;
        return u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32);
    }

    let high = hex_code(chars)?;
    if !(0xD800..0xDC00).contains(&high) {
        return Some(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    let mut lookahead = chars.clone();
    if let (Some((_, '\\')), Some((_, 'u'))) = (lookahead.next(), lookahead.next()) {
        let low = hex_code(&mut lookahead)?;
        if (0xDC00..0xE000).contains(&low) {
            *chars = lookahead;
            return char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00));
        }
    }
    Some(char::REPLACEMENT_CHARACTER)
}

fn hex_code(chars: &mut std::str::CharIndices<'_>) -> Option<u32> {
    let digits: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
    if digits.len() != 4 {
        return None;
    }
    u32::from_str_radix(&digits, 16).ok()
}

fn scan_template(input: &str, start: usize) -> Result<(Option<String>, usize), FunarError> {
    let bytes = input.as_bytes();
    let mut pos = start + 1;
    let mut has_substitution = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'`' => {
                let value = (!has_substitution).then(|| input[start + 1..pos].to_string());
                return Ok((value, pos + 1));
            }
            b'$' if bytes.get(pos + 1) == Some(&b'{') => {
                has_substitution = true;
                pos = skip_substitution(input, pos + 2)?;
            }
            _ => pos += 1,
        }
    }

    Err(source_error(start, "unterminated template literal"))
}

/// Skips a `${ ... }` body, returning the offset after its closing brace.
fn skip_substitution(input: &str, mut pos: usize) -> Result<usize, FunarError> {
    let bytes = input.as_bytes();
    let start = pos;
    let mut depth = 1usize;

    while pos < bytes.len() {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(pos + 1);
                }
            }
            b'"' | b'\'' => {
                pos = scan_string(input, pos)?.1;
                continue;
            }
            b'`' => {
                pos = scan_template(input, pos)?.1;
                continue;
            }
            _ => {}
        }
        pos += 1;
    }

    Err(source_error(start, "unterminated template substitution"))
}

fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() {
        let c = bytes[pos];
        let exponent_sign = (c == b'+' || c == b'-')
            && pos > 0
            && matches!(bytes[pos - 1], b'e' | b'E')
            && !is_hex_prefixed(bytes, pos);
        if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' || exponent_sign {
            pos += 1;
        } else {
            break;
        }
    }
    pos
}

fn is_hex_prefixed(bytes: &[u8], pos: usize) -> bool {
    let mut i = pos;
    while i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_') {
        i -= 1;
    }
    bytes.get(i) == Some(&b'0') && matches!(bytes.get(i + 1), Some(b'x' | b'X'))
}

fn scan_regex(bytes: &[u8], start: usize) -> Result<usize, FunarError> {
    let mut pos = start + 1;
    let mut in_class = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 1,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => {
                pos += 1;
                while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                    pos += 1;
                }
                return Ok(pos);
            }
            b'\n' => break,
            _ => {}
        }
        pos += 1;
    }

    Err(source_error(start, "unterminated regular expression"))
}

fn source_error(pos: usize, message: &str) -> FunarError {
    FunarError::SourceError {
        pos,
        message: message.to_string(),
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c >= 0x80
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$' || c >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .tokens
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn reports_comments_on_the_side() {
        let lexed = tokenize("/** doc */\n// line\nfunction a() {}").unwrap();
        assert_eq!(lexed.comments.len(), 2);
        assert!(lexed.comments[0].is_block);
        assert_eq!(lexed.comments[0].text, "* doc ");
        assert_eq!(lexed.comments[0].start, 0);
        assert_eq!(lexed.comments[0].end, 10);
        assert!(!lexed.comments[1].is_block);
        assert_eq!(lexed.tokens[0].kind, TokenKind::Ident("function".to_string()));
        assert!(lexed.tokens[0].newline_before);
    }

    #[test]
    fn distinguishes_regex_from_division() {
        let tokens = kinds("x = a / b; y = /}/g;");
        assert!(tokens.contains(&TokenKind::Op("/".to_string())));
        assert!(tokens.contains(&TokenKind::Regex));
        assert!(!tokens.contains(&TokenKind::RBrace));
    }

    #[test]
    fn template_with_substitution_hides_inner_braces() {
        let tokens = kinds("`a ${ {b: 1}.b } c` `plain`");
        assert_eq!(tokens[0], TokenKind::Template(None));
        assert_eq!(tokens[1], TokenKind::Template(Some("plain".to_string())));
        assert_eq!(tokens[2], TokenKind::Eof);
    }

    #[test]
    fn lexes_numbers_and_operators() {
        let tokens = kinds("a ?? 1.5e-3 ... => 0xff");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Nullish,
                TokenKind::Number("1.5e-3".to_string()),
                TokenKind::Ellipsis,
                TokenKind::Arrow,
                TokenKind::Number("0xff".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn decodes_hex_and_unicode_escapes() {
        let tokens = kinds(r#"a = "\u00e9\x41\u{1F600}\uD83D\uDE00""#);
        assert_eq!(tokens[2], TokenKind::Str("\u{e9}A\u{1F600}\u{1F600}".to_string()));

        let err = tokenize(r#"b = "\xZZ""#).unwrap_err();
        assert!(err.to_string().contains("invalid escape sequence"));
    }

    #[test]
    fn unterminated_string_errors() {
        let err = tokenize("const a = 'oops").unwrap_err();
        assert!(err.to_string().contains("unterminated string literal"));
    }
}

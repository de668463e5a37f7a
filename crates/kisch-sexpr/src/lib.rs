//! S-expression tree used for KiCad schematic files.
//!
//! The tree keeps every node in source order together with its byte span, and
//! remembers the exact lexeme of numeric atoms so an untouched document
//! serializes back to the same numbers it was read from.
//!
//! - [`parse`] / [`parse_all`] - text to tree
//! - [`formatter::format_tree`] - tree to KiCad-style text
//! - [`ListBuilder`], [`kv`] and the `Sexpr` constructors - synthesis of new nodes
//! - [`kicad`] - small typed queries over schematic and library nodes

pub mod formatter;
pub mod kicad;

use std::fmt;

/// Find a direct child list `(name ...)` within a list of [`Sexpr`] nodes.
pub fn find_child_list<'a>(items: &'a [Sexpr], name: &str) -> Option<&'a [Sexpr]> {
    items
        .iter()
        .filter_map(Sexpr::as_list)
        .find(|list| list.first().and_then(Sexpr::as_sym) == Some(name))
}

/// Mutable variant of [`find_child_list`].
pub fn find_child_list_mut<'a>(items: &'a mut [Sexpr], name: &str) -> Option<&'a mut Vec<Sexpr>> {
    items
        .iter_mut()
        .filter_map(Sexpr::as_list_mut)
        .find(|list| list.first().and_then(Sexpr::as_sym) == Some(name))
}

/// Coerce a number atom into f64.
///
/// KiCad writes whole numbers as ints and everything else as floats.
pub fn number_as_f64(node: &Sexpr) -> Option<f64> {
    node.as_float().or_else(|| node.as_int().map(|v| v as f64))
}

/// Byte span in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span used for nodes built in memory rather than parsed.
    pub fn synthetic() -> Self {
        Self::default()
    }

    pub fn is_synthetic(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

/// The kind of S-expression value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SexprKind {
    /// Unquoted identifier, e.g. `yes` or `lib_id`
    Symbol(String),
    /// Quoted text
    String(String),
    Int(i64),
    F64(f64),
    List(Vec<Sexpr>),
}

/// An S-expression value with source span
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sexpr {
    pub kind: SexprKind,
    pub span: Span,
    /// Exact source text of a numeric atom (`12.000000` stays `12.000000`).
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub raw_atom: Option<String>,
}

impl PartialEq for Sexpr {
    fn eq(&self, other: &Self) -> bool {
        // Spans and lexemes are presentation, not content.
        self.kind == other.kind
    }
}

impl Sexpr {
    pub fn with_span(kind: SexprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            raw_atom: None,
        }
    }

    fn synthetic(kind: SexprKind) -> Self {
        Self::with_span(kind, Span::synthetic())
    }

    /// Create a symbol (unquoted atom)
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::synthetic(SexprKind::Symbol(s.into()))
    }

    /// Create a string (quoted atom)
    pub fn string(s: impl Into<String>) -> Self {
        Self::synthetic(SexprKind::String(s.into()))
    }

    pub fn int(n: i64) -> Self {
        Self::synthetic(SexprKind::Int(n))
    }

    pub fn float(f: f64) -> Self {
        Self::synthetic(SexprKind::F64(f))
    }

    /// Create a number atom, using an int when the value is whole.
    pub fn number(f: f64) -> Self {
        if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            Self::int(f as i64)
        } else {
            Self::float(f)
        }
    }

    pub fn list(items: Vec<Sexpr>) -> Self {
        Self::synthetic(SexprKind::List(items))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, SexprKind::List(_))
    }

    /// Symbol or string content.
    pub fn as_atom(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::Symbol(s) | SexprKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sym(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            SexprKind::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.kind {
            SexprKind::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match &self.kind {
            SexprKind::F64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        number_as_f64(self)
    }

    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match &self.kind {
            SexprKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Sexpr>> {
        match &mut self.kind {
            SexprKind::List(items) => Some(items),
            _ => None,
        }
    }

    /// Leading symbol of a list node, e.g. `wire` for `(wire (pts ...))`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()?.first()?.as_sym()
    }

    /// Find a child list with the given tag
    pub fn find_list(&self, name: &str) -> Option<&[Sexpr]> {
        find_child_list(self.as_list()?, name)
    }
}

/// Create a key-value pair list
pub fn kv<K: Into<String>, V: Into<Sexpr>>(k: K, v: V) -> Sexpr {
    Sexpr::list(vec![Sexpr::symbol(k), v.into()])
}

/// A builder for constructing lists incrementally
#[derive(Debug, Default)]
pub struct ListBuilder {
    items: Vec<Sexpr>,
}

impl ListBuilder {
    /// Start a list whose first element is the node name
    pub fn node<N: Into<Sexpr>>(name: N) -> Self {
        Self {
            items: vec![name.into()],
        }
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<V: Into<Sexpr>>(&mut self, v: V) -> &mut Self {
        self.items.push(v.into());
        self
    }

    pub fn push_if<V: Into<Sexpr>>(&mut self, cond: bool, v: V) -> &mut Self {
        if cond {
            self.items.push(v.into());
        }
        self
    }

    pub fn extend<I, V>(&mut self, iter: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Sexpr>,
    {
        self.items.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Sexpr {
        Sexpr::list(self.items)
    }
}

impl From<&str> for Sexpr {
    fn from(s: &str) -> Self {
        Self::symbol(s)
    }
}

impl From<String> for Sexpr {
    fn from(s: String) -> Self {
        Self::symbol(s)
    }
}

impl From<i64> for Sexpr {
    fn from(n: i64) -> Self {
        Sexpr::int(n)
    }
}

impl From<u32> for Sexpr {
    fn from(n: u32) -> Self {
        Sexpr::int(n as i64)
    }
}

impl From<f64> for Sexpr {
    fn from(n: f64) -> Self {
        Sexpr::number(n)
    }
}

impl From<bool> for Sexpr {
    fn from(b: bool) -> Self {
        Self::symbol(if b { "yes" } else { "no" })
    }
}

/// Errors that can occur during parsing. Offsets are byte positions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected ')' at byte {0}")]
    UnexpectedClose(usize),
    #[error("List opened at byte {0} is never closed")]
    UnclosedList(usize),
    #[error("String starting at byte {0} is never terminated")]
    UnterminatedString(usize),
    #[error("Trailing input at byte {0}")]
    TrailingInput(usize),
}

/// Parser for S-expressions.
///
/// Lists are assembled on an explicit stack so deeply nested documents do not
/// grow the call stack.
pub struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Parser { src, pos: 0 }
    }

    /// Parse exactly one expression; anything but trivia after it is an error.
    pub fn parse(&mut self) -> Result<Sexpr, ParseError> {
        let node = self.parse_node()?;
        self.skip_trivia();
        if self.pos < self.src.len() {
            return Err(ParseError::TrailingInput(self.pos));
        }
        Ok(node)
    }

    pub fn parse_all(&mut self) -> Result<Vec<Sexpr>, ParseError> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            if self.pos >= self.src.len() {
                return Ok(out);
            }
            out.push(self.parse_node()?);
        }
    }

    fn parse_node(&mut self) -> Result<Sexpr, ParseError> {
        // (start offset, items) for every list still open
        let mut open: Vec<(usize, Vec<Sexpr>)> = Vec::new();

        loop {
            self.skip_trivia();
            let Some(byte) = self.peek() else {
                return Err(match open.last() {
                    Some((start, _)) => ParseError::UnclosedList(*start),
                    None => ParseError::UnexpectedEof,
                });
            };

            let finished = match byte {
                b'(' => {
                    open.push((self.pos, Vec::new()));
                    self.pos += 1;
                    continue;
                }
                b')' => {
                    let Some((start, items)) = open.pop() else {
                        return Err(ParseError::UnexpectedClose(self.pos));
                    };
                    self.pos += 1;
                    if items.len() >= 1000 {
                        log::trace!("Parsed list of {} items at byte {start}", items.len());
                    }
                    Sexpr::with_span(SexprKind::List(items), Span::new(start, self.pos))
                }
                b'"' => self.parse_string()?,
                _ => self.parse_bare(),
            };

            match open.last_mut() {
                Some((_, items)) => items.push(finished),
                None => return Ok(finished),
            }
        }
    }

    fn parse_string(&mut self) -> Result<Sexpr, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        let mut chars = self.src[self.pos..].char_indices();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.pos += offset + 1;
                    return Ok(Sexpr::with_span(
                        SexprKind::String(text),
                        Span::new(start, self.pos),
                    ));
                }
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    text.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    });
                }
                other => text.push(other),
            }
        }

        Err(ParseError::UnterminatedString(start))
    }

    fn parse_bare(&mut self) -> Sexpr {
        let start = self.pos;
        // Same whitespace set as skip_trivia, so a token is never empty.
        let len = self.src[start..]
            .find(|c: char| c.is_ascii_whitespace() || c == '(' || c == ')' || c == '"')
            .unwrap_or(self.src.len() - start);
        self.pos += len;

        let text = &self.src[start..self.pos];
        let span = Span::new(start, self.pos);

        if let Ok(n) = text.parse::<i64>() {
            Sexpr {
                raw_atom: Some(text.to_string()),
                ..Sexpr::with_span(SexprKind::Int(n), span)
            }
        } else if let Some(f) = parse_float_lexeme(text) {
            Sexpr {
                raw_atom: Some(text.to_string()),
                ..Sexpr::with_span(SexprKind::F64(f), span)
            }
        } else {
            Sexpr::with_span(SexprKind::Symbol(text.to_string()), span)
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else if byte == b';' {
                // Line comment
                self.pos = self.src[self.pos..]
                    .find('\n')
                    .map_or(self.src.len(), |nl| self.pos + nl + 1);
            } else {
                break;
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }
}

/// Only plain decimal numbers count as floats; `inf`, `nan` and friends stay symbols.
fn parse_float_lexeme(text: &str) -> Option<f64> {
    let digits_ok = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    if !(digits_ok && has_digit) {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Parse a string into an S-expression
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    log::trace!("Parsing S-expression from {} bytes of input", input.len());
    let result = Parser::new(input).parse();
    if let Err(e) = &result {
        log::trace!("Failed to parse S-expression: {e}");
    }
    result
}

/// Parse a string into multiple S-expressions
pub fn parse_all(input: &str) -> Result<Vec<Sexpr>, ParseError> {
    Parser::new(input).parse_all()
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = formatter::format_tree(self, formatter::FormatMode::Normal);
        f.write_str(formatted.trim_end_matches('\n'))
    }
}

//! Recursive-descent parser for MSBuild value expressions
//!
//! Handles `$(...)` property references and property functions, `@(...)`
//! item references with transforms, separators and item functions, `%(...)`
//! metadata references, and `;`/`,` separated lists. Errors are returned as
//! [`ExprKind::Error`] nodes so callers always get a tree back.

use bitflags::bitflags;
use text_size::{TextRange, TextSize};

use super::ast::{ExprKind, ExprNode, ExpressionErrorKind, InvocationKind, Literal};
use super::condition::parse_condition;
use crate::base::Name;

bitflags! {
    /// What constructs an expression may contain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExpressionOptions: u8 {
        const ITEMS = 1;
        const METADATA = 1 << 1;
        /// Semicolon-separated lists
        const LISTS = 1 << 2;
        /// Comma-separated lists
        const COMMA_LISTS = 1 << 3;
        /// Parse as a condition (comparisons and boolean operators)
        const CONDITION = 1 << 4;
        const ITEMS_METADATA_AND_LISTS = Self::ITEMS.bits() | Self::METADATA.bits() | Self::LISTS.bits();
    }
}

impl ExpressionOptions {
    pub const NONE: Self = Self::empty();
}

/// Parse `text` as an expression. Ranges are offset by `base_offset`.
pub fn parse_expression(text: &str, options: ExpressionOptions, base_offset: TextSize) -> ExprNode {
    if options.contains(ExpressionOptions::CONDITION) {
        return parse_condition(text, options, base_offset);
    }
    ValueParser::new(text, options, base_offset).parse()
}

/// A parse failure inside a `$(`, `@(` or `%(` group, bubbled up so the
/// group can wrap it into one error node.
struct Failure {
    kind: ExpressionErrorKind,
    at: usize,
    eof: bool,
    partial: Option<ExprNode>,
}

type Parsed = Result<(ExprNode, usize), Failure>;

pub(crate) struct ValueParser<'t> {
    text: &'t str,
    bytes: &'t [u8],
    options: ExpressionOptions,
    base: u32,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn is_class_char(b: u8) -> bool {
    is_ident_char(b) || b == b'.'
}

fn is_quote(b: u8) -> bool {
    matches!(b, b'\'' | b'"' | b'`')
}

impl<'t> ValueParser<'t> {
    pub(crate) fn new(text: &'t str, options: ExpressionOptions, base: TextSize) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            options,
            base: base.into(),
        }
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn range(&self, start: usize, end: usize) -> TextRange {
        TextRange::new(
            TextSize::new(self.base + start as u32),
            TextSize::new(self.base + end as u32),
        )
    }

    fn skip_ws(&self, mut pos: usize) -> usize {
        while pos < self.len() && self.bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    }

    fn read_while(&self, mut pos: usize, pred: impl Fn(u8) -> bool) -> usize {
        while pos < self.len() && pred(self.bytes[pos]) {
            pos += 1;
        }
        pos
    }

    fn is_separator(&self, b: u8) -> bool {
        (b == b';' && self.options.contains(ExpressionOptions::LISTS))
            || (b == b',' && self.options.contains(ExpressionOptions::COMMA_LISTS))
    }

    fn eof_failure(&self, kind: ExpressionErrorKind, partial: Option<ExprNode>) -> Failure {
        Failure {
            kind,
            at: self.len(),
            eof: true,
            partial,
        }
    }

    fn failure_at(&self, pos: usize, kind: ExpressionErrorKind, partial: Option<ExprNode>) -> Failure {
        if pos >= self.len() {
            self.eof_failure(kind, partial)
        } else {
            Failure {
                kind,
                at: pos,
                eof: false,
                partial,
            }
        }
    }

    pub(crate) fn parse(&self) -> ExprNode {
        let list_mode = self
            .options
            .intersects(ExpressionOptions::LISTS | ExpressionOptions::COMMA_LISTS);
        let mut items = Vec::new();
        let mut pos = 0;
        loop {
            let (node, next) = self.parse_concat(pos, list_mode);
            items.push(node);
            if list_mode && next < self.len() && self.is_separator(self.bytes[next]) {
                pos = next + 1;
                continue;
            }
            break;
        }
        if items.len() == 1 {
            if let Some(node) = items.pop() {
                return node;
            }
        }
        ExprNode::new(self.range(0, self.len()), ExprKind::List(items))
    }

    fn parse_concat(&self, start: usize, list_mode: bool) -> (ExprNode, usize) {
        let mut parts = Vec::new();
        let mut pos = start;
        let mut text_start = start;

        while pos < self.len() {
            let b = self.bytes[pos];
            if list_mode && self.is_separator(b) {
                break;
            }
            let opens_group = matches!(b, b'$' | b'@' | b'%') && self.bytes.get(pos + 1) == Some(&b'(');
            if !opens_group {
                pos += 1;
                continue;
            }
            if text_start < pos {
                parts.push(self.text_node(text_start, pos));
            }
            let (node, next) = match b {
                b'$' => self.parse_property(pos),
                b'@' => self.parse_item(pos),
                _ => self.parse_metadata(pos),
            };
            parts.push(node);
            pos = next;
            text_start = pos;
        }
        if text_start < pos {
            parts.push(self.text_node(text_start, pos));
        }

        let node = match parts.len() {
            0 => self.text_node(start, start),
            1 => match parts.pop() {
                Some(node) => node,
                None => self.text_node(start, start),
            },
            _ => ExprNode::new(self.range(start, pos), ExprKind::Concat(parts)),
        };
        (node, pos)
    }

    fn text_node(&self, start: usize, end: usize) -> ExprNode {
        ExprNode::new(
            self.range(start, end),
            ExprKind::Text(self.text[start..end].to_string()),
        )
    }

    fn name_node(&self, start: usize, end: usize, make: impl FnOnce(Name) -> ExprKind) -> ExprNode {
        ExprNode::new(self.range(start, end), make(Name::new(&self.text[start..end])))
    }

    /// Turn a failure inside the group opened at `start` into an error node.
    fn fail_group(
        &self,
        start: usize,
        failure: Failure,
        wrap: impl FnOnce(ExprNode) -> ExprKind,
    ) -> (ExprNode, usize) {
        let end = if failure.eof {
            self.len()
        } else {
            self.recover(failure.at)
        };
        let range = self.range(start, end);
        let partial = failure.partial.map(|p| ExprNode::new(range, wrap(p)));
        (
            ExprNode::error(range, failure.kind, failure.eof, partial),
            end,
        )
    }

    /// Skip to just past the `)` closing the group that contains `pos`.
    fn recover(&self, mut pos: usize) -> usize {
        let mut depth = 1usize;
        while pos < self.len() {
            let b = self.bytes[pos];
            if is_quote(b) {
                pos = match self.text[pos + 1..].find(b as char) {
                    Some(i) => pos + 1 + i + 1,
                    None => self.len(),
                };
                continue;
            }
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return pos + 1;
                    }
                }
                _ => {}
            }
            pos += 1;
        }
        self.len()
    }

    fn parse_property(&self, start: usize) -> (ExprNode, usize) {
        match self.parse_property_body(start) {
            Ok((body, end)) => (
                ExprNode::new(self.range(start, end), ExprKind::Property(Box::new(body))),
                end,
            ),
            Err(failure) => self.fail_group(start, failure, |p| ExprKind::Property(Box::new(p))),
        }
    }

    fn parse_property_body(&self, start: usize) -> Parsed {
        let pos = self.skip_ws(start + 2);
        if pos >= self.len() {
            return Err(self.eof_failure(ExpressionErrorKind::ExpectingPropertyName, None));
        }

        let (mut body, mut pos) = if self.bytes[pos] == b'[' {
            self.parse_static_call(pos)?
        } else if is_ident_start(self.bytes[pos]) {
            let end = self.read_while(pos, is_ident_char);
            (self.name_node(pos, end, ExprKind::PropertyName), end)
        } else {
            return Err(self.failure_at(pos, ExpressionErrorKind::ExpectingPropertyName, None));
        };

        loop {
            pos = self.skip_ws(pos);
            if pos >= self.len() {
                let kind = if matches!(body.kind, ExprKind::PropertyName(_)) {
                    ExpressionErrorKind::ExpectingRightParenOrPeriod
                } else {
                    ExpressionErrorKind::ExpectingRightParen
                };
                return Err(self.eof_failure(kind, Some(body)));
            }
            match self.bytes[pos] {
                b')' => return Ok((body, pos + 1)),
                b'.' => {
                    let (node, next) = self.parse_invocation(body, pos + 1, InvocationKind::Property)?;
                    body = node;
                    pos = next;
                }
                _ => {
                    return Err(self.failure_at(
                        pos,
                        ExpressionErrorKind::ExpectingRightParenOrPeriod,
                        Some(body),
                    ));
                }
            }
        }
    }

    /// `[Class]::Member` or `[Class]::Method(args)`, starting at `[`.
    fn parse_static_call(&self, open: usize) -> Parsed {
        let name_start = self.skip_ws(open + 1);
        let name_end = self.read_while(name_start, is_class_char);
        if name_end == name_start {
            return Err(self.failure_at(name_start, ExpressionErrorKind::ExpectingClassName, None));
        }
        let class = self.name_node(name_start, name_end, ExprKind::ClassReference);
        let pos = self.skip_ws(name_end);
        if !self.text[pos..].starts_with("]::") {
            // partial `]:` at the end of input is still being typed
            let eof = self.text[pos..].len() < 3 && "]::".starts_with(&self.text[pos..]);
            let at = if eof { self.len() } else { pos };
            return Err(self.failure_at(at, ExpressionErrorKind::ExpectingBracketColonColon, Some(class)));
        }
        self.parse_invocation(class, pos + 3, InvocationKind::Static)
    }

    /// Method name with optional argument list, applied to `target`.
    fn parse_invocation(&self, target: ExprNode, pos: usize, kind: InvocationKind) -> Parsed {
        let name_start = self.skip_ws(pos);
        let missing = if kind == InvocationKind::Item {
            ExpressionErrorKind::ExpectingMethodOrTransform
        } else {
            ExpressionErrorKind::ExpectingMethodName
        };
        if name_start >= self.len() || !is_ident_start(self.bytes[name_start]) {
            return Err(self.failure_at(name_start, missing, Some(target)));
        }
        let name_end = self.read_while(name_start, is_ident_char);
        let function = self.name_node(name_start, name_end, ExprKind::FunctionName);
        let target_start = usize::from(target.range.start()) - self.base as usize;

        let pos = self.skip_ws(name_end);
        let (arguments, end) = if pos < self.len() && self.bytes[pos] == b'(' {
            match self.parse_arguments(pos) {
                Ok((args, end)) => (Some(Box::new(args)), end),
                Err(mut failure) => {
                    let end = if failure.eof { self.len() } else { failure.at };
                    let partial_args = failure.partial.take().map(Box::new);
                    failure.partial = Some(ExprNode::new(
                        self.range(target_start, end),
                        ExprKind::FunctionInvocation {
                            kind,
                            target: Box::new(target),
                            function: Box::new(function),
                            arguments: partial_args,
                        },
                    ));
                    return Err(failure);
                }
            }
        } else {
            (None, name_end)
        };

        Ok((
            ExprNode::new(
                self.range(target_start, end),
                ExprKind::FunctionInvocation {
                    kind,
                    target: Box::new(target),
                    function: Box::new(function),
                    arguments,
                },
            ),
            end,
        ))
    }

    fn parse_arguments(&self, open: usize) -> Parsed {
        let mut args = Vec::new();
        let mut pos = open + 1;
        loop {
            pos = self.skip_ws(pos);
            if pos >= self.len() {
                let list = ExprNode::new(self.range(open, self.len()), ExprKind::ArgumentList(args));
                return Err(self.eof_failure(ExpressionErrorKind::ExpectingRightParenOrComma, Some(list)));
            }
            if self.bytes[pos] == b')' && args.is_empty() {
                return Ok((
                    ExprNode::new(self.range(open, pos + 1), ExprKind::ArgumentList(args)),
                    pos + 1,
                ));
            }
            match self.parse_argument(pos) {
                Ok((arg, next)) => {
                    args.push(arg);
                    pos = next;
                }
                Err(mut failure) => {
                    let end = if failure.eof { self.len() } else { failure.at };
                    args.extend(failure.partial.take());
                    failure.partial = Some(ExprNode::new(self.range(open, end), ExprKind::ArgumentList(args)));
                    return Err(failure);
                }
            }

            pos = self.skip_ws(pos);
            if pos >= self.len() {
                let list = ExprNode::new(self.range(open, self.len()), ExprKind::ArgumentList(args));
                return Err(self.eof_failure(ExpressionErrorKind::ExpectingRightParenOrComma, Some(list)));
            }
            match self.bytes[pos] {
                b',' => pos += 1,
                b')' => {
                    return Ok((
                        ExprNode::new(self.range(open, pos + 1), ExprKind::ArgumentList(args)),
                        pos + 1,
                    ));
                }
                _ => {
                    let list = ExprNode::new(self.range(open, pos), ExprKind::ArgumentList(args));
                    return Err(self.failure_at(pos, ExpressionErrorKind::ExpectingRightParenOrComma, Some(list)));
                }
            }
        }
    }

    fn parse_argument(&self, pos: usize) -> Parsed {
        let b = self.bytes[pos];
        if is_quote(b) {
            let inner_options = self.options & (ExpressionOptions::ITEMS | ExpressionOptions::METADATA);
            return self.parse_quoted(pos, inner_options);
        }
        if matches!(b, b'$' | b'@' | b'%') && self.bytes.get(pos + 1) == Some(&b'(') {
            return Ok(match b {
                b'$' => self.parse_property(pos),
                b'@' => self.parse_item(pos),
                _ => self.parse_metadata(pos),
            });
        }
        if b.is_ascii_digit() || b == b'-' {
            let end = self.read_while(pos + 1, |c| c.is_ascii_alphanumeric() || c == b'.');
            let raw = &self.text[pos..end];
            let literal = if let Ok(value) = raw.parse::<i64>() {
                Literal::Int(value)
            } else if let Ok(value) = raw.parse::<f64>() {
                Literal::Float(value)
            } else {
                return Err(self.failure_at(pos, ExpressionErrorKind::CouldNotParseNumber, None));
            };
            return Ok((ExprNode::new(self.range(pos, end), ExprKind::Literal(literal)), end));
        }
        if is_ident_start(b) {
            let end = self.read_while(pos, is_class_char);
            let word = &self.text[pos..end];
            let kind = if word.eq_ignore_ascii_case("true") {
                ExprKind::Literal(Literal::Bool(true))
            } else if word.eq_ignore_ascii_case("false") {
                ExprKind::Literal(Literal::Bool(false))
            } else if word.eq_ignore_ascii_case("null") {
                ExprKind::Literal(Literal::Null)
            } else {
                ExprKind::Text(word.to_string())
            };
            return Ok((ExprNode::new(self.range(pos, end), kind), end));
        }
        Err(self.failure_at(pos, ExpressionErrorKind::UnexpectedCharacter, None))
    }

    /// A quoted string starting at `open`; its content is parsed as a nested expression.
    fn parse_quoted(&self, open: usize, inner_options: ExpressionOptions) -> Parsed {
        let quote = self.bytes[open] as char;
        let content_start = open + 1;
        let close = self.text[content_start..].find(quote).map(|i| content_start + i);
        let content_end = close.unwrap_or(self.len());
        let inner = ValueParser::new(
            &self.text[content_start..content_end],
            inner_options,
            TextSize::new(self.base + content_start as u32),
        )
        .parse();
        match close {
            Some(close) => Ok((
                ExprNode::new(self.range(open, close + 1), ExprKind::Quoted(Box::new(inner))),
                close + 1,
            )),
            None => {
                let quoted = ExprNode::new(self.range(open, self.len()), ExprKind::Quoted(Box::new(inner)));
                Err(self.eof_failure(ExpressionErrorKind::ExpectingApostrophe, Some(quoted)))
            }
        }
    }

    fn parse_item(&self, start: usize) -> (ExprNode, usize) {
        let (node, end) = match self.parse_item_parts(start) {
            Ok((body, separator, end)) => (
                ExprNode::new(
                    self.range(start, end),
                    ExprKind::Item {
                        body: Box::new(body),
                        separator: separator.map(Box::new),
                    },
                ),
                end,
            ),
            Err(failure) => self.fail_group(start, failure, |p| ExprKind::Item {
                body: Box::new(p),
                separator: None,
            }),
        };
        if self.options.contains(ExpressionOptions::ITEMS) {
            (node, end)
        } else {
            let range = node.range;
            (
                ExprNode::error(range, ExpressionErrorKind::ItemsDisallowed, false, Some(node)),
                end,
            )
        }
    }

    fn parse_item_parts(&self, start: usize) -> Result<(ExprNode, Option<ExprNode>, usize), Failure> {
        let pos = self.skip_ws(start + 2);
        if pos >= self.len() {
            return Err(self.eof_failure(ExpressionErrorKind::ExpectingItemName, None));
        }
        if !is_ident_start(self.bytes[pos]) {
            return Err(self.failure_at(pos, ExpressionErrorKind::ExpectingItemName, None));
        }
        let name_end = self.read_while(pos, is_ident_char);
        let mut body = self.name_node(pos, name_end, ExprKind::ItemName);
        let mut pos = name_end;

        loop {
            pos = self.skip_ws(pos);
            if pos >= self.len() {
                return Err(self.eof_failure(ExpressionErrorKind::ExpectingRightParenOrDash, Some(body)));
            }
            match self.bytes[pos] {
                b')' => return Ok((body, None, pos + 1)),
                b'-' => {
                    if self.bytes.get(pos + 1) != Some(&b'>') {
                        return Err(self.failure_at(
                            pos + 1,
                            ExpressionErrorKind::ExpectingRightAngleBracket,
                            Some(body),
                        ));
                    }
                    let next = self.skip_ws(pos + 2);
                    if next < self.len() && is_quote(self.bytes[next]) {
                        let transform_options = (self.options & ExpressionOptions::ITEMS) | ExpressionOptions::METADATA;
                        let target_start = usize::from(body.range.start()) - self.base as usize;
                        match self.parse_quoted(next, transform_options) {
                            Ok((transform, end)) => {
                                body = ExprNode::new(
                                    self.range(target_start, end),
                                    ExprKind::ItemTransform {
                                        target: Box::new(body),
                                        transform: Box::new(transform),
                                    },
                                );
                                pos = end;
                            }
                            Err(mut failure) => {
                                let transform = failure.partial.take();
                                failure.partial = transform.map(|transform| {
                                    ExprNode::new(
                                        self.range(target_start, self.len()),
                                        ExprKind::ItemTransform {
                                            target: Box::new(body),
                                            transform: Box::new(transform),
                                        },
                                    )
                                });
                                return Err(failure);
                            }
                        }
                    } else {
                        let (node, end) = self.parse_invocation(body, next, InvocationKind::Item)?;
                        body = node;
                        pos = end;
                    }
                }
                b',' => {
                    let next = self.skip_ws(pos + 1);
                    if next >= self.len() || !is_quote(self.bytes[next]) {
                        return Err(self.failure_at(next, ExpressionErrorKind::ExpectingApostrophe, Some(body)));
                    }
                    let separator = match self.parse_quoted(next, ExpressionOptions::NONE) {
                        Ok((separator, _)) => separator,
                        Err(failure) => return Err(Failure { partial: Some(body), ..failure }),
                    };
                    let end = self.skip_ws(usize::from(separator.range.end()) - self.base as usize);
                    if end >= self.len() {
                        return Err(self.eof_failure(ExpressionErrorKind::ExpectingRightParen, Some(body)));
                    }
                    if self.bytes[end] != b')' {
                        return Err(self.failure_at(end, ExpressionErrorKind::ExpectingRightParen, Some(body)));
                    }
                    return Ok((body, Some(separator), end + 1));
                }
                _ => {
                    return Err(self.failure_at(
                        pos,
                        ExpressionErrorKind::ExpectingRightParenOrDash,
                        Some(body),
                    ));
                }
            }
        }
    }

    fn parse_metadata(&self, start: usize) -> (ExprNode, usize) {
        let (node, end) = self.parse_metadata_inner(start);
        if self.options.contains(ExpressionOptions::METADATA) {
            (node, end)
        } else {
            let range = node.range;
            (
                ExprNode::error(range, ExpressionErrorKind::MetadataDisallowed, false, Some(node)),
                end,
            )
        }
    }

    fn parse_metadata_inner(&self, start: usize) -> (ExprNode, usize) {
        let metadata = |item: Option<ExprNode>, name: Option<ExprNode>, end: usize| {
            ExprNode::new(
                self.range(start, end),
                ExprKind::Metadata {
                    item: item.map(Box::new),
                    name: name.map(Box::new),
                },
            )
        };
        let error = |kind, pos: usize, partial: Option<ExprNode>| {
            let eof = pos >= self.len();
            let end = if eof { self.len() } else { self.recover(pos) };
            let range = self.range(start, end);
            let partial = partial.map(|mut p| {
                p.range = range;
                p
            });
            (ExprNode::error(range, kind, eof, partial), end)
        };

        let pos = self.skip_ws(start + 2);
        if pos >= self.len() || !is_ident_start(self.bytes[pos]) {
            return error(ExpressionErrorKind::ExpectingMetadataOrItemName, pos, None);
        }
        let first_end = self.read_while(pos, is_ident_char);
        let mut next = self.skip_ws(first_end);

        let (item, name) = if next < self.len() && self.bytes[next] == b'.' {
            let item = self.name_node(pos, first_end, ExprKind::ItemName);
            let name_start = self.skip_ws(next + 1);
            if name_start >= self.len() || !is_ident_start(self.bytes[name_start]) {
                let partial = metadata(Some(item), None, self.len());
                return error(ExpressionErrorKind::ExpectingMetadataName, name_start, Some(partial));
            }
            let name_end = self.read_while(name_start, is_ident_char);
            next = self.skip_ws(name_end);
            (
                Some(item),
                self.name_node(name_start, name_end, ExprKind::MetadataName),
            )
        } else {
            (None, self.name_node(pos, first_end, ExprKind::MetadataName))
        };

        if next < self.len() && self.bytes[next] == b')' {
            return (metadata(item, Some(name), next + 1), next + 1);
        }
        let kind = if item.is_some() {
            ExpressionErrorKind::ExpectingRightParen
        } else {
            ExpressionErrorKind::ExpectingRightParenOrPeriod
        };
        let partial = metadata(item, Some(name), self.len());
        error(kind, next, Some(partial))
    }
}

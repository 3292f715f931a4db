//! Condition lexer and parser
//!
//! Conditions are tokenized with logos. Quoted strings and `$(`/`@(`/`%(`
//! groups are lexed as single tokens by callbacks that scan ahead for the
//! closing delimiter; their contents are then parsed with the value parser.

use logos::Logos;
use text_size::{TextRange, TextSize};

use super::ast::{CompareOp, ExprKind, ExprNode, ExpressionErrorKind};
use super::parser::{ExpressionOptions, ValueParser};
use crate::base::Name;

/// Whether a delimited token found its closing delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Closed,
    Unclosed,
}

fn quoted(lex: &mut logos::Lexer<'_, ConditionToken>) -> Delimiter {
    let rest = lex.remainder();
    match rest.find('\'') {
        Some(i) => {
            lex.bump(i + 1);
            Delimiter::Closed
        }
        None => {
            lex.bump(rest.len());
            Delimiter::Unclosed
        }
    }
}

fn group(lex: &mut logos::Lexer<'_, ConditionToken>) -> Delimiter {
    let rest = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut quote = None;
    for (i, &b) in rest.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    lex.bump(i + 1);
                    return Delimiter::Closed;
                }
            }
            _ => {}
        }
    }
    lex.bump(rest.len());
    Delimiter::Unclosed
}

/// Logos token enum for conditions
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum ConditionToken {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("!")]
    Not,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    #[token("&lt;")]
    Lt,
    #[token("<=")]
    #[token("&lt;=")]
    Le,
    #[token(">")]
    #[token("&gt;")]
    Gt,
    #[token(">=")]
    #[token("&gt;=")]
    Ge,

    #[token("'", quoted)]
    Quoted(Delimiter),
    #[token("$(", group)]
    PropertyGroup(Delimiter),
    #[token("@(", group)]
    ItemGroup(Delimiter),
    #[token("%(", group)]
    MetadataGroup(Delimiter),

    /// Unquoted words and numbers, including `and` / `or`
    #[regex(r"[A-Za-z0-9_.\-]+")]
    Word,
}

impl ConditionToken {
    pub fn compare_op(self) -> Option<CompareOp> {
        Some(match self {
            Self::Eq => CompareOp::Eq,
            Self::Ne => CompareOp::Ne,
            Self::Lt => CompareOp::Lt,
            Self::Le => CompareOp::Le,
            Self::Gt => CompareOp::Gt,
            Self::Ge => CompareOp::Ge,
            _ => return None,
        })
    }
}

/// A condition token with its text and byte span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// `None` for characters no token matches
    pub kind: Option<ConditionToken>,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Token<'_> {
    fn is_word(&self, word: &str) -> bool {
        self.kind == Some(ConditionToken::Word) && self.text.eq_ignore_ascii_case(word)
    }

    pub fn is_and_or(&self) -> bool {
        self.is_word("and") || self.is_word("or")
    }

    pub fn is_comparison(&self) -> bool {
        self.kind.and_then(ConditionToken::compare_op).is_some()
    }
}

/// Tokenize a condition string.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut lexer = ConditionToken::lexer(input);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        tokens.push(Token {
            kind: result.ok(),
            text: lexer.slice(),
            start: span.start,
            end: span.end,
        });
    }
    tokens
}

/// Parse a condition. Ranges are offset by `base_offset`.
pub fn parse_condition(text: &str, options: ExpressionOptions, base_offset: TextSize) -> ExprNode {
    let tokens = tokenize(text);
    let mut parser = ConditionParser {
        text,
        tokens,
        pos: 0,
        value_options: options & (ExpressionOptions::ITEMS | ExpressionOptions::METADATA),
        base: base_offset.into(),
    };
    parser.parse()
}

struct ConditionParser<'a> {
    text: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    value_options: ExpressionOptions,
    base: u32,
}

impl<'a> ConditionParser<'a> {
    fn range(&self, start: usize, end: usize) -> TextRange {
        TextRange::new(
            TextSize::new(self.base + start as u32),
            TextSize::new(self.base + end as u32),
        )
    }

    fn local(&self, offset: TextSize) -> usize {
        (u32::from(offset) - self.base) as usize
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn eof_error(&self, kind: ExpressionErrorKind, partial: Option<ExprNode>) -> ExprNode {
        let len = self.text.len();
        let start = partial
            .as_ref()
            .map_or(len, |p| self.local(p.range.start()));
        ExprNode::error(self.range(start, len), kind, true, partial)
    }

    fn parse(&mut self) -> ExprNode {
        if self.tokens.is_empty() {
            let len = self.text.len();
            return ExprNode::new(self.range(len, len), ExprKind::Text(String::new()));
        }
        let node = self.parse_or();
        if self.at_eof() {
            return node;
        }
        // Leftover tokens, e.g. an unbalanced `)`
        let kind = match self.peek().and_then(|t| t.kind) {
            Some(ConditionToken::RParen) => ExpressionErrorKind::UnexpectedCharacter,
            _ => ExpressionErrorKind::ExpectingAndOr,
        };
        let start = self.local(node.range.start());
        ExprNode::error(self.range(start, self.text.len()), kind, false, Some(node))
    }

    fn parse_binary(
        &mut self,
        word: &str,
        operand: fn(&mut Self) -> ExprNode,
        make: fn(Box<ExprNode>, Box<ExprNode>) -> ExprKind,
    ) -> ExprNode {
        let mut left = operand(self);
        while self.peek().is_some_and(|t| t.is_word(word)) {
            self.pos += 1;
            let right = if self.at_eof() {
                self.eof_error(ExpressionErrorKind::ExpectingValue, None)
            } else {
                operand(self)
            };
            let range = TextRange::new(left.range.start(), right.range.end().max(left.range.end()));
            left = ExprNode::new(range, make(Box::new(left), Box::new(right)));
        }
        left
    }

    fn parse_or(&mut self) -> ExprNode {
        self.parse_binary("or", Self::parse_and, ExprKind::Or)
    }

    fn parse_and(&mut self) -> ExprNode {
        self.parse_binary("and", Self::parse_unary, ExprKind::And)
    }

    fn parse_unary(&mut self) -> ExprNode {
        let Some(token) = self.peek() else {
            return self.eof_error(ExpressionErrorKind::ExpectingValue, None);
        };
        if token.kind != Some(ConditionToken::Not) {
            return self.parse_comparison();
        }
        let start = token.start;
        self.pos += 1;
        let operand = if self.at_eof() {
            self.eof_error(ExpressionErrorKind::ExpectingValue, None)
        } else {
            self.parse_unary()
        };
        let end = self.local(operand.range.end());
        ExprNode::new(self.range(start, end), ExprKind::Not(Box::new(operand)))
    }

    fn parse_comparison(&mut self) -> ExprNode {
        let left = self.parse_operand();
        let Some(op) = self.peek().and_then(|t| t.kind).and_then(ConditionToken::compare_op) else {
            return left;
        };
        self.pos += 1;
        let right = if self.at_eof() {
            self.eof_error(ExpressionErrorKind::ExpectingValue, None)
        } else {
            self.parse_operand()
        };
        let range = TextRange::new(left.range.start(), right.range.end().max(left.range.end()));
        ExprNode::new(
            range,
            ExprKind::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    fn parse_operand(&mut self) -> ExprNode {
        let Some(token) = self.peek().cloned() else {
            return self.eof_error(ExpressionErrorKind::ExpectingValue, None);
        };
        self.pos += 1;
        match token.kind {
            Some(ConditionToken::LParen) => self.parse_paren(token.start),
            Some(ConditionToken::Quoted(delimiter)) => {
                let content_start = token.start + 1;
                let content_end = match delimiter {
                    Delimiter::Closed => token.end - 1,
                    Delimiter::Unclosed => token.end,
                };
                let inner = self.parse_value(content_start, content_end);
                let quoted = ExprNode::new(self.range(token.start, token.end), ExprKind::Quoted(Box::new(inner)));
                match delimiter {
                    Delimiter::Closed => quoted,
                    Delimiter::Unclosed => self.eof_error(ExpressionErrorKind::ExpectingApostrophe, Some(quoted)),
                }
            }
            Some(
                ConditionToken::PropertyGroup(_)
                | ConditionToken::ItemGroup(_)
                | ConditionToken::MetadataGroup(_),
            ) => self.parse_value(token.start, token.end),
            Some(ConditionToken::Word) => {
                if self.peek().is_some_and(|t| t.kind == Some(ConditionToken::LParen)) {
                    self.parse_function(token)
                } else {
                    ExprNode::new(self.range(token.start, token.end), ExprKind::Text(token.text.to_string()))
                }
            }
            _ => ExprNode::error(
                self.range(token.start, token.end),
                ExpressionErrorKind::UnexpectedCharacter,
                false,
                None,
            ),
        }
    }

    fn parse_value(&self, start: usize, end: usize) -> ExprNode {
        ValueParser::new(
            &self.text[start..end],
            self.value_options,
            TextSize::new(self.base + start as u32),
        )
        .parse()
    }

    fn parse_paren(&mut self, start: usize) -> ExprNode {
        if self.at_eof() {
            return self.eof_error(ExpressionErrorKind::ExpectingValue, None);
        }
        let inner = self.parse_or();
        match self.peek().map(|t| (t.kind, t.start, t.end)) {
            Some((Some(ConditionToken::RParen), _, end)) => {
                self.pos += 1;
                ExprNode::new(self.range(start, end), ExprKind::Paren(Box::new(inner)))
            }
            None => {
                let len = self.text.len();
                let paren = ExprNode::new(self.range(start, len), ExprKind::Paren(Box::new(inner)));
                self.eof_error(ExpressionErrorKind::ExpectingRightParen, Some(paren))
            }
            Some((_, at, _)) => {
                let paren = ExprNode::new(self.range(start, at), ExprKind::Paren(Box::new(inner)));
                ExprNode::error(
                    self.range(start, at),
                    ExpressionErrorKind::ExpectingRightParen,
                    false,
                    Some(paren),
                )
            }
        }
    }

    /// `Name(arg, arg)`; the current token is the `(`.
    fn parse_function(&mut self, name_token: Token<'a>) -> ExprNode {
        let name = ExprNode::new(
            self.range(name_token.start, name_token.end),
            ExprKind::FunctionName(Name::new(name_token.text)),
        );
        let open = self.peek().map_or(name_token.end, |t| t.start);
        self.pos += 1;

        let mut args = Vec::new();
        loop {
            if self.at_eof() {
                break;
            }
            if self.peek().is_some_and(|t| t.kind == Some(ConditionToken::RParen)) && args.is_empty() {
                break;
            }
            args.push(self.parse_operand());
            if self.peek().is_some_and(|t| t.kind == Some(ConditionToken::Comma)) {
                self.pos += 1;
                continue;
            }
            break;
        }

        let make = |this: &Self, args: Vec<ExprNode>, end: usize| {
            let arguments = ExprNode::new(this.range(open, end), ExprKind::ArgumentList(args));
            ExprNode::new(
                this.range(name_token.start, end),
                ExprKind::ConditionFunction {
                    name: Box::new(name.clone()),
                    arguments: Box::new(arguments),
                },
            )
        };

        match self.peek().map(|t| (t.kind, t.start, t.end)) {
            Some((Some(ConditionToken::RParen), _, end)) => {
                self.pos += 1;
                make(self, args, end)
            }
            None => {
                let call = make(self, args, self.text.len());
                self.eof_error(ExpressionErrorKind::ExpectingRightParenOrComma, Some(call))
            }
            Some((_, at, _)) => {
                let call = make(self, args, at);
                ExprNode::error(
                    self.range(name_token.start, at),
                    ExpressionErrorKind::ExpectingRightParenOrComma,
                    false,
                    Some(call),
                )
            }
        }
    }
}

//! Expression AST
//!
//! Every node carries its range in the original (escaped) source text, so
//! diagnostics and offset lookups need no position mapping.

use text_size::{TextRange, TextSize};

use crate::base::Name;

/// A node of a parsed expression or condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprNode {
    pub range: TextRange,
    pub kind: ExprKind,
}

/// How a function is being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationKind {
    /// `$(Foo.Method())` on a property value
    Property,
    /// `$([Class]::Method())`
    Static,
    /// `@(Foo->Method())`
    Item,
}

/// Comparison operators in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }
}

/// Literal function arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal text, raw (still escaped)
    Text(String),
    /// Semicolon or comma separated values
    List(Vec<ExprNode>),
    /// Adjacent parts with no separator between them
    Concat(Vec<ExprNode>),
    /// `$(...)`; the body is a `PropertyName` or a `FunctionInvocation`
    Property(Box<ExprNode>),
    PropertyName(Name),
    /// `@(...)` with an optional `, 'separator'`
    Item {
        body: Box<ExprNode>,
        separator: Option<Box<ExprNode>>,
    },
    ItemName(Name),
    /// `@(Foo->'%(Filename).dll')`
    ItemTransform {
        target: Box<ExprNode>,
        transform: Box<ExprNode>,
    },
    /// `%(Name)` or `%(Item.Name)`
    Metadata {
        item: Option<Box<ExprNode>>,
        name: Option<Box<ExprNode>>,
    },
    MetadataName(Name),
    FunctionInvocation {
        kind: InvocationKind,
        target: Box<ExprNode>,
        function: Box<ExprNode>,
        arguments: Option<Box<ExprNode>>,
    },
    FunctionName(Name),
    /// `[System.IO.Path]`
    ClassReference(Name),
    ArgumentList(Vec<ExprNode>),
    Literal(Literal),
    /// A quoted string; the inner node is the parsed string content
    Quoted(Box<ExprNode>),
    Compare {
        op: CompareOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    And(Box<ExprNode>, Box<ExprNode>),
    Or(Box<ExprNode>, Box<ExprNode>),
    Not(Box<ExprNode>),
    Paren(Box<ExprNode>),
    /// `Exists('...')`, `HasTrailingSlash('...')`
    ConditionFunction {
        name: Box<ExprNode>,
        arguments: Box<ExprNode>,
    },
    Error {
        kind: ExpressionErrorKind,
        /// The error was caused by running out of input, not by a bad character
        was_eof: bool,
        /// Whatever was parsed before the error
        partial: Option<Box<ExprNode>>,
    },
}

/// Why an expression failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionErrorKind {
    ExpectingPropertyName,
    ExpectingItemName,
    ExpectingMetadataName,
    ExpectingMetadataOrItemName,
    ExpectingMethodName,
    ExpectingMethodOrTransform,
    ExpectingClassName,
    ExpectingBracketColonColon,
    ExpectingRightParen,
    ExpectingRightParenOrPeriod,
    ExpectingRightParenOrDash,
    ExpectingRightParenOrComma,
    ExpectingRightAngleBracket,
    ExpectingApostrophe,
    ExpectingValue,
    ExpectingAndOr,
    CouldNotParseNumber,
    ItemsDisallowed,
    MetadataDisallowed,
    UnexpectedCharacter,
}

impl ExpressionErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            Self::ExpectingPropertyName => "Expecting property name",
            Self::ExpectingItemName => "Expecting item name",
            Self::ExpectingMetadataName => "Expecting metadata name",
            Self::ExpectingMetadataOrItemName => "Expecting metadata or item name",
            Self::ExpectingMethodName => "Expecting method name",
            Self::ExpectingMethodOrTransform => "Expecting item function or transform",
            Self::ExpectingClassName => "Expecting class name",
            Self::ExpectingBracketColonColon => "Expecting ']::'",
            Self::ExpectingRightParen => "Expecting ')'",
            Self::ExpectingRightParenOrPeriod => "Expecting ')' or '.'",
            Self::ExpectingRightParenOrDash => "Expecting ')' or '->'",
            Self::ExpectingRightParenOrComma => "Expecting ')' or ','",
            Self::ExpectingRightAngleBracket => "Expecting '>'",
            Self::ExpectingApostrophe => "Expecting closing quote",
            Self::ExpectingValue => "Expecting value",
            Self::ExpectingAndOr => "Expecting 'and' or 'or'",
            Self::CouldNotParseNumber => "Invalid number",
            Self::ItemsDisallowed => "Item references are not permitted here",
            Self::MetadataDisallowed => "Metadata references are not permitted here",
            Self::UnexpectedCharacter => "Unexpected character",
        }
    }
}

impl ExprNode {
    pub fn new(range: TextRange, kind: ExprKind) -> Self {
        Self { range, kind }
    }

    pub fn error(
        range: TextRange,
        kind: ExpressionErrorKind,
        was_eof: bool,
        partial: Option<ExprNode>,
    ) -> Self {
        Self::new(
            range,
            ExprKind::Error {
                kind,
                was_eof,
                partial: partial.map(Box::new),
            },
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error { .. })
    }

    /// Name of a simple `$(Name)` reference.
    pub fn property_name(&self) -> Option<&Name> {
        match &self.kind {
            ExprKind::Property(body) => match &body.kind {
                ExprKind::PropertyName(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Child nodes in source order.
    pub fn children(&self) -> Vec<&ExprNode> {
        match &self.kind {
            ExprKind::List(nodes) | ExprKind::Concat(nodes) | ExprKind::ArgumentList(nodes) => {
                nodes.iter().collect()
            }
            ExprKind::Property(body) | ExprKind::Quoted(body) | ExprKind::Not(body) | ExprKind::Paren(body) => {
                vec![body.as_ref()]
            }
            ExprKind::Item { body, separator } => {
                let mut out = vec![body.as_ref()];
                out.extend(separator.as_deref());
                out
            }
            ExprKind::ItemTransform { target, transform } => vec![target.as_ref(), transform.as_ref()],
            ExprKind::Metadata { item, name } => item.iter().chain(name.iter()).map(|b| b.as_ref()).collect(),
            ExprKind::FunctionInvocation {
                target,
                function,
                arguments,
                ..
            } => {
                let mut out = vec![target.as_ref(), function.as_ref()];
                out.extend(arguments.as_deref());
                out
            }
            ExprKind::Compare { left, right, .. } | ExprKind::And(left, right) | ExprKind::Or(left, right) => {
                vec![left.as_ref(), right.as_ref()]
            }
            ExprKind::ConditionFunction { name, arguments } => vec![name.as_ref(), arguments.as_ref()],
            ExprKind::Error { partial, .. } => partial.iter().map(|b| b.as_ref()).collect(),
            ExprKind::Text(_)
            | ExprKind::PropertyName(_)
            | ExprKind::ItemName(_)
            | ExprKind::MetadataName(_)
            | ExprKind::FunctionName(_)
            | ExprKind::ClassReference(_)
            | ExprKind::Literal(_) => Vec::new(),
        }
    }

    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a ExprNode)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Innermost node whose range contains `offset` (end inclusive).
    pub fn find_at(&self, offset: TextSize) -> Option<&ExprNode> {
        if !crate::base::touches(self.range, offset) {
            return None;
        }
        for child in self.children() {
            if let Some(found) = child.find_at(offset) {
                return Some(found);
            }
        }
        Some(self)
    }

    /// Ancestor chain (outermost first) ending with the innermost node at `offset`.
    pub fn path_at(&self, offset: TextSize) -> Vec<&ExprNode> {
        let mut path = Vec::new();
        let mut current = Some(self);
        while let Some(node) = current {
            if !crate::base::touches(node.range, offset) {
                break;
            }
            path.push(node);
            current = node
                .children()
                .into_iter()
                .find(|c| crate::base::touches(c.range, offset));
        }
        path
    }

    /// All error nodes, outermost first.
    pub fn errors(&self) -> Vec<&ExprNode> {
        let mut out = Vec::new();
        self.walk(&mut |n| {
            if n.is_error() {
                out.push(n);
            }
        });
        out
    }

    /// True if the expression contains any item or metadata reference.
    pub fn has_items_or_metadata(&self) -> bool {
        let mut found = false;
        self.walk(&mut |n| {
            if matches!(n.kind, ExprKind::Item { .. } | ExprKind::Metadata { .. }) {
                found = true;
            }
        });
        found
    }
}

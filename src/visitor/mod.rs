//! Visitor pattern for MSBuild documents.
//!
//! The [`Walker`] resolves each XML element against the grammar table and
//! drives an [`MsBuildVisitor`] through it in a fixed order:
//!
//! ```text
//! visit_resolved_element
//!   for each attribute:
//!     visit_resolved_attribute / visit_unknown_attribute
//!     visit_attribute_value
//!     visit_value_expression
//!   visit_element_value, visit_value_expression    (text content)
//!   children (recursively), visit_unknown_element for unknown ones
//! leave_resolved_element
//! ```
//!
//! A hook error abandons the rest of that element and is recorded as an
//! [`InternalError`]; the walk continues with the next sibling.

use std::path::Path;

use text_size::TextRange;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{Cancelled, VisitError, VisitResult};
use crate::expression::{ExprKind, ExprNode, ExpressionOptions, parse_expression};
use crate::parser::{NodeId, XAttribute, XElement, XmlDocument};
use crate::schema::{KindModifiers, ScalarKind, ValueKind};
use crate::syntax::{AttributeSyntax, ElementSyntax, SyntaxKind};

/// The document being walked.
#[derive(Debug, Clone, Copy)]
pub struct VisitContext<'a> {
    pub document: &'a XmlDocument,
    pub text: &'a str,
    pub path: &'a Path,
}

/// An element matched to its grammar entry.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedElement<'a> {
    pub id: NodeId,
    pub element: &'a XElement,
    pub syntax: &'static ElementSyntax,
    /// The enclosing element, if any
    pub parent: Option<(NodeId, &'static ElementSyntax)>,
    /// True inside a `Target`
    pub in_target: bool,
}

impl ResolvedElement<'_> {
    pub fn kind(&self) -> SyntaxKind {
        self.syntax.kind
    }

    pub fn name(&self) -> &str {
        &self.element.name
    }

    pub fn parent_kind(&self) -> Option<SyntaxKind> {
        self.parent.map(|(_, syntax)| syntax.kind)
    }
}

/// An attribute matched to its grammar entry.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAttribute<'a> {
    pub attribute: &'a XAttribute,
    pub syntax: &'static AttributeSyntax,
}

impl ResolvedAttribute<'_> {
    pub fn kind(&self) -> SyntaxKind {
        self.syntax.kind
    }

    pub fn name(&self) -> &str {
        &self.attribute.name
    }
}

/// A value about to be parsed: an attribute value or element text.
#[derive(Debug, Clone, Copy)]
pub struct ValueContext<'a> {
    pub text: &'a str,
    pub range: TextRange,
    pub kind: ValueKind,
    pub options: ExpressionOptions,
}

/// A hook failure caught by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalError {
    pub range: TextRange,
    pub message: String,
}

/// Hooks called by the [`Walker`]. Every hook defaults to doing nothing.
#[allow(unused_variables)]
pub trait MsBuildVisitor {
    fn visit_resolved_element(&mut self, cx: &VisitContext<'_>, element: &ResolvedElement<'_>) -> VisitResult {
        Ok(())
    }

    fn leave_resolved_element(&mut self, cx: &VisitContext<'_>, element: &ResolvedElement<'_>) -> VisitResult {
        Ok(())
    }

    fn visit_resolved_attribute(
        &mut self,
        cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        attribute: &ResolvedAttribute<'_>,
    ) -> VisitResult {
        Ok(())
    }

    fn visit_element_value(
        &mut self,
        cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        value: &ValueContext<'_>,
    ) -> VisitResult {
        Ok(())
    }

    fn visit_attribute_value(
        &mut self,
        cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        attribute: &ResolvedAttribute<'_>,
        value: &ValueContext<'_>,
    ) -> VisitResult {
        Ok(())
    }

    /// Called with the parsed form of every attribute value and element value.
    fn visit_value_expression(
        &mut self,
        cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        attribute: Option<&ResolvedAttribute<'_>>,
        value: &ValueContext<'_>,
        node: &ExprNode,
    ) -> VisitResult {
        Ok(())
    }

    fn visit_unknown_element(
        &mut self,
        cx: &VisitContext<'_>,
        parent: Option<&ResolvedElement<'_>>,
        id: NodeId,
        element: &XElement,
    ) -> VisitResult {
        Ok(())
    }

    fn visit_unknown_attribute(
        &mut self,
        cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        attribute: &XAttribute,
    ) -> VisitResult {
        Ok(())
    }

    /// Override the grammar's value kind, typically from a schema lookup.
    fn value_kind(&self, element: &ResolvedElement<'_>, attribute: Option<&ResolvedAttribute<'_>>) -> Option<ValueKind> {
        None
    }
}

/// Drives an [`MsBuildVisitor`] over a document.
pub struct Walker<'a> {
    cx: VisitContext<'a>,
    range: Option<TextRange>,
    cancel: Option<&'a CancellationToken>,
    errors: Vec<InternalError>,
}

impl<'a> Walker<'a> {
    pub fn new(document: &'a XmlDocument, text: &'a str, path: &'a Path) -> Self {
        Self {
            cx: VisitContext { document, text, path },
            range: None,
            cancel: None,
            errors: Vec::new(),
        }
    }

    /// Only visit elements overlapping `range`.
    pub fn with_range(mut self, range: TextRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Walk the document. Returns the hook failures that were caught.
    pub fn run<V: MsBuildVisitor + ?Sized>(mut self, visitor: &mut V) -> Result<Vec<InternalError>, Cancelled> {
        let Some(root) = self.cx.document.root() else {
            return Ok(self.errors);
        };
        let element = self.cx.document.element(root);
        let project = ElementSyntax::project();
        if element.is_named(project.name) {
            self.visit_element(visitor, root, project, None, false)?;
        } else if let Err(error) = visitor.visit_unknown_element(&self.cx, None, root, element) {
            self.record(element.name_range, error)?;
        }
        Ok(self.errors)
    }

    fn visit_element<V: MsBuildVisitor + ?Sized>(
        &mut self,
        visitor: &mut V,
        id: NodeId,
        syntax: &'static ElementSyntax,
        parent: Option<(NodeId, &'static ElementSyntax)>,
        in_target: bool,
    ) -> Result<(), Cancelled> {
        if self.cancel.is_some_and(|t| t.is_cancelled()) {
            return Err(Cancelled);
        }
        let element = self.cx.document.element(id);
        if self
            .range
            .is_some_and(|range| element.range.end() < range.start() || range.end() < element.range.start())
        {
            return Ok(());
        }
        let resolved = ResolvedElement {
            id,
            element,
            syntax,
            parent,
            in_target,
        };
        if let Err(error) = self.visit_resolved(visitor, &resolved) {
            self.record(element.name_range, error)?;
        }
        Ok(())
    }

    fn record(&mut self, range: TextRange, error: VisitError) -> Result<(), Cancelled> {
        match error {
            VisitError::Cancelled(cancelled) => Err(cancelled),
            VisitError::Message(message) => {
                warn!(path = %self.cx.path.display(), %message, "visitor hook failed");
                self.errors.push(InternalError { range, message });
                Ok(())
            }
        }
    }

    fn visit_resolved<V: MsBuildVisitor + ?Sized>(
        &mut self,
        visitor: &mut V,
        resolved: &ResolvedElement<'a>,
    ) -> VisitResult {
        let cx = self.cx;
        let element = resolved.element;
        visitor.visit_resolved_element(&cx, resolved)?;

        for attribute in &element.attributes {
            let Some(syntax) = resolved.syntax.get_attribute(&attribute.name) else {
                visitor.visit_unknown_attribute(&cx, resolved, attribute)?;
                continue;
            };
            let resolved_attribute = ResolvedAttribute { attribute, syntax };
            visitor.visit_resolved_attribute(&cx, resolved, &resolved_attribute)?;
            let (Some(text), Some(range)) = (attribute.value.as_deref(), attribute.value_range) else {
                continue;
            };
            let kind = visitor
                .value_kind(resolved, Some(&resolved_attribute))
                .unwrap_or(syntax.value_kind);
            let value = ValueContext {
                text,
                range,
                kind,
                options: expression_options(kind, resolved, Some(syntax)),
            };
            visitor.visit_attribute_value(&cx, resolved, &resolved_attribute, &value)?;
            let node = parse_value(&value);
            visitor.visit_value_expression(&cx, resolved, Some(&resolved_attribute), &value, &node)?;
        }

        if !resolved.syntax.opaque_content && resolved.syntax.value_kind != ValueKind::NOTHING {
            if let (Some(text), Some(range)) = (cx.document.value(cx.text, resolved.id), element.value_range) {
                let kind = visitor
                    .value_kind(resolved, None)
                    .unwrap_or(resolved.syntax.value_kind);
                let value = ValueContext {
                    text,
                    range,
                    kind,
                    options: expression_options(kind, resolved, None),
                };
                visitor.visit_element_value(&cx, resolved, &value)?;
                let node = parse_value(&value);
                visitor.visit_value_expression(&cx, resolved, None, &value, &node)?;
            }
        }

        if !resolved.syntax.opaque_content {
            let child_in_target = resolved.in_target || resolved.kind() == SyntaxKind::Target;
            for &child_id in &element.children {
                let child = cx.document.element(child_id);
                match resolved.syntax.get_child(&child.name) {
                    Some(child_syntax) => self
                        .visit_element(
                            visitor,
                            child_id,
                            child_syntax,
                            Some((resolved.id, resolved.syntax)),
                            child_in_target,
                        )
                        .map_err(VisitError::from)?,
                    None => visitor.visit_unknown_element(&cx, Some(resolved), child_id, child)?,
                }
            }
        }

        visitor.leave_resolved_element(&cx, resolved)
    }
}

/// Parse a value according to its kind. Literal kinds are not expressions.
pub fn parse_value(value: &ValueContext<'_>) -> ExprNode {
    if value.kind.is_literal() {
        return ExprNode::new(value.range, ExprKind::Text(value.text.to_string()));
    }
    parse_expression(value.text, value.options, value.range.start())
}

/// Which expression features a value may use.
pub fn expression_options(
    kind: ValueKind,
    element: &ResolvedElement<'_>,
    attribute: Option<&AttributeSyntax>,
) -> ExpressionOptions {
    let mut options = ExpressionOptions::ITEMS;
    if kind.modifiers.contains(KindModifiers::LIST) {
        options |= ExpressionOptions::LISTS;
    }
    if kind.modifiers.contains(KindModifiers::COMMA_LIST) {
        options |= ExpressionOptions::COMMA_LISTS;
    }
    if kind.scalar == ScalarKind::Condition {
        options |= ExpressionOptions::CONDITION;
    }

    let item_context = matches!(element.kind(), SyntaxKind::Item | SyntaxKind::Metadata)
        && attribute.is_none_or(|a| !matches!(a.kind, SyntaxKind::Condition));
    let target_io = attribute.is_some_and(|a| {
        matches!(
            a.kind,
            SyntaxKind::TargetInputs | SyntaxKind::TargetOutputs | SyntaxKind::TargetReturns
        )
    });
    let import_project = attribute.is_some_and(|a| a.kind == SyntaxKind::ImportProject);
    if element.in_target || item_context || target_io || import_project {
        options |= ExpressionOptions::METADATA;
    }
    options
}

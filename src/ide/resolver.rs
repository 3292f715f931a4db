//! What is at an offset
//!
//! Walks only the spine of elements containing the offset and reports the
//! innermost thing found: an element or attribute name, a reference inside an
//! expression, or a value with a known meaning (target names, SDKs, import
//! paths, file paths, custom-type values).

use std::path::PathBuf;
use std::sync::Arc;

use text_size::{TextRange, TextSize};

use crate::base::{Name, touches};
use crate::error::VisitResult;
use crate::expression::{
    ExprKind, ExprNode, ExpressionOptions, InvocationKind, evaluate, native_path, normalize, unescape,
};
use crate::project::{Import, RootDocument, SdkInfo, SdkReference};
use crate::schema::{ConstantInfo, CustomTypeInfo, ReferenceUsage, ScalarKind, ValueKind, is_call_target, is_target_list, target_names};
use crate::syntax::{AttributeSyntax, ElementSyntax, SyntaxKind};
use crate::visitor::{MsBuildVisitor, ResolvedAttribute, ResolvedElement, ValueContext, VisitContext, Walker};

/// What a reference points at.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceKind {
    Property(Name),
    Item(Name),
    Metadata { item: Option<Name>, name: Name },
    Task(Name),
    TaskParameter { task: Name, parameter: Name },
    Target(Name),
    /// An element or attribute of the language itself
    Keyword,
    ItemFunction(Name),
    /// `class` is `None` for instance functions on a property value
    PropertyFunction { class: Option<Name>, name: Name },
    ClassName(Name),
    ConditionFunction(Name),
    KnownValue { kind: ValueKind, value: ConstantInfo },
    FileOrFolder(Vec<PathBuf>),
    /// The files an `Import/@Project` value resolved to
    Import(Vec<Arc<Import>>),
    Sdk(SdkInfo),
}

/// A reference found at an offset.
#[derive(Debug, Clone, PartialEq)]
pub struct MsBuildReference {
    pub kind: ReferenceKind,
    pub usage: ReferenceUsage,
    pub range: TextRange,
    pub element: Option<&'static ElementSyntax>,
    pub attribute: Option<&'static AttributeSyntax>,
}

impl MsBuildReference {
    /// Name of the referenced symbol, if it has one.
    pub fn name(&self) -> Option<&Name> {
        match &self.kind {
            ReferenceKind::Property(name)
            | ReferenceKind::Item(name)
            | ReferenceKind::Task(name)
            | ReferenceKind::Target(name)
            | ReferenceKind::ItemFunction(name)
            | ReferenceKind::ClassName(name)
            | ReferenceKind::ConditionFunction(name)
            | ReferenceKind::Metadata { name, .. }
            | ReferenceKind::PropertyFunction { name, .. } => Some(name),
            ReferenceKind::TaskParameter { parameter, .. } => Some(parameter),
            ReferenceKind::KnownValue { value, .. } => Some(&value.name),
            _ => None,
        }
    }
}

/// The value (attribute or element text) containing an offset.
#[derive(Debug, Clone)]
pub(crate) struct ValueLocation {
    pub text: String,
    pub range: TextRange,
    pub kind: ValueKind,
    pub custom_type: Option<Arc<CustomTypeInfo>>,
    pub options: ExpressionOptions,
    /// Item type of the enclosing item, for unqualified metadata
    pub item: Option<Name>,
}

/// Find the reference at `offset` in the top-level document.
pub fn resolve_at(root: &RootDocument, offset: TextSize) -> Option<MsBuildReference> {
    walk_to(root, offset)?.found
}

/// Find the value containing `offset` in the top-level document.
pub(crate) fn locate_value(root: &RootDocument, offset: TextSize) -> Option<ValueLocation> {
    walk_to(root, offset)?.located
}

fn walk_to(root: &RootDocument, offset: TextSize) -> Option<Resolver<'_>> {
    let mut resolver = Resolver::new(root, offset);
    let walk = Walker::new(&root.xml, &root.text, root.path())
        .with_range(TextRange::empty(offset))
        .run(&mut resolver);
    match walk {
        Ok(_) => Some(resolver),
        Err(e) => {
            tracing::debug!("resolve interrupted: {e}");
            None
        }
    }
}

struct Resolver<'r> {
    root: &'r RootDocument,
    offset: TextSize,
    found: Option<MsBuildReference>,
    located: Option<ValueLocation>,
    current_item: Option<Name>,
    current_task: Option<Name>,
}

impl<'r> Resolver<'r> {
    fn new(root: &'r RootDocument, offset: TextSize) -> Self {
        Self {
            root,
            offset,
            found: None,
            located: None,
            current_item: None,
            current_task: None,
        }
    }

    fn found(
        &mut self,
        kind: ReferenceKind,
        usage: ReferenceUsage,
        range: TextRange,
        element: &ResolvedElement<'_>,
        attribute: Option<&ResolvedAttribute<'_>>,
    ) {
        self.found = Some(MsBuildReference {
            kind,
            usage,
            range,
            element: Some(element.syntax),
            attribute: attribute.map(|a| a.syntax),
        });
    }

    /// A reference inside a parsed expression.
    fn expression_reference(&self, node: &ExprNode) -> Option<(ReferenceKind, ReferenceUsage, TextRange)> {
        let path = node.path_at(self.offset);
        let (&innermost, ancestors) = path.split_last()?;
        let parent = ancestors.last().copied();
        let read = ReferenceUsage::READ;
        let kind = match &innermost.kind {
            ExprKind::PropertyName(name) => ReferenceKind::Property(name.clone()),
            ExprKind::ItemName(name) => ReferenceKind::Item(name.clone()),
            ExprKind::MetadataName(name) => {
                let item = match parent.map(|p| &p.kind) {
                    Some(ExprKind::Metadata { item: Some(item), .. }) => match &item.kind {
                        ExprKind::ItemName(item) => Some(item.clone()),
                        _ => None,
                    },
                    _ => self.current_item.clone(),
                };
                ReferenceKind::Metadata {
                    item,
                    name: name.clone(),
                }
            }
            ExprKind::FunctionName(name) => match parent.map(|p| &p.kind) {
                Some(ExprKind::FunctionInvocation { kind, target, .. }) => match kind {
                    InvocationKind::Item => ReferenceKind::ItemFunction(name.clone()),
                    InvocationKind::Property => ReferenceKind::PropertyFunction {
                        class: None,
                        name: name.clone(),
                    },
                    InvocationKind::Static => ReferenceKind::PropertyFunction {
                        class: match &target.kind {
                            ExprKind::ClassReference(class) => Some(class.clone()),
                            _ => None,
                        },
                        name: name.clone(),
                    },
                },
                Some(ExprKind::ConditionFunction { .. }) => ReferenceKind::ConditionFunction(name.clone()),
                _ => return None,
            },
            ExprKind::ClassReference(name) => ReferenceKind::ClassName(name.clone()),
            _ => return None,
        };
        Some((kind, read, innermost.range))
    }

    /// A literal value with a meaning given by its kind.
    fn value_reference(
        &self,
        kind: ValueKind,
        element: &ResolvedElement<'_>,
        attribute: Option<&ResolvedAttribute<'_>>,
        node: &ExprNode,
    ) -> Option<(ReferenceKind, TextRange)> {
        let piece = list_piece(node, self.offset)?;
        let ExprKind::Text(raw) = &piece.kind else {
            return None;
        };
        let value = unescape(raw.trim());
        if value.is_empty() {
            return None;
        }
        let range = trimmed_range(raw, piece.range);

        if kind.scalar == ScalarKind::CustomType || kind.scalar == ScalarKind::Bool {
            let item = self.current_item.as_ref().map(Name::as_str);
            let constant = match self.root.schemas().typed_kind(element, attribute, item) {
                Some(typed) if typed.custom_type().is_some() => typed.custom_type()?.value(&value)?.clone(),
                _ if kind.scalar == ScalarKind::Bool => {
                    let lower = value.to_ascii_lowercase();
                    (lower == "true" || lower == "false").then(|| ConstantInfo::new(value.as_str(), None))?
                }
                _ => return None,
            };
            return Some((ReferenceKind::KnownValue { kind, value: constant }, range));
        }

        if kind.is_path_like() {
            let paths = self.existing_paths(piece);
            return (!paths.is_empty()).then_some((ReferenceKind::FileOrFolder(paths), range));
        }
        None
    }

    /// Evaluate a path-valued piece and keep the candidates that exist.
    fn existing_paths(&self, piece: &ExprNode) -> Vec<PathBuf> {
        let context = self.root.evaluation_context();
        let max = self.root.options.max_evaluation_permutations;
        let Ok(values) = evaluate(piece, &context, max) else {
            return Vec::new();
        };
        let base = self.root.path().parent().map(PathBuf::from).unwrap_or_default();
        values
            .iter()
            .map(|value| normalize(&base.join(native_path(value.trim()))))
            .filter(|path| path.exists())
            .collect()
    }

    /// The SDK under the offset in a (possibly semicolon-separated) value.
    fn sdk_reference(&self, element: &ResolvedElement<'_>, value: &ValueContext<'_>) -> Option<(SdkInfo, TextRange)> {
        let mut start = usize::from(value.range.start());
        for part in value.text.split(';') {
            let range = TextRange::at(TextSize::new(start as u32), TextSize::new(part.len() as u32));
            start += part.len() + 1;
            if !touches(range, self.offset) {
                continue;
            }
            let reference = SdkReference::parse(part)?;
            let info = self
                .root
                .sdks_at(element.id)
                .find(|info| info.name().eq_ignore_ascii_case(&reference.name))?;
            return Some((info.clone(), trimmed_range(part, range)));
        }
        None
    }
}

impl MsBuildVisitor for Resolver<'_> {
    fn visit_resolved_element(&mut self, _cx: &VisitContext<'_>, element: &ResolvedElement<'_>) -> VisitResult {
        let xml = element.element;
        match element.kind() {
            SyntaxKind::Item => self.current_item = Some(Name::new(element.name())),
            SyntaxKind::Task => self.current_task = Some(Name::new(element.name())),
            SyntaxKind::UsingTask => self.current_task = xml.attribute_value("TaskName").map(|n| Name::new(n.trim())),
            _ => {}
        }
        if !xml.name_touches(self.offset) {
            return Ok(());
        }
        let range = match xml.end_name_range {
            Some(end) if touches(end, self.offset) => end,
            _ => xml.name_range,
        };
        let name = Name::new(element.name());
        let (kind, usage) = match element.kind() {
            SyntaxKind::Property => (ReferenceKind::Property(name), ReferenceUsage::WRITE),
            SyntaxKind::Item => (ReferenceKind::Item(name), ReferenceUsage::WRITE),
            SyntaxKind::Metadata => (
                ReferenceKind::Metadata {
                    item: self.current_item.clone(),
                    name,
                },
                ReferenceUsage::WRITE,
            ),
            SyntaxKind::Task => (ReferenceKind::Task(name), ReferenceUsage::READ),
            SyntaxKind::Parameter => match self.current_task.clone() {
                Some(task) => (
                    ReferenceKind::TaskParameter { task, parameter: name },
                    ReferenceUsage::DECLARATION,
                ),
                None => (ReferenceKind::Keyword, ReferenceUsage::empty()),
            },
            _ => (ReferenceKind::Keyword, ReferenceUsage::empty()),
        };
        self.found(kind, usage, range, element, None);
        Ok(())
    }

    fn leave_resolved_element(&mut self, _cx: &VisitContext<'_>, element: &ResolvedElement<'_>) -> VisitResult {
        match element.kind() {
            SyntaxKind::Item => self.current_item = None,
            SyntaxKind::Task | SyntaxKind::UsingTask => self.current_task = None,
            _ => {}
        }
        Ok(())
    }

    fn visit_resolved_attribute(
        &mut self,
        _cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        attribute: &ResolvedAttribute<'_>,
    ) -> VisitResult {
        let range = attribute.attribute.name_range;
        if !touches(range, self.offset) {
            return Ok(());
        }
        let name = Name::new(attribute.name());
        let (kind, usage) = match attribute.kind() {
            SyntaxKind::ItemMetadata => (
                ReferenceKind::Metadata {
                    item: Some(Name::new(element.name())),
                    name,
                },
                ReferenceUsage::WRITE,
            ),
            SyntaxKind::TaskParameter => (
                ReferenceKind::TaskParameter {
                    task: Name::new(element.name()),
                    parameter: name,
                },
                ReferenceUsage::WRITE,
            ),
            _ => (ReferenceKind::Keyword, ReferenceUsage::empty()),
        };
        self.found(kind, usage, range, element, Some(attribute));
        Ok(())
    }

    fn visit_value_expression(
        &mut self,
        _cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        attribute: Option<&ResolvedAttribute<'_>>,
        value: &ValueContext<'_>,
        node: &ExprNode,
    ) -> VisitResult {
        if !touches(value.range, self.offset) {
            return Ok(());
        }
        let item = self.current_item.as_ref().map(Name::as_str);
        self.located = Some(ValueLocation {
            text: value.text.to_string(),
            range: value.range,
            kind: value.kind,
            custom_type: self
                .root
                .schemas()
                .typed_kind(element, attribute, item)
                .and_then(|typed| typed.custom_type().cloned()),
            options: value.options,
            item: self.current_item.clone(),
        });
        if let Some((kind, usage, range)) = self.expression_reference(node) {
            self.found(kind, usage, range, element, attribute);
            return Ok(());
        }

        let attribute_kind = attribute.map(ResolvedAttribute::kind);
        let whole = trimmed_range(value.text, value.range);
        let literal = Name::new(unescape(value.text.trim()));
        match attribute_kind {
            Some(SyntaxKind::ImportProject) => {
                if let Some(imports) = self.root.imports_at(element.id) {
                    self.found(
                        ReferenceKind::Import(imports.to_vec()),
                        ReferenceUsage::READ,
                        whole,
                        element,
                        attribute,
                    );
                }
                return Ok(());
            }
            Some(SyntaxKind::ProjectSdk | SyntaxKind::ImportSdk | SyntaxKind::SdkName) => {
                if let Some((info, range)) = self.sdk_reference(element, value) {
                    self.found(ReferenceKind::Sdk(info), ReferenceUsage::READ, range, element, attribute);
                }
                return Ok(());
            }
            Some(SyntaxKind::TargetName) => {
                self.found(
                    ReferenceKind::Target(literal),
                    ReferenceUsage::DECLARATION,
                    whole,
                    element,
                    attribute,
                );
                return Ok(());
            }
            Some(SyntaxKind::UsingTaskTaskName) => {
                self.found(
                    ReferenceKind::Task(literal),
                    ReferenceUsage::DECLARATION,
                    whole,
                    element,
                    attribute,
                );
                return Ok(());
            }
            Some(SyntaxKind::OutputTaskParameter) => {
                if let Some(task) = self.current_task.clone() {
                    let kind = ReferenceKind::TaskParameter {
                        task,
                        parameter: literal,
                    };
                    self.found(kind, ReferenceUsage::READ, whole, element, attribute);
                }
                return Ok(());
            }
            Some(SyntaxKind::OutputPropertyName) => {
                self.found(ReferenceKind::Property(literal), ReferenceUsage::WRITE, whole, element, attribute);
                return Ok(());
            }
            Some(SyntaxKind::OutputItemName) => {
                self.found(ReferenceKind::Item(literal), ReferenceUsage::WRITE, whole, element, attribute);
                return Ok(());
            }
            _ => {}
        }

        if is_target_list(element, attribute) {
            let mut targets = Vec::new();
            target_names(node, &mut targets);
            if let Some((name, range)) = targets.into_iter().find(|(_, range)| touches(*range, self.offset)) {
                self.found(ReferenceKind::Target(name), ReferenceUsage::READ, range, element, attribute);
            }
            return Ok(());
        }

        if let Some((kind, range)) = self.value_reference(value.kind, element, attribute, node) {
            self.found(kind, ReferenceUsage::READ, range, element, attribute);
        }
        Ok(())
    }

    fn value_kind(&self, element: &ResolvedElement<'_>, attribute: Option<&ResolvedAttribute<'_>>) -> Option<ValueKind> {
        if is_call_target(element, attribute) {
            return Some(ValueKind::new(ScalarKind::TargetName).with_list());
        }
        let item = self.current_item.as_ref().map(Name::as_str);
        self.root.schemas().typed_kind(element, attribute, item).map(|t| t.kind())
    }
}

/// The list entry containing `offset`, or the whole node if it is not a list.
fn list_piece(node: &ExprNode, offset: TextSize) -> Option<&ExprNode> {
    match &node.kind {
        ExprKind::List(parts) => parts.iter().find(|part| touches(part.range, offset)),
        _ => touches(node.range, offset).then_some(node),
    }
}

/// `range` of `text` without surrounding whitespace.
fn trimmed_range(text: &str, range: TextRange) -> TextRange {
    let leading = text.len() - text.trim_start().len();
    let trimmed = text.trim().len();
    TextRange::at(range.start() + TextSize::new(leading as u32), TextSize::new(trimmed as u32))
}

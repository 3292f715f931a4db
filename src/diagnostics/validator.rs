//! Document validator
//!
//! A visitor over the top-level document that checks structure against the
//! grammar and values against the schema set. It runs after every import has
//! been loaded, so "unknown" means unknown to the whole import graph.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Diagnostic, DiagnosticCollector, codes};
use crate::base::{Name, NameSet};
use crate::config::AnalysisOptions;
use crate::error::{Cancelled, VisitResult};
use crate::expression::{ExprKind, ExprNode, unescape};
use crate::parser::{NodeId, XAttribute, XElement, XmlDocument};
use crate::schema::{
    ReferenceUsage, ScalarKind, SchemaSet, TaskInfo, TypedKind, ValueKind, is_target_list,
    target_names,
};
use crate::syntax::SyntaxKind;
use crate::visitor::{MsBuildVisitor, ResolvedAttribute, ResolvedElement, ValueContext, VisitContext, Walker};

/// Checks a top-level document against a [`SchemaSet`].
pub struct DocumentValidator<'a> {
    schemas: &'a SchemaSet,
    options: &'a AnalysisOptions,
    core_tasks_loaded: bool,
    collector: DiagnosticCollector,
    current_item: Option<Name>,
    current_task: Option<Name>,
    unused_properties: NameSet,
    unused_items: NameSet,
}

impl<'a> DocumentValidator<'a> {
    pub fn new(schemas: &'a SchemaSet, options: &'a AnalysisOptions) -> Self {
        Self {
            schemas,
            options,
            core_tasks_loaded: false,
            collector: DiagnosticCollector::new(),
            current_item: None,
            current_task: None,
            unused_properties: NameSet::new(),
            unused_items: NameSet::new(),
        }
    }

    /// Undeclared tasks are only reported once the core task definitions are known.
    pub fn with_core_tasks(mut self, loaded: bool) -> Self {
        self.core_tasks_loaded = loaded;
        self
    }

    pub fn run(
        mut self,
        document: &XmlDocument,
        text: &str,
        path: &Path,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Diagnostic>, Cancelled> {
        for error in document.errors() {
            self.collector.error(codes::XML_ERROR, error.range, error.message.clone());
        }
        let mut walker = Walker::new(document, text, path);
        if let Some(token) = cancel {
            walker = walker.with_cancellation(token);
        }
        let errors = walker.run(&mut self)?;
        for error in errors {
            self.collector
                .error(codes::INTERNAL_ERROR, error.range, format!("Internal error: {}", error.message));
        }
        debug!(
            path = %path.display(),
            errors = self.collector.error_count(),
            warnings = self.collector.warning_count(),
            "validated document"
        );
        Ok(self.collector.finish())
    }

    fn declared_task(&self, name: &str) -> Option<TaskInfo> {
        self.schemas.get_task(name).filter(TaskInfo::is_declared)
    }

    fn deprecated(&mut self, what: &str, name: &str, message: Option<&str>, element: &XElement) {
        if let Some(message) = message {
            self.collector.warning(
                codes::DEPRECATED,
                element.name_range,
                format!("{what} '{name}' is deprecated: {message}"),
            );
        }
    }

    fn check_property(&mut self, element: &ResolvedElement<'_>) {
        let name = element.name();
        if let Some(info) = self.schemas.get_property(name) {
            self.deprecated("Property", name, info.deprecation_message.as_deref(), element.element);
        }
        if self.schemas.is_imported_private_property(name) {
            self.collector.warning(
                codes::PRIVATE_SYMBOL,
                element.element.name_range,
                format!("Property '{name}' is private to an imported file"),
            );
        }
        if self.options.report_unused
            && !self.schemas.usage(name).contains(ReferenceUsage::READ)
            && !self.schemas.is_documented_property(name)
            && self.unused_properties.insert(name)
        {
            self.collector.warning(
                codes::POSSIBLY_UNUSED,
                element.element.name_range,
                format!("Property '{name}' is set but never read"),
            );
        }
    }

    fn check_item(&mut self, element: &ResolvedElement<'_>) {
        let name = element.name();
        let in_item_group = element.parent_kind() == Some(SyntaxKind::ItemGroup);
        if in_item_group
            && !element.in_target
            && !["Include", "Update", "Remove"]
                .iter()
                .any(|a| element.element.attribute(a).is_some())
        {
            self.collector.error(
                codes::ITEM_OPERATION_REQUIRED,
                element.element.name_range,
                format!("Item '{name}' must have an Include, Update or Remove attribute"),
            );
        }
        if let Some(info) = self.schemas.get_item(name) {
            self.deprecated("Item", name, info.deprecation_message.as_deref(), element.element);
        }
        if self.options.report_unused
            && in_item_group
            && !self.schemas.item_usage(name).contains(ReferenceUsage::READ)
            && !self.schemas.is_documented_item(name)
            && self.unused_items.insert(name)
        {
            self.collector.warning(
                codes::POSSIBLY_UNUSED,
                element.element.name_range,
                format!("Item '{name}' is added but never read"),
            );
        }
    }

    fn check_task(&mut self, element: &ResolvedElement<'_>) {
        let name = element.name();
        let Some(task) = self.declared_task(name) else {
            if self.core_tasks_loaded {
                self.collector.error(
                    codes::UNKNOWN_TASK,
                    element.element.name_range,
                    format!("Task '{name}' is not defined"),
                );
            }
            return;
        };
        self.deprecated("Task", name, task.deprecation_message.as_deref(), element.element);
        if !task.has_declared_parameters {
            return;
        }
        for parameter in task.parameters.values().filter(|p| p.is_required) {
            if element.element.attribute(parameter.name.as_str()).is_none() {
                self.collector.error(
                    codes::MISSING_TASK_PARAMETER,
                    element.element.name_range,
                    format!("Task '{name}' is missing required parameter '{}'", parameter.name),
                );
            }
        }
    }

    fn check_task_parameter(&mut self, task: &str, parameter: &str, attribute: &XAttribute, range_is_value: bool) {
        let Some(info) = self.declared_task(task) else {
            return;
        };
        if !info.has_declared_parameters || info.parameters.contains(parameter) {
            return;
        }
        let range = match attribute.value_range {
            Some(range) if range_is_value => range,
            _ => attribute.name_range,
        };
        self.collector.error(
            codes::UNKNOWN_TASK_PARAMETER,
            range,
            format!("Task '{task}' has no parameter '{parameter}'"),
        );
    }

    /// The schema's kind for a value, when the schema knows better than the grammar.
    fn typed_kind(&self, element: &ResolvedElement<'_>, attribute: Option<&ResolvedAttribute<'_>>) -> Option<TypedKind> {
        let item = self.current_item.as_ref().map(Name::as_str);
        self.schemas.typed_kind(element, attribute, item)
    }

    fn check_literals(&mut self, typed: &TypedKind, node: &ExprNode) {
        let kind = typed.kind();
        if !is_checked_kind(kind.scalar) {
            return;
        }
        let pieces: Vec<&ExprNode> = match &node.kind {
            ExprKind::List(parts) => parts.iter().collect(),
            _ => vec![node],
        };
        for piece in pieces {
            let ExprKind::Text(raw) = &piece.kind else {
                continue;
            };
            if ["$(", "@(", "%("].iter().any(|p| raw.contains(p)) {
                continue;
            }
            if !kind.is_list() && raw.contains(';') {
                self.collector
                    .error(codes::LIST_NOT_PERMITTED, piece.range, "Lists are not permitted in this value");
                continue;
            }
            let value = unescape(raw);
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match typed.custom_type() {
                Some(custom) => {
                    if !custom.allow_unknown_values && custom.value(value).is_none() {
                        let message = match &custom.name {
                            Some(type_name) => format!("Unknown value '{value}' for '{type_name}'"),
                            None => format!("Unknown value '{value}'"),
                        };
                        self.collector.warning(codes::UNKNOWN_VALUE, piece.range, message);
                    }
                }
                None => {
                    if let Some(problem) = kind.validate_literal(value) {
                        self.collector.error(codes::INVALID_VALUE, piece.range, problem);
                    }
                }
            }
        }
    }
}

fn is_checked_kind(scalar: ScalarKind) -> bool {
    matches!(
        scalar,
        ScalarKind::Bool
            | ScalarKind::Int
            | ScalarKind::Float
            | ScalarKind::Char
            | ScalarKind::Guid
            | ScalarKind::ProjectKindGuid
            | ScalarKind::Lcid
            | ScalarKind::Version
            | ScalarKind::VersionSuffixed
            | ScalarKind::SdkVersion
            | ScalarKind::NuGetVersion
            | ScalarKind::TargetFrameworkVersion
            | ScalarKind::Url
            | ScalarKind::CustomType
    )
}

/// Error nodes not nested inside another error node.
fn outermost_errors<'n>(node: &'n ExprNode, out: &mut Vec<&'n ExprNode>) {
    if node.is_error() {
        out.push(node);
        return;
    }
    for child in node.children() {
        outermost_errors(child, out);
    }
}

impl MsBuildVisitor for DocumentValidator<'_> {
    fn visit_resolved_element(&mut self, _cx: &VisitContext<'_>, element: &ResolvedElement<'_>) -> VisitResult {
        for required in element.syntax.required_attributes() {
            if element.element.attribute(required.name).is_none() {
                self.collector.error(
                    codes::MISSING_REQUIRED_ATTRIBUTE,
                    element.element.name_range,
                    format!("Element '{}' is missing required attribute '{}'", element.name(), required.name),
                );
            }
        }
        match element.kind() {
            SyntaxKind::Property => self.check_property(element),
            SyntaxKind::Item => {
                self.current_item = Some(Name::new(element.name()));
                self.check_item(element);
            }
            SyntaxKind::Metadata => {
                let item = self.current_item.clone();
                if let Some(info) = self.schemas.get_metadata(item.as_ref().map(Name::as_str), element.name()) {
                    self.deprecated("Metadata", element.name(), info.deprecation_message.as_deref(), element.element);
                }
            }
            SyntaxKind::Task => {
                self.current_task = Some(Name::new(element.name()));
                self.check_task(element);
            }
            _ => {}
        }
        Ok(())
    }

    fn leave_resolved_element(&mut self, _cx: &VisitContext<'_>, element: &ResolvedElement<'_>) -> VisitResult {
        match element.kind() {
            SyntaxKind::Item => self.current_item = None,
            SyntaxKind::Task => self.current_task = None,
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
        let xml = attribute.attribute;
        if attribute.syntax.required && xml.value.as_deref().is_none_or(|v| v.trim().is_empty()) {
            self.collector.error(
                codes::EMPTY_REQUIRED_VALUE,
                xml.range,
                format!("Attribute '{}' must not be empty", attribute.name()),
            );
        }
        match attribute.kind() {
            SyntaxKind::TaskParameter => {
                self.check_task_parameter(element.name(), attribute.name(), xml, false);
            }
            SyntaxKind::OutputTaskParameter => {
                if let (Some(task), Some(parameter)) = (self.current_task.clone(), xml.value.as_deref()) {
                    self.check_task_parameter(task.as_str(), parameter.trim(), xml, true);
                }
            }
            SyntaxKind::ItemMetadata => {
                if let Some(info) = self.schemas.get_metadata(Some(element.name()), attribute.name())
                    && let Some(message) = info.deprecation_message
                {
                    self.collector.warning(
                        codes::DEPRECATED,
                        xml.name_range,
                        format!("Metadata '{}' is deprecated: {message}", attribute.name()),
                    );
                }
            }
            _ => {}
        }
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
        let mut errors = Vec::new();
        outermost_errors(node, &mut errors);
        for error in errors {
            if let ExprKind::Error { kind, .. } = &error.kind {
                self.collector.error(codes::EXPRESSION_ERROR, error.range, kind.message());
            }
        }

        if attribute.is_some_and(|a| a.kind() == SyntaxKind::ImportProject) && node.has_items_or_metadata() {
            self.collector.error(
                codes::IMPORT_ITEMS_NOT_PERMITTED,
                value.range,
                "Item and metadata references are not permitted in imports",
            );
        }

        if is_target_list(element, attribute) {
            let mut names = Vec::new();
            target_names(node, &mut names);
            for (name, range) in names {
                if self.schemas.get_target(name.as_str()).is_none() {
                    self.collector
                        .warning(codes::UNKNOWN_TARGET, range, format!("Target '{name}' is not defined"));
                }
            }
        }

        if let Some(typed) = self.typed_kind(element, attribute) {
            self.check_literals(&typed, node);
        } else if value.kind.is_literal() {
            self.check_literals(&TypedKind::from(value.kind), node);
        }
        Ok(())
    }

    fn visit_unknown_element(
        &mut self,
        _cx: &VisitContext<'_>,
        parent: Option<&ResolvedElement<'_>>,
        _id: NodeId,
        element: &XElement,
    ) -> VisitResult {
        let message = match parent {
            Some(parent) => format!("Element '{}' is not valid inside '{}'", element.name, parent.name()),
            None => format!("Unknown root element '{}', expected 'Project'", element.name),
        };
        self.collector.error(codes::UNKNOWN_ELEMENT, element.name_range, message);
        Ok(())
    }

    fn visit_unknown_attribute(
        &mut self,
        _cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        attribute: &XAttribute,
    ) -> VisitResult {
        if attribute.name.contains(':') {
            return Ok(());
        }
        self.collector.error(
            codes::UNKNOWN_ATTRIBUTE,
            attribute.name_range,
            format!("Attribute '{}' is not valid on '{}'", attribute.name, element.name()),
        );
        Ok(())
    }

    fn value_kind(&self, element: &ResolvedElement<'_>, attribute: Option<&ResolvedAttribute<'_>>) -> Option<ValueKind> {
        if crate::schema::is_call_target(element, attribute) {
            return Some(ValueKind::new(ScalarKind::TargetName).with_list());
        }
        self.typed_kind(element, attribute).map(|t| t.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_xml;
    use crate::schema::{Builtins, InferredSchema, Schema, SchemaEntry, SchemaOrigin};
    use std::sync::Arc;

    const PATH: &str = "/p/test.csproj";

    fn declared(json: &str) -> SchemaEntry {
        SchemaEntry::Declared {
            schema: Arc::new(Schema::from_json_str(json, SchemaOrigin::BuiltIn).unwrap()),
            top_level: false,
        }
    }

    fn imported(text: &str) -> SchemaEntry {
        let document = parse_xml(text);
        SchemaEntry::Inferred(Arc::new(InferredSchema::build(
            &document,
            text,
            Path::new("/p/imported.targets"),
            false,
        )))
    }

    /// `extra` entries go after the top-level inferred schema and before the builtins.
    fn check(text: &str, declared_entries: Vec<SchemaEntry>, extra: Vec<SchemaEntry>, core_tasks: bool) -> Vec<Diagnostic> {
        let document = parse_xml(text);
        let path = Path::new(PATH);
        let mut entries = declared_entries;
        entries.push(SchemaEntry::Inferred(Arc::new(InferredSchema::build(&document, text, path, true))));
        entries.extend(extra);
        entries.push(SchemaEntry::BuiltIn(Builtins::get().schema.clone()));
        let schemas = SchemaSet::new(entries, false);
        let options = AnalysisOptions::default();
        DocumentValidator::new(&schemas, &options)
            .with_core_tasks(core_tasks)
            .run(&document, text, path, None)
            .unwrap()
    }

    fn simple(text: &str) -> Vec<Diagnostic> {
        check(text, Vec::new(), Vec::new(), false)
    }

    fn count(diagnostics: &[Diagnostic], code: &str) -> usize {
        diagnostics.iter().filter(|d| d.code == code).count()
    }

    fn spanned<'t>(text: &'t str, diagnostic: &Diagnostic) -> &'t str {
        &text[usize::from(diagnostic.range.start())..usize::from(diagnostic.range.end())]
    }

    #[test]
    fn test_unknown_elements_and_attributes() {
        let diagnostics = simple("<Project><PropertyGroup Foo=\"x\" /><Bogus /></Project>");
        assert_eq!(count(&diagnostics, codes::UNKNOWN_ELEMENT), 1);
        assert_eq!(count(&diagnostics, codes::UNKNOWN_ATTRIBUTE), 1);
    }

    #[test]
    fn test_missing_and_empty_required_attributes() {
        let diagnostics = simple("<Project><Target /><Import /><Target Name=\" \" /></Project>");
        assert_eq!(count(&diagnostics, codes::MISSING_REQUIRED_ATTRIBUTE), 2);
        assert_eq!(count(&diagnostics, codes::EMPTY_REQUIRED_VALUE), 1);
    }

    #[test]
    fn test_item_operation_required_outside_targets() {
        let text = r#"<Project>
  <ItemGroup><Compile /></ItemGroup>
  <Target Name="B"><ItemGroup><Compile Remove="x" /><Compile /></ItemGroup></Target>
</Project>"#;
        let diagnostics = simple(text);
        assert_eq!(count(&diagnostics, codes::ITEM_OPERATION_REQUIRED), 1);
    }

    #[test]
    fn test_expression_errors_are_reported_once() {
        let text = "<Project><PropertyGroup><B>$(C</B></PropertyGroup></Project>";
        let diagnostics = simple(text);
        let errors: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code == codes::EXPRESSION_ERROR)
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(usize::from(errors[0].range.start()) >= text.find("$(C").unwrap());
    }

    #[rstest::rstest]
    #[case("('$(A)' == 'b'")]
    #[case("'$(A)' == 'b')")]
    #[case("Exists('a'")]
    #[case("(('$(A)' == 'b') and '$(B)' != ''")]
    fn test_unbalanced_condition_parentheses(#[case] condition: &str) {
        let text = format!("<Project><PropertyGroup Condition=\"{condition}\" /></Project>");
        let diagnostics = simple(&text);
        assert!(count(&diagnostics, codes::EXPRESSION_ERROR) >= 1);
        let start = text.find(condition).unwrap();
        for error in diagnostics.iter().filter(|d| d.code == codes::EXPRESSION_ERROR) {
            assert!(usize::from(error.range.start()) >= start);
            assert!(usize::from(error.range.end()) <= start + condition.len());
        }
    }

    #[test]
    fn test_malformed_xml_is_reported() {
        let diagnostics = simple("<Project><PropertyGroup>");
        assert!(count(&diagnostics, codes::XML_ERROR) >= 1);
    }

    #[test]
    fn test_literal_values_are_checked_against_schema() {
        let schema = declared(
            r#"{ "properties": {
                "Flag": { "description": "A flag", "type": "bool" },
                "Mode": { "description": "A mode", "type": [ "Fast", "Slow" ] },
                "Count": { "description": "A count", "type": "int" }
            } }"#,
        );
        let text = r#"<Project><PropertyGroup>
  <Flag>yes</Flag>
  <Flag>$(Other)</Flag>
  <Mode>medium</Mode>
  <Mode>FAST</Mode>
  <Count>1;2</Count>
</PropertyGroup></Project>"#;
        let diagnostics = check(text, vec![schema], Vec::new(), false);
        assert_eq!(count(&diagnostics, codes::INVALID_VALUE), 1);
        assert_eq!(count(&diagnostics, codes::UNKNOWN_VALUE), 1);
        assert_eq!(count(&diagnostics, codes::LIST_NOT_PERMITTED), 1);
        let invalid = diagnostics.iter().find(|d| d.code == codes::INVALID_VALUE).unwrap();
        assert_eq!(spanned(text, invalid), "yes");
    }

    #[test]
    fn test_grammar_literals_are_checked() {
        let diagnostics = simple("<Project><ItemGroup><A Include=\"x\" KeepDuplicates=\"maybe\" /></ItemGroup></Project>");
        assert_eq!(count(&diagnostics, codes::INVALID_VALUE), 1);
    }

    #[test]
    fn test_task_checks() {
        let text = r#"<Project>
  <UsingTask TaskName="Greet" AssemblyFile="g.dll">
    <ParameterGroup><Who Required="true" /><Result Output="true" /></ParameterGroup>
  </UsingTask>
  <Target Name="B">
    <Greet Extra="1"><Output TaskParameter="Nope" PropertyName="P" /></Greet>
    <Missing />
  </Target>
</Project>"#;
        let diagnostics = check(text, Vec::new(), Vec::new(), true);
        assert_eq!(count(&diagnostics, codes::UNKNOWN_TASK), 1);
        assert_eq!(count(&diagnostics, codes::UNKNOWN_TASK_PARAMETER), 2);
        assert_eq!(count(&diagnostics, codes::MISSING_TASK_PARAMETER), 1);

        let without_core = check(text, Vec::new(), Vec::new(), false);
        assert_eq!(count(&without_core, codes::UNKNOWN_TASK), 0);
    }

    #[test]
    fn test_unknown_target_span() {
        let text = r#"<Project><Target Name="A" DependsOnTargets="B;Missing" /><Target Name="B" /></Project>"#;
        let diagnostics = simple(text);
        let unknown: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code == codes::UNKNOWN_TARGET)
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(spanned(text, unknown[0]), "Missing");
    }

    #[test]
    fn test_import_items_not_permitted() {
        let diagnostics = simple(r#"<Project><Import Project="@(Foo)\x.props" /></Project>"#);
        assert_eq!(count(&diagnostics, codes::IMPORT_ITEMS_NOT_PERMITTED), 1);
    }

    #[test]
    fn test_deprecated_property() {
        let schema = declared(r#"{ "properties": { "Old": { "description": "x", "deprecationMessage": "Use New" } } }"#);
        let diagnostics = check(
            "<Project><PropertyGroup><Old>1</Old></PropertyGroup></Project>",
            vec![schema],
            Vec::new(),
            false,
        );
        let deprecated = diagnostics.iter().find(|d| d.code == codes::DEPRECATED).unwrap();
        assert!(deprecated.message.contains("Use New"));
    }

    #[test]
    fn test_unused_and_private_properties() {
        let import = imported("<Project><PropertyGroup><_Secret>1</_Secret><X>$(Used)</X></PropertyGroup></Project>");
        let text = "<Project><PropertyGroup><_Secret>2</_Secret><Orphan>1</Orphan><Used>1</Used><Configuration>Debug</Configuration></PropertyGroup></Project>";
        let diagnostics = check(text, Vec::new(), vec![import], false);

        let private: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code == codes::PRIVATE_SYMBOL)
            .collect();
        assert_eq!(private.len(), 1);
        assert_eq!(spanned(text, private[0]), "_Secret");

        let unused: Vec<&str> = diagnostics
            .iter()
            .filter(|d| d.code == codes::POSSIBLY_UNUSED)
            .map(|d| spanned(text, d))
            .collect();
        assert!(unused.contains(&"Orphan"));
        assert!(!unused.contains(&"Used"));
        assert!(!unused.contains(&"Configuration"));
    }
}

//! Schemas inferred from a document's own XML
//!
//! Every document contributes what it writes and reads: properties, items
//! and their metadata, targets, tasks, plus the values conditions compare
//! properties against. The builder is a visitor over the document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use text_size::TextRange;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::symbols::{
    CustomTypeInfo, ItemInfo, MetadataInfo, PropertyInfo, ReferenceUsage, SymbolLocation, TargetInfo, TaskInfo,
    TaskOrigin, TaskParameterInfo,
};
use super::value_kind::{ScalarKind, ValueKind};
use super::{MsBuildSchema, SchemaOrigin};
use crate::base::{Name, NameMap, NameSet};
use crate::error::{Cancelled, VisitResult};
use crate::expression::{ExprKind, ExprNode};
use crate::parser::XmlDocument;
use crate::syntax::SyntaxKind;
use crate::visitor::{MsBuildVisitor, ResolvedAttribute, ResolvedElement, ValueContext, VisitContext, Walker};

/// What one document declares and uses.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredSchema {
    origin: SchemaOrigin,
    pub is_top_level: bool,
    properties: NameMap<PropertyInfo>,
    items: NameMap<ItemInfo>,
    tasks: NameMap<TaskInfo>,
    targets: NameMap<TargetInfo>,
    custom_types: NameMap<Arc<CustomTypeInfo>>,
    /// Values seen for the `Configuration` property
    pub configurations: NameSet,
    /// Values seen for the `Platform` property
    pub platforms: NameSet,
    /// Values that conditions compare each property against
    pub comparand_values: NameMap<NameSet>,
    pub property_usage: NameMap<ReferenceUsage>,
    pub item_usage: NameMap<ReferenceUsage>,
    /// Targets named by `DependsOnTargets`, `BeforeTargets`, `CallTarget` and so on
    pub target_references: NameMap<Vec<TextRange>>,
}

impl InferredSchema {
    fn new(path: &Path, is_top_level: bool) -> Self {
        Self {
            origin: SchemaOrigin::Inferred(path.to_path_buf()),
            is_top_level,
            properties: NameMap::new(),
            items: NameMap::new(),
            tasks: NameMap::new(),
            targets: NameMap::new(),
            custom_types: NameMap::new(),
            configurations: NameSet::new(),
            platforms: NameSet::new(),
            comparand_values: NameMap::new(),
            property_usage: NameMap::new(),
            item_usage: NameMap::new(),
            target_references: NameMap::new(),
        }
    }

    /// Infer a schema from a parsed document.
    pub fn build(document: &XmlDocument, text: &str, path: &Path, is_top_level: bool) -> Self {
        match InferredSchemaBuilder::new(path, is_top_level).build(document, text, None) {
            Ok(schema) => schema,
            Err(Cancelled) => Self::new(path, is_top_level),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            SchemaOrigin::Inferred(path) => Some(path),
            _ => None,
        }
    }

    /// Tasks, for filling in definitions from compiled assemblies.
    pub(crate) fn tasks_mut(&mut self) -> &mut NameMap<TaskInfo> {
        &mut self.tasks
    }
}

impl MsBuildSchema for InferredSchema {
    fn origin(&self) -> &SchemaOrigin {
        &self.origin
    }

    fn properties(&self) -> &NameMap<PropertyInfo> {
        &self.properties
    }

    fn items(&self) -> &NameMap<ItemInfo> {
        &self.items
    }

    fn tasks(&self) -> &NameMap<TaskInfo> {
        &self.tasks
    }

    fn targets(&self) -> &NameMap<TargetInfo> {
        &self.targets
    }

    fn custom_types(&self) -> &NameMap<Arc<CustomTypeInfo>> {
        &self.custom_types
    }
}

/// Visitor that fills an [`InferredSchema`].
pub struct InferredSchemaBuilder {
    path: PathBuf,
    schema: InferredSchema,
}

impl InferredSchemaBuilder {
    pub fn new(path: &Path, is_top_level: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            schema: InferredSchema::new(path, is_top_level),
        }
    }

    pub fn build(
        mut self,
        document: &XmlDocument,
        text: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<InferredSchema, Cancelled> {
        let path = self.path.clone();
        let mut walker = Walker::new(document, text, &path);
        if let Some(token) = cancel {
            walker = walker.with_cancellation(token);
        }
        let errors = walker.run(&mut self)?;
        if !errors.is_empty() {
            debug!(path = %path.display(), count = errors.len(), "errors while inferring schema");
        }
        Ok(self.schema)
    }

    fn location(&self, range: TextRange) -> Option<SymbolLocation> {
        Some(SymbolLocation {
            path: self.path.clone(),
            range,
        })
    }

    fn write_property(&mut self, name: &str, range: TextRange) {
        let location = self.location(range);
        let property = self
            .schema
            .properties
            .get_or_insert_with(name, || PropertyInfo::new(name, None));
        if property.declared_at.is_none() {
            property.declared_at = location;
        }
        *self
            .schema
            .property_usage
            .get_or_insert_with(name, ReferenceUsage::empty) |= ReferenceUsage::WRITE;
    }

    fn read_property(&mut self, name: &Name) {
        self.schema
            .properties
            .get_or_insert_with(name.as_str(), || PropertyInfo::new(name.clone(), None));
        *self
            .schema
            .property_usage
            .get_or_insert_with(name.as_str(), ReferenceUsage::empty) |= ReferenceUsage::READ;
    }

    fn item(&mut self, name: &str, range: Option<TextRange>) -> &mut ItemInfo {
        let location = range.and_then(|r| self.location(r));
        let item = self
            .schema
            .items
            .get_or_insert_with(name, || ItemInfo::new(name, None));
        if item.declared_at.is_none() {
            item.declared_at = location;
        }
        item
    }

    fn use_item(&mut self, name: &str, usage: ReferenceUsage) {
        *self
            .schema
            .item_usage
            .get_or_insert_with(name, ReferenceUsage::empty) |= usage;
    }

    fn write_metadata(&mut self, item: &str, name: &str, range: TextRange) {
        let location = self.location(range);
        let item_info = self.item(item, None);
        let item_name = item_info.name.clone();
        let metadata = item_info
            .metadata
            .get_or_insert_with(name, || MetadataInfo::new(name, Some(item_name), None));
        if metadata.declared_at.is_none() {
            metadata.declared_at = location;
        }
    }

    fn task(&mut self, name: &str) -> &mut TaskInfo {
        self.schema.tasks.get_or_insert_with(name, || TaskInfo {
            name: Name::new(name),
            ..Default::default()
        })
    }

    fn task_parameter(&mut self, task: &str, parameter: &str, is_output: bool) {
        let info = self.task(task);
        if info.has_declared_parameters {
            return;
        }
        let parameter = info
            .parameters
            .get_or_insert_with(parameter, || TaskParameterInfo {
                name: Name::new(parameter),
                ..Default::default()
            });
        parameter.is_output |= is_output;
    }

    fn reference_target(&mut self, name: &str, range: TextRange) {
        self.schema
            .target_references
            .get_or_insert_with(name, Vec::new)
            .push(range);
    }

    fn record_comparand(&mut self, name: &Name, value: &str) {
        if value.is_empty() || value.contains("$(") {
            return;
        }
        self.schema
            .comparand_values
            .get_or_insert_with(name.as_str(), NameSet::new)
            .insert(value);
        if name.matches("Configuration") {
            self.schema.configurations.insert(value);
        } else if name.matches("Platform") {
            self.schema.platforms.insert(value);
        }
    }

    fn visit_using_task(&mut self, cx: &VisitContext<'_>, element: &ResolvedElement<'_>) {
        let Some(name) = element.element.attribute_value("TaskName") else {
            return;
        };
        let name = name.rsplit('.').next().unwrap_or(name);
        let assembly = element
            .element
            .attribute_value("AssemblyFile")
            .or_else(|| element.element.attribute_value("AssemblyName"))
            .map(str::to_string);

        let mut parameters = NameMap::new();
        let mut has_declared_parameters = false;
        for (_, group) in cx.document.children_named(element.id, "ParameterGroup") {
            has_declared_parameters = true;
            for &parameter_id in &group.children {
                let parameter = cx.document.element(parameter_id);
                let is_true = |attr: &str| parameter.attribute_value(attr).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
                let info = TaskParameterInfo {
                    name: Name::new(parameter.name.as_str()),
                    is_required: is_true("Required"),
                    is_output: is_true("Output"),
                    declared_at: self.location(parameter.name_range),
                    ..Default::default()
                };
                parameters.insert(parameter.name.as_str(), info);
            }
        }

        let declared_at = element
            .element
            .attribute("TaskName")
            .and_then(|a| a.value_range)
            .and_then(|r| self.location(r));
        let task = TaskInfo {
            name: Name::new(name),
            parameters,
            has_declared_parameters,
            origin: TaskOrigin::Declared {
                path: self.path.clone(),
                assembly,
            },
            declared_at,
            ..Default::default()
        };
        self.schema.tasks.insert(name, task);
    }

    fn visit_comparisons(&mut self, node: &ExprNode) {
        node.walk(&mut |n| {
            if let ExprKind::Compare { op, left, right } = &n.kind
                && op.is_equality()
            {
                for (name, value) in comparand_pairs(left, right)
                    .into_iter()
                    .chain(comparand_pairs(right, left))
                {
                    self.record_comparand(&name, &value);
                }
            }
        });
    }
}

/// Pair property references on one side of a comparison with the literal
/// text on the other, splitting on the literal separators between them.
/// `'$(Configuration)|$(Platform)' == 'Debug|AnyCPU'` yields two pairs.
fn comparand_pairs(references: &ExprNode, literal: &ExprNode) -> Vec<(Name, String)> {
    let Some(value) = literal_text(literal) else {
        return Vec::new();
    };
    let parts: Vec<&ExprNode> = match &unquote(references).kind {
        ExprKind::Concat(parts) => parts.iter().collect(),
        _ => vec![unquote(references)],
    };

    let mut pairs = Vec::new();
    let mut rest = value.as_str();
    let mut pending: Option<&Name> = None;
    for part in parts {
        match &part.kind {
            ExprKind::Property(_) => {
                let Some(name) = part.property_name() else {
                    return Vec::new();
                };
                if pending.is_some() {
                    return Vec::new();
                }
                pending = Some(name);
            }
            ExprKind::Text(separator) => match pending.take() {
                Some(name) => {
                    let Some(index) = rest.find(separator.as_str()) else {
                        return Vec::new();
                    };
                    pairs.push((name.clone(), rest[..index].to_string()));
                    rest = &rest[index + separator.len()..];
                }
                None => match rest.strip_prefix(separator.as_str()) {
                    Some(stripped) => rest = stripped,
                    None => return Vec::new(),
                },
            },
            _ => return Vec::new(),
        }
    }
    match pending {
        Some(name) => pairs.push((name.clone(), rest.to_string())),
        None if !rest.is_empty() => return Vec::new(),
        None => {}
    }
    pairs
}

fn unquote(node: &ExprNode) -> &ExprNode {
    match &node.kind {
        ExprKind::Quoted(inner) => inner.as_ref(),
        _ => node,
    }
}

fn literal_text(node: &ExprNode) -> Option<String> {
    match &unquote(node).kind {
        ExprKind::Text(text) => Some(text.clone()),
        _ => None,
    }
}

/// `CallTarget/@Targets`, which the grammar only knows as a task parameter.
pub(crate) fn is_call_target(element: &ResolvedElement<'_>, attribute: Option<&ResolvedAttribute<'_>>) -> bool {
    element.kind() == SyntaxKind::Task
        && element.element.is_named("CallTarget")
        && attribute.is_some_and(|a| a.name().eq_ignore_ascii_case("Targets"))
}

/// True for values that name targets.
pub(crate) fn is_target_list(element: &ResolvedElement<'_>, attribute: Option<&ResolvedAttribute<'_>>) -> bool {
    attribute.is_some_and(|a| a.kind().is_target_reference()) || is_call_target(element, attribute)
}

/// Split a target list into names with their ranges.
pub(crate) fn target_names(node: &ExprNode, out: &mut Vec<(Name, TextRange)>) {
    match &node.kind {
        ExprKind::List(parts) | ExprKind::Concat(parts) => {
            for part in parts {
                target_names(part, out);
            }
        }
        ExprKind::Text(text) => {
            let mut offset = 0;
            for piece in text.split(';') {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    let leading = piece.len() - piece.trim_start().len();
                    let start = node.range.start() + crate::base::size(offset + leading);
                    out.push((
                        Name::new(trimmed),
                        TextRange::at(start, crate::base::size(trimmed.len())),
                    ));
                }
                offset += piece.len() + 1;
            }
        }
        _ => {}
    }
}

impl MsBuildVisitor for InferredSchemaBuilder {
    fn visit_resolved_element(&mut self, cx: &VisitContext<'_>, element: &ResolvedElement<'_>) -> VisitResult {
        let name = element.name();
        match element.kind() {
            SyntaxKind::Property => self.write_property(name, element.element.name_range),
            SyntaxKind::Item => {
                self.item(name, Some(element.element.name_range));
                if element.parent_kind() == Some(SyntaxKind::ItemGroup) {
                    self.use_item(name, ReferenceUsage::WRITE);
                }
            }
            SyntaxKind::Metadata => {
                if let Some((parent, _)) = element.parent {
                    let item = cx.document.element(parent).name.clone();
                    self.write_metadata(&item, name, element.element.name_range);
                }
            }
            SyntaxKind::Target => {
                if let Some(attribute) = element.element.attribute("Name")
                    && let (Some(target), Some(range)) = (attribute.value.as_deref(), attribute.value_range)
                {
                    let target = target.trim();
                    if !target.is_empty() {
                        let info = TargetInfo {
                            declared_at: self.location(range),
                            ..TargetInfo::new(target, None)
                        };
                        self.schema.targets.insert(target, info);
                    }
                }
            }
            SyntaxKind::Task => {
                self.task(name);
            }
            SyntaxKind::Output => {
                if let Some((parent, _)) = element.parent
                    && let Some(parameter) = element.element.attribute_value("TaskParameter")
                {
                    let task = cx.document.element(parent).name.clone();
                    self.task_parameter(&task, parameter.trim(), true);
                }
            }
            SyntaxKind::UsingTask => self.visit_using_task(cx, element),
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
        match attribute.kind() {
            SyntaxKind::ItemMetadata => {
                self.write_metadata(element.name(), attribute.name(), attribute.attribute.name_range);
            }
            SyntaxKind::TaskParameter => {
                self.task_parameter(element.name(), attribute.name(), false);
            }
            SyntaxKind::OutputPropertyName => {
                if let (Some(name), Some(range)) = (attribute.attribute.value.as_deref(), attribute.attribute.value_range)
                    && !name.trim().is_empty()
                {
                    self.write_property(name.trim(), range);
                }
            }
            SyntaxKind::OutputItemName => {
                if let (Some(name), Some(range)) = (attribute.attribute.value.as_deref(), attribute.attribute.value_range)
                    && !name.trim().is_empty()
                {
                    self.item(name.trim(), Some(range));
                    self.use_item(name.trim(), ReferenceUsage::WRITE);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn visit_element_value(
        &mut self,
        _cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        value: &ValueContext<'_>,
    ) -> VisitResult {
        if element.kind() == SyntaxKind::Property && !value.text.contains('$') {
            let literal = value.text.trim();
            if literal.is_empty() {
                return Ok(());
            }
            if element.element.is_named("Configuration") {
                self.schema.configurations.insert(literal);
            } else if element.element.is_named("Platform") {
                self.schema.platforms.insert(literal);
            }
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
        let mut reads = Vec::new();
        let mut item_reads = Vec::new();
        node.walk(&mut |n| match &n.kind {
            ExprKind::PropertyName(name) => reads.push(name.clone()),
            ExprKind::ItemName(name) => item_reads.push(name.clone()),
            _ => {}
        });
        for name in &reads {
            self.read_property(name);
        }
        for name in &item_reads {
            self.item(name.as_str(), None);
            self.use_item(name.as_str(), ReferenceUsage::READ);
        }

        if value.kind.scalar == ScalarKind::Condition {
            self.visit_comparisons(node);
        }

        if is_target_list(element, attribute) {
            let mut names = Vec::new();
            target_names(node, &mut names);
            for (name, range) in names {
                self.reference_target(name.as_str(), range);
            }
        }
        Ok(())
    }

    fn value_kind(&self, element: &ResolvedElement<'_>, attribute: Option<&ResolvedAttribute<'_>>) -> Option<ValueKind> {
        is_call_target(element, attribute).then(|| ValueKind::new(ScalarKind::TargetName).with_list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_xml;

    fn infer(text: &str) -> InferredSchema {
        let document = parse_xml(text);
        InferredSchema::build(&document, text, Path::new("/p/test.csproj"), true)
    }

    #[test]
    fn test_property_writes_and_reads() {
        let schema = infer(
            r#"<Project>
  <PropertyGroup>
    <Foo>1</Foo>
    <Bar>$(Foo);$(Baz)</Bar>
  </PropertyGroup>
</Project>"#,
        );
        assert_eq!(schema.property_usage.get("foo"), Some(&(ReferenceUsage::READ | ReferenceUsage::WRITE)));
        assert_eq!(schema.property_usage.get("Bar"), Some(&ReferenceUsage::WRITE));
        assert_eq!(schema.property_usage.get("Baz"), Some(&ReferenceUsage::READ));
        assert!(schema.properties().get("Foo").unwrap().declared_at.is_some());
        assert!(schema.properties().get("Baz").unwrap().declared_at.is_none());
    }

    #[test]
    fn test_items_and_metadata() {
        let schema = infer(
            r#"<Project>
  <ItemGroup>
    <Compile Include="a.cs" Link="x\a.cs">
      <AutoGen>true</AutoGen>
    </Compile>
    <None Include="@(Compile)" />
  </ItemGroup>
</Project>"#,
        );
        let compile = schema.items().get("Compile").unwrap();
        assert!(compile.metadata.contains("Link"));
        assert!(compile.metadata.contains("autogen"));
        assert_eq!(
            compile.metadata.get("AutoGen").unwrap().item.as_ref().map(Name::as_str),
            Some("Compile")
        );
        assert_eq!(schema.item_usage.get("Compile"), Some(&(ReferenceUsage::READ | ReferenceUsage::WRITE)));
    }

    #[test]
    fn test_targets_and_references() {
        let text = r#"<Project DefaultTargets="Build">
  <Target Name="Build" DependsOnTargets="Prepare; Compile" />
  <Target Name="Other">
    <CallTarget Targets="Pack" />
  </Target>
</Project>"#;
        let schema = infer(text);
        let build = schema.targets().get("build").unwrap();
        let range = build.declared_at.as_ref().unwrap().range;
        assert_eq!(&text[range], "Build");
        assert!(schema.target_references.contains("Prepare"));
        let compile = &schema.target_references.get("Compile").unwrap()[0];
        assert_eq!(&text[*compile], "Compile");
        assert!(schema.target_references.contains("Pack"));
        assert!(schema.target_references.contains("Build"));
    }

    #[test]
    fn test_tasks_inferred_and_declared() {
        let schema = infer(
            r#"<Project>
  <UsingTask TaskName="My.Tasks.Greet" AssemblyFile="tasks.dll">
    <ParameterGroup>
      <Name Required="true" />
      <Result Output="true" />
    </ParameterGroup>
  </UsingTask>
  <Target Name="Build">
    <Greet Name="x" />
    <Exec Command="ls">
      <Output TaskParameter="ExitCode" PropertyName="Code" />
    </Exec>
  </Target>
</Project>"#,
        );
        let greet = schema.tasks().get("Greet").unwrap();
        assert!(greet.is_declared());
        assert!(greet.has_declared_parameters);
        assert!(greet.parameters.get("name").unwrap().is_required);
        assert!(greet.parameters.get("Result").unwrap().is_output);

        let exec = schema.tasks().get("Exec").unwrap();
        assert!(!exec.is_declared());
        assert!(exec.parameters.contains("Command"));
        assert!(exec.parameters.get("ExitCode").unwrap().is_output);
        assert!(schema.property_usage.get("Code").unwrap().contains(ReferenceUsage::WRITE));
    }

    #[test]
    fn test_condition_comparands() {
        let schema = infer(
            r#"<Project>
  <PropertyGroup Condition="'$(Configuration)|$(Platform)' == 'Debug|AnyCPU'" />
  <PropertyGroup Condition="'$(Configuration)' == 'Release'" />
  <PropertyGroup Condition="'$(Flavor)' != 'Mono' and $(Other) == 'x'" />
  <PropertyGroup>
    <Platform>x64</Platform>
  </PropertyGroup>
</Project>"#,
        );
        assert!(schema.configurations.contains("Debug"));
        assert!(schema.configurations.contains("Release"));
        assert!(schema.platforms.contains("AnyCPU"));
        assert!(schema.platforms.contains("x64"));
        assert!(schema.comparand_values.get("Flavor").unwrap().contains("Mono"));
        assert!(schema.comparand_values.get("Other").unwrap().contains("x"));
    }
}

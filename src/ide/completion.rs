//! Completion suggestions at an offset.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use text_size::TextSize;

use crate::base::{Name, NameSet};
use crate::expression::{
    ExprKind, ExprNode, ExpressionOptions, TriggerState, evaluate, get_condition_trigger_state, get_trigger_state,
    native_path, normalize, parse_expression, validate_list_permitted,
};
use crate::project::RootDocument;
use crate::schema::{ScalarKind, SchemaSet};

use super::resolver::{ValueLocation, locate_value};

/// Kind of completion item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Property,
    Item,
    Metadata,
    Target,
    Task,
    Function,
    Class,
    Value,
    File,
    Folder,
}

/// A completion suggestion.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionItem {
    /// The text to insert.
    pub label: Arc<str>,
    pub kind: CompletionKind,
    /// Detail text (shown after label).
    pub detail: Option<Arc<str>>,
    /// Documentation (shown in popup).
    pub documentation: Option<Arc<str>>,
    /// Sort priority (lower = higher priority).
    pub sort_priority: u32,
}

impl CompletionItem {
    pub fn new(label: impl Into<Arc<str>>, kind: CompletionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            documentation: None,
            sort_priority: 100,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Arc<str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the documentation, if there is any.
    pub fn with_documentation(mut self, doc: Option<&str>) -> Self {
        self.documentation = doc.filter(|d| !d.is_empty()).map(Arc::from);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.sort_priority = priority;
        self
    }
}

/// The suggestions for the caret at `offset`, with the total length of the
/// text they replace.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompletionResult {
    pub items: Vec<CompletionItem>,
    /// Length of the partial name before the caret
    pub replace_length: usize,
}

/// Get completion suggestions at `offset` in the top-level document.
///
/// `typed` is the character whose insertion triggered completion, if any.
pub fn completions(root: &RootDocument, offset: TextSize, typed: Option<char>) -> CompletionResult {
    let Some(location) = locate_value(root, offset) else {
        return CompletionResult::default();
    };
    let before = usize::from(offset - location.range.start());
    let Some(prefix) = location.text.get(..before) else {
        return CompletionResult::default();
    };

    let is_condition = location.options.contains(ExpressionOptions::CONDITION);
    let (state, length, node, comparands) = if is_condition {
        let result = get_condition_trigger_state(prefix, typed, location.options);
        (result.state, result.length, result.node, result.comparands)
    } else {
        let result = get_trigger_state(prefix, typed, location.options);
        (result.state, result.length, result.node, Vec::new())
    };
    let state = validate_list_permitted(state, &location.kind);
    tracing::trace!(?state, length, "completion trigger");

    let schemas = root.schemas();
    let mut items = match state {
        TriggerState::None | TriggerState::CommaValue | TriggerState::SemicolonValue => Vec::new(),
        TriggerState::PropertyName => property_items(schemas),
        TriggerState::ItemName => item_items(schemas),
        TriggerState::MetadataName => metadata_items(schemas, metadata_item(node.as_ref(), &location).as_ref()),
        TriggerState::MetadataOrItemName => {
            let mut items = item_items(schemas);
            items.extend(metadata_items(schemas, location.item.as_ref()));
            items
        }
        TriggerState::PropertyFunctionName => property_function_items(schemas, node.as_ref()),
        TriggerState::ItemFunctionName => schemas
            .builtins()
            .item_functions
            .values()
            .map(|f| {
                CompletionItem::new(f.name.as_str(), CompletionKind::Function)
                    .with_documentation(f.description.as_deref())
            })
            .collect(),
        TriggerState::PropertyFunctionClassName => schemas
            .builtins()
            .classes
            .values()
            .map(|c| {
                CompletionItem::new(c.name.as_str(), CompletionKind::Class)
                    .with_documentation(c.description.as_deref())
            })
            .collect(),
        TriggerState::DirectorySeparator => path_items(root, prefix),
        TriggerState::Value if is_condition => comparand_items(root, &comparands),
        TriggerState::Value => value_items(root, &location),
    };
    sort_and_dedupe(&mut items);
    CompletionResult {
        items,
        replace_length: length,
    }
}

fn property_items(schemas: &SchemaSet) -> Vec<CompletionItem> {
    schemas
        .properties()
        .into_iter()
        .map(|p| {
            let priority = if p.reserved { 200 } else { 100 };
            CompletionItem::new(p.name.as_str(), CompletionKind::Property)
                .with_documentation(p.description.as_deref())
                .with_priority(priority)
        })
        .collect()
}

fn item_items(schemas: &SchemaSet) -> Vec<CompletionItem> {
    schemas
        .items()
        .into_iter()
        .map(|i| CompletionItem::new(i.name.as_str(), CompletionKind::Item).with_documentation(i.description.as_deref()))
        .collect()
}

fn metadata_items(schemas: &SchemaSet, item: Option<&Name>) -> Vec<CompletionItem> {
    let items: Vec<&str> = item.map(Name::as_str).into_iter().collect();
    schemas
        .metadata_for(&items)
        .into_iter()
        .map(|m| {
            let priority = if m.reserved { 200 } else { 100 };
            CompletionItem::new(m.name.as_str(), CompletionKind::Metadata)
                .with_documentation(m.description.as_deref())
                .with_priority(priority)
        })
        .collect()
}

/// Item type a metadata name is being typed for: `%(Compile.` or the
/// enclosing item.
fn metadata_item(node: Option<&ExprNode>, location: &ValueLocation) -> Option<Name> {
    let mut qualified = None;
    if let Some(node) = node {
        node.walk(&mut |n: &ExprNode| {
            if let ExprKind::Metadata { item: Some(item), .. } = &n.kind
                && let ExprKind::ItemName(name) = &item.kind
            {
                qualified = Some(name.clone());
            }
        });
    }
    qualified.or_else(|| location.item.clone())
}

fn property_function_items(schemas: &SchemaSet, node: Option<&ExprNode>) -> Vec<CompletionItem> {
    let builtins = schemas.builtins();
    let mut class = None;
    if let Some(node) = node {
        node.walk(&mut |n: &ExprNode| {
            if let ExprKind::ClassReference(name) = &n.kind {
                class = Some(name.clone());
            }
        });
    }
    let functions = match class {
        Some(class) => match builtins
            .class(class.as_str())
            .and_then(|c| builtins.static_functions.get(c.name.as_str()))
        {
            Some(functions) => functions,
            None => return Vec::new(),
        },
        None => &builtins.string_functions,
    };
    functions
        .values()
        .map(|f| CompletionItem::new(f.name.as_str(), CompletionKind::Function).with_documentation(f.description.as_deref()))
        .collect()
}

fn names(values: &NameSet, kind: CompletionKind) -> impl Iterator<Item = CompletionItem> + '_ {
    values.iter().map(move |v| CompletionItem::new(v.as_str(), kind))
}

/// Values for a literal (or literal-prefixed) value of a known kind.
fn value_items(root: &RootDocument, location: &ValueLocation) -> Vec<CompletionItem> {
    let schemas = root.schemas();
    if let Some(custom) = &location.custom_type {
        return custom
            .values
            .iter()
            .map(|v| CompletionItem::new(v.name.as_str(), CompletionKind::Value).with_documentation(v.description.as_deref()))
            .collect();
    }
    match location.kind.scalar {
        ScalarKind::Bool => ["true", "false"]
            .into_iter()
            .map(|v| CompletionItem::new(v, CompletionKind::Value))
            .collect(),
        ScalarKind::Configuration => names(&schemas.configurations(), CompletionKind::Value).collect(),
        ScalarKind::Platform => names(&schemas.platforms(), CompletionKind::Value).collect(),
        ScalarKind::TargetFramework => root
            .target_frameworks
            .iter()
            .map(|f| CompletionItem::new(f.short_name.as_str(), CompletionKind::Value).with_detail(f.moniker()))
            .collect(),
        ScalarKind::TargetName => schemas
            .targets()
            .into_iter()
            .map(|t| CompletionItem::new(t.name.as_str(), CompletionKind::Target).with_documentation(t.description.as_deref()))
            .collect(),
        ScalarKind::ItemName => item_items(schemas),
        ScalarKind::PropertyName => property_items(schemas),
        ScalarKind::TaskName => schemas
            .tasks()
            .into_iter()
            .map(|t| CompletionItem::new(t.name.as_str(), CompletionKind::Task).with_documentation(t.description.as_deref()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Values the properties on the other side of a comparison take.
fn comparand_items(root: &RootDocument, comparands: &[ExprNode]) -> Vec<CompletionItem> {
    let schemas = root.schemas();
    let mut items = Vec::new();
    for comparand in comparands {
        let Some(name) = comparand.property_name() else {
            continue;
        };
        items.extend(names(&schemas.comparand_values(name.as_str()), CompletionKind::Value));
        if name.matches("Configuration") {
            items.extend(names(&schemas.configurations(), CompletionKind::Value));
        } else if name.matches("Platform") {
            items.extend(names(&schemas.platforms(), CompletionKind::Value));
        }
        let custom = schemas
            .get_property(name.as_str())
            .and_then(|p| p.kind.custom_type().cloned());
        if let Some(custom) = custom {
            items.extend(custom.values.iter().map(|v| {
                CompletionItem::new(v.name.as_str(), CompletionKind::Value).with_documentation(v.description.as_deref())
            }));
        }
    }
    items
}

/// Entries of the directory typed so far, relative to the project.
fn path_items(root: &RootDocument, prefix: &str) -> Vec<CompletionItem> {
    let segment = prefix.rsplit(';').next().unwrap_or(prefix).trim_start();
    let Some(cut) = segment.rfind(['/', '\\']) else {
        return Vec::new();
    };
    let directory = &segment[..=cut];
    let node = parse_expression(directory, ExpressionOptions::NONE, TextSize::default());
    let context = root.evaluation_context();
    let Ok(values) = evaluate(&node, &context, root.options.max_evaluation_permutations) else {
        return Vec::new();
    };
    let base = root.path().parent().map(PathBuf::from).unwrap_or_default();
    let mut items = Vec::new();
    for value in values {
        items.extend(directory_entries(&normalize(&base.join(native_path(&value)))));
    }
    items
}

fn directory_entries(directory: &Path) -> Vec<CompletionItem> {
    let Ok(entries) = fs::read_dir(directory) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let kind = if entry.file_type().ok()?.is_dir() {
                CompletionKind::Folder
            } else {
                CompletionKind::File
            };
            Some(CompletionItem::new(name, kind))
        })
        .collect()
}

/// Sort by priority then label, keeping the first of any case-insensitive duplicates.
fn sort_and_dedupe(items: &mut Vec<CompletionItem>) {
    let mut seen = NameSet::new();
    items.retain(|item| seen.insert(&*item.label));
    items.sort_by(|a, b| {
        a.sort_priority
            .cmp(&b.sort_priority)
            .then_with(|| a.label.to_ascii_lowercase().cmp(&b.label.to_ascii_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{ParseContext, StaticRuntimeInformation};

    fn complete_at(marked: &str, typed: Option<char>) -> CompletionResult {
        complete_in(Path::new("/nonexistent/test.csproj"), marked, typed)
    }

    fn complete_in(path: &Path, marked: &str, typed: Option<char>) -> CompletionResult {
        let offset = marked.find('|').unwrap();
        let text = marked.replacen('|', "", 1);
        let cx = ParseContext::new(Arc::new(StaticRuntimeInformation::default()));
        let root = RootDocument::parse(path, text, None, &cx).unwrap();
        completions(&root, TextSize::new(offset as u32), typed)
    }

    fn labels(result: &CompletionResult) -> Vec<&str> {
        result.items.iter().map(|i| &*i.label).collect()
    }

    #[test]
    fn test_property_names_after_dollar_paren() {
        let result = complete_at(
            r#"<Project><PropertyGroup><Foo>x</Foo><A>$(|</A></PropertyGroup></Project>"#,
            Some('('),
        );
        let labels = labels(&result);
        assert!(labels.contains(&"Foo"));
        assert!(labels.contains(&"Configuration"));
        assert!(labels.contains(&"MSBuildProjectDirectory"));
        assert!(result.items.iter().all(|i| i.kind == CompletionKind::Property));
    }

    #[test]
    fn test_partial_property_name_length() {
        let result = complete_at(r#"<Project><PropertyGroup><A>$(Conf|</A></PropertyGroup></Project>"#, None);
        assert_eq!(result.replace_length, 4);
        assert!(labels(&result).contains(&"Configuration"));
    }

    #[test]
    fn test_metadata_scoped_to_enclosing_item() {
        let result = complete_at(
            r#"<Project><ItemGroup><Compile Include="a.cs" Link="%(|" /></ItemGroup></Project>"#,
            Some('('),
        );
        let labels = labels(&result);
        assert!(labels.contains(&"Link"));
        assert!(labels.contains(&"Filename"));
    }

    #[test]
    fn test_custom_type_values() {
        let result = complete_at(r#"<Project><PropertyGroup><OutputType>|</OutputType></PropertyGroup></Project>"#, None);
        assert_eq!(labels(&result), vec!["Exe", "Library", "Module", "WinExe"]);
        assert!(result.items[0].documentation.is_some());
    }

    #[test]
    fn test_condition_comparand_values() {
        let result = complete_at(
            r#"<Project>
  <PropertyGroup Condition="'$(Configuration)' == 'Debug'" />
  <PropertyGroup Condition="'$(Configuration)' == 'Release'" />
  <PropertyGroup Condition="'$(Configuration)' == '|" />
</Project>"#,
            Some('\''),
        );
        let labels = labels(&result);
        assert!(labels.contains(&"Debug"));
        assert!(labels.contains(&"Release"));
    }

    #[test]
    fn test_static_functions_of_class() {
        let result = complete_at(
            r#"<Project><PropertyGroup><A>$([System.IO.Path]::|</A></PropertyGroup></Project>"#,
            Some(':'),
        );
        assert!(labels(&result).contains(&"Combine"));
    }

    #[test]
    fn test_nothing_outside_values() {
        let result = complete_at(r#"<Project> | </Project>"#, None);
        assert!(result.items.is_empty());
    }

    #[test]
    fn test_directory_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/common.props"), "<Project />").unwrap();
        fs::create_dir(dir.path().join("build/nested")).unwrap();
        let result = complete_in(
            &dir.path().join("test.csproj"),
            r#"<Project><Import Project="build/|" /></Project>"#,
            Some('/'),
        );
        let kinds: Vec<_> = result.items.iter().map(|i| (&*i.label, i.kind)).collect();
        assert_eq!(
            kinds,
            vec![("common.props", CompletionKind::File), ("nested", CompletionKind::Folder)]
        );
    }
}

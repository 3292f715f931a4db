//! Property values observed while building the import graph
//!
//! Only properties that can influence an import path are tracked: a
//! watch-list seeded from `Import/@Project` and `UsingTask/@AssemblyFile`
//! references, closed over the properties those values refer to.

use std::path::{MAIN_SEPARATOR, Path};

use text_size::TextSize;

use crate::base::{Name, NameMap, NameSet};
use crate::expression::{EvaluationContext, ExprKind, ExprNode, ExpressionOptions, parse_expression};
use crate::parser::XmlDocument;

use super::runtime::RuntimeInformation;

/// Accumulates every value seen for each watched property.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyValueCollector {
    watched: NameSet,
    values: NameMap<Vec<String>>,
    max_values: Option<usize>,
}

impl PropertyValueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of values kept per property.
    pub fn with_max_values(mut self, max: usize) -> Self {
        self.max_values = Some(max.max(1));
        self
    }

    /// Start collecting `name`. Returns `true` if it was not watched yet.
    pub fn watch(&mut self, name: impl Into<Name>) -> bool {
        self.watched.insert(name)
    }

    pub fn watch_all<I, N>(&mut self, names: I)
    where
        I: IntoIterator<Item = N>,
        N: Into<Name>,
    {
        for name in names {
            self.watched.insert(name);
        }
    }

    pub fn is_watched(&self, name: &str) -> bool {
        self.watched.contains(name)
    }

    /// Record a value for a watched property. Returns `true` if it was new.
    pub fn add(&mut self, name: &str, value: impl Into<String>) -> bool {
        if !self.is_watched(name) {
            return false;
        }
        let value = value.into();
        let max = self.max_values;
        let values = self.values.get_or_insert_with(name, Vec::new);
        if values.contains(&value) || max.is_some_and(|max| values.len() >= max) {
            return false;
        }
        values.push(value);
        true
    }

    /// Values recorded for `name`, oldest first.
    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Re-apply values recorded by an earlier build.
    pub fn merge(&mut self, values: &NameMap<Vec<String>>) {
        for (name, list) in values.iter() {
            self.watch(name.clone());
            for value in list {
                self.add(name.as_str(), value.clone());
            }
        }
    }

    pub fn snapshot(&self) -> &NameMap<Vec<String>> {
        &self.values
    }

    /// Extend the watch-list from one document.
    ///
    /// Seeds from import and task-assembly paths, then follows property
    /// definitions in the document until no new names turn up.
    pub fn watch_document(&mut self, document: &XmlDocument, text: &str) {
        let mut definitions: Vec<(Name, Vec<Name>)> = Vec::new();
        for (id, element) in document.elements() {
            let seeds = if element.is_named("Import") {
                element.attribute("Project")
            } else if element.is_named("UsingTask") {
                element.attribute("AssemblyFile")
            } else {
                None
            };
            if let Some(value) = seeds.and_then(|a| a.value.as_deref()) {
                for name in referenced_properties(value) {
                    self.watch(name);
                }
            }

            let in_property_group = element
                .parent
                .map(|parent| document.element(parent))
                .is_some_and(|parent| parent.is_named("PropertyGroup"));
            if in_property_group && let Some(value) = document.value(text, id) {
                let references = referenced_properties(value);
                if !references.is_empty() {
                    definitions.push((Name::new(&element.name), references));
                }
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for (name, references) in &definitions {
                if self.is_watched(name.as_str()) {
                    for reference in references {
                        changed |= self.watch(reference.clone());
                    }
                }
            }
        }
    }
}

/// Names of properties referenced anywhere in an expression.
pub fn referenced_properties(text: &str) -> Vec<Name> {
    if !text.contains("$(") {
        return Vec::new();
    }
    let node = parse_expression(text, ExpressionOptions::ITEMS | ExpressionOptions::METADATA, TextSize::default());
    let mut names = Vec::new();
    collect_property_names(&node, &mut names);
    names
}

fn collect_property_names(node: &ExprNode, out: &mut Vec<Name>) {
    if let ExprKind::PropertyName(name) = &node.kind
        && !out.contains(name)
    {
        out.push(name.clone());
    }
    for child in node.children() {
        collect_property_names(child, out);
    }
}

/// Evaluation context for one file of the import graph.
///
/// Supplies the reserved `MSBuildThisFile*` and `MSBuildProject*` values and
/// the runtime paths, then falls back to the collected values.
#[derive(Debug, Clone, Copy)]
pub struct FileEvaluationContext<'a> {
    values: &'a PropertyValueCollector,
    file: &'a Path,
    project: &'a Path,
    runtime: &'a dyn RuntimeInformation,
}

impl<'a> FileEvaluationContext<'a> {
    pub fn new(
        values: &'a PropertyValueCollector,
        file: &'a Path,
        project: &'a Path,
        runtime: &'a dyn RuntimeInformation,
    ) -> Self {
        Self {
            values,
            file,
            project,
            runtime,
        }
    }

    fn reserved(&self, name: &str) -> Option<Vec<String>> {
        let lower = name.to_ascii_lowercase();
        let value = if let Some(suffix) = lower.strip_prefix("msbuildthisfile") {
            path_property(self.file, suffix, true)?
        } else if let Some(suffix) = lower.strip_prefix("msbuildproject") {
            path_property(self.project, suffix, false)?
        } else {
            return match lower.as_str() {
                "msbuildbinpath" => Some(dir_values(self.runtime.binpath())),
                "msbuildtoolspath" => Some(dir_values(self.runtime.tools_path())),
                "msbuildsdkspath" => Some(dir_values(self.runtime.sdks_path())),
                "msbuildextensionspath" | "msbuildextensionspath32" | "msbuildextensionspath64" => Some(
                    self.runtime
                        .extensions_paths()
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect(),
                ),
                "msbuildtoolsversion" => Some(vec![self.runtime.tools_version().to_string()]),
                _ => None,
            };
        };
        Some(vec![value])
    }
}

impl EvaluationContext for FileEvaluationContext<'_> {
    fn property_values(&self, name: &str) -> Vec<String> {
        match self.reserved(name) {
            Some(values) => values,
            None => self.values.values(name).to_vec(),
        }
    }
}

/// `MSBuildThisFile*` / `MSBuildProject*` by suffix. Only the
/// `MSBuildThisFile` directories end in a separator.
fn path_property(path: &Path, suffix: &str, trailing: bool) -> Option<String> {
    let text = |s: Option<&std::ffi::OsStr>| s.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    Some(match suffix {
        "" | "file" => text(path.file_name()),
        "fullpath" => path.display().to_string(),
        "directory" => {
            let dir = path.parent().map(|p| p.display().to_string()).unwrap_or_default();
            if trailing { with_trailing_separator(dir) } else { dir }
        }
        "directorynoroot" => {
            let dir = path.parent().map(|p| p.display().to_string()).unwrap_or_default();
            let trimmed = dir.trim_start_matches(['/', '\\']).to_string();
            if trailing { with_trailing_separator(trimmed) } else { trimmed }
        }
        "name" => text(path.file_stem()),
        "extension" => path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default(),
        _ => return None,
    })
}

fn with_trailing_separator(mut dir: String) -> String {
    if !dir.ends_with(['/', '\\']) {
        dir.push(MAIN_SEPARATOR);
    }
    dir
}

fn dir_values(dir: Option<&Path>) -> Vec<String> {
    dir.map(|d| vec![d.display().to_string()]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_xml;
    use crate::project::StaticRuntimeInformation;

    #[test]
    fn test_only_watched_values_are_kept() {
        let mut values = PropertyValueCollector::new();
        values.watch("Root");
        assert!(values.add("root", "/a"));
        assert!(!values.add("Root", "/a"));
        assert!(!values.add("Other", "x"));
        assert_eq!(values.values("ROOT"), &["/a".to_string()]);
        assert!(values.values("Other").is_empty());
    }

    #[test]
    fn test_max_values() {
        let mut values = PropertyValueCollector::new().with_max_values(2);
        values.watch("P");
        values.add("P", "1");
        values.add("P", "2");
        assert!(!values.add("P", "3"));
        assert_eq!(values.values("P").len(), 2);
    }

    #[test]
    fn test_watch_document_closes_over_definitions() {
        let text = r#"<Project>
  <PropertyGroup>
    <ImportRoot>$(BaseDir)imports\</ImportRoot>
    <BaseDir>$(MSBuildThisFileDirectory)</BaseDir>
    <Unrelated>$(Other)</Unrelated>
  </PropertyGroup>
  <Import Project="$(ImportRoot)a.props" />
  <UsingTask TaskName="T" AssemblyFile="$(TaskDir)t.dll" />
</Project>"#;
        let document = parse_xml(text);
        let mut values = PropertyValueCollector::new();
        values.watch_document(&document, text);
        assert!(values.is_watched("ImportRoot"));
        assert!(values.is_watched("BaseDir"));
        assert!(values.is_watched("MSBuildThisFileDirectory"));
        assert!(values.is_watched("TaskDir"));
        assert!(!values.is_watched("Unrelated"));
        assert!(!values.is_watched("Other"));
    }

    #[test]
    fn test_reserved_file_properties() {
        let values = PropertyValueCollector::new();
        let runtime = StaticRuntimeInformation::from_binpath("/msbuild/bin");
        let cx = FileEvaluationContext::new(
            &values,
            Path::new("/repo/build/Common.targets"),
            Path::new("/repo/src/App.csproj"),
            &runtime,
        );
        assert_eq!(cx.property_values("MSBuildThisFile"), vec!["Common.targets"]);
        assert_eq!(cx.property_values("MSBuildThisFileName"), vec!["Common"]);
        assert_eq!(cx.property_values("MSBuildThisFileExtension"), vec![".targets"]);
        assert_eq!(
            cx.property_values("MSBuildThisFileDirectory"),
            vec![format!("/repo/build{MAIN_SEPARATOR}")]
        );
        assert_eq!(cx.property_values("msbuildprojectname"), vec!["App"]);
        assert_eq!(cx.property_values("MSBuildProjectDirectory"), vec!["/repo/src"]);
        assert_eq!(cx.property_values("MSBuildBinPath"), vec!["/msbuild/bin"]);
        assert_eq!(cx.property_values("MSBuildExtensionsPath"), vec!["/msbuild"]);
        assert!(cx.property_values("Unknown").is_empty());
    }
}

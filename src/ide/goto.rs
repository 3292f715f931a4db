//! Go-to-definition implementation.

use std::path::PathBuf;
use std::sync::Arc;

use text_size::{TextRange, TextSize};

use crate::project::RootDocument;
use crate::schema::{MsBuildSchema, SymbolLocation};

use super::resolver::{ReferenceKind, resolve_at};

/// Result of a go-to-definition request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GotoResult {
    /// The range of the reference the request was made on
    pub origin: Option<TextRange>,
    pub targets: Vec<GotoTarget>,
}

impl GotoResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// A target location for go-to-definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GotoTarget {
    pub path: PathBuf,
    /// `None` to open the file without selecting anything
    pub range: Option<TextRange>,
    pub name: Arc<str>,
}

impl GotoTarget {
    fn file(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            range: None,
            name: name.into(),
        }
    }
}

impl From<(&str, SymbolLocation)> for GotoTarget {
    fn from((name, location): (&str, SymbolLocation)) -> Self {
        Self {
            path: location.path,
            range: Some(location.range),
            name: name.into(),
        }
    }
}

/// Find the definitions of whatever is at `offset` in the top-level document.
pub fn goto_definition(root: &RootDocument, offset: TextSize) -> GotoResult {
    let Some(reference) = resolve_at(root, offset) else {
        return GotoResult::empty();
    };
    let targets = match &reference.kind {
        ReferenceKind::Import(imports) => imports
            .iter()
            .filter_map(|import| import.resolved_path.clone())
            .map(GotoTarget::file)
            .collect(),
        ReferenceKind::Sdk(sdk) => sdk.paths.iter().cloned().map(GotoTarget::file).collect(),
        ReferenceKind::FileOrFolder(paths) => paths.iter().cloned().map(GotoTarget::file).collect(),
        ReferenceKind::Property(name) => declarations(root, name.as_str(), |s, n| {
            s.properties().get(n).and_then(|p| p.declared_at.clone())
        }),
        ReferenceKind::Item(name) => {
            declarations(root, name.as_str(), |s, n| s.items().get(n).and_then(|i| i.declared_at.clone()))
        }
        ReferenceKind::Target(name) => declarations(root, name.as_str(), |s, n| {
            s.targets().get(n).and_then(|t| t.declared_at.clone())
        }),
        ReferenceKind::Task(name) => {
            declarations(root, name.as_str(), |s, n| s.tasks().get(n).and_then(|t| t.declared_at.clone()))
        }
        _ => Vec::new(),
    };
    tracing::debug!(targets = targets.len(), "goto definition");
    GotoResult {
        origin: Some(reference.range),
        targets,
    }
}

/// Every recorded declaration of `name`, in schema order, without duplicates.
fn declarations(
    root: &RootDocument,
    name: &str,
    find: impl Fn(&dyn MsBuildSchema, &str) -> Option<SymbolLocation>,
) -> Vec<GotoTarget> {
    let mut targets: Vec<GotoTarget> = Vec::new();
    for entry in root.schemas().entries() {
        let Some(location) = find(entry.schema(), name) else {
            continue;
        };
        let target = GotoTarget::from((name, location));
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{ParseContext, StaticRuntimeInformation};
    use std::fs;
    use std::path::Path;

    fn parse(path: &Path, text: &str) -> RootDocument {
        let cx = ParseContext::new(Arc::new(StaticRuntimeInformation::default()));
        RootDocument::parse(path, text, None, &cx).unwrap()
    }

    fn offset_of(text: &str, needle: &str) -> TextSize {
        TextSize::new(text.find(needle).unwrap() as u32 + 1)
    }

    #[test]
    fn test_goto_imported_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("common.props"), "<Project />").unwrap();
        let text = r#"<Project><Import Project="common.props" /></Project>"#;
        let root = parse(&dir.path().join("a.csproj"), text);
        let result = goto_definition(&root, offset_of(text, "common.props"));
        assert_eq!(result.targets.len(), 1);
        assert!(result.targets[0].path.ends_with("common.props"));
        assert_eq!(result.targets[0].range, None);
    }

    #[test]
    fn test_goto_target_declared_in_import() {
        let dir = tempfile::tempdir().unwrap();
        let imported = r#"<Project><Target Name="Pack" /></Project>"#;
        fs::write(dir.path().join("pack.targets"), imported).unwrap();
        let text = r#"<Project><Import Project="pack.targets" /><Target Name="A" DependsOnTargets="Pack" /></Project>"#;
        let root = parse(&dir.path().join("a.csproj"), text);
        let result = goto_definition(&root, offset_of(text, "Pack\""));
        assert_eq!(result.targets.len(), 1);
        let target = &result.targets[0];
        assert!(target.path.ends_with("pack.targets"));
        let range = target.range.unwrap();
        assert_eq!(&imported[range], "Pack");
    }

    #[test]
    fn test_goto_property_in_same_file() {
        let text = r#"<Project><PropertyGroup><Foo>1</Foo><Bar>$(Foo)</Bar></PropertyGroup></Project>"#;
        let root = parse(Path::new("/nonexistent/a.csproj"), text);
        let result = goto_definition(&root, offset_of(text, "Foo)"));
        assert_eq!(result.targets.len(), 1);
        assert_eq!(&text[result.targets[0].range.unwrap()], "Foo");
    }

    #[test]
    fn test_goto_nothing() {
        let text = r#"<Project><PropertyGroup /></Project>"#;
        let root = parse(Path::new("/nonexistent/a.csproj"), text);
        assert!(goto_definition(&root, offset_of(text, "PropertyGroup")).is_empty());
    }
}

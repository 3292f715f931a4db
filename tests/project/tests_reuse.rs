//! Reparsing with a previous snapshot.

use std::sync::Arc;

use msbuild::project::{Import, RootDocument};

use crate::helpers::project_helpers::ProjectFixture;

fn import_named(root: &RootDocument, file: &str) -> Arc<Import> {
    root.resolved_imports
        .iter()
        .find(|(path, _)| path.ends_with(file))
        .map(|(_, import)| Arc::clone(import))
        .unwrap_or_else(|| panic!("{file} should be imported"))
}

const PROJECT: &str = r#"<Project>
  <Import Project="common.props" />
  <PropertyGroup>
    <Local>$(Shared)</Local>
  </PropertyGroup>
</Project>"#;

#[test]
fn test_parse_is_idempotent() {
    let fixture = ProjectFixture::new();
    fixture.write("common.props", "<Project><PropertyGroup><Shared>1</Shared></PropertyGroup></Project>");
    let first = fixture.parse("App.proj", PROJECT);
    let second = fixture.parse("App.proj", PROJECT);

    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.target_frameworks, second.target_frameworks);
    let names = |root: &RootDocument| {
        let mut names: Vec<String> = root.schemas().properties().iter().map(|p| p.name.to_string()).collect();
        names.sort();
        names
    };
    assert_eq!(names(&first), names(&second));
    let paths = |root: &RootDocument| {
        let mut paths: Vec<_> = root.resolved_imports.keys().cloned().collect();
        paths.sort();
        paths
    };
    assert_eq!(paths(&first), paths(&second));
}

#[test]
fn test_unchanged_import_is_shared() {
    let fixture = ProjectFixture::new();
    fixture.write("common.props", "<Project><PropertyGroup><Shared>1</Shared></PropertyGroup></Project>");
    let first = fixture.parse("App.proj", PROJECT);
    let edited = PROJECT.replace("<Local>", "<Other>x</Other><Local>");
    let second = fixture.reparse("App.proj", &edited, &first);

    let before = import_named(&first, "common.props");
    let after = import_named(&second, "common.props");
    assert!(Arc::ptr_eq(&before, &after));
    assert!(Arc::ptr_eq(
        before.document.as_ref().unwrap(),
        after.document.as_ref().unwrap()
    ));
    assert!(second.schemas().get_property("Other").is_some());
}

#[test]
fn test_touched_import_is_reparsed() {
    let fixture = ProjectFixture::new();
    fixture.write("common.props", "<Project><PropertyGroup><Shared>1</Shared></PropertyGroup></Project>");
    let first = fixture.parse("App.proj", PROJECT);

    fixture.write(
        "common.props",
        "<Project><PropertyGroup><Shared>1</Shared><Added>2</Added></PropertyGroup></Project>",
    );
    fixture.touch("common.props");
    let second = fixture.reparse("App.proj", PROJECT, &first);

    let before = import_named(&first, "common.props");
    let after = import_named(&second, "common.props");
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(first.schemas().get_property("Added").is_none());
    assert!(second.schemas().get_property("Added").is_some());
}

#[test]
fn test_change_deep_in_the_graph_invalidates_ancestors() {
    let fixture = ProjectFixture::new();
    fixture.write("outer.props", r#"<Project><Import Project="inner.props" /></Project>"#);
    fixture.write("inner.props", "<Project><PropertyGroup><Inner>1</Inner></PropertyGroup></Project>");
    let text = r#"<Project><Import Project="outer.props" /></Project>"#;
    let first = fixture.parse("App.proj", text);

    fixture.write(
        "inner.props",
        "<Project><PropertyGroup><InnerChanged>1</InnerChanged></PropertyGroup></Project>",
    );
    fixture.touch("inner.props");
    let second = fixture.reparse("App.proj", text, &first);

    assert!(!Arc::ptr_eq(
        &import_named(&first, "outer.props"),
        &import_named(&second, "outer.props")
    ));
    assert!(second.schemas().get_property("InnerChanged").is_some());
    assert!(second.schemas().get_property("Inner").is_none());
}

#[test]
fn test_deleted_import_becomes_unresolved() {
    let fixture = ProjectFixture::new();
    fixture.write("common.props", "<Project />");
    let first = fixture.parse("App.proj", PROJECT);
    std::fs::remove_file(fixture.path("common.props")).unwrap();
    let second = fixture.reparse("App.proj", PROJECT, &first);

    assert!(second.resolved_imports.is_empty());
    let imports = &second.document.imports;
    assert_eq!(imports.len(), 1);
    assert!(!imports[0].is_resolved());
}

//! Go to definition across the import graph.

use msbuild::ide::goto_definition;

use crate::helpers::project_helpers::{ProjectFixture, split_marker};

#[test]
fn test_goto_property_declared_in_import() {
    let fixture = ProjectFixture::new();
    let imported = "<Project><PropertyGroup><Shared>1</Shared></PropertyGroup></Project>";
    fixture.write("lib.props", imported);
    let (text, offset) = split_marker(
        r#"<Project><Import Project="lib.props" /><PropertyGroup><A>$(Sha|red)</A></PropertyGroup></Project>"#,
    );
    let root = fixture.parse("App.proj", &text);

    let result = goto_definition(&root, offset);
    assert_eq!(result.targets.len(), 1);
    let target = &result.targets[0];
    assert!(target.path.ends_with("lib.props"));
    assert_eq!(&imported[target.range.unwrap()], "Shared");
    assert_eq!(&text[result.origin.unwrap()], "Shared");
}

#[test]
fn test_goto_property_assigned_in_several_files() {
    let fixture = ProjectFixture::new();
    fixture.write("lib.props", "<Project><PropertyGroup><Shared>1</Shared></PropertyGroup></Project>");
    let (text, offset) = split_marker(
        r#"<Project><Import Project="lib.props" /><PropertyGroup><Shared>2</Shared><A>$(Sha|red)</A></PropertyGroup></Project>"#,
    );
    let root = fixture.parse("App.proj", &text);
    let result = goto_definition(&root, offset);
    assert_eq!(result.targets.len(), 2);
    assert!(result.targets[0].path.ends_with("App.proj"));
    assert!(result.targets[1].path.ends_with("lib.props"));
}

#[test]
fn test_goto_wildcard_import_lists_every_file() {
    let fixture = ProjectFixture::new();
    fixture.write("extensions/one.props", "<Project />");
    fixture.write("extensions/two.props", "<Project />");
    let (text, offset) =
        split_marker(r#"<Project><Import Project="$(MSBuildThisFileDirectory)extensions/*.pr|ops" /></Project>"#);
    let root = fixture.parse("App.proj", &text);
    let result = goto_definition(&root, offset);
    let names: Vec<_> = result.targets.iter().map(|t| t.name.as_ref()).collect();
    assert_eq!(names, vec!["one.props", "two.props"]);
}

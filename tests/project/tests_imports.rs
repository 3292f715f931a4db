//! Import resolution across files, SDKs and wildcards.

use std::fs;

use msbuild::diagnostics::codes;
use msbuild::project::StaticRuntimeInformation;

use crate::helpers::diagnostic_helpers::{spans, with_code};
use crate::helpers::project_helpers::ProjectFixture;

#[test]
fn test_property_from_earlier_import_drives_later_import() {
    let fixture = ProjectFixture::new();
    fixture.write(
        "build/paths.props",
        "<Project><PropertyGroup><SharedDir>$(MSBuildThisFileDirectory)shared</SharedDir></PropertyGroup></Project>",
    );
    fixture.write(
        "build/shared/tools.props",
        "<Project><PropertyGroup><ToolsImported>true</ToolsImported></PropertyGroup></Project>",
    );
    let root = fixture.parse(
        "App.proj",
        r#"<Project>
  <Import Project="build/paths.props" />
  <Import Project="$(SharedDir)/tools.props" />
</Project>"#,
    );

    assert!(with_code(&root, codes::IMPORT_UNRESOLVED).is_empty(), "{:?}", root.diagnostics);
    assert!(root.schemas().get_property("ToolsImported").is_some());
    assert_eq!(root.documents().len(), 3);
}

#[test]
fn test_wildcard_import_loads_every_match_in_order() {
    let fixture = ProjectFixture::new();
    fixture.write("extensions/b.props", "<Project><PropertyGroup><FromB>1</FromB></PropertyGroup></Project>");
    fixture.write("extensions/A.props", "<Project><PropertyGroup><FromA>1</FromA></PropertyGroup></Project>");
    fixture.write("extensions/skip.targets", "<Project />");
    let root = fixture.parse(
        "App.proj",
        r#"<Project><Import Project="$(MSBuildThisFileDirectory)extensions/*.props" /></Project>"#,
    );

    let names: Vec<_> = root
        .document
        .imports
        .iter()
        .filter_map(|import| import.resolved_path.as_ref()?.file_name()?.to_str().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["A.props", "b.props"]);
    assert!(root.schemas().get_property("FromA").is_some());
    assert!(root.schemas().get_property("FromB").is_some());
}

#[test]
fn test_wildcard_in_existing_directory_without_matches_is_not_reported() {
    let fixture = ProjectFixture::new();
    fs::create_dir_all(fixture.path("extensions")).unwrap();
    let root = fixture.parse(
        "App.proj",
        r#"<Project><Import Project="$(MSBuildThisFileDirectory)extensions/*.props" /></Project>"#,
    );
    assert!(with_code(&root, codes::IMPORT_UNRESOLVED).is_empty());
}

#[test]
fn test_missing_import_reported_on_its_value() {
    let fixture = ProjectFixture::new();
    let root = fixture.parse("App.proj", r#"<Project><Import Project="missing.props" /></Project>"#);
    assert_eq!(spans(&root, codes::IMPORT_UNRESOLVED), vec!["missing.props"]);
}

#[test]
fn test_project_sdk_from_sdks_directory() {
    let runtime_dir = tempfile::tempdir().unwrap();
    let bin = runtime_dir.path().join("bin");
    let sdk = bin.join("Sdks").join("Contoso.Sdk").join("Sdk");
    fs::create_dir_all(&sdk).unwrap();
    fs::write(
        sdk.join("Sdk.props"),
        "<Project><PropertyGroup><ContosoProps>1</ContosoProps></PropertyGroup></Project>",
    )
    .unwrap();
    fs::write(
        sdk.join("Sdk.targets"),
        r#"<Project><Target Name="ContosoBuild" /></Project>"#,
    )
    .unwrap();

    let fixture = ProjectFixture::with_runtime(StaticRuntimeInformation::from_binpath(&bin));
    let root = fixture.parse(
        "App.proj",
        r#"<Project Sdk="Contoso.Sdk"><Target Name="A" DependsOnTargets="ContosoBuild" /></Project>"#,
    );

    assert!(with_code(&root, codes::SDK_UNRESOLVED).is_empty());
    assert!(with_code(&root, codes::UNKNOWN_TARGET).is_empty());
    assert!(root.schemas().get_property("ContosoProps").is_some());
    let implicit: Vec<_> = root.document.imports.iter().filter(|i| i.is_implicit).collect();
    assert_eq!(implicit.len(), 2);
    assert!(implicit.iter().all(|i| i.sdk.as_deref() == Some("Contoso.Sdk")));
    let project = root.xml.root().unwrap();
    let sdks: Vec<_> = root.sdks_at(project).map(|s| s.name().to_string()).collect();
    assert_eq!(sdks, vec!["Contoso.Sdk"]);
}

#[test]
fn test_sdk_element_and_registry() {
    let runtime_dir = tempfile::tempdir().unwrap();
    let sdk = runtime_dir.path().join("registered");
    fs::create_dir_all(&sdk).unwrap();
    fs::write(sdk.join("Sdk.props"), "<Project />").unwrap();
    fs::write(sdk.join("Sdk.targets"), "<Project />").unwrap();

    let runtime = StaticRuntimeInformation::default().with_sdk("Registered.Sdk", &sdk);
    let fixture = ProjectFixture::with_runtime(runtime);
    let root = fixture.parse(
        "App.proj",
        r#"<Project><Sdk Name="registered.sdk" Version="1.0" /></Project>"#,
    );
    assert!(with_code(&root, codes::SDK_UNRESOLVED).is_empty(), "{:?}", root.diagnostics);
    assert_eq!(root.document.imports.iter().filter(|i| i.is_resolved()).count(), 2);
}

#[test]
fn test_nested_documents_are_depth_first() {
    let fixture = ProjectFixture::new();
    fixture.write("a.props", r#"<Project><Import Project="a2.props" /></Project>"#);
    fixture.write("a2.props", "<Project />");
    fixture.write("b.props", "<Project />");
    let root = fixture.parse(
        "App.proj",
        r#"<Project><Import Project="a.props" /><Import Project="b.props" /></Project>"#,
    );
    let order: Vec<_> = root
        .documents()
        .iter()
        .map(|d| d.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(order, vec!["App.proj", "a.props", "a2.props", "b.props"]);
}

//! Schema precedence, case-insensitivity and privacy through a real graph.

use msbuild::AnalysisOptions;
use msbuild::diagnostics::codes;
use msbuild::schema::ScalarKind;

use crate::helpers::diagnostic_helpers::with_code;
use crate::helpers::project_helpers::ProjectFixture;

#[test]
fn test_declared_schema_wins_over_inferred_and_builtin() {
    let fixture = ProjectFixture::new();
    fixture.write(
        "App.proj.buildschema.json",
        r#"{ "properties": { "Configuration": "Declared description" } }"#,
    );
    let root = fixture.parse(
        "App.proj",
        "<Project><PropertyGroup><Configuration>Debug</Configuration></PropertyGroup></Project>",
    );
    let info = root.schemas().get_property("Configuration").unwrap();
    assert_eq!(info.description.as_deref(), Some("Declared description"));
}

#[test]
fn test_inferred_symbol_takes_builtin_description() {
    let fixture = ProjectFixture::new();
    let root = fixture.parse(
        "App.proj",
        "<Project><PropertyGroup><OutputType>Exe</OutputType></PropertyGroup></Project>",
    );
    let info = root.schemas().get_property("OutputType").unwrap();
    assert!(info.declared_at.is_some());
    assert_eq!(info.description.as_deref(), Some("Kind of output the project produces"));
    let outputs = info.kind.custom_type().expect("OutputType keeps its known values");
    assert!(outputs.value("exe").is_some());
    assert!(outputs.value("Library").is_some());
}

#[test]
fn test_read_of_builtin_property_keeps_its_kind() {
    let fixture = ProjectFixture::new();
    let root = fixture.parse(
        "App.proj",
        r#"<Project><PropertyGroup><Flags>$(Optimize)</Flags></PropertyGroup></Project>"#,
    );
    let info = root.schemas().get_property("Optimize").unwrap();
    assert_eq!(info.kind.kind().scalar, ScalarKind::Bool);
}

#[test]
fn test_builtin_kinds_still_validate_assigned_values() {
    let fixture = ProjectFixture::new();
    let root = fixture.parse(
        "App.proj",
        r#"<Project><PropertyGroup>
  <Optimize>maybe</Optimize>
  <OutputType>Banana</OutputType>
</PropertyGroup></Project>"#,
    );
    let optimize = root.schemas().get_property("Optimize").unwrap();
    assert_eq!(optimize.kind.kind().scalar, ScalarKind::Bool);
    assert_eq!(optimize.description.as_deref(), Some("Whether the compiler optimizes the output"));
    assert_eq!(with_code(&root, codes::INVALID_VALUE).len(), 1);
    assert_eq!(with_code(&root, codes::UNKNOWN_VALUE).len(), 1);
}

#[test]
fn test_names_are_case_insensitive() {
    let fixture = ProjectFixture::new();
    let root = fixture.parse(
        "App.proj",
        r#"<Project>
  <PropertyGroup><MyValue>1</MyValue></PropertyGroup>
  <ItemGroup><Widget Include="a" /></ItemGroup>
  <Target Name="Publish" />
  <Target Name="Go" DependsOnTargets="PUBLISH" />
</Project>"#,
    );
    assert!(root.schemas().get_property("myvalue").is_some());
    assert!(root.schemas().get_property("MYVALUE").is_some());
    assert!(root.schemas().get_item("WIDGET").is_some());
    assert!(root.schemas().get_target("publish").is_some());
    assert!(with_code(&root, codes::UNKNOWN_TARGET).is_empty());
}

const PRIVATE_PROPS: &str = "<Project><PropertyGroup><_Internal>1</_Internal><Visible>1</Visible></PropertyGroup></Project>";

#[test]
fn test_private_symbols_of_imports_are_hidden_from_listings() {
    let fixture = ProjectFixture::new();
    fixture.write("lib.props", PRIVATE_PROPS);
    let root = fixture.parse("App.proj", r#"<Project><Import Project="lib.props" /></Project>"#);
    let names: Vec<String> = root.schemas().properties().iter().map(|p| p.name.to_string()).collect();
    assert!(names.iter().any(|n| n == "Visible"));
    assert!(!names.iter().any(|n| n == "_Internal"));
    assert!(root.schemas().get_property("_Internal").is_some());
}

#[test]
fn test_private_symbols_shown_when_configured() {
    let options = AnalysisOptions {
        show_private_symbols: true,
        ..AnalysisOptions::default()
    };
    let fixture = ProjectFixture::new().with_options(options);
    fixture.write("lib.props", PRIVATE_PROPS);
    let root = fixture.parse("App.proj", r#"<Project><Import Project="lib.props" /></Project>"#);
    assert!(root.schemas().properties().iter().any(|p| p.name.as_str() == "_Internal"));
}

#[test]
fn test_top_level_private_symbols_are_listed() {
    let fixture = ProjectFixture::new();
    let root = fixture.parse(
        "App.proj",
        "<Project><PropertyGroup><_Mine>1</_Mine></PropertyGroup></Project>",
    );
    assert!(root.schemas().properties().iter().any(|p| p.name.as_str() == "_Mine"));
}

//! Completion while typing, including half-typed documents.

use msbuild::ide::{CompletionKind, CompletionResult, completions};

use crate::helpers::project_helpers::{ProjectFixture, parse_detached, split_marker};

fn complete(marked: &str, typed: Option<char>) -> CompletionResult {
    let (text, offset) = split_marker(marked);
    let root = parse_detached(&text);
    completions(&root, offset, typed)
}

fn labels(result: &CompletionResult) -> Vec<&str> {
    result.items.iter().map(|i| i.label.as_ref()).collect()
}

#[test]
fn test_property_names_in_unclosed_element() {
    // The element is never closed: exactly what an editor sees mid-typing.
    let result = complete("<Project><PropertyGroup><Mine>1</Mine><Out>$(|", Some('('));
    let labels = labels(&result);
    assert!(labels.contains(&"Mine"), "{labels:?}");
    assert!(labels.contains(&"OutputPath"), "{labels:?}");
}

#[test]
fn test_item_names() {
    let result = complete(
        r#"<Project><ItemGroup><Widget Include="a" /></ItemGroup><Target Name="T"><Message Text="@(|" /></Target></Project>"#,
        Some('('),
    );
    let labels = labels(&result);
    assert!(labels.contains(&"Widget"));
    assert!(labels.contains(&"Compile"));
    assert!(result.items.iter().all(|i| i.kind == CompletionKind::Item));
}

#[test]
fn test_qualified_metadata_names() {
    let result = complete(
        r#"<Project><Target Name="T"><Message Text="%(Compile.|" /></Target></Project>"#,
        Some('.'),
    );
    let labels = labels(&result);
    assert!(labels.contains(&"Link"));
    assert!(labels.contains(&"FullPath"));
}

#[test]
fn test_target_names_in_depends_on() {
    let result = complete(
        r#"<Project><Target Name="Prepare" /><Target Name="Go" DependsOnTargets="|" /></Project>"#,
        None,
    );
    let labels = labels(&result);
    assert!(labels.contains(&"Prepare"));
    assert!(labels.contains(&"Build"));
}

#[test]
fn test_configurations_from_conditions() {
    let result = complete(
        r#"<Project>
  <PropertyGroup Condition="'$(Configuration)' == 'Staging'" />
  <PropertyGroup><Configuration>|</Configuration></PropertyGroup>
</Project>"#,
        None,
    );
    assert!(labels(&result).contains(&"Staging"));
}

#[test]
fn test_results_are_sorted_and_unique() {
    let result = complete(
        r#"<Project><PropertyGroup><Zed>1</Zed><zed>2</zed><Alpha>1</Alpha><A>$(|</A></PropertyGroup></Project>"#,
        Some('('),
    );
    let labels = labels(&result);
    assert_eq!(labels.iter().filter(|l| l.eq_ignore_ascii_case("zed")).count(), 1);
    let user: Vec<_> = result
        .items
        .iter()
        .filter(|i| i.sort_priority == result.items[0].sort_priority)
        .map(|i| i.label.to_ascii_lowercase())
        .collect();
    let mut sorted = user.clone();
    sorted.sort();
    assert_eq!(user, sorted);
}

#[test]
fn test_property_from_import_is_offered() {
    let fixture = ProjectFixture::new();
    fixture.write("lib.props", "<Project><PropertyGroup><FromLib>1</FromLib></PropertyGroup></Project>");
    let (text, offset) = split_marker(
        r#"<Project><Import Project="lib.props" /><PropertyGroup><A>$(|</A></PropertyGroup></Project>"#,
    );
    let root = fixture.parse("App.proj", &text);
    let result = completions(&root, offset, Some('('));
    assert!(labels(&result).contains(&"FromLib"));
}

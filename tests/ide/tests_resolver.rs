//! Reference resolution at offsets.

use msbuild::Name;
use msbuild::ide::{ReferenceKind, resolve_at};
use msbuild::schema::ReferenceUsage;
use rstest::rstest;

use crate::helpers::project_helpers::{parse_detached, split_marker};

/// Resolve at the marker and return the reference with the text it covers.
fn resolve(marked: &str) -> Option<(ReferenceKind, ReferenceUsage, String)> {
    let (text, offset) = split_marker(marked);
    let root = parse_detached(&text);
    let reference = resolve_at(&root, offset)?;
    Some((reference.kind, reference.usage, text[reference.range].to_string()))
}

#[rstest]
#[case(r#"<Project><Target Name="Bui|ld" /></Project>"#)]
#[case(r#"<Project><Target Name="|Build" /></Project>"#)]
#[case(r#"<Project><Target Name="Build|" /></Project>"#)]
#[case(r#"<Project><Target Name="  Bu|ild  " /></Project>"#)]
fn test_target_declaration_span_is_exact(#[case] marked: &str) {
    let (kind, usage, span) = resolve(marked).unwrap();
    assert_eq!(kind, ReferenceKind::Target(Name::new("Build")));
    assert_eq!(usage, ReferenceUsage::DECLARATION);
    assert_eq!(span, "Build");
}

#[rstest]
#[case(r#"<Project><PropertyGroup><A>$(Fo|o)</A></PropertyGroup></Project>"#, "Foo")]
#[case(r#"<Project><PropertyGroup><A>x;$(Bar|Baz)/y</A></PropertyGroup></Project>"#, "BarBaz")]
#[case(r#"<Project><PropertyGroup Condition="'$(Conf|iguration)' == ''" /></Project>"#, "Configuration")]
fn test_property_reads(#[case] marked: &str, #[case] name: &str) {
    let (kind, usage, span) = resolve(marked).unwrap();
    assert_eq!(kind, ReferenceKind::Property(Name::new(name)));
    assert_eq!(usage, ReferenceUsage::READ);
    assert_eq!(span, name);
}

#[test]
fn test_end_tag_name_resolves_to_property() {
    let (kind, usage, span) = resolve(r#"<Project><PropertyGroup><Foo>1</Fo|o></PropertyGroup></Project>"#).unwrap();
    assert_eq!(kind, ReferenceKind::Property(Name::new("Foo")));
    assert_eq!(usage, ReferenceUsage::WRITE);
    assert_eq!(span, "Foo");
}

#[test]
fn test_item_reference_in_include() {
    let (kind, _, span) =
        resolve(r#"<Project><ItemGroup><B Include="@(Comp|ile)" /></ItemGroup></Project>"#).unwrap();
    assert_eq!(kind, ReferenceKind::Item(Name::new("Compile")));
    assert_eq!(span, "Compile");
}

#[test]
fn test_qualified_metadata() {
    let (kind, _, span) = resolve(
        r#"<Project><Target Name="T"><Message Text="%(Compile.Li|nk)" /></Target></Project>"#,
    )
    .unwrap();
    assert_eq!(
        kind,
        ReferenceKind::Metadata {
            item: Some(Name::new("Compile")),
            name: Name::new("Link"),
        }
    );
    assert_eq!(span, "Link");
}

#[test]
fn test_output_property_name_is_a_write() {
    let (kind, usage, _) = resolve(
        r#"<Project><Target Name="T"><Exec Command="x"><Output TaskParameter="ExitCode" PropertyName="Co|de" /></Exec></Target></Project>"#,
    )
    .unwrap();
    assert_eq!(kind, ReferenceKind::Property(Name::new("Code")));
    assert_eq!(usage, ReferenceUsage::WRITE);
}

#[test]
fn test_item_function_name() {
    let (kind, _, span) = resolve(
        r#"<Project><Target Name="T"><Message Text="@(Compile->Dis|tinct())" /></Target></Project>"#,
    )
    .unwrap();
    assert_eq!(kind, ReferenceKind::ItemFunction(Name::new("Distinct")));
    assert_eq!(span, "Distinct");
}

#[test]
fn test_whitespace_between_elements_resolves_nothing() {
    assert!(resolve("<Project>\n  |\n  <PropertyGroup />\n</Project>").is_none());
}

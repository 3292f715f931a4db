//! Malformed and half-typed input never panics.

use msbuild::TextSize;
use msbuild::diagnostics::codes;
use msbuild::ide::{completions, goto_definition, hover, resolve_at};
use rstest::rstest;

use crate::helpers::diagnostic_helpers::with_code;
use crate::helpers::project_helpers::parse_detached;

#[rstest]
#[case("")]
#[case("<")]
#[case("<Project")]
#[case("<Project><")]
#[case("<Project><PropertyGroup><A>$(</A>")]
#[case("<Project><Target Name=\"")]
#[case("<Project><ItemGroup><I Include=\"@(x->'%(\" /></ItemGroup></Project>")]
#[case("<Project Condition=\"'$(a)' == \"><Choose><When></Project>")]
#[case("<NotProject><Foo /></NotProject>")]
#[case("<Project>\u{e9}\u{1F600}<A b='\u{e9}'/></Project>")]
#[case("<Project><PropertyGroup><A>$([System.IO.Path]::Combine($(x), '</A></PropertyGroup></Project>")]
fn test_every_offset_is_safe(#[case] text: &str) {
    let root = parse_detached(text);
    for (offset, _) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
        let offset = TextSize::new(offset as u32);
        let _ = resolve_at(&root, offset);
        let _ = completions(&root, offset, None);
        let _ = goto_definition(&root, offset);
        let _ = hover(&root, offset);
    }
    for diagnostic in &root.diagnostics {
        assert!(usize::from(diagnostic.range.end()) <= text.len());
    }
}

#[test]
fn test_xml_errors_are_reported() {
    let root = parse_detached("<Project><PropertyGroup>");
    assert!(!with_code(&root, codes::XML_ERROR).is_empty());
}

#[rstest]
#[case("('$(A)' == 'b'")]
#[case("'$(A)' == 'b')")]
#[case("Exists('a'")]
fn test_unbalanced_condition_is_reported(#[case] condition: &str) {
    let text = format!("<Project><Target Name=\"Build\" Condition=\"{condition}\" /></Project>");
    let root = parse_detached(&text);
    assert!(!with_code(&root, codes::EXPRESSION_ERROR).is_empty());
}

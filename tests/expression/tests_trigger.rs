//! Trigger states for text typed so far.

use msbuild::expression::{
    ExpressionOptions, TriggerState, get_condition_trigger_state, get_trigger_state, validate_list_permitted,
};
use msbuild::schema::{ScalarKind, ValueKind};
use rstest::rstest;

const VALUE: ExpressionOptions = ExpressionOptions::ITEMS;

#[rstest]
#[case("", Some('$'), TriggerState::PropertyName, 0)]
#[case("$(", None, TriggerState::PropertyName, 0)]
#[case("$(Out", None, TriggerState::PropertyName, 3)]
#[case("prefix$(Out", None, TriggerState::PropertyName, 3)]
#[case("@(", None, TriggerState::ItemName, 0)]
#[case("@(Comp", None, TriggerState::ItemName, 4)]
#[case("@(Compile->", None, TriggerState::ItemFunctionName, 0)]
#[case("$(Foo.", None, TriggerState::PropertyFunctionName, 0)]
#[case("$([", None, TriggerState::PropertyFunctionClassName, 0)]
#[case("$([System.IO.Path]::", None, TriggerState::PropertyFunctionName, 0)]
#[case("$(Out)bin", Some('/'), TriggerState::DirectorySeparator, 0)]
#[case("hello", None, TriggerState::Value, 5)]
#[case("$(Foo)", None, TriggerState::None, 0)]
#[case("$(Fo", Some('o'), TriggerState::None, 0)]
fn test_value_trigger_states(
    #[case] text: &str,
    #[case] typed: Option<char>,
    #[case] state: TriggerState,
    #[case] length: usize,
) {
    let result = get_trigger_state(text, typed, VALUE);
    assert_eq!(result.state, state, "{text:?}");
    if state != TriggerState::None {
        assert_eq!(result.length, length, "{text:?}");
    }
}

#[rstest]
#[case("%(", TriggerState::MetadataOrItemName)]
#[case("%(Ident", TriggerState::MetadataOrItemName)]
#[case("%(Compile.", TriggerState::MetadataName)]
#[case("%(Compile.Li", TriggerState::MetadataName)]
fn test_metadata_trigger_states(#[case] text: &str, #[case] state: TriggerState) {
    let result = get_trigger_state(text, None, VALUE | ExpressionOptions::METADATA);
    assert_eq!(result.state, state, "{text:?}");
}

#[test]
fn test_metadata_needs_metadata_context() {
    assert_ne!(get_trigger_state("%(", None, VALUE).state, TriggerState::MetadataOrItemName);
}

#[rstest]
#[case("a;b", ValueKind::new(ScalarKind::String).with_list(), TriggerState::Value)]
#[case("a;b", ValueKind::new(ScalarKind::String), TriggerState::None)]
fn test_list_values_need_list_kinds(#[case] text: &str, #[case] kind: ValueKind, #[case] state: TriggerState) {
    let raw = get_trigger_state(text, None, VALUE | ExpressionOptions::LISTS);
    assert_eq!(raw.state, TriggerState::SemicolonValue);
    assert_eq!(validate_list_permitted(raw.state, &kind), state);
}

#[test]
fn test_condition_value_reports_comparands() {
    let result = get_condition_trigger_state("'$(Platform)' == '", Some('\''), VALUE);
    assert_eq!(result.state, TriggerState::Value);
    let names: Vec<_> = result
        .comparands
        .iter()
        .filter_map(|c| c.property_name())
        .map(|n| n.to_string())
        .collect();
    assert_eq!(names, vec!["Platform"]);
}


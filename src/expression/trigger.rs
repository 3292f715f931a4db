//! Trigger states for completion
//!
//! Given the expression text up to the caret (and the character just typed,
//! if completion was triggered by typing), work out what kind of name the
//! user is in the middle of and how many characters of it are already typed.

use std::borrow::Cow;

use text_size::TextSize;

use super::ast::{ExprKind, ExprNode, ExpressionErrorKind, InvocationKind};
use super::condition::{ConditionToken, Delimiter, tokenize};
use super::parser::{ExpressionOptions, parse_expression};

/// What kind of completion applies at the end of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerState {
    None,
    Value,
    ItemName,
    PropertyName,
    MetadataName,
    MetadataOrItemName,
    DirectorySeparator,
    PropertyFunctionName,
    ItemFunctionName,
    PropertyFunctionClassName,
    /// In a comma-separated list; only valid if the value kind permits it
    CommaValue,
    /// In a semicolon-separated list; only valid if the value kind permits it
    SemicolonValue,
}

/// List separator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Semicolon,
    Comma,
}

/// Answers which list separators a value accepts.
pub trait ListPermission {
    fn allows_list(&self, kind: ListKind) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerResult {
    pub state: TriggerState,
    /// Length of the partial name or value already typed
    pub length: usize,
    /// The node the state was derived from
    pub node: Option<ExprNode>,
}

impl TriggerResult {
    fn none() -> Self {
        Self {
            state: TriggerState::None,
            length: 0,
            node: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionTriggerResult {
    pub state: TriggerState,
    pub length: usize,
    pub node: Option<ExprNode>,
    /// References on the other side of the comparison the caret is in
    pub comparands: Vec<ExprNode>,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The text to classify, or `None` if the typed character merely continues a
/// name that is already being completed.
fn trigger_buffer(text: &str, typed: Option<char>) -> Option<Cow<'_, str>> {
    let Some(c) = typed else {
        return Some(Cow::Borrowed(text));
    };
    let before = text.strip_suffix(c).unwrap_or(text);
    if is_name_char(c) && before.chars().last().is_some_and(is_name_char) {
        return None;
    }
    if before.len() == text.len() {
        Some(Cow::Owned(format!("{text}{c}")))
    } else {
        Some(Cow::Borrowed(text))
    }
}

/// Classify the end of `text` for completion.
pub fn get_trigger_state(text: &str, typed: Option<char>, options: ExpressionOptions) -> TriggerResult {
    let Some(buffer) = trigger_buffer(text, typed) else {
        return TriggerResult::none();
    };
    classify_buffer(&buffer, options)
}

fn classify_buffer(buffer: &str, options: ExpressionOptions) -> TriggerResult {
    let expression = parse_expression(buffer, options, TextSize::new(0));
    let end = TextSize::new(buffer.len() as u32);
    match classify(&expression, end, buffer, options) {
        Some((state, length, node)) if state != TriggerState::None => TriggerResult {
            state,
            length,
            node: Some(node.clone()),
        },
        _ => TriggerResult::none(),
    }
}

/// Like [`get_trigger_state`] for conditions, also returning the references
/// being compared against when the caret is on the right of a comparison.
pub fn get_condition_trigger_state(
    text: &str,
    typed: Option<char>,
    options: ExpressionOptions,
) -> ConditionTriggerResult {
    let Some(buffer) = trigger_buffer(text, typed) else {
        return ConditionTriggerResult {
            state: TriggerState::None,
            length: 0,
            node: None,
            comparands: Vec::new(),
        };
    };
    let result = classify_buffer(&buffer, options | ExpressionOptions::CONDITION);
    let comparands = if result.state == TriggerState::None {
        Vec::new()
    } else {
        comparand_references(&buffer, options)
    };
    ConditionTriggerResult {
        state: result.state,
        length: result.length,
        node: result.node,
        comparands,
    }
}

/// Provisional list states become `Value` only if the kind permits that separator.
pub fn validate_list_permitted(state: TriggerState, kind: &impl ListPermission) -> TriggerState {
    match state {
        TriggerState::CommaValue if kind.allows_list(ListKind::Comma) => TriggerState::Value,
        TriggerState::SemicolonValue if kind.allows_list(ListKind::Semicolon) => TriggerState::Value,
        TriggerState::CommaValue | TriggerState::SemicolonValue => TriggerState::None,
        other => other,
    }
}

fn expecting_name_state(kind: ExpressionErrorKind) -> Option<TriggerState> {
    Some(match kind {
        ExpressionErrorKind::ExpectingPropertyName => TriggerState::PropertyName,
        ExpressionErrorKind::ExpectingItemName => TriggerState::ItemName,
        ExpressionErrorKind::ExpectingMetadataName => TriggerState::MetadataName,
        ExpressionErrorKind::ExpectingMetadataOrItemName => TriggerState::MetadataOrItemName,
        ExpressionErrorKind::ExpectingMethodName => TriggerState::PropertyFunctionName,
        ExpressionErrorKind::ExpectingMethodOrTransform => TriggerState::ItemFunctionName,
        ExpressionErrorKind::ExpectingClassName => TriggerState::PropertyFunctionClassName,
        _ => return None,
    })
}

type Classified<'a> = Option<(TriggerState, usize, &'a ExprNode)>;

/// Find the node ending at `end` and derive the state from it.
fn classify<'a>(node: &'a ExprNode, end: TextSize, text: &str, options: ExpressionOptions) -> Classified<'a> {
    if node.range.end() != end {
        return None;
    }
    let len = usize::from(node.range.len());
    let recurse = |child: &'a ExprNode| classify(child, end, text, options);

    match &node.kind {
        ExprKind::Error {
            kind,
            was_eof,
            partial,
        } => {
            if !*was_eof {
                return Some((TriggerState::None, 0, node));
            }
            if let Some(state) = expecting_name_state(*kind) {
                return Some((state, 0, node));
            }
            partial.as_deref().and_then(recurse)
        }
        ExprKind::List(items) => {
            let last = items.last()?;
            let (state, length, found) = recurse(last)?;
            if state != TriggerState::Value || items.len() < 2 {
                return Some((state, length, found));
            }
            let separator = usize::from(last.range.start())
                .checked_sub(1)
                .and_then(|i| text.as_bytes().get(i));
            let state = if separator == Some(&b',') {
                TriggerState::CommaValue
            } else {
                TriggerState::SemicolonValue
            };
            Some((state, length, found))
        }
        ExprKind::Concat(parts) => recurse(parts.last()?),
        ExprKind::ArgumentList(args) => recurse(args.last()?),
        ExprKind::Property(body) | ExprKind::Quoted(body) | ExprKind::Not(body) | ExprKind::Paren(body) => {
            recurse(body.as_ref())
        }
        ExprKind::Item { body, separator } => recurse(separator.as_deref().unwrap_or(body.as_ref())),
        ExprKind::ItemTransform { transform, .. } => recurse(transform.as_ref()),
        ExprKind::Metadata { item, name } => {
            let name = name.as_deref().filter(|n| n.range.end() == end)?;
            let state = if item.is_some() {
                TriggerState::MetadataName
            } else {
                TriggerState::MetadataOrItemName
            };
            Some((state, usize::from(name.range.len()), name))
        }
        ExprKind::FunctionInvocation {
            kind,
            function,
            arguments,
            ..
        } => {
            if let Some(arguments) = arguments {
                return recurse(arguments.as_ref());
            }
            let state = match kind {
                InvocationKind::Item => TriggerState::ItemFunctionName,
                InvocationKind::Property | InvocationKind::Static => TriggerState::PropertyFunctionName,
            };
            (function.range.end() == end).then(|| (state, usize::from(function.range.len()), function.as_ref()))
        }
        ExprKind::Compare { right, .. } | ExprKind::And(_, right) | ExprKind::Or(_, right) => recurse(right.as_ref()),
        ExprKind::ConditionFunction { arguments, .. } => recurse(arguments.as_ref()),
        ExprKind::PropertyName(_) => Some((TriggerState::PropertyName, len, node)),
        ExprKind::ItemName(_) => Some((TriggerState::ItemName, len, node)),
        ExprKind::MetadataName(_) => Some((TriggerState::MetadataName, len, node)),
        ExprKind::FunctionName(_) => Some((TriggerState::PropertyFunctionName, len, node)),
        ExprKind::ClassReference(_) => Some((TriggerState::PropertyFunctionClassName, len, node)),
        ExprKind::Text(value) => Some(classify_text(node, value, options)),
        ExprKind::Literal(_) => None,
    }
}

fn classify_text<'a>(node: &'a ExprNode, value: &str, options: ExpressionOptions) -> (TriggerState, usize, &'a ExprNode) {
    match value.chars().last() {
        Some('$') => (TriggerState::PropertyName, 0, node),
        Some('@') if options.contains(ExpressionOptions::ITEMS) => (TriggerState::ItemName, 0, node),
        Some('%') if options.contains(ExpressionOptions::METADATA) => (TriggerState::MetadataOrItemName, 0, node),
        Some('/' | '\\') => (TriggerState::DirectorySeparator, 0, node),
        _ => (TriggerState::Value, value.trim_start().len(), node),
    }
}

/// Property and metadata references on the other side of the last
/// comparison in the last `and`/`or` clause.
fn comparand_references(buffer: &str, options: ExpressionOptions) -> Vec<ExprNode> {
    let tokens = tokenize(buffer);
    let clause_start = tokens.iter().rposition(|t| t.is_and_or()).map_or(0, |i| i + 1);
    let Some(op_index) = tokens[clause_start..]
        .iter()
        .rposition(|t| t.is_comparison())
        .map(|i| i + clause_start)
    else {
        return Vec::new();
    };

    let value_options = (options & ExpressionOptions::ITEMS) | ExpressionOptions::METADATA;
    let mut references = Vec::new();
    for token in &tokens[clause_start..op_index] {
        let (start, end) = match token.kind {
            Some(ConditionToken::Quoted(Delimiter::Closed)) => (token.start + 1, token.end - 1),
            Some(ConditionToken::Quoted(Delimiter::Unclosed)) => (token.start + 1, token.end),
            Some(ConditionToken::PropertyGroup(_) | ConditionToken::MetadataGroup(_)) => (token.start, token.end),
            _ => continue,
        };
        let node = parse_expression(&buffer[start..end], value_options, TextSize::new(start as u32));
        node.walk(&mut |n: &ExprNode| {
            let simple_property = n.property_name().is_some();
            let metadata = matches!(n.kind, ExprKind::Metadata { name: Some(_), .. });
            if simple_property || metadata {
                references.push(n.clone());
            }
        });
    }
    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_invocation_in_property_name() {
        let result = get_trigger_state("$(Fo", None, ExpressionOptions::NONE);
        assert_eq!(result.state, TriggerState::PropertyName);
        assert_eq!(result.length, 2);
    }

    #[test]
    fn test_typed_dollar_starts_property() {
        let result = get_trigger_state("", Some('$'), ExpressionOptions::NONE);
        assert_eq!(result.state, TriggerState::PropertyName);
        assert_eq!(result.length, 0);
    }

    #[test]
    fn test_typed_letter_continuing_word_is_ignored() {
        let result = get_trigger_state("$(Fo", Some('o'), ExpressionOptions::NONE);
        assert_eq!(result.state, TriggerState::None);
    }

    #[test]
    fn test_condition_value_after_comparison() {
        let result = get_condition_trigger_state("$(Configuration)=='", Some('\''), ExpressionOptions::NONE);
        assert_eq!(result.state, TriggerState::Value);
        assert_eq!(result.length, 0);
        assert!(
            result
                .comparands
                .iter()
                .any(|c| c.property_name().is_some_and(|n| n.matches("Configuration")))
        );
    }

    #[test]
    fn test_list_value_is_provisional() {
        let result = get_trigger_state("a;b", None, ExpressionOptions::LISTS);
        assert_eq!(result.state, TriggerState::SemicolonValue);
        assert_eq!(result.length, 1);
    }

    #[test]
    fn test_metadata_states() {
        let options = ExpressionOptions::METADATA;
        assert_eq!(
            get_trigger_state("%(Fi", None, options).state,
            TriggerState::MetadataOrItemName
        );
        assert_eq!(
            get_trigger_state("%(Compile.", None, options).state,
            TriggerState::MetadataName
        );
    }

    #[test]
    fn test_property_function_states() {
        assert_eq!(
            get_trigger_state("$(Foo.", None, ExpressionOptions::NONE).state,
            TriggerState::PropertyFunctionName
        );
        assert_eq!(
            get_trigger_state("$([System.IO", None, ExpressionOptions::NONE).state,
            TriggerState::PropertyFunctionClassName
        );
        assert_eq!(
            get_trigger_state("$([MSBuild]::Get", None, ExpressionOptions::NONE).state,
            TriggerState::PropertyFunctionName
        );
    }

    #[test]
    fn test_item_states() {
        let options = ExpressionOptions::ITEMS;
        assert_eq!(get_trigger_state("@(Com", None, options).state, TriggerState::ItemName);
        assert_eq!(
            get_trigger_state("@(Compile->", None, options).state,
            TriggerState::ItemFunctionName
        );
        assert_eq!(get_trigger_state("@(", None, ExpressionOptions::NONE).state, TriggerState::None);
    }

    #[test]
    fn test_directory_separator() {
        let result = get_trigger_state("$(OutputPath)bin", Some('\\'), ExpressionOptions::NONE);
        assert_eq!(result.state, TriggerState::DirectorySeparator);
    }

    struct Scalar;

    impl ListPermission for Scalar {
        fn allows_list(&self, _: ListKind) -> bool {
            false
        }
    }

    #[test]
    fn test_list_state_suppressed_for_scalar() {
        assert_eq!(
            validate_list_permitted(TriggerState::SemicolonValue, &Scalar),
            TriggerState::None
        );
        assert_eq!(validate_list_permitted(TriggerState::Value, &Scalar), TriggerState::Value);
    }
}

//! Hover information implementation.

use std::fmt::Write;

use text_size::{TextRange, TextSize};

use crate::project::RootDocument;
use crate::schema::{FunctionKind, TypedKind};

use super::resolver::{ReferenceKind, resolve_at};

/// Result of a hover request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverResult {
    /// The hover content (markdown).
    pub contents: String,
    /// The hovered range
    pub range: TextRange,
}

/// Describe whatever is at `offset` in the top-level document.
pub fn hover(root: &RootDocument, offset: TextSize) -> Option<HoverResult> {
    let reference = resolve_at(root, offset)?;
    let schemas = root.schemas();
    let mut contents = String::new();
    match &reference.kind {
        ReferenceKind::Property(name) => {
            let info = schemas.get_property(name.as_str());
            heading(&mut contents, "property", name.as_str(), info.as_ref().map(|i| &i.kind));
            if let Some(info) = info {
                paragraph(&mut contents, info.description.as_deref());
                deprecated(&mut contents, info.deprecation_message.as_deref());
            }
        }
        ReferenceKind::Item(name) => {
            let info = schemas.get_item(name.as_str());
            heading(&mut contents, "item", name.as_str(), info.as_ref().map(|i| &i.kind));
            if let Some(info) = info {
                paragraph(&mut contents, info.description.as_deref());
                deprecated(&mut contents, info.deprecation_message.as_deref());
            }
        }
        ReferenceKind::Metadata { item, name } => {
            let info = schemas.get_metadata(item.as_ref().map(|i| i.as_str()), name.as_str());
            let label = match item {
                Some(item) => format!("{item}.{name}"),
                None => name.to_string(),
            };
            heading(&mut contents, "metadata", &label, info.as_ref().map(|i| &i.kind));
            if let Some(info) = info {
                paragraph(&mut contents, info.description.as_deref());
                deprecated(&mut contents, info.deprecation_message.as_deref());
            }
        }
        ReferenceKind::Task(name) => {
            heading(&mut contents, "task", name.as_str(), None);
            if let Some(info) = schemas.get_task(name.as_str()) {
                paragraph(&mut contents, info.description.as_deref());
                deprecated(&mut contents, info.deprecation_message.as_deref());
            }
        }
        ReferenceKind::TaskParameter { task, parameter } => {
            let info = schemas
                .get_task(task.as_str())
                .and_then(|t| t.parameters.get(parameter.as_str()).cloned());
            let label = format!("{task}.{parameter}");
            heading(&mut contents, "parameter", &label, info.as_ref().map(|i| &i.kind));
            if let Some(info) = info {
                paragraph(&mut contents, info.description.as_deref());
                if info.is_required {
                    paragraph(&mut contents, Some("Required."));
                }
            }
        }
        ReferenceKind::Target(name) => {
            heading(&mut contents, "target", name.as_str(), None);
            if let Some(info) = schemas.get_target(name.as_str()) {
                paragraph(&mut contents, info.description.as_deref());
                deprecated(&mut contents, info.deprecation_message.as_deref());
            }
        }
        ReferenceKind::ItemFunction(name) => {
            heading(&mut contents, "item function", name.as_str(), None);
            let info = schemas.get_function(FunctionKind::Item, None, name.as_str());
            paragraph(&mut contents, info.and_then(|f| f.description.as_deref()));
        }
        ReferenceKind::PropertyFunction { class, name } => {
            let kind = if class.is_some() { FunctionKind::Static } else { FunctionKind::Property };
            let class = class.as_ref().map(|c| c.as_str());
            let label = match class {
                Some(class) => format!("[{class}]::{name}"),
                None => name.to_string(),
            };
            heading(&mut contents, "function", &label, None);
            let info = schemas.get_function(kind, class, name.as_str());
            paragraph(&mut contents, info.and_then(|f| f.description.as_deref()));
        }
        ReferenceKind::ConditionFunction(name) => {
            heading(&mut contents, "condition function", name.as_str(), None);
            let info = schemas.get_function(FunctionKind::Condition, None, name.as_str());
            paragraph(&mut contents, info.and_then(|f| f.description.as_deref()));
        }
        ReferenceKind::ClassName(name) => {
            heading(&mut contents, "class", name.as_str(), None);
            let info = schemas.builtins().class(name.as_str());
            paragraph(&mut contents, info.and_then(|c| c.description.as_deref()));
        }
        ReferenceKind::KnownValue { value, .. } => {
            heading(&mut contents, "value", value.name.as_str(), None);
            paragraph(&mut contents, value.description.as_deref());
        }
        ReferenceKind::FileOrFolder(paths) => {
            for path in paths {
                let _ = writeln!(contents, "* `{}`", path.display());
            }
        }
        ReferenceKind::Import(imports) => {
            for import in imports {
                match &import.resolved_path {
                    Some(path) => {
                        let _ = writeln!(contents, "* `{}`", path.display());
                    }
                    None => {
                        let _ = writeln!(contents, "* `{}` (not found)", import.expression);
                    }
                }
            }
        }
        ReferenceKind::Sdk(sdk) => {
            heading(&mut contents, "sdk", &sdk.reference.to_string(), None);
            for path in &sdk.paths {
                let _ = writeln!(contents, "* `{}`", path.display());
            }
        }
        ReferenceKind::Keyword => {
            let description = match (reference.attribute, reference.element) {
                (Some(attribute), _) => attribute.description,
                (None, Some(element)) => element.description,
                (None, None) => "",
            };
            paragraph(&mut contents, Some(description));
        }
    }
    let contents = contents.trim_end().to_string();
    (!contents.is_empty()).then_some(HoverResult {
        contents,
        range: reference.range,
    })
}

fn heading(out: &mut String, what: &str, name: &str, kind: Option<&TypedKind>) {
    let _ = write!(out, "**{what}** `{name}`");
    if let Some(type_name) = kind.and_then(|k| k.kind().type_name()) {
        let _ = write!(out, ": {type_name}");
    }
    out.push_str("\n\n");
}

fn paragraph(out: &mut String, text: Option<&str>) {
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        out.push_str(text);
        out.push_str("\n\n");
    }
}

fn deprecated(out: &mut String, message: Option<&str>) {
    if let Some(message) = message {
        let _ = write!(out, "**Deprecated:** {message}\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{ParseContext, StaticRuntimeInformation};
    use std::path::Path;
    use std::sync::Arc;

    fn hover_at(marked: &str) -> Option<HoverResult> {
        let offset = marked.find('|').unwrap();
        let text = marked.replacen('|', "", 1);
        let cx = ParseContext::new(Arc::new(StaticRuntimeInformation::default()));
        let root = RootDocument::parse(Path::new("/nonexistent/a.csproj"), text, None, &cx).unwrap();
        hover(&root, TextSize::new(offset as u32))
    }

    #[test]
    fn test_hover_known_property() {
        let result = hover_at(r#"<Project><PropertyGroup><Out|putType>Exe</OutputType></PropertyGroup></Project>"#)
            .unwrap();
        assert!(result.contents.starts_with("**property** `OutputType`"));
        assert!(result.contents.contains("Kind of output the project produces"));
    }

    #[test]
    fn test_hover_keyword() {
        let result = hover_at(r#"<Project><Item|Group /></Project>"#).unwrap();
        assert!(!result.contents.is_empty());
        assert!(!result.contents.starts_with("**"));
    }

    #[test]
    fn test_hover_nothing() {
        assert!(hover_at(r#"<Project>  |  </Project>"#).is_none());
    }
}

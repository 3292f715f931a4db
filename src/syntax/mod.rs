//! MSBuild grammar table
//!
//! A static description of which elements may appear where, which attributes
//! they take, and what kind of value each attribute and element holds. The
//! visitor resolves every XML element against this table before any hook
//! runs.
//!
//! Several elements are *abstract*: their XML name is user-defined. A child
//! of `PropertyGroup` is a property named by its tag, a child of `ItemGroup`
//! is an item, and so on. Lookups fall back to the abstract child when no
//! concrete child matches.

mod grammar;
mod kind;

pub use kind::SyntaxKind;

use crate::schema::ValueKind;

/// Grammar entry for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSyntax {
    pub kind: SyntaxKind,
    /// Empty for abstract elements
    pub name: &'static str,
    pub description: &'static str,
    pub children: &'static [SyntaxKind],
    pub attributes: &'static [AttributeSyntax],
    /// Kind of the element's text content
    pub value_kind: ValueKind,
    pub is_abstract: bool,
    /// Content is not MSBuild (inline task code, extension data)
    pub opaque_content: bool,
}

/// Grammar entry for one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSyntax {
    pub kind: SyntaxKind,
    /// Empty for abstract attributes
    pub name: &'static str,
    pub description: &'static str,
    pub value_kind: ValueKind,
    pub required: bool,
    pub is_abstract: bool,
}

impl AttributeSyntax {
    pub(crate) const fn new(kind: SyntaxKind, name: &'static str, value_kind: ValueKind, description: &'static str) -> Self {
        Self {
            kind,
            name,
            description,
            value_kind,
            required: false,
            is_abstract: false,
        }
    }

    pub(crate) const fn abstract_attribute(kind: SyntaxKind, value_kind: ValueKind, description: &'static str) -> Self {
        Self {
            kind,
            name: "",
            description,
            value_kind,
            required: false,
            is_abstract: true,
        }
    }

    pub(crate) const fn required(self) -> Self {
        Self { required: true, ..self }
    }
}

impl ElementSyntax {
    /// The grammar entry for an element kind.
    pub fn get(kind: SyntaxKind) -> Option<&'static ElementSyntax> {
        grammar::ELEMENTS.iter().find(|e| e.kind == kind)
    }

    /// The root `Project` element.
    pub fn project() -> &'static ElementSyntax {
        &grammar::ELEMENTS[0]
    }

    /// Resolve a child element by XML name, falling back to an abstract child.
    pub fn get_child(&self, name: &str) -> Option<&'static ElementSyntax> {
        let mut fallback = None;
        for child in self.children.iter().filter_map(|&kind| Self::get(kind)) {
            if child.is_abstract {
                fallback.get_or_insert(child);
            } else if child.name.eq_ignore_ascii_case(name) {
                return Some(child);
            }
        }
        fallback
    }

    /// Resolve an attribute by name, falling back to an abstract attribute.
    pub fn get_attribute(&self, name: &str) -> Option<&'static AttributeSyntax> {
        let mut fallback = None;
        for attribute in self.attributes {
            if attribute.is_abstract {
                fallback.get_or_insert(attribute);
            } else if attribute.name.eq_ignore_ascii_case(name) {
                return Some(attribute);
            }
        }
        fallback
    }

    /// Attributes a user can write by name.
    pub fn named_attributes(&self) -> impl Iterator<Item = &'static AttributeSyntax> {
        self.attributes.iter().filter(|a| !a.is_abstract)
    }

    /// Concrete child elements, for completion.
    pub fn named_children(&self) -> impl Iterator<Item = &'static ElementSyntax> {
        self.children
            .iter()
            .filter_map(|&kind| Self::get(kind))
            .filter(|e| !e.is_abstract)
    }

    pub fn abstract_child(&self) -> Option<&'static ElementSyntax> {
        self.children
            .iter()
            .filter_map(|&kind| Self::get(kind))
            .find(|e| e.is_abstract)
    }

    pub fn required_attributes(&self) -> impl Iterator<Item = &'static AttributeSyntax> {
        self.attributes.iter().filter(|a| a.required)
    }
}

/// Grammar entry for an attribute kind on a given element kind.
pub fn attribute_syntax(element: SyntaxKind, attribute: SyntaxKind) -> Option<&'static AttributeSyntax> {
    ElementSyntax::get(element)?
        .attributes
        .iter()
        .find(|a| a.kind == attribute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarKind;

    #[test]
    fn test_every_element_kind_has_an_entry() {
        for child in grammar::ELEMENTS.iter().flat_map(|e| e.children) {
            assert!(ElementSyntax::get(*child).is_some(), "{child:?}");
        }
    }

    #[test]
    fn test_child_lookup_is_case_insensitive() {
        let project = ElementSyntax::project();
        let group = project.get_child("propertygroup").unwrap();
        assert_eq!(group.kind, SyntaxKind::PropertyGroup);
    }

    #[test]
    fn test_abstract_fallbacks() {
        let group = ElementSyntax::get(SyntaxKind::ItemGroup).unwrap();
        let item = group.get_child("Compile").unwrap();
        assert_eq!(item.kind, SyntaxKind::Item);
        assert_eq!(item.get_attribute("include").unwrap().kind, SyntaxKind::ItemInclude);
        assert_eq!(item.get_attribute("Link").unwrap().kind, SyntaxKind::ItemMetadata);

        let target = ElementSyntax::get(SyntaxKind::Target).unwrap();
        assert_eq!(target.get_child("ItemGroup").unwrap().kind, SyntaxKind::ItemGroup);
        assert_eq!(target.get_child("Message").unwrap().kind, SyntaxKind::Task);
    }

    #[test]
    fn test_unknown_children_and_attributes() {
        let project = ElementSyntax::project();
        assert!(project.get_child("Compile").is_none());
        assert!(project.get_attribute("Foo").is_none());
    }

    #[test]
    fn test_required_attributes() {
        let import = ElementSyntax::get(SyntaxKind::Import).unwrap();
        let required: Vec<_> = import.required_attributes().map(|a| a.kind).collect();
        assert_eq!(required, vec![SyntaxKind::ImportProject]);

        let target_name = attribute_syntax(SyntaxKind::Target, SyntaxKind::TargetName).unwrap();
        assert!(target_name.required);
        assert_eq!(target_name.value_kind.scalar, ScalarKind::TargetName);
    }
}

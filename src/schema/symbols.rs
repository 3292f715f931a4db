//! Symbol value objects
//!
//! Symbols are created while a schema is built and are not modified
//! afterwards. Metadata refers back to its item by name only.

use std::path::PathBuf;

use bitflags::bitflags;
use text_size::TextRange;

use super::value_kind::{ScalarKind, TypedKind, ValueKind};
use crate::base::{Name, NameMap};

/// Where a symbol was declared, for goto-definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolLocation {
    pub path: PathBuf,
    pub range: TextRange,
}

bitflags! {
    /// How a name is used at a reference site, or across a document.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ReferenceUsage: u8 {
        const READ = 1;
        const WRITE = 1 << 1;
        const DECLARATION = 1 << 2;
    }
}

/// Common accessors over all symbol kinds.
pub trait Symbol {
    fn name(&self) -> &Name;
    fn description(&self) -> Option<&str>;
    fn deprecation_message(&self) -> Option<&str>;
    fn declared_at(&self) -> Option<&SymbolLocation>;
    fn description_mut(&mut self) -> &mut Option<String>;
    fn deprecation_message_mut(&mut self) -> &mut Option<String>;

    /// Take the value type and default from `later` when this symbol has none.
    fn absorb_kind(&mut self, later: &Self);

    fn has_description(&self) -> bool {
        self.description().is_some_and(|d| !d.trim().is_empty())
    }

    /// Fill what this symbol lacks from a lower-precedence definition.
    ///
    /// Name and `declared_at` always stay with `self`.
    fn absorb(&mut self, later: &Self) {
        if !self.has_description() && later.has_description() {
            *self.description_mut() = later.description().map(str::to_string);
        }
        if self.deprecation_message().is_none() && later.deprecation_message().is_some() {
            *self.deprecation_message_mut() = later.deprecation_message().map(str::to_string);
        }
        self.absorb_kind(later);
    }
}

macro_rules! impl_symbol {
    ($($ty:ty $(=> $kind:ident $(, $default:ident)?)?;)*) => {
        $(
            impl Symbol for $ty {
                fn name(&self) -> &Name {
                    &self.name
                }

                fn description(&self) -> Option<&str> {
                    self.description.as_deref()
                }

                fn deprecation_message(&self) -> Option<&str> {
                    self.deprecation_message.as_deref()
                }

                fn declared_at(&self) -> Option<&SymbolLocation> {
                    self.declared_at.as_ref()
                }

                fn description_mut(&mut self) -> &mut Option<String> {
                    &mut self.description
                }

                fn deprecation_message_mut(&mut self) -> &mut Option<String> {
                    &mut self.deprecation_message
                }

                #[allow(unused_variables)]
                fn absorb_kind(&mut self, later: &Self) {
                    $(
                        if self.$kind.kind().scalar == ScalarKind::Unknown
                            && later.$kind.kind().scalar != ScalarKind::Unknown
                        {
                            self.$kind = later.$kind.clone();
                        }
                        $(
                            if self.$default.is_none() {
                                self.$default = later.$default.clone();
                            }
                        )?
                    )?
                }
            }
        )*
    };
}

impl_symbol! {
    PropertyInfo => kind, default_value;
    ItemInfo => kind;
    MetadataInfo => kind, default_value;
    TaskInfo;
    TaskParameterInfo => kind;
    TargetInfo;
    FunctionInfo;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyInfo {
    pub name: Name,
    pub description: Option<String>,
    pub kind: TypedKind,
    pub default_value: Option<String>,
    pub deprecation_message: Option<String>,
    pub is_required: bool,
    /// Set by the build engine; cannot be assigned
    pub reserved: bool,
    pub declared_at: Option<SymbolLocation>,
}

impl PropertyInfo {
    pub fn new(name: impl Into<Name>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemInfo {
    pub name: Name,
    pub description: Option<String>,
    /// Description of what the `Include` attribute holds
    pub include_description: Option<String>,
    /// Kind of the `Include` value
    pub kind: TypedKind,
    pub metadata: NameMap<MetadataInfo>,
    pub deprecation_message: Option<String>,
    pub declared_at: Option<SymbolLocation>,
}

impl ItemInfo {
    pub fn new(name: impl Into<Name>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataInfo {
    pub name: Name,
    /// The item this metadata belongs to; `None` for well-known metadata
    pub item: Option<Name>,
    pub description: Option<String>,
    pub kind: TypedKind,
    pub default_value: Option<String>,
    pub deprecation_message: Option<String>,
    pub is_required: bool,
    pub reserved: bool,
    pub declared_at: Option<SymbolLocation>,
}

impl MetadataInfo {
    pub fn new(name: impl Into<Name>, item: Option<Name>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            item,
            description,
            ..Default::default()
        }
    }
}

/// Where a task definition came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskOrigin {
    /// A `UsingTask` element
    Declared {
        path: PathBuf,
        assembly: Option<String>,
    },
    /// Guessed from how the task is used
    #[default]
    Inferred,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskInfo {
    pub name: Name,
    pub description: Option<String>,
    pub parameters: NameMap<TaskParameterInfo>,
    /// True when `parameters` is the complete parameter set
    pub has_declared_parameters: bool,
    pub origin: TaskOrigin,
    pub deprecation_message: Option<String>,
    pub declared_at: Option<SymbolLocation>,
}

impl TaskInfo {
    pub fn is_declared(&self) -> bool {
        matches!(self.origin, TaskOrigin::Declared { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskParameterInfo {
    pub name: Name,
    pub description: Option<String>,
    pub kind: TypedKind,
    pub is_required: bool,
    pub is_output: bool,
    pub deprecation_message: Option<String>,
    pub declared_at: Option<SymbolLocation>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetInfo {
    pub name: Name,
    pub description: Option<String>,
    pub deprecation_message: Option<String>,
    pub declared_at: Option<SymbolLocation>,
}

impl TargetInfo {
    pub fn new(name: impl Into<Name>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FunctionKind {
    /// Instance function on a property value, `$(Foo.Trim())`
    #[default]
    Property,
    /// Item function, `@(Foo->Distinct())`
    Item,
    /// Static function, `$([Class]::Method())`
    Static,
    /// Condition function, `Exists('...')`
    Condition,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionInfo {
    pub name: Name,
    pub description: Option<String>,
    pub kind: FunctionKind,
    /// Owning class of a static function
    pub class: Option<Name>,
    pub return_kind: ValueKind,
    pub deprecation_message: Option<String>,
    pub declared_at: Option<SymbolLocation>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassInfo {
    pub name: Name,
    pub description: Option<String>,
}

/// One permitted value of a custom type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantInfo {
    pub name: Name,
    pub description: Option<String>,
}

impl ConstantInfo {
    pub fn new(name: impl Into<Name>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }
}

/// An enumeration of known values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomTypeInfo {
    /// `None` for anonymous types declared inline
    pub name: Option<Name>,
    pub description: Option<String>,
    pub values: Vec<ConstantInfo>,
    /// Values outside `values` are not flagged
    pub allow_unknown_values: bool,
}

impl CustomTypeInfo {
    pub fn value(&self, name: &str) -> Option<&ConstantInfo> {
        self.values.iter().find(|v| v.name.matches(name))
    }
}

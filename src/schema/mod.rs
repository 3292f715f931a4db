//! Schemas: what is known about properties, items, tasks and targets
//!
//! Knowledge comes from three places, consulted in this order by a
//! [`SchemaSet`]:
//!
//! ```text
//! declared  ── .buildschema.json next to a file, or an embedded resource
//! inferred  ── read off a document's own XML (what it writes and reads)
//! builtin   ── common properties, reserved properties, well-known metadata
//! ```

mod builtins;
mod inferred;
mod json;
mod set;
mod symbols;
mod value_kind;

use std::path::PathBuf;
use std::sync::Arc;

pub use builtins::{BuiltInSchemas, Builtins};
pub use inferred::{InferredSchema, InferredSchemaBuilder};
pub(crate) use inferred::{is_call_target, is_target_list, target_names};
pub use set::{SchemaEntry, SchemaSet};
pub use symbols::{
    ClassInfo, ConstantInfo, CustomTypeInfo, FunctionInfo, FunctionKind, ItemInfo, MetadataInfo, PropertyInfo,
    ReferenceUsage, Symbol, SymbolLocation, TargetInfo, TaskInfo, TaskOrigin, TaskParameterInfo,
};
pub use value_kind::{KindModifiers, ScalarKind, TypedKind, ValueKind};

use crate::base::NameMap;

/// Where a schema's knowledge came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOrigin {
    /// A schema file on disk
    Declared(PathBuf),
    /// A schema embedded in the library
    BuiltIn,
    /// Inferred from the document at this path
    Inferred(PathBuf),
}

/// Read access shared by every kind of schema.
pub trait MsBuildSchema: std::fmt::Debug + Send + Sync {
    fn origin(&self) -> &SchemaOrigin;
    fn properties(&self) -> &NameMap<PropertyInfo>;
    fn items(&self) -> &NameMap<ItemInfo>;
    fn tasks(&self) -> &NameMap<TaskInfo>;
    fn targets(&self) -> &NameMap<TargetInfo>;
    fn custom_types(&self) -> &NameMap<Arc<CustomTypeInfo>>;

    /// Private names are an implementation detail of the file declaring them.
    fn is_private(&self, name: &str) -> bool {
        name.starts_with('_')
    }
}

/// A declared or built-in schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub origin: SchemaOrigin,
    pub license: Option<String>,
    pub properties: NameMap<PropertyInfo>,
    pub items: NameMap<ItemInfo>,
    pub targets: NameMap<TargetInfo>,
    pub tasks: NameMap<TaskInfo>,
    pub custom_types: NameMap<Arc<CustomTypeInfo>>,
    /// Files whose schemas should also be offered when editing this one
    pub intellisense_imports: Vec<String>,
}

impl Schema {
    pub fn empty(origin: SchemaOrigin) -> Self {
        Self {
            origin,
            license: None,
            properties: NameMap::new(),
            items: NameMap::new(),
            targets: NameMap::new(),
            tasks: NameMap::new(),
            custom_types: NameMap::new(),
            intellisense_imports: Vec::new(),
        }
    }
}

impl MsBuildSchema for Schema {
    fn origin(&self) -> &SchemaOrigin {
        &self.origin
    }

    fn properties(&self) -> &NameMap<PropertyInfo> {
        &self.properties
    }

    fn items(&self) -> &NameMap<ItemInfo> {
        &self.items
    }

    fn tasks(&self) -> &NameMap<TaskInfo> {
        &self.tasks
    }

    fn targets(&self) -> &NameMap<TargetInfo> {
        &self.targets
    }

    fn custom_types(&self) -> &NameMap<Arc<CustomTypeInfo>> {
        &self.custom_types
    }
}

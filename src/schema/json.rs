//! Loader for `.buildschema.json` files
//!
//! A schema file describes the properties, items, metadata and targets that
//! a targets file defines, so that projects importing it get completion and
//! validation. Entries are either a bare description string or an object:
//!
//! ```json
//! {
//!   "properties": {
//!     "Foo": "A description",
//!     "Bar": { "description": "...", "type": "bool", "default": "true" }
//!   },
//!   "items": { "Compile": { "description": "...", "type": "file" } },
//!   "metadata": [ { "$appliesTo": [ "Compile" ], "Link": "..." } ],
//!   "types": { "debug-type": { "values": { "full": "...", "portable": "..." } } }
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use super::symbols::{ConstantInfo, CustomTypeInfo, ItemInfo, MetadataInfo, PropertyInfo, TargetInfo};
use super::value_kind::{KindModifiers, ScalarKind, TypedKind, ValueKind};
use super::{Schema, SchemaOrigin};
use crate::base::{Name, NameMap};
use crate::error::SchemaError;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SchemaDocument {
    license: Option<String>,
    properties: IndexMap<String, Entry>,
    items: IndexMap<String, Entry>,
    targets: IndexMap<String, Entry>,
    metadata: Vec<MetadataGroup>,
    #[serde(alias = "enumKinds")]
    types: IndexMap<String, TypeSpec>,
    intellisense_imports: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Description(String),
    Full(Box<EntryObject>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EntryObject {
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<TypeSpec>,
    default: Option<serde_json::Value>,
    deprecation_message: Option<String>,
    #[serde(alias = "isRequired")]
    required: bool,
    is_list: bool,
    list_separators: Option<String>,
    is_literal: bool,
    include_description: Option<String>,
    metadata: IndexMap<String, Entry>,
}

#[derive(Debug, Deserialize)]
struct MetadataGroup {
    #[serde(rename = "$appliesTo")]
    applies_to: AppliesTo,
    #[serde(flatten)]
    entries: IndexMap<String, Entry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AppliesTo {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeSpec {
    /// A type name from the fixed table
    Name(String),
    /// An anonymous custom type
    Values(Vec<String>),
    Object(TypeObject),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TypeObject {
    #[serde(rename = "$ref")]
    reference: Option<String>,
    name: Option<String>,
    description: Option<String>,
    values: Option<Values>,
    allow_unknown_values: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Values {
    List(Vec<String>),
    Map(IndexMap<String, ValueEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ValueEntry {
    Description(String),
    Object {
        #[serde(default)]
        description: Option<String>,
    },
}

impl Entry {
    fn description(&self) -> Option<String> {
        match self {
            Entry::Description(d) => Some(d.clone()),
            Entry::Full(o) => o.description.clone(),
        }
    }

    fn object(&self) -> Option<&EntryObject> {
        match self {
            Entry::Description(_) => None,
            Entry::Full(o) => Some(o),
        }
    }
}

impl Schema {
    /// Load a schema file from disk.
    pub fn load(path: &Path) -> Result<Schema, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, SchemaOrigin::Declared(path.to_path_buf()))
    }

    /// Parse a schema from JSON text.
    pub fn from_json_str(text: &str, origin: SchemaOrigin) -> Result<Schema, SchemaError> {
        let document: SchemaDocument = serde_json::from_str(text)?;
        SchemaBuilder::default().build(document, origin)
    }
}

#[derive(Default)]
struct SchemaBuilder {
    custom_types: NameMap<Arc<CustomTypeInfo>>,
}

impl SchemaBuilder {
    fn build(mut self, document: SchemaDocument, origin: SchemaOrigin) -> Result<Schema, SchemaError> {
        for (name, spec) in &document.types {
            let custom = match spec {
                TypeSpec::Name(type_name) => return Err(SchemaError::InvalidType(type_name.clone())),
                TypeSpec::Values(values) => custom_type_from_list(Some(name), None, values, false),
                TypeSpec::Object(object) => {
                    if let Some(reference) = &object.reference {
                        return Err(SchemaError::UnknownTypeReference(reference.clone()));
                    }
                    custom_type_from_object(Some(name), object)
                }
            };
            self.custom_types.insert(name.as_str(), Arc::new(custom));
        }

        let mut properties = NameMap::new();
        for (name, entry) in &document.properties {
            let object = entry.object();
            let property = PropertyInfo {
                name: Name::new(name),
                description: entry.description(),
                kind: self.typed_kind(object, ValueKind::UNKNOWN)?,
                default_value: object.and_then(|o| default_string(o.default.as_ref())),
                deprecation_message: object.and_then(|o| o.deprecation_message.clone()),
                is_required: object.is_some_and(|o| o.required),
                ..Default::default()
            };
            properties.insert(name.as_str(), property);
        }

        let mut items: NameMap<ItemInfo> = NameMap::new();
        for (name, entry) in &document.items {
            let object = entry.object();
            let mut item = ItemInfo {
                name: Name::new(name),
                description: entry.description(),
                include_description: object.and_then(|o| o.include_description.clone()),
                kind: self.typed_kind(object, ValueKind::new(ScalarKind::File).with_list())?,
                deprecation_message: object.and_then(|o| o.deprecation_message.clone()),
                ..Default::default()
            };
            if let Some(object) = object {
                for (meta_name, meta_entry) in &object.metadata {
                    let metadata = self.metadata(&item.name, meta_name, meta_entry)?;
                    item.metadata.insert(meta_name.as_str(), metadata);
                }
            }
            items.insert(name.as_str(), item);
        }

        for group in &document.metadata {
            let applies_to: Vec<&String> = match &group.applies_to {
                AppliesTo::One(name) => vec![name],
                AppliesTo::Many(names) => names.iter().collect(),
            };
            for item_name in applies_to {
                let item = items.get_or_insert_with(item_name, || ItemInfo::new(item_name.as_str(), None));
                for (meta_name, meta_entry) in &group.entries {
                    let metadata = self.metadata(&item.name, meta_name, meta_entry)?;
                    item.metadata.insert(meta_name.as_str(), metadata);
                }
            }
        }

        let mut targets = NameMap::new();
        for (name, entry) in &document.targets {
            let mut target = TargetInfo::new(name.as_str(), entry.description());
            target.deprecation_message = entry.object().and_then(|o| o.deprecation_message.clone());
            targets.insert(name.as_str(), target);
        }

        Ok(Schema {
            origin,
            license: document.license,
            properties,
            items,
            targets,
            tasks: NameMap::new(),
            custom_types: self.custom_types,
            intellisense_imports: document.intellisense_imports,
        })
    }

    fn metadata(&self, item: &Name, name: &str, entry: &Entry) -> Result<MetadataInfo, SchemaError> {
        let object = entry.object();
        Ok(MetadataInfo {
            name: Name::new(name),
            item: Some(item.clone()),
            description: entry.description(),
            kind: self.typed_kind(object, ValueKind::UNKNOWN)?,
            default_value: object.and_then(|o| default_string(o.default.as_ref())),
            deprecation_message: object.and_then(|o| o.deprecation_message.clone()),
            is_required: object.is_some_and(|o| o.required),
            ..Default::default()
        })
    }

    fn typed_kind(&self, object: Option<&EntryObject>, fallback: ValueKind) -> Result<TypedKind, SchemaError> {
        let Some(object) = object else {
            return Ok(fallback.into());
        };
        let base = match &object.kind {
            None => TypedKind::from(ValueKind::new(fallback.scalar)),
            Some(TypeSpec::Name(name)) => ValueKind::parse_type_name(name)?.into(),
            Some(TypeSpec::Values(values)) => TypedKind::custom(
                Arc::new(custom_type_from_list(None, None, values, false)),
                KindModifiers::empty(),
            ),
            Some(TypeSpec::Object(type_object)) => match &type_object.reference {
                Some(reference) => {
                    let name = reference.strip_prefix("#/types/").unwrap_or(reference);
                    let custom = self
                        .custom_types
                        .get(name)
                        .ok_or_else(|| SchemaError::UnknownTypeReference(reference.clone()))?;
                    TypedKind::custom(Arc::clone(custom), KindModifiers::empty())
                }
                None => TypedKind::custom(
                    Arc::new(custom_type_from_object(None, type_object)),
                    KindModifiers::empty(),
                ),
            },
        };

        let mut modifiers = KindModifiers::empty();
        if object.kind.is_none() {
            modifiers |= fallback.modifiers;
        }
        if object.is_list {
            modifiers |= KindModifiers::LIST;
        }
        if let Some(separators) = &object.list_separators {
            if separators.contains(';') {
                modifiers |= KindModifiers::LIST;
            }
            if separators.contains(',') {
                modifiers |= KindModifiers::COMMA_LIST;
            }
        }
        if object.is_literal {
            modifiers |= KindModifiers::LITERAL;
        }
        Ok(base.with_modifiers(modifiers))
    }
}

fn custom_type_from_list(
    name: Option<&String>,
    description: Option<String>,
    values: &[String],
    allow_unknown_values: bool,
) -> CustomTypeInfo {
    CustomTypeInfo {
        name: name.map(Name::new),
        description,
        values: values.iter().map(|v| ConstantInfo::new(v.as_str(), None)).collect(),
        allow_unknown_values,
    }
}

fn custom_type_from_object(name: Option<&String>, object: &TypeObject) -> CustomTypeInfo {
    let name = object.name.as_ref().or(name);
    match &object.values {
        Some(Values::Map(map)) => CustomTypeInfo {
            name: name.map(Name::new),
            description: object.description.clone(),
            values: map
                .iter()
                .map(|(value, entry)| {
                    let description = match entry {
                        ValueEntry::Description(d) => Some(d.clone()),
                        ValueEntry::Object { description } => description.clone(),
                    };
                    ConstantInfo::new(value.as_str(), description)
                })
                .collect(),
            allow_unknown_values: object.allow_unknown_values,
        },
        Some(Values::List(values)) => {
            custom_type_from_list(name, object.description.clone(), values, object.allow_unknown_values)
        }
        None => custom_type_from_list(name, object.description.clone(), &[], object.allow_unknown_values),
    }
}

fn default_string(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MsBuildSchema;

    const SAMPLE: &str = r##"{
        "license": "MIT",
        "properties": {
            "OutputType": {
                "description": "Type of output to generate",
                "type": { "values": { "Exe": "Executable", "Library": "Class library" } }
            },
            "Optimize": { "description": "Enable optimizations", "type": "bool", "default": true },
            "DefineConstants": { "description": "Symbols", "isList": true },
            "DebugType": { "type": { "$ref": "#/types/debug-type" } },
            "OldThing": { "description": "Old", "deprecationMessage": "Use NewThing" }
        },
        "items": {
            "Compile": { "description": "Source files", "includeDescription": "Files to compile" }
        },
        "metadata": [
            { "$appliesTo": [ "Compile", "EmbeddedResource" ], "Link": { "description": "Display path", "type": "file" } },
            { "$appliesTo": "Compile", "AutoGen": "Generated file" }
        ],
        "targets": { "Build": "Builds the project" },
        "types": {
            "debug-type": { "values": [ "full", "portable", "embedded" ] }
        },
        "intellisenseImports": [ "Microsoft.Common.targets" ]
    }"##;

    fn sample() -> Schema {
        Schema::from_json_str(SAMPLE, SchemaOrigin::BuiltIn).unwrap()
    }

    #[test]
    fn test_descriptions_and_defaults() {
        let schema = sample();
        let optimize = schema.properties().get("optimize").unwrap();
        assert_eq!(optimize.description.as_deref(), Some("Enable optimizations"));
        assert_eq!(optimize.kind.kind().scalar, ScalarKind::Bool);
        assert_eq!(optimize.default_value.as_deref(), Some("true"));
        assert_eq!(schema.license.as_deref(), Some("MIT"));
        assert_eq!(schema.intellisense_imports, vec!["Microsoft.Common.targets".to_string()]);
    }

    #[test]
    fn test_inline_and_referenced_custom_types() {
        let schema = sample();
        let output_type = schema.properties().get("OutputType").unwrap();
        let custom = output_type.kind.custom_type().unwrap();
        assert!(custom.value("exe").is_some());
        assert_eq!(custom.value("Library").unwrap().description.as_deref(), Some("Class library"));

        let debug_type = schema.properties().get("DebugType").unwrap();
        let referenced = debug_type.kind.custom_type().unwrap();
        assert!(Arc::ptr_eq(referenced, schema.custom_types().get("debug-type").unwrap()));
        assert_eq!(referenced.values.len(), 3);
    }

    #[test]
    fn test_list_modifier_and_deprecation() {
        let schema = sample();
        assert!(schema.properties().get("DefineConstants").unwrap().kind.kind().is_list());
        assert_eq!(
            schema.properties().get("OldThing").unwrap().deprecation_message.as_deref(),
            Some("Use NewThing")
        );
    }

    #[test]
    fn test_metadata_groups_apply_to_items() {
        let schema = sample();
        let compile = schema.items().get("Compile").unwrap();
        assert_eq!(compile.include_description.as_deref(), Some("Files to compile"));
        let link = compile.metadata.get("link").unwrap();
        assert_eq!(link.item.as_ref().unwrap().as_str(), "Compile");
        assert_eq!(link.kind.kind().scalar, ScalarKind::File);
        assert!(compile.metadata.contains("AutoGen"));

        let resource = schema.items().get("EmbeddedResource").unwrap();
        assert!(resource.description.is_none());
        assert!(resource.metadata.contains("Link"));
    }

    #[test]
    fn test_enum_kinds_alias() {
        let schema = Schema::from_json_str(
            r##"{ "enumKinds": { "mode": [ "a", "b" ] }, "properties": { "Mode": { "type": { "$ref": "#/types/mode" } } } }"##,
            SchemaOrigin::BuiltIn,
        )
        .unwrap();
        assert!(schema.properties().get("Mode").unwrap().kind.custom_type().is_some());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Schema::from_json_str(r#"{ "properties": { "A": { "type": "nonsense" } } }"#, SchemaOrigin::BuiltIn),
            Err(SchemaError::InvalidType(_))
        ));
        assert!(matches!(
            Schema::from_json_str(
                r##"{ "properties": { "A": { "type": { "$ref": "#/types/missing" } } } }"##,
                SchemaOrigin::BuiltIn
            ),
            Err(SchemaError::UnknownTypeReference(_))
        ));
        assert!(matches!(
            Schema::from_json_str("{ not json", SchemaOrigin::BuiltIn),
            Err(SchemaError::Json(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Schema::load(&dir.path().join("missing.buildschema.json"));
        assert!(matches!(result, Err(SchemaError::Io { .. })));
    }
}

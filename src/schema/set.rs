//! Ordered schema lookups
//!
//! A [`SchemaSet`] answers "what is `X`?" for a root document by consulting
//! its schemas in order: declared schemas (top-level document first, then
//! imports depth-first), then inferred schemas in the same order, then the
//! built-in schema.
//!
//! * The first schema that knows a symbol supplies it. If its description is
//!   empty, the description comes from the next schema that has one.
//! * Declared tasks win over inferred tasks regardless of schema order.
//! * Listings hide `_`-prefixed names that only imports declare, unless
//!   private symbols are requested.

use std::sync::Arc;

use super::builtins::Builtins;
use super::inferred::InferredSchema;
use super::symbols::{
    CustomTypeInfo, FunctionInfo, FunctionKind, ItemInfo, MetadataInfo, PropertyInfo, ReferenceUsage, Symbol,
    TargetInfo, TaskInfo,
};
use super::value_kind::{KindModifiers, ScalarKind, TypedKind};
use super::{MsBuildSchema, Schema};
use crate::base::{Name, NameMap, NameSet};
use crate::syntax::SyntaxKind;
use crate::visitor::{ResolvedAttribute, ResolvedElement};

/// One schema in a [`SchemaSet`].
#[derive(Debug, Clone)]
pub enum SchemaEntry {
    Declared { schema: Arc<Schema>, top_level: bool },
    Inferred(Arc<InferredSchema>),
    BuiltIn(Arc<Schema>),
}

impl SchemaEntry {
    pub fn schema(&self) -> &dyn MsBuildSchema {
        match self {
            SchemaEntry::Declared { schema, .. } | SchemaEntry::BuiltIn(schema) => schema.as_ref(),
            SchemaEntry::Inferred(schema) => schema.as_ref(),
        }
    }

    /// True when the schema describes the document being edited.
    pub fn is_top_level(&self) -> bool {
        match self {
            SchemaEntry::Declared { top_level, .. } => *top_level,
            SchemaEntry::Inferred(schema) => schema.is_top_level,
            SchemaEntry::BuiltIn(_) => false,
        }
    }

    pub fn inferred(&self) -> Option<&InferredSchema> {
        match self {
            SchemaEntry::Inferred(schema) => Some(schema),
            _ => None,
        }
    }
}

/// The schemas visible from a root document, in lookup order.
#[derive(Debug, Clone)]
pub struct SchemaSet {
    entries: Vec<SchemaEntry>,
    show_private: bool,
}

type SymbolMap<T> = fn(&dyn MsBuildSchema) -> &NameMap<T>;

impl SchemaSet {
    /// `entries` must already be in lookup order.
    pub fn new(entries: Vec<SchemaEntry>, show_private: bool) -> Self {
        Self { entries, show_private }
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn builtins(&self) -> &'static Builtins {
        Builtins::get()
    }

    fn inferred(&self) -> impl Iterator<Item = &InferredSchema> {
        self.entries.iter().filter_map(SchemaEntry::inferred)
    }

    fn lookup<T: Symbol + Clone>(&self, map: SymbolMap<T>, name: &str) -> Option<T> {
        merge_first(self.entries.iter().filter_map(|e| map(e.schema()).get(name)))
    }

    fn list<T: Symbol + Clone>(&self, map: SymbolMap<T>) -> Vec<T> {
        let mut out: NameMap<T> = NameMap::new();
        for entry in &self.entries {
            let hide_private = !self.show_private && !entry.is_top_level();
            for (name, symbol) in map(entry.schema()).iter() {
                if hide_private && entry.schema().is_private(name.as_str()) && !out.contains(name.as_str()) {
                    continue;
                }
                merge_into(&mut out, name, symbol);
            }
        }
        out.values().cloned().collect()
    }

    pub fn get_property(&self, name: &str) -> Option<PropertyInfo> {
        if let Some(reserved) = self.builtins().reserved_properties.get(name) {
            return Some(reserved.clone());
        }
        self.lookup(|s| s.properties(), name)
    }

    pub fn get_item(&self, name: &str) -> Option<ItemInfo> {
        self.lookup(|s| s.items(), name)
    }

    /// Metadata `name` of `item`, or well-known metadata of any item.
    pub fn get_metadata(&self, item: Option<&str>, name: &str) -> Option<MetadataInfo> {
        if let Some(known) = self.builtins().well_known_metadata.get(name) {
            return Some(known.clone());
        }
        match item {
            Some(item) => merge_first(
                self.entries
                    .iter()
                    .filter_map(|e| e.schema().items().get(item)?.metadata.get(name)),
            ),
            None => merge_first(
                self.entries
                    .iter()
                    .flat_map(|e| e.schema().items().values())
                    .filter_map(|i| i.metadata.get(name)),
            ),
        }
    }

    /// A declared definition of the task wins over inferred ones.
    pub fn get_task(&self, name: &str) -> Option<TaskInfo> {
        let all = move || self.entries.iter().filter_map(move |e| e.schema().tasks().get(name));
        merge_first(all().filter(|t| t.is_declared())).or_else(|| merge_first(all()))
    }

    pub fn get_target(&self, name: &str) -> Option<TargetInfo> {
        self.lookup(|s| s.targets(), name)
    }

    pub fn get_custom_type(&self, name: &str) -> Option<Arc<CustomTypeInfo>> {
        self.entries
            .iter()
            .find_map(|e| e.schema().custom_types().get(name))
            .cloned()
    }

    pub fn get_function(&self, kind: FunctionKind, class: Option<&str>, name: &str) -> Option<&'static FunctionInfo> {
        self.builtins().function(kind, class, name)
    }

    pub fn properties(&self) -> Vec<PropertyInfo> {
        let mut properties: Vec<_> = self.builtins().reserved_properties.values().cloned().collect();
        properties.extend(
            self.list(|s| s.properties())
                .into_iter()
                .filter(|p| !self.builtins().reserved_properties.contains(p.name.as_str())),
        );
        properties
    }

    pub fn items(&self) -> Vec<ItemInfo> {
        self.list(|s| s.items())
    }

    /// Metadata applicable to any of `items`, plus the well-known metadata.
    pub fn metadata_for(&self, items: &[&str]) -> Vec<MetadataInfo> {
        let mut out: NameMap<MetadataInfo> = NameMap::new();
        for entry in &self.entries {
            let hide_private = !self.show_private && !entry.is_top_level();
            for item in items {
                let Some(info) = entry.schema().items().get(item) else {
                    continue;
                };
                for (name, metadata) in info.metadata.iter() {
                    if hide_private && name.is_private() && !out.contains(name.as_str()) {
                        continue;
                    }
                    merge_into(&mut out, name, metadata);
                }
            }
        }
        for (name, metadata) in self.builtins().well_known_metadata.iter() {
            if !out.contains(name.as_str()) {
                out.insert(name.clone(), metadata.clone());
            }
        }
        out.values().cloned().collect()
    }

    pub fn tasks(&self) -> Vec<TaskInfo> {
        let mut tasks = self.list(|s| s.tasks());
        for task in &mut tasks {
            if !task.is_declared()
                && let Some(declared) = self.get_task(task.name.as_str())
            {
                *task = declared;
            }
        }
        tasks
    }

    pub fn targets(&self) -> Vec<TargetInfo> {
        self.list(|s| s.targets())
    }

    /// Targets that something refers to, declared or not.
    pub fn referenced_targets(&self) -> NameSet {
        let mut names = NameSet::new();
        for schema in self.inferred() {
            names.extend(schema.target_references.keys().cloned());
        }
        names
    }

    pub fn configurations(&self) -> NameSet {
        let mut values = NameSet::new();
        for schema in self.inferred() {
            values.extend(schema.configurations.iter().cloned());
        }
        values
    }

    pub fn platforms(&self) -> NameSet {
        let mut values = NameSet::new();
        for schema in self.inferred() {
            values.extend(schema.platforms.iter().cloned());
        }
        values
    }

    /// Values that conditions compare property `name` against.
    pub fn comparand_values(&self, name: &str) -> NameSet {
        let mut values = NameSet::new();
        for schema in self.inferred() {
            if let Some(found) = schema.comparand_values.get(name) {
                values.extend(found.iter().cloned());
            }
        }
        values
    }

    /// How property `name` is used across all documents.
    pub fn usage(&self, name: &str) -> ReferenceUsage {
        self.inferred()
            .filter_map(|s| s.property_usage.get(name))
            .fold(ReferenceUsage::empty(), |acc, u| acc | *u)
    }

    /// How item `name` is used across all documents.
    pub fn item_usage(&self, name: &str) -> ReferenceUsage {
        self.inferred()
            .filter_map(|s| s.item_usage.get(name))
            .fold(ReferenceUsage::empty(), |acc, u| acc | *u)
    }

    fn is_documented<T>(&self, map: SymbolMap<T>, name: &str) -> bool {
        self.entries
            .iter()
            .filter(|e| !matches!(e, SchemaEntry::Inferred(_)))
            .any(|e| map(e.schema()).contains(name))
    }

    /// True if a declared or built-in schema describes the property.
    pub fn is_documented_property(&self, name: &str) -> bool {
        self.builtins().reserved_properties.contains(name) || self.is_documented(|s| s.properties(), name)
    }

    pub fn is_documented_item(&self, name: &str) -> bool {
        self.is_documented(|s| s.items(), name)
    }

    /// True if a private property is written by some imported document.
    pub fn is_imported_private_property(&self, name: &str) -> bool {
        name.starts_with('_')
            && self
                .inferred()
                .filter(|s| !s.is_top_level)
                .any(|s| s.property_usage.get(name).is_some_and(|u| u.contains(ReferenceUsage::WRITE)))
    }

    /// Kind the schemas give an element or attribute value, if known.
    ///
    /// `item` is the item enclosing a metadata element.
    pub fn typed_kind(
        &self,
        element: &ResolvedElement<'_>,
        attribute: Option<&ResolvedAttribute<'_>>,
        item: Option<&str>,
    ) -> Option<TypedKind> {
        let kind = match (element.kind(), attribute) {
            (SyntaxKind::Property, None) => self.get_property(element.name())?.kind,
            (SyntaxKind::Metadata, None) => self.get_metadata(item, element.name())?.kind,
            (SyntaxKind::Item, Some(attribute)) => match attribute.kind() {
                SyntaxKind::ItemMetadata => self.get_metadata(Some(element.name()), attribute.name())?.kind,
                SyntaxKind::ItemInclude | SyntaxKind::ItemExclude | SyntaxKind::ItemRemove | SyntaxKind::ItemUpdate => {
                    self.get_item(element.name())?.kind.with_modifiers(KindModifiers::LIST)
                }
                _ => return None,
            },
            (SyntaxKind::Task, Some(attribute)) if attribute.kind() == SyntaxKind::TaskParameter => {
                self.get_task(element.name())?.parameters.get(attribute.name())?.kind.clone()
            }
            _ => return None,
        };
        (kind.kind().scalar != ScalarKind::Unknown).then_some(kind)
    }
}

/// First symbol found, with anything it lacks filled from later ones.
fn merge_first<'a, T: Symbol + Clone + 'a>(mut symbols: impl Iterator<Item = &'a T>) -> Option<T> {
    let mut found = symbols.next()?.clone();
    for later in symbols {
        found.absorb(later);
    }
    Some(found)
}

fn merge_into<T: Symbol + Clone>(out: &mut NameMap<T>, name: &Name, symbol: &T) {
    match out.get_mut(name.as_str()) {
        Some(existing) => existing.absorb(symbol),
        None => {
            out.insert(name.clone(), symbol.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_xml;
    use crate::schema::SchemaOrigin;
    use std::path::Path;

    fn declared(json: &str, top_level: bool) -> SchemaEntry {
        SchemaEntry::Declared {
            schema: Arc::new(Schema::from_json_str(json, SchemaOrigin::BuiltIn).unwrap()),
            top_level,
        }
    }

    fn inferred(text: &str, path: &str, top_level: bool) -> SchemaEntry {
        let document = parse_xml(text);
        SchemaEntry::Inferred(Arc::new(InferredSchema::build(&document, text, Path::new(path), top_level)))
    }

    #[test]
    fn test_first_schema_wins_and_description_falls_through() {
        let set = SchemaSet::new(
            vec![
                declared(r#"{ "properties": { "Foo": { "type": "bool" } } }"#, true),
                declared(r#"{ "properties": { "Foo": { "description": "The foo", "type": "int" } } }"#, false),
            ],
            false,
        );
        let foo = set.get_property("FOO").unwrap();
        assert_eq!(foo.kind.kind().scalar, crate::schema::ScalarKind::Bool);
        assert_eq!(foo.description.as_deref(), Some("The foo"));
    }

    #[test]
    fn test_untyped_symbol_takes_type_from_later_schema() {
        let set = SchemaSet::new(
            vec![
                inferred("<Project><PropertyGroup><Mode>x</Mode></PropertyGroup></Project>", "/a.proj", true),
                declared(
                    r#"{ "properties": { "Mode": {
                        "description": "The mode",
                        "type": [ "Fast", "Slow" ],
                        "default": "Fast",
                        "deprecationMessage": "Use Speed"
                    } } }"#,
                    false,
                ),
            ],
            false,
        );
        let mode = set.get_property("Mode").unwrap();
        assert!(mode.declared_at.is_some());
        assert!(mode.kind.custom_type().is_some_and(|t| t.value("slow").is_some()));
        assert_eq!(mode.default_value.as_deref(), Some("Fast"));
        assert_eq!(mode.deprecation_message.as_deref(), Some("Use Speed"));

        let listed = set.properties().into_iter().find(|p| p.name.matches("Mode")).unwrap();
        assert!(listed.kind.custom_type().is_some());
        assert!(listed.declared_at.is_some());
    }

    #[test]
    fn test_declared_before_inferred() {
        let set = SchemaSet::new(
            vec![
                declared(r#"{ "properties": { "Foo": "Declared" } }"#, false),
                inferred("<Project><PropertyGroup><Foo>1</Foo></PropertyGroup></Project>", "/a.proj", true),
            ],
            false,
        );
        let foo = set.get_property("Foo").unwrap();
        assert_eq!(foo.description.as_deref(), Some("Declared"));
        assert!(foo.declared_at.is_none());
        assert!(set.usage("Foo").contains(ReferenceUsage::WRITE));
    }

    #[test]
    fn test_private_names_hidden_from_imports_only() {
        let set = SchemaSet::new(
            vec![
                inferred("<Project><PropertyGroup><_Mine>1</_Mine></PropertyGroup></Project>", "/a.proj", true),
                inferred("<Project><PropertyGroup><_Theirs>1</_Theirs></PropertyGroup></Project>", "/b.targets", false),
            ],
            false,
        );
        let names: Vec<String> = set.properties().iter().map(|p| p.name.to_string()).collect();
        assert!(names.contains(&"_Mine".to_string()));
        assert!(!names.contains(&"_Theirs".to_string()));
        assert!(set.get_property("_Theirs").is_some());
        assert!(set.is_imported_private_property("_theirs"));

        let shown = SchemaSet::new(set.entries().to_vec(), true);
        assert!(shown.properties().iter().any(|p| p.name.matches("_Theirs")));
    }

    #[test]
    fn test_reserved_and_well_known_symbols() {
        let set = SchemaSet::new(Vec::new(), false);
        assert!(set.get_property("MSBuildProjectDirectory").unwrap().reserved);
        assert!(set.get_metadata(Some("Compile"), "Filename").is_some());
        assert!(set.metadata_for(&["Compile"]).iter().any(|m| m.name.matches("FullPath")));
        assert!(set.is_documented_property("msbuildthisfile"));
    }

    #[test]
    fn test_declared_task_wins() {
        let set = SchemaSet::new(
            vec![
                inferred(
                    "<Project><Target Name=\"B\"><Greet Extra=\"1\" /></Target></Project>",
                    "/a.proj",
                    true,
                ),
                inferred(
                    "<Project><UsingTask TaskName=\"Greet\" AssemblyFile=\"g.dll\" /></Project>",
                    "/b.targets",
                    false,
                ),
            ],
            false,
        );
        assert!(set.get_task("Greet").unwrap().is_declared());
        assert!(set.tasks().iter().all(|t| t.is_declared()));
    }

    #[test]
    fn test_configurations_and_comparands_are_unioned() {
        let set = SchemaSet::new(
            vec![
                inferred(
                    "<Project><PropertyGroup Condition=\"'$(Configuration)' == 'Debug'\" /></Project>",
                    "/a.proj",
                    true,
                ),
                inferred(
                    "<Project><PropertyGroup Condition=\"'$(Configuration)' == 'Release'\" /></Project>",
                    "/b.props",
                    false,
                ),
            ],
            false,
        );
        let configurations = set.configurations();
        assert!(configurations.contains("Debug") && configurations.contains("Release"));
        assert_eq!(set.comparand_values("configuration").len(), 2);
    }
}

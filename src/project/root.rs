//! The top-level document and everything it pulls in

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::AnalysisOptions;
use crate::diagnostics::{Diagnostic, DocumentValidator};
use crate::error::Cancelled;
use crate::parser::{NodeId, XmlDocument, parse_xml};
use crate::schema::{Builtins, Schema, SchemaEntry, SchemaSet};

use super::context::ParseContext;
use super::document::{Annotation, Document, Import};
use super::frameworks::{self, FRAMEWORK_PROPERTIES, FrameworkReference};
use super::imports::GraphBuilder;
use super::properties::{FileEvaluationContext, PropertyValueCollector};
use super::runtime::RuntimeInformation;
use super::sdk::SdkInfo;

/// A parsed project file with its resolved import graph, schemas and
/// diagnostics.
///
/// Immutable once built. A new edit produces a new `RootDocument`; the old
/// one is only read, as a cache of unchanged imports.
#[derive(Debug)]
pub struct RootDocument {
    pub document: Document,
    pub xml: XmlDocument,
    pub text: String,
    pub target_frameworks: Vec<FrameworkReference>,
    /// Every resolved import in the graph, by path
    pub resolved_imports: FxHashMap<PathBuf, Arc<Import>>,
    pub annotations: FxHashMap<NodeId, Vec<Annotation>>,
    pub diagnostics: Vec<Diagnostic>,
    pub builtin: Arc<Schema>,
    pub options: AnalysisOptions,
    /// Whether any `*.tasks` file was loaded from the tools path
    pub core_tasks_loaded: bool,
    /// Values of the properties that influence import paths
    pub property_values: PropertyValueCollector,
    runtime: Arc<dyn RuntimeInformation>,
    schemas: SchemaSet,
}

impl RootDocument {
    /// Parse `text` as the project at `path` and resolve its imports.
    ///
    /// Malformed XML never fails the parse; it shows up in
    /// [`diagnostics`](Self::diagnostics). The only error is cancellation.
    pub fn parse(
        path: &Path,
        text: impl Into<String>,
        previous: Option<&RootDocument>,
        cx: &ParseContext,
    ) -> Result<Self, Cancelled> {
        cx.check_cancelled()?;
        let text = text.into();
        let xml = parse_xml(&text);

        let mut values = PropertyValueCollector::new().with_max_values(cx.options.max_evaluation_permutations);
        values.watch_all(FRAMEWORK_PROPERTIES);
        let mut builder = GraphBuilder::new(cx, path, previous.map(|p| &p.resolved_imports), values);
        let document = builder.build_root(&text, &xml)?;
        let resolved_imports = builder.take_resolved();
        let core_tasks_loaded = builder.core_tasks_loaded;
        let annotations = builder.annotations;
        let mut diagnostics = builder.diagnostics;
        let mut values = builder.values;

        let mut target_frameworks = frameworks::target_frameworks(&values);
        if target_frameworks.is_empty()
            && let Some(previous) = previous
        {
            for name in FRAMEWORK_PROPERTIES {
                for value in previous.property_values.values(name) {
                    values.add(name, value.clone());
                }
            }
            target_frameworks = frameworks::target_frameworks(&values);
            if !target_frameworks.is_empty() {
                debug!(path = %path.display(), "target frameworks carried over from previous parse");
            }
        }

        let builtin = Arc::clone(&Builtins::get().schema);
        let schemas = schema_set(&document, &builtin, cx.options.show_private_symbols);
        let validation = DocumentValidator::new(&schemas, &cx.options)
            .with_core_tasks(core_tasks_loaded)
            .run(&xml, &text, &document.path, Some(&cx.cancel))?;
        diagnostics.extend(validation);
        let diagnostics = diagnostics.finish();

        debug!(
            path = %document.path.display(),
            imports = resolved_imports.len(),
            frameworks = target_frameworks.len(),
            diagnostics = diagnostics.len(),
            "parsed project"
        );
        Ok(Self {
            document,
            xml,
            text,
            target_frameworks,
            resolved_imports,
            annotations,
            diagnostics,
            builtin,
            options: cx.options.clone(),
            core_tasks_loaded,
            property_values: values,
            runtime: Arc::clone(&cx.runtime),
            schemas,
        })
    }

    pub fn path(&self) -> &Path {
        &self.document.path
    }

    /// Schemas of the whole graph in lookup order.
    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    pub fn annotations(&self, id: NodeId) -> &[Annotation] {
        self.annotations.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// What an `Import` element resolved to.
    pub fn imports_at(&self, id: NodeId) -> Option<&[Arc<Import>]> {
        self.annotations(id).iter().find_map(|annotation| match annotation {
            Annotation::Imports(imports) => Some(imports.as_slice()),
            Annotation::Sdk(_) => None,
        })
    }

    /// SDKs an element's `Sdk` attribute or `<Sdk>` element resolved to.
    pub fn sdks_at(&self, id: NodeId) -> impl Iterator<Item = &SdkInfo> {
        self.annotations(id).iter().filter_map(|annotation| match annotation {
            Annotation::Sdk(info) => Some(info),
            Annotation::Imports(_) => None,
        })
    }

    /// Context for evaluating expressions of the top-level document.
    pub fn evaluation_context(&self) -> FileEvaluationContext<'_> {
        let path = self.path();
        FileEvaluationContext::new(&self.property_values, path, path, self.runtime.as_ref())
    }

    /// All documents of the graph, depth-first from the top level.
    pub fn documents(&self) -> Vec<&Document> {
        self.document.descendants()
    }
}

/// Declared schemas first (top level, then imports depth-first), then
/// inferred schemas in the same order, then the builtin schema.
fn schema_set(document: &Document, builtin: &Arc<Schema>, show_private: bool) -> SchemaSet {
    let documents = document.descendants();
    let declared = documents.iter().filter_map(|d| {
        d.declared_schema.as_ref().map(|schema| SchemaEntry::Declared {
            schema: Arc::clone(schema),
            top_level: d.is_top_level,
        })
    });
    let inferred = documents.iter().map(|d| SchemaEntry::Inferred(Arc::clone(&d.inferred)));
    let entries = declared
        .chain(inferred)
        .chain(std::iter::once(SchemaEntry::BuiltIn(Arc::clone(builtin))))
        .collect();
    SchemaSet::new(entries, show_private)
}

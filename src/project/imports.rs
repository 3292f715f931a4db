//! Import graph construction
//!
//! Builds a [`Document`] per file, depth-first in evaluation order:
//!
//! ```text
//! build_document(file)
//!   ├─ extend the property watch-list from the file
//!   ├─ Sdk.props of each project SDK
//!   ├─ walk the body: collect watched property values, resolve each Import
//!   │     └─ build_document(imported file)      (recursion)
//!   ├─ Sdk.targets of each project SDK
//!   ├─ declared schema + inferred schema
//!   └─ top level only: sibling, schema and core-task imports
//! ```
//!
//! Every file is loaded at most once per build. Unchanged files from the
//! previous build are reused as-is.

use std::fs;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use text_size::TextRange;
use tracing::{debug, trace, warn};

use crate::base::NameMap;
use crate::diagnostics::{DiagnosticCollector, codes};
use crate::error::{Cancelled, VisitResult};
use crate::expression::{ExprNode, ExpressionOptions, evaluate, native_path, normalize, parse_expression};
use crate::parser::{NodeId, XElement, XmlDocument, parse_xml};
use crate::schema::{InferredSchema, InferredSchemaBuilder, Schema, TaskOrigin};
use crate::syntax::SyntaxKind;
use crate::visitor::{MsBuildVisitor, ResolvedAttribute, ResolvedElement, ValueContext, VisitContext, Walker};

use super::context::{BuildState, ParseContext};
use super::document::{Annotation, Document, Import, modified};
use super::properties::{FileEvaluationContext, PropertyValueCollector};
use super::sdk::{SdkInfo, SdkReference};

/// Builds the import graph of one top-level document.
pub(crate) struct GraphBuilder<'a> {
    cx: &'a ParseContext,
    previous: Option<&'a FxHashMap<PathBuf, Arc<Import>>>,
    project: PathBuf,
    state: BuildState,
    pub values: PropertyValueCollector,
    pub diagnostics: DiagnosticCollector,
    pub annotations: FxHashMap<NodeId, Vec<Annotation>>,
    pub core_tasks_loaded: bool,
}

/// A file being built.
struct Source<'s> {
    path: &'s Path,
    text: &'s str,
    xml: &'s XmlDocument,
    is_top_level: bool,
    /// SDK the file was imported from
    sdk: Option<&'s SdkInfo>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        cx: &'a ParseContext,
        project: &Path,
        previous: Option<&'a FxHashMap<PathBuf, Arc<Import>>>,
        values: PropertyValueCollector,
    ) -> Self {
        Self {
            cx,
            previous,
            project: normalize(project),
            state: BuildState::default(),
            values,
            diagnostics: DiagnosticCollector::new(),
            annotations: FxHashMap::default(),
            core_tasks_loaded: false,
        }
    }

    /// Every import resolved during the build, by path.
    pub fn take_resolved(&mut self) -> FxHashMap<PathBuf, Arc<Import>> {
        std::mem::take(&mut self.state.resolved)
    }

    /// Build the top-level document.
    pub fn build_root(&mut self, text: &str, xml: &XmlDocument) -> Result<Document, Cancelled> {
        let path = self.project.clone();
        self.build_document(&Source {
            path: &path,
            text,
            xml,
            is_top_level: true,
            sdk: None,
        })
    }

    fn build_document(&mut self, source: &Source<'_>) -> Result<Document, Cancelled> {
        self.cx.check_cancelled()?;
        self.state.in_progress.push(source.path.to_path_buf());
        self.state.imported.insert(source.path.to_path_buf());
        let document = self.build_document_contents(source);
        self.state.in_progress.pop();
        document
    }

    fn build_document_contents(&mut self, source: &Source<'_>) -> Result<Document, Cancelled> {
        let cx = self.cx;
        self.values.watch_document(source.xml, source.text);

        let sdks = self.project_sdks(source);
        let mut imports = Vec::new();
        for sdk in &sdks {
            imports.extend(self.import_sdk_file(source, sdk, "Sdk.props")?);
        }

        let mut visitor = ImportVisitor {
            builder: self,
            source,
            imports: Vec::new(),
            property_values: NameMap::new(),
        };
        let errors = Walker::new(source.xml, source.text, source.path)
            .with_cancellation(&cx.cancel)
            .run(&mut visitor)?;
        let ImportVisitor {
            imports: body,
            property_values,
            ..
        } = visitor;
        for error in errors {
            debug!(path = %source.path.display(), message = %error.message, "import walk failed on element");
        }
        imports.extend(body);

        for sdk in &sdks {
            imports.extend(self.import_sdk_file(source, sdk, "Sdk.targets")?);
        }

        let declared_schema = cx
            .schema_provider
            .schema_for(source.path, source.sdk.map(SdkInfo::name));
        let mut inferred = InferredSchemaBuilder::new(source.path, source.is_top_level).build(
            source.xml,
            source.text,
            Some(&cx.cancel),
        )?;
        self.define_tasks(source.path, &mut inferred);

        if source.is_top_level {
            imports.extend(self.implicit_imports(source, declared_schema.as_deref())?);
        }

        debug!(
            path = %source.path.display(),
            imports = imports.len(),
            declared = declared_schema.is_some(),
            "built document"
        );
        Ok(Document {
            path: source.path.to_path_buf(),
            is_top_level: source.is_top_level,
            imports,
            declared_schema,
            inferred: Arc::new(inferred),
            property_values,
        })
    }

    // ========================================================================
    // SDKS
    // ========================================================================

    /// SDKs named by `Project/@Sdk` and `<Sdk>` elements.
    fn project_sdks(&mut self, source: &Source<'_>) -> Vec<SdkInfo> {
        let xml = source.xml;
        let Some(root) = xml.root() else {
            return Vec::new();
        };
        let project = xml.element(root);
        if !project.is_named("Project") {
            return Vec::new();
        }

        let mut references = Vec::new();
        if let Some(attribute) = project.attribute("Sdk")
            && let Some(value) = &attribute.value
        {
            let range = attribute.value_range.unwrap_or(attribute.range);
            references.extend(SdkReference::parse_list(value).into_iter().map(|r| (r, range, root)));
        }
        for (id, element) in xml.children_named(root, "Sdk") {
            let Some(mut reference) = element.attribute_value("Name").and_then(SdkReference::parse) else {
                continue;
            };
            if let Some(version) = element.attribute_value("Version") {
                reference.version = Some(version.to_string());
            }
            if let Some(min) = element.attribute_value("MinimumVersion") {
                reference.min_version = Some(min.to_string());
            }
            references.push((reference, element.name_range, id));
        }

        let mut sdks = Vec::new();
        for (reference, range, id) in references {
            if let Some(info) = self.resolve_sdk(&reference, range, source.is_top_level) {
                if source.is_top_level {
                    self.annotate(id, Annotation::Sdk(info.clone()));
                }
                sdks.push(info);
            }
        }
        sdks
    }

    fn resolve_sdk(&mut self, reference: &SdkReference, range: TextRange, is_top_level: bool) -> Option<SdkInfo> {
        let paths = self.cx.sdk_resolver.resolve_sdk(reference, &self.project);
        if paths.is_empty() {
            if self.state.first_failure(format!("sdk:{}", reference.name.to_ascii_lowercase())) {
                warn!(sdk = %reference, "could not resolve SDK");
            }
            if is_top_level {
                self.diagnostics
                    .error(codes::SDK_UNRESOLVED, range, format!("Could not resolve SDK '{reference}'"));
            }
            return None;
        }
        Some(SdkInfo {
            reference: reference.clone(),
            paths,
        })
    }

    /// The implicit `Sdk.props` / `Sdk.targets` of an SDK.
    fn import_sdk_file(
        &mut self,
        source: &Source<'_>,
        sdk: &SdkInfo,
        file: &str,
    ) -> Result<Vec<Arc<Import>>, Cancelled> {
        let mut imports = Vec::new();
        for dir in &sdk.paths {
            let path = normalize(&dir.join(file));
            if !path.is_file() {
                trace!(path = %path.display(), "SDK has no {file}");
                continue;
            }
            let mut template = Import::unresolved(file, Some(sdk.name().to_string()));
            template.sdk_info = Some(sdk.clone());
            template.is_implicit = true;
            if let Some(import) = self.load_import(source, path, template, None)? {
                imports.push(import);
            }
        }
        Ok(imports)
    }

    // ========================================================================
    // IMPORT ELEMENTS
    // ========================================================================

    /// Resolve one `Import` element to the files it names.
    fn resolve_import_element(
        &mut self,
        source: &Source<'_>,
        id: NodeId,
        element: &XElement,
        conditioned: bool,
    ) -> Result<Vec<Arc<Import>>, Cancelled> {
        let Some(attribute) = element.attribute("Project") else {
            return Ok(Vec::new());
        };
        let expression = attribute.value.clone().unwrap_or_default();
        let range = attribute.value_range.unwrap_or(attribute.range);
        let node = parse_expression(
            &expression,
            ExpressionOptions::ITEMS | ExpressionOptions::METADATA,
            range.start(),
        );
        if node.has_items_or_metadata() {
            debug!(path = %source.path.display(), %expression, "import path references items or metadata");
            return Ok(Vec::new());
        }

        let sdk_name = element.attribute_value("Sdk").map(str::to_string);
        let (bases, sdk_info) = match &sdk_name {
            Some(name) => {
                let reference = SdkReference {
                    version: element.attribute_value("Version").map(str::to_string),
                    min_version: element.attribute_value("MinimumVersion").map(str::to_string),
                    ..SdkReference::new(name.trim())
                };
                let sdk_range = element
                    .attribute("Sdk")
                    .and_then(|a| a.value_range)
                    .unwrap_or(element.name_range);
                match self.resolve_sdk(&reference, sdk_range, source.is_top_level) {
                    Some(info) => {
                        if source.is_top_level {
                            self.annotate(id, Annotation::Sdk(info.clone()));
                        }
                        (info.paths.clone(), Some(info))
                    }
                    None => {
                        let placeholder = Arc::new(Import::unresolved(expression, sdk_name.clone()));
                        if source.is_top_level {
                            self.annotate(id, Annotation::Imports(vec![Arc::clone(&placeholder)]));
                        }
                        return Ok(vec![placeholder]);
                    }
                }
            }
            None => (source.path.parent().map(Path::to_path_buf).into_iter().collect(), None),
        };

        let candidates = self.evaluate_in(source, &node);
        let mut template = Import::unresolved(expression.clone(), sdk_name.clone());
        template.sdk_info = sdk_info.clone();

        let mut imports = Vec::new();
        let mut resolved = false;
        let mut is_wildcard = false;
        for candidate in &candidates {
            for base in &bases {
                let path = absolute(base, candidate);
                let path_text = path.to_string_lossy().into_owned();
                if path_text.contains(['*', '?']) {
                    let Some(expansion) = self.expand_wildcard(&path_text) else {
                        continue;
                    };
                    is_wildcard = true;
                    resolved |= expansion.directory_exists;
                    for file in expansion.files {
                        if let Some(import) = self.load_import(source, file, template.clone(), Some(range))? {
                            imports.push(import);
                        }
                    }
                } else if path.is_file() {
                    resolved = true;
                    if let Some(import) = self.load_import(source, path, template.clone(), Some(range))? {
                        imports.push(import);
                    }
                }
            }
        }

        if !resolved && !is_wildcard {
            if self.state.first_failure(format!("import:{}:{expression}", source.path.display())) {
                debug!(path = %source.path.display(), %expression, ?candidates, "could not resolve import");
            }
            if source.is_top_level && !conditioned {
                self.diagnostics.warning(
                    codes::IMPORT_UNRESOLVED,
                    range,
                    format!("Could not resolve import '{expression}'"),
                );
            }
            imports.push(Arc::new(template));
        }

        if source.is_top_level {
            self.annotate(id, Annotation::Imports(imports.clone()));
        }
        Ok(imports)
    }

    /// Evaluate an expression in the context of `source`.
    fn evaluate_in(&self, source: &Source<'_>, node: &ExprNode) -> Vec<String> {
        let context = FileEvaluationContext::new(&self.values, source.path, &self.project, self.cx.runtime.as_ref());
        match evaluate(node, &context, self.cx.options.max_evaluation_permutations) {
            Ok(values) => values.into_iter().filter(|v| !v.trim().is_empty()).collect(),
            Err(e) => {
                debug!(path = %source.path.display(), "cannot evaluate: {e}");
                Vec::new()
            }
        }
    }

    /// Files matching a wildcard import, or `None` if the path looks like
    /// the product of evaluating unknown properties.
    fn expand_wildcard(&self, path: &str) -> Option<WildcardExpansion> {
        let heuristic = self.cx.options.wildcard;
        let star = path.find(['*', '?'])?;
        let separator = path[..star].rfind(['/', '\\'])?;
        if star <= heuristic.min_star_offset
            || separator < heuristic.min_separator_offset
            || path[star..].contains(['/', '\\'])
        {
            debug!(%path, "discarding implausible wildcard import");
            return None;
        }
        let pattern = match glob::Pattern::new(&path[separator + 1..]) {
            Ok(pattern) => pattern,
            Err(e) => {
                debug!(%path, "invalid wildcard: {e}");
                return None;
            }
        };
        let directory = Path::new(&path[..separator]);
        let Ok(entries) = fs::read_dir(directory) else {
            return Some(WildcardExpansion {
                directory_exists: false,
                files: Vec::new(),
            });
        };
        let options = glob::MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|file| {
                file.is_file()
                    && file
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| pattern.matches_with(name, options))
            })
            .map(|file| normalize(&file))
            .collect();
        files.sort();
        Some(WildcardExpansion {
            directory_exists: true,
            files,
        })
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Load one resolved file as an import of `source`.
    ///
    /// Returns `None` for files already imported in this build and for
    /// cycles. `range` locates the importing expression for diagnostics.
    fn load_import(
        &mut self,
        source: &Source<'_>,
        path: PathBuf,
        template: Import,
        range: Option<TextRange>,
    ) -> Result<Option<Arc<Import>>, Cancelled> {
        self.cx.check_cancelled()?;
        if self.state.in_progress.contains(&path) {
            if source.is_top_level
                && let Some(range) = range
            {
                self.diagnostics.warning(
                    codes::CIRCULAR_IMPORT,
                    range,
                    format!("Circular import of '{}'", path.display()),
                );
            } else {
                debug!(path = %path.display(), from = %source.path.display(), "skipping circular import");
            }
            return Ok(None);
        }
        if self.state.imported.contains(&path) {
            trace!(path = %path.display(), "already imported");
            return Ok(None);
        }

        let timestamp = modified(&path);
        if let Some(previous) = self.previous.and_then(|previous| previous.get(&path))
            && timestamp.is_some()
            && previous.timestamp == timestamp
            && previous.is_unchanged()
        {
            let previous = Arc::clone(previous);
            trace!(path = %path.display(), "reusing unchanged import");
            self.register_reused(&previous);
            return Ok(Some(previous));
        }

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                if self.state.first_failure(format!("read:{}", path.display())) {
                    warn!(path = %path.display(), "could not read import: {e}");
                }
                self.state.imported.insert(path.clone());
                return Ok(Some(Arc::new(Import {
                    resolved_path: Some(path),
                    timestamp,
                    ..template
                })));
            }
        };
        let xml = parse_xml(&text);
        let sdk = template.sdk_info.clone().or_else(|| source.sdk.cloned());
        let document = self.build_document(&Source {
            path: &path,
            text: &text,
            xml: &xml,
            is_top_level: false,
            sdk: sdk.as_ref(),
        })?;
        let import = Arc::new(Import {
            resolved_path: Some(path.clone()),
            timestamp,
            document: Some(Arc::new(document)),
            ..template
        });
        self.state.resolved.insert(path, Arc::clone(&import));
        Ok(Some(import))
    }

    /// Mark a reused import subtree as loaded and replay its property values.
    fn register_reused(&mut self, import: &Arc<Import>) {
        let Some(path) = &import.resolved_path else {
            return;
        };
        self.state.imported.insert(path.clone());
        self.state.resolved.insert(path.clone(), Arc::clone(import));
        if let Some(document) = &import.document {
            self.values.merge(&document.property_values);
            for child in &document.imports {
                self.register_reused(child);
            }
        }
    }

    // ========================================================================
    // TOP-LEVEL EXTRAS
    // ========================================================================

    /// Imports the top-level document gets without asking for them.
    fn implicit_imports(
        &mut self,
        source: &Source<'_>,
        declared: Option<&Schema>,
    ) -> Result<Vec<Arc<Import>>, Cancelled> {
        let mut candidates = Vec::new();

        // a .targets file is usually edited alongside its .props, and vice versa
        let sibling = match source.path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("targets") => Some(source.path.with_extension("props")),
            Some(ext) if ext.eq_ignore_ascii_case("props") => Some(source.path.with_extension("targets")),
            _ => None,
        };
        candidates.extend(sibling.filter(|path| path.is_file()));

        if let Some(schema) = declared {
            for expression in &schema.intellisense_imports {
                let node = parse_expression(expression, ExpressionOptions::NONE, Default::default());
                let base = source.path.parent().unwrap_or(Path::new(""));
                for value in self.evaluate_in(source, &node) {
                    let path = absolute(base, &value);
                    if path.is_file() {
                        candidates.push(path);
                    } else {
                        debug!(path = %path.display(), "schema import not found");
                    }
                }
            }
        }

        let mut core_tasks = Vec::new();
        if self.cx.options.load_core_tasks
            && let Some(tools) = self.cx.runtime.tools_path()
        {
            match fs::read_dir(tools) {
                Ok(entries) => {
                    core_tasks = entries
                        .filter_map(Result::ok)
                        .map(|entry| entry.path())
                        .filter(|path| {
                            path.is_file()
                                && path.extension().and_then(|e| e.to_str()).is_some_and(|ext| {
                                    ext.eq_ignore_ascii_case("tasks") || ext.eq_ignore_ascii_case("overridetasks")
                                })
                        })
                        .map(|path| normalize(&path))
                        .collect();
                    core_tasks.sort();
                }
                Err(e) => debug!(path = %tools.display(), "no core tasks: {e}"),
            }
        }
        self.core_tasks_loaded = !core_tasks.is_empty();
        candidates.extend(core_tasks);

        let mut imports = Vec::new();
        for path in candidates {
            let path = normalize(&path);
            let mut template = Import::unresolved(path.display().to_string(), None);
            template.is_implicit = true;
            if let Some(import) = self.load_import(source, path, template, None)? {
                imports.push(import);
            }
        }
        Ok(imports)
    }

    /// Fill in parameters of tasks declared by assembly from the host.
    fn define_tasks(&self, path: &Path, inferred: &mut InferredSchema) {
        let Some(provider) = &self.cx.task_provider else {
            return;
        };
        let base = path.parent().unwrap_or(Path::new(""));
        for task in inferred.tasks_mut().values_mut() {
            let TaskOrigin::Declared {
                assembly: Some(assembly),
                ..
            } = &task.origin
            else {
                continue;
            };
            if task.has_declared_parameters {
                continue;
            }
            let node = parse_expression(assembly, ExpressionOptions::NONE, Default::default());
            let context = FileEvaluationContext::new(&self.values, path, &self.project, self.cx.runtime.as_ref());
            let Ok(values) = evaluate(&node, &context, 1) else {
                continue;
            };
            let Some(assembly) = values.first().map(|value| absolute(base, value)) else {
                continue;
            };
            if let Some(definition) = provider.task_definition(task, &assembly) {
                trace!(task = %task.name, assembly = %assembly.display(), "task defined by host");
                task.parameters = definition.parameters;
                task.has_declared_parameters = definition.has_declared_parameters;
                if task.description.is_none() {
                    task.description = definition.description;
                }
            }
        }
    }

    fn annotate(&mut self, id: NodeId, annotation: Annotation) {
        self.annotations.entry(id).or_default().push(annotation);
    }
}

struct WildcardExpansion {
    directory_exists: bool,
    files: Vec<PathBuf>,
}

/// Resolve an evaluated path against `base`, lexically normalized.
fn absolute(base: &Path, value: &str) -> PathBuf {
    let native = native_path(value.trim());
    let path = Path::new(&native);
    if path.is_absolute() || native.starts_with(MAIN_SEPARATOR) {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

// ============================================================================
// BODY WALK
// ============================================================================

/// Resolves imports and records property values in document order.
struct ImportVisitor<'b, 'a, 's> {
    builder: &'b mut GraphBuilder<'a>,
    source: &'b Source<'s>,
    imports: Vec<Arc<Import>>,
    property_values: NameMap<Vec<String>>,
}

impl MsBuildVisitor for ImportVisitor<'_, '_, '_> {
    fn visit_resolved_element(&mut self, cx: &VisitContext<'_>, element: &ResolvedElement<'_>) -> VisitResult {
        if element.in_target || element.kind() != SyntaxKind::Import {
            return Ok(());
        }
        let conditioned = element.element.attribute("Condition").is_some()
            || element
                .parent
                .is_some_and(|(parent, _)| cx.document.element(parent).attribute("Condition").is_some());
        let imports = self
            .builder
            .resolve_import_element(self.source, element.id, element.element, conditioned)?;
        self.imports.extend(imports);
        Ok(())
    }

    fn visit_value_expression(
        &mut self,
        _cx: &VisitContext<'_>,
        element: &ResolvedElement<'_>,
        attribute: Option<&ResolvedAttribute<'_>>,
        _value: &ValueContext<'_>,
        node: &ExprNode,
    ) -> VisitResult {
        if attribute.is_some() || element.in_target || element.kind() != SyntaxKind::Property {
            return Ok(());
        }
        let name = element.name();
        if !self.builder.values.is_watched(name) {
            return Ok(());
        }
        for value in self.builder.evaluate_in(self.source, node) {
            let recorded = self.property_values.get_or_insert_with(name, Vec::new);
            if !recorded.contains(&value) {
                recorded.push(value.clone());
            }
            self.builder.values.add(name, value);
        }
        Ok(())
    }
}

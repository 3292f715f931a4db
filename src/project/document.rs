//! Documents of the import graph

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::base::NameMap;
use crate::schema::{InferredSchema, Schema};

use super::sdk::SdkInfo;

/// One file of the import graph and what it contributes.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub is_top_level: bool,
    /// Imports in evaluation order, implicit ones included
    pub imports: Vec<Arc<Import>>,
    pub declared_schema: Option<Arc<Schema>>,
    pub inferred: Arc<InferredSchema>,
    /// Values this file assigned to watched properties
    pub property_values: NameMap<Vec<String>>,
}

impl Document {
    /// This document and every document it imports, depth-first.
    pub fn descendants(&self) -> Vec<&Document> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Document>) {
        out.push(self);
        for import in &self.imports {
            if let Some(document) = &import.document {
                document.collect(out);
            }
        }
    }
}

/// One `Import` resolved to (at most) one file.
///
/// An import that resolves to several files produces one `Import` per file.
/// One that resolves to nothing is kept with no path so the editor can still
/// show what was attempted.
#[derive(Debug, Clone)]
pub struct Import {
    /// `Project` value as written
    pub expression: String,
    /// SDK name for SDK-relative imports
    pub sdk: Option<String>,
    pub resolved_path: Option<PathBuf>,
    pub sdk_info: Option<SdkInfo>,
    /// Modification time when the file was read
    pub timestamp: Option<SystemTime>,
    pub document: Option<Arc<Document>>,
    /// Added by the engine rather than written in the file
    pub is_implicit: bool,
}

impl Import {
    pub fn unresolved(expression: impl Into<String>, sdk: Option<String>) -> Self {
        Self {
            expression: expression.into(),
            sdk,
            resolved_path: None,
            sdk_info: None,
            timestamp: None,
            document: None,
            is_implicit: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_path.is_some()
    }

    /// Whether this import and all its descendants still have the
    /// modification times they were read with.
    pub fn is_unchanged(&self) -> bool {
        let Some(path) = &self.resolved_path else {
            return true;
        };
        if self.timestamp.is_none() || modified(path) != self.timestamp {
            return false;
        }
        self.document
            .as_ref()
            .is_none_or(|document| document.imports.iter().all(|import| import.is_unchanged()))
    }
}

/// Two imports are equal when they describe the same resolution and share
/// the same parsed document.
impl PartialEq for Import {
    fn eq(&self, other: &Self) -> bool {
        let same_document = match (&self.document, &other.document) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_document
            && self.expression == other.expression
            && self.sdk == other.sdk
            && self.resolved_path == other.resolved_path
            && self.sdk_info == other.sdk_info
            && self.timestamp == other.timestamp
            && self.is_implicit == other.is_implicit
    }
}

/// Modification time of `path`, if it can be read.
pub(crate) fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Extra information attached to elements of the top-level document.
#[derive(Debug, Clone)]
pub enum Annotation {
    /// What an `Import` element resolved to
    Imports(Vec<Arc<Import>>),
    /// The SDK an `Sdk` attribute or element resolved to
    Sdk(SdkInfo),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_xml;

    fn document(path: &Path, imports: Vec<Arc<Import>>) -> Document {
        let xml = parse_xml("<Project />");
        Document {
            path: path.to_path_buf(),
            is_top_level: false,
            imports,
            declared_schema: None,
            inferred: Arc::new(InferredSchema::build(&xml, "<Project />", path, false)),
            property_values: NameMap::new(),
        }
    }

    fn import_of(path: &Path, imports: Vec<Arc<Import>>) -> Arc<Import> {
        Arc::new(Import {
            resolved_path: Some(path.to_path_buf()),
            timestamp: modified(path),
            document: Some(Arc::new(document(path, imports))),
            ..Import::unresolved(path.display().to_string(), None)
        })
    }

    #[test]
    fn test_unchanged_checks_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("outer.props");
        let inner = dir.path().join("inner.props");
        fs::write(&outer, "<Project />").unwrap();
        fs::write(&inner, "<Project />").unwrap();

        let import = import_of(&outer, vec![import_of(&inner, vec![])]);
        assert!(import.is_unchanged());

        fs::remove_file(&inner).unwrap();
        assert!(!import.is_unchanged());
    }

    #[test]
    fn test_unresolved_import_is_unchanged() {
        let import = Import::unresolved("$(Missing)\\x.props", None);
        assert!(!import.is_resolved());
        assert!(import.is_unchanged());
    }

    #[test]
    fn test_descendants_depth_first() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.props");
        let b = dir.path().join("b.props");
        let c = dir.path().join("c.props");
        for path in [&a, &b, &c] {
            fs::write(path, "<Project />").unwrap();
        }
        let root = document(dir.path(), vec![import_of(&a, vec![import_of(&b, vec![])]), import_of(&c, vec![])]);
        let order: Vec<_> = root.descendants().into_iter().map(|d| d.path.clone()).collect();
        assert_eq!(order, vec![dir.path().to_path_buf(), a, b, c]);
    }
}

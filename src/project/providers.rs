//! Host collaborators that supply schemas and task definitions

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::schema::{BuiltInSchemas, Schema, TaskInfo};

/// Finds the declared schema for a file.
pub trait SchemaProvider: Debug + Send + Sync {
    /// Schema for `path`, imported from the SDK `sdk_id` if any.
    fn schema_for(&self, path: &Path, sdk_id: Option<&str>) -> Option<Arc<Schema>>;
}

/// Looks for `<file name>.buildschema.json` beside the file, then falls back
/// to the embedded schemas for well-known file names.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSchemaProvider;

impl FileSchemaProvider {
    /// Path of the schema file that documents `path`.
    pub fn schema_path(path: &Path) -> Option<PathBuf> {
        let mut name = path.file_name()?.to_os_string();
        name.push(".buildschema.json");
        Some(path.with_file_name(name))
    }
}

impl SchemaProvider for FileSchemaProvider {
    fn schema_for(&self, path: &Path, sdk_id: Option<&str>) -> Option<Arc<Schema>> {
        if let Some(schema_path) = Self::schema_path(path)
            && schema_path.is_file()
        {
            match Schema::load(&schema_path) {
                Ok(schema) => {
                    debug!(path = %schema_path.display(), "loaded schema");
                    return Some(Arc::new(schema));
                }
                Err(e) => warn!(path = %schema_path.display(), "ignoring schema: {e}"),
            }
        }
        BuiltInSchemas::for_file(path, sdk_id)
    }
}

/// Supplies parameter lists for tasks implemented in compiled assemblies.
///
/// `UsingTask` elements without a `ParameterGroup` only name an assembly; a
/// host that can inspect assemblies fills in the parameters.
pub trait TaskDefinitionProvider: Debug + Send + Sync {
    /// The full definition of `task` from `assembly`, or `None` if unknown.
    fn task_definition(&self, task: &TaskInfo, assembly: &Path) -> Option<TaskInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MsBuildSchema;

    #[test]
    fn test_schema_path_appends_suffix() {
        assert_eq!(
            FileSchemaProvider::schema_path(Path::new("/a/Custom.targets")),
            Some(PathBuf::from("/a/Custom.targets.buildschema.json"))
        );
    }

    #[test]
    fn test_schema_beside_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Custom.targets");
        std::fs::write(&file, "<Project />").unwrap();
        std::fs::write(
            dir.path().join("Custom.targets.buildschema.json"),
            r#"{ "properties": { "CustomProp": "A custom property" } }"#,
        )
        .unwrap();

        let schema = FileSchemaProvider.schema_for(&file, None).unwrap();
        assert!(schema.properties().contains("customprop"));
    }

    #[test]
    fn test_invalid_schema_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Other.targets");
        std::fs::write(dir.path().join("Other.targets.buildschema.json"), "{ not json").unwrap();
        assert!(FileSchemaProvider.schema_for(&file, None).is_none());
    }
}

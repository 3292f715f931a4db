//! Information about the MSBuild installation
//!
//! The engine never runs MSBuild, but import paths refer to its install
//! locations (`$(MSBuildBinPath)`, `$(MSBuildExtensionsPath)`, the SDKs
//! directory), so the host describes them.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Install locations of the build tools.
pub trait RuntimeInformation: Debug + Send + Sync {
    /// Directory containing the MSBuild binaries
    fn binpath(&self) -> Option<&Path>;

    /// Directory containing `Microsoft.Common.targets` and the `*.tasks` files
    fn tools_path(&self) -> Option<&Path>;

    /// Candidate values of `$(MSBuildExtensionsPath)`, searched in order
    fn extensions_paths(&self) -> &[PathBuf];

    /// Directory of SDKs shipped with MSBuild, one subdirectory per SDK
    fn sdks_path(&self) -> Option<&Path>;

    /// SDKs known by name, mapped to their `Sdk` directories
    fn sdk_registry(&self) -> &[(String, PathBuf)];

    fn tools_version(&self) -> &str;
}

/// A [`RuntimeInformation`] backed by plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRuntimeInformation {
    pub binpath: Option<PathBuf>,
    pub tools_path: Option<PathBuf>,
    pub extensions_paths: Vec<PathBuf>,
    pub sdks_path: Option<PathBuf>,
    pub sdk_registry: Vec<(String, PathBuf)>,
    pub tools_version: String,
}

impl Default for StaticRuntimeInformation {
    fn default() -> Self {
        Self {
            binpath: None,
            tools_path: None,
            extensions_paths: Vec::new(),
            sdks_path: None,
            sdk_registry: Vec::new(),
            tools_version: "Current".to_string(),
        }
    }
}

impl StaticRuntimeInformation {
    /// Runtime rooted at one MSBuild `bin` directory, laid out like an install:
    /// tools next to the binaries, SDKs in `Sdks/`, extensions one level up.
    pub fn from_binpath(binpath: impl Into<PathBuf>) -> Self {
        let binpath = binpath.into();
        let extensions = binpath.parent().map(Path::to_path_buf).into_iter().collect();
        Self {
            tools_path: Some(binpath.clone()),
            sdks_path: Some(binpath.join("Sdks")),
            extensions_paths: extensions,
            binpath: Some(binpath),
            ..Default::default()
        }
    }

    pub fn with_sdk(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.sdk_registry.push((name.into(), path.into()));
        self
    }
}

impl RuntimeInformation for StaticRuntimeInformation {
    fn binpath(&self) -> Option<&Path> {
        self.binpath.as_deref()
    }

    fn tools_path(&self) -> Option<&Path> {
        self.tools_path.as_deref()
    }

    fn extensions_paths(&self) -> &[PathBuf] {
        &self.extensions_paths
    }

    fn sdks_path(&self) -> Option<&Path> {
        self.sdks_path.as_deref()
    }

    fn sdk_registry(&self) -> &[(String, PathBuf)] {
        &self.sdk_registry
    }

    fn tools_version(&self) -> &str {
        &self.tools_version
    }
}

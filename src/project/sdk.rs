//! SDK references and resolution
//!
//! An SDK is a named bundle of `Sdk.props` / `Sdk.targets` that a project
//! imports implicitly. References come from `Project/@Sdk`, `<Sdk>` elements
//! and `Import/@Sdk`, and are written `Name`, `Name/Version` or
//! `Name/min=Version`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::runtime::RuntimeInformation;

/// A reference to an SDK by name and optional version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SdkReference {
    pub name: String,
    pub version: Option<String>,
    pub min_version: Option<String>,
}

impl SdkReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            min_version: None,
        }
    }

    /// Parse `Name`, `Name/Version` or `Name/min=Version`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (name, version) = match text.split_once('/') {
            Some((name, version)) => (name.trim(), Some(version.trim())),
            None => (text, None),
        };
        if name.is_empty() {
            return None;
        }
        let mut reference = Self::new(name);
        if let Some(v) = version.filter(|v| !v.is_empty()) {
            match v.strip_prefix("min=") {
                Some(min) => reference.min_version = Some(min.trim().to_string()),
                None => reference.version = Some(v.to_string()),
            }
        }
        Some(reference)
    }

    /// Parse a semicolon-separated `Project/@Sdk` value.
    pub fn parse_list(text: &str) -> Vec<Self> {
        text.split(';').filter_map(Self::parse).collect()
    }
}

impl fmt::Display for SdkReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, "/{version}")?;
        } else if let Some(min) = &self.min_version {
            write!(f, "/min={min}")?;
        }
        Ok(())
    }
}

/// A resolved SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkInfo {
    pub reference: SdkReference,
    /// `Sdk` directories containing `Sdk.props` and `Sdk.targets`
    pub paths: Vec<PathBuf>,
}

impl SdkInfo {
    pub fn name(&self) -> &str {
        &self.reference.name
    }
}

/// Finds SDK directories. Supplied by the host.
pub trait SdkResolver: fmt::Debug + Send + Sync {
    /// Directories for `sdk` as seen from `project`; empty if unresolved.
    fn resolve_sdk(&self, sdk: &SdkReference, project: &Path) -> Vec<PathBuf>;
}

/// Resolves SDKs from the runtime's registry, then from its SDKs directory.
#[derive(Debug, Clone)]
pub struct RegistrySdkResolver {
    runtime: Arc<dyn RuntimeInformation>,
}

impl RegistrySdkResolver {
    pub fn new(runtime: Arc<dyn RuntimeInformation>) -> Self {
        Self { runtime }
    }
}

impl SdkResolver for RegistrySdkResolver {
    fn resolve_sdk(&self, sdk: &SdkReference, _project: &Path) -> Vec<PathBuf> {
        let registered: Vec<PathBuf> = self
            .runtime
            .sdk_registry()
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(&sdk.name))
            .map(|(_, path)| path.clone())
            .collect();
        if !registered.is_empty() {
            return registered;
        }
        self.runtime
            .sdks_path()
            .map(|sdks| sdks.join(&sdk.name).join("Sdk"))
            .filter(|dir| dir.is_dir())
            .into_iter()
            .collect()
    }
}

//! Value kinds: the type tags attached to every symbol
//!
//! A [`ValueKind`] is a scalar kind plus list/literal modifiers. The
//! kebab-case type names used in schema files are fixed; existing schemas
//! depend on them.

use std::sync::Arc;

use bitflags::bitflags;

use super::symbols::CustomTypeInfo;
use crate::error::SchemaError;
use crate::expression::{ListKind, ListPermission};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScalarKind {
    #[default]
    Unknown,
    Nothing,
    Data,
    Bool,
    Int,
    Float,
    String,
    Char,
    Guid,
    Url,
    Version,
    VersionSuffixed,
    Lcid,
    DateTime,
    Object,
    TargetName,
    ItemName,
    PropertyName,
    MetadataName,
    TaskName,
    Sdk,
    SdkVersion,
    Label,
    Importance,
    RuntimeId,
    TargetFramework,
    TargetFrameworkIdentifier,
    TargetFrameworkVersion,
    TargetFrameworkProfile,
    TargetFrameworkMoniker,
    NuGetId,
    NuGetVersion,
    ProjectFile,
    File,
    Folder,
    FolderWithSlash,
    FileOrFolder,
    Extension,
    Configuration,
    Platform,
    ProjectKindGuid,
    ClrNamespace,
    ClrType,
    ClrTypeName,
    Culture,
    HostOS,
    HostRuntime,
    WarningCode,
    Condition,
    CustomType,
}

const TYPE_NAMES: &[(&str, ScalarKind)] = &[
    ("bool", ScalarKind::Bool),
    ("int", ScalarKind::Int),
    ("float", ScalarKind::Float),
    ("string", ScalarKind::String),
    ("char", ScalarKind::Char),
    ("guid", ScalarKind::Guid),
    ("url", ScalarKind::Url),
    ("version", ScalarKind::Version),
    ("version-suffixed", ScalarKind::VersionSuffixed),
    ("lcid", ScalarKind::Lcid),
    ("datetime", ScalarKind::DateTime),
    ("object", ScalarKind::Object),
    ("data", ScalarKind::Data),
    ("target-name", ScalarKind::TargetName),
    ("item-name", ScalarKind::ItemName),
    ("property-name", ScalarKind::PropertyName),
    ("metadata-name", ScalarKind::MetadataName),
    ("task-name", ScalarKind::TaskName),
    ("sdk", ScalarKind::Sdk),
    ("sdk-version", ScalarKind::SdkVersion),
    ("label", ScalarKind::Label),
    ("importance", ScalarKind::Importance),
    ("runtime-id", ScalarKind::RuntimeId),
    ("target-framework", ScalarKind::TargetFramework),
    ("target-framework-identifier", ScalarKind::TargetFrameworkIdentifier),
    ("target-framework-version", ScalarKind::TargetFrameworkVersion),
    ("target-framework-profile", ScalarKind::TargetFrameworkProfile),
    ("target-framework-moniker", ScalarKind::TargetFrameworkMoniker),
    ("nuget-id", ScalarKind::NuGetId),
    ("nuget-version", ScalarKind::NuGetVersion),
    ("project-file", ScalarKind::ProjectFile),
    ("file", ScalarKind::File),
    ("folder", ScalarKind::Folder),
    ("folder-with-slash", ScalarKind::FolderWithSlash),
    ("file-or-folder", ScalarKind::FileOrFolder),
    ("extension", ScalarKind::Extension),
    ("configuration", ScalarKind::Configuration),
    ("platform", ScalarKind::Platform),
    ("project-kind-guid", ScalarKind::ProjectKindGuid),
    ("clr-namespace", ScalarKind::ClrNamespace),
    ("clr-type", ScalarKind::ClrType),
    ("clr-type-name", ScalarKind::ClrTypeName),
    ("culture", ScalarKind::Culture),
    ("host-os", ScalarKind::HostOS),
    ("host-runtime", ScalarKind::HostRuntime),
    ("warning-code", ScalarKind::WarningCode),
    ("condition", ScalarKind::Condition),
];

impl ScalarKind {
    /// Look up a schema-file type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        TYPE_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, kind)| kind)
    }

    /// The schema-file type name, if this kind has one.
    pub fn type_name(self) -> Option<&'static str> {
        TYPE_NAMES.iter().find(|&&(_, k)| k == self).map(|&(n, _)| n)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KindModifiers: u8 {
        /// Semicolon-separated list
        const LIST = 1;
        /// Comma-separated list
        const COMMA_LIST = 1 << 1;
        /// Expressions are not permitted, only literal text
        const LITERAL = 1 << 2;
    }
}

/// A scalar kind with list and literal modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValueKind {
    pub scalar: ScalarKind,
    pub modifiers: KindModifiers,
}

impl ValueKind {
    pub const UNKNOWN: Self = Self::new(ScalarKind::Unknown);
    pub const NOTHING: Self = Self::new(ScalarKind::Nothing);

    pub const fn new(scalar: ScalarKind) -> Self {
        Self {
            scalar,
            modifiers: KindModifiers::empty(),
        }
    }

    /// Parse a schema-file type name.
    pub fn parse_type_name(name: &str) -> Result<Self, SchemaError> {
        ScalarKind::from_type_name(name)
            .map(Self::new)
            .ok_or_else(|| SchemaError::InvalidType(name.to_string()))
    }

    pub fn type_name(self) -> Option<&'static str> {
        self.scalar.type_name()
    }

    pub const fn with_list(self) -> Self {
        Self {
            scalar: self.scalar,
            modifiers: self.modifiers.union(KindModifiers::LIST),
        }
    }

    pub const fn with_comma_list(self) -> Self {
        Self {
            scalar: self.scalar,
            modifiers: self.modifiers.union(KindModifiers::COMMA_LIST),
        }
    }

    pub const fn literal(self) -> Self {
        Self {
            scalar: self.scalar,
            modifiers: self.modifiers.union(KindModifiers::LITERAL),
        }
    }

    pub fn is_list(self) -> bool {
        self.modifiers
            .intersects(KindModifiers::LIST | KindModifiers::COMMA_LIST)
    }

    pub fn is_literal(self) -> bool {
        self.modifiers.contains(KindModifiers::LITERAL)
    }

    pub fn allows_lists(self, kind: ListKind) -> bool {
        match kind {
            ListKind::Semicolon => self.modifiers.contains(KindModifiers::LIST),
            ListKind::Comma => self.modifiers.contains(KindModifiers::COMMA_LIST),
        }
    }

    pub fn is_path_like(self) -> bool {
        matches!(
            self.scalar,
            ScalarKind::File
                | ScalarKind::Folder
                | ScalarKind::FolderWithSlash
                | ScalarKind::FileOrFolder
                | ScalarKind::ProjectFile
        )
    }

    /// Check a literal (already split from any list) against this kind.
    /// Returns a description of the problem, if any.
    pub fn validate_literal(self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let ok = match self.scalar {
            ScalarKind::Bool => value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false"),
            ScalarKind::Int | ScalarKind::Lcid => value.parse::<i64>().is_ok(),
            ScalarKind::Float => value.parse::<f64>().is_ok(),
            ScalarKind::Char => value.chars().count() == 1,
            ScalarKind::Guid | ScalarKind::ProjectKindGuid => is_guid(value),
            ScalarKind::Version | ScalarKind::TargetFrameworkVersion => {
                is_version(value.strip_prefix('v').unwrap_or(value))
            }
            ScalarKind::VersionSuffixed | ScalarKind::SdkVersion | ScalarKind::NuGetVersion => {
                let core = value.split(['-', '+']).next().unwrap_or(value);
                is_version(core) || is_numeric_prefix(core)
            }
            ScalarKind::Url => value.contains("://"),
            _ => true,
        };
        (!ok).then(|| {
            let kind = self.type_name().unwrap_or("value");
            format!("'{value}' is not a valid {kind}")
        })
    }
}

impl ListPermission for ValueKind {
    fn allows_list(&self, kind: ListKind) -> bool {
        self.allows_lists(kind)
    }
}

fn is_version(value: &str) -> bool {
    let parts: Vec<_> = value.split('.').collect();
    (2..=4).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

fn is_numeric_prefix(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_guid(value: &str) -> bool {
    let inner = value
        .strip_prefix('{')
        .and_then(|v| v.strip_suffix('}'))
        .unwrap_or(value);
    let groups: Vec<_> = inner.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    groups.len() == lengths.len()
        && groups
            .iter()
            .zip(lengths)
            .all(|(g, len)| g.len() == len && g.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// A value kind together with its custom type, when it has one.
///
/// The custom type is present exactly when the scalar kind is
/// [`ScalarKind::CustomType`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedKind {
    kind: ValueKind,
    custom_type: Option<Arc<CustomTypeInfo>>,
}

impl TypedKind {
    pub fn new(kind: ValueKind, custom_type: Option<Arc<CustomTypeInfo>>) -> Result<Self, SchemaError> {
        if (kind.scalar == ScalarKind::CustomType) != custom_type.is_some() {
            return Err(SchemaError::CustomTypeMismatch);
        }
        Ok(Self { kind, custom_type })
    }

    pub fn custom(custom_type: Arc<CustomTypeInfo>, modifiers: KindModifiers) -> Self {
        Self {
            kind: ValueKind {
                scalar: ScalarKind::CustomType,
                modifiers,
            },
            custom_type: Some(custom_type),
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn custom_type(&self) -> Option<&Arc<CustomTypeInfo>> {
        self.custom_type.as_ref()
    }

    /// Same kind and custom type with extra modifiers.
    pub fn with_modifiers(&self, modifiers: KindModifiers) -> Self {
        Self {
            kind: ValueKind {
                scalar: self.kind.scalar,
                modifiers: self.kind.modifiers | modifiers,
            },
            custom_type: self.custom_type.clone(),
        }
    }
}

impl From<ValueKind> for TypedKind {
    /// Non-custom kinds only; a bare `CustomType` kind maps to `Unknown`.
    fn from(kind: ValueKind) -> Self {
        if kind.scalar == ScalarKind::CustomType {
            return Self::default();
        }
        Self {
            kind,
            custom_type: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_type_name_table_round_trip() {
        for (name, kind) in TYPE_NAMES {
            assert_eq!(ScalarKind::from_type_name(name), Some(*kind));
            assert_eq!(kind.type_name(), Some(*name));
        }
    }

    #[test]
    fn test_unknown_type_name() {
        assert!(matches!(
            ValueKind::parse_type_name("filename"),
            Err(SchemaError::InvalidType(_))
        ));
    }

    #[rstest]
    #[case(ScalarKind::Bool, "True", true)]
    #[case(ScalarKind::Bool, "yes", false)]
    #[case(ScalarKind::Int, "42", true)]
    #[case(ScalarKind::Int, "4x2", false)]
    #[case(ScalarKind::Guid, "{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}", true)]
    #[case(ScalarKind::Guid, "FAE04EC0-301F", false)]
    #[case(ScalarKind::Version, "1.2.3", true)]
    #[case(ScalarKind::Version, "1", false)]
    #[case(ScalarKind::NuGetVersion, "1.0.0-beta.2", true)]
    #[case(ScalarKind::Url, "https://example.com", true)]
    #[case(ScalarKind::String, "anything", true)]
    fn test_validate_literal(#[case] scalar: ScalarKind, #[case] value: &str, #[case] valid: bool) {
        assert_eq!(ValueKind::new(scalar).validate_literal(value).is_none(), valid);
    }

    #[test]
    fn test_list_modifiers() {
        let kind = ValueKind::new(ScalarKind::File).with_list();
        assert!(kind.is_list());
        assert!(kind.allows_lists(ListKind::Semicolon));
        assert!(!kind.allows_lists(ListKind::Comma));
        assert!(kind.is_path_like());
    }

    #[test]
    fn test_custom_type_invariant() {
        let custom = Arc::new(CustomTypeInfo::default());
        assert!(TypedKind::new(ValueKind::new(ScalarKind::CustomType), Some(custom.clone())).is_ok());
        assert!(matches!(
            TypedKind::new(ValueKind::new(ScalarKind::String), Some(custom)),
            Err(SchemaError::CustomTypeMismatch)
        ));
        assert!(matches!(
            TypedKind::new(ValueKind::new(ScalarKind::CustomType), None),
            Err(SchemaError::CustomTypeMismatch)
        ));
    }
}

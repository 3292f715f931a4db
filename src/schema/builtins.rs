//! Knowledge built into MSBuild itself
//!
//! Reserved properties, well-known item metadata, the functions usable in
//! expressions, and a common-properties schema. Also the embedded schemas
//! for well-known targets files, so that projects get completion even when
//! no schema file sits next to the imported file.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use tracing::warn;

use super::symbols::{ClassInfo, FunctionInfo, FunctionKind, MetadataInfo, PropertyInfo};
use super::value_kind::{ScalarKind, ValueKind};
use super::{Schema, SchemaOrigin};
use crate::base::{Name, NameMap};

const COMMON_SCHEMA: &str = include_str!("resources/common.buildschema.json");

/// Embedded schemas keyed by the file they describe.
const EMBEDDED_SCHEMAS: &[(&str, Option<&str>, &str)] = &[
    (
        "Microsoft.Common.targets",
        None,
        include_str!("resources/Microsoft.Common.targets.buildschema.json"),
    ),
    (
        "Microsoft.Common.CurrentVersion.targets",
        None,
        include_str!("resources/Microsoft.Common.targets.buildschema.json"),
    ),
    (
        "Microsoft.CSharp.targets",
        None,
        include_str!("resources/Microsoft.CSharp.targets.buildschema.json"),
    ),
    (
        "Microsoft.CSharp.CurrentVersion.targets",
        None,
        include_str!("resources/Microsoft.CSharp.targets.buildschema.json"),
    ),
    (
        "Sdk.props",
        Some("Microsoft.NET.Sdk"),
        include_str!("resources/NetSdk.buildschema.json"),
    ),
];

fn parse_embedded(name: &str, text: &str) -> Schema {
    match Schema::from_json_str(text, SchemaOrigin::BuiltIn) {
        Ok(schema) => schema,
        Err(error) => {
            warn!(schema = name, %error, "embedded schema failed to load");
            Schema::empty(SchemaOrigin::BuiltIn)
        }
    }
}

/// Schemas shipped with the library for well-known files.
pub struct BuiltInSchemas;

static EMBEDDED: LazyLock<Vec<(Name, Option<Name>, Arc<Schema>)>> = LazyLock::new(|| {
    EMBEDDED_SCHEMAS
        .iter()
        .map(|&(file, sdk, text)| (Name::new(file), sdk.map(Name::new), Arc::new(parse_embedded(file, text))))
        .collect()
});

impl BuiltInSchemas {
    /// The embedded schema for `path`, if its file name is well known.
    ///
    /// Entries tied to an SDK only match files imported from that SDK.
    pub fn for_file(path: &Path, sdk_id: Option<&str>) -> Option<Arc<Schema>> {
        let file_name = path.file_name()?.to_str()?;
        EMBEDDED
            .iter()
            .find(|(file, sdk, _)| {
                file.matches(file_name)
                    && match sdk {
                        Some(sdk) => sdk_id.is_some_and(|id| sdk.matches(id)),
                        None => true,
                    }
            })
            .map(|(_, _, schema)| Arc::clone(schema))
    }
}

/// Everything MSBuild defines without a file.
#[derive(Debug)]
pub struct Builtins {
    /// Common properties, items and targets
    pub schema: Arc<Schema>,
    pub reserved_properties: NameMap<PropertyInfo>,
    pub well_known_metadata: NameMap<MetadataInfo>,
    pub item_functions: NameMap<FunctionInfo>,
    /// Instance functions on property values
    pub string_functions: NameMap<FunctionInfo>,
    pub classes: NameMap<ClassInfo>,
    /// Static functions, keyed by class then function name
    pub static_functions: NameMap<NameMap<FunctionInfo>>,
    pub condition_functions: NameMap<FunctionInfo>,
}

static BUILTINS: LazyLock<Builtins> = LazyLock::new(Builtins::new);

const RESERVED_PROPERTIES: &[(&str, ScalarKind, &str)] = &[
    ("MSBuildProjectDirectory", ScalarKind::Folder, "Directory of the project file"),
    ("MSBuildProjectDirectoryNoRoot", ScalarKind::Folder, "Directory of the project file, without the drive"),
    ("MSBuildProjectExtension", ScalarKind::Extension, "Extension of the project file"),
    ("MSBuildProjectFile", ScalarKind::File, "File name of the project file"),
    ("MSBuildProjectFullPath", ScalarKind::File, "Full path of the project file"),
    ("MSBuildProjectName", ScalarKind::String, "File name of the project file without extension"),
    ("MSBuildProjectDefaultTargets", ScalarKind::TargetName, "Default targets of the project"),
    ("MSBuildThisFile", ScalarKind::File, "File name of the file containing the reference"),
    ("MSBuildThisFileDirectory", ScalarKind::FolderWithSlash, "Directory of the file containing the reference"),
    ("MSBuildThisFileDirectoryNoRoot", ScalarKind::FolderWithSlash, "Directory of the file containing the reference, without the drive"),
    ("MSBuildThisFileExtension", ScalarKind::Extension, "Extension of the file containing the reference"),
    ("MSBuildThisFileFullPath", ScalarKind::File, "Full path of the file containing the reference"),
    ("MSBuildThisFileName", ScalarKind::String, "File name of the file containing the reference, without extension"),
    ("MSBuildBinPath", ScalarKind::Folder, "Directory of the MSBuild binaries"),
    ("MSBuildToolsPath", ScalarKind::Folder, "Directory of the MSBuild tools"),
    ("MSBuildToolsVersion", ScalarKind::String, "Version of the toolset"),
    ("MSBuildExtensionsPath", ScalarKind::Folder, "Directory of MSBuild extensions"),
    ("MSBuildExtensionsPath32", ScalarKind::Folder, "Directory of 32-bit MSBuild extensions"),
    ("MSBuildExtensionsPath64", ScalarKind::Folder, "Directory of 64-bit MSBuild extensions"),
    ("MSBuildSDKsPath", ScalarKind::Folder, "Directory of the SDKs shipped with MSBuild"),
    ("MSBuildStartupDirectory", ScalarKind::Folder, "Directory MSBuild was started in"),
    ("MSBuildNodeCount", ScalarKind::Int, "Number of build nodes"),
    ("MSBuildLastTaskResult", ScalarKind::Bool, "Whether the previous task succeeded"),
    ("MSBuildProgramFiles32", ScalarKind::Folder, "The 32-bit program files directory"),
    ("MSBuildRuntimeType", ScalarKind::String, "Runtime MSBuild is running on"),
    ("MSBuildVersion", ScalarKind::Version, "Version of MSBuild"),
    ("MSBuildAssemblyVersion", ScalarKind::Version, "Assembly version of MSBuild"),
    ("MSBuildFileVersion", ScalarKind::Version, "File version of MSBuild"),
    ("MSBuildSemanticVersion", ScalarKind::VersionSuffixed, "Semantic version of MSBuild"),
    ("MSBuildOverrideTasksPath", ScalarKind::Folder, "Directory of override task registrations"),
];

const WELL_KNOWN_METADATA: &[(&str, ScalarKind, &str)] = &[
    ("FullPath", ScalarKind::File, "Full path of the item"),
    ("RootDir", ScalarKind::Folder, "Root directory of the item"),
    ("Filename", ScalarKind::String, "File name of the item, without extension"),
    ("Extension", ScalarKind::Extension, "Extension of the item"),
    ("RelativeDir", ScalarKind::FolderWithSlash, "Directory of the item as written in the Include"),
    ("Directory", ScalarKind::Folder, "Directory of the item, without the root"),
    ("RecursiveDir", ScalarKind::FolderWithSlash, "Part of the path matched by a ** wildcard"),
    ("Identity", ScalarKind::String, "The item as written in the Include"),
    ("ModifiedTime", ScalarKind::DateTime, "Time the item was last modified"),
    ("CreatedTime", ScalarKind::DateTime, "Time the item was created"),
    ("AccessedTime", ScalarKind::DateTime, "Time the item was last accessed"),
    ("DefiningProjectFullPath", ScalarKind::File, "Full path of the project that defined the item"),
    ("DefiningProjectDirectory", ScalarKind::Folder, "Directory of the project that defined the item"),
    ("DefiningProjectName", ScalarKind::String, "Name of the project that defined the item"),
    ("DefiningProjectExtension", ScalarKind::Extension, "Extension of the project that defined the item"),
];

const ITEM_FUNCTIONS: &[(&str, ScalarKind, &str)] = &[
    ("Count", ScalarKind::Int, "Number of items"),
    ("Distinct", ScalarKind::Unknown, "Items with duplicates removed, ignoring case"),
    ("DistinctWithCase", ScalarKind::Unknown, "Items with duplicates removed"),
    ("Reverse", ScalarKind::Unknown, "Items in reverse order"),
    ("ClearMetadata", ScalarKind::Unknown, "Items with all metadata removed"),
    ("DirectoryName", ScalarKind::Folder, "Directory of each item"),
    ("Metadata", ScalarKind::Unknown, "Values of the named metadata"),
    ("HasMetadata", ScalarKind::Unknown, "Items that have the named metadata"),
    ("WithMetadataValue", ScalarKind::Unknown, "Items whose metadata has the given value"),
    ("WithoutMetadataValue", ScalarKind::Unknown, "Items whose metadata does not have the given value"),
    ("AnyHaveMetadataValue", ScalarKind::Bool, "Whether any item's metadata has the given value"),
    ("Combine", ScalarKind::File, "Each item combined with a path"),
    ("Exists", ScalarKind::Unknown, "Items that exist on disk"),
    ("GetPathsOfAllDirectoriesAbove", ScalarKind::Folder, "Every directory above each item"),
];

const STRING_FUNCTIONS: &[(&str, ScalarKind, &str)] = &[
    ("Length", ScalarKind::Int, "Length of the string"),
    ("Substring", ScalarKind::String, "Part of the string"),
    ("Replace", ScalarKind::String, "String with every occurrence of a value replaced"),
    ("Trim", ScalarKind::String, "String with leading and trailing whitespace removed"),
    ("TrimStart", ScalarKind::String, "String with leading characters removed"),
    ("TrimEnd", ScalarKind::String, "String with trailing characters removed"),
    ("ToLower", ScalarKind::String, "Lowercased string"),
    ("ToLowerInvariant", ScalarKind::String, "Lowercased string"),
    ("ToUpper", ScalarKind::String, "Uppercased string"),
    ("ToUpperInvariant", ScalarKind::String, "Uppercased string"),
    ("Contains", ScalarKind::Bool, "Whether the string contains a value"),
    ("StartsWith", ScalarKind::Bool, "Whether the string starts with a value"),
    ("EndsWith", ScalarKind::Bool, "Whether the string ends with a value"),
    ("IndexOf", ScalarKind::Int, "Position of the first occurrence of a value"),
    ("LastIndexOf", ScalarKind::Int, "Position of the last occurrence of a value"),
    ("Split", ScalarKind::String, "Parts of the string between separators"),
    ("PadLeft", ScalarKind::String, "String padded on the left"),
    ("PadRight", ScalarKind::String, "String padded on the right"),
    ("Remove", ScalarKind::String, "String with a range removed"),
    ("Insert", ScalarKind::String, "String with a value inserted"),
    ("Equals", ScalarKind::Bool, "Whether the string equals a value"),
];

const STATIC_FUNCTIONS: &[(&str, &str, ScalarKind, &str)] = &[
    ("MSBuild", "Add", ScalarKind::Float, "Sum of two numbers"),
    ("MSBuild", "Subtract", ScalarKind::Float, "Difference of two numbers"),
    ("MSBuild", "Multiply", ScalarKind::Float, "Product of two numbers"),
    ("MSBuild", "Divide", ScalarKind::Float, "Quotient of two numbers"),
    ("MSBuild", "Modulo", ScalarKind::Float, "Remainder of two numbers"),
    ("MSBuild", "BitwiseOr", ScalarKind::Int, "Bitwise or of two numbers"),
    ("MSBuild", "BitwiseAnd", ScalarKind::Int, "Bitwise and of two numbers"),
    ("MSBuild", "BitwiseXor", ScalarKind::Int, "Bitwise exclusive or of two numbers"),
    ("MSBuild", "BitwiseNot", ScalarKind::Int, "Bitwise complement of a number"),
    ("MSBuild", "Escape", ScalarKind::String, "Escapes MSBuild special characters"),
    ("MSBuild", "Unescape", ScalarKind::String, "Unescapes MSBuild special characters"),
    ("MSBuild", "GetDirectoryNameOfFileAbove", ScalarKind::Folder, "Directory above the start directory containing a file"),
    ("MSBuild", "GetPathOfFileAbove", ScalarKind::File, "Path of a file in a directory above this file"),
    ("MSBuild", "GetRegistryValue", ScalarKind::String, "Value of a registry key"),
    ("MSBuild", "GetRegistryValueFromView", ScalarKind::String, "Value of a registry key in a registry view"),
    ("MSBuild", "MakeRelative", ScalarKind::FileOrFolder, "Path relative to a base path"),
    ("MSBuild", "NormalizePath", ScalarKind::File, "Combined and normalized full path"),
    ("MSBuild", "NormalizeDirectory", ScalarKind::FolderWithSlash, "Combined and normalized directory with a trailing slash"),
    ("MSBuild", "EnsureTrailingSlash", ScalarKind::FolderWithSlash, "Path with a trailing slash"),
    ("MSBuild", "ValueOrDefault", ScalarKind::String, "The value, or the default when it is empty"),
    ("MSBuild", "VersionEquals", ScalarKind::Bool, "Whether two versions are equal"),
    ("MSBuild", "VersionNotEquals", ScalarKind::Bool, "Whether two versions differ"),
    ("MSBuild", "VersionGreaterThan", ScalarKind::Bool, "Whether the first version is greater"),
    ("MSBuild", "VersionGreaterThanOrEquals", ScalarKind::Bool, "Whether the first version is greater or equal"),
    ("MSBuild", "VersionLessThan", ScalarKind::Bool, "Whether the first version is smaller"),
    ("MSBuild", "VersionLessThanOrEquals", ScalarKind::Bool, "Whether the first version is smaller or equal"),
    ("MSBuild", "GetTargetFrameworkIdentifier", ScalarKind::TargetFrameworkIdentifier, "Identifier of a target framework"),
    ("MSBuild", "GetTargetFrameworkVersion", ScalarKind::TargetFrameworkVersion, "Version of a target framework"),
    ("MSBuild", "GetTargetPlatformIdentifier", ScalarKind::String, "Platform of a target framework"),
    ("MSBuild", "GetTargetPlatformVersion", ScalarKind::Version, "Platform version of a target framework"),
    ("MSBuild", "IsTargetFrameworkCompatible", ScalarKind::Bool, "Whether one framework can consume another"),
    ("MSBuild", "IsOSPlatform", ScalarKind::Bool, "Whether the build runs on a platform"),
    ("MSBuild", "IsOsUnixLike", ScalarKind::Bool, "Whether the build runs on a Unix-like system"),
    ("MSBuild", "StableStringHash", ScalarKind::Int, "Hash of a string that is stable across runs"),
    ("System.IO.Path", "Combine", ScalarKind::FileOrFolder, "Combines paths"),
    ("System.IO.Path", "GetFileName", ScalarKind::File, "File name of a path"),
    ("System.IO.Path", "GetFileNameWithoutExtension", ScalarKind::String, "File name of a path, without extension"),
    ("System.IO.Path", "GetDirectoryName", ScalarKind::Folder, "Directory of a path"),
    ("System.IO.Path", "GetExtension", ScalarKind::Extension, "Extension of a path"),
    ("System.IO.Path", "GetFullPath", ScalarKind::FileOrFolder, "Absolute form of a path"),
    ("System.IO.Path", "ChangeExtension", ScalarKind::File, "Path with a different extension"),
    ("System.IO.Path", "IsPathRooted", ScalarKind::Bool, "Whether a path is rooted"),
    ("System.IO.Path", "GetTempPath", ScalarKind::Folder, "The temporary directory"),
    ("System.IO.Path", "DirectorySeparatorChar", ScalarKind::Char, "The directory separator"),
    ("System.IO.File", "Exists", ScalarKind::Bool, "Whether a file exists"),
    ("System.IO.File", "ReadAllText", ScalarKind::String, "Contents of a file"),
    ("System.IO.File", "GetLastWriteTime", ScalarKind::DateTime, "Time a file was last written"),
    ("System.IO.Directory", "Exists", ScalarKind::Bool, "Whether a directory exists"),
    ("System.IO.Directory", "GetFiles", ScalarKind::File, "Files in a directory"),
    ("System.IO.Directory", "GetDirectories", ScalarKind::Folder, "Directories in a directory"),
    ("System.String", "IsNullOrEmpty", ScalarKind::Bool, "Whether a string is empty"),
    ("System.String", "IsNullOrWhiteSpace", ScalarKind::Bool, "Whether a string is empty or whitespace"),
    ("System.String", "Concat", ScalarKind::String, "Concatenation of strings"),
    ("System.String", "Join", ScalarKind::String, "Strings joined with a separator"),
    ("System.String", "Format", ScalarKind::String, "Formatted string"),
    ("System.String", "Copy", ScalarKind::String, "Copy of a string"),
    ("System.Environment", "GetEnvironmentVariable", ScalarKind::String, "Value of an environment variable"),
    ("System.Environment", "NewLine", ScalarKind::String, "The newline string"),
    ("System.Environment", "ProcessorCount", ScalarKind::Int, "Number of processors"),
    ("System.Environment", "MachineName", ScalarKind::String, "Name of the machine"),
    ("System.Environment", "UserName", ScalarKind::String, "Name of the user"),
    ("System.Environment", "Is64BitOperatingSystem", ScalarKind::Bool, "Whether the operating system is 64-bit"),
    ("System.Math", "Max", ScalarKind::Float, "Larger of two numbers"),
    ("System.Math", "Min", ScalarKind::Float, "Smaller of two numbers"),
    ("System.Math", "Abs", ScalarKind::Float, "Absolute value"),
    ("System.Math", "Floor", ScalarKind::Float, "Largest integer not above a number"),
    ("System.Math", "Ceiling", ScalarKind::Float, "Smallest integer not below a number"),
    ("System.Math", "Round", ScalarKind::Float, "Number rounded to the nearest integer"),
    ("System.DateTime", "Now", ScalarKind::DateTime, "The current local time"),
    ("System.DateTime", "UtcNow", ScalarKind::DateTime, "The current UTC time"),
    ("System.DateTime", "Today", ScalarKind::DateTime, "The current date"),
    ("System.Guid", "NewGuid", ScalarKind::Guid, "A new unique identifier"),
    ("System.Version", "Parse", ScalarKind::Version, "Parses a version"),
    ("System.Text.RegularExpressions.Regex", "IsMatch", ScalarKind::Bool, "Whether a pattern matches"),
    ("System.Text.RegularExpressions.Regex", "Match", ScalarKind::String, "First match of a pattern"),
    ("System.Text.RegularExpressions.Regex", "Replace", ScalarKind::String, "String with pattern matches replaced"),
    ("System.Text.RegularExpressions.Regex", "Split", ScalarKind::String, "Parts of a string between pattern matches"),
    ("System.Text.RegularExpressions.Regex", "Escape", ScalarKind::String, "Pattern with special characters escaped"),
    ("System.Runtime.InteropServices.RuntimeInformation", "OSArchitecture", ScalarKind::Platform, "Architecture of the operating system"),
    ("System.Runtime.InteropServices.RuntimeInformation", "ProcessArchitecture", ScalarKind::Platform, "Architecture of the build process"),
    ("System.Runtime.InteropServices.RuntimeInformation", "IsOSPlatform", ScalarKind::Bool, "Whether the build runs on a platform"),
    ("System.Runtime.InteropServices.RuntimeInformation", "RuntimeIdentifier", ScalarKind::RuntimeId, "Runtime identifier of the build process"),
    ("System.OperatingSystem", "IsWindows", ScalarKind::Bool, "Whether the build runs on Windows"),
    ("System.OperatingSystem", "IsLinux", ScalarKind::Bool, "Whether the build runs on Linux"),
    ("System.OperatingSystem", "IsMacOS", ScalarKind::Bool, "Whether the build runs on macOS"),
    ("System.OperatingSystem", "IsFreeBSD", ScalarKind::Bool, "Whether the build runs on FreeBSD"),
];

const CLASSES: &[(&str, &str)] = &[
    ("MSBuild", "MSBuild property functions"),
    ("System.IO.Path", "Path manipulation"),
    ("System.IO.File", "File access"),
    ("System.IO.Directory", "Directory access"),
    ("System.String", "String functions"),
    ("System.Environment", "Process environment"),
    ("System.Math", "Arithmetic"),
    ("System.DateTime", "Dates and times"),
    ("System.Guid", "Unique identifiers"),
    ("System.Version", "Version numbers"),
    ("System.Text.RegularExpressions.Regex", "Regular expressions"),
    ("System.Runtime.InteropServices.RuntimeInformation", "Information about the runtime"),
    ("System.OperatingSystem", "Operating system checks"),
];

const CONDITION_FUNCTIONS: &[(&str, &str)] = &[
    ("Exists", "Whether a file or directory exists"),
    ("HasTrailingSlash", "Whether a path ends with a slash"),
];

fn function(name: &str, kind: FunctionKind, class: Option<&str>, return_kind: ScalarKind, description: &str) -> FunctionInfo {
    FunctionInfo {
        name: Name::new(name),
        description: Some(description.to_string()),
        kind,
        class: class.map(Name::new),
        return_kind: ValueKind::new(return_kind),
        ..Default::default()
    }
}

impl Builtins {
    /// The process-wide builtins, loaded on first use.
    pub fn get() -> &'static Builtins {
        &BUILTINS
    }

    fn new() -> Self {
        let reserved_properties = RESERVED_PROPERTIES
            .iter()
            .map(|&(name, kind, description)| {
                let property = PropertyInfo {
                    kind: ValueKind::new(kind).into(),
                    reserved: true,
                    ..PropertyInfo::new(name, Some(description.to_string()))
                };
                (Name::new(name), property)
            })
            .collect();

        let well_known_metadata = WELL_KNOWN_METADATA
            .iter()
            .map(|&(name, kind, description)| {
                let metadata = MetadataInfo {
                    kind: ValueKind::new(kind).into(),
                    reserved: true,
                    ..MetadataInfo::new(name, None, Some(description.to_string()))
                };
                (Name::new(name), metadata)
            })
            .collect();

        let item_functions = ITEM_FUNCTIONS
            .iter()
            .map(|&(name, kind, description)| (Name::new(name), function(name, FunctionKind::Item, None, kind, description)))
            .collect();

        let string_functions = STRING_FUNCTIONS
            .iter()
            .map(|&(name, kind, description)| {
                (Name::new(name), function(name, FunctionKind::Property, None, kind, description))
            })
            .collect();

        let classes = CLASSES
            .iter()
            .map(|&(name, description)| {
                let class = ClassInfo {
                    name: Name::new(name),
                    description: Some(description.to_string()),
                };
                (Name::new(name), class)
            })
            .collect();

        let mut static_functions: NameMap<NameMap<FunctionInfo>> = NameMap::new();
        for &(class, name, kind, description) in STATIC_FUNCTIONS {
            static_functions
                .get_or_insert_with(class, NameMap::new)
                .insert(name, function(name, FunctionKind::Static, Some(class), kind, description));
        }

        let condition_functions = CONDITION_FUNCTIONS
            .iter()
            .map(|&(name, description)| {
                (Name::new(name), function(name, FunctionKind::Condition, None, ScalarKind::Bool, description))
            })
            .collect();

        Self {
            schema: Arc::new(parse_embedded("common", COMMON_SCHEMA)),
            reserved_properties,
            well_known_metadata,
            item_functions,
            string_functions,
            classes,
            static_functions,
            condition_functions,
        }
    }

    /// Resolve a class name, accepting `System.` omitted as MSBuild does.
    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes
            .get(name)
            .or_else(|| self.classes.get(&format!("System.{name}")))
    }

    /// Look up a function of the given kind. `class` is used for static functions.
    pub fn function(&self, kind: FunctionKind, class: Option<&str>, name: &str) -> Option<&FunctionInfo> {
        match kind {
            FunctionKind::Item => self.item_functions.get(name),
            FunctionKind::Property => self.string_functions.get(name),
            FunctionKind::Condition => self.condition_functions.get(name),
            FunctionKind::Static => {
                let class = self.class(class?)?;
                self.static_functions.get(class.name.as_str())?.get(name)
            }
        }
    }
}

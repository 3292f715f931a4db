//! The element and attribute tables.

use super::{AttributeSyntax as A, ElementSyntax, SyntaxKind as K};
use crate::schema::{ScalarKind as S, ValueKind};

const fn kind(scalar: S) -> ValueKind {
    ValueKind::new(scalar)
}

const CONDITION: ValueKind = kind(S::Condition);
const LABEL: ValueKind = kind(S::Label);
const BOOL: ValueKind = kind(S::Bool).literal();
const TARGETS: ValueKind = kind(S::TargetName).with_list();
const FILES: ValueKind = kind(S::File).with_list();
const METADATA_NAMES: ValueKind = kind(S::MetadataName).with_list();

const A_CONDITION: A = A::new(K::Condition, "Condition", CONDITION, "Condition that must be true for this element to be used");
const A_LABEL: A = A::new(K::Label, "Label", LABEL, "Optional label for grouping and identification");

const ELEMENT: ElementSyntax = ElementSyntax {
    kind: K::Project,
    name: "",
    description: "",
    children: &[],
    attributes: &[],
    value_kind: ValueKind::NOTHING,
    is_abstract: false,
    opaque_content: false,
};

/// `Project` is first; `ElementSyntax::project` relies on it.
pub(super) static ELEMENTS: &[ElementSyntax] = &[
    ElementSyntax {
        kind: K::Project,
        name: "Project",
        description: "Root element of an MSBuild project file",
        children: &[
            K::PropertyGroup,
            K::ItemGroup,
            K::ItemDefinitionGroup,
            K::Target,
            K::Import,
            K::ImportGroup,
            K::Choose,
            K::UsingTask,
            K::ProjectExtensions,
            K::Sdk,
        ],
        attributes: &[
            A::new(K::ProjectSdk, "Sdk", kind(S::Sdk).with_list(), "SDKs to import before and after the project body"),
            A::new(K::ProjectDefaultTargets, "DefaultTargets", TARGETS, "Targets to build when none are specified"),
            A::new(K::ProjectInitialTargets, "InitialTargets", TARGETS, "Targets to run before any other targets"),
            A::new(K::ProjectToolsVersion, "ToolsVersion", kind(S::String).literal(), "Version of the toolset, obsolete"),
            A::new(
                K::ProjectTreatAsLocalProperty,
                "TreatAsLocalProperty",
                kind(S::PropertyName).with_list(),
                "Global properties that the project may override",
            ),
            A::new(K::ProjectXmlns, "xmlns", kind(S::Url).literal(), "MSBuild XML namespace"),
        ],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::PropertyGroup,
        name: "PropertyGroup",
        description: "Groups property definitions",
        children: &[K::Property],
        attributes: &[A_CONDITION, A_LABEL],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Property,
        description: "Defines or updates a property",
        attributes: &[A_CONDITION],
        value_kind: ValueKind::UNKNOWN,
        is_abstract: true,
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::ItemGroup,
        name: "ItemGroup",
        description: "Groups item definitions",
        children: &[K::Item],
        attributes: &[A_CONDITION, A_LABEL],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::ItemDefinitionGroup,
        name: "ItemDefinitionGroup",
        description: "Defines default metadata for item types",
        children: &[K::Item],
        attributes: &[A_CONDITION, A_LABEL],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Item,
        description: "Adds, updates or removes items",
        children: &[K::Metadata],
        attributes: &[
            A::new(K::ItemInclude, "Include", FILES, "Items to add"),
            A::new(K::ItemExclude, "Exclude", FILES, "Items to leave out of the Include"),
            A::new(K::ItemRemove, "Remove", FILES, "Items to remove"),
            A::new(K::ItemUpdate, "Update", FILES, "Items whose metadata to update"),
            A_CONDITION,
            A::new(K::ItemKeepMetadata, "KeepMetadata", METADATA_NAMES, "Metadata to keep when copying items in a target"),
            A::new(K::ItemRemoveMetadata, "RemoveMetadata", METADATA_NAMES, "Metadata to drop when copying items in a target"),
            A::new(K::ItemKeepDuplicates, "KeepDuplicates", BOOL, "Whether to add items already in the list"),
            A::new(K::ItemMatchOnMetadata, "MatchOnMetadata", METADATA_NAMES, "Remove items with matching metadata"),
            A::new(
                K::ItemMatchOnMetadataOptions,
                "MatchOnMetadataOptions",
                kind(S::String).literal(),
                "How MatchOnMetadata compares values",
            ),
            A::abstract_attribute(K::ItemMetadata, ValueKind::UNKNOWN, "Item metadata"),
        ],
        is_abstract: true,
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Metadata,
        description: "Item metadata",
        attributes: &[A_CONDITION],
        value_kind: ValueKind::UNKNOWN,
        is_abstract: true,
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Target,
        name: "Target",
        description: "A named sequence of tasks",
        children: &[K::PropertyGroup, K::ItemGroup, K::OnError, K::Task],
        attributes: &[
            A::new(K::TargetName, "Name", kind(S::TargetName).literal(), "Name of the target").required(),
            A::new(K::TargetDependsOnTargets, "DependsOnTargets", TARGETS, "Targets that run before this one"),
            A::new(K::TargetBeforeTargets, "BeforeTargets", TARGETS, "Run this target before these targets"),
            A::new(K::TargetAfterTargets, "AfterTargets", TARGETS, "Run this target after these targets"),
            A::new(K::TargetInputs, "Inputs", FILES, "Files compared against Outputs for incremental builds"),
            A::new(K::TargetOutputs, "Outputs", FILES, "Files the target produces"),
            A::new(K::TargetReturns, "Returns", kind(S::Unknown).with_list(), "Items the target returns to callers"),
            A::new(K::TargetKeepDuplicateOutputs, "KeepDuplicateOutputs", BOOL, "Keep duplicate items in the outputs"),
            A_CONDITION,
            A_LABEL,
        ],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Task,
        description: "Runs a task",
        children: &[K::Output],
        attributes: &[
            A_CONDITION,
            A::new(
                K::TaskContinueOnError,
                "ContinueOnError",
                kind(S::String).literal(),
                "What to do when the task fails",
            ),
            A::new(K::TaskRuntime, "MSBuildRuntime", kind(S::HostRuntime), "Runtime to run the task in"),
            A::new(K::TaskArchitecture, "MSBuildArchitecture", kind(S::Platform), "Architecture to run the task in"),
            A::abstract_attribute(K::TaskParameter, ValueKind::UNKNOWN, "Task parameter"),
        ],
        is_abstract: true,
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Output,
        name: "Output",
        description: "Stores a task output in a property or item",
        attributes: &[
            A::new(K::OutputTaskParameter, "TaskParameter", kind(S::String).literal(), "Output parameter of the task").required(),
            A::new(K::OutputPropertyName, "PropertyName", kind(S::PropertyName).literal(), "Property receiving the value"),
            A::new(K::OutputItemName, "ItemName", kind(S::ItemName).literal(), "Item receiving the value"),
            A_CONDITION,
        ],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::OnError,
        name: "OnError",
        description: "Targets to run when a task fails",
        attributes: &[
            A::new(K::OnErrorExecuteTargets, "ExecuteTargets", TARGETS, "Targets to run").required(),
            A_CONDITION,
        ],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Import,
        name: "Import",
        description: "Imports the contents of another project file",
        attributes: &[
            A::new(K::ImportProject, "Project", kind(S::ProjectFile), "Path of the project to import").required(),
            A_CONDITION,
            A_LABEL,
            A::new(K::ImportSdk, "Sdk", kind(S::Sdk).literal(), "SDK to resolve the project path against"),
            A::new(K::ImportVersion, "Version", kind(S::SdkVersion).literal(), "Version of the SDK"),
            A::new(K::ImportMinimumVersion, "MinimumVersion", kind(S::SdkVersion).literal(), "Minimum version of the SDK"),
        ],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::ImportGroup,
        name: "ImportGroup",
        description: "Groups imports under one condition",
        children: &[K::Import],
        attributes: &[A_CONDITION, A_LABEL],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Choose,
        name: "Choose",
        description: "Selects one of several groups",
        children: &[K::When, K::Otherwise],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::When,
        name: "When",
        description: "A branch of a Choose",
        children: &[K::PropertyGroup, K::ItemGroup, K::Choose],
        attributes: &[A::new(K::Condition, "Condition", CONDITION, "Condition selecting this branch").required()],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Otherwise,
        name: "Otherwise",
        description: "The branch used when no When matches",
        children: &[K::PropertyGroup, K::ItemGroup, K::Choose],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::UsingTask,
        name: "UsingTask",
        description: "Registers a task implementation",
        children: &[K::ParameterGroup, K::TaskBody],
        attributes: &[
            A::new(K::UsingTaskTaskName, "TaskName", kind(S::TaskName).literal(), "Name of the task").required(),
            A::new(K::UsingTaskAssemblyFile, "AssemblyFile", kind(S::File), "Assembly containing the task"),
            A::new(K::UsingTaskAssemblyName, "AssemblyName", kind(S::String), "Strong name of the task assembly"),
            A::new(K::UsingTaskTaskFactory, "TaskFactory", kind(S::String).literal(), "Factory that creates the task"),
            A::new(K::UsingTaskArchitecture, "Architecture", kind(S::Platform), "Architecture of the task host"),
            A::new(K::UsingTaskRuntime, "Runtime", kind(S::HostRuntime), "Runtime of the task host"),
            A::new(K::UsingTaskOverride, "Override", BOOL, "Replace earlier registrations of the task"),
            A_CONDITION,
        ],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::ParameterGroup,
        name: "ParameterGroup",
        description: "Parameters of an inline task",
        children: &[K::Parameter],
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Parameter,
        description: "Parameter of an inline task",
        attributes: &[
            A::new(K::ParameterType, "ParameterType", kind(S::ClrType).literal(), "Type of the parameter"),
            A::new(K::ParameterRequired, "Required", BOOL, "Whether the parameter must be set"),
            A::new(K::ParameterOutput, "Output", BOOL, "Whether the parameter is an output"),
        ],
        is_abstract: true,
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::TaskBody,
        name: "Task",
        description: "Body of an inline task",
        attributes: &[A::new(K::TaskBodyEvaluate, "Evaluate", BOOL, "Expand properties in the body")],
        value_kind: kind(S::Data),
        opaque_content: true,
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::ProjectExtensions,
        name: "ProjectExtensions",
        description: "Data for tools, ignored by MSBuild",
        value_kind: kind(S::Data),
        opaque_content: true,
        ..ELEMENT
    },
    ElementSyntax {
        kind: K::Sdk,
        name: "Sdk",
        description: "An SDK to import before and after the project body",
        attributes: &[
            A::new(K::SdkName, "Name", kind(S::Sdk).literal(), "Name of the SDK").required(),
            A::new(K::SdkVersion, "Version", kind(S::SdkVersion).literal(), "Version of the SDK"),
            A::new(K::SdkMinimumVersion, "MinimumVersion", kind(S::SdkVersion).literal(), "Minimum version of the SDK"),
        ],
        ..ELEMENT
    },
];

//! Syntax kinds for MSBuild elements and attributes
//!
//! One kind per element of the project grammar and one per distinct
//! attribute. Attributes that mean the same thing on several elements
//! (`Condition`, `Label`) share a kind; the owning element tells them apart.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SyntaxKind {
    // =========================================================================
    // ELEMENTS
    // =========================================================================
    Project = 0,
    PropertyGroup,
    /// Any child of `PropertyGroup`
    Property,
    ItemGroup,
    ItemDefinitionGroup,
    /// Any child of `ItemGroup` or `ItemDefinitionGroup`
    Item,
    /// Any child of an item
    Metadata,
    Target,
    /// Any element in a target that is not otherwise known
    Task,
    Output,
    OnError,
    Import,
    ImportGroup,
    Choose,
    When,
    Otherwise,
    UsingTask,
    ParameterGroup,
    /// Any child of `ParameterGroup`
    Parameter,
    TaskBody,
    ProjectExtensions,
    Sdk,

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================
    Condition,
    Label,

    // Project
    ProjectSdk,
    ProjectDefaultTargets,
    ProjectInitialTargets,
    ProjectToolsVersion,
    ProjectTreatAsLocalProperty,
    ProjectXmlns,

    // Item
    ItemInclude,
    ItemExclude,
    ItemRemove,
    ItemUpdate,
    ItemKeepMetadata,
    ItemRemoveMetadata,
    ItemKeepDuplicates,
    ItemMatchOnMetadata,
    ItemMatchOnMetadataOptions,
    /// Metadata written as an attribute on the item
    ItemMetadata,

    // Target
    TargetName,
    TargetDependsOnTargets,
    TargetBeforeTargets,
    TargetAfterTargets,
    TargetInputs,
    TargetOutputs,
    TargetReturns,
    TargetKeepDuplicateOutputs,

    // Task
    TaskContinueOnError,
    TaskRuntime,
    TaskArchitecture,
    /// A parameter passed to the task
    TaskParameter,

    // Output
    OutputTaskParameter,
    OutputPropertyName,
    OutputItemName,

    // OnError
    OnErrorExecuteTargets,

    // Import
    ImportProject,
    ImportSdk,
    ImportVersion,
    ImportMinimumVersion,

    // UsingTask
    UsingTaskTaskName,
    UsingTaskAssemblyFile,
    UsingTaskAssemblyName,
    UsingTaskTaskFactory,
    UsingTaskArchitecture,
    UsingTaskRuntime,
    UsingTaskOverride,

    // Parameter
    ParameterType,
    ParameterRequired,
    ParameterOutput,

    // TaskBody
    TaskBodyEvaluate,

    // Sdk
    SdkName,
    SdkVersion,
    SdkMinimumVersion,
}

impl SyntaxKind {
    pub fn is_element(self) -> bool {
        self <= SyntaxKind::Sdk
    }

    pub fn is_attribute(self) -> bool {
        !self.is_element()
    }

    /// Attributes whose value names one or more targets.
    pub fn is_target_reference(self) -> bool {
        matches!(
            self,
            SyntaxKind::ProjectDefaultTargets
                | SyntaxKind::ProjectInitialTargets
                | SyntaxKind::TargetDependsOnTargets
                | SyntaxKind::TargetBeforeTargets
                | SyntaxKind::TargetAfterTargets
                | SyntaxKind::OnErrorExecuteTargets
        )
    }

    /// Item operation attributes, which take item expressions.
    pub fn is_item_operation(self) -> bool {
        matches!(
            self,
            SyntaxKind::ItemInclude | SyntaxKind::ItemExclude | SyntaxKind::ItemRemove | SyntaxKind::ItemUpdate
        )
    }
}

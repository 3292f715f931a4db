//! Project model: the import graph of one top-level document
//!
//! ```text
//! RootDocument::parse ──► GraphBuilder ──► Document (per file)
//!        │                    │                 └─ Import ──► Document ...
//!        │                    ├─ SdkResolver / SchemaProvider / RuntimeInformation
//!        │                    └─ PropertyValueCollector (import-path properties)
//!        └─ SchemaSet ──► DocumentValidator ──► diagnostics
//! ```

mod context;
mod document;
mod frameworks;
mod imports;
mod properties;
mod providers;
mod root;
mod runtime;
mod sdk;

pub use context::ParseContext;
pub use document::{Annotation, Document, Import};
pub use frameworks::{FRAMEWORK_PROPERTIES, FrameworkReference, target_frameworks};
pub use properties::{FileEvaluationContext, PropertyValueCollector, referenced_properties};
pub use providers::{FileSchemaProvider, SchemaProvider, TaskDefinitionProvider};
pub use root::RootDocument;
pub use runtime::{RuntimeInformation, StaticRuntimeInformation};
pub use sdk::{RegistrySdkResolver, SdkInfo, SdkReference, SdkResolver};

pub mod project;
pub mod target;

pub use project::{CreateNodesResult, PackageManifest, ProjectConfiguration};
pub use target::{TargetConfiguration, TargetDependency, TargetInput, TargetOptions};

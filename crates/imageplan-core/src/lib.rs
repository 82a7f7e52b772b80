mod dependency;
mod manifest;
mod package_id;

pub use dependency::{Dependency, DependencyKind};
pub use manifest::Manifest;
pub use package_id::PackageId;

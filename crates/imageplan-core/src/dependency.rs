use serde::{Deserialize, Serialize};

use crate::package_id::PackageId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Require,
    Optional,
    Exclude,
    Incorporate,
}

impl DependencyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Require => "require",
            Self::Optional => "optional",
            Self::Exclude => "exclude",
            Self::Incorporate => "incorporate",
        }
    }
}

/// One `[[depend]]` declaration of a manifest. `target` names the minimum
/// acceptable version of the dependency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    #[serde(rename = "type")]
    pub kind: DependencyKind,
    #[serde(rename = "fmri")]
    pub target: PackageId,
}

impl Dependency {
    pub fn new(kind: DependencyKind, target: PackageId) -> Self {
        Self { kind, target }
    }

    /// The target with the image's build release applied when the
    /// declaration carries none.
    pub fn resolved_target(&self, build_release: &str) -> PackageId {
        self.target.clone().or_build_release(build_release)
    }
}

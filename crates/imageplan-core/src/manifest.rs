use anyhow::{anyhow, Context};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::dependency::{Dependency, DependencyKind};
use crate::package_id::PackageId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub version: Version,
    pub summary: Option<String>,
    #[serde(default, rename = "depend")]
    pub dependencies: Vec<Dependency>,
}

impl Manifest {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let manifest: Self = toml::from_str(input).context("failed to parse package manifest")?;
        PackageId::parse(&format!("{}@{}", manifest.name, manifest.version))
            .with_context(|| format!("manifest '{}' has an invalid identity", manifest.name))?;
        for dependency in &manifest.dependencies {
            if dependency.target.name() == manifest.name {
                return Err(anyhow!(
                    "manifest '{}' declares a {} dependency on itself",
                    manifest.name,
                    dependency.kind.as_str()
                ));
            }
        }
        Ok(manifest)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string(self).with_context(|| format!("failed to serialize manifest '{}'", self.name))
    }

    pub fn id(&self) -> PackageId {
        PackageId::new(self.name.clone(), self.version.clone())
    }

    pub fn dependencies_of_kind(
        &self,
        kind: DependencyKind,
    ) -> impl Iterator<Item = &Dependency> + '_ {
        self.dependencies
            .iter()
            .filter(move |dependency| dependency.kind == kind)
    }

    /// Every declaration that asks for a package to be present, as opposed
    /// to `exclude` declarations that forbid one.
    pub fn wanted_dependencies(&self) -> impl Iterator<Item = &Dependency> + '_ {
        self.dependencies
            .iter()
            .filter(|dependency| dependency.kind != DependencyKind::Exclude)
    }
}

use std::fmt;

use imageplan_core::{Manifest, PackageId};
use serde::{Deserialize, Serialize};

use crate::types::Outcome;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ImagePolicy {
    /// Treat `optional` dependencies as if they were `require`.
    #[serde(default)]
    pub require_optional: bool,
}

/// Read view of an image: what is installed, which manifests are cached
/// locally, and which versions the catalog offers.
pub trait InstalledState {
    /// True when the same package is installed at `id`'s version or newer.
    /// Install records that cannot be read count as not installed.
    fn is_installed(&self, id: &PackageId) -> bool;

    fn has_manifest(&self, id: &PackageId) -> bool;

    fn manifest(&self, id: &PackageId) -> anyhow::Result<Manifest>;

    /// Every catalog version of `name`, in no particular order.
    fn matching_candidates(&self, name: &str) -> anyhow::Result<Vec<PackageId>>;

    fn policy(&self) -> ImagePolicy;

    fn build_release(&self) -> &str;
}

/// Makes a manifest available to an image. After a successful fetch,
/// `has_manifest` and `manifest` succeed for `id`.
pub trait ManifestFetcher<S: ?Sized> {
    fn fetch(&self, image: &S, id: &PackageId) -> anyhow::Result<()>;
}

pub trait PackagePlanner {
    type Plan: PackagePlan;

    /// Plans the move of `id`'s package to `id`. Returns
    /// [`Outcome::AlreadySatisfied`] when no transition is needed.
    fn propose_destination(
        &self,
        id: &PackageId,
        manifest: &Manifest,
    ) -> anyhow::Result<Outcome<Self::Plan>>;
}

/// The transition of one package, driven through evaluation and the three
/// execution phases by the image plan.
pub trait PackagePlan: fmt::Display {
    fn evaluate(&mut self) -> anyhow::Result<()>;

    fn preexecute(&mut self) -> anyhow::Result<()>;

    fn execute(&mut self) -> anyhow::Result<()>;

    fn postexecute(&mut self) -> anyhow::Result<()>;

    /// Undo whatever `preexecute` and `execute` applied. Called only for
    /// plans whose `preexecute` succeeded.
    fn rollback(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

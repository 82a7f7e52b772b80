use anyhow::{anyhow, Context, Result};
use imageplan_core::{Manifest, PackageId};
use imageplan_resolver::{ImagePolicy, InstalledState};
use tracing::warn;

use crate::catalog::read_manifest;
use crate::{read_install_receipt, read_install_receipts, Catalog, ImageConfig, ImageLayout};

/// A package image rooted at one directory: install receipts, cached
/// manifests, its catalog, and its config.
#[derive(Debug, Clone)]
pub struct Image {
    layout: ImageLayout,
    config: ImageConfig,
    catalog: Catalog,
}

impl Image {
    /// Opens the image at `layout`, using the catalog inside the image root.
    pub fn open(layout: ImageLayout) -> Result<Self> {
        let catalog = Catalog::open(layout.catalog_dir());
        Self::open_with_catalog(layout, catalog)
    }

    /// Opens the image at `layout` against `catalog`. Every install receipt
    /// is read once here, so an unreadable one fails the open rather than
    /// surfacing later in the middle of a plan.
    pub fn open_with_catalog(layout: ImageLayout, catalog: Catalog) -> Result<Self> {
        layout.ensure_base_dirs()?;
        let config = ImageConfig::load(&layout)?;
        for receipt in
            read_install_receipts(&layout).context("image has an unreadable install receipt")?
        {
            receipt.package_id()?;
        }
        Ok(Self {
            layout,
            config,
            catalog,
        })
    }

    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The installed version of `name`, if any.
    pub fn installed(&self, name: &str) -> Result<Option<PackageId>> {
        read_install_receipt(&self.layout, name)?
            .map(|receipt| receipt.package_id())
            .transpose()
    }
}

impl InstalledState for Image {
    fn is_installed(&self, id: &PackageId) -> bool {
        match self.installed(id.name()) {
            Ok(installed) => installed.is_some_and(|installed| installed.satisfies(id)),
            // Receipts were validated on open; one broken since then reads
            // as absent.
            Err(err) => {
                warn!("treating {} as not installed: {:#}", id.name(), err);
                false
            }
        }
    }

    fn has_manifest(&self, id: &PackageId) -> bool {
        self.layout.manifest_path(id).is_file()
    }

    fn manifest(&self, id: &PackageId) -> Result<Manifest> {
        let manifest = read_manifest(&self.layout.manifest_path(id))?;
        if manifest.name != id.name() || &manifest.version != id.version() {
            return Err(anyhow!(
                "cached manifest for {} describes {}",
                id,
                manifest.id()
            ));
        }
        Ok(manifest)
    }

    fn matching_candidates(&self, name: &str) -> Result<Vec<PackageId>> {
        Ok(self
            .catalog
            .package_versions(name)?
            .iter()
            .map(Manifest::id)
            .collect())
    }

    fn policy(&self) -> ImagePolicy {
        self.config.policy
    }

    fn build_release(&self) -> &str {
        &self.config.build_release
    }
}
